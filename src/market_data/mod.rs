// =============================================================================
// Market Data Module
// =============================================================================
//
// Upstream quote retrieval (TAIFEX MIS), exchange clock, and the chart-bar
// boundary with the external history source.

pub mod chart_feed;
pub mod fetcher;
pub mod market_hours;
pub mod upstream;

pub use chart_feed::ChartFeed;
pub use fetcher::QuoteFetcher;
pub use market_hours::MarketClock;
pub use upstream::{QuoteRecord, QuoteSource, TaifexClient};
