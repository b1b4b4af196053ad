// =============================================================================
// TAIFEX MIS Quote Client — one POST per fetch
// =============================================================================
//
// Request:  POST getQuoteList with a fixed JSON template (market, symbol type,
//           product code, interval, row/column layout, trade date) and the
//           browser-like headers the endpoint expects.
// Response: { "RtData": { "QuoteList": [ { "SymbolID": ..., "CLastPrice": ...,
//           "CDiff": ..., "CTotalVolume": ..., ... }, ... ] } }
//
// Only the record whose `SymbolID` equals the tracked contract is used.
// =============================================================================

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::runtime_config::HubConfig;

const ORIGIN_URL: &str = "https://mis.taifex.com.tw";
const REFERER_URL: &str =
    "https://mis.taifex.com.tw/futures/RegularSession/EquityIndices/FuturesDomestic/";
const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// =============================================================================
// Wire types
// =============================================================================

/// Body of the quote-list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuoteListRequest {
    pub market_type: String,
    pub symbol_type: String,
    pub symbol: String,
    pub interval: String,
    pub row: String,
    pub column: String,
    /// `YYYYMMDD`.
    pub date: String,
}

impl QuoteListRequest {
    /// The fixed template for `symbol` on `date`.
    pub fn new(symbol: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            market_type: "0".into(),
            symbol_type: "F".into(),
            symbol: symbol.into(),
            interval: "0".into(),
            row: "1".into(),
            column: "2".into(),
            date: date.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuoteListResponse {
    #[serde(rename = "RtData")]
    rt_data: Option<RtData>,
}

#[derive(Debug, Deserialize)]
struct RtData {
    #[serde(rename = "QuoteList", default)]
    quote_list: Vec<QuoteRecord>,
}

/// One row of the upstream quote list. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QuoteRecord {
    #[serde(rename = "SymbolID", default)]
    pub symbol_id: String,
    #[serde(rename = "CLastPrice", default)]
    pub last_price: Option<String>,
    #[serde(rename = "CDiff", default)]
    pub diff: Option<String>,
    #[serde(rename = "CTotalVolume", default)]
    pub total_volume: Option<String>,
    #[serde(rename = "COpenPrice", default)]
    pub open_price: Option<String>,
    #[serde(rename = "CHighPrice", default)]
    pub high_price: Option<String>,
    #[serde(rename = "CLowPrice", default)]
    pub low_price: Option<String>,
}

/// Pick the record for `symbol_id` out of a raw response body.
pub fn select_record(body: &[u8], symbol_id: &str) -> Result<QuoteRecord, FetchError> {
    let parsed: QuoteListResponse = serde_json::from_slice(body)
        .map_err(|e| FetchError::UpstreamUnavailable(format!("malformed quote list: {e}")))?;

    parsed
        .rt_data
        .into_iter()
        .flat_map(|rt| rt.quote_list)
        .find(|record| record.symbol_id == symbol_id)
        .ok_or_else(|| FetchError::NoMatchingRecord {
            symbol_id: symbol_id.to_string(),
        })
}

// =============================================================================
// Source abstraction
// =============================================================================

/// Anything that can produce the tracked instrument's current quote record.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// One upstream round-trip for trade date `date` (`YYYYMMDD`).
    async fn fetch_record(&self, date: &str) -> Result<QuoteRecord, FetchError>;
}

/// HTTP client for the TAIFEX MIS quote list.
#[derive(Clone)]
pub struct TaifexClient {
    client: reqwest::Client,
    url: String,
    symbol: String,
    symbol_id: String,
}

impl TaifexClient {
    /// Build a client with the fixed header set and the configured timeout.
    pub fn new(config: &HubConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-TW"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(ORIGIN, HeaderValue::from_static(ORIGIN_URL));
        headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        debug!(url = %config.upstream_url, symbol_id = %config.symbol_id, "TaifexClient initialised");

        Ok(Self {
            client,
            url: config.upstream_url.clone(),
            symbol: config.symbol.clone(),
            symbol_id: config.symbol_id.clone(),
        })
    }
}

#[async_trait]
impl QuoteSource for TaifexClient {
    #[instrument(skip(self), name = "taifex::fetch_record")]
    async fn fetch_record(&self, date: &str) -> Result<QuoteRecord, FetchError> {
        let request = QuoteListRequest::new(self.symbol.clone(), date);

        let resp = self.client.post(&self.url).json(&request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamUnavailable(format!(
                "quote list returned {status}"
            )));
        }

        let body = resp.bytes().await?;
        select_record(&body, &self.symbol_id)
    }
}
