// =============================================================================
// Chart Feed — latest OHLCV bars handed in by an external chart source
// =============================================================================
//
// The hub does not own price history. Whatever produces bars (a charting
// backend, a batch job) replaces the whole series through `replace`; the hub
// attaches the series to every snapshot untouched and derives the signal from
// its closes and volumes.
// =============================================================================

use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::ChartBar;

/// Thread-safe holder for the most recent bar series.
#[derive(Default)]
pub struct ChartFeed {
    bars: RwLock<Option<Arc<Vec<ChartBar>>>>,
}

impl ChartFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new series (oldest first). An empty series clears the feed.
    pub fn replace(&self, bars: Vec<ChartBar>) {
        let next = if bars.is_empty() {
            None
        } else {
            Some(Arc::new(bars))
        };
        *self.bars.write() = next;
    }

    /// Current series, if any.
    pub fn latest(&self) -> Option<Arc<Vec<ChartBar>>> {
        self.bars.read().clone()
    }

    /// Close prices, oldest first.
    pub fn closes(bars: &[ChartBar]) -> Vec<f64> {
        bars.iter().map(|b| b.close).collect()
    }

    /// Volumes, oldest first.
    pub fn volumes(bars: &[ChartBar]) -> Vec<f64> {
        bars.iter().map(|b| b.volume).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(time: i64, close: f64) -> ChartBar {
        ChartBar {
            time,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn starts_empty() {
        assert!(ChartFeed::new().latest().is_none());
    }

    #[test]
    fn replace_passes_bars_through_unmodified() {
        let feed = ChartFeed::new();
        // Out of order on purpose: no validation or sorting happens here.
        let bars = vec![bar(2, 10.0), bar(1, 11.0)];
        feed.replace(bars.clone());
        assert_eq!(feed.latest().as_deref(), Some(&bars));
        assert_eq!(ChartFeed::closes(&bars), vec![10.0, 11.0]);
    }

    #[test]
    fn empty_replace_clears() {
        let feed = ChartFeed::new();
        feed.replace(vec![bar(1, 1.0)]);
        feed.replace(Vec::new());
        assert!(feed.latest().is_none());
    }
}
