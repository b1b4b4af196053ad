// =============================================================================
// Quote Fetcher — one upstream call, normalised, with last-known-good fallback
// =============================================================================
//
// `fetch()` never fails:
//   - success  => fresh Snapshot, cached as the last known good value.
//   - failure  => cached Snapshot with `updateTime` refreshed, or the
//                 cold-start sentinel when nothing was ever cached.
//
// The cache is written only here, after a successful fetch, and read only as
// the fallback.
// =============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::market_hours::MarketClock;
use super::upstream::{QuoteRecord, QuoteSource};
use crate::error::FetchError;
use crate::types::{change_percent, Snapshot};

/// Stateful wrapper around a [`QuoteSource`].
pub struct QuoteFetcher {
    source: Arc<dyn QuoteSource>,
    clock: MarketClock,
    last_known: RwLock<Option<Snapshot>>,
}

impl QuoteFetcher {
    pub fn new(source: Arc<dyn QuoteSource>, clock: MarketClock) -> Self {
        Self {
            source,
            clock,
            last_known: RwLock::new(None),
        }
    }

    pub fn clock(&self) -> &MarketClock {
        &self.clock
    }

    /// Best-effort snapshot. See module docs for the failure policy.
    pub async fn fetch(&self) -> Snapshot {
        let now = self.clock.now();
        let date = self.clock.trade_date(now);

        match self.source.fetch_record(&date).await {
            Ok(record) => {
                let snapshot = self.normalise(record, now);
                debug!(price = %snapshot.price, change = %snapshot.change, "quote fetched");
                *self.last_known.write() = Some(snapshot.clone());
                snapshot
            }
            Err(e) => self.fallback(&e, now),
        }
    }

    /// The cached last-known-good snapshot, if any.
    pub fn last_known(&self) -> Option<Snapshot> {
        self.last_known.read().clone()
    }

    fn fallback(&self, error: &FetchError, now: chrono::DateTime<chrono::FixedOffset>) -> Snapshot {
        match self.last_known.read().as_ref() {
            Some(cached) => {
                warn!(error = %error, "quote fetch failed — serving last known snapshot");
                Snapshot {
                    update_time: now,
                    ..cached.clone()
                }
            }
            None => {
                warn!(error = %error, "quote fetch failed with no cached snapshot — serving sentinel");
                Snapshot::sentinel(now)
            }
        }
    }

    fn normalise(&self, record: QuoteRecord, now: chrono::DateTime<chrono::FixedOffset>) -> Snapshot {
        debug!(
            open = record.open_price.as_deref().unwrap_or("-"),
            high = record.high_price.as_deref().unwrap_or("-"),
            low = record.low_price.as_deref().unwrap_or("-"),
            "session range"
        );
        let price = non_empty(record.last_price).unwrap_or_else(|| "---".to_string());
        let change = non_empty(record.diff).unwrap_or_else(|| "0".to_string());
        let volume = non_empty(record.total_volume).unwrap_or_else(|| "0".to_string());

        Snapshot {
            change_percent: change_percent(&price, &change),
            price,
            change,
            volume,
            update_time: now,
            is_market_open: self.clock.is_market_open(now),
            chart_data: None,
            signal: None,
        }
    }
}

/// Upstream sends empty strings for missing values as often as it omits them.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Scripted source: pops one result per call, repeats the last forever.
    pub(crate) struct ScriptedSource {
        script: Mutex<VecDeque<Result<QuoteRecord, FetchError>>>,
        pub(crate) calls: std::sync::atomic::AtomicUsize,
    }

    impl ScriptedSource {
        pub(crate) fn new(script: Vec<Result<QuoteRecord, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: std::sync::atomic::AtomicUsize::new(0),
            }
        }

        pub(crate) fn always(price: &str) -> Self {
            Self::new(vec![Ok(record(price, "50", "1000"))])
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteSource for ScriptedSource {
        async fn fetch_record(&self, _date: &str) -> Result<QuoteRecord, FetchError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let mut script = self.script.lock();
            if script.len() > 1 {
                script.pop_front().unwrap_or_else(|| Err(FetchError::UpstreamUnavailable("empty".into())))
            } else {
                match script.front() {
                    Some(Ok(r)) => Ok(r.clone()),
                    Some(Err(e)) => Err(FetchError::UpstreamUnavailable(e.to_string())),
                    None => Err(FetchError::UpstreamUnavailable("empty script".into())),
                }
            }
        }
    }

    pub(crate) fn record(price: &str, diff: &str, volume: &str) -> QuoteRecord {
        QuoteRecord {
            symbol_id: "TXFB5-F".into(),
            last_price: Some(price.into()),
            diff: Some(diff.into()),
            total_volume: Some(volume.into()),
            ..QuoteRecord::default()
        }
    }

    fn fetcher(script: Vec<Result<QuoteRecord, FetchError>>) -> QuoteFetcher {
        QuoteFetcher::new(Arc::new(ScriptedSource::new(script)), MarketClock::default())
    }

    fn non_2xx() -> FetchError {
        FetchError::UpstreamUnavailable("quote list returned 503 Service Unavailable".into())
    }

    #[tokio::test]
    async fn success_builds_snapshot_and_caches_it() {
        let f = fetcher(vec![Ok(record("18000", "50", "123456"))]);
        let snap = f.fetch().await;
        assert_eq!(snap.price, "18000");
        assert_eq!(snap.change, "50");
        assert_eq!(snap.change_percent, "0.28");
        assert_eq!(snap.volume, "123456");
        assert_eq!(f.last_known(), Some(snap));
    }

    #[tokio::test]
    async fn absent_fields_use_defaults() {
        let f = fetcher(vec![Ok(QuoteRecord {
            symbol_id: "TXFB5-F".into(),
            last_price: Some(String::new()),
            ..QuoteRecord::default()
        })]);
        let snap = f.fetch().await;
        assert_eq!(snap.price, "---");
        assert_eq!(snap.change, "0");
        assert_eq!(snap.volume, "0");
    }

    #[tokio::test]
    async fn failure_after_success_serves_cached_with_new_timestamp() {
        let f = fetcher(vec![Ok(record("18000", "50", "1000")), Err(non_2xx())]);
        let first = f.fetch().await;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = f.fetch().await;

        assert!(second.update_time > first.update_time);
        assert_eq!(
            Snapshot {
                update_time: first.update_time,
                ..second
            },
            first
        );
    }

    #[tokio::test]
    async fn cold_start_failure_serves_sentinel() {
        let f = fetcher(vec![Err(FetchError::NoMatchingRecord {
            symbol_id: "TXFB5-F".into(),
        })]);
        let snap = f.fetch().await;
        assert_eq!(snap.price, "---");
        assert_eq!(snap.change, "0");
        assert_eq!(snap.volume, "0");
        assert!(!snap.is_market_open);
        assert!(f.last_known().is_none());
    }

    #[tokio::test]
    async fn failure_does_not_overwrite_cache() {
        let f = fetcher(vec![
            Ok(record("18000", "50", "1000")),
            Err(non_2xx()),
            Err(non_2xx()),
        ]);
        let first = f.fetch().await;
        f.fetch().await;
        f.fetch().await;
        assert_eq!(f.last_known(), Some(first));
    }
}
