// =============================================================================
// Market Clock — exchange-local time and the regular trading session
// =============================================================================
//
// The instrument trades Monday–Friday, 08:45–13:45 exchange-local (inclusive
// at both ends, minute resolution). The clock is a fixed UTC offset so that
// the derivation does not depend on the host's timezone.
// =============================================================================

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc, Weekday};

use crate::runtime_config::HubConfig;

/// Exchange-local clock plus session bounds.
#[derive(Debug, Clone, Copy)]
pub struct MarketClock {
    offset: FixedOffset,
    open_hhmm: u32,
    close_hhmm: u32,
}

impl MarketClock {
    /// Clock for `offset` with a session of `[open_hhmm, close_hhmm]`.
    pub fn new(offset: FixedOffset, open_hhmm: u32, close_hhmm: u32) -> Self {
        Self {
            offset,
            open_hhmm,
            close_hhmm,
        }
    }

    /// Build from config. An out-of-range offset falls back to UTC+8.
    pub fn from_config(config: &HubConfig) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).unwrap_or_else(|| {
            tracing::warn!(
                utc_offset_minutes = config.utc_offset_minutes,
                "invalid UTC offset — using +08:00"
            );
            taipei()
        });
        Self::new(offset, config.session_open_hhmm, config.session_close_hhmm)
    }

    /// Current exchange-local time.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    /// Weekday and HHMM within the session bounds.
    pub fn is_market_open(&self, at: DateTime<FixedOffset>) -> bool {
        let local = at.with_timezone(&self.offset);
        let is_weekday = !matches!(local.weekday(), Weekday::Sat | Weekday::Sun);
        let hhmm = local.hour() * 100 + local.minute();
        is_weekday && (self.open_hhmm..=self.close_hhmm).contains(&hhmm)
    }

    /// Request date for the upstream body, `YYYYMMDD`.
    pub fn trade_date(&self, at: DateTime<FixedOffset>) -> String {
        at.with_timezone(&self.offset).format("%Y%m%d").to_string()
    }
}

impl Default for MarketClock {
    fn default() -> Self {
        Self::new(taipei(), 845, 1345)
    }
}

fn taipei() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn saturday_is_closed() {
        let clock = MarketClock::default();
        // 2025-02-15 is a Saturday.
        assert!(!clock.is_market_open(at("2025-02-15T09:00:00+08:00")));
        assert!(!clock.is_market_open(at("2025-02-15T00:00:00+08:00")));
        assert!(!clock.is_market_open(at("2025-02-15T13:00:00+08:00")));
    }

    #[test]
    fn wednesday_morning_is_open() {
        // 2025-02-12 is a Wednesday.
        assert!(MarketClock::default().is_market_open(at("2025-02-12T09:00:00+08:00")));
    }

    #[test]
    fn wednesday_afternoon_is_closed() {
        assert!(!MarketClock::default().is_market_open(at("2025-02-12T14:00:00+08:00")));
    }

    #[test]
    fn session_bounds_are_inclusive() {
        let clock = MarketClock::default();
        assert!(clock.is_market_open(at("2025-02-12T08:45:00+08:00")));
        assert!(clock.is_market_open(at("2025-02-12T13:45:59+08:00")));
        assert!(!clock.is_market_open(at("2025-02-12T08:44:59+08:00")));
        assert!(!clock.is_market_open(at("2025-02-12T13:46:00+08:00")));
    }

    #[test]
    fn evaluates_in_exchange_time_not_input_offset() {
        // 01:00 UTC Wednesday == 09:00 Taipei.
        assert!(MarketClock::default().is_market_open(at("2025-02-12T01:00:00+00:00")));
    }

    #[test]
    fn trade_date_uses_exchange_date() {
        // 23:30 UTC Tuesday is already Wednesday in Taipei.
        let clock = MarketClock::default();
        assert_eq!(clock.trade_date(at("2025-02-11T23:30:00+00:00")), "20250212");
    }
}
