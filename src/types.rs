// =============================================================================
// Shared types used across the quote hub
// =============================================================================

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Reported in place of `changePercent` when it cannot be computed.
pub const CHANGE_PERCENT_UNDEFINED: &str = "N/A";

/// One OHLCV bar from the external chart source. Passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartBar {
    /// Bar open time, unix seconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Direction of a trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Entry,
    Exit,
    Hold,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry => write!(f, "ENTRY"),
            Self::Exit => write!(f, "EXIT"),
            Self::Hold => write!(f, "HOLD"),
        }
    }
}

/// Confidence ranking attached to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Strong,
    Moderate,
    Weak,
}

/// Classification produced by the signal engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub kind: SignalType,
    pub strength: SignalStrength,
    pub reason: String,
    pub timestamp: DateTime<FixedOffset>,
}

/// Quote state pushed to every subscriber on each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub price: String,
    pub change: String,
    pub change_percent: String,
    pub volume: String,
    pub update_time: DateTime<FixedOffset>,
    pub is_market_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<Vec<ChartBar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,
}

impl Snapshot {
    /// Cold-start value served when no fetch has ever succeeded.
    pub fn sentinel(now: DateTime<FixedOffset>) -> Self {
        Self {
            price: "---".to_string(),
            change: "0".to_string(),
            change_percent: "0".to_string(),
            volume: "0".to_string(),
            update_time: now,
            is_market_open: false,
            chart_data: None,
            signal: None,
        }
    }
}

/// `change / (price - change) * 100` rounded to two decimals.
///
/// Returns [`CHANGE_PERCENT_UNDEFINED`] when either input is not numeric or
/// the previous close (`price - change`) is zero.
pub fn change_percent(price: &str, change: &str) -> String {
    let (Ok(price), Ok(change)) = (price.trim().parse::<f64>(), change.trim().parse::<f64>())
    else {
        return CHANGE_PERCENT_UNDEFINED.to_string();
    };

    let prev_close = price - change;
    if prev_close == 0.0 {
        return CHANGE_PERCENT_UNDEFINED.to_string();
    }

    let pct = change / prev_close * 100.0;
    if !pct.is_finite() {
        return CHANGE_PERCENT_UNDEFINED.to_string();
    }

    let rounded = (pct * 100.0).round() / 100.0;
    // Avoid "-0.00".
    if rounded == 0.0 {
        return "0.00".to_string();
    }
    format!("{rounded:.2}")
}

/// Messages a subscriber may send to the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Ping,
}

/// Control messages the hub sends besides snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taipei_now() -> DateTime<FixedOffset> {
        chrono::Utc::now().with_timezone(&FixedOffset::east_opt(8 * 3600).unwrap())
    }

    #[test]
    fn change_percent_rounds_to_two_decimals() {
        assert_eq!(change_percent("18000", "50"), "0.28");
    }

    #[test]
    fn change_percent_negative_change() {
        // -100 / 18100 * 100 = -0.5524...
        assert_eq!(change_percent("18000", "-100"), "-0.55");
    }

    #[test]
    fn change_percent_zero_denominator_is_sentinel() {
        assert_eq!(change_percent("50", "50"), CHANGE_PERCENT_UNDEFINED);
    }

    #[test]
    fn change_percent_non_numeric_is_sentinel() {
        assert_eq!(change_percent("---", "0"), CHANGE_PERCENT_UNDEFINED);
    }

    #[test]
    fn change_percent_zero_change() {
        assert_eq!(change_percent("18000", "0"), "0.00");
    }

    #[test]
    fn snapshot_serialises_camel_case_and_omits_empty_optionals() {
        let snap = Snapshot::sentinel(taipei_now());
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["price"], "---");
        assert_eq!(json["changePercent"], "0");
        assert_eq!(json["isMarketOpen"], false);
        assert!(json.get("updateTime").is_some());
        assert!(json.get("chartData").is_none());
        assert!(json.get("signal").is_none());
    }

    #[test]
    fn signal_serialises_with_type_tag() {
        let signal = Signal {
            kind: SignalType::Entry,
            strength: SignalStrength::Strong,
            reason: "x".into(),
            timestamp: taipei_now(),
        };
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["type"], "ENTRY");
        assert_eq!(json["strength"], "strong");
    }

    #[test]
    fn client_ping_parses_and_unknown_fails() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn client_ping_serialises_as_sent_by_subscribers() {
        let json = serde_json::to_string(&ClientMessage::Ping).unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);
    }

    #[test]
    fn pong_serialises() {
        let json = serde_json::to_string(&ControlMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }
}
