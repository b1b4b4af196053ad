// =============================================================================
// Signal Engine — ordered rule table with first-strong-wins tie-break
// =============================================================================
//
// Every rule is evaluated against the same IndicatorWindow. Resolution is a
// two-pass scan over the matches, in table order:
//
//   1. the first matching rule whose strength is `strong`;
//   2. otherwise the first matching rule of any strength;
//   3. no match => HOLD / moderate.
//
// ENTRY and EXIT rules are never voted against each other. A strong rule of
// either side beats a moderate rule that sits earlier in the table.
// =============================================================================

use chrono::{DateTime, FixedOffset};

use crate::indicators::IndicatorWindow;
use crate::types::{Signal, SignalStrength, SignalType};

/// Reason attached to HOLD.
pub const HOLD_REASON: &str = "no clear entry or exit signal";

/// Volume multiple that counts as a surge on a rising bar.
const ENTRY_VOLUME_SURGE: f64 = 1.5;
/// Volume multiple that confirms a break below the short average.
const EXIT_VOLUME_CONFIRM: f64 = 1.3;
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;

/// One row of the rule table.
struct Rule {
    kind: SignalType,
    strength: SignalStrength,
    reason: &'static str,
    predicate: fn(&IndicatorWindow) -> bool,
}

const RULES: [Rule; 6] = [
    Rule {
        kind: SignalType::Entry,
        strength: SignalStrength::Strong,
        reason: "breakout above 20-period average with rising 5-period average",
        predicate: |w| w.price > w.ma20 && w.ma5 > w.ma20 && w.rsi < RSI_OVERBOUGHT,
    },
    Rule {
        kind: SignalType::Entry,
        strength: SignalStrength::Strong,
        reason: "price rise with volume surge",
        predicate: |w| w.price > w.prev_price && w.volume > w.avg_volume * ENTRY_VOLUME_SURGE,
    },
    Rule {
        kind: SignalType::Entry,
        strength: SignalStrength::Moderate,
        reason: "oversold rebound above 5-period average",
        predicate: |w| w.rsi < RSI_OVERSOLD && w.price > w.ma5,
    },
    Rule {
        kind: SignalType::Exit,
        strength: SignalStrength::Strong,
        reason: "breakdown below 20-period average with falling 5-period average",
        predicate: |w| w.price < w.ma20 && w.ma5 < w.ma20,
    },
    Rule {
        kind: SignalType::Exit,
        strength: SignalStrength::Strong,
        reason: "overbought reversal",
        predicate: |w| w.rsi > RSI_OVERBOUGHT && w.price < w.prev_price,
    },
    Rule {
        kind: SignalType::Exit,
        strength: SignalStrength::Moderate,
        reason: "breakdown below 5-period average with volume",
        predicate: |w| w.price < w.ma5 && w.volume > w.avg_volume * EXIT_VOLUME_CONFIRM,
    },
];

/// Classify `window`, stamping the result with `at`.
pub fn evaluate(window: &IndicatorWindow, at: DateTime<FixedOffset>) -> Signal {
    let matched: Vec<&Rule> = RULES.iter().filter(|r| (r.predicate)(window)).collect();

    let selected = matched
        .iter()
        .find(|r| r.strength == SignalStrength::Strong)
        .or_else(|| matched.first());

    match selected {
        Some(rule) => Signal {
            kind: rule.kind,
            strength: rule.strength,
            reason: rule.reason.to_string(),
            timestamp: at,
        },
        None => hold(at),
    }
}

/// Build the window from raw history and classify it.
///
/// Too-short history yields HOLD instead of an error.
pub fn evaluate_history(closes: &[f64], volumes: &[f64], at: DateTime<FixedOffset>) -> Signal {
    match IndicatorWindow::from_history(closes, volumes) {
        Ok(window) => evaluate(&window, at),
        Err(e) => {
            tracing::debug!(error = %e, "indicator window unavailable — holding");
            hold(at)
        }
    }
}

fn hold(at: DateTime<FixedOffset>) -> Signal {
    Signal {
        kind: SignalType::Hold,
        strength: SignalStrength::Moderate,
        reason: HOLD_REASON.to_string(),
        timestamp: at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-02-12T09:00:00+08:00").unwrap()
    }

    /// A window that trips none of the six predicates.
    fn neutral() -> IndicatorWindow {
        IndicatorWindow {
            price: 100.0,
            prev_price: 100.0,
            ma5: 100.0,
            ma20: 100.0,
            rsi: 50.0,
            volume: 10.0,
            avg_volume: 10.0,
        }
    }

    #[test]
    fn no_match_is_hold_moderate() {
        let s = evaluate(&neutral(), at());
        assert_eq!(s.kind, SignalType::Hold);
        assert_eq!(s.strength, SignalStrength::Moderate);
        assert_eq!(s.reason, HOLD_REASON);
        assert_eq!(s.timestamp, at());
    }

    #[test]
    fn breakout_above_ma20() {
        let w = IndicatorWindow {
            price: 105.0,
            ma5: 103.0,
            ma20: 100.0,
            rsi: 60.0,
            ..neutral()
        };
        let s = evaluate(&w, at());
        assert_eq!(s.kind, SignalType::Entry);
        assert_eq!(s.strength, SignalStrength::Strong);
        assert!(s.reason.starts_with("breakout"));
    }

    #[test]
    fn volume_surge_entry() {
        let w = IndicatorWindow {
            price: 101.0,
            prev_price: 100.0,
            ma5: 101.0,
            ma20: 101.0,
            volume: 16.0,
            ..neutral()
        };
        let s = evaluate(&w, at());
        assert_eq!(s.kind, SignalType::Entry);
        assert_eq!(s.reason, "price rise with volume surge");
    }

    #[test]
    fn oversold_rebound_is_moderate_entry() {
        let w = IndicatorWindow {
            price: 100.0,
            prev_price: 100.0,
            ma5: 99.0,
            ma20: 100.0,
            rsi: 20.0,
            ..neutral()
        };
        let s = evaluate(&w, at());
        assert_eq!(s.kind, SignalType::Entry);
        assert_eq!(s.strength, SignalStrength::Moderate);
    }

    #[test]
    fn breakdown_below_ma20_is_strong_exit() {
        let w = IndicatorWindow {
            price: 95.0,
            ma5: 97.0,
            ma20: 100.0,
            ..neutral()
        };
        let s = evaluate(&w, at());
        assert_eq!(s.kind, SignalType::Exit);
        assert_eq!(s.strength, SignalStrength::Strong);
    }

    #[test]
    fn overbought_reversal_is_strong_exit() {
        let w = IndicatorWindow {
            price: 100.0,
            prev_price: 101.0,
            rsi: 80.0,
            ..neutral()
        };
        let s = evaluate(&w, at());
        assert_eq!(s.kind, SignalType::Exit);
        assert_eq!(s.reason, "overbought reversal");
    }

    #[test]
    fn strong_entry_beats_moderate_exit() {
        // ENTRY/strong (volume surge) and EXIT/moderate (below ma5 with volume)
        // both hold.
        let w = IndicatorWindow {
            price: 101.0,
            prev_price: 100.0,
            ma5: 102.0,
            ma20: 102.0,
            rsi: 50.0,
            volume: 20.0,
            avg_volume: 10.0,
        };
        let s = evaluate(&w, at());
        assert_eq!(s.kind, SignalType::Entry);
        assert_eq!(s.strength, SignalStrength::Strong);
        assert_eq!(s.reason, "price rise with volume surge");
    }

    #[test]
    fn strong_exit_beats_earlier_moderate_entry() {
        // ENTRY/moderate (oversold above ma5) sits before EXIT/strong
        // (below ma20 with falling ma5); a naive first-match scan would pick
        // the entry.
        let w = IndicatorWindow {
            price: 96.0,
            prev_price: 96.0,
            ma5: 95.0,
            ma20: 100.0,
            rsi: 20.0,
            volume: 10.0,
            avg_volume: 10.0,
        };
        let s = evaluate(&w, at());
        assert_eq!(s.kind, SignalType::Exit);
        assert_eq!(s.strength, SignalStrength::Strong);
    }

    #[test]
    fn lone_moderate_exit_is_selected() {
        let w = IndicatorWindow {
            price: 99.0,
            prev_price: 99.0,
            ma5: 100.0,
            ma20: 99.0,
            rsi: 50.0,
            volume: 14.0,
            avg_volume: 10.0,
        };
        let s = evaluate(&w, at());
        assert_eq!(s.kind, SignalType::Exit);
        assert_eq!(s.strength, SignalStrength::Moderate);
    }

    #[test]
    fn short_history_holds() {
        let s = evaluate_history(&[100.0], &[1.0], at());
        assert_eq!(s.kind, SignalType::Hold);
        assert_eq!(s.strength, SignalStrength::Moderate);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let closes: Vec<f64> = (1..=30).map(|x| 100.0 + (x as f64).sin()).collect();
        let volumes = vec![10.0; 30];
        assert_eq!(
            evaluate_history(&closes, &volumes, at()),
            evaluate_history(&closes, &volumes, at())
        );
    }
}
