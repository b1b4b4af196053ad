// =============================================================================
// Indicator Window — per-cycle input to the signal engine
// =============================================================================

use serde::Serialize;

use super::moving_average::trailing_average;
use super::rsi::{rsi, RSI_WINDOW};
use crate::error::IndicatorError;

const SHORT_MA_PERIOD: usize = 5;
const LONG_MA_PERIOD: usize = 20;
const VOLUME_AVG_PERIOD: usize = 5;

/// Snapshot of the indicators the rule table looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorWindow {
    pub price: f64,
    pub prev_price: f64,
    pub ma5: f64,
    pub ma20: f64,
    /// 0–100.
    pub rsi: f64,
    pub volume: f64,
    pub avg_volume: f64,
}

impl IndicatorWindow {
    /// Derive the window from a rolling close/volume history (oldest first).
    ///
    /// Shorter histories than the nominal periods use whatever is there.
    ///
    /// # Errors
    /// `InsufficientData` with fewer than two closes or no volumes.
    pub fn from_history(closes: &[f64], volumes: &[f64]) -> Result<Self, IndicatorError> {
        if closes.len() < 2 {
            return Err(IndicatorError::InsufficientData {
                required: 2,
                available: closes.len(),
            });
        }
        let volume = *volumes.last().ok_or(IndicatorError::InsufficientData {
            required: 1,
            available: 0,
        })?;

        Ok(Self {
            price: closes[closes.len() - 1],
            prev_price: closes[closes.len() - 2],
            ma5: trailing_average(closes, SHORT_MA_PERIOD)?,
            ma20: trailing_average(closes, LONG_MA_PERIOD)?,
            rsi: rsi(closes, RSI_WINDOW)?,
            volume,
            avg_volume: trailing_average(volumes, VOLUME_AVG_PERIOD)?,
        })
    }
}
