// =============================================================================
// Relative Strength Index (RSI) — simple averages
// =============================================================================
//
// Step 1 — Take the last `window` closes and compute successive deltas.
// Step 2 — mean_gain = sum of positive deltas / n, mean_loss = sum of |negative
//          deltas| / n, where n is the number of deltas.
// Step 3 — RS  = mean_gain / mean_loss
//          RSI = 100 - 100 / (1 + RS)
//
// A window with no down moves (flat or rising) reports 100.
//
// Thresholds:  RSI > 70 => OVERBOUGHT,  RSI < 30 => OVERSOLD.
// =============================================================================

use crate::error::IndicatorError;

/// Number of closes fed to the RSI by the signal pipeline (14 deltas).
pub const RSI_WINDOW: usize = 15;

/// Compute the RSI over the last `window` entries of `series`.
///
/// # Errors
/// `InsufficientData` when fewer than two entries are available, or when
/// `window < 2` (no delta can be formed).
pub fn rsi(series: &[f64], window: usize) -> Result<f64, IndicatorError> {
    if window < 2 || series.len() < 2 {
        return Err(IndicatorError::InsufficientData {
            required: 2,
            available: series.len().min(window),
        });
    }

    let start = series.len().saturating_sub(window);
    let tail = &series[start..];

    let (gains, losses) = tail.windows(2).fold((0.0_f64, 0.0_f64), |(g, l), w| {
        let delta = w[1] - w[0];
        if delta > 0.0 {
            (g + delta, l)
        } else {
            (g, l - delta)
        }
    });

    let n = (tail.len() - 1) as f64;
    let mean_gain = gains / n;
    let mean_loss = losses / n;

    if mean_loss == 0.0 {
        return Ok(100.0);
    }

    let rs = mean_gain / mean_loss;
    let value = 100.0 - 100.0 / (1.0 + rs);

    // Guard against float noise at the extremes.
    Ok(value.clamp(0.0, 100.0))
}
