// =============================================================================
// Simple Moving Average
// =============================================================================
//
// Arithmetic mean of the supplied series. Callers slice the tail they want
// (e.g. the last 5 or 20 closes) before calling.
// =============================================================================

use crate::error::IndicatorError;

/// Arithmetic mean of `series`.
///
/// # Errors
/// `InsufficientData` when `series` is empty.
pub fn moving_average(series: &[f64]) -> Result<f64, IndicatorError> {
    if series.is_empty() {
        return Err(IndicatorError::InsufficientData {
            required: 1,
            available: 0,
        });
    }
    Ok(series.iter().sum::<f64>() / series.len() as f64)
}

/// Mean of the last `period` values, or of all of them when fewer exist.
pub fn trailing_average(series: &[f64], period: usize) -> Result<f64, IndicatorError> {
    let start = series.len().saturating_sub(period);
    moving_average(&series[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_is_insufficient() {
        assert_eq!(
            moving_average(&[]),
            Err(IndicatorError::InsufficientData {
                required: 1,
                available: 0
            })
        );
    }

    #[test]
    fn constant_series_averages_to_itself() {
        for c in [0.0, 1.5, 18_000.0, -42.25] {
            let series = vec![c; 20];
            let ma = moving_average(&series).unwrap();
            assert!((ma - c).abs() < 1e-9, "expected {c}, got {ma}");
        }
    }

    #[test]
    fn simple_mean() {
        let ma = moving_average(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((ma - 2.5).abs() < 1e-12);
    }

    #[test]
    fn trailing_uses_only_tail() {
        let series = [100.0, 100.0, 1.0, 2.0, 3.0];
        let ma = trailing_average(&series, 3).unwrap();
        assert!((ma - 2.0).abs() < 1e-12);
    }

    #[test]
    fn trailing_with_short_series_uses_everything() {
        let ma = trailing_average(&[2.0, 4.0], 20).unwrap();
        assert!((ma - 3.0).abs() < 1e-12);
    }
}
