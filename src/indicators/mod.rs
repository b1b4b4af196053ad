// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator calculations feeding the signal engine.
// Every public function returns `Result<_, IndicatorError>` so the caller has
// to decide what too-short input means; the signal engine maps it to HOLD.

pub mod moving_average;
pub mod rsi;
pub mod window;

pub use moving_average::{moving_average, trailing_average};
pub use rsi::{rsi, RSI_WINDOW};
pub use window::IndicatorWindow;
