// =============================================================================
// Signal Pipeline
// =============================================================================

pub mod engine;

pub use engine::{evaluate, evaluate_history, HOLD_REASON};
