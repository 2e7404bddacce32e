// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators used by the signal
// engine. Every public function returns `Option<f64>` so callers are forced
// to handle insufficient-data scenarios — a short window degrades the signal,
// it never errors.

pub mod rsi;
pub mod sma;

pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
