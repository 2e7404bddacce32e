// =============================================================================
// Signal Module
// =============================================================================
//
// Turns a trailing close window into a scored BUY/SELL/HOLD recommendation:
// - Stacked SMA trend reading (5/10/20)
// - RSI(14) overbought/oversold reading
// - Point-scored classification with a bounded confidence heuristic

pub mod engine;

pub use engine::SignalEngine;
