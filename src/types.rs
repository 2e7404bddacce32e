// =============================================================================
// Shared types used across the TradeTide signal engine
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trading action recommended by the signal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Default for Action {
    fn default() -> Self {
        Self::Hold
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::Hold => write!(f, "HOLD"),
        }
    }
}

/// Whether rates come from the live HTTP API or the synthetic generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceMode {
    Demo,
    Live,
}

impl Default for SourceMode {
    fn default() -> Self {
        Self::Demo
    }
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Demo => write!(f, "Demo"),
            Self::Live => write!(f, "Live"),
        }
    }
}

/// A single OHLCV sample from the price window. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Indicator values computed over the trailing close window.
///
/// `None` means the window was too short for that indicator — callers must
/// skip the factor rather than treat it as an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub sma_5: Option<f64>,
    pub sma_10: Option<f64>,
    pub sma_20: Option<f64>,
    pub rsi_14: Option<f64>,
    /// Percentage change of the latest close vs the previous one.
    pub change_pct: f64,
    /// Number of closes the indicators were computed from.
    pub samples: usize,
}

/// A scored trading recommendation. Created once per analysis run and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub pair: String,
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    /// Heuristic signal strength in [0, 100] — not a probability.
    pub confidence: f64,
    pub current_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub reasoning: String,
    pub indicators: IndicatorSet,
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serialises_uppercase() {
        assert_eq!(serde_json::to_string(&Action::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&Action::Sell).unwrap(), "\"SELL\"");
        assert_eq!(serde_json::to_string(&Action::Hold).unwrap(), "\"HOLD\"");
    }

    #[test]
    fn action_roundtrip() {
        let a: Action = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(a, Action::Sell);
        assert_eq!(a.to_string(), "SELL");
    }

    #[test]
    fn source_mode_defaults_to_demo() {
        assert_eq!(SourceMode::default(), SourceMode::Demo);
    }
}
