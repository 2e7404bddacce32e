// =============================================================================
// Runtime Configuration — engine settings with atomic save
// =============================================================================
//
// Central configuration hub for the TradeTide signal engine. Every tunable
// parameter lives here so the engine can be reconfigured without a rebuild.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields never
// breaks loading an older config file.
//
// The alert policy deserves a note: the product went through several
// notification-gate iterations with different thresholds (minimum confidence
// 70/75/85 %, cooldowns from 30 minutes to 8 hours). Rather than hard-coding
// one of them, every threshold is a field here; the defaults are the
// strictest combination that shipped.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::SourceMode;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_pair() -> String {
    "EURUSD".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_history_days() -> usize {
    30
}

fn default_analysis_interval_secs() -> u64 {
    30
}

fn default_target_check_interval_secs() -> u64 {
    300
}

fn default_volatility_pct() -> f64 {
    0.5
}

fn default_min_confidence() -> f64 {
    85.0
}

fn default_min_profit_pct() -> f64 {
    0.5
}

fn default_cooldown_secs() -> u64 {
    8 * 60 * 60
}

fn default_dedupe_window_secs() -> u64 {
    24 * 60 * 60
}

fn default_history_cap() -> usize {
    50
}

// =============================================================================
// AlertPolicy
// =============================================================================

/// Thresholds applied by the alert center before a recommendation is allowed
/// to surface as a user-facing alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPolicy {
    /// Minimum recommendation confidence (0-100) to alert on.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Minimum absolute percentage gap between target and current price.
    #[serde(default = "default_min_profit_pct")]
    pub min_profit_pct: f64,

    /// Minimum time between any two alerts, regardless of pair/action.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Window during which a repeat alert for the same pair+action is
    /// suppressed.
    #[serde(default = "default_dedupe_window_secs")]
    pub dedupe_window_secs: u64,

    /// Maximum number of stored alerts; oldest entries are dropped beyond it.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            min_profit_pct: default_min_profit_pct(),
            cooldown_secs: default_cooldown_secs(),
            dedupe_window_secs: default_dedupe_window_secs(),
            history_cap: default_history_cap(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the TradeTide engine.
///
/// Every field has a serde default so that older JSON files missing new
/// fields will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Instrument & source -------------------------------------------------

    /// The currency pair the engine analyses (single-pair by design).
    #[serde(default = "default_pair")]
    pub pair: String,

    /// Demo (synthetic random walk) or Live (exchange-rate HTTP API).
    #[serde(default)]
    pub source_mode: SourceMode,

    // --- Windows & cadence ---------------------------------------------------

    /// Size of the trailing close window, in daily samples.
    #[serde(default = "default_history_days")]
    pub history_days: usize,

    /// Seconds between automatic analysis runs.
    #[serde(default = "default_analysis_interval_secs")]
    pub analysis_interval_secs: u64,

    /// Seconds between target-reached sweeps over the alert history.
    #[serde(default = "default_target_check_interval_secs")]
    pub target_check_interval_secs: u64,

    // --- Signal parameters ---------------------------------------------------

    /// Volatility constant (percent) used for target/stop offsets:
    /// target = ±2×vol, stop = ∓1×vol around the current price.
    #[serde(default = "default_volatility_pct")]
    pub volatility_pct: f64,

    // --- Alerting ------------------------------------------------------------

    /// Notification gate thresholds.
    #[serde(default)]
    pub alert_policy: AlertPolicy,

    // --- Server & storage ----------------------------------------------------

    /// Address the REST API binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Directory for the JSON-file stores.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pair: default_pair(),
            source_mode: SourceMode::Demo,
            history_days: default_history_days(),
            analysis_interval_secs: default_analysis_interval_secs(),
            target_check_interval_secs: default_target_check_interval_secs(),
            volatility_pct: default_volatility_pct(),
            alert_policy: AlertPolicy::default(),
            bind_addr: default_bind_addr(),
            data_dir: default_data_dir(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            pair = %config.pair,
            source_mode = %config.source_mode,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}
