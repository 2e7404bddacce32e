// =============================================================================
// Central Application State — TradeTide Signal Engine
// =============================================================================
//
// The single source of truth shared by the background loops and the REST
// API. Subsystems manage their own interior mutability; AppState ties them
// together and provides a unified snapshot for `GET /api/v1/state`.
//
// Thread safety:
//   - An atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for mutable shared collections.
//   - Arc wrappers for subsystems with their own locks.
// =============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::alerts::AlertCenter;
use crate::market_data::PriceWindow;
use crate::runtime_config::{AlertPolicy, RuntimeConfig};
use crate::storage::{AlertStore, DailyStore};
use crate::types::Recommendation;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;
/// Maximum number of recent recommendations to retain.
const MAX_RECENT_RECOMMENDATIONS: usize = 100;

/// A recorded error event for the state snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    /// Monotonically increasing version counter, incremented on every
    /// meaningful state mutation.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    // ── Market data ─────────────────────────────────────────────────────
    pub price_window: Arc<PriceWindow>,

    // ── Alerting ────────────────────────────────────────────────────────
    pub alert_center: Arc<AlertCenter>,

    // ── Persistence ─────────────────────────────────────────────────────
    pub daily_store: Arc<DailyStore>,
    pub alert_store: Arc<AlertStore>,

    // ── Recommendations ─────────────────────────────────────────────────
    pub recent_recommendations: RwLock<VecDeque<Recommendation>>,
    pub last_recommendation: RwLock<Option<Recommendation>>,

    // ── Error log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct the state from configuration and opened stores. The
    /// returned value is typically wrapped in `Arc` immediately.
    pub fn new(config: RuntimeConfig, daily_store: DailyStore, alert_store: AlertStore) -> Self {
        let price_window = Arc::new(PriceWindow::new(config.history_days));
        let alert_center = Arc::new(AlertCenter::new(config.alert_policy.clone()));

        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            price_window,
            alert_center,
            daily_store: Arc::new(daily_store),
            alert_store: Arc::new(alert_store),
            recent_recommendations: RwLock::new(VecDeque::new()),
            last_recommendation: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version management ──────────────────────────────────────────────

    /// Atomically increment the state version.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error logging ───────────────────────────────────────────────────

    /// Record an error message. The ring is capped at [`MAX_RECENT_ERRORS`];
    /// oldest entries are evicted beyond the limit.
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }

    // ── Recommendations ─────────────────────────────────────────────────

    /// Record a freshly generated recommendation. The ring is capped at
    /// [`MAX_RECENT_RECOMMENDATIONS`].
    pub fn record_recommendation(&self, rec: Recommendation) {
        {
            let mut recent = self.recent_recommendations.write();
            recent.push_front(rec.clone());
            recent.truncate(MAX_RECENT_RECOMMENDATIONS);
        }
        *self.last_recommendation.write() = Some(rec);
        self.increment_version();
    }

    // ── Alert persistence ───────────────────────────────────────────────

    /// Persist the alert history, best-effort: a failed write is logged and
    /// recorded but never propagated — gating decisions must not block on
    /// storage.
    pub fn persist_alerts(&self) {
        let alerts = self.alert_center.alerts();
        if let Err(e) = self.alert_store.save(&alerts) {
            tracing::warn!(error = %e, "alert store writeback failed — continuing");
            self.push_error(format!("alert store writeback failed: {e}"));
        }
    }

    // ── Snapshot builder ────────────────────────────────────────────────

    /// Build a complete, serialisable snapshot of the engine state — the
    /// payload for `GET /api/v1/state`.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let config = self.runtime_config.read();
        let alerts = self.alert_center.alerts();

        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: Utc::now().timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            pair: config.pair.clone(),
            source_mode: config.source_mode.to_string(),
            analysis_interval_secs: config.analysis_interval_secs,
            target_check_interval_secs: config.target_check_interval_secs,
            window_samples: self.price_window.len(),
            daily_records: self.daily_store.len(),
            last_recommendation: self.last_recommendation.read().clone(),
            alert_policy: self.alert_center.policy(),
            alerts_total: alerts.len(),
            alerts_unread: self.alert_center.unread_count(),
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

// =============================================================================
// Serialisable snapshot
// =============================================================================

/// Full engine state snapshot for the dashboard / operator.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub pair: String,
    pub source_mode: String,
    pub analysis_interval_secs: u64,
    pub target_check_interval_secs: u64,
    pub window_samples: usize,
    pub daily_records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_recommendation: Option<Recommendation>,
    pub alert_policy: AlertPolicy,
    pub alerts_total: usize,
    pub alerts_unread: usize,
    pub recent_errors: Vec<ErrorRecord>,
}
