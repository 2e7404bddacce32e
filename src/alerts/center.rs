// =============================================================================
// Alert Center — confidence / profit / frequency / duplicate gating
// =============================================================================
//
// Every recommendation flows through `process`, which applies the gate rules
// in order and short-circuits on the first failure:
//
//   1. Already notified for this recommendation id
//   2. Confidence below the policy minimum
//   3. Target-vs-current gap below the minimum profit percentage
//   4. Global cooldown since the last alert not yet elapsed
//   5. A stored alert for the same pair+action inside the dedupe window
//
// Acceptance mutates all gate state under a single write lock: the stored
// alert is pushed newest-first (history trimmed to the policy cap), the id is
// recorded, the cooldown clock restarts, and the unread counter bumps. A
// second evaluation racing the first therefore cannot also pass the
// cooldown/dedupe checks.
//
// `check_target_reached` is the one-way companion sweep: once a stored
// alert's target has been crossed it stays crossed, whatever prices follow.
// =============================================================================

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::runtime_config::AlertPolicy;
use crate::types::{Action, Recommendation};

// =============================================================================
// Public types
// =============================================================================

/// An alert retained in the bounded history.
///
/// Two independent one-way state axes:
/// - `read`: flipped by the user via the API (Unread -> Read)
/// - `target_reached`: flipped by the periodic price sweep (Pending -> Reached)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAlert {
    pub id: String,
    pub pair: String,
    pub action: Action,
    pub current_price: f64,
    pub target_price: f64,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub potential_profit_pct: f64,
    pub read: bool,
    pub target_reached: bool,
}

/// What kind of user-facing event an artifact announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// A fresh opportunity passed the gate.
    Opportunity,
    /// A previously alerted target price has been crossed.
    TargetReached,
}

/// The payload handed to the presentation layer when an alert fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertArtifact {
    pub kind: ArtifactKind,
    pub alert_id: String,
    pub pair: String,
    pub action: Action,
    pub current_price: f64,
    pub target_price: f64,
    pub confidence: f64,
    pub potential_profit_pct: f64,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}

/// Why the gate rejected a recommendation. Ordered by rule position.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    AlreadyNotified,
    LowConfidence { confidence: f64, minimum: f64 },
    ThinProfit { profit_pct: f64, minimum: f64 },
    CoolingDown { remaining_secs: i64 },
    DuplicatePair { pair: String, action: Action },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyNotified => write!(f, "recommendation already notified"),
            Self::LowConfidence { confidence, minimum } => {
                write!(f, "confidence {confidence:.0}% below minimum {minimum:.0}%")
            }
            Self::ThinProfit { profit_pct, minimum } => {
                write!(f, "potential profit {profit_pct:.2}% below minimum {minimum:.2}%")
            }
            Self::CoolingDown { remaining_secs } => {
                write!(f, "cooldown active for another {remaining_secs}s")
            }
            Self::DuplicatePair { pair, action } => {
                write!(f, "recent {action} alert for {pair} inside dedupe window")
            }
        }
    }
}

// =============================================================================
// Internal mutable state (behind RwLock)
// =============================================================================

struct Inner {
    /// Ids of recommendations that already produced an alert.
    notified_ids: HashSet<String>,
    /// When the most recent alert was shown (any pair/action).
    last_alert_at: Option<DateTime<Utc>>,
    /// Bounded history, newest first.
    alerts: VecDeque<StoredAlert>,
}

// =============================================================================
// Alert Center
// =============================================================================

/// Single owner of all notification-gate state. Decisions and their side
/// effects are serialised through the inner write lock.
pub struct AlertCenter {
    inner: RwLock<Inner>,
    policy: RwLock<AlertPolicy>,
}

impl AlertCenter {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            inner: RwLock::new(Inner {
                notified_ids: HashSet::new(),
                last_alert_at: None,
                alerts: VecDeque::new(),
            }),
            policy: RwLock::new(policy),
        }
    }

    /// Current gate thresholds.
    pub fn policy(&self) -> AlertPolicy {
        self.policy.read().clone()
    }

    /// Replace the gate thresholds (runtime tuning via the API).
    pub fn set_policy(&self, policy: AlertPolicy) {
        *self.policy.write() = policy;
    }

    /// Rehydrate state from persisted history (startup only).
    ///
    /// The ids of restored alerts re-enter the notified set, and the newest
    /// restored timestamp seeds the cooldown clock, so a restart does not
    /// re-fire recent alerts.
    pub fn restore(&self, alerts: Vec<StoredAlert>) {
        let cap = self.policy.read().history_cap;
        let mut inner = self.inner.write();
        inner.notified_ids.extend(alerts.iter().map(|a| a.id.clone()));
        inner.last_alert_at = alerts.iter().map(|a| a.created_at).max();
        inner.alerts = alerts.into();
        inner.alerts.truncate(cap);
        debug!(count = inner.alerts.len(), "alert history restored");
    }

    // ── Gate decision ───────────────────────────────────────────────────

    /// Run the five gate rules against `rec` without mutating anything.
    pub fn decide(&self, rec: &Recommendation, now: DateTime<Utc>) -> Result<(), SkipReason> {
        let inner = self.inner.read();
        let policy = self.policy.read();
        Self::decide_locked(&inner, &policy, rec, now)
    }

    fn decide_locked(
        inner: &Inner,
        policy: &AlertPolicy,
        rec: &Recommendation,
        now: DateTime<Utc>,
    ) -> Result<(), SkipReason> {
        // 1. Never alert twice for the same recommendation.
        if inner.notified_ids.contains(&rec.id) {
            return Err(SkipReason::AlreadyNotified);
        }

        // 2. Confidence floor.
        if rec.confidence < policy.min_confidence {
            return Err(SkipReason::LowConfidence {
                confidence: rec.confidence,
                minimum: policy.min_confidence,
            });
        }

        // 3. Profit floor: absolute percentage gap between target and current.
        let profit_pct = potential_profit_pct(rec.current_price, rec.target_price);
        if profit_pct < policy.min_profit_pct {
            return Err(SkipReason::ThinProfit {
                profit_pct,
                minimum: policy.min_profit_pct,
            });
        }

        // 4. Global cooldown.
        if let Some(last) = inner.last_alert_at {
            let cooldown = Duration::seconds(policy.cooldown_secs as i64);
            let elapsed = now - last;
            if elapsed < cooldown {
                return Err(SkipReason::CoolingDown {
                    remaining_secs: (cooldown - elapsed).num_seconds(),
                });
            }
        }

        // 5. Same pair+action inside the dedupe window.
        let dedupe = Duration::seconds(policy.dedupe_window_secs as i64);
        let duplicate = inner
            .alerts
            .iter()
            .any(|a| a.pair == rec.pair && a.action == rec.action && now - a.created_at < dedupe);
        if duplicate {
            return Err(SkipReason::DuplicatePair {
                pair: rec.pair.clone(),
                action: rec.action,
            });
        }

        Ok(())
    }

    /// Gate a recommendation; on acceptance record it and return the
    /// opportunity artifact.
    ///
    /// Decision and side effects happen under one write lock — two racing
    /// evaluations cannot both pass the cooldown/dedupe rules.
    pub fn process(
        &self,
        rec: &Recommendation,
        now: DateTime<Utc>,
    ) -> Result<AlertArtifact, SkipReason> {
        let policy = self.policy.read().clone();
        let mut inner = self.inner.write();

        Self::decide_locked(&inner, &policy, rec, now)?;

        let profit_pct = potential_profit_pct(rec.current_price, rec.target_price);

        let stored = StoredAlert {
            id: rec.id.clone(),
            pair: rec.pair.clone(),
            action: rec.action,
            current_price: rec.current_price,
            target_price: rec.target_price,
            confidence: rec.confidence,
            created_at: now,
            potential_profit_pct: profit_pct,
            read: false,
            target_reached: false,
        };

        inner.alerts.push_front(stored);
        inner.alerts.truncate(policy.history_cap);
        inner.notified_ids.insert(rec.id.clone());
        inner.last_alert_at = Some(now);

        info!(
            pair = %rec.pair,
            action = %rec.action,
            confidence = rec.confidence,
            profit_pct = format!("{profit_pct:.2}"),
            "alert accepted"
        );

        Ok(AlertArtifact {
            kind: ArtifactKind::Opportunity,
            alert_id: rec.id.clone(),
            pair: rec.pair.clone(),
            action: rec.action,
            current_price: rec.current_price,
            target_price: rec.target_price,
            confidence: rec.confidence,
            potential_profit_pct: profit_pct,
            reasoning: rec.reasoning.clone(),
            created_at: now,
        })
    }

    // ── Target sweep ────────────────────────────────────────────────────

    /// Mark every pending alert whose target the price has crossed and
    /// return one artifact per transition.
    ///
    /// The flip is strictly one-way: alerts already marked stay marked no
    /// matter what prices arrive later.
    pub fn check_target_reached(&self, current_price: f64, now: DateTime<Utc>) -> Vec<AlertArtifact> {
        let mut inner = self.inner.write();
        let mut artifacts = Vec::new();

        for alert in inner.alerts.iter_mut() {
            if alert.target_reached {
                continue;
            }

            let reached = match alert.action {
                Action::Buy => current_price >= alert.target_price,
                Action::Sell => current_price <= alert.target_price,
                Action::Hold => false,
            };

            if reached {
                alert.target_reached = true;
                info!(
                    pair = %alert.pair,
                    action = %alert.action,
                    target = alert.target_price,
                    price = current_price,
                    "target price reached"
                );
                artifacts.push(AlertArtifact {
                    kind: ArtifactKind::TargetReached,
                    alert_id: alert.id.clone(),
                    pair: alert.pair.clone(),
                    action: alert.action,
                    current_price,
                    target_price: alert.target_price,
                    confidence: alert.confidence,
                    potential_profit_pct: alert.potential_profit_pct,
                    reasoning: String::new(),
                    created_at: now,
                });
            }
        }

        artifacts
    }

    // ── History management ──────────────────────────────────────────────

    /// Snapshot of the history, newest first.
    pub fn alerts(&self) -> Vec<StoredAlert> {
        self.inner.read().alerts.iter().cloned().collect()
    }

    /// Number of alerts the user has not read yet.
    pub fn unread_count(&self) -> usize {
        self.inner.read().alerts.iter().filter(|a| !a.read).count()
    }

    /// Mark a single alert read. Returns false when the id is unknown.
    pub fn mark_read(&self, id: &str) -> bool {
        let mut inner = self.inner.write();
        match inner.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.read = true;
                true
            }
            None => false,
        }
    }

    /// Mark every alert read.
    pub fn mark_all_read(&self) {
        for alert in self.inner.write().alerts.iter_mut() {
            alert.read = true;
        }
    }

    /// Remove an alert from the history. Returns false when the id is
    /// unknown. The id stays in the notified set, so deletion cannot be used
    /// to re-trigger the same recommendation.
    pub fn delete(&self, id: &str) -> bool {
        let mut inner = self.inner.write();
        let before = inner.alerts.len();
        inner.alerts.retain(|a| a.id != id);
        inner.alerts.len() != before
    }
}

/// Absolute percentage gap between target and current price.
fn potential_profit_pct(current: f64, target: f64) -> f64 {
    if current == 0.0 {
        return 0.0;
    }
    ((target - current) / current * 100.0).abs()
}
