// =============================================================================
// Analysis Service — one full signal pass per invocation
// =============================================================================
//
// Triggered by the periodic loop or the on-demand `POST /api/v1/analyze`:
//   1. Fetch the current rate (fail fast — nothing is persisted on failure)
//   2. Extend the price window (cold starts backfill synthetic history so
//      SMA-20 / RSI-14 have full coverage immediately)
//   3. Evaluate the signal engine over the trailing closes
//   4. Upsert today's daily record with the indicator writeback (best-effort)
//   5. Record the recommendation and run it through the alert gate
//   6. Persist the alert history when the gate mutated it (best-effort)
//
// Only the rate fetch can fail the run; storage writebacks degrade to
// warnings so the caller always gets the freshly computed recommendation.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::alerts::{AlertArtifact, ArtifactKind};
use crate::app_state::AppState;
use crate::market_data::RateSource;
use crate::signal::SignalEngine;
use crate::storage::DailyRecord;
use crate::types::Recommendation;

/// Run one analysis pass and return the generated recommendation.
pub async fn run_analysis(state: &Arc<AppState>, source: &dyn RateSource) -> Result<Recommendation> {
    let rate = source
        .latest_rate()
        .await
        .with_context(|| format!("price source '{}' failed", source.label()))?;

    let now = Utc::now();
    let (pair, volatility_pct, history_days) = {
        let config = state.runtime_config.read();
        (config.pair.clone(), config.volatility_pct, config.history_days)
    };

    // Cold start: seed a full indicator window around the first live rate.
    if state.price_window.is_empty() {
        state.price_window.backfill(rate, history_days.saturating_sub(1), now);
    }
    state.price_window.push_rate(rate, now);

    let closes = state.price_window.closes();
    let rec = SignalEngine::evaluate(&closes, rate, &pair, volatility_pct, now);

    info!(
        pair = %pair,
        rate,
        action = %rec.action,
        confidence = rec.confidence,
        samples = closes.len(),
        "analysis complete"
    );

    // ── Daily writeback (best-effort) ────────────────────────────────────
    if let Some(point) = state.price_window.latest() {
        state
            .daily_store
            .upsert(DailyRecord::from_analysis(&point, &rec.indicators));
        if let Err(e) = state.daily_store.save() {
            warn!(error = %e, "daily store writeback failed — continuing");
            state.push_error(format!("daily store writeback failed: {e}"));
        }
    }

    state.record_recommendation(rec.clone());

    // ── Alert gate ───────────────────────────────────────────────────────
    match state.alert_center.process(&rec, now) {
        Ok(artifact) => {
            announce(&artifact);
            state.persist_alerts();
        }
        Err(reason) => {
            debug!(pair = %pair, %reason, "recommendation did not surface as an alert");
        }
    }

    state.increment_version();
    Ok(rec)
}

/// Sweep the alert history for freshly crossed targets.
pub fn run_target_check(state: &Arc<AppState>) {
    let Some(point) = state.price_window.latest() else {
        debug!("target check skipped — no price data yet");
        return;
    };

    let artifacts = state.alert_center.check_target_reached(point.close, Utc::now());
    if artifacts.is_empty() {
        return;
    }

    for artifact in &artifacts {
        announce(artifact);
    }
    state.persist_alerts();
    state.increment_version();
}

/// Hand an artifact to the presentation layer. Rendering is out of scope for
/// the engine, so this logs the event; failures downstream must never block
/// gating, which logging trivially satisfies.
fn announce(artifact: &AlertArtifact) {
    match artifact.kind {
        ArtifactKind::Opportunity => info!(
            pair = %artifact.pair,
            action = %artifact.action,
            price = artifact.current_price,
            target = artifact.target_price,
            confidence = artifact.confidence,
            profit_pct = format!("{:.2}", artifact.potential_profit_pct),
            reasoning = %artifact.reasoning,
            "ALERT: trading opportunity"
        ),
        ArtifactKind::TargetReached => info!(
            pair = %artifact.pair,
            action = %artifact.action,
            price = artifact.current_price,
            target = artifact.target_price,
            "ALERT: target price reached"
        ),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::SyntheticRateSource;
    use crate::runtime_config::RuntimeConfig;
    use crate::storage::{AlertStore, DailyStore};
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FailingSource;

    #[async_trait]
    impl RateSource for FailingSource {
        async fn latest_rate(&self) -> Result<f64> {
            Err(anyhow!("upstream unavailable"))
        }

        fn label(&self) -> &'static str {
            "failing"
        }
    }

    fn test_state(name: &str) -> Arc<AppState> {
        let dir = std::env::temp_dir().join(format!(
            "tradetide-analysis-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let daily = DailyStore::open(dir.join("daily.json")).unwrap();
        let alerts = AlertStore::new(dir.join("alerts.json"));
        Arc::new(AppState::new(RuntimeConfig::default(), daily, alerts))
    }

    #[tokio::test]
    async fn analysis_produces_recommendation_with_full_window() {
        let state = test_state("ok");
        let source = SyntheticRateSource::new(1.10);

        let rec = run_analysis(&state, &source).await.unwrap();
        assert_eq!(rec.pair, "EURUSD");
        // Backfill guarantees full indicator coverage on the first run.
        assert_eq!(rec.indicators.samples, 30);
        assert!(rec.indicators.sma_20.is_some());
        assert!(rec.indicators.rsi_14.is_some());

        // State captured the result.
        assert!(state.last_recommendation.read().is_some());
        assert_eq!(state.daily_store.len(), 1);
    }

    #[tokio::test]
    async fn source_failure_fails_fast_without_partial_state() {
        let state = test_state("fail");
        let err = run_analysis(&state, &FailingSource).await.unwrap_err();
        assert!(err.to_string().contains("failing"));

        assert!(state.price_window.is_empty());
        assert!(state.last_recommendation.read().is_none());
        assert!(state.daily_store.is_empty());
    }

    #[tokio::test]
    async fn repeated_analysis_upserts_single_daily_record() {
        let state = test_state("upsert");
        let source = SyntheticRateSource::new(1.10);

        run_analysis(&state, &source).await.unwrap();
        run_analysis(&state, &source).await.unwrap();

        // Two runs on the same date collapse into one upserted record.
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let todays: Vec<_> = state
            .daily_store
            .recent(50)
            .into_iter()
            .filter(|r| r.date == today)
            .collect();
        assert_eq!(todays.len(), 1);
    }

    #[tokio::test]
    async fn target_check_without_data_is_a_noop() {
        let state = test_state("notarget");
        run_target_check(&state); // must not panic or mutate
        assert_eq!(state.alert_center.alerts().len(), 0);
    }
}
