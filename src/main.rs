// =============================================================================
// TradeTide Signal Engine — Main Entry Point
// =============================================================================
//
// The engine starts in Demo mode (synthetic rates) unless the config asks for
// Live mode AND an exchange-rate API key is present in the environment.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod alerts;
mod analysis;
mod api;
mod app_state;
mod indicators;
mod market_data;
mod runtime_config;
mod signal;
mod storage;
mod types;

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::rest::ApiContext;
use crate::app_state::AppState;
use crate::market_data::{ExchangeRateClient, RateSource, SyntheticRateSource};
use crate::runtime_config::RuntimeConfig;
use crate::storage::{AlertStore, DailyStore};
use crate::types::SourceMode;

/// Seed rate for the synthetic source when no history exists yet.
const DEMO_SEED_RATE: f64 = 1.10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        TradeTide Signal Engine — Starting Up            ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load("runtime_config.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Env overrides.
    if let Ok(pair) = std::env::var("TRADETIDE_PAIR") {
        let pair = pair.trim().to_uppercase();
        if !pair.is_empty() {
            config.pair = pair;
        }
    }
    if let Ok(addr) = std::env::var("TRADETIDE_BIND_ADDR") {
        config.bind_addr = addr;
    }

    // ── 2. Pick the rate source ──────────────────────────────────────────
    let api_key = std::env::var("EXCHANGE_RATE_API_KEY").unwrap_or_default();
    let source: Arc<dyn RateSource> = match config.source_mode {
        SourceMode::Live if !api_key.is_empty() => {
            Arc::new(ExchangeRateClient::new(api_key, &config.pair)?)
        }
        SourceMode::Live => {
            warn!("Live mode requested but EXCHANGE_RATE_API_KEY is unset — falling back to Demo");
            config.source_mode = SourceMode::Demo;
            Arc::new(SyntheticRateSource::new(DEMO_SEED_RATE))
        }
        SourceMode::Demo => Arc::new(SyntheticRateSource::new(DEMO_SEED_RATE)),
    };

    info!(
        pair = %config.pair,
        source_mode = %config.source_mode,
        source = source.label(),
        "Configured instrument and rate source"
    );

    // ── 3. Open stores & build shared state ──────────────────────────────
    let data_dir = std::path::PathBuf::from(&config.data_dir);
    let daily_store = DailyStore::open(data_dir.join("daily_history.json"))?;
    let alert_store = AlertStore::new(data_dir.join("alerts.json"));

    let state = Arc::new(AppState::new(config, daily_store, alert_store));

    // Rehydrate the alert center so restarts keep the cooldown/dedupe state.
    match state.alert_store.load() {
        Ok(alerts) if !alerts.is_empty() => {
            info!(count = alerts.len(), "Restoring persisted alert history");
            state.alert_center.restore(alerts);
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, "Failed to load alert history — starting empty");
            state.push_error(format!("alert history load failed: {e}"));
        }
    }

    // ── 4. Start the API server ──────────────────────────────────────────
    let bind_addr = state.runtime_config.read().bind_addr.clone();
    let api_ctx = ApiContext {
        state: state.clone(),
        source: source.clone(),
    };

    tokio::spawn(async move {
        let app = api::rest::router(api_ctx);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .expect("Failed to bind API server");
        info!(addr = %bind_addr, "API server listening");
        axum::serve(listener, app).await.expect("API server failed");
    });

    // ── 5. Analysis loop ─────────────────────────────────────────────────
    // Skipped ticks are dropped, not queued — a slow pass must not cause a
    // burst of back-to-back analyses.
    let analysis_state = state.clone();
    let analysis_source = source.clone();
    tokio::spawn(async move {
        let period = analysis_state.runtime_config.read().analysis_interval_secs;
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(period));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = period, "Analysis loop starting");

        loop {
            interval.tick().await;
            if let Err(e) = analysis::run_analysis(&analysis_state, analysis_source.as_ref()).await
            {
                error!(error = %e, "scheduled analysis failed");
                analysis_state.push_error(format!("analysis failed: {e:#}"));
            }
        }
    });

    // ── 6. Target-check loop ─────────────────────────────────────────────
    let target_state = state.clone();
    tokio::spawn(async move {
        let period = target_state.runtime_config.read().target_check_interval_secs;
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(period));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = period, "Target-check loop starting");

        loop {
            interval.tick().await;
            analysis::run_target_check(&target_state);
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 7. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = state.runtime_config.read().save("runtime_config.json") {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }
    state.persist_alerts();
    if let Err(e) = state.daily_store.save() {
        error!(error = %e, "Failed to save daily history on shutdown");
    }

    info!("TradeTide shut down complete.");
    Ok(())
}
