// =============================================================================
// Alert Store — persisted alert history
// =============================================================================
//
// Serialises the alert center's bounded history after every mutation so the
// notified-id set, cooldown clock, and read/target state survive restarts.
// Like the daily store, writes are best-effort.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::alerts::StoredAlert;

pub struct AlertStore {
    path: PathBuf,
}

impl AlertStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted history. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<StoredAlert>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let alerts: Vec<StoredAlert> = serde_json::from_str(&content)
                    .with_context(|| format!("failed to parse alert store {}", self.path.display()))?;
                info!(path = %self.path.display(), alerts = alerts.len(), "alert store loaded");
                Ok(alerts)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to read alert store {}", self.path.display()))
            }
        }
    }

    /// Persist the history atomically. Callers treat failures as best-effort.
    pub fn save(&self, alerts: &[StoredAlert]) -> Result<()> {
        let content =
            serde_json::to_string_pretty(alerts).context("failed to serialise alert store")?;
        super::write_atomic(&self.path, &content)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;
    use chrono::Utc;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tradetide-alerts-{name}-{}.json", std::process::id()))
    }

    fn alert(id: &str) -> StoredAlert {
        StoredAlert {
            id: id.to_string(),
            pair: "EURUSD".to_string(),
            action: Action::Buy,
            current_price: 1.08,
            target_price: 1.0908,
            confidence: 90.0,
            created_at: Utc::now(),
            potential_profit_pct: 1.0,
            read: false,
            target_reached: false,
        }
    }

    #[test]
    fn load_missing_file_yields_empty_history() {
        let store = AlertStore::new(temp_path("missing"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let store = AlertStore::new(temp_path("roundtrip"));
        let mut a = alert("a1");
        a.read = true;
        a.target_reached = true;
        store.save(&[a, alert("a2")]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a1");
        assert!(loaded[0].read);
        assert!(loaded[0].target_reached);
        assert_eq!(loaded[1].id, "a2");
        assert!(!loaded[1].read);

        let _ = std::fs::remove_file(store.path());
    }
}
