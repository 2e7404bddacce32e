// =============================================================================
// Daily Store — one record per calendar date, upsert keyed by date
// =============================================================================
//
// Each analysis run writes today's prices and the freshly computed indicator
// fields back here. Re-analysing the same day overwrites that day's record
// (upsert), so the store holds at most one row per date, newest last on
// disk, served newest-first to the API.
// =============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{IndicatorSet, PricePoint};

/// A single calendar date's prices and indicator writeback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Calendar date, `YYYY-MM-DD`. The upsert key.
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub change_pct: f64,
    pub sma_5: Option<f64>,
    pub sma_10: Option<f64>,
    pub sma_20: Option<f64>,
    pub rsi_14: Option<f64>,
}

impl DailyRecord {
    /// Build a record from a price sample and the indicators computed over
    /// the window ending at that sample.
    pub fn from_analysis(point: &PricePoint, indicators: &IndicatorSet) -> Self {
        Self {
            date: point.timestamp.format("%Y-%m-%d").to_string(),
            open: point.open,
            high: point.high,
            low: point.low,
            close: point.close,
            volume: point.volume,
            change_pct: indicators.change_pct,
            sma_5: indicators.sma_5,
            sma_10: indicators.sma_10,
            sma_20: indicators.sma_20,
            rsi_14: indicators.rsi_14,
        }
    }
}

/// File-backed, date-keyed indicator history.
pub struct DailyStore {
    path: PathBuf,
    records: RwLock<Vec<DailyRecord>>,
}

impl DailyStore {
    /// Open the store at `path`, loading existing records. A missing file is
    /// an empty store, not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("failed to parse daily store {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read daily store {}", path.display()))
            }
        };

        info!(path = %path.display(), records = records.len(), "daily store opened");

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Insert or replace the record for its date, keeping records sorted by
    /// date ascending.
    pub fn upsert(&self, record: DailyRecord) {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.date == record.date) {
            Some(existing) => *existing = record,
            None => {
                records.push(record);
                records.sort_by(|a, b| a.date.cmp(&b.date));
            }
        }
    }

    /// The `n` most recent records, newest first.
    pub fn recent(&self, n: usize) -> Vec<DailyRecord> {
        let records = self.records.read();
        records.iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Persist the store atomically. Callers treat failures as best-effort
    /// (log and continue).
    pub fn save(&self) -> Result<()> {
        let content = {
            let records = self.records.read();
            serde_json::to_string_pretty(&*records).context("failed to serialise daily store")?
        };
        super::write_atomic(&self.path, &content)
    }
}
