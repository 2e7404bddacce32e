// =============================================================================
// Storage Module
// =============================================================================
//
// JSON-file persistence, best-effort by design: the engine keeps running on
// write failures (they are logged), and missing files on startup simply mean
// empty state. All writes go through the atomic tmp + rename helper so a
// crash mid-write never corrupts a store.

pub mod alert_store;
pub mod daily_store;

pub use alert_store::AlertStore;
pub use daily_store::{DailyRecord, DailyStore};

use std::path::Path;

use anyhow::{Context, Result};

/// Write `content` to `path` atomically (tmp sibling + rename), creating the
/// parent directory when needed.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("json.tmp");

    std::fs::write(&tmp_path, content)
        .with_context(|| format!("failed to write tmp file {}", tmp_path.display()))?;

    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename tmp file to {}", path.display()))?;

    Ok(())
}
