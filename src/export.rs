//! Bookmark export document and its on-disk form.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::storage::SavedTrend;
use crate::trend::Trend;

/// One exported bookmark, joined to its stored trend when there is one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportItem {
    #[serde(flatten)]
    pub bookmark: SavedTrend,
    /// `None` when the reference is a client key or the trend is gone
    pub trend: Option<Trend>,
}

/// The serializable result of an export request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub user_id: String,
    pub exported_at: DateTime<Utc>,
    pub items: Vec<ExportItem>,
}

impl ExportDocument {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize export document")
    }
}

/// Write `content` to `dst` through a temp file and a rename, so `dst` is
/// never left half-written.
pub fn write_atomic(dst: &Path, content: &[u8]) -> Result<()> {
    // Unpredictable temp name; create_new refuses a pre-planted file or symlink.
    let random_suffix: u64 = rand::random();
    let temp_path = dst.with_extension(format!("tmp.{random_suffix:016x}"));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .with_context(|| {
            format!(
                "Failed to create temporary file '{}': check directory permissions or disk space",
                temp_path.display()
            )
        })?;

    temp_file.write_all(content).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to write to temporary file '{}': disk may be full",
            temp_path.display()
        )
    })?;

    temp_file.sync_all().with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to sync temporary file '{}' to disk",
            temp_path.display()
        )
    })?;

    drop(temp_file);

    // Windows refuses to rename over an existing file
    #[cfg(windows)]
    if dst.exists() {
        std::fs::remove_file(dst).with_context(|| {
            let _ = std::fs::remove_file(&temp_path);
            format!(
                "Failed to remove existing '{}' before atomic replace",
                dst.display()
            )
        })?;
    }

    std::fs::rename(&temp_path, dst).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to rename '{}' to '{}': check permissions",
            temp_path.display(),
            dst.display()
        )
    })?;

    tracing::debug!(path = %dst.display(), bytes = content.len(), "Wrote export file");
    Ok(())
}
