//! Append-only production history.
//!
//! One JSON array on disk; each finished video appends an entry. The
//! originality gate reads it back to compare new drafts against everything
//! already produced.

use crate::error::ShortgenResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Guards the load-append-save cycle; the file format is one JSON array, so
/// unsynchronized writers would overwrite each other's entries.
static WRITE_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub script: String,
    pub style: String,
    pub theme: String,
    pub quality_score: u8,
    pub duration_secs: f64,
    pub output_path: PathBuf,
}

pub struct History {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Load history from `path`. A missing file is an empty history; a
    /// corrupt file is an error so we never silently drop past runs.
    pub fn load(path: &Path) -> ShortgenResult<Self> {
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents).map_err(|e| {
                crate::error::ShortgenError::Other(format!(
                    "history file {} is not valid JSON: {e}",
                    path.display()
                ))
            })?
        } else {
            Vec::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// An in-memory empty history that still knows where appends should land.
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn recent(&self, count: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(count);
        &self.entries[start..]
    }

    /// Append an entry and persist the whole file. Write goes through a temp
    /// file in the same directory so a crash can't truncate the log.
    pub fn append(&mut self, entry: HistoryEntry) -> ShortgenResult<()> {
        self.entries.push(entry);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            crate::error::ShortgenError::Other(format!("failed to serialize history: {e}"))
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!("history appended ({} entries)", self.entries.len());
        Ok(())
    }
}

/// Reload the file and append one entry under the process-wide write lock.
/// This is the only safe append path when several productions run at once,
/// e.g. batch workers finishing together.
pub fn record(path: &Path, entry: HistoryEntry) -> ShortgenResult<()> {
    let _guard = WRITE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut history = History::load(path)?;
    history.append(entry)
}
