//! Append-only, deduplicating log of readings persisted as a JSON file.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Reading;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write history file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    log: Mutex<Vec<Reading>>,
}

impl HistoryStore {
    /// Load the log from `path`.
    ///
    /// A missing, empty or unreadable file yields an empty log; this never fails.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let log = read_log(&path);
        debug!(path = %path.display(), readings = log.len(), "history loaded");

        Self {
            path,
            log: Mutex::new(log),
        }
    }

    /// Append `reading` unless the last entry has the same timestamp.
    ///
    /// Returns `Ok(false)` when the reading was dropped as a duplicate. On a
    /// write failure the in-memory log is left as it was before the call.
    pub fn append(&self, reading: Reading) -> Result<bool, HistoryError> {
        let mut log = self.lock();

        if log.last().is_some_and(|last| last.timestamp == reading.timestamp) {
            debug!(timestamp = %reading.timestamp, "duplicate reading dropped");
            return Ok(false);
        }

        log.push(reading);
        if let Err(e) = write_log(&self.path, &log) {
            log.pop();
            return Err(e);
        }

        debug!(readings = log.len(), "history saved");
        Ok(true)
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.lock().clone()
    }

    pub fn last(&self) -> Option<Reading> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Reading>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_log(path: &Path) -> Vec<Reading> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return Vec::new(),
    };

    if contents.trim().is_empty() {
        return Vec::new();
    }

    serde_json::from_str(&contents).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "history file is unreadable, starting empty");
        Vec::new()
    })
}

/// Rewrite the whole file through a sibling temp file and a rename.
fn write_log(path: &Path, log: &[Reading]) -> Result<(), HistoryError> {
    let json = serde_json::to_vec_pretty(log)?;
    let io_err = |source| HistoryError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, json).map_err(io_err)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(e));
    }

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}
