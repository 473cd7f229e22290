//! Durable home for the dashboard document.
//!
//! `load`/`save` are the raw whole-document operations. `update` is the only path the
//! dashboard operations use for mutation: it runs load → mutate → save inside one
//! critical section (process mutex + exclusive lock file), so concurrent callers in this
//! process or another cannot lose each other's writes.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::document::DashboardDocument;
use crate::error::{Result, ShellError};
use crate::persist::{self, FileLock};

#[derive(Debug)]
pub struct DashboardStore {
    path: PathBuf,
    gate: Mutex<()>,
}

impl DashboardStore {
    /// Store backed by the given file. Neither the file nor its directory need exist.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            gate: Mutex::new(()),
        }
    }

    /// Store backed by `<data_dir>/skill_dashboard.json`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::open(data_dir.join(crate::config::DEFAULT_DASHBOARD_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. A missing file yields the empty document and touches nothing.
    pub fn load(&self) -> Result<DashboardDocument> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(DashboardDocument::default());
            }
            Err(e) => {
                return Err(ShellError::CorruptState {
                    path: self.path.clone(),
                    reason: format!("unreadable: {}", e),
                });
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| ShellError::CorruptState {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Overwrite the file with `doc`. Readers never observe a partial write.
    pub fn save(&self, doc: &DashboardDocument) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| ShellError::Internal(format!("encoding dashboard: {}", e)))?;
        bytes.push(b'\n');
        persist::write_atomic(&self.path, &bytes)
            .map_err(|e| ShellError::storage_write(&self.path, e))
    }

    /// Run `mutate` on the current document as one atomic unit. The document is saved,
    /// with its revision bumped, only when the mutator changed it.
    ///
    /// The mutator first runs on an unlocked read; a call that changes nothing returns
    /// without touching storage. Otherwise the file lock is taken, the document is
    /// re-read, and the mutator runs again on the locked copy if another writer got there
    /// first. `mutate` must therefore be repeatable.
    pub fn update<T>(&self, mut mutate: impl FnMut(&mut DashboardDocument) -> T) -> Result<T> {
        let _gate = self.gate();
        let before = self.load()?;
        let mut doc = before.clone();
        let mut out = mutate(&mut doc);
        if doc == before {
            return Ok(out);
        }

        let _lock = self.file_lock()?;
        let current = self.load()?;
        if current != before {
            log::debug!("dashboard changed on disk, re-applying update");
            doc = current.clone();
            out = mutate(&mut doc);
            if doc == current {
                return Ok(out);
            }
        }
        doc.revision = current.revision + 1;
        self.save(&doc)?;
        log::debug!(
            "dashboard saved at revision {} ({})",
            doc.revision,
            self.path.display()
        );
        Ok(out)
    }

    /// Load the document together with the revision to pass to `save_if_current`.
    pub fn load_with_revision(&self) -> Result<(DashboardDocument, u64)> {
        let doc = self.load()?;
        let revision = doc.revision;
        Ok((doc, revision))
    }

    /// Save `doc` only if the stored revision still equals `expected`; otherwise fail with
    /// `Conflict` and leave the file as is. Returns the new revision.
    pub fn save_if_current(&self, doc: &DashboardDocument, expected: u64) -> Result<u64> {
        let _gate = self.gate();
        let _lock = self.file_lock()?;
        let found = self.load()?.revision;
        if found != expected {
            return Err(ShellError::Conflict { expected, found });
        }
        let mut next = doc.clone();
        next.revision = expected + 1;
        self.save(&next)?;
        Ok(next.revision)
    }

    fn gate(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned gate only means another caller panicked mid-update; the file itself
        // is still consistent because saves are atomic.
        self.gate.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn file_lock(&self) -> Result<FileLock> {
        FileLock::acquire(&self.path).map_err(|e| ShellError::storage_write(&self.path, e))
    }
}
