//! Durable pending-merge store.
//!
//! Maps a head commit SHA to the set of merge requests waiting on CI
//! completion for that commit. Check-run webhooks can arrive minutes to
//! hours after the merge command, possibly after a redeploy, so records
//! live on disk: one directory per SHA, one JSON file per record.
//!
//! Records carry no ordering; when a resolving event arrives all records
//! for the SHA are replayed. A key that GitHub never resolves is simply
//! left behind, which is harmless.

use crate::error::{Error, Result};
use crate::types::PendingMergeRecord;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Durable SHA -> set-of-records store
#[derive(Debug)]
pub struct PendingStore {
    root: PathBuf,
    /// Serializes add/get/delete so a pending write and a resolving
    /// read cannot interleave on the same key.
    lock: Mutex<()>,
}

impl PendingStore {
    /// Open (and create if needed) the store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| Error::Store(format!("failed to create {}: {e}", root.display())))?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    /// Append one record to the set for `sha`, creating the key if absent.
    ///
    /// Idempotent: adding the same record twice leaves one file.
    pub fn add(&self, sha: &str, record: &PendingMergeRecord) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let dir = self.key_dir(sha)?;
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Store(format!("failed to create {}: {e}", dir.display())))?;

        let path = dir.join(record_file_name(record));
        let content = serde_json::to_vec_pretty(record)
            .map_err(|e| Error::Store(format!("failed to serialize record: {e}")))?;
        fs::write(&path, content)
            .map_err(|e| Error::Store(format!("failed to write {}: {e}", path.display())))?;
        Ok(())
    }

    /// Return all records for `sha`, or an empty set if none were stored.
    pub fn get(&self, sha: &str) -> Result<Vec<PendingMergeRecord>> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let dir = self.key_dir(sha)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|e| Error::Store(format!("failed to read {}: {e}", dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        // deterministic replay order
        entries.sort();

        let mut records = Vec::with_capacity(entries.len());
        for path in entries {
            let content = fs::read(&path)
                .map_err(|e| Error::Store(format!("failed to read {}: {e}", path.display())))?;
            let record: PendingMergeRecord = serde_json::from_slice(&content)
                .map_err(|e| Error::Store(format!("failed to parse {}: {e}", path.display())))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Remove one record from the set for `sha`.
    ///
    /// Removing a record that was already consumed is a no-op.
    pub fn delete(&self, sha: &str, record: &PendingMergeRecord) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let dir = self.key_dir(sha)?;
        let path = dir.join(record_file_name(record));
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| Error::Store(format!("failed to remove {}: {e}", path.display())))?;
        }
        // drop the key once its set is empty; best effort only
        let _ = fs::remove_dir(&dir);
        Ok(())
    }

    /// Directory for one SHA key, refusing anything that is not a plain
    /// hex-ish token so a crafted payload cannot escape the store root.
    fn key_dir(&self, sha: &str) -> Result<PathBuf> {
        if sha.is_empty() || !sha.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Store(format!("invalid store key: {sha:?}")));
        }
        Ok(self.root.join(sha))
    }
}

fn poisoned() -> Error {
    Error::Store("store lock poisoned".to_string())
}

/// Stable file name for a record, unique per (issue, comment) pair.
fn record_file_name(record: &PendingMergeRecord) -> String {
    format!("{}-{}.json", record.issue_number, record.comment_id)
}
