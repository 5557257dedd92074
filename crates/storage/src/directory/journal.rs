//! Persistent record of nid assignments
//!
//! Every nid the identity directory hands out, and every UUID later merged
//! into it, is appended to `identities.log` before it is published. Replay
//! on start restores the mappings ahead of the stored chronologies, so a
//! nid that was only ever referenced (a module, an author) keeps its value
//! across restarts.
//!
//! Records use the entity log framing with the public id's UUIDs as the
//! body, 16 big-endian bytes each. Later records for a nid carry its full,
//! merged public id.

use crate::append_log::{append_record, encode_record, replay_records};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use termstore_core::{Error, Nid, PublicId, Result};
use tracing::info;
use uuid::Uuid;

/// Identity log file name inside the data directory
pub const IDENTITY_LOG_FILE_NAME: &str = "identities.log";

/// Sink for nid assignments, written before the assignment is visible
pub trait IdentityJournal: Send + Sync {
    /// Record that `nid` is named by `public_id`
    ///
    /// # Errors
    ///
    /// Any error aborts the assignment.
    fn record(&self, nid: Nid, public_id: &PublicId) -> Result<()>;
}

/// Append-only identity log
pub struct IdentityLog {
    path: PathBuf,
    sync_on_write: bool,
    file: Mutex<File>,
}

impl IdentityLog {
    /// Open or create `identities.log` in `dir`
    pub fn open(dir: &Path, sync_on_write: bool) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(IDENTITY_LOG_FILE_NAME);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        replay_records(&mut file, &path, |_| Ok(()))?;
        Ok(IdentityLog {
            path,
            sync_on_write,
            file: Mutex::new(file),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every recorded assignment, in log order
    ///
    /// # Errors
    ///
    /// `Corruption` for a record whose body is not a UUID list; I/O errors.
    pub fn replay(&self) -> Result<Vec<(Nid, PublicId)>> {
        let mut file = self.file.lock();
        let mut assignments = Vec::new();
        replay_records(&mut *file, &self.path, |record| {
            assignments.push((record.nid, decode_uuids(record.nid, &record.bytes)?));
            Ok(())
        })?;
        info!(path = %self.path.display(), assignments = assignments.len(), "identity log replayed");
        Ok(assignments)
    }
}

impl IdentityJournal for IdentityLog {
    fn record(&self, nid: Nid, public_id: &PublicId) -> Result<()> {
        let body: Vec<u8> = public_id
            .uuids()
            .iter()
            .flat_map(|uuid| *uuid.as_bytes())
            .collect();
        let record = encode_record(nid, &body);
        let mut file = self.file.lock();
        append_record(&mut *file, &record, self.sync_on_write)
    }
}

impl std::fmt::Debug for IdentityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityLog")
            .field("path", &self.path)
            .field("sync_on_write", &self.sync_on_write)
            .finish()
    }
}

fn decode_uuids(nid: Nid, body: &[u8]) -> Result<PublicId> {
    if body.is_empty() || body.len() % 16 != 0 {
        return Err(Error::Corruption(format!(
            "identity record for {} has {} bytes, not a uuid list",
            nid,
            body.len()
        )));
    }
    let uuids = body
        .chunks_exact(16)
        .map(|chunk| {
            Uuid::from_slice(chunk).map_err(|e| Error::Corruption(format!("identity record for {}: {}", nid, e)))
        })
        .collect::<Result<Vec<_>>>()?;
    PublicId::new(uuids)
}
