//! Append-only log provider
//!
//! All chronologies live in one file, `entities.log`, as a sequence of
//! self-delimiting records. Every update appends the full new chronology;
//! replay on start keeps the last record per nid.
//!
//! # Record Layout
//!
//! ```text
//! ┌─────────────────┬──────────────┬─────────────────────────┬──────────┐
//! │ Length (4 bytes)│ Nid (4)      │ Chronology (variable)   │ CRC32 (4)│
//! └─────────────────┴──────────────┴─────────────────────────┴──────────┘
//! ```
//!
//! Length counts nid + chronology + CRC. The CRC covers nid + chronology.
//! Integers are big-endian.
//!
//! # Recovery
//!
//! A record that is cut short or fails its checksum marks the end of the
//! valid log: the file is truncated there with a warning and replay stops.
//!
//! An append that fails partway is cut back to the previous end of file
//! before the error is returned, so a torn record never sits in front of
//! later committed ones. If the cut itself fails the provider stops
//! accepting writes.

use crate::memory::{
    contains_entity, entity_count, read_entity, traverse, update_entity, EntityMap,
};
use crate::provider::{Lifecycle, StoreProvider, Traversal, Updater, Visitor};
use byteorder::{BigEndian, ByteOrder};
use crc32fast::Hasher;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use termstore_core::{Error, Nid, Result};
use tracing::{info, warn};

/// Name under which the log provider registers
pub const LOG_PROVIDER: &str = "log";

/// Log file name inside the data directory
pub const LOG_FILE_NAME: &str = "entities.log";

/// Bytes around each chronology: length (4) + nid (4) + crc (4)
pub const RECORD_OVERHEAD: usize = 12;

// ============================================================================
// Record format
// ============================================================================

/// One logged chronology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Owner of the chronology
    pub nid: Nid,
    /// Chronology bytes
    pub bytes: Vec<u8>,
}

impl LogRecord {
    /// Serialize for appending
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_record(self.nid, &self.bytes)
    }

    /// Parse one record from the front of `bytes`
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<(Self, usize), LogRecordError> {
        if bytes.len() < 4 {
            return Err(LogRecordError::InsufficientData);
        }
        let length = BigEndian::read_u32(&bytes[0..4]) as usize;
        if length < RECORD_OVERHEAD - 4 {
            return Err(LogRecordError::InvalidFormat);
        }
        if bytes.len() < 4 + length {
            return Err(LogRecordError::InsufficientData);
        }

        let body = &bytes[4..4 + length - 4];
        let stored = BigEndian::read_u32(&bytes[4 + length - 4..4 + length]);
        let computed = compute_crc(body);
        if stored != computed {
            return Err(LogRecordError::ChecksumMismatch {
                expected: stored,
                computed,
            });
        }

        let nid = Nid::from_raw(BigEndian::read_i32(&body[0..4]));
        Ok((
            LogRecord {
                nid,
                bytes: body[4..].to_vec(),
            },
            4 + length,
        ))
    }
}

pub(crate) fn encode_record(nid: Nid, chronology: &[u8]) -> Vec<u8> {
    let length = 4 + chronology.len() + 4;
    let mut record = vec![0u8; 4 + length];
    BigEndian::write_u32(&mut record[0..4], length as u32);
    BigEndian::write_i32(&mut record[4..8], nid.as_i32());
    record[8..8 + chronology.len()].copy_from_slice(chronology);
    let crc = compute_crc(&record[4..8 + chronology.len()]);
    BigEndian::write_u32(&mut record[8 + chronology.len()..], crc);
    record
}

/// File the logs append to
///
/// `truncate_to` cuts the file back to `len` and leaves the cursor there.
pub(crate) trait LogFile: Write + Seek {
    fn truncate_to(&mut self, len: u64) -> std::io::Result<()>;

    fn sync(&mut self) -> std::io::Result<()>;
}

impl LogFile for File {
    fn truncate_to(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len)).map(|_| ())
    }

    fn sync(&mut self) -> std::io::Result<()> {
        self.sync_data()
    }
}

/// Append one encoded record, or leave the file as it was
///
/// # Errors
///
/// The write or sync error if the file was rolled back; `Corruption` if the
/// rollback failed too and the file may end in a torn record.
pub(crate) fn append_record<F: LogFile>(file: &mut F, record: &[u8], sync: bool) -> Result<()> {
    let start = file.stream_position()?;
    let written = file
        .write_all(record)
        .and_then(|_| if sync { file.sync() } else { Ok(()) });
    let Err(e) = written else {
        return Ok(());
    };
    match file.truncate_to(start) {
        Ok(()) => Err(e.into()),
        Err(rollback) => {
            warn!(offset = start, error = %e, rollback = %rollback, "failed append could not be rolled back");
            Err(Error::Corruption(format!(
                "append at offset {} failed ({}) and could not be rolled back: {}",
                start, e, rollback
            )))
        }
    }
}

/// Read every valid record of `file` from the start
///
/// A torn tail is truncated with a warning. Leaves the cursor at the end of
/// the valid records. Returns the number of records read.
pub(crate) fn replay_records<F>(file: &mut File, path: &Path, mut on_record: F) -> Result<usize>
where
    F: FnMut(LogRecord) -> Result<()>,
{
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buf)?;

    let mut offset = 0usize;
    let mut records = 0usize;
    while offset < buf.len() {
        match LogRecord::from_bytes(&buf[offset..]) {
            Ok((record, consumed)) => {
                on_record(record)?;
                offset += consumed;
                records += 1;
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    offset,
                    dropped = buf.len() - offset,
                    error = %e,
                    "truncating torn log tail"
                );
                file.set_len(offset as u64)?;
                break;
            }
        }
    }
    file.seek(SeekFrom::Start(offset as u64))?;
    Ok(records)
}

fn compute_crc(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Log record parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogRecordError {
    /// Not enough data to parse a record
    #[error("Insufficient data to parse record")]
    InsufficientData,

    /// Length field too small to hold a record
    #[error("Invalid record format")]
    InvalidFormat,

    /// Checksum verification failed
    #[error("Checksum mismatch: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        /// Checksum stored in the record
        expected: u32,
        /// Checksum of the record body
        computed: u32,
    },
}

// ============================================================================
// Provider
// ============================================================================

/// Persistent provider over an append-only log file
pub struct LogProvider {
    dir: PathBuf,
    sync_on_write: bool,
    entities: EntityMap,
    file: Mutex<Option<File>>,
    lifecycle: Lifecycle,
}

impl LogProvider {
    /// Stopped provider rooted at `dir`; nothing is read until `start`
    pub fn new(dir: impl Into<PathBuf>, sync_on_write: bool) -> Self {
        LogProvider {
            dir: dir.into(),
            sync_on_write,
            entities: DashMap::with_hasher(Default::default()),
            file: Mutex::new(None),
            lifecycle: Lifecycle::new(LOG_PROVIDER),
        }
    }

    /// Path of the log file
    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    /// Open the log and rebuild the map from it
    fn replay(&self) -> Result<File> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.log_path();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        let started = Instant::now();
        let records = replay_records(&mut file, &path, |record| {
            self.entities.insert(record.nid, Arc::from(record.bytes));
            Ok(())
        })?;
        info!(
            records,
            entities = entity_count(&self.entities),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "log replayed"
        );
        Ok(file)
    }
}

impl StoreProvider for LogProvider {
    fn name(&self) -> &str {
        LOG_PROVIDER
    }

    fn start(&self) -> Result<()> {
        self.lifecycle.begin()?;
        match self.replay() {
            Ok(file) => {
                *self.file.lock() = Some(file);
                info!(provider = LOG_PROVIDER, dir = %self.dir.display(), "provider started");
                Ok(())
            }
            Err(e) => {
                self.entities.clear();
                self.lifecycle.abort();
                Err(e)
            }
        }
    }

    fn stop(&self) -> Result<()> {
        self.lifecycle.end()?;
        if let Some(file) = self.file.lock().take() {
            file.sync_all()?;
        }
        let entities = entity_count(&self.entities);
        self.entities.clear();
        info!(provider = LOG_PROVIDER, entities, "provider stopped");
        Ok(())
    }

    fn running(&self) -> bool {
        self.lifecycle.is_running()
    }

    fn get(&self, nid: Nid) -> Result<Vec<u8>> {
        self.lifecycle.check()?;
        read_entity(&self.entities, nid)
    }

    fn update(&self, nid: Nid, f: &mut Updater<'_>) -> Result<()> {
        self.lifecycle.check()?;
        update_entity(&self.entities, nid, f, |next| {
            let record = encode_record(nid, next);
            let mut guard = self.file.lock();
            let file = guard
                .as_mut()
                .ok_or_else(|| Error::NotRunning(LOG_PROVIDER.to_string()))?;
            let appended = append_record(file, &record, self.sync_on_write);
            if let Err(Error::Corruption(_)) = appended {
                warn!(provider = LOG_PROVIDER, nid = %nid, "log end unknown, refusing further writes");
                guard.take();
            }
            appended
        })
    }

    fn contains(&self, nid: Nid) -> bool {
        contains_entity(&self.entities, nid)
    }

    fn len(&self) -> usize {
        entity_count(&self.entities)
    }

    fn for_each(&self, traversal: Traversal, visitor: &Visitor<'_>) -> Result<()> {
        self.lifecycle.check()?;
        traverse(&self.entities, traversal, visitor);
        Ok(())
    }
}

impl std::fmt::Debug for LogProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogProvider")
            .field("dir", &self.dir)
            .field("sync_on_write", &self.sync_on_write)
            .field("entities", &self.entities.len())
            .field("running", &self.lifecycle.is_running())
            .finish()
    }
}

/// True if `dir` holds a log written by this provider
pub fn log_exists(dir: &Path) -> bool {
    dir.join(LOG_FILE_NAME).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn put(p: &LogProvider, nid: i32, bytes: &[u8]) {
        let owned = bytes.to_vec();
        p.update(Nid::from_raw(nid), &mut |_| Ok(owned.clone())).unwrap();
    }

    #[test]
    fn test_record_layout() {
        let bytes = LogRecord {
            nid: Nid::from_raw(7),
            bytes: vec![0xAA, 0xBB],
        }
        .to_bytes();
        assert_eq!(bytes.len(), RECORD_OVERHEAD + 2);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 10]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 7]);
        assert_eq!(&bytes[8..10], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_record_parse() {
        let record = LogRecord {
            nid: Nid::from_raw(3),
            bytes: b"chronology".to_vec(),
        };
        let mut bytes = record.to_bytes();
        bytes.extend_from_slice(b"next");
        let (parsed, consumed) = LogRecord::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(consumed, bytes.len() - 4);
    }

    #[test]
    fn test_record_checksum() {
        let mut bytes = LogRecord {
            nid: Nid::from_raw(3),
            bytes: vec![1, 2, 3],
        }
        .to_bytes();
        bytes[9] ^= 0xFF;
        assert!(matches!(
            LogRecord::from_bytes(&bytes),
            Err(LogRecordError::ChecksumMismatch { .. })
        ));
        assert_eq!(
            LogRecord::from_bytes(&bytes[..6]),
            Err(LogRecordError::InsufficientData)
        );
        assert_eq!(
            LogRecord::from_bytes(&[0, 0, 0, 2, 0, 0]),
            Err(LogRecordError::InvalidFormat)
        );
    }

    #[test]
    fn test_survives_restart() {
        let dir = tempdir().unwrap();
        let p = LogProvider::new(dir.path(), false);
        p.start().unwrap();
        put(&p, 1, b"first");
        put(&p, 2, b"second");
        put(&p, 1, b"first, again");
        p.stop().unwrap();
        assert_eq!(p.len(), 0);

        let reopened = LogProvider::new(dir.path(), false);
        reopened.start().unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(Nid::from_raw(1)).unwrap(), b"first, again".to_vec());
        assert_eq!(reopened.get(Nid::from_raw(2)).unwrap(), b"second".to_vec());
    }

    #[test]
    fn test_torn_tail_truncated() {
        let dir = tempdir().unwrap();
        let p = LogProvider::new(dir.path(), true);
        p.start().unwrap();
        put(&p, 1, b"kept");
        p.stop().unwrap();

        let path = dir.path().join(LOG_FILE_NAME);
        let valid_len = std::fs::metadata(&path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        let torn = encode_record(Nid::from_raw(2), b"lost");
        file.write_all(&torn[..torn.len() - 3]).unwrap();
        drop(file);

        p.start().unwrap();
        assert_eq!(p.len(), 1);
        assert!(!p.contains(Nid::from_raw(2)));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), valid_len);

        // appends continue after the truncation point
        put(&p, 3, b"after");
        p.stop().unwrap();
        p.start().unwrap();
        assert_eq!(p.get(Nid::from_raw(3)).unwrap(), b"after".to_vec());
    }

    /// In-memory log file that fails once `budget` bytes are written
    struct ShortWriter {
        cursor: std::io::Cursor<Vec<u8>>,
        budget: Option<usize>,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = match self.budget {
                Some(0) => return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full")),
                Some(budget) => budget.min(buf.len()),
                None => buf.len(),
            };
            if let Some(budget) = self.budget.as_mut() {
                *budget -= n;
            }
            self.cursor.write(&buf[..n])
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Seek for ShortWriter {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.cursor.seek(pos)
        }
    }

    impl LogFile for ShortWriter {
        fn truncate_to(&mut self, len: u64) -> std::io::Result<()> {
            self.cursor.get_mut().truncate(len as usize);
            self.cursor.set_position(len);
            Ok(())
        }

        fn sync(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_short_write_rolled_back() {
        let mut file = ShortWriter {
            cursor: std::io::Cursor::new(Vec::new()),
            budget: None,
        };
        let first = encode_record(Nid::from_raw(1), b"first");
        let lost = encode_record(Nid::from_raw(2), b"never committed");
        let third = encode_record(Nid::from_raw(3), b"third");

        append_record(&mut file, &first, false).unwrap();
        file.budget = Some(7);
        assert!(matches!(
            append_record(&mut file, &lost, true),
            Err(Error::IoError(_))
        ));
        file.budget = None;
        append_record(&mut file, &third, false).unwrap();

        // the later record follows the earlier one directly
        let bytes = file.cursor.into_inner();
        assert_eq!(bytes.len(), first.len() + third.len());
        let (a, consumed) = LogRecord::from_bytes(&bytes).unwrap();
        let (b, _) = LogRecord::from_bytes(&bytes[consumed..]).unwrap();
        assert_eq!(a.nid, Nid::from_raw(1));
        assert_eq!(b.nid, Nid::from_raw(3));
        assert_eq!(b.bytes, b"third".to_vec());
    }

    #[test]
    fn test_log_exists() {
        let dir = tempdir().unwrap();
        assert!(!log_exists(dir.path()));
        let p = LogProvider::new(dir.path(), false);
        p.start().unwrap();
        assert!(log_exists(dir.path()));
    }
}
