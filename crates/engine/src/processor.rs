//! Full-store entity processors
//!
//! A processor is handed every stored chronology by a traversal. Processors
//! are shared by reference across rayon workers, so all state is atomic and
//! `process` never needs `&mut self`.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use termstore_core::Nid;
use termstore_entity::{Entity, EntityHeader, EntityKind};
use tracing::warn;

/// Consumer of stored chronologies
pub trait EntityProcessor: Sync {
    /// Handle the chronology bytes stored under `nid`
    fn process(&self, nid: Nid, bytes: &[u8]);

    /// One-line summary of what was processed
    fn report(&self) -> String;
}

/// Counts observed by an [`EntityCounter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    /// Chronologies seen
    pub entities: u64,
    /// Versions across all chronologies
    pub versions: u64,
    /// Concept chronologies
    pub concepts: u64,
    /// Pattern chronologies
    pub patterns: u64,
    /// Semantic chronologies
    pub semantics: u64,
    /// Stamp chronologies
    pub stamps: u64,
    /// Byte strings that did not carry a valid header
    pub failures: u64,
}

/// Counts chronologies and versions by kind, reading headers only
#[derive(Debug, Default)]
pub struct EntityCounter {
    entities: AtomicU64,
    versions: AtomicU64,
    concepts: AtomicU64,
    patterns: AtomicU64,
    semantics: AtomicU64,
    stamps: AtomicU64,
    failures: AtomicU64,
}

impl EntityCounter {
    /// Counter with every count at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counts
    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            entities: self.entities.load(Ordering::Relaxed),
            versions: self.versions.load(Ordering::Relaxed),
            concepts: self.concepts.load(Ordering::Relaxed),
            patterns: self.patterns.load(Ordering::Relaxed),
            semantics: self.semantics.load(Ordering::Relaxed),
            stamps: self.stamps.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl EntityProcessor for EntityCounter {
    fn process(&self, nid: Nid, bytes: &[u8]) {
        let header = match EntityHeader::read(bytes) {
            Ok((header, _)) => header,
            Err(e) => {
                warn!(target: "termstore::processor", nid = %nid, error = %e, "unreadable chronology header");
                self.failures.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        self.entities.fetch_add(1, Ordering::Relaxed);
        self.versions
            .fetch_add(header.version_count as u64, Ordering::Relaxed);
        let by_kind = match header.kind {
            EntityKind::Concept => &self.concepts,
            EntityKind::Pattern => &self.patterns,
            EntityKind::Semantic { .. } => &self.semantics,
            EntityKind::Stamp => &self.stamps,
        };
        by_kind.fetch_add(1, Ordering::Relaxed);
    }

    fn report(&self) -> String {
        let c = self.counts();
        format!(
            "entities: {} versions: {} (concepts: {} patterns: {} semantics: {} stamps: {}) failures: {}",
            c.entities, c.versions, c.concepts, c.patterns, c.semantics, c.stamps, c.failures
        )
    }
}

/// Fully decodes every chronology, recording the ones that fail
#[derive(Debug, Default)]
pub struct EntityRealizer {
    realized: AtomicU64,
    versions: AtomicU64,
    failed: Mutex<Vec<Nid>>,
}

impl EntityRealizer {
    /// Realizer with nothing processed
    pub fn new() -> Self {
        Self::default()
    }

    /// Chronologies decoded successfully
    pub fn realized(&self) -> u64 {
        self.realized.load(Ordering::Relaxed)
    }

    /// Versions decoded successfully
    pub fn versions(&self) -> u64 {
        self.versions.load(Ordering::Relaxed)
    }

    /// Nids whose bytes did not decode, ascending
    pub fn failed(&self) -> Vec<Nid> {
        let mut failed = self.failed.lock().clone();
        failed.sort_unstable();
        failed
    }
}

impl EntityProcessor for EntityRealizer {
    fn process(&self, nid: Nid, bytes: &[u8]) {
        match Entity::from_bytes(bytes) {
            Ok(entity) if entity.nid() == nid => {
                self.realized.fetch_add(1, Ordering::Relaxed);
                self.versions
                    .fetch_add(entity.version_count() as u64, Ordering::Relaxed);
            }
            Ok(entity) => {
                warn!(target: "termstore::processor", nid = %nid, found = %entity.nid(), "chronology stored under the wrong nid");
                self.failed.lock().push(nid);
            }
            Err(e) => {
                warn!(target: "termstore::processor", nid = %nid, error = %e, "chronology failed to decode");
                self.failed.lock().push(nid);
            }
        }
    }

    fn report(&self) -> String {
        format!(
            "realized: {} versions: {} failed: {}",
            self.realized(),
            self.versions(),
            self.failed.lock().len()
        )
    }
}
