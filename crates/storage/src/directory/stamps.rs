//! Stamp interning
//!
//! A stamp's nid is the directory nid of its content-addressed UUID, so
//! equal tuples collapse to one nid without a separate sequence. This map
//! only caches nid -> tuple for resolution.

use super::identity::IdentityDirectory;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use termstore_core::{Error, Nid, Result, Stamp, StampSource};
use tracing::debug;

/// Interned stamps by nid
#[derive(Debug, Default)]
pub struct StampDirectory {
    stamps: DashMap<Nid, Stamp, BuildHasherDefault<FxHasher>>,
}

impl StampDirectory {
    /// Empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `stamp`, returning its nid and whether this call created it
    ///
    /// # Errors
    ///
    /// `NidNotFound` if a concept the stamp references has no public id.
    pub fn intern(&self, ids: &IdentityDirectory, stamp: Stamp) -> Result<(Nid, bool)> {
        let uuid = stamp.content_uuid(ids)?;
        let nid = ids.nid_for_uuid(uuid)?;
        match self.stamps.entry(nid) {
            Entry::Occupied(_) => Ok((nid, false)),
            Entry::Vacant(slot) => {
                slot.insert(stamp);
                debug!(nid = %nid, time = %stamp.time, "interned stamp");
                Ok((nid, true))
            }
        }
    }

    /// Re-register a persisted stamp during recovery
    pub fn restore(&self, nid: Nid, stamp: Stamp) {
        self.stamps.insert(nid, stamp);
    }

    /// True if `nid` is an interned stamp
    pub fn contains(&self, nid: Nid) -> bool {
        self.stamps.contains_key(&nid)
    }

    /// Number of interned stamps
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    /// True if no stamp was interned
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

impl StampSource for StampDirectory {
    fn stamp(&self, stamp_nid: Nid) -> Result<Stamp> {
        self.stamps
            .get(&stamp_nid)
            .map(|s| *s)
            .ok_or(Error::NidNotFound(stamp_nid))
    }
}
