//! Component identity types
//!
//! - `Nid`: compact native identifier interned per component
//! - `PublicId`: the set of UUIDs naming one component
//! - `content_uuid`: name-based UUID derived from a list of UUIDs
//!
//! ## Content addressing
//!
//! Derived identities (stamps, coordinates) are UUIDv5 hashes over the
//! canonical string form of a UUID list: `[a, b, c]`, lower-case hyphenated,
//! separated by `", "`. The same list always yields the same UUID on every
//! machine.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use uuid::Uuid;

/// Native identifier for a component
///
/// Nids are assigned by the identity directory, once per distinct public id,
/// starting at 1. Zero and negative values are never assigned; `Nid::UNASSIGNED`
/// is the sentinel for "no component".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nid(i32);

impl Nid {
    /// Sentinel for "not assigned"
    pub const UNASSIGNED: Nid = Nid(0);

    /// First nid handed out by a fresh directory
    pub const FIRST: Nid = Nid(1);

    /// Wrap a raw value
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Nid(raw)
    }

    /// Raw value as stored on disk
    #[inline]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }

    /// True if this nid can refer to a component
    #[inline]
    pub const fn is_assigned(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Nid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Nid> for i32 {
    fn from(nid: Nid) -> Self {
        nid.0
    }
}

/// Public identifier: an ordered set of UUIDs naming one component
///
/// The first UUID is the primary one. A component may accumulate more UUIDs
/// over time (merges) but never loses one. Duplicates are dropped on
/// construction, insertion order is otherwise kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicId {
    uuids: SmallVec<[Uuid; 1]>,
}

impl PublicId {
    /// Create a public id from one or more UUIDs
    ///
    /// # Errors
    /// `InvalidOperation` if `uuids` is empty or contains the nil UUID.
    pub fn new<I: IntoIterator<Item = Uuid>>(uuids: I) -> Result<Self> {
        let mut out: SmallVec<[Uuid; 1]> = SmallVec::new();
        for uuid in uuids {
            if uuid.is_nil() {
                return Err(Error::InvalidOperation(
                    "nil UUID cannot name a component".to_string(),
                ));
            }
            if !out.contains(&uuid) {
                out.push(uuid);
            }
        }
        if out.is_empty() {
            return Err(Error::InvalidOperation(
                "public id requires at least one UUID".to_string(),
            ));
        }
        Ok(PublicId { uuids: out })
    }

    /// Public id with a single UUID
    ///
    /// A nil UUID is accepted here; callers that take user input should use
    /// [`PublicId::new`].
    pub fn from_uuid(uuid: Uuid) -> Self {
        let mut uuids = SmallVec::new();
        uuids.push(uuid);
        PublicId { uuids }
    }

    /// Fresh random public id (UUID v4)
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// UUIDs in insertion order
    pub fn uuids(&self) -> &[Uuid] {
        &self.uuids
    }

    /// The first UUID
    pub fn primary(&self) -> Uuid {
        self.uuids[0]
    }

    /// UUIDs in canonical (sorted) order
    pub fn sorted(&self) -> Vec<Uuid> {
        let mut sorted = self.uuids.to_vec();
        sorted.sort();
        sorted
    }

    /// Number of UUIDs
    pub fn len(&self) -> usize {
        self.uuids.len()
    }

    /// Always false: a public id holds at least one UUID
    pub fn is_empty(&self) -> bool {
        self.uuids.is_empty()
    }

    /// True if `uuid` names this component
    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.uuids.contains(uuid)
    }

    /// True if the two ids share any UUID (and so name the same component)
    pub fn intersects(&self, other: &PublicId) -> bool {
        self.uuids.iter().any(|u| other.contains(u))
    }

    /// Union of both ids, keeping `self`'s order first
    pub fn merged(&self, other: &PublicId) -> PublicId {
        let mut uuids = self.uuids.clone();
        for uuid in other.uuids() {
            if !uuids.contains(uuid) {
                uuids.push(*uuid);
            }
        }
        PublicId { uuids }
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&canonical_uuid_list(&self.uuids))
    }
}

impl From<Uuid> for PublicId {
    fn from(uuid: Uuid) -> Self {
        PublicId::from_uuid(uuid)
    }
}

/// Canonical string form of a UUID list: `[a, b, c]`
pub fn canonical_uuid_list(uuids: &[Uuid]) -> String {
    let mut out = String::with_capacity(2 + uuids.len() * 38);
    out.push('[');
    for (i, uuid) in uuids.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&uuid.hyphenated().to_string());
    }
    out.push(']');
    out
}

/// Name-based UUID over the canonical string of `uuids`
pub fn content_uuid(namespace: &Uuid, uuids: &[Uuid]) -> Uuid {
    Uuid::new_v5(namespace, canonical_uuid_list(uuids).as_bytes())
}
