//! Nid <-> UUID directory
//!
//! # Design
//!
//! - Two DashMaps: UUID -> nid and nid -> public id. Reads never block.
//! - Nids come from a single atomic sequence starting at `Nid::FIRST`.
//! - First-sight assignment is serialized by one mutex and re-checked under
//!   it, so two threads naming the same new UUID converge on one nid.
//! - Append-only: a mapping is never removed and a nid never reused.
//! - With a journal attached, every new nid and every merge is recorded
//!   before it is published; a failed record aborts the assignment.
//!
//! The public id entry is published before its UUID entries, so any reader
//! that finds a nid through a UUID also finds its public id.

use super::journal::IdentityJournal;
use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use termstore_core::{Error, Nid, PublicId, Result, TextLookup, UuidSource};
use tracing::debug;
use uuid::Uuid;

type FxBuild = BuildHasherDefault<FxHasher>;

/// Process-wide identity directory
///
/// Passed by reference to everything that resolves identity; there is no
/// global instance.
pub struct IdentityDirectory {
    by_uuid: DashMap<Uuid, Nid, FxBuild>,
    by_nid: DashMap<Nid, PublicId, FxBuild>,
    next_nid: AtomicI32,
    assign: Mutex<()>,
    journal: Option<Arc<dyn IdentityJournal>>,
}

impl IdentityDirectory {
    /// Empty directory
    pub fn new() -> Self {
        IdentityDirectory {
            by_uuid: DashMap::with_hasher(FxBuild::default()),
            by_nid: DashMap::with_hasher(FxBuild::default()),
            next_nid: AtomicI32::new(Nid::FIRST.as_i32()),
            assign: Mutex::new(()),
            journal: None,
        }
    }

    /// Empty directory that records every assignment in `journal`
    ///
    /// Mappings replayed through [`restore`](Self::restore) are not recorded
    /// again.
    pub fn with_journal(journal: Arc<dyn IdentityJournal>) -> Self {
        IdentityDirectory {
            journal: Some(journal),
            ..Self::new()
        }
    }

    /// Nid for a UUID set, assigned on first sight
    ///
    /// If some of the UUIDs already name a component, the others are added
    /// to that component's public id.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if `uuids` is empty, contains the nil UUID, or
    ///   spans two different existing components
    pub fn nid_for_uuids(&self, uuids: &[Uuid]) -> Result<Nid> {
        // Fast path: every UUID already bound to the same nid
        if let Some(nid) = self.bound_nid(uuids)? {
            if uuids.iter().all(|u| self.by_uuid.contains_key(u)) {
                return Ok(nid);
            }
        }

        let _guard = self.assign.lock();
        if let Some(nid) = self.bound_nid(uuids)? {
            self.bind_locked(nid, uuids)?;
            return Ok(nid);
        }

        let public_id = PublicId::new(uuids.iter().copied())?;
        let raw = self.next_nid.fetch_add(1, Ordering::AcqRel);
        if raw < Nid::FIRST.as_i32() {
            return Err(Error::InvalidOperation("nid sequence exhausted".to_string()));
        }
        let nid = Nid::from_raw(raw);
        if let Some(journal) = &self.journal {
            journal.record(nid, &public_id)?;
        }
        self.by_nid.insert(nid, public_id);
        for uuid in uuids {
            self.by_uuid.insert(*uuid, nid);
        }
        Ok(nid)
    }

    /// Nid for a public id, assigned on first sight
    ///
    /// # Errors
    ///
    /// As [`IdentityDirectory::nid_for_uuids`].
    pub fn nid_for_public_id(&self, public_id: &PublicId) -> Result<Nid> {
        self.nid_for_uuids(public_id.uuids())
    }

    /// Nid for a single UUID, assigned on first sight
    ///
    /// # Errors
    ///
    /// As [`IdentityDirectory::nid_for_uuids`].
    pub fn nid_for_uuid(&self, uuid: Uuid) -> Result<Nid> {
        self.nid_for_uuids(&[uuid])
    }

    /// Existing nid for a UUID, without assigning
    ///
    /// # Errors
    ///
    /// `UuidNotFound` if no component carries `uuid`.
    pub fn existing_nid(&self, uuid: &Uuid) -> Result<Nid> {
        self.by_uuid
            .get(uuid)
            .map(|nid| *nid)
            .ok_or(Error::UuidNotFound(*uuid))
    }

    /// Re-register a persisted mapping during recovery
    ///
    /// Advances the nid sequence past `nid`. Restoring the same mapping
    /// twice is a no-op; UUIDs learned since are merged in.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if `nid` is a sentinel or any UUID already names
    ///   another nid
    pub fn restore(&self, nid: Nid, public_id: &PublicId) -> Result<()> {
        if !nid.is_assigned() {
            return Err(Error::InvalidOperation(format!(
                "cannot restore sentinel nid {}",
                nid
            )));
        }
        let _guard = self.assign.lock();
        for uuid in public_id.uuids() {
            if let Some(existing) = self.by_uuid.get(uuid) {
                if *existing != nid {
                    return Err(Error::InvalidOperation(format!(
                        "uuid {} restored for {} but bound to {}",
                        uuid, nid, *existing
                    )));
                }
            }
        }
        self.by_nid
            .entry(nid)
            .and_modify(|known| *known = known.merged(public_id))
            .or_insert_with(|| public_id.clone());
        for uuid in public_id.uuids() {
            self.by_uuid.insert(*uuid, nid);
        }
        self.next_nid.fetch_max(nid.as_i32().saturating_add(1), Ordering::AcqRel);
        Ok(())
    }

    /// Add UUIDs to an existing component
    ///
    /// Returns the merged public id.
    ///
    /// # Errors
    ///
    /// - `NidNotFound` if `nid` was never assigned
    /// - `InvalidOperation` if a UUID already names another component
    pub fn merge_uuids(&self, nid: Nid, uuids: &[Uuid]) -> Result<PublicId> {
        let _guard = self.assign.lock();
        if !self.by_nid.contains_key(&nid) {
            return Err(Error::NidNotFound(nid));
        }
        self.bind_locked(nid, uuids)?;
        self.public_id(nid)
    }

    /// Number of assigned nids
    pub fn len(&self) -> usize {
        self.by_nid.len()
    }

    /// True if nothing was assigned
    pub fn is_empty(&self) -> bool {
        self.by_nid.is_empty()
    }

    /// The nid the next first-seen UUID set would get
    pub fn peek_next_nid(&self) -> Nid {
        Nid::from_raw(self.next_nid.load(Ordering::Acquire))
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// The one nid the bound UUIDs of `uuids` share, if any are bound
    fn bound_nid(&self, uuids: &[Uuid]) -> Result<Option<Nid>> {
        let mut found: Option<Nid> = None;
        for uuid in uuids {
            if let Some(nid) = self.by_uuid.get(uuid).map(|n| *n) {
                match found {
                    None => found = Some(nid),
                    Some(prev) if prev != nid => {
                        return Err(Error::InvalidOperation(format!(
                            "uuids span components {} and {}",
                            prev, nid
                        )))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(found)
    }

    /// Bind unbound UUIDs to `nid`; caller holds `assign`
    fn bind_locked(&self, nid: Nid, uuids: &[Uuid]) -> Result<()> {
        let fresh: Vec<Uuid> = uuids
            .iter()
            .copied()
            .filter(|u| !self.by_uuid.contains_key(u))
            .collect();
        if let Some(taken) = uuids
            .iter()
            .find(|u| self.by_uuid.get(*u).map_or(false, |n| *n != nid))
        {
            return Err(Error::InvalidOperation(format!(
                "uuid {} already names another component",
                taken
            )));
        }
        if fresh.is_empty() {
            return Ok(());
        }
        let addition = PublicId::new(fresh.iter().copied())?;
        let merged = self.public_id(nid)?.merged(&addition);
        if let Some(journal) = &self.journal {
            journal.record(nid, &merged)?;
        }
        self.by_nid.insert(nid, merged);
        for uuid in &fresh {
            self.by_uuid.insert(*uuid, nid);
        }
        debug!(nid = %nid, added = fresh.len(), "merged uuids");
        Ok(())
    }
}

impl Default for IdentityDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl UuidSource for IdentityDirectory {
    fn public_id(&self, nid: Nid) -> Result<PublicId> {
        self.by_nid
            .get(&nid)
            .map(|id| id.clone())
            .ok_or(Error::NidNotFound(nid))
    }
}

impl TextLookup for IdentityDirectory {
    fn text(&self, nid: Nid) -> String {
        match self.by_nid.get(&nid) {
            Some(id) => id.primary().to_string(),
            None => format!("<{}>", nid),
        }
    }
}

impl std::fmt::Debug for IdentityDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityDirectory")
            .field("journaled", &self.journal.is_some())
            .field("nids", &self.by_nid.len())
            .field("uuids", &self.by_uuid.len())
            .field("next_nid", &self.peek_next_nid())
            .finish()
    }
}
