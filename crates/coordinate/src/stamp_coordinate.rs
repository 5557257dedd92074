//! Stamp coordinates
//!
//! A `StampCoordinate` is a point of view: which statuses count, how far in
//! time to look, which path to follow, and how to rank modules when more
//! than one has something to say. It is a plain value, freely shared across
//! threads.
//!
//! Empty `allowed_statuses` or `modules` sets mean "any".

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use termstore_core::{canonical_uuid_list, Nid, Result, Timestamp, UuidSource};
use uuid::Uuid;

/// Namespace for stamp coordinate UUIDs
pub const STAMP_COORDINATE_NAMESPACE: Uuid =
    Uuid::from_u128(0x2b8e_47d1_c06a_5f93_8a14_e7c2_59b0_d36f);

/// Point-of-view specification for version visibility
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StampCoordinate {
    allowed_statuses: BTreeSet<Nid>,
    time_ceiling: Timestamp,
    path: Nid,
    modules: BTreeSet<Nid>,
    module_precedence: Vec<Nid>,
    default_module_precedence: Vec<Nid>,
}

impl StampCoordinate {
    /// Coordinate with explicit statuses, ceiling and path
    pub fn new<I>(allowed_statuses: I, time_ceiling: Timestamp, path: Nid) -> Self
    where
        I: IntoIterator<Item = Nid>,
    {
        StampCoordinate {
            allowed_statuses: allowed_statuses.into_iter().collect(),
            time_ceiling,
            path,
            modules: BTreeSet::new(),
            module_precedence: Vec::new(),
            default_module_precedence: Vec::new(),
        }
    }

    /// Everything on `path`, up to the latest time, any status and module
    pub fn latest_on(path: Nid) -> Self {
        Self::new(std::iter::empty(), Timestamp::LATEST, path)
    }

    /// Same view, different time ceiling
    pub fn with_time(mut self, time_ceiling: Timestamp) -> Self {
        self.time_ceiling = time_ceiling;
        self
    }

    /// Same view, different path
    pub fn with_path(mut self, path: Nid) -> Self {
        self.path = path;
        self
    }

    /// Same view, only these statuses
    pub fn with_allowed_statuses<I: IntoIterator<Item = Nid>>(mut self, statuses: I) -> Self {
        self.allowed_statuses = statuses.into_iter().collect();
        self
    }

    /// Same view, only these modules
    pub fn with_modules<I: IntoIterator<Item = Nid>>(mut self, modules: I) -> Self {
        self.modules = modules.into_iter().collect();
        self
    }

    /// Same view, ranking modules in this order (earlier wins)
    pub fn with_module_precedence<I: IntoIterator<Item = Nid>>(mut self, precedence: I) -> Self {
        self.module_precedence = precedence.into_iter().collect();
        self
    }

    /// Same view, with a fallback ranking used when no precedence is set
    pub fn with_default_module_precedence<I: IntoIterator<Item = Nid>>(
        mut self,
        precedence: I,
    ) -> Self {
        self.default_module_precedence = precedence.into_iter().collect();
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Allowed statuses; empty allows every status
    pub fn allowed_statuses(&self) -> &BTreeSet<Nid> {
        &self.allowed_statuses
    }

    /// Latest visible time (inclusive)
    pub fn time_ceiling(&self) -> Timestamp {
        self.time_ceiling
    }

    /// Path whose versions are visible
    pub fn path(&self) -> Nid {
        self.path
    }

    /// Allowed modules; empty allows every module
    pub fn modules(&self) -> &BTreeSet<Nid> {
        &self.modules
    }

    /// Explicit module ranking
    pub fn module_precedence(&self) -> &[Nid] {
        &self.module_precedence
    }

    /// Fallback module ranking
    pub fn default_module_precedence(&self) -> &[Nid] {
        &self.default_module_precedence
    }

    /// The ranking in force: explicit if set, otherwise the default
    pub fn effective_precedence(&self) -> &[Nid] {
        if self.module_precedence.is_empty() {
            &self.default_module_precedence
        } else {
            &self.module_precedence
        }
    }

    /// True if versions with `status` can be visible
    pub fn allows_status(&self, status: Nid) -> bool {
        self.allowed_statuses.is_empty() || self.allowed_statuses.contains(&status)
    }

    /// True if versions from `module` can be visible
    pub fn allows_module(&self, module: Nid) -> bool {
        self.modules.is_empty() || self.modules.contains(&module)
    }

    /// Content-addressed UUID of this view
    ///
    /// Built from the sorted UUIDs of every referenced concept and the time
    /// ceiling, so equal coordinates agree across processes.
    ///
    /// # Errors
    ///
    /// `NidNotFound` if a referenced concept has no public id.
    pub fn content_uuid(&self, ids: &dyn UuidSource) -> Result<Uuid> {
        let name = format!(
            "{} {} {} {} {} {}",
            sorted_uuid_list(ids, self.allowed_statuses.iter().copied())?,
            self.time_ceiling.as_millis(),
            sorted_uuid_list(ids, [self.path])?,
            sorted_uuid_list(ids, self.modules.iter().copied())?,
            sorted_uuid_list(ids, self.module_precedence.iter().copied())?,
            sorted_uuid_list(ids, self.default_module_precedence.iter().copied())?,
        );
        Ok(Uuid::new_v5(&STAMP_COORDINATE_NAMESPACE, name.as_bytes()))
    }
}

/// Canonical list of the sorted UUID expansions of `nids`, in `nids` order
pub(crate) fn sorted_uuid_list<I>(ids: &dyn UuidSource, nids: I) -> Result<String>
where
    I: IntoIterator<Item = Nid>,
{
    let mut uuids = Vec::new();
    for nid in nids {
        ids.add_sorted_uuids(&mut uuids, nid)?;
    }
    Ok(canonical_uuid_list(&uuids))
}
