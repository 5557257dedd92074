//! Read seam over stored chronologies
//!
//! Coordinates and calculators resolve entities through this trait so they
//! never depend on a concrete service or provider.

use crate::entity::Entity;
use termstore_core::{Nid, Result};

/// Read access to decoded chronologies
pub trait EntitySource: Send + Sync {
    /// The chronology stored under `nid`
    ///
    /// # Errors
    ///
    /// `NidNotFound` if nothing is stored under `nid`; codec errors if the
    /// stored bytes do not decode.
    fn entity(&self, nid: Nid) -> Result<Entity>;

    /// Nids of the semantics of `pattern` whose referenced component is
    /// `component`, in ascending nid order
    fn semantic_nids_for_component_of_pattern(&self, component: Nid, pattern: Nid) -> Vec<Nid>;
}
