//! Core traits for identity resolution
//!
//! These seams let value types (stamps, coordinates) derive content-based
//! identities and diagnostic text without depending on a concrete directory
//! or store.

use crate::error::Result;
use crate::ids::{Nid, PublicId};
use crate::stamp::Stamp;
use uuid::Uuid;

/// Read access to the nid <-> UUID mapping
///
/// Thread safety: implementations are shared across worker threads.
pub trait UuidSource: Send + Sync {
    /// Public id of an assigned nid
    ///
    /// # Errors
    ///
    /// `NidNotFound` if the nid was never assigned.
    fn public_id(&self, nid: Nid) -> Result<PublicId>;

    /// Append the UUIDs of `nid` to `target` in canonical sorted order
    ///
    /// Content-addressed hashing depends on this order being stable.
    ///
    /// # Errors
    ///
    /// `NidNotFound` if the nid was never assigned.
    fn add_sorted_uuids(&self, target: &mut Vec<Uuid>, nid: Nid) -> Result<()> {
        let public_id = self.public_id(nid)?;
        target.extend(public_id.sorted());
        Ok(())
    }
}

/// Human-readable text for a component, for diagnostics only
///
/// Never used in identity or comparison logic.
pub trait TextLookup {
    /// Display text for `nid`; must not fail
    fn text(&self, nid: Nid) -> String;
}

/// Lookup of interned stamps by nid
pub trait StampSource: Send + Sync {
    /// The stamp interned under `stamp_nid`
    ///
    /// # Errors
    ///
    /// `NidNotFound` if no stamp was interned under that nid.
    fn stamp(&self, stamp_nid: Nid) -> Result<Stamp>;
}
