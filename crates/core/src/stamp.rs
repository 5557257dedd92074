//! STAMP attribution records
//!
//! A `Stamp` is the {Status, Time, Author, Module, Path} tuple attached to
//! every version. Stamps are immutable values; the stamp directory interns
//! them so that equal tuples share one nid, and versions refer to that nid
//! instead of embedding the tuple.
//!
//! A stamp's UUID is content-addressed: UUIDv5 (namespace
//! [`STAMP_NAMESPACE`]) over
//!
//! ```text
//! [status uuids] <time millis> [author uuids] [module uuids] [path uuids]
//! ```
//!
//! with each bracketed list in canonical sorted order. Interning the same
//! tuple on any machine therefore produces the same public id.

use crate::contract::Timestamp;
use crate::error::Result;
use crate::ids::{canonical_uuid_list, Nid};
use crate::traits::{TextLookup, UuidSource};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for stamp UUIDs
pub const STAMP_NAMESPACE: Uuid = Uuid::from_u128(0x6f3c_1a52_8d0e_5b47_9e21_c4a8_0b7d_3f15);

/// Immutable attribution record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stamp {
    /// Status concept (active, inactive, canceled...)
    pub status: Nid,
    /// Authoring time
    pub time: Timestamp,
    /// Author concept
    pub author: Nid,
    /// Module concept
    pub module: Nid,
    /// Path concept
    pub path: Nid,
}

impl Stamp {
    /// Create a stamp
    pub fn new(status: Nid, time: Timestamp, author: Nid, module: Nid, path: Nid) -> Self {
        Stamp {
            status,
            time,
            author,
            module,
            path,
        }
    }

    /// Content-addressed UUID for this tuple
    ///
    /// # Errors
    ///
    /// `NidNotFound` if any of the referenced concepts has no public id.
    pub fn content_uuid(&self, ids: &dyn UuidSource) -> Result<Uuid> {
        let mut name = String::with_capacity(200);
        for (i, nid) in [self.status, self.author, self.module, self.path]
            .into_iter()
            .enumerate()
        {
            let mut uuids = Vec::with_capacity(1);
            ids.add_sorted_uuids(&mut uuids, nid)?;
            if i > 0 {
                name.push(' ');
            }
            name.push_str(&canonical_uuid_list(&uuids));
            if i == 0 {
                name.push(' ');
                name.push_str(&self.time.as_millis().to_string());
            }
        }
        Ok(Uuid::new_v5(&STAMP_NAMESPACE, name.as_bytes()))
    }

    /// Human-readable rendering for diagnostics
    pub fn describe(&self, text: &dyn TextLookup) -> String {
        format!(
            "s:{} t:{} a:{} m:{} p:{}",
            text.text(self.status),
            self.time,
            text.text(self.author),
            text.text(self.module),
            text.text(self.path)
        )
    }
}
