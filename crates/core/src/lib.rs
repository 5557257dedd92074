//! Core types and traits for termstore
//!
//! This crate defines the foundational types used throughout the system:
//! - Nid: compact native identifier for a component
//! - PublicId: the UUID set naming a component
//! - Stamp: Status/Time/Author/Module/Path attribution record
//! - Timestamp: millisecond STAMP time
//! - Latest: tagged result of version resolution
//! - Error: Error type hierarchy
//! - Traits: identity and text resolution seams (UuidSource, TextLookup)
//! - Terms: well-known concepts and patterns

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod error;
pub mod ids;
pub mod stamp;
pub mod terms;
pub mod traits;

pub use contract::{Latest, Timestamp};
pub use error::{Error, Result};
pub use ids::{canonical_uuid_list, content_uuid, Nid, PublicId};
pub use stamp::{Stamp, STAMP_NAMESPACE};
pub use terms::Term;
pub use traits::{StampSource, TextLookup, UuidSource};

pub use uuid::Uuid;
