//! Entity model and binary codec for termstore
//!
//! - `VersionKind` / `EntityKind`: closed set of version and chronology kinds
//! - `EntityVersion`: stamp reference plus kind-specific payload
//! - `Entity`: a component's identity and append-only version log
//! - `codec`: byte-exact version record format
//! - `EntitySource`: read seam used by coordinates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod entity;
pub mod kind;
pub mod logic_graph;
pub mod source;
pub mod version;

pub use codec::{decode_any_version, decode_version, encode_version, version_size, version_to_bytes, VERSION_HEADER_SIZE};
pub use entity::{Entity, EntityHeader, ENTITY_FORMAT_VERSION};
pub use kind::{EntityKind, VersionKind};
pub use logic_graph::{LogicGraph, LogicVertex};
pub use source::EntitySource;
pub use version::{Description, EntityVersion, FieldDefinition, PatternDefinition, Relationship, VersionData};
