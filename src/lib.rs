//! termstore - versioned entity storage for terminology knowledge bases
//!
//! Every unit of knowledge (concept, pattern, semantic, stamp) is a
//! chronology: an identity plus an append-only log of versions, each stamped
//! with Status/Time/Author/Module/Path. Readers resolve what is visible from
//! a point of view (a [`StampCoordinate`]) and get back a [`Latest`]: empty,
//! unique, or an explicit conflict.
//!
//! # Quick Start
//!
//! ```ignore
//! use termstore::{EntityService, PublicId, Stamp, StampCoordinate, Timestamp};
//! use termstore::terms::{ACTIVE_STATE, DEVELOPMENT_PATH, PRIMORDIAL_MODULE, USER};
//!
//! let service = EntityService::ephemeral()?;
//! let stamp = service.intern_stamp(Stamp::new(
//!     service.nid_for_term(ACTIVE_STATE)?,
//!     Timestamp::now(),
//!     service.nid_for_term(USER)?,
//!     service.nid_for_term(PRIMORDIAL_MODULE)?,
//!     service.nid_for_term(DEVELOPMENT_PATH)?,
//! ))?;
//! let concept = service.create_concept(&PublicId::random(), stamp)?;
//!
//! let view = StampCoordinate::latest_on(service.nid_for_term(DEVELOPMENT_PATH)?);
//! let latest = service.latest(concept, &view)?;
//! ```
//!
//! # Architecture
//!
//! - `termstore-core`: identifiers, stamps, `Latest`, errors, well-known terms
//! - `termstore-entity`: version kinds and the binary chronology codec
//! - `termstore-storage`: identity/stamp directories and store providers
//! - `termstore-coordinate`: stamp/logic coordinates and the latest resolver
//! - `termstore-engine`: the `EntityService` tying them together

pub use termstore_coordinate::{
    LogicCoordinate, PremiseType, RelativePosition, StampCalculator, StampCoordinate,
};
pub use termstore_core::{
    terms, Error, Latest, Nid, PublicId, Result, Stamp, StampSource, Term, TextLookup, Timestamp,
    Uuid, UuidSource,
};
pub use termstore_engine::{
    EntityCounter, EntityCounts, EntityProcessor, EntityRealizer, EntityService, StoreConfig,
};
pub use termstore_entity::{
    Description, Entity, EntityKind, EntitySource, EntityVersion, LogicGraph, LogicVertex,
    Relationship, VersionData, VersionKind,
};
pub use termstore_storage::{
    score_by_name, IdentityDirectory, LogProvider, MemoryProvider, ProviderController,
    ProviderOptions, ProviderRegistry, StampDirectory, StoreProvider, Traversal,
};
