//! Entity service for termstore
//!
//! This crate orchestrates all lower layers:
//! - EntityService: provider selection, open/start/stop, recovery
//! - Writes: stamp interning and version appends
//! - Reads: chronology decode and latest resolution
//! - SemanticIndex: (component, pattern) → semantics
//! - Processors: full-store traversal consumers
//!
//! The service is the only component that knows about:
//! - Where bytes live (provider) and what they mean (codec)
//! - Rebuilding the in-memory directories from stored chronologies

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod processor;
pub mod service;

pub use index::SemanticIndex;
pub use processor::{EntityCounter, EntityCounts, EntityProcessor, EntityRealizer};
pub use service::{EntityService, StoreConfig, CONFIG_FILE_NAME, OPEN_SERVICES};
