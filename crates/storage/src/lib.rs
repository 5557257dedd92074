//! Storage layer for termstore
//!
//! This crate provides:
//! - IdentityDirectory: nid <-> UUID mapping with concurrent first-sight assignment
//! - IdentityLog: durable record of every nid assignment
//! - StampDirectory: stamp interning by content-addressed UUID
//! - StoreProvider: the byte-level backend contract (lifecycle, get, update, traversal)
//! - MemoryProvider: DashMap-based ephemeral provider
//! - LogProvider: append-only, CRC-checked log file provider
//! - ProviderRegistry: named controllers with scored selection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod append_log;
pub mod directory;
pub mod memory;
pub mod provider;
pub mod registry;

pub use append_log::{log_exists, LogProvider, LogRecord, LogRecordError, LOG_FILE_NAME, LOG_PROVIDER};
pub use directory::{IdentityDirectory, IdentityJournal, IdentityLog, StampDirectory, IDENTITY_LOG_FILE_NAME};
pub use memory::{MemoryProvider, MEMORY_PROVIDER};
pub use provider::{ProviderOptions, StoreProvider, Traversal, Updater, Visitor};
pub use registry::{score_by_name, LogController, MemoryController, ProviderController, ProviderRegistry};
