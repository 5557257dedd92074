//! Store provider contract
//!
//! A provider persists raw chronology bytes by nid. It knows nothing about
//! the entity format: the engine encodes and decodes, the provider stores.
//!
//! # Lifecycle
//!
//! ```text
//! stopped --start()--> running --stop()--> stopped
//! ```
//!
//! Every data operation on a stopped provider fails with `NotRunning`;
//! starting a running provider fails with `AlreadyRunning`.
//!
//! # Writes
//!
//! `update` is an atomic read-modify-write of one nid: concurrent updates of
//! the same nid are serialized, updates of different nids are independent.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use termstore_core::{Error, Nid, Result};

/// Full-store traversal strategy
///
/// Both strategies visit every stored nid exactly once. Sequential visits in
/// ascending nid order on the calling thread; parallel partitions the nids
/// across the rayon pool in no particular order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Traversal {
    /// One thread, ascending nid order
    Sequential,
    /// Rayon worker pool
    #[default]
    Parallel,
}

impl Traversal {
    /// Parse a config name: `"sequential"` or `"parallel"`
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sequential" => Some(Traversal::Sequential),
            "parallel" => Some(Traversal::Parallel),
            _ => None,
        }
    }

    /// Config name
    pub const fn name(self) -> &'static str {
        match self {
            Traversal::Sequential => "sequential",
            Traversal::Parallel => "parallel",
        }
    }
}

/// Visitor invoked once per stored nid
pub type Visitor<'a> = dyn Fn(Nid, &[u8]) + Sync + 'a;

/// Read-modify-write closure: receives the current bytes, returns the new bytes
pub type Updater<'a> = dyn FnMut(Option<&[u8]>) -> Result<Vec<u8>> + 'a;

/// Backend that stores chronology bytes by nid
pub trait StoreProvider: Send + Sync {
    /// Provider name, as used for selection
    fn name(&self) -> &str;

    /// Start the provider, loading any persisted state
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if already started; I/O and corruption errors from loading.
    fn start(&self) -> Result<()>;

    /// Stop the provider, flushing persisted state
    ///
    /// # Errors
    ///
    /// `NotRunning` if not started.
    fn stop(&self) -> Result<()>;

    /// True between a successful `start` and `stop`
    fn running(&self) -> bool;

    /// Bytes stored under `nid`
    ///
    /// # Errors
    ///
    /// `NidNotFound` if nothing is stored; `NotRunning` if stopped.
    fn get(&self, nid: Nid) -> Result<Vec<u8>>;

    /// Atomically replace the bytes of `nid` with `f(current)`
    ///
    /// If `f` fails nothing is written and its error is returned.
    ///
    /// # Errors
    ///
    /// `NotRunning` if stopped; errors from `f` or from persisting.
    fn update(&self, nid: Nid, f: &mut Updater<'_>) -> Result<()>;

    /// True if something is stored under `nid`
    fn contains(&self, nid: Nid) -> bool;

    /// Number of stored nids
    fn len(&self) -> usize;

    /// True if nothing is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every stored nid
    ///
    /// The visitor must not write to this provider.
    ///
    /// # Errors
    ///
    /// `NotRunning` if stopped.
    fn for_each(&self, traversal: Traversal, visitor: &Visitor<'_>) -> Result<()>;
}

/// Options handed to a provider controller when creating a provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOptions {
    /// Directory for persistent providers; `None` for ephemeral use
    pub data_dir: Option<PathBuf>,
    /// Sync each write to disk before returning
    pub sync_on_write: bool,
}

impl ProviderOptions {
    /// Options for a persistent provider rooted at `dir`
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        ProviderOptions {
            data_dir: Some(dir.into()),
            sync_on_write: false,
        }
    }

    /// Options for an in-memory provider
    pub fn ephemeral() -> Self {
        Self::default()
    }
}

/// Running flag shared by the providers
#[derive(Debug)]
pub(crate) struct Lifecycle {
    name: &'static str,
    running: AtomicBool,
}

impl Lifecycle {
    pub(crate) const fn new(name: &'static str) -> Self {
        Lifecycle {
            name,
            running: AtomicBool::new(false),
        }
    }

    /// stopped -> running
    pub(crate) fn begin(&self) -> Result<()> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| Error::AlreadyRunning(self.name.to_string()))
    }

    /// running -> stopped
    pub(crate) fn end(&self) -> Result<()> {
        self.running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| Error::NotRunning(self.name.to_string()))
    }

    /// Undo a `begin` whose start-up failed
    pub(crate) fn abort(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(Error::NotRunning(self.name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_names() {
        for t in [Traversal::Sequential, Traversal::Parallel] {
            assert_eq!(Traversal::parse(t.name()), Some(t));
        }
        assert_eq!(Traversal::parse("random"), None);
        assert_eq!(Traversal::default(), Traversal::Parallel);
    }

    #[test]
    fn test_lifecycle_transitions() {
        let state = Lifecycle::new("test");
        assert!(matches!(state.check(), Err(Error::NotRunning(_))));
        assert!(matches!(state.end(), Err(Error::NotRunning(_))));
        state.begin().unwrap();
        assert!(matches!(state.begin(), Err(Error::AlreadyRunning(_))));
        state.check().unwrap();
        state.end().unwrap();
        assert!(!state.is_running());
    }
}
