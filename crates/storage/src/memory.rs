//! In-memory provider
//!
//! DashMap sharded by nid: reads never block, a write only locks the shard
//! of its nid. Bytes are kept as `Arc<[u8]>` so a traversal can release the
//! shard before calling the visitor.
//!
//! Stopping keeps the data; the provider lives as long as the process.

use crate::provider::{Lifecycle, StoreProvider, Traversal, Updater, Visitor};
use dashmap::DashMap;
use rayon::prelude::*;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::Arc;
use termstore_core::{Error, Nid, Result};
use tracing::info;

/// Name under which the memory provider registers
pub const MEMORY_PROVIDER: &str = "memory";

pub(crate) type EntityMap = DashMap<Nid, Arc<[u8]>, BuildHasherDefault<FxHasher>>;

/// Ephemeral provider backed by a sharded map
#[derive(Debug)]
pub struct MemoryProvider {
    entities: EntityMap,
    lifecycle: Lifecycle,
}

impl MemoryProvider {
    /// Empty, stopped provider
    pub fn new() -> Self {
        MemoryProvider {
            entities: DashMap::with_hasher(Default::default()),
            lifecycle: Lifecycle::new(MEMORY_PROVIDER),
        }
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreProvider for MemoryProvider {
    fn name(&self) -> &str {
        MEMORY_PROVIDER
    }

    fn start(&self) -> Result<()> {
        self.lifecycle.begin()?;
        info!(provider = MEMORY_PROVIDER, entities = entity_count(&self.entities), "provider started");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.lifecycle.end()?;
        info!(provider = MEMORY_PROVIDER, entities = entity_count(&self.entities), "provider stopped");
        Ok(())
    }

    fn running(&self) -> bool {
        self.lifecycle.is_running()
    }

    fn get(&self, nid: Nid) -> Result<Vec<u8>> {
        self.lifecycle.check()?;
        read_entity(&self.entities, nid)
    }

    fn update(&self, nid: Nid, f: &mut Updater<'_>) -> Result<()> {
        self.lifecycle.check()?;
        update_entity(&self.entities, nid, f, |_| Ok(()))
    }

    fn contains(&self, nid: Nid) -> bool {
        contains_entity(&self.entities, nid)
    }

    fn len(&self) -> usize {
        entity_count(&self.entities)
    }

    fn for_each(&self, traversal: Traversal, visitor: &Visitor<'_>) -> Result<()> {
        self.lifecycle.check()?;
        traverse(&self.entities, traversal, visitor);
        Ok(())
    }
}

// ============================================================================
// Shared map operations (also used by the log provider)
// ============================================================================

pub(crate) fn read_entity(entities: &EntityMap, nid: Nid) -> Result<Vec<u8>> {
    entities
        .get(&nid)
        .filter(|bytes| !bytes.is_empty())
        .map(|bytes| bytes.to_vec())
        .ok_or(Error::NidNotFound(nid))
}

/// An empty entry is a write in progress, not a stored entity
pub(crate) fn contains_entity(entities: &EntityMap, nid: Nid) -> bool {
    entities.get(&nid).map_or(false, |bytes| !bytes.is_empty())
}

/// Stored entities, not counting in-progress placeholders
pub(crate) fn entity_count(entities: &EntityMap) -> usize {
    entities.iter().filter(|entry| !entry.value().is_empty()).count()
}

/// Read-modify-write under the shard lock of `nid`
///
/// `persist` runs after `f` and before the map is updated; if it fails the
/// map keeps the old bytes.
pub(crate) fn update_entity(
    entities: &EntityMap,
    nid: Nid,
    f: &mut Updater<'_>,
    persist: impl FnOnce(&[u8]) -> Result<()>,
) -> Result<()> {
    let mut slot = entities.entry(nid).or_insert_with(|| Arc::from(Vec::new()));
    let current: Option<&[u8]> = if slot.is_empty() { None } else { Some(&**slot) };
    let result = f(current).and_then(|next| {
        persist(&next)?;
        Ok(next)
    });
    match result {
        Ok(next) => {
            *slot = Arc::from(next);
            Ok(())
        }
        Err(e) => {
            let was_new = slot.is_empty();
            drop(slot);
            if was_new {
                entities.remove_if(&nid, |_, bytes| bytes.is_empty());
            }
            Err(e)
        }
    }
}

pub(crate) fn traverse(entities: &EntityMap, traversal: Traversal, visitor: &Visitor<'_>) {
    let mut nids: Vec<Nid> = entities
        .iter()
        .filter(|entry| !entry.value().is_empty())
        .map(|entry| *entry.key())
        .collect();
    let visit = |nid: &Nid| {
        let bytes = entities.get(nid).map(|b| Arc::clone(b.value()));
        if let Some(bytes) = bytes {
            visitor(*nid, &bytes);
        }
    };
    match traversal {
        Traversal::Sequential => {
            nids.sort_unstable();
            nids.iter().for_each(visit);
        }
        Traversal::Parallel => nids.par_iter().for_each(visit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn running() -> MemoryProvider {
        let p = MemoryProvider::new();
        p.start().unwrap();
        p
    }

    fn put(p: &MemoryProvider, nid: i32, bytes: &[u8]) {
        let owned = bytes.to_vec();
        p.update(Nid::from_raw(nid), &mut |_| Ok(owned.clone())).unwrap();
    }

    #[test]
    fn test_get_missing() {
        let p = running();
        assert!(matches!(
            p.get(Nid::from_raw(1)),
            Err(Error::NidNotFound(_))
        ));
    }

    #[test]
    fn test_update_sees_current_bytes() {
        let p = running();
        put(&p, 1, b"a");
        p.update(Nid::from_raw(1), &mut |current| {
            let mut next = current.unwrap_or_default().to_vec();
            next.extend_from_slice(b"b");
            Ok(next)
        })
        .unwrap();
        assert_eq!(p.get(Nid::from_raw(1)).unwrap(), b"ab".to_vec());
    }

    #[test]
    fn test_failed_update_leaves_nothing() {
        let p = running();
        let result = p.update(Nid::from_raw(5), &mut |_| {
            Err(Error::InvalidOperation("no".to_string()))
        });
        assert!(result.is_err());
        assert!(!p.contains(Nid::from_raw(5)));
        assert_eq!(p.len(), 0);
    }

    #[test]
    fn test_panicking_update_not_counted() {
        let p = running();
        put(&p, 1, b"x");
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = p.update(Nid::from_raw(2), &mut |_| panic!("updater failed"));
        }));
        assert!(outcome.is_err());
        // the placeholder for nid 2 may remain, but it is not an entity
        assert_eq!(p.len(), 1);
        assert!(!p.contains(Nid::from_raw(2)));
        assert!(matches!(p.get(Nid::from_raw(2)), Err(Error::NidNotFound(_))));

        let seen = AtomicUsize::new(0);
        p.for_each(Traversal::Sequential, &|_, _| {
            seen.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(seen.into_inner(), 1);

        put(&p, 2, b"y");
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_stopped_provider_rejects_reads() {
        let p = running();
        put(&p, 1, b"x");
        p.stop().unwrap();
        assert!(matches!(p.get(Nid::from_raw(1)), Err(Error::NotRunning(_))));
        assert!(matches!(p.stop(), Err(Error::NotRunning(_))));
        p.start().unwrap();
        assert!(matches!(p.start(), Err(Error::AlreadyRunning(_))));
        assert_eq!(p.get(Nid::from_raw(1)).unwrap(), b"x".to_vec());
    }

    #[test]
    fn test_sequential_order() {
        let p = running();
        for nid in [5, 3, 9, 1] {
            put(&p, nid, &[nid as u8]);
        }
        let seen = Mutex::new(Vec::new());
        p.for_each(Traversal::Sequential, &|nid, _| seen.lock().unwrap().push(nid.as_i32()))
            .unwrap();
        assert_eq!(seen.into_inner().unwrap(), vec![1, 3, 5, 9]);
    }

    #[test]
    fn test_parallel_matches_sequential_count() {
        let p = running();
        for nid in 1..=500 {
            put(&p, nid, &[1, 2, 3]);
        }
        let count = |t| {
            let n = AtomicUsize::new(0);
            let bytes = AtomicUsize::new(0);
            p.for_each(t, &|_, b| {
                n.fetch_add(1, Ordering::Relaxed);
                bytes.fetch_add(b.len(), Ordering::Relaxed);
            })
            .unwrap();
            (n.into_inner(), bytes.into_inner())
        };
        assert_eq!(count(Traversal::Sequential), (500, 1500));
        assert_eq!(count(Traversal::Parallel), count(Traversal::Sequential));
    }
}
