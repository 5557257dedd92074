//! Secondary index over semantics
//!
//! Maps (referenced component, pattern) to the nids of the semantics that
//! carry that pair, so "the descriptions of concept C" or "the stated axioms
//! of concept C" never scan the store. Maintained on every semantic write
//! and rebuilt from chronology headers on start.

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use termstore_core::Nid;

/// Secondary index: (component, pattern) → semantic nids
///
/// Each list is kept in ascending nid order, so lookups return the same
/// order before and after a restart.
#[derive(Debug, Default)]
pub struct SemanticIndex {
    index: DashMap<(Nid, Nid), Vec<Nid>, BuildHasherDefault<FxHasher>>,
}

impl SemanticIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `semantic` references `component` under `pattern`
    ///
    /// Returns false if the semantic was already indexed.
    pub fn insert(&self, component: Nid, pattern: Nid, semantic: Nid) -> bool {
        let mut nids = self.index.entry((component, pattern)).or_default();
        match nids.binary_search(&semantic) {
            Ok(_) => false,
            Err(at) => {
                nids.insert(at, semantic);
                true
            }
        }
    }

    /// Semantics of `pattern` that reference `component`
    pub fn get(&self, component: Nid, pattern: Nid) -> Vec<Nid> {
        self.index
            .get(&(component, pattern))
            .map(|nids| nids.clone())
            .unwrap_or_default()
    }

    /// Drop every entry (for a full rebuild)
    pub fn clear(&self) {
        self.index.clear();
    }

    /// Number of (component, pattern) pairs
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of indexed semantics
    pub fn semantic_count(&self) -> usize {
        self.index.iter().map(|entry| entry.value().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nid(n: i32) -> Nid {
        Nid::from_raw(n)
    }

    #[test]
    fn test_insert_and_get() {
        let index = SemanticIndex::new();
        assert!(index.insert(nid(1), nid(10), nid(102)));
        assert!(index.insert(nid(1), nid(10), nid(101)));
        assert!(index.insert(nid(1), nid(11), nid(103)));

        assert_eq!(index.get(nid(1), nid(10)), vec![nid(101), nid(102)]);
        assert_eq!(index.get(nid(1), nid(11)), vec![nid(103)]);
        assert!(index.get(nid(2), nid(10)).is_empty());
        assert_eq!(index.len(), 2);
        assert_eq!(index.semantic_count(), 3);
    }

    #[test]
    fn test_duplicate_insert() {
        let index = SemanticIndex::new();
        assert!(index.insert(nid(1), nid(10), nid(100)));
        assert!(!index.insert(nid(1), nid(10), nid(100)));
        assert_eq!(index.semantic_count(), 1);
    }

    #[test]
    fn test_clear() {
        let index = SemanticIndex::new();
        index.insert(nid(1), nid(10), nid(100));
        index.clear();
        assert!(index.is_empty());
    }
}
