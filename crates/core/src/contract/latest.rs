//! Resolved visibility result
//!
//! Every read through a stamp coordinate returns a `Latest<V>`:
//!
//! ```text
//! fn latest(&self, entity, coordinate) -> Result<Latest<V>>
//! ```
//!
//! - `Empty`: nothing is visible from this point of view (not an error)
//! - `Unique(v)`: exactly one version is visible
//! - `Conflicting(vs)`: concurrent edits that the coordinate cannot order
//!
//! There is deliberately no accessor that turns a conflict into a single
//! value; callers match on the variant or ask for `contradictions()`.

use serde::{Deserialize, Serialize};

/// The visible version(s) of a component under a coordinate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Latest<V> {
    /// No version survives the coordinate's filter
    Empty,

    /// One version is visible
    Unique(V),

    /// Two or more incomparable versions, in log order
    Conflicting(Vec<V>),
}

impl<V> Latest<V> {
    /// Build from the surviving candidates
    ///
    /// Zero candidates is `Empty`, one is `Unique`, more is `Conflicting`.
    pub fn from_candidates(mut candidates: Vec<V>) -> Self {
        match candidates.len() {
            0 => Latest::Empty,
            1 => Latest::Unique(candidates.remove(0)),
            _ => Latest::Conflicting(candidates),
        }
    }

    /// True unless `Empty`
    #[inline]
    pub fn is_present(&self) -> bool {
        !matches!(self, Latest::Empty)
    }

    /// True for `Empty`
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Latest::Empty)
    }

    /// True for `Conflicting`
    #[inline]
    pub fn is_conflicting(&self) -> bool {
        matches!(self, Latest::Conflicting(_))
    }

    /// The single visible value, only when unambiguous
    pub fn value(&self) -> Option<&V> {
        match self {
            Latest::Unique(v) => Some(v),
            _ => None,
        }
    }

    /// Consume and return the single visible value, only when unambiguous
    pub fn into_value(self) -> Option<V> {
        match self {
            Latest::Unique(v) => Some(v),
            _ => None,
        }
    }

    /// The contradicting alternatives (empty unless `Conflicting`)
    pub fn contradictions(&self) -> &[V] {
        match self {
            Latest::Conflicting(vs) => vs,
            _ => &[],
        }
    }

    /// Number of versions held
    pub fn len(&self) -> usize {
        match self {
            Latest::Empty => 0,
            Latest::Unique(_) => 1,
            Latest::Conflicting(vs) => vs.len(),
        }
    }

    /// Map every held version to a new type
    pub fn map<U, F>(self, mut f: F) -> Latest<U>
    where
        F: FnMut(V) -> U,
    {
        match self {
            Latest::Empty => Latest::Empty,
            Latest::Unique(v) => Latest::Unique(f(v)),
            Latest::Conflicting(vs) => Latest::Conflicting(vs.into_iter().map(f).collect()),
        }
    }

    /// Borrowing view
    pub fn as_ref(&self) -> Latest<&V> {
        match self {
            Latest::Empty => Latest::Empty,
            Latest::Unique(v) => Latest::Unique(v),
            Latest::Conflicting(vs) => Latest::Conflicting(vs.iter().collect()),
        }
    }

    /// All held versions, in order
    pub fn into_vec(self) -> Vec<V> {
        match self {
            Latest::Empty => Vec::new(),
            Latest::Unique(v) => vec![v],
            Latest::Conflicting(vs) => vs,
        }
    }
}

impl<V: Clone> Latest<&V> {
    /// Clone the borrowed versions into an owned result
    pub fn cloned(&self) -> Latest<V> {
        match self {
            Latest::Empty => Latest::Empty,
            Latest::Unique(v) => Latest::Unique((*v).clone()),
            Latest::Conflicting(vs) => Latest::Conflicting(vs.iter().map(|v| (*v).clone()).collect()),
        }
    }
}

impl<V> Default for Latest<V> {
    fn default() -> Self {
        Latest::Empty
    }
}

// ============================================================================
// Tests
// ============================================================================
