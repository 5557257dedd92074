//! Version and chronology kinds
//!
//! Token values are part of the on-disk format and MUST NOT change.
//!
//! | Version kind  | Token |
//! |---------------|-------|
//! | Concept       | 0x01  |
//! | Pattern       | 0x02  |
//! | Description   | 0x03  |
//! | Relationship  | 0x04  |
//! | LogicGraph    | 0x05  |
//! | Stamp         | 0x06  |
//!
//! | Chronology kind | Token |
//! |-----------------|-------|
//! | Concept         | 0x11  |
//! | Pattern         | 0x12  |
//! | Semantic        | 0x13  |
//! | Stamp           | 0x16  |

use serde::{Deserialize, Serialize};
use termstore_core::{Error, Nid, Result};

/// Version kind, discriminated by its type token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum VersionKind {
    /// Concept version (no payload)
    Concept = 0x01,
    /// Pattern definition
    Pattern = 0x02,
    /// Description text
    Description = 0x03,
    /// Relationship to another concept
    Relationship = 0x04,
    /// Logic definition graph
    LogicGraph = 0x05,
    /// STAMP record
    Stamp = 0x06,
}

impl VersionKind {
    /// The type token written in every version header
    #[inline]
    pub const fn token(self) -> u8 {
        self as u8
    }

    /// Kind for a token, `None` if the token is not in the closed set
    pub const fn from_token(token: u8) -> Option<Self> {
        match token {
            0x01 => Some(VersionKind::Concept),
            0x02 => Some(VersionKind::Pattern),
            0x03 => Some(VersionKind::Description),
            0x04 => Some(VersionKind::Relationship),
            0x05 => Some(VersionKind::LogicGraph),
            0x06 => Some(VersionKind::Stamp),
            _ => None,
        }
    }

    /// Display name
    pub const fn name(self) -> &'static str {
        match self {
            VersionKind::Concept => "Concept",
            VersionKind::Pattern => "Pattern",
            VersionKind::Description => "Description",
            VersionKind::Relationship => "Relationship",
            VersionKind::LogicGraph => "LogicGraph",
            VersionKind::Stamp => "Stamp",
        }
    }

    /// True for kinds carried by semantic chronologies
    pub const fn is_semantic(self) -> bool {
        matches!(
            self,
            VersionKind::Description | VersionKind::Relationship | VersionKind::LogicGraph
        )
    }
}

/// Chronology token for concept entities
pub const ENTITY_CONCEPT: u8 = 0x11;
/// Chronology token for pattern entities
pub const ENTITY_PATTERN: u8 = 0x12;
/// Chronology token for semantic entities
pub const ENTITY_SEMANTIC: u8 = 0x13;
/// Chronology token for stamp entities
pub const ENTITY_STAMP: u8 = 0x16;

/// Chronology kind
///
/// A semantic is a record about another component (`referenced_component`),
/// grouped under a pattern, and all its versions share one version kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Concept chronology
    Concept,
    /// Pattern chronology
    Pattern,
    /// Semantic chronology
    Semantic {
        /// Pattern the semantic belongs to
        pattern: Nid,
        /// Component the semantic is about
        referenced_component: Nid,
        /// Kind shared by every version of this semantic
        version_kind: VersionKind,
    },
    /// Stamp chronology (exactly one version)
    Stamp,
}

impl EntityKind {
    /// Semantic kind
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if `version_kind` is not a semantic version kind.
    pub fn semantic(
        pattern: Nid,
        referenced_component: Nid,
        version_kind: VersionKind,
    ) -> Result<Self> {
        if !version_kind.is_semantic() {
            return Err(Error::InvalidOperation(format!(
                "{} versions cannot form a semantic",
                version_kind.name()
            )));
        }
        Ok(EntityKind::Semantic {
            pattern,
            referenced_component,
            version_kind,
        })
    }

    /// The chronology token
    pub const fn token(&self) -> u8 {
        match self {
            EntityKind::Concept => ENTITY_CONCEPT,
            EntityKind::Pattern => ENTITY_PATTERN,
            EntityKind::Semantic { .. } => ENTITY_SEMANTIC,
            EntityKind::Stamp => ENTITY_STAMP,
        }
    }

    /// Display name
    pub const fn name(&self) -> &'static str {
        match self {
            EntityKind::Concept => "Concept",
            EntityKind::Pattern => "Pattern",
            EntityKind::Semantic { .. } => "Semantic",
            EntityKind::Stamp => "Stamp",
        }
    }

    /// The only version kind this chronology accepts
    pub const fn version_kind(&self) -> VersionKind {
        match self {
            EntityKind::Concept => VersionKind::Concept,
            EntityKind::Pattern => VersionKind::Pattern,
            EntityKind::Semantic { version_kind, .. } => *version_kind,
            EntityKind::Stamp => VersionKind::Stamp,
        }
    }

    /// (referenced component, pattern) for semantics
    pub const fn semantic_key(&self) -> Option<(Nid, Nid)> {
        match self {
            EntityKind::Semantic {
                pattern,
                referenced_component,
                ..
            } => Some((*referenced_component, *pattern)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        for kind in [
            VersionKind::Concept,
            VersionKind::Pattern,
            VersionKind::Description,
            VersionKind::Relationship,
            VersionKind::LogicGraph,
            VersionKind::Stamp,
        ] {
            assert_eq!(VersionKind::from_token(kind.token()), Some(kind));
        }
        assert_eq!(VersionKind::from_token(0x00), None);
        assert_eq!(VersionKind::from_token(0x07), None);
    }

    #[test]
    fn test_tokens_are_stable() {
        assert_eq!(VersionKind::Concept.token(), 0x01);
        assert_eq!(VersionKind::LogicGraph.token(), 0x05);
        assert_eq!(EntityKind::Stamp.token(), 0x16);
    }

    #[test]
    fn test_semantic_requires_semantic_version_kind() {
        let p = Nid::from_raw(1);
        let c = Nid::from_raw(2);
        assert!(EntityKind::semantic(p, c, VersionKind::Description).is_ok());
        assert!(EntityKind::semantic(p, c, VersionKind::Concept).is_err());
        assert!(EntityKind::semantic(p, c, VersionKind::Stamp).is_err());
    }

    #[test]
    fn test_semantic_key() {
        let kind = EntityKind::semantic(Nid::from_raw(5), Nid::from_raw(9), VersionKind::LogicGraph)
            .unwrap();
        assert_eq!(kind.semantic_key(), Some((Nid::from_raw(9), Nid::from_raw(5))));
        assert_eq!(EntityKind::Concept.semantic_key(), None);
    }
}
