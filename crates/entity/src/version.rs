//! Entity versions
//!
//! A version is a stamp reference plus a kind-specific payload. Versions are
//! immutable after construction and owned by exactly one chronology.

use crate::kind::VersionKind;
use crate::logic_graph::LogicGraph;
use serde::{Deserialize, Serialize};
use termstore_core::{Nid, Stamp};

/// Field definition of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// What the field means
    pub meaning: Nid,
    /// What the field is used for
    pub purpose: Nid,
    /// Data type concept of the field
    pub data_type: Nid,
}

/// Pattern version payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternDefinition {
    /// Purpose of semantics under this pattern
    pub semantic_purpose: Nid,
    /// Meaning of semantics under this pattern
    pub semantic_meaning: Nid,
    /// Field definitions, in field order
    pub fields: Vec<FieldDefinition>,
}

/// Description version payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Description {
    /// Language concept
    pub language: Nid,
    /// The text
    pub text: String,
    /// Case significance concept
    pub case_significance: Nid,
    /// Description type concept (fully qualified name, regular name...)
    pub description_type: Nid,
}

/// Relationship version payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    /// Target concept
    pub destination: Nid,
    /// Relationship type concept (is-a, finding site...)
    pub relationship_type: Nid,
    /// Role group, 0 for ungrouped
    pub group: i32,
    /// Stated or inferred characteristic
    pub characteristic: Nid,
}

/// Kind-specific payload, one variant per version kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionData {
    /// Concept version
    Concept,
    /// Pattern version
    Pattern(PatternDefinition),
    /// Description version
    Description(Description),
    /// Relationship version
    Relationship(Relationship),
    /// Logic graph version
    LogicGraph(LogicGraph),
    /// Stamp version
    Stamp(Stamp),
}

impl VersionData {
    /// Kind of this payload
    pub const fn kind(&self) -> VersionKind {
        match self {
            VersionData::Concept => VersionKind::Concept,
            VersionData::Pattern(_) => VersionKind::Pattern,
            VersionData::Description(_) => VersionKind::Description,
            VersionData::Relationship(_) => VersionKind::Relationship,
            VersionData::LogicGraph(_) => VersionKind::LogicGraph,
            VersionData::Stamp(_) => VersionKind::Stamp,
        }
    }
}

/// One immutable version of an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityVersion {
    stamp_nid: Nid,
    data: VersionData,
}

impl EntityVersion {
    /// Create a version stamped with an interned stamp nid
    pub fn new(stamp_nid: Nid, data: VersionData) -> Self {
        EntityVersion { stamp_nid, data }
    }

    /// Concept version
    pub fn concept(stamp_nid: Nid) -> Self {
        Self::new(stamp_nid, VersionData::Concept)
    }

    /// Nid of the interned stamp
    #[inline]
    pub fn stamp_nid(&self) -> Nid {
        self.stamp_nid
    }

    /// Payload
    #[inline]
    pub fn data(&self) -> &VersionData {
        &self.data
    }

    /// Kind of the payload
    #[inline]
    pub fn kind(&self) -> VersionKind {
        self.data.kind()
    }

    /// Description payload, if this is a description version
    pub fn as_description(&self) -> Option<&Description> {
        match &self.data {
            VersionData::Description(d) => Some(d),
            _ => None,
        }
    }

    /// Logic graph payload, if this is a logic graph version
    pub fn as_logic_graph(&self) -> Option<&LogicGraph> {
        match &self.data {
            VersionData::LogicGraph(g) => Some(g),
            _ => None,
        }
    }

    /// Same payload, regardless of stamp
    pub fn same_content(&self, other: &EntityVersion) -> bool {
        self.data == other.data
    }
}
