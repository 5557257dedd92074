//! Well-known terminology components
//!
//! The store needs a handful of concepts and patterns before any content is
//! loaded: statuses, the primordial author/module/path, the logic patterns a
//! default `LogicCoordinate` binds, and the description pattern used for
//! display text.
//!
//! Each term's UUID is UUIDv5 over its name in [`TERM_NAMESPACE`], so the
//! identity of a well-known term is the same in every store.

use crate::ids::PublicId;
use uuid::Uuid;

/// Namespace for well-known term UUIDs
pub const TERM_NAMESPACE: Uuid = Uuid::from_u128(0x1e0f_9b6d_74c3_5a28_b3f1_0d5e_92a6_c847);

/// A named well-known component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Term {
    name: &'static str,
}

impl Term {
    /// Declare a term
    pub const fn new(name: &'static str) -> Self {
        Term { name }
    }

    /// Fully specified name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name-based UUID
    pub fn uuid(&self) -> Uuid {
        Uuid::new_v5(&TERM_NAMESPACE, self.name.as_bytes())
    }

    /// Single-UUID public id
    pub fn public_id(&self) -> PublicId {
        PublicId::from_uuid(self.uuid())
    }
}

// Statuses
/// Active status
pub const ACTIVE_STATE: Term = Term::new("Active state");
/// Inactive status
pub const INACTIVE_STATE: Term = Term::new("Inactive state");
/// Canceled status (a version withdrawn by a later correction)
pub const CANCELED_STATE: Term = Term::new("Canceled state");
/// Primordial status
pub const PRIMORDIAL_STATE: Term = Term::new("Primordial state");

// Attribution
/// Default author
pub const USER: Term = Term::new("User");
/// Module of bootstrap content
pub const PRIMORDIAL_MODULE: Term = Term::new("Primordial module");
/// Path of bootstrap content
pub const PRIMORDIAL_PATH: Term = Term::new("Primordial path");
/// Development path
pub const DEVELOPMENT_PATH: Term = Term::new("Development path");
/// Master path
pub const MASTER_PATH: Term = Term::new("Master path");

// Logic
/// EL++ classifier
pub const EL_PLUS_PLUS_CLASSIFIER: Term = Term::new("EL++ classifier");
/// EL++ description-logic profile
pub const EL_PLUS_PLUS_PROFILE: Term = Term::new("EL++ logic profile");
/// Pattern grouping stated definitions
pub const STATED_AXIOMS_PATTERN: Term = Term::new("EL++ stated axioms pattern");
/// Pattern grouping inferred definitions
pub const INFERRED_AXIOMS_PATTERN: Term = Term::new("EL++ inferred axioms pattern");
/// Pattern whose members are classified
pub const CONCEPT_MEMBER_PATTERN: Term = Term::new("Solor concept pattern");
/// Navigation digraph from stated axioms
pub const STATED_NAVIGATION_PATTERN: Term = Term::new("Stated navigation pattern");
/// Navigation digraph from classification
pub const INFERRED_NAVIGATION_PATTERN: Term = Term::new("Inferred navigation pattern");
/// Root concept of the hierarchy
pub const ROOT_VERTEX: Term = Term::new("Root vertex");

// Descriptions
/// Pattern grouping description semantics
pub const DESCRIPTION_PATTERN: Term = Term::new("Description pattern");
/// English language
pub const ENGLISH_LANGUAGE: Term = Term::new("English language");
/// Fully qualified name description type
pub const FULLY_QUALIFIED_NAME_TYPE: Term = Term::new("Fully qualified name description type");
/// Regular name description type
pub const REGULAR_NAME_TYPE: Term = Term::new("Regular name description type");
/// Case-insensitive description
pub const DESCRIPTION_NOT_CASE_SENSITIVE: Term = Term::new("Description not case sensitive");

// Relationships
/// Pattern grouping relationship semantics
pub const RELATIONSHIP_PATTERN: Term = Term::new("Relationship pattern");
/// Is-a relationship type
pub const IS_A: Term = Term::new("Is a");
/// Stated relationship characteristic
pub const STATED_RELATIONSHIP: Term = Term::new("Stated relationship");

// Logic graph vertex meanings
/// Root of a definition graph
pub const DEFINITION_ROOT: Term = Term::new("Definition root");
/// Necessary set
pub const NECESSARY_SET: Term = Term::new("Necessary set");
/// Sufficient set
pub const SUFFICIENT_SET: Term = Term::new("Sufficient set");
/// Conjunction
pub const AND: Term = Term::new("And");
/// Concept reference
pub const CONCEPT_REFERENCE: Term = Term::new("Concept reference");
/// Existential role restriction
pub const ROLE_SOME: Term = Term::new("Role some");

/// Every well-known term, in bootstrap order
pub const ALL_TERMS: &[Term] = &[
    ACTIVE_STATE,
    INACTIVE_STATE,
    CANCELED_STATE,
    PRIMORDIAL_STATE,
    USER,
    PRIMORDIAL_MODULE,
    PRIMORDIAL_PATH,
    DEVELOPMENT_PATH,
    MASTER_PATH,
    EL_PLUS_PLUS_CLASSIFIER,
    EL_PLUS_PLUS_PROFILE,
    STATED_AXIOMS_PATTERN,
    INFERRED_AXIOMS_PATTERN,
    CONCEPT_MEMBER_PATTERN,
    STATED_NAVIGATION_PATTERN,
    INFERRED_NAVIGATION_PATTERN,
    ROOT_VERTEX,
    DESCRIPTION_PATTERN,
    ENGLISH_LANGUAGE,
    FULLY_QUALIFIED_NAME_TYPE,
    REGULAR_NAME_TYPE,
    DESCRIPTION_NOT_CASE_SENSITIVE,
    RELATIONSHIP_PATTERN,
    IS_A,
    STATED_RELATIONSHIP,
    DEFINITION_ROOT,
    NECESSARY_SET,
    SUFFICIENT_SET,
    AND,
    CONCEPT_REFERENCE,
    ROLE_SOME,
];
