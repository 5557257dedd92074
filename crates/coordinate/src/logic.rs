//! Logic coordinates
//!
//! A `LogicCoordinate` names the eight components that parameterize
//! logic-graph retrieval: the classifier, the description-logic profile,
//! the stated and inferred axiom patterns, the pattern whose members are
//! classified, the two navigation patterns and the root concept.

use crate::calculator::StampCalculator;
use crate::stamp_coordinate::{sorted_uuid_list, StampCoordinate};
use serde::{Deserialize, Serialize};
use termstore_core::terms::{
    CONCEPT_MEMBER_PATTERN, EL_PLUS_PLUS_CLASSIFIER, EL_PLUS_PLUS_PROFILE, INFERRED_AXIOMS_PATTERN,
    INFERRED_NAVIGATION_PATTERN, ROOT_VERTEX, STATED_AXIOMS_PATTERN, STATED_NAVIGATION_PATTERN,
};
use termstore_core::{Error, Latest, Nid, Result, StampSource, Term, TextLookup, UuidSource};
use termstore_entity::{EntitySource, EntityVersion, VersionKind};
use uuid::Uuid;

/// Namespace for logic coordinate UUIDs
pub const LOGIC_COORDINATE_NAMESPACE: Uuid =
    Uuid::from_u128(0x6c1d_2f84_9ab3_5e07_91c4_38d6_0f7a_e25b);

/// Stated (authored) or inferred (classifier output) definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PremiseType {
    /// As written by an author
    Stated,
    /// As computed by the classifier
    Inferred,
}

impl PremiseType {
    /// Display name
    pub const fn name(&self) -> &'static str {
        match self {
            PremiseType::Stated => "stated",
            PremiseType::Inferred => "inferred",
        }
    }
}

/// Bundle of components that parameterizes logic-graph retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicCoordinate {
    classifier: Nid,
    description_logic_profile: Nid,
    stated_axioms_pattern: Nid,
    inferred_axioms_pattern: Nid,
    concept_member_pattern: Nid,
    stated_navigation_pattern: Nid,
    inferred_navigation_pattern: Nid,
    root: Nid,
}

impl LogicCoordinate {
    /// Coordinate binding the given components
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        classifier: Nid,
        description_logic_profile: Nid,
        stated_axioms_pattern: Nid,
        inferred_axioms_pattern: Nid,
        concept_member_pattern: Nid,
        stated_navigation_pattern: Nid,
        inferred_navigation_pattern: Nid,
        root: Nid,
    ) -> Self {
        LogicCoordinate {
            classifier,
            description_logic_profile,
            stated_axioms_pattern,
            inferred_axioms_pattern,
            concept_member_pattern,
            stated_navigation_pattern,
            inferred_navigation_pattern,
            root,
        }
    }

    /// The EL++ coordinate over the well-known terms
    ///
    /// `resolve` maps each term to its nid in the caller's directory.
    pub fn el_plus_plus<F>(mut resolve: F) -> Result<Self>
    where
        F: FnMut(Term) -> Result<Nid>,
    {
        Ok(LogicCoordinate::new(
            resolve(EL_PLUS_PLUS_CLASSIFIER)?,
            resolve(EL_PLUS_PLUS_PROFILE)?,
            resolve(STATED_AXIOMS_PATTERN)?,
            resolve(INFERRED_AXIOMS_PATTERN)?,
            resolve(CONCEPT_MEMBER_PATTERN)?,
            resolve(STATED_NAVIGATION_PATTERN)?,
            resolve(INFERRED_NAVIGATION_PATTERN)?,
            resolve(ROOT_VERTEX)?,
        ))
    }

    /// Classifier that computes inferred axioms
    pub fn classifier(&self) -> Nid {
        self.classifier
    }

    /// Description logic profile the axioms are written in
    pub fn description_logic_profile(&self) -> Nid {
        self.description_logic_profile
    }

    /// Pattern of semantics holding stated definitions
    pub fn stated_axioms_pattern(&self) -> Nid {
        self.stated_axioms_pattern
    }

    /// Pattern of semantics holding inferred definitions
    pub fn inferred_axioms_pattern(&self) -> Nid {
        self.inferred_axioms_pattern
    }

    /// Pattern marking concepts as members of the hierarchy
    pub fn concept_member_pattern(&self) -> Nid {
        self.concept_member_pattern
    }

    /// Pattern of semantics holding stated parents and children
    pub fn stated_navigation_pattern(&self) -> Nid {
        self.stated_navigation_pattern
    }

    /// Pattern of semantics holding inferred parents and children
    pub fn inferred_navigation_pattern(&self) -> Nid {
        self.inferred_navigation_pattern
    }

    /// Root concept of the hierarchy
    pub fn root(&self) -> Nid {
        self.root
    }

    /// All eight fields in identity order
    pub fn fields(&self) -> [Nid; 8] {
        [
            self.classifier,
            self.description_logic_profile,
            self.stated_axioms_pattern,
            self.inferred_axioms_pattern,
            self.concept_member_pattern,
            self.stated_navigation_pattern,
            self.inferred_navigation_pattern,
            self.root,
        ]
    }

    /// Axioms pattern for `premise`
    pub fn premise_pattern(&self, premise: PremiseType) -> Nid {
        match premise {
            PremiseType::Stated => self.stated_axioms_pattern,
            PremiseType::Inferred => self.inferred_axioms_pattern,
        }
    }

    /// Content-addressed UUID of this bundle
    ///
    /// Each field contributes its own bracketed, sorted UUID list, in
    /// [`fields`](Self::fields) order, and the concatenation is hashed. Unlike
    /// the single flat list used for stamps and stamp coordinates, this keeps
    /// field boundaries: moving a UUID from one field to the next changes the
    /// result.
    ///
    /// # Errors
    ///
    /// `NidNotFound` if a field has no public id in `ids`.
    pub fn derived_uuid(&self, ids: &dyn UuidSource) -> Result<Uuid> {
        let name = self
            .fields()
            .iter()
            .map(|nid| sorted_uuid_list(ids, [*nid]))
            .collect::<Result<Vec<_>>>()?
            .concat();
        Ok(Uuid::new_v5(&LOGIC_COORDINATE_NAMESPACE, name.as_bytes()))
    }

    /// Latest logic graph defining `concept` under `premise`
    ///
    /// Every semantic of the premise's axioms pattern that references
    /// `concept` is resolved through `coordinate`; the visible versions are
    /// merged, so two axiom semantics that are both visible come back as
    /// `Conflicting`.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if a semantic of the axioms pattern does not carry
    /// logic graphs; lookup and codec errors from `entities` and `stamps`.
    pub fn axioms_version(
        &self,
        entities: &dyn EntitySource,
        stamps: &dyn StampSource,
        concept: Nid,
        premise: PremiseType,
        coordinate: &StampCoordinate,
    ) -> Result<Latest<EntityVersion>> {
        let pattern = self.premise_pattern(premise);
        let calculator = StampCalculator::new(coordinate, stamps);
        let mut candidates: Vec<EntityVersion> = Vec::new();

        for nid in entities.semantic_nids_for_component_of_pattern(concept, pattern) {
            let semantic = entities.entity(nid)?;
            if semantic.kind().version_kind() != VersionKind::LogicGraph {
                return Err(Error::InvalidOperation(format!(
                    "{} axioms semantic {} holds {} versions",
                    premise.name(),
                    nid,
                    semantic.kind().version_kind().name()
                )));
            }
            for version in calculator.latest(&semantic)?.into_vec() {
                if !candidates.iter().any(|c| c.same_content(version)) {
                    candidates.push(version.clone());
                }
            }
        }
        Ok(Latest::from_candidates(candidates))
    }

    /// [`axioms_version`](Self::axioms_version) for stated definitions
    pub fn stated_axioms_version(
        &self,
        entities: &dyn EntitySource,
        stamps: &dyn StampSource,
        concept: Nid,
        coordinate: &StampCoordinate,
    ) -> Result<Latest<EntityVersion>> {
        self.axioms_version(entities, stamps, concept, PremiseType::Stated, coordinate)
    }

    /// [`axioms_version`](Self::axioms_version) for inferred definitions
    pub fn inferred_axioms_version(
        &self,
        entities: &dyn EntitySource,
        stamps: &dyn StampSource,
        concept: Nid,
        coordinate: &StampCoordinate,
    ) -> Result<Latest<EntityVersion>> {
        self.axioms_version(entities, stamps, concept, PremiseType::Inferred, coordinate)
    }

    /// Multi-line description for diagnostics
    pub fn to_user_string(&self, text: &dyn TextLookup) -> String {
        let rows = [
            ("classifier", self.classifier),
            ("profile", self.description_logic_profile),
            ("stated axioms", self.stated_axioms_pattern),
            ("inferred axioms", self.inferred_axioms_pattern),
            ("concept members", self.concept_member_pattern),
            ("stated navigation", self.stated_navigation_pattern),
            ("inferred navigation", self.inferred_navigation_pattern),
            ("root", self.root),
        ];
        let mut out = String::from("LogicCoordinate{\n");
        for (label, nid) in rows {
            out.push_str(&format!("  {}: {}\n", label, text.text(nid)));
        }
        out.push('}');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use termstore_core::{PublicId, Stamp, Timestamp};
    use termstore_entity::{Entity, EntityKind, LogicGraph, LogicVertex, VersionData};

    fn nid(n: i32) -> Nid {
        Nid::from_raw(n)
    }

    fn coordinate() -> LogicCoordinate {
        LogicCoordinate::new(nid(1), nid(2), nid(3), nid(4), nid(5), nid(6), nid(7), nid(8))
    }

    struct Ids;

    impl UuidSource for Ids {
        fn public_id(&self, nid: Nid) -> Result<PublicId> {
            if nid.is_assigned() {
                Ok(PublicId::from_uuid(Uuid::from_u128(nid.as_i32() as u128)))
            } else {
                Err(Error::NidNotFound(nid))
            }
        }
    }

    impl TextLookup for Ids {
        fn text(&self, nid: Nid) -> String {
            format!("c{}", nid)
        }
    }

    #[derive(Default)]
    struct Store {
        stamps: HashMap<Nid, Stamp>,
        entities: HashMap<Nid, Entity>,
        index: HashMap<(Nid, Nid), Vec<Nid>>,
    }

    impl Store {
        fn add_stamp(&mut self, raw: i32, time: i64) -> Nid {
            let stamp = Stamp::new(nid(90), Timestamp::from_millis(time), nid(91), nid(92), nid(93));
            self.stamps.insert(nid(raw), stamp);
            nid(raw)
        }

        fn semantic(&mut self, raw: i32, concept: Nid, pattern: Nid, kind: VersionKind, versions: Vec<EntityVersion>) {
            let mut entity = Entity::new(
                nid(raw),
                PublicId::random(),
                EntityKind::semantic(pattern, concept, kind).unwrap(),
            );
            for v in versions {
                entity.append_version(v).unwrap();
            }
            self.entities.insert(nid(raw), entity);
            self.index.entry((concept, pattern)).or_default().push(nid(raw));
        }
    }

    impl StampSource for Store {
        fn stamp(&self, stamp_nid: Nid) -> Result<Stamp> {
            self.stamps.get(&stamp_nid).copied().ok_or(Error::NidNotFound(stamp_nid))
        }
    }

    impl EntitySource for Store {
        fn entity(&self, nid: Nid) -> Result<Entity> {
            self.entities.get(&nid).cloned().ok_or(Error::NidNotFound(nid))
        }

        fn semantic_nids_for_component_of_pattern(&self, component: Nid, pattern: Nid) -> Vec<Nid> {
            self.index.get(&(component, pattern)).cloned().unwrap_or_default()
        }
    }

    fn graph(stamp: Nid, target: i32) -> EntityVersion {
        let graph = LogicGraph::new(vec![
            LogicVertex::with_children(nid(70), None, vec![1]),
            LogicVertex::leaf(nid(71), Some(nid(target))),
        ])
        .unwrap();
        EntityVersion::new(stamp, VersionData::LogicGraph(graph))
    }

    fn target_of(version: &EntityVersion) -> Option<Nid> {
        version.as_logic_graph().and_then(|g| g.vertex(1)).and_then(|v| v.concept)
    }

    #[test]
    fn test_derived_uuid_is_content_addressed() {
        let a = coordinate();
        let b = coordinate();
        assert_eq!(a.derived_uuid(&Ids).unwrap(), b.derived_uuid(&Ids).unwrap());

        let fields = a.fields();
        for i in 0..fields.len() {
            let mut changed = fields;
            changed[i] = nid(100 + i as i32);
            let c = LogicCoordinate::new(
                changed[0], changed[1], changed[2], changed[3], changed[4], changed[5], changed[6],
                changed[7],
            );
            assert_ne!(a.derived_uuid(&Ids).unwrap(), c.derived_uuid(&Ids).unwrap(), "field {}", i);
        }
    }

    #[test]
    fn test_derived_uuid_depends_on_field_order() {
        let swapped = LogicCoordinate::new(nid(2), nid(1), nid(3), nid(4), nid(5), nid(6), nid(7), nid(8));
        assert_ne!(
            coordinate().derived_uuid(&Ids).unwrap(),
            swapped.derived_uuid(&Ids).unwrap()
        );
    }

    #[test]
    fn test_derived_uuid_unknown_field() {
        let c = LogicCoordinate::new(nid(1), nid(2), nid(3), nid(4), nid(5), nid(6), nid(7), Nid::UNASSIGNED);
        assert!(c.derived_uuid(&Ids).unwrap_err().is_not_found());
    }

    #[test]
    fn test_el_plus_plus_binds_terms() {
        let mut seen = Vec::new();
        let c = LogicCoordinate::el_plus_plus(|term| {
            seen.push(term.name());
            Ok(nid(seen.len() as i32))
        })
        .unwrap();
        assert_eq!(seen.len(), 8);
        assert_eq!(c.classifier(), nid(1));
        assert_eq!(c.root(), nid(8));
        assert_eq!(seen[2], STATED_AXIOMS_PATTERN.name());

        let failing = LogicCoordinate::el_plus_plus(|_| Err(Error::NidNotFound(nid(0))));
        assert!(failing.is_err());
    }

    #[test]
    fn test_axioms_version_picks_premise_pattern() {
        let logic = coordinate();
        let mut store = Store::default();
        let s1 = store.add_stamp(50, 100);
        let s2 = store.add_stamp(51, 200);
        let concept = nid(40);
        store.semantic(60, concept, logic.stated_axioms_pattern(), VersionKind::LogicGraph, vec![
            graph(s1, 41),
            graph(s2, 42),
        ]);
        store.semantic(61, concept, logic.inferred_axioms_pattern(), VersionKind::LogicGraph, vec![
            graph(s1, 43),
        ]);

        let view = StampCoordinate::latest_on(nid(93));
        let stated = logic.stated_axioms_version(&store, &store, concept, &view).unwrap();
        assert_eq!(stated.value().and_then(target_of), Some(nid(42)));

        let inferred = logic.inferred_axioms_version(&store, &store, concept, &view).unwrap();
        assert_eq!(inferred.value().and_then(target_of), Some(nid(43)));

        let past = view.with_time(Timestamp::from_millis(150));
        let stated = logic.stated_axioms_version(&store, &store, concept, &past).unwrap();
        assert_eq!(stated.value().and_then(target_of), Some(nid(41)));
    }

    #[test]
    fn test_axioms_version_empty_and_conflicting() {
        let logic = coordinate();
        let mut store = Store::default();
        let s1 = store.add_stamp(50, 100);
        let concept = nid(40);
        let view = StampCoordinate::latest_on(nid(93));

        let none = logic
            .axioms_version(&store, &store, concept, PremiseType::Stated, &view)
            .unwrap();
        assert!(none.is_empty());

        store.semantic(60, concept, logic.stated_axioms_pattern(), VersionKind::LogicGraph, vec![graph(s1, 41)]);
        store.semantic(61, concept, logic.stated_axioms_pattern(), VersionKind::LogicGraph, vec![graph(s1, 42)]);
        let both = logic
            .axioms_version(&store, &store, concept, PremiseType::Stated, &view)
            .unwrap();
        assert!(both.is_conflicting());
        let targets: Vec<_> = both.contradictions().iter().filter_map(target_of).collect();
        assert_eq!(targets, vec![nid(41), nid(42)]);
    }

    #[test]
    fn test_axioms_version_rejects_other_payloads() {
        let logic = coordinate();
        let mut store = Store::default();
        store.semantic(60, nid(40), logic.stated_axioms_pattern(), VersionKind::Description, vec![]);
        let view = StampCoordinate::latest_on(nid(93));
        let err = logic
            .axioms_version(&store, &store, nid(40), PremiseType::Stated, &view)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_to_user_string() {
        let s = coordinate().to_user_string(&Ids);
        assert!(s.contains("classifier: c1"));
        assert!(s.contains("root: c8"));
    }
}
