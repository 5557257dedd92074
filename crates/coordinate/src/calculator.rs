//! Latest version resolution
//!
//! # Algorithm
//!
//! Given a chronology's versions (in log order, not time order) and a
//! coordinate:
//!
//! 1. Filter: drop versions whose stamp has a disallowed status, a time
//!    after the ceiling, another path, or a disallowed module.
//! 2. Rank: a module earlier in the effective precedence beats any later or
//!    unranked module, whatever the times. Unranked modules share the lowest
//!    rank.
//! 3. Among the best rank, the greatest time wins.
//! 4. Survivors with equal payloads collapse to the first in log order. Two
//!    or more distinct payloads are returned as `Conflicting`, in log order.
//! 5. Nothing surviving the filter is `Empty`.
//!
//! The calculator holds no mutable state; the same inputs always produce
//! the same `Latest`.

use crate::stamp_coordinate::StampCoordinate;
use rustc_hash::FxHashMap;
use termstore_core::{Latest, Nid, Result, Stamp, StampSource};
use termstore_entity::{Entity, EntityVersion};

/// Order of two stamps under a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativePosition {
    /// The first stamp is superseded by the second
    Before,
    /// Same stamp
    Equal,
    /// The first stamp supersedes the second
    After,
    /// Same rank and time, different stamps: the coordinate cannot order them
    Contradiction,
    /// At least one stamp is not visible under the coordinate
    Unreachable,
}

/// Resolves visibility for one coordinate
pub struct StampCalculator<'a> {
    coordinate: &'a StampCoordinate,
    stamps: &'a dyn StampSource,
    ranks: FxHashMap<Nid, usize>,
    unranked: usize,
}

impl<'a> StampCalculator<'a> {
    /// Calculator for `coordinate`, resolving stamps through `stamps`
    pub fn new(coordinate: &'a StampCoordinate, stamps: &'a dyn StampSource) -> Self {
        let precedence = coordinate.effective_precedence();
        let mut ranks = FxHashMap::default();
        for (rank, module) in precedence.iter().enumerate() {
            // a module listed twice keeps its first (best) rank
            ranks.entry(*module).or_insert(rank);
        }
        StampCalculator {
            coordinate,
            stamps,
            ranks,
            unranked: precedence.len(),
        }
    }

    /// The coordinate being applied
    pub fn coordinate(&self) -> &StampCoordinate {
        self.coordinate
    }

    /// Rank of `module`; lower is better, unranked modules share the worst
    pub fn module_rank(&self, module: Nid) -> usize {
        self.ranks.get(&module).copied().unwrap_or(self.unranked)
    }

    /// True if a version with this stamp passes the filter
    pub fn is_visible(&self, stamp: &Stamp) -> bool {
        let c = self.coordinate;
        c.allows_status(stamp.status)
            && stamp.time <= c.time_ceiling()
            && stamp.path == c.path()
            && c.allows_module(stamp.module)
    }

    /// True if the stamp interned as `stamp_nid` passes the filter
    ///
    /// # Errors
    ///
    /// `NidNotFound` if `stamp_nid` is not an interned stamp.
    pub fn is_stamp_visible(&self, stamp_nid: Nid) -> Result<bool> {
        Ok(self.is_visible(&self.stamps.stamp(stamp_nid)?))
    }

    /// Compare two interned stamps
    ///
    /// # Errors
    ///
    /// `NidNotFound` if either nid is not an interned stamp.
    pub fn relative_position(&self, first: Nid, second: Nid) -> Result<RelativePosition> {
        if first == second {
            let visible = self.is_stamp_visible(first)?;
            return Ok(if visible {
                RelativePosition::Equal
            } else {
                RelativePosition::Unreachable
            });
        }
        let a = self.stamps.stamp(first)?;
        let b = self.stamps.stamp(second)?;
        Ok(self.compare(&a, &b))
    }

    fn compare(&self, a: &Stamp, b: &Stamp) -> RelativePosition {
        use std::cmp::Ordering;

        if !self.is_visible(a) || !self.is_visible(b) {
            return RelativePosition::Unreachable;
        }
        // lower rank is higher precedence, so reverse the rank comparison
        let by_rank = self.module_rank(b.module).cmp(&self.module_rank(a.module));
        match by_rank.then(a.time.cmp(&b.time)) {
            Ordering::Less => RelativePosition::Before,
            Ordering::Greater => RelativePosition::After,
            Ordering::Equal if a == b => RelativePosition::Equal,
            Ordering::Equal => RelativePosition::Contradiction,
        }
    }

    /// Versions of `entity` that pass the filter, in log order
    ///
    /// # Errors
    ///
    /// `NidNotFound` if a version refers to a stamp that was never interned.
    pub fn visible_versions<'e>(&self, entity: &'e Entity) -> Result<Vec<&'e EntityVersion>> {
        let mut visible = Vec::new();
        for version in entity.versions() {
            if self.is_stamp_visible(version.stamp_nid())? {
                visible.push(version);
            }
        }
        Ok(visible)
    }

    /// The latest visible version(s) of `entity`
    ///
    /// # Errors
    ///
    /// `NidNotFound` if a version refers to a stamp that was never interned.
    pub fn latest<'e>(&self, entity: &'e Entity) -> Result<Latest<&'e EntityVersion>> {
        self.latest_of(entity.versions())
    }

    /// The latest visible version(s) among `versions`, given in log order
    ///
    /// # Errors
    ///
    /// `NidNotFound` if a version refers to a stamp that was never interned.
    pub fn latest_of<'e>(&self, versions: &'e [EntityVersion]) -> Result<Latest<&'e EntityVersion>> {
        // (rank, time) of the best candidates so far, and the candidates
        let mut best: Option<(usize, termstore_core::Timestamp)> = None;
        let mut candidates: Vec<&'e EntityVersion> = Vec::new();

        for version in versions {
            let stamp = self.stamps.stamp(version.stamp_nid())?;
            if !self.is_visible(&stamp) {
                continue;
            }
            let rank = self.module_rank(stamp.module);
            let better = match best {
                None => true,
                Some((best_rank, best_time)) => {
                    if rank != best_rank {
                        rank < best_rank
                    } else if stamp.time != best_time {
                        stamp.time > best_time
                    } else {
                        candidates.push(version);
                        continue;
                    }
                }
            };
            if better {
                best = Some((rank, stamp.time));
                candidates.clear();
                candidates.push(version);
            }
        }

        // equal payloads are one edit recorded twice, not a conflict
        let mut distinct: Vec<&'e EntityVersion> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !distinct.iter().any(|d| d.same_content(candidate)) {
                distinct.push(candidate);
            }
        }
        Ok(Latest::from_candidates(distinct))
    }
}

impl std::fmt::Debug for StampCalculator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StampCalculator")
            .field("coordinate", self.coordinate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use termstore_core::{Error, PublicId, Timestamp};
    use termstore_entity::{Description, EntityKind, VersionData, VersionKind};

    const ACTIVE: Nid = Nid::from_raw(1);
    const INACTIVE: Nid = Nid::from_raw(2);
    const AUTHOR: Nid = Nid::from_raw(3);
    const PATH: Nid = Nid::from_raw(4);
    const OTHER_PATH: Nid = Nid::from_raw(5);
    const M1: Nid = Nid::from_raw(10);
    const M2: Nid = Nid::from_raw(11);
    const M3: Nid = Nid::from_raw(12);

    #[derive(Default)]
    struct Stamps(HashMap<Nid, Stamp>);

    impl Stamps {
        fn add(&mut self, nid: i32, status: Nid, time: i64, module: Nid, path: Nid) -> Nid {
            let nid = Nid::from_raw(nid);
            self.0
                .insert(nid, Stamp::new(status, Timestamp::from_millis(time), AUTHOR, module, path));
            nid
        }
    }

    impl StampSource for Stamps {
        fn stamp(&self, stamp_nid: Nid) -> Result<Stamp> {
            self.0.get(&stamp_nid).copied().ok_or(Error::NidNotFound(stamp_nid))
        }
    }

    fn text_version(stamp: Nid, text: &str) -> EntityVersion {
        EntityVersion::new(
            stamp,
            VersionData::Description(Description {
                language: Nid::from_raw(20),
                text: text.to_string(),
                case_significance: Nid::from_raw(21),
                description_type: Nid::from_raw(22),
            }),
        )
    }

    fn chronology(versions: Vec<EntityVersion>) -> Entity {
        let kind =
            EntityKind::semantic(Nid::from_raw(30), Nid::from_raw(31), VersionKind::Description)
                .unwrap();
        let mut entity = Entity::new(Nid::from_raw(100), PublicId::random(), kind);
        for v in versions {
            entity.append_version(v).unwrap();
        }
        entity
    }

    fn text_of<'e>(latest: &Latest<&'e EntityVersion>) -> Vec<&'e str> {
        latest
            .clone()
            .into_vec()
            .into_iter()
            .map(|v| v.as_description().unwrap().text.as_str())
            .collect()
    }

    fn coordinate() -> StampCoordinate {
        StampCoordinate::latest_on(PATH)
            .with_allowed_statuses([ACTIVE])
            .with_time(Timestamp::from_millis(300))
    }

    #[test]
    fn test_precedence_beats_time() {
        let mut stamps = Stamps::default();
        let s1 = stamps.add(50, ACTIVE, 100, M1, PATH);
        let s2 = stamps.add(51, ACTIVE, 200, M2, PATH);
        let entity = chronology(vec![text_version(s1, "V1"), text_version(s2, "V2")]);

        let c = coordinate().with_module_precedence([M2, M1]);
        let latest = StampCalculator::new(&c, &stamps).latest(&entity).unwrap();
        assert_eq!(text_of(&latest), vec!["V2"]);

        // V1 later but in the lower-precedence module
        let mut stamps = Stamps::default();
        let s1 = stamps.add(50, ACTIVE, 300, M1, PATH);
        let s2 = stamps.add(51, ACTIVE, 100, M2, PATH);
        let entity = chronology(vec![text_version(s1, "V1"), text_version(s2, "V2")]);
        let latest = StampCalculator::new(&c, &stamps).latest(&entity).unwrap();
        assert_eq!(text_of(&latest), vec!["V2"]);
    }

    #[test]
    fn test_time_ceiling_filters_first() {
        let mut stamps = Stamps::default();
        let s1 = stamps.add(50, ACTIVE, 100, M1, PATH);
        let s2 = stamps.add(51, ACTIVE, 200, M2, PATH);
        let entity = chronology(vec![text_version(s1, "V1"), text_version(s2, "V2")]);

        let c = coordinate()
            .with_module_precedence([M2, M1])
            .with_time(Timestamp::from_millis(150));
        let latest = StampCalculator::new(&c, &stamps).latest(&entity).unwrap();
        assert_eq!(text_of(&latest), vec!["V1"]);
    }

    #[test]
    fn test_unranked_equal_time_conflict() {
        let mut stamps = Stamps::default();
        let s1 = stamps.add(50, ACTIVE, 200, M1, PATH);
        let s2 = stamps.add(51, ACTIVE, 200, M2, PATH);
        let entity = chronology(vec![text_version(s1, "V1"), text_version(s2, "V2")]);

        let latest = StampCalculator::new(&coordinate(), &stamps)
            .latest(&entity)
            .unwrap();
        assert!(latest.is_conflicting());
        assert_eq!(text_of(&latest), vec!["V1", "V2"]);
        assert!(latest.value().is_none());
    }

    #[test]
    fn test_equal_payloads_collapse() {
        let mut stamps = Stamps::default();
        let s1 = stamps.add(50, ACTIVE, 200, M1, PATH);
        let s2 = stamps.add(51, ACTIVE, 200, M2, PATH);
        let entity = chronology(vec![text_version(s1, "same"), text_version(s2, "same")]);

        let latest = StampCalculator::new(&coordinate(), &stamps)
            .latest(&entity)
            .unwrap();
        let v = latest.value().unwrap();
        assert_eq!(v.stamp_nid(), s1);
    }

    #[test]
    fn test_same_module_later_wins_regardless_of_log_order() {
        let mut stamps = Stamps::default();
        let later = stamps.add(50, ACTIVE, 250, M1, PATH);
        let earlier = stamps.add(51, ACTIVE, 120, M1, PATH);
        let entity = chronology(vec![text_version(later, "late"), text_version(earlier, "early")]);

        let latest = StampCalculator::new(&coordinate(), &stamps)
            .latest(&entity)
            .unwrap();
        assert_eq!(text_of(&latest), vec!["late"]);
    }

    #[test]
    fn test_filters_status_path_and_modules() {
        let mut stamps = Stamps::default();
        let inactive = stamps.add(50, INACTIVE, 100, M1, PATH);
        let elsewhere = stamps.add(51, ACTIVE, 100, M1, OTHER_PATH);
        let excluded = stamps.add(52, ACTIVE, 100, M3, PATH);
        let entity = chronology(vec![
            text_version(inactive, "inactive"),
            text_version(elsewhere, "elsewhere"),
            text_version(excluded, "excluded"),
        ]);

        let c = coordinate().with_modules([M1, M2]);
        let calc = StampCalculator::new(&c, &stamps);
        assert!(calc.latest(&entity).unwrap().is_empty());
        assert!(calc.visible_versions(&entity).unwrap().is_empty());

        // any status when none are listed
        let open = StampCoordinate::latest_on(PATH);
        let latest = StampCalculator::new(&open, &stamps).latest(&entity).unwrap();
        assert!(latest.is_conflicting());
    }

    #[test]
    fn test_unranked_modules_lose_to_ranked() {
        let mut stamps = Stamps::default();
        let ranked = stamps.add(50, ACTIVE, 10, M1, PATH);
        let unranked = stamps.add(51, ACTIVE, 290, M3, PATH);
        let entity = chronology(vec![text_version(ranked, "ranked"), text_version(unranked, "unranked")]);

        let c = coordinate().with_module_precedence([M1]);
        let latest = StampCalculator::new(&c, &stamps).latest(&entity).unwrap();
        assert_eq!(text_of(&latest), vec!["ranked"]);
    }

    #[test]
    fn test_default_precedence_used_when_unset() {
        let mut stamps = Stamps::default();
        let s1 = stamps.add(50, ACTIVE, 200, M1, PATH);
        let s2 = stamps.add(51, ACTIVE, 100, M2, PATH);
        let entity = chronology(vec![text_version(s1, "V1"), text_version(s2, "V2")]);

        let c = coordinate().with_default_module_precedence([M2, M1]);
        let latest = StampCalculator::new(&c, &stamps).latest(&entity).unwrap();
        assert_eq!(text_of(&latest), vec!["V2"]);
    }

    #[test]
    fn test_empty_chronology() {
        let stamps = Stamps::default();
        let entity = chronology(vec![]);
        let latest = StampCalculator::new(&coordinate(), &stamps)
            .latest(&entity)
            .unwrap();
        assert_eq!(latest, Latest::Empty);
    }

    #[test]
    fn test_unknown_stamp_is_error() {
        let stamps = Stamps::default();
        let entity = chronology(vec![text_version(Nid::from_raw(77), "orphan")]);
        let err = StampCalculator::new(&coordinate(), &stamps)
            .latest(&entity)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_relative_position() {
        let mut stamps = Stamps::default();
        let a = stamps.add(50, ACTIVE, 100, M1, PATH);
        let b = stamps.add(51, ACTIVE, 200, M1, PATH);
        let c = stamps.add(52, ACTIVE, 200, M2, PATH);
        let hidden = stamps.add(53, INACTIVE, 100, M1, PATH);

        let coord = coordinate();
        let calc = StampCalculator::new(&coord, &stamps);
        assert_eq!(calc.relative_position(a, b).unwrap(), RelativePosition::Before);
        assert_eq!(calc.relative_position(b, a).unwrap(), RelativePosition::After);
        assert_eq!(calc.relative_position(a, a).unwrap(), RelativePosition::Equal);
        assert_eq!(calc.relative_position(b, c).unwrap(), RelativePosition::Contradiction);
        assert_eq!(calc.relative_position(a, hidden).unwrap(), RelativePosition::Unreachable);
        assert_eq!(
            calc.relative_position(hidden, hidden).unwrap(),
            RelativePosition::Unreachable
        );

        let ranked = coordinate().with_module_precedence([M1, M2]);
        let calc = StampCalculator::new(&ranked, &stamps);
        assert_eq!(calc.relative_position(a, c).unwrap(), RelativePosition::After);
        assert_eq!(calc.relative_position(c, a).unwrap(), RelativePosition::Before);
    }
}
