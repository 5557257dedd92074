//! Property tests for latest-version resolution
//!
//! Chronologies are generated with a small alphabet of modules, times,
//! statuses, paths and payloads so that ties and conflicts are common.

use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use termstore_coordinate::{RelativePosition, StampCalculator, StampCoordinate};
use termstore_core::{Error, Latest, Nid, PublicId, Result, Stamp, StampSource, Timestamp};
use termstore_entity::{Description, Entity, EntityKind, EntityVersion, VersionData, VersionKind};

const ACTIVE: Nid = Nid::from_raw(1);
const INACTIVE: Nid = Nid::from_raw(2);
const AUTHOR: Nid = Nid::from_raw(3);
const PATH: Nid = Nid::from_raw(4);
const OTHER_PATH: Nid = Nid::from_raw(5);
const MODULES: [Nid; 3] = [Nid::from_raw(10), Nid::from_raw(11), Nid::from_raw(12)];

#[derive(Debug, Clone)]
struct Planned {
    module: usize,
    time: i64,
    active: bool,
    on_path: bool,
    payload: u8,
}

struct Stamps(HashMap<Nid, Stamp>);

impl StampSource for Stamps {
    fn stamp(&self, stamp_nid: Nid) -> Result<Stamp> {
        self.0.get(&stamp_nid).copied().ok_or(Error::NidNotFound(stamp_nid))
    }
}

fn planned() -> impl Strategy<Value = Planned> {
    (0..3usize, 0..5i64, prop::bool::weighted(0.8), prop::bool::weighted(0.8), 0..3u8).prop_map(
        |(module, time, active, on_path, payload)| Planned {
            module,
            time,
            active,
            on_path,
            payload,
        },
    )
}

fn coordinate() -> impl Strategy<Value = StampCoordinate> {
    (0..6i64, Just(MODULES.to_vec()).prop_shuffle(), 0..=3usize).prop_map(
        |(ceiling, order, ranked)| {
            StampCoordinate::latest_on(PATH)
                .with_allowed_statuses([ACTIVE])
                .with_time(Timestamp::from_millis(ceiling))
                .with_module_precedence(order.into_iter().take(ranked))
        },
    )
}

/// Build stamps and a chronology whose versions follow `plans` in log order
fn build(plans: &[Planned]) -> (Stamps, Entity) {
    let kind = EntityKind::semantic(Nid::from_raw(30), Nid::from_raw(31), VersionKind::Description)
        .expect("description semantic");
    let mut entity = Entity::new(Nid::from_raw(100), PublicId::random(), kind);
    let mut stamps = HashMap::new();
    for (i, s) in plans.iter().enumerate() {
        let stamp_nid = Nid::from_raw(1000 + i as i32);
        stamps.insert(
            stamp_nid,
            Stamp::new(
                if s.active { ACTIVE } else { INACTIVE },
                Timestamp::from_millis(s.time),
                AUTHOR,
                MODULES[s.module],
                if s.on_path { PATH } else { OTHER_PATH },
            ),
        );
        let version = EntityVersion::new(
            stamp_nid,
            VersionData::Description(Description {
                language: Nid::from_raw(20),
                text: format!("payload-{}", s.payload),
                case_significance: Nid::from_raw(21),
                description_type: Nid::from_raw(22),
            }),
        );
        entity.append_version(version).expect("same kind");
    }
    (Stamps(stamps), entity)
}

fn texts(latest: &Latest<&EntityVersion>) -> BTreeSet<String> {
    latest
        .clone()
        .into_vec()
        .into_iter()
        .filter_map(|v| v.as_description().map(|d| d.text.clone()))
        .collect()
}

proptest! {
    #[test]
    fn resolution_is_deterministic(plans in prop::collection::vec(planned(), 0..8), c in coordinate()) {
        let (stamps, entity) = build(&plans);
        let calc = StampCalculator::new(&c, &stamps);
        let first = calc.latest(&entity).unwrap();
        let second = StampCalculator::new(&c, &stamps).latest(&entity).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn resolution_ignores_log_order(plans in prop::collection::vec(planned(), 0..8), c in coordinate()) {
        let (stamps, entity) = build(&plans);
        let reversed: Vec<Planned> = plans.iter().rev().cloned().collect();
        let (rev_stamps, rev_entity) = build(&reversed);

        let forward = StampCalculator::new(&c, &stamps).latest(&entity).unwrap();
        let backward = StampCalculator::new(&c, &rev_stamps).latest(&rev_entity).unwrap();
        prop_assert_eq!(forward.len(), backward.len());
        prop_assert_eq!(texts(&forward), texts(&backward));
    }

    #[test]
    fn nothing_visible_supersedes_the_result(plans in prop::collection::vec(planned(), 0..8), c in coordinate()) {
        let (stamps, entity) = build(&plans);
        let calc = StampCalculator::new(&c, &stamps);
        let latest = calc.latest(&entity).unwrap();
        let visible = calc.visible_versions(&entity).unwrap();
        prop_assert_eq!(latest.is_empty(), visible.is_empty());

        for chosen in latest.clone().into_vec() {
            prop_assert!(calc.is_stamp_visible(chosen.stamp_nid()).unwrap());
            for other in &visible {
                let position = calc.relative_position(other.stamp_nid(), chosen.stamp_nid()).unwrap();
                prop_assert_ne!(position, RelativePosition::After);
            }
        }
        // conflicting alternatives always carry distinct payloads
        let distinct = texts(&latest);
        prop_assert_eq!(distinct.len(), latest.len());
    }
}
