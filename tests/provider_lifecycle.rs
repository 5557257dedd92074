//! Provider lifecycle scenario
//!
//! Select a provider by scored name, start it, load chronologies, count them
//! with both traversal strategies, stop, restart and count again.

use std::sync::Arc;
use tempfile::TempDir;
use termstore::{
    score_by_name, Description, Entity, EntityCounter, EntityCounts, EntityKind, EntityProcessor,
    EntityRealizer, EntityVersion, Nid, ProviderOptions, ProviderRegistry, PublicId, Stamp,
    StoreProvider, Timestamp, Traversal, VersionData, VersionKind,
};

const STAMP_NID: Nid = Nid::from_raw(1);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn stamp_bytes() -> Vec<u8> {
    let stamp = Stamp::new(
        Nid::from_raw(2),
        Timestamp::from_millis(1_000),
        Nid::from_raw(3),
        Nid::from_raw(4),
        Nid::from_raw(5),
    );
    Entity::stamp(STAMP_NID, PublicId::random(), stamp).to_bytes().unwrap()
}

fn concept_bytes(nid: Nid, versions: usize) -> Vec<u8> {
    let mut entity = Entity::new(nid, PublicId::random(), EntityKind::Concept);
    for _ in 0..versions {
        entity.append_version(EntityVersion::concept(STAMP_NID)).unwrap();
    }
    entity.to_bytes().unwrap()
}

fn description_bytes(nid: Nid, concept: Nid) -> Vec<u8> {
    let kind = EntityKind::semantic(Nid::from_raw(6), concept, VersionKind::Description).unwrap();
    let mut entity = Entity::new(nid, PublicId::random(), kind);
    entity
        .append_version(EntityVersion::new(
            STAMP_NID,
            VersionData::Description(Description {
                language: Nid::from_raw(7),
                text: format!("name of {}", concept),
                case_significance: Nid::from_raw(8),
                description_type: Nid::from_raw(9),
            }),
        ))
        .unwrap();
    entity.to_bytes().unwrap()
}

fn put(provider: &dyn StoreProvider, nid: Nid, bytes: Vec<u8>) {
    provider.update(nid, &mut |_| Ok(bytes.clone())).unwrap();
}

/// Stamp at nid 1, concepts 10.., one description per concept at 10_000..
fn load(provider: &dyn StoreProvider, concepts: i32) {
    put(provider, STAMP_NID, stamp_bytes());
    for i in 0..concepts {
        let concept = Nid::from_raw(10 + i);
        put(provider, concept, concept_bytes(concept, 1 + (i as usize % 3)));
        let description = Nid::from_raw(10_000 + i);
        put(provider, description, description_bytes(description, concept));
    }
}

fn count(provider: &dyn StoreProvider, traversal: Traversal) -> EntityCounts {
    let counter = EntityCounter::new();
    provider
        .for_each(traversal, &|nid, bytes| counter.process(nid, bytes))
        .unwrap();
    counter.counts()
}

fn select(name: &str, options: &ProviderOptions) -> Arc<dyn StoreProvider> {
    ProviderRegistry::with_defaults()
        .select(score_by_name(name))
        .and_then(|controller| controller.create(options))
        .unwrap()
}

#[test]
fn test_log_provider_lifecycle() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let options = ProviderOptions::persistent(temp_dir.path());

    let provider = select("log", &options);
    assert_eq!(provider.name(), "log");
    provider.start().unwrap();
    load(provider.as_ref(), 300);

    let sequential = count(provider.as_ref(), Traversal::Sequential);
    let parallel = count(provider.as_ref(), Traversal::Parallel);
    assert_eq!(sequential, parallel);
    assert_eq!(sequential.entities, 601);
    assert_eq!(sequential.concepts, 300);
    assert_eq!(sequential.semantics, 300);
    assert_eq!(sequential.stamps, 1);
    // 100 concepts each with 1, 2 and 3 versions, one per description, one stamp
    assert_eq!(sequential.versions, 600 + 300 + 1);
    assert_eq!(sequential.failures, 0);

    // same instance, stop and start: the log is replayed
    provider.stop().unwrap();
    provider.start().unwrap();
    assert_eq!(count(provider.as_ref(), Traversal::Parallel), sequential);

    // fresh instance over the same directory
    provider.stop().unwrap();
    let reopened = select("log", &options);
    reopened.start().unwrap();
    assert_eq!(count(reopened.as_ref(), Traversal::Sequential), sequential);

    let realizer = EntityRealizer::new();
    reopened
        .for_each(Traversal::Parallel, &|nid, bytes| realizer.process(nid, bytes))
        .unwrap();
    assert_eq!(realizer.realized(), 601);
    assert!(realizer.failed().is_empty());
    reopened.stop().unwrap();
}

#[test]
fn test_memory_provider_lifecycle() {
    init_tracing();
    let provider = select("memory", &ProviderOptions::ephemeral());
    provider.start().unwrap();
    load(provider.as_ref(), 50);

    let before = count(provider.as_ref(), Traversal::Sequential);
    assert_eq!(before, count(provider.as_ref(), Traversal::Parallel));
    assert_eq!(before.entities, 101);

    // data survives stop/start within the process
    provider.stop().unwrap();
    provider.start().unwrap();
    assert_eq!(count(provider.as_ref(), Traversal::Parallel), before);
}

#[test]
fn test_rewrites_replay_last_record() {
    let temp_dir = TempDir::new().unwrap();
    let options = ProviderOptions::persistent(temp_dir.path());
    let concept = Nid::from_raw(10);
    {
        let provider = select("log", &options);
        provider.start().unwrap();
        put(provider.as_ref(), STAMP_NID, stamp_bytes());
        for versions in 1..=4 {
            put(provider.as_ref(), concept, concept_bytes(concept, versions));
        }
        provider.stop().unwrap();
    }
    let provider = select("log", &options);
    provider.start().unwrap();
    let entity = Entity::from_bytes(&provider.get(concept).unwrap()).unwrap();
    assert_eq!(entity.version_count(), 4);
    assert_eq!(provider.len(), 2);
}

#[test]
fn test_no_eligible_provider() {
    let err = ProviderRegistry::with_defaults()
        .select(score_by_name("rocks"))
        .err()
        .unwrap();
    assert!(err.is_state_error());
}
