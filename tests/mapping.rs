use std::sync::atomic::{AtomicUsize, Ordering};

use alloy_primitives::{address, b256};
use anyhow::Result;

use info_indexer::indexer::index_events;
use info_indexer::indexer::transformations::events::EventTransformer;
use info_indexer::models::errors::EventError;
use info_indexer::models::events::{ChainEvent, IndexedEntity};
use info_indexer::storage::memory::InMemoryStore;
use info_indexer::storage::EntityStore;

fn sample_event() -> ChainEvent {
    ChainEvent {
        tx_hash: Some(b256!(
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        )),
        log_index: Some(3),
        sender: address!("f7e9260e03ca2ff3f20307e8cfba480ad1ad6175"),
        name: "user info".to_string(),
        data: "{\"name\": \"张三\", \"age\": 25}".to_string(),
        timestamp: 1_764_140_000,
        block_number: Some(7_200_123),
    }
}

/// Store wrapper that counts persistence calls, so tests can assert that a
/// rejected event never reaches the sink.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryStore,
    upserts: AtomicUsize,
}

impl EntityStore for CountingStore {
    fn upsert(&self, entity: &IndexedEntity) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(entity)
    }
    fn get(&self, id: &str) -> Option<IndexedEntity> {
        self.inner.get(id)
    }
    fn latest(&self, limit: usize) -> Vec<IndexedEntity> {
        self.inner.latest(limit)
    }
    fn latest_block(&self) -> Option<u64> {
        self.inner.latest_block()
    }
    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[test]
fn identity_is_hash_dash_log_index() {
    let entity = ChainEvent::map_event(&sample_event()).unwrap();
    assert_eq!(
        entity.id,
        format!("0x{}-3", "a".repeat(64)),
        "identity must be <tx hash as lowercase hex>-<decimal log index>"
    );
}

#[test]
fn identity_matches_wire_pattern() {
    // ^0x[0-9a-f]{64}-[0-9]+$
    let entity = ChainEvent::map_event(&sample_event()).unwrap();
    let (hash_part, index_part) = entity.id.split_once('-').unwrap();
    assert_eq!(hash_part.len(), 66);
    assert!(hash_part.starts_with("0x"));
    assert!(hash_part[2..]
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert!(!index_part.is_empty());
    assert!(index_part.chars().all(|c| c.is_ascii_digit()));
}

#[test]
fn fields_are_copied_verbatim() {
    let event = sample_event();
    let entity = ChainEvent::map_event(&event).unwrap();

    assert_eq!(entity.sender, event.sender);
    assert_eq!(entity.name, event.name);
    assert_eq!(entity.data, event.data);
    assert_eq!(entity.timestamp, event.timestamp);
    assert_eq!(entity.block_number, event.block_number);
    assert_eq!(Some(entity.tx_hash), event.tx_hash);
}

#[test]
fn redelivered_event_maps_to_same_identity() {
    // Redelivery after a reorg may carry a different timestamp or block
    // number; only hash + index determine identity
    let first = sample_event();
    let mut replayed = sample_event();
    replayed.timestamp += 60;
    replayed.block_number = Some(7_200_999);

    let e1 = ChainEvent::map_event(&first).unwrap();
    let e2 = ChainEvent::map_event(&replayed).unwrap();
    assert_eq!(e1.id, e2.id);
}

#[test]
fn missing_tx_hash_is_malformed() {
    let mut event = sample_event();
    event.tx_hash = None;
    assert_eq!(
        ChainEvent::map_event(&event),
        Err(EventError::MalformedEvent { field: "tx_hash" })
    );
}

#[test]
fn missing_log_index_is_malformed() {
    let mut event = sample_event();
    event.log_index = None;
    assert_eq!(
        ChainEvent::map_event(&event),
        Err(EventError::MalformedEvent { field: "log_index" })
    );
}

#[test]
fn malformed_event_is_never_persisted() {
    let store = CountingStore::default();
    let mut event = sample_event();
    event.tx_hash = None;

    let indexed = index_events(vec![event], &store).unwrap();

    assert_eq!(indexed, 0);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
    assert_eq!(store.len(), 0);
}

#[test]
fn malformed_event_does_not_abort_the_batch() {
    let store = CountingStore::default();
    let mut malformed = sample_event();
    malformed.log_index = None;

    let indexed = index_events(vec![malformed, sample_event()], &store).unwrap();

    assert_eq!(indexed, 1);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 1);
}

#[test]
fn replay_upserts_instead_of_duplicating() {
    let store = InMemoryStore::new();

    let mut replayed = sample_event();
    replayed.timestamp += 60;

    index_events(vec![sample_event()], &store).unwrap();
    index_events(vec![replayed.clone()], &store).unwrap();

    assert_eq!(store.len(), 1);
    // Upsert semantics: the replayed write wins
    let entity = store.get(&format!("0x{}-3", "a".repeat(64))).unwrap();
    assert_eq!(entity.timestamp, replayed.timestamp);
}

#[test]
fn latest_orders_by_timestamp_descending() {
    let store = InMemoryStore::new();

    for (index, timestamp) in [(0u64, 100u64), (1, 300), (2, 200)] {
        let mut event = sample_event();
        event.log_index = Some(index);
        event.timestamp = timestamp;
        index_events(vec![event], &store).unwrap();
    }

    let latest = store.latest(2);
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].timestamp, 300);
    assert_eq!(latest[1].timestamp, 200);
}

#[test]
fn latest_block_tracks_the_highest_seen() {
    let store = InMemoryStore::new();
    assert_eq!(store.latest_block(), None);

    let mut early = sample_event();
    early.log_index = Some(0);
    early.block_number = Some(10);
    let mut late = sample_event();
    late.log_index = Some(1);
    late.block_number = Some(42);

    index_events(vec![early, late], &store).unwrap();
    assert_eq!(store.latest_block(), Some(42));
}
