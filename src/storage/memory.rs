use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;

use crate::models::events::IndexedEntity;
use crate::storage::EntityStore;

/// Reference store keyed by entity id. Inserting an existing id replaces the
/// record, which is what makes event redelivery safe.
#[derive(Default)]
pub struct InMemoryStore {
    entities: Mutex<HashMap<String, IndexedEntity>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for InMemoryStore {
    fn upsert(&self, entity: &IndexedEntity) -> Result<()> {
        let mut entities = self
            .entities
            .lock()
            .map_err(|e| anyhow::anyhow!("Entity store lock poisoned: {}", e))?;
        entities.insert(entity.id.clone(), entity.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Option<IndexedEntity> {
        self.entities.lock().ok()?.get(id).cloned()
    }

    fn latest(&self, limit: usize) -> Vec<IndexedEntity> {
        let Ok(entities) = self.entities.lock() else {
            return vec![];
        };
        let mut all: Vec<IndexedEntity> = entities.values().cloned().collect();
        // Newest first; tie-break on id so the ordering is stable
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
        all.truncate(limit);
        all
    }

    fn latest_block(&self) -> Option<u64> {
        let entities = self.entities.lock().ok()?;
        entities.values().filter_map(|e| e.block_number).max()
    }

    fn len(&self) -> usize {
        self.entities.lock().map(|e| e.len()).unwrap_or(0)
    }
}
