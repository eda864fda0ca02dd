use crate::models::errors::EventError;
use crate::models::events::{ChainEvent, IndexedEntity};

pub trait EventTransformer {
    fn map_event(event: &ChainEvent) -> Result<IndexedEntity, EventError>;
}

impl EventTransformer for ChainEvent {
    fn map_event(event: &ChainEvent) -> Result<IndexedEntity, EventError> {
        // Build primary key - require tx_hash and log_index
        let tx_hash = event
            .tx_hash
            .ok_or(EventError::MalformedEvent { field: "tx_hash" })?;
        let log_index = event
            .log_index
            .ok_or(EventError::MalformedEvent { field: "log_index" })?;

        // FixedBytes displays as 0x-prefixed lowercase hex, so the key is
        // deterministic across replays of the same event: redelivery after a
        // reorg or restart upserts instead of duplicating.
        let id = format!("{tx_hash}-{log_index}");

        Ok(IndexedEntity {
            id,
            sender: event.sender,
            name: event.name.clone(),
            data: event.data.clone(),
            timestamp: event.timestamp,
            block_number: event.block_number,
            tx_hash,
        })
    }
}
