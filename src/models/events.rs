use alloy_primitives::{Address, FixedBytes};
use chrono::{DateTime, Utc};
use serde::Serialize;

////////////////////////////////////// Chain Data //////////////////////////////////////
// One observed InfoStored log emission, as delivered by the chain.
// tx_hash and log_index mirror the optional fields on an RPC log: the mapper
// is responsible for rejecting events where they are absent.
#[derive(Debug, Clone)]
pub struct ChainEvent {
    pub tx_hash: Option<FixedBytes<32>>,
    pub log_index: Option<u64>,
    pub sender: Address,
    pub name: String,
    pub data: String,
    pub timestamp: u64,
    pub block_number: Option<u64>,
}

/////////////////////////////////// Indexed Data ///////////////////////////////////////
// Final output format. Keyed by `id` = "<tx_hash>-<log_index>", which is
// deterministic per event so replays upsert instead of duplicating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedEntity {
    pub id: String,
    pub sender: Address,
    pub name: String,
    pub data: String,
    pub timestamp: u64,
    pub block_number: Option<u64>,
    pub tx_hash: FixedBytes<32>,
}

impl IndexedEntity {
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::try_from(self.timestamp).ok()?, 0)
    }
}
