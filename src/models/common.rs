use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubgraphConfig {
    pub url: Url,
    pub page_size: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub chain_name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub contract_address: Address,
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    pub chain_tip_buffer: u64,
    pub blocks_per_batch: u64,
    pub subgraph: Option<SubgraphConfig>,
    pub metrics: MetricsConfig,
}
