pub mod contract;
pub mod transformations;

use alloy_consensus::Transaction as _;
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, FixedBytes, U256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::{Block, Filter, Log, Transaction, TransactionReceipt};
use alloy_sol_types::SolEvent;
use anyhow::{anyhow, Result};
use opentelemetry::KeyValue;
use tracing::{debug, warn};

use crate::decoder::decode_payload;
use crate::indexer::contract::InfoStored;
use crate::indexer::transformations::events::EventTransformer;
use crate::metrics::Metrics;
use crate::models::events::ChainEvent;
use crate::storage::EntityStore;
use crate::utils::retry::{retry, RetryConfig};

pub async fn get_chain_id(provider: &dyn Provider, metrics: Option<&Metrics>) -> Result<u64> {
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();

            if let Some(metrics) = metrics {
                metrics.rpc_requests.add(
                    1,
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_chain_id"),
                    ],
                );
            }

            let result = provider.get_chain_id().await;

            // Record metrics if enabled
            if let Some(metrics) = metrics {
                metrics.rpc_latency.record(
                    start.elapsed().as_secs_f64(),
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_chain_id"),
                    ],
                );
                if result.is_err() {
                    metrics.rpc_errors.add(
                        1,
                        &[
                            KeyValue::new("chain", metrics.chain_name.clone()),
                            KeyValue::new("method", "get_chain_id"),
                        ],
                    );
                }
            }

            result.map_err(|e| {
                warn!("Failed to get chain ID. Error details:\n{:#?}", e);
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "get_chain_id",
    )
    .await
}

pub async fn get_latest_block_number(
    provider: &dyn Provider,
    metrics: Option<&Metrics>,
) -> Result<u64> {
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();

            if let Some(metrics) = metrics {
                metrics.rpc_requests.add(
                    1,
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_latest_block_number"),
                    ],
                );
            }

            let result = provider.get_block_number().await;

            // Record metrics if enabled
            if let Some(metrics) = metrics {
                metrics.rpc_latency.record(
                    start.elapsed().as_secs_f64(),
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_latest_block_number"),
                    ],
                );
                if result.is_err() {
                    metrics.rpc_errors.add(
                        1,
                        &[
                            KeyValue::new("chain", metrics.chain_name.clone()),
                            KeyValue::new("method", "get_latest_block_number"),
                        ],
                    );
                }
            }

            result.map_err(|e| {
                warn!("Failed to get latest block number. Error details:\n{:#?}", e);
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "get_latest_block_number",
    )
    .await
}

pub async fn get_block_by_number(
    provider: &dyn Provider,
    block_number: BlockNumberOrTag,
    metrics: Option<&Metrics>,
) -> Result<Option<Block>> {
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();

            if let Some(metrics) = metrics {
                metrics.rpc_requests.add(
                    1,
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_block_by_number"),
                    ],
                );
            }

            let result = provider.get_block_by_number(block_number).await;

            // Record metrics if enabled
            if let Some(metrics) = metrics {
                metrics.rpc_latency.record(
                    start.elapsed().as_secs_f64(),
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_block_by_number"),
                    ],
                );
                if result.is_err() {
                    metrics.rpc_errors.add(
                        1,
                        &[
                            KeyValue::new("chain", metrics.chain_name.clone()),
                            KeyValue::new("method", "get_block_by_number"),
                        ],
                    );
                }
            }

            result.map_err(|e| {
                warn!(
                    "Failed to get block by number {}. Error details:\n{:#?}",
                    block_number, e
                );
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "get_block_by_number",
    )
    .await
}

pub async fn get_balance(
    provider: &dyn Provider,
    address: Address,
    metrics: Option<&Metrics>,
) -> Result<U256> {
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();

            if let Some(metrics) = metrics {
                metrics.rpc_requests.add(
                    1,
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_balance"),
                    ],
                );
            }

            let result = provider.get_balance(address).await;

            // Record metrics if enabled
            if let Some(metrics) = metrics {
                metrics.rpc_latency.record(
                    start.elapsed().as_secs_f64(),
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_balance"),
                    ],
                );
                if result.is_err() {
                    metrics.rpc_errors.add(
                        1,
                        &[
                            KeyValue::new("chain", metrics.chain_name.clone()),
                            KeyValue::new("method", "get_balance"),
                        ],
                    );
                }
            }

            result.map_err(|e| {
                warn!(
                    "Failed to get balance for {}. Error details:\n{:#?}",
                    address, e
                );
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "get_balance",
    )
    .await
}

pub async fn get_transaction_by_hash(
    provider: &dyn Provider,
    tx_hash: FixedBytes<32>,
    metrics: Option<&Metrics>,
) -> Result<Option<Transaction>> {
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();

            if let Some(metrics) = metrics {
                metrics.rpc_requests.add(
                    1,
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_transaction_by_hash"),
                    ],
                );
            }

            let result = provider.get_transaction_by_hash(tx_hash).await;

            // Record metrics if enabled
            if let Some(metrics) = metrics {
                metrics.rpc_latency.record(
                    start.elapsed().as_secs_f64(),
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_transaction_by_hash"),
                    ],
                );
                if result.is_err() {
                    metrics.rpc_errors.add(
                        1,
                        &[
                            KeyValue::new("chain", metrics.chain_name.clone()),
                            KeyValue::new("method", "get_transaction_by_hash"),
                        ],
                    );
                }
            }

            result.map_err(|e| {
                warn!(
                    "Failed to get transaction {}. Error details:\n{:#?}",
                    tx_hash, e
                );
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "get_transaction_by_hash",
    )
    .await
}

pub async fn get_transaction_receipt(
    provider: &dyn Provider,
    tx_hash: FixedBytes<32>,
    metrics: Option<&Metrics>,
) -> Result<Option<TransactionReceipt>> {
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();

            if let Some(metrics) = metrics {
                metrics.rpc_requests.add(
                    1,
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_transaction_receipt"),
                    ],
                );
            }

            let result = provider.get_transaction_receipt(tx_hash).await;

            // Record metrics if enabled
            if let Some(metrics) = metrics {
                metrics.rpc_latency.record(
                    start.elapsed().as_secs_f64(),
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_transaction_receipt"),
                    ],
                );
                if result.is_err() {
                    metrics.rpc_errors.add(
                        1,
                        &[
                            KeyValue::new("chain", metrics.chain_name.clone()),
                            KeyValue::new("method", "get_transaction_receipt"),
                        ],
                    );
                }
            }

            result.map_err(|e| {
                warn!(
                    "Failed to get receipt for {}. Error details:\n{:#?}",
                    tx_hash, e
                );
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "get_transaction_receipt",
    )
    .await
}

pub async fn get_logs(
    provider: &dyn Provider,
    filter: &Filter,
    metrics: Option<&Metrics>,
) -> Result<Vec<Log>> {
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();

            if let Some(metrics) = metrics {
                metrics.rpc_requests.add(
                    1,
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_logs"),
                    ],
                );
            }

            let result = provider.get_logs(filter).await;

            // Record metrics if enabled
            if let Some(metrics) = metrics {
                metrics.rpc_latency.record(
                    start.elapsed().as_secs_f64(),
                    &[
                        KeyValue::new("chain", metrics.chain_name.clone()),
                        KeyValue::new("method", "get_logs"),
                    ],
                );
                if result.is_err() {
                    metrics.rpc_errors.add(
                        1,
                        &[
                            KeyValue::new("chain", metrics.chain_name.clone()),
                            KeyValue::new("method", "get_logs"),
                        ],
                    );
                }
            }

            result.map_err(|e| {
                warn!("Failed to get logs. Error details:\n{:#?}", e);
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "get_logs",
    )
    .await
}

/// Decode raw InfoStored logs into chain events. Logs that do not carry the
/// InfoStored signature are ignored; logs that carry it but fail ABI decoding
/// are warned about and skipped.
pub fn extract_events(logs: Vec<Log>) -> Vec<ChainEvent> {
    logs.into_iter()
        .filter_map(|log| {
            if log.topic0() != Some(&InfoStored::SIGNATURE_HASH) {
                return None;
            }

            match InfoStored::decode_log_data(log.data()) {
                Ok(event) => Some(ChainEvent {
                    tx_hash: log.transaction_hash,
                    log_index: log.log_index,
                    sender: event.sender,
                    name: event.name,
                    data: event.data,
                    timestamp: event.timestamp.saturating_to::<u64>(),
                    block_number: log.block_number,
                }),
                Err(e) => {
                    warn!(
                        "Failed to decode InfoStored log in tx {:?} (index {:?}): {}",
                        log.transaction_hash, log.log_index, e
                    );
                    None
                }
            }
        })
        .collect()
}

/// Map each event to its entity and upsert it into the store. A malformed
/// event (missing identity fields) is logged and skipped without any write;
/// it does not abort the rest of the batch. Returns the number of entities
/// persisted.
pub fn index_events(events: Vec<ChainEvent>, store: &dyn EntityStore) -> Result<usize> {
    let mut indexed = 0;
    for event in &events {
        match ChainEvent::map_event(event) {
            Ok(entity) => {
                store.upsert(&entity)?;
                indexed += 1;
            }
            Err(e) => {
                warn!("Skipping event from {}: {}", event.sender, e);
            }
        }
    }
    Ok(indexed)
}

/// Direct-read view of a single transaction: inclusion status plus the
/// best-effort text recovered from its calldata.
#[derive(Debug)]
pub struct TransactionInsight {
    pub tx_hash: FixedBytes<32>,
    pub decoded_text: Option<String>,
    pub succeeded: Option<bool>,
    pub block_number: Option<u64>,
}

pub async fn inspect_transaction(
    provider: &dyn Provider,
    tx_hash: FixedBytes<32>,
    metrics: Option<&Metrics>,
) -> Result<Option<TransactionInsight>> {
    let Some(tx) = get_transaction_by_hash(provider, tx_hash, metrics).await? else {
        debug!("Transaction {} not found", tx_hash);
        return Ok(None);
    };

    let receipt = get_transaction_receipt(provider, tx_hash, metrics).await?;

    // Bytes displays as a 0x-prefixed hex string, which is the decoder's
    // input format
    let decoded_text = decode_payload(&tx.input().to_string());

    Ok(Some(TransactionInsight {
        tx_hash,
        decoded_text,
        succeeded: receipt.as_ref().map(|r| r.status()),
        block_number: receipt.as_ref().and_then(|r| r.block_number),
    }))
}
