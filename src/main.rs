use std::sync::Arc;

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::utils::format_ether;
use alloy_provider::{Provider, ProviderBuilder};
use anyhow::{anyhow, Result};
use chrono::DateTime;
use opentelemetry::KeyValue;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{self, EnvFilter};
use url::Url;

use info_indexer::indexer::{self, contract::info_stored_filter};
use info_indexer::metrics::Metrics;
use info_indexer::models::errors::ChainError;
use info_indexer::storage::{memory::InMemoryStore, setup_channels, EntityStore};
use info_indexer::subgraph::SubgraphClient;
use info_indexer::utils::load_config;

const SLEEP_DURATION: u64 = 1000; // ms

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    println!();
    info!("=========================== INITIALIZING ===========================");

    // Load config
    let config = match load_config("config.yml") {
        Ok(config) => {
            info!("Config loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(anyhow!(e));
        }
    };

    // Parse configs
    let chain_name = config.chain_name.to_owned(); // Create owned String to pass to metrics
    let contract_address = config.contract_address;
    let chain_tip_buffer = config.chain_tip_buffer;
    let blocks_per_batch = config.blocks_per_batch.max(1);
    let end_block = config.end_block;
    let metrics_enabled = config.metrics.enabled;

    // Initialize optional metrics
    let metrics = if metrics_enabled {
        Some(Metrics::new(chain_name.to_string())?)
    } else {
        info!("Metrics are disabled");
        None
    };

    // Start metrics server if metrics are enabled
    if let Some(metrics_instance) = &metrics {
        metrics_instance
            .start_metrics_server(&config.metrics.address, config.metrics.port)
            .await;
    }

    // Set up entity store and the channel feeding its worker
    let store: Arc<dyn EntityStore> = Arc::new(InMemoryStore::new());
    let channels = setup_channels(store.clone(), metrics.as_ref())?;

    // Create a shutdown signal handler. Flush the channel before shutting down.
    let mut shutdown_signal = channels.shutdown_signal();
    let shutdown_channels = channels.clone();
    tokio::spawn(async move {
        if let Ok(()) = signal::ctrl_c().await {
            info!("Received Ctrl+C signal, initiating shutdown...");
            if let Err(e) = shutdown_channels.shutdown(None).await {
                error!("Error during shutdown: {}", e);
            }
        }
    });

    // Create RPC provider
    let rpc_url: Url = config.rpc_url.parse()?;
    info!("RPC URL: {:?}", config.rpc_url);
    let provider = ProviderBuilder::new().connect_http(rpc_url);
    let provider: &dyn Provider = &provider;

    // Verify we are talking to the chain the config expects
    let chain_id = indexer::get_chain_id(provider, metrics.as_ref()).await?;
    if chain_id != config.chain_id {
        return Err(ChainError::ChainIdMismatch {
            expected: config.chain_id,
            got: chain_id,
        }
        .into());
    }
    info!("Chain ID: {:?}", chain_id);

    // Log a direct-read snapshot of chain state: contract balance and head block
    let balance = indexer::get_balance(provider, contract_address, metrics.as_ref()).await?;
    info!(
        "Monitored contract {} holds {} ETH",
        contract_address,
        format_ether(balance)
    );
    if let Some(head) =
        indexer::get_block_by_number(provider, BlockNumberOrTag::Latest, metrics.as_ref()).await?
    {
        let head_time = DateTime::from_timestamp(head.header.timestamp as i64, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| head.header.timestamp.to_string());
        info!(
            "Chain head: block {} at {}",
            head.header.number, head_time
        );
    }

    // Read back the most recent records already indexed by the query service.
    // The subgraph being unreachable is not fatal to local indexing.
    if let Some(subgraph_config) = &config.subgraph {
        let client = SubgraphClient::new(subgraph_config.url.clone());
        match client.latest_infos(subgraph_config.page_size).await {
            Ok(records) => {
                info!("Subgraph has {} recent records", records.len());
                for record in &records {
                    info!(
                        "  {} from {} at {}: {}",
                        record.name,
                        record.sender,
                        record
                            .recorded_at()
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_else(|| record.timestamp.clone()),
                        record.data
                    );
                }
            }
            Err(e) => warn!("Subgraph read failed: {}", e),
        }
    }

    // Resume after the last block already present in the store, else start
    // from the configured block
    let mut block_number = match store.latest_block() {
        Some(last) => last + 1,
        None => config.start_block.unwrap_or(0),
    };

    info!("Starting block number: {:?}", block_number);

    println!();
    info!("========================= STARTING INDEXER =========================");

    loop {
        // Check for shutdown signal (non-blocking)
        if shutdown_signal.try_recv().is_ok() {
            info!("Shutting down main processing loop...");
            break;
        }

        // Get latest block number
        let latest_block = indexer::get_latest_block_number(provider, metrics.as_ref()).await?;
        let safe_tip = latest_block.saturating_sub(chain_tip_buffer);

        // If indexer gets too close to tip, back off and retry
        if block_number > safe_tip {
            info!(
                "Buffer limit reached. Waiting for current block to be {} blocks behind tip: {} - current distance: {} - sleeping for 1s",
                chain_tip_buffer,
                latest_block,
                latest_block.saturating_sub(block_number)
            );
            tokio::time::sleep(tokio::time::Duration::from_millis(SLEEP_DURATION)).await;
            continue;
        }

        // Check channel capacity and apply backpressure if needed
        while !channels.check_capacity(metrics.as_ref()) {
            info!(
                "Applying backpressure - sleeping for {} seconds...",
                SLEEP_DURATION / 1000
            );
            tokio::time::sleep(tokio::time::Duration::from_millis(SLEEP_DURATION)).await;
        }

        // Scan a bounded range of blocks for InfoStored emissions
        let mut to_block = safe_tip.min(block_number + blocks_per_batch - 1);
        if let Some(end) = end_block {
            to_block = to_block.min(end);
        }

        let filter = info_stored_filter(contract_address, block_number, to_block);
        let logs = indexer::get_logs(provider, &filter, metrics.as_ref()).await?;
        let events = indexer::extract_events(logs);

        if !events.is_empty() {
            info!(
                "Found {} InfoStored events in blocks {}-{}",
                events.len(),
                block_number,
                to_block
            );

            // Direct-read demo path: report each carrying transaction and any
            // text recoverable from its calldata
            for event in &events {
                if let Some(tx_hash) = event.tx_hash {
                    match indexer::inspect_transaction(provider, tx_hash, metrics.as_ref()).await {
                        Ok(Some(insight)) => debug!(
                            "Transaction {} (succeeded: {:?}) calldata text: {:?}",
                            insight.tx_hash, insight.succeeded, insight.decoded_text
                        ),
                        Ok(None) => debug!("Transaction {} not yet available", tx_hash),
                        Err(e) => warn!("Failed to inspect transaction {}: {}", tx_hash, e),
                    }
                }
            }

            // Send events through the channel for mapping and persistence
            if let Err(e) = channels.events_tx.send((events, to_block)).await {
                error!("Failed to send event batch to channel: {}", e);
            }
        }

        // Update metrics
        if let Some(metrics_instance) = &metrics {
            metrics_instance.latest_processed_block.record(
                to_block,
                &[KeyValue::new("chain", metrics_instance.chain_name.clone())],
            );
            metrics_instance.chain_tip_block.record(
                latest_block,
                &[KeyValue::new("chain", metrics_instance.chain_name.clone())],
            );
            metrics_instance.chain_tip_lag.record(
                latest_block.saturating_sub(to_block),
                &[KeyValue::new("chain", metrics_instance.chain_name.clone())],
            );
        }

        // Stop once the configured end block has been scanned
        if let Some(end) = end_block {
            if to_block >= end {
                info!("Reached end block {}. Flushing and shutting down...", end);
                channels.shutdown(Some(end)).await?;
                info!("Store holds {} entities", store.len());
                return Ok(());
            }
        }

        block_number = to_block + 1;
    }

    Ok(())
}
