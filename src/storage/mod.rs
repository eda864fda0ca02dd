pub mod memory;

use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::broadcast;
use tokio::sync::mpsc::{self, Sender};
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use opentelemetry::KeyValue;

use crate::indexer::index_events;
use crate::metrics::Metrics;
use crate::models::events::{ChainEvent, IndexedEntity};

const MAX_CHANNEL_CAPACITY: usize = 1024;
// Apply backpressure when less than this fraction of the channel remains
const MIN_FREE_CAPACITY: usize = MAX_CHANNEL_CAPACITY / 10;

/// Persistence collaborator for mapped entities. Implementations must treat
/// `id` as an upsert key: writing an entity whose id already exists replaces
/// the previous record. Event redelivery after a reorganization or restart
/// therefore never produces duplicates.
pub trait EntityStore: Send + Sync {
    fn upsert(&self, entity: &IndexedEntity) -> Result<()>;
    fn get(&self, id: &str) -> Option<IndexedEntity>;
    /// Most recent entities, ordered by timestamp descending.
    fn latest(&self, limit: usize) -> Vec<IndexedEntity>;
    /// Highest block number seen so far, used to resume scanning.
    fn latest_block(&self) -> Option<u64>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct EventChannels {
    pub events_tx: Sender<(Vec<ChainEvent>, u64)>,
    shutdown: broadcast::Sender<()>,
    // Last block the worker has fully persisted
    last_block_processed: Arc<AtomicU64>,
}

impl EventChannels {
    pub fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    pub async fn shutdown(self, end_block: Option<u64>) -> Result<()> {
        // Signal the worker to shutdown
        if let Err(e) = self.shutdown.send(()) {
            return Err(e.into());
        }

        let timeout = StdDuration::from_secs(60 * 5);
        let start = Instant::now();

        while start.elapsed() < timeout {
            if let Some(target) = end_block {
                if self.last_block_processed.load(Ordering::Relaxed) >= target {
                    info!("Event worker completed processing up to block {}", target);
                    return Ok(());
                }
                debug!(
                    "Waiting for event worker. Progress: block {}",
                    self.last_block_processed.load(Ordering::Relaxed)
                );
            } else if self.events_tx.capacity() == MAX_CHANNEL_CAPACITY {
                tokio::time::sleep(Duration::from_secs(1)).await;
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(anyhow::anyhow!("Shutdown timeout"))
    }

    pub fn update_progress(&self, block: u64) {
        self.last_block_processed.store(block, Ordering::Relaxed);
    }

    /// Returns false when the channel is nearly full and the producer should
    /// back off before fetching more blocks.
    pub fn check_capacity(&self, metrics: Option<&Metrics>) -> bool {
        let capacity = self.events_tx.capacity();

        if let Some(metrics) = metrics {
            metrics.channel_capacity.record(
                capacity as u64,
                &[KeyValue::new("chain", metrics.chain_name.clone())],
            );
        }

        capacity > MIN_FREE_CAPACITY
    }
}

pub fn setup_channels(
    store: Arc<dyn EntityStore>,
    metrics: Option<&Metrics>,
) -> Result<EventChannels> {
    let (events_tx, mut events_rx) = mpsc::channel::<(Vec<ChainEvent>, u64)>(MAX_CHANNEL_CAPACITY);
    let (shutdown_tx, _) = broadcast::channel(1);

    let channels = EventChannels {
        events_tx,
        shutdown: shutdown_tx.clone(),
        last_block_processed: Arc::new(AtomicU64::new(0)),
    };

    let metrics = metrics.cloned();
    let mut shutdown_rx = shutdown_tx.subscribe();
    let channels_clone = channels.clone();

    tokio::spawn(async move {
        let result: Result<()> = async {
            loop {
                tokio::select! {
                    Some((events, block_number)) = events_rx.recv() => {
                        let indexed = index_events(events, store.as_ref())
                            .map_err(|e| anyhow::anyhow!(
                                "Failed to persist events up to block {}: {}",
                                block_number, &e.to_string()
                            ))?;
                        channels_clone.update_progress(block_number);

                        if let Some(metrics) = &metrics {
                            metrics.events_indexed.add(
                                indexed as u64,
                                &[KeyValue::new("chain", metrics.chain_name.clone())],
                            );
                        }
                    }
                    res = shutdown_rx.recv() => {
                        match res {
                            Ok(_) => debug!("Event worker received shutdown signal."),
                            Err(e) => match e {
                                broadcast::error::RecvError::Closed => debug!("Event worker shutdown channel closed."),
                                broadcast::error::RecvError::Lagged(n) => warn!("Event worker lagged and missed {} shutdown signals. Proceeding with shutdown.", n),
                            },
                        }
                        debug!("Event worker processing remaining items...");
                        // Drain anything still queued before exiting
                        while let Ok((events, block_number)) = events_rx.try_recv() {
                            index_events(events, store.as_ref())
                                .map_err(|e| anyhow::anyhow!(
                                    "Failed to persist final events up to block {}: {}",
                                    block_number, &e.to_string()
                                ))?;
                            channels_clone.update_progress(block_number);
                        }
                        debug!("Event worker completed");
                        break;
                    }
                }
            }
            Ok(())
        }
        .await;

        if let Err(e) = result {
            error!("Event worker error: {}", &e.to_string());
        }
        info!("Event worker shut down");
    });

    Ok(channels)
}
