//! Status-request listener: turns the `OracleRequest` event stream into
//! handler invocations.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::chain::{ChainEvent, EventPayload, EventSubscription};
use crate::models::{EventId, EventMeta, StatusRequest};

/// How many blocks behind the newest delivered log an id is still remembered.
const DEDUP_WINDOW_BLOCKS: u64 = 1024;

#[async_trait]
pub trait StatusRequestHandler: Send + Sync + 'static {
    async fn handle(&self, request: StatusRequest, meta: EventMeta);
}

/// What to do when the chain client delivers the same log more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Handle each chain log once, keyed by transaction hash and log index.
    #[default]
    Deduplicate,
    /// Handle every delivery.
    AtLeastOnce,
}

impl FromStr for DeliveryPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dedupe" | "deduplicate" => Ok(DeliveryPolicy::Deduplicate),
            "at-least-once" | "at_least_once" => Ok(DeliveryPolicy::AtLeastOnce),
            _ => Err(format!(
                "unknown delivery policy {value:?}, expected dedupe or at-least-once"
            )),
        }
    }
}

impl fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryPolicy::Deduplicate => f.write_str("dedupe"),
            DeliveryPolicy::AtLeastOnce => f.write_str("at-least-once"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Events handed to the handler.
    pub delivered: u64,
    /// Repeated deliveries dropped under [`DeliveryPolicy::Deduplicate`].
    pub duplicates: u64,
    /// Errors reported by the subscription.
    pub errors: u64,
}

/// Cancellation handle for a running listener task.
pub struct ListenerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<ListenerStats>,
}

impl ListenerHandle {
    pub(crate) fn new(shutdown: watch::Sender<bool>, task: JoinHandle<ListenerStats>) -> Self {
        Self { shutdown, task }
    }

    pub fn cancel(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the subscription, waits for in-flight handlers and returns
    /// what the listener saw.
    pub async fn shutdown(self) -> ListenerStats {
        self.cancel();
        self.join().await
    }

    /// Waits for the listener to stop on its own.
    pub async fn join(self) -> ListenerStats {
        match self.task.await {
            Ok(stats) => stats,
            Err(err) => {
                error!(error = %err, "listener task failed");
                ListenerStats::default()
            }
        }
    }
}

/// Ids of recently handled logs, grouped by block so that ids falling out of
/// the window can be dropped.
struct SeenEvents {
    window: u64,
    by_block: BTreeMap<u64, HashSet<EventId>>,
}

impl SeenEvents {
    fn new(window: u64) -> Self {
        Self {
            window,
            by_block: BTreeMap::new(),
        }
    }

    /// Records the log, returning `false` if it was already seen.
    fn insert(&mut self, meta: &EventMeta) -> bool {
        let fresh = self
            .by_block
            .entry(meta.block_number)
            .or_default()
            .insert(meta.id());

        if let Some(&newest) = self.by_block.keys().next_back() {
            let horizon = newest.saturating_sub(self.window);
            while let Some(oldest) = self.by_block.first_entry() {
                if *oldest.key() >= horizon {
                    break;
                }
                oldest.remove();
            }
        }
        fresh
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.by_block.values().map(HashSet::len).sum()
    }
}

pub struct StatusRequestListener;

impl StatusRequestListener {
    /// Spawns the listener. Each request runs on its own task, so a slow
    /// dispatch never holds up the next event.
    pub fn spawn<H: StatusRequestHandler>(
        subscription: EventSubscription,
        handler: Arc<H>,
        policy: DeliveryPolicy,
    ) -> ListenerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(subscription, handler, policy, shutdown_rx));
        ListenerHandle::new(shutdown, task)
    }
}

async fn run<H: StatusRequestHandler>(
    mut subscription: EventSubscription,
    handler: Arc<H>,
    policy: DeliveryPolicy,
    mut shutdown: watch::Receiver<bool>,
) -> ListenerStats {
    let mut stats = ListenerStats::default();
    let mut seen = SeenEvents::new(DEDUP_WINDOW_BLOCKS);
    let mut in_flight = JoinSet::new();

    info!(%policy, "status request listener started");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            Some(finished) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = finished {
                    error!(error = %err, "status request handler failed");
                }
            }
            item = subscription.next() => {
                match item {
                    None => {
                        info!("oracle request stream ended");
                        break;
                    }
                    Some(Err(err)) => {
                        stats.errors += 1;
                        warn!(error = %err, "oracle request subscription error");
                    }
                    Some(Ok(ChainEvent { meta, payload: EventPayload::OracleRequest(request) })) => {
                        if policy == DeliveryPolicy::Deduplicate && !seen.insert(&meta) {
                            stats.duplicates += 1;
                            debug!(tx = ?meta.transaction_hash, log_index = meta.log_index, "duplicate oracle request dropped");
                        } else {
                            stats.delivered += 1;
                            let handler = handler.clone();
                            in_flight.spawn(async move { handler.handle(request, meta).await });
                        }
                    }
                    Some(Ok(other)) => {
                        debug!(event = ?other.payload, "ignoring unrelated event");
                    }
                }
            }
        }
    }

    subscription.cancel();
    while let Some(finished) = in_flight.join_next().await {
        if let Err(err) = finished {
            error!(error = %err, "status request handler failed");
        }
    }

    info!(
        delivered = stats.delivered,
        duplicates = stats.duplicates,
        errors = stats.errors,
        "status request listener stopped"
    );
    stats
}
