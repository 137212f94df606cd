//! Watches `FlightStatusInfo`, the event the contract emits once enough
//! oracles agree on a flight's status.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::listener::{ListenerHandle, ListenerStats};
use crate::chain::{ChainEvent, EventPayload, EventSubscription};
use crate::models::StatusCode;

pub fn spawn_flight_status_watcher(subscription: EventSubscription) -> ListenerHandle {
    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run(subscription, shutdown_rx));
    ListenerHandle::new(shutdown, task)
}

async fn run(mut subscription: EventSubscription, mut shutdown: watch::Receiver<bool>) -> ListenerStats {
    let mut stats = ListenerStats::default();

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            item = subscription.next() => {
                match item {
                    None => break,
                    Some(Err(err)) => {
                        stats.errors += 1;
                        warn!(error = %err, "flight status subscription error");
                    }
                    Some(Ok(ChainEvent { meta, payload: EventPayload::FlightStatusInfo(info) })) => {
                        stats.delivered += 1;
                        let status = StatusCode::try_from(info.status)
                            .map(|status| status.to_string())
                            .unwrap_or_else(|raw| format!("unrecognised ({raw})"));
                        info!(
                            airline = ?info.airline,
                            flight = %info.flight,
                            timestamp = %info.timestamp,
                            block = meta.block_number,
                            %status,
                            "flight status resolved"
                        );
                    }
                    Some(Ok(other)) => debug!(event = ?other.payload, "ignoring unrelated event"),
                }
            }
        }
    }

    subscription.cancel();
    stats
}
