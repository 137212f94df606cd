use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ChainError, ChainEvent};

/// Handle over a stream of contract events.
///
/// Transport errors arrive in-band as `Err` items and do not end the stream;
/// the stream ends when the producer stops or the subscription is cancelled.
/// Dropping the handle cancels it.
pub struct EventSubscription {
    events: mpsc::Receiver<Result<ChainEvent, ChainError>>,
    producer: Option<JoinHandle<()>>,
}

impl EventSubscription {
    pub fn new(events: mpsc::Receiver<Result<ChainEvent, ChainError>>) -> Self {
        Self {
            events,
            producer: None,
        }
    }

    /// Ties the lifetime of the task feeding `events` to this handle.
    pub fn with_producer(
        events: mpsc::Receiver<Result<ChainEvent, ChainError>>,
        producer: JoinHandle<()>,
    ) -> Self {
        Self {
            events,
            producer: Some(producer),
        }
    }

    pub async fn next(&mut self) -> Option<Result<ChainEvent, ChainError>> {
        self.events.recv().await
    }

    /// Stops the producer. Items already buffered can still be drained.
    pub fn cancel(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        self.events.close();
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
