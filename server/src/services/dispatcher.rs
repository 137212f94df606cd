//! Response dispatcher: one simulated oracle answer per eligible oracle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use alloy_primitives::Address;
use futures_util::future::join_all;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::listener::StatusRequestHandler;
use super::registry::OracleRegistry;
use crate::chain::{ChainClient, ContractMethod, SendOptions};
use crate::models::{EventMeta, StatusCode, StatusRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub eligible: usize,
    pub submitted: usize,
    /// Reverted by the contract, e.g. the consensus window already closed.
    pub rejected: usize,
    pub failed: usize,
    pub timed_out: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Submitted,
    Rejected,
    Failed,
    TimedOut,
}

pub struct ResponseDispatcher<C: ?Sized> {
    client: Arc<C>,
    registry: Arc<OracleRegistry>,
    submission_timeout: Duration,
}

impl<C: ChainClient + ?Sized> ResponseDispatcher<C> {
    pub fn new(client: Arc<C>, registry: Arc<OracleRegistry>, submission_timeout: Duration) -> Self {
        Self {
            client,
            registry,
            submission_timeout,
        }
    }

    /// Submits a response from every oracle eligible for `request`.
    ///
    /// Submissions run concurrently and independently; a failed one is
    /// logged, counted and dropped without retry.
    pub async fn dispatch(&self, request: &StatusRequest) -> DispatchSummary {
        let eligible = self.registry.find_eligible(request.index);
        if eligible.is_empty() {
            debug!(index = request.index, "no registered oracle holds this index");
            return DispatchSummary::default();
        }

        let responses: Vec<(Address, StatusCode)> = {
            let mut rng = rand::thread_rng();
            eligible
                .iter()
                .map(|oracle| (oracle.address, StatusCode::random(&mut rng)))
                .collect()
        };

        let outcomes = join_all(
            responses
                .into_iter()
                .map(|(oracle, status)| self.submit(request, oracle, status)),
        )
        .await;

        let mut summary = DispatchSummary {
            eligible: eligible.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Submitted => summary.submitted += 1,
                Outcome::Rejected => summary.rejected += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::TimedOut => summary.timed_out += 1,
            }
        }
        summary
    }

    async fn submit(&self, request: &StatusRequest, oracle: Address, status: StatusCode) -> Outcome {
        let method = ContractMethod::SubmitOracleResponse {
            request: request.clone(),
            status,
        };

        match timeout(
            self.submission_timeout,
            self.client.send(&method, SendOptions::sender(oracle)),
        )
        .await
        {
            Ok(Ok(receipt)) => {
                debug!(
                    oracle = ?oracle,
                    status = status.code(),
                    tx = ?receipt.transaction_hash,
                    "oracle response submitted"
                );
                Outcome::Submitted
            }
            Ok(Err(err)) if err.is_rejection() => {
                info!(oracle = ?oracle, index = request.index, error = %err, "oracle response rejected");
                Outcome::Rejected
            }
            Ok(Err(err)) => {
                warn!(oracle = ?oracle, index = request.index, error = %err, "oracle response failed");
                Outcome::Failed
            }
            Err(_) => {
                warn!(
                    oracle = ?oracle,
                    index = request.index,
                    timeout_ms = self.submission_timeout.as_millis() as u64,
                    "oracle response timed out"
                );
                Outcome::TimedOut
            }
        }
    }
}

#[async_trait]
impl<C: ChainClient + ?Sized + 'static> StatusRequestHandler for ResponseDispatcher<C> {
    async fn handle(&self, request: StatusRequest, meta: EventMeta) {
        let summary = self.dispatch(&request).await;
        info!(
            index = request.index,
            airline = ?request.airline,
            flight = %request.flight,
            timestamp = %request.timestamp,
            block = meta.block_number,
            eligible = summary.eligible,
            submitted = summary.submitted,
            rejected = summary.rejected,
            failed = summary.failed,
            timed_out = summary.timed_out,
            "oracle request dispatched"
        );
    }
}
