#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use alloy_primitives::{Address, B256, U256};
use flightsurety_oracle_server::chain::{
    BlockSelector, CallOutput, ChainClient, ChainError, ChainEvent, ContractEvent, ContractMethod,
    EventPayload, EventSubscription, Receipt, SendOptions,
};
use flightsurety_oracle_server::config::OracleConfig;
use flightsurety_oracle_server::models::{EventMeta, IndexTriple, StatusRequest};
use flightsurety_oracle_server::services::DeliveryPolicy;
use tokio::sync::mpsc;

pub const REGISTRATION_FEE_WEI: u64 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOp {
    Accounts,
    Call { from: Address, method: &'static str },
    Send { from: Address, method: ContractMethod, value: Option<U256> },
    Subscribe(ContractEvent),
}

/// In-memory stand-in for the FlightSurety app contract on a dev node.
pub struct FakeChain {
    accounts: Vec<Address>,
    assignments: HashMap<Address, IndexTriple>,
    reject_registration: HashSet<Address>,
    reject_responses: HashSet<Address>,
    unreachable_calls: HashSet<&'static str>,
    unreadable_indexes: HashSet<Address>,
    accounts_unavailable: bool,
    operational: bool,
    ops: Mutex<Vec<ChainOp>>,
    oracle_requests: Mutex<Option<mpsc::Receiver<Result<ChainEvent, ChainError>>>>,
    request_sender: mpsc::Sender<Result<ChainEvent, ChainError>>,
}

pub fn account(n: usize) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&(n as u64 + 1).to_be_bytes());
    Address::from(bytes)
}

impl FakeChain {
    /// `offset` filler accounts followed by one oracle account per triple.
    pub fn new(offset: usize, triples: &[[u8; 3]]) -> Self {
        let accounts: Vec<Address> = (0..offset + triples.len()).map(account).collect();
        let assignments = triples
            .iter()
            .enumerate()
            .map(|(n, triple)| (accounts[offset + n], IndexTriple(*triple)))
            .collect();
        let (request_sender, receiver) = mpsc::channel(64);

        Self {
            accounts,
            assignments,
            reject_registration: HashSet::new(),
            reject_responses: HashSet::new(),
            unreachable_calls: HashSet::new(),
            unreadable_indexes: HashSet::new(),
            accounts_unavailable: false,
            operational: true,
            ops: Mutex::new(Vec::new()),
            oracle_requests: Mutex::new(Some(receiver)),
            request_sender,
        }
    }

    pub fn reject_registration_of(mut self, oracle: Address) -> Self {
        self.reject_registration.insert(oracle);
        self
    }

    pub fn reject_responses_from(mut self, oracle: Address) -> Self {
        self.reject_responses.insert(oracle);
        self
    }

    /// `eth_accounts` fails as if the node were down.
    pub fn without_accounts(mut self) -> Self {
        self.accounts_unavailable = true;
        self
    }

    /// Read-only calls to `method` fail at the transport level.
    pub fn fail_calls_to(mut self, method: &'static str) -> Self {
        self.unreachable_calls.insert(method);
        self
    }

    /// Registration of `oracle` succeeds but reading its indexes back fails.
    pub fn fail_index_read_of(mut self, oracle: Address) -> Self {
        self.unreadable_indexes.insert(oracle);
        self
    }

    pub fn ops(&self) -> Vec<ChainOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Oracle responses submitted so far, as (sender, request).
    pub fn responses(&self) -> Vec<(Address, StatusRequest)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                ChainOp::Send {
                    from,
                    method: ContractMethod::SubmitOracleResponse { request, .. },
                    ..
                } => Some((from, request)),
                _ => None,
            })
            .collect()
    }

    /// True once the coordinator has let go of its `OracleRequest` stream.
    pub fn request_stream_closed(&self) -> bool {
        self.request_sender.is_closed()
    }

    pub async fn emit_request(&self, request: StatusRequest, log_index: u64) {
        self.emit(Ok(ChainEvent {
            meta: EventMeta {
                block_number: 10,
                transaction_hash: B256::repeat_byte(request.index),
                log_index,
            },
            payload: EventPayload::OracleRequest(request),
        }))
        .await;
    }

    pub async fn emit(&self, item: Result<ChainEvent, ChainError>) {
        self.request_sender
            .send(item)
            .await
            .expect("oracle request subscription dropped");
    }

    fn record(&self, op: ChainOp) {
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        self.record(ChainOp::Accounts);
        if self.accounts_unavailable {
            return Err(ChainError::Transport("connection refused".into()));
        }
        Ok(self.accounts.clone())
    }

    async fn call(&self, method: &ContractMethod, from: Address) -> Result<CallOutput, ChainError> {
        self.record(ChainOp::Call {
            from,
            method: method.name(),
        });
        if self.unreachable_calls.contains(method.name()) {
            return Err(ChainError::Transport("connection reset".into()));
        }
        match method {
            ContractMethod::GetMyIndexes if self.unreadable_indexes.contains(&from) => {
                Err(ChainError::Rpc { code: -32000, message: "header not found".into() })
            }
            ContractMethod::RegistrationFee => Ok(CallOutput::Uint(U256::from(REGISTRATION_FEE_WEI))),
            ContractMethod::GetMyIndexes => self
                .assignments
                .get(&from)
                .copied()
                .map(CallOutput::Indexes)
                .ok_or_else(|| ChainError::Reverted("Not registered as an oracle".into())),
            ContractMethod::IsOperational => Ok(CallOutput::Bool(self.operational)),
            _ => Ok(CallOutput::Empty),
        }
    }

    async fn send(&self, method: &ContractMethod, options: SendOptions) -> Result<Receipt, ChainError> {
        self.record(ChainOp::Send {
            from: options.from,
            method: method.clone(),
            value: options.value,
        });
        let rejected = match method {
            ContractMethod::RegisterOracle => {
                options.value != Some(U256::from(REGISTRATION_FEE_WEI))
                    || self.reject_registration.contains(&options.from)
            }
            ContractMethod::SubmitOracleResponse { .. } => self.reject_responses.contains(&options.from),
            _ => false,
        };
        if rejected {
            return Err(ChainError::Reverted(format!("{} reverted", method.name())));
        }
        Ok(Receipt {
            transaction_hash: B256::repeat_byte(0x77),
            block_number: Some(11),
        })
    }

    async fn subscribe(
        &self,
        event: ContractEvent,
        _from_block: BlockSelector,
    ) -> Result<EventSubscription, ChainError> {
        self.record(ChainOp::Subscribe(event));
        match event {
            ContractEvent::OracleRequest => self
                .oracle_requests
                .lock()
                .unwrap()
                .take()
                .map(EventSubscription::new)
                .ok_or_else(|| ChainError::Transport("already subscribed".into())),
            ContractEvent::FlightStatusInfo => Err(ChainError::Transport("not emitted by the fake".into())),
        }
    }
}

pub fn oracle_config(offset: usize, count: usize, policy: DeliveryPolicy) -> OracleConfig {
    OracleConfig {
        account_offset: offset,
        count,
        delivery_policy: policy,
        submission_timeout: Duration::from_secs(5),
        ..OracleConfig::default()
    }
}

pub fn status_request(index: u8) -> StatusRequest {
    StatusRequest {
        index,
        airline: account(1),
        flight: "ND1309".to_string(),
        timestamp: U256::from(1_700_000_000u64),
    }
}

pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
