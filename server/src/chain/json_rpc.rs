//! [`ChainClient`] over Ethereum HTTP JSON-RPC.
//!
//! Targets a development node that holds the oracle accounts unlocked
//! (Ganache, Anvil), so transactions go out through `eth_sendTransaction` and
//! the node signs them. Event subscriptions poll `eth_getLogs` behind a block
//! cursor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use alloy_primitives::{Address, LogData, B256};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{
    BlockSelector, CallOutput, ChainClient, ChainError, ChainEvent, ContractEvent, ContractMethod,
    EventSubscription, Receipt, SendOptions,
};
use crate::config::ChainConfig;
use crate::models::EventMeta;

const EVENT_BUFFER: usize = 256;
const MAX_BLOCK_RANGE: u64 = 500;
const RECEIPT_POLL_ATTEMPTS: u32 = 60;

struct RpcTransport {
    url: String,
    http: Client,
    next_id: AtomicU64,
}

impl RpcTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .http
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        if let Some(error) = response.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            if message.to_ascii_lowercase().contains("revert") {
                return Err(ChainError::Reverted(message));
            }
            return Err(ChainError::Rpc { code, message });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::Malformed(format!("{method} response has no result")))
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&result)
    }
}

pub struct JsonRpcChainClient {
    rpc: Arc<RpcTransport>,
    contract: Address,
    gas: u64,
    poll_interval: Duration,
}

impl JsonRpcChainClient {
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            rpc: Arc::new(RpcTransport {
                url: config.rpc_url.clone(),
                http: Client::new(),
                next_id: AtomicU64::new(1),
            }),
            contract: config.app_address,
            gas: config.gas,
            poll_interval: config.poll_interval,
        }
    }

    async fn wait_for_receipt(&self, method: &ContractMethod, hash: B256) -> Result<Receipt, ChainError> {
        for _ in 0..RECEIPT_POLL_ATTEMPTS {
            let receipt = self
                .rpc
                .call("eth_getTransactionReceipt", json!([hash]))
                .await?;
            if receipt.is_null() {
                sleep(self.poll_interval).await;
                continue;
            }

            let status = receipt.get("status").map(parse_quantity).transpose()?;
            if status == Some(0) {
                return Err(ChainError::Reverted(format!(
                    "{} reverted in transaction {hash:?}",
                    method.name()
                )));
            }

            let block_number = receipt
                .get("blockNumber")
                .filter(|value| !value.is_null())
                .map(parse_quantity)
                .transpose()?;
            return Ok(Receipt {
                transaction_hash: hash,
                block_number,
            });
        }

        Err(ChainError::ReceiptTimeout(hash))
    }
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        let result = self.rpc.call("eth_accounts", json!([])).await?;
        result
            .as_array()
            .ok_or_else(|| ChainError::Malformed("eth_accounts result is not an array".into()))?
            .iter()
            .map(parse_address)
            .collect()
    }

    async fn call(&self, method: &ContractMethod, from: Address) -> Result<CallOutput, ChainError> {
        let result = self
            .rpc
            .call(
                "eth_call",
                json!([
                    {
                        "from": from,
                        "to": self.contract,
                        "data": format!("0x{}", hex::encode(method.calldata())),
                    },
                    "latest"
                ]),
            )
            .await?;
        let data = parse_bytes(&result)?;
        Ok(method.decode_output(&data)?)
    }

    async fn send(
        &self,
        method: &ContractMethod,
        options: SendOptions,
    ) -> Result<Receipt, ChainError> {
        let mut transaction = json!({
            "from": options.from,
            "to": self.contract,
            "gas": format!("{:#x}", self.gas),
            "data": format!("0x{}", hex::encode(method.calldata())),
        });
        if let Some(value) = options.value {
            transaction["value"] = json!(value);
        }

        let result = self
            .rpc
            .call("eth_sendTransaction", json!([transaction]))
            .await?;
        let hash = parse_b256(&result)?;
        debug!(method = method.name(), from = ?options.from, tx = ?hash, "transaction sent");

        self.wait_for_receipt(method, hash).await
    }

    async fn subscribe(
        &self,
        event: ContractEvent,
        from_block: BlockSelector,
    ) -> Result<EventSubscription, ChainError> {
        let start = match from_block {
            BlockSelector::Genesis => 0,
            BlockSelector::Latest => self.rpc.block_number().await?,
            BlockSelector::Number(number) => number,
        };

        let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
        let poller = LogPoller {
            rpc: self.rpc.clone(),
            contract: self.contract,
            event,
            cursor: start,
            interval: self.poll_interval,
        };
        info!(event = event.signature(), from_block = start, "subscribing to contract event");

        Ok(EventSubscription::with_producer(
            receiver,
            tokio::spawn(poller.run(sender)),
        ))
    }
}

struct LogPoller {
    rpc: Arc<RpcTransport>,
    contract: Address,
    event: ContractEvent,
    cursor: u64,
    interval: Duration,
}

impl LogPoller {
    async fn run(mut self, sender: mpsc::Sender<Result<ChainEvent, ChainError>>) {
        loop {
            match self.poll_once().await {
                Ok(events) => {
                    for event in events {
                        if sender.send(event).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!(event = self.event.signature(), error = %err, "log poll failed");
                    if sender.send(Err(err)).await.is_err() {
                        return;
                    }
                }
            }

            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = sender.closed() => return,
            }
        }
    }

    /// Fetches the next block range and advances the cursor past it.
    async fn poll_once(&mut self) -> Result<Vec<Result<ChainEvent, ChainError>>, ChainError> {
        let latest = self.rpc.block_number().await?;
        if self.cursor > latest {
            return Ok(Vec::new());
        }

        // Bound the range so a replay from genesis stays within node limits.
        let to_block = latest.min(self.cursor + MAX_BLOCK_RANGE - 1);
        let logs = self
            .rpc
            .call(
                "eth_getLogs",
                json!([{
                    "fromBlock": format!("{:#x}", self.cursor),
                    "toBlock": format!("{:#x}", to_block),
                    "address": self.contract,
                    "topics": [self.event.topic()],
                }]),
            )
            .await?;

        let logs = logs
            .as_array()
            .ok_or_else(|| ChainError::Malformed("eth_getLogs result is not an array".into()))?;
        let events = logs
            .iter()
            .filter(|log| !log.get("removed").and_then(Value::as_bool).unwrap_or(false))
            .map(|log| parse_log(self.event, log))
            .collect();

        debug!(from_block = self.cursor, to_block, logs = logs.len(), "polled contract logs");
        self.cursor = to_block + 1;
        Ok(events)
    }
}

fn parse_log(event: ContractEvent, log: &Value) -> Result<ChainEvent, ChainError> {
    let field = |name: &str| {
        log.get(name)
            .ok_or_else(|| ChainError::Malformed(format!("log is missing {name}")))
    };

    let meta = EventMeta {
        block_number: parse_quantity(field("blockNumber")?)?,
        transaction_hash: parse_b256(field("transactionHash")?)?,
        log_index: parse_quantity(field("logIndex")?)?,
    };
    let topics = field("topics")?
        .as_array()
        .ok_or_else(|| ChainError::Malformed("log topics is not an array".into()))?
        .iter()
        .map(parse_b256)
        .collect::<Result<Vec<_>, _>>()?;
    let data = parse_bytes(field("data")?)?;

    Ok(ChainEvent {
        meta,
        payload: event.decode(&LogData::new_unchecked(topics, data.into()))?,
    })
}

fn as_hex_str(value: &Value) -> Result<&str, ChainError> {
    value
        .as_str()
        .map(|s| s.trim_start_matches("0x"))
        .ok_or_else(|| ChainError::Malformed(format!("expected hex string, got {value}")))
}

fn parse_quantity(value: &Value) -> Result<u64, ChainError> {
    let digits = as_hex_str(value)?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|err| ChainError::Malformed(format!("bad quantity {value}: {err}")))
}

fn parse_bytes(value: &Value) -> Result<Vec<u8>, ChainError> {
    hex::decode(as_hex_str(value)?)
        .map_err(|err| ChainError::Malformed(format!("bad hex data: {err}")))
}

fn parse_address(value: &Value) -> Result<Address, ChainError> {
    let bytes = parse_bytes(value)?;
    if bytes.len() != 20 {
        return Err(ChainError::Malformed(format!("bad address {value}")));
    }
    Ok(Address::from_slice(&bytes))
}

fn parse_b256(value: &Value) -> Result<B256, ChainError> {
    let bytes = parse_bytes(value)?;
    if bytes.len() != 32 {
        return Err(ChainError::Malformed(format!("bad hash {value}")));
    }
    Ok(B256::from_slice(&bytes))
}
