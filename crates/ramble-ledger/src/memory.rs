use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use ramble_types::{Block, LogEvent};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::traits::LedgerClient;
use crate::types::{LogFilter, SentTransaction, Submission, TxReceipt, TxSpec};

/// Timestamp of block 1 in the in-memory chain.
const GENESIS_TIME: u64 = 1_460_000_000;
/// Seconds between consecutive in-memory blocks.
const BLOCK_INTERVAL: u64 = 12;

/// In-memory ledger for tests, local demos, and embedding.
///
/// Every accepted transaction is mined into its own block and emits one log
/// whose topics are `[event tag, params[0]]` and whose data is `params[1]`,
/// which is the shape the comments contract produces.
pub struct InMemoryLedger {
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    head: u64,
    blocks: BTreeMap<u64, Block>,
    logs: Vec<(String, LogEvent)>,
    transactions: Vec<TxSpec>,
    /// Contract method name to the event tag its log carries.
    event_tags: HashMap<String, String>,
    query_failure: Option<String>,
    rejection: Option<String>,
}

fn digest_hex(domain: &str, data: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain.as_bytes());
    hasher.update(b":");
    hasher.update(data);
    format!("0x{}", hex::encode(hasher.finalize().as_bytes()))
}

impl LedgerState {
    fn mine(&mut self) -> Block {
        self.head += 1;
        let number = self.head;
        let block = Block {
            number,
            hash: digest_hex("ramble-block-v1", &number.to_be_bytes()),
            timestamp: GENESIS_TIME + (number - 1) * BLOCK_INTERVAL,
        };
        self.blocks.insert(number, block.clone());
        block
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        let mut state = LedgerState::default();
        state
            .event_tags
            .insert("addComment".into(), "comment".into());
        state
            .event_tags
            .insert("addMetadata".into(), "metadata".into());
        Self {
            inner: RwLock::new(state),
        }
    }

    /// Route logs of `method` under `event_tag`.
    pub fn register_event(&self, method: impl Into<String>, event_tag: impl Into<String>) {
        self.inner
            .write()
            .expect("lock poisoned")
            .event_tags
            .insert(method.into(), event_tag.into());
    }

    /// Mine an empty block.
    pub fn mine_block(&self) -> Block {
        self.inner.write().expect("lock poisoned").mine()
    }

    /// Mine a block carrying one log emitted by `address`.
    pub fn emit_log(
        &self,
        address: &str,
        topics: Vec<String>,
        data: impl Into<String>,
    ) -> LogEvent {
        let mut state = self.inner.write().expect("lock poisoned");
        let block = state.mine();
        let log = LogEvent::new(topics, data, block.number);
        state.logs.push((address.to_string(), log.clone()));
        log
    }

    pub fn head(&self) -> u64 {
        self.inner.read().expect("lock poisoned").head
    }

    /// Every transaction submitted so far, including rejected ones.
    pub fn transactions(&self) -> Vec<TxSpec> {
        self.inner.read().expect("lock poisoned").transactions.clone()
    }

    /// Make subsequent log queries fail with `reason`, or succeed again.
    pub fn fail_queries(&self, reason: Option<&str>) {
        self.inner.write().expect("lock poisoned").query_failure = reason.map(str::to_string);
    }

    /// Make subsequent transactions fail after being sent, or succeed again.
    pub fn reject_transactions(&self, reason: Option<&str>) {
        self.inner.write().expect("lock poisoned").rejection = reason.map(str::to_string);
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read().expect("lock poisoned");
        f.debug_struct("InMemoryLedger")
            .field("head", &state.head)
            .field("log_count", &state.logs.len())
            .field("tx_count", &state.transactions.len())
            .finish()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn query_logs(&self, filter: &LogFilter) -> LedgerResult<Vec<LogEvent>> {
        let state = self.inner.read().expect("lock poisoned");
        if let Some(reason) = &state.query_failure {
            return Err(LedgerError::QueryFailed(reason.clone()));
        }
        let from = filter.from_block.resolve(state.head);
        let to = filter.to_block.resolve(state.head);
        let logs = state
            .logs
            .iter()
            .filter(|(address, _)| *address == filter.address)
            .map(|(_, log)| log)
            .filter(|log| (from..=to).contains(&log.block_number))
            .filter(|log| {
                filter
                    .topics
                    .iter()
                    .enumerate()
                    .all(|(i, topic)| log.topics.get(i) == Some(topic))
            })
            .cloned()
            .collect();
        Ok(logs)
    }

    async fn get_block(&self, number: u64, _full_transactions: bool) -> LedgerResult<Block> {
        self.inner
            .read()
            .expect("lock poisoned")
            .blocks
            .get(&number)
            .cloned()
            .ok_or(LedgerError::BlockNotFound(number))
    }

    async fn submit_transaction(&self, tx: &TxSpec) -> LedgerResult<Submission> {
        let mut state = self.inner.write().expect("lock poisoned");
        let tag = state
            .event_tags
            .get(&tx.method)
            .cloned()
            .ok_or_else(|| LedgerError::SubmissionFailed(format!("unknown method {}", tx.method)))?;
        let [market, data] = tx.params.as_slice() else {
            return Err(LedgerError::SubmissionFailed(format!(
                "{} expects 2 params, got {}",
                tx.method,
                tx.params.len()
            )));
        };
        let (market, data) = (market.clone(), data.clone());

        let mut encoded = serde_json::to_vec(tx)
            .map_err(|e| LedgerError::SubmissionFailed(e.to_string()))?;
        // Identical calls still get distinct hashes.
        encoded.extend_from_slice(&(state.transactions.len() as u64).to_be_bytes());
        let tx_hash = digest_hex("ramble-tx-v1", &encoded);
        state.transactions.push(tx.clone());

        let sent = SentTransaction {
            tx_hash: tx_hash.clone(),
            call_return: "1".into(),
        };

        if let Some(reason) = state.rejection.clone() {
            debug!(%tx_hash, %reason, "transaction rejected");
            return Ok(Submission::settled(
                sent,
                Err(LedgerError::TransactionFailed { tx_hash, reason }),
            ));
        }

        let block = state.mine();
        state
            .logs
            .push((tx.to.clone(), LogEvent::new(vec![tag, market], data, block.number)));
        debug!(%tx_hash, block = block.number, method = %tx.method, "transaction mined");

        let receipt = TxReceipt {
            tx_hash,
            block_number: block.number,
            block_hash: block.hash,
            from: tx.from.clone(),
            to: tx.to.clone(),
            call_return: sent.call_return.clone(),
            value: 0,
        };
        Ok(Submission::settled(sent, Ok(receipt)))
    }
}
