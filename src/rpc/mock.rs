/*
 * In-memory chain client used by the unit tests
 */

use async_trait::async_trait;
use chrono::Utc;
use ethers::types::{Address, Bytes, H256, U256};
use std::collections::HashMap;
use std::sync::Mutex;
use crate::abi;
use crate::models::{ChainError, TxConfirmation};
use crate::rpc::ChainClient;

/// A transaction submitted through the mock.
#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub to: Address,
    pub calldata: Bytes,
}

impl SentTransaction {
    pub fn selector(&self) -> [u8; 4] {
        [self.calldata[0], self.calldata[1], self.calldata[2], self.calldata[3]]
    }
}

/// Records every call in order. Reads answer from a table keyed by target and
/// selector; sends succeed unless a failure was scripted for them.
pub struct MockChainClient {
    signer: Address,
    reads: Mutex<HashMap<(Address, [u8; 4]), Bytes>>,
    send_failures: Mutex<HashMap<(Address, [u8; 4]), ChainError>>,
    calls: Mutex<Vec<(Address, [u8; 4])>>,
    sent: Mutex<Vec<SentTransaction>>,
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new(Address::repeat_byte(0x5e))
    }
}

impl MockChainClient {
    pub fn new(signer: Address) -> Self {
        Self {
            signer,
            reads: Mutex::new(HashMap::new()),
            send_failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(&self, to: Address, signature: &str, response: Bytes) {
        self.reads
            .lock()
            .unwrap()
            .insert((to, abi::selector(signature)), response);
    }

    /// Registers a factory pool and its token0/token1/fee getters.
    pub fn deploy_pool(&self, factory: Address, pool: Address, token0: Address, token1: Address, fee: u32) {
        use ethers::abi::{encode, Token};

        self.respond(factory, abi::GET_POOL, encode(&[Token::Address(pool)]).into());
        self.respond(pool, abi::TOKEN0, encode(&[Token::Address(token0)]).into());
        self.respond(pool, abi::TOKEN1, encode(&[Token::Address(token1)]).into());
        self.respond(pool, abi::FEE, encode(&[Token::Uint(U256::from(fee))]).into());
    }

    pub fn fail_send(&self, to: Address, signature: &str, error: ChainError) {
        self.send_failures
            .lock()
            .unwrap()
            .insert((to, abi::selector(signature)), error);
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<(Address, [u8; 4])> {
        self.calls.lock().unwrap().clone()
    }
}

fn selector_of(calldata: &Bytes) -> [u8; 4] {
    let mut selector = [0u8; 4];
    let len = calldata.len().min(4);
    selector[..len].copy_from_slice(&calldata[..len]);
    selector
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ChainError> {
        let key = (to, selector_of(&calldata));
        self.calls.lock().unwrap().push(key);

        self.reads
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| ChainError::Rejected("execution reverted".to_string()))
    }

    async fn send_transaction(&self, to: Address, calldata: Bytes) -> Result<TxConfirmation, ChainError> {
        let key = (to, selector_of(&calldata));
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentTransaction { to, calldata });

        if let Some(error) = self.send_failures.lock().unwrap().get(&key) {
            return Err(error.clone());
        }

        Ok(TxConfirmation {
            tx_hash: H256::from_low_u64_be(sent.len() as u64),
            block_number: Some(sent.len() as u64),
            gas_used: Some(U256::from(50_000u64)),
            confirmed_at: Utc::now(),
        })
    }
}
