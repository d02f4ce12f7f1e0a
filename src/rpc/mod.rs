/*
 * RPC client module for reading contract state and submitting signed transactions
 */

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use chrono::Utc;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, JsonRpcClient, Middleware, Provider, ProviderError};
use ethers::signers::LocalWallet;
use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, Bytes, TransactionReceipt, TransactionRequest, H256, U64,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use crate::config::{NetworkConfig, SignerKey, TransactionConfig};
use crate::models::{ChainError, SwapStakeError, Result, TxConfirmation};

/// Read/write access to the remote ledger.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Account that signs every submitted transaction.
    fn signer_address(&self) -> Address;

    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, calldata: Bytes) -> std::result::Result<Bytes, ChainError>;

    /// Signs and submits a transaction, then waits until it is mined with a
    /// success status.
    async fn send_transaction(
        &self,
        to: Address,
        calldata: Bytes,
    ) -> std::result::Result<TxConfirmation, ChainError>;
}

pub type SignerClient<P = Http> = SignerMiddleware<Provider<P>, LocalWallet>;

pub struct RpcClient<P: JsonRpcClient = Http> {
    client: Arc<SignerClient<P>>,
    chain_id: u64,
    confirmations: usize,
    confirmation_timeout: Duration,
}

impl RpcClient<Http> {
    pub async fn new(
        network: &NetworkConfig,
        signer: &SignerKey,
        transactions: &TransactionConfig,
    ) -> Result<Self> {
        let provider = Provider::<Http>::try_from(network.rpc_url.as_str())
            .map_err(|e| SwapStakeError::RpcError(format!("Failed to create provider: {e}")))?
            .interval(transactions.poll_interval);

        Self::from_provider(provider, network, signer, transactions).await
    }
}

impl<P: JsonRpcClient + 'static> RpcClient<P> {
    /// Wraps an existing provider after checking it serves the configured chain.
    pub async fn from_provider(
        provider: Provider<P>,
        network: &NetworkConfig,
        signer: &SignerKey,
        transactions: &TransactionConfig,
    ) -> Result<Self> {
        let chain = provider
            .get_chainid()
            .await
            .map_err(|e| SwapStakeError::RpcError(format!("Failed to get chain ID: {e}")))?;

        if chain.as_u64() != network.chain_id {
            return Err(SwapStakeError::RpcError(format!(
                "Chain ID mismatch: expected {}, got {}",
                network.chain_id,
                chain.as_u64()
            )));
        }

        let client = SignerMiddleware::new(provider, signer.wallet(network.chain_id));

        Ok(Self {
            client: Arc::new(client),
            chain_id: network.chain_id,
            confirmations: transactions.confirmations,
            confirmation_timeout: transactions.confirmation_timeout,
        })
    }

    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> ChainClient for RpcClient<P> {
    fn signer_address(&self) -> Address {
        self.client.address()
    }

    async fn call(&self, to: Address, calldata: Bytes) -> std::result::Result<Bytes, ChainError> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(calldata).into();

        self.client
            .call(&tx, None)
            .await
            .map_err(|e| ChainError::Rejected(e.to_string()))
    }

    async fn send_transaction(
        &self,
        to: Address,
        calldata: Bytes,
    ) -> std::result::Result<TxConfirmation, ChainError> {
        let tx = TransactionRequest::new().to(to).data(calldata);

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| ChainError::Rejected(e.to_string()))?;
        let tx_hash = *pending;
        info!("Transaction sent: {:?}", tx_hash);

        await_confirmation(
            tx_hash,
            self.confirmation_timeout,
            pending.confirmations(self.confirmations),
        )
        .await
    }
}

/// Waits at most `timeout` for `receipt` and accepts only a mined receipt
/// with a success status.
async fn await_confirmation<F>(
    tx_hash: H256,
    timeout: Duration,
    receipt: F,
) -> std::result::Result<TxConfirmation, ChainError>
where
    F: Future<Output = std::result::Result<Option<TransactionReceipt>, ProviderError>>,
{
    let receipt = tokio::time::timeout(timeout, receipt)
        .await
        .map_err(|_| ChainError::Timeout { tx_hash, timeout })?
        .map_err(|e| ChainError::Rejected(e.to_string()))?
        .ok_or(ChainError::Dropped(tx_hash))?;

    if receipt.status != Some(U64::one()) {
        return Err(ChainError::Reverted(tx_hash));
    }

    debug!(
        "Transaction {:?} mined in block {:?}, gas used {:?}",
        tx_hash, receipt.block_number, receipt.gas_used
    );

    Ok(TxConfirmation {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number.map(|b| b.as_u64()),
        gas_used: receipt.gas_used,
        confirmed_at: Utc::now(),
    })
}
