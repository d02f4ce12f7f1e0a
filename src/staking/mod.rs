/*
 * MasterChef style staking: allowance for the staking contract and deposits
 */

use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};
use crate::abi;
use crate::models::{ApprovalPurpose, SwapStakeError, Result, TokenDescriptor, TxConfirmation};
use crate::rpc::ChainClient;
use crate::token::TokenAllowanceManager;
use crate::utils::{explorer_tx_url, to_smallest_unit};

// Placeholder deployment; override with STAKING_ADDRESS
pub const MASTERCHEF_ADDRESS: &str = "0x1234567890abcdef1234567890abcdef12345678";

pub struct StakeManager {
    chain: Arc<dyn ChainClient>,
    allowances: TokenAllowanceManager,
    staking_contract: Address,
    stake_token: TokenDescriptor,
    explorer_url: String,
}

impl StakeManager {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        staking_contract: Address,
        stake_token: TokenDescriptor,
        explorer_url: impl Into<String>,
    ) -> Self {
        let explorer_url = explorer_url.into();
        Self {
            allowances: TokenAllowanceManager::new(chain.clone(), explorer_url.clone()),
            chain,
            staking_contract,
            stake_token,
            explorer_url,
        }
    }

    pub async fn approve_stake(&self, amount: Decimal) -> Result<TxConfirmation> {
        self.allowances
            .approve(&self.stake_token, self.staking_contract, amount, ApprovalPurpose::Stake)
            .await
    }

    /// Deposits `amount` (human units) into slot `pool_id` of the staking
    /// contract. The slot id is passed through unchecked.
    pub async fn stake(&self, amount: Decimal, pool_id: u64) -> Result<TxConfirmation> {
        let scaled = to_smallest_unit(amount, self.stake_token.decimals)?;
        info!(
            "Staking {} {} into pool {} of {:?}",
            amount, self.stake_token.symbol, pool_id, self.staking_contract
        );

        let confirmation = self
            .chain
            .send_transaction(
                self.staking_contract,
                abi::encode_deposit(U256::from(pool_id), scaled),
            )
            .await
            .map_err(|e| {
                error!("Staking failed: {}", e);
                SwapStakeError::StakeFailed(e)
            })?;

        info!(
            "Staking confirmed! {}",
            explorer_tx_url(&self.explorer_url, confirmation.tx_hash)
        );
        Ok(confirmation)
    }
}
