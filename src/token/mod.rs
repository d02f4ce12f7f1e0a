/*
 * ERC-20 token registry and allowance approvals
 */

use ethers::types::Address;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use crate::abi;
use crate::models::{ApprovalPurpose, SwapStakeError, Result, TokenDescriptor, TxConfirmation};
use crate::rpc::ChainClient;
use crate::utils::{explorer_tx_url, to_smallest_unit};

pub const SEPOLIA_USDC_ADDRESS: &str = "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238";
pub const SEPOLIA_LINK_ADDRESS: &str = "0x779877A7B0D9E8603169DdbD7836e478b4624789";

pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

pub fn usdc(chain_id: u64) -> Result<TokenDescriptor> {
    descriptor(chain_id, SEPOLIA_USDC_ADDRESS, 6, "USDC", "USD//C")
}

pub fn link(chain_id: u64) -> Result<TokenDescriptor> {
    descriptor(chain_id, SEPOLIA_LINK_ADDRESS, 18, "LINK", "Chainlink")
}

fn descriptor(
    chain_id: u64,
    address: &str,
    decimals: u32,
    symbol: &str,
    name: &str,
) -> Result<TokenDescriptor> {
    // Only Sepolia deployments are registered
    if chain_id != SEPOLIA_CHAIN_ID {
        return Err(SwapStakeError::ConfigError(format!(
            "No {symbol} deployment known for chain {chain_id}"
        )));
    }

    let address = Address::from_str(address)
        .map_err(|e| SwapStakeError::ConfigError(format!("Invalid {symbol} address: {e}")))?;

    Ok(TokenDescriptor {
        chain_id,
        address,
        decimals,
        symbol: symbol.to_string(),
        name: name.to_string(),
    })
}

pub struct TokenAllowanceManager {
    chain: Arc<dyn ChainClient>,
    explorer_url: String,
}

impl TokenAllowanceManager {
    pub fn new(chain: Arc<dyn ChainClient>, explorer_url: impl Into<String>) -> Self {
        Self {
            chain,
            explorer_url: explorer_url.into(),
        }
    }

    /// Lets `spender` move up to `amount` (human units) of `token` and waits
    /// for the approval to be mined.
    pub async fn approve(
        &self,
        token: &TokenDescriptor,
        spender: Address,
        amount: Decimal,
        purpose: ApprovalPurpose,
    ) -> Result<TxConfirmation> {
        let allowance = to_smallest_unit(amount, token.decimals)?;
        info!(
            "Approving {} {} ({} base units) for {} spender {:?}",
            amount, token.symbol, allowance, purpose, spender
        );

        let calldata = abi::encode_approve(spender, allowance);
        let confirmation = self
            .chain
            .send_transaction(token.address, calldata)
            .await
            .map_err(|source| {
                error!("{} token approval failed: {}", purpose, source);
                SwapStakeError::ApprovalFailed { purpose, source }
            })?;

        info!(
            "Approval confirmed! {}",
            explorer_tx_url(&self.explorer_url, confirmation.tx_hash)
        );
        Ok(confirmation)
    }
}
