/*
 * Exact-input single-hop swaps through SwapRouter02
 */

use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::{error, info, warn};
use crate::abi;
use crate::config::SwapBounds;
use crate::models::{PoolInfo, SwapParameters, SwapStakeError, Result, TxConfirmation};
use crate::rpc::ChainClient;
use crate::utils::explorer_tx_url;

/// Parameters for swapping `amount_in` (smallest units) of `token_in` through
/// `pool`, paying out to `recipient`. The fee tier comes from the pool itself.
#[must_use]
pub fn build_swap_parameters(
    pool: &PoolInfo,
    token_in: Address,
    token_out: Address,
    recipient: Address,
    amount_in: U256,
    bounds: &SwapBounds,
) -> SwapParameters {
    SwapParameters {
        token_in,
        token_out,
        fee: pool.fee,
        recipient,
        amount_in,
        amount_out_minimum: bounds.min_amount_out,
        sqrt_price_limit_x96: bounds.sqrt_price_limit_x96,
    }
}

pub struct SwapExecutor {
    chain: Arc<dyn ChainClient>,
    router: Address,
    explorer_url: String,
}

impl SwapExecutor {
    pub fn new(chain: Arc<dyn ChainClient>, router: Address, explorer_url: impl Into<String>) -> Self {
        Self {
            chain,
            router,
            explorer_url: explorer_url.into(),
        }
    }

    #[must_use]
    pub fn router(&self) -> Address {
        self.router
    }

    pub async fn execute_swap(&self, params: &SwapParameters) -> Result<TxConfirmation> {
        if params.amount_out_minimum.is_zero() {
            warn!("Swap submitted with no minimum output; slippage is unbounded");
        }
        info!(
            "Swapping {} of {:?} for {:?} (fee tier {})",
            params.amount_in, params.token_in, params.token_out, params.fee
        );

        let confirmation = self
            .chain
            .send_transaction(self.router, abi::encode_exact_input_single(params))
            .await
            .map_err(|e| {
                error!("Swap failed: {}", e);
                SwapStakeError::SwapFailed(e)
            })?;

        info!(
            "Swap executed! {}",
            explorer_tx_url(&self.explorer_url, confirmation.tx_hash)
        );
        Ok(confirmation)
    }
}
