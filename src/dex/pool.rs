/*
 * Pool lookup through the factory contract
 */

use ethers::types::Address;
use std::sync::Arc;
use tracing::{error, info};
use crate::abi;
use crate::models::{ChainError, PoolError, PoolInfo, SwapStakeError, Result};
use crate::rpc::ChainClient;

pub struct PoolResolver {
    chain: Arc<dyn ChainClient>,
    factory: Address,
}

impl PoolResolver {
    pub fn new(chain: Arc<dyn ChainClient>, factory: Address) -> Self {
        Self { chain, factory }
    }

    /// Finds the pool for `(token_a, token_b, fee)` and reads its token
    /// ordering and fee. token0/token1 follow the pool, not the argument order.
    pub async fn resolve_pool(&self, token_a: Address, token_b: Address, fee: u32) -> Result<PoolInfo> {
        self.resolve_pool_internal(token_a, token_b, fee)
            .await
            .map_err(|e| {
                error!("Pool resolution failed: {}", e);
                SwapStakeError::PoolResolutionFailed(e)
            })
    }

    async fn resolve_pool_internal(
        &self,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> std::result::Result<PoolInfo, PoolError> {
        let response = self
            .chain
            .call(self.factory, abi::encode_get_pool(token_a, token_b, fee))
            .await
            .map_err(PoolError::Query)?;
        let address = abi::decode_address(&response).map_err(PoolError::Query)?;

        if address.is_zero() {
            return Err(PoolError::NotFound { token_a, token_b, fee });
        }

        let (token0, token1, pool_fee) = tokio::try_join!(
            self.read_address(address, abi::TOKEN0),
            self.read_address(address, abi::TOKEN1),
            self.read_fee(address),
        )
        .map_err(PoolError::Query)?;

        info!(
            "Resolved pool {:?}: token0={:?} token1={:?} fee={}",
            address, token0, token1, pool_fee
        );

        Ok(PoolInfo {
            address,
            token0,
            token1,
            fee: pool_fee,
        })
    }

    async fn read_address(&self, pool: Address, signature: &str) -> std::result::Result<Address, ChainError> {
        let response = self.chain.call(pool, abi::encode_no_args(signature)).await?;
        abi::decode_address(&response)
    }

    async fn read_fee(&self, pool: Address) -> std::result::Result<u32, ChainError> {
        let response = self.chain.call(pool, abi::encode_no_args(abi::FEE)).await?;
        abi::decode_uint24(&response)
    }
}
