/*
 * Workflow orchestrator: approve -> swap -> approve -> stake
 */

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};
use crate::{
    config::{Config, SwapBounds, TokensConfig},
    dex::{build_swap_parameters, PoolResolver, SwapExecutor},
    models::{
        ApprovalPurpose, PoolInfo, Result, StepConfirmation, SwapStakeError, TxConfirmation,
        WorkflowFailure, WorkflowReport, WorkflowState, WorkflowStep,
    },
    rpc::{ChainClient, RpcClient},
    staking::StakeManager,
    token::TokenAllowanceManager,
    utils::{from_smallest_unit, to_smallest_unit},
};

/// Entry parameters of one run. Amounts are in human units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowRequest {
    swap_amount: Decimal,
    stake_amount: Decimal,
    pool_id: u64,
}

impl WorkflowRequest {
    pub fn new(swap_amount: Decimal, stake_amount: Decimal, pool_id: u64) -> Result<Self> {
        for (name, amount) in [("swap", swap_amount), ("stake", stake_amount)] {
            if amount <= Decimal::ZERO {
                return Err(SwapStakeError::AmountError(format!(
                    "{name} amount must be positive, got {amount}"
                )));
            }
        }

        Ok(Self {
            swap_amount,
            stake_amount,
            pool_id,
        })
    }

    #[must_use]
    pub fn swap_amount(&self) -> Decimal {
        self.swap_amount
    }

    #[must_use]
    pub fn stake_amount(&self) -> Decimal {
        self.stake_amount
    }

    #[must_use]
    pub fn pool_id(&self) -> u64 {
        self.pool_id
    }
}

pub struct SwapStakeService {
    chain: Arc<dyn ChainClient>,
    allowances: TokenAllowanceManager,
    pools: PoolResolver,
    swaps: SwapExecutor,
    staking: StakeManager,
    tokens: TokensConfig,
    bounds: SwapBounds,
}

impl SwapStakeService {
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Initializing swap-and-stake service");

        let rpc = RpcClient::new(&config.network, &config.signer, &config.transactions).await?;
        info!("Connected to chain {}", rpc.chain_id());

        Ok(Self::with_chain(config, Arc::new(rpc)))
    }

    /// Builds the service on top of an existing chain client.
    pub fn with_chain(config: &Config, chain: Arc<dyn ChainClient>) -> Self {
        let explorer_url = config.network.explorer_url.clone();

        Self {
            allowances: TokenAllowanceManager::new(chain.clone(), explorer_url.clone()),
            pools: PoolResolver::new(chain.clone(), config.contracts.factory),
            swaps: SwapExecutor::new(chain.clone(), config.contracts.router, explorer_url.clone()),
            staking: StakeManager::new(
                chain.clone(),
                config.contracts.staking,
                config.tokens.stake.clone(),
                explorer_url,
            ),
            chain,
            tokens: config.tokens.clone(),
            bounds: config.swap,
        }
    }

    /// Runs every step in order, stopping at the first failure. Confirmed
    /// steps are never rolled back.
    pub async fn run(
        &self,
        request: &WorkflowRequest,
    ) -> std::result::Result<WorkflowReport, WorkflowFailure> {
        let started_at = Utc::now();
        info!(
            "Starting workflow for {:?}: swap {} {}, stake {} {} into pool {}",
            self.chain.signer_address(),
            request.swap_amount(),
            self.tokens.swap_in.symbol,
            request.stake_amount(),
            self.tokens.stake.symbol,
            request.pool_id()
        );

        let mut state = WorkflowState::Idle.advance();
        let mut completed = Vec::new();
        let mut pool = None;

        while let Some(step) = state.pending_step() {
            info!("Running step {}", step);

            match self.run_step(step, request, &mut pool).await {
                Ok(confirmation) => {
                    completed.push(StepConfirmation { step, confirmation });
                    state = state.advance();
                }
                Err(error) => {
                    state = state.fail();
                    error!("Step {} failed, workflow is now {:?}: {}", step, state, error);
                    if !completed.is_empty() {
                        warn!("{} confirmed step(s) remain in effect on-chain", completed.len());
                    }
                    return Err(WorkflowFailure {
                        step,
                        completed,
                        error,
                    });
                }
            }
        }

        info!("Workflow finished: {:?}", state);

        Ok(WorkflowReport {
            state,
            pool,
            confirmations: completed,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn run_step(
        &self,
        step: WorkflowStep,
        request: &WorkflowRequest,
        pool: &mut Option<PoolInfo>,
    ) -> Result<TxConfirmation> {
        match step {
            WorkflowStep::ApproveSwapToken => {
                self.allowances
                    .approve(
                        &self.tokens.swap_in,
                        self.swaps.router(),
                        request.swap_amount(),
                        ApprovalPurpose::Swap,
                    )
                    .await
            }
            WorkflowStep::ExecuteSwap => {
                let (token_in, token_out) = (&self.tokens.swap_in, &self.tokens.swap_out);
                let amount_in = to_smallest_unit(request.swap_amount(), token_in.decimals)?;
                let resolved = self
                    .pools
                    .resolve_pool(token_in.address, token_out.address, self.bounds.fee_tier)
                    .await?;

                let params = build_swap_parameters(
                    &resolved,
                    token_in.address,
                    token_out.address,
                    self.chain.signer_address(),
                    amount_in,
                    &self.bounds,
                );
                *pool = Some(resolved);

                let minimum = from_smallest_unit(params.amount_out_minimum, token_out.decimals)
                    .map_or_else(|_| params.amount_out_minimum.to_string(), |m| m.to_string());
                info!(
                    "Swapping {} {} for at least {} {}",
                    request.swap_amount(),
                    token_in.symbol,
                    minimum,
                    token_out.symbol
                );

                self.swaps.execute_swap(&params).await
            }
            WorkflowStep::ApproveStakeToken => self.staking.approve_stake(request.stake_amount()).await,
            WorkflowStep::ExecuteStake => {
                self.staking
                    .stake(request.stake_amount(), request.pool_id())
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi;
    use crate::config::{ContractsConfig, NetworkConfig, SignerKey, TransactionConfig};
    use crate::models::{ChainError, PoolError};
    use crate::rpc::mock::MockChainClient;
    use crate::token;
    use ethers::types::{Address, H256, U256};
    use std::str::FromStr;
    use std::time::Duration;

    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn test_config() -> Config {
        let chain_id = token::SEPOLIA_CHAIN_ID;
        Config {
            network: NetworkConfig {
                rpc_url: "http://localhost:8545".to_string(),
                chain_id,
                explorer_url: "https://sepolia.etherscan.io".to_string(),
            },
            contracts: ContractsConfig {
                factory: Address::repeat_byte(0xfa),
                router: Address::repeat_byte(0x3b),
                staking: Address::repeat_byte(0xc4),
            },
            tokens: TokensConfig {
                swap_in: token::usdc(chain_id).unwrap(),
                swap_out: token::link(chain_id).unwrap(),
                stake: token::link(chain_id).unwrap(),
            },
            swap: SwapBounds::default(),
            transactions: TransactionConfig {
                confirmations: 1,
                confirmation_timeout: Duration::from_secs(5),
                poll_interval: Duration::from_millis(10),
            },
            signer: SignerKey::from_hex(TEST_KEY).unwrap(),
        }
    }

    fn pool_address() -> Address {
        Address::repeat_byte(0x99)
    }

    /// A mock chain with the USDC/LINK 0.3% pool deployed.
    fn deployed_chain(config: &Config) -> Arc<MockChainClient> {
        let chain = Arc::new(MockChainClient::default());
        chain.deploy_pool(
            config.contracts.factory,
            pool_address(),
            config.tokens.swap_in.address,
            config.tokens.swap_out.address,
            3000,
        );
        chain
    }

    fn request() -> WorkflowRequest {
        WorkflowRequest::new(Decimal::ONE, Decimal::from_str("0.5").unwrap(), 1).unwrap()
    }

    #[tokio::test]
    async fn test_happy_path_reaches_done_in_order() {
        let config = test_config();
        let chain = deployed_chain(&config);
        let service = SwapStakeService::with_chain(&config, chain.clone());

        let report = service.run(&request()).await.unwrap();

        assert_eq!(report.state, WorkflowState::Done);
        assert_eq!(report.pool.map(|p| p.address), Some(pool_address()));
        assert_eq!(
            report.confirmations.iter().map(|c| c.step).collect::<Vec<_>>(),
            vec![
                WorkflowStep::ApproveSwapToken,
                WorkflowStep::ExecuteSwap,
                WorkflowStep::ApproveStakeToken,
                WorkflowStep::ExecuteStake,
            ]
        );

        let sent = chain.sent();
        assert_eq!(sent.len(), 4);

        // approve(USDC -> router, 1 USDC)
        assert_eq!(sent[0].to, config.tokens.swap_in.address);
        assert_eq!(
            abi::decode_approve(&sent[0].calldata).unwrap(),
            (config.contracts.router, U256::from(1_000_000u64))
        );

        // exactInputSingle(USDC -> LINK, 1 USDC, to signer)
        assert_eq!(sent[1].to, config.contracts.router);
        let params = abi::decode_exact_input_single(&sent[1].calldata).unwrap();
        assert_eq!(params.token_in, config.tokens.swap_in.address);
        assert_eq!(params.token_out, config.tokens.swap_out.address);
        assert_eq!(params.amount_in, U256::from(1_000_000u64));
        assert_eq!(params.recipient, chain.signer_address());
        assert_eq!(params.fee, 3000);
        assert!(params.amount_out_minimum.is_zero());

        // approve(LINK -> staking, 0.5 LINK)
        let half_link = U256::from(500_000_000_000_000_000u128);
        assert_eq!(sent[2].to, config.tokens.stake.address);
        assert_eq!(
            abi::decode_approve(&sent[2].calldata).unwrap(),
            (config.contracts.staking, half_link)
        );

        // deposit(1, 0.5 LINK)
        assert_eq!(sent[3].to, config.contracts.staking);
        assert_eq!(
            abi::decode_deposit(&sent[3].calldata).unwrap(),
            (U256::one(), half_link)
        );
    }

    #[tokio::test]
    async fn test_missing_pool_stops_before_swap() {
        let config = test_config();
        let chain = Arc::new(MockChainClient::default());
        chain.deploy_pool(
            config.contracts.factory,
            Address::zero(),
            Address::zero(),
            Address::zero(),
            0,
        );
        let service = SwapStakeService::with_chain(&config, chain.clone());

        let failure = service.run(&request()).await.unwrap_err();

        assert_eq!(failure.step, WorkflowStep::ExecuteSwap);
        assert_eq!(failure.state(), WorkflowState::Failed { step: WorkflowStep::ExecuteSwap });
        assert!(matches!(
            failure.error,
            SwapStakeError::PoolResolutionFailed(PoolError::NotFound { .. })
        ));
        // only the first approval went out
        let sent = chain.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].selector(), abi::selector(abi::APPROVE));
        assert_eq!(failure.completed.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_approval_stops_before_swap() {
        let config = test_config();
        let chain = deployed_chain(&config);
        chain.fail_send(
            config.tokens.swap_in.address,
            abi::APPROVE,
            ChainError::Rejected("insufficient funds for gas".to_string()),
        );
        let service = SwapStakeService::with_chain(&config, chain.clone());

        let failure = service.run(&request()).await.unwrap_err();

        assert_eq!(failure.step, WorkflowStep::ApproveSwapToken);
        assert!(matches!(
            failure.error,
            SwapStakeError::ApprovalFailed {
                purpose: ApprovalPurpose::Swap,
                ..
            }
        ));
        assert!(failure.completed.is_empty());
        assert_eq!(chain.sent().len(), 1);
        // the pool is never even looked up
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_deposit_surfaces_stake_failure_once() {
        let config = test_config();
        let chain = deployed_chain(&config);
        chain.fail_send(
            config.contracts.staking,
            abi::DEPOSIT,
            ChainError::Reverted(H256::repeat_byte(0xee)),
        );
        let service = SwapStakeService::with_chain(&config, chain.clone());
        let request = WorkflowRequest::new(Decimal::ONE, Decimal::ONE, 42).unwrap();

        let failure = service.run(&request).await.unwrap_err();

        assert_eq!(failure.step, WorkflowStep::ExecuteStake);
        assert!(matches!(
            failure.error,
            SwapStakeError::StakeFailed(ChainError::Reverted(_))
        ));
        // earlier steps stay confirmed, the deposit was attempted exactly once
        assert_eq!(failure.completed.len(), 3);
        let deposits = chain
            .sent()
            .iter()
            .filter(|tx| tx.selector() == abi::selector(abi::DEPOSIT))
            .count();
        assert_eq!(deposits, 1);
    }

    #[tokio::test]
    async fn test_failed_swap_skips_staking() {
        let config = test_config();
        let chain = deployed_chain(&config);
        chain.fail_send(
            config.contracts.router,
            abi::EXACT_INPUT_SINGLE,
            ChainError::Timeout {
                tx_hash: H256::zero(),
                timeout: Duration::from_secs(5),
            },
        );
        let service = SwapStakeService::with_chain(&config, chain.clone());

        let failure = service.run(&request()).await.unwrap_err();

        assert_eq!(failure.step, WorkflowStep::ExecuteSwap);
        assert!(matches!(failure.error, SwapStakeError::SwapFailed(ChainError::Timeout { .. })));
        assert_eq!(chain.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_minimum_is_still_sent_verbatim() {
        let mut config = test_config();
        config.swap.min_amount_out = U256::MAX;
        let chain = deployed_chain(&config);
        let service = SwapStakeService::with_chain(&config, chain.clone());

        let report = service.run(&request()).await.unwrap();

        assert_eq!(report.state, WorkflowState::Done);
        let params = abi::decode_exact_input_single(&chain.sent()[1].calldata).unwrap();
        assert_eq!(params.amount_out_minimum, U256::MAX);
    }

    #[test]
    fn test_request_rejects_non_positive_amounts() {
        assert!(WorkflowRequest::new(Decimal::ZERO, Decimal::ONE, 1).is_err());
        assert!(WorkflowRequest::new(Decimal::ONE, Decimal::NEGATIVE_ONE, 1).is_err());

        let request = request();
        assert_eq!(request.swap_amount(), Decimal::ONE);
        assert_eq!(request.stake_amount(), Decimal::from_str("0.5").unwrap());
        assert_eq!(request.pool_id(), 1);
    }
}
