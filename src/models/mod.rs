/*
 * Data models, error types and workflow states for the swap-and-stake pipeline
 */

use chrono::{DateTime, Utc};
use ethers::types::{Address, H256, U256};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDescriptor {
    pub chain_id: u64,
    pub address: Address,
    pub decimals: u32,
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolInfo {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
}

/// Arguments of SwapRouter02 `exactInputSingle`. Amounts are in smallest units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParameters {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
    pub recipient: Address,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
    pub sqrt_price_limit_x96: U256,
}

/// Summary of a mined, successful transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxConfirmation {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPurpose {
    Swap,
    Stake,
}

impl fmt::Display for ApprovalPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalPurpose::Swap => write!(f, "swap"),
            ApprovalPurpose::Stake => write!(f, "stake"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowStep {
    ApproveSwapToken,
    ExecuteSwap,
    ApproveStakeToken,
    ExecuteStake,
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStep::ApproveSwapToken => "approve-swap-token",
            WorkflowStep::ExecuteSwap => "execute-swap",
            WorkflowStep::ApproveStakeToken => "approve-stake-token",
            WorkflowStep::ExecuteStake => "execute-stake",
        };
        f.write_str(name)
    }
}

/// Orchestrator state. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Running(WorkflowStep),
    Done,
    Failed { step: WorkflowStep },
}

impl WorkflowState {
    /// The step this state still has to perform, if any.
    #[must_use]
    pub fn pending_step(self) -> Option<WorkflowStep> {
        match self {
            WorkflowState::Running(step) => Some(step),
            _ => None,
        }
    }

    /// Transition taken after the current step confirmed.
    #[must_use]
    pub fn advance(self) -> Self {
        match self {
            WorkflowState::Idle => WorkflowState::Running(WorkflowStep::ApproveSwapToken),
            WorkflowState::Running(WorkflowStep::ApproveSwapToken) => {
                WorkflowState::Running(WorkflowStep::ExecuteSwap)
            }
            WorkflowState::Running(WorkflowStep::ExecuteSwap) => {
                WorkflowState::Running(WorkflowStep::ApproveStakeToken)
            }
            WorkflowState::Running(WorkflowStep::ApproveStakeToken) => {
                WorkflowState::Running(WorkflowStep::ExecuteStake)
            }
            WorkflowState::Running(WorkflowStep::ExecuteStake) => WorkflowState::Done,
            terminal => terminal,
        }
    }

    /// Transition taken when the current step fails. Earlier steps stay in effect.
    #[must_use]
    pub fn fail(self) -> Self {
        match self {
            WorkflowState::Running(step) => WorkflowState::Failed { step },
            terminal => terminal,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Done | WorkflowState::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfirmation {
    pub step: WorkflowStep,
    pub confirmation: TxConfirmation,
}

#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub state: WorkflowState,
    pub pool: Option<PoolInfo>,
    pub confirmations: Vec<StepConfirmation>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// A run that stopped before `Done`. Confirmations listed here remain on-chain.
#[derive(Debug, Error)]
#[error("workflow failed at {step}: {error}")]
pub struct WorkflowFailure {
    pub step: WorkflowStep,
    pub completed: Vec<StepConfirmation>,
    #[source]
    pub error: SwapStakeError,
}

impl WorkflowFailure {
    #[must_use]
    pub fn state(&self) -> WorkflowState {
        WorkflowState::Failed { step: self.step }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("node rejected request: {0}")]
    Rejected(String),

    #[error("transaction {0:?} reverted")]
    Reverted(H256),

    #[error("transaction {0:?} dropped before confirmation")]
    Dropped(H256),

    #[error("transaction {tx_hash:?} not confirmed within {timeout:?}")]
    Timeout { tx_hash: H256, timeout: Duration },

    #[error("malformed contract response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("no pool deployed for {token_a:?}/{token_b:?} at fee tier {fee}")]
    NotFound {
        token_a: Address,
        token_b: Address,
        fee: u32,
    },

    #[error("pool query failed: {0}")]
    Query(#[source] ChainError),
}

#[derive(Debug, Error)]
pub enum SwapStakeError {
    #[error("{purpose} token approval failed")]
    ApprovalFailed {
        purpose: ApprovalPurpose,
        #[source]
        source: ChainError,
    },

    #[error("pool resolution failed")]
    PoolResolutionFailed(#[source] PoolError),

    #[error("swap failed")]
    SwapFailed(#[source] ChainError),

    #[error("staking failed")]
    StakeFailed(#[source] ChainError),

    #[error("Invalid amount: {0}")]
    AmountError(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SwapStakeError {
    /// Underlying chain failure, when the error came from a contract call.
    #[must_use]
    pub fn chain_cause(&self) -> Option<&ChainError> {
        match self {
            SwapStakeError::ApprovalFailed { source, .. }
            | SwapStakeError::SwapFailed(source)
            | SwapStakeError::StakeFailed(source) => Some(source),
            SwapStakeError::PoolResolutionFailed(PoolError::Query(source)) => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SwapStakeError>;
