/*
 * Configuration management for the swap-and-stake pipeline
 */

use crate::models::{SwapStakeError, Result, TokenDescriptor};
use crate::token::SEPOLIA_CHAIN_ID;
use crate::utils::parse_address;
use crate::{dex, staking, token};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const MAX_FEE_TIER: u32 = (1 << 24) - 1;

#[derive(Debug, Clone)]
pub struct Config {
    pub network: NetworkConfig,
    pub contracts: ContractsConfig,
    pub tokens: TokensConfig,
    pub swap: SwapBounds,
    pub transactions: TransactionConfig,
    pub signer: SignerKey,
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ContractsConfig {
    pub factory: Address,
    pub router: Address,
    pub staking: Address,
}

#[derive(Debug, Clone)]
pub struct TokensConfig {
    pub swap_in: TokenDescriptor,
    pub swap_out: TokenDescriptor,
    pub stake: TokenDescriptor,
}

/// Safety bounds applied to every swap. Zero means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapBounds {
    pub fee_tier: u32,
    pub min_amount_out: U256,
    pub sqrt_price_limit_x96: U256,
}

impl Default for SwapBounds {
    fn default() -> Self {
        Self {
            fee_tier: 3000,
            min_amount_out: U256::zero(),
            sqrt_price_limit_x96: U256::zero(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransactionConfig {
    pub confirmations: usize,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

/// Private key of the signing account. Never printed.
#[derive(Clone)]
pub struct SignerKey(LocalWallet);

impl SignerKey {
    pub fn from_hex(key: &str) -> Result<Self> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        key.parse::<LocalWallet>()
            .map(Self)
            .map_err(|_| SwapStakeError::ConfigError("PRIVATE_KEY is not a valid secp256k1 key".to_string()))
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.0.address()
    }

    #[must_use]
    pub fn wallet(&self, chain_id: u64) -> LocalWallet {
        self.0.clone().with_chain_id(chain_id)
    }
}

impl fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignerKey({:?})", self.address())
    }
}

#[derive(Deserialize)]
struct RawSettings {
    rpc_url: Option<String>,
    private_key: Option<String>,
    chain_id: u64,
    explorer_url: String,
    factory_address: String,
    router_address: String,
    staking_address: String,
    fee_tier: u32,
    min_amount_out: String,
    sqrt_price_limit_x96: String,
    confirmations: usize,
    confirmation_timeout_secs: u64,
    poll_interval_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = Self::builder()?
            .add_source(config::Environment::default())
            .build()
            .map_err(|e| SwapStakeError::ConfigError(format!("Failed to read environment: {e}")))?;

        Self::from_settings(settings)
    }

    /// Settings builder pre-populated with Sepolia defaults.
    pub fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let to_err = |e: config::ConfigError| SwapStakeError::ConfigError(e.to_string());

        config::Config::builder()
            .set_default("chain_id", SEPOLIA_CHAIN_ID)
            .and_then(|b| b.set_default("explorer_url", "https://sepolia.etherscan.io"))
            .and_then(|b| b.set_default("factory_address", dex::FACTORY_ADDRESS))
            .and_then(|b| b.set_default("router_address", dex::SWAP_ROUTER_ADDRESS))
            .and_then(|b| b.set_default("staking_address", staking::MASTERCHEF_ADDRESS))
            .and_then(|b| b.set_default("fee_tier", 3000))
            .and_then(|b| b.set_default("min_amount_out", "0"))
            .and_then(|b| b.set_default("sqrt_price_limit_x96", "0"))
            .and_then(|b| b.set_default("confirmations", 1))
            .and_then(|b| b.set_default("confirmation_timeout_secs", 180))
            .and_then(|b| b.set_default("poll_interval_ms", 2000))
            .map_err(to_err)
    }

    pub fn from_settings(settings: config::Config) -> Result<Self> {
        let raw: RawSettings = settings
            .try_deserialize()
            .map_err(|e| SwapStakeError::ConfigError(format!("Invalid settings: {e}")))?;

        let rpc_url = raw
            .rpc_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SwapStakeError::ConfigError("RPC_URL not set".to_string()))?;
        let signer = SignerKey::from_hex(
            raw.private_key
                .as_deref()
                .ok_or_else(|| SwapStakeError::ConfigError("PRIVATE_KEY not set".to_string()))?,
        )?;

        if raw.fee_tier == 0 || raw.fee_tier > MAX_FEE_TIER {
            return Err(SwapStakeError::ConfigError(format!("Invalid fee tier: {}", raw.fee_tier)));
        }
        if raw.confirmations == 0 {
            return Err(SwapStakeError::ConfigError("CONFIRMATIONS must be at least 1".to_string()));
        }
        if raw.confirmation_timeout_secs == 0 {
            return Err(SwapStakeError::ConfigError(
                "CONFIRMATION_TIMEOUT_SECS must be positive".to_string(),
            ));
        }
        if raw.poll_interval_ms == 0 {
            return Err(SwapStakeError::ConfigError("POLL_INTERVAL_MS must be positive".to_string()));
        }

        let tokens = TokensConfig {
            swap_in: token::usdc(raw.chain_id)?,
            swap_out: token::link(raw.chain_id)?,
            stake: token::link(raw.chain_id)?,
        };

        Ok(Config {
            network: NetworkConfig {
                rpc_url,
                chain_id: raw.chain_id,
                explorer_url: raw.explorer_url,
            },
            contracts: ContractsConfig {
                factory: parse_address(&raw.factory_address)?,
                router: parse_address(&raw.router_address)?,
                staking: parse_address(&raw.staking_address)?,
            },
            tokens,
            swap: SwapBounds {
                fee_tier: raw.fee_tier,
                min_amount_out: parse_uint("MIN_AMOUNT_OUT", &raw.min_amount_out)?,
                sqrt_price_limit_x96: parse_uint("SQRT_PRICE_LIMIT_X96", &raw.sqrt_price_limit_x96)?,
            },
            transactions: TransactionConfig {
                confirmations: raw.confirmations,
                confirmation_timeout: Duration::from_secs(raw.confirmation_timeout_secs),
                poll_interval: Duration::from_millis(raw.poll_interval_ms),
            },
            signer,
        })
    }
}

fn parse_uint(key: &str, value: &str) -> Result<U256> {
    U256::from_dec_str(value.trim())
        .map_err(|e| SwapStakeError::ConfigError(format!("Invalid {key}: {e}")))
}
