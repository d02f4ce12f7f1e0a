/*
 * Swapstake - approve, swap and stake pipeline
 * Core library exports and module declarations
 */

pub mod abi;
pub mod config;
pub mod dex;
pub mod models;
pub mod rpc;
pub mod service;
pub mod staking;
pub mod token;
pub mod utils;

pub use config::Config;
pub use models::*;
pub use service::{SwapStakeService, WorkflowRequest};
