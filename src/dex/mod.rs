/*
 * Uniswap V3 style DEX integration: pool lookup and single-hop swaps
 */

mod pool;
mod swap;

pub use pool::PoolResolver;
pub use swap::{build_swap_parameters, SwapExecutor};

pub const FACTORY_ADDRESS: &str = "0x0227628f3F023bb0B980b67D528571c95c6DaC1c";
pub const SWAP_ROUTER_ADDRESS: &str = "0x3bFA4769FB09eefC5a80d6E87c3B9C650f7Ae48E";
