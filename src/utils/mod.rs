/*
 * Utility functions and helpers
 */

use ethers::types::{Address, H256, U256};
use rust_decimal::Decimal;
use std::str::FromStr;
use crate::models::{SwapStakeError, Result};

/// Scales a human-readable amount into the token's smallest unit.
///
/// Amounts carrying more fractional digits than `decimals` are rejected
/// rather than rounded.
pub fn to_smallest_unit(amount: Decimal, decimals: u32) -> Result<U256> {
    if amount.is_sign_negative() {
        return Err(SwapStakeError::AmountError(format!("Negative amount: {amount}")));
    }

    let amount = amount.normalize();
    let scale = amount.scale();
    if scale > decimals {
        return Err(SwapStakeError::AmountError(format!(
            "{amount} has more than {decimals} fractional digits"
        )));
    }

    let mantissa = u128::try_from(amount.mantissa())
        .map_err(|e| SwapStakeError::AmountError(format!("Invalid mantissa: {e}")))?;

    U256::from(mantissa)
        .checked_mul(U256::exp10((decimals - scale) as usize))
        .ok_or_else(|| SwapStakeError::AmountError(format!("{amount} overflows uint256")))
}

/// Inverse of [`to_smallest_unit`].
pub fn from_smallest_unit(value: U256, decimals: u32) -> Result<Decimal> {
    let ten = U256::from(10u8);
    let mut mantissa = value;
    let mut scale = decimals;
    // drop trailing zeros so large whole amounts fit the 96-bit mantissa
    while scale > 0 && !mantissa.is_zero() && (mantissa % ten).is_zero() {
        mantissa /= ten;
        scale -= 1;
    }

    if mantissa.bits() > 96 {
        return Err(SwapStakeError::AmountError(format!(
            "{value} is too large for a decimal amount"
        )));
    }

    #[allow(clippy::cast_possible_wrap)]
    let raw = mantissa.as_u128() as i128;
    Decimal::try_from_i128_with_scale(raw, scale)
        .map(|d| d.normalize())
        .map_err(|e| SwapStakeError::AmountError(format!("Cannot unscale {value}: {e}")))
}

pub fn parse_address(address: &str) -> Result<Address> {
    if !address.starts_with("0x") || address.len() != 42 {
        return Err(SwapStakeError::ConfigError(format!("Invalid address format: {address}")));
    }
    Address::from_str(address)
        .map_err(|e| SwapStakeError::ConfigError(format!("Invalid address {address}: {e}")))
}

#[must_use]
pub fn explorer_tx_url(explorer_url: &str, tx_hash: H256) -> String {
    format!("{}/tx/{:?}", explorer_url.trim_end_matches('/'), tx_hash)
}
