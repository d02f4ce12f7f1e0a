/*
 * Calldata encoding and decoding for the factory, pool, router, ERC-20 and
 * staking contracts
 */

use ethers::{
    abi::{decode, encode, ParamType, Token},
    types::{Address, Bytes, U256},
    utils::keccak256,
};
use crate::models::{ChainError, SwapParameters};

pub const APPROVE: &str = "approve(address,uint256)";
pub const GET_POOL: &str = "getPool(address,address,uint24)";
pub const TOKEN0: &str = "token0()";
pub const TOKEN1: &str = "token1()";
pub const FEE: &str = "fee()";
// SwapRouter02 layout, no deadline field
pub const EXACT_INPUT_SINGLE: &str =
    "exactInputSingle((address,address,uint24,address,uint256,uint256,uint160))";
pub const DEPOSIT: &str = "deposit(uint256,uint256)";

#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn encode_call(signature: &str, params: &[Token]) -> Bytes {
    let mut call_data = Vec::from(selector(signature));
    call_data.extend_from_slice(&encode(params));
    Bytes::from(call_data)
}

#[cfg(test)]
fn decode_args(signature: &str, types: &[ParamType], calldata: &[u8]) -> Result<Vec<Token>, ChainError> {
    if calldata.len() < 4 || calldata[..4] != selector(signature) {
        return Err(ChainError::Decode(format!("calldata is not a {signature} call")));
    }
    decode(types, &calldata[4..]).map_err(|e| ChainError::Decode(format!("{signature}: {e}")))
}

#[must_use]
pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    encode_call(APPROVE, &[Token::Address(spender), Token::Uint(amount)])
}

#[must_use]
pub fn encode_get_pool(token_a: Address, token_b: Address, fee: u32) -> Bytes {
    encode_call(
        GET_POOL,
        &[Token::Address(token_a), Token::Address(token_b), Token::Uint(fee.into())],
    )
}

#[must_use]
pub fn encode_no_args(signature: &str) -> Bytes {
    encode_call(signature, &[])
}

#[must_use]
pub fn encode_exact_input_single(params: &SwapParameters) -> Bytes {
    encode_call(
        EXACT_INPUT_SINGLE,
        &[Token::Tuple(vec![
            Token::Address(params.token_in),
            Token::Address(params.token_out),
            Token::Uint(params.fee.into()),
            Token::Address(params.recipient),
            Token::Uint(params.amount_in),
            Token::Uint(params.amount_out_minimum),
            Token::Uint(params.sqrt_price_limit_x96),
        ])],
    )
}

#[must_use]
pub fn encode_deposit(pool_id: U256, amount: U256) -> Bytes {
    encode_call(DEPOSIT, &[Token::Uint(pool_id), Token::Uint(amount)])
}

pub fn decode_address(data: &[u8]) -> Result<Address, ChainError> {
    decode(&[ParamType::Address], data)
        .ok()
        .and_then(|mut tokens| tokens.pop())
        .and_then(Token::into_address)
        .ok_or_else(|| ChainError::Decode("expected an address return value".to_string()))
}

pub fn decode_uint24(data: &[u8]) -> Result<u32, ChainError> {
    let value = decode(&[ParamType::Uint(24)], data)
        .ok()
        .and_then(|mut tokens| tokens.pop())
        .and_then(Token::into_uint)
        .ok_or_else(|| ChainError::Decode("expected a uint24 return value".to_string()))?;

    if value.bits() > 24 {
        return Err(ChainError::Decode(format!("{value} does not fit in uint24")));
    }
    Ok(value.as_u32())
}

#[cfg(test)]
pub fn decode_approve(calldata: &[u8]) -> Result<(Address, U256), ChainError> {
    let tokens = decode_args(APPROVE, &[ParamType::Address, ParamType::Uint(256)], calldata)?;
    match tokens.as_slice() {
        [Token::Address(spender), Token::Uint(amount)] => Ok((*spender, *amount)),
        _ => Err(ChainError::Decode("unexpected approve arguments".to_string())),
    }
}

#[cfg(test)]
pub fn decode_deposit(calldata: &[u8]) -> Result<(U256, U256), ChainError> {
    let tokens = decode_args(DEPOSIT, &[ParamType::Uint(256), ParamType::Uint(256)], calldata)?;
    match tokens.as_slice() {
        [Token::Uint(pool_id), Token::Uint(amount)] => Ok((*pool_id, *amount)),
        _ => Err(ChainError::Decode("unexpected deposit arguments".to_string())),
    }
}

#[cfg(test)]
pub fn decode_exact_input_single(calldata: &[u8]) -> Result<SwapParameters, ChainError> {
    let tuple = ParamType::Tuple(vec![
        ParamType::Address,
        ParamType::Address,
        ParamType::Uint(24),
        ParamType::Address,
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(160),
    ]);
    let fields = decode_args(EXACT_INPUT_SINGLE, &[tuple], calldata)?
        .pop()
        .and_then(Token::into_tuple)
        .ok_or_else(|| ChainError::Decode("expected swap parameter tuple".to_string()))?;

    match fields.as_slice() {
        [Token::Address(token_in), Token::Address(token_out), Token::Uint(fee), Token::Address(recipient), Token::Uint(amount_in), Token::Uint(amount_out_minimum), Token::Uint(sqrt_price_limit_x96)] => {
            Ok(SwapParameters {
                token_in: *token_in,
                token_out: *token_out,
                fee: fee.low_u32(),
                recipient: *recipient,
                amount_in: *amount_in,
                amount_out_minimum: *amount_out_minimum,
                sqrt_price_limit_x96: *sqrt_price_limit_x96,
            })
        }
        _ => Err(ChainError::Decode("unexpected swap parameter layout".to_string())),
    }
}
