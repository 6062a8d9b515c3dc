//! Checked 256-bit helpers
//!
//! Thin wrappers that turn `U256` overflow into revert reasons, plus
//! 512-bit intermediate `mul_div` and the integer square root used for
//! liquidity shares.

use ethers_core::types::{U256, U512};

use crate::error::{AmmError, Result};

pub fn add(a: U256, b: U256) -> Result<U256> {
    a.checked_add(b).ok_or(AmmError::AddOverflow)
}

pub fn sub(a: U256, b: U256) -> Result<U256> {
    a.checked_sub(b).ok_or(AmmError::SubUnderflow)
}

pub fn mul(a: U256, b: U256) -> Result<U256> {
    a.checked_mul(b).ok_or(AmmError::MathMulOverflow)
}

/// `floor(a * b / denominator)` without intermediate overflow
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256> {
    if denominator.is_zero() {
        return Err(AmmError::FullDivOverflow);
    }
    let product: U512 = a.full_mul(b);
    let quotient = product / U512::from(denominator);
    U256::try_from(quotient).map_err(|_| AmmError::FullDivOverflow)
}

/// Floor square root
pub fn sqrt(y: U256) -> U256 {
    y.integer_sqrt()
}
