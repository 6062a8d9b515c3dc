//! Constant-product quoting math
//!
//! Exact integer arithmetic over `U256`, rounding the same way the on-chain
//! library does: outputs round down, required inputs round up by one unit.

use ethers_core::types::{Address, H256, U256};
use ethers_core::utils::{get_create2_address_from_hash, keccak256};
use serde::{Deserialize, Serialize};
use tidepool_config::defaults::fees::{BPS_DENOMINATOR, SWAP_FEE_BPS};

use crate::error::{AmmError, Result};
use crate::full_math::{add, mul, sub};
use crate::pool_traits::ReserveSource;

/// Swap fee charged on the input side, in basis points (30 = 0.3%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SwapFee(u32);

impl SwapFee {
    pub fn from_bps(bps: u32) -> Result<Self> {
        if bps >= BPS_DENOMINATOR {
            return Err(AmmError::InvalidSwapFee(bps));
        }
        Ok(Self(bps))
    }

    pub fn bps(self) -> u32 {
        self.0
    }

    /// `10000 - bps`, the share of input that reaches the curve
    pub fn multiplier(self) -> U256 {
        U256::from(BPS_DENOMINATOR - self.0)
    }

    pub fn denominator() -> U256 {
        U256::from(BPS_DENOMINATOR)
    }
}

impl Default for SwapFee {
    fn default() -> Self {
        Self(SWAP_FEE_BPS)
    }
}

/// V2 library functions
pub struct V2Math;

impl V2Math {
    /// Order two distinct, non-zero token addresses ascending
    pub fn sort_tokens(token_a: Address, token_b: Address) -> Result<(Address, Address)> {
        if token_a == token_b {
            return Err(AmmError::IdenticalAddresses);
        }
        let (token0, token1) = if token_a < token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        if token0.is_zero() {
            return Err(AmmError::ZeroAddress);
        }
        Ok((token0, token1))
    }

    /// Deterministic pair address for a token pair under `factory`.
    ///
    /// `keccak256(0xff ++ factory ++ keccak256(token0 ++ token1) ++ init_code_hash)[12..]`
    pub fn pair_for(
        factory: Address,
        init_code_hash: H256,
        token_a: Address,
        token_b: Address,
    ) -> Result<Address> {
        let (token0, token1) = Self::sort_tokens(token_a, token_b)?;
        let mut packed = [0u8; 40];
        packed[..20].copy_from_slice(token0.as_bytes());
        packed[20..].copy_from_slice(token1.as_bytes());
        let salt = keccak256(packed);
        Ok(get_create2_address_from_hash(factory, salt, init_code_hash))
    }

    /// Amount of B equivalent to `amount_a` at the reserve ratio, no fee
    pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> Result<U256> {
        if amount_a.is_zero() {
            return Err(AmmError::InsufficientAmount);
        }
        if reserve_a.is_zero() || reserve_b.is_zero() {
            return Err(AmmError::InsufficientLiquidity);
        }
        Ok(mul(amount_a, reserve_b)? / reserve_a)
    }

    /// Maximum output for an exact input after the swap fee
    ///
    /// # Arguments
    /// * `amount_in` - Input token amount
    /// * `reserve_in` - Input side reserve
    /// * `reserve_out` - Output side reserve
    /// * `fee` - Pair swap fee
    pub fn get_amount_out(
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
        fee: SwapFee,
    ) -> Result<U256> {
        if amount_in.is_zero() {
            return Err(AmmError::InsufficientInputAmount);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(AmmError::InsufficientLiquidity);
        }
        let amount_in_with_fee = mul(amount_in, fee.multiplier())?;
        let numerator = mul(amount_in_with_fee, reserve_out)?;
        let denominator = add(mul(reserve_in, SwapFee::denominator())?, amount_in_with_fee)?;
        Ok(numerator / denominator)
    }

    /// Minimum input required for an exact output, rounded up
    pub fn get_amount_in(
        amount_out: U256,
        reserve_in: U256,
        reserve_out: U256,
        fee: SwapFee,
    ) -> Result<U256> {
        if amount_out.is_zero() {
            return Err(AmmError::InsufficientOutputAmount);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(AmmError::InsufficientLiquidity);
        }
        let numerator = mul(mul(reserve_in, amount_out)?, SwapFee::denominator())?;
        let denominator = mul(sub(reserve_out, amount_out)?, fee.multiplier())?;
        add(numerator / denominator, U256::one())
    }

    /// Chained outputs along `path`, starting with `amount_in`
    pub fn get_amounts_out<S: ReserveSource + ?Sized>(
        source: &S,
        factory: Address,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>> {
        if path.len() < 2 {
            return Err(AmmError::InvalidPath);
        }
        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(amount_in);
        for hop in path.windows(2) {
            let (reserve_in, reserve_out, fee) = source.reserves(factory, hop[0], hop[1])?;
            let last = amounts[amounts.len() - 1];
            amounts.push(Self::get_amount_out(last, reserve_in, reserve_out, fee)?);
        }
        Ok(amounts)
    }

    /// Chained required inputs along `path`, ending with `amount_out`
    pub fn get_amounts_in<S: ReserveSource + ?Sized>(
        source: &S,
        factory: Address,
        amount_out: U256,
        path: &[Address],
    ) -> Result<Vec<U256>> {
        if path.len() < 2 {
            return Err(AmmError::InvalidPath);
        }
        let mut amounts = vec![U256::zero(); path.len()];
        amounts[path.len() - 1] = amount_out;
        for i in (1..path.len()).rev() {
            let (reserve_in, reserve_out, fee) = source.reserves(factory, path[i - 1], path[i])?;
            amounts[i - 1] = Self::get_amount_in(amounts[i], reserve_in, reserve_out, fee)?;
        }
        Ok(amounts)
    }
}
