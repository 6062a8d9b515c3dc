//! Binary fixed point prices
//!
//! `Uq112x112` carries 112 integer and 112 fractional bits and is the unit of
//! pair price accumulators. `Uq144x112` is the widened result of multiplying a
//! price by an amount; `decode144` truncates it back to an integer.

use ethers_core::types::U256;
use serde::{Deserialize, Serialize};

use crate::error::{AmmError, Result};

pub const RESOLUTION: usize = 112;

/// `2^112`
pub fn q112() -> U256 {
    U256::one() << RESOLUTION
}

/// Largest value a 112-bit reserve slot can hold
pub fn max_u112() -> U256 {
    q112() - 1
}

fn mask_224() -> U256 {
    (U256::one() << 224) - 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize, Deserialize)]
pub struct Uq112x112(U256);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize, Deserialize)]
pub struct Uq144x112(U256);

impl Uq112x112 {
    /// Wrap a raw encoded value, keeping only the low 224 bits
    pub fn from_raw(raw: U256) -> Self {
        Self(raw & mask_224())
    }

    pub fn raw(self) -> U256 {
        self.0
    }

    /// Encode an integer of at most 112 bits
    pub fn encode(y: U256) -> Result<Self> {
        if y > max_u112() {
            return Err(AmmError::ReserveOverflow);
        }
        Ok(Self(y << RESOLUTION))
    }

    /// Divide by an integer, truncating
    pub fn uqdiv(self, x: U256) -> Result<Self> {
        if x.is_zero() {
            return Err(AmmError::DivByZero);
        }
        Ok(Self(self.0 / x))
    }

    /// `numerator / denominator` as a fixed point value
    pub fn fraction(numerator: U256, denominator: U256) -> Result<Self> {
        if denominator.is_zero() {
            return Err(AmmError::DivByZero);
        }
        Self::encode(numerator)?.uqdiv(denominator)
    }

    /// Average price between two accumulator readings.
    ///
    /// The delta is taken modulo 2^256 so accumulator wrap-around is harmless;
    /// the quotient is truncated to 224 bits.
    pub fn from_cumulative_delta(start: U256, end: U256, elapsed: u32) -> Result<Self> {
        if elapsed == 0 {
            return Err(AmmError::DivByZero);
        }
        let (delta, _) = end.overflowing_sub(start);
        Ok(Self::from_raw(delta / U256::from(elapsed)))
    }

    /// Multiply by an integer, reverting when the product leaves 256 bits
    pub fn mul(self, y: U256) -> Result<Uq144x112> {
        self.0
            .checked_mul(y)
            .map(Uq144x112)
            .ok_or(AmmError::MulOverflow)
    }
}

impl Uq144x112 {
    pub fn raw(self) -> U256 {
        self.0
    }

    pub fn decode144(self) -> U256 {
        self.0 >> RESOLUTION
    }
}
