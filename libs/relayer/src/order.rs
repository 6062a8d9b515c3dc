//! Order records
//!
//! Orders are append-only and addressed by their index. After placement the
//! only thing that changes is the settlement; everything else about an order
//! (its parameters, its oracle sample and what it escrowed) is fixed.

use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};

pub type OrderId = usize;

/// Deposit `amount_a`/`amount_b` once the oracle price agrees with the pool.
/// `token_a == Address::zero()` deposits native currency against `token_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityProvision {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a: U256,
    pub amount_b: U256,
    /// Accepted deviation in parts per million
    pub price_tolerance: u64,
    pub min_reserve_a: U256,
    pub min_reserve_b: U256,
    /// Sampling window in seconds
    pub max_window_time: u64,
    pub deadline: u64,
    /// Factory whose pair feeds the oracle
    pub factory: Address,
}

/// Burn `liquidity` once the oracle price agrees with the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityRemoval {
    pub token_a: Address,
    pub token_b: Address,
    pub liquidity: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub price_tolerance: u64,
    pub min_reserve_a: U256,
    pub min_reserve_b: U256,
    pub max_window_time: u64,
    pub deadline: u64,
    pub factory: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Provision(LiquidityProvision),
    Removal(LiquidityRemoval),
}

macro_rules! common_field {
    ($name:ident: $ty:ty) => {
        pub fn $name(&self) -> $ty {
            match self {
                Self::Provision(order) => order.$name,
                Self::Removal(order) => order.$name,
            }
        }
    };
}

impl OrderKind {
    common_field!(token_a: Address);
    common_field!(token_b: Address);
    common_field!(price_tolerance: u64);
    common_field!(min_reserve_a: U256);
    common_field!(min_reserve_b: U256);
    common_field!(max_window_time: u64);
    common_field!(deadline: u64);
    common_field!(factory: Address);

    /// Action code carried by `NewOrder`: 1 provides, 2 removes
    pub fn action(&self) -> u8 {
        match self {
            Self::Provision(_) => 1,
            Self::Removal(_) => 2,
        }
    }

    pub fn is_native(&self) -> bool {
        self.token_a().is_zero()
    }
}

/// Something the relayer holds on an order's behalf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Asset {
    Native,
    Token(Address),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub asset: Asset,
    pub amount: U256,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    #[default]
    Open,
    Executed,
    Withdrawn,
}

/// Lifecycle stage as seen at a given time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Placed, no oracle sample attached yet
    Created,
    /// Oracle sample collecting observations
    Sampling,
    /// Sample finalized; the order may execute
    Ready,
    Executed,
    /// Deadline passed without execution; escrow may be withdrawn
    Expired,
    Withdrawn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub kind: OrderKind,
    /// Sample in the relayer's oracle registry
    pub oracle_id: Option<usize>,
    /// Funds moved in from the owner at placement
    pub escrow: Vec<Holding>,
    pub settlement: Settlement,
}

impl Order {
    /// Stage at `now`. Expiry is derived from the clock, never stored.
    pub fn status(&self, now: u64, sample_finalized: bool) -> OrderStatus {
        match self.settlement {
            Settlement::Executed => OrderStatus::Executed,
            Settlement::Withdrawn => OrderStatus::Withdrawn,
            Settlement::Open if now > self.kind.deadline() => OrderStatus::Expired,
            Settlement::Open => match self.oracle_id {
                None => OrderStatus::Created,
                Some(_) if sample_finalized => OrderStatus::Ready,
                Some(_) => OrderStatus::Sampling,
            },
        }
    }
}
