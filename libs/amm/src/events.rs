//! Chain event log entries

use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Events emitted by tokens, factories and pairs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    Transfer {
        token: Address,
        from: Address,
        to: Address,
        value: U256,
    },
    Approval {
        token: Address,
        owner: Address,
        spender: Address,
        value: U256,
    },
    /// Native currency wrapped
    Deposit {
        token: Address,
        dst: Address,
        wad: U256,
    },
    /// Wrapped currency unwrapped
    Withdrawal {
        token: Address,
        src: Address,
        wad: U256,
    },
    PairCreated {
        factory: Address,
        token0: Address,
        token1: Address,
        pair: Address,
        /// Length of the factory's pair list after creation
        index: u64,
    },
    Mint {
        pair: Address,
        sender: Address,
        amount0: U256,
        amount1: U256,
    },
    Burn {
        pair: Address,
        sender: Address,
        amount0: U256,
        amount1: U256,
        to: Address,
    },
    Swap {
        pair: Address,
        sender: Address,
        amount0_in: U256,
        amount1_in: U256,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
    },
    Sync {
        pair: Address,
        reserve0: U256,
        reserve1: U256,
    },
}

impl Event {
    /// Contract that emitted the event
    pub fn emitter(&self) -> Address {
        match self {
            Event::Transfer { token, .. }
            | Event::Approval { token, .. }
            | Event::Deposit { token, .. }
            | Event::Withdrawal { token, .. } => *token,
            Event::PairCreated { factory, .. } => *factory,
            Event::Mint { pair, .. }
            | Event::Burn { pair, .. }
            | Event::Swap { pair, .. }
            | Event::Sync { pair, .. } => *pair,
        }
    }
}
