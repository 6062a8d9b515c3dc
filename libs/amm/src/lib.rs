//! # Tidepool AMM - Constant-Product Exchange Simulator
//!
//! ## Purpose
//!
//! Deterministic, in-process model of a constant-product exchange: pairs that
//! hold two reserves and mint pool shares, factories that deploy pairs at
//! predictable addresses, and a router that prices, deposits and chains swaps.
//! Arithmetic is exact 256-bit integer math with on-chain rounding, so
//! amounts match a deployed exchange to the last unit.
//!
//! ## Integration Points
//!
//! - **Host**: [`Chain`] owns tokens, factories, pairs, the clock and the event log
//! - **Quoting**: [`V2Math`] works against any [`ReserveSource`]
//! - **Oracles**: pair price accumulators ([`Pair::cumulative_prices_at`]) feed TWAP oracles
//! - **Flash swaps**: [`SwapCallee`] receives control between optimistic transfer and invariant check
//! - **Configuration**: factories are built from `tidepool_config::FactorySettings`
//!
//! ## Architecture Role
//!
//! ```text
//! Router<Policy> ──► Chain ──► Factory ──► Pair ──► TokenLedger
//!                      │                     │
//!                      └──── Event log ◄─────┘
//! ```
//!
//! State changes run through [`Chain::atomically`]: on error the chain is
//! restored to the snapshot taken before the call.

pub mod chain;
pub mod error;
pub mod events;
pub mod factory;
pub mod fixed_point;
pub mod full_math;
pub mod ledger;
pub mod liquidity_math;
pub mod pair;
pub mod permit;
pub mod pool_traits;
pub mod router;
pub mod v2_math;

pub use chain::Chain;
pub use error::{AmmError, Result};
pub use events::Event;
pub use factory::Factory;
pub use fixed_point::{Uq112x112, Uq144x112};
pub use ledger::{TokenInfo, TokenKind, TokenLedger};
pub use pair::{Pair, MINIMUM_LIQUIDITY};
pub use permit::{Permit, PermitMessage};
pub use pool_traits::{ReserveSource, SwapCallee};
pub use router::{
    AddLiquidity, AddLiquidityEth, PermitSignature, RemoveLiquidity, RemoveLiquidityEth, Router,
    Strict, SupportingFeeOnTransfer, SwapAndAddLiquidity, SwapToPrice, TransferPolicy,
};
pub use v2_math::{SwapFee, V2Math};

/// Common numeric and address types
pub use ethers_core::types::{Address, H256, U256};
