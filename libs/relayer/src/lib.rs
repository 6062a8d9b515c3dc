//! # Tidepool Relayer - Oracle-Gated Liquidity Orders
//!
//! ## Purpose
//!
//! Lets a single operator queue liquidity provisions and removals that only
//! execute once a time-weighted price agrees with the execution pool, so a
//! deposit cannot be sandwiched by a price pushed around within one block.
//!
//! ## Integration Points
//!
//! - **Execution**: `tidepool_amm::Router<Strict>` add/remove liquidity calls
//! - **Price gate**: `tidepool_oracle::OracleCreator` samples, one per order
//! - **Configuration**: `tidepool_config::RelayerSettings` (tolerance scale, minimum window)
//!
//! ## Architecture Role
//!
//! ```text
//! owner ──order──► Relayer ──escrow──► relayer account
//!                    │
//!                    ├──update_oracle──► OracleCreator ◄── oracle factory pair
//!                    │
//!                    └──execute_order──► Router ──► execution pair ──► owner
//! ```

pub mod error;
pub mod events;
pub mod order;
pub mod relayer;

pub use error::{RelayerError, Result};
pub use events::RelayerEvent;
pub use order::{
    Asset, Holding, LiquidityProvision, LiquidityRemoval, Order, OrderId, OrderKind, OrderStatus,
    Settlement,
};
pub use relayer::Relayer;
