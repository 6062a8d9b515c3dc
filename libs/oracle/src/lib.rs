//! # Tidepool Oracles - Time-Weighted Average Prices
//!
//! ## Purpose
//!
//! Price oracles built on pair accumulators. A pair adds `price * seconds`
//! to its accumulators on every update; two readings of an accumulator
//! divided by the seconds between them give the average price over that
//! interval, which a single-block trade cannot move far.
//!
//! ## Integration Points
//!
//! - **Input**: `tidepool_amm::Chain` pairs, read through [`current_cumulative_prices`]
//! - **Configuration**: `tidepool_config::OracleSettings` (period, window, granularity)
//! - **Consumers**: the relayer gates order execution on [`OracleCreator`] samples
//!
//! ## Architecture Role
//!
//! ```text
//! Pair accumulators ──► library ──┬──► FixedWindowOracle    (one pair, fixed period)
//!                                 ├──► SlidingWindowOracle  (ring of observations)
//!                                 └──► OracleCreator        (per-order samples)
//! ```
//!
//! Oracles hold their own state and only ever read the chain.

pub mod error;
pub mod fixed_window;
pub mod library;
pub mod oracle_creator;
pub mod sliding_window;

pub use error::{OracleError, Result};
pub use fixed_window::{FixedWindowOracle, PeriodPolicy};
pub use library::{compute_amount_out, current_cumulative_prices};
pub use oracle_creator::{OracleCreator, OracleSample, OBSERVATIONS_TO_FINALIZE};
pub use sliding_window::{Observation, SlidingWindowOracle};
