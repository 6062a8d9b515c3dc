//! Accumulator helpers shared by every oracle
//!
//! Reading `price*CumulativeLast` straight from a pair only reflects time up
//! to its last update. These helpers extend the accumulators to the current
//! block without touching the pair, so oracles never need to `sync` it.

use ethers_core::types::{Address, U256};
use tidepool_amm::{AmmError, Chain, Pair, Uq112x112};

use crate::error::Result;

pub(crate) fn pair_state(chain: &Chain, pair: Address) -> Result<&Pair> {
    Ok(chain.pair(pair).ok_or(AmmError::PairNotFound(pair))?)
}

/// `(price0_cumulative, price1_cumulative, block_timestamp)` as of the current block
pub fn current_cumulative_prices(chain: &Chain, pair: Address) -> Result<(U256, U256, u32)> {
    let block_timestamp = chain.block_timestamp();
    let (price0, price1) = pair_state(chain, pair)?.cumulative_prices_at(block_timestamp)?;
    Ok((price0, price1, block_timestamp))
}

/// Amount out for `amount_in` at the average price between two accumulator readings
pub fn compute_amount_out(
    price_cumulative_start: U256,
    price_cumulative_end: U256,
    time_elapsed: u32,
    amount_in: U256,
) -> Result<U256> {
    let average =
        Uq112x112::from_cumulative_delta(price_cumulative_start, price_cumulative_end, time_elapsed)?;
    Ok(average.mul(amount_in)?.decode144())
}
