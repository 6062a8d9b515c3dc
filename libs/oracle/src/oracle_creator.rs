//! Registry of two-observation price samples
//!
//! Each sample watches one pair for one consumer (its owner). The first
//! `update` may happen at any time; the second must come at least
//! `window_time` seconds later and finalizes the sample with the average
//! price between the two.

use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};
use tidepool_amm::{Chain, Uq112x112};
use tracing::{debug, info};

use crate::error::{OracleError, Result};
use crate::library::{current_cumulative_prices, pair_state};

/// Observations after which a sample is final
pub const OBSERVATIONS_TO_FINALIZE: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSample {
    pub window_time: u32,
    pub pair: Address,
    pub token0: Address,
    pub token1: Address,
    pub owner: Address,
    pub block_timestamp_last: u32,
    pub price0_cumulative_last: U256,
    pub price1_cumulative_last: U256,
    pub price0_average: Uq112x112,
    pub price1_average: Uq112x112,
    pub observations_count: u8,
}

impl OracleSample {
    pub fn is_finalized(&self) -> bool {
        self.observations_count >= OBSERVATIONS_TO_FINALIZE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleCreator {
    oracles: Vec<OracleSample>,
}

impl OracleCreator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn oracles_count(&self) -> usize {
        self.oracles.len()
    }

    pub fn oracle(&self, oracle_id: usize) -> Option<&OracleSample> {
        self.oracles.get(oracle_id)
    }

    /// Start a sample on `pair` seeded from its stored accumulators; `owner`
    /// is the only account allowed to update it
    pub fn create_oracle(
        &mut self,
        chain: &Chain,
        owner: Address,
        window_time: u32,
        pair: Address,
    ) -> Result<usize> {
        let source = pair_state(chain, pair)?;
        let (_, _, block_timestamp_last) = source.get_reserves();
        let oracle_id = self.oracles.len();
        self.oracles.push(OracleSample {
            window_time,
            pair,
            token0: source.token0(),
            token1: source.token1(),
            owner,
            block_timestamp_last,
            price0_cumulative_last: source.price0_cumulative_last(),
            price1_cumulative_last: source.price1_cumulative_last(),
            price0_average: Uq112x112::default(),
            price1_average: Uq112x112::default(),
            observations_count: 0,
        });
        info!(oracle_id, ?pair, window_time, "oracle created");
        Ok(oracle_id)
    }

    /// Record one observation for `oracle_id`
    pub fn update(&mut self, chain: &Chain, caller: Address, oracle_id: usize) -> Result<()> {
        let oracle = self
            .oracles
            .get_mut(oracle_id)
            .ok_or(OracleError::CallerNotOwner)?;
        if caller != oracle.owner {
            return Err(OracleError::CallerNotOwner);
        }
        if oracle.is_finalized() {
            return Err(OracleError::FinishedObservation);
        }
        let (price0_cumulative, price1_cumulative, block_timestamp) =
            current_cumulative_prices(chain, oracle.pair)?;
        let time_elapsed = block_timestamp.wrapping_sub(oracle.block_timestamp_last);
        if oracle.observations_count > 0 && (time_elapsed == 0 || time_elapsed < oracle.window_time)
        {
            return Err(OracleError::SamplePeriodNotElapsed);
        }

        // a first observation in the pair's own update block has no interval to average
        if time_elapsed > 0 {
            oracle.price0_average = Uq112x112::from_cumulative_delta(
                oracle.price0_cumulative_last,
                price0_cumulative,
                time_elapsed,
            )?;
            oracle.price1_average = Uq112x112::from_cumulative_delta(
                oracle.price1_cumulative_last,
                price1_cumulative,
                time_elapsed,
            )?;
        }
        oracle.price0_cumulative_last = price0_cumulative;
        oracle.price1_cumulative_last = price1_cumulative;
        oracle.block_timestamp_last = block_timestamp;
        oracle.observations_count += 1;
        debug!(
            oracle_id,
            observations = oracle.observations_count,
            time_elapsed,
            "oracle observation"
        );
        Ok(())
    }

    /// `amount_in` of `token` valued at the sample's latest average.
    /// Zero until the first observation.
    pub fn consult(&self, oracle_id: usize, token: Address, amount_in: U256) -> Result<U256> {
        let oracle = self
            .oracles
            .get(oracle_id)
            .ok_or(OracleError::SampleInvalidToken)?;
        let average = if token == oracle.token0 {
            oracle.price0_average
        } else if token == oracle.token1 {
            oracle.price1_average
        } else {
            return Err(OracleError::SampleInvalidToken);
        };
        Ok(average.mul(amount_in)?.decode144())
    }

    pub fn is_oracle_finalized(&self, oracle_id: usize) -> bool {
        self.oracles
            .get(oracle_id)
            .is_some_and(OracleSample::is_finalized)
    }
}
