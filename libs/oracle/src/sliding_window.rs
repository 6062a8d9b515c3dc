//! Sliding-window TWAP oracle
//!
//! Keeps `granularity` observations per pair in a ring indexed by
//! `(timestamp / period_size) % granularity`. A consult measures the average
//! price from the observation one full window back to now, so the window
//! moves forward with every period instead of resetting.
//!
//! A slot that has never been written holds `None`.
//!
//! ```text
//!  window_size = period_size * granularity
//!  |---- p0 ----|---- p1 ----| ... |---- p(g-1) ----|
//!        ^ oldest observation            ^ current slot
//! ```

use std::collections::HashMap;

use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};
use tidepool_amm::{AmmError, Chain, V2Math};
use tidepool_config::OracleSettings;
use tracing::{debug, trace};

use crate::error::{OracleError, Result};
use crate::library::{compute_amount_out, current_cumulative_prices};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: u64,
    pub price0_cumulative: U256,
    pub price1_cumulative: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidingWindowOracle {
    factory: Address,
    window_size: u64,
    granularity: u16,
    period_size: u64,
    pair_observations: HashMap<Address, Vec<Option<Observation>>>,
}

impl SlidingWindowOracle {
    pub fn new(factory: Address, window_size: u64, granularity: u16) -> Result<Self> {
        if granularity <= 1 {
            return Err(OracleError::Granularity);
        }
        let period_size = window_size / u64::from(granularity);
        if period_size * u64::from(granularity) != window_size {
            return Err(OracleError::WindowNotEvenlyDivisible);
        }
        Ok(Self {
            factory,
            window_size,
            granularity,
            period_size,
            pair_observations: HashMap::new(),
        })
    }

    pub fn from_settings(factory: Address, settings: &OracleSettings) -> Result<Self> {
        Self::new(factory, settings.window_size, settings.granularity)
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    pub fn granularity(&self) -> u16 {
        self.granularity
    }

    pub fn period_size(&self) -> u64 {
        self.period_size
    }

    /// Ring slot for `timestamp`
    pub fn observation_index_of(&self, timestamp: u64) -> usize {
        let epoch_period = timestamp / self.period_size;
        (epoch_period % u64::from(self.granularity)) as usize
    }

    /// Ring slots for `pair`, indexed by `observation_index_of`
    pub fn observations(&self, pair: Address) -> Option<&[Option<Observation>]> {
        self.pair_observations.get(&pair).map(Vec::as_slice)
    }

    fn pair_for(&self, chain: &Chain, token_a: Address, token_b: Address) -> Result<Address> {
        let registry = chain
            .factory(self.factory)
            .ok_or(AmmError::FactoryNotFound(self.factory))?;
        Ok(registry.pair_for(token_a, token_b)?)
    }

    /// Observation one window before `timestamp`, i.e. the slot after the current one
    fn first_observation_in_window(&self, pair: Address, timestamp: u64) -> Option<Observation> {
        let index = self.observation_index_of(timestamp);
        let first_index = (index + 1) % usize::from(self.granularity);
        self.pair_observations
            .get(&pair)
            .and_then(|observations| observations.get(first_index).copied().flatten())
    }

    /// Record the current accumulators in this period's slot. A slot that
    /// already holds an observation from this period is left alone.
    pub fn update(&mut self, chain: &Chain, token_a: Address, token_b: Address) -> Result<()> {
        let pair = self.pair_for(chain, token_a, token_b)?;
        let (price0_cumulative, price1_cumulative, _) = current_cumulative_prices(chain, pair)?;

        let now = chain.now();
        let index = self.observation_index_of(now);
        let granularity = usize::from(self.granularity);
        let period_size = self.period_size;
        let observations = self.pair_observations.entry(pair).or_insert_with(|| {
            debug!(?pair, granularity, "allocating observation slots");
            vec![None; granularity]
        });

        let slot = &mut observations[index];
        let stale = slot.map_or(true, |observation| {
            now.saturating_sub(observation.timestamp) > period_size
        });
        if stale {
            *slot = Some(Observation {
                timestamp: now,
                price0_cumulative,
                price1_cumulative,
            });
            trace!(?pair, index, now, "observation recorded");
        }
        Ok(())
    }

    /// `amount_in` of `token_in` valued in `token_out` at the average price
    /// over the last window
    pub fn consult(
        &self,
        chain: &Chain,
        token_in: Address,
        amount_in: U256,
        token_out: Address,
    ) -> Result<U256> {
        let pair = self.pair_for(chain, token_in, token_out)?;
        let now = chain.now();
        let first = self
            .first_observation_in_window(pair, now)
            .ok_or(OracleError::MissingHistoricalObservation)?;

        let time_elapsed = now.saturating_sub(first.timestamp);
        if time_elapsed > self.window_size {
            return Err(OracleError::MissingHistoricalObservation);
        }
        // at most one period short of a window, since the current slot may be one period stale
        if time_elapsed < self.window_size.saturating_sub(self.period_size * 2) {
            return Err(OracleError::UnexpectedTimeElapsed);
        }
        let time_elapsed =
            u32::try_from(time_elapsed).map_err(|_| OracleError::MissingHistoricalObservation)?;

        let (price0_cumulative, price1_cumulative, _) = current_cumulative_prices(chain, pair)?;
        let (token0, _) = V2Math::sort_tokens(token_in, token_out)?;
        if token_in == token0 {
            compute_amount_out(first.price0_cumulative, price0_cumulative, time_elapsed, amount_in)
        } else {
            compute_amount_out(first.price1_cumulative, price1_cumulative, time_elapsed, amount_in)
        }
    }
}
