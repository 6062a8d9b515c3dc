//! Fixed-window TWAP oracle
//!
//! Tracks one pair. Each successful `update` replaces the stored averages
//! with the mean price since the previous update, which must be at least one
//! period ago. `consult` applies the stored average and never touches chain
//! state.

use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};
use tidepool_amm::{AmmError, Chain, Uq112x112};
use tidepool_config::OracleSettings;
use tracing::debug;

use crate::error::{OracleError, Result};
use crate::library::{current_cumulative_prices, pair_state};

/// What `update` does when called before a full period has passed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodPolicy {
    /// Fail with `PERIOD_NOT_ELAPSED`
    #[default]
    Revert,
    /// Leave the averages unchanged and report that nothing happened
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Snapshot {
    price0_cumulative: U256,
    price1_cumulative: U256,
    block_timestamp: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedWindowOracle {
    pair: Address,
    token0: Address,
    token1: Address,
    period: u32,
    policy: PeriodPolicy,
    last: Option<Snapshot>,
    averages: Option<(Uq112x112, Uq112x112)>,
}

impl FixedWindowOracle {
    /// Oracle over the `token_a`/`token_b` pair of `factory`. The pair must exist.
    pub fn new(
        chain: &Chain,
        factory: Address,
        token_a: Address,
        token_b: Address,
        period: u32,
        policy: PeriodPolicy,
    ) -> Result<Self> {
        let registry = chain
            .factory(factory)
            .ok_or(AmmError::FactoryNotFound(factory))?;
        let pair = pair_state(chain, registry.pair_for(token_a, token_b)?)?;
        Ok(Self {
            pair: pair.address(),
            token0: pair.token0(),
            token1: pair.token1(),
            period,
            policy,
            last: None,
            averages: None,
        })
    }

    pub fn from_settings(
        chain: &Chain,
        factory: Address,
        token_a: Address,
        token_b: Address,
        settings: &OracleSettings,
        policy: PeriodPolicy,
    ) -> Result<Self> {
        let period = u32::try_from(settings.period).map_err(|_| OracleError::PeriodOutOfRange)?;
        Self::new(chain, factory, token_a, token_b, period, policy)
    }

    pub fn pair(&self) -> Address {
        self.pair
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn block_timestamp_last(&self) -> Option<u32> {
        self.last.map(|snapshot| snapshot.block_timestamp)
    }

    pub fn price0_average(&self) -> Option<Uq112x112> {
        self.averages.map(|(price0, _)| price0)
    }

    pub fn price1_average(&self) -> Option<Uq112x112> {
        self.averages.map(|(_, price1)| price1)
    }

    /// Record the pair's stored accumulators as the first observation
    pub fn initialize(&mut self, chain: &Chain) -> Result<()> {
        if self.last.is_some() {
            return Err(OracleError::AlreadyInitialized);
        }
        let pair = pair_state(chain, self.pair)?;
        let (reserve0, reserve1, block_timestamp) = pair.get_reserves();
        if reserve0.is_zero() || reserve1.is_zero() {
            return Err(OracleError::NoReserves);
        }
        self.last = Some(Snapshot {
            price0_cumulative: pair.price0_cumulative_last(),
            price1_cumulative: pair.price1_cumulative_last(),
            block_timestamp,
        });
        debug!(pair = ?self.pair, block_timestamp, "oracle initialized");
        Ok(())
    }

    /// Recompute the averages. Returns `false` when the period has not
    /// elapsed and the policy is [`PeriodPolicy::Skip`].
    pub fn update(&mut self, chain: &Chain) -> Result<bool> {
        let last = self.last.ok_or(OracleError::NotInitialized)?;
        let (price0_cumulative, price1_cumulative, block_timestamp) =
            current_cumulative_prices(chain, self.pair)?;
        let time_elapsed = block_timestamp.wrapping_sub(last.block_timestamp);

        if time_elapsed == 0 || time_elapsed < self.period {
            return match self.policy {
                PeriodPolicy::Revert => Err(OracleError::PeriodNotElapsed),
                PeriodPolicy::Skip => {
                    debug!(pair = ?self.pair, time_elapsed, "period not elapsed, skipping");
                    Ok(false)
                }
            };
        }

        let price0 = Uq112x112::from_cumulative_delta(
            last.price0_cumulative,
            price0_cumulative,
            time_elapsed,
        )?;
        let price1 = Uq112x112::from_cumulative_delta(
            last.price1_cumulative,
            price1_cumulative,
            time_elapsed,
        )?;
        self.averages = Some((price0, price1));
        self.last = Some(Snapshot {
            price0_cumulative,
            price1_cumulative,
            block_timestamp,
        });
        debug!(pair = ?self.pair, time_elapsed, "oracle averages updated");
        Ok(true)
    }

    /// Value of `amount_in` of `token` in the other token at the stored average
    pub fn consult(&self, token: Address, amount_in: U256) -> Result<U256> {
        let (price0, price1) = self.averages.ok_or(OracleError::NoAverage)?;
        let average = if token == self.token0 {
            price0
        } else if token == self.token1 {
            price1
        } else {
            return Err(OracleError::InvalidToken);
        };
        Ok(average.mul(amount_in)?.decode144())
    }
}
