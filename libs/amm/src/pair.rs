//! Constant-product pair
//!
//! A pair holds reserves of two tokens, mints and burns its own share token,
//! and accumulates time-weighted prices on the first state change of every
//! block. Callers move tokens into the pair first and then invoke `mint` or
//! `swap`; the pair measures what arrived by comparing balances to reserves.

use std::cmp::min;

use ethers_core::types::{Address, U256, U512};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::chain::Chain;
use crate::error::{AmmError, Result};
use crate::events::Event;
use crate::fixed_point::{max_u112, Uq112x112};
use crate::full_math::{add, mul, sqrt, sub};
use crate::pool_traits::{ReserveSource, SwapCallee};
use crate::v2_math::{SwapFee, V2Math};

/// Shares locked forever at the zero address on first mint
pub const MINIMUM_LIQUIDITY: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    address: Address,
    factory: Address,
    token0: Address,
    token1: Address,
    reserve0: U256,
    reserve1: U256,
    block_timestamp_last: u32,
    price0_cumulative_last: U256,
    price1_cumulative_last: U256,
    /// `reserve0 * reserve1` after the last liquidity event, while the protocol fee is on
    k_last: U256,
    swap_fee: SwapFee,
    unlocked: bool,
}

impl Pair {
    pub(crate) fn new(
        address: Address,
        factory: Address,
        token0: Address,
        token1: Address,
        swap_fee: SwapFee,
    ) -> Self {
        Self {
            address,
            factory,
            token0,
            token1,
            reserve0: U256::zero(),
            reserve1: U256::zero(),
            block_timestamp_last: 0,
            price0_cumulative_last: U256::zero(),
            price1_cumulative_last: U256::zero(),
            k_last: U256::zero(),
            swap_fee,
            unlocked: true,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn token0(&self) -> Address {
        self.token0
    }

    pub fn token1(&self) -> Address {
        self.token1
    }

    /// `(reserve0, reserve1, block_timestamp_last)`
    pub fn get_reserves(&self) -> (U256, U256, u32) {
        (self.reserve0, self.reserve1, self.block_timestamp_last)
    }

    pub fn price0_cumulative_last(&self) -> U256 {
        self.price0_cumulative_last
    }

    pub fn price1_cumulative_last(&self) -> U256 {
        self.price1_cumulative_last
    }

    pub fn k_last(&self) -> U256 {
        self.k_last
    }

    pub fn swap_fee(&self) -> SwapFee {
        self.swap_fee
    }

    /// Accumulators as they would read if the pair were updated at
    /// `block_timestamp` with its current reserves
    pub fn cumulative_prices_at(&self, block_timestamp: u32) -> Result<(U256, U256)> {
        let elapsed = block_timestamp.wrapping_sub(self.block_timestamp_last);
        if elapsed == 0 || self.reserve0.is_zero() || self.reserve1.is_zero() {
            return Ok((self.price0_cumulative_last, self.price1_cumulative_last));
        }
        let elapsed = U256::from(elapsed);
        let price0 = Uq112x112::fraction(self.reserve1, self.reserve0)?.raw();
        let price1 = Uq112x112::fraction(self.reserve0, self.reserve1)?.raw();
        let (step0, _) = price0.overflowing_mul(elapsed);
        let (step1, _) = price1.overflowing_mul(elapsed);
        let (cumulative0, _) = self.price0_cumulative_last.overflowing_add(step0);
        let (cumulative1, _) = self.price1_cumulative_last.overflowing_add(step1);
        Ok((cumulative0, cumulative1))
    }

    fn update(&mut self, balance0: U256, balance1: U256, block_timestamp: u32) -> Result<()> {
        if balance0 > max_u112() || balance1 > max_u112() {
            return Err(AmmError::ReserveOverflow);
        }
        let (cumulative0, cumulative1) = self.cumulative_prices_at(block_timestamp)?;
        self.price0_cumulative_last = cumulative0;
        self.price1_cumulative_last = cumulative1;
        self.reserve0 = balance0;
        self.reserve1 = balance1;
        self.block_timestamp_last = block_timestamp;
        Ok(())
    }
}

impl Chain {
    pub fn pair(&self, pair: Address) -> Option<&Pair> {
        self.pairs.get(&pair)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.values()
    }

    pub(crate) fn pair_ref(&self, pair: Address) -> Result<&Pair> {
        self.pairs.get(&pair).ok_or(AmmError::PairNotFound(pair))
    }

    fn pair_mut(&mut self, pair: Address) -> Result<&mut Pair> {
        self.pairs.get_mut(&pair).ok_or(AmmError::PairNotFound(pair))
    }

    /// Mint shares to `to` for whatever was transferred into the pair since the
    /// last update
    pub fn mint(&mut self, sender: Address, pair: Address, to: Address) -> Result<U256> {
        self.atomically(|chain| chain.execute_mint(sender, pair, to))
    }

    /// Burn the shares held by the pair itself and send the underlying to `to`
    pub fn burn(&mut self, sender: Address, pair: Address, to: Address) -> Result<(U256, U256)> {
        self.atomically(|chain| chain.execute_burn(sender, pair, to))
    }

    /// Send the requested outputs to `to`, optionally call back into `callee`,
    /// then require the fee-adjusted invariant to hold
    #[allow(clippy::too_many_arguments)]
    pub fn swap(
        &mut self,
        sender: Address,
        pair: Address,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        callee: Option<&mut dyn SwapCallee>,
        data: &[u8],
    ) -> Result<()> {
        self.atomically(|chain| {
            chain.execute_swap(sender, pair, amount0_out, amount1_out, to, callee, data)
        })
    }

    /// Send balances in excess of reserves to `to`
    pub fn skim(&mut self, pair: Address, to: Address) -> Result<()> {
        self.atomically(|chain| chain.execute_skim(pair, to))
    }

    /// Force reserves to match balances
    pub fn sync(&mut self, pair: Address) -> Result<()> {
        self.atomically(|chain| chain.execute_sync(pair))
    }

    /// Re-entrancy guard: fails with `LOCKED` if the pair is mid-call
    fn with_lock<T>(
        &mut self,
        pair: Address,
        f: impl FnOnce(&mut Chain) -> Result<T>,
    ) -> Result<T> {
        {
            let state = self.pair_mut(pair)?;
            if !state.unlocked {
                return Err(AmmError::Locked);
            }
            state.unlocked = false;
        }
        let result = f(self);
        if let Some(state) = self.pairs.get_mut(&pair) {
            state.unlocked = true;
        }
        result
    }

    fn update_reserves(&mut self, pair: Address, balance0: U256, balance1: U256) -> Result<()> {
        let block_timestamp = self.block_timestamp();
        let state = self.pair_mut(pair)?;
        state.update(balance0, balance1, block_timestamp)?;
        self.events.push(Event::Sync {
            pair,
            reserve0: balance0,
            reserve1: balance1,
        });
        Ok(())
    }

    /// Mint the protocol's cut of fee growth since `k_last`. Returns whether
    /// the protocol fee is switched on.
    fn mint_fee(&mut self, pair: Address, reserve0: U256, reserve1: U256) -> Result<bool> {
        let state = self.pair_ref(pair)?;
        let k_last = state.k_last;
        let factory = self
            .factories
            .get(&state.factory)
            .ok_or(AmmError::FactoryNotFound(state.factory))?;
        let fee_to = factory.fee_to();
        let fee_on = !fee_to.is_zero();

        if fee_on {
            if !k_last.is_zero() {
                let root_k = sqrt(mul(reserve0, reserve1)?);
                let root_k_last = sqrt(k_last);
                if root_k > root_k_last {
                    let total_supply = self.ledger.total_supply(pair);
                    let numerator = mul(total_supply, root_k - root_k_last)?;
                    let denominator = add(
                        mul(root_k, U256::from(factory.protocol_fee_denominator()))?,
                        root_k_last,
                    )?;
                    let liquidity = numerator / denominator;
                    if !liquidity.is_zero() {
                        trace!(?pair, %liquidity, "protocol fee minted");
                        self.ledger.mint(pair, fee_to, liquidity, &mut self.events)?;
                    }
                }
            }
        } else if !k_last.is_zero() {
            self.pair_mut(pair)?.k_last = U256::zero();
        }
        Ok(fee_on)
    }

    fn refresh_k_last(&mut self, pair: Address) -> Result<()> {
        let state = self.pair_mut(pair)?;
        state.k_last = mul(state.reserve0, state.reserve1)?;
        Ok(())
    }

    pub(crate) fn execute_mint(
        &mut self,
        sender: Address,
        pair: Address,
        to: Address,
    ) -> Result<U256> {
        self.with_lock(pair, |chain| {
            let state = chain.pair_ref(pair)?;
            let (token0, token1) = (state.token0, state.token1);
            let (reserve0, reserve1, _) = state.get_reserves();

            let balance0 = chain.ledger.balance_of(token0, pair);
            let balance1 = chain.ledger.balance_of(token1, pair);
            let amount0 = sub(balance0, reserve0)?;
            let amount1 = sub(balance1, reserve1)?;

            let fee_on = chain.mint_fee(pair, reserve0, reserve1)?;
            let total_supply = chain.ledger.total_supply(pair);
            let liquidity = if total_supply.is_zero() {
                let minimum = U256::from(MINIMUM_LIQUIDITY);
                let liquidity = sub(sqrt(mul(amount0, amount1)?), minimum)?;
                chain
                    .ledger
                    .mint(pair, Address::zero(), minimum, &mut chain.events)?;
                liquidity
            } else {
                min(
                    mul(amount0, total_supply)? / reserve0,
                    mul(amount1, total_supply)? / reserve1,
                )
            };
            if liquidity.is_zero() {
                return Err(AmmError::InsufficientLiquidityMinted);
            }

            chain.ledger.mint(pair, to, liquidity, &mut chain.events)?;
            chain.update_reserves(pair, balance0, balance1)?;
            if fee_on {
                chain.refresh_k_last(pair)?;
            }
            chain.events.push(Event::Mint {
                pair,
                sender,
                amount0,
                amount1,
            });
            debug!(?pair, %liquidity, %amount0, %amount1, "liquidity minted");
            Ok(liquidity)
        })
    }

    pub(crate) fn execute_burn(
        &mut self,
        sender: Address,
        pair: Address,
        to: Address,
    ) -> Result<(U256, U256)> {
        self.with_lock(pair, |chain| {
            let state = chain.pair_ref(pair)?;
            let (token0, token1) = (state.token0, state.token1);
            let (reserve0, reserve1, _) = state.get_reserves();

            let balance0 = chain.ledger.balance_of(token0, pair);
            let balance1 = chain.ledger.balance_of(token1, pair);
            let liquidity = chain.ledger.balance_of(pair, pair);

            let fee_on = chain.mint_fee(pair, reserve0, reserve1)?;
            let total_supply = chain.ledger.total_supply(pair);
            if total_supply.is_zero() {
                return Err(AmmError::InsufficientLiquidityBurned);
            }
            let amount0 = mul(liquidity, balance0)? / total_supply;
            let amount1 = mul(liquidity, balance1)? / total_supply;
            if amount0.is_zero() || amount1.is_zero() {
                return Err(AmmError::InsufficientLiquidityBurned);
            }

            chain.ledger.burn(pair, pair, liquidity, &mut chain.events)?;
            chain
                .ledger
                .transfer(token0, pair, to, amount0, &mut chain.events)?;
            chain
                .ledger
                .transfer(token1, pair, to, amount1, &mut chain.events)?;

            let balance0 = chain.ledger.balance_of(token0, pair);
            let balance1 = chain.ledger.balance_of(token1, pair);
            chain.update_reserves(pair, balance0, balance1)?;
            if fee_on {
                chain.refresh_k_last(pair)?;
            }
            chain.events.push(Event::Burn {
                pair,
                sender,
                amount0,
                amount1,
                to,
            });
            debug!(?pair, %liquidity, %amount0, %amount1, "liquidity burned");
            Ok((amount0, amount1))
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn execute_swap(
        &mut self,
        sender: Address,
        pair: Address,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        callee: Option<&mut dyn SwapCallee>,
        data: &[u8],
    ) -> Result<()> {
        if amount0_out.is_zero() && amount1_out.is_zero() {
            return Err(AmmError::SwapInsufficientOutputAmount);
        }
        let (reserve0, reserve1, _) = self.pair_ref(pair)?.get_reserves();
        if amount0_out >= reserve0 || amount1_out >= reserve1 {
            return Err(AmmError::SwapInsufficientLiquidity);
        }

        self.with_lock(pair, |chain| {
            let state = chain.pair_ref(pair)?;
            let (token0, token1, fee) = (state.token0, state.token1, state.swap_fee);
            if to == token0 || to == token1 {
                return Err(AmmError::InvalidTo);
            }

            if !amount0_out.is_zero() {
                chain
                    .ledger
                    .transfer(token0, pair, to, amount0_out, &mut chain.events)?;
            }
            if !amount1_out.is_zero() {
                chain
                    .ledger
                    .transfer(token1, pair, to, amount1_out, &mut chain.events)?;
            }
            if let Some(callee) = callee {
                callee.uniswap_v2_call(chain, sender, amount0_out, amount1_out, data)?;
            }

            let balance0 = chain.ledger.balance_of(token0, pair);
            let balance1 = chain.ledger.balance_of(token1, pair);
            let amount0_in = balance0.saturating_sub(reserve0 - amount0_out);
            let amount1_in = balance1.saturating_sub(reserve1 - amount1_out);
            if amount0_in.is_zero() && amount1_in.is_zero() {
                return Err(AmmError::SwapInsufficientInputAmount);
            }

            let scale = SwapFee::denominator();
            let fee_bps = U256::from(fee.bps());
            let adjusted0 = sub(mul(balance0, scale)?, mul(amount0_in, fee_bps)?)?;
            let adjusted1 = sub(mul(balance1, scale)?, mul(amount1_in, fee_bps)?)?;
            let k_before = reserve0.full_mul(reserve1) * U512::from(scale * scale);
            if adjusted0.full_mul(adjusted1) < k_before {
                return Err(AmmError::K);
            }

            chain.update_reserves(pair, balance0, balance1)?;
            chain.events.push(Event::Swap {
                pair,
                sender,
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
                to,
            });
            trace!(?pair, %amount0_in, %amount1_in, %amount0_out, %amount1_out, "swap");
            Ok(())
        })
    }

    pub(crate) fn execute_skim(&mut self, pair: Address, to: Address) -> Result<()> {
        self.with_lock(pair, |chain| {
            let state = chain.pair_ref(pair)?;
            let (token0, token1) = (state.token0, state.token1);
            let (reserve0, reserve1, _) = state.get_reserves();
            let excess0 = sub(chain.ledger.balance_of(token0, pair), reserve0)?;
            let excess1 = sub(chain.ledger.balance_of(token1, pair), reserve1)?;
            chain
                .ledger
                .transfer(token0, pair, to, excess0, &mut chain.events)?;
            chain
                .ledger
                .transfer(token1, pair, to, excess1, &mut chain.events)?;
            Ok(())
        })
    }

    pub(crate) fn execute_sync(&mut self, pair: Address) -> Result<()> {
        self.with_lock(pair, |chain| {
            let state = chain.pair_ref(pair)?;
            let balance0 = chain.ledger.balance_of(state.token0, pair);
            let balance1 = chain.ledger.balance_of(state.token1, pair);
            chain.update_reserves(pair, balance0, balance1)
        })
    }
}

impl ReserveSource for Chain {
    fn reserves(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<(U256, U256, SwapFee)> {
        let (token0, _) = V2Math::sort_tokens(token_a, token_b)?;
        let factory = self
            .factories
            .get(&factory)
            .ok_or(AmmError::FactoryNotFound(factory))?;
        let pair = self.pair_ref(factory.pair_for(token_a, token_b)?)?;
        let (reserve0, reserve1, _) = pair.get_reserves();
        if token_a == token0 {
            Ok((reserve0, reserve1, pair.swap_fee))
        } else {
            Ok((reserve1, reserve0, pair.swap_fee))
        }
    }
}
