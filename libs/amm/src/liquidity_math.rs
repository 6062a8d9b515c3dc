//! Arbitrage sizing and liquidity share valuation
//!
//! Pool share values read straight from reserves can be skewed by anyone
//! willing to move the price inside a block. These helpers value a share as
//! if the pool had first been arbitraged to an externally supplied price.

use ethers_core::types::{Address, U256};

use crate::chain::Chain;
use crate::error::{AmmError, Result};
use crate::full_math::{add, mul, mul_div, sqrt, sub};
use crate::pool_traits::ReserveSource;
use crate::v2_math::{SwapFee, V2Math};

/// Direction and size of the input that moves the pool to `true_price_a : true_price_b`.
///
/// Returns `(a_to_b, amount_in)`. `amount_in` is zero when the pool is already
/// within the fee band of the target price.
pub fn compute_profit_maximizing_trade(
    true_price_token_a: U256,
    true_price_token_b: U256,
    reserve_a: U256,
    reserve_b: U256,
    fee: SwapFee,
) -> Result<(bool, U256)> {
    let a_to_b = mul_div(reserve_a, true_price_token_b, reserve_b)? < true_price_token_a;
    let invariant = mul(reserve_a, reserve_b)?;
    let scale = SwapFee::denominator();

    let (price_in, price_out, reserve_in) = if a_to_b {
        (true_price_token_a, true_price_token_b, reserve_a)
    } else {
        (true_price_token_b, true_price_token_a, reserve_b)
    };
    let left_side = sqrt(mul_div(
        mul(invariant, scale)?,
        price_in,
        mul(price_out, fee.multiplier())?,
    )?);
    let right_side = mul(reserve_in, scale)? / fee.multiplier();

    if left_side < right_side {
        return Ok((false, U256::zero()));
    }
    Ok((a_to_b, left_side - right_side))
}

/// Share of `amount_in` to swap before depositing the rest, so that the
/// remainder and the swap output match the pool ratio after the swap.
///
/// Solves `s = (sqrt(R * (R * (d + m)^2 + 4 * d * m * A)) - R * (d + m)) / 2m`
/// with `d` the fee denominator and `m` the fee multiplier.
pub fn compute_swap_in_for_deposit(
    reserve_in: U256,
    amount_in: U256,
    fee: SwapFee,
) -> Result<U256> {
    if amount_in.is_zero() {
        return Err(AmmError::InsufficientInputAmount);
    }
    if reserve_in.is_zero() {
        return Err(AmmError::InsufficientLiquidity);
    }
    let scale = SwapFee::denominator();
    let keep = fee.multiplier();
    let both = add(scale, keep)?;
    let growth = mul(mul(U256::from(4), mul(scale, keep)?)?, amount_in)?;
    let root = sqrt(mul(
        reserve_in,
        add(mul(reserve_in, mul(both, both)?)?, growth)?,
    )?);
    Ok(sub(root, mul(reserve_in, both)?)? / mul(U256::from(2), keep)?)
}

/// Reserves of the pair after a profit-maximising arbitrage to the given price
pub fn get_reserves_after_arbitrage<S: ReserveSource + ?Sized>(
    source: &S,
    factory: Address,
    token_a: Address,
    token_b: Address,
    true_price_token_a: U256,
    true_price_token_b: U256,
) -> Result<(U256, U256)> {
    let (reserve_a, reserve_b, fee) = source.reserves(factory, token_a, token_b)?;
    if reserve_a.is_zero() || reserve_b.is_zero() {
        return Err(AmmError::ZeroPairReserves);
    }

    let (a_to_b, amount_in) = compute_profit_maximizing_trade(
        true_price_token_a,
        true_price_token_b,
        reserve_a,
        reserve_b,
        fee,
    )?;
    if amount_in.is_zero() {
        return Ok((reserve_a, reserve_b));
    }

    if a_to_b {
        let amount_out = V2Math::get_amount_out(amount_in, reserve_a, reserve_b, fee)?;
        Ok((add(reserve_a, amount_in)?, sub(reserve_b, amount_out)?))
    } else {
        let amount_out = V2Math::get_amount_out(amount_in, reserve_b, reserve_a, fee)?;
        Ok((sub(reserve_a, amount_out)?, add(reserve_b, amount_in)?))
    }
}

/// Underlying amounts redeemable by `liquidity` shares, counting the protocol
/// fee shares a burn would mint first
pub fn compute_liquidity_value(
    reserves_a: U256,
    reserves_b: U256,
    total_supply: U256,
    liquidity: U256,
    fee_on: bool,
    k_last: U256,
    protocol_fee_denominator: u32,
) -> Result<(U256, U256)> {
    if total_supply.is_zero() || liquidity > total_supply {
        return Err(AmmError::LiquidityAmount);
    }
    let mut total_supply = total_supply;
    if fee_on && !k_last.is_zero() {
        let root_k = sqrt(mul(reserves_a, reserves_b)?);
        let root_k_last = sqrt(k_last);
        if root_k > root_k_last {
            let numerator = mul(total_supply, root_k - root_k_last)?;
            let denominator = add(
                mul(root_k, U256::from(protocol_fee_denominator))?,
                root_k_last,
            )?;
            total_supply = add(total_supply, numerator / denominator)?;
        }
    }
    Ok((
        mul(reserves_a, liquidity)? / total_supply,
        mul(reserves_b, liquidity)? / total_supply,
    ))
}

/// Pair state needed to value shares: `(total_supply, fee_on, k_last, denominator)`
fn share_context(
    chain: &Chain,
    factory: Address,
    token_a: Address,
    token_b: Address,
    liquidity: U256,
) -> Result<(U256, bool, U256, u32)> {
    let registry = chain.factory_ref(factory)?;
    let fee_on = !registry.fee_to().is_zero();
    let pair = chain.pair_ref(registry.pair_for(token_a, token_b)?)?;
    let k_last = if fee_on { pair.k_last() } else { U256::zero() };
    let total_supply = chain.total_supply(pair.address());
    if total_supply < liquidity || liquidity.is_zero() {
        return Err(AmmError::LiquidityAmount);
    }
    Ok((
        total_supply,
        fee_on,
        k_last,
        registry.protocol_fee_denominator(),
    ))
}

/// Value of `liquidity` shares at current reserves
pub fn get_liquidity_value(
    chain: &Chain,
    factory: Address,
    token_a: Address,
    token_b: Address,
    liquidity: U256,
) -> Result<(U256, U256)> {
    let (total_supply, fee_on, k_last, denominator) =
        share_context(chain, factory, token_a, token_b, liquidity)?;
    let (reserve_a, reserve_b, _) = chain.reserves(factory, token_a, token_b)?;
    compute_liquidity_value(
        reserve_a,
        reserve_b,
        total_supply,
        liquidity,
        fee_on,
        k_last,
        denominator,
    )
}

/// Value of `liquidity` shares after arbitraging the pair to the given price
pub fn get_liquidity_value_after_arbitrage_to_price(
    chain: &Chain,
    factory: Address,
    token_a: Address,
    token_b: Address,
    true_price_token_a: U256,
    true_price_token_b: U256,
    liquidity: U256,
) -> Result<(U256, U256)> {
    let (total_supply, fee_on, k_last, denominator) =
        share_context(chain, factory, token_a, token_b, liquidity)?;
    let (reserve_a, reserve_b) = get_reserves_after_arbitrage(
        chain,
        factory,
        token_a,
        token_b,
        true_price_token_a,
        true_price_token_b,
    )?;
    compute_liquidity_value(
        reserve_a,
        reserve_b,
        total_supply,
        liquidity,
        fee_on,
        k_last,
        denominator,
    )
}
