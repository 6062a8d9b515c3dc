//! Router: user-facing liquidity and swap entry points
//!
//! Computes optimal deposit ratios, moves user funds straight into pairs,
//! chains multi-hop swaps, and wraps or unwraps native currency at the edges
//! of a path. Every entry point checks its deadline first and runs
//! atomically against the chain.
//!
//! Transfer handling is chosen at the type level. `Router<Strict>` trusts
//! quoted amounts and offers exact-output swaps. `Router<SupportingFeeOnTransfer>`
//! measures what each pair actually received, which is the only correct
//! behaviour for tokens that burn part of every transfer. Exact-output swaps
//! do not exist on that variant.

use std::marker::PhantomData;

use ethers_core::types::{Address, Signature, U256};
use tracing::{debug, info};

use crate::chain::Chain;
use crate::error::{AmmError, Result};
use crate::full_math::{add, sub};
use crate::liquidity_math::{compute_profit_maximizing_trade, compute_swap_in_for_deposit};
use crate::permit::Permit;
use crate::pool_traits::ReserveSource;
use crate::v2_math::V2Math;

mod sealed {
    pub trait Sealed {}
}

/// How swaps account for token transfers
pub trait TransferPolicy: sealed::Sealed + std::fmt::Debug + Clone + Copy + Default {
    const NAME: &'static str;
}

/// Amounts are quoted up front and transferred as quoted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Strict;

/// Amounts are measured from balances after each transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportingFeeOnTransfer;

impl sealed::Sealed for Strict {}
impl sealed::Sealed for SupportingFeeOnTransfer {}

impl TransferPolicy for Strict {
    const NAME: &'static str = "strict";
}

impl TransferPolicy for SupportingFeeOnTransfer {
    const NAME: &'static str = "supporting_fee_on_transfer";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddLiquidity {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: u64,
}

/// Native currency is the second asset; the desired ETH amount is the call value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddLiquidityEth {
    pub token: Address,
    pub amount_token_desired: U256,
    pub amount_token_min: U256,
    pub amount_eth_min: U256,
    pub to: Address,
    pub deadline: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveLiquidity {
    pub token_a: Address,
    pub token_b: Address,
    pub liquidity: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveLiquidityEth {
    pub token: Address,
    pub liquidity: U256,
    pub amount_token_min: U256,
    pub amount_eth_min: U256,
    pub to: Address,
    pub deadline: u64,
}

/// Owner signature authorising the router to pull pool shares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitSignature {
    /// Approve `U256::MAX` instead of the exact liquidity
    pub approve_max: bool,
    pub signature: Signature,
}

/// Arbitrage a pair towards an externally observed price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapToPrice {
    pub token_a: Address,
    pub token_b: Address,
    pub true_price_token_a: U256,
    pub true_price_token_b: U256,
    pub max_spend_token_a: U256,
    pub max_spend_token_b: U256,
    pub to: Address,
    pub deadline: u64,
}

/// Single-sided deposit: part of `amount_in` is swapped for `other_token`
/// and the rest is added alongside the swap output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapAndAddLiquidity {
    pub token_in: Address,
    pub other_token: Address,
    pub amount_in: U256,
    /// Minimum swap output, bounding slippage on the swap leg
    pub min_other_token_in: U256,
    pub to: Address,
    pub deadline: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router<P: TransferPolicy = Strict> {
    address: Address,
    factory: Address,
    weth: Address,
    _policy: PhantomData<P>,
}

fn ensure(chain: &Chain, deadline: u64) -> Result<()> {
    if deadline < chain.now() {
        return Err(AmmError::Expired);
    }
    Ok(())
}

impl<P: TransferPolicy> Router<P> {
    pub fn new(address: Address, factory: Address, weth: Address) -> Self {
        Self {
            address,
            factory,
            weth,
            _policy: PhantomData,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn weth(&self) -> Address {
        self.weth
    }

    /// Same deployment viewed through the fee-on-transfer entry points
    pub fn supporting_fee_on_transfer(&self) -> Router<SupportingFeeOnTransfer> {
        Router::new(self.address, self.factory, self.weth)
    }

    /// Same deployment viewed through the strict entry points
    pub fn strict(&self) -> Router<Strict> {
        Router::new(self.address, self.factory, self.weth)
    }

    fn pair_for(&self, chain: &Chain, token_a: Address, token_b: Address) -> Result<Address> {
        chain.factory_ref(self.factory)?.pair_for(token_a, token_b)
    }

    pub fn quote(&self, amount_a: U256, reserve_a: U256, reserve_b: U256) -> Result<U256> {
        V2Math::quote(amount_a, reserve_a, reserve_b)
    }

    /// Output for an exact input at this router's factory fee
    pub fn get_amount_out(
        &self,
        chain: &Chain,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<U256> {
        let fee = chain.factory_ref(self.factory)?.swap_fee();
        V2Math::get_amount_out(amount_in, reserve_in, reserve_out, fee)
    }

    pub fn get_amount_in(
        &self,
        chain: &Chain,
        amount_out: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<U256> {
        let fee = chain.factory_ref(self.factory)?.swap_fee();
        V2Math::get_amount_in(amount_out, reserve_in, reserve_out, fee)
    }

    pub fn get_amounts_out(
        &self,
        chain: &Chain,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>> {
        V2Math::get_amounts_out(chain, self.factory, amount_in, path)
    }

    pub fn get_amounts_in(
        &self,
        chain: &Chain,
        amount_out: U256,
        path: &[Address],
    ) -> Result<Vec<U256>> {
        V2Math::get_amounts_in(chain, self.factory, amount_out, path)
    }

    /// Amounts to deposit given current reserves; creates the pair if missing
    #[allow(clippy::too_many_arguments)]
    fn add_liquidity_amounts(
        &self,
        chain: &mut Chain,
        token_a: Address,
        token_b: Address,
        amount_a_desired: U256,
        amount_b_desired: U256,
        amount_a_min: U256,
        amount_b_min: U256,
    ) -> Result<(U256, U256)> {
        if chain
            .factory_ref(self.factory)?
            .get_pair(token_a, token_b)
            .is_none()
        {
            chain.execute_create_pair(self.factory, token_a, token_b)?;
        }
        let (reserve_a, reserve_b, _) = chain.reserves(self.factory, token_a, token_b)?;
        if reserve_a.is_zero() && reserve_b.is_zero() {
            return Ok((amount_a_desired, amount_b_desired));
        }

        let amount_b_optimal = V2Math::quote(amount_a_desired, reserve_a, reserve_b)?;
        if amount_b_optimal <= amount_b_desired {
            if amount_b_optimal < amount_b_min {
                return Err(AmmError::InsufficientBAmount);
            }
            Ok((amount_a_desired, amount_b_optimal))
        } else {
            let amount_a_optimal = V2Math::quote(amount_b_desired, reserve_b, reserve_a)?;
            if amount_a_optimal < amount_a_min {
                return Err(AmmError::InsufficientAAmount);
            }
            Ok((amount_a_optimal, amount_b_desired))
        }
    }

    /// Deposit both tokens at the pool ratio; returns `(amount_a, amount_b, liquidity)`
    pub fn add_liquidity(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &AddLiquidity,
    ) -> Result<(U256, U256, U256)> {
        chain.atomically(|chain| {
            ensure(chain, params.deadline)?;
            let (amount_a, amount_b) = self.add_liquidity_amounts(
                chain,
                params.token_a,
                params.token_b,
                params.amount_a_desired,
                params.amount_b_desired,
                params.amount_a_min,
                params.amount_b_min,
            )?;
            let pair = self.pair_for(chain, params.token_a, params.token_b)?;
            chain.ledger.transfer_from(
                params.token_a,
                self.address,
                caller,
                pair,
                amount_a,
                &mut chain.events,
            )?;
            chain.ledger.transfer_from(
                params.token_b,
                self.address,
                caller,
                pair,
                amount_b,
                &mut chain.events,
            )?;
            let liquidity = chain.execute_mint(self.address, pair, params.to)?;
            info!(?pair, %amount_a, %amount_b, %liquidity, "liquidity added");
            Ok((amount_a, amount_b, liquidity))
        })
    }

    /// Deposit a token against native currency sent as `value`. Unused
    /// native currency is refunded to `caller`.
    pub fn add_liquidity_eth(
        &self,
        chain: &mut Chain,
        caller: Address,
        value: U256,
        params: &AddLiquidityEth,
    ) -> Result<(U256, U256, U256)> {
        chain.atomically(|chain| {
            ensure(chain, params.deadline)?;
            chain.ledger.transfer_native(caller, self.address, value)?;
            let (amount_token, amount_eth) = self.add_liquidity_amounts(
                chain,
                params.token,
                self.weth,
                params.amount_token_desired,
                value,
                params.amount_token_min,
                params.amount_eth_min,
            )?;
            let pair = self.pair_for(chain, params.token, self.weth)?;
            chain.ledger.transfer_from(
                params.token,
                self.address,
                caller,
                pair,
                amount_token,
                &mut chain.events,
            )?;
            chain
                .ledger
                .deposit(self.weth, self.address, amount_eth, &mut chain.events)?;
            chain
                .ledger
                .transfer(self.weth, self.address, pair, amount_eth, &mut chain.events)?;
            let liquidity = chain.execute_mint(self.address, pair, params.to)?;
            if value > amount_eth {
                chain
                    .ledger
                    .transfer_native(self.address, caller, value - amount_eth)?;
            }
            info!(?pair, %amount_token, %amount_eth, %liquidity, "liquidity added");
            Ok((amount_token, amount_eth, liquidity))
        })
    }

    /// Pull shares from `caller`, burn them and check the minimums
    fn execute_remove_liquidity(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &RemoveLiquidity,
    ) -> Result<(U256, U256)> {
        let pair = self.pair_for(chain, params.token_a, params.token_b)?;
        chain.ledger.transfer_from(
            pair,
            self.address,
            caller,
            pair,
            params.liquidity,
            &mut chain.events,
        )?;
        let (amount0, amount1) = chain.execute_burn(self.address, pair, params.to)?;
        let (token0, _) = V2Math::sort_tokens(params.token_a, params.token_b)?;
        let (amount_a, amount_b) = if params.token_a == token0 {
            (amount0, amount1)
        } else {
            (amount1, amount0)
        };
        if amount_a < params.amount_a_min {
            return Err(AmmError::InsufficientAAmount);
        }
        if amount_b < params.amount_b_min {
            return Err(AmmError::InsufficientBAmount);
        }
        debug!(?pair, %amount_a, %amount_b, "liquidity removed");
        Ok((amount_a, amount_b))
    }

    pub fn remove_liquidity(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &RemoveLiquidity,
    ) -> Result<(U256, U256)> {
        chain.atomically(|chain| {
            ensure(chain, params.deadline)?;
            self.execute_remove_liquidity(chain, caller, params)
        })
    }

    /// Approve the router over `caller`'s shares of `pair` via signature
    fn apply_permit(
        &self,
        chain: &mut Chain,
        caller: Address,
        pair: Address,
        liquidity: U256,
        deadline: u64,
        permit: &PermitSignature,
    ) -> Result<()> {
        let value = if permit.approve_max {
            U256::MAX
        } else {
            liquidity
        };
        let permit = Permit {
            owner: caller,
            spender: self.address,
            value,
            deadline: U256::from(deadline),
            signature: permit.signature,
        };
        let (now, chain_id) = (chain.now(), chain.chain_id());
        chain
            .ledger
            .permit(pair, &permit, now, chain_id, &mut chain.events)
    }

    pub fn remove_liquidity_with_permit(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &RemoveLiquidity,
        permit: &PermitSignature,
    ) -> Result<(U256, U256)> {
        chain.atomically(|chain| {
            ensure(chain, params.deadline)?;
            let pair = self.pair_for(chain, params.token_a, params.token_b)?;
            self.apply_permit(chain, caller, pair, params.liquidity, params.deadline, permit)?;
            self.execute_remove_liquidity(chain, caller, params)
        })
    }

    /// Burn shares of a token/WETH pair with the router as recipient
    fn remove_to_router(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &RemoveLiquidityEth,
    ) -> Result<(U256, U256)> {
        self.execute_remove_liquidity(
            chain,
            caller,
            &RemoveLiquidity {
                token_a: params.token,
                token_b: self.weth,
                liquidity: params.liquidity,
                amount_a_min: params.amount_token_min,
                amount_b_min: params.amount_eth_min,
                to: self.address,
                deadline: params.deadline,
            },
        )
    }

    fn unwrap_to(&self, chain: &mut Chain, to: Address, amount: U256) -> Result<()> {
        chain
            .ledger
            .withdraw(self.weth, self.address, amount, &mut chain.events)?;
        chain.ledger.transfer_native(self.address, to, amount)
    }

    /// Execute hops with pre-computed `amounts`, the first input already in
    /// the first pair
    fn swap_hops(
        &self,
        chain: &mut Chain,
        amounts: &[U256],
        path: &[Address],
        to: Address,
    ) -> Result<()> {
        for i in 0..path.len() - 1 {
            let (input, output) = (path[i], path[i + 1]);
            let (token0, _) = V2Math::sort_tokens(input, output)?;
            let amount_out = amounts[i + 1];
            let (amount0_out, amount1_out) = if input == token0 {
                (U256::zero(), amount_out)
            } else {
                (amount_out, U256::zero())
            };
            let recipient = if i < path.len() - 2 {
                self.pair_for(chain, output, path[i + 2])?
            } else {
                to
            };
            let pair = self.pair_for(chain, input, output)?;
            chain.execute_swap(
                self.address,
                pair,
                amount0_out,
                amount1_out,
                recipient,
                None,
                &[],
            )?;
        }
        Ok(())
    }

    /// Execute hops measuring each pair's received input from its balance
    fn swap_hops_measured(&self, chain: &mut Chain, path: &[Address], to: Address) -> Result<()> {
        for i in 0..path.len() - 1 {
            let (input, output) = (path[i], path[i + 1]);
            let (token0, _) = V2Math::sort_tokens(input, output)?;
            let pair = self.pair_for(chain, input, output)?;
            let state = chain.pair_ref(pair)?;
            let (reserve0, reserve1, _) = state.get_reserves();
            let fee = state.swap_fee();
            let (reserve_in, reserve_out) = if input == token0 {
                (reserve0, reserve1)
            } else {
                (reserve1, reserve0)
            };
            let amount_input = sub(chain.ledger.balance_of(input, pair), reserve_in)?;
            let amount_output = V2Math::get_amount_out(amount_input, reserve_in, reserve_out, fee)?;
            let (amount0_out, amount1_out) = if input == token0 {
                (U256::zero(), amount_output)
            } else {
                (amount_output, U256::zero())
            };
            let recipient = if i < path.len() - 2 {
                self.pair_for(chain, output, path[i + 2])?
            } else {
                to
            };
            chain.execute_swap(
                self.address,
                pair,
                amount0_out,
                amount1_out,
                recipient,
                None,
                &[],
            )?;
        }
        Ok(())
    }

    fn require_path(path: &[Address]) -> Result<()> {
        if path.len() < 2 {
            return Err(AmmError::InvalidPath);
        }
        Ok(())
    }
}

impl Router<Strict> {
    /// Burn shares of a token/WETH pair; the token and unwrapped ETH go to `to`
    pub fn remove_liquidity_eth(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &RemoveLiquidityEth,
    ) -> Result<(U256, U256)> {
        chain.atomically(|chain| {
            ensure(chain, params.deadline)?;
            self.finish_remove_liquidity_eth(chain, caller, params)
        })
    }

    pub fn remove_liquidity_eth_with_permit(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &RemoveLiquidityEth,
        permit: &PermitSignature,
    ) -> Result<(U256, U256)> {
        chain.atomically(|chain| {
            ensure(chain, params.deadline)?;
            let pair = self.pair_for(chain, params.token, self.weth)?;
            self.apply_permit(chain, caller, pair, params.liquidity, params.deadline, permit)?;
            self.finish_remove_liquidity_eth(chain, caller, params)
        })
    }

    fn finish_remove_liquidity_eth(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &RemoveLiquidityEth,
    ) -> Result<(U256, U256)> {
        let (amount_token, amount_eth) = self.remove_to_router(chain, caller, params)?;
        chain.ledger.transfer(
            params.token,
            self.address,
            params.to,
            amount_token,
            &mut chain.events,
        )?;
        self.unwrap_to(chain, params.to, amount_eth)?;
        Ok((amount_token, amount_eth))
    }

    /// Swap an exact input along `path`; returns the amount at every hop
    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_tokens_for_tokens(
        &self,
        chain: &mut Chain,
        caller: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>> {
        chain.atomically(|chain| {
            ensure(chain, deadline)?;
            let amounts = V2Math::get_amounts_out(&*chain, self.factory, amount_in, path)?;
            if amounts[amounts.len() - 1] < amount_out_min {
                return Err(AmmError::RouterInsufficientOutputAmount);
            }
            let pair = self.pair_for(chain, path[0], path[1])?;
            chain.ledger.transfer_from(
                path[0],
                self.address,
                caller,
                pair,
                amounts[0],
                &mut chain.events,
            )?;
            self.swap_hops(chain, &amounts, path, to)?;
            debug!(policy = Strict::NAME, ?amounts, "exact input swap");
            Ok(amounts)
        })
    }

    /// Swap for an exact output along `path`, spending at most `amount_in_max`
    #[allow(clippy::too_many_arguments)]
    pub fn swap_tokens_for_exact_tokens(
        &self,
        chain: &mut Chain,
        caller: Address,
        amount_out: U256,
        amount_in_max: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>> {
        chain.atomically(|chain| {
            ensure(chain, deadline)?;
            let amounts = V2Math::get_amounts_in(&*chain, self.factory, amount_out, path)?;
            if amounts[0] > amount_in_max {
                return Err(AmmError::ExcessiveInputAmount);
            }
            let pair = self.pair_for(chain, path[0], path[1])?;
            chain.ledger.transfer_from(
                path[0],
                self.address,
                caller,
                pair,
                amounts[0],
                &mut chain.events,
            )?;
            self.swap_hops(chain, &amounts, path, to)?;
            debug!(policy = Strict::NAME, ?amounts, "exact output swap");
            Ok(amounts)
        })
    }

    /// Swap all of `value` native currency along a path starting at WETH
    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_eth_for_tokens(
        &self,
        chain: &mut Chain,
        caller: Address,
        value: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>> {
        chain.atomically(|chain| {
            ensure(chain, deadline)?;
            if path.first() != Some(&self.weth) {
                return Err(AmmError::RouterInvalidPath);
            }
            chain.ledger.transfer_native(caller, self.address, value)?;
            let amounts = V2Math::get_amounts_out(&*chain, self.factory, value, path)?;
            if amounts[amounts.len() - 1] < amount_out_min {
                return Err(AmmError::RouterInsufficientOutputAmount);
            }
            let pair = self.pair_for(chain, path[0], path[1])?;
            chain
                .ledger
                .deposit(self.weth, self.address, amounts[0], &mut chain.events)?;
            chain
                .ledger
                .transfer(self.weth, self.address, pair, amounts[0], &mut chain.events)?;
            self.swap_hops(chain, &amounts, path, to)?;
            Ok(amounts)
        })
    }

    /// Receive exactly `amount_out` native currency for at most `amount_in_max`
    #[allow(clippy::too_many_arguments)]
    pub fn swap_tokens_for_exact_eth(
        &self,
        chain: &mut Chain,
        caller: Address,
        amount_out: U256,
        amount_in_max: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>> {
        chain.atomically(|chain| {
            ensure(chain, deadline)?;
            if path.last() != Some(&self.weth) {
                return Err(AmmError::RouterInvalidPath);
            }
            let amounts = V2Math::get_amounts_in(&*chain, self.factory, amount_out, path)?;
            if amounts[0] > amount_in_max {
                return Err(AmmError::ExcessiveInputAmount);
            }
            let pair = self.pair_for(chain, path[0], path[1])?;
            chain.ledger.transfer_from(
                path[0],
                self.address,
                caller,
                pair,
                amounts[0],
                &mut chain.events,
            )?;
            self.swap_hops(chain, &amounts, path, self.address)?;
            self.unwrap_to(chain, to, amounts[amounts.len() - 1])?;
            Ok(amounts)
        })
    }

    /// Swap an exact token input for native currency
    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_tokens_for_eth(
        &self,
        chain: &mut Chain,
        caller: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>> {
        chain.atomically(|chain| {
            ensure(chain, deadline)?;
            if path.last() != Some(&self.weth) {
                return Err(AmmError::RouterInvalidPath);
            }
            let amounts = V2Math::get_amounts_out(&*chain, self.factory, amount_in, path)?;
            if amounts[amounts.len() - 1] < amount_out_min {
                return Err(AmmError::RouterInsufficientOutputAmount);
            }
            let pair = self.pair_for(chain, path[0], path[1])?;
            chain.ledger.transfer_from(
                path[0],
                self.address,
                caller,
                pair,
                amounts[0],
                &mut chain.events,
            )?;
            self.swap_hops(chain, &amounts, path, self.address)?;
            self.unwrap_to(chain, to, amounts[amounts.len() - 1])?;
            Ok(amounts)
        })
    }

    /// Receive exactly `amount_out` tokens paying native currency; the
    /// unspent part of `value` is refunded to `caller`
    #[allow(clippy::too_many_arguments)]
    pub fn swap_eth_for_exact_tokens(
        &self,
        chain: &mut Chain,
        caller: Address,
        value: U256,
        amount_out: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>> {
        chain.atomically(|chain| {
            ensure(chain, deadline)?;
            if path.first() != Some(&self.weth) {
                return Err(AmmError::RouterInvalidPath);
            }
            chain.ledger.transfer_native(caller, self.address, value)?;
            let amounts = V2Math::get_amounts_in(&*chain, self.factory, amount_out, path)?;
            if amounts[0] > value {
                return Err(AmmError::ExcessiveInputAmount);
            }
            let pair = self.pair_for(chain, path[0], path[1])?;
            chain
                .ledger
                .deposit(self.weth, self.address, amounts[0], &mut chain.events)?;
            chain
                .ledger
                .transfer(self.weth, self.address, pair, amounts[0], &mut chain.events)?;
            self.swap_hops(chain, &amounts, path, to)?;
            if value > amounts[0] {
                chain
                    .ledger
                    .transfer_native(self.address, caller, value - amounts[0])?;
            }
            Ok(amounts)
        })
    }

    /// Trade the pair towards `true_price_token_a : true_price_token_b`,
    /// spending no more than the per-side cap. Returns the swap amounts.
    pub fn swap_to_price(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &SwapToPrice,
    ) -> Result<Vec<U256>> {
        if params.true_price_token_a.is_zero() || params.true_price_token_b.is_zero() {
            return Err(AmmError::ZeroPrice);
        }
        if params.max_spend_token_a.is_zero() && params.max_spend_token_b.is_zero() {
            return Err(AmmError::ZeroSpend);
        }
        let (reserve_a, reserve_b, fee) =
            chain.reserves(self.factory, params.token_a, params.token_b)?;
        let (a_to_b, amount_in) = compute_profit_maximizing_trade(
            params.true_price_token_a,
            params.true_price_token_b,
            reserve_a,
            reserve_b,
            fee,
        )?;
        if amount_in.is_zero() {
            return Err(AmmError::ZeroAmountIn);
        }

        let (max_spend, path) = if a_to_b {
            (params.max_spend_token_a, [params.token_a, params.token_b])
        } else {
            (params.max_spend_token_b, [params.token_b, params.token_a])
        };
        let amount_in = amount_in.min(max_spend);
        info!(a_to_b, %amount_in, "swapping to price");
        self.swap_exact_tokens_for_tokens(
            chain,
            caller,
            amount_in,
            U256::zero(),
            &path,
            params.to,
            params.deadline,
        )
    }

    /// Provide liquidity from `token_in` alone. Returns
    /// `(amount_token_in, amount_other_token, liquidity)`; any `token_in`
    /// the deposit does not need stays with `caller`.
    pub fn swap_exact_tokens_and_add_liquidity(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &SwapAndAddLiquidity,
    ) -> Result<(U256, U256, U256)> {
        chain.atomically(|chain| {
            ensure(chain, params.deadline)?;
            let (token_in, other_token) = (params.token_in, params.other_token);
            let (reserve_in, reserve_out, fee) =
                chain.reserves(self.factory, token_in, other_token)?;
            let swap_in = compute_swap_in_for_deposit(reserve_in, params.amount_in, fee)?;
            let swap_out = V2Math::get_amount_out(swap_in, reserve_in, reserve_out, fee)?;
            if swap_out < params.min_other_token_in {
                return Err(AmmError::RouterInsufficientOutputAmount);
            }

            let pair = self.pair_for(chain, token_in, other_token)?;
            chain.ledger.transfer_from(
                token_in,
                self.address,
                caller,
                pair,
                swap_in,
                &mut chain.events,
            )?;
            self.swap_hops(chain, &[swap_in, swap_out], &[token_in, other_token], self.address)?;

            let (amount_in, amount_other) = self.add_liquidity_amounts(
                chain,
                token_in,
                other_token,
                sub(params.amount_in, swap_in)?,
                swap_out,
                U256::zero(),
                U256::zero(),
            )?;
            chain.ledger.transfer_from(
                token_in,
                self.address,
                caller,
                pair,
                amount_in,
                &mut chain.events,
            )?;
            chain
                .ledger
                .transfer(other_token, self.address, pair, amount_other, &mut chain.events)?;
            let dust = sub(swap_out, amount_other)?;
            if !dust.is_zero() {
                chain
                    .ledger
                    .transfer(other_token, self.address, caller, dust, &mut chain.events)?;
            }
            let liquidity = chain.execute_mint(self.address, pair, params.to)?;
            let spent = add(swap_in, amount_in)?;
            info!(?pair, %swap_in, %spent, %amount_other, %liquidity, "swapped and added liquidity");
            Ok((spent, amount_other, liquidity))
        })
    }
}

impl Router<SupportingFeeOnTransfer> {
    /// Burn shares of a token/WETH pair and forward whatever token balance
    /// the router ends up holding; returns the ETH amount
    pub fn remove_liquidity_eth(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &RemoveLiquidityEth,
    ) -> Result<U256> {
        chain.atomically(|chain| {
            ensure(chain, params.deadline)?;
            self.finish_remove_liquidity_eth(chain, caller, params)
        })
    }

    pub fn remove_liquidity_eth_with_permit(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &RemoveLiquidityEth,
        permit: &PermitSignature,
    ) -> Result<U256> {
        chain.atomically(|chain| {
            ensure(chain, params.deadline)?;
            let pair = self.pair_for(chain, params.token, self.weth)?;
            self.apply_permit(chain, caller, pair, params.liquidity, params.deadline, permit)?;
            self.finish_remove_liquidity_eth(chain, caller, params)
        })
    }

    fn finish_remove_liquidity_eth(
        &self,
        chain: &mut Chain,
        caller: Address,
        params: &RemoveLiquidityEth,
    ) -> Result<U256> {
        let (_, amount_eth) = self.remove_to_router(chain, caller, params)?;
        let held = chain.ledger.balance_of(params.token, self.address);
        chain
            .ledger
            .transfer(params.token, self.address, params.to, held, &mut chain.events)?;
        self.unwrap_to(chain, params.to, amount_eth)?;
        Ok(amount_eth)
    }

    /// Delivered output measured at `to` in `output` against the pre-swap balance
    fn received_since(
        chain: &Chain,
        output: Address,
        to: Address,
        balance_before: U256,
    ) -> Result<U256> {
        sub(chain.ledger.balance_of(output, to), balance_before)
    }

    /// Swap an exact input; returns the amount `to` actually received
    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_tokens_for_tokens(
        &self,
        chain: &mut Chain,
        caller: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<U256> {
        chain.atomically(|chain| {
            ensure(chain, deadline)?;
            Self::require_path(path)?;
            let pair = self.pair_for(chain, path[0], path[1])?;
            chain.ledger.transfer_from(
                path[0],
                self.address,
                caller,
                pair,
                amount_in,
                &mut chain.events,
            )?;
            let output = path[path.len() - 1];
            let before = chain.ledger.balance_of(output, to);
            self.swap_hops_measured(chain, path, to)?;
            let received = Self::received_since(chain, output, to, before)?;
            if received < amount_out_min {
                return Err(AmmError::RouterInsufficientOutputAmount);
            }
            debug!(policy = SupportingFeeOnTransfer::NAME, %received, "exact input swap");
            Ok(received)
        })
    }

    /// Swap all of `value` native currency; returns the amount `to` received
    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_eth_for_tokens(
        &self,
        chain: &mut Chain,
        caller: Address,
        value: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<U256> {
        chain.atomically(|chain| {
            ensure(chain, deadline)?;
            if path.first() != Some(&self.weth) {
                return Err(AmmError::RouterInvalidPath);
            }
            Self::require_path(path)?;
            chain.ledger.transfer_native(caller, self.address, value)?;
            chain
                .ledger
                .deposit(self.weth, self.address, value, &mut chain.events)?;
            let pair = self.pair_for(chain, path[0], path[1])?;
            chain
                .ledger
                .transfer(self.weth, self.address, pair, value, &mut chain.events)?;
            let output = path[path.len() - 1];
            let before = chain.ledger.balance_of(output, to);
            self.swap_hops_measured(chain, path, to)?;
            let received = Self::received_since(chain, output, to, before)?;
            if received < amount_out_min {
                return Err(AmmError::RouterInsufficientOutputAmount);
            }
            Ok(received)
        })
    }

    /// Swap an exact token input for native currency; returns the ETH sent to `to`
    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_tokens_for_eth(
        &self,
        chain: &mut Chain,
        caller: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<U256> {
        chain.atomically(|chain| {
            ensure(chain, deadline)?;
            if path.last() != Some(&self.weth) {
                return Err(AmmError::RouterInvalidPath);
            }
            Self::require_path(path)?;
            let pair = self.pair_for(chain, path[0], path[1])?;
            chain.ledger.transfer_from(
                path[0],
                self.address,
                caller,
                pair,
                amount_in,
                &mut chain.events,
            )?;
            self.swap_hops_measured(chain, path, self.address)?;
            let amount_out = chain.ledger.balance_of(self.weth, self.address);
            if amount_out < amount_out_min {
                return Err(AmmError::RouterInsufficientOutputAmount);
            }
            self.unwrap_to(chain, to, amount_out)?;
            Ok(amount_out)
        })
    }
}
