//! Order-based liquidity relayer
//!
//! The owner places provision and removal orders; their funds move into the
//! relayer's own account at placement and stay there until the order executes
//! or is withdrawn after its deadline. An order executes through the router
//! only after an oracle sample over `max_window_time` seconds has finalized,
//! and then at amounts implied by that sample's average price. Slippage
//! minimums derived from the order's tolerance make the router call fail if
//! the execution pool has moved away from the sampled price.
//!
//! ```text
//!   place ──► Sampling ──update_oracle──► Ready ──execute_order──► Executed
//!     │          │                          │
//!     │          └────────── deadline ──────┴──► Expired ──withdraw──► Withdrawn
//!     └──(empty pool, no reserve floor)──► Executed
//! ```

use std::collections::BTreeSet;

use ethers_core::types::{Address, U256};
use tidepool_amm::full_math::{mul_div, sub};
use tidepool_amm::{
    AddLiquidity, AddLiquidityEth, AmmError, Chain, RemoveLiquidity, RemoveLiquidityEth,
    ReserveSource, Router, Strict,
};
use tidepool_config::RelayerSettings;
use tidepool_oracle::OracleCreator;
use tracing::{debug, info, warn};

use crate::error::{RelayerError, Result};
use crate::events::RelayerEvent;
use crate::order::{
    Asset, Holding, LiquidityProvision, LiquidityRemoval, Order, OrderId, OrderKind, OrderStatus,
    Settlement,
};

#[derive(Debug, Clone)]
pub struct Relayer {
    address: Address,
    owner: Address,
    router: Router<Strict>,
    /// Factories whose pairs may feed an order's oracle
    factories: BTreeSet<Address>,
    settings: RelayerSettings,
    oracle_creator: OracleCreator,
    orders: Vec<Order>,
    events: Vec<RelayerEvent>,
}

impl Relayer {
    /// Relayer at `address` operated by `owner`. Orders execute on the
    /// router's factory.
    pub fn new(
        address: Address,
        owner: Address,
        router: Router<Strict>,
        factories: impl IntoIterator<Item = Address>,
        settings: &RelayerSettings,
    ) -> Self {
        let factories: BTreeSet<Address> = factories.into_iter().collect();
        info!(?address, ?owner, factories = factories.len(), "relayer deployed");
        Self {
            address,
            owner,
            router,
            factories,
            settings: settings.clone(),
            oracle_creator: OracleCreator::new(),
            orders: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn router(&self) -> &Router<Strict> {
        &self.router
    }

    pub fn is_allowed_factory(&self, factory: Address) -> bool {
        self.factories.contains(&factory)
    }

    pub fn oracle_creator(&self) -> &OracleCreator {
        &self.oracle_creator
    }

    pub fn orders_count(&self) -> usize {
        self.orders.len()
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn events(&self) -> &[RelayerEvent] {
        &self.events
    }

    /// Lifecycle stage of `order_id` at time `now`
    pub fn order_status(&self, order_id: OrderId, now: u64) -> Result<OrderStatus> {
        let order = self.order(order_id).ok_or(RelayerError::InvalidOrder)?;
        let finalized = order
            .oracle_id
            .is_some_and(|id| self.oracle_creator.is_oracle_finalized(id));
        Ok(order.status(now, finalized))
    }

    /// Run `f` against the relayer and the chain; on error both are restored
    fn atomically<T, F>(&mut self, chain: &mut Chain, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self, &mut Chain) -> Result<T>,
    {
        let snapshot = self.clone();
        let result = chain.atomically(|chain| f(&mut *self, chain));
        if let Err(err) = &result {
            warn!(reason = %err, "relayer call reverted");
            *self = snapshot;
        }
        result
    }

    // ========================================================================
    // ORDER PLACEMENT
    // ========================================================================

    /// Escrow `amount_a`/`amount_b` from the owner and either provide them
    /// right away (empty execution pool, no reserve floor) or start sampling
    pub fn order_liquidity_provision(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        params: LiquidityProvision,
    ) -> Result<OrderId> {
        let kind = OrderKind::Provision(params);
        self.atomically(chain, |relayer, chain| {
            relayer.check_route(caller, &kind)?;
            if params.amount_a.is_zero() || params.amount_b.is_zero() {
                return Err(RelayerError::InvalidTokenAmount);
            }
            relayer.check_terms(chain, &kind)?;

            let asset_a = if kind.is_native() {
                Asset::Native
            } else {
                Asset::Token(params.token_a)
            };
            let escrow = vec![
                relayer.take(chain, caller, asset_a, params.amount_a)?,
                relayer.take(chain, caller, Asset::Token(params.token_b), params.amount_b)?,
            ];
            relayer.place(chain, kind, escrow)
        })
    }

    /// Escrow `liquidity` shares of the execution pair from the owner and
    /// start sampling
    pub fn order_liquidity_removal(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        params: LiquidityRemoval,
    ) -> Result<OrderId> {
        let kind = OrderKind::Removal(params);
        self.atomically(chain, |relayer, chain| {
            relayer.check_route(caller, &kind)?;
            if params.liquidity.is_zero()
                || params.amount_a_min.is_zero()
                || params.amount_b_min.is_zero()
            {
                return Err(RelayerError::InvalidLiquidityAmount);
            }
            relayer.check_terms(chain, &kind)?;

            let pair = relayer.execution_pair(chain, &kind)?;
            let escrow = vec![relayer.take(chain, caller, Asset::Token(pair), params.liquidity)?];
            relayer.place(chain, kind, escrow)
        })
    }

    fn check_route(&self, caller: Address, kind: &OrderKind) -> Result<()> {
        if !self.is_allowed_factory(kind.factory()) {
            return Err(RelayerError::InvalidFactory);
        }
        if caller != self.owner {
            return Err(RelayerError::CallerNotOwner);
        }
        if kind.token_a() == kind.token_b() {
            return Err(RelayerError::InvalidPair);
        }
        if kind.token_a() > kind.token_b() {
            return Err(RelayerError::InvalidTokenOrder);
        }
        Ok(())
    }

    fn check_terms(&self, chain: &Chain, kind: &OrderKind) -> Result<()> {
        if kind.price_tolerance() > self.settings.parts_per_million {
            return Err(RelayerError::InvalidTolerance);
        }
        // placement needs a deadline strictly in the future
        if chain.now() >= kind.deadline() {
            return Err(RelayerError::DeadlineReached);
        }
        let window = kind.max_window_time();
        if window < self.settings.min_window_time || u32::try_from(window).is_err() {
            return Err(RelayerError::InvalidWindowTime);
        }
        Ok(())
    }

    /// Move `amount` of `asset` from `from` into the relayer's account
    fn take(
        &self,
        chain: &mut Chain,
        from: Address,
        asset: Asset,
        amount: U256,
    ) -> Result<Holding> {
        let amount = match asset {
            Asset::Native => {
                chain.transfer_native(from, self.address, amount)?;
                amount
            }
            Asset::Token(token) => chain.transfer(token, from, self.address, amount)?,
        };
        Ok(Holding { asset, amount })
    }

    /// Send holdings from the relayer's account to the owner
    fn release(&self, chain: &mut Chain, holdings: &[Holding]) -> Result<()> {
        for holding in holdings.iter().filter(|holding| !holding.amount.is_zero()) {
            match holding.asset {
                Asset::Native => chain.transfer_native(self.address, self.owner, holding.amount)?,
                Asset::Token(token) => {
                    chain.transfer(token, self.address, self.owner, holding.amount)?;
                }
            }
        }
        Ok(())
    }

    fn place(&mut self, chain: &mut Chain, kind: OrderKind, escrow: Vec<Holding>) -> Result<OrderId> {
        let order_id = self.orders.len();
        self.orders.push(Order {
            id: order_id,
            kind,
            oracle_id: None,
            escrow,
            settlement: Settlement::Open,
        });
        self.events.push(RelayerEvent::NewOrder {
            order_id,
            action: kind.action(),
        });
        info!(order_id, action = kind.action(), "order placed");

        if let OrderKind::Provision(params) = kind {
            if params.min_reserve_a.is_zero()
                && params.min_reserve_b.is_zero()
                && self.execution_pool_is_empty(chain, &kind)?
            {
                debug!(order_id, "execution pool empty, providing immediately");
                self.settle(chain, order_id, params.amount_a, params.amount_b)?;
                return Ok(order_id);
            }
        }

        let pair = self.oracle_pair(chain, &kind)?;
        let window_time =
            u32::try_from(kind.max_window_time()).map_err(|_| RelayerError::InvalidWindowTime)?;
        let oracle_id = self
            .oracle_creator
            .create_oracle(chain, self.address, window_time, pair)?;
        self.order_mut(order_id)?.oracle_id = Some(oracle_id);
        debug!(order_id, oracle_id, ?pair, "sampling started");
        Ok(order_id)
    }

    // ========================================================================
    // SAMPLING AND EXECUTION
    // ========================================================================

    /// Record one oracle observation for `order_id`. Open to any caller.
    pub fn update_oracle(&mut self, chain: &mut Chain, order_id: OrderId) -> Result<()> {
        self.atomically(chain, |relayer, chain| {
            let order = relayer.order(order_id).ok_or(RelayerError::InvalidOrder)?;
            let kind = order.kind;
            if chain.now() > kind.deadline() {
                return Err(RelayerError::DeadlineReached);
            }
            let oracle_id = order
                .oracle_id
                .filter(|id| !relayer.oracle_creator.is_oracle_finalized(*id))
                .ok_or(RelayerError::ObservationEnded)?;

            let (reserve_a, reserve_b, _) =
                chain.reserves(kind.factory(), relayer.pool_token_a(&kind), kind.token_b())?;
            if reserve_a < kind.min_reserve_a() || reserve_b < kind.min_reserve_b() {
                return Err(RelayerError::ReserveTooLow);
            }

            let address = relayer.address;
            relayer.oracle_creator.update(chain, address, oracle_id)?;
            debug!(order_id, oracle_id, %reserve_a, %reserve_b, "oracle observation recorded");
            Ok(())
        })
    }

    /// Execute a sampled order at the oracle-implied amounts. Open to any caller.
    pub fn execute_order(&mut self, chain: &mut Chain, order_id: OrderId) -> Result<()> {
        self.atomically(chain, |relayer, chain| {
            let order = relayer.order(order_id).ok_or(RelayerError::InvalidOrder)?;
            match order.settlement {
                Settlement::Executed => return Err(RelayerError::OrderExecuted),
                Settlement::Withdrawn => return Err(RelayerError::OrderWithdrawn),
                Settlement::Open => {}
            }
            let oracle_id = order
                .oracle_id
                .filter(|id| relayer.oracle_creator.is_oracle_finalized(*id))
                .ok_or(RelayerError::ObservationRunning)?;
            let kind = order.kind;
            if chain.now() > kind.deadline() {
                return Err(RelayerError::DeadlineReached);
            }

            let (base_a, base_b) = match kind {
                OrderKind::Provision(params) => (params.amount_a, params.amount_b),
                OrderKind::Removal(params) => (params.amount_a_min, params.amount_b_min),
            };
            let b_implied =
                relayer
                    .oracle_creator
                    .consult(oracle_id, relayer.pool_token_a(&kind), base_a)?;
            let a_implied = relayer
                .oracle_creator
                .consult(oracle_id, kind.token_b(), base_b)?;
            // keep whichever side binds so neither amount exceeds the order
            let (amount_a, amount_b) = if a_implied <= base_a {
                (a_implied, base_b)
            } else {
                (base_a, b_implied)
            };
            debug!(order_id, %amount_a, %amount_b, "oracle-implied amounts");
            relayer.settle(chain, order_id, amount_a, amount_b)
        })
    }

    /// Return an expired order's escrow to the owner
    pub fn withdraw_expired_order(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        order_id: OrderId,
    ) -> Result<()> {
        self.atomically(chain, |relayer, chain| {
            if caller != relayer.owner {
                return Err(RelayerError::CallerNotOwner);
            }
            let order = relayer.order(order_id).ok_or(RelayerError::InvalidOrder)?;
            if chain.now() <= order.kind.deadline() {
                return Err(RelayerError::DeadlineNotReached);
            }
            match order.settlement {
                Settlement::Executed => return Err(RelayerError::OrderExecuted),
                Settlement::Withdrawn => return Err(RelayerError::OrderWithdrawn),
                Settlement::Open => {}
            }

            let escrow = order.escrow.clone();
            relayer.release(chain, &escrow)?;
            relayer.order_mut(order_id)?.settlement = Settlement::Withdrawn;
            relayer
                .events
                .push(RelayerEvent::WithdrawnExpiredOrder { order_id });
            info!(order_id, "expired order withdrawn");
            Ok(())
        })
    }

    /// Run the router call for `order_id` with `amount_a`/`amount_b` as
    /// the desired (provision) or minimum (removal) amounts before tolerance.
    /// Proceeds go to the owner along with any escrow the router left unused.
    fn settle(
        &mut self,
        chain: &mut Chain,
        order_id: OrderId,
        amount_a: U256,
        amount_b: U256,
    ) -> Result<()> {
        let order = self.order(order_id).ok_or(RelayerError::InvalidOrder)?.clone();
        let tolerance = order.kind.price_tolerance();
        let amount_a_min = self.apply_tolerance(amount_a, tolerance)?;
        let amount_b_min = self.apply_tolerance(amount_b, tolerance)?;
        let (relayer, router) = (self.address, self.router.address());
        let deadline = order.kind.deadline();

        let spent = match order.kind {
            OrderKind::Provision(params) if order.kind.is_native() => {
                chain.approve(params.token_b, relayer, router, amount_b)?;
                let (token_used, eth_used, liquidity) = self.router.add_liquidity_eth(
                    chain,
                    relayer,
                    amount_a,
                    &AddLiquidityEth {
                        token: params.token_b,
                        amount_token_desired: amount_b,
                        amount_token_min: amount_b_min,
                        amount_eth_min: amount_a_min,
                        to: self.owner,
                        deadline,
                    },
                )?;
                chain.approve(params.token_b, relayer, router, U256::zero())?;
                info!(order_id, %eth_used, %token_used, %liquidity, "liquidity provided");
                vec![
                    Holding {
                        asset: Asset::Native,
                        amount: eth_used,
                    },
                    Holding {
                        asset: Asset::Token(params.token_b),
                        amount: token_used,
                    },
                ]
            }
            OrderKind::Provision(params) => {
                chain.approve(params.token_a, relayer, router, amount_a)?;
                chain.approve(params.token_b, relayer, router, amount_b)?;
                let (used_a, used_b, liquidity) = self.router.add_liquidity(
                    chain,
                    relayer,
                    &AddLiquidity {
                        token_a: params.token_a,
                        token_b: params.token_b,
                        amount_a_desired: amount_a,
                        amount_b_desired: amount_b,
                        amount_a_min,
                        amount_b_min,
                        to: self.owner,
                        deadline,
                    },
                )?;
                chain.approve(params.token_a, relayer, router, U256::zero())?;
                chain.approve(params.token_b, relayer, router, U256::zero())?;
                info!(order_id, %used_a, %used_b, %liquidity, "liquidity provided");
                vec![
                    Holding {
                        asset: Asset::Token(params.token_a),
                        amount: used_a,
                    },
                    Holding {
                        asset: Asset::Token(params.token_b),
                        amount: used_b,
                    },
                ]
            }
            OrderKind::Removal(params) => {
                let pair = self.execution_pair(chain, &order.kind)?;
                chain.approve(pair, relayer, router, params.liquidity)?;
                let (out_a, out_b) = if order.kind.is_native() {
                    let (out_token, out_eth) = self.router.remove_liquidity_eth(
                        chain,
                        relayer,
                        &RemoveLiquidityEth {
                            token: params.token_b,
                            liquidity: params.liquidity,
                            amount_token_min: amount_b_min,
                            amount_eth_min: amount_a_min,
                            to: self.owner,
                            deadline,
                        },
                    )?;
                    (out_eth, out_token)
                } else {
                    self.router.remove_liquidity(
                        chain,
                        relayer,
                        &RemoveLiquidity {
                            token_a: params.token_a,
                            token_b: params.token_b,
                            liquidity: params.liquidity,
                            amount_a_min,
                            amount_b_min,
                            to: self.owner,
                            deadline,
                        },
                    )?
                };
                info!(order_id, %out_a, %out_b, "liquidity removed");
                vec![Holding {
                    asset: Asset::Token(pair),
                    amount: params.liquidity,
                }]
            }
        };

        self.release(chain, &unspent(&order.escrow, &spent)?)?;
        self.order_mut(order_id)?.settlement = Settlement::Executed;
        self.events.push(RelayerEvent::ExecutedOrder { order_id });
        Ok(())
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn order_mut(&mut self, order_id: OrderId) -> Result<&mut Order> {
        self.orders
            .get_mut(order_id)
            .ok_or(RelayerError::InvalidOrder)
    }

    /// `amount` less `tolerance` parts per million of it
    fn apply_tolerance(&self, amount: U256, tolerance: u64) -> Result<U256> {
        let slack = mul_div(
            amount,
            U256::from(tolerance),
            U256::from(self.settings.parts_per_million),
        )?;
        Ok(sub(amount, slack)?)
    }

    /// Pool-side address of token A: native currency trades as WETH
    fn pool_token_a(&self, kind: &OrderKind) -> Address {
        if kind.is_native() {
            self.router.weth()
        } else {
            kind.token_a()
        }
    }

    fn deployed_pair(&self, chain: &Chain, factory: Address, kind: &OrderKind) -> Result<Address> {
        let registry = chain
            .factory(factory)
            .ok_or(AmmError::FactoryNotFound(factory))?;
        let pair = registry.pair_for(self.pool_token_a(kind), kind.token_b())?;
        chain.pair(pair).ok_or(AmmError::PairNotFound(pair))?;
        Ok(pair)
    }

    /// Pair on the router's factory that orders execute against
    fn execution_pair(&self, chain: &Chain, kind: &OrderKind) -> Result<Address> {
        self.deployed_pair(chain, self.router.factory(), kind)
    }

    /// Pair on the order's factory that feeds its oracle sample
    fn oracle_pair(&self, chain: &Chain, kind: &OrderKind) -> Result<Address> {
        self.deployed_pair(chain, kind.factory(), kind)
    }

    fn execution_pool_is_empty(&self, chain: &Chain, kind: &OrderKind) -> Result<bool> {
        match self.execution_pair(chain, kind) {
            Ok(pair) => {
                let (reserve0, reserve1, _) = chain
                    .pair(pair)
                    .ok_or(AmmError::PairNotFound(pair))?
                    .get_reserves();
                Ok(reserve0.is_zero() && reserve1.is_zero())
            }
            Err(RelayerError::Amm(AmmError::PairNotFound(_))) => Ok(true),
            Err(err) => Err(err),
        }
    }
}

/// Escrow left over once `spent` has been taken out of it
fn unspent(escrow: &[Holding], spent: &[Holding]) -> Result<Vec<Holding>> {
    escrow
        .iter()
        .map(|held| -> Result<Holding> {
            let used = spent
                .iter()
                .filter(|item| item.asset == held.asset)
                .fold(U256::zero(), |total, item| total.saturating_add(item.amount));
            Ok(Holding {
                asset: held.asset,
                amount: sub(held.amount, used)?,
            })
        })
        .collect()
}
