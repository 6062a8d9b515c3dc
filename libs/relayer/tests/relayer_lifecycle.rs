//! Order lifecycle against live pools

mod common;

use common::{dec, e18, Fixture, DEADLINE, START};
use tidepool_amm::{Address, AmmError, Event, MINIMUM_LIQUIDITY, U256};
use tidepool_oracle::OracleError;
use tidepool_relayer::{
    LiquidityProvision, LiquidityRemoval, OrderStatus, RelayerError, RelayerEvent, Settlement,
};

fn minimum() -> U256 {
    U256::from(MINIMUM_LIQUIDITY)
}

// ============================================================================
// PLACEMENT CHECKS
// ============================================================================

#[test]
fn test_provision_order_input_checks() {
    let mut fx = Fixture::new();
    let (owner, dx) = (fx.owner, fx.dx_factory);
    let balance0 = fx.balance(fx.token0, owner);

    let cases = [
        (
            fx.provision(e18(2), fx.token0),
            owner,
            RelayerError::InvalidFactory,
        ),
        (fx.provision(e18(2), dx), fx.stranger, RelayerError::CallerNotOwner),
        (
            LiquidityProvision {
                token_a: fx.token1,
                ..fx.provision(e18(2), dx)
            },
            owner,
            RelayerError::InvalidPair,
        ),
        (
            LiquidityProvision {
                token_a: fx.token1,
                token_b: fx.token0,
                ..fx.provision(e18(2), dx)
            },
            owner,
            RelayerError::InvalidTokenOrder,
        ),
        (
            LiquidityProvision {
                amount_a: U256::zero(),
                ..fx.provision(e18(2), dx)
            },
            owner,
            RelayerError::InvalidTokenAmount,
        ),
        (
            LiquidityProvision {
                price_tolerance: 1_000_000_000,
                ..fx.provision(e18(2), dx)
            },
            owner,
            RelayerError::InvalidTolerance,
        ),
        (
            LiquidityProvision {
                deadline: START - 1_200,
                ..fx.provision(e18(2), dx)
            },
            owner,
            RelayerError::DeadlineReached,
        ),
        (
            LiquidityProvision {
                max_window_time: 0,
                ..fx.provision(e18(2), dx)
            },
            owner,
            RelayerError::InvalidWindowTime,
        ),
    ];
    for (params, caller, expected) in cases {
        assert_eq!(
            fx.relayer
                .order_liquidity_provision(&mut fx.chain, caller, params),
            Err(expected)
        );
    }

    assert_eq!(fx.relayer.orders_count(), 0);
    assert!(fx.relayer.events().is_empty());
    assert_eq!(fx.balance(fx.token0, owner), balance0);
    assert!(fx.balance(fx.token0, fx.relayer.address()).is_zero());
}

#[test]
fn test_removal_order_input_checks() {
    let mut fx = Fixture::new();
    let (owner, dx_pair) = (fx.owner, fx.dx_pair);
    fx.add_liquidity(dx_pair, e18(2), e18(8), owner);
    let liquidity = e18(1);

    let cases = [
        (
            LiquidityRemoval {
                factory: fx.token0,
                ..fx.removal(liquidity)
            },
            owner,
            RelayerError::InvalidFactory,
        ),
        (fx.removal(liquidity), fx.stranger, RelayerError::CallerNotOwner),
        (
            LiquidityRemoval {
                token_a: fx.token1,
                ..fx.removal(liquidity)
            },
            owner,
            RelayerError::InvalidPair,
        ),
        (
            LiquidityRemoval {
                token_a: fx.token1,
                token_b: fx.token0,
                ..fx.removal(liquidity)
            },
            owner,
            RelayerError::InvalidTokenOrder,
        ),
        (
            LiquidityRemoval {
                amount_a_min: U256::zero(),
                ..fx.removal(liquidity)
            },
            owner,
            RelayerError::InvalidLiquidityAmount,
        ),
        (fx.removal(U256::zero()), owner, RelayerError::InvalidLiquidityAmount),
        (
            LiquidityRemoval {
                price_tolerance: 1_000_000_000,
                ..fx.removal(liquidity)
            },
            owner,
            RelayerError::InvalidTolerance,
        ),
        (
            LiquidityRemoval {
                deadline: START - 1_200,
                ..fx.removal(liquidity)
            },
            owner,
            RelayerError::DeadlineReached,
        ),
    ];
    for (params, caller, expected) in cases {
        assert_eq!(
            fx.relayer.order_liquidity_removal(&mut fx.chain, caller, params),
            Err(expected)
        );
    }
    assert_eq!(fx.relayer.orders_count(), 0);
    assert_eq!(fx.balance(dx_pair, owner), e18(4) - minimum());
}

#[test]
fn test_orders_need_a_future_deadline() {
    let mut fx = Fixture::new();
    let dx_pair = fx.dx_pair;
    let owner = fx.owner;
    fx.add_liquidity(dx_pair, e18(10), e18(40), owner);

    let provision = LiquidityProvision {
        deadline: START,
        ..fx.provision(e18(2), fx.dx_factory)
    };
    assert_eq!(
        fx.relayer
            .order_liquidity_provision(&mut fx.chain, owner, provision),
        Err(RelayerError::DeadlineReached)
    );
    let removal = LiquidityRemoval {
        deadline: START,
        ..fx.removal(e18(1))
    };
    assert_eq!(
        fx.relayer.order_liquidity_removal(&mut fx.chain, owner, removal),
        Err(RelayerError::DeadlineReached)
    );
    assert_eq!(fx.relayer.orders_count(), 0);

    let provision = LiquidityProvision {
        deadline: START + 1,
        ..fx.provision(e18(2), fx.dx_factory)
    };
    assert!(fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, provision)
        .is_ok());
}

// ============================================================================
// IMMEDIATE EXECUTION
// ============================================================================

#[test]
fn test_initial_liquidity_is_provided_immediately() {
    let mut fx = Fixture::new();
    let owner = fx.owner;
    let (balance0, balance1) = (fx.balance(fx.token0, owner), fx.balance(fx.token1, owner));
    let params = fx.provision(U256::zero(), fx.dx_factory);

    let mark = fx.chain.events().len();
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();
    assert_eq!(order_id, 0);
    assert_eq!(
        fx.relayer.events(),
        &[
            RelayerEvent::NewOrder {
                order_id: 0,
                action: 1
            },
            RelayerEvent::ExecutedOrder { order_id: 0 },
        ]
    );
    assert!(fx.chain.events_since(mark).contains(&Event::Sync {
        pair: fx.dx_pair,
        reserve0: e18(1),
        reserve1: e18(4),
    }));

    assert_eq!(fx.balance(fx.dx_pair, owner), e18(2) - minimum());
    assert_eq!(fx.balance(fx.token0, owner), balance0 - e18(1));
    assert_eq!(fx.balance(fx.token1, owner), balance1 - e18(4));
    let relayer = fx.relayer.address();
    assert!(fx.balance(fx.token0, relayer).is_zero());
    assert!(fx.balance(fx.token1, relayer).is_zero());
    assert!(fx.chain.allowance(fx.token0, relayer, fx.router.address()).is_zero());

    let order = fx.relayer.order(order_id).unwrap();
    assert_eq!(order.oracle_id, None);
    assert_eq!(order.settlement, Settlement::Executed);
    assert_eq!(
        fx.relayer.order_status(order_id, START).unwrap(),
        OrderStatus::Executed
    );
}

#[test]
fn test_initial_eth_liquidity_is_provided_immediately() {
    let mut fx = Fixture::new();
    let owner = fx.owner;
    let native = fx.chain.native_balance_of(owner);
    let params = fx.eth_provision(U256::zero());

    fx.relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();

    assert_eq!(
        fx.relayer.events().last(),
        Some(&RelayerEvent::ExecutedOrder { order_id: 0 })
    );
    assert_eq!(fx.balance(fx.weth_pair, owner), e18(2) - minimum());
    let pair = fx.chain.pair(fx.weth_pair).unwrap();
    // partner sorts before WETH
    assert_eq!(pair.get_reserves().0, e18(4));
    assert_eq!(pair.get_reserves().1, e18(1));
    assert_eq!(fx.chain.native_balance_of(owner), native - e18(1));
    assert!(fx.chain.native_balance_of(fx.relayer.address()).is_zero());
}

// ============================================================================
// SAMPLED EXECUTION
// ============================================================================

#[test]
fn test_provision_on_empty_pool_after_foreign_price_observation() {
    let mut fx = Fixture::new();
    let (owner, uni_pair) = (fx.owner, fx.uni_pair);
    fx.add_liquidity(uni_pair, e18(10), e18(40), fx.lp);

    fx.mine(START + 10);
    let params = fx.provision(e18(2), fx.uni_factory);
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();
    assert_eq!(
        fx.relayer.order_status(order_id, START + 10).unwrap(),
        OrderStatus::Sampling
    );
    let relayer = fx.relayer.address();
    assert_eq!(fx.balance(fx.token0, relayer), e18(1));
    assert_eq!(fx.balance(fx.token1, relayer), e18(4));

    fx.sample_twice(order_id, START + 10);
    assert_eq!(
        fx.relayer.order_status(order_id, START + 350).unwrap(),
        OrderStatus::Ready
    );

    fx.mine(START + 700);
    fx.relayer.execute_order(&mut fx.chain, order_id).unwrap();

    assert_eq!(fx.balance(fx.dx_pair, owner), e18(2) - minimum());
    assert_eq!(fx.chain.pair(fx.dx_pair).unwrap().get_reserves().0, e18(1));
    assert!(fx.balance(fx.token0, relayer).is_zero());
    assert!(fx.balance(fx.token1, relayer).is_zero());
    assert_eq!(
        fx.relayer.events().last(),
        Some(&RelayerEvent::ExecutedOrder { order_id })
    );
}

#[test]
fn test_provision_after_price_observation() {
    let mut fx = Fixture::new();
    let (owner, dx_pair) = (fx.owner, fx.dx_pair);
    fx.add_liquidity(dx_pair, e18(10), e18(40), fx.lp);
    fx.mine(START + 10);

    let params = fx.provision(e18(2), fx.dx_factory);
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();
    assert_eq!(
        fx.relayer.events(),
        &[RelayerEvent::NewOrder {
            order_id: 0,
            action: 1
        }]
    );

    fx.sample_twice(order_id, START + 10);
    fx.mine(START + 700);
    fx.relayer.execute_order(&mut fx.chain, order_id).unwrap();

    assert_eq!(fx.balance(dx_pair, owner), e18(2));
    let (reserve0, reserve1, _) = fx.chain.pair(dx_pair).unwrap().get_reserves();
    assert_eq!((reserve0, reserve1), (e18(11), e18(44)));
    assert_eq!(
        fx.relayer.order_status(order_id, START + 700).unwrap(),
        OrderStatus::Executed
    );
}

#[test]
fn test_eth_provision_after_price_observation() {
    let mut fx = Fixture::new();
    let owner = fx.owner;
    fx.add_weth_liquidity(e18(10), e18(40), fx.lp);
    let native = fx.chain.native_balance_of(owner);

    let params = fx.eth_provision(e18(2));
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();
    assert_eq!(
        fx.chain.native_balance_of(fx.relayer.address()),
        e18(1)
    );

    fx.sample_twice(order_id, START + 10);
    fx.mine(START + 700);
    fx.relayer.execute_order(&mut fx.chain, order_id).unwrap();

    assert_eq!(fx.balance(fx.weth_pair, owner), e18(2));
    let (reserve0, reserve1, _) = fx.chain.pair(fx.weth_pair).unwrap().get_reserves();
    assert_eq!((reserve0, reserve1), (e18(44), e18(11)));
    assert_eq!(fx.chain.native_balance_of(owner), native - e18(1));
    assert!(fx.chain.native_balance_of(fx.relayer.address()).is_zero());
}

#[test]
fn test_removal_after_price_observation() {
    let mut fx = Fixture::new();
    let (owner, dx_pair) = (fx.owner, fx.dx_pair);
    fx.add_liquidity(dx_pair, e18(2), e18(8), owner);
    let (balance0, balance1) = (fx.balance(fx.token0, owner), fx.balance(fx.token1, owner));
    fx.mine(START + 20);

    let params = fx.removal(e18(2) - minimum());
    let order_id = fx
        .relayer
        .order_liquidity_removal(&mut fx.chain, owner, params)
        .unwrap();
    assert_eq!(
        fx.relayer.events(),
        &[RelayerEvent::NewOrder {
            order_id: 0,
            action: 2
        }]
    );
    assert_eq!(fx.balance(dx_pair, fx.relayer.address()), e18(2) - minimum());
    assert_eq!(fx.balance(dx_pair, owner), e18(2));

    fx.sample_twice(order_id, START + 20);
    fx.mine(START + 700);
    fx.relayer.execute_order(&mut fx.chain, order_id).unwrap();

    assert_eq!(
        fx.balance(fx.token0, owner),
        balance0 + e18(1) - U256::from(500)
    );
    assert_eq!(
        fx.balance(fx.token1, owner),
        balance1 + e18(4) - U256::from(2_000)
    );
    let (reserve0, reserve1, _) = fx.chain.pair(dx_pair).unwrap().get_reserves();
    assert_eq!(reserve0, e18(1) + U256::from(500));
    assert_eq!(reserve1, e18(4) + U256::from(2_000));
    assert!(fx.balance(dx_pair, fx.relayer.address()).is_zero());
    assert_eq!(fx.balance(dx_pair, owner), e18(2));
}

#[test]
fn test_eth_removal_after_price_observation() {
    let mut fx = Fixture::new();
    let owner = fx.owner;
    fx.add_weth_liquidity(e18(10), e18(40), owner);
    let native = fx.chain.native_balance_of(owner);
    let partner = fx.balance(fx.partner, owner);
    fx.mine(START + 100);

    let params = LiquidityRemoval {
        token_a: Address::zero(),
        token_b: fx.partner,
        ..fx.removal(e18(2) - minimum())
    };
    let order_id = fx
        .relayer
        .order_liquidity_removal(&mut fx.chain, owner, params)
        .unwrap();
    assert_eq!(fx.balance(fx.weth_pair, owner), e18(18));

    fx.sample_twice(order_id, START + 100);
    fx.mine(START + 700);
    fx.relayer.execute_order(&mut fx.chain, order_id).unwrap();

    assert_eq!(
        fx.chain.native_balance_of(owner),
        native + e18(1) - U256::from(500)
    );
    assert_eq!(
        fx.balance(fx.partner, owner),
        partner + e18(4) - U256::from(2_000)
    );
    let (reserve0, reserve1, _) = fx.chain.pair(fx.weth_pair).unwrap().get_reserves();
    assert_eq!(reserve0, e18(36) + U256::from(2_000));
    assert_eq!(reserve1, e18(9) + U256::from(500));
    assert_eq!(fx.balance(fx.weth_pair, owner), e18(18));
}

#[test]
fn test_provision_priced_by_foreign_twap() {
    let mut fx = Fixture::new();
    let (owner, dx_pair, uni_pair) = (fx.owner, fx.dx_pair, fx.uni_pair);
    let (balance0, balance1) = (fx.balance(fx.token0, owner), fx.balance(fx.token1, owner));

    // execution pool at 1:4
    fx.add_liquidity(dx_pair, e18(100), e18(400), fx.lp);
    fx.mine(START + 100);
    // price source at 1:4
    fx.add_liquidity(uni_pair, e18(100), e18(400), fx.lp);
    fx.mine(START + 200);

    let params = fx.provision(e18(2), fx.uni_factory);
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();
    fx.relayer.update_oracle(&mut fx.chain, order_id).unwrap();

    // price source moves to 1:5 for the last 10 seconds of the window
    fx.mine(START + 490);
    fx.add_liquidity(uni_pair, e18(100), e18(600), fx.lp);
    fx.mine(START + 500);
    fx.relayer.update_oracle(&mut fx.chain, order_id).unwrap();

    let oracle_id = fx.relayer.order(order_id).unwrap().oracle_id.unwrap();
    let oracles = fx.relayer.oracle_creator();
    assert_eq!(
        oracles.consult(oracle_id, fx.token0, U256::from(100)).unwrap(),
        U256::from(403)
    );
    assert_eq!(
        oracles.consult(oracle_id, fx.token1, U256::from(100)).unwrap(),
        U256::from(24)
    );

    fx.mine(START + 600);
    fx.relayer.execute_order(&mut fx.chain, order_id).unwrap();

    assert_eq!(fx.balance(dx_pair, owner), dec("1986666666666666666"));
    assert_eq!(
        fx.balance(fx.token0, owner),
        balance0 - dec("993333333333333333")
    );
    assert_eq!(
        fx.balance(fx.token1, owner),
        balance1 - dec("3973333333333333332")
    );
    let relayer = fx.relayer.address();
    assert!(fx.balance(fx.token0, relayer).is_zero());
    assert!(fx.balance(fx.token1, relayer).is_zero());
}

#[test]
fn test_execution_reverts_when_pool_is_outside_tolerance() {
    let mut fx = Fixture::new();
    let (owner, dx_pair, uni_pair) = (fx.owner, fx.dx_pair, fx.uni_pair);
    fx.add_liquidity(dx_pair, e18(100), e18(400), fx.lp);
    fx.mine(START + 100);
    fx.add_liquidity(uni_pair, e18(100), e18(200), fx.lp);
    fx.mine(START + 200);

    let params = fx.provision(e18(2), fx.uni_factory);
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();
    fx.relayer.update_oracle(&mut fx.chain, order_id).unwrap();
    fx.mine(START + 230);
    fx.add_liquidity(uni_pair, e18(200), e18(1_300), fx.lp);
    fx.mine(START + 500);
    fx.relayer.update_oracle(&mut fx.chain, order_id).unwrap();

    let oracle_id = fx.relayer.order(order_id).unwrap().oracle_id.unwrap();
    assert_eq!(
        fx.relayer
            .oracle_creator()
            .consult(oracle_id, fx.token0, U256::from(100))
            .unwrap(),
        U256::from(469)
    );

    let reserves = fx.chain.pair(dx_pair).unwrap().get_reserves();
    let mark = fx.chain.events().len();
    assert_eq!(
        fx.relayer.execute_order(&mut fx.chain, order_id),
        Err(RelayerError::Amm(AmmError::InsufficientBAmount))
    );
    assert_eq!(fx.chain.events().len(), mark);
    assert_eq!(fx.chain.pair(dx_pair).unwrap().get_reserves(), reserves);
    assert_eq!(fx.balance(fx.token0, fx.relayer.address()), e18(1));
    assert_eq!(
        fx.relayer.order_status(order_id, START + 500).unwrap(),
        OrderStatus::Ready
    );
    assert_eq!(fx.relayer.events().len(), 1);
}

// ============================================================================
// ORACLE GATING
// ============================================================================

#[test]
fn test_oracle_update_requires_min_reserves() {
    let mut fx = Fixture::new();
    let owner = fx.owner;
    let params = fx.provision(e18(2), fx.dx_factory);
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();
    assert_eq!(
        fx.relayer.order_status(order_id, START).unwrap(),
        OrderStatus::Sampling
    );

    assert_eq!(
        fx.relayer.update_oracle(&mut fx.chain, order_id),
        Err(RelayerError::ReserveTooLow)
    );
    assert_eq!(
        fx.relayer
            .update_oracle(&mut fx.chain, order_id)
            .unwrap_err()
            .to_string(),
        "DXswapRelayer: RESERVE_TO_LOW"
    );
}

#[test]
fn test_oracle_update_is_throttled() {
    let mut fx = Fixture::new();
    let (owner, dx_pair) = (fx.owner, fx.dx_pair);
    fx.add_liquidity(dx_pair, e18(10), e18(40), fx.lp);
    let params = fx.provision(e18(2), fx.dx_factory);
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();

    fx.relayer.update_oracle(&mut fx.chain, order_id).unwrap();
    let err = fx
        .relayer
        .update_oracle(&mut fx.chain, order_id)
        .unwrap_err();
    assert_eq!(err, RelayerError::Oracle(OracleError::SamplePeriodNotElapsed));
    assert_eq!(err.to_string(), "OracleCreator: PERIOD_NOT_ELAPSED");

    fx.mine(START + 350);
    fx.relayer.update_oracle(&mut fx.chain, order_id).unwrap();
    assert_eq!(
        fx.relayer.update_oracle(&mut fx.chain, order_id),
        Err(RelayerError::ObservationEnded)
    );
}

#[test]
fn test_execution_requires_finalized_sample() {
    let mut fx = Fixture::new();
    let (owner, dx_pair) = (fx.owner, fx.dx_pair);
    fx.add_liquidity(dx_pair, e18(10), e18(40), fx.lp);
    let params = fx.provision(e18(2), fx.dx_factory);
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();

    assert_eq!(
        fx.relayer.execute_order(&mut fx.chain, order_id + 1),
        Err(RelayerError::InvalidOrder)
    );
    assert_eq!(
        fx.relayer.update_oracle(&mut fx.chain, order_id + 1),
        Err(RelayerError::InvalidOrder)
    );
    assert_eq!(
        fx.relayer.execute_order(&mut fx.chain, order_id),
        Err(RelayerError::ObservationRunning)
    );
    fx.relayer.update_oracle(&mut fx.chain, order_id).unwrap();
    assert_eq!(
        fx.relayer.execute_order(&mut fx.chain, order_id),
        Err(RelayerError::ObservationRunning)
    );

    fx.mine(START + 300);
    fx.relayer.update_oracle(&mut fx.chain, order_id).unwrap();
    fx.relayer.execute_order(&mut fx.chain, order_id).unwrap();
    assert_eq!(
        fx.relayer.execute_order(&mut fx.chain, order_id),
        Err(RelayerError::OrderExecuted)
    );
    assert_eq!(
        fx.relayer.update_oracle(&mut fx.chain, order_id),
        Err(RelayerError::ObservationEnded)
    );
}

#[test]
fn test_ready_order_cannot_execute_after_deadline() {
    let mut fx = Fixture::new();
    let (owner, dx_pair) = (fx.owner, fx.dx_pair);
    fx.add_liquidity(dx_pair, e18(10), e18(40), fx.lp);
    let params = fx.provision(e18(2), fx.dx_factory);
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();
    fx.sample_twice(order_id, START + 10);

    fx.mine(DEADLINE + 1);
    assert_eq!(
        fx.relayer.order_status(order_id, DEADLINE + 1).unwrap(),
        OrderStatus::Expired
    );
    assert_eq!(
        fx.relayer.execute_order(&mut fx.chain, order_id),
        Err(RelayerError::DeadlineReached)
    );
    assert_eq!(
        fx.relayer.update_oracle(&mut fx.chain, order_id),
        Err(RelayerError::DeadlineReached)
    );
}

// ============================================================================
// WITHDRAWAL
// ============================================================================

#[test]
fn test_expired_order_is_withdrawn_exactly_once() {
    let mut fx = Fixture::new();
    let (owner, dx_pair) = (fx.owner, fx.dx_pair);
    fx.add_liquidity(dx_pair, e18(10), e18(40), fx.lp);
    let (balance0, balance1) = (fx.balance(fx.token0, owner), fx.balance(fx.token1, owner));

    let params = fx.provision(U256::zero(), fx.dx_factory);
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();
    // the pool has liquidity, so even a zero reserve floor samples first
    assert_eq!(
        fx.relayer.order_status(order_id, START).unwrap(),
        OrderStatus::Sampling
    );

    fx.mine(START + 10);
    fx.relayer.update_oracle(&mut fx.chain, order_id).unwrap();
    assert_eq!(
        fx.relayer
            .withdraw_expired_order(&mut fx.chain, owner, order_id),
        Err(RelayerError::DeadlineNotReached)
    );

    fx.mine(DEADLINE + 500);
    let stranger = fx.stranger;
    assert_eq!(
        fx.relayer
            .withdraw_expired_order(&mut fx.chain, stranger, order_id),
        Err(RelayerError::CallerNotOwner)
    );
    assert_eq!(
        fx.relayer
            .withdraw_expired_order(&mut fx.chain, owner, order_id + 1),
        Err(RelayerError::InvalidOrder)
    );

    fx.relayer
        .withdraw_expired_order(&mut fx.chain, owner, order_id)
        .unwrap();
    assert_eq!(fx.balance(fx.token0, owner), balance0);
    assert_eq!(fx.balance(fx.token1, owner), balance1);
    assert_eq!(
        fx.relayer.events().last(),
        Some(&RelayerEvent::WithdrawnExpiredOrder { order_id })
    );
    assert_eq!(
        fx.relayer.order_status(order_id, DEADLINE + 500).unwrap(),
        OrderStatus::Withdrawn
    );

    assert_eq!(
        fx.relayer
            .withdraw_expired_order(&mut fx.chain, owner, order_id),
        Err(RelayerError::OrderWithdrawn)
    );
    assert_eq!(
        fx.relayer.execute_order(&mut fx.chain, order_id),
        Err(RelayerError::OrderWithdrawn)
    );
    assert_eq!(fx.balance(fx.token0, owner), balance0);
}

#[test]
fn test_executed_order_cannot_be_withdrawn() {
    let mut fx = Fixture::new();
    let owner = fx.owner;
    let params = fx.provision(U256::zero(), fx.dx_factory);
    let order_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, params)
        .unwrap();

    fx.mine(DEADLINE + 1);
    assert_eq!(
        fx.relayer
            .withdraw_expired_order(&mut fx.chain, owner, order_id),
        Err(RelayerError::OrderExecuted)
    );
}

#[test]
fn test_escrow_is_kept_per_order() {
    let mut fx = Fixture::new();
    let (owner, dx_pair) = (fx.owner, fx.dx_pair);
    fx.add_liquidity(dx_pair, e18(10), e18(40), fx.lp);
    let native = fx.chain.native_balance_of(owner);
    fx.add_weth_liquidity(e18(10), e18(40), fx.lp);

    let first = fx.provision(e18(2), fx.dx_factory);
    let second = fx.eth_provision(e18(2));
    let first_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, first)
        .unwrap();
    let second_id = fx
        .relayer
        .order_liquidity_provision(&mut fx.chain, owner, second)
        .unwrap();
    assert_eq!((first_id, second_id), (0, 1));
    assert_eq!(fx.relayer.oracle_creator().oracles_count(), 2);

    fx.sample_twice(first_id, START + 10);
    fx.mine(START + 700);
    fx.relayer.execute_order(&mut fx.chain, first_id).unwrap();

    // the ETH order's escrow is untouched by the first execution
    let relayer = fx.relayer.address();
    assert_eq!(fx.chain.native_balance_of(relayer), e18(1));
    assert_eq!(fx.balance(fx.partner, relayer), e18(4));

    fx.mine(DEADLINE + 1);
    fx.relayer
        .withdraw_expired_order(&mut fx.chain, owner, second_id)
        .unwrap();
    assert_eq!(fx.chain.native_balance_of(owner), native);
    assert!(fx.chain.native_balance_of(relayer).is_zero());
    assert!(fx.balance(fx.partner, relayer).is_zero());
}
