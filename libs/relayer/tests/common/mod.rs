//! Relayer fixture
//!
//! Two factories (the execution venue behind the router and a second one
//! used only as a price source), WETH, two sorted tokens and a WETH partner,
//! plus a relayer owned by a funded wallet.

#![allow(dead_code)]

use tidepool_amm::{Address, Chain, Router, Strict, TokenInfo, U256};
use tidepool_config::{
    defaults, init_logging, ChainSettings, FactorySettings, LoggingSettings, RelayerSettings,
};
use tidepool_relayer::{LiquidityProvision, LiquidityRemoval, Relayer};

pub const START: u64 = defaults::chain::GENESIS_TIMESTAMP;
pub const DEADLINE: u64 = START + 86_400;
/// 1 %
pub const TOLERANCE: u64 = 10_000;
pub const WINDOW: u64 = 300;

pub fn e18(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn dec(s: &str) -> U256 {
    U256::from_dec_str(s).unwrap()
}

pub struct Fixture {
    pub chain: Chain,
    pub relayer: Relayer,
    /// Execution venue (the router's factory)
    pub dx_factory: Address,
    /// Price source only
    pub uni_factory: Address,
    pub router: Router<Strict>,
    pub weth: Address,
    pub token0: Address,
    pub token1: Address,
    pub partner: Address,
    pub dx_pair: Address,
    pub weth_pair: Address,
    pub uni_pair: Address,
    /// Relayer owner
    pub owner: Address,
    pub stranger: Address,
    /// Seeds pools
    pub lp: Address,
}

impl Fixture {
    pub fn new() -> Self {
        init_logging(&LoggingSettings::default()).unwrap();
        let mut chain = Chain::new(&ChainSettings {
            chain_id: 1,
            genesis_timestamp: START,
        });
        let admin = addr(0xad);
        let dx_factory = chain
            .deploy_factory(
                &FactorySettings::named("dxswap", addr(0xd0)).with_swap_fee_bps(25),
                admin,
            )
            .unwrap();
        let uni_factory = chain
            .deploy_factory(&FactorySettings::named("uniswap", addr(0x0f)), admin)
            .unwrap();

        let weth = addr(0xeeee);
        chain.deploy_token(weth, TokenInfo::wrapped_native()).unwrap();
        let (token0, token1, partner) = (addr(0x1000), addr(0x2000), addr(0x3000));
        let (owner, lp) = (addr(0x0e1), addr(0xa11ce));
        for (token, symbol) in [(token0, "TK0"), (token1, "TK1"), (partner, "WETHP")] {
            chain.deploy_token(token, TokenInfo::standard(symbol)).unwrap();
            chain.mint_tokens(token, owner, e18(10_000)).unwrap();
            chain.mint_tokens(token, lp, e18(1_000_000)).unwrap();
        }
        chain.fund_native(owner, e18(10_000)).unwrap();
        chain.fund_native(lp, e18(1_000_000)).unwrap();

        let dx_pair = chain.create_pair(dx_factory, token0, token1).unwrap();
        let weth_pair = chain.create_pair(dx_factory, weth, partner).unwrap();
        let uni_pair = chain.create_pair(uni_factory, token0, token1).unwrap();

        let router = Router::new(addr(0x7007), dx_factory, weth);
        let relayer = Relayer::new(
            addr(0x4e1a),
            owner,
            router.clone(),
            [dx_factory, uni_factory],
            &RelayerSettings::default(),
        );

        Self {
            chain,
            relayer,
            dx_factory,
            uni_factory,
            router,
            weth,
            token0,
            token1,
            partner,
            dx_pair,
            weth_pair,
            uni_pair,
            owner,
            stranger: addr(0xb0b),
            lp,
        }
    }

    /// Seed a token0/token1 pair from the LP wallet; shares go to `to`
    pub fn add_liquidity(&mut self, pair: Address, amount0: U256, amount1: U256, to: Address) {
        let lp = self.lp;
        self.chain.transfer(self.token0, lp, pair, amount0).unwrap();
        self.chain.transfer(self.token1, lp, pair, amount1).unwrap();
        self.chain.mint(lp, pair, to).unwrap();
    }

    /// Seed the WETH/partner pair from the LP wallet; shares go to `to`
    pub fn add_weth_liquidity(&mut self, eth: U256, partner: U256, to: Address) {
        let (lp, pair) = (self.lp, self.weth_pair);
        self.chain.deposit(self.weth, lp, eth).unwrap();
        self.chain.transfer(self.weth, lp, pair, eth).unwrap();
        self.chain.transfer(self.partner, lp, pair, partner).unwrap();
        self.chain.mint(lp, pair, to).unwrap();
    }

    pub fn mine(&mut self, timestamp: u64) {
        self.chain.mine(timestamp).unwrap();
    }

    /// 1 token0 for 4 token1 on the execution factory
    pub fn provision(&self, min_reserve: U256, factory: Address) -> LiquidityProvision {
        LiquidityProvision {
            token_a: self.token0,
            token_b: self.token1,
            amount_a: e18(1),
            amount_b: e18(4),
            price_tolerance: TOLERANCE,
            min_reserve_a: min_reserve,
            min_reserve_b: min_reserve,
            max_window_time: WINDOW,
            deadline: DEADLINE,
            factory,
        }
    }

    /// 1 ETH for 4 partner tokens
    pub fn eth_provision(&self, min_reserve: U256) -> LiquidityProvision {
        LiquidityProvision {
            token_a: Address::zero(),
            token_b: self.partner,
            ..self.provision(min_reserve, self.dx_factory)
        }
    }

    pub fn removal(&self, liquidity: U256) -> LiquidityRemoval {
        LiquidityRemoval {
            token_a: self.token0,
            token_b: self.token1,
            liquidity,
            amount_a_min: U256::from(10),
            amount_b_min: U256::from(10),
            price_tolerance: 0,
            min_reserve_a: e18(2),
            min_reserve_b: e18(2),
            max_window_time: WINDOW,
            deadline: DEADLINE,
            factory: self.dx_factory,
        }
    }

    pub fn balance(&self, token: Address, account: Address) -> U256 {
        self.chain.balance_of(token, account)
    }

    /// Place, sample at `t0` and `t0 + 340`, leaving the order ready
    pub fn sample_twice(&mut self, order_id: usize, t0: u64) {
        self.mine(t0);
        self.relayer.update_oracle(&mut self.chain, order_id).unwrap();
        self.mine(t0 + 340);
        self.relayer.update_oracle(&mut self.chain, order_id).unwrap();
    }
}
