//! Chain fixture for oracle tests

#![allow(dead_code)]

use tidepool_amm::{Address, Chain, TokenInfo, U256};
use tidepool_config::{defaults, init_logging, ChainSettings, FactorySettings, LoggingSettings};

pub const START: u64 = defaults::chain::GENESIS_TIMESTAMP;

pub fn e18(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub struct Fixture {
    pub chain: Chain,
    pub factory: Address,
    pub token0: Address,
    pub token1: Address,
    pub pair: Address,
    pub wallet: Address,
}

impl Fixture {
    pub fn new() -> Self {
        Self::at(START)
    }

    /// Fixture whose chain starts at `genesis`
    pub fn at(genesis: u64) -> Self {
        init_logging(&LoggingSettings::default()).unwrap();
        let mut chain = Chain::new(&ChainSettings {
            chain_id: 1,
            genesis_timestamp: genesis,
        });
        let factory = chain
            .deploy_factory(&FactorySettings::named("primary", addr(0xfac0)), addr(0xad))
            .unwrap();
        let (token0, token1) = (addr(0x1000), addr(0x2000));
        let wallet = addr(0xa11ce);
        for (token, symbol) in [(token0, "TK0"), (token1, "TK1")] {
            chain.deploy_token(token, TokenInfo::standard(symbol)).unwrap();
            chain.mint_tokens(token, wallet, e18(1_000_000)).unwrap();
        }
        let pair = chain.create_pair(factory, token0, token1).unwrap();
        Self {
            chain,
            factory,
            token0,
            token1,
            pair,
            wallet,
        }
    }

    pub fn add_liquidity(&mut self, amount0: U256, amount1: U256) {
        let (wallet, pair) = (self.wallet, self.pair);
        self.chain.transfer(self.token0, wallet, pair, amount0).unwrap();
        self.chain.transfer(self.token1, wallet, pair, amount1).unwrap();
        self.chain.mint(wallet, pair, wallet).unwrap();
    }

    /// Reserve timestamp of the pair
    pub fn pair_timestamp(&self) -> u32 {
        self.chain.pair(self.pair).unwrap().get_reserves().2
    }

    pub fn sync(&mut self) {
        self.chain.sync(self.pair).unwrap();
    }

    pub fn mine(&mut self, timestamp: u64) {
        self.chain.mine(timestamp).unwrap();
    }
}
