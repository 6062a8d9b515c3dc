//! Shared fixtures for AMM integration tests
//!
//! Builds a chain with one factory, a router, WETH and two sorted test
//! tokens, and funds a signing wallet with tokens and native currency.

#![allow(dead_code)]

use ethers_core::k256::ecdsa::SigningKey;
use ethers_core::types::{Address, Signature, H256, U256};
use ethers_core::utils::secret_key_to_address;
use tidepool_amm::permit::{permit_digest, PermitMessage};
use tidepool_amm::{Chain, Router, Strict, TokenInfo};
use tidepool_config::{init_logging, ChainSettings, FactorySettings, LoggingSettings};

pub const DEADLINE: u64 = u64::MAX;

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
    pub factory: Address,
    pub router: Router<Strict>,
    pub weth: Address,
    pub token0: Address,
    pub token1: Address,
    pub wallet: Address,
    pub wallet_key: SigningKey,
    pub other: Address,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_fee_bps(30)
    }

    pub fn with_fee_bps(swap_fee_bps: u32) -> Self {
        init_logging(&LoggingSettings::default()).unwrap();
        let mut chain = Chain::new(&ChainSettings {
            chain_id: 1,
            genesis_timestamp: 1_600_000_000,
        });
        let settings =
            FactorySettings::named("primary", addr(0xfac0)).with_swap_fee_bps(swap_fee_bps);
        let admin = addr(0xad);
        let factory = chain.deploy_factory(&settings, admin).unwrap();

        let weth = addr(0xeeee);
        chain
            .deploy_token(weth, TokenInfo::wrapped_native())
            .unwrap();
        let (token0, token1) = (addr(0x1000), addr(0x2000));
        chain.deploy_token(token0, TokenInfo::standard("TK0")).unwrap();
        chain.deploy_token(token1, TokenInfo::standard("TK1")).unwrap();

        let wallet_key = SigningKey::from_slice(&[0x42; 32]).unwrap();
        let wallet = secret_key_to_address(&wallet_key);
        let router = Router::new(addr(0x7007), factory, weth);

        for token in [token0, token1] {
            chain.mint_tokens(token, wallet, e18(10_000)).unwrap();
            chain
                .approve(token, wallet, router.address(), U256::MAX)
                .unwrap();
        }
        chain.fund_native(wallet, e18(10_000)).unwrap();

        Self {
            chain,
            factory,
            router,
            weth,
            token0,
            token1,
            wallet,
            wallet_key,
            other: addr(0xb0b),
        }
    }

    /// Pair for token0/token1, created on first use
    pub fn pair(&mut self) -> Address {
        let registry = self.chain.factory(self.factory).unwrap();
        match registry.get_pair(self.token0, self.token1) {
            Some(pair) => pair,
            None => self
                .chain
                .create_pair(self.factory, self.token0, self.token1)
                .unwrap(),
        }
    }

    /// Transfer both amounts into the token0/token1 pair and mint to the wallet
    pub fn add_liquidity(&mut self, amount0: U256, amount1: U256) -> U256 {
        let pair = self.pair();
        let wallet = self.wallet;
        self.chain
            .transfer(self.token0, wallet, pair, amount0)
            .unwrap();
        self.chain
            .transfer(self.token1, wallet, pair, amount1)
            .unwrap();
        self.chain.mint(wallet, pair, wallet).unwrap()
    }

    /// Deploy a token, fund the wallet and approve the router
    pub fn deploy_token(&mut self, token: Address, info: TokenInfo, supply: U256) {
        self.chain.deploy_token(token, info).unwrap();
        self.chain.mint_tokens(token, self.wallet, supply).unwrap();
        self.chain
            .approve(token, self.wallet, self.router.address(), U256::MAX)
            .unwrap();
    }

    /// Wallet signature over a permit for `token`
    pub fn sign_permit(
        &self,
        token: Address,
        spender: Address,
        value: U256,
        deadline: U256,
    ) -> Signature {
        let message = PermitMessage {
            owner: self.wallet,
            spender,
            value,
            nonce: self.chain.nonce(token, self.wallet),
            deadline,
        };
        let separator = self.chain.domain_separator(token).unwrap();
        sign_digest(&self.wallet_key, permit_digest(separator, &message))
    }
}

pub fn sign_digest(key: &SigningKey, digest: H256) -> Signature {
    let (signature, recovery_id) = key.sign_prehash_recoverable(digest.as_bytes()).unwrap();
    let bytes = signature.to_bytes();
    Signature {
        r: U256::from_big_endian(&bytes[..32]),
        s: U256::from_big_endian(&bytes[32..]),
        v: u64::from(recovery_id.to_byte()) + 27,
    }
}
