//! Simulated chain host
//!
//! `Chain` owns every piece of mutable state the contracts touch: the clock,
//! the token ledger, deployed factories, pairs and the event log. Each public
//! state-changing entry point runs through [`Chain::atomically`], so a call
//! that fails part-way leaves no trace, matching a reverted transaction.

use std::collections::BTreeMap;
use std::fmt;

use ethers_core::types::{Address, H256, U256};
use tidepool_config::{ChainSettings, SimulationConfig};
use tracing::{debug, info};

use crate::error::{AmmError, Result};
use crate::events::Event;
use crate::factory::Factory;
use crate::ledger::{TokenInfo, TokenLedger};
use crate::pair::Pair;
use crate::permit::{domain_separator, Permit};

#[derive(Debug, Clone)]
pub struct Chain {
    chain_id: u64,
    timestamp: u64,
    block_number: u64,
    pub(crate) ledger: TokenLedger,
    pub(crate) factories: BTreeMap<Address, Factory>,
    pub(crate) pairs: BTreeMap<Address, Pair>,
    pub(crate) events: Vec<Event>,
}

impl Chain {
    pub fn new(settings: &ChainSettings) -> Self {
        Self {
            chain_id: settings.chain_id,
            timestamp: settings.genesis_timestamp,
            block_number: 0,
            ledger: TokenLedger::new(),
            factories: BTreeMap::new(),
            pairs: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// Chain with every configured factory deployed, `admin` as fee setter
    pub fn from_config(config: &SimulationConfig, admin: Address) -> Result<Self> {
        let mut chain = Self::new(&config.chain);
        for settings in &config.factories {
            chain.deploy_factory(settings, admin)?;
        }
        info!(
            chain_id = chain.chain_id,
            factories = chain.factories.len(),
            "chain initialized"
        );
        Ok(chain)
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Current block time in seconds
    pub fn now(&self) -> u64 {
        self.timestamp
    }

    /// Block time as pairs record it, modulo 2^32
    pub fn block_timestamp(&self) -> u32 {
        (self.timestamp & u64::from(u32::MAX)) as u32
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Move to a new block at `timestamp`
    pub fn mine(&mut self, timestamp: u64) -> Result<()> {
        if timestamp < self.timestamp {
            return Err(AmmError::TimestampInPast {
                now: self.timestamp,
                requested: timestamp,
            });
        }
        self.timestamp = timestamp;
        self.block_number += 1;
        Ok(())
    }

    /// Move to a new block `seconds` later
    pub fn advance(&mut self, seconds: u64) {
        self.timestamp = self.timestamp.saturating_add(seconds);
        self.block_number += 1;
    }

    /// Run `f` against this chain; on error every mutation it made is undone.
    pub fn atomically<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Chain) -> std::result::Result<T, E>,
        E: fmt::Display,
    {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!(reason = %err, "call reverted");
                *self = snapshot;
                Err(err)
            }
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events emitted after the log had `mark` entries
    pub fn events_since(&self, mark: usize) -> &[Event] {
        self.events.get(mark..).unwrap_or(&[])
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub fn deploy_token(&mut self, token: Address, info: TokenInfo) -> Result<()> {
        debug!(?token, symbol = %info.symbol, "token deployed");
        self.ledger.register(token, info)
    }

    /// Faucet: mint `amount` of `token` to `to`
    pub fn mint_tokens(&mut self, token: Address, to: Address, amount: U256) -> Result<()> {
        self.atomically(|chain| chain.ledger.mint(token, to, amount, &mut chain.events))
    }

    /// Faucet: credit native currency to `account`
    pub fn fund_native(&mut self, account: Address, amount: U256) -> Result<()> {
        self.ledger.credit_native(account, amount)
    }

    pub fn balance_of(&self, token: Address, account: Address) -> U256 {
        self.ledger.balance_of(token, account)
    }

    pub fn native_balance_of(&self, account: Address) -> U256 {
        self.ledger.native_balance(account)
    }

    pub fn total_supply(&self, token: Address) -> U256 {
        self.ledger.total_supply(token)
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.ledger.allowance(token, owner, spender)
    }

    pub fn nonce(&self, token: Address, owner: Address) -> U256 {
        self.ledger.nonce(token, owner)
    }

    pub fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        value: U256,
    ) -> Result<()> {
        self.atomically(|chain| {
            chain
                .ledger
                .approve(token, owner, spender, value, &mut chain.events)
        })
    }

    /// Returns the amount `to` was credited
    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<U256> {
        self.atomically(|chain| {
            chain
                .ledger
                .transfer(token, from, to, amount, &mut chain.events)
        })
    }

    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<U256> {
        self.atomically(|chain| {
            chain
                .ledger
                .transfer_from(token, spender, from, to, amount, &mut chain.events)
        })
    }

    pub fn transfer_native(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        self.ledger.transfer_native(from, to, amount)
    }

    pub fn deposit(&mut self, weth: Address, account: Address, amount: U256) -> Result<()> {
        self.atomically(|chain| {
            chain
                .ledger
                .deposit(weth, account, amount, &mut chain.events)
        })
    }

    pub fn withdraw(&mut self, weth: Address, account: Address, amount: U256) -> Result<()> {
        self.atomically(|chain| {
            chain
                .ledger
                .withdraw(weth, account, amount, &mut chain.events)
        })
    }

    /// Signature-based approval on `token`
    pub fn permit(&mut self, token: Address, permit: &Permit) -> Result<()> {
        let (now, chain_id) = (self.timestamp, self.chain_id);
        self.atomically(|chain| {
            chain
                .ledger
                .permit(token, permit, now, chain_id, &mut chain.events)
        })
    }

    /// EIP-712 domain separator of `token` on this chain
    pub fn domain_separator(&self, token: Address) -> Result<H256> {
        let info = self
            .ledger
            .info(token)
            .ok_or(AmmError::UnknownToken(token))?;
        Ok(domain_separator(&info.name, self.chain_id, token))
    }
}
