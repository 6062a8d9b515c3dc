//! Token balances, allowances and native currency
//!
//! One ledger holds every fungible token on the simulated chain: plain
//! ERC-20s, fee-on-transfer tokens, the wrapped native token and the pool
//! share tokens minted by pairs. Native currency balances live alongside.

use std::collections::HashMap;

use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};
use tidepool_config::defaults::fees::BPS_DENOMINATOR;

use crate::error::{AmmError, Result};
use crate::events::Event;
use crate::permit::{domain_separator, permit_digest, recover_signer, Permit};

/// Transfer behaviour of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Standard,
    /// Burns `fee_bps` of every transfer from the sender's debit
    FeeOnTransfer { fee_bps: u32 },
    /// Wrapped native currency, backed 1:1 by native balance held at the token address
    Wrapped,
    /// Liquidity token of a pair
    PoolShare,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub kind: TokenKind,
}

impl TokenInfo {
    pub fn standard(symbol: &str) -> Self {
        Self {
            name: symbol.to_string(),
            symbol: symbol.to_string(),
            decimals: 18,
            kind: TokenKind::Standard,
        }
    }

    pub fn fee_on_transfer(symbol: &str, fee_bps: u32) -> Self {
        Self {
            kind: TokenKind::FeeOnTransfer { fee_bps },
            ..Self::standard(symbol)
        }
    }

    pub fn wrapped_native() -> Self {
        Self {
            name: "Wrapped Ether".to_string(),
            symbol: "WETH".to_string(),
            decimals: 18,
            kind: TokenKind::Wrapped,
        }
    }

    pub fn pool_share() -> Self {
        Self {
            name: "Uniswap V2".to_string(),
            symbol: "UNI-V2".to_string(),
            decimals: 18,
            kind: TokenKind::PoolShare,
        }
    }
}

#[derive(Debug, Clone)]
struct TokenState {
    info: TokenInfo,
    total_supply: U256,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    nonces: HashMap<Address, U256>,
}

impl TokenState {
    fn new(info: TokenInfo) -> Self {
        Self {
            info,
            total_supply: U256::zero(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            nonces: HashMap::new(),
        }
    }

    fn balance(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Debit `from` by `amount`, credit `to` with what survives the transfer fee
    fn move_balance(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
        events: &mut Vec<Event>,
    ) -> Result<U256> {
        let from_balance = self.balance(&from);
        let remaining = from_balance
            .checked_sub(amount)
            .ok_or(AmmError::SubUnderflow)?;
        self.balances.insert(from, remaining);

        let fee = match self.info.kind {
            TokenKind::FeeOnTransfer { fee_bps } => {
                amount * U256::from(fee_bps) / U256::from(BPS_DENOMINATOR)
            }
            _ => U256::zero(),
        };
        if !fee.is_zero() {
            self.total_supply -= fee;
            events.push(Event::Transfer {
                token,
                from,
                to: Address::zero(),
                value: fee,
            });
        }

        let credited = amount - fee;
        let to_balance = self.balance(&to);
        self.balances.insert(to, to_balance + credited);
        events.push(Event::Transfer {
            token,
            from,
            to,
            value: credited,
        });
        Ok(credited)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    tokens: HashMap<Address, TokenState>,
    native: HashMap<Address, U256>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, token: Address, info: TokenInfo) -> Result<()> {
        if self.tokens.contains_key(&token) {
            return Err(AmmError::TokenExists(token));
        }
        self.tokens.insert(token, TokenState::new(info));
        Ok(())
    }

    pub fn is_registered(&self, token: Address) -> bool {
        self.tokens.contains_key(&token)
    }

    pub fn info(&self, token: Address) -> Option<&TokenInfo> {
        self.tokens.get(&token).map(|state| &state.info)
    }

    pub fn balance_of(&self, token: Address, account: Address) -> U256 {
        self.tokens
            .get(&token)
            .map(|state| state.balance(&account))
            .unwrap_or_default()
    }

    pub fn total_supply(&self, token: Address) -> U256 {
        self.tokens
            .get(&token)
            .map(|state| state.total_supply)
            .unwrap_or_default()
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|state| state.allowances.get(&(owner, spender)).copied())
            .unwrap_or_default()
    }

    pub fn nonce(&self, token: Address, owner: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|state| state.nonces.get(&owner).copied())
            .unwrap_or_default()
    }

    pub fn native_balance(&self, account: Address) -> U256 {
        self.native.get(&account).copied().unwrap_or_default()
    }

    fn state_mut(&mut self, token: Address) -> Result<&mut TokenState> {
        self.tokens
            .get_mut(&token)
            .ok_or(AmmError::UnknownToken(token))
    }

    pub fn mint(
        &mut self,
        token: Address,
        to: Address,
        amount: U256,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let state = self.state_mut(token)?;
        state.total_supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(AmmError::AddOverflow)?;
        let balance = state.balance(&to);
        state.balances.insert(to, balance + amount);
        events.push(Event::Transfer {
            token,
            from: Address::zero(),
            to,
            value: amount,
        });
        Ok(())
    }

    pub fn burn(
        &mut self,
        token: Address,
        from: Address,
        amount: U256,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let state = self.state_mut(token)?;
        let remaining = state
            .balance(&from)
            .checked_sub(amount)
            .ok_or(AmmError::TransferFailed { token })?;
        state.balances.insert(from, remaining);
        state.total_supply -= amount;
        events.push(Event::Transfer {
            token,
            from,
            to: Address::zero(),
            value: amount,
        });
        Ok(())
    }

    pub fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        value: U256,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let state = self.state_mut(token)?;
        state.allowances.insert((owner, spender), value);
        events.push(Event::Approval {
            token,
            owner,
            spender,
            value,
        });
        Ok(())
    }

    /// Move `amount` from `from` to `to`; returns the amount credited
    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
        events: &mut Vec<Event>,
    ) -> Result<U256> {
        let state = self.state_mut(token)?;
        state
            .move_balance(token, from, to, amount, events)
            .map_err(|_| AmmError::TransferFailed { token })
    }

    /// Spend `spender`'s allowance over `from`. An allowance of `U256::MAX`
    /// is never decremented.
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
        events: &mut Vec<Event>,
    ) -> Result<U256> {
        let state = self.state_mut(token)?;
        let allowance = state
            .allowances
            .get(&(from, spender))
            .copied()
            .unwrap_or_default();
        if allowance != U256::MAX {
            let reduced = allowance
                .checked_sub(amount)
                .ok_or(AmmError::TransferFromFailed { token })?;
            state.allowances.insert((from, spender), reduced);
        }
        state
            .move_balance(token, from, to, amount, events)
            .map_err(|_| AmmError::TransferFromFailed { token })
    }

    /// Approve via an owner signature, consuming the owner's nonce
    pub fn permit(
        &mut self,
        token: Address,
        permit: &Permit,
        now: u64,
        chain_id: u64,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        if permit.deadline < U256::from(now) {
            return Err(AmmError::PermitExpired);
        }
        let state = self.state_mut(token)?;
        let nonce = state.nonces.get(&permit.owner).copied().unwrap_or_default();
        let separator = domain_separator(&state.info.name, chain_id, token);
        let digest = permit_digest(separator, &permit.message(nonce));
        let signer = recover_signer(digest, &permit.signature)?;
        if signer != permit.owner {
            return Err(AmmError::InvalidSignature);
        }

        state.nonces.insert(permit.owner, nonce + 1);
        self.approve(token, permit.owner, permit.spender, permit.value, events)
    }

    /// Credit native currency out of thin air
    pub fn credit_native(&mut self, account: Address, amount: U256) -> Result<()> {
        let balance = self.native_balance(account);
        let credited = balance.checked_add(amount).ok_or(AmmError::AddOverflow)?;
        self.native.insert(account, credited);
        Ok(())
    }

    pub fn transfer_native(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        let remaining = self
            .native_balance(from)
            .checked_sub(amount)
            .ok_or(AmmError::EthTransferFailed)?;
        self.native.insert(from, remaining);
        let balance = self.native_balance(to);
        self.native.insert(to, balance + amount);
        Ok(())
    }

    /// Wrap `amount` of `account`'s native balance into `weth`
    pub fn deposit(
        &mut self,
        weth: Address,
        account: Address,
        amount: U256,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        self.ensure_wrapped(weth)?;
        self.transfer_native(account, weth, amount)?;
        let state = self.state_mut(weth)?;
        let balance = state.balance(&account);
        state.balances.insert(account, balance + amount);
        state.total_supply += amount;
        events.push(Event::Deposit {
            token: weth,
            dst: account,
            wad: amount,
        });
        Ok(())
    }

    /// Unwrap `amount` of `account`'s `weth` back to native currency
    pub fn withdraw(
        &mut self,
        weth: Address,
        account: Address,
        amount: U256,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        self.ensure_wrapped(weth)?;
        let state = self.state_mut(weth)?;
        let remaining = state
            .balance(&account)
            .checked_sub(amount)
            .ok_or(AmmError::TransferFailed { token: weth })?;
        state.balances.insert(account, remaining);
        state.total_supply -= amount;
        self.transfer_native(weth, account, amount)?;
        events.push(Event::Withdrawal {
            token: weth,
            src: account,
            wad: amount,
        });
        Ok(())
    }

    fn ensure_wrapped(&self, token: Address) -> Result<()> {
        match self.info(token) {
            Some(info) if info.kind == TokenKind::Wrapped => Ok(()),
            _ => Err(AmmError::UnknownToken(token)),
        }
    }
}
