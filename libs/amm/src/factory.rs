//! Pair registry and protocol-fee administration

use std::collections::HashMap;

use ethers_core::types::{Address, H256};
use tidepool_config::FactorySettings;
use tracing::info;

use crate::chain::Chain;
use crate::error::{AmmError, Result};
use crate::events::Event;
use crate::ledger::TokenInfo;
use crate::pair::Pair;
use crate::v2_math::{SwapFee, V2Math};

#[derive(Debug, Clone)]
pub struct Factory {
    address: Address,
    name: String,
    fee_to: Address,
    fee_to_setter: Address,
    swap_fee: SwapFee,
    protocol_fee_denominator: u32,
    init_code_hash: H256,
    pairs_by_tokens: HashMap<(Address, Address), Address>,
    all_pairs: Vec<Address>,
}

impl Factory {
    pub fn from_settings(settings: &FactorySettings, fee_to_setter: Address) -> Result<Self> {
        Ok(Self {
            address: settings.address,
            name: settings.name.clone(),
            fee_to: Address::zero(),
            fee_to_setter,
            swap_fee: SwapFee::from_bps(settings.swap_fee_bps)?,
            protocol_fee_denominator: settings.protocol_fee_denominator,
            init_code_hash: settings.init_code_hash,
            pairs_by_tokens: HashMap::new(),
            all_pairs: Vec::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Protocol fee recipient; zero means the fee is off
    pub fn fee_to(&self) -> Address {
        self.fee_to
    }

    pub fn fee_to_setter(&self) -> Address {
        self.fee_to_setter
    }

    pub fn swap_fee(&self) -> SwapFee {
        self.swap_fee
    }

    pub fn protocol_fee_denominator(&self) -> u32 {
        self.protocol_fee_denominator
    }

    pub fn init_code_hash(&self) -> H256 {
        self.init_code_hash
    }

    /// Pair for the two tokens in either order, if created
    pub fn get_pair(&self, token_a: Address, token_b: Address) -> Option<Address> {
        self.pairs_by_tokens.get(&(token_a, token_b)).copied()
    }

    pub fn all_pairs(&self) -> &[Address] {
        &self.all_pairs
    }

    pub fn all_pairs_length(&self) -> usize {
        self.all_pairs.len()
    }

    /// Address a pair for these tokens has (or will have) under this factory
    pub fn pair_for(&self, token_a: Address, token_b: Address) -> Result<Address> {
        V2Math::pair_for(self.address, self.init_code_hash, token_a, token_b)
    }
}

impl Chain {
    pub fn deploy_factory(
        &mut self,
        settings: &FactorySettings,
        fee_to_setter: Address,
    ) -> Result<Address> {
        if self.factories.contains_key(&settings.address) {
            return Err(AmmError::FactoryExists(settings.address));
        }
        let factory = Factory::from_settings(settings, fee_to_setter)?;
        info!(
            name = %factory.name,
            address = ?factory.address,
            swap_fee_bps = factory.swap_fee.bps(),
            "factory deployed"
        );
        self.factories.insert(factory.address, factory);
        Ok(settings.address)
    }

    pub fn factory(&self, factory: Address) -> Option<&Factory> {
        self.factories.get(&factory)
    }

    pub(crate) fn factory_ref(&self, factory: Address) -> Result<&Factory> {
        self.factories
            .get(&factory)
            .ok_or(AmmError::FactoryNotFound(factory))
    }

    fn factory_mut(&mut self, factory: Address) -> Result<&mut Factory> {
        self.factories
            .get_mut(&factory)
            .ok_or(AmmError::FactoryNotFound(factory))
    }

    /// Deploy the pair for two tokens at its deterministic address
    pub fn create_pair(
        &mut self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Address> {
        self.atomically(|chain| chain.execute_create_pair(factory, token_a, token_b))
    }

    pub(crate) fn execute_create_pair(
        &mut self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Address> {
        let (token0, token1) = V2Math::sort_tokens(token_a, token_b)?;
        let registry = self.factory_ref(factory)?;
        if registry.get_pair(token0, token1).is_some() {
            return Err(AmmError::PairExists);
        }
        let pair = registry.pair_for(token0, token1)?;
        let swap_fee = registry.swap_fee;
        if self.pairs.contains_key(&pair) {
            return Err(AmmError::PairExists);
        }

        self.ledger.register(pair, TokenInfo::pool_share())?;
        self.pairs
            .insert(pair, Pair::new(pair, factory, token0, token1, swap_fee));

        let registry = self.factory_mut(factory)?;
        registry.pairs_by_tokens.insert((token0, token1), pair);
        registry.pairs_by_tokens.insert((token1, token0), pair);
        registry.all_pairs.push(pair);
        let index = registry.all_pairs.len() as u64;

        self.events.push(Event::PairCreated {
            factory,
            token0,
            token1,
            pair,
            index,
        });
        info!(?factory, ?token0, ?token1, ?pair, index, "pair created");
        Ok(pair)
    }

    pub fn set_fee_to(&mut self, caller: Address, factory: Address, fee_to: Address) -> Result<()> {
        let registry = self.factory_mut(factory)?;
        if caller != registry.fee_to_setter {
            return Err(AmmError::Forbidden);
        }
        registry.fee_to = fee_to;
        Ok(())
    }

    pub fn set_fee_to_setter(
        &mut self,
        caller: Address,
        factory: Address,
        fee_to_setter: Address,
    ) -> Result<()> {
        let registry = self.factory_mut(factory)?;
        if caller != registry.fee_to_setter {
            return Err(AmmError::Forbidden);
        }
        registry.fee_to_setter = fee_to_setter;
        Ok(())
    }
}
