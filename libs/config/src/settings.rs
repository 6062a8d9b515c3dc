//! Simulation Settings Module
//!
//! Provides configuration loading and validation for a Tidepool simulation.
//! Supports loading from TOML files with environment-specific overrides.

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use ethers_core::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::defaults;

/// Main simulation configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Clock and chain identity
    pub chain: ChainSettings,

    /// One entry per deployed factory
    pub factories: Vec<FactorySettings>,

    /// Fixed and sliding window oracle parameters
    pub oracle: OracleSettings,

    /// Relayer bounds
    pub relayer: RelayerSettings,

    /// Log filter
    pub logging: LoggingSettings,
}

/// Chain identity and genesis clock
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ChainSettings {
    pub chain_id: u64,
    pub genesis_timestamp: u64,
}

/// Per-factory pool parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FactorySettings {
    pub name: String,
    pub address: Address,
    /// Fee charged on swap input, in basis points
    pub swap_fee_bps: u32,
    pub protocol_fee_denominator: u32,
    pub init_code_hash: H256,
}

/// Oracle parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct OracleSettings {
    /// Minimum seconds between fixed-window oracle updates
    pub period: u64,
    pub window_size: u64,
    pub granularity: u16,
}

/// Relayer bounds
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RelayerSettings {
    /// Scale of `price_tolerance`; tolerances above it are rejected
    pub parts_per_million: u64,
    pub min_window_time: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            chain: ChainSettings::default(),
            factories: vec![FactorySettings::default()],
            oracle: OracleSettings::default(),
            relayer: RelayerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            chain_id: defaults::chain::CHAIN_ID,
            genesis_timestamp: defaults::chain::GENESIS_TIMESTAMP,
        }
    }
}

impl Default for FactorySettings {
    fn default() -> Self {
        Self {
            name: "primary".to_string(),
            address: Address::from_low_u64_be(0xfac0),
            swap_fee_bps: defaults::fees::SWAP_FEE_BPS,
            protocol_fee_denominator: defaults::fees::PROTOCOL_FEE_DENOMINATOR,
            init_code_hash: H256::from(defaults::fees::INIT_CODE_HASH),
        }
    }
}

impl FactorySettings {
    /// Settings for a named factory at `address`, other fields defaulted
    pub fn named(name: &str, address: Address) -> Self {
        Self {
            name: name.to_string(),
            address,
            ..Self::default()
        }
    }

    pub fn with_swap_fee_bps(mut self, swap_fee_bps: u32) -> Self {
        self.swap_fee_bps = swap_fee_bps;
        self
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            period: defaults::oracle::PERIOD_SECS,
            window_size: defaults::oracle::WINDOW_SIZE_SECS,
            granularity: defaults::oracle::GRANULARITY,
        }
    }
}

impl Default for RelayerSettings {
    fn default() -> Self {
        Self {
            parts_per_million: defaults::relayer::PARTS_PER_MILLION,
            min_window_time: defaults::relayer::MIN_WINDOW_TIME_SECS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from files with environment overrides
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let base = base_path.unwrap_or(Path::new("config/tidepool.toml"));

        let mut builder = Config::builder().add_source(File::from(base).required(true));

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = base
                .parent()
                .unwrap_or(Path::new("."))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (TIDEPOOL_ prefix)
        builder = builder.add_source(
            Environment::with_prefix("TIDEPOOL")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!(factories = config.factories.len(), "configuration loaded");
        Ok(config)
    }

    /// Reject settings the simulator cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.factories.is_empty() {
            bail!("at least one factory must be configured");
        }
        for factory in &self.factories {
            if factory.swap_fee_bps >= defaults::fees::BPS_DENOMINATOR {
                bail!(
                    "factory {}: swap fee {} bps must be below {}",
                    factory.name,
                    factory.swap_fee_bps,
                    defaults::fees::BPS_DENOMINATOR
                );
            }
            if factory.protocol_fee_denominator == 0 {
                bail!("factory {}: protocol fee denominator must be non-zero", factory.name);
            }
        }
        if self.oracle.period == 0 {
            bail!("oracle period must be non-zero");
        }
        if self.oracle.period > u64::from(u32::MAX) {
            bail!("oracle period {} exceeds the 32-bit block clock", self.oracle.period);
        }
        if self.oracle.granularity == 0 {
            bail!("oracle granularity must be non-zero");
        }
        if self.relayer.parts_per_million == 0 {
            bail!("relayer tolerance scale must be non-zero");
        }
        Ok(())
    }

    /// Get settings for a specific factory
    pub fn factory(&self, name: &str) -> Option<&FactorySettings> {
        self.factories.iter().find(|f| f.name == name)
    }
}
