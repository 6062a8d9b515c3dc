//! # Tidepool Centralized Configuration
//!
//! This crate provides the settings and defaults shared by every Tidepool
//! library crate, so that fee constants, oracle windows and relayer bounds
//! are declared once.
//!
//! ## Features
//!
//! - **Defaults**: Fee constants, oracle windows, relayer tolerance scale
//! - **Settings**: Serde structures for chain, factories, oracles and relayer
//! - **Loading**: TOML files with environment-specific and `TIDEPOOL_*` overrides
//! - **Logging**: `tracing-subscriber` initialisation driven by settings
//!
//! ## Usage
//!
//! ```rust
//! use tidepool_config::{defaults, SimulationConfig};
//!
//! let config = SimulationConfig::default();
//! assert_eq!(config.factories[0].swap_fee_bps, defaults::fees::SWAP_FEE_BPS);
//! assert!(config.validate().is_ok());
//! ```

pub mod defaults;
pub mod logging;
pub mod settings;

// Re-export commonly used types
pub use logging::init_logging;
pub use settings::{
    ChainSettings, FactorySettings, LoggingSettings, OracleSettings, RelayerSettings,
    SimulationConfig,
};
