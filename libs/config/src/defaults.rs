//! Default values and constants
//!
//! This module contains the default values used across the Tidepool crates
//! for consistency. Settings structs fall back to these when a key is absent.

/// Pair and factory defaults
pub mod fees {
    /// Denominator of every basis-point fee
    pub const BPS_DENOMINATOR: u32 = 10_000;

    /// Canonical swap fee, 0.30 %
    pub const SWAP_FEE_BPS: u32 = 30;

    /// Protocol takes 1 / (denominator + 1) of the fee growth
    pub const PROTOCOL_FEE_DENOMINATOR: u32 = 5;

    /// Init code hash used when deriving pair addresses via CREATE2
    pub const INIT_CODE_HASH: [u8; 32] =
        hex_literal::hex!("96e8ac4277198ff8b6f785478aa9a39f403cb768dd02cbee326c3e7da348845f");
}

/// Oracle defaults
pub mod oracle {
    /// Fixed-window oracle period (24 hours)
    pub const PERIOD_SECS: u64 = 86_400;

    /// Sliding-window oracle window (24 hours)
    pub const WINDOW_SIZE_SECS: u64 = 86_400;

    /// Observations kept per sliding window
    pub const GRANULARITY: u16 = 24;
}

/// Relayer defaults
pub mod relayer {
    /// Price tolerance scale; 10_000 is 1 %
    pub const PARTS_PER_MILLION: u64 = 1_000_000;

    /// Smallest accepted oracle sampling window
    pub const MIN_WINDOW_TIME_SECS: u64 = 1;
}

/// Chain defaults
pub mod chain {
    /// Mainnet chain id, used in permit domain separators
    pub const CHAIN_ID: u64 = 1;

    /// 1/1/2020 @ 12:00 am UTC
    pub const GENESIS_TIMESTAMP: u64 = 1_577_836_800;
}
