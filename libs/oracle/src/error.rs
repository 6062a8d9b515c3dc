//! Oracle revert reasons

use thiserror::Error;
use tidepool_amm::AmmError;

pub type Result<T, E = OracleError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Pair or math failure while reading accumulators
    #[error(transparent)]
    Amm(#[from] AmmError),

    // Fixed-window oracle
    #[error("ExampleOracleSimple: ALREADY_INITIALIZED")]
    AlreadyInitialized,

    #[error("ExampleOracleSimple: NOT_INITIALIZED")]
    NotInitialized,

    #[error("ExampleOracleSimple: NO_RESERVES")]
    NoReserves,

    #[error("ExampleOracleSimple: PERIOD_NOT_ELAPSED")]
    PeriodNotElapsed,

    #[error("ExampleOracleSimple: INVALID_TOKEN")]
    InvalidToken,

    #[error("ExampleOracleSimple: NO_AVERAGE")]
    NoAverage,

    /// Configured period does not fit the 32-bit block clock
    #[error("ExampleOracleSimple: PERIOD_OUT_OF_RANGE")]
    PeriodOutOfRange,

    // Sliding-window oracle
    #[error("SlidingWindowOracle: GRANULARITY")]
    Granularity,

    #[error("SlidingWindowOracle: WINDOW_NOT_EVENLY_DIVISIBLE")]
    WindowNotEvenlyDivisible,

    /// The observation one window back is missing or too old
    #[error("SlidingWindowOracle: MISSING_HISTORICAL_OBSERVATION")]
    MissingHistoricalObservation,

    /// The observation one window back is too recent
    #[error("SlidingWindowOracle: UNEXPECTED_TIME_ELAPSED")]
    UnexpectedTimeElapsed,

    // Per-order samples
    #[error("OracleCreator: PERIOD_NOT_ELAPSED")]
    SamplePeriodNotElapsed,

    #[error("OracleCreator: FINISHED_OBSERVATION")]
    FinishedObservation,

    #[error("OracleCreator: CALLER_NOT_OWNER")]
    CallerNotOwner,

    #[error("OracleCreator: INVALID_TOKEN")]
    SampleInvalidToken,
}

impl OracleError {
    /// Reason tag without the contract prefix
    pub fn reason(&self) -> String {
        match self {
            Self::Amm(inner) => inner.reason(),
            other => {
                let text = other.to_string();
                match text.split_once(": ") {
                    Some((_, tail)) => tail.to_string(),
                    None => text,
                }
            }
        }
    }

    /// True for errors that clear up by waiting, as opposed to re-seeding
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PeriodNotElapsed | Self::SamplePeriodNotElapsed | Self::UnexpectedTimeElapsed
        )
    }
}
