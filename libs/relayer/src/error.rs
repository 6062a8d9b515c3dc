//! Relayer revert reasons

use thiserror::Error;
use tidepool_amm::AmmError;
use tidepool_oracle::OracleError;

pub type Result<T, E = RelayerError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayerError {
    /// Router, pair or ledger failure during escrow or execution
    #[error(transparent)]
    Amm(#[from] AmmError),

    /// Sample creation, update or consult failure
    #[error(transparent)]
    Oracle(#[from] OracleError),

    // Order placement
    #[error("DXswapRelayer: INVALID_FACTORY")]
    InvalidFactory,

    #[error("DXswapRelayer: CALLER_NOT_OWNER")]
    CallerNotOwner,

    #[error("DXswapRelayer: INVALID_PAIR")]
    InvalidPair,

    #[error("DXswapRelayer: INVALID_TOKEN_ORDER")]
    InvalidTokenOrder,

    #[error("DXswapRelayer: INVALID_TOKEN_AMOUNT")]
    InvalidTokenAmount,

    #[error("DXswapRelayer: INVALID_LIQUIDITY_AMOUNT")]
    InvalidLiquidityAmount,

    #[error("DXswapRelayer: INVALID_TOLERANCE")]
    InvalidTolerance,

    #[error("DXswapRelayer: INVALID_WINDOW_TIME")]
    InvalidWindowTime,

    // Order lifecycle
    #[error("DXswapRelayer: INVALID_ORDER")]
    InvalidOrder,

    #[error("DXswapRelayer: DEADLINE_REACHED")]
    DeadlineReached,

    #[error("DXswapRelayer: DEADLINE_NOT_REACHED")]
    DeadlineNotReached,

    #[error("DXswapRelayer: OBSERVATION_ENDED")]
    ObservationEnded,

    #[error("DXswapRelayer: OBSERVATION_RUNNING")]
    ObservationRunning,

    /// Oracle pair reserves below the order's minimums
    #[error("DXswapRelayer: RESERVE_TO_LOW")]
    ReserveTooLow,

    #[error("DXswapRelayer: ORDER_EXECUTED")]
    OrderExecuted,

    #[error("DXswapRelayer: ORDER_WITHDRAWN")]
    OrderWithdrawn,
}

impl RelayerError {
    /// Reason tag without the contract prefix
    pub fn reason(&self) -> String {
        match self {
            Self::Amm(inner) => inner.reason(),
            Self::Oracle(inner) => inner.reason(),
            other => {
                let text = other.to_string();
                match text.split_once(": ") {
                    Some((_, tail)) => tail.to_string(),
                    None => text,
                }
            }
        }
    }
}
