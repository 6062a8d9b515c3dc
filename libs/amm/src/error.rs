//! Revert reasons for pair, factory, router and library calls
//!
//! Every variant displays as the exact reason string the deployed contracts
//! revert with, so callers (tests, the relayer, tooling) can branch on either
//! the variant or the text.

use ethers_core::types::Address;
use thiserror::Error;

pub type Result<T, E = AmmError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    // Library (quoting, sorting, path handling)
    #[error("UniswapV2Library: INSUFFICIENT_AMOUNT")]
    InsufficientAmount,

    #[error("UniswapV2Library: INSUFFICIENT_LIQUIDITY")]
    InsufficientLiquidity,

    #[error("UniswapV2Library: INSUFFICIENT_INPUT_AMOUNT")]
    InsufficientInputAmount,

    #[error("UniswapV2Library: INSUFFICIENT_OUTPUT_AMOUNT")]
    InsufficientOutputAmount,

    #[error("UniswapV2Library: INVALID_PATH")]
    InvalidPath,

    #[error("UniswapV2Library: IDENTICAL_ADDRESSES")]
    IdenticalAddresses,

    #[error("UniswapV2Library: ZERO_ADDRESS")]
    ZeroAddress,

    // Pair
    #[error("UniswapV2: LOCKED")]
    Locked,

    /// Balance does not fit the 112-bit reserve slot
    #[error("UniswapV2: OVERFLOW")]
    ReserveOverflow,

    #[error("UniswapV2: INSUFFICIENT_LIQUIDITY_MINTED")]
    InsufficientLiquidityMinted,

    #[error("UniswapV2: INSUFFICIENT_LIQUIDITY_BURNED")]
    InsufficientLiquidityBurned,

    #[error("UniswapV2: INSUFFICIENT_OUTPUT_AMOUNT")]
    SwapInsufficientOutputAmount,

    #[error("UniswapV2: INSUFFICIENT_LIQUIDITY")]
    SwapInsufficientLiquidity,

    #[error("UniswapV2: INSUFFICIENT_INPUT_AMOUNT")]
    SwapInsufficientInputAmount,

    #[error("UniswapV2: INVALID_TO")]
    InvalidTo,

    #[error("UniswapV2: K")]
    K,

    #[error("UniswapV2: EXPIRED")]
    PermitExpired,

    #[error("UniswapV2: INVALID_SIGNATURE")]
    InvalidSignature,

    // Factory
    #[error("UniswapV2: PAIR_EXISTS")]
    PairExists,

    #[error("UniswapV2: FORBIDDEN")]
    Forbidden,

    #[error("UniswapV2: FORBIDDEN_FEE")]
    InvalidSwapFee(u32),

    // Router
    #[error("UniswapV2Router: EXPIRED")]
    Expired,

    #[error("UniswapV2Router: INVALID_PATH")]
    RouterInvalidPath,

    #[error("UniswapV2Router: INSUFFICIENT_A_AMOUNT")]
    InsufficientAAmount,

    #[error("UniswapV2Router: INSUFFICIENT_B_AMOUNT")]
    InsufficientBAmount,

    #[error("UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT")]
    RouterInsufficientOutputAmount,

    #[error("UniswapV2Router: EXCESSIVE_INPUT_AMOUNT")]
    ExcessiveInputAmount,

    // Swap-to-price and liquidity value helpers
    #[error("ExampleSwapToPrice: ZERO_PRICE")]
    ZeroPrice,

    #[error("ExampleSwapToPrice: ZERO_SPEND")]
    ZeroSpend,

    #[error("ExampleSwapToPrice: ZERO_AMOUNT_IN")]
    ZeroAmountIn,

    #[error("UniswapV2ArbitrageLibrary: ZERO_PAIR_RESERVES")]
    ZeroPairReserves,

    #[error("ComputeLiquidityValue: LIQUIDITY_AMOUNT")]
    LiquidityAmount,

    // Fixed point and checked math
    #[error("FixedPoint: DIV_BY_ZERO")]
    DivByZero,

    #[error("FixedPoint: MUL_OVERFLOW")]
    MulOverflow,

    #[error("ds-math-add-overflow")]
    AddOverflow,

    #[error("ds-math-sub-underflow")]
    SubUnderflow,

    #[error("ds-math-mul-overflow")]
    MathMulOverflow,

    #[error("FullMath: FULLDIV_OVERFLOW")]
    FullDivOverflow,

    // Token transfers
    #[error("TransferHelper: TRANSFER_FAILED (token {token:?})")]
    TransferFailed { token: Address },

    #[error("TransferHelper: TRANSFER_FROM_FAILED (token {token:?})")]
    TransferFromFailed { token: Address },

    #[error("TransferHelper: ETH_TRANSFER_FAILED")]
    EthTransferFailed,

    // Simulated host
    #[error("Ledger: UNKNOWN_TOKEN {0:?}")]
    UnknownToken(Address),

    #[error("Ledger: TOKEN_EXISTS {0:?}")]
    TokenExists(Address),

    #[error("Chain: PAIR_NOT_FOUND {0:?}")]
    PairNotFound(Address),

    #[error("Chain: FACTORY_NOT_FOUND {0:?}")]
    FactoryNotFound(Address),

    #[error("Chain: FACTORY_EXISTS {0:?}")]
    FactoryExists(Address),

    #[error("Chain: TIMESTAMP_IN_PAST (now {now}, requested {requested})")]
    TimestampInPast { now: u64, requested: u64 },
}

impl AmmError {
    /// Reason tag without the contract prefix, e.g. `K` or `INSUFFICIENT_AMOUNT`
    pub fn reason(&self) -> String {
        let text = self.to_string();
        let tail = match text.split_once(": ") {
            Some((_, tail)) => tail,
            None => text.as_str(),
        };
        tail.split(' ').next().unwrap_or(tail).to_string()
    }
}
