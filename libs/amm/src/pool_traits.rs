//! Trait seams between pools, quoting math and external contracts

use ethers_core::types::{Address, U256};

use crate::chain::Chain;
use crate::error::Result;
use crate::v2_math::SwapFee;

/// Anything that can report pair reserves for path quoting
pub trait ReserveSource {
    /// `(reserve_a, reserve_b, fee)` for the pair of `token_a`/`token_b`
    /// under `factory`, ordered the way the tokens were passed
    fn reserves(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<(U256, U256, SwapFee)>;
}

/// Recipient of a flash swap.
///
/// Invoked by the pair after optimistic transfers and before the invariant
/// check. The callee must leave enough input in the pair for the swap to
/// clear `K`; any error reverts the whole swap.
pub trait SwapCallee {
    fn uniswap_v2_call(
        &mut self,
        chain: &mut Chain,
        sender: Address,
        amount0: U256,
        amount1: U256,
        data: &[u8],
    ) -> Result<()>;
}
