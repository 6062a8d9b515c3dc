//! EIP-712 typed-data hashing for `permit` approvals

use ethers_core::abi::{encode, Token};
use ethers_core::types::{Address, Signature, H256, U256};
use ethers_core::utils::keccak256;
use once_cell::sync::Lazy;

use crate::error::{AmmError, Result};

pub static PERMIT_TYPEHASH: Lazy<H256> = Lazy::new(|| {
    H256::from(keccak256(
        "Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)",
    ))
});

static DOMAIN_TYPEHASH: Lazy<H256> = Lazy::new(|| {
    H256::from(keccak256(
        "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
    ))
});

/// Signed approval payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermitMessage {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub nonce: U256,
    pub deadline: U256,
}

/// A `permit` call: the approval plus the owner's signature over it.
/// The nonce is not carried; the token supplies its current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permit {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub deadline: U256,
    pub signature: Signature,
}

impl Permit {
    pub fn message(&self, nonce: U256) -> PermitMessage {
        PermitMessage {
            owner: self.owner,
            spender: self.spender,
            value: self.value,
            nonce,
            deadline: self.deadline,
        }
    }
}

/// Domain separator of a token named `name`, version "1"
pub fn domain_separator(name: &str, chain_id: u64, verifying_contract: Address) -> H256 {
    H256::from(keccak256(encode(&[
        Token::FixedBytes(DOMAIN_TYPEHASH.as_bytes().to_vec()),
        Token::FixedBytes(keccak256(name.as_bytes()).to_vec()),
        Token::FixedBytes(keccak256(b"1").to_vec()),
        Token::Uint(U256::from(chain_id)),
        Token::Address(verifying_contract),
    ])))
}

/// `keccak256(0x1901 ++ domain_separator ++ struct_hash)`
pub fn permit_digest(domain_separator: H256, message: &PermitMessage) -> H256 {
    let struct_hash = keccak256(encode(&[
        Token::FixedBytes(PERMIT_TYPEHASH.as_bytes().to_vec()),
        Token::Address(message.owner),
        Token::Address(message.spender),
        Token::Uint(message.value),
        Token::Uint(message.nonce),
        Token::Uint(message.deadline),
    ]));

    let mut preimage = Vec::with_capacity(66);
    preimage.extend_from_slice(b"\x19\x01");
    preimage.extend_from_slice(domain_separator.as_bytes());
    preimage.extend_from_slice(&struct_hash);
    H256::from(keccak256(preimage))
}

/// Signer of `digest`; the zero address is never a valid signer
pub fn recover_signer(digest: H256, signature: &Signature) -> Result<Address> {
    let signer = signature
        .recover(digest)
        .map_err(|_| AmmError::InvalidSignature)?;
    if signer.is_zero() {
        return Err(AmmError::InvalidSignature);
    }
    Ok(signer)
}
