//! CREATE address derivation.
//!
//! A contract deployed by a creation transaction lands at an address that is
//! fully determined by the creator account and its nonce at send time:
//! the low 20 bytes of `keccak256(rlp([creator, nonce]))`.

use alloy_primitives::{keccak256, Address};
use alloy_rlp::{Encodable, Header};

/// Computes the address a contract is deployed at when `creator` sends a
/// creation transaction with the given account `nonce`.
pub fn contract_address(creator: Address, nonce: u64) -> Address {
    let mut payload = Vec::with_capacity(creator.length() + nonce.length());
    creator.encode(&mut payload);
    nonce.encode(&mut payload);

    let mut preimage = Vec::with_capacity(payload.len() + 2);
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(&mut preimage);
    preimage.extend_from_slice(&payload);

    Address::from_slice(&keccak256(&preimage)[12..])
}

/// A freshly deployed contract observed in a creation transaction, before any
/// classification has happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateContract {
    /// Where the contract was deployed.
    pub address: Address,
    /// Account that sent the creation transaction.
    pub creator: Address,
    /// The creator's nonce at send time.
    pub creator_nonce: u64,
}

impl CandidateContract {
    pub fn derive(creator: Address, creator_nonce: u64) -> Self {
        Self {
            address: contract_address(creator, creator_nonce),
            creator,
            creator_nonce,
        }
    }
}
