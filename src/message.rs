// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use cid::Cid;
use fvm_ipld_encoding::tuple::*;
use serde::{Deserialize, Serialize};

/// Token balances and transfer values. The development ledger deals in whole
/// test tokens, not atto-denominated big integers.
pub type TokenAmount = u64;

/// ID-addressed actor, the only address class the development ledger supports.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f0{}", self.0)
    }
}

/// A state-changing operation submitted to the ledger. Accepted messages are
/// committed into blocks in acceptance order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct Message {
    pub from: Address,
    pub to: Address,
    pub value: TokenAmount,
    /// Sender nonce; must match the sender actor state at execution time.
    pub sequence: u64,
    pub params: Vec<u8>,
}

impl Message {
    pub fn transfer(from: Address, to: Address, value: TokenAmount, sequence: u64) -> Self {
        Self {
            from,
            to,
            value,
            sequence,
            params: Vec::new(),
        }
    }

    /// Content identifier of the message. Serialization of these plain fields
    /// cannot fail.
    pub fn cid(&self) -> Cid {
        let data = fvm_ipld_encoding::to_vec(self).expect("CBOR serialization failed");
        crate::db::dag_cbor_cid(&data)
    }
}
