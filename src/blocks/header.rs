// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_encoding::tuple::*;
use serde::{Deserialize, Serialize};

use super::{BLOCK_DELAY_SECS, ChainEpoch};

/// Ordered set of parent block references. The development ledger mines a
/// linear chain, so the key always holds exactly one CID past genesis and is
/// empty for genesis itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TipsetKey(pub Vec<Cid>);

impl TipsetKey {
    pub fn cids(&self) -> &[Cid] {
        &self.0
    }
}

impl From<Cid> for TipsetKey {
    fn from(cid: Cid) -> Self {
        Self(vec![cid])
    }
}

/// Immutable once produced. The header commits to the state root computed
/// after executing this block's messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct BlockHeader {
    /// The set of parents this block was based on. Always a single block,
    /// except for genesis which has none.
    pub parents: TipsetKey,
    pub epoch: ChainEpoch,
    /// The CID of the state tree after applying this block's messages.
    pub state_root: Cid,
    /// CIDs of the messages included in this block, in acceptance order.
    pub messages: Vec<Cid>,
    /// Derived from the epoch, in seconds since the genesis timestamp.
    pub timestamp: u64,
}

impl BlockHeader {
    pub fn genesis(state_root: Cid) -> Self {
        Self {
            parents: TipsetKey::default(),
            epoch: 0,
            state_root,
            messages: Vec::new(),
            timestamp: 0,
        }
    }

    /// Builds the header for the next block in the chain. All blocks chain
    /// linearly off the previous tip; there is no fork selection.
    pub fn next(parent: &BlockHeader, state_root: Cid, messages: Vec<Cid>) -> Self {
        let epoch = parent.epoch + 1;
        Self {
            parents: TipsetKey::from(parent.cid()),
            epoch,
            state_root,
            messages,
            timestamp: epoch as u64 * BLOCK_DELAY_SECS,
        }
    }

    pub fn cid(&self) -> Cid {
        self.car_block().0
    }

    pub fn car_block(&self) -> (Cid, Vec<u8>) {
        let data = fvm_ipld_encoding::to_vec(self).expect("CBOR serialization failed");
        (crate::db::dag_cbor_cid(&data), data)
    }
}
