// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;

use super::{BlockHeader, ChainEpoch};
use crate::message::Message;

/// A complete block: the header plus the messages it committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub messages: Vec<Message>,
}

impl Block {
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the block header's CID.
    pub fn cid(&self) -> Cid {
        self.header.cid()
    }

    pub fn epoch(&self) -> ChainEpoch {
        self.header.epoch
    }
}

impl std::hash::Hash for Block {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.cid(), state)
    }
}
