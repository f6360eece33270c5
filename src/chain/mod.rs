// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod store;

pub use store::ChainStore;

use cid::Cid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blocks::ChainEpoch;
use crate::interpreter::ExitCode;

/// Chain store errors. `Sequence` is an internal invariant break and is fatal
/// to the mutation path; callers must not swallow it.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("non-contiguous block append: expected epoch {expected}, got {found}")]
    Sequence {
        expected: ChainEpoch,
        found: ChainEpoch,
    },
    #[error("block parents do not reference the current head")]
    ParentMismatch,
    #[error("epoch {0} is out of chain range")]
    Range(ChainEpoch),
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

/// Outcome of one executed message, pinned to the block that committed it. A
/// receipt becomes unreachable when its block is discarded by a revert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub exit_code: ExitCode,
    pub return_data: Vec<u8>,
    /// CID of the block this receipt was committed in.
    pub block: Cid,
    pub epoch: ChainEpoch,
}
