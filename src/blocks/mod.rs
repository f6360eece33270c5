// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod block;
mod header;

pub use block::Block;
pub use header::{BlockHeader, TipsetKey};

/// Chain height. Blocks are appended one epoch at a time; there are no null
/// rounds on the development ledger.
pub type ChainEpoch = i64;

/// Seconds between consecutive epochs; block timestamps are derived from the
/// epoch so that chains replay deterministically.
pub const BLOCK_DELAY_SECS: u64 = 30;
