// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Named save-points over the whole ledger. Checkpoints form a stack: a
//! revert consumes its target and cascade-invalidates everything created
//! after it. Ids are issued in strictly increasing order and never reused,
//! so a stale or consumed id can always be told apart from an active one.

use tracing::{debug, trace};

use crate::blocks::ChainEpoch;
use crate::deals::DealLedger;
use crate::state::StateCheckpoint;

/// Everything needed to restore the ledger to the capture point. Owned by the
/// stack while active; handed to the caller when consumed by a revert.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    pub id: u64,
    /// Chain head epoch at capture time; revert truncates to it.
    pub chain_epoch: ChainEpoch,
    pub state: StateCheckpoint,
    pub deals: DealLedger,
}

#[derive(Default)]
pub struct SnapshotManager {
    /// Active checkpoints, ids strictly increasing from bottom to top.
    stack: Vec<Checkpoint>,
    last_id: u64,
}

impl SnapshotManager {
    /// Pushes a checkpoint and returns its id. Ids start at 1 and keep
    /// increasing across reverts; a consumed id is gone for good.
    pub fn snapshot(
        &mut self,
        chain_epoch: ChainEpoch,
        state: StateCheckpoint,
        deals: DealLedger,
    ) -> u64 {
        self.last_id += 1;
        let id = self.last_id;
        self.stack.push(Checkpoint {
            id,
            chain_epoch,
            state,
            deals,
        });
        debug!(id, chain_epoch, "captured checkpoint");
        id
    }

    /// Consumes the checkpoint `id` and every checkpoint created after it.
    /// Returns `None` when `id` was never issued, was already consumed, or
    /// was cascade-invalidated by an earlier revert; all three are expected
    /// outcomes, not errors.
    pub fn take(&mut self, id: u64) -> Option<Checkpoint> {
        let pos = self.stack.iter().position(|cp| cp.id == id)?;
        let mut consumed = self.stack.split_off(pos);
        let target = consumed.remove(0);
        for invalidated in &consumed {
            trace!(id = invalidated.id, "checkpoint cascade-invalidated");
        }
        Some(target)
    }

    pub fn active_count(&self) -> usize {
        self.stack.len()
    }
}
