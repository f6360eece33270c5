// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Storage deals negotiated off-chain. A deal's lifecycle is pinned to block
//! height: every produced block advances each pending deal by exactly one
//! step, independent of the message that created it.

use ahash::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blocks::ChainEpoch;
use crate::message::Address;

pub type DealId = u64;

/// Deal lifecycle. `Failed` absorbs from any non-terminal state; the ledger
/// itself only walks the happy path, but an execution engine may fail a deal
/// through [`DealLedger::fail`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealState {
    Proposed,
    Validating,
    Staged,
    Active,
    Failed,
}

impl DealState {
    /// Blocks needed to take a fresh deal to `Active`.
    pub const PIPELINE_STEPS: u64 = 3;

    pub fn next(self) -> DealState {
        match self {
            DealState::Proposed => DealState::Validating,
            DealState::Validating => DealState::Staged,
            DealState::Staged => DealState::Active,
            terminal => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DealState::Active | DealState::Failed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealProposal {
    pub client: Address,
    pub provider: Address,
    pub piece_size: u64,
    pub label: String,
}

#[derive(Clone, Debug)]
pub struct Deal {
    pub id: DealId,
    pub proposal: DealProposal,
    pub state: DealState,
    pub created_at: ChainEpoch,
}

/// All deals ever registered, plus the pending set of those not yet terminal.
/// Cloned wholesale into checkpoints; a revert swaps the whole ledger back.
#[derive(Clone, Debug, Default)]
pub struct DealLedger {
    deals: HashMap<DealId, Deal>,
    /// Ids of non-terminal deals, in registration order.
    pending: Vec<DealId>,
    next_id: DealId,
}

impl DealLedger {
    pub fn register(&mut self, proposal: DealProposal, epoch: ChainEpoch) -> DealId {
        self.next_id += 1;
        let id = self.next_id;
        debug!(id, client = %proposal.client, provider = %proposal.provider, "registered deal");
        self.deals.insert(
            id,
            Deal {
                id,
                proposal,
                state: DealState::Proposed,
                created_at: epoch,
            },
        );
        self.pending.push(id);
        id
    }

    pub fn state(&self, id: DealId) -> Option<DealState> {
        self.deals.get(&id).map(|deal| deal.state)
    }

    pub fn deal(&self, id: DealId) -> Option<&Deal> {
        self.deals.get(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Advances every pending deal by one step. Called exactly once per
    /// produced block. Returns the transitions to publish; deals reaching a
    /// terminal state leave the pending set but are not destroyed.
    pub fn advance_all(&mut self) -> Vec<(DealId, DealState)> {
        let mut changes = Vec::with_capacity(self.pending.len());
        self.pending.retain(|id| {
            let deal = self
                .deals
                .get_mut(id)
                .expect("pending deal missing from ledger");
            deal.state = deal.state.next();
            changes.push((*id, deal.state));
            !deal.state.is_terminal()
        });
        changes
    }

    /// Moves a deal into the absorbing `Failed` state. Returns the transition
    /// to publish, or `None` if the deal is unknown or already terminal.
    pub fn fail(&mut self, id: DealId) -> Option<(DealId, DealState)> {
        let deal = self.deals.get_mut(&id)?;
        if deal.state.is_terminal() {
            return None;
        }
        deal.state = DealState::Failed;
        self.pending.retain(|pending| *pending != id);
        Some((id, DealState::Failed))
    }
}
