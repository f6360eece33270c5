// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The ledger facade. One mutex guards the chain, the state store, the
//! checkpoint stack and the deal ledger as a single unit: a revert touches
//! all of them and must never observe a partially applied block.

use std::sync::Arc;

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use itertools::Itertools as _;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::blocks::{Block, BlockHeader, ChainEpoch};
use crate::chain::{ChainStore, Receipt};
use crate::db::MemoryDB;
use crate::deals::{DealId, DealLedger, DealProposal, DealState};
use crate::events::{ChainEvent, EventBus};
use crate::interpreter::{Executor, TransferExecutor};
use crate::lifecycle::{LifecycleController, NullSidecar, SidecarService};
use crate::message::{Address, Message, TokenAmount};
use crate::mining::MiningMode;
use crate::snapshot::SnapshotManager;
use crate::state::{ActorState, StateStore};

/// Construction-time settings. Everything else about the ledger is fixed.
#[derive(Clone, Debug)]
pub struct DevnetConfig {
    pub mode: MiningMode,
    /// Accounts funded in the genesis state tree.
    pub genesis_accounts: Vec<(Address, TokenAmount)>,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            mode: MiningMode::Auto,
            genesis_accounts: Vec::new(),
        }
    }
}

/// All mutable ledger state, guarded as one unit.
pub(crate) struct Ledger<DB> {
    chain: ChainStore<DB>,
    state: StateStore<DB>,
    snapshots: SnapshotManager,
    deals: DealLedger,
    mempool: Vec<Message>,
    executor: Arc<dyn Executor>,
    events: EventBus,
    /// Set when an invariant break aborted a mutation mid-way. Every later
    /// mutation fails; only a process restart recovers.
    poisoned: bool,
}

impl<DB: Blockstore> Ledger<DB> {
    fn ensure_usable(&self) -> anyhow::Result<()> {
        if self.poisoned {
            anyhow::bail!("ledger poisoned by an earlier invariant failure");
        }
        Ok(())
    }

    /// Produces `count` blocks off the current tip, each consuming whatever
    /// the mempool holds at that point. Either all requested blocks land or
    /// the ledger is poisoned; a block is never partially applied.
    pub(crate) fn produce_blocks(&mut self, count: u64) -> anyhow::Result<()> {
        self.ensure_usable()?;
        for _ in 0..count {
            if let Err(e) = self.produce_one() {
                self.poisoned = true;
                error!("block production failed, ledger poisoned: {e:#}");
                return Err(e);
            }
        }
        Ok(())
    }

    fn produce_one(&mut self) -> anyhow::Result<ChainEpoch> {
        let messages = std::mem::take(&mut self.mempool);
        let mut outputs = Vec::with_capacity(messages.len());
        for msg in &messages {
            let out = self.executor.execute(msg, &self.state)?;
            if !out.exit_code.is_success() {
                debug!(msg = %msg.cid(), code = out.exit_code.0, "message execution failed");
            }
            self.state.apply(&out.writes)?;
            outputs.push((msg.cid(), out));
        }
        let state_root = self.state.commit()?;

        let header = BlockHeader::next(
            self.chain.heaviest().header(),
            state_root,
            messages.iter().map(Message::cid).collect_vec(),
        );
        let block = Block { header, messages };
        let block_cid = block.cid();
        let epoch = block.epoch();
        let receipts = outputs
            .into_iter()
            .map(|(msg_cid, out)| {
                (
                    msg_cid,
                    Receipt {
                        exit_code: out.exit_code,
                        return_data: out.return_data,
                        block: block_cid,
                        epoch,
                    },
                )
            })
            .collect();
        self.chain.append(block, receipts)?;

        for (id, state) in self.deals.advance_all() {
            self.events.publish(ChainEvent::DealStateChanged { id, state });
        }
        self.events.publish(ChainEvent::BlockProduced { epoch });
        info!(epoch, "produced block");
        Ok(epoch)
    }

    fn snapshot(&mut self) -> u64 {
        self.snapshots.snapshot(
            self.chain.head_epoch(),
            self.state.checkpoint(),
            self.deals.clone(),
        )
    }

    /// Reverts to checkpoint `id`. The chain, the state store and the deal
    /// ledger are all restored before this returns; no event is published
    /// for a revert.
    fn revert(&mut self, id: u64) -> bool {
        if self.poisoned {
            return false;
        }
        let Some(checkpoint) = self.snapshots.take(id) else {
            debug!(id, "revert refused: id unknown, consumed or invalidated");
            return false;
        };
        let restored = self
            .chain
            .truncate_to(checkpoint.chain_epoch)
            .map_err(anyhow::Error::from)
            .and_then(|()| self.state.restore(checkpoint.state));
        match restored {
            Ok(()) => {
                self.deals = checkpoint.deals;
                info!(id, epoch = checkpoint.chain_epoch, "reverted to checkpoint");
                true
            }
            Err(e) => {
                self.poisoned = true;
                error!("revert failed, ledger poisoned: {e:#}");
                false
            }
        }
    }
}

/// A single-node development ledger. Clone-free: share it behind an `Arc` if
/// multiple tasks submit to it.
pub struct Devnet<DB = MemoryDB>
where
    DB: Blockstore + Send + Sync + 'static,
{
    ledger: Arc<Mutex<Ledger<DB>>>,
    events: EventBus,
    mode: MiningMode,
    lifecycle: LifecycleController,
}

impl Devnet<MemoryDB> {
    /// Fully in-memory ledger with the built-in transfer engine and no
    /// sidecar process.
    pub fn in_memory(config: DevnetConfig) -> anyhow::Result<Self> {
        Self::new(
            Arc::new(MemoryDB::default()),
            config,
            Arc::new(TransferExecutor),
            Arc::new(NullSidecar),
        )
    }
}

impl<DB> Devnet<DB>
where
    DB: Blockstore + Send + Sync + 'static,
{
    /// Builds the genesis state and block synchronously. Nothing is spawned
    /// until [`Devnet::start`].
    pub fn new(
        db: Arc<DB>,
        config: DevnetConfig,
        executor: Arc<dyn Executor>,
        sidecar: Arc<dyn SidecarService>,
    ) -> anyhow::Result<Self> {
        let mut state = StateStore::new(Arc::clone(&db))?;
        for (addr, balance) in &config.genesis_accounts {
            state.set_actor(
                *addr,
                ActorState {
                    balance: *balance,
                    ..Default::default()
                },
            );
        }
        let genesis_root = state.commit()?;
        let genesis = Block {
            header: BlockHeader::genesis(genesis_root),
            messages: Vec::new(),
        };
        info!(cid = %genesis.cid(), accounts = config.genesis_accounts.len(), "built genesis block");
        let chain = ChainStore::new(db, genesis)?;

        let events = EventBus::default();
        let ledger = Ledger {
            chain,
            state,
            snapshots: SnapshotManager::default(),
            deals: DealLedger::default(),
            mempool: Vec::new(),
            executor,
            events: events.clone(),
            poisoned: false,
        };
        Ok(Self {
            ledger: Arc::new(Mutex::new(ledger)),
            events,
            mode: config.mode,
            lifecycle: LifecycleController::new(sidecar),
        })
    }

    /// Brings up the sidecar and, in interval mode, arms the mining timer.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        self.lifecycle
            .start(Arc::downgrade(&self.ledger), self.mode, self.events.clone());
    }

    pub async fn wait_until_ready(&self) -> anyhow::Result<()> {
        self.lifecycle.wait_until_ready().await
    }

    /// Cancels the mining timer and shuts the sidecar down. Safe to call
    /// even if `start` was never invoked.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.lifecycle.stop().await
    }

    /// Accepts a message. In automine mode this immediately produces a block
    /// containing just this message; otherwise the message waits for the
    /// next tick or explicit production request.
    pub fn submit_message(&self, msg: Message) -> anyhow::Result<Cid> {
        let mut ledger = self.ledger.lock();
        ledger.ensure_usable()?;
        let cid = msg.cid();
        ledger.mempool.push(msg);
        if self.mode == MiningMode::Auto {
            ledger.produce_blocks(1)?;
        }
        Ok(cid)
    }

    /// Receipt of a committed message, or `None` if it was never committed
    /// or its block was discarded by a revert.
    pub fn receipt(&self, msg_cid: &Cid) -> Option<Receipt> {
        self.ledger.lock().chain.receipt(msg_cid).cloned()
    }

    /// Captures a checkpoint over the whole ledger and returns its id.
    pub fn snapshot(&self) -> u64 {
        self.ledger.lock().snapshot()
    }

    /// Reverts to a checkpoint. Fails closed with `false`, never an error,
    /// for negative, never-issued, consumed or cascade-invalidated ids.
    pub fn revert(&self, id: i64) -> bool {
        let Ok(id) = u64::try_from(id) else {
            return false;
        };
        self.ledger.lock().revert(id)
    }

    /// Explicit block production. The workhorse of manual mode, but valid in
    /// any mode; each block consumes the mempool as it stands.
    pub fn produce_blocks(&self, count: u64) -> anyhow::Result<()> {
        self.ledger.lock().produce_blocks(count)
    }

    /// Registers a storage deal. In automine mode the registration drives
    /// block production until this deal reaches a terminal state, advancing
    /// unrelated deals only once per actual block.
    pub fn register_deal(&self, proposal: DealProposal) -> anyhow::Result<DealId> {
        let mut ledger = self.ledger.lock();
        ledger.ensure_usable()?;
        let epoch = ledger.chain.head_epoch();
        let id = ledger.deals.register(proposal, epoch);
        if self.mode == MiningMode::Auto {
            while !ledger
                .deals
                .state(id)
                .is_some_and(DealState::is_terminal)
            {
                ledger.produce_blocks(1)?;
            }
        }
        Ok(id)
    }

    pub fn deal_state(&self, id: DealId) -> Option<DealState> {
        self.ledger.lock().deals.state(id)
    }

    /// Moves a deal into the absorbing `Failed` state, for hosts whose
    /// off-chain validation of the proposal falls through. Returns `false`
    /// if the deal is unknown or already terminal.
    pub fn fail_deal(&self, id: DealId) -> bool {
        let mut ledger = self.ledger.lock();
        if ledger.poisoned {
            return false;
        }
        let Some((id, state)) = ledger.deals.fail(id) else {
            return false;
        };
        ledger.events.publish(ChainEvent::DealStateChanged { id, state });
        true
    }

    pub fn balance(&self, addr: &Address) -> anyhow::Result<TokenAmount> {
        Ok(self
            .ledger
            .lock()
            .state
            .actor(addr)?
            .map(|state| state.balance)
            .unwrap_or_default())
    }

    pub fn head_epoch(&self) -> ChainEpoch {
        self.ledger.lock().chain.head_epoch()
    }

    pub fn genesis_cid(&self) -> Cid {
        self.ledger.lock().chain.genesis().cid()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChainEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests;
