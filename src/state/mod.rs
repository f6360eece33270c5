// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Account and contract-storage state, layered over the durable blockstore.
//!
//! The committed state tree is a single DAG-CBOR object keyed by its CID (the
//! state root). Reads go through an LRU cache of per-actor entries; writes
//! buffer in a pending set until [`StateStore::commit`] persists a new root.
//! Restoring a checkpoint clears the read cache outright rather than rolling
//! it back: an entry populated after the capture point must not survive.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use lru::LruCache;
use nonzero_ext::nonzero;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::db;
use crate::interpreter::StateRead;
use crate::message::{Address, TokenAmount};

const DEFAULT_ACTOR_CACHE_SIZE: NonZeroUsize = nonzero!(1024usize);

/// Balance, nonce and raw key-value storage of a single actor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorState {
    pub balance: TokenAmount,
    pub sequence: u64,
    pub storage: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// One storage mutation produced by the execution engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateWrite {
    SetBalance {
        actor: Address,
        balance: TokenAmount,
    },
    BumpSequence {
        actor: Address,
    },
    PutStorage {
        actor: Address,
        key: Vec<u8>,
        value: Vec<u8>,
    },
}

/// Opaque capture of the store at a point in time: the committed root plus a
/// copy of the writes that were still pending. Enough to restore exactly, as
/// long as the committed tree itself remains reachable in the blockstore.
#[derive(Clone, Debug)]
pub struct StateCheckpoint {
    root: Cid,
    pending: BTreeMap<Address, ActorState>,
}

type StateTreeMap = BTreeMap<Address, ActorState>;

pub struct StateStore<DB> {
    db: Arc<DB>,
    /// Root of the last committed state tree.
    root: Cid,
    /// Actors mutated since the last commit.
    pending: BTreeMap<Address, ActorState>,
    /// Per-actor read cache over the committed tree. Entries are only valid
    /// for the current root and are flushed wholesale on restore.
    actor_cache: Mutex<LruCache<Address, Option<ActorState>>>,
}

impl<DB: Blockstore> StateStore<DB> {
    /// Creates a store with an empty committed tree.
    pub fn new(db: Arc<DB>) -> anyhow::Result<Self> {
        let root = db::put_cbor(&*db, &StateTreeMap::new())?;
        Ok(Self {
            db,
            root,
            pending: BTreeMap::new(),
            actor_cache: Mutex::new(LruCache::new(DEFAULT_ACTOR_CACHE_SIZE)),
        })
    }

    /// Root of the last committed tree. Pending writes are not reflected.
    pub fn root(&self) -> Cid {
        self.root
    }

    pub fn set_actor(&mut self, addr: Address, state: ActorState) {
        self.pending.insert(addr, state);
    }

    /// Current view of an actor: pending writes shadow committed state.
    pub fn actor(&self, addr: &Address) -> anyhow::Result<Option<ActorState>> {
        if let Some(state) = self.pending.get(addr) {
            return Ok(Some(state.clone()));
        }
        self.committed_actor(addr)
    }

    pub fn storage(&self, addr: &Address, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self
            .actor(addr)?
            .and_then(|state| state.storage.get(key).cloned()))
    }

    /// Applies execution output to the pending set.
    pub fn apply(&mut self, writes: &[StateWrite]) -> anyhow::Result<()> {
        for write in writes {
            match write {
                StateWrite::SetBalance { actor, balance } => {
                    let mut state = self.actor(actor)?.unwrap_or_default();
                    state.balance = *balance;
                    self.pending.insert(*actor, state);
                }
                StateWrite::BumpSequence { actor } => {
                    let mut state = self.actor(actor)?.unwrap_or_default();
                    state.sequence += 1;
                    self.pending.insert(*actor, state);
                }
                StateWrite::PutStorage { actor, key, value } => {
                    let mut state = self.actor(actor)?.unwrap_or_default();
                    state.storage.insert(key.clone(), value.clone());
                    self.pending.insert(*actor, state);
                }
            }
        }
        Ok(())
    }

    /// Merges pending writes into the committed tree, persists the result and
    /// returns the new state root. Committed entries are written through to
    /// the read cache so later reads stay coherent with the new root.
    pub fn commit(&mut self) -> anyhow::Result<Cid> {
        if self.pending.is_empty() {
            return Ok(self.root);
        }
        let mut tree = self.load_tree(&self.root)?;
        let committed = std::mem::take(&mut self.pending);
        let mut cache = self.actor_cache.lock();
        for (addr, state) in committed {
            cache.put(addr, Some(state.clone()));
            tree.insert(addr, state);
        }
        drop(cache);
        self.root = db::put_cbor(&*self.db, &tree)?;
        trace!(root = %self.root, actors = tree.len(), "committed state tree");
        Ok(self.root)
    }

    /// Captures the store. Cheap relative to commit frequency; taken only when
    /// a checkpoint is requested.
    pub fn checkpoint(&self) -> StateCheckpoint {
        StateCheckpoint {
            root: self.root,
            pending: self.pending.clone(),
        }
    }

    /// Restores the store to a captured point. Every read-cache entry is
    /// dropped, not rolled back: an entry could have been populated (or
    /// evicted and re-fetched) after the capture and would otherwise serve a
    /// stale value once the root moves backwards.
    pub fn restore(&mut self, checkpoint: StateCheckpoint) -> anyhow::Result<()> {
        if self.db.get(&checkpoint.root)?.is_none() {
            anyhow::bail!("state root {} is not in the blockstore", checkpoint.root);
        }
        self.root = checkpoint.root;
        self.pending = checkpoint.pending;
        self.actor_cache.lock().clear();
        debug!(root = %self.root, "restored state store");
        Ok(())
    }

    fn committed_actor(&self, addr: &Address) -> anyhow::Result<Option<ActorState>> {
        if let Some(state) = self.actor_cache.lock().get(addr) {
            return Ok(state.clone());
        }
        let tree = self.load_tree(&self.root)?;
        let state = tree.get(addr).cloned();
        self.actor_cache.lock().put(*addr, state.clone());
        Ok(state)
    }

    fn load_tree(&self, root: &Cid) -> anyhow::Result<StateTreeMap> {
        db::get_cbor(&*self.db, root)?
            .ok_or_else(|| anyhow::anyhow!("state root {root} is not in the blockstore"))
    }
}

impl<DB: Blockstore> StateRead for StateStore<DB> {
    fn actor(&self, addr: &Address) -> anyhow::Result<Option<ActorState>> {
        StateStore::actor(self, addr)
    }

    fn storage(&self, addr: &Address, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        StateStore::storage(self, addr, key)
    }
}
