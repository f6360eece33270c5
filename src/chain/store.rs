// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use ahash::HashMap;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use tracing::{debug, info};

use super::{Error, Receipt};
use crate::blocks::{Block, ChainEpoch};
use crate::db;

/// Append-only block history plus the receipts of every committed message.
/// Blocks are indexed by epoch: position `i` in the chain is the block at
/// epoch `i`, starting from genesis at 0.
pub struct ChainStore<DB> {
    db: Arc<DB>,
    blocks: Vec<Arc<Block>>,
    /// Message CID to receipt, for every message in a live block.
    receipts: HashMap<Cid, Receipt>,
}

impl<DB: Blockstore> ChainStore<DB> {
    /// Persists the genesis block and starts the chain from it.
    pub fn new(db: Arc<DB>, genesis: Block) -> anyhow::Result<Self> {
        db::put_cbor(&*db, &genesis.header)?;
        Ok(Self {
            db,
            blocks: vec![Arc::new(genesis)],
            receipts: HashMap::default(),
        })
    }

    pub fn genesis(&self) -> &Arc<Block> {
        // The chain always holds at least genesis; truncation never drops it.
        &self.blocks[0]
    }

    /// The current tip of the chain.
    pub fn heaviest(&self) -> &Arc<Block> {
        self.blocks.last().expect("chain never empty")
    }

    pub fn head_epoch(&self) -> ChainEpoch {
        self.heaviest().epoch()
    }

    pub fn block_at(&self, epoch: ChainEpoch) -> Option<&Arc<Block>> {
        usize::try_from(epoch).ok().and_then(|i| self.blocks.get(i))
    }

    /// Appends the next block. The block must extend the current head by
    /// exactly one epoch and reference it as its sole parent.
    pub fn append(
        &mut self,
        block: Block,
        receipts: Vec<(Cid, Receipt)>,
    ) -> Result<Arc<Block>, Error> {
        let head = self.heaviest();
        let expected = head.epoch() + 1;
        if block.epoch() != expected {
            return Err(Error::Sequence {
                expected,
                found: block.epoch(),
            });
        }
        if block.header.parents.cids() != [head.cid()] {
            return Err(Error::ParentMismatch);
        }

        db::put_cbor(&*self.db, &block.header)?;
        for msg in block.messages() {
            db::put_cbor(&*self.db, msg)?;
        }
        let block = Arc::new(block);
        debug!(epoch = block.epoch(), cid = %block.cid(), msgs = block.messages().len(), "appended block");
        self.blocks.push(Arc::clone(&block));
        self.receipts.extend(receipts);
        Ok(block)
    }

    /// Discards every block above `epoch` along with the receipts recorded in
    /// them. Used by revert; the discarded headers stay in the blockstore but
    /// become unreachable from the chain.
    pub fn truncate_to(&mut self, epoch: ChainEpoch) -> Result<(), Error> {
        if epoch < 0 || epoch > self.head_epoch() {
            return Err(Error::Range(epoch));
        }
        let keep = epoch as usize + 1;
        let discarded = self.blocks.len() - keep;
        self.blocks.truncate(keep);
        self.receipts.retain(|_, receipt| receipt.epoch <= epoch);
        if discarded > 0 {
            info!(epoch, discarded, "truncated chain");
        }
        Ok(())
    }

    /// Receipt for a committed message. Absent after the owning block was
    /// truncated; that is an expected outcome, not an error.
    pub fn receipt(&self, msg_cid: &Cid) -> Option<&Receipt> {
        self.receipts.get(msg_cid)
    }
}
