// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Block-production scheduling. The mode is fixed at construction: automine
//! (a block per accepted message), interval (a timer batches messages), or
//! manual (blocks only on explicit request).

use std::sync::Weak;
use std::time::Duration;

use fvm_ipld_blockstore::Blockstore;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::devnet::Ledger;

/// When new blocks are produced. Modes are mutually exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MiningMode {
    /// Every accepted message immediately produces a block containing just
    /// that message.
    Auto,
    /// A repeating timer produces a block on a fixed cadence, batching all
    /// messages accepted since the last tick.
    Interval(Duration),
    /// Blocks are produced only on explicit request.
    Manual,
}

/// The interval-mode timer task. It holds only a weak reference to the
/// ledger, so it cannot keep the ledger alive; it is still explicitly
/// aborted on shutdown so no tick can mutate state afterwards.
pub(crate) struct IntervalMiner {
    handle: JoinHandle<()>,
}

impl IntervalMiner {
    pub(crate) fn spawn<DB>(ledger: Weak<Mutex<Ledger<DB>>>, period: Duration) -> Self
    where
        DB: Blockstore + Send + Sync + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately; skip it
            // so the first block lands one period after arming.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(ledger) = Weak::upgrade(&ledger) else {
                    debug!("ledger dropped, interval miner exiting");
                    return;
                };
                if let Err(e) = ledger.lock().produce_blocks(1) {
                    error!("interval mining failed: {e:#}");
                    return;
                }
            }
        });
        Self { handle }
    }

    pub(crate) fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for IntervalMiner {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_are_distinct() {
        assert_ne!(MiningMode::Auto, MiningMode::Manual);
        assert_ne!(
            MiningMode::Interval(Duration::from_secs(1)),
            MiningMode::Interval(Duration::from_secs(2)),
        );
    }
}
