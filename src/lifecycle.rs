// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Startup and shutdown of the ledger's external dependencies. The sidecar
//! (an IPFS-like content-addressable storage process in the Filecoin-style
//! deployment) is brought up asynchronously; the interval miner is armed only
//! once the sidecar reports running, and the readiness latch flips exactly
//! once.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use fvm_ipld_blockstore::Blockstore;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::devnet::Ledger;
use crate::events::{ChainEvent, EventBus};
use crate::mining::{IntervalMiner, MiningMode};

/// Companion process the ledger depends on. Out-of-process in the real
/// deployment; [`NullSidecar`] stands in when no sidecar is needed.
#[async_trait]
pub trait SidecarService: Send + Sync {
    async fn start(&self) -> anyhow::Result<()>;
    async fn stop(&self) -> anyhow::Result<()>;
}

/// Sidecar that is always running. Default for stand-alone use.
#[derive(Debug, Default)]
pub struct NullSidecar;

#[async_trait]
impl SidecarService for NullSidecar {
    async fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum ReadyState {
    Pending,
    Ready,
    Failed(String),
}

pub struct LifecycleController {
    sidecar: Arc<dyn SidecarService>,
    ready_tx: watch::Sender<ReadyState>,
    ready_rx: watch::Receiver<ReadyState>,
    miner: Arc<Mutex<Option<IntervalMiner>>>,
    startup: Mutex<Option<JoinHandle<()>>>,
}

impl LifecycleController {
    pub fn new(sidecar: Arc<dyn SidecarService>) -> Self {
        let (ready_tx, ready_rx) = watch::channel(ReadyState::Pending);
        Self {
            sidecar,
            ready_tx,
            ready_rx,
            miner: Arc::new(Mutex::new(None)),
            startup: Mutex::new(None),
        }
    }

    /// Brings up the sidecar in the background. Once it reports running, arms
    /// the interval miner (if that mode is configured) and flips the
    /// readiness latch, publishing `Ready` exactly once. A sidecar failure
    /// fails the latch instead.
    pub(crate) fn start<DB>(&self, ledger: Weak<Mutex<Ledger<DB>>>, mode: MiningMode, events: EventBus)
    where
        DB: Blockstore + Send + Sync + 'static,
    {
        let sidecar = Arc::clone(&self.sidecar);
        let ready = self.ready_tx.clone();
        let miner_slot = Arc::clone(&self.miner);
        let handle = tokio::spawn(async move {
            match sidecar.start().await {
                Ok(()) => {
                    if let MiningMode::Interval(period) = mode {
                        *miner_slot.lock() = Some(IntervalMiner::spawn(ledger, period));
                    }
                    let flipped = ready.send_if_modified(|state| {
                        if *state == ReadyState::Pending {
                            *state = ReadyState::Ready;
                            true
                        } else {
                            false
                        }
                    });
                    if flipped {
                        info!("ledger ready");
                        events.publish(ChainEvent::Ready);
                    }
                }
                Err(e) => {
                    error!("sidecar failed to start: {e:#}");
                    ready.send_if_modified(|state| {
                        if *state == ReadyState::Pending {
                            *state = ReadyState::Failed(e.to_string());
                            true
                        } else {
                            false
                        }
                    });
                }
            }
        });
        *self.startup.lock() = Some(handle);
    }

    /// Suspends until startup has succeeded or failed; returns immediately if
    /// the latch has already flipped.
    pub async fn wait_until_ready(&self) -> anyhow::Result<()> {
        let mut rx = self.ready_rx.clone();
        let state = rx
            .wait_for(|state| *state != ReadyState::Pending)
            .await?
            .clone();
        match state {
            ReadyState::Ready => Ok(()),
            ReadyState::Failed(e) => anyhow::bail!("startup failed: {e}"),
            ReadyState::Pending => unreachable!("wait_for skips the pending state"),
        }
    }

    /// Cancels the interval miner, then awaits orderly sidecar shutdown. Safe
    /// to call even if `start` never ran or never completed.
    pub async fn stop(&self) -> anyhow::Result<()> {
        if let Some(miner) = self.miner.lock().take() {
            miner.abort();
        }
        if let Some(startup) = self.startup.lock().take() {
            startup.abort();
        }
        info!("stopping sidecar");
        self.sidecar.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingSidecar;

    #[async_trait]
    impl SidecarService for FailingSidecar {
        async fn start(&self) -> anyhow::Result<()> {
            anyhow::bail!("sidecar unreachable")
        }

        async fn stop(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingSidecar {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    #[async_trait]
    impl SidecarService for CountingSidecar {
        async fn start(&self) -> anyhow::Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn controller(sidecar: Arc<dyn SidecarService>) -> LifecycleController {
        LifecycleController::new(sidecar)
    }

    #[tokio::test]
    async fn ready_fires_exactly_once() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let lifecycle = controller(Arc::new(NullSidecar));

        lifecycle.start::<crate::db::MemoryDB>(Weak::new(), MiningMode::Manual, events.clone());
        lifecycle.wait_until_ready().await.unwrap();
        // Already decided; returns without suspending.
        lifecycle.wait_until_ready().await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), ChainEvent::Ready);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn sidecar_failure_fails_readiness() {
        let lifecycle = controller(Arc::new(FailingSidecar));
        lifecycle.start::<crate::db::MemoryDB>(Weak::new(), MiningMode::Manual, EventBus::default());

        let err = lifecycle.wait_until_ready().await.unwrap_err();
        assert!(err.to_string().contains("sidecar unreachable"));
    }

    #[tokio::test]
    async fn stop_is_safe_before_start() {
        let sidecar = Arc::new(CountingSidecar::default());
        let lifecycle = controller(sidecar.clone());

        lifecycle.stop().await.unwrap();
        assert_eq!(sidecar.stops.load(Ordering::SeqCst), 1);
        assert_eq!(sidecar.starts.load(Ordering::SeqCst), 0);
    }
}
