// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use tokio::sync::broadcast::{self, Receiver, Sender as Publisher};
use tracing::debug;

use crate::blocks::ChainEpoch;
use crate::deals::{DealId, DealState};

// A cap on the number of events buffered per lagging subscriber.
const SINK_CAP: usize = 200;

/// `Enum` for the `pubsub` channel that defines the event type variant and
/// the data carried by it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainEvent {
    /// Published exactly once, after startup dependencies are established.
    Ready,
    BlockProduced { epoch: ChainEpoch },
    DealStateChanged { id: DealId, state: DealState },
}

/// In-process publish/subscribe for ledger events. Events are published after
/// the mutation they describe has fully completed.
#[derive(Clone)]
pub struct EventBus {
    publisher: Publisher<ChainEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (publisher, _) = broadcast::channel(SINK_CAP);
        Self { publisher }
    }
}

impl EventBus {
    pub fn subscribe(&self) -> Receiver<ChainEvent> {
        self.publisher.subscribe()
    }

    pub fn publish(&self, event: ChainEvent) {
        if self.publisher.send(event).is_err() {
            debug!("did not publish chain event, no active receivers");
        }
    }
}
