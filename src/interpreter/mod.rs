// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Seam to the execution engine. The ledger treats execution as an opaque
//! unit of work: it hands over a message and a read-only view of state, and
//! gets back a result plus the storage writes to apply. The built-in
//! [`TransferExecutor`] covers plain value transfers so the crate is usable
//! stand-alone.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::message::{Address, Message};
use crate::state::{ActorState, StateWrite};

/// Exit status recorded in a receipt. Zero is success; everything else is an
/// execution failure, which still produces a receipt and a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExitCode(pub u32);

impl ExitCode {
    pub const OK: ExitCode = ExitCode(0);
    pub const USR_BAD_SEQUENCE: ExitCode = ExitCode(1);
    pub const USR_INSUFFICIENT_FUNDS: ExitCode = ExitCode(2);

    pub fn is_success(self) -> bool {
        self == Self::OK
    }
}

/// Result of executing one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub exit_code: ExitCode,
    pub return_data: Vec<u8>,
    pub writes: Vec<StateWrite>,
}

impl ExecutionOutput {
    pub fn ok(return_data: Vec<u8>, writes: Vec<StateWrite>) -> Self {
        Self {
            exit_code: ExitCode::OK,
            return_data,
            writes,
        }
    }

    /// A failed execution carries no writes; the receipt alone records it.
    pub fn failure(exit_code: ExitCode) -> Self {
        Self {
            exit_code,
            return_data: Vec::new(),
            writes: Vec::new(),
        }
    }
}

/// Read-only state access granted to the engine during execution.
pub trait StateRead {
    fn actor(&self, addr: &Address) -> anyhow::Result<Option<ActorState>>;
    fn storage(&self, addr: &Address, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>>;
}

/// The execution engine. Implementations must be deterministic: the ledger
/// replays messages after a revert and expects identical results.
pub trait Executor: Send + Sync {
    fn execute(&self, msg: &Message, state: &dyn StateRead) -> anyhow::Result<ExecutionOutput>;
}

/// Built-in engine for value transfers with nonce checking.
#[derive(Debug, Default)]
pub struct TransferExecutor;

impl Executor for TransferExecutor {
    fn execute(&self, msg: &Message, state: &dyn StateRead) -> anyhow::Result<ExecutionOutput> {
        let sender = state.actor(&msg.from)?.unwrap_or_default();
        if msg.sequence != sender.sequence {
            trace!(from = %msg.from, expected = sender.sequence, got = msg.sequence, "bad sequence");
            return Ok(ExecutionOutput::failure(ExitCode::USR_BAD_SEQUENCE));
        }
        if sender.balance < msg.value {
            trace!(from = %msg.from, balance = sender.balance, value = msg.value, "insufficient funds");
            return Ok(ExecutionOutput::failure(ExitCode::USR_INSUFFICIENT_FUNDS));
        }
        let recipient = state.actor(&msg.to)?.unwrap_or_default();

        let writes = vec![
            StateWrite::SetBalance {
                actor: msg.from,
                balance: sender.balance - msg.value,
            },
            StateWrite::BumpSequence { actor: msg.from },
            StateWrite::SetBalance {
                actor: msg.to,
                balance: recipient.balance + msg.value,
            },
        ];
        Ok(ExecutionOutput::ok(Vec::new(), writes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDB;
    use crate::state::StateStore;
    use std::sync::Arc;

    fn store_with(addr: Address, balance: u64) -> StateStore<MemoryDB> {
        let mut store = StateStore::new(Arc::new(MemoryDB::default())).unwrap();
        store.set_actor(
            addr,
            ActorState {
                balance,
                ..Default::default()
            },
        );
        store.commit().unwrap();
        store
    }

    #[test]
    fn transfer_moves_value_and_bumps_sequence() {
        let alice = Address(100);
        let bob = Address(101);
        let mut store = store_with(alice, 100);

        let out = TransferExecutor
            .execute(&Message::transfer(alice, bob, 40, 0), &store)
            .unwrap();
        assert_eq!(out.exit_code, ExitCode::OK);

        store.apply(&out.writes).unwrap();
        assert_eq!(store.actor(&alice).unwrap().unwrap().balance, 60);
        assert_eq!(store.actor(&alice).unwrap().unwrap().sequence, 1);
        assert_eq!(store.actor(&bob).unwrap().unwrap().balance, 40);
    }

    #[test]
    fn bad_sequence_fails_without_writes() {
        let alice = Address(100);
        let store = store_with(alice, 100);

        let out = TransferExecutor
            .execute(&Message::transfer(alice, Address(101), 1, 7), &store)
            .unwrap();
        assert_eq!(out.exit_code, ExitCode::USR_BAD_SEQUENCE);
        assert!(out.writes.is_empty());
    }

    #[test]
    fn insufficient_funds_fails() {
        let alice = Address(100);
        let store = store_with(alice, 5);

        let out = TransferExecutor
            .execute(&Message::transfer(alice, Address(101), 10, 0), &store)
            .unwrap();
        assert_eq!(out.exit_code, ExitCode::USR_INSUFFICIENT_FUNDS);
    }
}
