// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Filament is a single-node Filecoin-style development ledger. It keeps the
//! whole chain in memory, produces blocks on demand (or on a timer, or after
//! every submitted message), and can snapshot and revert all ledger state,
//! including storage deals negotiated off-chain.
//!
//! There is no consensus, no networking and no proof validation. The execution
//! engine and the RPC host are seams: see [`interpreter::Executor`] and the
//! boundary helpers in [`rpc`].

pub mod blocks;
pub mod chain;
pub mod db;
pub mod deals;
mod devnet;
pub mod events;
pub mod interpreter;
pub mod lifecycle;
pub mod message;
pub mod mining;
pub mod rpc;
pub mod snapshot;
pub mod state;

pub use blocks::{Block, BlockHeader, ChainEpoch, TipsetKey};
pub use chain::Receipt;
pub use deals::{DealId, DealProposal, DealState};
pub use devnet::{Devnet, DevnetConfig};
pub use events::ChainEvent;
pub use interpreter::ExitCode;
pub use message::{Address, Message, TokenAmount};
pub use mining::MiningMode;
