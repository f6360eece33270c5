// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;
use crate::interpreter::ExitCode;

const ALICE: Address = Address(100);
const BOB: Address = Address(101);

fn manual_devnet() -> Devnet {
    Devnet::in_memory(DevnetConfig {
        mode: MiningMode::Manual,
        genesis_accounts: vec![(ALICE, 1_000), (BOB, 0)],
    })
    .unwrap()
}

fn auto_devnet() -> Devnet {
    Devnet::in_memory(DevnetConfig {
        mode: MiningMode::Auto,
        genesis_accounts: vec![(ALICE, 1_000), (BOB, 0)],
    })
    .unwrap()
}

fn proposal() -> DealProposal {
    DealProposal {
        client: ALICE,
        provider: BOB,
        piece_size: 2048,
        label: "deal".to_string(),
    }
}

#[test]
fn transfer_then_revert_to_genesis() {
    let devnet = manual_devnet();
    assert_eq!(devnet.snapshot(), 1);

    let msg_cid = devnet
        .submit_message(Message::transfer(ALICE, BOB, 250, 0))
        .unwrap();
    devnet.produce_blocks(1).unwrap();

    assert_eq!(devnet.head_epoch(), 1);
    assert_eq!(devnet.balance(&ALICE).unwrap(), 750);
    assert_eq!(devnet.balance(&BOB).unwrap(), 250);
    let receipt = devnet.receipt(&msg_cid).unwrap();
    assert_eq!(receipt.exit_code, ExitCode::OK);
    assert_eq!(receipt.epoch, 1);

    assert!(devnet.revert(1));
    assert_eq!(devnet.head_epoch(), 0);
    assert_eq!(devnet.balance(&ALICE).unwrap(), 1_000);
    assert_eq!(devnet.balance(&BOB).unwrap(), 0);
    assert_eq!(devnet.receipt(&msg_cid), None);
}

#[test]
fn revert_cascade_ordering() {
    let devnet = manual_devnet();
    let id1 = devnet.snapshot();
    let id2 = devnet.snapshot();
    assert!(id2 > id1);

    assert!(devnet.revert(i64::try_from(id1).unwrap()));
    assert!(!devnet.revert(i64::try_from(id2).unwrap()));
    assert!(!devnet.revert(i64::try_from(id1).unwrap()));
}

#[test]
fn revert_fails_closed_on_bad_ids() {
    let devnet = manual_devnet();
    assert!(!devnet.revert(-1));
    assert!(!devnet.revert(0));
    assert!(!devnet.revert(i64::MAX));
    // Repeated calls stay refusals, never errors.
    assert!(!devnet.revert(i64::MAX));
}

#[test]
fn revert_restores_state_across_multiple_blocks() {
    let devnet = manual_devnet();

    devnet
        .submit_message(Message::transfer(ALICE, BOB, 100, 0))
        .unwrap();
    devnet.produce_blocks(1).unwrap();

    let snapshot = devnet.snapshot();
    let balance_at_snapshot = devnet.balance(&BOB).unwrap();

    for seq in 1..4 {
        devnet
            .submit_message(Message::transfer(ALICE, BOB, 50, seq))
            .unwrap();
        devnet.produce_blocks(1).unwrap();
    }
    assert_eq!(devnet.balance(&BOB).unwrap(), 250);
    assert_eq!(devnet.head_epoch(), 4);

    assert!(devnet.revert(i64::try_from(snapshot).unwrap()));
    assert_eq!(devnet.balance(&BOB).unwrap(), balance_at_snapshot);
    assert_eq!(devnet.head_epoch(), 1);

    // Replaying the same transfers yields the same balances: nothing stale
    // survived the revert.
    for seq in 1..4 {
        devnet
            .submit_message(Message::transfer(ALICE, BOB, 50, seq))
            .unwrap();
        devnet.produce_blocks(1).unwrap();
    }
    assert_eq!(devnet.balance(&BOB).unwrap(), 250);
}

#[test]
fn revert_restores_deal_states() {
    let devnet = manual_devnet();
    let snapshot = devnet.snapshot();

    let id = devnet.register_deal(proposal()).unwrap();
    devnet.produce_blocks(2).unwrap();
    assert_eq!(devnet.deal_state(id), Some(DealState::Staged));

    assert!(devnet.revert(i64::try_from(snapshot).unwrap()));
    assert_eq!(devnet.deal_state(id), None);
}

#[test]
fn failed_execution_still_produces_a_block_and_receipt() {
    let devnet = manual_devnet();
    // BOB has nothing to send.
    let msg_cid = devnet
        .submit_message(Message::transfer(BOB, ALICE, 10, 0))
        .unwrap();
    devnet.produce_blocks(1).unwrap();

    assert_eq!(devnet.head_epoch(), 1);
    let receipt = devnet.receipt(&msg_cid).unwrap();
    assert_eq!(receipt.exit_code, ExitCode::USR_INSUFFICIENT_FUNDS);
    assert_eq!(devnet.balance(&ALICE).unwrap(), 1_000);
}

#[test]
fn automine_produces_one_block_per_message() {
    let devnet = auto_devnet();

    devnet
        .submit_message(Message::transfer(ALICE, BOB, 10, 0))
        .unwrap();
    devnet
        .submit_message(Message::transfer(ALICE, BOB, 10, 1))
        .unwrap();

    assert_eq!(devnet.head_epoch(), 2);
    assert_eq!(devnet.balance(&BOB).unwrap(), 20);
}

#[test]
fn automine_drives_deal_to_active_in_pipeline_steps() {
    let devnet = auto_devnet();
    let id = devnet.register_deal(proposal()).unwrap();

    assert_eq!(devnet.deal_state(id), Some(DealState::Active));
    assert_eq!(
        devnet.head_epoch(),
        i64::try_from(DealState::PIPELINE_STEPS).unwrap()
    );
}

#[test]
fn unrelated_deals_advance_once_per_block() {
    let devnet = manual_devnet();
    let first = devnet.register_deal(proposal()).unwrap();
    devnet.produce_blocks(1).unwrap();

    let second = devnet.register_deal(proposal()).unwrap();
    devnet.produce_blocks(1).unwrap();

    // Two blocks for the first deal, one for the second.
    assert_eq!(devnet.deal_state(first), Some(DealState::Staged));
    assert_eq!(devnet.deal_state(second), Some(DealState::Validating));
}

#[tokio::test]
async fn failed_deal_is_absorbing_through_the_facade() {
    let devnet = manual_devnet();
    let id = devnet.register_deal(proposal()).unwrap();
    devnet.produce_blocks(1).unwrap();
    assert_eq!(devnet.deal_state(id), Some(DealState::Validating));

    let mut rx = devnet.subscribe();
    assert!(devnet.fail_deal(id));
    assert_eq!(
        rx.recv().await.unwrap(),
        ChainEvent::DealStateChanged {
            id,
            state: DealState::Failed
        }
    );

    // Already terminal; refused, and later blocks leave it failed.
    assert!(!devnet.fail_deal(id));
    devnet.produce_blocks(2).unwrap();
    assert_eq!(devnet.deal_state(id), Some(DealState::Failed));
    assert!(!devnet.fail_deal(9999));
}

#[test]
fn manual_mode_queues_until_requested() {
    let devnet = manual_devnet();
    let msg_cid = devnet
        .submit_message(Message::transfer(ALICE, BOB, 10, 0))
        .unwrap();

    assert_eq!(devnet.head_epoch(), 0);
    assert_eq!(devnet.receipt(&msg_cid), None);

    devnet.produce_blocks(1).unwrap();
    assert_eq!(devnet.head_epoch(), 1);
    assert!(devnet.receipt(&msg_cid).is_some());
}

#[test]
fn batched_blocks_chain_linearly() {
    let devnet = manual_devnet();
    devnet.produce_blocks(5).unwrap();
    assert_eq!(devnet.head_epoch(), 5);
}

#[tokio::test]
async fn block_events_are_published_in_order() {
    let devnet = manual_devnet();
    let mut rx = devnet.subscribe();

    devnet.produce_blocks(2).unwrap();
    assert_eq!(rx.recv().await.unwrap(), ChainEvent::BlockProduced { epoch: 1 });
    assert_eq!(rx.recv().await.unwrap(), ChainEvent::BlockProduced { epoch: 2 });
}

#[tokio::test]
async fn deal_events_fire_per_transition() {
    let devnet = manual_devnet();
    let mut rx = devnet.subscribe();
    let id = devnet.register_deal(proposal()).unwrap();

    devnet.produce_blocks(1).unwrap();
    assert_eq!(
        rx.recv().await.unwrap(),
        ChainEvent::DealStateChanged {
            id,
            state: DealState::Validating
        }
    );
    assert_eq!(rx.recv().await.unwrap(), ChainEvent::BlockProduced { epoch: 1 });
}

#[tokio::test]
async fn interval_mode_mines_in_the_background() {
    let devnet = Arc::new(
        Devnet::in_memory(DevnetConfig {
            mode: MiningMode::Interval(Duration::from_millis(20)),
            genesis_accounts: vec![(ALICE, 1_000)],
        })
        .unwrap(),
    );
    devnet.start();
    devnet.wait_until_ready().await.unwrap();

    devnet
        .submit_message(Message::transfer(ALICE, ALICE, 1, 0))
        .unwrap();
    let mut rx = devnet.subscribe();
    // Generous bound; the timer fires every 20ms.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let ChainEvent::BlockProduced { .. } = rx.recv().await.unwrap() {
                break;
            }
        }
    })
    .await
    .expect("interval miner never produced a block");

    assert!(devnet.head_epoch() >= 1);
    devnet.stop().await.unwrap();
    let stopped_at = devnet.head_epoch();
    tokio::time::sleep(Duration::from_millis(80)).await;
    // The timer is cancelled; nothing mutates the chain after stop.
    assert_eq!(devnet.head_epoch(), stopped_at);
}

#[tokio::test]
async fn ready_event_published_once() {
    let devnet = manual_devnet();
    let mut rx = devnet.subscribe();
    devnet.start();
    devnet.wait_until_ready().await.unwrap();
    devnet.wait_until_ready().await.unwrap();

    assert_eq!(rx.recv().await.unwrap(), ChainEvent::Ready);
    assert!(rx.try_recv().is_err());
    devnet.stop().await.unwrap();
}

#[test]
fn boundary_then_revert_distinguishes_rejection_from_refusal() {
    use crate::rpc::{BoundaryError, parse_snapshot_id};
    use serde_json::json;

    let devnet = manual_devnet();
    devnet.snapshot();

    // Malformed shape: rejected before the ledger sees it.
    assert!(matches!(
        parse_snapshot_id(Some(&json!({"id": 1}))),
        Err(BoundaryError::Encoding(_))
    ));
    // Missing argument: a distinct usage rejection.
    assert!(matches!(
        parse_snapshot_id(None),
        Err(BoundaryError::Usage(_))
    ));
    // Well-formed but never issued: flows into revert, refused as `false`.
    let id = parse_snapshot_id(Some(&json!(42))).unwrap();
    assert!(!devnet.revert(id));
    // Well-formed and issued: succeeds.
    let id = parse_snapshot_id(Some(&json!(1))).unwrap();
    assert!(devnet.revert(id));
}
