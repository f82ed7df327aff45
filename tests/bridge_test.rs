//! Tests for the store-and-forward message bridge.

use std::sync::Arc;

use ipc_broker::bridge::{BridgeError, MessageBridge, ANY_TAG};
use ipc_broker::state::StateStore;
use ipc_broker::MAX_PAYLOAD_LEN;

fn bridge_with_depth(depth: usize) -> (Arc<StateStore>, MessageBridge) {
    let state = Arc::new(StateStore::new());
    let bridge = MessageBridge::new(Arc::clone(&state), depth);
    (state, bridge)
}

fn bridge() -> (Arc<StateStore>, MessageBridge) {
    bridge_with_depth(256)
}

#[test]
fn send_receive_roundtrip() {
    let (_, bridge) = bridge();
    bridge.send("A", "B", "hello", 7).unwrap();

    let msg = bridge.receive(7).expect("message should be queued");
    assert_eq!(msg.sender, "A");
    assert_eq!(msg.receiver, "B");
    assert_eq!(msg.payload, "hello");
    assert_eq!(msg.type_tag, 7);
    assert!(!msg.encrypted);

    // Drained queue yields None, not an error.
    assert!(bridge.receive(7).is_none());
}

#[test]
fn fifo_order_is_preserved_per_tag() {
    let (_, bridge) = bridge();
    bridge.send("A", "B", "first", 1).unwrap();
    bridge.send("A", "B", "other lane", 2).unwrap();
    bridge.send("A", "B", "second", 1).unwrap();

    assert_eq!(bridge.receive(1).unwrap().payload, "first");
    assert_eq!(bridge.receive(1).unwrap().payload, "second");
    assert_eq!(bridge.receive(2).unwrap().payload, "other lane");
}

#[test]
fn wildcard_receives_in_global_order() {
    let (_, bridge) = bridge();
    bridge.send("A", "B", "one", 5).unwrap();
    bridge.send("A", "B", "two", 9).unwrap();

    assert_eq!(bridge.receive(ANY_TAG).unwrap().payload, "one");
    assert_eq!(bridge.receive(ANY_TAG).unwrap().payload, "two");
    assert!(bridge.receive(ANY_TAG).is_none());
}

#[test]
fn receive_on_mismatched_tag_leaves_queue_intact() {
    let (_, bridge) = bridge();
    bridge.send("A", "B", "keep me", 3).unwrap();

    assert!(bridge.receive(4).is_none());
    assert_eq!(bridge.len(), 1);
    assert_eq!(bridge.receive(3).unwrap().payload, "keep me");
}

#[test]
fn oversized_payload_is_truncated() {
    let (_, bridge) = bridge();
    let big = "x".repeat(MAX_PAYLOAD_LEN + 500);
    bridge.send("A", "B", &big, 1).unwrap();

    let msg = bridge.receive(1).unwrap();
    assert_eq!(msg.payload.len(), MAX_PAYLOAD_LEN);
}

#[test]
fn party_names_are_truncated() {
    let (_, bridge) = bridge();
    let long = "s".repeat(100);
    bridge.send(&long, &long, "payload", 1).unwrap();

    let msg = bridge.receive(1).unwrap();
    assert_eq!(msg.sender.len(), 63);
    assert_eq!(msg.receiver.len(), 63);
}

#[test]
fn queue_refuses_past_depth() {
    let (_, bridge) = bridge_with_depth(2);
    bridge.send("A", "B", "1", 1).unwrap();
    bridge.send("A", "B", "2", 1).unwrap();

    assert!(matches!(
        bridge.send("A", "B", "3", 1),
        Err(BridgeError::QueueFull)
    ));

    // Draining one frees a slot.
    bridge.receive(1).unwrap();
    assert!(bridge.send("A", "B", "3", 1).is_ok());
}

#[test]
fn non_positive_tags_are_rejected_on_send() {
    let (_, bridge) = bridge();

    assert!(matches!(
        bridge.send("A", "B", "x", 0),
        Err(BridgeError::InvalidTag(0))
    ));
    assert!(matches!(
        bridge.send("A", "B", "x", -3),
        Err(BridgeError::InvalidTag(-3))
    ));
}

#[test]
fn send_updates_message_and_queue_counters() {
    let (state, bridge) = bridge();
    bridge.send("A", "B", "x", 1).unwrap();
    bridge.send("A", "B", "y", 1).unwrap();

    let snap = state.snapshot();
    assert_eq!(snap.total_messages, 2);
    assert_eq!(snap.queue_count, 2);

    // Failed sends leave counters alone.
    let _ = bridge.send("A", "B", "z", 0);
    assert_eq!(state.snapshot().total_messages, 2);
}
