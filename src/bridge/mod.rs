//! Store-and-forward typed message exchange.
//!
//! Messages carry a positive type tag used as a FIFO partition key.
//! Receives are always non-blocking: an empty queue yields `None`, which
//! is not an error - callers poll rather than block.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::StateStore;
use crate::{truncate_utf8, MAX_NAME_LEN, MAX_PAYLOAD_LEN};

/// Receive wildcard: matches the oldest message of any tag.
pub const ANY_TAG: i64 = 0;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("message queue full")]
    QueueFull,

    #[error("invalid message tag {0}: tags must be positive")]
    InvalidTag(i64),
}

/// A message in flight between send and receive. The queue is the sole
/// owner while queued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    pub type_tag: i64,
    pub sender: String,
    pub receiver: String,
    pub payload: String,
    /// Payload encryption is not implemented; always false.
    pub encrypted: bool,
    pub timestamp: i64,
}

/// Bounded FIFO message queue partitioned by type tag.
pub struct MessageBridge {
    state: Arc<StateStore>,
    queue: Mutex<VecDeque<QueueMessage>>,
    depth: usize,
}

impl MessageBridge {
    pub fn new(state: Arc<StateStore>, depth: usize) -> Self {
        Self {
            state,
            queue: Mutex::new(VecDeque::new()),
            depth,
        }
    }

    /// Enqueue a message. Sender, receiver, and payload are truncated to
    /// their byte caps. Fails with `QueueFull` at the configured depth.
    pub fn send(
        &self,
        sender: &str,
        receiver: &str,
        payload: &str,
        type_tag: i64,
    ) -> Result<(), BridgeError> {
        if type_tag <= ANY_TAG {
            return Err(BridgeError::InvalidTag(type_tag));
        }

        let message = QueueMessage {
            type_tag,
            sender: truncate_utf8(sender, MAX_NAME_LEN).to_string(),
            receiver: truncate_utf8(receiver, MAX_NAME_LEN).to_string(),
            payload: truncate_utf8(payload, MAX_PAYLOAD_LEN).to_string(),
            encrypted: false,
            timestamp: chrono::Utc::now().timestamp(),
        };

        let mut queue = self.queue.lock();
        if queue.len() >= self.depth {
            tracing::warn!(tag = type_tag, "message queue full");
            return Err(BridgeError::QueueFull);
        }
        queue.push_back(message);
        drop(queue);

        self.state.record_message();
        self.state.record_queue_event();
        Ok(())
    }

    /// Dequeue the oldest message whose tag matches. A tag of
    /// [`ANY_TAG`] (or less) matches any message. `None` means empty.
    /// FIFO order is preserved per tag, and globally for the wildcard.
    pub fn receive(&self, type_tag: i64) -> Option<QueueMessage> {
        let mut queue = self.queue.lock();
        if type_tag <= ANY_TAG {
            return queue.pop_front();
        }
        let pos = queue.iter().position(|m| m.type_tag == type_tag)?;
        queue.remove(pos)
    }

    /// Messages currently queued.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
