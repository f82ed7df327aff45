//! In-process IPC broker.
//!
//! A shared registry of authentication tokens, byte-stream channels, and a
//! typed store-and-forward message queue, usable concurrently from many
//! worker threads. The network front-end that exposes these operations is a
//! separate component; this crate is the broker core only.
//!
//! # Components
//!
//! - [`state::StateStore`] - process-wide counters, status, and the token table
//! - [`security::SecurityManager`] - token issuance and verification
//! - [`channel::ChannelPool`] - fixed-capacity blocking byte-stream channels
//! - [`bridge::MessageBridge`] - non-blocking typed message exchange
//!
//! # Concurrency contract
//!
//! The token table is guarded by a single exclusive lock held for every
//! scan-and-claim or scan-and-expire sequence. Counters are independent
//! relaxed atomics; a [`state::StatsSnapshot`] is eventually consistent,
//! never a point-in-time transaction. Channel reads block with no timeout
//! or cancellation - never call [`Broker::receive_from_channel`] while
//! holding a lock of your own. Message receives never block.

pub mod bridge;
pub mod channel;
pub mod config;
pub mod error;
pub mod security;
pub mod state;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

pub use bridge::{MessageBridge, QueueMessage};
pub use channel::ChannelPool;
pub use error::BrokerError;
pub use security::{AuthToken, SecurityManager};
pub use state::{StateStore, StatsSnapshot};

/// Capacity of the token table and the channel pool. Fixed, never resized.
pub const MAX_CLIENTS: usize = 10;

/// Random bytes in an issued token.
pub const TOKEN_LEN: usize = 32;

/// Byte cap for usernames, channel names, and message party names.
pub const MAX_NAME_LEN: usize = 63;

/// Byte cap for a queue message payload. Longer payloads are truncated.
pub const MAX_PAYLOAD_LEN: usize = 2048;

/// Broker configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Lifetime of an issued token. Expiry is lazy: an expired token is
    /// reclaimed when it is next verified, not proactively swept.
    pub token_ttl: Duration,
    /// Maximum messages held by the bridge before `send` refuses.
    pub queue_depth: usize,
    /// Per-channel buffer size in bytes.
    pub pipe_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(86_400),
            queue_depth: 256,
            pipe_capacity: 64 * 1024,
        }
    }
}

/// The broker instance. One per process.
///
/// Construction is the `init` step of the lifecycle; [`Broker::teardown`]
/// is the other end. Operations invoked after teardown are a caller
/// contract violation - they fail or return end-of-stream results, but the
/// broker makes no promise beyond not corrupting its counters.
pub struct Broker {
    state: Arc<StateStore>,
    security: SecurityManager,
    channels: ChannelPool,
    bridge: MessageBridge,
}

impl Broker {
    /// Create a broker with the given configuration.
    pub fn new(config: BrokerConfig) -> Self {
        let state = Arc::new(StateStore::new());
        let security = SecurityManager::new(Arc::clone(&state), config.token_ttl);
        let channels = ChannelPool::new(Arc::clone(&state), config.pipe_capacity);
        let bridge = MessageBridge::new(Arc::clone(&state), config.queue_depth);

        Self { state, security, channels, bridge }
    }

    /// Issue a token for `username`. See [`SecurityManager::authenticate`]
    /// for the (deliberately open) password semantics.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(usize, AuthToken), BrokerError> {
        Ok(self.security.authenticate(username, password)?)
    }

    /// Verify a previously issued token, returning its slot index and the
    /// stored username.
    pub fn verify(&self, token: &AuthToken) -> Result<(usize, String), BrokerError> {
        Ok(self.security.verify(token)?)
    }

    /// Allocate a byte-stream channel, returning its id.
    pub fn create_channel(&self, name: &str) -> Result<usize, BrokerError> {
        Ok(self.channels.create(name)?)
    }

    /// Write `bytes` to a channel. Returns the count actually written,
    /// which may be short when the channel buffer is nearly full.
    pub fn send_on_channel(&self, id: usize, bytes: &[u8]) -> Result<usize, BrokerError> {
        Ok(self.channels.send(id, bytes)?)
    }

    /// Read up to `max` bytes from a channel.
    ///
    /// **Blocks** until data is available or the channel is closed; an
    /// empty result means end-of-stream. There is no timeout or
    /// cancellation - do not call this while holding any lock.
    pub fn receive_from_channel(&self, id: usize, max: usize) -> Result<Vec<u8>, BrokerError> {
        Ok(self.channels.receive(id, max)?)
    }

    /// Enqueue a typed message. `type_tag` must be positive.
    pub fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        payload: &str,
        type_tag: i64,
    ) -> Result<(), BrokerError> {
        Ok(self.bridge.send(sender, receiver, payload, type_tag)?)
    }

    /// Dequeue the oldest message with a matching tag, or the oldest
    /// message of any tag when `type_tag` is [`bridge::ANY_TAG`].
    /// Never blocks; `None` means the queue is empty, which is not an
    /// error - callers poll.
    pub fn receive_message(&self, type_tag: i64) -> Option<QueueMessage> {
        self.bridge.receive(type_tag)
    }

    /// Current counters and status. Eventually consistent.
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.state.snapshot()
    }

    /// Shared state handle, for front-end connection tracking.
    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    /// Release everything: close all channel endpoints and mark the shared
    /// state torn down. Idempotent.
    pub fn teardown(&self) {
        self.channels.teardown();
        self.state.teardown();
    }
}

/// Truncate `s` to at most `max` bytes, backing off to a char boundary.
pub(crate) fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
