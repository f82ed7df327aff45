//! Shared state store: aggregate counters, status, and the token table.
//!
//! Counters are relaxed atomics mutated by single increments; they are
//! individually monotonic but never form a transactional snapshot across
//! fields. The token table lives here because the store owns all shared
//! data, but it is locked exclusively by the security manager.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::security::TokenTable;
use crate::telemetry;

const STATUS_INITIALIZED: &str = "IPC system initialized";
const STATUS_TORN_DOWN: &str = "IPC system torn down";

/// Counters and status at one (racy) point in time.
///
/// This field set is the contract the front-end exposes unmodified;
/// rendering it into JSON or any other representation is the front-end's
/// job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub active_connections: u64,
    pub total_messages: u64,
    pub pipe_count: u64,
    pub queue_count: u64,
    pub shm_segments: u64,
    pub status: String,
    pub timestamp: i64,
}

/// The process-wide shared region. One instance, created at broker init,
/// released by [`StateStore::teardown`].
pub struct StateStore {
    active_connections: AtomicU64,
    total_messages: AtomicU64,
    pipe_count: AtomicU64,
    queue_count: AtomicU64,
    shm_segments: AtomicU64,
    status: RwLock<String>,
    torn_down: AtomicBool,
    /// Token slot table. The mutex here *is* the security lock: every
    /// scan-and-claim and scan-and-expire sequence runs under one
    /// uninterrupted guard.
    pub(crate) tokens: Mutex<TokenTable>,
}

impl StateStore {
    /// Allocate and zero the shared region.
    pub fn new() -> Self {
        tracing::info!("shared state initialized");
        Self {
            active_connections: AtomicU64::new(0),
            total_messages: AtomicU64::new(0),
            pipe_count: AtomicU64::new(0),
            queue_count: AtomicU64::new(0),
            shm_segments: AtomicU64::new(1),
            status: RwLock::new(STATUS_INITIALIZED.to_string()),
            torn_down: AtomicBool::new(false),
            tokens: Mutex::new(TokenTable::new()),
        }
    }

    /// Count one message moved through a channel or the bridge.
    pub fn record_message(&self) {
        self.total_messages.fetch_add(1, Ordering::Relaxed);
        telemetry::record_message_sent();
    }

    /// Count one channel allocation.
    pub fn record_pipe_created(&self) {
        self.pipe_count.fetch_add(1, Ordering::Relaxed);
        telemetry::record_pipe_created();
    }

    /// Count one bridge enqueue.
    pub fn record_queue_event(&self) {
        self.queue_count.fetch_add(1, Ordering::Relaxed);
        telemetry::record_queue_event();
    }

    /// Front-end hook: a client connection was opened.
    pub fn connection_opened(&self) {
        let now = self.active_connections.fetch_add(1, Ordering::Relaxed) + 1;
        telemetry::record_active_connections(now);
    }

    /// Front-end hook: a client connection was closed.
    pub fn connection_closed(&self) {
        let prev = self.active_connections.fetch_sub(1, Ordering::Relaxed);
        telemetry::record_active_connections(prev.saturating_sub(1));
    }

    /// Replace the free-form status string.
    pub fn set_status(&self, status: &str) {
        *self.status.write() = status.to_string();
    }

    /// Read the counters and status. Plain relaxed loads, no lock:
    /// callers accept racy reads of aggregate stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            active_connections: self.active_connections.load(Ordering::Relaxed),
            total_messages: self.total_messages.load(Ordering::Relaxed),
            pipe_count: self.pipe_count.load(Ordering::Relaxed),
            queue_count: self.queue_count.load(Ordering::Relaxed),
            shm_segments: self.shm_segments.load(Ordering::Relaxed),
            status: self.status.read().clone(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Release the shared region. Idempotent. Invoking other operations
    /// after teardown is a caller contract violation, not a recoverable
    /// error.
    pub fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shm_segments.store(0, Ordering::Relaxed);
        self.set_status(STATUS_TORN_DOWN);
        tracing::info!("shared state released");
    }

    /// Whether teardown has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_counters_are_zero() {
        let store = StateStore::new();
        let snap = store.snapshot();

        assert_eq!(snap.active_connections, 0);
        assert_eq!(snap.total_messages, 0);
        assert_eq!(snap.pipe_count, 0);
        assert_eq!(snap.queue_count, 0);
        assert_eq!(snap.shm_segments, 1);
        assert_eq!(snap.status, "IPC system initialized");
    }

    #[test]
    fn counters_increment_independently() {
        let store = StateStore::new();
        store.record_message();
        store.record_message();
        store.record_pipe_created();
        store.record_queue_event();

        let snap = store.snapshot();
        assert_eq!(snap.total_messages, 2);
        assert_eq!(snap.pipe_count, 1);
        assert_eq!(snap.queue_count, 1);
    }

    #[test]
    fn connection_tracking_balances() {
        let store = StateStore::new();
        store.connection_opened();
        store.connection_opened();
        store.connection_closed();

        assert_eq!(store.snapshot().active_connections, 1);
    }

    #[test]
    fn teardown_is_idempotent() {
        let store = StateStore::new();
        store.teardown();
        store.teardown();

        assert!(store.is_torn_down());
        let snap = store.snapshot();
        assert_eq!(snap.shm_segments, 0);
        assert_eq!(snap.status, "IPC system torn down");
    }
}
