//! Fixed-capacity pool of byte-stream channels.
//!
//! Allocation claims the first inactive slot (lowest index). There is no
//! per-channel close: once active, a channel's endpoints stay valid until
//! [`ChannelPool::teardown`] releases them all.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use super::pipe::{BytePipe, PipeError};
use crate::state::StateStore;
use crate::{truncate_utf8, MAX_CLIENTS, MAX_NAME_LEN};

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("channel pool full")]
    CapacityExceeded,

    #[error("invalid channel id {0}")]
    InvalidChannel(usize),

    #[error("channel transport error: {0}")]
    Io(#[from] PipeError),
}

struct ChannelSlot {
    name: String,
    pipe: BytePipe,
    bytes_transferred: AtomicU64,
}

/// Pool of at most [`MAX_CLIENTS`] active channels.
///
/// The slot mutex guards only lookup and claim; it is released before any
/// pipe read, so a reader blocked on an empty channel never stalls other
/// channel operations.
pub struct ChannelPool {
    state: Arc<StateStore>,
    slots: Mutex<Vec<Option<Arc<ChannelSlot>>>>,
    pipe_capacity: usize,
}

impl ChannelPool {
    pub fn new(state: Arc<StateStore>, pipe_capacity: usize) -> Self {
        Self {
            state,
            slots: Mutex::new((0..MAX_CLIENTS).map(|_| None).collect()),
            pipe_capacity,
        }
    }

    /// Allocate a channel in the first inactive slot.
    pub fn create(&self, name: &str) -> Result<usize, ChannelError> {
        let mut slots = self.slots.lock();
        let Some(idx) = slots.iter().position(Option::is_none) else {
            tracing::warn!(name, "channel pool full");
            return Err(ChannelError::CapacityExceeded);
        };

        let name = truncate_utf8(name, MAX_NAME_LEN).to_string();
        tracing::info!(channel = %name, id = idx, "channel created");
        slots[idx] = Some(Arc::new(ChannelSlot {
            name,
            pipe: BytePipe::new(self.pipe_capacity),
            bytes_transferred: AtomicU64::new(0),
        }));
        drop(slots);

        self.state.record_pipe_created();
        Ok(idx)
    }

    /// Write `bytes` to a channel's write end. Short writes happen when
    /// the buffer is nearly full; the count written is returned either
    /// way. Counters are only touched on success.
    pub fn send(&self, id: usize, bytes: &[u8]) -> Result<usize, ChannelError> {
        let slot = self.slot(id)?;
        let written = slot.pipe.write(bytes)?;

        slot.bytes_transferred.fetch_add(written as u64, Ordering::Relaxed);
        self.state.record_message();
        Ok(written)
    }

    /// Read up to `max` bytes from a channel's read end.
    ///
    /// **Blocks** until data arrives or the channel closes; empty means
    /// end-of-stream. Runs outside the pool lock - only the calling
    /// thread waits.
    pub fn receive(&self, id: usize, max: usize) -> Result<Vec<u8>, ChannelError> {
        let slot = self.slot(id)?;
        Ok(slot.pipe.read(max))
    }

    /// Channel name, mostly for diagnostics.
    pub fn name(&self, id: usize) -> Result<String, ChannelError> {
        Ok(self.slot(id)?.name.clone())
    }

    /// Cumulative bytes written through a channel.
    pub fn bytes_transferred(&self, id: usize) -> Result<u64, ChannelError> {
        Ok(self.slot(id)?.bytes_transferred.load(Ordering::Relaxed))
    }

    /// Number of active channels.
    pub fn active_count(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }

    /// Close every active channel endpoint, waking blocked readers.
    /// Idempotent. Slots are not recycled afterwards; the pool is done.
    pub fn teardown(&self) {
        let slots = self.slots.lock();
        for slot in slots.iter().flatten() {
            slot.pipe.close();
        }
        tracing::info!("channel pool torn down");
    }

    fn slot(&self, id: usize) -> Result<Arc<ChannelSlot>, ChannelError> {
        self.slots
            .lock()
            .get(id)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or(ChannelError::InvalidChannel(id))
    }
}
