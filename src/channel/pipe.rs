//! In-memory byte stream with pipe semantics.
//!
//! One write end, one read end, a bounded buffer in between. A single
//! write or read call is atomic with respect to the buffer; concurrent
//! writers may still interleave at byte granularity, so callers treat a
//! pipe as single-producer/single-consumer. Synchronous locking only - no
//! async runtime requirement.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PipeError {
    #[error("pipe buffer full")]
    WouldBlock,

    #[error("pipe closed")]
    Closed,
}

struct PipeState {
    buf: VecDeque<u8>,
    closed: bool,
}

/// A bounded blocking byte pipe.
pub struct BytePipe {
    state: Mutex<PipeState>,
    readable: Condvar,
    capacity: usize,
}

impl BytePipe {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(PipeState { buf: VecDeque::new(), closed: false }),
            readable: Condvar::new(),
            capacity,
        }
    }

    /// Append up to the free buffer capacity, returning the count written.
    ///
    /// A short write happens when less than `bytes.len()` space is free; a
    /// completely full buffer refuses with `WouldBlock` rather than
    /// blocking the writer.
    pub fn write(&self, bytes: &[u8]) -> Result<usize, PipeError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PipeError::Closed);
        }

        let free = self.capacity - state.buf.len();
        if free == 0 && !bytes.is_empty() {
            return Err(PipeError::WouldBlock);
        }

        let n = bytes.len().min(free);
        state.buf.extend(&bytes[..n]);
        drop(state);

        self.readable.notify_one();
        Ok(n)
    }

    /// Drain up to `max` bytes, blocking while the pipe is empty and open.
    ///
    /// An empty result means the pipe was closed and fully drained:
    /// end-of-stream.
    pub fn read(&self, max: usize) -> Vec<u8> {
        let mut state = self.state.lock();
        while state.buf.is_empty() && !state.closed {
            self.readable.wait(&mut state);
        }

        let n = state.buf.len().min(max);
        state.buf.drain(..n).collect()
    }

    /// Close both ends, waking every blocked reader. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.readable.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.state.lock().buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn write_then_read_roundtrip() {
        let pipe = BytePipe::new(1024);
        assert_eq!(pipe.write(b"hello").unwrap(), 5);
        assert_eq!(pipe.read(5), b"hello");
    }

    #[test]
    fn read_up_to_max_leaves_remainder() {
        let pipe = BytePipe::new(1024);
        pipe.write(b"abcdef").unwrap();

        assert_eq!(pipe.read(4), b"abcd");
        assert_eq!(pipe.buffered(), 2);
        assert_eq!(pipe.read(16), b"ef");
    }

    #[test]
    fn short_write_when_nearly_full() {
        let pipe = BytePipe::new(4);
        assert_eq!(pipe.write(b"ab").unwrap(), 2);
        assert_eq!(pipe.write(b"cdef").unwrap(), 2);
        assert_eq!(pipe.write(b"g"), Err(PipeError::WouldBlock));
    }

    #[test]
    fn closed_pipe_refuses_writes_and_reads_eof() {
        let pipe = BytePipe::new(16);
        pipe.write(b"xy").unwrap();
        pipe.close();
        pipe.close();

        assert_eq!(pipe.write(b"z"), Err(PipeError::Closed));
        // Buffered data still drains before EOF.
        assert_eq!(pipe.read(16), b"xy");
        assert!(pipe.read(16).is_empty());
    }

    #[test]
    fn blocked_reader_is_woken_by_writer() {
        let pipe = Arc::new(BytePipe::new(64));
        let reader = {
            let pipe = Arc::clone(&pipe);
            thread::spawn(move || pipe.read(16))
        };

        thread::sleep(Duration::from_millis(50));
        pipe.write(b"wake").unwrap();

        assert_eq!(reader.join().unwrap(), b"wake");
    }

    #[test]
    fn blocked_reader_is_woken_by_close() {
        let pipe = Arc::new(BytePipe::new(64));
        let reader = {
            let pipe = Arc::clone(&pipe);
            thread::spawn(move || pipe.read(16))
        };

        thread::sleep(Duration::from_millis(50));
        pipe.close();

        assert!(reader.join().unwrap().is_empty());
    }
}
