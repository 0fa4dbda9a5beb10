//! The chunk handoff queue between producer and consumer threads.
//!
//! An unbounded FIFO of [`Chunk`]s guarded by a mutex and a not-empty
//! condition variable, plus a completion flag. Appends never block
//! (unbounded by design — backpressure is a pipeline-level concern);
//! [`take_next`](ChunkQueue::take_next) blocks the calling thread until
//! a chunk arrives or the queue is complete and drained empty.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, PoisonError};

use crate::chunk::Chunk;
use crate::error::{MessageError, MessageResult};

struct QueueState {
    chunks: VecDeque<Chunk>,
    complete: bool,
}

/// Thread-safe FIFO of body chunks with an end-of-stream flag.
///
/// Chunks are observed by the consumer in exactly the order the
/// producer appended them. Once [`mark_complete`](ChunkQueue::mark_complete)
/// has been called, further appends fail and a consumer draining the
/// queue empty sees end-of-stream instead of blocking.
pub struct ChunkQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl ChunkQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                chunks: VecDeque::new(),
                complete: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Add a chunk to the tail. Never blocks.
    ///
    /// Fails with [`MessageError::BodyComplete`] once the queue has been
    /// marked complete.
    pub fn append(&self, chunk: Chunk) -> MessageResult<()> {
        let mut state = self.state.lock().map_err(|_| MessageError::Interrupted)?;
        if state.complete {
            return Err(MessageError::BodyComplete);
        }
        state.chunks.push_back(chunk);
        self.available.notify_one();
        Ok(())
    }

    /// Remove and return the head chunk, blocking until one is available.
    ///
    /// Returns [`MessageError::BodyDrained`] when the queue is complete
    /// and empty (end-of-stream on the retrieval path), or
    /// [`MessageError::Interrupted`] if a peer thread panicked while
    /// holding the queue lock. An interrupted retrieval is local to this
    /// call — the queue's completion state is unaffected.
    pub fn take_next(&self) -> MessageResult<Chunk> {
        let mut state = self.state.lock().map_err(|_| MessageError::Interrupted)?;
        loop {
            if let Some(chunk) = state.chunks.pop_front() {
                return Ok(chunk);
            }
            if state.complete {
                return Err(MessageError::BodyDrained);
            }
            state = self
                .available
                .wait(state)
                .map_err(|_| MessageError::Interrupted)?;
        }
    }

    /// Re-insert a chunk at the tail, bypassing the completion check.
    ///
    /// Only used by drain-and-restore: restoring a drained body must
    /// work even after completion, while ordinary appends must not.
    pub(crate) fn requeue(&self, chunk: Chunk) {
        let mut state = self.lock_recovering();
        state.chunks.push_back(chunk);
        self.available.notify_one();
    }

    /// Non-blocking snapshot: is the queue currently empty?
    pub fn is_empty(&self) -> bool {
        self.lock_recovering().chunks.is_empty()
    }

    /// Number of chunks currently queued.
    pub fn len(&self) -> usize {
        self.lock_recovering().chunks.len()
    }

    /// Mark the stream complete. Idempotent; wakes every blocked taker.
    pub fn mark_complete(&self) {
        let mut state = self.lock_recovering();
        state.complete = true;
        self.available.notify_all();
    }

    pub fn is_complete(&self) -> bool {
        self.lock_recovering().complete
    }

    // Snapshots and completion marking proceed even if a peer panicked
    // while holding the lock; the queue state itself stays consistent
    // because every critical section is a single push/pop/flag update.
    fn lock_recovering(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ChunkQueue {
    fn default() -> Self {
        Self::new()
    }
}
