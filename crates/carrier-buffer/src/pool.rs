//! Buffer pool trait and the default fixed-capacity implementation.

use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::BytesMut;
use tracing::debug;

/// Default capacity of pool-supplied buffers (8 KiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Supplies fixed-capacity byte buffers for the body write path.
///
/// Every buffer returned by [`acquire`](BufferPool::acquire) has at
/// least [`capacity`](BufferPool::capacity) bytes of room; writers bound
/// their fill by `capacity()`, not the buffer's real allocation. The
/// caller releases a buffer implicitly by finalizing it into an
/// enqueued chunk.
pub trait BufferPool: Send + Sync {
    /// Hand out an empty buffer with `capacity()` bytes of room.
    fn acquire(&self) -> BytesMut;

    /// Capacity of every buffer this pool hands out.
    fn capacity(&self) -> usize;
}

/// Allocates uniform `BytesMut` buffers on demand.
///
/// Keeps a running count of allocations so callers can observe how many
/// buffers a write sequence consumed.
pub struct FixedBufferPool {
    capacity: usize,
    allocated: AtomicUsize,
}

impl FixedBufferPool {
    /// Create a pool handing out buffers of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be > 0");
        Self {
            capacity,
            allocated: AtomicUsize::new(0),
        }
    }

    /// Total number of buffers handed out so far.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }
}

impl Default for FixedBufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

impl BufferPool for FixedBufferPool {
    fn acquire(&self) -> BytesMut {
        let n = self.allocated.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(capacity = self.capacity, total = n, "buffer acquired");
        BytesMut::with_capacity(self.capacity)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
