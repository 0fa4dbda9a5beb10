//! One bounded unit of message-body bytes.
//!
//! A [`Chunk`] wraps an immutable payload plus a read cursor. Ownership
//! transfers from producer to queue to consumer — a chunk is read by
//! exactly one consumer and is never shared. Re-reading requires a
//! [`deep_copy`](Chunk::deep_copy), which allocates fresh storage.

use bytes::Bytes;

/// An opaque, bounded, read-once byte buffer.
///
/// The payload is fixed at construction (the "limit"); [`read_byte`]
/// advances an internal cursor until the chunk is exhausted. The full
/// payload stays addressable via [`bytes`](Chunk::bytes) regardless of
/// the cursor, which is what length summation and deep copies use.
///
/// [`read_byte`]: Chunk::read_byte
#[derive(Debug)]
pub struct Chunk {
    data: Bytes,
    pos: usize,
}

impl Chunk {
    /// Wrap a finalized payload as a chunk with the cursor at zero.
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Total readable bytes in this chunk, independent of the cursor.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been read.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Read one byte and advance the cursor, or `None` if exhausted.
    pub fn read_byte(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    /// Copy up to `out.len()` unread bytes into `out`, advancing the
    /// cursor. Returns the number of bytes copied.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.remaining());
        out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    /// The full payload, cursor-independent.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// An independent copy: fresh allocation, identical bytes, cursor
    /// reset. Mutating either side afterwards has no effect on the other.
    pub fn deep_copy(&self) -> Chunk {
        Chunk::new(Bytes::copy_from_slice(&self.data))
    }
}

impl From<Bytes> for Chunk {
    fn from(data: Bytes) -> Self {
        Chunk::new(data)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(data: Vec<u8>) -> Self {
        Chunk::new(Bytes::from(data))
    }
}

impl From<&[u8]> for Chunk {
    fn from(data: &[u8]) -> Self {
        Chunk::new(Bytes::copy_from_slice(data))
    }
}
