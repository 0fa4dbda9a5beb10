//! Blocking byte-stream adapters over the chunk queue.
//!
//! [`BodyReader`] and [`BodyWriter`] give stream-style access to a
//! message body for code that prefers `std::io` traits over explicit
//! chunk handling. Both are single-instance per envelope: one logical
//! reader drains a message, one live writer fills it.

use std::io;
use std::sync::Arc;

use bytes::BufMut;

use carrier_buffer::BufferPool;

use crate::chunk::Chunk;
use crate::envelope::MessageEnvelope;
use crate::error::MessageResult;

/// Sequential reader over a message body.
///
/// Draws chunks from the envelope's queue one at a time, blocking at
/// chunk boundaries until the producer appends more or signals
/// completion. Not safe for concurrent use — the envelope enforces a
/// single reader per message.
pub struct BodyReader {
    envelope: MessageEnvelope,
    current: Option<Chunk>,
}

impl BodyReader {
    pub(crate) fn new(envelope: MessageEnvelope) -> Self {
        Self {
            envelope,
            current: None,
        }
    }

    /// Read the next body byte, or `None` at end-of-stream.
    ///
    /// Blocks when the current chunk is exhausted and the body is not
    /// yet complete. End-of-stream is sticky: once `None` is returned,
    /// every further call returns `None`.
    pub fn read_byte(&mut self) -> Option<u8> {
        self.envelope.mark_already_read();
        loop {
            if let Some(chunk) = self.current.as_mut() {
                if let Some(b) = chunk.read_byte() {
                    return Some(b);
                }
                self.current = None;
            }
            if self.envelope.is_complete() && self.envelope.is_empty() {
                return None;
            }
            match self.envelope.next_chunk() {
                Some(chunk) => self.current = Some(chunk),
                None => return None,
            }
        }
    }
}

impl io::Read for BodyReader {
    /// Blocks only for the first byte of a call; after that, returns
    /// whatever the current chunk still holds. `Ok(0)` means
    /// end-of-stream.
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        match self.read_byte() {
            None => Ok(0),
            Some(b) => {
                out[0] = b;
                let mut n = 1;
                if let Some(chunk) = self.current.as_mut() {
                    n += chunk.read(&mut out[1..]);
                }
                Ok(n)
            }
        }
    }
}

/// Sequential writer that accumulates bytes into pool-supplied buffers
/// and appends each full or flushed buffer as a body chunk.
///
/// The scratch buffer lives on the envelope so completion signaling can
/// flush a pending partial buffer even while this handle is still out.
/// Dropping the writer discards any unflushed bytes and releases the
/// writer slot; flushing beforehand is the caller's responsibility.
pub struct BodyWriter {
    envelope: MessageEnvelope,
    pool: Arc<dyn BufferPool>,
}

impl BodyWriter {
    pub(crate) fn new(envelope: MessageEnvelope, pool: Arc<dyn BufferPool>) -> Self {
        Self { envelope, pool }
    }

    /// Append one byte to the body, handing off a chunk whenever the
    /// current pool buffer fills up.
    pub fn write_byte(&mut self, b: u8) -> MessageResult<()> {
        let capacity = self.pool.capacity();
        let full = self.envelope.with_write_buf(|slot| match slot {
            Some(buf) if buf.len() < capacity => {
                buf.put_u8(b);
                None
            }
            Some(_) => slot.take(),
            None => {
                let mut fresh = self.pool.acquire();
                fresh.put_u8(b);
                *slot = Some(fresh);
                None
            }
        });
        if let Some(buf) = full {
            self.envelope.append_chunk(Chunk::new(buf.freeze()))?;
            self.envelope.with_write_buf(|slot| {
                let mut fresh = self.pool.acquire();
                fresh.put_u8(b);
                *slot = Some(fresh);
            });
        }
        Ok(())
    }

    /// Hand off the current partial buffer as a chunk, if it holds at
    /// least one byte, and acquire a replacement.
    pub fn flush_body(&mut self) -> MessageResult<()> {
        let pending = self.envelope.with_write_buf(|slot| match slot {
            Some(buf) if !buf.is_empty() => slot.take(),
            _ => None,
        });
        if let Some(buf) = pending {
            self.envelope.append_chunk(Chunk::new(buf.freeze()))?;
            self.envelope
                .with_write_buf(|slot| *slot = Some(self.pool.acquire()));
        }
        Ok(())
    }
}

impl io::Write for BodyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &b in buf {
            self.write_byte(b).map_err(io::Error::other)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_body().map_err(io::Error::other)
    }
}

impl Drop for BodyWriter {
    /// Close never fails outward: discard adapter state and release the
    /// writer slot so a fresh writer can start a new write sequence.
    fn drop(&mut self) {
        self.envelope.force_close_writer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::MessageEnvelope;
    use carrier_buffer::FixedBufferPool;
    use std::io::{Read, Write};

    #[test]
    fn reader_yields_bytes_across_chunks_then_sticky_eof() {
        let msg = MessageEnvelope::new();
        msg.append_chunk(Chunk::from(&[1u8, 2][..])).unwrap();
        msg.append_chunk(Chunk::from(&[3u8][..])).unwrap();
        msg.signal_complete();

        let mut reader = msg.input_stream().unwrap();
        assert_eq!(reader.read_byte(), Some(1));
        assert_eq!(reader.read_byte(), Some(2));
        assert_eq!(reader.read_byte(), Some(3));
        assert_eq!(reader.read_byte(), None);
        assert_eq!(reader.read_byte(), None, "end-of-stream is sticky");
    }

    #[test]
    fn reader_skips_empty_chunks() {
        let msg = MessageEnvelope::new();
        msg.append_chunk(Chunk::from(&b""[..])).unwrap();
        msg.append_chunk(Chunk::from(&b"x"[..])).unwrap();
        msg.signal_complete();

        let mut reader = msg.input_stream().unwrap();
        assert_eq!(reader.read_byte(), Some(b'x'));
        assert_eq!(reader.read_byte(), None);
    }

    #[test]
    fn reader_marks_already_read() {
        let msg = MessageEnvelope::new();
        msg.signal_complete();
        assert!(!msg.already_read());

        let mut reader = msg.input_stream().unwrap();
        reader.read_byte();
        assert!(msg.already_read());
    }

    #[test]
    fn io_read_to_end_collects_whole_body() {
        let msg = MessageEnvelope::new();
        msg.append_chunk(Chunk::from(&b"hello "[..])).unwrap();
        msg.append_chunk(Chunk::from(&b"world"[..])).unwrap();
        msg.signal_complete();

        let mut reader = msg.input_stream().unwrap();
        let mut body = Vec::new();
        reader.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"hello world");
    }

    #[test]
    fn writer_emits_chunk_per_full_buffer() {
        let msg = MessageEnvelope::new();
        let pool = Arc::new(FixedBufferPool::new(4));
        let mut writer = msg.output_stream(pool).unwrap();

        writer.write_all(b"0123456789").unwrap();
        writer.flush().unwrap();
        msg.signal_complete();

        let chunks = msg.drain_full_body();
        let parts: Vec<&[u8]> = chunks.iter().map(|c| c.bytes().as_ref()).collect();
        assert_eq!(parts, vec![&b"0123"[..], &b"4567"[..], &b"89"[..]]);
    }

    #[test]
    fn flush_on_empty_buffer_is_a_no_op() {
        let msg = MessageEnvelope::new();
        let pool = Arc::new(FixedBufferPool::new(8));
        let mut writer = msg.output_stream(pool).unwrap();

        writer.flush().unwrap();
        msg.signal_complete();
        assert!(msg.drain_full_body().is_empty());
    }

    #[test]
    fn signal_complete_flushes_pending_writer_buffer() {
        let msg = MessageEnvelope::new();
        let pool = Arc::new(FixedBufferPool::new(16));
        let mut writer = msg.output_stream(pool).unwrap();

        writer.write_all(b"partial").unwrap();
        // No explicit flush: completion must pick up the partial buffer.
        msg.signal_complete();
        drop(writer);

        let chunks = msg.drain_full_body();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].bytes(), &b"partial"[..]);
    }

    #[test]
    fn flush_failure_on_completion_force_closes_writer() {
        let msg = MessageEnvelope::with_buffering(false);
        let pool = Arc::new(FixedBufferPool::new(16));
        let mut writer = msg.output_stream(pool.clone()).unwrap();
        writer.write_all(b"pending").unwrap();

        // No sink registered: flushing the pending buffer fails. The
        // failure is absorbed and the writer force-closed rather than
        // left holding stale state.
        msg.signal_complete();
        assert!(msg.is_complete());

        // Force-close released the slot even though the old handle is
        // still alive: a fresh write sequence can start.
        assert!(msg.output_stream(pool).is_ok());
    }

    #[test]
    fn dropping_writer_releases_slot_and_discards_bytes() {
        let msg = MessageEnvelope::new();
        let pool = Arc::new(FixedBufferPool::new(16));

        let mut writer = msg.output_stream(pool.clone()).unwrap();
        writer.write_all(b"discarded").unwrap();
        assert!(matches!(
            msg.output_stream(pool.clone()),
            Err(crate::error::MessageError::WriterTaken)
        ));
        drop(writer);

        // A fresh writer starts a clean sequence.
        let mut writer = msg.output_stream(pool).unwrap();
        writer.write_all(b"kept").unwrap();
        writer.flush().unwrap();
        msg.signal_complete();

        let chunks = msg.drain_full_body();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].bytes(), &b"kept"[..]);
    }
}
