//! Whole-message conveniences built on the body operations.

use carrier_buffer::BufferPool;

use crate::chunk::Chunk;
use crate::envelope::MessageEnvelope;
use crate::error::MessageResult;

/// Fill a message body from a string and signal completion.
///
/// The text is split into pool-capacity-sized chunks so downstream
/// consumers see the same chunking a streamed body would have.
pub fn set_text_body(
    envelope: &MessageEnvelope,
    text: &str,
    pool: &dyn BufferPool,
) -> MessageResult<()> {
    for part in text.as_bytes().chunks(pool.capacity()) {
        let mut buf = pool.acquire();
        buf.extend_from_slice(part);
        envelope.append_chunk(Chunk::new(buf.freeze()))?;
    }
    envelope.signal_complete();
    Ok(())
}

/// Deep-clone a message: copied headers, shared property values, and an
/// independent copy of the full body.
///
/// Blocks until the source body is complete. The source is left intact
/// (its chunks are drained and restored); the clone is always a
/// buffering-mode envelope with mirrored completion state. Fault
/// handlers are scoped to a pipeline traversal and are not carried
/// over.
pub fn clone_message(source: &MessageEnvelope) -> MessageResult<MessageEnvelope> {
    let clone = MessageEnvelope::new();
    clone.set_headers(source.headers());
    clone.set_properties(source.properties_snapshot());
    for chunk in source.copy_of_full_body() {
        clone.append_chunk(chunk)?;
    }
    if source.is_complete() {
        clone.signal_complete();
    }
    Ok(clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carrier_buffer::FixedBufferPool;

    #[test]
    fn text_body_chunks_by_pool_capacity() {
        let msg = MessageEnvelope::new();
        let pool = FixedBufferPool::new(4);

        set_text_body(&msg, "hello world", &pool).unwrap();
        assert!(msg.is_complete());

        let chunks = msg.drain_full_body();
        let parts: Vec<&[u8]> = chunks.iter().map(|c| c.bytes().as_ref()).collect();
        assert_eq!(parts, vec![&b"hell"[..], &b"o wo"[..], &b"rld"[..]]);
    }

    #[test]
    fn empty_text_body_just_completes() {
        let msg = MessageEnvelope::new();
        let pool = FixedBufferPool::new(8);

        set_text_body(&msg, "", &pool).unwrap();
        assert!(msg.is_complete());
        assert!(msg.is_empty());
    }

    #[test]
    fn clone_carries_headers_properties_and_body() {
        let source = MessageEnvelope::new();
        source.set_header("route", "ingress");
        source.set_property("attempt", 2u32);
        source.append_chunk(Chunk::from(&b"payload"[..])).unwrap();
        source.signal_complete();

        let clone = clone_message(&source).unwrap();

        assert_eq!(clone.header("route").as_deref(), Some("ingress"));
        assert_eq!(clone.property::<u32>("attempt").as_deref(), Some(&2));
        assert!(clone.is_complete());

        let cloned_body = clone.drain_full_body();
        assert_eq!(cloned_body.len(), 1);
        assert_eq!(cloned_body[0].bytes(), &b"payload"[..]);

        // Source body survives the clone.
        assert_eq!(source.body_length(), 7);
    }
}
