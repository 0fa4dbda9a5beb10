//! Pass-through sink for non-buffering messages.

use crate::chunk::Chunk;
use crate::envelope::MessageEnvelope;

/// Receives body chunks directly when the envelope is in non-buffering
/// mode, instead of the chunks entering the internal queue.
///
/// Implemented by transport-side response writers; the core only calls
/// into it, never the other way around.
pub trait BodySink: Send + Sync {
    /// Accept one body chunk. Ownership transfers to the sink.
    fn write(&self, chunk: Chunk);

    /// The message's body is complete; no further chunks will arrive.
    fn write_last(&self, envelope: &MessageEnvelope);
}
