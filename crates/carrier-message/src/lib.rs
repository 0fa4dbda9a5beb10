//! carrier-message — chunked message-body transport between pipeline stages.
//!
//! The [`MessageEnvelope`] is the data carrier handed from transport
//! readers through protocol codecs to application handlers. It decouples
//! the producer of body bytes from the consumer with an unbounded FIFO
//! handoff queue of opaque [`Chunk`]s, layered with blocking `std::io`
//! stream adapters, and carries the message's headers, properties, and
//! a LIFO stack of fault-handling scopes.
//!
//! # Architecture
//!
//! - **`queue`** — mutex/condvar-guarded chunk FIFO with a completion flag
//! - **`chunk`** — one bounded, read-once unit of body bytes
//! - **`envelope`** — the aggregate orchestrating state transitions
//! - **`stream`** — single-instance [`BodyReader`] / [`BodyWriter`] adapters
//! - **`fault`** — caller-driven LIFO of [`FaultHandler`] scopes
//! - **`sink`** / **`source`** — collaborator interfaces for pass-through
//!   output and pre-materialized bodies
//!
//! # Concurrency
//!
//! One producer thread appends chunks (directly or through the writer);
//! one consumer thread drains them (directly or through the reader).
//! The queue is the only structure they share mutably: appends never
//! block, retrieval blocks until data arrives or the completed queue
//! drains empty. Chunks arrive in append order, without loss or
//! duplication. The envelope handle itself is `Clone` (`Arc` inner) so
//! both threads can hold the same message.

pub mod chunk;
pub mod envelope;
pub mod error;
pub mod fault;
pub mod queue;
pub mod sink;
pub mod source;
pub mod stream;
pub mod util;

pub use chunk::Chunk;
pub use envelope::{MessageEnvelope, PropertyValue};
pub use error::{MessageError, MessageResult};
pub use fault::{FaultHandler, FaultHandlerStack};
pub use queue::ChunkQueue;
pub use sink::BodySink;
pub use source::MessageDataSource;
pub use stream::{BodyReader, BodyWriter};
