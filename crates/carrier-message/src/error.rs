//! Error types for Carrier message operations.

use thiserror::Error;

/// Result type alias for message operations.
pub type MessageResult<T> = Result<T, MessageError>;

/// Errors that can occur while operating on a message envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// The buffering mode was changed after body content was added.
    #[error("buffering mode cannot change after body content has been added")]
    BufferingSealed,

    /// A chunk was appended after the body was marked complete.
    #[error("cannot append chunk: body already marked complete")]
    BodyComplete,

    /// The body is complete and every chunk has been taken.
    #[error("body is complete and fully drained")]
    BodyDrained,

    /// A thread panicked while holding the queue lock; this retrieval
    /// failed but the stream itself is unaffected.
    #[error("interrupted while waiting for the next body chunk")]
    Interrupted,

    /// Pass-through append attempted with no sink registered; the chunk
    /// is dropped.
    #[error("no sink registered for pass-through body content")]
    SinkUnavailable,

    /// Pop attempted on an empty fault-handler stack.
    #[error("fault handler stack is empty")]
    EmptyFaultStack,

    /// The single body reader for this envelope was already handed out.
    #[error("body input stream already taken for this message")]
    ReaderTaken,

    /// A body writer for this envelope is still live.
    #[error("body output stream already taken for this message")]
    WriterTaken,
}
