//! The message envelope — data carrier between pipeline stages.
//!
//! A [`MessageEnvelope`] aggregates one chunk queue, its stream
//! adapters, header and property maps, a fault-handler stack, and the
//! external collaborators (pass-through sink, data source). It is a
//! cheaply clonable handle (`Arc` inner) so a producer thread and a
//! consumer thread can each hold the same message.
//!
//! # Buffering vs pass-through
//!
//! In buffering mode (the default) appended chunks enter the internal
//! queue for a downstream consumer. In non-buffering mode chunks are
//! forwarded straight to a registered [`BodySink`]. The mode seals
//! itself when the first body content is added.
//!
//! # Drain-and-restore
//!
//! [`body_length`](MessageEnvelope::body_length) and
//! [`copy_of_full_body`](MessageEnvelope::copy_of_full_body) fully
//! drain the queue and re-insert the chunks afterwards. This is only
//! safe once the producer has finished appending — a concurrent append
//! during the restore window can interleave with the re-inserted
//! chunks. Callers needing these queries mid-stream must impose their
//! own mutual exclusion.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use bytes::BytesMut;
use tracing::{debug, error};

use carrier_buffer::BufferPool;

use crate::chunk::Chunk;
use crate::error::{MessageError, MessageResult};
use crate::fault::{FaultHandler, FaultHandlerStack};
use crate::queue::ChunkQueue;
use crate::sink::BodySink;
use crate::source::MessageDataSource;
use crate::stream::{BodyReader, BodyWriter};

/// An arbitrary-valued property attached to a message.
pub type PropertyValue = Arc<dyn Any + Send + Sync>;

struct EnvelopeInner {
    queue: ChunkQueue,
    buffering: AtomicBool,
    /// Seals the buffering mode once any body content has been added.
    body_added: AtomicBool,
    already_read: AtomicBool,
    headers: RwLock<HashMap<String, String>>,
    properties: RwLock<HashMap<String, PropertyValue>>,
    sink: RwLock<Option<Arc<dyn BodySink>>>,
    data_source: RwLock<Option<Arc<dyn MessageDataSource>>>,
    fault_handlers: Mutex<FaultHandlerStack>,
    /// The writer's partial buffer; lives here so completion signaling
    /// can flush it even while the writer handle is still out.
    write_buf: Mutex<Option<BytesMut>>,
    reader_taken: AtomicBool,
    writer_taken: AtomicBool,
}

/// The data carrier passed between pipeline stages.
///
/// One envelope per logical message: create a fresh envelope rather
/// than reusing one across messages.
#[derive(Clone)]
pub struct MessageEnvelope {
    inner: Arc<EnvelopeInner>,
}

impl MessageEnvelope {
    /// Create an empty envelope in buffering mode.
    pub fn new() -> Self {
        Self::with_buffering(true)
    }

    /// Create an empty envelope with an explicit buffering mode.
    ///
    /// Use `with_buffering(false)` for response-style messages whose
    /// content should flow straight to a registered sink.
    pub fn with_buffering(buffering: bool) -> Self {
        Self {
            inner: Arc::new(EnvelopeInner {
                queue: ChunkQueue::new(),
                buffering: AtomicBool::new(buffering),
                body_added: AtomicBool::new(false),
                already_read: AtomicBool::new(false),
                headers: RwLock::new(HashMap::new()),
                properties: RwLock::new(HashMap::new()),
                sink: RwLock::new(None),
                data_source: RwLock::new(None),
                fault_handlers: Mutex::new(FaultHandlerStack::new()),
                write_buf: Mutex::new(None),
                reader_taken: AtomicBool::new(false),
                writer_taken: AtomicBool::new(false),
            }),
        }
    }

    // ── Buffering mode ─────────────────────────────────────────────

    /// Switch between buffering and pass-through mode.
    ///
    /// Fails with [`MessageError::BufferingSealed`] once any body
    /// content has been added.
    pub fn set_buffering(&self, buffering: bool) -> MessageResult<()> {
        if self.inner.body_added.load(Ordering::SeqCst) {
            return Err(MessageError::BufferingSealed);
        }
        self.inner.buffering.store(buffering, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_buffering(&self) -> bool {
        self.inner.buffering.load(Ordering::SeqCst)
    }

    // ── Body operations ────────────────────────────────────────────

    /// Append one body chunk, sealing the buffering mode.
    ///
    /// Buffering mode: the chunk enters the internal queue. Pass-through
    /// mode: the chunk goes straight to the registered sink; with no
    /// sink the chunk is dropped and [`MessageError::SinkUnavailable`]
    /// reported.
    pub fn append_chunk(&self, chunk: Chunk) -> MessageResult<()> {
        self.inner.body_added.store(true, Ordering::SeqCst);
        if self.is_buffering() {
            return self.inner.queue.append(chunk);
        }
        match self.sink() {
            Some(sink) => {
                sink.write(chunk);
                Ok(())
            }
            None => {
                error!("cannot write body content: no registered sink");
                Err(MessageError::SinkUnavailable)
            }
        }
    }

    /// Take the next body chunk, blocking until one is available.
    ///
    /// Returns `None` at end-of-stream or if the retrieval failed;
    /// failures are logged here rather than propagated as panics.
    pub fn next_chunk(&self) -> Option<Chunk> {
        match self.inner.queue.take_next() {
            Ok(chunk) => Some(chunk),
            Err(MessageError::BodyDrained) => None,
            Err(e) => {
                error!(error = %e, "failed to retrieve chunk from queue");
                None
            }
        }
    }

    /// Block until the body is complete and return every chunk, in
    /// arrival order.
    ///
    /// Destructive: the queue is left empty. Callers needing to re-read
    /// must re-append (or use [`copy_of_full_body`]).
    ///
    /// [`copy_of_full_body`]: MessageEnvelope::copy_of_full_body
    pub fn drain_full_body(&self) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        loop {
            if self.inner.queue.is_complete() && self.inner.queue.is_empty() {
                break;
            }
            match self.inner.queue.take_next() {
                Ok(chunk) => chunks.push(chunk),
                Err(MessageError::BodyDrained) => break,
                Err(e) => {
                    error!(error = %e, "failed while draining full message body");
                    break;
                }
            }
        }
        chunks
    }

    /// Total readable bytes of the full body.
    ///
    /// Drains the queue, sums each chunk's length, then restores the
    /// same chunks in order so the body stays readable. See the module
    /// docs for the drain-and-restore safety constraint.
    pub fn body_length(&self) -> usize {
        let chunks = self.drain_full_body();
        let length = chunks.iter().map(Chunk::len).sum();
        for chunk in chunks {
            self.inner.queue.requeue(chunk);
        }
        length
    }

    /// Independent deep copies of every body chunk.
    ///
    /// Drains the queue, restores the originals, and returns copies
    /// that share no storage with the live stream — inspection or
    /// replay cannot disturb the stream's read position. Same
    /// drain-and-restore constraint as [`body_length`].
    ///
    /// [`body_length`]: MessageEnvelope::body_length
    pub fn copy_of_full_body(&self) -> Vec<Chunk> {
        let chunks = self.drain_full_body();
        let copies = chunks.iter().map(Chunk::deep_copy).collect();
        for chunk in chunks {
            self.inner.queue.requeue(chunk);
        }
        copies
    }

    /// Signal that the last body content has been added.
    ///
    /// Flushes the writer's pending partial buffer into the body (a
    /// flush failure is logged and the writer force-closed), marks the
    /// queue complete, and notifies a registered sink that this was the
    /// last chunk. Completion itself is idempotent; the flush and sink
    /// notification run on every call.
    pub fn signal_complete(&self) {
        if let Err(e) = self.flush_pending_write_buf() {
            error!(error = %e, "failed to flush pending output buffer; closing writer");
            self.force_close_writer();
        }
        self.inner.queue.mark_complete();
        if let Some(sink) = self.sink() {
            sink.write_last(self);
        }
    }

    /// True once the producer has signalled completion.
    pub fn is_complete(&self) -> bool {
        self.inner.queue.is_complete()
    }

    /// True while no chunks are queued.
    pub fn is_empty(&self) -> bool {
        self.inner.queue.is_empty()
    }

    /// True once any byte has been consumed through the body reader.
    pub fn already_read(&self) -> bool {
        self.inner.already_read.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_already_read(&self) {
        self.inner.already_read.store(true, Ordering::Relaxed);
    }

    // ── Stream adapters ────────────────────────────────────────────

    /// Hand out the single body reader for this message.
    ///
    /// At most one logical reader drains an envelope over its lifetime;
    /// a second request fails with [`MessageError::ReaderTaken`].
    pub fn input_stream(&self) -> MessageResult<BodyReader> {
        if self.inner.reader_taken.swap(true, Ordering::SeqCst) {
            return Err(MessageError::ReaderTaken);
        }
        debug!("body reader handed out");
        Ok(BodyReader::new(self.clone()))
    }

    /// Hand out a body writer accumulating into pool-supplied buffers.
    ///
    /// One live writer at a time; the slot is released when the writer
    /// is dropped, so a fresh writer can start a new write sequence.
    pub fn output_stream(&self, pool: Arc<dyn BufferPool>) -> MessageResult<BodyWriter> {
        if self.inner.writer_taken.swap(true, Ordering::SeqCst) {
            return Err(MessageError::WriterTaken);
        }
        debug!("body writer handed out");
        Ok(BodyWriter::new(self.clone(), pool))
    }

    /// Finalize a non-empty pending write buffer into the body.
    fn flush_pending_write_buf(&self) -> MessageResult<()> {
        let pending = self
            .inner
            .write_buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match pending {
            Some(buf) if !buf.is_empty() => self.append_chunk(Chunk::new(buf.freeze())),
            _ => Ok(()),
        }
    }

    pub(crate) fn force_close_writer(&self) {
        *self
            .inner
            .write_buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.inner.writer_taken.store(false, Ordering::SeqCst);
    }

    pub(crate) fn with_write_buf<R>(&self, f: impl FnOnce(&mut Option<BytesMut>) -> R) -> R {
        let mut slot = self
            .inner
            .write_buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut slot)
    }

    // ── Headers ────────────────────────────────────────────────────

    /// Get a header value by key.
    pub fn header(&self, key: &str) -> Option<String> {
        self.read_headers().get(key).cloned()
    }

    /// Set a header; last write wins.
    pub fn set_header(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write_headers().insert(key.into(), value.into());
    }

    /// Merge a batch of headers.
    pub fn set_headers(&self, entries: impl IntoIterator<Item = (String, String)>) {
        let mut headers = self.write_headers();
        for (key, value) in entries {
            headers.insert(key, value);
        }
    }

    /// Remove a header, returning its previous value.
    pub fn remove_header(&self, key: &str) -> Option<String> {
        self.write_headers().remove(key)
    }

    /// Snapshot of all headers.
    pub fn headers(&self) -> HashMap<String, String> {
        self.read_headers().clone()
    }

    // ── Properties ─────────────────────────────────────────────────

    /// Attach an arbitrary-valued property.
    pub fn set_property<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.write_properties().insert(key.into(), Arc::new(value));
    }

    /// Get a property downcast to a concrete type.
    pub fn property<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.read_properties().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Get a property as its type-erased value.
    pub fn property_raw(&self, key: &str) -> Option<PropertyValue> {
        self.read_properties().get(key).cloned()
    }

    /// Remove a property.
    pub fn remove_property(&self, key: &str) -> Option<PropertyValue> {
        self.write_properties().remove(key)
    }

    pub(crate) fn properties_snapshot(&self) -> HashMap<String, PropertyValue> {
        self.read_properties().clone()
    }

    pub(crate) fn set_properties(&self, entries: HashMap<String, PropertyValue>) {
        self.write_properties().extend(entries);
    }

    // ── Collaborators ──────────────────────────────────────────────

    /// Register the pass-through sink used in non-buffering mode.
    pub fn set_sink(&self, sink: Arc<dyn BodySink>) {
        *self
            .inner
            .sink
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    pub fn sink(&self) -> Option<Arc<dyn BodySink>> {
        self.inner
            .sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Attach a pre-materialized data source; orthogonal to the chunk
    /// stream.
    pub fn set_data_source(&self, source: Arc<dyn MessageDataSource>) {
        *self
            .inner
            .data_source
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(source);
    }

    pub fn data_source(&self) -> Option<Arc<dyn MessageDataSource>> {
        self.inner
            .data_source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── Fault handler stack ────────────────────────────────────────

    /// Push a fault-handling scope.
    pub fn push_fault_handler(&self, handler: Arc<dyn FaultHandler>) {
        self.lock_fault_handlers().push(handler);
    }

    /// Pop the innermost fault-handling scope.
    pub fn pop_fault_handler(&self) -> MessageResult<Arc<dyn FaultHandler>> {
        self.lock_fault_handlers().pop()
    }

    /// The innermost scope without removing it.
    pub fn peek_fault_handler(&self) -> Option<Arc<dyn FaultHandler>> {
        self.lock_fault_handlers().peek()
    }

    /// Install a completely new handling scope, e.g. when delegating to
    /// a sub-pipeline.
    pub fn replace_fault_handlers(&self, handlers: Vec<Arc<dyn FaultHandler>>) {
        self.lock_fault_handlers().replace_all(handlers);
    }

    pub fn fault_handler_count(&self) -> usize {
        self.lock_fault_handlers().len()
    }

    // ── Lock helpers ───────────────────────────────────────────────

    fn read_headers(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, String>> {
        self.inner
            .headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_headers(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, String>> {
        self.inner
            .headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_properties(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, PropertyValue>> {
        self.inner
            .properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_properties(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, PropertyValue>> {
        self.inner
            .properties
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_fault_handlers(&self) -> std::sync::MutexGuard<'_, FaultHandlerStack> {
        self.inner
            .fault_handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MessageEnvelope {
    fn default() -> Self {
        Self::new()
    }
}
