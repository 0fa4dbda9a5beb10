//! LIFO registry of pipeline fault-handling scopes.
//!
//! Pipeline stages push a handler before entering a scope and pop it on
//! exit; when a stage hits a processing error it pops the innermost
//! handler and invokes it. The envelope performs no automatic
//! unwinding — the push/pop discipline is entirely caller-driven.

use std::sync::Arc;

use crate::error::{MessageError, MessageResult};

/// A recovery point for processing errors raised by pipeline stages.
///
/// Opaque to the transport core: the envelope only stores and hands
/// back handlers, it never invokes them itself.
pub trait FaultHandler: Send + Sync {
    /// React to a fault identified by a stage-defined code.
    fn handle_fault(&self, code: &str, reason: &str);
}

/// A LIFO stack of fault handlers scoped to one message.
#[derive(Default)]
pub struct FaultHandlerStack {
    handlers: Vec<Arc<dyn FaultHandler>>,
}

impl FaultHandlerStack {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Push a handler onto the top of the stack.
    pub fn push(&mut self, handler: Arc<dyn FaultHandler>) {
        self.handlers.push(handler);
    }

    /// Remove and return the top handler.
    pub fn pop(&mut self) -> MessageResult<Arc<dyn FaultHandler>> {
        self.handlers.pop().ok_or(MessageError::EmptyFaultStack)
    }

    /// The top handler without removing it.
    pub fn peek(&self) -> Option<Arc<dyn FaultHandler>> {
        self.handlers.last().cloned()
    }

    /// Replace the whole stack, e.g. when delegating to a sub-pipeline
    /// that installs its own handling scope.
    pub fn replace_all(&mut self, handlers: Vec<Arc<dyn FaultHandler>>) {
        self.handlers = handlers;
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
