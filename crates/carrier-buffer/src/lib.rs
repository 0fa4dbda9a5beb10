//! carrier-buffer — fixed-capacity buffer supply for message bodies.
//!
//! The write side of a Carrier message accumulates bytes into
//! fixed-capacity buffers before handing them off as body chunks. This
//! crate defines the [`BufferPool`] trait that supplies those buffers,
//! and [`FixedBufferPool`], a default implementation that allocates
//! uniform `BytesMut` buffers on demand.
//!
//! A buffer leaves the pool's custody the moment it is finalized into a
//! chunk (`BytesMut::freeze()`), so the pool never sees buffers come
//! back — its job is uniform sizing, not recycling.

pub mod pool;

pub use pool::{BufferPool, FixedBufferPool, DEFAULT_BUFFER_CAPACITY};
