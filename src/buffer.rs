//! Data buffers and the factory that produces them.
//!
//! A [`DataBuffer`] is a refcounted view over a contiguous byte range. It is
//! backed by [`bytes::Bytes`], so wrapping a buffer the engine delivered and
//! unwrapping one to hand back to the engine never copies. Ownership does
//! the bookkeeping: a buffer is released when its last view is dropped, and
//! passing it to a write moves it out of the caller's hands.

use std::fmt;
use std::ops::RangeBounds;

use bytes::{Bytes, BytesMut};

/// Default capacity used by [`DataBufferFactory::allocate_buffer`].
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// A read-only, refcounted byte buffer flowing through a body stream.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct DataBuffer {
    bytes: Bytes,
}

impl DataBuffer {
    pub fn len(&self) -> usize { self.bytes.len() }
    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }
    pub fn as_bytes(&self) -> &[u8] { &self.bytes }

    /// A zero-copy view of `range` sharing this buffer's allocation.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> DataBuffer {
        DataBuffer { bytes: self.bytes.slice(range) }
    }

    /// Unwraps the native buffer. No copy.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl AsRef<[u8]> for DataBuffer {
    fn as_ref(&self) -> &[u8] { &self.bytes }
}

impl fmt::Debug for DataBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataBuffer").field("len", &self.bytes.len()).finish()
    }
}

/// Creates buffers and converts between [`DataBuffer`] and the engine's
/// native [`Bytes`].
///
/// Adapters share one factory through an `Arc` so that buffers produced on
/// one side of a connection are directly usable on the other.
#[derive(Debug)]
pub struct DataBufferFactory {
    initial_capacity: usize,
}

impl DataBufferFactory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self { initial_capacity }
    }

    /// A writable native buffer, to be wrapped with [`wrap`](Self::wrap)
    /// once filled.
    pub fn allocate_buffer(&self) -> BytesMut {
        BytesMut::with_capacity(self.initial_capacity)
    }

    pub fn allocate_buffer_with(&self, capacity: usize) -> BytesMut {
        BytesMut::with_capacity(capacity)
    }

    /// Wraps a native buffer without copying.
    pub fn wrap(&self, bytes: impl Into<Bytes>) -> DataBuffer {
        DataBuffer { bytes: bytes.into() }
    }

    /// Copies `data` into a fresh buffer.
    pub fn copy_from(&self, data: &[u8]) -> DataBuffer {
        DataBuffer { bytes: Bytes::copy_from_slice(data) }
    }

    /// Concatenates `buffers` into one. A single buffer is returned as is.
    pub fn join(&self, buffers: Vec<DataBuffer>) -> DataBuffer {
        if buffers.len() == 1 {
            return buffers.into_iter().next().unwrap_or_default();
        }
        let total = buffers.iter().map(DataBuffer::len).sum();
        let mut joined = self.allocate_buffer_with(total);
        for buffer in &buffers {
            joined.extend_from_slice(buffer.as_bytes());
        }
        self.wrap(joined.freeze())
    }
}

impl Default for DataBufferFactory {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_and_unwrap_share_the_allocation() {
        let factory = DataBufferFactory::new();
        let native = Bytes::from_static(b"chunk 1");
        let ptr = native.as_ptr();

        let buffer = factory.wrap(native);
        assert_eq!(buffer.as_bytes().as_ptr(), ptr);
        assert_eq!(buffer.into_bytes().as_ptr(), ptr);
    }

    #[test]
    fn slice_is_a_view() {
        let factory = DataBufferFactory::new();
        let buffer = factory.copy_from(b"hello world");
        let hello = buffer.slice(..5);

        assert_eq!(hello.as_bytes(), b"hello");
        assert_eq!(hello.as_bytes().as_ptr(), buffer.as_bytes().as_ptr());
    }

    #[test]
    fn join_concatenates_in_order() {
        let factory = DataBufferFactory::with_capacity(4);
        let joined = factory.join(vec![
            factory.copy_from(b"ab"),
            factory.copy_from(b"cd"),
            factory.copy_from(b"e"),
        ]);

        assert_eq!(joined.as_bytes(), b"abcde");
        assert!(factory.join(Vec::new()).is_empty());
    }

    #[test]
    fn allocated_buffer_wraps_after_fill() {
        let factory = DataBufferFactory::new();
        let mut native = factory.allocate_buffer();
        assert!(native.capacity() >= DEFAULT_INITIAL_CAPACITY);

        native.extend_from_slice(b"payload");
        assert_eq!(factory.wrap(native.freeze()).len(), 7);
    }
}
