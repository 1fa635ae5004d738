//! The boundary between the adapters and an HTTP engine.
//!
//! An engine is callback driven: it pushes inbound body chunks through
//! registered handlers and accepts outbound chunks through synchronous write
//! calls. The traits here are the whole surface the adapters rely on, so any
//! engine that can pause a read, resume it, and report when its write queue
//! has room can sit underneath [`BodyReader`](crate::body::BodyReader) and
//! the [`write_body`](crate::body::write_body) family.
//!
//! ```text
//!  framework                adapters                    engine
//!  ─────────                ────────                    ──────
//!  poll_next / request ──▶  BodyReader  ──pause/resume──▶ ReadStream
//!                                       ◀─data/end/error─
//!  Stream of buffers   ──▶  write_body  ──write/flush/end─▶ WriteStream
//! ```
//!
//! [`hyper`] implements the boundary over hyper 1.x.

use std::net::SocketAddr;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};

use crate::error::Error;

pub mod hyper;

#[cfg(test)]
pub(crate) mod mock;

/// Called once per inbound chunk.
pub type DataHandler = Box<dyn FnMut(Bytes) + Send + 'static>;
/// Called once when the inbound body is complete.
pub type EndHandler = Box<dyn FnOnce() + Send + 'static>;
/// Called once when the inbound body fails.
pub type ExceptionHandler = Box<dyn FnOnce(Error) + Send + 'static>;

/// An inbound body the engine pushes to registered handlers.
///
/// Handlers are invoked sequentially, never concurrently, for one stream.
/// After [`pause`](ReadStream::pause) returns, the engine delivers no further
/// data until [`resume`](ReadStream::resume). Both may be called from inside
/// a data handler.
pub trait ReadStream: Send + Sync {
    fn pause(&self);
    fn resume(&self);
    fn data_handler(&self, handler: DataHandler);
    fn end_handler(&self, handler: EndHandler);
    fn exception_handler(&self, handler: ExceptionHandler);
}

/// An outbound body the engine accepts chunks for.
pub trait WriteStream: Send {
    /// Resolves once the write queue accepts another chunk.
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        Poll::Ready(Ok(()))
    }

    /// Hands `chunk` to the engine. Must only be called after
    /// [`poll_ready`](WriteStream::poll_ready) resolved `Ok`.
    fn write(&mut self, chunk: Bytes) -> Result<(), Error>;

    /// Pushes buffered chunks towards the peer.
    fn flush(&mut self) -> Result<(), Error>;

    /// Terminates the body. Nothing may be written afterwards.
    fn end(&mut self) -> Result<(), Error>;
}

/// Header mutation on an outbound native message.
pub trait HeaderSink {
    fn put_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), Error>;
    fn put_header_values(&mut self, name: HeaderName, values: Vec<HeaderValue>) -> Result<(), Error>;
}

/// An outbound request on the client side.
pub trait NativeClientRequest: WriteStream + HeaderSink {
    fn method(&self) -> &Method;
    fn uri(&self) -> &Uri;
}

/// An inbound response on the client side.
pub trait NativeClientResponse: ReadStream {
    fn status(&self) -> u16;
    fn headers(&self) -> &HeaderMap;
}

/// An inbound request on the server side.
pub trait NativeServerRequest: ReadStream {
    fn method(&self) -> &Method;
    fn uri(&self) -> &Uri;
    fn headers(&self) -> &HeaderMap;
    fn remote_addr(&self) -> Option<SocketAddr>;
}

/// An outbound response on the server side.
pub trait NativeServerResponse: WriteStream + HeaderSink {
    fn set_status(&mut self, status: u16) -> Result<(), Error>;

    /// Whether the response head has already been handed to the engine.
    fn head_written(&self) -> bool;

    /// Tears the response down after a failure. The default simply ends it.
    fn reset(&mut self, _err: &Error) {
        let _ = self.end();
    }
}
