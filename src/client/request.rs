use std::sync::Arc;

use futures_core::Stream;
use http::header::COOKIE;
use http::{HeaderMap, Uri};
use tracing::trace;

use crate::body;
use crate::buffer::{DataBuffer, DataBufferFactory};
use crate::cookie;
use crate::engine::NativeClientRequest;
use crate::engine::hyper::HyperClientRequest;
use crate::error::Error;
use crate::headers;
use crate::method::Method;

/// An outbound request as seen by the code building it.
///
/// Headers and cookies are buffered until the request commits, which
/// happens on the first body write, on
/// [`set_complete`](ClientRequest::set_complete), or on an explicit
/// [`commit`](ClientRequest::commit).
pub struct ClientRequest<N = HyperClientRequest> {
    native: N,
    method: Method,
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
    committed: bool,
    ended: bool,
    factory: Arc<DataBufferFactory>,
}

impl<N> ClientRequest<N>
where
    N: NativeClientRequest,
{
    pub fn new(native: N, factory: Arc<DataBufferFactory>) -> Self {
        let method = Method::from(native.method());
        Self {
            native,
            method,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            committed: false,
            ended: false,
            factory,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        self.native.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// # Errors
    ///
    /// [`Error::Committed`] once the head went to the engine.
    pub fn headers_mut(&mut self) -> Result<&mut HeaderMap, Error> {
        self.ensure_open()?;
        Ok(&mut self.headers)
    }

    pub fn add_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<(), Error> {
        self.ensure_open()?;
        self.cookies.push((name.into(), value.into()));
        Ok(())
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    pub fn buffer_factory(&self) -> &Arc<DataBufferFactory> {
        &self.factory
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Copies the buffered headers, with cookies folded into one `cookie`
    /// header, onto the native request.
    pub fn apply_headers(&mut self) -> Result<(), Error> {
        if !self.cookies.is_empty() {
            let line = cookie::request_cookie_header(&self.cookies)?;
            self.headers.append(COOKIE, line);
            self.cookies.clear();
        }
        headers::apply_headers(&self.headers, &mut self.native)
    }

    /// Writes the headers to the engine. Idempotent.
    pub fn commit(&mut self) -> Result<(), Error> {
        if self.committed {
            return Ok(());
        }
        self.apply_headers()?;
        self.committed = true;
        trace!(method = %self.method, uri = %self.native.uri(), "request committed");
        Ok(())
    }

    /// Commits, then streams `source` as the body and ends the request.
    pub async fn write_with<S>(&mut self, source: S) -> Result<(), Error>
    where
        S: Stream<Item = Result<DataBuffer, Error>>,
    {
        self.commit()?;
        self.ensure_writable()?;
        let result = body::write_body(&mut self.native, source).await;
        self.ended = result.is_ok();
        result
    }

    /// Like [`write_with`](ClientRequest::write_with), flushing after each
    /// inner stream.
    pub async fn write_and_flush_with<S, P>(&mut self, source: S) -> Result<(), Error>
    where
        S: Stream<Item = P>,
        P: Stream<Item = Result<DataBuffer, Error>>,
    {
        self.commit()?;
        self.ensure_writable()?;
        let result = body::write_and_flush_body(&mut self.native, source).await;
        self.ended = result.is_ok();
        result
    }

    /// Commits and ends the request without a body. Does nothing once the
    /// body has ended.
    pub fn set_complete(&mut self) -> Result<(), Error> {
        if self.ended {
            return Ok(());
        }
        self.commit()?;
        self.ended = true;
        self.native.end()
    }

    pub(crate) fn native_mut(&mut self) -> &mut N {
        &mut self.native
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.committed {
            return Err(Error::Committed);
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), Error> {
        if self.ended {
            return Err(Error::Closed);
        }
        Ok(())
    }
}
