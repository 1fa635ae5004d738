use std::sync::Arc;

use futures_core::Stream;
use http::header::SET_COOKIE;
use http::{HeaderMap, StatusCode};
use tracing::{debug, trace};

use crate::body;
use crate::buffer::{DataBuffer, DataBufferFactory};
use crate::cookie::ResponseCookie;
use crate::engine::NativeServerResponse;
use crate::engine::hyper::HyperServerResponse;
use crate::error::Error;
use crate::headers;
use crate::status::Status;

/// An outbound response as seen by a handler.
///
/// Status, headers and cookies are buffered here and handed to the engine
/// in one go when the response commits: on the first body write, on
/// [`set_complete`](ServerResponse::set_complete), or on an explicit
/// [`commit`](ServerResponse::commit). After that they are read-only.
pub struct ServerResponse<N = HyperServerResponse> {
    native: N,
    status: u16,
    headers: HeaderMap,
    cookies: Vec<ResponseCookie>,
    committed: bool,
    ended: bool,
    factory: Arc<DataBufferFactory>,
}

impl<N> ServerResponse<N>
where
    N: NativeServerResponse,
{
    pub fn new(native: N, factory: Arc<DataBufferFactory>) -> Self {
        Self {
            native,
            status: 200,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            committed: false,
            ended: false,
            factory,
        }
    }

    // ── Head ──────────────────────────────────────────────────────────────────

    pub fn set_status(&mut self, status: Status) -> Result<(), Error> {
        self.set_raw_status(status.into())
    }

    /// Sets a status that may have no [`Status`] variant.
    pub fn set_raw_status(&mut self, status: u16) -> Result<(), Error> {
        self.ensure_open()?;
        StatusCode::from_u16(status)?;
        self.status = status;
        Ok(())
    }

    /// `None` when the raw code is not a registered status.
    pub fn status(&self) -> Option<Status> {
        Status::try_from(self.status).ok()
    }

    pub fn raw_status(&self) -> u16 {
        self.status
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

    pub fn add_cookie(&mut self, cookie: ResponseCookie) -> Result<(), Error> {
        self.ensure_open()?;
        self.cookies.push(cookie);
        Ok(())
    }

    pub fn cookies(&self) -> &[ResponseCookie] {
        &self.cookies
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Copies the buffered headers and cookies onto the native response.
    ///
    /// Runs as part of [`commit`](ServerResponse::commit); calling it again
    /// re-applies every header.
    pub fn apply_headers(&mut self) -> Result<(), Error> {
        for cookie in self.cookies.drain(..) {
            self.headers.append(SET_COOKIE, cookie.to_header_value()?);
        }
        headers::apply_headers(&self.headers, &mut self.native)
    }

    /// Writes status and headers to the engine. Idempotent.
    pub fn commit(&mut self) -> Result<(), Error> {
        if self.committed {
            return Ok(());
        }
        self.native.set_status(self.status)?;
        self.apply_headers()?;
        self.committed = true;
        trace!(status = self.status, "response committed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.committed {
            return Err(Error::Committed);
        }
        Ok(())
    }

    // ── Body ──────────────────────────────────────────────────────────────────

    /// Commits, then streams `source` as the body and ends the response.
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

    /// Like [`write_with`](ServerResponse::write_with), flushing after each
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

    /// Commits and ends the response without a body. Does nothing once the
    /// body has ended.
    pub fn set_complete(&mut self) -> Result<(), Error> {
        if self.ended {
            return Ok(());
        }
        self.commit()?;
        self.ended = true;
        self.native.end()
    }

    pub fn buffer_factory(&self) -> &Arc<DataBufferFactory> {
        &self.factory
    }

    fn ensure_writable(&self) -> Result<(), Error> {
        if self.ended {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Turns a handler failure into a `500` when nothing has been sent yet,
    /// or tears the body down when the head is already out.
    pub(crate) fn fail(&mut self, err: &Error) {
        if self.ended {
            return;
        }
        if !self.committed && !self.native.head_written() {
            debug!(error = %err, "handler failed before commit, answering 500");
            self.status = StatusCode::INTERNAL_SERVER_ERROR.as_u16();
            self.headers.clear();
            self.cookies.clear();
            if self.set_complete().is_ok() {
                return;
            }
        }
        debug!(error = %err, "handler failed mid-body, resetting");
        self.ended = true;
        self.native.reset(err);
    }
}
