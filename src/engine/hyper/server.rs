//! Server-side native messages over hyper.

use std::net::SocketAddr;
use std::task::{Context, Poll};

use ::hyper::body::Incoming;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri};
use tokio::sync::oneshot;
use tracing::{debug, trace};

use super::incoming::IncomingStream;
use super::outgoing::{self, BodySender, ChannelBody};
use crate::engine::{
    DataHandler, EndHandler, ExceptionHandler, HeaderSink, NativeServerRequest,
    NativeServerResponse, ReadStream, WriteStream,
};
use crate::error::Error;

/// An inbound request as hyper delivered it.
pub struct HyperServerRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    body: IncomingStream,
}

impl HyperServerRequest {
    pub fn new(req: Request<Incoming>, remote_addr: Option<SocketAddr>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            remote_addr,
            body: IncomingStream::new(body),
        }
    }
}

impl ReadStream for HyperServerRequest {
    fn pause(&self) { self.body.pause() }
    fn resume(&self) { self.body.resume() }
    fn data_handler(&self, handler: DataHandler) { self.body.data_handler(handler) }
    fn end_handler(&self, handler: EndHandler) { self.body.end_handler(handler) }
    fn exception_handler(&self, handler: ExceptionHandler) { self.body.exception_handler(handler) }
}

impl NativeServerRequest for HyperServerRequest {
    fn method(&self) -> &Method { &self.method }
    fn uri(&self) -> &Uri { &self.uri }
    fn headers(&self) -> &HeaderMap { &self.headers }
    fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }
}

/// An outbound response. The head travels to hyper through a oneshot on
/// the first write or on `end`; the body follows through a channel.
pub struct HyperServerResponse {
    status: StatusCode,
    headers: HeaderMap,
    head: Option<oneshot::Sender<Response<ChannelBody>>>,
    sender: BodySender,
    body: Option<ChannelBody>,
}

impl HyperServerResponse {
    /// Returns the response and the receiver the connection task awaits
    /// for the head.
    pub fn new(write_queue_size: usize) -> (Self, oneshot::Receiver<Response<ChannelBody>>) {
        let (head_tx, head_rx) = oneshot::channel();
        let (sender, body) = outgoing::channel(write_queue_size);
        let res = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            head: Some(head_tx),
            sender,
            body: Some(body),
        };
        (res, head_rx)
    }

    fn send_head(&mut self, body: ChannelBody) {
        let Some(head) = self.head.take() else { return };
        let mut res = Response::new(body);
        *res.status_mut() = self.status;
        *res.headers_mut() = std::mem::take(&mut self.headers);
        trace!(status = self.status.as_u16(), "response head written");
        if head.send(res).is_err() {
            debug!("connection closed before the response head was written");
        }
    }

    fn ensure_head(&mut self) {
        if let Some(body) = self.body.take() {
            self.send_head(body);
        }
    }
}

impl WriteStream for HyperServerResponse {
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        self.sender.poll_ready(cx)
    }

    fn write(&mut self, chunk: Bytes) -> Result<(), Error> {
        self.ensure_head();
        self.sender.send(chunk)
    }

    fn flush(&mut self) -> Result<(), Error> {
        // hyper writes each frame to the socket as soon as it polls it.
        self.ensure_head();
        Ok(())
    }

    fn end(&mut self) -> Result<(), Error> {
        if self.body.take().is_some() {
            self.send_head(ChannelBody::empty());
        }
        self.sender.close();
        Ok(())
    }
}

impl HeaderSink for HyperServerResponse {
    fn put_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), Error> {
        if self.head_written() {
            return Err(Error::Committed);
        }
        self.headers.insert(name, value);
        Ok(())
    }

    fn put_header_values(&mut self, name: HeaderName, values: Vec<HeaderValue>) -> Result<(), Error> {
        if self.head_written() {
            return Err(Error::Committed);
        }
        self.headers.remove(&name);
        for value in values {
            self.headers.append(name.clone(), value);
        }
        Ok(())
    }
}

impl NativeServerResponse for HyperServerResponse {
    fn set_status(&mut self, status: u16) -> Result<(), Error> {
        if self.head_written() {
            return Err(Error::Committed);
        }
        self.status = StatusCode::from_u16(status)?;
        Ok(())
    }

    fn head_written(&self) -> bool {
        self.head.is_none()
    }

    fn reset(&mut self, err: &Error) {
        if self.head_written() {
            self.sender.abort(Error::transport(err.to_string()));
        } else {
            self.status = StatusCode::INTERNAL_SERVER_ERROR;
            self.headers.clear();
            let _ = self.end();
        }
    }
}
