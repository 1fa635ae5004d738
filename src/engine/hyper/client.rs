//! Client-side native messages over hyper's connection-level client.

use std::task::{Context, Poll};

use ::hyper::body::Incoming;
use ::hyper::client::conn::http1::SendRequest;
use bytes::Bytes;
use http::header::HOST;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, Uri};
use tokio::sync::oneshot;
use tracing::{debug, trace};

use super::incoming::IncomingStream;
use super::outgoing::{self, BodySender, ChannelBody};
use crate::engine::{
    DataHandler, EndHandler, ExceptionHandler, HeaderSink, NativeClientRequest,
    NativeClientResponse, ReadStream, WriteStream,
};
use crate::error::Error;

type ResponseReceiver = oneshot::Receiver<Result<Response<Incoming>, Error>>;

/// An outbound request bound to one HTTP/1.1 connection.
///
/// Headers are buffered until the first write or `end`; at that point the
/// head is dispatched and the response is awaited in the background.
pub struct HyperClientRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    connection: Option<SendRequest<ChannelBody>>,
    response: Option<oneshot::Sender<Result<Response<Incoming>, Error>>>,
    sender: BodySender,
    body: Option<ChannelBody>,
}

impl HyperClientRequest {
    pub(crate) fn new(
        method: Method,
        uri: Uri,
        connection: SendRequest<ChannelBody>,
        write_queue_size: usize,
    ) -> (Self, ResponseReceiver) {
        let (response_tx, response_rx) = oneshot::channel();
        let (sender, body) = outgoing::channel(write_queue_size);
        let req = Self {
            method,
            uri,
            headers: HeaderMap::new(),
            connection: Some(connection),
            response: Some(response_tx),
            sender,
            body: Some(body),
        };
        (req, response_rx)
    }

    fn send_head(&mut self, body: ChannelBody) -> Result<(), Error> {
        let (Some(mut connection), Some(response)) = (self.connection.take(), self.response.take())
        else {
            return Ok(());
        };

        if !self.headers.contains_key(HOST) {
            if let Some(authority) = self.uri.authority() {
                self.headers.insert(HOST, HeaderValue::from_str(authority.as_str())?);
            }
        }
        let target = self.uri.path_and_query().map_or("/", |pq| pq.as_str());

        let mut req = Request::new(body);
        *req.method_mut() = self.method.clone();
        *req.uri_mut() = target.parse()?;
        *req.headers_mut() = std::mem::take(&mut self.headers);
        trace!(method = %self.method, uri = %self.uri, "request head dispatched");

        tokio::spawn(async move {
            let result = match connection.ready().await {
                Ok(()) => connection.send_request(req).await.map_err(Error::from),
                Err(err) => Err(Error::from(err)),
            };
            if response.send(result).is_err() {
                debug!("response dropped before it arrived");
            }
        });
        Ok(())
    }

    fn ensure_head(&mut self) -> Result<(), Error> {
        match self.body.take() {
            Some(body) => self.send_head(body),
            None => Ok(()),
        }
    }

    fn head_written(&self) -> bool {
        self.connection.is_none()
    }

    /// Fails a body that is already on the wire. Before the head went out
    /// there is nothing to tear down and the request is simply never sent.
    pub(crate) fn abort(&mut self, err: &Error) {
        if self.head_written() {
            self.sender.abort(Error::transport(err.to_string()));
        }
    }
}

impl WriteStream for HyperClientRequest {
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        self.sender.poll_ready(cx)
    }

    fn write(&mut self, chunk: Bytes) -> Result<(), Error> {
        self.ensure_head()?;
        self.sender.send(chunk)
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.ensure_head()
    }

    fn end(&mut self) -> Result<(), Error> {
        if self.body.take().is_some() {
            self.send_head(ChannelBody::empty())?;
        }
        self.sender.close();
        Ok(())
    }
}

impl HeaderSink for HyperClientRequest {
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

impl NativeClientRequest for HyperClientRequest {
    fn method(&self) -> &Method { &self.method }
    fn uri(&self) -> &Uri { &self.uri }
}

/// An inbound response as hyper delivered it.
pub struct HyperClientResponse {
    status: u16,
    headers: HeaderMap,
    body: IncomingStream,
}

impl HyperClientResponse {
    pub fn new(res: Response<Incoming>) -> Self {
        let (parts, body) = res.into_parts();
        Self {
            status: parts.status.as_u16(),
            headers: parts.headers,
            body: IncomingStream::new(body),
        }
    }
}

impl ReadStream for HyperClientResponse {
    fn pause(&self) { self.body.pause() }
    fn resume(&self) { self.body.resume() }
    fn data_handler(&self, handler: DataHandler) { self.body.data_handler(handler) }
    fn end_handler(&self, handler: EndHandler) { self.body.end_handler(handler) }
    fn exception_handler(&self, handler: ExceptionHandler) { self.body.exception_handler(handler) }
}

impl NativeClientResponse for HyperClientResponse {
    fn status(&self) -> u16 { self.status }
    fn headers(&self) -> &HeaderMap { &self.headers }
}
