use std::net::SocketAddr;
use std::sync::Arc;

use http::{HeaderMap, Uri};

use crate::body::{BodyReader, BodyStream};
use crate::buffer::DataBufferFactory;
use crate::cookie;
use crate::engine::hyper::HyperServerRequest;
use crate::engine::{NativeServerRequest, ReadStream};
use crate::error::Error;
use crate::method::Method;

/// An inbound request as seen by a handler.
///
/// The body is read at most once through [`body`](ServerRequest::body);
/// nothing is pulled off the connection until the returned stream signals
/// demand.
pub struct ServerRequest<N = HyperServerRequest> {
    native: Arc<N>,
    method: Method,
    reader: BodyReader,
    factory: Arc<DataBufferFactory>,
}

impl<N> ServerRequest<N>
where
    N: NativeServerRequest + 'static,
{
    pub fn new(native: Arc<N>, factory: Arc<DataBufferFactory>) -> Self {
        let method = Method::from(native.method());
        let stream: Arc<dyn ReadStream> = native.clone();
        let reader = BodyReader::new(stream, Arc::clone(&factory));
        Self { native, method, reader, factory }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        self.native.uri()
    }

    pub fn path(&self) -> &str {
        self.native.uri().path()
    }

    pub fn query(&self) -> Option<&str> {
        self.native.uri().query()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.native.headers()
    }

    /// First value of header `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.native.headers().get(name)?.to_str().ok()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.native.remote_addr()
    }

    /// Cookies from every `cookie` header, in order.
    pub fn cookies(&self) -> Vec<(String, String)> {
        cookie::parse_request_cookies(self.native.headers())
    }

    /// Subscribes to the request body.
    ///
    /// # Errors
    ///
    /// [`Error::MultipleSubscription`] on every call after the first.
    pub fn body(&self) -> Result<BodyStream, Error> {
        self.reader.subscribe()
    }

    pub fn buffer_factory(&self) -> &Arc<DataBufferFactory> {
        &self.factory
    }
}
