use std::sync::Arc;

use http::HeaderMap;

use crate::body::{BodyReader, BodyStream};
use crate::buffer::DataBufferFactory;
use crate::cookie;
use crate::engine::hyper::HyperClientResponse;
use crate::engine::{NativeClientResponse, ReadStream};
use crate::error::Error;
use crate::status::Status;

/// An inbound response on the client side.
pub struct ClientResponse<N = HyperClientResponse> {
    native: Arc<N>,
    reader: BodyReader,
    factory: Arc<DataBufferFactory>,
}

impl<N> ClientResponse<N>
where
    N: NativeClientResponse + 'static,
{
    pub fn new(native: Arc<N>, factory: Arc<DataBufferFactory>) -> Self {
        let stream: Arc<dyn ReadStream> = native.clone();
        let reader = BodyReader::new(stream, Arc::clone(&factory));
        Self { native, reader, factory }
    }

    /// `None` when the peer answered with an unregistered code; see
    /// [`raw_status`](ClientResponse::raw_status).
    pub fn status(&self) -> Option<Status> {
        Status::try_from(self.native.status()).ok()
    }

    pub fn raw_status(&self) -> u16 {
        self.native.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.native.headers()
    }

    /// Name/value pairs of every `set-cookie` header.
    pub fn cookies(&self) -> Vec<(String, String)> {
        cookie::parse_response_cookies(self.native.headers())
    }

    /// Subscribes to the response body.
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

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use http::header::SET_COOKIE;
    use http::{HeaderValue, Method, Uri};

    use super::*;
    use crate::engine::mock::MockInbound;

    fn response(status: u16, headers: HeaderMap) -> (ClientResponse<MockInbound>, Arc<crate::engine::mock::MockReadStream>) {
        let (native, stream) = MockInbound::with(Method::GET, Uri::from_static("/"), status, headers);
        (ClientResponse::new(native, Arc::new(DataBufferFactory::new())), stream)
    }

    #[test]
    fn unregistered_status_is_raw_only() {
        let (res, _) = response(299, HeaderMap::new());
        assert_eq!(res.status(), None);
        assert_eq!(res.raw_status(), 299);

        let (res, _) = response(404, HeaderMap::new());
        assert_eq!(res.status(), Some(Status::NotFound));
    }

    #[test]
    fn set_cookie_headers_are_parsed() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        let (res, _) = response(200, headers);

        assert_eq!(res.cookies(), vec![
            ("a".to_owned(), "1".to_owned()),
            ("b".to_owned(), "2".to_owned()),
        ]);
    }

    #[tokio::test]
    async fn body_streams_engine_chunks() {
        let (res, stream) = response(200, HeaderMap::new());
        let mut body = res.body().unwrap();
        stream.feed(&[b"chunk 1", b"chunk 2"]);
        stream.feed_end();

        let first = body.next().await.unwrap().unwrap();
        let second = body.next().await.unwrap().unwrap();
        assert_eq!(first.as_bytes(), b"chunk 1");
        assert_eq!(second.as_bytes(), b"chunk 2");
        assert!(body.next().await.is_none());
        assert!(matches!(res.body(), Err(Error::MultipleSubscription)));
    }
}
