//! One-shot HTTP/1.1 exchanges over hyper's connection-level client.

use std::sync::Arc;

use http::Uri;
use http::uri::Scheme;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::debug;

use super::{ClientRequest, ClientResponse};
use crate::buffer::DataBufferFactory;
use crate::engine::hyper::{DEFAULT_WRITE_QUEUE_SIZE, HyperClientRequest, HyperClientResponse};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::method::Method;

/// Opens a connection per exchange and drives one request over it.
///
/// ```rust,no_run
/// use futures_util::stream;
/// use hitch::{HttpConnector, Method};
///
/// # async fn run() -> Result<(), hitch::Error> {
/// let connector = HttpConnector::new();
/// let uri = "http://localhost:8080/echo".parse()?;
/// let res = connector
///     .connect(Method::Post, uri, |req| Box::pin(async move {
///         let hello = req.buffer_factory().wrap("hello");
///         req.write_with(stream::iter([Ok(hello)])).await
///     }))
///     .await?;
///
/// let body = res.body()?.aggregate().await?;
/// assert_eq!(body.as_bytes(), b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpConnector {
    factory: Arc<DataBufferFactory>,
    write_queue_size: usize,
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::with_factory(Arc::new(DataBufferFactory::new()))
    }

    pub fn with_factory(factory: Arc<DataBufferFactory>) -> Self {
        Self { factory, write_queue_size: DEFAULT_WRITE_QUEUE_SIZE }
    }

    pub fn write_queue_size(mut self, size: usize) -> Self {
        self.write_queue_size = size;
        self
    }

    pub fn buffer_factory(&self) -> &Arc<DataBufferFactory> {
        &self.factory
    }

    /// Sends `method uri`, letting `callback` set headers and write the
    /// body, and resolves with the response once its head arrives.
    ///
    /// The callback runs on its own task, so a peer that answers while it
    /// is still reading the request is read from concurrently. Writes keep
    /// streaming after this resolves. A request the callback leaves open is
    /// completed with an empty body.
    ///
    /// # Errors
    ///
    /// [`Error::TlsUnsupported`] for `https` URIs, [`Error::Io`] when the
    /// connection fails, and whatever the callback or the exchange fails
    /// with before the response head arrives.
    pub async fn connect<F>(&self, method: Method, uri: Uri, callback: F) -> Result<ClientResponse, Error>
    where
        F: for<'a> FnOnce(&'a mut ClientRequest) -> BoxFuture<'a, Result<(), Error>> + Send + 'static,
    {
        let (host, port) = target(&uri)?;
        let stream = TcpStream::connect((host.as_str(), port)).await?;
        debug!(%host, port, "connected");

        let (sender, conn) = http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("client connection error: {e}");
            }
        });

        let (native, mut response) =
            HyperClientRequest::new(method.to_http()?, uri, sender, self.write_queue_size);
        let mut request = ClientRequest::new(native, Arc::clone(&self.factory));

        let mut writer = tokio::spawn(async move {
            if let Err(err) = callback(&mut request).await {
                request.native_mut().abort(&err);
                return Err(err);
            }
            request.set_complete()
        });

        let (head, writer) = tokio::select! {
            head = &mut response => (head, Some(writer)),
            written = &mut writer => match written {
                Ok(Ok(())) => (response.await, None),
                Ok(Err(err)) => return Err(err),
                Err(err) => return Err(writer_failed(&err)),
            },
        };
        let res = match head {
            Ok(res) => res?,
            // Dropped unsent; the writer holds the reason.
            Err(_) => {
                return Err(match writer {
                    Some(writer) => match writer.await {
                        Ok(Err(err)) => err,
                        Ok(Ok(())) => Error::Closed,
                        Err(err) => writer_failed(&err),
                    },
                    None => Error::Closed,
                });
            }
        };
        debug!(status = res.status().as_u16(), "response head received");

        if let Some(writer) = writer {
            // The body may still be streaming; its outcome is only logged.
            tokio::spawn(async move {
                match writer.await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => debug!(error = %err, "request body failed after the response head"),
                    Err(err) => debug!(error = %err, "request writer task failed"),
                }
            });
        }

        Ok(ClientResponse::new(Arc::new(HyperClientResponse::new(res)), Arc::clone(&self.factory)))
    }
}

fn writer_failed(err: &tokio::task::JoinError) -> Error {
    Error::transport(format!("request writer failed: {err}"))
}

fn target(uri: &Uri) -> Result<(String, u16), Error> {
    match uri.scheme() {
        Some(scheme) if *scheme == Scheme::HTTPS => return Err(Error::TlsUnsupported),
        Some(scheme) if *scheme != Scheme::HTTP => {
            return Err(Error::Config(format!("unsupported scheme {scheme}")));
        }
        _ => {}
    }
    let host = uri
        .host()
        .ok_or_else(|| Error::Config(format!("{uri} has no host")))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_owned();
    Ok((host, uri.port_u16().unwrap_or(80)))
}
