//! Server-side adapters and the built-in HTTP server.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Stops calling `listener.accept()`, so no new connections are made.
//! 2. Tells every open connection to shut down gracefully. Idle keep-alive
//!    connections close at once; in-flight requests finish first.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.
//!
//! # Request flow
//!
//! Each request is handed to the [`HttpHandler`] on its own task. The
//! connection task waits only for the response head; the body keeps
//! streaming from the handler task through a bounded channel, so a slow
//! peer stalls the handler's writes instead of buffering the whole body.

mod request;
mod response;

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http::{Response, StatusCode};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::buffer::DataBufferFactory;
use crate::config::HttpServerOptions;
use crate::engine::hyper::{ChannelBody, HyperServerRequest, HyperServerResponse};
use crate::error::Error;
use crate::handler::HttpHandler;

pub use request::ServerRequest;
pub use response::ServerResponse;

/// The HTTP server.
pub struct Server {
    listener: TcpListener,
    factory: Arc<DataBufferFactory>,
    write_queue_size: usize,
}

impl Server {
    /// Binds a listener for `options`.
    ///
    /// # Errors
    ///
    /// [`Error::TlsUnsupported`] when `options.ssl` is set, since the
    /// built-in engine speaks plain HTTP only, and [`Error::Io`] when the
    /// address cannot be bound.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use hitch::Server;
    /// use hitch::config::HttpServerOptions;
    ///
    /// # async fn run() -> Result<(), hitch::Error> {
    /// let options = HttpServerOptions { port: 3000, ..HttpServerOptions::default() };
    /// let server = Server::bind(options).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn bind(options: HttpServerOptions) -> Result<Self, Error> {
        if options.ssl {
            return Err(Error::TlsUnsupported);
        }
        if options.compression_supported {
            debug!("compression is negotiated by the proxy in front, not by the built-in engine");
        }
        let listener = TcpListener::bind(options.socket_addr()?).await?;
        Ok(Self {
            listener,
            factory: Arc::new(DataBufferFactory::new()),
            write_queue_size: options.write_queue_size,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// The factory every request and response of this server shares.
    pub fn buffer_factory(&self) -> &Arc<DataBufferFactory> {
        &self.factory
    }

    /// Accepts connections and dispatches their requests to `handler`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by every open connection closing once its in-flight
    /// requests complete).
    pub async fn serve(self, handler: impl HttpHandler) -> Result<(), Error> {
        self.serve_with_shutdown(handler, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), stopping when `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, handler: impl HttpHandler, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let Self { listener, factory, write_queue_size } = self;
        let handler: Arc<dyn HttpHandler> = Arc::new(handler);

        info!(addr = %listener.local_addr()?, "hitch listening");

        let mut tasks = tokio::task::JoinSet::new();
        let (stop, stopping) = watch::channel(false);

        let shutdown = signal;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Checked first so a signal stops accepts even with a backlog.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };
                    debug!(peer = %remote_addr, "connection accepted");

                    let handler = Arc::clone(&handler);
                    let factory = Arc::clone(&factory);
                    let io = TokioIo::new(stream);
                    let mut stopping = stopping.clone();

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let handler = Arc::clone(&handler);
                            let factory = Arc::clone(&factory);
                            dispatch(handler, req, remote_addr, factory, write_queue_size)
                        });

                        let builder = ConnBuilder::new(TokioExecutor::new());
                        let conn = builder.serve_connection(io, svc);
                        tokio::pin!(conn);

                        let served = tokio::select! {
                            served = conn.as_mut() => served,
                            _ = stopping.changed() => {
                                trace!(peer = %remote_addr, "closing connection for shutdown");
                                conn.as_mut().graceful_shutdown();
                                conn.as_mut().await
                            }
                        };
                        if let Err(e) = served {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        stop.send_replace(true);
        while tasks.join_next().await.is_some() {}

        info!("hitch stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs the handler for one request and resolves with the response head as
/// soon as the handler commits it.
///
/// Failures are turned into responses here, so hyper never sees an error.
async fn dispatch(
    handler: Arc<dyn HttpHandler>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
    factory: Arc<DataBufferFactory>,
    write_queue_size: usize,
) -> Result<Response<ChannelBody>, Infallible> {
    debug!(method = %req.method(), uri = %req.uri(), peer = %remote_addr, "request");

    let native = Arc::new(HyperServerRequest::new(req, Some(remote_addr)));
    let (native_response, head) = HyperServerResponse::new(write_queue_size);
    let request = ServerRequest::new(native, Arc::clone(&factory));
    let mut response = ServerResponse::new(native_response, factory);

    tokio::spawn(async move {
        match handler.handle(request, &mut response).await {
            Ok(()) => {
                if let Err(err) = response.set_complete() {
                    debug!(error = %err, "could not complete response");
                }
            }
            Err(err) => {
                warn!(error = %err, "handler failed");
                response.fail(&err);
            }
        }
    });

    match head.await {
        Ok(res) => Ok(res),
        Err(_) => {
            error!("handler task ended without a response");
            let mut res = Response::new(ChannelBody::empty());
            *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            Ok(res)
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
