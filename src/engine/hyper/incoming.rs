//! hyper's pull-based `Incoming` body driven as a push-based [`ReadStream`].

use std::sync::{Arc, Mutex, MutexGuard};

use ::hyper::body::Incoming;
use http_body_util::BodyExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::trace;

use crate::engine::{DataHandler, EndHandler, ExceptionHandler, ReadStream};
use crate::error::Error;

#[derive(Default)]
struct Handlers {
    data: Option<DataHandler>,
    end: Option<EndHandler>,
    exception: Option<ExceptionHandler>,
}

/// Pushes frames of an [`Incoming`] body to registered handlers.
///
/// A pump task is spawned on the first [`resume`](ReadStream::resume). It
/// checks the pause flag before every frame read, so a `pause` issued from
/// inside the data handler takes effect before the next frame is pulled off
/// the connection.
///
/// The pump runs on the tokio runtime the stream was created on, so the
/// stream may be resumed from any thread. A stream created outside a
/// runtime falls back to the runtime current at `resume`, and fails the
/// body if there is none.
pub struct IncomingStream {
    paused: watch::Sender<bool>,
    handlers: Arc<Mutex<Handlers>>,
    body: Mutex<Option<Incoming>>,
    runtime: Option<Handle>,
}

impl IncomingStream {
    pub fn new(body: Incoming) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            paused,
            handlers: Arc::default(),
            body: Mutex::new(Some(body)),
            runtime: Handle::try_current().ok(),
        }
    }

    fn handlers(&self) -> MutexGuard<'_, Handlers> {
        lock(&self.handlers)
    }

    fn start(&self) {
        let body = self.body.lock().unwrap_or_else(|p| p.into_inner()).take();
        let Some(body) = body else { return };

        match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => {
                trace!("starting body pump");
                runtime.spawn(pump(body, self.paused.subscribe(), Arc::clone(&self.handlers)));
            }
            None => {
                let handler = self.handlers().exception.take();
                if let Some(handler) = handler {
                    handler(Error::transport("no tokio runtime to read the body on"));
                }
            }
        }
    }
}

impl ReadStream for IncomingStream {
    fn pause(&self) {
        self.paused.send_replace(true);
    }

    fn resume(&self) {
        self.paused.send_replace(false);
        self.start();
    }

    fn data_handler(&self, handler: DataHandler) {
        self.handlers().data = Some(handler);
    }

    fn end_handler(&self, handler: EndHandler) {
        self.handlers().end = Some(handler);
    }

    fn exception_handler(&self, handler: ExceptionHandler) {
        self.handlers().exception = Some(handler);
    }
}

fn lock(handlers: &Mutex<Handlers>) -> MutexGuard<'_, Handlers> {
    handlers.lock().unwrap_or_else(|p| p.into_inner())
}

async fn pump(mut body: Incoming, mut paused: watch::Receiver<bool>, handlers: Arc<Mutex<Handlers>>) {
    loop {
        let open = paused.wait_for(|paused| !*paused).await.is_ok();
        if !open {
            trace!("body stream dropped while paused");
            return;
        }

        match body.frame().await {
            Some(Ok(frame)) => {
                // Trailers are not surfaced.
                let Ok(data) = frame.into_data() else { continue };
                if data.is_empty() {
                    continue;
                }
                if let Some(handler) = lock(&handlers).data.as_mut() {
                    handler(data);
                }
            }
            Some(Err(err)) => {
                let handler = lock(&handlers).exception.take();
                if let Some(handler) = handler {
                    handler(Error::Engine(err));
                }
                return;
            }
            None => {
                let handler = lock(&handlers).end.take();
                if let Some(handler) = handler {
                    handler();
                }
                return;
            }
        }
    }
}
