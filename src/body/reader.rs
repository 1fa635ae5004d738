//! Inbound bodies: engine callbacks in, demand-driven stream out.
//!
//! The engine pushes chunks whenever it is not paused. The consumer pulls.
//! [`BodyReader`] sits in between and keeps one invariant: the engine is
//! never left running while the consumer has no outstanding demand.
//!
//! ```text
//!            request(n) / poll_next
//!   consumer ───────────────────────▶ demand += n ──▶ resume()
//!            ◀─────────────────────── emitted     ◀── data handler
//!                                     demand == 0 ──▶ pause()
//! ```
//!
//! `pause` is issued from inside the data handler, before control returns
//! to the engine, so the engine never has a chunk in hand that nobody asked
//! for. If a misbehaving engine delivers anyway, the chunk is parked and
//! emitted on the next demand.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll, Waker};

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use tracing::{trace, warn};

use crate::buffer::{DataBuffer, DataBufferFactory};
use crate::engine::ReadStream;
use crate::error::Error;

/// Demand value meaning "deliver everything as it arrives".
pub const UNBOUNDED: u64 = u64::MAX;

/// Adapts an engine [`ReadStream`] into a single-subscription
/// [`BodyStream`].
pub struct BodyReader {
    shared: Arc<Shared>,
}

struct Shared {
    native: Arc<dyn ReadStream>,
    factory: Arc<DataBufferFactory>,
    state: Mutex<Inbound>,
}

#[derive(Default)]
struct Inbound {
    demand: u64,
    /// Delivered against demand, waiting for the consumer to take them.
    emitted: VecDeque<DataBuffer>,
    /// Arrived with no demand outstanding.
    parked: VecDeque<DataBuffer>,
    terminal: Option<Terminal>,
    subscribed: bool,
    cancelled: bool,
    paused: bool,
    emitted_total: u64,
    waker: Option<Waker>,
}

enum Terminal {
    Ended,
    /// `None` once the error has been handed to the consumer.
    Failed(Option<Error>),
}

impl Inbound {
    fn emit(&mut self, buffer: DataBuffer) {
        if self.demand != UNBOUNDED {
            self.demand -= 1;
        }
        self.emitted_total += 1;
        self.emitted.push_back(buffer);
        self.wake();
    }

    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }
}

impl BodyReader {
    /// Pauses `native` and registers the data, end and error handlers.
    /// Nothing is read until a subscriber signals demand.
    pub fn new(native: Arc<dyn ReadStream>, factory: Arc<DataBufferFactory>) -> Self {
        native.pause();

        let shared = Arc::new(Shared {
            native: Arc::clone(&native),
            factory,
            state: Mutex::new(Inbound { paused: true, ..Inbound::default() }),
        });

        let weak = Arc::downgrade(&shared);
        native.data_handler(Box::new(move |chunk| with(&weak, |s| s.on_data(chunk))));
        let weak = Arc::downgrade(&shared);
        native.end_handler(Box::new(move || with(&weak, Shared::on_end)));
        let weak = Arc::downgrade(&shared);
        native.exception_handler(Box::new(move |err| with(&weak, |s| s.on_error(err))));

        Self { shared }
    }

    /// Subscribes to the body. Only the first call succeeds; later calls
    /// fail with [`Error::MultipleSubscription`] and leave the first
    /// subscription untouched.
    pub fn subscribe(&self) -> Result<BodyStream, Error> {
        let mut state = self.shared.lock();
        if state.subscribed {
            return Err(Error::MultipleSubscription);
        }
        state.subscribed = true;
        Ok(BodyStream { shared: Arc::clone(&self.shared) })
    }
}

fn with(weak: &Weak<Shared>, f: impl FnOnce(&Shared)) {
    match weak.upgrade() {
        Some(shared) => f(&shared),
        None => trace!("engine signal after body reader was dropped"),
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inbound> {
        // Callbacks never panic while holding the lock; recover the state
        // anyway rather than poisoning every later poll.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn on_data(&self, chunk: Bytes) {
        let buffer = self.factory.wrap(chunk);
        let mut state = self.lock();

        if state.cancelled || state.terminal.is_some() {
            trace!(len = buffer.len(), "discarding chunk after body terminated");
            self.native.pause();
            return;
        }

        if state.demand == 0 {
            warn!(len = buffer.len(), "engine delivered a chunk without demand, parking it");
            state.parked.push_back(buffer);
        } else {
            trace!(len = buffer.len(), demand = state.demand, "chunk emitted");
            state.emit(buffer);
        }

        if state.demand == 0 {
            state.paused = true;
            self.native.pause();
        }
    }

    fn on_end(&self) {
        let mut state = self.lock();
        if state.cancelled || state.terminal.is_some() {
            trace!("ignoring end signal on terminated body");
            return;
        }
        trace!(emitted = state.emitted_total, "body ended");
        state.terminal = Some(Terminal::Ended);
        state.wake();
    }

    fn on_error(&self, err: Error) {
        let mut state = self.lock();
        if state.cancelled {
            return;
        }
        if state.terminal.is_some() {
            warn!(error = %err, "engine reported an error after the body terminated");
            return;
        }
        let dropped = state.emitted.len() + state.parked.len();
        if dropped > 0 {
            trace!(dropped, "error preempts buffered chunks");
        }
        state.emitted.clear();
        state.parked.clear();
        state.terminal = Some(Terminal::Failed(Some(err)));
        state.wake();
    }

    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        let resume = {
            let mut state = self.lock();
            if state.cancelled || matches!(state.terminal, Some(Terminal::Failed(_))) {
                return;
            }
            state.demand = state.demand.saturating_add(n);
            while state.demand > 0 {
                match state.parked.pop_front() {
                    Some(buffer) => state.emit(buffer),
                    None => break,
                }
            }
            let resume = state.demand > 0 && state.paused && state.terminal.is_none();
            if resume {
                state.paused = false;
            }
            resume
        };

        // Outside the lock: an engine may deliver synchronously from resume.
        if resume {
            trace!(n, "resuming engine stream");
            self.native.resume();
        }
    }

    fn cancel(&self) {
        let mut state = self.lock();
        if state.cancelled {
            return;
        }
        trace!(emitted = state.emitted_total, "body subscription cancelled");
        state.cancelled = true;
        state.emitted.clear();
        state.parked.clear();
        state.waker = None;
        // A terminated engine stream has nothing left to pause.
        if state.terminal.is_none() {
            state.paused = true;
            self.native.pause();
        }
    }
}

/// The subscriber side of a [`BodyReader`].
///
/// Polling with nothing buffered signals a demand of one. Call
/// [`request`](BodyStream::request) to let the engine run further ahead.
/// Dropping the stream cancels the subscription and leaves the engine
/// stream paused for good.
///
/// The stream itself needs no runtime, but the hyper engine reads frames
/// on the tokio runtime its body was received on. That runtime must still
/// be running while the stream is polled.
pub struct BodyStream {
    shared: Arc<Shared>,
}

impl BodyStream {
    /// Adds `n` to the outstanding demand. [`UNBOUNDED`] lifts flow control.
    pub fn request(&self, n: u64) {
        self.shared.request(n);
    }

    /// Stops the engine stream and releases buffered chunks.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Number of chunks emitted so far.
    pub fn emitted(&self) -> u64 {
        self.shared.lock().emitted_total
    }

    /// Collects the remaining body into one buffer.
    pub async fn aggregate(mut self) -> Result<DataBuffer, Error> {
        self.request(UNBOUNDED);
        let mut buffers = Vec::new();
        while let Some(buffer) = self.next().await {
            buffers.push(buffer?);
        }
        Ok(self.shared.factory.join(buffers))
    }
}

impl Stream for BodyStream {
    type Item = Result<DataBuffer, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let shared = &self.shared;
        let mut requested = false;
        loop {
            {
                let mut guard = shared.lock();
                let state = &mut *guard;
                if let Some(buffer) = state.emitted.pop_front() {
                    return Poll::Ready(Some(Ok(buffer)));
                }
                if state.cancelled {
                    return Poll::Ready(None);
                }
                match &mut state.terminal {
                    Some(Terminal::Failed(err)) => return Poll::Ready(err.take().map(Err)),
                    Some(Terminal::Ended) if state.parked.is_empty() => return Poll::Ready(None),
                    _ => {}
                }
                if requested || state.demand > 0 {
                    state.waker = Some(cx.waker().clone());
                    return Poll::Pending;
                }
            }
            requested = true;
            shared.request(1);
        }
    }
}

impl Drop for BodyStream {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}
