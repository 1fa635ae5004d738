//! In-memory engine that records every call the adapters make.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};

use super::{
    DataHandler, EndHandler, ExceptionHandler, HeaderSink, NativeClientRequest,
    NativeClientResponse, NativeServerRequest, NativeServerResponse, ReadStream, WriteStream,
};
use crate::error::Error;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Event {
    Status(u16),
    PutHeader(String, String),
    PutHeaderValues(String, Vec<String>),
    Write(Bytes),
    Flush,
    End,
    Reset,
}

pub(crate) type Log = Arc<Mutex<Vec<Event>>>;

// ── Outbound ──────────────────────────────────────────────────────────────────

pub(crate) struct MockOutbound {
    method: Method,
    uri: Uri,
    log: Log,
    head_written: bool,
}

impl MockOutbound {
    pub(crate) fn new() -> (Self, Log) {
        Self::request(Method::GET, Uri::from_static("http://example.com"))
    }

    pub(crate) fn request(method: Method, uri: Uri) -> (Self, Log) {
        let log = Log::default();
        let outbound = Self { method, uri, log: Arc::clone(&log), head_written: false };
        (outbound, log)
    }

    fn record(&mut self, event: Event) {
        if matches!(event, Event::Write(_) | Event::End) {
            self.head_written = true;
        }
        self.log.lock().unwrap().push(event);
    }
}

impl WriteStream for MockOutbound {
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        Poll::Ready(Ok(()))
    }

    fn write(&mut self, chunk: Bytes) -> Result<(), Error> {
        self.record(Event::Write(chunk));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.record(Event::Flush);
        Ok(())
    }

    fn end(&mut self) -> Result<(), Error> {
        self.record(Event::End);
        Ok(())
    }
}

impl HeaderSink for MockOutbound {
    fn put_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), Error> {
        let value = value.to_str().unwrap_or_default().to_owned();
        self.record(Event::PutHeader(name.as_str().to_owned(), value));
        Ok(())
    }

    fn put_header_values(&mut self, name: HeaderName, values: Vec<HeaderValue>) -> Result<(), Error> {
        let values = values.iter().map(|v| v.to_str().unwrap_or_default().to_owned()).collect();
        self.record(Event::PutHeaderValues(name.as_str().to_owned(), values));
        Ok(())
    }
}

impl NativeClientRequest for MockOutbound {
    fn method(&self) -> &Method { &self.method }
    fn uri(&self) -> &Uri { &self.uri }
}

impl NativeServerResponse for MockOutbound {
    fn set_status(&mut self, status: u16) -> Result<(), Error> {
        self.record(Event::Status(status));
        Ok(())
    }

    fn head_written(&self) -> bool { self.head_written }

    fn reset(&mut self, _err: &Error) {
        self.record(Event::Reset);
    }
}

// ── Inbound ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ReadState {
    paused: bool,
    pauses: usize,
    resumes: usize,
    delivering: bool,
    delivered_while_paused: usize,
    queued: VecDeque<Bytes>,
    end_queued: bool,
    data: Option<DataHandler>,
    end: Option<EndHandler>,
    exception: Option<ExceptionHandler>,
}

/// A read stream that delivers queued chunks whenever it is not paused,
/// synchronously from `resume` and `feed`, like an event-loop engine would.
#[derive(Default)]
pub(crate) struct MockReadStream {
    state: Mutex<ReadState>,
}

impl MockReadStream {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues chunks and delivers as many as current flow control allows.
    pub(crate) fn feed(&self, chunks: &[&'static [u8]]) {
        {
            let mut state = self.state.lock().unwrap();
            state.queued.extend(chunks.iter().map(|c| Bytes::from_static(c)));
        }
        self.drain();
    }

    /// Queues the end signal behind any queued chunks.
    pub(crate) fn feed_end(&self) {
        self.state.lock().unwrap().end_queued = true;
        self.drain();
    }

    /// Delivers a chunk immediately, ignoring pause.
    pub(crate) fn push_now(&self, chunk: &'static [u8]) {
        let handler = {
            let mut state = self.state.lock().unwrap();
            if state.paused {
                state.delivered_while_paused += 1;
            }
            state.data.take()
        };
        if let Some(mut handler) = handler {
            handler(Bytes::from_static(chunk));
            self.state.lock().unwrap().data = Some(handler);
        }
    }

    pub(crate) fn end_now(&self) {
        let handler = self.state.lock().unwrap().end.take();
        if let Some(handler) = handler {
            handler();
        }
    }

    pub(crate) fn fail_now(&self, err: Error) {
        let handler = self.state.lock().unwrap().exception.take();
        if let Some(handler) = handler {
            handler(err);
        }
    }

    pub(crate) fn is_paused(&self) -> bool { self.state.lock().unwrap().paused }
    pub(crate) fn pauses(&self) -> usize { self.state.lock().unwrap().pauses }
    pub(crate) fn resumes(&self) -> usize { self.state.lock().unwrap().resumes }
    pub(crate) fn queued(&self) -> usize { self.state.lock().unwrap().queued.len() }
    pub(crate) fn delivered_while_paused(&self) -> usize {
        self.state.lock().unwrap().delivered_while_paused
    }

    fn drain(&self) {
        loop {
            let (chunk, mut handler) = {
                let mut state = self.state.lock().unwrap();
                if state.paused || state.delivering || state.data.is_none() {
                    return;
                }
                match state.queued.pop_front() {
                    Some(chunk) => {
                        state.delivering = true;
                        (chunk, state.data.take().unwrap())
                    }
                    None => {
                        let end = if state.end_queued { state.end.take() } else { None };
                        drop(state);
                        if let Some(end) = end {
                            end();
                        }
                        return;
                    }
                }
            };
            handler(chunk);
            let mut state = self.state.lock().unwrap();
            state.data = Some(handler);
            state.delivering = false;
        }
    }
}

impl ReadStream for MockReadStream {
    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        state.paused = true;
        state.pauses += 1;
    }

    fn resume(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.paused = false;
            state.resumes += 1;
        }
        self.drain();
    }

    fn data_handler(&self, handler: DataHandler) {
        self.state.lock().unwrap().data = Some(handler);
    }

    fn end_handler(&self, handler: EndHandler) {
        self.state.lock().unwrap().end = Some(handler);
    }

    fn exception_handler(&self, handler: ExceptionHandler) {
        self.state.lock().unwrap().exception = Some(handler);
    }
}

/// Inbound message: a request on the server side or a response on the
/// client side.
pub(crate) struct MockInbound {
    pub(crate) stream: Arc<MockReadStream>,
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) status: u16,
    pub(crate) headers: HeaderMap,
}

impl MockInbound {
    pub(crate) fn new() -> (Arc<Self>, Arc<MockReadStream>) {
        Self::with(Method::GET, Uri::from_static("/"), 200, HeaderMap::new())
    }

    pub(crate) fn with(
        method: Method,
        uri: Uri,
        status: u16,
        headers: HeaderMap,
    ) -> (Arc<Self>, Arc<MockReadStream>) {
        let stream = MockReadStream::new();
        let inbound = Arc::new(Self { stream: Arc::clone(&stream), method, uri, status, headers });
        (inbound, stream)
    }
}

impl ReadStream for MockInbound {
    fn pause(&self) { self.stream.pause() }
    fn resume(&self) { self.stream.resume() }
    fn data_handler(&self, handler: DataHandler) { self.stream.data_handler(handler) }
    fn end_handler(&self, handler: EndHandler) { self.stream.end_handler(handler) }
    fn exception_handler(&self, handler: ExceptionHandler) { self.stream.exception_handler(handler) }
}

impl NativeServerRequest for MockInbound {
    fn method(&self) -> &Method { &self.method }
    fn uri(&self) -> &Uri { &self.uri }
    fn headers(&self) -> &HeaderMap { &self.headers }
    fn remote_addr(&self) -> Option<SocketAddr> { None }
}

impl NativeClientResponse for MockInbound {
    fn status(&self) -> u16 { self.status }
    fn headers(&self) -> &HeaderMap { &self.headers }
}
