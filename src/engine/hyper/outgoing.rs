//! Channel-backed outbound body handed to hyper.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use ::hyper::body::{Body, Frame, SizeHint};
use bytes::Bytes;
use tokio::sync::mpsc::{self, OwnedPermit};
use tracing::trace;

use crate::error::Error;

/// Default number of chunks the engine queues before `poll_ready` pends.
pub const DEFAULT_WRITE_QUEUE_SIZE: usize = 8;

type Chunk = Result<Frame<Bytes>, Error>;
type Reserve = Pin<Box<dyn Future<Output = Result<OwnedPermit<Chunk>, mpsc::error::SendError<()>>> + Send>>;

/// The body hyper polls. Frames arrive through a bounded channel fed by
/// [`BodySender`]; the body ends when the sender is closed.
pub struct ChannelBody {
    rx: Option<mpsc::Receiver<Chunk>>,
}

impl ChannelBody {
    /// A body that is already complete. Reports an exact size of zero so
    /// the peer sees `content-length: 0` rather than an empty chunked body.
    pub fn empty() -> Self {
        Self { rx: None }
    }
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Chunk>> {
        match self.get_mut().rx.as_mut() {
            Some(rx) => rx.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.rx.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        match self.rx {
            Some(_) => SizeHint::default(),
            None => SizeHint::with_exact(0),
        }
    }
}

/// Write half of a [`ChannelBody`].
pub(crate) struct BodySender {
    tx: Option<mpsc::Sender<Chunk>>,
    permit: Option<OwnedPermit<Chunk>>,
    reserve: Option<Reserve>,
}

pub(crate) fn channel(capacity: usize) -> (BodySender, ChannelBody) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let sender = BodySender { tx: Some(tx), permit: None, reserve: None };
    (sender, ChannelBody { rx: Some(rx) })
}

impl BodySender {
    /// Resolves once a queue slot is reserved for the next chunk.
    pub(crate) fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        if self.permit.is_some() {
            return Poll::Ready(Ok(()));
        }
        let Some(tx) = &self.tx else {
            return Poll::Ready(Err(Error::Closed));
        };
        let reserve = self.reserve.get_or_insert_with(|| Box::pin(tx.clone().reserve_owned()));
        let polled = reserve.as_mut().poll(cx);
        match polled {
            Poll::Ready(Ok(permit)) => {
                self.reserve = None;
                self.permit = Some(permit);
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(_)) => {
                self.reserve = None;
                trace!("peer stopped reading the body");
                Poll::Ready(Err(Error::Closed))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    pub(crate) fn send(&mut self, chunk: Bytes) -> Result<(), Error> {
        self.send_frame(Ok(Frame::data(chunk)))
    }

    fn send_frame(&mut self, frame: Chunk) -> Result<(), Error> {
        if let Some(permit) = self.permit.take() {
            drop(permit.send(frame));
            return Ok(());
        }
        let tx = self.tx.as_ref().ok_or(Error::Closed)?;
        tx.try_send(frame).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => Error::transport("write queue full"),
            mpsc::error::TrySendError::Closed(_) => Error::Closed,
        })
    }

    /// Closes the channel; hyper finishes the body after draining it.
    pub(crate) fn close(&mut self) {
        self.permit = None;
        self.reserve = None;
        self.tx = None;
    }

    /// Fails the body so hyper tears the exchange down instead of ending it
    /// cleanly.
    pub(crate) fn abort(&mut self, err: Error) {
        if let Err(err) = self.send_frame(Err(err)) {
            trace!(error = %err, "could not deliver abort to the engine");
        }
        self.close();
    }
}
