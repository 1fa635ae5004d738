//! Outbound bodies: a stream of buffers in, engine writes out.
//!
//! One buffer is in flight at a time. The next item is only pulled from the
//! source after the engine accepted the previous one and reports room in its
//! write queue, so a slow peer slows the producer down instead of piling
//! chunks up in memory.

use std::future::poll_fn;
use std::pin::pin;

use futures_core::Stream;
use futures_util::StreamExt;
use tracing::trace;

use crate::buffer::DataBuffer;
use crate::engine::WriteStream;
use crate::error::Error;

/// Writes every buffer of `source` to `sink`, then ends it.
///
/// A failing source resolves with its error and leaves `sink` un-ended; the
/// engine may already be tearing the exchange down. An empty source still
/// ends `sink`, so the peer sees an explicitly terminated empty body.
pub async fn write_body<W, S>(sink: &mut W, source: S) -> Result<(), Error>
where
    W: WriteStream + ?Sized,
    S: Stream<Item = Result<DataBuffer, Error>>,
{
    let written = write_chunks(sink, source).await?;
    trace!(chunks = written, "body complete");
    sink.end()
}

/// Writes each inner stream of `source` in turn, flushing `sink` after each
/// one completes, then ends it.
pub async fn write_and_flush_body<W, S, P>(sink: &mut W, source: S) -> Result<(), Error>
where
    W: WriteStream + ?Sized,
    S: Stream<Item = P>,
    P: Stream<Item = Result<DataBuffer, Error>>,
{
    let mut source = pin!(source);
    let mut boundaries = 0usize;
    while let Some(inner) = source.next().await {
        let written = write_chunks(sink, inner).await?;
        sink.flush()?;
        boundaries += 1;
        trace!(chunks = written, boundary = boundaries, "flushed");
    }
    sink.end()
}

async fn write_chunks<W, S>(sink: &mut W, source: S) -> Result<usize, Error>
where
    W: WriteStream + ?Sized,
    S: Stream<Item = Result<DataBuffer, Error>>,
{
    let mut source = pin!(source);
    let mut written = 0;
    loop {
        poll_fn(|cx| sink.poll_ready(cx)).await?;
        match source.next().await {
            Some(Ok(buffer)) => {
                sink.write(buffer.into_bytes())?;
                written += 1;
            }
            Some(Err(err)) => {
                trace!(error = %err, chunks = written, "body source failed");
                return Err(err);
            }
            None => return Ok(written),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};

    use bytes::Bytes;
    use futures_util::stream;

    use super::*;
    use crate::buffer::DataBufferFactory;
    use crate::engine::mock::{Event, MockOutbound};

    fn chunk(data: &'static [u8]) -> Result<DataBuffer, Error> {
        Ok(DataBufferFactory::new().wrap(Bytes::from_static(data)))
    }

    #[tokio::test]
    async fn writes_in_order_then_ends() {
        let (mut sink, log) = MockOutbound::new();
        let source = stream::iter(vec![chunk(b"chunk 1"), chunk(b"chunk 2")]);

        write_body(&mut sink, source).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![
            Event::Write(Bytes::from_static(b"chunk 1")),
            Event::Write(Bytes::from_static(b"chunk 2")),
            Event::End,
        ]);
    }

    #[tokio::test]
    async fn empty_source_still_ends() {
        let (mut sink, log) = MockOutbound::new();

        write_body(&mut sink, stream::empty()).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![Event::End]);
    }

    #[tokio::test]
    async fn source_error_skips_end() {
        let (mut sink, log) = MockOutbound::new();
        let source = stream::iter(vec![chunk(b"partial"), Err(Error::transport("upstream gone"))]);

        let err = write_body(&mut sink, source).await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(*log.lock().unwrap(), vec![Event::Write(Bytes::from_static(b"partial"))]);
    }

    #[tokio::test]
    async fn flushes_at_each_inner_boundary() {
        let (mut sink, log) = MockOutbound::new();
        let source = stream::iter(vec![
            stream::iter(vec![chunk(b"chunk 1")]),
            stream::iter(vec![chunk(b"chunk 2")]),
        ]);

        write_and_flush_body(&mut sink, source).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![
            Event::Write(Bytes::from_static(b"chunk 1")),
            Event::Flush,
            Event::Write(Bytes::from_static(b"chunk 2")),
            Event::Flush,
            Event::End,
        ]);
    }

    /// A sink whose queue only frees up every other poll, and a source that
    /// records how many items were pulled before each write.
    struct Throttled {
        polls: usize,
        pulled: Arc<AtomicUsize>,
        pulled_at_write: Vec<usize>,
    }

    impl WriteStream for Throttled {
        fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
            self.polls += 1;
            if self.polls % 2 == 1 {
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            Poll::Ready(Ok(()))
        }

        fn write(&mut self, _chunk: Bytes) -> Result<(), Error> {
            self.pulled_at_write.push(self.pulled.load(Ordering::SeqCst));
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Error> { Ok(()) }
        fn end(&mut self) -> Result<(), Error> { Ok(()) }
    }

    #[tokio::test]
    async fn pulls_one_item_per_accepted_write() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let source = stream::iter([b"a", b"b", b"c"]).map(move |data: &'static [u8; 1]| {
            counter.fetch_add(1, Ordering::SeqCst);
            chunk(data)
        });
        let mut sink = Throttled { polls: 0, pulled, pulled_at_write: Vec::new() };

        write_body(&mut sink, source).await.unwrap();

        assert_eq!(sink.pulled_at_write, vec![1, 2, 3]);
    }
}
