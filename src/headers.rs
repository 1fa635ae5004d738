//! Flushing a framework-side header map onto a native message.

use http::HeaderMap;
use tracing::trace;

use crate::engine::HeaderSink;
use crate::error::Error;

/// Copies `headers` onto `sink` in one pass.
///
/// A name carrying several values is written with a single multi-value
/// call, a name with one value with a single-value call. Meant to run once
/// per message, right before the head is committed; a second call writes
/// every header again.
pub(crate) fn apply_headers<S>(headers: &HeaderMap, sink: &mut S) -> Result<(), Error>
where
    S: HeaderSink + ?Sized,
{
    for name in headers.keys() {
        let mut values = headers.get_all(name).iter().cloned();
        match (values.next(), values.next()) {
            (Some(only), None) => sink.put_header(name.clone(), only)?,
            (Some(first), Some(second)) => {
                let all = [first, second].into_iter().chain(values).collect();
                sink.put_header_values(name.clone(), all)?;
            }
            (None, _) => {}
        }
    }
    trace!(count = headers.keys_len(), "headers applied");
    Ok(())
}
