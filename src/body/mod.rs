//! Body adapters between engine callbacks and demand-driven streams.
//!
//! - [`BodyReader`] turns an engine's pushed chunks into a [`BodyStream`].
//! - [`write_body`] and [`write_and_flush_body`] drain a stream of buffers
//!   into an engine's write calls.

mod reader;
mod writer;

pub use reader::{BodyReader, BodyStream, UNBOUNDED};
pub use writer::{write_and_flush_body, write_body};
