//! The engine boundary implemented over hyper 1.x.
//!
//! Inbound bodies are hyper's [`Incoming`](::hyper::body::Incoming), pumped
//! by a task that honours the pause flag between frames. Outbound bodies
//! are a [`ChannelBody`] fed through a bounded channel, whose free slots are
//! what [`WriteStream::poll_ready`](crate::engine::WriteStream::poll_ready)
//! reports.

mod client;
mod incoming;
mod outgoing;
mod server;

pub use client::{HyperClientRequest, HyperClientResponse};
pub use incoming::IncomingStream;
pub use outgoing::{ChannelBody, DEFAULT_WRITE_QUEUE_SIZE};
pub use server::{HyperServerRequest, HyperServerResponse};
