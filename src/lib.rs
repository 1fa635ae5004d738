//! # hitch
//!
//! Demand-driven body streams over a callback-driven HTTP engine.
//!
//! Engines push bytes: they call a handler whenever a chunk arrives and
//! accept writes whenever their queue has room. Framework code pulls: it
//! polls a [`Stream`](futures_core::Stream) when it is ready for more.
//! hitch sits between the two and keeps them honest in both directions.
//!
//! - **Inbound**, a [`BodyReader`](body::BodyReader) pauses the engine
//!   whenever the consumer's demand runs out and resumes it on the next
//!   request, so a slow consumer never makes the engine buffer.
//! - **Outbound**, [`write_body`](body::write_body) keeps exactly one
//!   buffer in flight and pulls the next one only once the engine has room.
//!
//! The [`client`] and [`server`] adapters put method, URI, status, header
//! and cookie accessors around those two pieces. [`engine::hyper`] plugs
//! them into hyper 1.x, and [`config`] maps `server.*` properties onto the
//! options the built-in server binds with.
//!
//! What sits in front of hitch, and is therefore out of scope:
//!
//! - **TLS termination**: the proxy or ingress
//! - **Compression codecs**: negotiated upstream; the options are carried
//! - **Routing**: one [`HttpHandler`] per server, route inside it
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use hitch::config::{ServerFactory, ServerProperties};
//! use hitch::handler_fn;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hitch::Error> {
//!     let props = ServerProperties::from_yaml_str("server:\n  port: 3000\n")?;
//!     let server = ServerFactory::new(props).bind().await?;
//!
//!     // Echo the request body back, chunk by chunk, with backpressure.
//!     server
//!         .serve(handler_fn(|req, res| Box::pin(async move {
//!             let body = req.body()?;
//!             res.write_with(body).await
//!         })))
//!         .await
//! }
//! ```

mod cookie;
mod error;
mod handler;
mod headers;
mod method;
mod status;

pub mod body;
pub mod buffer;
pub mod client;
pub mod config;
pub mod engine;
pub mod server;

pub use body::BodyStream;
pub use buffer::{DataBuffer, DataBufferFactory};
pub use client::{ClientRequest, ClientResponse, HttpConnector};
pub use cookie::{ResponseCookie, SameSite};
pub use error::Error;
pub use handler::{BoxFuture, HandlerFn, HttpHandler, handler_fn};
pub use method::Method;
pub use server::{Server, ServerRequest, ServerResponse};
pub use status::Status;
