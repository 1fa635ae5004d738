//! Client-side adapters.
//!
//! [`ClientRequest`] streams an outbound body into the engine with
//! one-in-flight backpressure; [`ClientResponse`] exposes the inbound body
//! as a demand-driven [`BodyStream`](crate::body::BodyStream).
//! [`HttpConnector`] ties both to a hyper connection.

mod connector;
mod request;
mod response;

pub use connector::HttpConnector;
pub use request::ClientRequest;
pub use response::ClientResponse;
