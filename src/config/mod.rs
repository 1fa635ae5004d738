//! Server configuration.
//!
//! [`ServerProperties`] is the `server.*` tree as loaded from YAML and the
//! environment. [`ServerFactory`] runs it through the
//! [`ServerOptionsCustomizer`] pipeline to produce the [`HttpServerOptions`]
//! the server binds with.

mod customizer;
mod options;
mod properties;

pub use customizer::{
    AddressCustomizer, CompressionCustomizer, PortCustomizer, ServerFactory,
    ServerOptionsCustomizer, SslCustomizer,
};
pub use options::{ClientAuthMode, HttpServerOptions, KeyStoreOptions};
pub use properties::{
    ClientAuth, Compression, DEFAULT_COMPRESSIBLE_MIME_TYPES, DEFAULT_MIN_RESPONSE_SIZE,
    ServerProperties, Ssl,
};
