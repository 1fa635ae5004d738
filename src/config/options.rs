//! Options the built-in engine is started with.

use std::net::{SocketAddr, ToSocketAddrs};

use crate::engine::hyper::DEFAULT_WRITE_QUEUE_SIZE;
use crate::error::Error;

/// Where a key or trust store lives and how to open it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyStoreOptions {
    pub path: String,
    pub password: Option<String>,
    /// `JKS`, `PKCS12` or `PEM`.
    pub kind: String,
}

/// Client certificate policy, in engine terms.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ClientAuthMode {
    #[default]
    None,
    Request,
    Required,
}

/// Native options of the HTTP server.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpServerOptions {
    pub host: String,
    pub port: u16,

    pub ssl: bool,
    pub key_store: Option<KeyStoreOptions>,
    pub key_password: Option<String>,
    pub trust_store: Option<KeyStoreOptions>,
    pub client_auth: ClientAuthMode,
    pub enabled_secure_transport_protocols: Vec<String>,
    pub cipher_suites: Vec<String>,

    pub compression_supported: bool,
    pub compression_level: u32,
    pub compressible_mime_types: Vec<String>,
    pub min_compression_size: usize,

    /// Body chunks queued per response before writes pend.
    pub write_queue_size: usize,
}

impl Default for HttpServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            ssl: false,
            key_store: None,
            key_password: None,
            trust_store: None,
            client_auth: ClientAuthMode::None,
            enabled_secure_transport_protocols: Vec::new(),
            cipher_suites: Vec::new(),
            compression_supported: false,
            compression_level: 6,
            compressible_mime_types: Vec::new(),
            min_compression_size: 0,
            write_queue_size: DEFAULT_WRITE_QUEUE_SIZE,
        }
    }
}

impl HttpServerOptions {
    /// Resolves `host:port` to the first matching socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, Error> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::Config(format!("{} does not resolve", self.host)))
    }
}
