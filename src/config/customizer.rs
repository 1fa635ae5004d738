//! The pipeline that turns [`ServerProperties`] into [`HttpServerOptions`].
//!
//! ```text
//! HttpServerOptions::default()
//!     → PortCustomizer → AddressCustomizer → SslCustomizer → CompressionCustomizer
//!     → user customizers, in registration order
//!     → Server::bind
//! ```

use tracing::debug;

use super::options::{ClientAuthMode, HttpServerOptions, KeyStoreOptions};
use super::properties::{ClientAuth, ServerProperties};
use crate::error::Error;
use crate::server::Server;

/// A step in the options pipeline.
///
/// Implemented for any `Fn(&mut HttpServerOptions, &ServerProperties)`, so
/// a closure is enough for one-off tweaks.
pub trait ServerOptionsCustomizer: Send + Sync {
    fn customize(&self, options: &mut HttpServerOptions, properties: &ServerProperties);

    /// Shown in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> ServerOptionsCustomizer for F
where
    F: Fn(&mut HttpServerOptions, &ServerProperties) + Send + Sync,
{
    fn customize(&self, options: &mut HttpServerOptions, properties: &ServerProperties) {
        self(options, properties)
    }
}

// ── Built-ins ─────────────────────────────────────────────────────────────────

/// `server.port`
pub struct PortCustomizer;

impl ServerOptionsCustomizer for PortCustomizer {
    fn customize(&self, options: &mut HttpServerOptions, properties: &ServerProperties) {
        if let Some(port) = properties.port {
            options.port = port;
        }
    }

    fn name(&self) -> &str { "port" }
}

/// `server.address`
pub struct AddressCustomizer;

impl ServerOptionsCustomizer for AddressCustomizer {
    fn customize(&self, options: &mut HttpServerOptions, properties: &ServerProperties) {
        if let Some(address) = properties.address {
            options.host = address.to_string();
        }
    }

    fn name(&self) -> &str { "address" }
}

/// `server.ssl.*`. A disabled or absent block leaves TLS off.
pub struct SslCustomizer;

impl ServerOptionsCustomizer for SslCustomizer {
    fn customize(&self, options: &mut HttpServerOptions, properties: &ServerProperties) {
        let Some(ssl) = properties.ssl.as_ref().filter(|ssl| ssl.enabled) else {
            return;
        };

        options.ssl = true;
        options.key_store = ssl.key_store.as_ref().map(|path| KeyStoreOptions {
            path: path.clone(),
            password: ssl.key_store_password.clone(),
            kind: store_kind(ssl.key_store_type.as_deref(), path),
        });
        options.key_password = ssl.key_password.clone();
        options.trust_store = ssl.trust_store.as_ref().map(|path| KeyStoreOptions {
            path: path.clone(),
            password: ssl.trust_store_password.clone(),
            kind: store_kind(ssl.trust_store_type.as_deref(), path),
        });
        options.client_auth = match ssl.client_auth {
            Some(ClientAuth::Need) => ClientAuthMode::Required,
            Some(ClientAuth::Want) => ClientAuthMode::Request,
            Some(ClientAuth::None) | None => ClientAuthMode::None,
        };
        if !ssl.enabled_protocols.is_empty() {
            options.enabled_secure_transport_protocols = ssl.enabled_protocols.clone();
        }
        if !ssl.ciphers.is_empty() {
            options.cipher_suites = ssl.ciphers.clone();
        }
    }

    fn name(&self) -> &str { "ssl" }
}

/// Explicit type first, then the file extension, then `JKS`.
fn store_kind(declared: Option<&str>, path: &str) -> String {
    if let Some(kind) = declared {
        return kind.to_ascii_uppercase();
    }
    let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("p12" | "pfx") => "PKCS12",
        Some("pem" | "crt" | "key") => "PEM",
        _ => "JKS",
    }
    .to_owned()
}

/// `server.compression.*`
pub struct CompressionCustomizer;

impl ServerOptionsCustomizer for CompressionCustomizer {
    fn customize(&self, options: &mut HttpServerOptions, properties: &ServerProperties) {
        let Some(compression) = properties.compression.as_ref().filter(|c| c.enabled) else {
            return;
        };
        options.compression_supported = true;
        options.compressible_mime_types = compression.mime_types.clone();
        options.min_compression_size = compression.min_response_size;
    }

    fn name(&self) -> &str { "compression" }
}

// ── Factory ───────────────────────────────────────────────────────────────────

/// Builds server options from properties and binds the server.
///
/// ```rust
/// use hitch::config::{ServerFactory, ServerProperties};
///
/// let props = ServerProperties::from_yaml_str("server:\n  port: 9000\n").unwrap();
/// let options = ServerFactory::new(props)
///     .customizer(|options: &mut hitch::config::HttpServerOptions, _: &ServerProperties| {
///         options.write_queue_size = 32;
///     })
///     .options();
///
/// assert_eq!(options.port, 9000);
/// assert_eq!(options.write_queue_size, 32);
/// ```
pub struct ServerFactory {
    properties: ServerProperties,
    built_ins: [Box<dyn ServerOptionsCustomizer>; 4],
    customizers: Vec<Box<dyn ServerOptionsCustomizer>>,
}

impl ServerFactory {
    pub fn new(properties: ServerProperties) -> Self {
        Self {
            properties,
            built_ins: [
                Box::new(PortCustomizer),
                Box::new(AddressCustomizer),
                Box::new(SslCustomizer),
                Box::new(CompressionCustomizer),
            ],
            customizers: Vec::new(),
        }
    }

    /// Registers a customizer that runs after the built-ins and after every
    /// customizer registered before it.
    pub fn customizer(mut self, customizer: impl ServerOptionsCustomizer + 'static) -> Self {
        self.customizers.push(Box::new(customizer));
        self
    }

    pub fn properties(&self) -> &ServerProperties {
        &self.properties
    }

    /// Every customizer in the order it is applied.
    pub fn pipeline(&self) -> impl Iterator<Item = &dyn ServerOptionsCustomizer> {
        self.built_ins.iter().chain(&self.customizers).map(|c| &**c)
    }

    /// Runs the pipeline over the default options.
    pub fn options(&self) -> HttpServerOptions {
        let mut options = HttpServerOptions::default();
        for customizer in self.pipeline() {
            customizer.customize(&mut options, &self.properties);
            debug!(customizer = customizer.name(), "server options customized");
        }
        options
    }

    /// Binds a [`Server`] with the customized options.
    pub async fn bind(&self) -> Result<Server, Error> {
        Server::bind(self.options()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::properties::{Compression, Ssl};

    struct Recording {
        seen_port: Arc<Mutex<Option<u16>>>,
    }

    impl ServerOptionsCustomizer for Recording {
        fn customize(&self, options: &mut HttpServerOptions, _: &ServerProperties) {
            *self.seen_port.lock().unwrap() = Some(options.port);
            options.port = 9999;
        }

        fn name(&self) -> &str { "recording" }
    }

    fn properties() -> ServerProperties {
        ServerProperties {
            port: Some(8443),
            address: Some("0.0.0.0".parse().unwrap()),
            ssl: Some(Ssl { key_store: Some("keystore.p12".into()), ..Ssl::default() }),
            compression: Some(Compression { enabled: true, ..Compression::default() }),
        }
    }

    #[test]
    fn built_ins_run_before_external_customizers() {
        let seen_port = Arc::new(Mutex::new(None));
        let factory = ServerFactory::new(properties())
            .customizer(Recording { seen_port: Arc::clone(&seen_port) });

        let names: Vec<_> = factory.pipeline().map(|c| c.name()).collect();
        assert_eq!(names, ["port", "address", "ssl", "compression", "recording"]);

        let options = factory.options();
        assert_eq!(*seen_port.lock().unwrap(), Some(8443));
        assert_eq!(options.port, 9999);
        assert_eq!(options.host, "0.0.0.0");
        assert!(options.ssl);
        assert_eq!(options.key_store.unwrap().kind, "PKCS12");
        assert!(options.compression_supported);
        assert_eq!(options.min_compression_size, 2048);
    }

    #[test]
    fn external_customizers_keep_registration_order() {
        let factory = ServerFactory::new(ServerProperties::default())
            .customizer(|o: &mut HttpServerOptions, _: &ServerProperties| o.port = 1)
            .customizer(|o: &mut HttpServerOptions, _: &ServerProperties| o.port += 1);

        assert_eq!(factory.options().port, 2);
    }

    #[test]
    fn empty_properties_leave_defaults() {
        let options = ServerFactory::new(ServerProperties::default()).options();
        assert_eq!(options, HttpServerOptions::default());
    }

    #[test]
    fn disabled_ssl_block_is_ignored() {
        let props = ServerProperties {
            ssl: Some(Ssl { enabled: false, ..Ssl::default() }),
            ..ServerProperties::default()
        };
        assert!(!ServerFactory::new(props).options().ssl);
    }

    #[test]
    fn client_auth_maps_to_engine_modes() {
        let props = ServerProperties {
            ssl: Some(Ssl { client_auth: Some(ClientAuth::Want), ..Ssl::default() }),
            ..ServerProperties::default()
        };
        assert_eq!(ServerFactory::new(props).options().client_auth, ClientAuthMode::Request);
    }

    #[test]
    fn store_kind_falls_back_to_extension() {
        assert_eq!(store_kind(Some("pkcs12"), "ks"), "PKCS12");
        assert_eq!(store_kind(None, "/etc/certs/server.pem"), "PEM");
        assert_eq!(store_kind(None, "keystore"), "JKS");
    }
}
