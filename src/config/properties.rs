//! The `server.*` property tree.

use std::net::IpAddr;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

/// MIME types compressed when `server.compression.enabled` is set and no
/// list is configured.
pub const DEFAULT_COMPRESSIBLE_MIME_TYPES: &[&str] = &[
    "text/html",
    "text/xml",
    "text/plain",
    "text/css",
    "text/javascript",
    "application/javascript",
    "application/json",
    "application/xml",
];

/// Responses smaller than this are sent uncompressed.
pub const DEFAULT_MIN_RESPONSE_SIZE: usize = 2048;

/// Settings under the `server` key.
///
/// Absent values leave the engine defaults in place; each facet is picked
/// up by one built-in [`ServerOptionsCustomizer`](super::ServerOptionsCustomizer).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerProperties {
    pub port: Option<u16>,
    pub address: Option<IpAddr>,
    pub ssl: Option<Ssl>,
    pub compression: Option<Compression>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Ssl {
    pub enabled: bool,
    pub key_store: Option<String>,
    pub key_store_password: Option<String>,
    pub key_store_type: Option<String>,
    pub key_password: Option<String>,
    pub trust_store: Option<String>,
    pub trust_store_password: Option<String>,
    pub trust_store_type: Option<String>,
    pub client_auth: Option<ClientAuth>,
    pub enabled_protocols: Vec<String>,
    pub ciphers: Vec<String>,
}

impl Default for Ssl {
    fn default() -> Self {
        Self {
            // Declaring an ssl block turns TLS on unless it says otherwise.
            enabled: true,
            key_store: None,
            key_store_password: None,
            key_store_type: None,
            key_password: None,
            trust_store: None,
            trust_store_password: None,
            trust_store_type: None,
            client_auth: None,
            enabled_protocols: Vec::new(),
            ciphers: Vec::new(),
        }
    }
}

/// Whether the server asks for a client certificate.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ClientAuth {
    None,
    Want,
    Need,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Compression {
    pub enabled: bool,
    pub mime_types: Vec<String>,
    pub min_response_size: usize,
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            enabled: false,
            mime_types: DEFAULT_COMPRESSIBLE_MIME_TYPES.iter().map(|&m| m.to_owned()).collect(),
            min_response_size: DEFAULT_MIN_RESPONSE_SIZE,
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct Document {
    server: ServerProperties,
}

impl ServerProperties {
    /// Parses a YAML document with a top-level `server` key. A document
    /// without one yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: Document = serde_yaml::from_str(yaml)?;
        Ok(doc.server)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading server properties");
        Self::from_yaml_str(&yaml)
    }

    /// Overlays `SERVER_PORT`, `SERVER_ADDRESS`, `SERVER_SSL_ENABLED` and
    /// `SERVER_COMPRESSION_ENABLED` from the process environment.
    pub fn apply_env(&mut self) -> Result<(), Error> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// [`apply_env`](Self::apply_env) with a custom variable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("SERVER_PORT") {
            self.port = Some(parse("SERVER_PORT", &port)?);
        }
        if let Some(address) = lookup("SERVER_ADDRESS") {
            self.address = Some(parse("SERVER_ADDRESS", &address)?);
        }
        if let Some(enabled) = lookup("SERVER_SSL_ENABLED") {
            self.ssl.get_or_insert_with(Ssl::default).enabled = parse_bool("SERVER_SSL_ENABLED", &enabled)?;
        }
        if let Some(enabled) = lookup("SERVER_COMPRESSION_ENABLED") {
            self.compression.get_or_insert_with(Compression::default).enabled =
                parse_bool("SERVER_COMPRESSION_ENABLED", &enabled)?;
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value.trim().parse().map_err(|_| Error::Config(format!("invalid {key}: {value}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("invalid {key}: {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const FULL: &str = r#"
server:
  port: 8443
  address: 0.0.0.0
  ssl:
    key-store: /etc/hitch/keystore.p12
    key-store-password: secret
    key-store-type: PKCS12
    client-auth: need
    enabled-protocols: [TLSv1.3]
  compression:
    enabled: true
    mime-types: [application/json]
    min-response-size: 1024
"#;

    #[test]
    fn parses_the_full_tree() {
        let props = ServerProperties::from_yaml_str(FULL).unwrap();

        assert_eq!(props.port, Some(8443));
        assert_eq!(props.address, Some("0.0.0.0".parse().unwrap()));

        let ssl = props.ssl.unwrap();
        assert!(ssl.enabled);
        assert_eq!(ssl.key_store.as_deref(), Some("/etc/hitch/keystore.p12"));
        assert_eq!(ssl.client_auth, Some(ClientAuth::Need));
        assert_eq!(ssl.enabled_protocols, vec!["TLSv1.3"]);

        let compression = props.compression.unwrap();
        assert!(compression.enabled);
        assert_eq!(compression.mime_types, vec!["application/json"]);
        assert_eq!(compression.min_response_size, 1024);
    }

    #[test]
    fn missing_sections_keep_defaults() {
        let props = ServerProperties::from_yaml_str("server:\n  compression: {}\n").unwrap();

        assert_eq!(props.port, None);
        let compression = props.compression.unwrap();
        assert!(!compression.enabled);
        assert_eq!(compression.min_response_size, DEFAULT_MIN_RESPONSE_SIZE);
        assert!(compression.mime_types.iter().any(|m| m == "application/json"));

        assert_eq!(ServerProperties::from_yaml_str("").unwrap(), ServerProperties::default());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            ServerProperties::from_yaml_str("server:\n  port: not-a-port\n"),
            Err(Error::Yaml(_)),
        ));
    }

    #[test]
    fn env_overlays_yaml() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SERVER_PORT", "9090"),
            ("SERVER_ADDRESS", "127.0.0.1"),
            ("SERVER_COMPRESSION_ENABLED", "on"),
        ]);
        let mut props = ServerProperties::from_yaml_str(FULL).unwrap();

        props.apply_env_with(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(props.port, Some(9090));
        assert_eq!(props.address, Some("127.0.0.1".parse().unwrap()));
        assert!(props.compression.unwrap().enabled);
        assert!(props.ssl.unwrap().enabled);
    }

    #[test]
    fn invalid_env_value_is_a_config_error() {
        let mut props = ServerProperties::default();
        let err = props
            .apply_env_with(|key| (key == "SERVER_SSL_ENABLED").then(|| "maybe".to_owned()))
            .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }
}
