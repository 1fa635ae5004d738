//! Unified error type.

/// The error type returned by hitch's fallible operations.
///
/// Body streams surface engine failures through this type as well, so a
/// reset connection shows up as an `Err` item on the reader or as the
/// result of a write.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine: {0}")]
    Engine(#[from] hyper::Error),

    #[error("http: {0}")]
    Http(#[from] http::Error),

    #[error("invalid uri: {0}")]
    InvalidUri(#[from] http::uri::InvalidUri),

    #[error("invalid method: {0}")]
    InvalidMethod(#[from] http::method::InvalidMethod),

    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("invalid status code: {0}")]
    InvalidStatus(#[from] http::status::InvalidStatusCode),

    #[error("config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A single-use body was subscribed to a second time.
    #[error("body stream allows only a single subscriber")]
    MultipleSubscription,

    /// Headers, status or cookies were modified after the message head
    /// was handed to the engine.
    #[error("message already committed")]
    Committed,

    /// The engine side of a body stream went away.
    #[error("stream closed")]
    Closed,

    #[error("transport: {0}")]
    Transport(String),

    #[error("config: {0}")]
    Config(String),

    #[error("tls termination is not provided by the built-in engine")]
    TlsUnsupported,

    #[error("handler: {0}")]
    Handler(String),
}

impl Error {
    /// Shorthand for a transport failure reported by an engine.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}
