//! HTTP status codes as a typed enum.
//!
//! Engines report raw numeric codes. [`Status`] is the typed view the
//! adapters hand to framework code; codes outside the IANA registry have no
//! typed form and are only available raw (see
//! [`ClientResponse::raw_status`](crate::ClientResponse::raw_status)).
//!
//! ```rust
//! use hitch::Status;
//!
//! assert_eq!(u16::from(Status::NoContent), 204);
//! assert_eq!(Status::try_from(404u16), Ok(Status::NotFound));
//! assert!(Status::try_from(299u16).is_err());
//! ```

macro_rules! statuses {
    ($($variant:ident = $code:literal,)*) => {
        /// All IANA-registered HTTP status codes.
        #[allow(clippy::enum_variant_names)]
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum Status {
            $($variant,)*
        }

        impl From<Status> for u16 {
            fn from(s: Status) -> u16 {
                match s {
                    $(Status::$variant => $code,)*
                }
            }
        }

        impl TryFrom<u16> for Status {
            type Error = u16;

            /// Fails with the raw code when it is not a registered status.
            fn try_from(code: u16) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(Status::$variant),)*
                    other => Err(other),
                }
            }
        }
    };
}

statuses! {
    // ── 1xx Informational ─────────────────────────────────────────────────────
    Continue                      = 100,
    SwitchingProtocols            = 101,
    Processing                    = 102,
    EarlyHints                    = 103,

    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok                            = 200,
    Created                       = 201,
    Accepted                      = 202,
    NonAuthoritativeInformation   = 203,
    NoContent                     = 204,
    ResetContent                  = 205,
    PartialContent                = 206,
    MultiStatus                   = 207,
    AlreadyReported               = 208,
    ImUsed                        = 226,

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    MultipleChoices               = 300,
    MovedPermanently              = 301,
    Found                         = 302,
    SeeOther                      = 303,
    NotModified                   = 304,
    TemporaryRedirect             = 307,
    PermanentRedirect             = 308,

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest                    = 400,
    Unauthorized                  = 401,
    PaymentRequired               = 402,
    Forbidden                     = 403,
    NotFound                      = 404,
    MethodNotAllowed              = 405,
    NotAcceptable                 = 406,
    ProxyAuthenticationRequired   = 407,
    RequestTimeout                = 408,
    Conflict                      = 409,
    Gone                          = 410,
    LengthRequired                = 411,
    PreconditionFailed            = 412,
    ContentTooLarge               = 413,
    UriTooLong                    = 414,
    UnsupportedMediaType          = 415,
    RangeNotSatisfiable           = 416,
    ExpectationFailed             = 417,
    ImATeapot                     = 418,
    MisdirectedRequest            = 421,
    UnprocessableContent          = 422,
    Locked                        = 423,
    FailedDependency              = 424,
    TooEarly                      = 425,
    UpgradeRequired               = 426,
    PreconditionRequired          = 428,
    TooManyRequests               = 429,
    RequestHeaderFieldsTooLarge   = 431,
    UnavailableForLegalReasons    = 451,

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError           = 500,
    NotImplemented                = 501,
    BadGateway                    = 502,
    ServiceUnavailable            = 503,
    GatewayTimeout                = 504,
    HttpVersionNotSupported       = 505,
    VariantAlsoNegotiates         = 506,
    InsufficientStorage           = 507,
    LoopDetected                  = 508,
    NotExtended                   = 510,
    NetworkAuthenticationRequired = 511,
}

impl From<Status> for http::StatusCode {
    fn from(s: Status) -> Self {
        // Every registered code is within 100..=999.
        http::StatusCode::from_u16(s.into()).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }
}
