//! HTTP method as a typed enum.
//!
//! Covers RFC 9110 standard methods, WebDAV extensions (RFC 4918 / 4791 / 3253 / 5323),
//! and `PURGE` used by nginx and Varnish for cache invalidation.
//!
//! Anything else the engine hands over is kept verbatim as
//! [`Method::Extension`], so non-standard methods survive a round trip
//! through the adapters.

use std::fmt;
use std::str::FromStr;

/// An HTTP method.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    // RFC 9110 ─────────────────────────────────────────────────────────────────
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
    // WebDAV RFC 4918 ──────────────────────────────────────────────────────────
    Copy,
    Lock,
    Mkcol,
    Move,
    Propfind,
    Proppatch,
    Unlock,
    // WebDAV extensions ────────────────────────────────────────────────────────
    Mkcalendar, // RFC 4791, CalDAV
    Report,     // RFC 3253
    Search,     // RFC 5323
    // Cache invalidation ───────────────────────────────────────────────────────
    Purge, // nginx / Varnish
    // Catch-all ────────────────────────────────────────────────────────────────
    Extension(Box<str>),
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connect      => "CONNECT",
            Self::Copy         => "COPY",
            Self::Delete       => "DELETE",
            Self::Get          => "GET",
            Self::Head         => "HEAD",
            Self::Lock         => "LOCK",
            Self::Mkcalendar   => "MKCALENDAR",
            Self::Mkcol        => "MKCOL",
            Self::Move         => "MOVE",
            Self::Options      => "OPTIONS",
            Self::Patch        => "PATCH",
            Self::Post         => "POST",
            Self::Propfind     => "PROPFIND",
            Self::Proppatch    => "PROPPATCH",
            Self::Purge        => "PURGE",
            Self::Put          => "PUT",
            Self::Report       => "REPORT",
            Self::Search       => "SEARCH",
            Self::Trace        => "TRACE",
            Self::Unlock       => "UNLOCK",
            Self::Extension(m) => m,
        }
    }

    /// Converts into the engine's method type.
    pub fn to_http(&self) -> Result<http::Method, http::method::InvalidMethod> {
        http::Method::from_bytes(self.as_str().as_bytes())
    }
}

/// Parses a method string. Known methods are case-sensitive per RFC 9110 §9.1;
/// everything else becomes [`Method::Extension`], so parsing never fails.
impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT"    => Self::Connect,
            "COPY"       => Self::Copy,
            "DELETE"     => Self::Delete,
            "GET"        => Self::Get,
            "HEAD"       => Self::Head,
            "LOCK"       => Self::Lock,
            "MKCALENDAR" => Self::Mkcalendar,
            "MKCOL"      => Self::Mkcol,
            "MOVE"       => Self::Move,
            "OPTIONS"    => Self::Options,
            "PATCH"      => Self::Patch,
            "POST"       => Self::Post,
            "PROPFIND"   => Self::Propfind,
            "PROPPATCH"  => Self::Proppatch,
            "PURGE"      => Self::Purge,
            "PUT"        => Self::Put,
            "REPORT"     => Self::Report,
            "SEARCH"     => Self::Search,
            "TRACE"      => Self::Trace,
            "UNLOCK"     => Self::Unlock,
            other        => Self::Extension(other.into()),
        })
    }
}

impl From<&http::Method> for Method {
    fn from(m: &http::Method) -> Self {
        match m.as_str().parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_standard_methods() {
        assert_eq!(Method::from(&http::Method::GET), Method::Get);
        assert_eq!(Method::from(&http::Method::PATCH), Method::Patch);
        assert_eq!(Method::Delete.to_http().unwrap(), http::Method::DELETE);
    }

    #[test]
    fn unknown_method_becomes_extension() {
        let native = http::Method::from_bytes(b"BREW").unwrap();
        let method = Method::from(&native);

        assert_eq!(method, Method::Extension("BREW".into()));
        assert_eq!(method.to_http().unwrap(), native);
    }

    #[test]
    fn webdav_methods_round_trip() {
        for name in ["PROPFIND", "MKCALENDAR", "PURGE"] {
            let method: Method = name.parse().unwrap();
            assert!(!matches!(method, Method::Extension(_)));
            assert_eq!(method.to_string(), name);
        }
    }
}
