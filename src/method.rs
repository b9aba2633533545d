//! # HTTP Method Module
//!
//! A closed set of HTTP method tags with a single bidirectional mapping table
//! to their wire strings. Methods that are not in the table (extension methods
//! a client is free to send) are carried verbatim in [`HttpMethod::Raw`].
//!
//! ```rust
//! use opsrouter::method::HttpMethod;
//!
//! assert_eq!(HttpMethod::from_wire("PROPFIND"), HttpMethod::Propfind);
//! assert_eq!(HttpMethod::Post.as_str(), "POST");
//! assert_eq!(HttpMethod::from_wire("BREW").as_str(), "BREW");
//! ```

use std::fmt;
use std::str::FromStr;

/// HTTP request method used as part of the routing key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Put,
    Acl,
    Head,
    Post,
    Copy,
    Lock,
    Move,
    Bind,
    Link,
    Patch,
    Trace,
    Mkcol,
    Merge,
    Purge,
    Notify,
    Search,
    Unlock,
    Rebind,
    Unbind,
    Report,
    Delete,
    Unlink,
    Connect,
    Msearch,
    Options,
    Propfind,
    Checkout,
    Proppatch,
    Subscribe,
    Mkcalendar,
    Mkactivity,
    Unsubscribe,
    /// Any method not in [`METHOD_TABLE`], kept exactly as received.
    ///
    /// Only [`HttpMethod::from_wire`] builds one, so a tabled method such as
    /// `GET` is always its tag and never `Raw`.
    Raw(ExtensionMethod),
}

/// Wire string of a method missing from [`METHOD_TABLE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionMethod(String);

impl ExtensionMethod {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Tag to wire-string mapping. Both directions of the conversion read this table.
pub const METHOD_TABLE: &[(HttpMethod, &str)] = &[
    (HttpMethod::Get, "GET"),
    (HttpMethod::Put, "PUT"),
    (HttpMethod::Acl, "ACL"),
    (HttpMethod::Head, "HEAD"),
    (HttpMethod::Post, "POST"),
    (HttpMethod::Copy, "COPY"),
    (HttpMethod::Lock, "LOCK"),
    (HttpMethod::Move, "MOVE"),
    (HttpMethod::Bind, "BIND"),
    (HttpMethod::Link, "LINK"),
    (HttpMethod::Patch, "PATCH"),
    (HttpMethod::Trace, "TRACE"),
    (HttpMethod::Mkcol, "MKCOL"),
    (HttpMethod::Merge, "MERGE"),
    (HttpMethod::Purge, "PURGE"),
    (HttpMethod::Notify, "NOTIFY"),
    (HttpMethod::Search, "SEARCH"),
    (HttpMethod::Unlock, "UNLOCK"),
    (HttpMethod::Rebind, "REBIND"),
    (HttpMethod::Unbind, "UNBIND"),
    (HttpMethod::Report, "REPORT"),
    (HttpMethod::Delete, "DELETE"),
    (HttpMethod::Unlink, "UNLINK"),
    (HttpMethod::Connect, "CONNECT"),
    (HttpMethod::Msearch, "MSEARCH"),
    (HttpMethod::Options, "OPTIONS"),
    (HttpMethod::Propfind, "PROPFIND"),
    (HttpMethod::Checkout, "CHECKOUT"),
    (HttpMethod::Proppatch, "PROPPATCH"),
    (HttpMethod::Subscribe, "SUBSCRIBE"),
    (HttpMethod::Mkcalendar, "MKCALENDAR"),
    (HttpMethod::Mkactivity, "MKACTIVITY"),
    (HttpMethod::Unsubscribe, "UNSUBSCRIBE"),
];

impl HttpMethod {
    /// Map a wire string to its tag.
    ///
    /// Matching is exact: method names are case-sensitive on the wire
    /// (RFC 9110 §9.1), so `get` is a `Raw` method rather than `Get`.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        METHOD_TABLE
            .iter()
            .find(|(_, wire)| *wire == value)
            .map(|(method, _)| method.clone())
            .unwrap_or_else(|| HttpMethod::Raw(ExtensionMethod(value.to_string())))
    }

    /// The wire string for this method.
    #[must_use]
    pub fn as_str(&self) -> &str {
        if let HttpMethod::Raw(extension) = self {
            return extension.as_str();
        }
        METHOD_TABLE
            .iter()
            .find(|(method, _)| method == self)
            .map(|(_, wire)| *wire)
            .unwrap_or_default()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(HttpMethod::from_wire(s))
    }
}

impl From<&http::Method> for HttpMethod {
    fn from(method: &http::Method) -> Self {
        HttpMethod::from_wire(method.as_str())
    }
}

impl From<http::Method> for HttpMethod {
    fn from(method: http::Method) -> Self {
        HttpMethod::from(&method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_round_trips_every_tag() {
        for (method, wire) in METHOD_TABLE {
            assert_eq!(&HttpMethod::from_wire(wire), method);
            assert_eq!(method.as_str(), *wire);
        }
    }

    #[test]
    fn unknown_methods_are_kept_raw() {
        let method = HttpMethod::from_wire("BREW");
        assert!(matches!(&method, HttpMethod::Raw(extension) if extension.as_str() == "BREW"));
        assert_eq!(method.to_string(), "BREW");
    }

    #[test]
    fn wire_matching_is_case_sensitive() {
        assert!(matches!(HttpMethod::from_wire("get"), HttpMethod::Raw(_)));
        assert_ne!(HttpMethod::from_wire("get"), HttpMethod::Get);
    }

    #[test]
    fn tabled_methods_never_become_raw() {
        for (method, wire) in METHOD_TABLE {
            let parsed: HttpMethod = wire.parse().unwrap();
            assert!(!matches!(parsed, HttpMethod::Raw(_)), "{wire}");
            assert_eq!(&parsed, method);
        }
    }

    #[test]
    fn converts_from_http_crate_methods() {
        assert_eq!(HttpMethod::from(http::Method::DELETE), HttpMethod::Delete);
        assert_eq!(HttpMethod::from(&http::Method::OPTIONS), HttpMethod::Options);
    }
}
