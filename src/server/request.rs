use crate::method::HttpMethod;
use crate::shape::{Shape, ShapeError};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

/// Maximum inline headers before heap allocation
/// Most requests have ≤16 headers
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path
///
/// Header names use `Arc<str>` so repeated names (`content-type`,
/// `x-request-id`) are cheap to clone; values are per-request data.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// A single decoded request as handed over by the transport.
///
/// Header names are stored lower-cased. The body is kept as raw bytes and is
/// only decoded if the selected operation's input needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Request target including any query string (e.g. `/pets/1?verbose=true`)
    pub uri: String,
    /// HTTP headers (lowercase names, stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    /// Raw request body
    pub body: Vec<u8>,
}

impl RawRequest {
    #[must_use]
    pub fn new(method: HttpMethod, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    /// Append a header; the name is lower-cased.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and the matching `content-type` header.
    #[must_use]
    pub fn with_json(self, body: &serde_json::Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(body.to_string())
    }

    /// Convert an `http::Request`, keeping header values that are valid UTF-8
    /// (lossily for the rest).
    #[must_use]
    pub fn from_http(request: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = request.into_parts();
        let uri = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let headers: HeaderVec = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    Arc::from(name.as_str()),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        debug!(
            method = %parts.method,
            uri = %uri,
            header_count = headers.len(),
            body_size_bytes = body.len(),
            "HTTP request converted"
        );

        Self {
            method: HttpMethod::from(&parts.method),
            uri,
            headers,
            body,
        }
    }

    /// The path portion of the URI, without query string or fragment.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.split(['?', '#']).next().unwrap_or(&self.uri)
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Query parameters folded into a [`Shape`].
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError`] when parameter names conflict (`a=1&a.b=2`).
    pub fn query_shape(&self) -> Result<Shape, ShapeError> {
        Shape::from_pairs(parse_query_params(&self.uri))
    }

    /// Headers folded into a [`Shape`] keyed by lower-cased name.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError`] when header names conflict.
    pub fn header_shape(&self) -> Result<Shape, ShapeError> {
        Shape::from_pairs(self.headers.iter().map(|(k, v)| (&**k, v.as_str())))
    }
}

/// Parse query string parameters from a URI
///
/// Extracts everything between `?` and any `#` and URL-decodes names and
/// values. Repeated names are kept in order.
///
/// # Arguments
///
/// * `uri` - The request target (e.g., `/users?limit=10&tag=a&tag=b`)
///
/// # Returns
///
/// The decoded `(name, value)` pairs
#[must_use]
pub fn parse_query_params(uri: &str) -> Vec<(String, String)> {
    let without_fragment = uri.split('#').next().unwrap_or(uri);
    match without_fragment.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("/p?x=1&y=hello%20world&x=2#frag");
        assert_eq!(
            q,
            vec![
                ("x".to_string(), "1".to_string()),
                ("y".to_string(), "hello world".to_string()),
                ("x".to_string(), "2".to_string()),
            ]
        );
        assert!(parse_query_params("/p").is_empty());
    }

    #[test]
    fn test_from_http_lowercases_header_names() {
        let request = http::Request::builder()
            .method("POST")
            .uri("/exampleoperation/tok?theParameter=p")
            .header("TheHeader", "h")
            .body(b"{}".to_vec())
            .unwrap();
        let raw = RawRequest::from_http(request);
        assert_eq!(raw.method, HttpMethod::Post);
        assert_eq!(raw.uri, "/exampleoperation/tok?theParameter=p");
        assert_eq!(raw.path(), "/exampleoperation/tok");
        assert_eq!(raw.get_header("theheader"), Some("h"));
        assert_eq!(&*raw.headers[0].0, "theheader");
    }

    #[test]
    fn test_query_shape_folds_repeats() {
        let raw = RawRequest::new(HttpMethod::Get, "/search?tag=a&tag=b&limit=5");
        let shape = raw.query_shape().unwrap();
        assert_eq!(shape.get("limit").and_then(Shape::as_str), Some("5"));
        assert!(matches!(shape.get("tag"), Some(Shape::List(items)) if items.len() == 2));
    }
}
