use super::request::HeaderVec;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Reason phrase for the status codes this crate produces.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Response produced for one request
///
/// `body: None` is an empty body; `Some(value)` is serialized as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResponse {
    /// HTTP status code (200, 400, 500, ...)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Option<Value>,
}

impl OperationResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Option<Value>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with a `content-type` header
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body: Some(body),
        }
    }

    /// Create a response with no body
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: None,
        }
    }

    /// Create an error response with the `{ "type", "reason" }` body
    #[must_use]
    pub fn error(status: u16, code: &str, reason: &str) -> Self {
        Self::json(status, serde_json::json!({ "type": code, "reason": reason }))
    }

    /// Wire code of an error response (the `type` field), if any
    #[must_use]
    pub fn error_type(&self) -> Option<&str> {
        self.body.as_ref()?.get("type")?.as_str()
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Serialized body bytes; empty when there is no body
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body
            .as_ref()
            .map(|body| body.to_string().into_bytes())
            .unwrap_or_default()
    }

    /// Convert into an `http::Response`
    ///
    /// # Errors
    ///
    /// Returns [`http::Error`] for an out-of-range status or a header that is
    /// not a valid HTTP header name or value.
    pub fn into_http(self) -> Result<http::Response<Vec<u8>>, http::Error> {
        let body = self.body_bytes();
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(&**name, value.as_str());
        }
        builder.body(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(400), "Bad Request");
        assert_eq!(status_reason(500), "Internal Server Error");
    }

    #[test]
    fn test_error_body_shape() {
        let resp = OperationResponse::error(400, "ValidationError", "missing field `theID`");
        assert_eq!(resp.error_type(), Some("ValidationError"));
        assert_eq!(
            resp.body,
            Some(serde_json::json!({
                "type": "ValidationError",
                "reason": "missing field `theID`"
            }))
        );
        assert_eq!(resp.get_header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_into_http() {
        let mut resp = OperationResponse::empty(200);
        resp.set_header("x-request-id", "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string());
        let http = resp.into_http().unwrap();
        assert_eq!(http.status(), http::StatusCode::OK);
        assert!(http.body().is_empty());
        assert_eq!(
            http.headers().get("x-request-id").unwrap(),
            "01ARZ3NDEKTSV4RRFFQ69G5FAV"
        );
    }
}
