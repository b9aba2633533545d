use crate::server::RawRequest;
use crate::shape::{Shape, ShapeError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

/// One of the four places an operation input can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    Path,
    Query,
    Headers,
    Body,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputSource::Path => "path",
            InputSource::Query => "query",
            InputSource::Headers => "headers",
            InputSource::Body => "body",
        })
    }
}

/// Failure to produce an operation input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// A source's data did not decode into the requested type.
    #[error("invalid {origin} input: {detail}")]
    Decode { origin: InputSource, detail: String },
    /// The merged shape of several sources did not decode.
    #[error("invalid input: {0}")]
    Shape(#[from] ShapeError),
    /// The provider was already used for this request.
    #[error("{origin} input source was already consumed")]
    SourceConsumed { origin: InputSource },
    /// No provider was bound for the source.
    #[error("{origin} input source is not available")]
    SourceUnavailable { origin: InputSource },
}

impl InputError {
    pub fn decode(origin: InputSource, detail: impl fmt::Display) -> Self {
        InputError::Decode {
            origin,
            detail: detail.to_string(),
        }
    }

    /// True for errors caused by the request data rather than by the
    /// composer's use of the providers.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, InputError::Decode { .. } | InputError::Shape(_))
    }
}

type ShapeProvider<'a> = Box<dyn FnOnce() -> Result<Shape, InputError> + 'a>;
type BodyProvider<'a> = Box<dyn FnOnce() -> Result<Cow<'a, [u8]>, InputError> + 'a>;

/// The four lazily-invoked input providers for one request
///
/// Each provider runs at most once; the request data is only decoded for the
/// sources an operation's composer asks for. Asking twice for the same source
/// yields [`InputError::SourceConsumed`].
///
/// ```rust
/// use opsrouter::input::Providers;
/// use opsrouter::shape::Shape;
/// use serde::Deserialize;
/// use std::borrow::Cow;
///
/// #[derive(Deserialize)]
/// struct Query { limit: u32 }
///
/// let mut providers = Providers::new()
///     .with_query(|| Ok(Shape::from_pairs([("limit", "5")])?))
///     .with_body(|| Ok(Cow::Borrowed(&b"{}"[..])));
///
/// let query: Query = providers.query().unwrap();
/// assert_eq!(query.limit, 5);
/// assert!(providers.query::<Query>().is_err());
/// ```
pub struct Providers<'a> {
    query: Slot<ShapeProvider<'a>>,
    path: Slot<ShapeProvider<'a>>,
    body: Slot<BodyProvider<'a>>,
    headers: Slot<ShapeProvider<'a>>,
}

enum Slot<P> {
    Unbound,
    Ready(P),
    Consumed,
}

impl<P> Slot<P> {
    fn take(&mut self, origin: InputSource) -> Result<P, InputError> {
        match std::mem::replace(self, Slot::Consumed) {
            Slot::Ready(provider) => Ok(provider),
            Slot::Consumed => Err(InputError::SourceConsumed { origin }),
            Slot::Unbound => {
                *self = Slot::Unbound;
                Err(InputError::SourceUnavailable { origin })
            }
        }
    }

    fn state(&self) -> &'static str {
        match self {
            Slot::Unbound => "unbound",
            Slot::Ready(_) => "ready",
            Slot::Consumed => "consumed",
        }
    }
}

impl Default for Providers<'_> {
    fn default() -> Self {
        Self {
            query: Slot::Unbound,
            path: Slot::Unbound,
            body: Slot::Unbound,
            headers: Slot::Unbound,
        }
    }
}

impl fmt::Debug for Providers<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Providers")
            .field("query", &self.query.state())
            .field("path", &self.path.state())
            .field("body", &self.body.state())
            .field("headers", &self.headers.state())
            .finish()
    }
}

impl<'a> Providers<'a> {
    /// No providers bound; every accessor reports the source as unavailable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the providers to a request and the path shape from routing.
    #[must_use]
    pub fn from_request(request: &'a RawRequest, path_shape: Shape) -> Self {
        Self::new()
            .with_query(move || {
                request
                    .query_shape()
                    .map_err(|e| InputError::decode(InputSource::Query, e))
            })
            .with_path(move || Ok(path_shape))
            .with_body(move || Ok(Cow::Borrowed(request.body.as_slice())))
            .with_headers(move || {
                request
                    .header_shape()
                    .map_err(|e| InputError::decode(InputSource::Headers, e))
            })
    }

    #[must_use]
    pub fn with_query<F>(mut self, provider: F) -> Self
    where
        F: FnOnce() -> Result<Shape, InputError> + 'a,
    {
        self.query = Slot::Ready(Box::new(provider));
        self
    }

    #[must_use]
    pub fn with_path<F>(mut self, provider: F) -> Self
    where
        F: FnOnce() -> Result<Shape, InputError> + 'a,
    {
        self.path = Slot::Ready(Box::new(provider));
        self
    }

    #[must_use]
    pub fn with_body<F>(mut self, provider: F) -> Self
    where
        F: FnOnce() -> Result<Cow<'a, [u8]>, InputError> + 'a,
    {
        self.body = Slot::Ready(Box::new(provider));
        self
    }

    #[must_use]
    pub fn with_headers<F>(mut self, provider: F) -> Self
    where
        F: FnOnce() -> Result<Shape, InputError> + 'a,
    {
        self.headers = Slot::Ready(Box::new(provider));
        self
    }

    /// Query parameters as a shape.
    ///
    /// # Errors
    ///
    /// Fails if the provider fails, was already used, or is not bound.
    pub fn query_shape(&mut self) -> Result<Shape, InputError> {
        take_shape(&mut self.query, InputSource::Query)
    }

    /// Path variables as a shape.
    ///
    /// # Errors
    ///
    /// Fails if the provider fails, was already used, or is not bound.
    pub fn path_shape(&mut self) -> Result<Shape, InputError> {
        take_shape(&mut self.path, InputSource::Path)
    }

    /// Headers as a shape.
    ///
    /// # Errors
    ///
    /// Fails if the provider fails, was already used, or is not bound.
    pub fn headers_shape(&mut self) -> Result<Shape, InputError> {
        take_shape(&mut self.headers, InputSource::Headers)
    }

    /// Raw body bytes.
    ///
    /// # Errors
    ///
    /// Fails if the provider fails, was already used, or is not bound.
    pub fn body_bytes(&mut self) -> Result<Cow<'a, [u8]>, InputError> {
        let provider = self.body.take(InputSource::Body)?;
        let bytes = provider()?;
        debug!(source = %InputSource::Body, size_bytes = bytes.len(), "Input source read");
        Ok(bytes)
    }

    /// Body parsed as JSON and converted to a shape; an empty body is `Null`.
    ///
    /// # Errors
    ///
    /// Fails on invalid JSON or if the provider fails, was already used, or is not bound.
    pub fn body_shape(&mut self) -> Result<Shape, InputError> {
        let bytes = self.body_bytes()?;
        if is_blank(&bytes) {
            return Ok(Shape::Null);
        }
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| InputError::decode(InputSource::Body, e))?;
        Ok(Shape::from_json(value))
    }

    /// Decode the query parameters into `T`.
    ///
    /// # Errors
    ///
    /// See [`Providers::query_shape`]; decode failures are [`InputError::Decode`].
    pub fn query<T: DeserializeOwned>(&mut self) -> Result<T, InputError> {
        decode_shape(self.query_shape()?, InputSource::Query)
    }

    /// Decode the path variables into `T`.
    ///
    /// # Errors
    ///
    /// See [`Providers::path_shape`]; decode failures are [`InputError::Decode`].
    pub fn path<T: DeserializeOwned>(&mut self) -> Result<T, InputError> {
        decode_shape(self.path_shape()?, InputSource::Path)
    }

    /// Decode the headers into `T`; field names match case-insensitively.
    ///
    /// # Errors
    ///
    /// See [`Providers::headers_shape`]; decode failures are [`InputError::Decode`].
    pub fn headers<T: DeserializeOwned>(&mut self) -> Result<T, InputError> {
        decode_shape(self.headers_shape()?, InputSource::Headers)
    }

    /// Decode the JSON body into `T`; an empty body decodes from `null`.
    ///
    /// # Errors
    ///
    /// See [`Providers::body_bytes`]; decode failures are [`InputError::Decode`].
    pub fn body<T: DeserializeOwned>(&mut self) -> Result<T, InputError> {
        let bytes = self.body_bytes()?;
        let decoded = if is_blank(&bytes) {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_slice(&bytes)
        };
        decoded.map_err(|e| InputError::decode(InputSource::Body, e))
    }
}

fn take_shape(slot: &mut Slot<ShapeProvider<'_>>, origin: InputSource) -> Result<Shape, InputError> {
    let provider = slot.take(origin)?;
    let shape = provider()?;
    debug!(source = %origin, "Input source read");
    Ok(shape)
}

fn decode_shape<T: DeserializeOwned>(shape: Shape, origin: InputSource) -> Result<T, InputError> {
    shape.decode().map_err(|e| InputError::decode(origin, e))
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}
