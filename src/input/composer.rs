use super::providers::{InputError, InputSource, Providers};
use crate::shape::Shape;
use serde::de::DeserializeOwned;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

/// A set of [`InputSource`]s.
///
/// ```rust
/// use opsrouter::input::InputSources;
///
/// let sources = InputSources::PATH | InputSources::QUERY;
/// assert!(sources.contains(InputSources::PATH));
/// assert!(!sources.contains(InputSources::BODY));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputSources(u8);

impl InputSources {
    pub const NONE: InputSources = InputSources(0);
    pub const PATH: InputSources = InputSources(1);
    pub const QUERY: InputSources = InputSources(1 << 1);
    pub const HEADERS: InputSources = InputSources(1 << 2);
    pub const BODY: InputSources = InputSources(1 << 3);
    pub const ALL: InputSources = InputSources(0b1111);

    /// Sources in the order a composer reads and merges them.
    const ORDERED: [(InputSources, InputSource); 4] = [
        (InputSources::PATH, InputSource::Path),
        (InputSources::QUERY, InputSource::Query),
        (InputSources::HEADERS, InputSource::Headers),
        (InputSources::BODY, InputSource::Body),
    ];

    #[must_use]
    pub const fn contains(self, other: InputSources) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = InputSource> {
        Self::ORDERED
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, source)| source)
    }
}

impl BitOr for InputSources {
    type Output = InputSources;

    fn bitor(self, rhs: InputSources) -> InputSources {
        InputSources(self.0 | rhs.0)
    }
}

impl From<InputSource> for InputSources {
    fn from(source: InputSource) -> Self {
        match source {
            InputSource::Path => InputSources::PATH,
            InputSource::Query => InputSources::QUERY,
            InputSource::Headers => InputSources::HEADERS,
            InputSource::Body => InputSources::BODY,
        }
    }
}

impl fmt::Debug for InputSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Signature of a custom input composer.
pub type ComposeFn<T> = dyn Fn(&mut Providers<'_>) -> Result<T, InputError> + Send + Sync;

/// How an operation's input is assembled from the request
///
/// Chosen once at registration. The composer only invokes the providers for
/// the sources it needs; the others are never called.
pub enum InputComposer<T> {
    /// Decode from a fixed set of sources.
    ///
    /// `BODY` alone decodes the JSON body directly into `T`. Any other set
    /// reads each source as a [`Shape`] (path, query, headers, body in that
    /// order), merges them and decodes `T` from the merged shape. Path, query
    /// and body keys must be distinct; a key defined by two of them is a
    /// validation error. Headers only fill keys none of the other sources
    /// provide, so an ordinary header such as `Date` never clashes with a
    /// body field of the same name. The empty set decodes `T` from an empty
    /// shape.
    Sources(InputSources),
    /// Arbitrary composition over the providers.
    Custom(Arc<ComposeFn<T>>),
}

impl<T> Clone for InputComposer<T> {
    fn clone(&self) -> Self {
        match self {
            InputComposer::Sources(sources) => InputComposer::Sources(*sources),
            InputComposer::Custom(compose) => InputComposer::Custom(Arc::clone(compose)),
        }
    }
}

impl<T> fmt::Debug for InputComposer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputComposer::Sources(sources) => f.debug_tuple("Sources").field(sources).finish(),
            InputComposer::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl<T> Default for InputComposer<T> {
    fn default() -> Self {
        InputComposer::Sources(InputSources::BODY)
    }
}

impl<T> InputComposer<T> {
    /// The body-only composer.
    #[must_use]
    pub fn body() -> Self {
        InputComposer::Sources(InputSources::BODY)
    }

    #[must_use]
    pub fn sources(sources: InputSources) -> Self {
        InputComposer::Sources(sources)
    }

    pub fn custom<F>(compose: F) -> Self
    where
        F: Fn(&mut Providers<'_>) -> Result<T, InputError> + Send + Sync + 'static,
    {
        InputComposer::Custom(Arc::new(compose))
    }

    /// Sources the composer reads, when known up front.
    #[must_use]
    pub fn declared_sources(&self) -> Option<InputSources> {
        match self {
            InputComposer::Sources(sources) => Some(*sources),
            InputComposer::Custom(_) => None,
        }
    }
}

impl<T: DeserializeOwned> InputComposer<T> {
    /// Assemble the input from the providers.
    ///
    /// Stops at the first source that fails.
    ///
    /// # Errors
    ///
    /// Returns the first [`InputError`] from a provider, a merge conflict, or
    /// the final decode.
    pub fn compose(&self, providers: &mut Providers<'_>) -> Result<T, InputError> {
        let sources = match self {
            InputComposer::Custom(compose) => return compose(providers),
            InputComposer::Sources(sources) if *sources == InputSources::BODY => {
                return providers.body();
            }
            InputComposer::Sources(sources) => *sources,
        };

        let mut merged = Shape::empty();
        let mut headers = None;
        for source in sources.iter() {
            let part = match source {
                InputSource::Path => providers.path_shape()?,
                InputSource::Query => providers.query_shape()?,
                InputSource::Headers => {
                    headers = Some(providers.headers_shape()?);
                    continue;
                }
                InputSource::Body => providers.body_shape()?,
            };
            merged = merged
                .merge(part)
                .map_err(|e| InputError::decode(source, e))?;
        }
        if let Some(headers) = headers {
            merged = merged.fill_missing(headers);
        }
        Ok(merged.decode()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::borrow::Cow;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Merged {
        id: u32,
        verbose: bool,
        name: String,
    }

    fn providers() -> Providers<'static> {
        Providers::new()
            .with_path(|| Ok(Shape::from_pairs([("id", "7")])?))
            .with_query(|| Ok(Shape::from_pairs([("verbose", "true")])?))
            .with_headers(|| panic!("headers must not be read"))
            .with_body(|| Ok(Cow::Borrowed(&br#"{"name":"rex"}"#[..])))
    }

    #[test]
    fn merges_requested_sources_only() {
        let composer =
            InputComposer::<Merged>::sources(InputSources::PATH | InputSources::QUERY | InputSources::BODY);
        let merged = composer.compose(&mut providers()).unwrap();
        assert_eq!(
            merged,
            Merged {
                id: 7,
                verbose: true,
                name: "rex".into(),
            }
        );
    }

    #[test]
    fn duplicate_key_across_sources_is_validation_error() {
        let mut providers = Providers::new()
            .with_path(|| Ok(Shape::from_pairs([("id", "7")])?))
            .with_query(|| Ok(Shape::from_pairs([("id", "8")])?));
        let composer = InputComposer::<Merged>::sources(InputSources::PATH | InputSources::QUERY);
        let err = composer.compose(&mut providers).unwrap_err();
        assert!(err.is_validation());
        assert!(matches!(err, InputError::Decode { origin: InputSource::Query, .. }));
    }

    #[test]
    fn headers_never_conflict_with_other_sources() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Dated {
            id: u32,
            date: String,
            accept: String,
        }

        let mut providers = Providers::new()
            .with_path(|| Ok(Shape::from_pairs([("id", "7")])?))
            .with_headers(|| {
                Ok(Shape::from_pairs([
                    ("id", "99"),
                    ("date", "Tue, 15 Nov 1994 08:12:31 GMT"),
                    ("accept", "application/json"),
                ])?)
            })
            .with_body(|| Ok(Cow::Borrowed(&br#"{"date":"2020-01-01"}"#[..])));
        let composer = InputComposer::<Dated>::sources(
            InputSources::PATH | InputSources::HEADERS | InputSources::BODY,
        );

        assert_eq!(
            composer.compose(&mut providers).unwrap(),
            Dated {
                id: 7,
                date: "2020-01-01".into(),
                accept: "application/json".into(),
            }
        );
    }

    #[test]
    fn empty_source_set_decodes_unit() {
        let composer = InputComposer::<()>::sources(InputSources::NONE);
        composer.compose(&mut Providers::new()).unwrap();
    }

    #[test]
    fn custom_composer_reading_twice_is_internal() {
        let composer = InputComposer::<u32>::custom(|p| {
            let _: serde_json::Value = p.body()?;
            p.body()
        });
        let mut providers = Providers::new().with_body(|| Ok(Cow::Borrowed(&b"1"[..])));
        let err = composer.compose(&mut providers).unwrap_err();
        assert_eq!(err, InputError::SourceConsumed { origin: InputSource::Body });
        assert!(!err.is_validation());
    }

    #[test]
    fn sources_iterate_in_merge_order() {
        let all: Vec<InputSource> = InputSources::ALL.iter().collect();
        assert_eq!(
            all,
            vec![
                InputSource::Path,
                InputSource::Query,
                InputSource::Headers,
                InputSource::Body
            ]
        );
    }
}
