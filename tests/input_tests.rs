//! Input composition tests
//!
//! Providers that panic when called prove which sources a composer reads.

use opsrouter::input::{InputComposer, InputError, InputSource, InputSources, Providers};
use opsrouter::shape::Shape;
use serde::Deserialize;
use std::borrow::Cow;
use std::cell::Cell;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct BodyOnly {
    the_id: String,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct TokenQueryHeader {
    the_token: String,
    the_parameter: String,
    the_header: String,
    the_id: String,
}

fn panicking_providers<'a>() -> Providers<'a> {
    Providers::new()
        .with_query(|| panic!("query provider must not be invoked"))
        .with_path(|| panic!("path provider must not be invoked"))
        .with_headers(|| panic!("headers provider must not be invoked"))
}

#[test]
fn test_body_only_composer_never_calls_other_providers() {
    let mut providers =
        panicking_providers().with_body(|| Ok(Cow::Borrowed(&br#"{"theId":"123456789012"}"#[..])));

    let input: BodyOnly = InputComposer::body().compose(&mut providers).unwrap();

    assert_eq!(input.the_id, "123456789012");
}

#[test]
fn test_empty_source_set_calls_no_provider() {
    #[derive(Debug, Deserialize, PartialEq, Default)]
    struct Nothing {
        #[serde(default)]
        page: Option<u32>,
    }

    let mut providers =
        panicking_providers().with_body(|| panic!("body provider must not be invoked"));

    let input: Nothing = InputComposer::sources(InputSources::NONE)
        .compose(&mut providers)
        .unwrap();

    assert_eq!(input, Nothing::default());
}

#[test]
fn test_all_sources_merge_into_one_input() {
    let mut providers = Providers::new()
        .with_path(|| Ok(Shape::from_pairs([("theToken", "suchToken")])?))
        .with_query(|| Ok(Shape::from_pairs([("theParameter", "muchParameter")])?))
        .with_headers(|| Ok(Shape::from_pairs([("theheader", "headerValue")])?))
        .with_body(|| Ok(Cow::Borrowed(&br#"{"theId":"123456789012"}"#[..])));

    let input: TokenQueryHeader = InputComposer::sources(InputSources::ALL)
        .compose(&mut providers)
        .unwrap();

    assert_eq!(
        input,
        TokenQueryHeader {
            the_token: "suchToken".into(),
            the_parameter: "muchParameter".into(),
            the_header: "headerValue".into(),
            the_id: "123456789012".into(),
        }
    );
}

#[test]
fn test_unrequested_sources_are_not_invoked() {
    #[derive(Debug, Deserialize)]
    struct PathAndQuery {
        id: u64,
        verbose: bool,
    }

    let mut providers = Providers::new()
        .with_path(|| Ok(Shape::from_pairs([("id", "42")])?))
        .with_query(|| Ok(Shape::from_pairs([("verbose", "true")])?))
        .with_headers(|| panic!("headers provider must not be invoked"))
        .with_body(|| panic!("body provider must not be invoked"));

    let input: PathAndQuery = InputComposer::sources(InputSources::PATH | InputSources::QUERY)
        .compose(&mut providers)
        .unwrap();

    assert_eq!(input.id, 42);
    assert!(input.verbose);
}

#[test]
fn test_first_failure_short_circuits() {
    let query_calls = Cell::new(0);
    let mut providers = Providers::new()
        .with_path(|| Err(InputError::decode(InputSource::Path, "bad path")))
        .with_query(|| {
            query_calls.set(query_calls.get() + 1);
            Ok(Shape::empty())
        });

    let err = InputComposer::<serde_json::Value>::sources(InputSources::PATH | InputSources::QUERY)
        .compose(&mut providers)
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(query_calls.get(), 0);
}

#[test]
fn test_conflicting_sources_are_validation_errors() {
    let mut providers = Providers::new()
        .with_path(|| Ok(Shape::from_pairs([("id", "1")])?))
        .with_query(|| Ok(Shape::from_pairs([("id", "2")])?));

    let err = InputComposer::<serde_json::Value>::sources(InputSources::PATH | InputSources::QUERY)
        .compose(&mut providers)
        .unwrap_err();

    assert!(matches!(
        err,
        InputError::Decode {
            origin: InputSource::Query,
            ..
        }
    ));
    assert!(err.is_validation());
}

#[test]
fn test_custom_composer_reads_sources_sequentially() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Custom {
        id: u64,
        body_len: usize,
    }

    #[derive(Deserialize)]
    struct Id {
        id: u64,
    }

    let composer = InputComposer::custom(|providers: &mut Providers<'_>| {
        let Id { id } = providers.path()?;
        let body_len = providers.body_bytes()?.len();
        Ok(Custom { id, body_len })
    });

    let mut providers = panicking_providers()
        .with_path(|| Ok(Shape::from_pairs([("id", "7")])?))
        .with_body(|| Ok(Cow::Owned(b"abc".to_vec())));

    assert_eq!(
        composer.compose(&mut providers).unwrap(),
        Custom { id: 7, body_len: 3 }
    );
    assert_eq!(composer.declared_sources(), None);
}

#[test]
fn test_providers_are_single_use() {
    let mut providers = Providers::new().with_query(|| Ok(Shape::from_pairs([("a", "1")])?));

    assert!(providers.query_shape().is_ok());
    assert_eq!(
        providers.query_shape().unwrap_err(),
        InputError::SourceConsumed {
            origin: InputSource::Query
        }
    );
    assert_eq!(
        providers.headers_shape().unwrap_err(),
        InputError::SourceUnavailable {
            origin: InputSource::Headers
        }
    );
    assert!(!InputError::SourceConsumed {
        origin: InputSource::Query
    }
    .is_validation());
}

#[test]
fn test_declared_sources() {
    assert_eq!(
        InputComposer::<()>::body().declared_sources(),
        Some(InputSources::BODY)
    );
    let both = InputSources::PATH | InputSources::HEADERS;
    assert_eq!(
        InputComposer::<()>::sources(both).declared_sources(),
        Some(both)
    );
    assert!(both.contains(InputSources::PATH));
    assert!(!both.contains(InputSources::QUERY));
}
