//! # Input Module
//!
//! Assembles an operation's typed input from the parts of a request it
//! declares it needs.
//!
//! A request offers four sources: path variables captured during routing,
//! query parameters, headers and the body. Each is exposed through a
//! single-use, lazily-invoked provider ([`Providers`]). An [`InputComposer`]
//! chosen at registration decides which providers to call and how to combine
//! their results, so an operation that only reads its body never pays for
//! parsing the query string or headers.
//!
//! Failures split in two:
//!
//! - request data that does not decode ([`InputError::Decode`],
//!   [`InputError::Shape`]) is the client's fault and becomes a
//!   `ValidationError` (400);
//! - asking a provider twice or asking for an unbound one is a composer bug
//!   and becomes an `InternalError` (500).

mod composer;
mod providers;

pub use composer::{ComposeFn, InputComposer, InputSources};
pub use providers::{InputError, InputSource, Providers};
