//! # Operation Module
//!
//! Binds an application operation to the request pipeline.
//!
//! An operation is a function from a typed input (and the shared application
//! context) to a typed output or a typed error. Registering one produces an
//! [`OperationHandler`] that owns:
//!
//! - the [`InputComposer`](crate::input::InputComposer) building the input,
//! - the [`OutputLocation`] deciding where a successful output goes, or a
//!   custom renderer set with [`OperationConfig::render_with`],
//! - the [`AllowedErrors`] table deciding which errors reach the client.
//!
//! ## Completion
//!
//! Operations report their result through a single-use [`Completion`]. The
//! token is consumed by [`Completion::complete`], so completing twice does
//! not compile. Whatever happens (a synchronous error, a panic, a token
//! dropped on some worker thread) the request receives exactly one response.
//!
//! ```rust
//! use opsrouter::dispatcher::Dispatcher;
//! use opsrouter::method::HttpMethod;
//! use opsrouter::operation::{Completion, OperationConfig, OperationError};
//! use opsrouter::server::RawRequest;
//! use serde::{Deserialize, Serialize};
//! use std::fmt;
//!
//! #[derive(Deserialize)]
//! struct Greet { name: String }
//! impl opsrouter::operation::Validate for Greet {}
//!
//! #[derive(Serialize)]
//! struct Greeting { message: String }
//! impl opsrouter::operation::Validate for Greeting {}
//!
//! #[derive(Debug)]
//! struct Rude;
//! impl fmt::Display for Rude {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("say please") }
//! }
//! impl OperationError for Rude {
//!     fn identity(&self) -> &str { "Rude" }
//! }
//!
//! let mut dispatcher = Dispatcher::new(());
//! dispatcher
//!     .register(
//!         "/greet",
//!         HttpMethod::Post,
//!         |input: Greet, _ctx: &(), done: Completion<Greeting, Rude>| {
//!             done.complete(Ok(Greeting { message: format!("hello {}", input.name) }));
//!             Ok(())
//!         },
//!         OperationConfig::new().allow("Rude", 400),
//!     )
//!     .unwrap();
//!
//! let request = RawRequest::new(HttpMethod::Post, "/greet")
//!     .with_json(&serde_json::json!({ "name": "ada" }));
//! let response = dispatcher.dispatch(&request);
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body.unwrap()["message"], "hello ada");
//! ```

mod completion;
mod config;
mod error;
mod handler;
mod validate;

pub use completion::{Completion, ResponseSink};
pub use config::{OperationConfig, OutputLocation, RenderFn};
pub use error::{
    AllowedError, AllowedErrors, DispatchError, OperationError, INTERNAL_ERROR,
    INVALID_OPERATION, VALIDATION_ERROR,
};
pub use handler::OperationHandler;
pub use validate::Validate;
