//! # opsrouter
//!
//! **opsrouter** is the request-dispatch core of an HTTP operation framework. Given a decoded
//! request (method, URI, headers, body) it selects the single registered operation that should
//! handle it, composes that operation's strongly-typed input from the request sources it
//! declares, runs it, and turns the outcome into exactly one response.
//!
//! The transport loop is not part of the crate: a server hands each request to
//! [`dispatcher::Dispatcher`] and receives an [`server::OperationResponse`] on a
//! `may::sync::mpsc` channel (or blocks on [`dispatcher::Dispatcher::dispatch`]).
//!
//! ## Architecture
//!
//! - **[`method`]** - Bidirectional table between method tags and wire strings
//! - **[`router`]** - Exact and templated URI matching (`/pets/{id}`, `/files/{path+}`)
//! - **[`shape`]** - Decoded path/query/header variables and their serde deserializer
//! - **[`input`]** - Lazy single-use input providers and the input composers
//! - **[`operation`]** - Operation binding, completion tokens, output and error mapping
//! - **[`dispatcher`]** - Per-request flow from routing to response
//! - **[`server`]** - Request and response types with `http` crate conversions
//! - **[`runtime_config`]** / **[`logging`]** - Environment-driven configuration and tracing
//!
//! ## Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant D as Dispatcher
//!     participant R as HandlerTable
//!     participant H as OperationHandler
//!     participant O as Operation
//!
//!     T->>D: handle(request, reply_tx)
//!     D->>R: resolve(uri, method)
//!     R-->>D: RouteMatch (handler, path shape)
//!     D->>H: invoke(request, path shape)
//!     H->>H: compose + validate input
//!     H->>O: operation(input, ctx, completion)
//!     O-->>H: completion.complete(result)
//!     H-->>T: OperationResponse on reply_tx
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use opsrouter::dispatcher::Dispatcher;
//! use opsrouter::input::InputSources;
//! use opsrouter::method::HttpMethod;
//! use opsrouter::operation::{OperationConfig, Validate};
//! use opsrouter::server::RawRequest;
//! use serde::{Deserialize, Serialize};
//! use std::convert::Infallible;
//!
//! #[derive(Deserialize)]
//! struct GetPet {
//!     id: u64,
//!     verbose: Option<bool>,
//! }
//! impl Validate for GetPet {}
//!
//! #[derive(Serialize)]
//! struct Pet {
//!     id: u64,
//!     name: &'static str,
//! }
//! impl Validate for Pet {}
//!
//! let mut dispatcher = Dispatcher::new(());
//! dispatcher
//!     .register_sync(
//!         "/pets/{id}",
//!         HttpMethod::Get,
//!         |input: GetPet, _ctx: &()| Ok::<_, Infallible>(Pet { id: input.id, name: "Rex" }),
//!         OperationConfig::new().input_sources(InputSources::PATH | InputSources::QUERY),
//!     )
//!     .unwrap();
//!
//! let response = dispatcher.dispatch(&RawRequest::new(HttpMethod::Get, "/pets/42?verbose=true"));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body.unwrap()["id"], 42);
//! ```
//!
//! ## Error Responses
//!
//! Every failure is translated into a JSON body `{"type": <code>, "reason": <text>}`:
//!
//! | Code               | Status | Cause                                         |
//! |--------------------|--------|-----------------------------------------------|
//! | `InvalidOperation` | 400    | no operation for the URI and method           |
//! | `ValidationError`  | 400    | input failed to decode or validate            |
//! | allowed error code | mapped | the operation failed with an allowed error    |
//! | `InternalError`    | 500    | anything else; detail is logged, not returned |
//!
//! ## Configuration
//!
//! See [`runtime_config`] (`OPSR_SLOW_ROUTE_US`, `OPSR_REQUEST_ID_HEADER`) and [`logging`]
//! (`OPSR_LOG_*`).

pub mod dispatcher;
pub mod ids;
pub mod input;
pub mod logging;
pub mod method;
pub mod operation;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod shape;

pub use dispatcher::Dispatcher;
pub use method::HttpMethod;
pub use operation::{Completion, OperationConfig, OperationError, OutputLocation, Validate};
pub use server::{OperationResponse, RawRequest};
