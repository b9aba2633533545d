//! # Dispatcher Module
//!
//! Ties the routing table, the application context and the per-request flow
//! together.
//!
//! ## Request Flow
//!
//! 1. A request id is taken from the request id header (when it is a valid
//!    ULID) or generated, and a tracing span is opened for the request
//! 2. The [`HandlerTable`](crate::router::HandlerTable) selects the operation
//!    and captures path variables
//! 3. The operation's composer builds its typed input from the request
//! 4. The operation runs with the input, the context and a completion token
//! 5. The single response is sent on the reply channel with the request id
//!    header set
//!
//! ## Error Handling
//!
//! - No matching route: 400 `InvalidOperation`
//! - Input that does not decode or validate: 400 `ValidationError`
//! - Errors in the operation's allow-list: mapped code and status
//! - Anything else, including panics and dropped completions: 500 `InternalError`
//!
//! ## Reply channel
//!
//! Responses travel over `may::sync::mpsc`, which works from coroutines and
//! plain threads alike. [`Dispatcher::handle`] never blocks on the
//! operation; [`Dispatcher::dispatch`] waits for the response.

mod core;

pub use core::Dispatcher;
