//! # Router Module
//!
//! Selects the single registered handler for an incoming `(uri, method)` and
//! extracts the path variables the handler's input may need.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Parsing URI patterns into [`PathTemplate`]s at registration
//! - Routing exact URIs through a case-insensitive O(1) table
//! - Matching templated URIs in registration order
//! - Folding captured variables into a path [`Shape`](crate::shape::Shape)
//!
//! ## Matching rules
//!
//! 1. The query string and fragment are ignored.
//! 2. The exact table is consulted first with the lower-cased URI, trimmed of
//!    leading and trailing `/`. A pattern with no variables and at most one
//!    segment always lives here.
//! 3. Templated entries are tried in the order they were registered. Literal
//!    segments compare case-sensitively; variables capture the raw segment.
//!    A trailing `{name+}` captures every remaining segment.
//! 4. If a template matches but its variables cannot be folded into a shape,
//!    the next template is tried.
//! 5. Nothing matched: [`RoutingError::InvalidOperation`].
//!
//! ## Example
//!
//! ```rust
//! use opsrouter::method::HttpMethod;
//! use opsrouter::router::HandlerTable;
//!
//! let mut table = HandlerTable::new();
//! table.register(HttpMethod::Get, "/files/{bucket}/{key+}", "read_file").unwrap();
//!
//! let m = table.resolve("/files/assets/img/logo.png", &HttpMethod::Get).unwrap();
//! assert_eq!(m.get_variable("bucket"), Some("assets"));
//! assert_eq!(m.variables.get_all("key"), vec!["img", "logo.png"]);
//! assert!(table.resolve("/files/assets/x", &HttpMethod::Post).is_err());
//! ```

mod core;
mod template;

pub use core::{HandlerTable, RouteMatch, RoutingError};
pub use template::{
    split_path, ExtractedVariables, ParamVec, PathTemplate, Segment, TemplateError,
    MAX_INLINE_VARIABLES,
};
