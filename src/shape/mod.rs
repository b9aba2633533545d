//! # Shape Module
//!
//! A `Shape` is the intermediate form of request variables that arrive as plain
//! strings: path variables captured by a template, query parameters, and
//! headers. Variables are folded into a tree before they are deserialized into
//! the operation's typed input.
//!
//! ## Key folding
//!
//! - Keys are split on `.` into nested maps: `filter.name=x` becomes
//!   `{ "filter": { "name": "x" } }`.
//! - A key that appears more than once becomes a list, in arrival order. This is
//!   how a trailing multi-variable path capture (`/files/{path+}`) or a repeated
//!   query parameter (`?tag=a&tag=b`) reaches a `Vec<String>` field.
//! - A key used both as a leaf and as a parent (`a=1&a.b=2`) is a conflict.
//!
//! ## Typed decode
//!
//! `Shape` implements `serde::Deserializer`. Leaves are strings, so numeric and
//! boolean fields are parsed on demand, a single string decodes as a
//! one-element sequence, and struct fields are matched by exact name first and
//! then ASCII-case-insensitively (header names are case-insensitive on the wire).
//!
//! ```rust
//! use opsrouter::shape::Shape;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Query {
//!     limit: u32,
//!     tag: Vec<String>,
//! }
//!
//! let shape = Shape::from_pairs([("limit", "10"), ("tag", "a"), ("tag", "b")]).unwrap();
//! let query: Query = shape.decode().unwrap();
//! assert_eq!(query.limit, 10);
//! assert_eq!(query.tag, vec!["a", "b"]);
//! ```

mod core;
mod de;

pub use core::{Shape, ShapeError, KEY_SEPARATOR};
