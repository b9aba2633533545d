//! Request and response types at the transport boundary.
//!
//! The transport loop itself lives outside this crate. It hands over one
//! [`RawRequest`] per request and writes back the [`OperationResponse`] it
//! receives; both convert to and from the `http` crate's types.

pub mod request;
pub mod response;

pub use request::{parse_query_params, HeaderVec, RawRequest, MAX_INLINE_HEADERS};
pub use response::{status_reason, OperationResponse};
