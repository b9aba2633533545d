use crate::input::InputError;
use crate::router::RoutingError;
use crate::server::OperationResponse;
use std::collections::HashMap;
use std::fmt;
use tracing::{error, info};

/// Wire code for a request whose input failed to decode or validate.
pub const VALIDATION_ERROR: &str = "ValidationError";
/// Wire code for a request no handler accepts.
pub const INVALID_OPERATION: &str = "InvalidOperation";
/// Wire code for any failure the client should not see details of.
pub const INTERNAL_ERROR: &str = "InternalError";

/// Error type an operation reports through.
///
/// `identity` names the error case and is looked up in the operation's
/// [`AllowedErrors`]; `Display` is the reason sent to the client when the
/// identity is allowed.
///
/// ```rust
/// use opsrouter::operation::OperationError;
/// use std::fmt;
///
/// #[derive(Debug)]
/// enum PetError {
///     NotFound(u64),
///     Storage(String),
/// }
///
/// impl fmt::Display for PetError {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         match self {
///             PetError::NotFound(id) => write!(f, "pet {id} does not exist"),
///             PetError::Storage(detail) => write!(f, "storage failure: {detail}"),
///         }
///     }
/// }
///
/// impl OperationError for PetError {
///     fn identity(&self) -> &str {
///         match self {
///             PetError::NotFound(_) => "NotFound",
///             PetError::Storage(_) => "Storage",
///         }
///     }
/// }
/// ```
pub trait OperationError: fmt::Display {
    fn identity(&self) -> &str;
}

impl OperationError for std::convert::Infallible {
    fn identity(&self) -> &str {
        match *self {}
    }
}

/// Wire code and status for one allowed error identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedError {
    pub code: String,
    pub status: u16,
}

/// Per-operation allow-list of error identities that may reach the client.
///
/// Anything not listed is reported as a generic `InternalError`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedErrors {
    entries: HashMap<String, AllowedError>,
}

impl AllowedErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `identity`, using the identity as the wire code.
    #[must_use]
    pub fn allow(self, identity: &str, status: u16) -> Self {
        self.allow_as(identity, identity, status)
    }

    /// Allow `identity` under a different wire code.
    #[must_use]
    pub fn allow_as(mut self, identity: &str, code: &str, status: u16) -> Self {
        self.entries.insert(
            identity.to_string(),
            AllowedError {
                code: code.to_string(),
                status,
            },
        );
        self
    }

    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&AllowedError> {
        self.entries.get(identity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map an operation error to the response taxonomy.
    #[must_use]
    pub fn classify<E: OperationError + ?Sized>(&self, error: &E) -> DispatchError {
        match self.get(error.identity()) {
            Some(allowed) => DispatchError::Allowed {
                code: allowed.code.clone(),
                status: allowed.status,
                reason: error.to_string(),
            },
            None => DispatchError::Internal {
                detail: format!("unlisted error '{}': {error}", error.identity()),
            },
        }
    }
}

/// Every way a request can end other than with the operation's output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// No handler for the URI and method (400).
    #[error("{reason}")]
    InvalidOperation { reason: String },
    /// Input failed to decode or validate (400).
    #[error("{reason}")]
    Validation { reason: String },
    /// The operation reported an error its allow-list maps to a wire code.
    #[error("{code}: {reason}")]
    Allowed {
        code: String,
        status: u16,
        reason: String,
    },
    /// Anything else (500). The detail is logged, never sent.
    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl DispatchError {
    /// Wire code placed in the `type` field of the error body.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            DispatchError::InvalidOperation { .. } => INVALID_OPERATION,
            DispatchError::Validation { .. } => VALIDATION_ERROR,
            DispatchError::Allowed { code, .. } => code,
            DispatchError::Internal { .. } => INTERNAL_ERROR,
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::InvalidOperation { .. } | DispatchError::Validation { .. } => 400,
            DispatchError::Allowed { status, .. } => *status,
            DispatchError::Internal { .. } => 500,
        }
    }

    /// Build the `{ "type", "reason" }` error response, logging internal detail.
    #[must_use]
    pub fn into_response(self) -> OperationResponse {
        match &self {
            DispatchError::Internal { detail } => {
                error!(code = INTERNAL_ERROR, detail = %detail, "Request failed with an internal error");
                OperationResponse::error(500, INTERNAL_ERROR, "internal error")
            }
            DispatchError::Allowed {
                code,
                status,
                reason,
            } => {
                info!(code = %code, status = *status, reason = %reason, "Operation returned an allowed error");
                OperationResponse::error(*status, code, reason)
            }
            DispatchError::InvalidOperation { reason } | DispatchError::Validation { reason } => {
                OperationResponse::error(self.status(), self.code(), reason)
            }
        }
    }
}

impl From<InputError> for DispatchError {
    fn from(err: InputError) -> Self {
        if err.is_validation() {
            DispatchError::Validation {
                reason: err.to_string(),
            }
        } else {
            DispatchError::Internal {
                detail: err.to_string(),
            }
        }
    }
}

impl From<RoutingError> for DispatchError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::InvalidOperation { reason } => DispatchError::InvalidOperation { reason },
        }
    }
}
