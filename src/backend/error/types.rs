/**
 * Backend Error Types
 *
 * The handler-facing error type. Wraps `CoreError` (so `?` works from any
 * service call) and adds the one concern the domain layer does not know
 * about: failed authentication.
 *
 * # Status Code Mapping
 *
 * | Variant                                | Status |
 * |----------------------------------------|--------|
 * | `Core(NotFound)`                       | 404    |
 * | `Core(Forbidden)`                      | 403    |
 * | `Core(InvalidTransition)` status pair  | 409    |
 * | `Core(InvalidTransition)` companion    | 400    |
 * | `Core(Constraint)`                     | 400    |
 * | `Core(Upstream))` / `Core(Database)`   | 500    |
 * | `Unauthorized`                         | 401    |
 *
 * Server-side failures (500) never leak their message to the client; the
 * detail goes to the log instead.
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::shared::error::{codes, CoreError};

/// Result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Handler-level error.
///
/// # Usage
///
/// ```rust
/// use fixdesk::backend::error::ApiError;
/// use fixdesk::shared::error::CoreError;
///
/// let err: ApiError = CoreError::not_found("ticket").into();
/// assert_eq!(err.status_code().as_u16(), 404);
/// ```
#[derive(Debug, Error)]
pub enum ApiError {
    /// A domain error from the service layer
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Missing or invalid credentials
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Human-readable error message
        message: String,
    },
}

impl ApiError {
    /// Create a new unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Core(core) => match core {
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::Forbidden { .. } => StatusCode::FORBIDDEN,
                // A disallowed status pair is a conflict with the current
                // state; a missing companion field is a bad request.
                CoreError::InvalidTransition { code, .. } => {
                    if *code == codes::STATUS_NOT_ALLOWED {
                        StatusCode::CONFLICT
                    } else {
                        StatusCode::BAD_REQUEST
                    }
                }
                CoreError::Constraint { .. } => StatusCode::BAD_REQUEST,
                CoreError::Upstream { .. } | CoreError::Database(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Get the client-facing error message. Internal failures are redacted.
    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized { message } => message.clone(),
            Self::Core(CoreError::Database(_)) | Self::Core(CoreError::Upstream { .. }) => {
                "internal server error".to_string()
            }
            Self::Core(core) => core.to_string(),
        }
    }

    /// The machine-readable reason code, when the wrapped error carries one
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Core(core) => core.code(),
            Self::Unauthorized { .. } => None,
        }
    }
}
