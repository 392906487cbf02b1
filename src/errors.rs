//! Error taxonomy for registration, build and dispatch.
//!
//! - [`ConfigError`] is raised while the route table is being registered or built.
//!   It is a programmer error and is never recovered at runtime.
//! - [`RouterError`] escapes [`Kernel::send`](crate::app::Kernel::send) only when a
//!   routing miss has no fallback (no 404 callback, no 404 view).
//! - [`ContainerError`] is returned when a service lookup fails.
//! - [`HandlerError`] is what handlers and middleware return. Its [`Abort`] variant is a
//!   control-transfer signal converted exactly once at the top of `send`; the `Failed`
//!   variant degrades to a generic 500.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use http::Method;
use thiserror::Error;

use crate::dispatcher::HeaderVec;
use crate::view::ViewError;

/// Message used when an abort carries none.
pub const DEFAULT_ABORT_MESSAGE: &str = "Request processing was suspended.";

/// Errors surfaced while registering routes or freezing the application.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A declarative route definition lacks one of `path`, `method` or `handler`.
    #[error("route definition is missing `{0}`")]
    MissingField(&'static str),
    #[error("unsupported HTTP method `{0}`")]
    InvalidMethod(String),
    #[error("invalid path pattern `{path}`: {reason}")]
    InvalidPattern { path: String, reason: String },
    #[error("invalid constraint `{pattern}` for parameter `{param}` on `{path}`")]
    InvalidConstraint {
        path: String,
        param: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("unknown middleware `{name}` on route `{method} {path}`")]
    UnknownMiddleware {
        name: String,
        method: Method,
        path: String,
    },
    #[error("no handler bound to action `{action}` (route `{method} {path}`)")]
    UnknownAction {
        action: String,
        method: Method,
        path: String,
    },
    /// `rest()` was called without a usable controller name.
    #[error("REST resource `{0}` has no controller")]
    MissingController(String),
    #[error("configuration key `{0}` is not defined")]
    MissingKey(String),
    #[error("failed to load `{path}`: {message}")]
    Load { path: PathBuf, message: String },
}

/// Routing failures that the fallback ladder could not absorb.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("route `{method} {path}` does not exist")]
    NotFound { method: Method, path: String },
    #[error("failed to render 404 view `{view}`")]
    View {
        view: String,
        #[source]
        source: ViewError,
    },
}

/// Failures resolving a service from the [`Container`](crate::container::Container).
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("nothing is bound under `{0}`")]
    NotBound(String),
    #[error("binding `{name}` is not a `{expected}`")]
    TypeMismatch { name: String, expected: &'static str },
}

/// Explicit early termination requested by a handler or middleware.
///
/// Carried through ordinary `Result` returns; `Kernel::send` is the only place that turns
/// it into a response.
#[derive(Debug, Clone)]
pub struct Abort {
    pub status: u16,
    pub message: Option<String>,
    pub headers: HeaderVec,
}

impl Abort {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            message: None,
            headers: HeaderVec::new(),
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    /// The message to emit, falling back to [`DEFAULT_ABORT_MESSAGE`].
    #[must_use]
    pub fn message_or_default(&self) -> &str {
        match self.message.as_deref() {
            Some(m) if !m.is_empty() => m,
            _ => DEFAULT_ABORT_MESSAGE,
        }
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aborted with status {}: {}", self.status, self.message_or_default())
    }
}

impl std::error::Error for Abort {}

/// Error returned by handlers and middleware.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Abort(#[from] Abort),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Shorthand for `Err(Abort::new(status).into())`.
///
/// ```rust
/// use brrtapp::errors::{abort, HandlerError};
///
/// fn guarded(allowed: bool) -> Result<&'static str, HandlerError> {
///     if !allowed {
///         return abort(403);
///     }
///     Ok("welcome")
/// }
/// assert!(guarded(false).is_err());
/// ```
pub fn abort<T>(status: u16) -> Result<T, HandlerError> {
    Err(HandlerError::Abort(Abort::new(status)))
}
