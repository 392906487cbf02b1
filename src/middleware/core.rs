use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{CsrfMiddleware, TrimMiddleware};
use crate::config::CsrfConfig;
use crate::dispatcher::{HandlerRequest, HandlerResponse, Reply};
use crate::errors::HandlerError;

/// Name of the built-in input-normalization middleware.
pub const TRIM: &str = "trim";
/// Name of the built-in request-forgery protection middleware.
pub const CSRF: &str = "csrf";

/// Per-route request processing.
///
/// `before` runs in attachment order ahead of the handler. Returning `Ok(Some(resp))`
/// answers the request and skips the handler and every later middleware; an `Err`
/// propagates like a handler error (an `Abort` reaches the kernel unchanged).
/// `after` runs in reverse order once the handler has produced a reply.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &mut HandlerRequest) -> Result<Option<HandlerResponse>, HandlerError> {
        Ok(None)
    }
    fn after(&self, _req: &HandlerRequest, _reply: &mut Reply, _latency: Duration) {}
}

struct FnMiddleware<F>(F);

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut HandlerRequest) -> Result<Option<HandlerResponse>, HandlerError> + Send + Sync,
{
    fn before(&self, req: &mut HandlerRequest) -> Result<Option<HandlerResponse>, HandlerError> {
        (self.0)(req)
    }
}

/// A middleware as attached at registration time.
///
/// Instances and closures are usable immediately; names are resolved by the
/// [`MiddlewareRegistry`] when the application is built.
#[derive(Clone)]
pub enum MiddlewareRef {
    Instance {
        name: Arc<str>,
        middleware: Arc<dyn Middleware>,
    },
    Named(String),
}

impl MiddlewareRef {
    #[must_use]
    pub fn instance(name: &str, middleware: impl Middleware + 'static) -> Self {
        MiddlewareRef::Instance {
            name: Arc::from(name),
            middleware: Arc::new(middleware),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            MiddlewareRef::Instance { name, .. } => name.as_ref(),
            MiddlewareRef::Named(name) => name.as_str(),
        }
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewareRef::Instance { name, .. } => write!(f, "Instance({name})"),
            MiddlewareRef::Named(name) => write!(f, "Named({name})"),
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(s: &str) -> Self {
        MiddlewareRef::Named(s.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(s: String) -> Self {
        MiddlewareRef::Named(s)
    }
}

impl<'de> Deserialize<'de> for MiddlewareRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(MiddlewareRef::Named)
    }
}

/// Wrap a closure as a named middleware.
///
/// ```rust
/// use brrtapp::dispatcher::HandlerResponse;
/// use brrtapp::middleware::from_fn;
///
/// let maintenance = from_fn("maintenance", |req| {
///     if req.get_header("x-maintenance").is_some() {
///         return Ok(Some(HandlerResponse::text(503, "later")));
///     }
///     Ok(None)
/// });
/// assert_eq!(maintenance.label(), "maintenance");
/// ```
pub fn from_fn<F>(name: &str, f: F) -> MiddlewareRef
where
    F: Fn(&mut HandlerRequest) -> Result<Option<HandlerResponse>, HandlerError>
        + Send
        + Sync
        + 'static,
{
    MiddlewareRef::Instance {
        name: Arc::from(name),
        middleware: Arc::new(FnMiddleware(f)),
    }
}

/// Name → middleware bindings used to resolve [`MiddlewareRef::Named`] entries.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    entries: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `trim` and `csrf`.
    #[must_use]
    pub fn with_builtins(csrf: &CsrfConfig) -> Self {
        let mut registry = Self::new();
        registry.register(TRIM, Arc::new(TrimMiddleware));
        registry.register(CSRF, Arc::new(CsrfMiddleware::new(csrf.clone())));
        registry
    }

    /// Bind `name`, replacing any previous binding.
    pub fn register(&mut self, name: &str, middleware: Arc<dyn Middleware>) {
        self.entries.insert(name.to_string(), middleware);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Middleware>> {
        self.entries.get(name).map(Arc::clone)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Adapt any reference to the single middleware interface.
    #[must_use]
    pub fn resolve(&self, r: &MiddlewareRef) -> Option<(Arc<str>, Arc<dyn Middleware>)> {
        match r {
            MiddlewareRef::Instance { name, middleware } => {
                Some((Arc::clone(name), Arc::clone(middleware)))
            }
            MiddlewareRef::Named(name) => self.get(name).map(|m| (Arc::from(name.as_str()), m)),
        }
    }
}
