//! Dispatcher core module - hot path for request dispatch.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::unnecessary_to_owned)]

use crate::container::Container;
use crate::ids::RequestId;
use crate::router::{normalize_path, CompiledRoute, ParamVec, RouteTable};
use crate::server::ParsedRequest;
use crate::errors::HandlerError;
use http::Method;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path
///
/// Header names use `Arc<str>` because they are mostly repeated constants
/// (Content-Type, X-Powered-By, ...); values remain `String`.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Request data passed to a matched route's middleware and handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// Effective HTTP method (after any `_method` override)
    pub method: Method,
    /// Request path as received
    pub path: String,
    /// Name of the handler that will process this request
    pub handler_name: Arc<str>,
    /// Pattern of the matched route
    pub route_pattern: String,
    /// Path parameters extracted from the URL (stack-allocated for ≤8 params)
    pub path_params: ParamVec,
    /// The inbound request; middleware may rewrite its inputs
    pub request: ParsedRequest,
    /// Services bound on the application container
    pub services: Arc<Container>,
}

impl HandlerRequest {
    /// Get a path parameter by name (last write wins on duplicate names)
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Generic input lookup (form fields, JSON body members, query string)
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.request.field(name)
    }

    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.request.query_params.get(name).map(String::as_str)
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.request.cookie(name)
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.request.body.as_ref()
    }
}

/// Body of a response before emission.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    /// Emitted verbatim
    Text(String),
    /// Serialized to JSON text on emission
    Json(Value),
}

/// Structured response: status, headers and body, flushed as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    pub body: Body,
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self::new(200, HeaderVec::new(), Body::Empty)
    }
}

impl HandlerResponse {
    /// Create a new response with the given status, headers, and body
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Body) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self::new(status, headers, Body::Json(body))
    }

    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "text/plain; charset=UTF-8".to_string()));
        Self::new(status, headers, Body::Text(body.into()))
    }

    #[must_use]
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "text/html; charset=UTF-8".to_string()));
        Self::new(status, headers, Body::Text(body.into()))
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value.into());
        self
    }
}

/// What a handler produced: a structured response, or a raw body for the generic send.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Response(HandlerResponse),
    Body(Body),
}

impl From<HandlerResponse> for Reply {
    fn from(r: HandlerResponse) -> Self {
        Reply::Response(r)
    }
}

impl From<Body> for Reply {
    fn from(b: Body) -> Self {
        Reply::Body(b)
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Body(Body::Text(s))
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Body(Body::Text(s.to_string()))
    }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Reply::Body(Body::Empty),
            Value::String(s) => Reply::Body(Body::Text(s)),
            other => Reply::Body(Body::Json(other)),
        }
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Body(Body::Empty)
    }
}

/// A route handler.
///
/// Implement this for controller-style structs; closures go through [`handler`].
pub trait Handler: Send + Sync {
    fn call(&self, req: &HandlerRequest) -> Result<Reply, HandlerError>;
}

struct FnHandler<F>(F);

impl<F, R> Handler for FnHandler<F>
where
    F: Fn(&HandlerRequest) -> Result<R, HandlerError> + Send + Sync,
    R: Into<Reply>,
{
    fn call(&self, req: &HandlerRequest) -> Result<Reply, HandlerError> {
        (self.0)(req).map(Into::into)
    }
}

/// Wrap a closure as a handler reference.
///
/// ```rust
/// use brrtapp::dispatcher::handler;
///
/// let h = handler(|req| Ok(format!("hello {}", req.get_path_param("name").unwrap_or("you"))));
/// assert_eq!(h.label(), "closure");
/// ```
pub fn handler<F, R>(f: F) -> HandlerRef
where
    F: Fn(&HandlerRequest) -> Result<R, HandlerError> + Send + Sync + 'static,
    R: Into<Reply> + 'static,
{
    HandlerRef::Direct(Arc::new(FnHandler(f)))
}

/// How a route names its handler at registration time.
#[derive(Clone)]
pub enum HandlerRef {
    /// A handler instance
    Direct(Arc<dyn Handler>),
    /// A `Controller@action` descriptor resolved against bound actions at build time
    Action(String),
}

impl HandlerRef {
    /// Printable name: the action descriptor, or `closure`.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            HandlerRef::Direct(_) => "closure",
            HandlerRef::Action(name) => name.as_str(),
        }
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandlerRef({})", self.label())
    }
}

impl From<&str> for HandlerRef {
    fn from(s: &str) -> Self {
        HandlerRef::Action(s.to_string())
    }
}

impl From<String> for HandlerRef {
    fn from(s: String) -> Self {
        HandlerRef::Action(s)
    }
}

impl From<Arc<dyn Handler>> for HandlerRef {
    fn from(h: Arc<dyn Handler>) -> Self {
        HandlerRef::Direct(h)
    }
}

impl<'de> Deserialize<'de> for HandlerRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(HandlerRef::Action)
    }
}

/// Per-request transient dispatch state.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub request_id: RequestId,
    /// Method as sent by the client
    pub declared_method: Method,
    /// Method used for the table lookup
    pub effective_method: Method,
    /// True when `effective_method` came from a `_method` override
    pub via_override: bool,
    /// Request path as received
    pub path: String,
    pub matched: Option<Arc<CompiledRoute>>,
}

impl DispatchContext {
    /// Resolve the effective method from the current request.
    #[must_use]
    pub fn resolve(request_id: RequestId, request: &ParsedRequest) -> Self {
        let (effective_method, via_override) = match request.method_override() {
            Some(m) => (m, true),
            None => (request.method.clone(), false),
        };
        Self {
            request_id,
            declared_method: request.method.clone(),
            effective_method,
            via_override,
            path: request.path.clone(),
            matched: None,
        }
    }
}

/// Result of route resolution for one request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The handler ran and produced a reply
    Handled(Reply),
    /// A middleware answered; the handler was not invoked
    ShortCircuit(HandlerResponse),
    /// No routes at all for the effective method
    NoRoutesForMethod,
    /// Routes exist for the method but none matched the path
    NoMatch,
}

/// Resolves exactly one route per request and runs its middleware chain and handler.
#[derive(Clone, Default)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(table: RouteTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Resolve and run the route for `request`.
    ///
    /// Single attempt: the first structurally matching route wins and no other route
    /// is tried afterwards, whatever its middleware or handler return.
    ///
    /// A `_method` override only applies when a route answers it for this path;
    /// otherwise the request is dispatched under its declared POST.
    pub fn dispatch(
        &self,
        ctx: &mut DispatchContext,
        request: ParsedRequest,
        services: &Arc<Container>,
    ) -> Result<DispatchOutcome, HandlerError> {
        let mut override_match = None;
        if ctx.via_override {
            override_match =
                self.table
                    .route(&ctx.effective_method, normalize_path(&ctx.path), true);
            if override_match.is_none() {
                debug!(
                    request_id = %ctx.request_id,
                    requested = %ctx.effective_method,
                    path = %ctx.path,
                    "No route answers the method override, dispatching as declared"
                );
                ctx.effective_method = ctx.declared_method.clone();
                ctx.via_override = false;
            }
        }

        let route_match = match override_match {
            Some(m) => m,
            None => {
                if !self.table.has_routes(&ctx.effective_method, ctx.via_override) {
                    warn!(
                        request_id = %ctx.request_id,
                        method = %ctx.effective_method,
                        path = %ctx.path,
                        "No routes registered for method"
                    );
                    return Ok(DispatchOutcome::NoRoutesForMethod);
                }
                let Some(m) = self.table.route(
                    &ctx.effective_method,
                    normalize_path(&ctx.path),
                    ctx.via_override,
                ) else {
                    return Ok(DispatchOutcome::NoMatch);
                };
                m
            }
        };

        let route = Arc::clone(&route_match.route);
        ctx.matched = Some(Arc::clone(&route));

        let mut req = HandlerRequest {
            request_id: ctx.request_id,
            method: ctx.effective_method.clone(),
            path: ctx.path.clone(),
            handler_name: Arc::clone(&route.handler_name),
            route_pattern: route.path.clone(),
            path_params: route_match.path_params,
            request,
            services: Arc::clone(services),
        };

        // Middleware hooks and the handler unwind as one unit.
        match catch_unwind(AssertUnwindSafe(|| run_chain(&route, &mut req))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    request_id = %ctx.request_id,
                    handler_name = %route.handler_name,
                    panic_message = %message,
                    "Route panicked"
                );
                Err(HandlerError::Failed(anyhow::anyhow!(
                    "route `{}` panicked: {message}",
                    route.path
                )))
            }
        }
    }
}

/// Before hooks in attachment order, the handler, then after hooks in reverse.
fn run_chain(
    route: &CompiledRoute,
    req: &mut HandlerRequest,
) -> Result<DispatchOutcome, HandlerError> {
    for (name, mw) in route.middleware_names.iter().zip(&route.middleware) {
        if let Some(resp) = mw.before(req)? {
            info!(
                request_id = %req.request_id,
                middleware = %name,
                handler_name = %route.handler_name,
                status = resp.status,
                "Middleware short-circuited request"
            );
            return Ok(DispatchOutcome::ShortCircuit(resp));
        }
    }

    debug!(
        request_id = %req.request_id,
        handler_name = %route.handler_name,
        path_params = ?req.path_params,
        "Handler execution start"
    );
    let execution_start = Instant::now();
    let mut reply = route.handler.call(req)?;
    let latency = execution_start.elapsed();

    for mw in route.middleware.iter().rev() {
        mw.after(req, &mut reply, latency);
    }

    info!(
        request_id = %req.request_id,
        handler_name = %route.handler_name,
        execution_time_ms = latency.as_millis() as u64,
        "Handler execution complete"
    );
    Ok(DispatchOutcome::Handled(reply))
}
