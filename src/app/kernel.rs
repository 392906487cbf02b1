//! The frozen application: one `send` entry point per inbound request.

use arc_swap::ArcSwap;
use http::Method;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};

use crate::config::{AppConfig, ConfigAccess};
use crate::container::Container;
use crate::dispatcher::{DispatchContext, DispatchOutcome, Dispatcher, HandlerResponse, Reply};
use crate::errors::{Abort, HandlerError, RouterError};
use crate::ids::RequestId;
use crate::router::RouteTable;
use crate::server::{finalize, Emitted, ParsedRequest};
use crate::view::{ViewError, ViewRenderer};

pub const X_POWERED_BY: &str = "X-Powered-By";
const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// What an error-code callback sees about the request it answers.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub status: u16,
    pub request_id: RequestId,
    /// Effective method (after any `_method` override)
    pub method: Method,
    pub path: String,
    /// Abort message, when the callback answers an abort
    pub message: Option<String>,
}

pub(crate) type ErrorCallback = Arc<dyn Fn(&ErrorContext) -> Reply + Send + Sync>;

/// How the process was invoked.
#[derive(Debug)]
pub enum Invocation {
    /// Command-line execution: nothing is dispatched or emitted.
    Cli,
    Http(ParsedRequest),
}

#[derive(Debug)]
pub enum Sent {
    Noop,
    Emitted(Emitted),
}

impl Sent {
    #[must_use]
    pub fn emitted(&self) -> Option<&Emitted> {
        match self {
            Sent::Emitted(e) => Some(e),
            Sent::Noop => None,
        }
    }

    #[must_use]
    pub fn into_emitted(self) -> Option<Emitted> {
        match self {
            Sent::Emitted(e) => Some(e),
            Sent::Noop => None,
        }
    }
}

/// Immutable, shareable result of [`Application::build`](super::Application::build).
///
/// `Send + Sync`; wrap in an `Arc` (or a [`SharedKernel`] for hot swaps) to serve
/// requests from many threads.
pub struct Kernel {
    config: AppConfig,
    dispatcher: Dispatcher,
    error_callbacks: HashMap<u16, ErrorCallback>,
    container: Arc<Container>,
    views: Option<Arc<dyn ViewRenderer>>,
    x_powered_by: bool,
}

impl Kernel {
    pub(crate) fn new(
        config: AppConfig,
        table: RouteTable,
        error_callbacks: HashMap<u16, ErrorCallback>,
        container: Arc<Container>,
        views: Option<Arc<dyn ViewRenderer>>,
        x_powered_by: bool,
    ) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(table),
            error_callbacks,
            container,
            views,
            x_powered_by,
        }
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        self.dispatcher.table()
    }

    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    #[must_use]
    pub fn has_error_callback(&self, status: u16) -> bool {
        self.error_callbacks.contains_key(&status)
    }

    /// Run one invocation.
    ///
    /// CLI invocations return [`Sent::Noop`] without touching anything. HTTP requests
    /// are dispatched and finalized; the only error is a routing miss with no fallback.
    pub fn send(&self, invocation: Invocation) -> Result<Sent, RouterError> {
        match invocation {
            Invocation::Cli => {
                debug!("CLI invocation, nothing to dispatch");
                Ok(Sent::Noop)
            }
            Invocation::Http(request) => self.handle(request).map(Sent::Emitted),
        }
    }

    /// Dispatch one HTTP request and finalize its response.
    pub fn handle(&self, request: ParsedRequest) -> Result<Emitted, RouterError> {
        let mut ctx = DispatchContext::resolve(RequestId::for_request(&request), &request);
        let span = info_span!(
            "dispatch",
            request_id = %ctx.request_id,
            method = %ctx.effective_method,
            path = %ctx.path
        );
        let _guard = span.enter();

        let mut base = HandlerResponse::default();

        if self.is_down() {
            warn!("Maintenance mode, rejecting request");
            return Ok(self.abort(base, &ctx, Abort::new(503)));
        }

        if self.x_powered_by {
            base.set_header(X_POWERED_BY, self.config.powered_by.clone());
        }

        let outcome = self
            .dispatcher
            .dispatch(&mut ctx, request, &self.container);

        let emitted = match outcome {
            Ok(DispatchOutcome::Handled(reply)) => finalize(base, reply),
            Ok(DispatchOutcome::ShortCircuit(resp)) => finalize(base, resp.into()),
            Ok(DispatchOutcome::NoRoutesForMethod) => {
                base.status = 404;
                let reply = self.callback_reply(&ctx, 404, None).unwrap_or_else(|| {
                    Reply::from(format!("Cannot {} {} 404", ctx.effective_method, ctx.path))
                });
                finalize(base, reply)
            }
            Ok(DispatchOutcome::NoMatch) => {
                base.status = 404;
                let reply = self.not_found_fallback(&ctx)?;
                finalize(base, reply)
            }
            Err(HandlerError::Abort(abort)) => self.abort(base, &ctx, abort),
            Err(HandlerError::Failed(err)) => {
                error!(
                    error = %err,
                    handler_name = ?ctx.matched.as_ref().map(|r| Arc::clone(&r.handler_name)),
                    "Handler failed"
                );
                base.status = 500;
                let reply = self
                    .callback_reply(&ctx, 500, None)
                    .unwrap_or_else(|| Reply::from(INTERNAL_ERROR_BODY));
                finalize(base, reply)
            }
        };

        info!(
            status = emitted.status,
            route = ?ctx.matched.as_ref().map(|r| r.path.as_str()),
            via_override = ctx.via_override,
            "Request completed"
        );
        Ok(emitted)
    }

    /// 404 ladder for a scan miss: callback, then the configured view, then an error.
    fn not_found_fallback(&self, ctx: &DispatchContext) -> Result<Reply, RouterError> {
        if let Some(reply) = self.callback_reply(ctx, 404, None) {
            return Ok(reply);
        }

        if let Some(view) = self.view_404() {
            let rendered = self
                .views
                .as_ref()
                .ok_or(ViewError::NotConfigured)
                .and_then(|views| {
                    views.render(
                        view,
                        &json!({
                            "method": ctx.effective_method.as_str(),
                            "path": ctx.path,
                        }),
                    )
                })
                .map_err(|source| RouterError::View {
                    view: view.to_string(),
                    source,
                })?;
            return Ok(Reply::from(rendered));
        }

        warn!("No 404 callback or view, routing miss escapes");
        Err(RouterError::NotFound {
            method: ctx.effective_method.clone(),
            path: ctx.path.clone(),
        })
    }

    /// The single place an abort turns into a response.
    fn abort(&self, mut base: HandlerResponse, ctx: &DispatchContext, abort: Abort) -> Emitted {
        info!(status = abort.status, message = ?abort.message, "Request aborted");
        base.status = abort.status;
        for (name, value) in &abort.headers {
            base.set_header(name, value.clone());
        }
        let message = abort.message_or_default().to_string();
        let reply = self
            .callback_reply(ctx, abort.status, Some(message.clone()))
            .unwrap_or_else(|| Reply::from(message));
        finalize(base, reply)
    }

    fn callback_reply(
        &self,
        ctx: &DispatchContext,
        status: u16,
        message: Option<String>,
    ) -> Option<Reply> {
        let callback = self.error_callbacks.get(&status)?;
        debug!(status, "Invoking error-code callback");
        Some(callback(&ErrorContext {
            status,
            request_id: ctx.request_id,
            method: ctx.effective_method.clone(),
            path: ctx.path.clone(),
            message,
        }))
    }
}

impl ConfigAccess for Kernel {
    fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// A kernel that can be replaced atomically while requests are in flight.
///
/// Readers get a snapshot `Arc<Kernel>`; a reload swaps in a freshly built kernel and
/// never mutates a live route table.
#[derive(Clone)]
pub struct SharedKernel {
    inner: Arc<ArcSwap<Kernel>>,
}

impl SharedKernel {
    #[must_use]
    pub fn new(kernel: Kernel) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(kernel)),
        }
    }

    /// Current kernel snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<Kernel> {
        self.inner.load_full()
    }

    pub fn replace(&self, kernel: Kernel) {
        info!(routes = kernel.routes().len(), "Swapping in rebuilt kernel");
        self.inner.store(Arc::new(kernel));
    }

    pub fn send(&self, invocation: Invocation) -> Result<Sent, RouterError> {
        self.inner.load().send(invocation)
    }
}
