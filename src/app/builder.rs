use http::Method;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::definition::{parse_method, RestResource, RouteDefinition, RouteGroup, RoutesFile};
use super::kernel::{ErrorCallback, ErrorContext, Kernel};
use crate::config::{read_document, AppConfig, ConfigAccess};
use crate::container::Container;
use crate::dispatcher::{Handler, HandlerRef, Reply};
use crate::errors::ConfigError;
use crate::middleware::{Middleware, MiddlewareRef, MiddlewareRegistry, CSRF, TRIM};
use crate::router::{CompiledRoute, Route, RouteTableBuilder};
use crate::view::{MiniJinjaViews, ViewRenderer};

/// Route table builder.
///
/// Accumulates routes, middleware bindings, action bindings and error-code callbacks,
/// then [`build`](Self::build)s the immutable [`Kernel`]. Nothing here is consulted at
/// request time.
///
/// ```rust
/// use brrtapp::app::{Application, Invocation};
/// use brrtapp::config::AppConfig;
/// use brrtapp::dispatcher::handler;
/// use brrtapp::server::ParsedRequest;
/// use http::Method;
///
/// let mut app = Application::new(AppConfig::default());
/// app.prefix("/api", |app| {
///     app.get("/hello/:name", handler(|req| {
///         Ok(format!("hello {}", req.get_path_param("name").unwrap_or_default()))
///     }));
/// });
/// let kernel = app.build().unwrap();
///
/// let sent = kernel
///     .send(Invocation::Http(ParsedRequest::new(Method::GET, "/api/hello/ada")))
///     .unwrap();
/// assert_eq!(sent.emitted().unwrap().body, "hello ada");
/// ```
pub struct Application {
    config: AppConfig,
    table: RouteTableBuilder,
    branch: String,
    global_middleware: Vec<MiddlewareRef>,
    middleware: MiddlewareRegistry,
    actions: HashMap<String, HandlerRef>,
    error_callbacks: HashMap<u16, ErrorCallback>,
    container: Arc<Container>,
    views: Option<Arc<dyn ViewRenderer>>,
    x_powered_by: bool,
}

impl Application {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let middleware = MiddlewareRegistry::with_builtins(&config.csrf);
        let container = Arc::new(Container::new());
        container.instance("config", config.clone());
        Self {
            config,
            table: RouteTableBuilder::new(),
            branch: String::new(),
            global_middleware: Vec::new(),
            middleware,
            actions: HashMap::new(),
            error_callbacks: HashMap::new(),
            container,
            views: None,
            x_powered_by: true,
        }
    }

    /// Register routes under `branch` for the duration of `body`.
    ///
    /// The branch loses its trailing `/` and gains a leading one, is appended to the
    /// current branch, and the previous branch is restored when `body` returns.
    pub fn prefix<R>(&mut self, branch: &str, body: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.branch.clone();
        let branch = branch.trim_end_matches('/');
        if !branch.starts_with('/') {
            self.branch.push('/');
        }
        self.branch.push_str(branch);
        debug!(branch = %self.branch, "Entering prefix");
        let out = body(self);
        self.branch = previous;
        out
    }

    /// Replace the global middleware list attached to routes registered from now on.
    pub fn middleware<I, M>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
    {
        self.global_middleware = middleware.into_iter().map(Into::into).collect();
        self
    }

    /// Global middleware currently in effect.
    #[must_use]
    pub fn global_middleware(&self) -> &[MiddlewareRef] {
        &self.global_middleware
    }

    /// Register a route under `method`.
    pub fn register(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Into<HandlerRef>,
    ) -> &mut Route {
        self.push(method, path, handler.into(), false)
    }

    pub fn get(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.register(Method::GET, path, handler)
    }

    /// Register a POST route that also answers `_method=DELETE|PUT` overrides.
    pub fn post(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.push(Method::POST, path, handler.into(), true)
    }

    pub fn put(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.register(Method::PUT, path, handler)
    }

    pub fn patch(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.register(Method::PATCH, path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.register(Method::DELETE, path, handler)
    }

    pub fn options(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.register(Method::OPTIONS, path, handler)
    }

    /// Register under OPTIONS, PATCH, POST, DELETE, PUT and GET.
    pub fn any(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Self {
        let handler = handler.into();
        self.options(path, handler.clone());
        self.patch(path, handler.clone());
        self.post(path, handler.clone());
        self.delete(path, handler.clone());
        self.put(path, handler.clone());
        self.get(path, handler);
        self
    }

    /// Register under each listed verb.
    pub fn match_methods(
        &mut self,
        methods: &[Method],
        path: &str,
        handler: impl Into<HandlerRef>,
    ) -> &mut Self {
        let handler = handler.into();
        for method in methods {
            self.register(method.clone(), path, handler.clone());
        }
        self
    }

    /// Register a declarative definition. Fields are checked in the order path,
    /// method, handler.
    pub fn route(&mut self, definition: RouteDefinition) -> Result<&mut Route, ConfigError> {
        let RouteDefinition {
            path,
            method,
            handler,
            middleware,
            constraints,
        } = definition;
        let path = path.ok_or(ConfigError::MissingField("path"))?;
        let method = method.ok_or(ConfigError::MissingField("method"))?;
        let handler = handler.ok_or(ConfigError::MissingField("handler"))?;
        let method = parse_method(&method)?;

        Ok(self
            .register(method, &path, handler)
            .middleware(middleware)
            .where_all(constraints))
    }

    /// Register the conventional resource routes for `resource`.
    ///
    /// | action | verb | path |
    /// |---|---|---|
    /// | index | GET | `url` |
    /// | create | GET | `url/create` |
    /// | store | POST | `url` |
    /// | show | GET | `url/:id` |
    /// | edit | GET | `url/:id/edit` |
    /// | update | PUT | `url/:id` |
    /// | destroy | DELETE | `url/:id` |
    pub fn rest(&mut self, resource: RestResource) -> Result<&mut Self, ConfigError> {
        if resource.controller.trim().is_empty() {
            return Err(ConfigError::MissingController(resource.url));
        }
        let base = resource.base_url().to_string();
        for action in resource.actions() {
            let path = format!("{base}{}", action.suffix);
            let path = if path.is_empty() { "/" } else { path.as_str() };
            self.register(action.method.clone(), path, resource.descriptor(action))
                .where_all(resource.constraints.clone());
        }
        debug!(url = %base, controller = %resource.controller, "REST resource registered");
        Ok(self)
    }

    /// Register a callback answering `status` (404s, aborts, handler failures).
    pub fn code<F, R>(&mut self, status: u16, callback: F) -> &mut Self
    where
        F: Fn(&ErrorContext) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        let callback: ErrorCallback = Arc::new(move |ctx: &ErrorContext| callback(ctx).into());
        self.error_callbacks.insert(status, callback);
        self
    }

    pub fn disable_x_powered_by(&mut self) -> &mut Self {
        self.x_powered_by = false;
        self
    }

    /// Bind a `Controller@action` descriptor. The target may itself be a descriptor
    /// bound to a handler.
    pub fn action(&mut self, name: &str, handler: impl Into<HandlerRef>) -> &mut Self {
        self.actions.insert(name.to_string(), handler.into());
        self
    }

    /// Bind a middleware name. A named target is resolved against the bindings that
    /// exist at the time of the call.
    pub fn alias_middleware(&mut self, name: &str, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        match self.middleware.resolve(&middleware.into()) {
            Some((_, mw)) => self.middleware.register(name, mw),
            None => warn!(name, "Middleware alias target is not bound, alias ignored"),
        }
        self
    }

    /// Bind a middleware instance under `name`.
    pub fn bind_middleware(&mut self, name: &str, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.register(name, Arc::new(middleware));
        self
    }

    /// Use `views` for the 404 view instead of the configured views directory.
    pub fn views(&mut self, views: impl ViewRenderer + 'static) -> &mut Self {
        self.views = Some(Arc::new(views));
        self
    }

    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn instance<T>(&mut self, name: &str, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.container.instance(name, value);
        self
    }

    pub fn bind<T, F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.container.bind(name, factory);
        self
    }

    /// Read a YAML, JSON or TOML routes file and register everything it declares.
    pub fn load_routes(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, ConfigError> {
        let path = path.as_ref();
        let file: RoutesFile = read_document(path)?;
        let before = self.table.len();
        self.apply_routes(file)?;
        info!(
            path = %path.display(),
            routes = self.table.len() - before,
            "Routes file loaded"
        );
        Ok(self)
    }

    pub fn apply_routes(&mut self, file: RoutesFile) -> Result<&mut Self, ConfigError> {
        if let Some(middleware) = file.middleware {
            self.middleware(middleware);
        }
        self.apply_group_body(file.routes, file.rest, file.groups)?;
        Ok(self)
    }

    fn apply_group_body(
        &mut self,
        routes: Vec<RouteDefinition>,
        rest: Vec<RestResource>,
        groups: Vec<RouteGroup>,
    ) -> Result<(), ConfigError> {
        for definition in routes {
            self.route(definition)?;
        }
        for resource in rest {
            self.rest(resource)?;
        }
        for group in groups {
            let RouteGroup {
                prefix,
                routes,
                rest,
                groups,
            } = group;
            self.prefix(&prefix, |app| app.apply_group_body(routes, rest, groups))?;
        }
        Ok(())
    }

    /// Routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        self.table.routes()
    }

    /// Action descriptors used by routes but not bound, in first-use order.
    #[must_use]
    pub fn unresolved_actions(&self) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for route in self.table.routes() {
            if let HandlerRef::Action(name) = &route.handler {
                if resolve_action(&self.actions, name).is_none() && !missing.contains(name) {
                    missing.push(name.clone());
                }
            }
        }
        missing
    }

    /// Middleware names used by routes but not bound, in first-use order.
    #[must_use]
    pub fn unresolved_middleware(&self) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for route in self.table.routes() {
            for m in &route.middleware {
                if let MiddlewareRef::Named(name) = m {
                    if !self.middleware.contains(name) && !missing.contains(name) {
                        missing.push(name.clone());
                    }
                }
            }
        }
        missing
    }

    /// Freeze into a [`Kernel`]: compile patterns and constraints, resolve handler and
    /// middleware names. Any failure is reported here, never at request time.
    pub fn build(self) -> Result<Kernel, ConfigError> {
        let Application {
            config,
            table,
            middleware,
            actions,
            error_callbacks,
            container,
            views,
            x_powered_by,
            ..
        } = self;

        let table = table.build(|route| {
            let (handler_name, handler) = resolve_handler(&actions, route)?;
            let resolved = route
                .middleware
                .iter()
                .map(|m| {
                    middleware
                        .resolve(m)
                        .ok_or_else(|| ConfigError::UnknownMiddleware {
                            name: m.label().to_string(),
                            method: route.method.clone(),
                            path: route.path.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            CompiledRoute::new(route, handler_name, handler, resolved)
        })?;

        let views = views.or_else(|| {
            config
                .views_dir
                .as_ref()
                .map(|_| Arc::new(MiniJinjaViews::from_config(&config)) as Arc<dyn ViewRenderer>)
        });

        info!(
            total_routes = table.len(),
            methods = ?table.methods().iter().map(|m| m.as_str()).collect::<Vec<_>>(),
            error_callbacks = error_callbacks.len(),
            x_powered_by,
            "Route table built"
        );

        Ok(Kernel::new(
            config,
            table,
            error_callbacks,
            container,
            views,
            x_powered_by,
        ))
    }

    fn push(&mut self, method: Method, path: &str, handler: HandlerRef, overridable: bool) -> &mut Route {
        let full = format!("{}{}{}", self.config.root, self.branch, path);
        let mut route = Route::new(method.clone(), full, handler);
        route.middleware.extend(self.global_middleware.iter().cloned());
        route.middleware.push(MiddlewareRef::from(TRIM));
        if method == Method::POST || method == Method::DELETE || method == Method::PUT {
            route.middleware.push(MiddlewareRef::from(CSRF));
        }
        debug!(
            method = %route.method,
            path = %route.path,
            handler = %route.handler.label(),
            overridable,
            "Route registered"
        );
        if overridable {
            self.table.push_overridable(route)
        } else {
            self.table.push(route)
        }
    }
}

impl ConfigAccess for Application {
    fn config(&self) -> &AppConfig {
        &self.config
    }
}

fn resolve_action(actions: &HashMap<String, HandlerRef>, name: &str) -> Option<Arc<dyn Handler>> {
    match actions.get(name)? {
        HandlerRef::Direct(h) => Some(Arc::clone(h)),
        HandlerRef::Action(target) => match actions.get(target)? {
            HandlerRef::Direct(h) => Some(Arc::clone(h)),
            HandlerRef::Action(_) => None,
        },
    }
}

fn resolve_handler(
    actions: &HashMap<String, HandlerRef>,
    route: &Route,
) -> Result<(Arc<str>, Arc<dyn Handler>), ConfigError> {
    match &route.handler {
        HandlerRef::Direct(h) => Ok((Arc::from(route.handler.label()), Arc::clone(h))),
        HandlerRef::Action(name) => resolve_action(actions, name)
            .map(|h| (Arc::from(name.as_str()), h))
            .ok_or_else(|| ConfigError::UnknownAction {
                action: name.clone(),
                method: route.method.clone(),
                path: route.path.clone(),
            }),
    }
}
