//! Router core module - route table construction and the dispatch-time scan.

use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::route::{normalize_path, CompiledRoute, ParamVec, Route};
use crate::errors::ConfigError;

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route (shared with the table, never cloned deeply)
    pub route: Arc<CompiledRoute>,
    /// Path parameters extracted from the URL (e.g., `:id` → `("id", "123")`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths (e.g., `/org/:id/team/:team_id/user/:id`),
    /// returns the last occurrence (the user id, not the org id).
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    index: usize,
    override_only: bool,
}

/// Mutable route table used while the application registers routes.
///
/// Routes live in one registration-ordered list; each method key holds the ordered
/// slots that point into it. A `post` registration additionally gets
/// override-only slots under DELETE and PUT so a POST carrying `_method=DELETE|PUT`
/// still reaches it, in registration order relative to the other routes of that method.
#[derive(Clone, Default)]
pub struct RouteTableBuilder {
    routes: Vec<Route>,
    slots: HashMap<Method, Vec<Slot>>,
}

impl RouteTableBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route under its own method.
    pub fn push(&mut self, route: Route) -> &mut Route {
        let index = self.routes.len();
        self.slots
            .entry(route.method.clone())
            .or_default()
            .push(Slot {
                index,
                override_only: false,
            });
        self.routes.push(route);
        &mut self.routes[index]
    }

    /// Append a POST route that also answers method-override requests for DELETE and PUT.
    pub fn push_overridable(&mut self, route: Route) -> &mut Route {
        let index = self.routes.len();
        for method in [Method::DELETE, Method::PUT] {
            self.slots.entry(method).or_default().push(Slot {
                index,
                override_only: true,
            });
        }
        self.slots.entry(route.method.clone()).or_default().push(Slot {
            index,
            override_only: false,
        });
        self.routes.push(route);
        &mut self.routes[index]
    }

    /// Routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Whether a key exists for `method` (override-only slots included).
    #[must_use]
    pub fn contains_method(&self, method: &Method) -> bool {
        self.slots.contains_key(method)
    }

    /// Freeze the table. Each route is compiled exactly once; override slots share the
    /// compiled route of the POST registration they alias.
    pub fn build<F>(self, mut compile: F) -> Result<RouteTable, ConfigError>
    where
        F: FnMut(&Route) -> Result<CompiledRoute, ConfigError>,
    {
        let compiled = self
            .routes
            .iter()
            .map(|r| compile(r).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        let methods = self
            .slots
            .into_iter()
            .map(|(method, slots)| {
                let entries = slots
                    .into_iter()
                    .map(|slot| TableEntry {
                        route: Arc::clone(&compiled[slot.index]),
                        override_only: slot.override_only,
                    })
                    .collect();
                (method, entries)
            })
            .collect();

        Ok(RouteTable {
            methods,
            route_count: compiled.len(),
        })
    }
}

/// One position in a method's ordered route sequence.
#[derive(Debug, Clone)]
pub struct TableEntry {
    pub route: Arc<CompiledRoute>,
    /// Reachable only from a POST carrying a method override.
    pub override_only: bool,
}

/// Immutable method → ordered routes table shared by every request.
///
/// A method key exists only if at least one route was registered for it.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    methods: HashMap<Method, Vec<TableEntry>>,
    route_count: usize,
}

impl RouteTable {
    /// Routes a request for `method` may be matched against, in registration order.
    ///
    /// Override-only entries are included only when the effective method came from a
    /// POST override.
    pub fn candidates<'a>(
        &'a self,
        method: &Method,
        via_override: bool,
    ) -> impl Iterator<Item = &'a Arc<CompiledRoute>> + 'a {
        self.methods
            .get(method)
            .into_iter()
            .flatten()
            .filter(move |e| via_override || !e.override_only)
            .map(|e| &e.route)
    }

    #[must_use]
    pub fn has_routes(&self, method: &Method, via_override: bool) -> bool {
        self.candidates(method, via_override).next().is_some()
    }

    #[must_use]
    pub fn contains_method(&self, method: &Method) -> bool {
        self.methods.contains_key(method)
    }

    /// Number of distinct registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Methods present in the table, sorted for stable output.
    #[must_use]
    pub fn methods(&self) -> Vec<&Method> {
        let mut methods: Vec<&Method> = self.methods.keys().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }

    /// Entries of one method in registration order.
    #[must_use]
    pub fn entries(&self, method: &Method) -> &[TableEntry] {
        self.methods.get(method).map(Vec::as_slice).unwrap_or_default()
    }

    /// First route, in registration order, whose pattern and constraints match `path`.
    ///
    /// No specificity ranking: once a route matches structurally the scan stops.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str, via_override: bool) -> Option<RouteMatch> {
        let path = normalize_path(path);
        debug!(method = %method, path = %path, via_override, "Route match attempt");

        let match_start = std::time::Instant::now();
        for route in self.candidates(method, via_override) {
            if let Some(path_params) = route.matches(path) {
                info!(
                    method = %method,
                    path = %path,
                    handler_name = %route.handler_name,
                    route_pattern = %route.path,
                    path_params = ?path_params,
                    duration_us = match_start.elapsed().as_micros(),
                    "Route matched"
                );
                return Some(RouteMatch {
                    route: Arc::clone(route),
                    path_params,
                });
            }
        }

        warn!(
            method = %method,
            path = %path,
            duration_us = match_start.elapsed().as_micros(),
            "No route matched"
        );
        None
    }

    /// One line per table entry, `METHOD path -> handler [middleware]`.
    #[must_use]
    pub fn dump_routes(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.route_count);
        for method in self.methods() {
            for entry in self.entries(method) {
                let names: Vec<&str> = entry.route.middleware_names.iter().map(AsRef::as_ref).collect();
                lines.push(format!(
                    "{method} {} -> {} [{}]{}",
                    entry.route.path,
                    entry.route.handler_name,
                    names.join(", "),
                    if entry.override_only { " (via _method)" } else { "" }
                ));
            }
        }
        lines
    }
}
