//! Route drafts and their compiled, immutable form.

use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;

use crate::dispatcher::{Handler, HandlerRef};
use crate::errors::ConfigError;
use crate::middleware::{Middleware, MiddlewareRef};

/// Maximum number of path parameters before heap allocation.
/// Most routes have ≤4 path params (e.g., /users/:id/posts/:post_id).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the compiled route (known at
/// startup); values are per-request data taken from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A route as registered on the [`Application`](crate::app::Application).
///
/// Returned mutably by every registration call so middleware and parameter
/// constraints can be attached builder-style right after creation:
///
/// ```rust
/// use brrtapp::{app::Application, config::AppConfig};
///
/// let mut app = Application::new(AppConfig::default());
/// app.get("/users/:id", "UserController@show")
///     .where_param("id", r"\d+")
///     .middleware(["auth"]);
/// ```
#[derive(Clone, Debug)]
pub struct Route {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) handler: HandlerRef,
    pub(crate) middleware: Vec<MiddlewareRef>,
    pub(crate) constraints: Vec<(String, String)>,
}

impl Route {
    pub(crate) fn new(method: Method, path: String, handler: HandlerRef) -> Self {
        Self {
            method,
            path,
            handler,
            middleware: Vec::new(),
            constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full path pattern (`root + branch + path`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Append middleware after whatever the route already carries.
    pub fn middleware<I, M>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
    {
        self.middleware.extend(middleware.into_iter().map(Into::into));
        self
    }

    /// Constrain a named parameter to a regex. A later constraint on the same name wins.
    pub fn where_param(&mut self, name: impl Into<String>, pattern: impl Into<String>) -> &mut Self {
        let name = name.into();
        let pattern = pattern.into();
        self.constraints.retain(|(n, _)| *n != name);
        self.constraints.push((name, pattern));
        self
    }

    pub fn where_all<I, K, V>(&mut self, constraints: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, pattern) in constraints {
            self.where_param(name, pattern);
        }
        self
    }

    /// Names of middleware attached by name, in attachment order.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&str> {
        self.middleware.iter().map(MiddlewareRef::label).collect()
    }
}

/// A route frozen at build time: regex compiled, middleware and handler resolved.
pub struct CompiledRoute {
    pub method: Method,
    pub path: String,
    pub handler_name: Arc<str>,
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
    pub middleware_names: Vec<Arc<str>>,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl std::fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler_name", &self.handler_name)
            .field("middleware", &self.middleware_names)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

impl CompiledRoute {
    pub(crate) fn new(
        route: &Route,
        handler_name: Arc<str>,
        handler: Arc<dyn Handler>,
        middleware: Vec<(Arc<str>, Arc<dyn Middleware>)>,
    ) -> Result<Self, ConfigError> {
        let (regex, param_names) = path_to_regex(&route.path, &route.constraints)?;
        let (middleware_names, middleware) = middleware.into_iter().unzip();
        Ok(Self {
            method: route.method.clone(),
            path: route.path.clone(),
            handler_name,
            handler,
            middleware,
            middleware_names,
            regex,
            param_names,
        })
    }

    /// Structural + constraint match against a normalized request path.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        let captures = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(val) = captures.name(&capture_name(i)) {
                // A constrained parameter still covers exactly one segment.
                if val.as_str().contains('/') {
                    return None;
                }
                params.push((Arc::clone(name), val.as_str().to_string()));
            }
        }
        Some(params)
    }

    #[must_use]
    pub fn regex(&self) -> &str {
        self.regex.as_str()
    }
}

fn capture_name(i: usize) -> String {
    format!("p{i}")
}

fn param_name(segment: &str) -> Option<&str> {
    if let Some(name) = segment.strip_prefix(':') {
        return Some(name);
    }
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
}

/// Convert a path pattern to an anchored regex and its ordered parameter names.
///
/// Both `:name` and `{name}` segments are parameters. A parameter matches one path
/// segment; a constraint for its name must match that whole segment value. Leading
/// `^` and trailing `$` in a constraint are dropped since the segment is anchored
/// already, and a value spanning a `/` never matches.
pub(crate) fn path_to_regex(
    path: &str,
    constraints: &[(String, String)],
) -> Result<(Regex, Vec<Arc<str>>), ConfigError> {
    let mut pattern = String::with_capacity(path.len() + 8);
    pattern.push('^');
    let mut param_names: Vec<Arc<str>> = Vec::new();

    for segment in path.split('/') {
        if segment.is_empty() {
            continue;
        }
        pattern.push('/');
        match param_name(segment) {
            Some("") => {
                return Err(ConfigError::InvalidPattern {
                    path: path.to_string(),
                    reason: format!("parameter segment `{segment}` has no name"),
                })
            }
            Some(name) => {
                let constraint = constraints
                    .iter()
                    .rfind(|(n, _)| n == name)
                    .map(|(_, c)| strip_anchors(c));
                let body = match constraint {
                    Some(c) => {
                        Regex::new(&format!("^(?:{c})$")).map_err(|source| {
                            ConfigError::InvalidConstraint {
                                path: path.to_string(),
                                param: name.to_string(),
                                pattern: c.to_string(),
                                source,
                            }
                        })?;
                        format!("(?:{c})")
                    }
                    None => "[^/]+".to_string(),
                };
                pattern.push_str(&format!("(?P<{}>{body})", capture_name(param_names.len())));
                param_names.push(Arc::from(name));
            }
            None => pattern.push_str(&regex::escape(segment)),
        }
    }

    if param_names.is_empty() && pattern.len() == 1 {
        pattern.push('/');
    }
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|e| ConfigError::InvalidPattern {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    Ok((regex, param_names))
}

fn strip_anchors(constraint: &str) -> &str {
    let c = constraint.strip_prefix('^').unwrap_or(constraint);
    match c.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => c,
    }
}

/// Normalize a request path for matching: collapse the trailing slash (except for `/`).
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
