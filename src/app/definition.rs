//! Declarative route input: single definitions, REST resources and routes files.

use http::Method;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::dispatcher::HandlerRef;
use crate::errors::ConfigError;
use crate::middleware::MiddlewareRef;

/// Verbs a route may be registered under.
pub static SUPPORTED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Parse a verb case-insensitively, rejecting anything the table does not serve.
pub fn parse_method(s: &str) -> Result<Method, ConfigError> {
    let upper = s.trim().to_ascii_uppercase();
    SUPPORTED_METHODS
        .iter()
        .find(|m| m.as_str() == upper)
        .cloned()
        .ok_or_else(|| ConfigError::InvalidMethod(s.to_string()))
}

/// `{path, method, handler, middleware?, where?}`.
///
/// Every field is optional at the type level so a routes file can be parsed before it
/// is validated; `Application::route` reports the first missing one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RouteDefinition {
    pub path: Option<String>,
    pub method: Option<String>,
    pub handler: Option<HandlerRef>,
    pub middleware: Vec<MiddlewareRef>,
    #[serde(rename = "where")]
    pub constraints: BTreeMap<String, String>,
}

impl RouteDefinition {
    #[must_use]
    pub fn new(method: &str, path: &str, handler: impl Into<HandlerRef>) -> Self {
        Self {
            path: Some(path.to_string()),
            method: Some(method.to_string()),
            handler: Some(handler.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    #[must_use]
    pub fn where_param(mut self, name: &str, pattern: &str) -> Self {
        self.constraints.insert(name.to_string(), pattern.to_string());
        self
    }
}

/// A conventional resource action: name, verb and path suffix below the resource url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestAction {
    pub name: &'static str,
    pub method: Method,
    pub suffix: &'static str,
}

/// The seven resource actions, in registration order.
pub static REST_ACTIONS: [RestAction; 7] = [
    RestAction { name: "index", method: Method::GET, suffix: "" },
    RestAction { name: "create", method: Method::GET, suffix: "/create" },
    RestAction { name: "store", method: Method::POST, suffix: "" },
    RestAction { name: "show", method: Method::GET, suffix: "/:id" },
    RestAction { name: "edit", method: Method::GET, suffix: "/:id/edit" },
    RestAction { name: "update", method: Method::PUT, suffix: "/:id" },
    RestAction { name: "destroy", method: Method::DELETE, suffix: "/:id" },
];

/// A REST resource: `url` served by `Controller@action` handlers.
///
/// ```rust
/// use brrtapp::app::RestResource;
///
/// let pets = RestResource::new("/pets/", "PetController")
///     .ignoring(["create", "edit"])
///     .where_param("id", r"\d+");
/// assert_eq!(pets.actions().map(|a| a.name).collect::<Vec<_>>(),
///            ["index", "store", "show", "update", "destroy"]);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RestResource {
    pub url: String,
    pub controller: String,
    /// Action names to skip
    pub ignores: Vec<String>,
    #[serde(rename = "where")]
    pub constraints: BTreeMap<String, String>,
}

impl RestResource {
    #[must_use]
    pub fn new(url: &str, controller: &str) -> Self {
        Self {
            url: url.to_string(),
            controller: controller.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ignoring<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignores.extend(actions.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn where_param(mut self, name: &str, pattern: &str) -> Self {
        self.constraints.insert(name.to_string(), pattern.to_string());
        self
    }

    /// Resource url without trailing slashes.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Actions to register, in order, minus the ignored ones.
    pub fn actions(&self) -> impl Iterator<Item = &'static RestAction> + '_ {
        REST_ACTIONS
            .iter()
            .filter(move |a| !self.ignores.iter().any(|i| i == a.name))
    }

    /// Handler descriptor for an action.
    #[must_use]
    pub fn descriptor(&self, action: &RestAction) -> String {
        format!("{}@{}", self.controller.trim(), action.name)
    }
}

/// Routes registered under a shared prefix. Groups nest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RouteGroup {
    pub prefix: String,
    pub routes: Vec<RouteDefinition>,
    pub rest: Vec<RestResource>,
    pub groups: Vec<RouteGroup>,
}

/// Top-level shape of a routes file (YAML, JSON or TOML).
///
/// ```yaml
/// middleware: [auth]
/// routes:
///   - { method: GET, path: /, handler: HomeController@index }
/// rest:
///   - { url: /pets, controller: PetController, ignores: [edit] }
/// groups:
///   - prefix: /api
///     routes:
///       - { method: GET, path: /status, handler: StatusController@show }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoutesFile {
    /// Replaces the global middleware list before anything else is registered
    pub middleware: Option<Vec<MiddlewareRef>>,
    pub routes: Vec<RouteDefinition>,
    pub rest: Vec<RestResource>,
    pub groups: Vec<RouteGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method(" Delete ").unwrap(), Method::DELETE);
        assert!(matches!(parse_method("TRACE"), Err(ConfigError::InvalidMethod(m)) if m == "TRACE"));
        assert!(parse_method("").is_err());
    }

    #[test]
    fn test_rest_descriptor_and_base_url() {
        let r = RestResource::new("/users//", "UserController");
        assert_eq!(r.base_url(), "/users");
        assert_eq!(r.descriptor(&REST_ACTIONS[6]), "UserController@destroy");
    }

    #[test]
    fn test_routes_file_yaml() {
        let yaml = r#"
middleware: [auth]
routes:
  - method: get
    path: /users/:id
    handler: UserController@show
    where: { id: '\d+' }
groups:
  - prefix: /api
    rest:
      - { url: /pets, controller: PetController, ignores: [create, edit] }
"#;
        let file: RoutesFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.middleware.as_ref().map(Vec::len), Some(1));
        let def = &file.routes[0];
        assert_eq!(def.method.as_deref(), Some("get"));
        assert_eq!(def.handler.as_ref().map(HandlerRef::label), Some("UserController@show"));
        assert_eq!(def.constraints.get("id").map(String::as_str), Some(r"\d+"));
        assert_eq!(file.groups[0].rest[0].actions().count(), 5);
    }

    #[test]
    fn test_definition_missing_fields_parse() {
        let def: RouteDefinition = serde_json::from_str(r#"{"path": "/x"}"#).unwrap();
        assert!(def.method.is_none());
        assert!(def.handler.is_none());
    }
}
