use std::sync::Arc;

use http::Method;

use super::route::path_to_regex;
use super::{CompiledRoute, Route, RouteTable, RouteTableBuilder};
use crate::dispatcher::{Handler, HandlerRef, HandlerRequest, Reply};
use crate::errors::{ConfigError, HandlerError};

struct Named;

impl Handler for Named {
    fn call(&self, _req: &HandlerRequest) -> Result<Reply, HandlerError> {
        Ok(Reply::from(()))
    }
}

fn draft(method: Method, path: &str, name: &str) -> Route {
    Route::new(method, path.to_string(), HandlerRef::from(name))
}

fn build(builder: RouteTableBuilder) -> RouteTable {
    builder
        .build(|r| {
            CompiledRoute::new(
                r,
                Arc::from(r.handler.label()),
                Arc::new(Named),
                Vec::new(),
            )
        })
        .unwrap()
}

#[test]
fn test_root_path() {
    let (re, params) = path_to_regex("/", &[]).unwrap();
    assert!(re.is_match("/"));
    assert!(!re.is_match("/x"));
    assert!(params.is_empty());
}

#[test]
fn test_both_parameter_syntaxes() {
    let (re, params) = path_to_regex("/items/{id}/tags/:tag", &[]).unwrap();
    assert!(re.is_match("/items/123/tags/red"));
    assert!(!re.is_match("/items/123/tags"));
    let names: Vec<&str> = params.iter().map(AsRef::as_ref).collect();
    assert_eq!(names, ["id", "tag"]);
}

#[test]
fn test_static_segments_are_literal() {
    let (re, _) = path_to_regex("/files/report.pdf", &[]).unwrap();
    assert!(re.is_match("/files/report.pdf"));
    assert!(!re.is_match("/files/reportXpdf"));
}

#[test]
fn test_constraint_must_match_whole_segment() {
    let constraints = vec![("id".to_string(), r"\d+".to_string())];
    let (re, _) = path_to_regex("/users/:id", &constraints).unwrap();
    assert!(re.is_match("/users/42"));
    assert!(!re.is_match("/users/42abc"));
    assert!(!re.is_match("/users/abc"));
}

#[test]
fn test_constraint_alternation_is_grouped() {
    let constraints = vec![("lang".to_string(), "en|fr".to_string())];
    let (re, _) = path_to_regex("/:lang/home", &constraints).unwrap();
    assert!(re.is_match("/fr/home"));
    assert!(!re.is_match("/de/home"));
    assert!(!re.is_match("/en"));
}

#[test]
fn test_anchored_constraint_is_accepted() {
    let constraints = vec![("id".to_string(), r"^\d+$".to_string())];
    let (re, _) = path_to_regex("/users/:id/posts", &constraints).unwrap();
    assert!(re.is_match("/users/42/posts"));
    assert!(!re.is_match("/users/x/posts"));
}

#[test]
fn test_escaped_dollar_is_kept() {
    let constraints = vec![("price".to_string(), r"\d+\$".to_string())];
    let (re, _) = path_to_regex("/cost/:price", &constraints).unwrap();
    assert!(re.is_match("/cost/12$"));
    assert!(!re.is_match("/cost/12"));
}

#[test]
fn test_constraint_cannot_span_segments() {
    let mut builder = RouteTableBuilder::new();
    builder
        .push(draft(Method::GET, "/files/:name", "file"))
        .where_param("name", ".+");
    let table = build(builder);

    let entry = &table.entries(&Method::GET)[0];
    assert_eq!(entry.route.regex(), "^/files/(?P<p0>(?:.+))$");
    assert!(table.route(&Method::GET, "/files/a.txt", false).is_some());
    assert!(table.route(&Method::GET, "/files/a/b.txt", false).is_none());
}

#[test]
fn test_invalid_constraint_is_config_error() {
    let constraints = vec![("id".to_string(), "(".to_string())];
    let err = path_to_regex("/users/:id", &constraints).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidConstraint { ref param, .. } if param == "id"));
}

#[test]
fn test_unnamed_parameter_is_rejected() {
    assert!(matches!(
        path_to_regex("/users/:", &[]),
        Err(ConfigError::InvalidPattern { .. })
    ));
}

#[test]
fn test_first_match_wins_in_registration_order() {
    let mut builder = RouteTableBuilder::new();
    builder.push(draft(Method::GET, "/users/:id", "show"));
    builder.push(draft(Method::GET, "/users/me", "me"));
    let table = build(builder);

    let m = table.route(&Method::GET, "/users/me", false).unwrap();
    assert_eq!(&*m.route.handler_name, "show");
    assert_eq!(m.get_path_param("id"), Some("me"));
}

#[test]
fn test_trailing_slash_is_normalized() {
    let mut builder = RouteTableBuilder::new();
    builder.push(draft(Method::GET, "/pets", "list"));
    let table = build(builder);
    assert!(table.route(&Method::GET, "/pets/", false).is_some());
}

#[test]
fn test_duplicate_param_names_last_wins() {
    let mut builder = RouteTableBuilder::new();
    builder.push(draft(Method::GET, "/org/:id/user/:id", "user"));
    let table = build(builder);
    let m = table.route(&Method::GET, "/org/1/user/2", false).unwrap();
    assert_eq!(m.get_path_param("id"), Some("2"));
}

#[test]
fn test_method_keys_exist_only_when_registered() {
    let mut builder = RouteTableBuilder::new();
    builder.push(draft(Method::GET, "/", "home"));
    let table = build(builder);
    assert!(table.contains_method(&Method::GET));
    assert!(!table.contains_method(&Method::PATCH));
    assert!(!table.has_routes(&Method::PATCH, false));
}

#[test]
fn test_override_slots_only_visible_via_override() {
    let mut builder = RouteTableBuilder::new();
    builder.push(draft(Method::DELETE, "/a", "plain_delete"));
    builder.push_overridable(draft(Method::POST, "/b", "store"));
    builder.push(draft(Method::DELETE, "/b", "late_delete"));
    let table = build(builder);

    assert_eq!(table.len(), 3);
    let names = |via: bool| -> Vec<String> {
        table
            .candidates(&Method::DELETE, via)
            .map(|r| r.handler_name.to_string())
            .collect()
    };
    assert_eq!(names(false), ["plain_delete", "late_delete"]);
    assert_eq!(names(true), ["plain_delete", "store", "late_delete"]);

    let m = table.route(&Method::DELETE, "/b", true).unwrap();
    assert_eq!(&*m.route.handler_name, "store");
    let m = table.route(&Method::DELETE, "/b", false).unwrap();
    assert_eq!(&*m.route.handler_name, "late_delete");
}

#[test]
fn test_alias_only_method_has_no_plain_routes() {
    let mut builder = RouteTableBuilder::new();
    builder.push_overridable(draft(Method::POST, "/b", "store"));
    let table = build(builder);
    assert!(table.contains_method(&Method::PUT));
    assert!(!table.has_routes(&Method::PUT, false));
    assert!(table.has_routes(&Method::PUT, true));
}

#[test]
fn test_where_param_replaces_previous_constraint() {
    let mut route = draft(Method::GET, "/u/:id", "u");
    route.where_param("id", "[a-z]+").where_param("id", r"\d+");
    assert_eq!(route.constraints, vec![("id".to_string(), r"\d+".to_string())]);
}

#[test]
fn test_dump_routes_marks_override_entries() {
    let mut builder = RouteTableBuilder::new();
    builder.push_overridable(draft(Method::POST, "/b", "store"));
    let table = build(builder);
    let lines = table.dump_routes();
    assert_eq!(
        lines,
        [
            "DELETE /b -> store [] (via _method)",
            "POST /b -> store []",
            "PUT /b -> store [] (via _method)",
        ]
    );
}
