use brrtapp::dispatcher::{handler, HandlerRequest, HandlerResponse, Reply};
use brrtapp::errors::{Abort, HandlerError};
use brrtapp::middleware::{from_fn, Middleware};
use brrtapp::{AppConfig, Application, ConfigError};
use http::Method;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod common;
use common::apps::without_csrf;
use common::requests::{get, post, request, TOKEN};

/// Appends its name to a shared log before and after the handler.
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Middleware for Recorder {
    fn before(&self, _req: &mut HandlerRequest) -> Result<Option<HandlerResponse>, HandlerError> {
        self.log.lock().unwrap().push(format!("before:{}", self.name));
        Ok(None)
    }

    fn after(&self, _req: &HandlerRequest, _reply: &mut Reply, _latency: Duration) {
        self.log.lock().unwrap().push(format!("after:{}", self.name));
    }
}

fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Recorder {
    Recorder {
        name,
        log: Arc::clone(log),
    }
}

#[test]
fn test_global_then_builtin_then_route_middleware_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = Application::new(AppConfig::default());
    app.bind_middleware("global", recorder("global", &log));
    app.bind_middleware("route", recorder("route", &log));
    app.middleware(["global"]);
    let handler_log = Arc::clone(&log);
    app.post("/items", handler(move |_req| {
        handler_log.lock().unwrap().push("handler".to_string());
        Ok(())
    }))
    .middleware(["route"]);

    let names = app.routes()[0].middleware_names();
    assert_eq!(names, vec!["global", "trim", "csrf", "route"]);

    let kernel = app.build().unwrap();
    let out = kernel.handle(post("/items")).unwrap();
    assert_eq!(out.status, 200);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["before:global", "before:route", "handler", "after:route", "after:global"]
    );
}

#[test]
fn test_csrf_only_attached_to_mutating_methods() {
    let mut app = Application::new(AppConfig::default());
    app.get("/a", "A@get");
    app.patch("/a", "A@patch");
    app.put("/a", "A@put");
    app.delete("/a", "A@delete");
    let names: Vec<Vec<&str>> = app.routes().iter().map(|r| r.middleware_names()).collect();
    assert_eq!(names[0], vec!["trim"]);
    assert_eq!(names[1], vec!["trim"]);
    assert_eq!(names[2], vec!["trim", "csrf"]);
    assert_eq!(names[3], vec!["trim", "csrf"]);
}

#[test]
fn test_global_middleware_last_write_wins() {
    let mut app = without_csrf();
    app.middleware(["first"]);
    app.middleware(["second", "third"]);
    assert_eq!(app.global_middleware().len(), 2);
    app.get("/", "Home@index");
    assert_eq!(app.routes()[0].middleware_names(), vec!["second", "third", "trim"]);
}

#[test]
fn test_global_middleware_applies_to_later_routes_only() {
    let mut app = without_csrf();
    app.get("/before", "A@before");
    app.middleware(["auth"]);
    app.get("/after", "A@after");
    assert_eq!(app.routes()[0].middleware_names(), vec!["trim"]);
    assert_eq!(app.routes()[1].middleware_names(), vec!["auth", "trim"]);
}

#[test]
fn test_short_circuit_skips_handler_and_later_middleware() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = without_csrf();
    app.bind_middleware("later", recorder("later", &log));
    let handler_log = Arc::clone(&log);
    app.get("/secret", handler(move |_req| {
        handler_log.lock().unwrap().push("handler".to_string());
        Ok("secret")
    }))
    .middleware([from_fn("gate", |req| {
        if req.get_header("authorization").is_none() {
            return Ok(Some(HandlerResponse::text(401, "who are you")));
        }
        Ok(None)
    })])
    .middleware(["later"]);
    let kernel = app.build().unwrap();

    let out = kernel.handle(get("/secret")).unwrap();
    assert_eq!(out.status, 401);
    assert_eq!(out.body, "who are you");
    assert_eq!(out.header("content-type"), Some("text/plain; charset=UTF-8"));
    assert_eq!(out.header("x-powered-by"), Some("brrtapp"));
    assert!(log.lock().unwrap().is_empty());

    let out = kernel
        .handle(get("/secret").with_header("Authorization", "Bearer x"))
        .unwrap();
    assert_eq!(out.body, "secret");
    assert_eq!(*log.lock().unwrap(), vec!["before:later", "handler", "after:later"]);
}

#[test]
fn test_short_circuit_does_not_fall_through_to_next_route() {
    let mut app = without_csrf();
    app.get("/page", handler(|_req| Ok("first")))
        .middleware([from_fn("deny", |_req| Ok(Some(HandlerResponse::text(403, "denied"))))]);
    app.get("/page", handler(|_req| Ok("second")));
    let kernel = app.build().unwrap();

    let out = kernel.handle(get("/page")).unwrap();
    assert_eq!(out.status, 403);
    assert_eq!(out.body, "denied");
}

#[test]
fn test_middleware_abort_reaches_kernel() {
    let mut app = without_csrf();
    app.get("/maintenance", handler(|_req| Ok("never")))
        .middleware([from_fn("closed", |_req| {
            Err(Abort::new(503).with_message("back soon").into())
        })]);
    app.code(503, |ctx| format!("{} :: {}", ctx.status, ctx.message.clone().unwrap_or_default()));
    let kernel = app.build().unwrap();

    let out = kernel.handle(get("/maintenance")).unwrap();
    assert_eq!(out.status, 503);
    assert_eq!(out.body, "503 :: back soon");
}

#[test]
fn test_middleware_can_rewrite_inputs() {
    let mut app = without_csrf();
    app.get("/hello", handler(|req| Ok(format!("hello {}", req.field("name").unwrap_or("?")))))
        .middleware([from_fn("default-name", |req| {
            if !req.request.query_params.contains_key("name") {
                req.request
                    .query_params
                    .insert("name".to_string(), "world".to_string());
            }
            Ok(None)
        })]);
    let kernel = app.build().unwrap();
    assert_eq!(kernel.handle(get("/hello")).unwrap().body, "hello world");
    assert_eq!(kernel.handle(get("/hello?name=ada")).unwrap().body, "hello ada");
}

#[test]
fn test_trim_middleware_normalizes_input() {
    let mut app = without_csrf();
    app.post("/users", handler(|req| {
        Ok(json!({
            "name": req.field("name"),
            "q": req.get_query_param("q"),
            "nested": req.body().and_then(|b| b.pointer("/profile/city")).cloned(),
        }))
    }));
    let kernel = app.build().unwrap();

    let out = kernel
        .handle(
            request(Method::POST, "/users?q=%20%20rust%20")
                .with_field("name", "  Ada  ")
                .with_json_body(json!({ "profile": { "city": "\tLondon \n" } })),
        )
        .unwrap();
    let body: serde_json::Value = serde_json::from_str(&out.body).unwrap();
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["q"], "rust");
    assert_eq!(body["nested"], "London");
}

#[test]
fn test_csrf_accepts_matching_token() {
    let mut app = Application::new(AppConfig::default());
    app.post("/pets", handler(|_req| Ok("stored")));
    let kernel = app.build().unwrap();

    let out = kernel.handle(post("/pets")).unwrap();
    assert_eq!(out.status, 200);
    assert_eq!(out.body, "stored");
}

#[test]
fn test_csrf_accepts_header_token() {
    let mut app = Application::new(AppConfig::default());
    app.delete("/pets/:id", handler(|_req| Ok("gone")));
    let kernel = app.build().unwrap();

    let req = request(Method::DELETE, "/pets/1")
        .with_header("Cookie", format!("XSRF-TOKEN={TOKEN}"))
        .with_header("X-CSRF-Token", TOKEN);
    assert_eq!(kernel.handle(req).unwrap().body, "gone");
}

#[test]
fn test_csrf_rejects_missing_or_wrong_token() {
    let mut app = Application::new(AppConfig::default());
    app.post("/pets", handler(|_req| Ok("stored")));
    let kernel = app.build().unwrap();

    let out = kernel.handle(request(Method::POST, "/pets")).unwrap();
    assert_eq!(out.status, 403);
    assert_eq!(out.body, r#"{"error":"CSRF token mismatch"}"#);

    let forged = request(Method::POST, "/pets")
        .with_header("Cookie", format!("XSRF-TOKEN={TOKEN}"))
        .with_field("_token", "forged");
    assert_eq!(kernel.handle(forged).unwrap().status, 403);
}

#[test]
fn test_csrf_checks_overridden_requests() {
    let mut app = Application::new(AppConfig::default());
    app.post("/pets/:id", handler(|req| Ok(req.method.to_string())));
    let kernel = app.build().unwrap();

    let forged = request(Method::POST, "/pets/3").with_field("_method", "DELETE");
    assert_eq!(kernel.handle(forged).unwrap().status, 403);

    let ok = post("/pets/3").with_field("_method", "DELETE");
    assert_eq!(kernel.handle(ok).unwrap().body, "DELETE");
}

#[test]
fn test_unknown_middleware_fails_build() {
    let mut app = without_csrf();
    app.get("/admin", "Admin@index").middleware(["auth"]);
    app.action("Admin@index", handler(|_req| Ok(())));
    assert_eq!(app.unresolved_middleware(), vec!["auth".to_string()]);

    match app.build() {
        Err(ConfigError::UnknownMiddleware { name, method, path }) => {
            assert_eq!(name, "auth");
            assert_eq!(method, Method::GET);
            assert_eq!(path, "/admin");
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("build should fail"),
    }
}

#[test]
fn test_alias_middleware_resolves_existing_binding() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = without_csrf();
    app.bind_middleware("audit", recorder("audit", &log));
    app.alias_middleware("log", "audit");
    app.alias_middleware("ghost", "nothing-bound");
    app.get("/", handler(|_req| Ok(()))).middleware(["log"]);
    assert_eq!(app.unresolved_middleware(), Vec::<String>::new());

    let kernel = app.build().unwrap();
    kernel.handle(get("/")).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["before:audit", "after:audit"]);
}

#[test]
fn test_after_hook_can_rewrite_reply() {
    struct Shout;
    impl Middleware for Shout {
        fn after(&self, _req: &HandlerRequest, reply: &mut Reply, _latency: Duration) {
            if let Reply::Body(brrtapp::dispatcher::Body::Text(text)) = reply {
                *text = text.to_uppercase();
            }
        }
    }

    let mut app = without_csrf();
    app.bind_middleware("shout", Shout);
    app.get("/", handler(|_req| Ok("quiet"))).middleware(["shout"]);
    let kernel = app.build().unwrap();
    assert_eq!(kernel.handle(get("/")).unwrap().body, "QUIET");
}
