//! # brrtapp
//!
//! **brrtapp** is the request-dispatch core of a small web application framework: an
//! application builder that accumulates a route table, freezes it into an immutable
//! kernel at startup, and a single `send` entry point that resolves one route per
//! request, runs its middleware chain and handler, and normalizes the result into a
//! response.
//!
//! ## Architecture
//!
//! - **[`app`]** - [`Application`] builder, frozen [`Kernel`], declarative definitions
//! - **[`router`]** - Route drafts, regex compilation, method → ordered routes table
//! - **[`dispatcher`]** - Effective-method resolution, first-match scan, handler invocation
//! - **[`middleware`]** - One middleware interface; built-in `trim` and `csrf`
//! - **[`server`]** - Parsed request input and the response normalizer
//! - **[`config`]** - [`AppConfig`](config::AppConfig) and the [`ConfigAccess`](config::ConfigAccess) trait
//! - **[`container`]** - Named services shared with handlers
//! - **[`view`]** - View rendering for the 404 fallback
//! - **[`hot_reload`]** - Rebuild and swap the kernel when a routes file changes
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`cli`]** - The `brrtapp` inspection binary
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport
//!     participant Kernel
//!     participant Dispatcher
//!     participant Table as RouteTable
//!     participant Chain as Middleware Chain
//!     participant Handler
//!     participant Normalizer as server::finalize
//!
//!     Transport->>Kernel: send(Invocation::Http(request))
//!     alt Maintenance mode
//!         Kernel-->>Transport: 503 (abort path)
//!     end
//!     Kernel->>Kernel: Stage X-Powered-By
//!     Kernel->>Dispatcher: dispatch(ctx, request)
//!     Dispatcher->>Dispatcher: Effective method<br/>(POST + _method=DELETE|PUT)
//!     alt No routes for method
//!         Dispatcher-->>Kernel: NoRoutesForMethod
//!         Kernel-->>Transport: 404 callback or "Cannot GET /x 404"
//!     end
//!     Dispatcher->>Table: first match in registration order
//!     alt Scan miss
//!         Dispatcher-->>Kernel: NoMatch
//!         Kernel-->>Transport: 404 callback, 404 view, or RouterError::NotFound
//!     end
//!     Dispatcher->>Chain: before() in attachment order
//!     alt Short-circuit
//!         Chain-->>Kernel: HandlerResponse
//!     end
//!     Dispatcher->>Handler: call(&HandlerRequest)
//!     alt Abort / failure / panic
//!         Handler-->>Kernel: HandlerError
//!         Kernel-->>Transport: error-code callback or default body
//!     end
//!     Handler-->>Normalizer: Reply
//!     Normalizer-->>Transport: Emitted
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtapp::{AppConfig, Application, Invocation, ParsedRequest};
//! use brrtapp::dispatcher::{handler, HandlerResponse};
//! use http::Method;
//!
//! let mut app = Application::new(AppConfig::default());
//! app.get("/users/:id", handler(|req| {
//!     Ok(HandlerResponse::json(200, serde_json::json!({ "id": req.get_path_param("id") })))
//! }))
//! .where_param("id", r"\d+");
//! app.code(404, |ctx| format!("nothing at {}", ctx.path));
//!
//! let kernel = app.build().expect("valid route table");
//!
//! let ok = kernel.handle(ParsedRequest::new(Method::GET, "/users/7")).unwrap();
//! assert_eq!(ok.body, r#"{"id":"7"}"#);
//!
//! let miss = kernel.handle(ParsedRequest::new(Method::GET, "/users/abc")).unwrap();
//! assert_eq!(miss.status, 404);
//! assert_eq!(miss.body, "nothing at /users/abc");
//!
//! assert!(kernel.send(Invocation::Cli).unwrap().emitted().is_none());
//! ```
//!
//! ## Concurrency
//!
//! A [`Kernel`] is immutable and `Send + Sync`. Share it with `Arc` across worker
//! threads; use [`SharedKernel`](app::SharedKernel) when the table can be rebuilt at
//! runtime.

pub mod app;
pub mod cli;
pub mod config;
pub mod container;
pub mod dispatcher;
pub mod echo;
pub mod errors;
pub mod hot_reload;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod server;
pub mod view;

pub use app::{Application, Invocation, Kernel, Sent, SharedKernel};
pub use config::{AppConfig, ConfigAccess};
pub use errors::{abort, Abort, ConfigError, HandlerError, RouterError};
pub use server::{Emitted, ParsedRequest};
