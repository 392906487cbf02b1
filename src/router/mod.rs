//! # Router Module
//!
//! Route registration storage and path matching.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Holding routes per HTTP method in registration order
//! - Compiling path patterns (`/users/:id`, `/users/{id}`) and per-parameter
//!   constraints into anchored regexes at build time
//! - Matching a request path against a method's routes, first match wins
//! - Extracting path parameters from the matched route
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Registration**: [`RouteTableBuilder`] collects [`Route`] drafts. Drafts stay
//!    mutable so middleware and constraints can be attached right after creation.
//!
//! 2. **Matching**: [`RouteTableBuilder::build`] compiles every draft
//!    into a [`CompiledRoute`] and freezes an immutable [`RouteTable`]. For each request
//!    the table is scanned linearly for the resolved method; the first structural match
//!    wins, there is no specificity ranking.
//!
//! ## Example
//!
//! ```rust
//! use brrtapp::{app::Application, config::AppConfig, dispatcher::handler};
//! use http::Method;
//!
//! let mut app = Application::new(AppConfig::default());
//! app.get("/users/:id", handler(|_req| Ok("user")))
//!     .where_param("id", r"\d+");
//! let kernel = app.build().unwrap();
//!
//! let m = kernel.routes().route(&Method::GET, "/users/42", false).unwrap();
//! assert_eq!(m.get_path_param("id"), Some("42"));
//! assert!(kernel.routes().route(&Method::GET, "/users/abc", false).is_none());
//! ```

mod core;
mod route;
#[cfg(test)]
mod tests;

pub use self::core::{RouteMatch, RouteTable, RouteTableBuilder, TableEntry};
pub use self::route::{normalize_path, CompiledRoute, ParamVec, Route, MAX_INLINE_PARAMS};
