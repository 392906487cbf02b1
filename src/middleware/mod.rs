//! # Middleware Module
//!
//! One [`Middleware`] interface for everything a route runs ahead of its handler.
//! Closures ([`from_fn`]), instances ([`MiddlewareRef::instance`]) and names bound in a
//! [`MiddlewareRegistry`] all adapt to it; names are resolved when the application is
//! built.
//!
//! Every route carries, in order: the global middleware active at registration, the
//! built-in [`TRIM`] input normalization, [`CSRF`] protection for POST/DELETE/PUT, and
//! finally its own route-specific middleware.

mod core;
mod csrf;
mod trim;

pub use self::core::{from_fn, Middleware, MiddlewareRef, MiddlewareRegistry, CSRF, TRIM};
pub use csrf::CsrfMiddleware;
pub use trim::TrimMiddleware;
