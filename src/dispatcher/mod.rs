//! # Dispatcher Module
//!
//! Resolves one route per inbound request and runs it.
//!
//! ## Overview
//!
//! Given a [`ParsedRequest`](crate::server::ParsedRequest) the dispatcher:
//! - Resolves the effective method (a POST carrying `_method=DELETE|PUT` is looked up
//!   under that method)
//! - Scans the method's routes in registration order, first structural match wins
//! - Runs the matched route's middleware chain in attachment order; any middleware may
//!   answer on its own, in which case the handler is not invoked
//! - Invokes the handler with the extracted path parameters
//!
//! It never produces the 404 output itself: the [`DispatchOutcome`] tells the kernel
//! which fallback applies.
//!
//! ## Error Handling
//!
//! - Handlers and middleware return [`HandlerError`](crate::errors::HandlerError); an
//!   `Abort` travels up unchanged to the kernel
//! - Handler panics are caught and reported as `HandlerError::Failed`
//!
//! ## Handlers
//!
//! ```rust
//! use brrtapp::dispatcher::{handler, HandlerResponse};
//!
//! let show = handler(|req| {
//!     let id = req.get_path_param("id").unwrap_or_default();
//!     Ok(HandlerResponse::json(200, serde_json::json!({ "id": id })))
//! });
//! # let _ = show;
//! ```

mod core;

pub use self::core::{
    handler, Body, DispatchContext, DispatchOutcome, Dispatcher, Handler, HandlerRef,
    HandlerRequest, HandlerResponse, HeaderVec, Reply, MAX_INLINE_HEADERS,
};
