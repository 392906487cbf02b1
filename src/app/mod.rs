//! # Application Module
//!
//! Two phases, two types:
//!
//! - [`Application`] is the mutable builder used at startup. Verb helpers, prefixes,
//!   global middleware, declarative definitions, REST resources and error-code
//!   callbacks all accumulate here.
//! - [`Kernel`] is what [`Application::build`] freezes it into. It owns the compiled
//!   route table and exposes one entry point, [`Kernel::send`].
//!
//! There is no process-wide instance. Whatever serves requests receives the kernel
//! explicitly, as an `Arc<Kernel>` or a [`SharedKernel`] when routes can be hot
//! reloaded.
//!
//! ## Request flow
//!
//! 1. CLI invocations return [`Sent::Noop`].
//! 2. Maintenance mode answers 503 through the abort path.
//! 3. `X-Powered-By` is staged unless disabled.
//! 4. The effective method is resolved (`_method` override on POST).
//! 5. The dispatcher scans the method's routes in registration order and runs the first
//!    match's middleware and handler.
//! 6. Misses go through the 404 ladder, aborts and failures through the error-code
//!    callbacks, and the result is normalized into an [`Emitted`](crate::server::Emitted)
//!    response.

mod builder;
mod definition;
mod kernel;

pub use builder::Application;
pub use definition::{
    parse_method, RestAction, RestResource, RouteDefinition, RouteGroup, RoutesFile, REST_ACTIONS,
    SUPPORTED_METHODS,
};
pub use kernel::{ErrorContext, Invocation, Kernel, Sent, SharedKernel, X_POWERED_BY};
