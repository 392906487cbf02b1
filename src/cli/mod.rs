//! # CLI Module
//!
//! `brrtapp` inspects a route table without the application code behind it. The
//! table is built from a config file and a routes file; every action descriptor that
//! nothing binds gets an echo handler, and every unbound middleware name a
//! pass-through.
//!
//! ## Commands
//!
//! ```bash
//! # List the built table
//! brrtapp routes --config config.yaml --routes routes.yaml
//!
//! # Dispatch one synthetic request and print the emitted response
//! brrtapp dispatch --routes routes.yaml --method POST --path /pets/7 \
//!     --field _method=DELETE --field _token=t --header 'Cookie: XSRF-TOKEN=t'
//! ```

mod commands;


pub use commands::{execute, inspection_kernel, run_cli, Cli, Commands};
