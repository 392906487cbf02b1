//! # Server Module
//!
//! Transport-facing types. The kernel consumes a [`ParsedRequest`] (built by whatever
//! accepts connections) and yields an [`Emitted`] response for it to write back.
//!
//! - [`request`]: the parsed request, cookie/query/form decoding, `_method` override
//! - [`response`]: the response normalizer and status reason phrases

pub mod request;
pub mod response;

pub use request::{parse_cookies, parse_query_params, parse_request, ParsedRequest, METHOD_OVERRIDE_FIELD};
pub use response::{finalize, status_reason, Emitted};
