//! Per-dispatch request identifiers.

use std::fmt;
use std::str::FromStr;

use crate::server::ParsedRequest;

/// Header a caller (proxy, load balancer) may use to propagate its own request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request identifier backed by a ULID, so ids sort by creation time in logs.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuse the caller's `X-Request-Id` when it is a valid ULID; mint one otherwise.
    #[must_use]
    pub fn for_request(request: &ParsedRequest) -> Self {
        request
            .header(REQUEST_ID_HEADER)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(RequestId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn reuses_valid_header() {
        let id = RequestId::new();
        let req = ParsedRequest::new(Method::GET, "/").with_header("X-Request-Id", id.to_string());
        assert_eq!(RequestId::for_request(&req), id);
    }

    #[test]
    fn mints_new_id_for_garbage_header() {
        let req = ParsedRequest::new(Method::GET, "/").with_header("X-Request-Id", "not-a-ulid");
        let id = RequestId::for_request(&req);
        assert_ne!(id.to_string(), "not-a-ulid");
        assert_eq!(id.to_string().len(), 26);
    }
}
