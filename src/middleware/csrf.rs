use tracing::warn;

use super::Middleware;
use crate::config::CsrfConfig;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::errors::HandlerError;

/// Request-forgery protection for mutating routes (POST, DELETE, PUT).
///
/// Double-submit check: the token sent in the form field (or the header) must equal the
/// token cookie. A missing or mismatching token answers 403 without reaching the handler.
pub struct CsrfMiddleware {
    config: CsrfConfig,
}

impl CsrfMiddleware {
    #[must_use]
    pub fn new(config: CsrfConfig) -> Self {
        Self { config }
    }
}

impl Middleware for CsrfMiddleware {
    fn before(&self, req: &mut HandlerRequest) -> Result<Option<HandlerResponse>, HandlerError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let expected = req.get_cookie(&self.config.cookie).filter(|t| !t.is_empty());
        let provided = req
            .field(&self.config.field)
            .or_else(|| req.get_header(&self.config.header));

        match (expected, provided) {
            (Some(expected), Some(provided)) if constant_time_eq(expected, provided) => Ok(None),
            (expected, provided) => {
                warn!(
                    request_id = %req.request_id,
                    method = %req.method,
                    path = %req.path,
                    cookie_present = expected.is_some(),
                    token_present = provided.is_some(),
                    "CSRF token verification failed"
                );
                Ok(Some(HandlerResponse::error(403, "CSRF token mismatch")))
            }
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::constant_time_eq;

    #[test]
    fn compares_tokens() {
        assert!(constant_time_eq("abc123", "abc123"));
        assert!(!constant_time_eq("abc123", "abc124"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
