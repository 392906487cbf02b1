use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::dispatcher::{Body, HandlerResponse, HeaderVec, Reply};

pub const CONTENT_TYPE: &str = "content-type";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Reason phrase for a status code.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        419 => "Page Expired",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => "Unknown",
    }
}

/// A finalized response, ready for the transport to write.
#[derive(Debug, Clone, PartialEq)]
pub struct Emitted {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: String,
}

impl Emitted {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        status_reason(self.status)
    }
}

impl fmt::Display for Emitted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HTTP/1.1 {} {}", self.status, self.reason())?;
        for (name, value) in &self.headers {
            writeln!(f, "{name}: {value}")?;
        }
        writeln!(f)?;
        f.write_str(&self.body)
    }
}

fn has_header(headers: &HeaderVec, name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

fn default_content_type(body: &Body) -> Option<&'static str> {
    match body {
        Body::Empty => None,
        Body::Text(_) => Some(HTML_CONTENT_TYPE),
        Body::Json(_) => Some(JSON_CONTENT_TYPE),
    }
}

fn body_text(body: Body) -> String {
    match body {
        Body::Empty => String::new(),
        Body::Text(s) => s,
        Body::Json(v) => v.to_string(),
    }
}

/// Turn a handler reply into the emitted response.
///
/// `base` holds the status and headers staged before the handler ran (`X-Powered-By`,
/// a 404 status set by the fallback ladder, ...).
///
/// - A structured response emits its own status, its own headers, and every staged
///   header it does not override.
/// - A raw body keeps the staged status. Text goes out as `text/html`, JSON data is
///   serialized as `application/json`, and an empty body emits nothing.
#[must_use]
pub fn finalize(base: HandlerResponse, reply: Reply) -> Emitted {
    let (status, mut headers, body) = match reply {
        Reply::Response(resp) => {
            let mut headers: HeaderVec = base
                .headers
                .into_iter()
                .filter(|(k, _)| !has_header(&resp.headers, k))
                .collect();
            headers.extend(resp.headers);
            (resp.status, headers, resp.body)
        }
        Reply::Body(body) => (base.status, base.headers, body),
    };

    if !has_header(&headers, CONTENT_TYPE) {
        if let Some(ct) = default_content_type(&body) {
            headers.push((Arc::from(CONTENT_TYPE), ct.to_string()));
        }
    }

    Emitted {
        status,
        headers,
        body: body_text(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> HandlerResponse {
        HandlerResponse::default().with_header("X-Powered-By", "brrtapp")
    }

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(503), "Service Unavailable");
        assert_eq!(status_reason(799), "Unknown");
    }

    #[test]
    fn test_raw_text_is_html() {
        let out = finalize(base(), Reply::from("<h1>hi</h1>"));
        assert_eq!(out.status, 200);
        assert_eq!(out.body, "<h1>hi</h1>");
        assert_eq!(out.header("Content-Type"), Some(HTML_CONTENT_TYPE));
        assert_eq!(out.header("x-powered-by"), Some("brrtapp"));
    }

    #[test]
    fn test_raw_json_is_serialized() {
        let out = finalize(base(), Reply::from(json!({ "id": 1 })));
        assert_eq!(out.body, r#"{"id":1}"#);
        assert_eq!(out.header(CONTENT_TYPE), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn test_nothing_is_empty_body() {
        let out = finalize(base(), Reply::from(()));
        assert_eq!(out.body, "");
        assert_eq!(out.header(CONTENT_TYPE), None);
    }

    #[test]
    fn test_raw_body_keeps_staged_status() {
        let mut staged = base();
        staged.status = 404;
        let out = finalize(staged, Reply::from("gone"));
        assert_eq!(out.status, 404);
    }

    #[test]
    fn test_structured_response_overrides_staged_headers() {
        let resp = HandlerResponse::text(201, "made").with_header("X-Powered-By", "custom");
        let out = finalize(base(), resp.into());
        assert_eq!(out.status, 201);
        assert_eq!(out.body, "made");
        assert_eq!(out.header("x-powered-by"), Some("custom"));
        assert_eq!(
            out.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("x-powered-by")).count(),
            1
        );
        assert_eq!(out.header(CONTENT_TYPE), Some("text/plain; charset=UTF-8"));
    }

    #[test]
    fn test_display_renders_status_line() {
        let out = finalize(base(), Reply::from("ok"));
        let text = out.to_string();
        assert!(text.starts_with("HTTP/1.1 200 OK\n"));
        assert!(text.ends_with("\n\nok"));
    }
}
