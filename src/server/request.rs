use http::Method;
use std::collections::HashMap;
use tracing::debug;

/// Form field carrying the method override for clients that can only send POST.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// Parsed HTTP request data consumed by the kernel.
///
/// The transport layer builds one of these per inbound request. Header names are
/// stored lowercase; `fields` holds decoded form input, and [`field`](Self::field) is
/// the generic lookup (form fields, then JSON body members, then query string).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    /// HTTP method as sent by the client (before any override)
    pub method: Method,
    /// Request path without query string
    pub path: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    /// Parsed cookies from Cookie header
    pub cookies: HashMap<String, String>,
    /// Parsed query string parameters
    pub query_params: HashMap<String, String>,
    /// Decoded `application/x-www-form-urlencoded` body fields
    pub fields: HashMap<String, String>,
    /// Parsed JSON body (if content-type is application/json)
    pub body: Option<serde_json::Value>,
}

impl ParsedRequest {
    /// Build a request from a method and a request target (`/path?query`).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let path = target.split('?').next().unwrap_or("/");
        let path = if path.is_empty() { "/" } else { path };
        Self {
            method,
            path: path.to_string(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            query_params: parse_query_params(target),
            fields: HashMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        if name.eq_ignore_ascii_case("cookie") {
            self.cookies = parse_cookies(&self.headers);
        }
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Decode an urlencoded form body into `fields`.
    #[must_use]
    pub fn with_form_body(mut self, body: &str) -> Self {
        self.fields.extend(
            url::form_urlencoded::parse(body.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
        self
    }

    #[must_use]
    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Generic input lookup: form fields, then top-level JSON string members, then query.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .or_else(|| {
                self.body
                    .as_ref()
                    .and_then(|b| b.get(name))
                    .and_then(|v| v.as_str())
            })
            .or_else(|| self.query_params.get(name).map(String::as_str))
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// The DELETE/PUT method a POST request asks to be treated as, if any.
    ///
    /// Any other override value, or an override on a non-POST request, is ignored.
    #[must_use]
    pub fn method_override(&self) -> Option<Method> {
        if self.method != Method::POST {
            return None;
        }
        let requested = self.field(METHOD_OVERRIDE_FIELD)?.trim();
        if requested.eq_ignore_ascii_case("DELETE") {
            Some(Method::DELETE)
        } else if requested.eq_ignore_ascii_case("PUT") {
            Some(Method::PUT)
        } else {
            None
        }
    }
}

/// Parse a `Cookie` header into name/value pairs.
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    if name.is_empty() {
                        return None;
                    }
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse query string parameters from a request target
///
/// Extracts everything after the `?` character and URL-decodes parameter names and values.
pub fn parse_query_params(target: &str) -> HashMap<String, String> {
    if let Some(pos) = target.find('?') {
        let query_str = &target[pos + 1..];
        url::form_urlencoded::parse(query_str.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    } else {
        HashMap::new()
    }
}

/// Assemble a [`ParsedRequest`] from raw transport parts.
///
/// The body is decoded by content type: JSON bodies land in `body`, urlencoded bodies in
/// `fields`; anything else is ignored.
pub fn parse_request<I>(
    method: &str,
    target: &str,
    headers: I,
    body: &[u8],
) -> Result<ParsedRequest, http::method::InvalidMethod>
where
    I: IntoIterator<Item = (String, String)>,
{
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
    let mut req = ParsedRequest::new(method, target);
    for (name, value) in headers {
        req.headers.insert(name.to_ascii_lowercase(), value);
    }
    req.cookies = parse_cookies(&req.headers);

    if !body.is_empty() {
        let content_type = req.header("content-type").unwrap_or("").to_ascii_lowercase();
        if content_type.starts_with("application/json") {
            req.body = serde_json::from_slice(body).ok();
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            req.fields = url::form_urlencoded::parse(body)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
        }
    }

    debug!(
        method = %req.method,
        path = %req.path,
        header_count = req.headers.len(),
        cookie_count = req.cookies.len(),
        field_count = req.fields.len(),
        has_json_body = req.body.is_some(),
        "HTTP request parsed"
    );

    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookies() {
        let mut h = HashMap::new();
        h.insert("cookie".to_string(), "a=b; c=d".to_string());
        let cookies = parse_cookies(&h);
        assert_eq!(cookies.get("a"), Some(&"b".to_string()));
        assert_eq!(cookies.get("c"), Some(&"d".to_string()));
    }

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("/p?x=1&y=hello%20world");
        assert_eq!(q.get("x"), Some(&"1".to_string()));
        assert_eq!(q.get("y"), Some(&"hello world".to_string()));
    }

    #[test]
    fn test_new_strips_query_from_path() {
        let req = ParsedRequest::new(Method::GET, "/users?page=2");
        assert_eq!(req.path, "/users");
        assert_eq!(req.field("page"), Some("2"));
    }

    #[test]
    fn test_field_prefers_form_over_query() {
        let req = ParsedRequest::new(Method::POST, "/x?name=query").with_field("name", "form");
        assert_eq!(req.field("name"), Some("form"));
    }

    #[test]
    fn test_method_override_only_delete_or_put() {
        let post = |v: &str| ParsedRequest::new(Method::POST, "/x").with_field("_method", v);
        assert_eq!(post("delete").method_override(), Some(Method::DELETE));
        assert_eq!(post("PUT").method_override(), Some(Method::PUT));
        assert_eq!(post("PATCH").method_override(), None);
        let get = ParsedRequest::new(Method::GET, "/x").with_field("_method", "DELETE");
        assert_eq!(get.method_override(), None);
    }

    #[test]
    fn test_parse_request_form_body() {
        let req = parse_request(
            "post",
            "/login",
            vec![(
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            )],
            b"user=ada&_method=PUT",
        )
        .unwrap();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.field("user"), Some("ada"));
        assert_eq!(req.method_override(), Some(Method::PUT));
    }

    #[test]
    fn test_parse_request_json_body() {
        let req = parse_request(
            "PUT",
            "/pets/1",
            vec![("content-type".to_string(), "application/json".to_string())],
            br#"{"name":"Rex"}"#,
        )
        .unwrap();
        assert_eq!(req.field("name"), Some("Rex"));
    }
}
