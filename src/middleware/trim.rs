use serde_json::Value;

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::errors::HandlerError;

/// Strips leading and trailing whitespace from every input value.
///
/// Form fields, query parameters and string members of a JSON body (at any depth) are
/// rewritten in place before the handler sees them. Never answers on its own.
pub struct TrimMiddleware;

impl Middleware for TrimMiddleware {
    fn before(&self, req: &mut HandlerRequest) -> Result<Option<HandlerResponse>, HandlerError> {
        let input = &mut req.request;
        for value in input.fields.values_mut().chain(input.query_params.values_mut()) {
            trim_in_place(value);
        }
        if let Some(body) = input.body.as_mut() {
            trim_json(body);
        }
        Ok(None)
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn trim_json(value: &mut Value) {
    match value {
        Value::String(s) => trim_in_place(s),
        Value::Array(items) => items.iter_mut().for_each(trim_json),
        Value::Object(map) => map.values_mut().for_each(trim_json),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trims_nested_json_strings() {
        let mut v = json!({ "name": "  Rex ", "tags": [" a", "b "], "age": 3 });
        trim_json(&mut v);
        assert_eq!(v, json!({ "name": "Rex", "tags": ["a", "b"], "age": 3 }));
    }

    #[test]
    fn leaves_clean_values_untouched() {
        let mut s = "clean".to_string();
        trim_in_place(&mut s);
        assert_eq!(s, "clean");
    }
}
