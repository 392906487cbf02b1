//! Stand-in handler and middleware for inspecting a route table without its
//! application code (used by the `brrtapp dispatch` command).

use serde_json::json;

use crate::dispatcher::{Handler, HandlerRequest, HandlerResponse, Reply};
use crate::errors::HandlerError;
use crate::middleware::Middleware;

/// Echoes back what the dispatcher resolved for the request.
pub struct EchoHandler;

impl Handler for EchoHandler {
    fn call(&self, req: &HandlerRequest) -> Result<Reply, HandlerError> {
        let params: serde_json::Map<String, serde_json::Value> = req
            .path_params
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        Ok(HandlerResponse::json(
            200,
            json!({
                "handler": req.handler_name.as_ref(),
                "method": req.method.as_str(),
                "path": req.path,
                "route": req.route_pattern,
                "params": params,
                "query": req.request.query_params,
                "fields": req.request.fields,
                "body": req.body(),
            }),
        )
        .into())
    }
}

/// Middleware that lets every request through.
pub struct PassThrough;

impl Middleware for PassThrough {}
