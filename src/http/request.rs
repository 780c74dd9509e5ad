//! Inbound request context.
//!
//! # Responsibilities
//! - Continue the caller's W3C trace, or start a new one
//! - Carry the request id (set by the request-id layer) into outbound calls

use axum::http::HeaderMap;

use crate::client::CallContext;
use crate::observability::tracing::TRACEPARENT;
use crate::observability::TraceContext;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Build the outbound call context for one inbound request.
pub fn call_context_from_headers(headers: &HeaderMap) -> CallContext {
    let trace = headers
        .get(TRACEPARENT)
        .and_then(|v| v.to_str().ok())
        .and_then(TraceContext::parse)
        .unwrap_or_else(TraceContext::new_root);

    let mut ctx = CallContext::new().with_trace(trace);
    if let Some(id) = headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok()) {
        ctx = ctx.with_request_id(id);
    }
    ctx
}
