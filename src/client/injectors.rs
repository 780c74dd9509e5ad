//! Request decorators applied just before sending.

use reqwest::header::{HeaderName, HeaderValue};

use crate::observability::tracing::TRACEPARENT;
use crate::observability::TraceContext;

/// Sidecar header naming the calling service.
pub const MESH_CLIENT_HEADER: &str = "x-meshclient";

/// Sidecar header naming the target service.
pub const MESH_SERVICE_HEADER: &str = "x-meshservice";

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Adds headers (identity, auth) to an outbound request.
pub trait InjectRequest: Send + Sync {
    fn inject(&self, request: &mut reqwest::Request);
}

impl<F> InjectRequest for F
where
    F: Fn(&mut reqwest::Request) + Send + Sync,
{
    fn inject(&self, request: &mut reqwest::Request) {
        self(request)
    }
}

/// Sets one fixed header.
#[derive(Debug, Clone)]
pub struct StaticHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl StaticHeader {
    /// Returns `None` when the name or value is not a legal header.
    pub fn new(name: &str, value: &str) -> Option<Self> {
        Some(Self {
            name: HeaderName::from_bytes(name.as_bytes()).ok()?,
            value: HeaderValue::from_str(value).ok()?,
        })
    }
}

impl InjectRequest for StaticHeader {
    fn inject(&self, request: &mut reqwest::Request) {
        request.headers_mut().insert(self.name.clone(), self.value.clone());
    }
}

/// Forwards an explicit `x-request-id`, overriding the one taken from the call context.
#[derive(Debug, Clone)]
pub struct RequestIdInjector(pub String);

impl InjectRequest for RequestIdInjector {
    fn inject(&self, request: &mut reqwest::Request) {
        set_header(request, REQUEST_ID_HEADER, &self.0);
    }
}

pub(crate) fn set_header(request: &mut reqwest::Request, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            request.headers_mut().insert(name, value);
        }
        Err(_) => tracing::warn!(header = name, "Skipping header with invalid value"),
    }
}

pub(crate) fn inject_sidecar(request: &mut reqwest::Request, self_name: &str, discovery_service: &str) {
    set_header(request, MESH_CLIENT_HEADER, self_name);
    set_header(request, MESH_SERVICE_HEADER, discovery_service);
}

pub(crate) fn inject_trace(request: &mut reqwest::Request, trace: &TraceContext) {
    set_header(request, TRACEPARENT, &trace.to_header());
}
