//! Outbound call execution.
//!
//! # Data Flow
//! ```text
//! Client::send
//!     → resolve URL and call name
//!     → encode body, build request, inject headers (request id, caller, sidecar, trace)
//!     → breaker admission (skipped when the kill switch is on)
//!     → transport round trip bounded by the resolved timeout,
//!       raced against caller cancellation and deadline
//!     → status check, decode into the reply, application-code metric
//!     → settle the breaker, record failure metrics, fill reply fallbacks
//! ```

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use url::Url;

use crate::client::codec::{self, Body, ContentType};
use crate::client::context::CallContext;
use crate::client::endpoint::ServiceEndpoint;
use crate::client::error::CallError;
use crate::client::injectors::{self, InjectRequest, REQUEST_ID_HEADER};
use crate::client::reply::Reply;
use crate::client::runtime::ClientRuntime;
use crate::client::transport;
use crate::observability::TraceContext;
use crate::resilience::BreakerError;

/// Highest status treated as success.
const LAST_SUCCESS_STATUS: u16 = 206;

/// Client bound to one child service.
#[derive(Clone)]
pub struct Client {
    endpoint: Arc<ServiceEndpoint>,
    runtime: Arc<ClientRuntime>,
}

/// Where one call goes and what it is called.
#[derive(Debug, Clone, PartialEq)]
struct Target {
    url: Url,
    /// Breaker, timeout and metrics key.
    call_name: String,
    /// URL path, used as the application-code metric label.
    path: String,
}

impl Client {
    pub(crate) fn new(endpoint: Arc<ServiceEndpoint>, runtime: Arc<ClientRuntime>) -> Self {
        Self { endpoint, runtime }
    }

    pub fn name(&self) -> &str {
        &self.endpoint.name
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    pub async fn get<R: Reply + ?Sized>(
        &self,
        ctx: &CallContext,
        path: &str,
        body: &Body,
        reply: &mut R,
    ) -> Result<(), CallError> {
        self.send(ctx, Method::GET, path, body, reply, &[]).await
    }

    pub async fn post<R: Reply + ?Sized>(
        &self,
        ctx: &CallContext,
        path: &str,
        body: &Body,
        reply: &mut R,
    ) -> Result<(), CallError> {
        self.send(ctx, Method::POST, path, body, reply, &[]).await
    }

    /// Perform one call to this service.
    ///
    /// `path` is either relative (appended to the service base URL) or an
    /// absolute `http(s)://` URL. On failure the reply's fallback fields are
    /// filled and the classified error is returned.
    pub async fn send<R: Reply + ?Sized>(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        body: &Body,
        reply: &mut R,
        injectors: &[&dyn InjectRequest],
    ) -> Result<(), CallError> {
        let target = self.resolve_target(path)?;
        let child_trace = ctx.trace.map(|t| t.child());

        let span = match &child_trace {
            Some(trace) => tracing::info_span!(
                "call_remote_server",
                otel.name = %target.call_name,
                span.kind = "client",
                http.method = %method,
                http.url = %target.url,
                peer.hostname = target.url.host_str().unwrap_or_default(),
                peer.port = target.url.port_or_known_default().unwrap_or_default(),
                trace_id = %trace.trace_id_hex(),
                span_id = %trace.span_id_hex(),
                http.status_code = tracing::field::Empty,
                error = tracing::field::Empty,
            ),
            None => tracing::Span::none(),
        };

        let outcome = self
            .dispatch(ctx, method, &target, body, reply, injectors, child_trace.as_ref())
            .instrument(span.clone())
            .await;

        match &outcome {
            Ok(()) => {
                span.record("http.status_code", 200u16);
            }
            Err(e) => {
                span.record("error", true);
                if let Some(status) = e.http_status() {
                    span.record("http.status_code", status);
                }
            }
        }
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    async fn dispatch<R: Reply + ?Sized>(
        &self,
        ctx: &CallContext,
        method: Method,
        target: &Target,
        body: &Body,
        reply: &mut R,
        injectors: &[&dyn InjectRequest],
        trace: Option<&TraceContext>,
    ) -> Result<(), CallError> {
        let mut request = build_request(method, target.url.clone(), body);

        if let Some(id) = &ctx.request_id {
            injectors::set_header(&mut request, REQUEST_ID_HEADER, id);
        }
        for injector in injectors {
            injector.inject(&mut request);
        }
        if !self.endpoint.discovery_service_name.is_empty() {
            injectors::inject_sidecar(
                &mut request,
                &self.runtime.self_service_name,
                &self.endpoint.discovery_service_name,
            );
        }
        if let Some(trace) = trace {
            injectors::inject_trace(&mut request, trace);
        }

        let timeout = self
            .runtime
            .timeouts
            .resolve(&target.call_name, self.endpoint.timeout);
        *request.timeout_mut() = Some(timeout);

        let outcome = if self.runtime.breaker_disabled() {
            self.round_trip(ctx, request, target, reply).await
        } else {
            let breaker = self.runtime.breakers.get_or_create(&target.call_name);
            let admission = match breaker.admit() {
                Ok(admission) => admission,
                Err(rejection) => return Err(self.reject(target, rejection, reply)),
            };

            let outcome = self.round_trip(ctx, request, target, reply).await;
            match &outcome {
                Ok(()) => admission.success(),
                Err(e) if e.counts_against_breaker() => admission.failure(),
                Err(_) => admission.release(),
            }
            outcome
        };

        if let Err(e) = &outcome {
            self.report_failure(target, e, reply);
        }
        outcome
    }

    async fn round_trip<R: Reply + ?Sized>(
        &self,
        ctx: &CallContext,
        request: reqwest::Request,
        target: &Target,
        reply: &mut R,
    ) -> Result<(), CallError> {
        let transport = transport::shared(self.runtime.pool_idle_timeout)
            .await
            .map_err(CallError::network)?;

        let started = Instant::now();
        let exchange = async {
            let response = transport.execute(request).await.map_err(CallError::network)?;
            let status = response.status().as_u16();
            self.runtime
                .metrics
                .request(&self.endpoint.name, &target.call_name, started.elapsed());
            let bytes = response.bytes().await.map_err(|e| CallError::Http {
                status,
                message: e.to_string(),
            })?;
            Ok::<_, CallError>((status, bytes))
        };

        let (status, bytes) = tokio::select! {
            biased;
            interrupted = ctx.interrupted() => return Err(interrupted),
            exchange = exchange => exchange?,
        };

        if status > LAST_SUCCESS_STATUS {
            return Err(CallError::Http {
                status,
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        reply.decode(&bytes).map_err(|e| CallError::Http {
            status,
            message: e.to_string(),
        })?;

        if let Some((code, message)) = reply.app_error() {
            self.runtime
                .metrics
                .code_error(&self.endpoint.name, &target.path, code, &message);
        }
        Ok(())
    }

    fn reject<R: Reply + ?Sized>(
        &self,
        target: &Target,
        rejection: BreakerError,
        reply: &mut R,
    ) -> CallError {
        let err = CallError::Rejected(rejection);
        self.runtime.metrics.breaker_rejected(&target.call_name);
        tracing::warn!(
            url = %target.call_name,
            error = %err,
            "rpc_non_successful: circuit breaker rejected call"
        );
        reply.set_failure(err.code(), &err.message());
        err
    }

    fn report_failure<R: Reply + ?Sized>(&self, target: &Target, err: &CallError, reply: &mut R) {
        if let Some(status) = err.http_status() {
            self.runtime.metrics.error(&target.call_name, status);
        }
        match err {
            CallError::Cancelled | CallError::DeadlineExceeded => tracing::warn!(
                url = %target.url,
                name = %self.endpoint.name,
                error = %err,
                "rpc_non_successful"
            ),
            _ => tracing::error!(
                url = %target.url,
                name = %self.endpoint.name,
                status = err.code(),
                error = %err,
                "rpc_non_successful"
            ),
        }
        reply.set_failure(err.code(), &err.message());
    }

    fn resolve_target(&self, path: &str) -> Result<Target, CallError> {
        let absolute = path.starts_with("http://") || path.starts_with("https://");
        let raw = if absolute {
            path.to_string()
        } else {
            format!("{}{}", self.endpoint.base_url, path)
        };
        let url = Url::parse(&raw).map_err(|e| CallError::InvalidRequest(format!("{raw}: {e}")))?;

        let call_name = if absolute {
            format!("{}{}", self.endpoint.name, url.path())
        } else {
            format!("{}{}", self.endpoint.name, path)
        };
        let path = url.path().to_string();
        Ok(Target {
            url,
            call_name,
            path,
        })
    }
}

/// Build the transport request: GET carries the encoded body as the query
/// string, every other method as the request body.
fn build_request(method: Method, mut url: Url, body: &Body) -> reqwest::Request {
    let kind = ContentType::detect(body);
    let payload = codec::encode(body, kind);

    let mut request = if method == Method::GET {
        // The encoded body replaces any query already on the URL.
        url.set_query((!payload.is_empty()).then_some(payload.as_str()));
        reqwest::Request::new(method, url)
    } else {
        let mut request = reqwest::Request::new(method, url);
        *request.body_mut() = Some(reqwest::Body::from(payload));
        request
    };

    request
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(kind.header_value()));
    request
}
