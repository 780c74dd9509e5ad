//! Per-call caller context.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::client::error::CallError;
use crate::observability::TraceContext;

/// What the caller brings to an outbound call: trace, request id,
/// cancellation and an overall deadline.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub trace: Option<TraceContext>,
    pub request_id: Option<String>,
    pub cancel: Option<CancellationToken>,
    pub deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace(mut self, trace: TraceContext) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Resolves when the caller gives up; pending forever otherwise.
    pub(crate) async fn interrupted(&self) -> CallError {
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = cancelled => CallError::Cancelled,
            _ = expired => CallError::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancellation_resolves() {
        let token = CancellationToken::new();
        let ctx = CallContext::new().with_cancellation(token.clone());
        token.cancel();
        assert_eq!(ctx.interrupted().await, CallError::Cancelled);
    }

    #[tokio::test]
    async fn test_deadline_resolves() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(10));
        assert_eq!(ctx.interrupted().await, CallError::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_plain_context_never_interrupts() {
        let ctx = CallContext::new();
        let raced = tokio::time::timeout(Duration::from_millis(20), ctx.interrupted()).await;
        assert!(raced.is_err());
    }
}
