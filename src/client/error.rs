//! Classified outbound call errors.

use thiserror::Error;

use crate::resilience::BreakerError;

/// Code written into replies when the breaker refuses a call.
pub const SERVICE_BUSY_CODE: i64 = -10002;

/// Message written into replies when the breaker refuses a call ("server busy, please retry later").
pub const SERVICE_BUSY_MESSAGE: &str = "服务器繁忙，请稍后再试";

/// Status used for failures that never produced an HTTP response.
pub const NETWORK_FAILURE_STATUS: u16 = 500;

/// Status used when the caller abandoned the call.
pub const CLIENT_CLOSED_STATUS: u16 = 499;

/// Errors returned by the outbound call layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// The child service is not configured. Fatal: raised at client construction.
    #[error("http_server <{0}> service cfg not found")]
    UnknownService(String),

    /// Network fault (status 500) or upstream/decode fault (received status).
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The circuit breaker refused the call; nothing was sent.
    #[error(transparent)]
    Rejected(#[from] BreakerError),

    /// The caller's cancellation token fired.
    #[error("call cancelled by caller")]
    Cancelled,

    /// The caller's deadline passed before the call finished.
    #[error("caller deadline exceeded")]
    DeadlineExceeded,

    /// The request could not be built (bad URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl CallError {
    pub(crate) fn network(err: impl std::fmt::Display) -> Self {
        CallError::Http {
            status: NETWORK_FAILURE_STATUS,
            message: err.to_string(),
        }
    }

    /// Code written into the reply's fallback fields.
    pub fn code(&self) -> i64 {
        match self {
            CallError::Http { status, .. } => i64::from(*status),
            CallError::Rejected(_) => SERVICE_BUSY_CODE,
            CallError::Cancelled | CallError::DeadlineExceeded => i64::from(CLIENT_CLOSED_STATUS),
            CallError::InvalidRequest(_) => 400,
            CallError::UnknownService(_) => i64::from(NETWORK_FAILURE_STATUS),
        }
    }

    /// Message written into the reply's fallback fields.
    pub fn message(&self) -> String {
        match self {
            CallError::Rejected(_) => SERVICE_BUSY_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// HTTP status for metrics and spans, when the call reached the transport.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            CallError::Http { status, .. } => Some(*status),
            CallError::Cancelled | CallError::DeadlineExceeded => Some(CLIENT_CLOSED_STATUS),
            _ => None,
        }
    }

    /// Whether this outcome is reported to the breaker as a failure.
    pub fn counts_against_breaker(&self) -> bool {
        matches!(self, CallError::Http { .. })
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, CallError::Rejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(CallError::network("connection refused").code(), 500);
        assert_eq!(
            CallError::Http { status: 503, message: "down".into() }.code(),
            503
        );
        let rejected = CallError::from(BreakerError::Open);
        assert_eq!(rejected.code(), SERVICE_BUSY_CODE);
        assert_eq!(rejected.message(), SERVICE_BUSY_MESSAGE);
        assert_eq!(rejected.to_string(), "circuit breaker is open");
        assert_eq!(CallError::Cancelled.code(), 499);
    }

    #[test]
    fn test_breaker_accounting() {
        assert!(CallError::network("timeout").counts_against_breaker());
        assert!(!CallError::Cancelled.counts_against_breaker());
        assert!(!CallError::DeadlineExceeded.counts_against_breaker());
        assert!(!CallError::Rejected(BreakerError::TooManyRequests).counts_against_breaker());
    }
}
