//! Shared utilities for integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use redis_admin::config::{AppConfig, BreakerSettings, ChildServiceConfig};
use redis_admin::observability::CallMetrics;
use redis_admin::resilience::State;

/// One request as seen by a mock backend.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query, exactly as sent.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            206 => "206 Partial Content",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock backend that always answers 200 with `response`, recording every request.
pub async fn start_recording_backend(
    response: &'static str,
) -> (SocketAddr, Arc<Mutex<Vec<RecordedRequest>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let addr = start_programmable_backend(move |req| {
        sink.lock().push(req);
        async move { (200, response.to_string()) }
    })
    .await;
    (addr, seen)
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).into_owned();

    Some(RecordedRequest {
        method,
        target,
        headers,
        body,
    })
}

/// An address with nothing listening on it.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Config with one child service `name` at `addr`.
pub fn config_with_service(name: &str, addr: SocketAddr) -> AppConfig {
    let mut config = AppConfig::default();
    config.child_server.push(ChildServiceConfig {
        name: name.into(),
        url: format!("http://{addr}"),
        ..Default::default()
    });
    config
}

pub fn breaker(name: &str, consecutive_failures: u32, failure_ratio: f64, open_timeout_secs: u64) -> BreakerSettings {
    BreakerSettings {
        name: name.into(),
        consecutive_failures,
        failure_ratio,
        timeout: open_timeout_secs,
        ..Default::default()
    }
}

/// Metrics event observed by [`RecordingMetrics`].
#[derive(Debug, Clone, PartialEq)]
pub enum MetricEvent {
    Request { service: String, call_name: String },
    Error { call_name: String, status: u16 },
    BreakerRejected { call_name: String },
    CodeError { service: String, path: String, code: i64, message: String },
    BreakerState { call_name: String, state: State },
}

/// Call metrics sink that keeps every event for assertions.
#[derive(Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<MetricEvent>>,
}

impl RecordingMetrics {
    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&MetricEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl CallMetrics for RecordingMetrics {
    fn request(&self, service: &str, call_name: &str, _elapsed: Duration) {
        self.events.lock().push(MetricEvent::Request {
            service: service.into(),
            call_name: call_name.into(),
        });
    }

    fn error(&self, call_name: &str, status: u16) {
        self.events.lock().push(MetricEvent::Error {
            call_name: call_name.into(),
            status,
        });
    }

    fn breaker_rejected(&self, call_name: &str) {
        self.events.lock().push(MetricEvent::BreakerRejected {
            call_name: call_name.into(),
        });
    }

    fn code_error(&self, service: &str, path: &str, code: i64, message: &str) {
        self.events.lock().push(MetricEvent::CodeError {
            service: service.into(),
            path: path.into(),
            code,
            message: message.into(),
        });
    }

    fn breaker_state(&self, call_name: &str, state: State) {
        self.events.lock().push(MetricEvent::BreakerState {
            call_name: call_name.into(),
            state,
        });
    }
}
