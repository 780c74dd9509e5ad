//! Process-wide HTTP transport.
//!
//! One connection-pooling client serves every child service. It is built on
//! first use; the first caller's settings win.

use std::time::Duration;
use tokio::sync::OnceCell;

static TRANSPORT: OnceCell<reqwest::Client> = OnceCell::const_new();

/// The shared client, building it on first use.
pub async fn shared(pool_idle_timeout: Duration) -> Result<&'static reqwest::Client, reqwest::Error> {
    TRANSPORT
        .get_or_try_init(|| async move { build(pool_idle_timeout) })
        .await
}

fn build(pool_idle_timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    tracing::debug!(?pool_idle_timeout, "Building shared HTTP transport");
    reqwest::Client::builder()
        .pool_idle_timeout(pool_idle_timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}
