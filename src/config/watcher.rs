//! Configuration file watcher for hot reload.
//!
//! Only breaker settings, route timeouts and the breaker switch are applied
//! live; child services are fixed for the lifetime of the process.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;

/// Watches the configuration file and publishes every valid new version.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Create a watcher and the receiver that yields reloaded configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_content_change(&event.kind) => match load_config(&path) {
                    Ok(config) => {
                        publish(&tx, &path, config);
                    }
                    Err(e) => {
                        tracing::error!(path = ?path, error = %e, "Rejected config reload, keeping current configuration");
                    }
                },
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Hand a reloaded config to the receiver. Returns false when nobody is listening.
fn publish(tx: &mpsc::UnboundedSender<AppConfig>, path: &Path, config: AppConfig) -> bool {
    match tx.send(config) {
        Ok(()) => {
            tracing::info!(path = ?path, "Config file changed, publishing reload");
            true
        }
        Err(_) => {
            tracing::warn!(path = ?path, "Config reload dropped, receiver is gone");
            false
        }
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    kind.is_modify() || kind.is_create()
}

/// Describe which parts of a reloaded config cannot take effect without a restart.
pub fn restart_required(current: &AppConfig, next: &AppConfig) -> Vec<&'static str> {
    let mut sections = Vec::new();
    if current.child_server != next.child_server {
        sections.push("child_server");
    }
    if current.listener.bind_address != next.listener.bind_address {
        sections.push("listener");
    }
    if current.http_client.self_service_name != next.http_client.self_service_name {
        sections.push("http_client.self_service_name");
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ChildServiceConfig;

    #[test]
    fn test_publish_reports_closed_receiver() {
        let (watcher, mut rx) = ConfigWatcher::new(Path::new("config/app.toml"));
        let mut config = AppConfig::default();
        config.http_client.close_breaker = true;

        assert!(publish(&watcher.update_tx, &watcher.path, config));
        assert!(rx.try_recv().unwrap().http_client.close_breaker);

        drop(rx);
        assert!(!publish(&watcher.update_tx, &watcher.path, AppConfig::default()));
    }

    #[test]
    fn test_restart_required_detects_service_changes() {
        let current = AppConfig::default();
        let mut next = current.clone();
        assert!(restart_required(&current, &next).is_empty());

        next.http_client.close_breaker = true;
        assert!(restart_required(&current, &next).is_empty());

        next.child_server.push(ChildServiceConfig {
            name: "amap".into(),
            url: "https://restapi.amap.com".into(),
            discovery_service_name: String::new(),
            discovery_tag: String::new(),
            timeout: 0.0,
        });
        assert_eq!(restart_required(&current, &next), vec!["child_server"]);
    }
}
