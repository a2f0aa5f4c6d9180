//! Configuration file watcher for hot reload.
//!
//! # Design Decisions
//! - Watches the parent directory, so editors that save by rename are still seen
//! - Events for other files in that directory are ignored
//! - A burst of events is coalesced into one reload after a quiet period
//! - Only configs that load and validate are forwarded

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// Quiet period after the last change event before reloading.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches one configuration file and emits validated snapshots on change.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                debounce: DEFAULT_DEBOUNCE,
                update_tx,
            },
            update_rx,
        )
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. Must be called from within a Tokio runtime.
    ///
    /// The returned watcher must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let target = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches_config(&event, &target) => {
                    let _ = change_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default(),
        )?;

        watcher.watch(watch_root(&self.path), RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, debounce_ms = self.debounce.as_millis() as u64, "Config watcher started");

        tokio::spawn(reload_on_change(self.path, self.debounce, change_rx, self.update_tx));
        Ok(watcher)
    }
}

fn watch_root(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Whether `event` writes or replaces the file at `target`.
fn touches_config(event: &Event, target: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event.paths.iter().any(|p| p.file_name() == target.file_name())
}

/// Reload once per burst of change notifications until either channel closes.
async fn reload_on_change(
    path: PathBuf,
    debounce: Duration,
    mut changes: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<GatewayConfig>,
) {
    while changes.recv().await.is_some() {
        // Swallow the rest of the burst.
        while let Ok(Some(())) = tokio::time::timeout(debounce, changes.recv()).await {}

        tracing::info!(path = ?path, "Config file change detected, reloading");
        match load_config(&path) {
            Ok(config) => {
                if updates.send(config).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config; keeping current configuration");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, EventKind, ModifyKind};

    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gateway-watch-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_only_config_writes_count() {
        let target = Path::new("/etc/gateway/gateway.toml");

        let write = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(target.to_path_buf());
        let renamed_in = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("/etc/gateway/gateway.toml"));
        let sibling = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("/etc/gateway/other.toml"));
        let read = Event::new(EventKind::Access(AccessKind::Any)).add_path(target.to_path_buf());

        assert!(touches_config(&write, target));
        assert!(touches_config(&renamed_in, target));
        assert!(!touches_config(&sibling, target));
        assert!(!touches_config(&read, target));
    }

    #[test]
    fn test_watch_root() {
        assert_eq!(watch_root(Path::new("/etc/gateway/gateway.toml")), Path::new("/etc/gateway"));
        assert_eq!(watch_root(Path::new("gateway.toml")), Path::new("."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_reloads_once() {
        let path = temp_config("burst", "[scope]\nnamespace = \"/v2\"\n");
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();

        for _ in 0..5 {
            change_tx.send(()).unwrap();
        }
        drop(change_tx);

        reload_on_change(path.clone(), Duration::from_millis(100), change_rx, update_tx).await;

        let config = update_rx.recv().await.unwrap();
        assert_eq!(config.scope.namespace, "/v2");
        assert!(update_rx.recv().await.is_none());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_file_is_not_forwarded() {
        let path = temp_config("invalid", "[circuit_breaker]\nfailure_threshold = 0\n");
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();

        change_tx.send(()).unwrap();
        drop(change_tx);

        reload_on_change(path.clone(), Duration::from_millis(100), change_rx, update_tx).await;

        assert!(update_rx.recv().await.is_none());
        let _ = std::fs::remove_file(path);
    }
}
