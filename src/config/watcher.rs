//! Configuration file watcher for hot-reload support

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::SurfaceConfig;

/// Delay between a write event and the reload, so editors can finish writing
const SETTLE_DELAY_MS: u64 = 100;

/// Config watcher that monitors file changes and sends reload notifications
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<SurfaceConfig>,
}

impl ConfigWatcher {
    /// Load the file and start watching it
    pub async fn new(config_path: impl Into<PathBuf>) -> Result<(Self, SurfaceConfig)> {
        let config_path = config_path.into();
        let (tx, rx) = mpsc::channel(10);

        let initial_config = SurfaceConfig::load(&config_path)
            .await
            .context("Failed to load initial config")?;

        // notify callbacks run on their own OS thread, outside the runtime
        let runtime_handle = tokio::runtime::Handle::current();
        let reload_path = config_path.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) if matches!(event.kind, EventKind::Modify(_)) => {
                    debug!("Config file modified: {:?}", event.paths);
                    let config_path = reload_path.clone();
                    let tx = tx.clone();

                    runtime_handle.spawn(async move {
                        tokio::time::sleep(Duration::from_millis(SETTLE_DELAY_MS)).await;

                        match SurfaceConfig::load(&config_path).await {
                            Ok(new_config) => {
                                info!("Configuration reloaded successfully");
                                if let Err(e) = tx.send(new_config).await {
                                    error!("Failed to send config update: {}", e);
                                }
                            }
                            Err(e) => {
                                warn!("Failed to reload config (keeping old config): {:#}", e);
                            }
                        }
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Watch error: {}", e);
                }
            }
        })?;

        watcher
            .watch(&config_path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", config_path.display()))?;

        info!("Config file watcher started for: {}", config_path.display());

        Ok((
            Self {
                _watcher: watcher,
                rx,
            },
            initial_config,
        ))
    }

    /// Wait for the next config update
    /// Returns None if the watcher has been closed
    pub async fn next_config(&mut self) -> Option<SurfaceConfig> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_watcher_reloads() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("surface.yaml");

        fs::write(&config_path, "device: mcu\ntiming:\n  long_press_ms: 400\n")?;

        let (mut watcher, config) = ConfigWatcher::new(&config_path).await?;
        assert_eq!(config.timing.long_press_ms, 400);

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&config_path, "device: mcu\ntiming:\n  long_press_ms: 650\n")?;

        let new_config = tokio::time::timeout(Duration::from_secs(2), watcher.next_config()).await;

        // Some platforms coalesce or drop events on temp dirs; only check what arrived
        if let Ok(Some(new_config)) = new_config {
            assert_eq!(new_config.timing.long_press_ms, 650);
        }

        Ok(())
    }
}
