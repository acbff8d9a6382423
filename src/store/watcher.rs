//! Settings watcher: pushes a fresh snapshot whenever the store changes.
//!
//! The watcher polls `SettingsStore::has_changed_since()` on an interval and,
//! for each detected change, loads and validates the settings exactly once and
//! publishes the result on a `watch` channel. Readers keep an
//! `Arc<FilterConfig>` and always see a complete snapshot, old or new.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::ConfigError;
use crate::filter::settings::FilterConfig;
use crate::store::traits::{Revision, SettingsStore};

/// Load and validate the current settings, returning the revision they came from.
pub async fn load_snapshot(
    store: &dyn SettingsStore,
) -> Result<(Arc<FilterConfig>, Option<Revision>), ConfigError> {
    let revision = store.revision().await?;
    let settings = store.load().await?;
    let config = FilterConfig::from_settings_logged(&settings);
    Ok((Arc::new(config), revision))
}

/// Spawn a background task that republishes settings on change.
///
/// `last` is the revision the current snapshot was loaded from. Returns a
/// `JoinHandle` and a shutdown flag. Set the flag to stop watching.
pub fn spawn_settings_watcher(
    store: Arc<dyn SettingsStore>,
    tx: watch::Sender<Arc<FilterConfig>>,
    mut last: Option<Revision>,
    interval: Duration,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!(
            "Settings watcher started, checking every {}ms",
            interval.as_millis()
        );

        let mut tick = tokio::time::interval(interval);

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Settings watcher shutting down");
                return;
            }

            match store.has_changed_since(last).await {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    error!("Settings change check failed: {e}");
                    continue;
                }
            }

            match load_snapshot(store.as_ref()).await {
                Ok((config, revision)) => {
                    info!(
                        mode = %config.mode,
                        packages = config.package_list.len(),
                        ignore_rules = config.ignore_rules.len(),
                        "Settings reloaded"
                    );
                    last = revision;
                    tx.send_replace(config);
                }
                Err(e) => {
                    // Keep the previous snapshot; retry on the next tick.
                    error!("Failed to reload settings: {e}");
                }
            }
        }
    });

    (handle, shutdown_flag)
}
