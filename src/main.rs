use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use wrist_relay::config::RelayConfig;
use wrist_relay::delivery::{ConsoleTransport, DeliveryQueue};
use wrist_relay::filter::{NotificationEvent, RulesEngine};
use wrist_relay::host::{StaticLabels, ViewTreeExtractor};
use wrist_relay::relay::{HostState, NotificationRelay, Outcome};
use wrist_relay::store::{JsonFileStore, SettingsStore, load_snapshot, spawn_settings_watcher};

/// How long to wait at end of input for queued messages to be delivered.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// One line of input: a notification plus the screen state it arrived under.
#[derive(Debug, Deserialize)]
struct IncomingEvent {
    #[serde(flatten)]
    event: NotificationEvent,
    #[serde(default)]
    screen_on: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries delivered messages.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = RelayConfig::from_env();
    config.validate()?;

    eprintln!("⌚ Wrist Relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Settings: {}", config.settings_path.display());
    eprintln!("   Device: {}", config.device);
    eprintln!("   Reading notification events (NDJSON) from stdin.\n");

    // ── Settings ─────────────────────────────────────────────────────────
    let store: Arc<dyn SettingsStore> = Arc::new(JsonFileStore::new(&config.settings_path));
    let (snapshot, revision) = load_snapshot(store.as_ref()).await?;
    let (settings_tx, settings_rx) = watch::channel(snapshot);
    let (watcher_handle, watcher_shutdown) =
        spawn_settings_watcher(store, settings_tx, revision, config.poll_interval);

    // ── Delivery ─────────────────────────────────────────────────────────
    let (queue, worker) = DeliveryQueue::new(config.device.clone(), config.retry.clone());
    let transport = Arc::new(ConsoleTransport::new(queue.clone()));
    let worker_handle = tokio::spawn(worker.run(transport));

    let engine = RulesEngine::new(Arc::new(StaticLabels::new()), Arc::new(ViewTreeExtractor));
    let relay = NotificationRelay::new(engine, settings_rx, queue.clone());

    // ── Event loop ───────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let incoming: IncomingEvent = match serde_json::from_str(line) {
            Ok(incoming) => incoming,
            Err(e) => {
                tracing::warn!("Skipping malformed event: {e}");
                continue;
            }
        };

        let host = HostState {
            screen_on: incoming.screen_on,
            ..HostState::now()
        };
        match relay.handle(&incoming.event, &host) {
            Outcome::Rejected(reason) => {
                tracing::debug!(app = %incoming.event.source_app_id, reason = %reason, "Not forwarded");
            }
            Outcome::QueueClosed => break,
            _ => {}
        }
    }

    // ── Shutdown ─────────────────────────────────────────────────────────
    if tokio::time::timeout(DRAIN_TIMEOUT, drain(&queue)).await.is_err() {
        tracing::warn!("Delivery queue not drained before exit");
    }
    queue.shutdown();
    watcher_shutdown.store(true, Ordering::Relaxed);
    let _ = worker_handle.await;
    watcher_handle.abort();

    Ok(())
}

/// Wait until nothing is pending.
async fn drain(queue: &DeliveryQueue) {
    while let Ok(snapshot) = queue.snapshot().await {
        if snapshot.pending.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
