//! Transport seam: the link that moves messages to the wearable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::delivery::queue::DeliveryQueue;
use crate::error::TransportError;
use crate::filter::types::OutgoingMessage;

/// Identifies the paired device (and the app on it that shows notifications).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Link to the wearable.
///
/// The delivery queue calls `wake` then `send` exactly once per hand-off. The
/// outcome is reported later, exactly once, through `DeliveryQueue::ack` or
/// `DeliveryQueue::nack`. An `Err` from `send` counts as a nack.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging.
    fn name(&self) -> &str;

    /// Bring the notification app to the foreground on the device.
    async fn wake(&self, device: &DeviceId) -> Result<(), TransportError>;

    /// Push one message to the device.
    async fn send(&self, device: &DeviceId, message: &OutgoingMessage) -> Result<(), TransportError>;
}

/// Prints each message as a JSON line on stdout and acknowledges it.
pub struct ConsoleTransport {
    queue: DeliveryQueue,
}

impl ConsoleTransport {
    pub fn new(queue: DeliveryQueue) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn wake(&self, device: &DeviceId) -> Result<(), TransportError> {
        debug!(device = %device, "Wake (console)");
        Ok(())
    }

    async fn send(&self, device: &DeviceId, message: &OutgoingMessage) -> Result<(), TransportError> {
        let line = serde_json::to_string(&serde_json::json!({
            "device": device.0,
            "message": message,
        }))
        .map_err(|e| TransportError::SendFailed {
            device: device.to_string(),
            reason: e.to_string(),
        })?;

        println!("{line}");
        self.queue.ack();
        Ok(())
    }
}
