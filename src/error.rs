//! Error types for the relay.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Settings store and runtime configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport (wearable link) errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Device {device} is not connected")]
    Disconnected { device: String },

    #[error("Failed to wake app on device {device}: {reason}")]
    WakeFailed { device: String, reason: String },

    #[error("Failed to send to device {device}: {reason}")]
    SendFailed { device: String, reason: String },
}

/// Delivery queue errors.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery queue worker has stopped")]
    QueueClosed,
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
