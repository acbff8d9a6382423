//! `SettingsStore` trait: where persisted filter settings come from.

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::filter::settings::StoredSettings;

/// Opaque marker that changes whenever the stored settings change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(pub u128);

/// Backend-agnostic settings source.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the current settings.
    async fn load(&self) -> Result<StoredSettings, ConfigError>;

    /// Current revision, `None` when nothing has been stored yet.
    async fn revision(&self) -> Result<Option<Revision>, ConfigError>;

    /// Whether the settings changed after `last` was observed.
    async fn has_changed_since(&self, last: Option<Revision>) -> Result<bool, ConfigError> {
        Ok(self.revision().await? != last)
    }
}
