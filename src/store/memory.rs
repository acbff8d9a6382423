//! In-memory settings store with a monotonically increasing revision.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ConfigError;
use crate::filter::settings::StoredSettings;
use crate::store::traits::{Revision, SettingsStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Option<(StoredSettings, u128)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store settings and bump the revision.
    pub async fn save(&self, settings: StoredSettings) {
        let mut inner = self.inner.write().await;
        let next = inner.as_ref().map_or(1, |(_, rev)| rev + 1);
        *inner = Some((settings, next));
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load(&self) -> Result<StoredSettings, ConfigError> {
        Ok(self
            .inner
            .read()
            .await
            .as_ref()
            .map(|(s, _)| s.clone())
            .unwrap_or_default())
    }

    async fn revision(&self) -> Result<Option<Revision>, ConfigError> {
        Ok(self.inner.read().await.as_ref().map(|(_, rev)| Revision(*rev)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revision_bumps_on_every_save() {
        let store = MemoryStore::new();
        assert_eq!(store.revision().await.unwrap(), None);

        store.save(StoredSettings::default()).await;
        let first = store.revision().await.unwrap();
        store.save(StoredSettings::default()).await;
        let second = store.revision().await.unwrap();

        assert!(second > first);
        assert!(store.has_changed_since(first).await.unwrap());
        assert!(!store.has_changed_since(second).await.unwrap());
    }
}
