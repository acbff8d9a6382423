//! Human-readable application labels.

use std::collections::HashMap;

/// Resolves an app identifier to the label shown to the user.
pub trait LabelResolver: Send + Sync {
    /// `None` when the app is unknown to the host.
    fn resolve_label(&self, app_id: &str) -> Option<String>;
}

/// Fixed label table, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StaticLabels {
    labels: HashMap<String, String>,
}

impl StaticLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, app_id: &str, label: &str) -> Self {
        self.labels.insert(app_id.to_lowercase(), label.to_string());
        self
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for StaticLabels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            labels: iter
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
                .collect(),
        }
    }
}

impl LabelResolver for StaticLabels {
    fn resolve_label(&self, app_id: &str) -> Option<String> {
        self.labels.get(&app_id.to_lowercase()).cloned()
    }
}
