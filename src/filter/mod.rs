//! Notification filtering pipeline.
//!
//! Every host event flows through:
//! 1. `RulesEngine::evaluate()` — accept/reject against a config snapshot
//! 2. `convert::finalize()` — text substitutions, trimming, empty-drop
//!
//! Accepted messages are then handed to the delivery queue.

pub mod convert;
pub mod quiet_hours;
pub mod rules;
pub mod settings;
pub mod types;

pub use convert::ConvertRule;
pub use quiet_hours::QuietHours;
pub use rules::RulesEngine;
pub use settings::{AppFilter, FilterConfig, IgnoreRule, RenameRule, SettingsWarning, StoredSettings};
pub use types::{Accepted, Decision, EvaluationContext, FilterMode, NotificationEvent, OutgoingMessage, RejectReason};
