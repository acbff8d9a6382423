//! Shared types for the notification filtering pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::host::extract::NotificationLayout;

// ── Filter mode ─────────────────────────────────────────────────────

/// How the package list is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Forward nothing.
    #[default]
    Off,
    /// Forward only apps on the package list.
    Include,
    /// Forward everything except apps on the package list.
    Exclude,
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Off => "off",
            Self::Include => "include",
            Self::Exclude => "exclude",
        };
        write!(f, "{s}")
    }
}

// ── Incoming event ──────────────────────────────────────────────────

/// A notification event as reported by the host.
///
/// The host adapter converts its native event into this struct before it
/// enters the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Package / application identifier of the sender.
    pub source_app_id: String,
    /// Text lines carried by the event.
    #[serde(default)]
    pub raw_text: Vec<String>,
    /// Whether the event carries a real notification (vs. a toast or other event).
    #[serde(default = "default_true")]
    pub is_notification: bool,
    /// Whether the notification is flagged as ongoing.
    #[serde(default)]
    pub is_ongoing: bool,
    /// Supplementary text already extracted by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_text: Option<String>,
    /// Rich layout the extractor can scrape when no extra text was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<NotificationLayout>,
}

fn default_true() -> bool {
    true
}

impl NotificationEvent {
    /// A plain, non-ongoing notification with a single line of text.
    pub fn new(source_app_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_app_id: source_app_id.into(),
            raw_text: vec![text.into()],
            is_notification: true,
            is_ongoing: false,
            extra_text: None,
            layout: None,
        }
    }
}

// ── Evaluation context ──────────────────────────────────────────────

/// Host conditions computed outside the rule engine for one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationContext {
    /// Screen is on and the snapshot suppresses forwarding while it is.
    pub screen_suppressed: bool,
    /// The current time falls inside the configured quiet hours.
    pub quiet_now: bool,
}

// ── Decision ────────────────────────────────────────────────────────

/// Why an event was not forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    ModeOff,
    ScreenOn,
    QuietHours,
    NotANotification,
    Ongoing,
    Excluded { app: String },
    NotIncluded { app: String },
    IgnoreMatched { pattern: String },
    IncludeUnmatched { pattern: String },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModeOff => write!(f, "mode is off"),
            Self::ScreenOn => write!(f, "screen is on"),
            Self::QuietHours => write!(f, "quiet hours"),
            Self::NotANotification => write!(f, "event is not a notification"),
            Self::Ongoing => write!(f, "notification is ongoing"),
            Self::Excluded { app } => write!(f, "{app} is on the exclude list"),
            Self::NotIncluded { app } => write!(f, "{app} is not on the include list"),
            Self::IgnoreMatched { pattern } => write!(f, "text matches ignore pattern '{pattern}'"),
            Self::IncludeUnmatched { pattern } => {
                write!(f, "text does not match required pattern '{pattern}'")
            }
        }
    }
}

/// Title and body of an accepted event, before text conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub title: String,
    pub body: String,
}

/// Terminal decision of the rule engine for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept(Accepted),
    Reject(RejectReason),
}

impl Decision {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accept(_) => "accept",
            Self::Reject(_) => "reject",
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept(_))
    }
}

// ── Outgoing message ────────────────────────────────────────────────

/// A message bound for the wearable. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    id: Uuid,
    title: String,
    body: String,
}

impl OutgoingMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_defaults_from_json() {
        let event: NotificationEvent =
            serde_json::from_str(r#"{"source_app_id": "com.chat", "raw_text": ["hi"]}"#).unwrap();
        assert!(event.is_notification);
        assert!(!event.is_ongoing);
        assert!(event.extra_text.is_none());
        assert!(event.layout.is_none());
    }

    #[test]
    fn mode_parses_snake_case() {
        let mode: FilterMode = serde_json::from_str(r#""exclude""#).unwrap();
        assert_eq!(mode, FilterMode::Exclude);
        assert_eq!(FilterMode::default(), FilterMode::Off);
        assert_eq!(FilterMode::Include.to_string(), "include");
    }

    #[test]
    fn outgoing_messages_get_distinct_ids() {
        let a = OutgoingMessage::new("Chat", "hello");
        let b = OutgoingMessage::new("Chat", "hello");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.title(), "Chat");
        assert_eq!(a.body(), "hello");
    }

    #[test]
    fn outgoing_message_serializes_fields() {
        let msg = OutgoingMessage::new("Mail", "New message");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["title"], "Mail");
        assert_eq!(json["body"], "New message");
        assert!(json["id"].is_string());
    }

    #[test]
    fn reject_reason_display() {
        let reason = RejectReason::Excluded { app: "com.spam".into() };
        assert_eq!(reason.to_string(), "com.spam is on the exclude list");
        assert_eq!(Decision::Reject(RejectReason::ModeOff).label(), "reject");
    }
}
