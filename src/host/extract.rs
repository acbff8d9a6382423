//! Supplementary text extraction from a notification's rich layout.
//!
//! The host renders its notification layout into a neutral `LayoutNode` tree.
//! Extraction is best effort: it never fails, it returns an empty string.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Deeper subtrees are ignored.
const MAX_DEPTH: usize = 32;

/// What a text node is used for in the layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    #[default]
    Body,
    Title,
    Button,
    Timestamp,
}

/// A node of a rendered notification layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutNode {
    Text {
        text: String,
        #[serde(default)]
        role: TextRole,
    },
    Group {
        #[serde(default)]
        children: Vec<LayoutNode>,
    },
}

/// Collapsed and expanded renderings of one notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLayout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<LayoutNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<LayoutNode>,
}

impl NotificationLayout {
    /// The expanded layout when present, else the collapsed one.
    pub fn preferred(&self) -> Option<&LayoutNode> {
        self.expanded.as_ref().or(self.collapsed.as_ref())
    }
}

/// Pulls plain text out of a notification layout.
pub trait TextExtractor: Send + Sync {
    /// Extract text not already present in `existing_text`.
    fn extract(&self, layout: &NotificationLayout, existing_text: &str) -> String;
}

/// Extractor that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExtraText;

impl TextExtractor for NoExtraText {
    fn extract(&self, _layout: &NotificationLayout, _existing_text: &str) -> String {
        String::new()
    }
}

/// Depth-first walk over a `LayoutNode` tree.
///
/// Skips titles, buttons and timestamps (a title is kept when there is no
/// existing text), ellipsis and replacement-character placeholders, bare
/// integers, and text equal to what the event already carries.
#[derive(Debug, Default, Clone, Copy)]
pub struct ViewTreeExtractor;

impl TextExtractor for ViewTreeExtractor {
    fn extract(&self, layout: &NotificationLayout, existing_text: &str) -> String {
        let Some(root) = layout.preferred() else {
            debug!("Notification has no layout, no extra text");
            return String::new();
        };
        let mut out = String::new();
        collect(root, existing_text, 0, &mut out);
        out
    }
}

fn collect(node: &LayoutNode, existing_text: &str, depth: usize, out: &mut String) {
    if depth > MAX_DEPTH {
        debug!(depth, "Layout too deep, ignoring subtree");
        return;
    }
    match node {
        LayoutNode::Group { children } => {
            for child in children {
                collect(child, existing_text, depth + 1, out);
            }
        }
        LayoutNode::Text { text, role } => {
            let keep_title = *role == TextRole::Title && existing_text.is_empty();
            if *role != TextRole::Body && !keep_title {
                return;
            }
            if is_placeholder(text) || text.trim().eq_ignore_ascii_case(existing_text) {
                return;
            }
            out.push_str(text);
            out.push('\n');
        }
    }
}

fn is_placeholder(text: &str) -> bool {
    text == "..." || text == "\u{FFFD}" || text.parse::<i32>().is_ok()
}
