//! Host collaborators: label lookup and layout text extraction.
//!
//! Both are thin seams: the rule engine calls them through traits and never
//! lets their failures escape (unknown label → app id, failed extraction →
//! no extra text).

pub mod extract;
pub mod labels;

pub use extract::{LayoutNode, NoExtraText, NotificationLayout, TextExtractor, TextRole, ViewTreeExtractor};
pub use labels::{LabelResolver, StaticLabels};
