//! Text conversion: ordered, case-insensitive literal substitutions.
//!
//! Applied to the body of an accepted event. The title is never converted.

use regex::{NoExpand, Regex, RegexBuilder};
use tracing::debug;

use crate::filter::types::{Accepted, OutgoingMessage};

/// A single `from → to` substitution.
#[derive(Debug, Clone)]
pub struct ConvertRule {
    pub from: String,
    pub to: String,
    regex: Regex,
}

impl ConvertRule {
    /// Build a rule. `from` is matched literally and case-insensitively.
    pub fn new(from: &str, to: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&regex::escape(from))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            from: from.into(),
            to: to.into(),
            regex,
        })
    }

    fn apply(&self, text: &str) -> String {
        self.regex
            .replace_all(text, NoExpand(&self.to))
            .into_owned()
    }
}

/// Apply every rule in order, each as a global substitution.
pub fn transform(body: &str, rules: &[ConvertRule]) -> String {
    let mut text = body.to_string();
    for rule in rules {
        // An empty pattern would match between every character.
        if rule.from.is_empty() {
            continue;
        }
        text = rule.apply(&text);
    }
    text
}

/// Convert the body, trim both parts, and build the outgoing message.
///
/// Returns `None` when the title or body is empty after trimming.
pub fn finalize(accepted: Accepted, rules: &[ConvertRule]) -> Option<OutgoingMessage> {
    let body = transform(&accepted.body, rules);
    let title = accepted.title.trim();
    let body = body.trim();

    if title.is_empty() || body.is_empty() {
        debug!(
            title_empty = title.is_empty(),
            body_empty = body.is_empty(),
            "Empty title or body after conversion, dropping"
        );
        return None;
    }

    Some(OutgoingMessage::new(title, body))
}
