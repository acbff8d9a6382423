//! Rule engine: decides whether an event is forwarded.
//!
//! Stages run in a fixed order and short-circuit on the first rejection:
//! - mode off, screen-on suppression, quiet hours
//! - notifications-only, no-ongoing
//! - package include/exclude list
//! - title resolution (renames → host label → app id)
//! - body assembly (+ optional extra text)
//! - ignore rules over the assembled body
//!
//! The engine holds no state besides its host collaborators; the
//! configuration snapshot is passed in per evaluation.

use std::sync::Arc;

use tracing::debug;

use crate::filter::settings::{FilterConfig, same_app};
use crate::filter::types::{Accepted, Decision, EvaluationContext, FilterMode, NotificationEvent, RejectReason};
use crate::host::{LabelResolver, TextExtractor};

/// Rule engine bound to the host's label and text-extraction services.
pub struct RulesEngine {
    labels: Arc<dyn LabelResolver>,
    extractor: Arc<dyn TextExtractor>,
}

impl RulesEngine {
    pub fn new(labels: Arc<dyn LabelResolver>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self { labels, extractor }
    }

    /// Evaluate one event against a configuration snapshot.
    pub fn evaluate(
        &self,
        event: &NotificationEvent,
        config: &FilterConfig,
        ctx: &EvaluationContext,
    ) -> Decision {
        let app = event.source_app_id.as_str();

        if let Some(reason) = check_gates(event, config, ctx) {
            debug!(app = %app, reason = %reason, "Event rejected");
            return Decision::Reject(reason);
        }

        let title = self.resolve_title(app, config);
        let body = self.assemble_body(event, config);

        for rule in &config.ignore_rules {
            if !rule.app_filter.applies_to(app) {
                continue;
            }

            let found = rule.is_match(&body);
            let reason = match (found, rule.exclude_on_match) {
                (true, true) => RejectReason::IgnoreMatched {
                    pattern: rule.pattern.clone(),
                },
                (false, false) => RejectReason::IncludeUnmatched {
                    pattern: rule.pattern.clone(),
                },
                _ => continue,
            };
            debug!(app = %app, reason = %reason, "Event rejected by ignore rule");
            return Decision::Reject(reason);
        }

        debug!(app = %app, title = %title, "Event accepted");
        Decision::Accept(Accepted { title, body })
    }

    /// First matching rename, else the host label, else the app id.
    fn resolve_title(&self, app: &str, config: &FilterConfig) -> String {
        if let Some(rename) = config
            .renames
            .iter()
            .find(|r| same_app(&r.from_app, app))
        {
            return rename.to_title.clone();
        }

        self.labels.resolve_label(app).unwrap_or_else(|| {
            debug!(app = %app, "No label for app, using app id as title");
            app.to_string()
        })
    }

    fn assemble_body(&self, event: &NotificationEvent, config: &FilterConfig) -> String {
        let mut body = strip_brackets(&event.raw_text.join(", ")).to_string();

        if config.fetch_extra_text {
            // Host-supplied text is appended even when empty; extractor output only when found.
            let extra = match (&event.extra_text, &event.layout) {
                (Some(text), _) => Some(text.clone()),
                (None, Some(layout)) => {
                    Some(self.extractor.extract(layout, body.trim())).filter(|t| !t.is_empty())
                }
                (None, None) => None,
            };
            if let Some(extra) = extra {
                body.push('\n');
                body.push_str(&extra);
            }
        }

        body
    }
}

/// Stages 1–6: everything decided before any text is looked at.
fn check_gates(
    event: &NotificationEvent,
    config: &FilterConfig,
    ctx: &EvaluationContext,
) -> Option<RejectReason> {
    if config.mode == FilterMode::Off {
        return Some(RejectReason::ModeOff);
    }
    if ctx.screen_suppressed {
        return Some(RejectReason::ScreenOn);
    }
    if ctx.quiet_now {
        return Some(RejectReason::QuietHours);
    }
    if config.notifications_only && !event.is_notification {
        return Some(RejectReason::NotANotification);
    }
    if config.no_ongoing && event.is_notification && event.is_ongoing {
        return Some(RejectReason::Ongoing);
    }

    let app = &event.source_app_id;
    let listed = config
        .package_list
        .iter()
        .any(|p| !p.is_empty() && same_app(p, app));

    match config.mode {
        FilterMode::Exclude if listed => Some(RejectReason::Excluded { app: app.clone() }),
        FilterMode::Include if !listed => Some(RejectReason::NotIncluded { app: app.clone() }),
        _ => None,
    }
}

/// Remove one leading `[` and one trailing `]` when present.
fn strip_brackets(text: &str) -> &str {
    let text = text.strip_prefix('[').unwrap_or(text);
    text.strip_suffix(']').unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::convert::ConvertRule;
    use crate::filter::settings::{AppFilter, IgnoreRule};
    use crate::host::{LayoutNode, NoExtraText, NotificationLayout, StaticLabels, TextRole, ViewTreeExtractor};

    fn engine() -> RulesEngine {
        let labels = StaticLabels::new().with("com.mail", "Mail");
        RulesEngine::new(Arc::new(labels), Arc::new(ViewTreeExtractor))
    }

    fn exclude(packages: &[&str]) -> FilterConfig {
        FilterConfig::new(FilterMode::Exclude).with_packages(packages.iter().copied())
    }

    fn include(packages: &[&str]) -> FilterConfig {
        FilterConfig::new(FilterMode::Include).with_packages(packages.iter().copied())
    }

    fn literal(pattern: &str, exclude: bool) -> IgnoreRule {
        IgnoreRule::new(AppFilter::Any, pattern, false, true, exclude).unwrap()
    }

    fn eval(config: &FilterConfig, event: &NotificationEvent) -> Decision {
        engine().evaluate(event, config, &EvaluationContext::default())
    }

    fn accepted(decision: Decision) -> Accepted {
        match decision {
            Decision::Accept(a) => a,
            other => panic!("Expected Accept, got {:?}", other),
        }
    }

    fn rejected(decision: Decision) -> RejectReason {
        match decision {
            Decision::Reject(r) => r,
            other => panic!("Expected Reject, got {:?}", other),
        }
    }

    #[test]
    fn mode_off_always_rejects() {
        let config = FilterConfig::new(FilterMode::Off);
        for app in ["com.mail", "", "com.anything"] {
            let event = NotificationEvent::new(app, "hello");
            assert_eq!(rejected(eval(&config, &event)), RejectReason::ModeOff);
        }
    }

    #[test]
    fn gates_run_in_order() {
        let config = exclude(&[]);
        let event = NotificationEvent::new("com.mail", "hello");
        let ctx = EvaluationContext {
            screen_suppressed: true,
            quiet_now: true,
        };
        assert_eq!(
            rejected(engine().evaluate(&event, &config, &ctx)),
            RejectReason::ScreenOn
        );

        let ctx = EvaluationContext {
            screen_suppressed: false,
            quiet_now: true,
        };
        assert_eq!(
            rejected(engine().evaluate(&event, &config, &ctx)),
            RejectReason::QuietHours
        );
    }

    #[test]
    fn notifications_only_rejects_other_events() {
        let mut config = exclude(&[]);
        config.notifications_only = true;
        let mut event = NotificationEvent::new("com.mail", "toast");
        event.is_notification = false;
        assert_eq!(rejected(eval(&config, &event)), RejectReason::NotANotification);

        config.notifications_only = false;
        assert!(eval(&config, &event).is_accept());
    }

    #[test]
    fn no_ongoing_only_applies_to_notifications() {
        let mut config = exclude(&[]);
        config.no_ongoing = true;

        let mut event = NotificationEvent::new("com.music", "Now playing");
        event.is_ongoing = true;
        assert_eq!(rejected(eval(&config, &event)), RejectReason::Ongoing);

        event.is_notification = false;
        assert!(eval(&config, &event).is_accept());
    }

    #[test]
    fn exclude_list_matches_case_insensitively() {
        let config = exclude(&["com.Spam", "com.ads"]);
        let event = NotificationEvent::new("COM.SPAM", "buy now");
        assert_eq!(
            rejected(eval(&config, &event)),
            RejectReason::Excluded { app: "COM.SPAM".into() }
        );

        let event = NotificationEvent::new("com.mail", "hello");
        assert!(eval(&config, &event).is_accept());
    }

    #[test]
    fn include_list_requires_a_match() {
        let config = include(&["com.mail"]);
        assert!(eval(&config, &NotificationEvent::new("Com.Mail", "hi")).is_accept());
        assert_eq!(
            rejected(eval(&config, &NotificationEvent::new("com.chat", "hi"))),
            RejectReason::NotIncluded { app: "com.chat".into() }
        );
    }

    #[test]
    fn empty_package_entries_never_match() {
        let mut config = include(&[]);
        config.package_list = vec![String::new()];
        let event = NotificationEvent::new("", "hi");
        assert!(matches!(
            rejected(eval(&config, &event)),
            RejectReason::NotIncluded { .. }
        ));

        let mut config = exclude(&[]);
        config.package_list = vec![String::new()];
        assert!(eval(&config, &event).is_accept());
    }

    #[test]
    fn first_matching_rename_wins() {
        let config = exclude(&[])
            .with_rename("com.other", "Other")
            .with_rename("COM.CHAT", "First")
            .with_rename("com.chat", "Second");
        let a = accepted(eval(&config, &NotificationEvent::new("com.chat", "hi")));
        assert_eq!(a.title, "First");
    }

    #[test]
    fn title_falls_back_to_label_then_app_id() {
        let config = exclude(&[]);
        let a = accepted(eval(&config, &NotificationEvent::new("com.mail", "hi")));
        assert_eq!(a.title, "Mail");

        let a = accepted(eval(&config, &NotificationEvent::new("com.unknown", "hi")));
        assert_eq!(a.title, "com.unknown");
    }

    #[test]
    fn body_joins_lines_and_strips_brackets() {
        let config = exclude(&[]);
        let mut event = NotificationEvent::new("com.mail", "[Alice");
        event.raw_text.push("lunch?]".into());
        let a = accepted(eval(&config, &event));
        assert_eq!(a.body, "Alice, lunch?");
    }

    #[test]
    fn short_bracket_text_degrades_to_empty() {
        assert_eq!(strip_brackets("["), "");
        assert_eq!(strip_brackets("]"), "");
        assert_eq!(strip_brackets("[]"), "");
        assert_eq!(strip_brackets("x"), "x");
        assert_eq!(strip_brackets("[x]"), "x");
    }

    #[test]
    fn extra_text_appended_when_enabled() {
        let mut config = exclude(&[]);
        let mut event = NotificationEvent::new("com.mail", "New mail");
        event.extra_text = Some("from Bob".into());

        assert_eq!(accepted(eval(&config, &event)).body, "New mail");

        config.fetch_extra_text = true;
        assert_eq!(accepted(eval(&config, &event)).body, "New mail\nfrom Bob");
    }

    #[test]
    fn empty_extra_text_still_adds_line_break() {
        let mut config = exclude(&[]).with_ignore_rule(
            IgnoreRule::new(AppFilter::Any, r"\n$", true, true, true).unwrap(),
        );
        config.fetch_extra_text = true;
        let mut event = NotificationEvent::new("com.mail", "New mail");
        event.extra_text = Some(String::new());
        assert!(matches!(
            rejected(eval(&config, &event)),
            RejectReason::IgnoreMatched { .. }
        ));

        event.extra_text = None;
        assert_eq!(accepted(eval(&config, &event)).body, "New mail");
    }

    #[test]
    fn package_and_rename_matching_fold_unicode_case() {
        let config = exclude(&["com.ÄPP"]).with_rename("com.ÉCHO", "Echo");
        assert_eq!(
            rejected(eval(&config, &NotificationEvent::new("com.äpp", "hi"))),
            RejectReason::Excluded { app: "com.äpp".into() }
        );
        assert_eq!(
            accepted(eval(&config, &NotificationEvent::new("com.écho", "hi"))).title,
            "Echo"
        );
    }

    #[test]
    fn extra_text_extracted_from_layout() {
        let mut config = exclude(&[]);
        config.fetch_extra_text = true;

        let mut event = NotificationEvent::new("com.mail", "New mail");
        event.layout = Some(NotificationLayout {
            expanded: Some(LayoutNode::Group {
                children: vec![
                    LayoutNode::Text { text: "New mail".into(), role: TextRole::Body },
                    LayoutNode::Text { text: "Lunch at noon".into(), role: TextRole::Body },
                ],
            }),
            collapsed: None,
        });
        assert_eq!(accepted(eval(&config, &event)).body, "New mail\nLunch at noon\n");

        let quiet = RulesEngine::new(Arc::new(StaticLabels::new()), Arc::new(NoExtraText));
        let a = accepted(quiet.evaluate(&event, &config, &EvaluationContext::default()));
        assert_eq!(a.body, "New mail");
    }

    #[test]
    fn exclude_rule_rejects_literal_match() {
        let config = exclude(&[]).with_ignore_rule(literal("foo", true));
        assert_eq!(
            rejected(eval(&config, &NotificationEvent::new("com.mail", "Foo Bar"))),
            RejectReason::IgnoreMatched { pattern: "foo".into() }
        );
        assert!(eval(&config, &NotificationEvent::new("com.mail", "baz")).is_accept());
    }

    #[test]
    fn include_rule_rejects_when_missing() {
        let config = exclude(&[]).with_ignore_rule(literal("urgent", false));
        assert!(eval(&config, &NotificationEvent::new("com.mail", "URGENT: call")).is_accept());
        assert_eq!(
            rejected(eval(&config, &NotificationEvent::new("com.mail", "lunch"))),
            RejectReason::IncludeUnmatched { pattern: "urgent".into() }
        );
    }

    #[test]
    fn raw_regex_rules() {
        let rule = IgnoreRule::new(AppFilter::Any, r"^\d{6} is your code$", true, true, true).unwrap();
        let config = exclude(&[]).with_ignore_rule(rule);
        assert!(!eval(&config, &NotificationEvent::new("com.sms", "123456 is your code")).is_accept());
        assert!(eval(&config, &NotificationEvent::new("com.sms", "call me")).is_accept());
    }

    #[test]
    fn ignore_rules_scoped_to_app() {
        let rule = IgnoreRule::new(AppFilter::parse("com.Chat"), "spam", false, true, true).unwrap();
        let config = exclude(&[]).with_ignore_rule(rule);
        assert!(!eval(&config, &NotificationEvent::new("com.chat", "spam")).is_accept());
        assert!(eval(&config, &NotificationEvent::new("com.mail", "spam")).is_accept());
    }

    #[test]
    fn ignore_rules_see_extra_text() {
        let mut config = exclude(&[]).with_ignore_rule(literal("promo", true));
        config.fetch_extra_text = true;
        let mut event = NotificationEvent::new("com.mail", "New mail");
        event.extra_text = Some("PROMO inside".into());
        assert!(!eval(&config, &event).is_accept());
    }

    #[test]
    fn convert_rules_do_not_affect_decision() {
        let config = exclude(&[]).with_convert_rule(ConvertRule::new("hi", "hello").unwrap());
        let a = accepted(eval(&config, &NotificationEvent::new("com.mail", "Hi there")));
        assert_eq!(a.body, "Hi there");
    }
}
