//! Filter configuration: persisted layout and validated snapshot.
//!
//! `StoredSettings` mirrors what the settings store persists. It is read
//! field by field and rule lists are kept as loose JSON values, so one
//! malformed value or entry does not poison the whole document. `FilterConfig::from_settings` validates everything once,
//! compiles patterns, and reports each dropped entry as a `SettingsWarning`.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::filter::convert::ConvertRule;
use crate::filter::quiet_hours::QuietHours;
use crate::filter::types::FilterMode;

/// App filter value meaning "every app".
pub const WILDCARD_APP: &str = "-1";

/// App identifiers compare case-insensitively over all of Unicode, not just ASCII.
pub fn same_app(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

// ── Persisted layout ────────────────────────────────────────────────

/// Settings as persisted by the store. Every field has a default.
///
/// Deserialization never fails on a bad field value: the field keeps its
/// default and the problem is recorded in `load_warnings`. Only a document
/// that is not a JSON object is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Map<String, Value>")]
pub struct StoredSettings {
    pub mode: FilterMode,
    /// Comma-separated app identifiers.
    pub package_list: String,
    pub notifications_only: bool,
    pub no_ongoing: bool,
    pub fetch_extras: bool,
    /// When false, nothing is forwarded while the screen is on.
    pub notify_screen_on: bool,
    pub quiet_hours: bool,
    pub quiet_hours_before: String,
    pub quiet_hours_after: String,
    pub converts: Vec<Value>,
    pub ignores: Vec<Value>,
    pub pkg_renames: Vec<Value>,
    /// Fields that were present but unusable when the document was read.
    #[serde(skip)]
    pub load_warnings: Vec<SettingsWarning>,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            mode: FilterMode::Off,
            package_list: String::new(),
            notifications_only: true,
            no_ongoing: false,
            fetch_extras: false,
            notify_screen_on: true,
            quiet_hours: false,
            quiet_hours_before: "00:00".into(),
            quiet_hours_after: "23:59".into(),
            converts: Vec::new(),
            ignores: Vec::new(),
            pkg_renames: Vec::new(),
            load_warnings: Vec::new(),
        }
    }
}

impl From<serde_json::Map<String, Value>> for StoredSettings {
    fn from(doc: serde_json::Map<String, Value>) -> Self {
        let mut s = Self::default();
        let mut warnings = Vec::new();
        let w = &mut warnings;

        if let Some(v) = top_level(&doc, "mode", mode_value, w) {
            s.mode = v;
        }
        if let Some(v) = top_level(&doc, "package_list", string_value, w) {
            s.package_list = v;
        }
        if let Some(v) = top_level(&doc, "notifications_only", bool_value, w) {
            s.notifications_only = v;
        }
        if let Some(v) = top_level(&doc, "no_ongoing", bool_value, w) {
            s.no_ongoing = v;
        }
        if let Some(v) = top_level(&doc, "fetch_extras", bool_value, w) {
            s.fetch_extras = v;
        }
        if let Some(v) = top_level(&doc, "notify_screen_on", bool_value, w) {
            s.notify_screen_on = v;
        }
        if let Some(v) = top_level(&doc, "quiet_hours", bool_value, w) {
            s.quiet_hours = v;
        }
        if let Some(v) = top_level(&doc, "quiet_hours_before", string_value, w) {
            s.quiet_hours_before = v;
        }
        if let Some(v) = top_level(&doc, "quiet_hours_after", string_value, w) {
            s.quiet_hours_after = v;
        }
        if let Some(v) = top_level(&doc, "converts", list_value, w) {
            s.converts = v;
        }
        if let Some(v) = top_level(&doc, "ignores", list_value, w) {
            s.ignores = v;
        }
        if let Some(v) = top_level(&doc, "pkg_renames", list_value, w) {
            s.pkg_renames = v;
        }

        s.load_warnings = warnings;
        s
    }
}

/// Read one top-level field. Missing and `null` mean "use the default".
fn top_level<T>(
    doc: &serde_json::Map<String, Value>,
    key: &'static str,
    parse: fn(&Value) -> Result<T, String>,
    warnings: &mut Vec<SettingsWarning>,
) -> Option<T> {
    match doc.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => match parse(value) {
            Ok(v) => Some(v),
            Err(msg) => {
                warnings.push(SettingsWarning {
                    field: key,
                    index: None,
                    message: format!("{msg}; using default"),
                });
                None
            }
        },
    }
}

/// `"off"`/`"include"`/`"exclude"`, or the stored ordinal 0/1/2.
fn mode_value(value: &Value) -> Result<FilterMode, String> {
    let mode = match value {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Some(FilterMode::Off),
            "include" | "1" => Some(FilterMode::Include),
            "exclude" | "2" => Some(FilterMode::Exclude),
            _ => None,
        },
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(FilterMode::Off),
            Some(1) => Some(FilterMode::Include),
            Some(2) => Some(FilterMode::Exclude),
            _ => None,
        },
        _ => None,
    };
    mode.ok_or_else(|| format!("not a filter mode: {value}"))
}

/// A rule list, either inline or as a JSON array encoded in a string.
fn list_value(value: &Value) -> Result<Vec<Value>, String> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => Ok(items),
            _ => Err(format!("not a list: {value}")),
        },
        other => Err(format!("not a list: {other}")),
    }
}

/// A settings entry that was dropped during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsWarning {
    /// Settings field the entry belongs to.
    pub field: &'static str,
    /// Position in the list, for list fields.
    pub index: Option<usize>,
    pub message: String,
}

impl SettingsWarning {
    fn entry(field: &'static str, index: usize, message: impl Into<String>) -> Self {
        Self {
            field,
            index: Some(index),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SettingsWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]: {}", self.field, i, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

// ── Typed rules ─────────────────────────────────────────────────────

/// Renames an app's notifications to a fixed title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    pub from_app: String,
    pub to_title: String,
}

/// Which apps an ignore rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppFilter {
    Any,
    App(String),
}

impl AppFilter {
    pub fn parse(value: &str) -> Self {
        if value == WILDCARD_APP {
            Self::Any
        } else {
            Self::App(value.to_string())
        }
    }

    pub fn applies_to(&self, app_id: &str) -> bool {
        match self {
            Self::Any => true,
            Self::App(app) => same_app(app, app_id),
        }
    }
}

/// A content rule: excludes text that matches, or requires a match.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pub app_filter: AppFilter,
    /// Pattern as configured (before escaping).
    pub pattern: String,
    pub is_raw_regex: bool,
    pub case_insensitive: bool,
    /// true: reject on match. false: reject when there is no match.
    pub exclude_on_match: bool,
    regex: Regex,
}

impl IgnoreRule {
    /// Compile a rule. Non-raw patterns are matched literally.
    pub fn new(
        app_filter: AppFilter,
        pattern: &str,
        is_raw_regex: bool,
        case_insensitive: bool,
        exclude_on_match: bool,
    ) -> Result<Self, regex::Error> {
        let source = if is_raw_regex {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(Self {
            app_filter,
            pattern: pattern.into(),
            is_raw_regex,
            case_insensitive,
            exclude_on_match,
            regex,
        })
    }

    /// Whether the pattern occurs anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Immutable, validated filter configuration used for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub mode: FilterMode,
    pub package_list: Vec<String>,
    pub notifications_only: bool,
    pub no_ongoing: bool,
    pub screen_on_suppression: bool,
    pub quiet_hours: Option<QuietHours>,
    pub fetch_extra_text: bool,
    pub renames: Vec<RenameRule>,
    pub ignore_rules: Vec<IgnoreRule>,
    pub convert_rules: Vec<ConvertRule>,
}

impl FilterConfig {
    /// An empty configuration in the given mode (nothing else enabled).
    pub fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Validate persisted settings into a snapshot.
    ///
    /// Malformed entries are dropped and reported; the rest still apply.
    pub fn from_settings(settings: &StoredSettings) -> (Self, Vec<SettingsWarning>) {
        let mut warnings = settings.load_warnings.clone();

        let package_list = parse_package_list(&settings.package_list);

        let quiet_hours = if settings.quiet_hours {
            match QuietHours::parse(&settings.quiet_hours_before, &settings.quiet_hours_after) {
                Ok(q) => Some(q),
                Err(e) => {
                    warnings.push(SettingsWarning {
                        field: "quiet_hours",
                        index: None,
                        message: format!(
                            "invalid window '{}'-'{}': {e}; quiet hours disabled",
                            settings.quiet_hours_before, settings.quiet_hours_after
                        ),
                    });
                    None
                }
            }
        } else {
            None
        };

        let renames = settings
            .pkg_renames
            .iter()
            .enumerate()
            .filter_map(|(i, v)| match parse_rename(v) {
                Ok(rule) => Some(rule),
                Err(msg) => {
                    warnings.push(SettingsWarning::entry("pkg_renames", i, msg));
                    None
                }
            })
            .collect();

        let ignore_rules = settings
            .ignores
            .iter()
            .enumerate()
            .filter_map(|(i, v)| match parse_ignore(v) {
                Ok(rule) => Some(rule),
                Err(msg) => {
                    warnings.push(SettingsWarning::entry("ignores", i, msg));
                    None
                }
            })
            .collect();

        let convert_rules = settings
            .converts
            .iter()
            .enumerate()
            .filter_map(|(i, v)| match parse_convert(v) {
                Ok(rule) => Some(rule),
                Err(msg) => {
                    warnings.push(SettingsWarning::entry("converts", i, msg));
                    None
                }
            })
            .collect();

        let config = Self {
            mode: settings.mode,
            package_list,
            notifications_only: settings.notifications_only,
            no_ongoing: settings.no_ongoing,
            screen_on_suppression: !settings.notify_screen_on,
            quiet_hours,
            fetch_extra_text: settings.fetch_extras,
            renames,
            ignore_rules,
            convert_rules,
        };

        (config, warnings)
    }

    /// Like `from_settings`, logging each warning.
    pub fn from_settings_logged(settings: &StoredSettings) -> Self {
        let (config, warnings) = Self::from_settings(settings);
        for w in &warnings {
            warn!(entry = %w, "Skipping malformed settings entry");
        }
        config
    }

    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.package_list = packages
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.is_empty())
            .collect();
        self
    }

    pub fn with_rename(mut self, from_app: &str, to_title: &str) -> Self {
        self.renames.push(RenameRule {
            from_app: from_app.into(),
            to_title: to_title.into(),
        });
        self
    }

    pub fn with_ignore_rule(mut self, rule: IgnoreRule) -> Self {
        self.ignore_rules.push(rule);
        self
    }

    pub fn with_convert_rule(mut self, rule: ConvertRule) -> Self {
        self.convert_rules.push(rule);
        self
    }
}

/// Split a comma-separated package list, dropping blank entries.
pub fn parse_package_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ── Entry parsing ───────────────────────────────────────────────────

fn parse_rename(value: &Value) -> Result<RenameRule, String> {
    let obj = value.as_object().ok_or("entry is not an object")?;
    let from_app = string_field(obj, "pkg")?;
    let to_title = string_field(obj, "to")?;
    Ok(RenameRule { from_app, to_title })
}

fn parse_ignore(value: &Value) -> Result<IgnoreRule, String> {
    let obj = value.as_object().ok_or("entry is not an object")?;
    let app = string_field(obj, "app")?;
    let pattern = string_field(obj, "match")?;
    let raw = bool_field(obj, "raw")?.ok_or("missing field 'raw'")?;
    let case_insensitive = bool_field(obj, "insensitive")?.unwrap_or(true);
    let exclude = bool_field(obj, "exclude")?.unwrap_or(true);

    IgnoreRule::new(AppFilter::parse(&app), &pattern, raw, case_insensitive, exclude)
        .map_err(|e| format!("invalid pattern '{pattern}': {e}"))
}

fn parse_convert(value: &Value) -> Result<ConvertRule, String> {
    let obj = value.as_object().ok_or("entry is not an object")?;
    let from = string_field(obj, "from")?;
    let to = string_field(obj, "to")?;
    if from.is_empty() {
        return Err("empty 'from' text".into());
    }
    ConvertRule::new(&from, &to).map_err(|e| format!("invalid text '{from}': {e}"))
}

/// A string value; numbers are accepted and rendered as text.
fn string_value(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("not a string: {other}")),
    }
}

/// A boolean value; `"true"`/`"false"` strings are accepted.
fn bool_value(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(format!("not a boolean: {other}")),
    }
}

fn string_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<String, String> {
    match obj.get(key) {
        Some(value) => string_value(value).map_err(|e| format!("field '{key}' is {e}")),
        None => Err(format!("missing field '{key}'")),
    }
}

fn bool_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<Option<bool>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => bool_value(value)
            .map(Some)
            .map_err(|e| format!("field '{key}' is {e}")),
    }
}
