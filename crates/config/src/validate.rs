//! Configuration validation.
//!
//! Reports unknown or misspelled fields, unknown log formats, unparsable log
//! filters and type errors, without failing on the first problem.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use {serde_json::Value, tracing_subscriber::EnvFilter};

use crate::{
    env_subst::substitute_env,
    error::{Context, Result},
    loader::{find_config_file, parse_config},
    schema::{ChatterConfig, ConfigFormat, LogFormat},
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
            Self::Info => f.write_str("info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// One of "syntax", "unknown-field", "type-error", "logging", "bot".
    pub category: &'static str,
    /// Dotted path, e.g. "logging.format".
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{} at {}: {}", self.severity, self.path, self.message)
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

const TOP_LEVEL_KEYS: &[&str] = &["bot", "logging"];
const BOT_KEYS: &[&str] = &["name", "error_reply", "unhandled_reply"];
const LOGGING_KEYS: &[&str] = &["level", "format"];

fn section_keys(section: &str) -> Option<&'static [&'static str]> {
    match section {
        "bot" => Some(BOT_KEYS),
        "logging" => Some(LOGGING_KEYS),
        _ => None,
    }
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (candidate, levenshtein(needle, candidate)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(candidate, _)| candidate)
}

fn unknown_field(path: String, key: &str, known: &[&str]) -> Diagnostic {
    let message = match suggest(key, known, 3) {
        Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
        None => "unknown field".to_string(),
    };
    Diagnostic::new(Severity::Error, "unknown-field", path, message)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or the discovered one when
/// `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let Some(path) = path.map(Path::to_path_buf).or_else(find_config_file) else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "syntax",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match read_and_validate(&path) {
        Ok(result) => result,
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                e.to_string(),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(path);
    result
}

fn read_and_validate(path: &Path) -> Result<ValidationResult> {
    let format = ConfigFormat::from_path(path)?;
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    Ok(validate_str(&substitute_env(&raw), format))
}

/// Validate config text without touching the file system.
#[must_use]
pub fn validate_str(raw: &str, format: ConfigFormat) -> ValidationResult {
    let mut result = ValidationResult::default();

    // 1. Syntax
    let value = match to_value(raw, format) {
        Ok(value) => value,
        Err(message) => {
            result.push(Diagnostic::new(Severity::Error, "syntax", "", message));
            return result;
        },
    };

    // 2. Unknown fields
    check_unknown_fields(&value, &mut result);

    // 3. Logging values, reported with suggestions before the type check
    check_logging(&value, &mut result);

    // 4. Type check
    match parse_config(raw, format) {
        Ok(config) => check_bot(&config, &mut result),
        Err(e) if !result.has_errors() => {
            result.push(Diagnostic::new(
                Severity::Error,
                "type-error",
                "",
                format!("type error: {e}"),
            ));
        },
        Err(_) => {},
    }

    result
}

fn to_value(raw: &str, format: ConfigFormat) -> std::result::Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    match format {
        ConfigFormat::Toml => toml::from_str::<toml::Value>(raw)
            .map_err(|e| format!("TOML syntax error: {e}"))
            .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        ConfigFormat::Yaml => serde_yaml::from_str::<serde_yaml::Value>(raw)
            .map_err(|e| format!("YAML syntax error: {e}"))
            .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        ConfigFormat::Json => {
            serde_json::from_str(raw).map_err(|e| format!("JSON syntax error: {e}"))
        },
    }
}

fn check_unknown_fields(value: &Value, result: &mut ValidationResult) {
    let Some(root) = value.as_object() else {
        result.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            "config root must be a table",
        ));
        return;
    };
    for (section, body) in root {
        let Some(known) = section_keys(section) else {
            result.push(unknown_field(section.clone(), section, TOP_LEVEL_KEYS));
            continue;
        };
        let Some(body) = body.as_object() else {
            continue;
        };
        for key in body.keys() {
            if !known.contains(&key.as_str()) {
                result.push(unknown_field(format!("{section}.{key}"), key, known));
            }
        }
    }
}

fn check_logging(value: &Value, result: &mut ValidationResult) {
    let Some(logging) = value.get("logging") else {
        return;
    };

    if let Some(format) = logging.get("format").and_then(Value::as_str)
        && format.parse::<LogFormat>().is_err()
    {
        let message = match suggest(&format.to_ascii_lowercase(), LogFormat::NAMES, 3) {
            Some(s) => format!("unknown log format \"{format}\" (did you mean \"{s}\"?)"),
            None => format!(
                "unknown log format \"{format}\" (expected one of: {})",
                LogFormat::NAMES.join(", ")
            ),
        };
        result.push(Diagnostic::new(
            Severity::Error,
            "logging",
            "logging.format",
            message,
        ));
    }

    if let Some(level) = logging.get("level").and_then(Value::as_str)
        && let Err(e) = EnvFilter::try_new(level)
    {
        result.push(Diagnostic::new(
            Severity::Error,
            "logging",
            "logging.level",
            format!("invalid log filter: {e}"),
        ));
    }
}

fn check_bot(config: &ChatterConfig, result: &mut ValidationResult) {
    let replies = [
        ("bot.error_reply", &config.bot.error_reply),
        ("bot.unhandled_reply", &config.bot.unhandled_reply),
    ];
    for (path, reply) in replies {
        if reply.as_deref().is_some_and(|r| r.trim().is_empty()) {
            result.push(Diagnostic::new(
                Severity::Warning,
                "bot",
                path,
                "blank reply is never delivered; remove it to disable the reply",
            ));
        }
    }
}
