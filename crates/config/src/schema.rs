//! Config schema types.

use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatterConfig {
    pub bot: BotConfig,
    pub logging: LoggingConfig,
}

/// Settings read by the bot glue around the router.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Display name, used in log fields only.
    pub name: Option<String>,
    /// Delivered when a handler fails. Nothing is sent when unset.
    pub error_reply: Option<String>,
    /// Delivered when no handler takes the message. Nothing is sent when unset.
    pub unhandled_reply: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `chatter_handlers=debug,info`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::default(),
        }
    }
}

/// Supported log output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single line output.
    #[default]
    Compact,
    /// Structured JSON, one object per event.
    Json,
}

impl LogFormat {
    pub const NAMES: &'static [&'static str] = &["compact", "json"];
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compact => f.write_str("compact"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(Error::message(format!("unknown log format: {other}"))),
        }
    }
}

/// On-disk syntax of a config file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Files without an extension are read as TOML.
    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        match ext {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn defaults_are_quiet() {
        let config = ChatterConfig::default();
        assert_eq!(config.bot, BotConfig::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[rstest]
    #[case("compact", LogFormat::Compact)]
    #[case("JSON", LogFormat::Json)]
    fn log_format_parses_case_insensitively(#[case] input: &str, #[case] expected: LogFormat) {
        assert_eq!(input.parse::<LogFormat>().unwrap(), expected);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let err = "pretty".parse::<LogFormat>().unwrap_err();
        assert!(err.to_string().contains("pretty"));
    }

    #[rstest]
    #[case("chatter.toml", ConfigFormat::Toml)]
    #[case("chatter.yaml", ConfigFormat::Yaml)]
    #[case("chatter.yml", ConfigFormat::Yaml)]
    #[case("chatter.json", ConfigFormat::Json)]
    #[case("chatter", ConfigFormat::Toml)]
    fn format_follows_extension(#[case] path: &str, #[case] expected: ConfigFormat) {
        assert_eq!(ConfigFormat::from_path(Path::new(path)).unwrap(), expected);
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        assert!(matches!(
            ConfigFormat::from_path(Path::new("chatter.ini")),
            Err(Error::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }
}
