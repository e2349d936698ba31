use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::{ChatterConfig, ConfigFormat},
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chatter.toml",
    "chatter.yaml",
    "chatter.yml",
    "chatter.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ChatterConfig> {
    let format = ConfigFormat::from_path(path)?;
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), format)
}

/// Parse already-substituted config text.
pub fn parse_config(raw: &str, format: ConfigFormat) -> Result<ChatterConfig> {
    match format {
        ConfigFormat::Toml => Ok(toml::from_str(raw)?),
        ConfigFormat::Yaml => {
            // An empty YAML document is null, not an empty mapping.
            if raw.trim().is_empty() {
                return Ok(ChatterConfig::default());
            }
            Ok(serde_yaml::from_str(raw)?)
        },
        ConfigFormat::Json => Ok(serde_json::from_str(raw)?),
    }
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chatter.{toml,yaml,yml,json}` (project-local)
/// 2. `<user config dir>/chatter.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ChatterConfig::default()` if no config file is found or the one
/// found cannot be loaded.
pub fn discover_and_load() -> ChatterConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return ChatterConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            ChatterConfig::default()
        },
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    find_config_in(Path::new(".")).or_else(|| config_dir().and_then(|dir| find_config_in(&dir)))
}

/// First standard config file name present in `dir`.
pub fn find_config_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Returns the user-global config directory (`~/.config/chatter/` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatter").map(|d| d.config_dir().to_path_buf())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::LogFormat};

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "chatter.toml",
            r#"
[bot]
name = "timer"
unhandled_reply = "Sorry, I didn't get that."

[logging]
level = "debug"
format = "json"
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.bot.name.as_deref(), Some("timer"));
        assert_eq!(
            config.bot.unhandled_reply.as_deref(),
            Some("Sorry, I didn't get that.")
        );
        assert_eq!(config.bot.error_reply, None);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = write(
            dir.path(),
            "chatter.yml",
            "bot:\n  error_reply: \"Oops\"\nlogging:\n  format: compact\n",
        );
        let config = load_config(&yaml).unwrap();
        assert_eq!(config.bot.error_reply.as_deref(), Some("Oops"));
        assert_eq!(config.logging.format, LogFormat::Compact);

        let json = write(dir.path(), "chatter.json", r#"{"bot": {"name": "slack"}}"#);
        let config = load_config(&json).unwrap();
        assert_eq!(config.bot.name.as_deref(), Some("slack"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn empty_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["chatter.toml", "chatter.yaml"] {
            let path = write(dir.path(), name, "");
            assert_eq!(load_config(&path).unwrap(), ChatterConfig::default());
        }
    }

    #[test]
    fn unknown_log_format_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "chatter.toml", "[logging]\nformat = \"pretty\"\n");
        assert!(matches!(load_config(&path), Err(Error::Toml(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatter.toml");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert!(err.to_string().contains("chatter.toml"));
    }

    #[test]
    fn env_placeholders_are_substituted_before_parsing() {
        let raw = substitute_env("[bot]\nname = \"${CHATTER_LOADER_UNSET:-fallback}\"\n");
        let config = parse_config(&raw, ConfigFormat::Toml).unwrap();
        assert_eq!(config.bot.name.as_deref(), Some("fallback"));
    }

    #[test]
    fn discovery_prefers_toml_over_other_formats() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_config_in(dir.path()), None);
        write(dir.path(), "chatter.json", "{}");
        assert_eq!(
            find_config_in(dir.path()),
            Some(dir.path().join("chatter.json"))
        );
        write(dir.path(), "chatter.toml", "");
        assert_eq!(
            find_config_in(dir.path()),
            Some(dir.path().join("chatter.toml"))
        );
    }
}
