//! Runtime configuration.
//!
//! Values are resolved with priority: environment > `flashdeck.toml` > default.
//! A `.env` file is loaded first if present.
//!
//! ## Environment Variables
//!
//! - `FLASHDECK_DB`: SQLite file holding saved lists (default: "flashdeck.db")
//! - `FLASHDECK_MODEL`: chat model name (default: "gpt-3.5-turbo")
//! - `FLASHDECK_API_BASE`: completion API base URL
//! - `OPENAI_API_KEY`: credential for the completion API (env only)

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "flashdeck.toml";
pub const DEFAULT_DB_PATH: &str = "flashdeck.db";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database: Option<DatabaseSection>,
    ai: Option<AiSection>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AiSection {
    model: Option<String>,
    api_base: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load `.env`, then `flashdeck.toml` from the working directory, then
    /// apply environment overrides
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::load_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
    }

    /// Resolve configuration from an optional file and a variable lookup
    pub fn load_from(file: &Path, env: impl Fn(&str) -> Option<String>) -> Self {
        let file_config = match std::fs::read_to_string(file) {
            Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
                Ok(parsed) => {
                    log::info!("Using configuration from {}", file.display());
                    parsed
                }
                Err(e) => {
                    log::warn!("Ignoring invalid {}: {}", file.display(), e);
                    FileConfig::default()
                }
            },
            Err(_) => FileConfig::default(),
        };

        let database = file_config.database.unwrap_or_default();
        let ai = file_config.ai.unwrap_or_default();
        let defaults = Config::default();
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Config {
            database_path: env("FLASHDECK_DB")
                .or(database.path)
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            api_key: env("OPENAI_API_KEY"),
            model: env("FLASHDECK_MODEL").or(ai.model).unwrap_or(defaults.model),
            api_base: env("FLASHDECK_API_BASE").or(ai.api_base).unwrap_or(defaults.api_base),
            request_timeout: ai
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = Config::load_from(Path::new("does-not-exist.toml"), lookup(&[]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn file_values_then_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[database]\npath = \"lists.db\"\n\n[ai]\nmodel = \"gpt-4o-mini\"\ntimeout_secs = 5\n",
        )
        .unwrap();

        let config = Config::load_from(&path, lookup(&[]));
        assert_eq!(config.database_path, PathBuf::from("lists.db"));
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.request_timeout, Duration::from_secs(5));

        let config = Config::load_from(
            &path,
            lookup(&[
                ("FLASHDECK_MODEL", "local-model"),
                ("OPENAI_API_KEY", "sk-test"),
                ("FLASHDECK_DB", " "),
            ]),
        );
        assert_eq!(config.model, "local-model");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.database_path, PathBuf::from("lists.db"));
    }

    #[test]
    fn invalid_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[ai\nmodel = ").unwrap();
        assert_eq!(Config::load_from(&path, lookup(&[])), Config::default());
    }
}
