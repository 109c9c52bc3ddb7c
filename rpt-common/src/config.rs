//! Configuration loading and database path resolution
//!
//! The TOML file is bootstrap-only: database location, bind address, log level
//! and the employee names seeded on start (the receiving staff by default). A missing or unreadable file
//! is never fatal; defaults are used and a warning is logged.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable overriding the database path
pub const DATABASE_ENV_VAR: &str = "RPT_DATABASE";

/// Database file name inside the platform data directory
pub const DATABASE_FILE_NAME: &str = "receiving_problems.db";

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5740";

/// Receiving staff seeded when the config file does not list any
pub const DEFAULT_SEED_EMPLOYEES: &[&str] = &[
    "Joey Quayle",
    "Izzy Price",
    "Montana Marsh",
    "Scott Frank",
    "Andie Dunsmore",
    "Jay Lobos",
    "Randi Robertson",
    "Yesenia Alcala Villa",
];

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// SQLite database file; resolved by `resolve_database_path` when absent
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Employee names inserted (idempotently) at startup; `[]` disables seeding
    #[serde(default = "default_seed_employees")]
    pub seed_employees: Vec<String>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            bind_address: default_bind_address(),
            log_level: default_log_level(),
            seed_employees: default_seed_employees(),
        }
    }
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_seed_employees() -> Vec<String> {
    DEFAULT_SEED_EMPLOYEES.iter().map(|name| name.to_string()).collect()
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Read and parse the file at `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Where the loaded configuration came from
#[derive(Debug)]
pub enum ConfigSource {
    File(PathBuf),
    /// No config file exists
    Defaults,
    /// A file exists but could not be read or parsed; defaults were used
    Unreadable(PathBuf, Error),
}

impl ConfigSource {
    /// Report the outcome; called once logging is installed
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!(path = %path.display(), "Loaded config file"),
            ConfigSource::Defaults => warn!("No config file found, using defaults"),
            ConfigSource::Unreadable(path, e) => warn!(
                path = %path.display(),
                error = %e,
                "Failed to load config file, using defaults"
            ),
        }
    }
}

/// Load from `explicit` if given, else the first platform config file found
///
/// Never fails: a missing or broken file yields defaults.
pub fn load(explicit: Option<&Path>) -> (TomlConfig, ConfigSource) {
    let path = match explicit.map(Path::to_path_buf).or_else(find_config_file) {
        Some(path) => path,
        None => return (TomlConfig::default(), ConfigSource::Defaults),
    };

    match TomlConfig::load_from(&path) {
        Ok(config) => (config, ConfigSource::File(path)),
        Err(e) => (TomlConfig::default(), ConfigSource::Unreadable(path, e)),
    }
}

/// Database path resolution, highest priority first:
/// 1. Command-line argument
/// 2. `RPT_DATABASE` environment variable
/// 3. `database_path` in the TOML config
/// 4. OS-dependent default
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.database_path {
        return path.clone();
    }

    default_database_path()
}

/// First existing config file: `~/.config/rpt/config.toml`, then `/etc/rpt/config.toml`
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("rpt").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/rpt/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    let data_dir = if cfg!(target_os = "macos") {
        dirs::data_dir()
    } else {
        dirs::data_local_dir()
    };

    data_dir
        .map(|d| d.join("rpt"))
        .unwrap_or_else(|| PathBuf::from("./rpt_data"))
        .join(DATABASE_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_parse_full_config() {
        let config = TomlConfig::from_toml_str(
            r#"
            database_path = "/srv/rpt/problems.db"
            bind_address = "0.0.0.0:8080"
            log_level = "debug"
            seed_employees = ["Montana Marsh", "Jay Lehman"]
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/srv/rpt/problems.db")));
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.seed_employees.len(), 2);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.seed_employees.len(), DEFAULT_SEED_EMPLOYEES.len());
        assert!(config.seed_employees.iter().any(|name| name == "Montana Marsh"));
    }

    #[test]
    fn test_empty_seed_list_disables_seeding() {
        let config = TomlConfig::from_toml_str("seed_employees = []").unwrap();
        assert!(config.seed_employees.is_empty());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("log_level = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unreadable_explicit_file_falls_back_to_defaults() {
        let (config, source) = load(Some(Path::new("/nonexistent/rpt/config.toml")));
        assert_eq!(config, TomlConfig::default());
        assert!(matches!(source, ConfigSource::Unreadable(_, Error::Io(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"warn\"\n").unwrap();

        let (config, source) = load(Some(&path));
        assert_eq!(config.log_level, "warn");
        assert!(matches!(source, ConfigSource::File(p) if p == path));
    }

    #[test]
    #[serial]
    fn test_cli_beats_env_and_config() {
        env::set_var(DATABASE_ENV_VAR, "/tmp/from-env.db");
        let config = TomlConfig {
            database_path: Some(PathBuf::from("/tmp/from-toml.db")),
            ..Default::default()
        };

        let path = resolve_database_path(Some(Path::new("/tmp/from-cli.db")), &config);
        env::remove_var(DATABASE_ENV_VAR);

        assert_eq!(path, PathBuf::from("/tmp/from-cli.db"));
    }

    #[test]
    #[serial]
    fn test_env_beats_config() {
        env::set_var(DATABASE_ENV_VAR, "/tmp/from-env.db");
        let config = TomlConfig {
            database_path: Some(PathBuf::from("/tmp/from-toml.db")),
            ..Default::default()
        };

        let path = resolve_database_path(None, &config);
        env::remove_var(DATABASE_ENV_VAR);

        assert_eq!(path, PathBuf::from("/tmp/from-env.db"));
    }

    #[test]
    #[serial]
    fn test_config_then_default() {
        env::remove_var(DATABASE_ENV_VAR);
        let config = TomlConfig {
            database_path: Some(PathBuf::from("/tmp/from-toml.db")),
            ..Default::default()
        };

        assert_eq!(resolve_database_path(None, &config), PathBuf::from("/tmp/from-toml.db"));

        let fallback = resolve_database_path(None, &TomlConfig::default());
        assert_eq!(fallback, default_database_path());
        assert!(fallback.ends_with(DATABASE_FILE_NAME));
    }
}
