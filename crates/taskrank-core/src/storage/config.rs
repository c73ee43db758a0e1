//! TOML-based service configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables:
//! - `PORT`: listening port
//! - `TASKRANK_HOST`: listening address
//! - `TASKRANK_DATA_FILE`: task file location
//! - `TASKRANK_CONFIG`: config file used when none is passed explicitly

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::default_data_file;
use crate::error::{ConfigError, Result};

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Task file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Task file; `None` means `<data dir>/tasks.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

/// Service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Parse a TOML document; `path` is only used in error messages.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read a TOML file. A missing file is an error: it was asked for by name.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Resolve the effective configuration from all layers.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`](crate::CoreError::Config) if the named
    /// config file cannot be read or parsed, or if an environment override
    /// holds an invalid value.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os("TASKRANK_CONFIG").map(PathBuf::from);
        let mut cfg = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Apply environment-style overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".into(),
                message: format!("'{port}' is not a port number"),
            })?;
        }
        if let Some(host) = lookup("TASKRANK_HOST").filter(|v| !v.is_empty()) {
            self.server.host = host;
        }
        if let Some(file) = lookup("TASKRANK_DATA_FILE").filter(|v| !v.is_empty()) {
            self.storage.data_file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    /// Task file location after defaults are applied.
    pub fn data_file(&self) -> PathBuf {
        self.storage
            .data_file
            .clone()
            .unwrap_or_else(default_data_file)
    }

    /// The effective view: every default filled in, as `config show` prints it.
    pub fn resolved(&self) -> Self {
        let mut cfg = self.clone();
        cfg.storage.data_file = Some(self.data_file());
        cfg
    }

    /// `host:port` for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get an effective config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        let json = serde_json::to_value(self.resolved()).ok()?;
        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        match current {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.listen_addr(), "0.0.0.0:8080");
        assert!(cfg.data_file().ends_with("tasks.json"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = Config::from_toml_str("[server]\nport = 9000\n", Path::new("t.toml")).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert!(cfg.storage.data_file.is_none());
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let err = Config::from_toml_str("[server\nport = ", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn missing_named_file_is_an_error() {
        let err = Config::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = Config::from_toml_str(
            "[server]\nport = 9000\n[storage]\ndata_file = \"/srv/a.json\"\n",
            Path::new("t.toml"),
        )
        .unwrap();
        cfg.apply_overrides(env(&[("PORT", "7070"), ("TASKRANK_DATA_FILE", "/tmp/b.json")]))
            .unwrap();
        assert_eq!(cfg.server.port, 7070);
        assert_eq!(cfg.data_file(), PathBuf::from("/tmp/b.json"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut cfg = Config::default();
        cfg.apply_overrides(env(&[("PORT", ""), ("TASKRANK_HOST", "")])).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg.apply_overrides(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PORT"));
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("server.port").as_deref(), Some("8080"));
        assert_eq!(cfg.get("server.host").as_deref(), Some("0.0.0.0"));
        assert!(cfg.get("server.missing").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn get_reports_the_effective_data_file() {
        let cfg = Config::default();
        let expected = cfg.data_file().display().to_string();
        assert_eq!(cfg.get("storage.data_file"), Some(expected));

        let mut cfg = Config::default();
        cfg.apply_overrides(env(&[("TASKRANK_DATA_FILE", "/tmp/x.json")])).unwrap();
        assert_eq!(cfg.get("storage.data_file").as_deref(), Some("/tmp/x.json"));
    }

    #[test]
    fn resolved_fills_defaults_without_touching_the_original() {
        let cfg = Config::default();
        let resolved = cfg.resolved();
        assert_eq!(resolved.storage.data_file, Some(cfg.data_file()));
        assert!(cfg.storage.data_file.is_none());
        assert_eq!(resolved.server, cfg.server);
    }

    #[test]
    fn load_surfaces_a_missing_named_file_as_core_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, crate::CoreError::Config(ConfigError::Read { .. })));
    }
}
