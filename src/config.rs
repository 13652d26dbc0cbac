//! Relay configuration loading and validation.
//!
//! Reads a YAML file and resolves `${VAR}` / `${VAR:-default}` references.
//! Every field has a default, so an absent file yields a working config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::command::parser::check_endpoint_url;
use crate::format::{DEFAULT_PAYLOAD_CHAR_BUDGET, DEFAULT_SCHEMA_CHAR_BUDGET};

/// Env var naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "TOOLRELAY_CONFIG";

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

// ─── Public Types ────────────────────────────────────────────────────────────

/// Log line encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Runtime settings for the relay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Bound on one `tools/call` round trip.
    pub call_timeout_ms: u64,
    /// Bound on opening a connection and listing its tools.
    pub connect_timeout_ms: u64,
    /// Characters of tool output shown before truncation.
    pub payload_char_budget: usize,
    /// Characters of raw schema shown by `schema`.
    pub schema_char_budget: usize,
    /// Only suggest tool names within this edit distance. Unset means always suggest.
    pub suggestion_max_distance: Option<usize>,
    /// Used by a bare `connect`.
    pub default_endpoint: Option<String>,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 30_000,
            connect_timeout_ms: 15_000,
            payload_char_budget: DEFAULT_PAYLOAD_CHAR_BUDGET,
            schema_char_budget: DEFAULT_SCHEMA_CHAR_BUDGET,
            suggestion_max_distance: None,
            default_endpoint: None,
            log_filter: "toolrelay=info,warn".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl RelayConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Load from the first config file found, or defaults when there is none.
    ///
    /// Lookup order: `explicit`, then `$TOOLRELAY_CONFIG`, then
    /// `<config_dir>/toolrelay/config.yaml`. The first two must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var(CONFIG_ENV_VAR).ok().filter(|v| !v.trim().is_empty());
        let default_path = dirs::config_dir().map(|d| d.join("toolrelay").join("config.yaml"));

        match resolve_config_path(explicit, env_path.as_deref(), default_path) {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        let interpolated = interpolate_env_vars(raw);
        if interpolated.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&interpolated)
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("call_timeout_ms", self.call_timeout_ms as usize),
            ("connect_timeout_ms", self.connect_timeout_ms as usize),
            ("payload_char_budget", self.payload_char_budget),
            ("schema_char_budget", self.schema_char_budget),
        ];
        if let Some((field, _)) = nonzero.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid {
                reason: format!("{field} must be greater than zero"),
            });
        }

        if let Some(ref endpoint) = self.default_endpoint {
            check_endpoint_url(endpoint).map_err(|reason| ConfigError::Invalid {
                reason: format!("default_endpoint '{endpoint}': {reason}"),
            })?;
        }
        Ok(())
    }
}

/// Pick the config file to read. A missing default file is skipped.
fn resolve_config_path(
    explicit: Option<&Path>,
    env_path: Option<&str>,
    default_path: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_path {
        return Some(PathBuf::from(path));
    }
    default_path.filter(|p| p.exists())
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                expr.push(c);
            }
            result.push_str(&resolve_var_expr(&expr));
        } else {
            result.push(ch);
        }
    }

    result
}

fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((name, default)) => std::env::var(name).unwrap_or_else(|_| default.to_string()),
        None => std::env::var(expr).unwrap_or_default(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(15));
        assert_eq!(config.payload_char_budget, 4000);
        assert_eq!(config.schema_char_budget, 2000);
        assert_eq!(config.log_filter, "toolrelay=info,warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("call_timeout_ms: 5000\nlog_format: json\n");
        let config = RelayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.call_timeout_ms, 5000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.connect_timeout_ms, 15_000);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let file = write_config("");
        assert_eq!(RelayConfig::from_file(file.path()).unwrap(), RelayConfig::default());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let file = write_config("call_timeout_ms: [not a number\n");
        let err = RelayConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_explicit_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RelayConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let file = write_config("connect_timeout_ms: 0\n");
        let err = RelayConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("connect_timeout_ms"));
    }

    #[test]
    fn test_bad_default_endpoint_rejected() {
        let config = RelayConfig {
            default_endpoint: Some("ftp://hub".into()),
            ..RelayConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_endpoint_from_env_var() {
        std::env::set_var("__TOOLRELAY_TEST_ENDPOINT__", "http://localhost:9000/mcp");
        let file = write_config("default_endpoint: ${__TOOLRELAY_TEST_ENDPOINT__}\n");
        let config = RelayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_endpoint.as_deref(), Some("http://localhost:9000/mcp"));
        std::env::remove_var("__TOOLRELAY_TEST_ENDPOINT__");
    }

    #[test]
    fn test_interpolate_with_default() {
        std::env::remove_var("__TOOLRELAY_TEST_UNSET__");
        assert_eq!(interpolate_env_vars("a: ${__TOOLRELAY_TEST_UNSET__:-42}"), "a: 42");
        assert_eq!(interpolate_env_vars("plain"), "plain");
    }

    #[test]
    fn test_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let default = dir.path().join("config.yaml");
        let explicit = PathBuf::from("/explicit.yaml");

        assert_eq!(
            resolve_config_path(Some(&explicit), Some("/env.yaml"), Some(default.clone())),
            Some(explicit)
        );
        assert_eq!(
            resolve_config_path(None, Some("/env.yaml"), Some(default.clone())),
            Some(PathBuf::from("/env.yaml"))
        );
        // Missing default file falls through to built-in defaults
        assert_eq!(resolve_config_path(None, None, Some(default.clone())), None);

        std::fs::write(&default, "").unwrap();
        assert_eq!(resolve_config_path(None, None, Some(default.clone())), Some(default));
    }
}
