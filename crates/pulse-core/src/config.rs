use crate::error::Result;
use crate::identity::IdentityConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "pulse.yaml";
pub const TOKEN_SECRET_ENV: &str = "PULSE_TOKEN_SECRET";

/// Secrets shorter than this are accepted with a warning.
const MIN_SECRET_LEN: usize = 32;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7070
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// File path, or `:memory:` for a throwaway database.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "pulse.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for bearer tokens.
    #[serde(default)]
    pub token_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_subject: Option<String>,
}

impl AuthConfig {
    pub fn identity(&self) -> IdentityConfig {
        IdentityConfig {
            fallback_subject: self
                .fallback_subject
                .clone()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Apply `PULSE_TOKEN_SECRET` when set and non-empty.
    pub fn apply_env(&mut self) {
        self.apply_token_secret(std::env::var(TOKEN_SECRET_ENV).ok());
    }

    fn apply_token_secret(&mut self, secret: Option<String>) {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.auth.token_secret = secret;
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push(ConfigWarning::error("server.port must be non-zero"));
        }
        if self.database.path.trim().is_empty() {
            warnings.push(ConfigWarning::error("database.path is empty"));
        }

        let secret_len = self.auth.token_secret.len();
        if secret_len == 0 {
            warnings.push(ConfigWarning::error(format!(
                "auth.token_secret is empty; set it or {TOKEN_SECRET_ENV} so bearer tokens can be verified"
            )));
        } else if secret_len < MIN_SECRET_LEN {
            warnings.push(ConfigWarning::warning(format!(
                "auth.token_secret is {secret_len} bytes; use at least {MIN_SECRET_LEN}"
            )));
        }

        if let Some(subject) = self.auth.identity().fallback_subject {
            warnings.push(ConfigWarning::warning(format!(
                "auth.fallback_subject is set: unauthenticated requests act as '{subject}' (development only)"
            )));
        }

        warnings
    }

    pub fn has_errors(warnings: &[ConfigWarning]) -> bool {
        warnings.iter().any(|w| w.level == WarnLevel::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn with_secret() -> Config {
        let mut cfg = Config::default();
        cfg.auth.token_secret = "x".repeat(MIN_SECRET_LEN);
        cfg
    }

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg: Config = serde_yaml::from_str("database:\n  path: ':memory:'\n").unwrap();
        assert_eq!(cfg.database.path, ":memory:");
        assert_eq!(cfg.server, ServerConfig::default());
        assert!(cfg.auth.fallback_subject.is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut cfg = with_secret();
        cfg.server.port = 9000;
        cfg.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), cfg);
    }

    #[test]
    fn empty_secret_is_an_error() {
        let warnings = Config::default().validate();
        assert!(Config::has_errors(&warnings));
        assert!(warnings.iter().any(|w| w.message.contains("token_secret")));
        assert!(with_secret().validate().is_empty());
    }

    #[test]
    fn fallback_subject_warns() {
        let mut cfg = with_secret();
        cfg.auth.fallback_subject = Some("dev_user".into());
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert_eq!(cfg.auth.identity().fallback_subject.as_deref(), Some("dev_user"));
    }

    #[test]
    fn blank_fallback_is_disabled() {
        let mut cfg = with_secret();
        cfg.auth.fallback_subject = Some("  ".into());
        assert_eq!(cfg.auth.identity(), IdentityConfig::disabled());
    }

    #[test]
    fn env_secret_overrides_file() {
        let mut cfg = Config::default();
        cfg.apply_token_secret(Some("from-env".into()));
        assert_eq!(cfg.auth.token_secret, "from-env");
        cfg.apply_token_secret(Some(String::new()));
        assert_eq!(cfg.auth.token_secret, "from-env");
    }
}
