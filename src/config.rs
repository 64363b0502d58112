//! Configuration for ferro-mrna
//!
//! Loaded from TOML. When no path is given, configuration is searched in
//! this order (first found wins):
//! 1. `.ferro-mrna.toml` in the current directory
//! 2. `~/.config/ferro-mrna/config.toml`
//!
//! Otherwise the built-in defaults apply.
//!
//! # Example Configuration
//!
//! ```toml
//! [engine]
//! kind = "subprocess"
//!
//! [engine.subprocess]
//! program = "mrnarchitect"
//! args = []
//! optimize_timeout_seconds = 1800
//!
//! [orchestration]
//! join_policy = "fail-fast"
//! max_concurrent_calls = 8
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading or validation error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MrnaConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Transport used to reach the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Subprocess,
    Http,
}

/// Engine selection and transport settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,
    /// Defaults apply when the table is absent, even inside a partial `[engine]`
    #[serde(default = "default_subprocess")]
    pub subprocess: Option<SubprocessConfig>,
    pub http: Option<HttpConfig>,
}

fn default_subprocess() -> Option<SubprocessConfig> {
    Some(SubprocessConfig::default())
}

/// Command-line engine settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SubprocessConfig {
    /// Engine executable
    pub program: String,
    /// Arguments placed before the operation name
    pub args: Vec<String>,
    /// Working directory for the child process
    pub working_dir: Option<PathBuf>,
    pub convert_timeout_seconds: u64,
    pub analyze_timeout_seconds: u64,
    /// Optimization is the slowest operation (default: 1800)
    pub optimize_timeout_seconds: u64,
    /// Extra environment for the child process
    pub env_vars: HashMap<String, String>,
}

/// HTTP engine settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Base URL; operations are posted to `{base_url}/api/<operation>`
    pub base_url: String,
    /// Whole-request timeout (default: 1800)
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
    pub connection_pool: Option<ConnectionPoolConfig>,
}

/// HTTP connection pool settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConnectionPoolConfig {
    /// Maximum idle connections per host (default: 10)
    pub max_idle_per_host: Option<usize>,
    /// Idle timeout in seconds (default: 30)
    pub idle_timeout_seconds: Option<u64>,
    /// TCP keep-alive in seconds (default: 90)
    pub keep_alive_seconds: Option<u64>,
}

/// How a run treats a failed task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinPolicy {
    /// Abort the run on the first failed task
    #[default]
    FailFast,
    /// Let every task finish and report failures individually
    SettleAll,
}

/// Orchestration settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    pub join_policy: JoinPolicy,
    /// Upper bound on in-flight engine calls; unbounded when absent
    pub max_concurrent_calls: Option<usize>,
}

/// Report header settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub tool_name: String,
    pub version: String,
}

fn default_http_timeout() -> u64 {
    1800
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Subprocess,
            subprocess: default_subprocess(),
            http: None,
        }
    }
}

impl Default for SubprocessConfig {
    fn default() -> Self {
        Self {
            program: "mrnarchitect".to_string(),
            args: Vec::new(),
            working_dir: None,
            convert_timeout_seconds: 5,
            analyze_timeout_seconds: 300,
            optimize_timeout_seconds: 1800,
            env_vars: HashMap::new(),
        }
    }
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: Some(10),
            idle_timeout_seconds: Some(30),
            keep_alive_seconds: Some(90),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            tool_name: "mRNArchitect".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl MrnaConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path`, or from the default locations, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let cwd_config = PathBuf::from(".ferro-mrna.toml");
        if cwd_config.exists() {
            return Self::from_file(&cwd_config);
        }

        if let Some(home) = dirs_home() {
            let home_config = home.join(".config").join("ferro-mrna").join("config.toml");
            if home_config.exists() {
                return Self::from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Check settings that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.engine.kind {
            EngineKind::Subprocess => {
                let subprocess = self.engine.subprocess.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("engine.subprocess section is required".to_string())
                })?;
                if subprocess.program.trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        "engine.subprocess.program must not be empty".to_string(),
                    ));
                }
                for (name, seconds) in [
                    ("convert_timeout_seconds", subprocess.convert_timeout_seconds),
                    ("analyze_timeout_seconds", subprocess.analyze_timeout_seconds),
                    ("optimize_timeout_seconds", subprocess.optimize_timeout_seconds),
                ] {
                    if seconds == 0 {
                        return Err(ConfigError::Invalid(format!(
                            "engine.subprocess.{} must be greater than 0",
                            name
                        )));
                    }
                }
            }
            EngineKind::Http => {
                let http = self.engine.http.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("engine.http section is required".to_string())
                })?;
                if http.base_url.trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        "engine.http.base_url must not be empty".to_string(),
                    ));
                }
                if http.timeout_seconds == 0 {
                    return Err(ConfigError::Invalid(
                        "engine.http.timeout_seconds must be greater than 0".to_string(),
                    ));
                }
            }
        }

        if self.orchestration.max_concurrent_calls == Some(0) {
            return Err(ConfigError::Invalid(
                "orchestration.max_concurrent_calls must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Get home directory from the HOME environment variable
fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
