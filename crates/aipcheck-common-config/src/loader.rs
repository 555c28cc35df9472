//! Configuration file loading and parsing.

use crate::env::{vars, Environment};
use crate::types::AipcheckConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

static ENV_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").expect("env reference pattern is valid")
});

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },
}

impl From<ConfigError> for aipcheck_common_core::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ReadError { source } => Self::Io(source),
            other => Self::config(other.to_string()),
        }
    }
}

/// Configuration loader.
pub struct ConfigLoader {
    config_path: PathBuf,
    required: bool,
}

impl ConfigLoader {
    /// Create a loader for `.aipcheck/config.yaml` under the given project directory.
    /// A missing file yields defaults.
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self {
            config_path: project_dir.as_ref().join(".aipcheck/config.yaml"),
            required: false,
        }
    }

    /// Create a loader for an explicit file, which must exist.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
            required: true,
        }
    }

    /// Use `AIPCHECK_CONFIG_PATH` when set, otherwise the project default.
    pub fn from_env_or(project_dir: impl AsRef<Path>) -> Self {
        match Environment::get(vars::AIPCHECK_CONFIG_PATH) {
            Some(path) => Self::from_file(path),
            None => Self::new(project_dir),
        }
    }

    /// Path this loader reads.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load and validate the configuration.
    pub fn load(&self) -> Result<AipcheckConfig, ConfigError> {
        if !self.config_path.exists() {
            if self.required {
                return Err(ConfigError::NotFound {
                    path: self.config_path.clone(),
                });
            }
            return Ok(AipcheckConfig::default());
        }

        let contents = std::fs::read_to_string(&self.config_path)?;
        Self::parse(&contents)
    }

    /// Parse configuration text, expanding env references before deserializing.
    pub fn parse(contents: &str) -> Result<AipcheckConfig, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        let config: AipcheckConfig =
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        validate(&config)?;
        Ok(config)
    }

    /// Save configuration to this loader's path.
    pub fn save(&self, config: &AipcheckConfig) -> Result<(), ConfigError> {
        if let Some(dir) = self.config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(&self.config_path, yaml)?;
        Ok(())
    }
}

/// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;
    let expanded = ENV_REF.replace_all(content, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        match (std::env::var(var_name), cap.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var) => Err(ConfigError::EnvVarNotFound { var }),
        None => Ok(expanded.into_owned()),
    }
}

/// Validate configuration values.
fn validate(config: &AipcheckConfig) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::ValidationError { message };

    if let Some(id) = config
        .rules
        .disabled
        .iter()
        .chain(config.rules.severity.keys())
        .find(|id| id.trim().is_empty())
    {
        return Err(invalid(format!("rule identifier cannot be blank: {id:?}")));
    }

    let alias = Regex::new(&config.revision.alias_pattern)
        .map_err(|e| invalid(format!("revision.alias_pattern is not a valid regex: {e}")))?;

    if let Some(name) = config
        .revision
        .reserved_aliases
        .iter()
        .find(|name| !alias.is_match(name))
    {
        return Err(invalid(format!(
            "reserved alias `{name}` does not match revision.alias_pattern"
        )));
    }

    for (reason, bindings) in &config.error_response.bindings {
        if reason.trim().is_empty() {
            return Err(invalid("error_response.bindings has a blank reason".to_string()));
        }
        if bindings
            .iter()
            .any(|(var, key)| var.trim().is_empty() || key.trim().is_empty())
        {
            return Err(invalid(format!(
                "error_response.bindings.{reason} has a blank variable or metadata key"
            )));
        }
    }

    Ok(())
}
