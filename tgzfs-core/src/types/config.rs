//! Configuration types for tgzfs.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Result, TgzfsError};

/// Log level for the tgzfs tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only log errors
    Error,
    /// Log errors and warnings
    Warn,
    /// Log errors, warnings, and informational messages
    Info,
    /// Log errors, warnings, info, and debug messages
    Debug,
    /// Log everything including per-entry archive details
    Trace,
}

impl LogLevel {
    /// Returns the string representation of the log level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Settings shared by the loader and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TgzfsConfig {
    /// Logging level
    pub log_level: LogLevel,

    /// Directory under which package files appear (`<root>/<name>/<file>`)
    pub modules_root: PathBuf,

    /// Archive-internal prefix stripped from every entry path
    pub package_prefix: String,

    /// File extension (without the dot) identifying archives when scanning
    pub archive_extension: String,
}

impl Default for TgzfsConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            modules_root: PathBuf::from("node_modules"),
            package_prefix: "package/".to_string(),
            archive_extension: "tgz".to_string(),
        }
    }
}

impl TgzfsConfig {
    /// Creates a new TgzfsConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        serde_json::from_slice(&raw).map_err(|e| TgzfsError::Io { source: e.into() })
    }

    /// Validates the configuration, reporting every problem found.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.modules_root.as_os_str().is_empty() {
            errors.push("modules_root must not be empty".to_string());
        }

        if self.archive_extension.is_empty() {
            errors.push("archive_extension must not be empty".to_string());
        } else if self.archive_extension.starts_with('.') {
            errors.push(format!(
                "archive_extension must not start with a dot: {:?}",
                self.archive_extension
            ));
        }

        if !self.package_prefix.is_empty() && !self.package_prefix.ends_with('/') {
            errors.push(format!(
                "package_prefix must end with '/': {:?}",
                self.package_prefix
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
