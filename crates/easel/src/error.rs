// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use thiserror::Error;
#[derive(Error, Debug)]
pub enum EaselError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
}
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Malformed {format} block: {reason}")]
    MalformedBlock { format: String, reason: String },
    #[error("Unsupported fenced block format: {format}")]
    UnsupportedFormat { format: String },
    #[error("Fenced {format} block carries no records")]
    EmptyBlock { format: String },
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    ConfigFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid pipeline configuration: {field} = {value}")]
    InvalidValue { field: String, value: String },
    #[error("Missing required configuration: {field}")]
    MissingRequiredConfig { field: String },
    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },
}
#[derive(Error, Debug)]
pub enum SerialisationError {
    #[error("JSON serialisation failed: {source}")]
    JsonSerialisationError {
        #[from]
        source: serde_json::Error,
    },
    #[error("YAML serialisation failed: {source}")]
    YamlSerialisationError {
        #[from]
        source: serde_yaml::Error,
    },
}
pub type Result<T> = std::result::Result<T, EaselError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;
impl From<anyhow::Error> for EaselError {
    fn from(err: anyhow::Error) -> Self {
        EaselError::Config(ConfigError::ValidationFailed {
            reason: format!("{err:#}"),
        })
    }
}
impl From<serde_json::Error> for EaselError {
    fn from(err: serde_json::Error) -> Self {
        EaselError::Serialisation(SerialisationError::JsonSerialisationError { source: err })
    }
}
impl From<serde_yaml::Error> for EaselError {
    fn from(err: serde_yaml::Error) -> Self {
        EaselError::Serialisation(SerialisationError::YamlSerialisationError { source: err })
    }
}
impl ExtractionError {
    pub fn malformed(format: &str, reason: impl std::fmt::Display) -> Self {
        ExtractionError::MalformedBlock {
            format: format.to_string(),
            reason: reason.to_string(),
        }
    }
}
impl EaselError {
    /// Errors the pipeline absorbs by narrowing its output rather than surfacing them.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EaselError::Extraction(_))
    }
    pub fn category(&self) -> &'static str {
        match self {
            EaselError::Config(_) => "Configuration",
            EaselError::Extraction(_) => "Extraction",
            EaselError::Io(_) => "I/O",
            EaselError::Serialisation(_) => "Serialisation",
        }
    }
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EaselError::Extraction(_) => ErrorSeverity::Warning,
            EaselError::Config(ConfigError::MissingRequiredConfig { .. }) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            EaselError::Extraction(ExtractionError::MalformedBlock { .. }) => vec![
                "Check the fenced block for trailing commas or unbalanced brackets".to_string(),
                "Make sure the block language tag matches its contents".to_string(),
            ],
            EaselError::Config(ConfigError::ConfigFileError { .. }) => vec![
                "Check the configuration path or unset EASEL_CONFIG_PATH".to_string(),
            ],
            EaselError::Config(_) => vec![
                "Compare the configuration against config/pipeline.yml".to_string(),
            ],
            _ => vec!["Check the error message for specific guidance".to_string()],
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}
impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }
    pub fn color_code(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "\x1b[36m",
            ErrorSeverity::Warning => "\x1b[33m",
            ErrorSeverity::Error => "\x1b[31m",
            ErrorSeverity::Critical => "\x1b[35m",
        }
    }
}
pub struct ErrorReporter {
    pub show_suggestions: bool,
    pub colored_output: bool,
}
impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            show_suggestions: true,
            colored_output: true,
        }
    }
    pub fn plain() -> Self {
        Self {
            show_suggestions: true,
            colored_output: false,
        }
    }
    pub fn report(&self, error: &EaselError) -> String {
        let severity = error.severity();
        let mut output = String::new();
        if self.colored_output {
            output.push_str(severity.color_code());
        }
        output.push_str(&format!("[{}] {}\n", severity.as_str(), error));
        if self.colored_output {
            output.push_str("\x1b[0m");
        }
        if self.show_suggestions {
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                output.push_str("\nSuggestions:\n");
                for suggestion in suggestions {
                    output.push_str(&format!("  • {suggestion}\n"));
                }
            }
        }
        output
    }
}
impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
