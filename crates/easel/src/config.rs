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

use crate::error::{ConfigError, ConfigResult};
use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_PATH_ENV: &str = "EASEL_CONFIG_PATH";

pub const DEFAULT_PALETTE: [&str; 10] = [
    "#4E79A7", "#F28E2B", "#E15759", "#76B7B2", "#59A14F", "#EDC948", "#B07AA1", "#FF9DA7",
    "#9C755F", "#BAB0AC",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Record counts up to this value render as a pie when nothing else decides.
    pub pie_max_categories: usize,
    /// Magnitudes strictly above this get a K/M display string.
    pub display_threshold: f64,
    pub palette: Vec<String>,
    /// Entries kept in the extraction memo; 0 turns memoisation off.
    pub memo_capacity: usize,
    pub knowledge_base_cues: Vec<String>,
    pub temporal_formats: Vec<String>,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pie_max_categories: 8,
            display_threshold: 1000.0,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            memo_capacity: 64,
            knowledge_base_cues: vec![
                "knowledge base".to_string(),
                "vector search".to_string(),
                "search results".to_string(),
                "retrieved documents".to_string(),
                "based on the documents".to_string(),
                "according to the sources".to_string(),
            ],
            temporal_formats: vec![
                "%Y-%m-%d".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y-%m-%dT%H:%M:%S".to_string(),
                "%Y-%m-%dT%H:%M:%SZ".to_string(),
                "%m/%d/%Y".to_string(),
                "%d/%m/%Y".to_string(),
            ],
        }
    }
}
impl PipelineConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pie_max_categories == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pie_max_categories".to_string(),
                value: "0".to_string(),
            });
        }
        if !self.display_threshold.is_finite() || self.display_threshold < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "display_threshold".to_string(),
                value: self.display_threshold.to_string(),
            });
        }
        if self.palette.is_empty() {
            return Err(ConfigError::MissingRequiredConfig {
                field: "palette".to_string(),
            });
        }
        let hex = Regex::new(r"^#(?:[0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").map_err(|e| {
            ConfigError::ValidationFailed {
                reason: e.to_string(),
            }
        })?;
        if let Some(bad) = self.palette.iter().find(|c| !hex.is_match(c)) {
            return Err(ConfigError::InvalidValue {
                field: "palette".to_string(),
                value: bad.clone(),
            });
        }
        if self.memo_capacity > 10_000 {
            return Err(ConfigError::ValidationFailed {
                reason: "memo_capacity should not exceed 10000".to_string(),
            });
        }
        Ok(())
    }
    pub fn for_presentation() -> Self {
        Self {
            pie_max_categories: 6,
            memo_capacity: 0,
            ..Default::default()
        }
    }
    pub fn for_exploration() -> Self {
        Self {
            pie_max_categories: 10,
            memo_capacity: 512,
            ..Default::default()
        }
    }
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).context("Failed to parse pipeline configuration")?;
        config.validate()?;
        Ok(config)
    }
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ConfigFileError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration in '{}'", path.display()))
    }
    /// Loads from `EASEL_CONFIG_PATH` when set, otherwise the built-in defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_yaml_file(path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
        assert!(PipelineConfig::for_presentation().validate().is_ok());
        assert!(PipelineConfig::for_exploration().validate().is_ok());
    }

    #[test]
    fn rejects_zero_pie_threshold() {
        let config = PipelineConfig {
            pie_max_categories: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "pie_max_categories"
        ));
    }

    #[test]
    fn rejects_non_hex_palette_entries() {
        let config = PipelineConfig {
            palette: vec!["#112233".to_string(), "teal".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = PipelineConfig::from_yaml_str("pie_max_categories: 5\n").unwrap();
        assert_eq!(config.pie_max_categories, 5);
        assert_eq!(config.display_threshold, 1000.0);
        assert_eq!(config.palette.len(), DEFAULT_PALETTE.len());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "memo_capacity: 0\npalette: ['#000000', '#FFFFFF']").unwrap();
        let config = PipelineConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.memo_capacity, 0);
        assert_eq!(config.palette, vec!["#000000", "#FFFFFF"]);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = PipelineConfig::from_yaml_file("does/not/exist.yml").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.yml"));
    }
}
