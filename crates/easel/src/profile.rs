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

use crate::record::{field_names, Record, Scalar};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

const MAX_SAMPLE_VALUES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DataType {
    Numeric,
    Categorical,
    Temporal,
}
impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Numeric)
    }
    /// Columns a renderer can use as a discrete axis.
    pub fn is_string_like(&self) -> bool {
        matches!(self, DataType::Categorical | DataType::Temporal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProfile {
    pub name: String,
    pub data_type: DataType,
    pub present_count: usize,
    pub missing_count: usize,
    pub cardinality: usize,
    pub sample_values: Vec<String>,
}

pub struct RecordProfiler {
    temporal_formats: Vec<String>,
}
impl RecordProfiler {
    pub fn new(temporal_formats: Vec<String>) -> Self {
        Self { temporal_formats }
    }
    pub fn profile(&self, records: &[Record]) -> Vec<FieldProfile> {
        field_names(records)
            .into_iter()
            .map(|name| self.profile_field(records, name))
            .collect()
    }
    fn profile_field(&self, records: &[Record], name: String) -> FieldProfile {
        let values: Vec<&Scalar> = records
            .iter()
            .filter_map(|r| r.get(&name))
            .filter(|v| !v.is_blank())
            .collect();
        let present_count = values.len();
        let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let cardinality = rendered.iter().unique().count();
        let sample_values = rendered
            .iter()
            .unique()
            .take(MAX_SAMPLE_VALUES)
            .cloned()
            .collect();
        FieldProfile {
            data_type: self.detect_data_type(&values),
            name,
            present_count,
            missing_count: records.len() - present_count,
            cardinality,
            sample_values,
        }
    }
    fn detect_data_type(&self, values: &[&Scalar]) -> DataType {
        if values.is_empty() {
            return DataType::Categorical;
        }
        if values.iter().all(|v| v.is_numeric_like()) {
            return DataType::Numeric;
        }
        let all_temporal = values
            .iter()
            .all(|v| v.as_text().is_some_and(|s| self.is_temporal(s)));
        if all_temporal {
            DataType::Temporal
        } else {
            DataType::Categorical
        }
    }
    fn is_temporal(&self, raw: &str) -> bool {
        let s = raw.trim();
        if DateTime::parse_from_rfc3339(s).is_ok() {
            return true;
        }
        self.temporal_formats.iter().any(|fmt| {
            NaiveDate::parse_from_str(s, fmt).is_ok() || NaiveDateTime::parse_from_str(s, fmt).is_ok()
        })
    }
}
impl Default for RecordProfiler {
    fn default() -> Self {
        Self::new(crate::config::PipelineConfig::default().temporal_formats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::new().with("day", "2024-01-01").with("region", "North").with("sales", 10.0),
            Record::new().with("day", "2024-01-02").with("region", "South").with("sales", "12"),
            Record::new().with("day", "2024-01-03").with("region", "North"),
        ]
    }

    #[test]
    fn detects_column_types() {
        let profiles = RecordProfiler::default().profile(&records());
        let types: Vec<DataType> = profiles.iter().map(|p| p.data_type).collect();
        assert_eq!(
            types,
            vec![DataType::Temporal, DataType::Categorical, DataType::Numeric]
        );
    }

    #[test]
    fn counts_missing_and_cardinality() {
        let profiles = RecordProfiler::default().profile(&records());
        let region = &profiles[1];
        assert_eq!(region.cardinality, 2);
        assert_eq!(region.sample_values, vec!["North", "South"]);
        let sales = &profiles[2];
        assert_eq!(sales.present_count, 2);
        assert_eq!(sales.missing_count, 1);
    }
}
