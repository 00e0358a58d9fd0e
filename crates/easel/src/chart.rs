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

use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartFamily {
    Bar,
    Line,
    Area,
    Pie,
    Scatter,
    Table,
}
impl ChartFamily {
    pub const ALL: [ChartFamily; 6] = [
        ChartFamily::Bar,
        ChartFamily::Line,
        ChartFamily::Area,
        ChartFamily::Pie,
        ChartFamily::Scatter,
        ChartFamily::Table,
    ];
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartFamily::Bar => "bar",
            ChartFamily::Line => "line",
            ChartFamily::Area => "area",
            ChartFamily::Pie => "pie",
            ChartFamily::Scatter => "scatter",
            ChartFamily::Table => "table",
        }
    }
    /// Families drawn as one mark per category, which need one color per datum.
    pub fn colors_per_datum(&self) -> bool {
        matches!(self, ChartFamily::Pie | ChartFamily::Bar)
    }
    /// Lenient name lookup used for "Chart Type:" labels, e.g. "Bar Chart" or "donut".
    pub fn from_label(label: &str) -> Option<Self> {
        let lower = label.trim().to_lowercase();
        if lower.contains("pie") || lower.contains("donut") || lower.contains("doughnut") {
            Some(ChartFamily::Pie)
        } else if lower.contains("scatter") || lower.contains("bubble") {
            Some(ChartFamily::Scatter)
        } else if lower.contains("area") {
            Some(ChartFamily::Area)
        } else if lower.contains("line") || lower.contains("time series") {
            Some(ChartFamily::Line)
        } else if lower.contains("bar") || lower.contains("column") || lower.contains("histogram")
        {
            Some(ChartFamily::Bar)
        } else if lower.contains("table") {
            Some(ChartFamily::Table)
        } else {
            None
        }
    }
}
impl fmt::Display for ChartFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for ChartFamily {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartFamily::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown chart family '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Category,
    Value,
    Time,
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRole {
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub field: String,
    pub name: String,
    pub color: String,
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisLabels {
    pub x: String,
    pub y: String,
}
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    pub per_datum_colors: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datum_colors: Vec<String>,
}

/// Terminal artifact of the pipeline, handed to the renderer as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub family: ChartFamily,
    pub data: Vec<Record>,
    pub category_field: Option<String>,
    pub value_field: Option<String>,
    #[serde(default)]
    pub series: Vec<SeriesSpec>,
    pub title: String,
    pub axis_labels: Option<AxisLabels>,
    #[serde(default)]
    pub options: ChartOptions,
}
impl ChartSpec {
    pub fn new(family: ChartFamily, data: Vec<Record>) -> Self {
        Self {
            family,
            data,
            category_field: None,
            value_field: None,
            series: Vec::new(),
            title: String::new(),
            axis_labels: None,
            options: ChartOptions::default(),
        }
    }
}

/// "totalSales" / "total_sales" -> "Total Sales".
pub fn humanize(field: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;
    for ch in field.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else {
            let boundary = ch.is_uppercase()
                && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(ch);
        }
        prev = Some(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanizes_field_names() {
        assert_eq!(humanize("Category"), "Category");
        assert_eq!(humanize("totalSales"), "Total Sales");
        assert_eq!(humanize("total_sales"), "Total Sales");
        assert_eq!(humanize("revenue2024Q1"), "Revenue2024 Q1");
        assert_eq!(humanize("URL"), "URL");
    }

    #[test]
    fn family_labels_are_lenient() {
        assert_eq!(ChartFamily::from_label("Bar Chart"), Some(ChartFamily::Bar));
        assert_eq!(ChartFamily::from_label("donut"), Some(ChartFamily::Pie));
        assert_eq!(ChartFamily::from_label("Stacked area"), Some(ChartFamily::Area));
        assert_eq!(ChartFamily::from_label("Line graph"), Some(ChartFamily::Line));
        assert_eq!(ChartFamily::from_label("something"), None);
    }

    #[test]
    fn family_round_trips_through_str() {
        for family in ChartFamily::ALL {
            assert_eq!(family.as_str().parse::<ChartFamily>(), Ok(family));
        }
        assert!("radar".parse::<ChartFamily>().is_err());
    }
}
