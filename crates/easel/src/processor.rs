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

use crate::chart::{humanize, AxisLabels, ChartFamily, ChartSpec, SeriesSpec};
use crate::config::{PipelineConfig, DEFAULT_PALETTE};
use crate::profile::{FieldProfile, RecordProfiler};
use crate::record::{coerce_scalar, Record, Scalar};
use tracing::debug;

pub const FORMATTED_SUFFIX: &str = "_formatted";
const PREFERRED_CATEGORY_HINTS: [&str; 3] = ["name", "label", "segment"];

/// Round-robin position in a palette. Built fresh for every call so two
/// charts processed in any order get the same colors.
pub struct ColorCursor<'a> {
    palette: &'a [String],
    next: usize,
}
impl<'a> ColorCursor<'a> {
    pub fn new(palette: &'a [String]) -> Self {
        Self { palette, next: 0 }
    }
    pub fn next_color(&mut self) -> String {
        if self.palette.is_empty() {
            return DEFAULT_PALETTE[0].to_string();
        }
        let color = self.palette[self.next % self.palette.len()].clone();
        self.next += 1;
        color
    }
}

/// 1500 -> "1.5K", 2000000 -> "2M". The suffix is picked after rounding to
/// one decimal, so 999999 reads "1M" rather than "1000K".
pub fn format_display(value: f64) -> String {
    let (scaled, suffix) = if (value.abs() / 100.0).round() >= 10_000.0 {
        (value / 1_000_000.0, "M")
    } else {
        (value / 1_000.0, "K")
    };
    let rendered = format!("{scaled:.1}");
    let trimmed = rendered.strip_suffix(".0").unwrap_or(&rendered);
    format!("{trimmed}{suffix}")
}

fn is_formatted_key(field: &str) -> bool {
    field.ends_with(FORMATTED_SUFFIX)
}

pub struct ChartDataProcessor {
    palette: Vec<String>,
    display_threshold: f64,
    profiler: RecordProfiler,
}
impl ChartDataProcessor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            palette: config.palette.clone(),
            display_threshold: config.display_threshold,
            profiler: RecordProfiler::new(config.temporal_formats.clone()),
        }
    }

    pub fn process(&self, mut spec: ChartSpec) -> ChartSpec {
        let profiles: Vec<FieldProfile> = self
            .profiler
            .profile(&spec.data)
            .into_iter()
            .filter(|p| !is_formatted_key(&p.name))
            .collect();
        if spec.category_field.is_none() {
            spec.category_field = pick_category(&profiles);
        }
        if spec.family != ChartFamily::Table {
            if spec.series.is_empty() {
                spec.series = self.generate_series(&spec, &profiles);
            }
            coerce_series_fields(&mut spec);
            if spec.options.per_datum_colors && spec.options.datum_colors.is_empty() {
                let mut cursor = ColorCursor::new(&self.palette);
                spec.options.datum_colors = spec.data.iter().map(|_| cursor.next_color()).collect();
            }
            if spec.axis_labels.is_none() {
                spec.axis_labels = default_axis_labels(&spec);
            }
        }
        self.attach_display_strings(&mut spec.data);
        debug!(
            family = %spec.family,
            series = spec.series.len(),
            records = spec.data.len(),
            "processed chart spec"
        );
        spec
    }

    fn generate_series(&self, spec: &ChartSpec, profiles: &[FieldProfile]) -> Vec<SeriesSpec> {
        let mut cursor = ColorCursor::new(&self.palette);
        let fields: Vec<String> = match &spec.value_field {
            Some(value) => vec![value.clone()],
            None => profiles
                .iter()
                .filter(|p| p.data_type.is_numeric())
                .filter(|p| spec.category_field.as_deref() != Some(p.name.as_str()))
                .map(|p| p.name.clone())
                .collect(),
        };
        fields
            .into_iter()
            .map(|field| SeriesSpec {
                name: humanize(&field),
                color: cursor.next_color(),
                field,
            })
            .collect()
    }

    /// Adds `{field}_formatted` next to large numbers; the number itself stays.
    fn attach_display_strings(&self, data: &mut [Record]) {
        for record in data.iter_mut() {
            let large: Vec<(String, f64)> = record
                .iter()
                .filter(|(key, _)| !is_formatted_key(key))
                .filter_map(|(key, value)| match value {
                    Scalar::Number(n) if n.abs() > self.display_threshold => Some((key.clone(), *n)),
                    _ => None,
                })
                .collect();
            for (key, n) in large {
                record.insert(format!("{key}{FORMATTED_SUFFIX}"), Scalar::Text(format_display(n)));
            }
        }
    }
}
impl Default for ChartDataProcessor {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

fn pick_category(profiles: &[FieldProfile]) -> Option<String> {
    let string_like: Vec<&FieldProfile> = profiles
        .iter()
        .filter(|p| p.data_type.is_string_like())
        .collect();
    string_like
        .iter()
        .find(|p| {
            let lower = p.name.to_lowercase();
            PREFERRED_CATEGORY_HINTS.iter().any(|hint| lower.contains(hint))
        })
        .or_else(|| string_like.first())
        .map(|p| p.name.clone())
}

fn coerce_series_fields(spec: &mut ChartSpec) {
    let fields: Vec<String> = spec.series.iter().map(|s| s.field.clone()).collect();
    for record in spec.data.iter_mut() {
        for field in &fields {
            if let Some(value) = record.get_mut(field) {
                *value = coerce_scalar(std::mem::replace(value, Scalar::Number(0.0)));
            }
        }
    }
}

fn default_axis_labels(spec: &ChartSpec) -> Option<AxisLabels> {
    let category = spec.category_field.as_deref()?;
    let y = match (&spec.value_field, spec.series.as_slice()) {
        (Some(value), _) => humanize(value),
        (None, [only]) => only.name.clone(),
        (None, _) => "Value".to_string(),
    };
    Some(AxisLabels {
        x: humanize(category),
        y,
    })
}
