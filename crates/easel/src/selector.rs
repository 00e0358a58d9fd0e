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

use crate::chart::{humanize, ChartFamily, ChartOptions, ChartSpec, FieldRole, Role};
use crate::record::{coerce_number, field_names, Record, Scalar, CATEGORY_KEY, VALUE_KEY};
use tracing::debug;

pub mod keywords {
    pub const CATEGORY: [&str; 16] = [
        "category",
        "name",
        "type",
        "group",
        "label",
        "segment",
        "id",
        "class",
        "classification",
        "topic",
        "entity",
        "item",
        "title",
        "description",
        "key",
        "field",
    ];
    pub const VALUE: [&str; 15] = [
        "value",
        "count",
        "number",
        "amount",
        "total",
        "sum",
        "quantity",
        "size",
        "percentage",
        "percent",
        "score",
        "weight",
        "frequency",
        "occurrences",
        "volume",
    ];
    pub const TIME: [&str; 5] = ["date", "time", "year", "month", "day"];
    pub const URL: [&str; 5] = ["url", "uri", "link", "href", "website"];
}

fn tokens(field: &str) -> Vec<String> {
    humanize(field)
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn matches_keyword(field: &str, keyword: &str) -> bool {
    field.eq_ignore_ascii_case(keyword) || tokens(field).iter().any(|t| t == keyword)
}

fn is_time_like(field: &str) -> bool {
    tokens(field)
        .iter()
        .any(|t| keywords::TIME.iter().any(|k| t.starts_with(k)))
}

fn is_url_like(field: &str, first: &Record) -> bool {
    let lower = field.to_lowercase();
    keywords::URL.iter().any(|k| lower.contains(k))
        || first
            .get(field)
            .and_then(Scalar::as_text)
            .is_some_and(|v| v.starts_with("http://") || v.starts_with("https://"))
}

/// Inputs shared by the role rules: the reconciled field list, the first
/// record, and a field already claimed by another role.
pub struct FieldContext<'a> {
    pub fields: &'a [String],
    pub first: &'a Record,
    pub exclude: Option<&'a str>,
}
impl<'a> FieldContext<'a> {
    fn candidates(&self) -> impl Iterator<Item = &'a String> {
        let exclude = self.exclude;
        self.fields
            .iter()
            .filter(move |f| Some(f.as_str()) != exclude)
    }
}

pub type FieldRule = fn(&FieldContext<'_>) -> Option<String>;

fn exact_category(ctx: &FieldContext<'_>) -> Option<String> {
    ctx.candidates().find(|f| *f == CATEGORY_KEY).cloned()
}
fn category_keyword(ctx: &FieldContext<'_>) -> Option<String> {
    keywords::CATEGORY
        .iter()
        .find_map(|kw| ctx.candidates().find(|f| matches_keyword(f, kw)))
        .cloned()
}
fn first_string_field(ctx: &FieldContext<'_>) -> Option<String> {
    ctx.candidates()
        .find(|f| {
            matches!(ctx.first.get(f), Some(Scalar::Text(_))) && !is_url_like(f, ctx.first)
        })
        .cloned()
}
fn first_field(ctx: &FieldContext<'_>) -> Option<String> {
    ctx.fields.first().cloned()
}

fn exact_value(ctx: &FieldContext<'_>) -> Option<String> {
    ctx.candidates().find(|f| *f == VALUE_KEY).cloned()
}
fn value_keyword(ctx: &FieldContext<'_>) -> Option<String> {
    keywords::VALUE
        .iter()
        .find_map(|kw| ctx.candidates().find(|f| matches_keyword(f, kw)))
        .cloned()
}
fn first_numeric_field(ctx: &FieldContext<'_>) -> Option<String> {
    ctx.candidates()
        .find(|f| ctx.first.get(f).is_some_and(Scalar::is_numeric_like))
        .cloned()
}
fn second_field(ctx: &FieldContext<'_>) -> Option<String> {
    ctx.fields.get(1).or(ctx.fields.first()).cloned()
}

/// Category resolution, most specific first. The last rule always resolves
/// for a non-empty field list.
pub const CATEGORY_RULES: [(&str, FieldRule); 4] = [
    ("exact", exact_category),
    ("keyword", category_keyword),
    ("string_valued", first_string_field),
    ("first_key", first_field),
];
pub const VALUE_RULES: [(&str, FieldRule); 4] = [
    ("exact", exact_value),
    ("keyword", value_keyword),
    ("numeric_first_row", first_numeric_field),
    ("second_key", second_field),
];

fn resolve(rules: &[(&str, FieldRule)], ctx: &FieldContext<'_>) -> Option<String> {
    rules.iter().find_map(|(name, rule)| {
        let field = rule(ctx)?;
        debug!(rule = name, field = %field, "resolved field role");
        Some(field)
    })
}

pub fn category_field(records: &[Record]) -> Option<String> {
    let first = records.first()?;
    let fields = field_names(records);
    resolve(
        &CATEGORY_RULES,
        &FieldContext {
            fields: &fields,
            first,
            exclude: None,
        },
    )
}

pub fn value_field(records: &[Record], category: Option<&str>) -> Option<String> {
    let first = records.first()?;
    let fields = field_names(records);
    resolve(
        &VALUE_RULES,
        &FieldContext {
            fields: &fields,
            first,
            exclude: category,
        },
    )
}

pub fn time_field(records: &[Record]) -> Option<String> {
    field_names(records).into_iter().find(|f| is_time_like(f))
}

pub fn infer_field_roles(records: &[Record]) -> Vec<FieldRole> {
    let mut roles = Vec::new();
    let category = category_field(records);
    if let Some(name) = &category {
        roles.push(FieldRole {
            name: name.clone(),
            role: Role::Category,
        });
    }
    if let Some(name) = value_field(records, category.as_deref()) {
        roles.push(FieldRole {
            name,
            role: Role::Value,
        });
    }
    if let Some(name) = time_field(records) {
        roles.push(FieldRole {
            name,
            role: Role::Time,
        });
    }
    roles
}

pub fn synthesize_title(family: ChartFamily, category: &str, value: &str) -> String {
    let c = humanize(category);
    let v = humanize(value);
    match family {
        ChartFamily::Pie => format!("Distribution by {c}"),
        ChartFamily::Bar | ChartFamily::Table => format!("{v} by {c}"),
        ChartFamily::Line | ChartFamily::Area => format!("{v} Trends by {c}"),
        ChartFamily::Scatter => format!("{c} to {v} Relationship"),
    }
}

/// Keeps rows with a usable category and a numeric value, writing the coerced
/// number back into the value field.
fn reshape(records: &[Record], category: &str, value: &str) -> Vec<Record> {
    records
        .iter()
        .filter(|r| r.get(category).is_some_and(|c| !c.is_blank()))
        .filter_map(|r| {
            let number = r.get(value).and_then(coerce_number)?;
            let mut row = r.clone();
            row.insert(value, Scalar::Number(number));
            Some(row)
        })
        .collect()
}

pub struct VisualizationSelector {
    pie_max_categories: usize,
}
impl VisualizationSelector {
    pub fn new(pie_max_categories: usize) -> Self {
        Self { pie_max_categories }
    }

    /// Fixed precedence: a time-like field, then small record counts, then bar.
    pub fn infer_family(&self, roles: &[FieldRole], record_count: usize) -> ChartFamily {
        if roles.iter().any(|r| r.role == Role::Time) {
            ChartFamily::Line
        } else if record_count <= self.pie_max_categories {
            ChartFamily::Pie
        } else {
            ChartFamily::Bar
        }
    }

    /// Pure function of its inputs. `None` only for an empty record list.
    pub fn select(&self, records: &[Record], requested: Option<ChartFamily>) -> Option<ChartSpec> {
        let roles = infer_field_roles(records);
        let field = |role: Role| roles.iter().find(|r| r.role == role).map(|r| r.name.clone());
        let category = field(Role::Category)?;
        let value = field(Role::Value)?;
        let data = reshape(records, &category, &value);
        if data.is_empty() {
            debug!(category = %category, value = %value, "no plottable rows, falling back to table");
            let mut spec = ChartSpec::new(ChartFamily::Table, records.to_vec());
            spec.title = synthesize_title(ChartFamily::Table, &category, &value);
            spec.category_field = Some(category);
            spec.value_field = Some(value);
            return Some(spec);
        }
        let family = requested.unwrap_or_else(|| self.infer_family(&roles, data.len()));
        Some(ChartSpec {
            family,
            title: synthesize_title(family, &category, &value),
            data,
            category_field: Some(category),
            value_field: Some(value),
            series: Vec::new(),
            axis_labels: None,
            options: ChartOptions {
                per_datum_colors: family.colors_per_datum(),
                datum_colors: Vec::new(),
            },
        })
    }
}
impl Default for VisualizationSelector {
    fn default() -> Self {
        Self::new(crate::config::PipelineConfig::default().pie_max_categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fruit() -> Vec<Record> {
        vec![
            Record::category_value("Apple", 40.0),
            Record::category_value("Banana", 25.0),
            Record::category_value("Cherry", 10.0),
        ]
    }

    fn n_records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::category_value(format!("c{i}"), i as f64))
            .collect()
    }

    #[test]
    fn small_category_value_list_is_pie() {
        let spec = VisualizationSelector::default().select(&fruit(), None).unwrap();
        assert_eq!(spec.family, ChartFamily::Pie);
        assert_eq!(spec.title, "Distribution by Category");
        assert_eq!(spec.category_field.as_deref(), Some("Category"));
        assert_eq!(spec.value_field.as_deref(), Some("Value"));
        assert!(spec.options.per_datum_colors);
        assert_eq!(spec.data, fruit());
    }

    #[test]
    fn pie_boundary_is_eight() {
        let selector = VisualizationSelector::default();
        assert_eq!(selector.select(&n_records(8), None).unwrap().family, ChartFamily::Pie);
        assert_eq!(selector.select(&n_records(9), None).unwrap().family, ChartFamily::Bar);
    }

    #[test]
    fn time_field_means_line_regardless_of_count() {
        let records: Vec<Record> = ["Jan", "Feb", "Mar"]
            .iter()
            .map(|m| Record::new().with("Month", *m).with("Sales", 5.0))
            .collect();
        let spec = VisualizationSelector::default().select(&records, None).unwrap();
        assert_eq!(spec.family, ChartFamily::Line);
        assert_eq!(spec.title, "Sales Trends by Month");
    }

    #[test]
    fn requested_family_wins() {
        let spec = VisualizationSelector::default()
            .select(&fruit(), Some(ChartFamily::Bar))
            .unwrap();
        assert_eq!(spec.family, ChartFamily::Bar);
        assert_eq!(spec.title, "Value by Category");
        let scatter = VisualizationSelector::default()
            .select(&fruit(), Some(ChartFamily::Scatter))
            .unwrap();
        assert_eq!(scatter.title, "Category to Value Relationship");
        assert!(!scatter.options.per_datum_colors);
    }

    #[test]
    fn keyword_roles() {
        let records = vec![Record::new()
            .with("url", "https://x")
            .with("productName", "Widget")
            .with("unitsSold", 3.0)
            .with("totalRevenue", "1,200")];
        let roles = infer_field_roles(&records);
        assert_eq!(
            roles,
            vec![
                FieldRole {
                    name: "productName".to_string(),
                    role: Role::Category
                },
                FieldRole {
                    name: "totalRevenue".to_string(),
                    role: Role::Value
                },
            ]
        );
        let spec = VisualizationSelector::default().select(&records, None).unwrap();
        assert_eq!(spec.data[0].get("totalRevenue"), Some(&Scalar::Number(1200.0)));
        assert_eq!(spec.title, "Distribution by Product Name");
    }

    #[test]
    fn string_fallback_skips_urls() {
        let records = vec![Record::new()
            .with("source", "https://example.com")
            .with("region", "North")
            .with("sales", 4.0)];
        assert_eq!(category_field(&records).as_deref(), Some("region"));
        assert_eq!(value_field(&records, Some("region")).as_deref(), Some("sales"));
    }

    #[test]
    fn last_resort_fields() {
        let records = vec![Record::new().with("alpha", 1.0).with("beta", "x")];
        assert_eq!(category_field(&records).as_deref(), Some("beta"));
        let only_numbers = vec![Record::new().with("a", 1.0).with("b", 2.0)];
        assert_eq!(category_field(&only_numbers).as_deref(), Some("a"));
        assert_eq!(value_field(&only_numbers, Some("a")).as_deref(), Some("b"));
        let only_text = vec![Record::new().with("p", "x").with("q", "y")];
        assert_eq!(value_field(&only_text, Some("p")).as_deref(), Some("q"));
    }

    #[test]
    fn time_role_drives_line_family() {
        let records = vec![Record::new()
            .with("region", "North")
            .with("sales", 4.0)
            .with("order_date", "2024-01-02")];
        let roles = infer_field_roles(&records);
        assert_eq!(
            roles.last(),
            Some(&FieldRole {
                name: "order_date".to_string(),
                role: Role::Time
            })
        );
        let selector = VisualizationSelector::default();
        assert_eq!(selector.infer_family(&roles, 1), ChartFamily::Line);
        assert_eq!(selector.infer_family(&roles[..2], 9), ChartFamily::Bar);
        assert_eq!(selector.select(&records, None).unwrap().family, ChartFamily::Line);
    }

    #[test]
    fn percent_text_plots_as_its_leading_number() {
        let records = vec![
            Record::new().with("region", "North").with("share", "45%"),
            Record::new().with("region", "South").with("share", "30 %"),
        ];
        let spec = VisualizationSelector::default().select(&records, None).unwrap();
        assert_eq!(spec.data[0].get("share"), Some(&Scalar::Number(45.0)));
        assert_eq!(spec.data[1].get("share"), Some(&Scalar::Number(30.0)));
    }

    #[test]
    fn rows_without_values_are_dropped() {
        let records = vec![
            Record::category_value("a", 1.0),
            Record::new().with("Category", "b").with("Value", "n/a"),
            Record::new().with("Category", "").with("Value", 3.0),
            Record::new().with("Category", "d").with("Value", "7 items"),
        ];
        let spec = VisualizationSelector::default().select(&records, None).unwrap();
        assert_eq!(spec.data.len(), 2);
        assert_eq!(spec.data[1], Record::category_value("d", 7.0));
    }

    #[test]
    fn unplottable_records_degrade_to_table() {
        let records = vec![Record::new().with("p", "x").with("q", "y")];
        let spec = VisualizationSelector::default().select(&records, None).unwrap();
        assert_eq!(spec.family, ChartFamily::Table);
        assert_eq!(spec.data, records);
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(VisualizationSelector::default().select(&[], None).is_none());
    }

    #[test]
    fn time_like_names() {
        assert!(is_time_like("orderDate"));
        assert!(is_time_like("Year"));
        assert!(is_time_like("timestamp"));
        assert!(!is_time_like("Holiday"));
        assert!(!is_time_like("Category"));
    }
}
