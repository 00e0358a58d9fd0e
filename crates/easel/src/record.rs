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

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CATEGORY_KEY: &str = "Category";
pub const VALUE_KEY: &str = "Value";

static NUMERIC_CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([-+]?)[$€£¥]?\s*(\d[\d,]*(?:\.\d+)?|\.\d+)\s*(%?)$").expect("valid regex")
});
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([-+]?)[$€£¥]?(\d[\d,]*(?:\.\d+)?|\.\d+)").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}
impl Scalar {
    pub fn text(value: impl Into<String>) -> Self {
        Scalar::Text(value.into())
    }
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(_) => None,
        }
    }
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            Scalar::Number(_) => None,
        }
    }
    pub fn is_number(&self) -> bool {
        matches!(self, Scalar::Number(_))
    }
    /// A text cell that would coerce to a number counts as numeric here.
    pub fn is_numeric_like(&self) -> bool {
        match self {
            Scalar::Number(_) => true,
            Scalar::Text(s) => parse_numeric(s).is_some(),
        }
    }
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Text(s) => s.trim().is_empty(),
            Scalar::Number(n) => !n.is_finite(),
        }
    }
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Number(n) => n.as_f64().map(Scalar::Number),
            serde_json::Value::String(s) => Some(Scalar::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(Scalar::Text(b.to_string())),
            other => Some(Scalar::Text(other.to_string())),
        }
    }
}
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}
impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}
impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value as f64)
    }
}
impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}
impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

/// One extracted data point. Keys keep insertion order so "first key" and
/// "second key" fallbacks are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, Scalar>);
impl Record {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }
    pub fn category_value(category: impl Into<String>, value: f64) -> Self {
        let mut record = Self::new();
        record.insert(CATEGORY_KEY, Scalar::Text(category.into()));
        record.insert(VALUE_KEY, Scalar::Number(value));
        record
    }
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(key, value.into());
        self
    }
    pub fn insert(&mut self, key: impl Into<String>, value: Scalar) -> Option<Scalar> {
        self.0.insert(key.into(), value)
    }
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.get(key)
    }
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Scalar> {
        self.0.get_mut(key)
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.0.iter()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        object
            .iter()
            .filter_map(|(k, v)| Scalar::from_json(v).map(|s| (k.clone(), s)))
            .collect()
    }
}
impl FromIterator<(String, Scalar)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Scalar)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
impl From<IndexMap<String, Scalar>> for Record {
    fn from(map: IndexMap<String, Scalar>) -> Self {
        Self(map)
    }
}

/// Field names across a record list, in order of first appearance.
pub fn field_names(records: &[Record]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }
    names
}

/// Parses a cell that looks entirely numeric: optional sign and currency symbol,
/// thousands separators, and a `%` suffix that turns the number into a fraction.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_matches('*').trim();
    let caps = NUMERIC_CELL.captures(trimmed)?;
    let digits = caps[2].replace(',', "");
    let mut value: f64 = digits.parse().ok()?;
    if &caps[1] == "-" {
        value = -value;
    }
    if !caps[3].is_empty() {
        value /= 100.0;
    }
    Some(value)
}

/// First numeric run inside arbitrary text, e.g. "40 units" -> 40. A trailing
/// `%` is left alone: "45%" reads as 45.
pub fn leading_number(raw: &str) -> Option<f64> {
    let caps = LEADING_NUMBER.captures(raw)?;
    let value: f64 = caps[2].replace(',', "").parse().ok()?;
    Some(if &caps[1] == "-" { -value } else { value })
}

/// Deterministic, idempotent numeric coercion used when plotting. Text reads
/// as its leading numeric substring; numbers pass through untouched.
pub fn coerce_number(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Number(n) if n.is_finite() => Some(*n),
        Scalar::Number(_) => None,
        Scalar::Text(s) => leading_number(s),
    }
}

/// Turns numeric-looking text into a number, leaving everything else as is.
pub fn coerce_scalar(value: Scalar) -> Scalar {
    match value {
        Scalar::Text(s) => match parse_numeric(&s) {
            Some(n) => Scalar::Number(n),
            None => Scalar::Text(s),
        },
        number => number,
    }
}
