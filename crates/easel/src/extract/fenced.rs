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

use crate::error::{ExtractionError, ExtractionResult};
use crate::extract::markdown::{scan_blocks, MarkdownBlock};
use crate::record::{Record, Scalar};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

static INLINE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:json|data|json_data)[ \t]*:[ \t]*([\[{].*)$").expect("valid regex")
});

/// Object properties searched first for the embedded record array.
const NESTED_ARRAY_KEYS: [&str; 6] = ["data", "records", "rows", "items", "values", "results"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    pub language: String,
    pub body: String,
}

/// Fenced code blocks in document order. Without any, falls back to inline
/// `JSON: [...]` lines.
pub fn find_blocks(text: &str) -> Vec<FencedBlock> {
    let blocks: Vec<FencedBlock> = scan_blocks(text)
        .into_iter()
        .filter_map(|block| match block {
            MarkdownBlock::Code { language, body } => Some(FencedBlock { language, body }),
            _ => None,
        })
        .collect();
    if !blocks.is_empty() {
        return blocks;
    }
    INLINE_MARKER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| FencedBlock {
            language: "json".to_string(),
            body: m.as_str().to_string(),
        })
        .collect()
}

pub fn parse_block(block: &FencedBlock) -> ExtractionResult<Vec<Record>> {
    let body = block.body.as_str();
    match block.language.as_str() {
        "json" | "data" | "javascript" | "js" => parse_json(body),
        "csv" => parse_csv(body),
        "" if looks_like_json(body) => parse_json(body),
        other => Err(ExtractionError::UnsupportedFormat {
            format: if other.is_empty() { "plain" } else { other }.to_string(),
        }),
    }
}

fn looks_like_json(body: &str) -> bool {
    let trimmed = body.trim_start();
    trimmed.starts_with('[') || trimmed.starts_with('{')
}

pub fn parse_json(body: &str) -> ExtractionResult<Vec<Record>> {
    let value: Value =
        serde_json::from_str(body.trim()).map_err(|e| ExtractionError::malformed("json", e))?;
    records_from_json(&value)
}

pub fn records_from_json(value: &Value) -> ExtractionResult<Vec<Record>> {
    let records = match value {
        Value::Array(items) => records_from_array(items),
        Value::Object(map) => match nested_array(map) {
            Some(items) => records_from_array(items),
            None => map
                .iter()
                .filter_map(|(key, v)| {
                    let number = match v {
                        Value::Number(n) => n.as_f64(),
                        Value::String(s) => crate::record::parse_numeric(s),
                        _ => None,
                    }?;
                    Some(Record::category_value(key.clone(), number))
                })
                .collect(),
        },
        _ => Vec::new(),
    };
    if records.is_empty() {
        return Err(ExtractionError::EmptyBlock {
            format: "json".to_string(),
        });
    }
    Ok(records)
}

fn records_from_array(items: &[Value]) -> Vec<Record> {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(Record::from_json_object)
        .filter(|r| !r.is_empty())
        .collect()
}

fn holds_objects(value: &Value) -> Option<&Vec<Value>> {
    value
        .as_array()
        .filter(|items| items.iter().any(Value::is_object))
}

fn nested_array(map: &serde_json::Map<String, Value>) -> Option<&Vec<Value>> {
    NESTED_ARRAY_KEYS
        .iter()
        .find_map(|key| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .and_then(|(_, v)| holds_objects(v))
        })
        .or_else(|| map.values().find_map(holds_objects))
}

#[cfg(feature = "csv-blocks")]
fn parse_csv(body: &str) -> ExtractionResult<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.trim().as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| ExtractionError::malformed("csv", e))?
        .clone();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| ExtractionError::malformed("csv", e))?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(header, cell)| {
                (
                    header.to_string(),
                    crate::record::coerce_scalar(Scalar::text(cell)),
                )
            })
            .collect();
        if !record.is_empty() {
            records.push(record);
        }
    }
    if records.is_empty() {
        return Err(ExtractionError::EmptyBlock {
            format: "csv".to_string(),
        });
    }
    Ok(records)
}

#[cfg(not(feature = "csv-blocks"))]
fn parse_csv(_body: &str) -> ExtractionResult<Vec<Record>> {
    Err(ExtractionError::UnsupportedFormat {
        format: "csv".to_string(),
    })
}

/// Parses the first block that yields records. Used by section bodies that
/// carry exactly one data block.
pub fn first_parsable_block(text: &str) -> Option<Vec<Record>> {
    find_blocks(text).iter().find_map(|block| match parse_block(block) {
        Ok(records) => Some(records),
        Err(e) => {
            warn!(language = %block.language, error = %e, "skipping fenced block");
            None
        }
    })
}

pub fn extract_fenced(text: &str) -> Option<Vec<Record>> {
    let mut records = Vec::new();
    for block in find_blocks(text) {
        match parse_block(&block) {
            Ok(mut parsed) => records.append(&mut parsed),
            Err(e @ ExtractionError::MalformedBlock { .. }) => {
                warn!(language = %block.language, error = %e, "malformed fenced block");
            }
            Err(e) => debug!(language = %block.language, error = %e, "fenced block ignored"),
        }
    }
    (!records.is_empty()).then_some(records)
}
