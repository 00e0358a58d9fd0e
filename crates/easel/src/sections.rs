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

//! Parser for answers written with the Summary / Steps / Insights /
//! Visualization / Table heading convention. Every section is optional and a
//! broken data block only removes its own sub-section.

use crate::chart::ChartFamily;
use crate::extract::markdown::MarkdownBlock;
use crate::extract::{fenced, markdown};
use crate::record::{field_names, parse_numeric, Record};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[ \t]*(#{1,6})?[ \t]*(\*\*)?[ \t]*(summary|steps|insights|visuali[sz]ation|table)[ \t]*(?:\*\*)?[ \t]*(:)?[ \t]*(?:\*\*)?[ \t]*(.*)$",
    )
    .expect("valid regex")
});
static STEP_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]+").expect("valid regex"));
static STEP_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\*\*)?([A-Z][A-Z_ ]*[A-Z])(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*").expect("valid regex")
});
static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:[-*•][ \t]+)?(?:\*\*)?(chart[ \t]*type|x[ \t-]*axis|y[ \t-]*axis|title)(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*(.+?)[ \t]*$",
    )
    .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Summary,
    Step,
    Insight,
    Visualization,
    Table,
}
impl SectionKind {
    fn from_heading(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "summary" => Some(SectionKind::Summary),
            "steps" => Some(SectionKind::Step),
            "insights" => Some(SectionKind::Insight),
            "visualization" | "visualisation" => Some(SectionKind::Visualization),
            "table" => Some(SectionKind::Table),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Filtering,
    Aggregation,
    Grouping,
    Sorting,
    Visualization,
    Comparative,
    Statistical,
    Insights,
    Table,
    Analysis,
}
impl StepType {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.trim() {
            "FILTERING" => Some(StepType::Filtering),
            "AGGREGATION" => Some(StepType::Aggregation),
            "GROUPING" => Some(StepType::Grouping),
            "SORTING" => Some(StepType::Sorting),
            "VISUALIZATION" | "VISUALISATION" => Some(StepType::Visualization),
            "COMPARATIVE" => Some(StepType::Comparative),
            "STATISTICAL" => Some(StepType::Statistical),
            "INSIGHTS" => Some(StepType::Insights),
            "TABLE" => Some(StepType::Table),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSection {
    pub kind: SectionKind,
    pub order: usize,
    pub raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_type: Option<StepType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizationBlock {
    pub chart_type: Option<String>,
    pub family: Option<ChartFamily>,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
    pub title: Option<String>,
    pub records: Option<Vec<Record>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
    pub sections: Vec<ParsedSection>,
    pub visualization: Option<VisualizationBlock>,
    pub table: Option<TableBlock>,
}
impl StructuredResponse {
    pub fn summary(&self) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.kind == SectionKind::Summary)
            .map(|s| s.raw_text.as_str())
    }
    pub fn steps(&self) -> Vec<&ParsedSection> {
        self.sections
            .iter()
            .filter(|s| s.kind == SectionKind::Step)
            .collect()
    }
    pub fn insights(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| s.kind == SectionKind::Insight)
            .map(|s| s.raw_text.as_str())
            .collect()
    }
}

struct HeadingHit {
    kind: SectionKind,
    line_start: usize,
    body_start: usize,
}

fn find_headings(text: &str) -> Vec<HeadingHit> {
    let mut hits = Vec::new();
    let mut offset = 0;
    for raw_line in text.split_inclusive('\n') {
        let line = raw_line.trim_end_matches(|c| c == '\n' || c == '\r');
        if let Some(caps) = HEADING.captures(line) {
            let hashes = caps.get(1).is_some();
            let bold = caps.get(2).is_some();
            let colon = caps.get(4).is_some();
            let rest = caps.get(5).map_or("", |m| m.as_str());
            // "Steps: 3500" is a data line, not a heading with a body.
            let accepted = if colon {
                parse_numeric(rest).is_none()
            } else {
                (hashes || bold) && rest.trim().is_empty()
            };
            if let (true, Some(kind)) = (accepted, SectionKind::from_heading(&caps[3])) {
                let body_start = offset + caps.get(5).map_or(line.len(), |m| m.start());
                hits.push(HeadingHit {
                    kind,
                    line_start: offset,
                    body_start,
                });
            }
        }
        offset += raw_line.len();
    }
    hits
}

/// Body of the first heading of `kind`, up to the next heading or end of text.
fn capture<'a>(text: &'a str, hits: &[HeadingHit], kind: SectionKind) -> Option<&'a str> {
    let idx = hits.iter().position(|h| h.kind == kind)?;
    let end = hits.get(idx + 1).map_or(text.len(), |next| next.line_start);
    let start = hits[idx].body_start.min(end);
    Some(text[start..end].trim())
}

/// True when the text is written in the heading convention: a Summary, Steps or
/// Insights heading, or any two distinct headings.
pub fn follows_convention(text: &str) -> bool {
    let hits = find_headings(text);
    let primary = hits.iter().any(|h| {
        matches!(
            h.kind,
            SectionKind::Summary | SectionKind::Step | SectionKind::Insight
        )
    });
    let kinds: HashSet<SectionKind> = hits.iter().map(|h| h.kind).collect();
    primary || kinds.len() >= 2
}

pub fn parse_steps(body: &str) -> Vec<ParsedSection> {
    let starts: Vec<(usize, usize)> = STEP_MARKER
        .find_iter(body)
        .map(|m| (m.start(), m.end()))
        .collect();
    let chunks: Vec<&str> = if starts.is_empty() {
        vec![body]
    } else {
        starts
            .iter()
            .enumerate()
            .map(|(i, (_, text_start))| {
                let end = starts.get(i + 1).map_or(body.len(), |(next, _)| *next);
                &body[*text_start..end]
            })
            .collect()
    };
    chunks
        .into_iter()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .enumerate()
        .map(|(i, chunk)| {
            let (step_type, text) = match STEP_TYPE.captures(chunk) {
                Some(caps) => match StepType::from_prefix(&caps[1]) {
                    Some(step_type) => (step_type, chunk[caps[0].len()..].trim()),
                    None => (StepType::Analysis, chunk),
                },
                None => (StepType::Analysis, chunk),
            };
            ParsedSection {
                kind: SectionKind::Step,
                order: i + 1,
                raw_text: text.to_string(),
                step_type: Some(step_type),
            }
        })
        .collect()
}

/// List items become one insight each, as do paragraphs beside them. A body
/// without any list is a single insight.
pub fn parse_insights(body: &str) -> Vec<String> {
    let blocks = markdown::scan_blocks(body);
    let has_list = blocks.iter().any(|b| matches!(b, MarkdownBlock::List(_)));
    let mut items: Vec<String> = Vec::new();
    for block in blocks {
        match block {
            MarkdownBlock::List(list) => items.extend(list),
            MarkdownBlock::Heading(text) | MarkdownBlock::Paragraph(text) => {
                items.push(text.split('\n').map(str::trim).join(" "))
            }
            MarkdownBlock::Code { .. } | MarkdownBlock::Table { .. } => {}
        }
    }
    items.retain(|item| !item.is_empty());
    if !has_list && !items.is_empty() {
        return vec![items.join(" ")];
    }
    items
}

fn clean_label(value: &str) -> Option<String> {
    let cleaned = value.replace("**", "").trim().trim_matches('"').trim().to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

pub fn parse_visualization(body: &str) -> VisualizationBlock {
    let mut block = VisualizationBlock::default();
    let prose = markdown::prose(&markdown::scan_blocks(body));
    for caps in LABEL.captures_iter(&prose) {
        let label: String = caps[1]
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        let value = clean_label(&caps[2]);
        let slot = match label.as_str() {
            "charttype" => &mut block.chart_type,
            "xaxis" => &mut block.x_axis,
            "yaxis" => &mut block.y_axis,
            "title" => &mut block.title,
            _ => continue,
        };
        if slot.is_none() {
            *slot = value;
        }
    }
    block.family = block.chart_type.as_deref().and_then(ChartFamily::from_label);
    block.records = fenced::first_parsable_block(body);
    block
}

pub fn parse_table(body: &str) -> Option<TableBlock> {
    if let Some(records) = fenced::first_parsable_block(body) {
        return Some(TableBlock {
            headers: field_names(&records),
            records,
        });
    }
    markdown::parse_markdown_table(body).map(|table| TableBlock {
        headers: table.headers,
        records: table.records,
    })
}

pub fn parse_structured(text: &str) -> StructuredResponse {
    let hits = find_headings(text);
    let mut response = StructuredResponse::default();

    if let Some(summary) = capture(text, &hits, SectionKind::Summary).filter(|s| !s.is_empty()) {
        response.sections.push(ParsedSection {
            kind: SectionKind::Summary,
            order: 1,
            raw_text: summary.to_string(),
            step_type: None,
        });
    }
    let steps = capture(text, &hits, SectionKind::Step)
        .map(parse_steps)
        .unwrap_or_default();
    let step_count = steps.len();
    response.sections.extend(steps);
    let insights = capture(text, &hits, SectionKind::Insight)
        .map(parse_insights)
        .unwrap_or_default();
    response
        .sections
        .extend(insights.into_iter().enumerate().map(|(i, raw_text)| ParsedSection {
            kind: SectionKind::Insight,
            order: i + 1,
            raw_text,
            step_type: None,
        }));
    if let Some(body) = capture(text, &hits, SectionKind::Visualization) {
        response.sections.push(ParsedSection {
            kind: SectionKind::Visualization,
            order: 1,
            raw_text: body.to_string(),
            step_type: None,
        });
        response.visualization = Some(parse_visualization(body));
    }
    if let Some(body) = capture(text, &hits, SectionKind::Table) {
        response.table = parse_table(body);
        if response.table.is_some() {
            response.sections.push(ParsedSection {
                kind: SectionKind::Table,
                order: 1,
                raw_text: body.to_string(),
                step_type: None,
            });
            response.sections.push(ParsedSection {
                kind: SectionKind::Step,
                order: step_count + 1,
                raw_text: body.to_string(),
                step_type: Some(StepType::Table),
            });
        } else {
            debug!("table section carried no parsable data");
        }
    }
    response
}
