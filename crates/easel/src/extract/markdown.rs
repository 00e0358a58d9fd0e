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

use crate::record::{coerce_scalar, Record, Scalar, CATEGORY_KEY, VALUE_KEY};
use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

// "•" is not a CommonMark list marker.
static UNICODE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)•[ \t]*").expect("valid regex"));

/// Block-level content of a message in document order. Nested list items are
/// flattened into their outermost list, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownBlock {
    Heading(String),
    Paragraph(String),
    List(Vec<String>),
    /// Fenced code only; indented code is never treated as data.
    Code { language: String, body: String },
    Table { headers: Vec<String>, rows: Vec<Vec<String>> },
}

#[derive(Default)]
struct BlockScanner {
    blocks: Vec<MarkdownBlock>,
    text: Option<String>,
    code: Option<(Option<String>, String)>,
    list_depth: usize,
    items: Vec<String>,
    item_stack: Vec<usize>,
    table: Option<(Vec<String>, Vec<Vec<String>>)>,
    row: Vec<String>,
    cell: Option<String>,
}
impl BlockScanner {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { .. } | Tag::Paragraph) => {
                if self.item_stack.is_empty() && self.table.is_none() {
                    self.text = Some(String::new());
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(text) = self.text.take() {
                    self.blocks.push(MarkdownBlock::Heading(text.trim().to_string()));
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if let Some(text) = self.text.take() {
                    self.blocks.push(MarkdownBlock::Paragraph(text.trim().to_string()));
                }
            }
            Event::Start(Tag::List(_)) => self.list_depth += 1,
            Event::End(TagEnd::List(_)) => {
                self.list_depth = self.list_depth.saturating_sub(1);
                if self.list_depth == 0 {
                    let items: Vec<String> = std::mem::take(&mut self.items)
                        .into_iter()
                        .map(|item| item.trim().to_string())
                        .filter(|item| !item.is_empty())
                        .collect();
                    self.item_stack.clear();
                    if !items.is_empty() {
                        self.blocks.push(MarkdownBlock::List(items));
                    }
                }
            }
            Event::Start(Tag::Item) => {
                self.item_stack.push(self.items.len());
                self.items.push(String::new());
            }
            Event::End(TagEnd::Item) => {
                self.item_stack.pop();
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => Some(
                        info.split_whitespace()
                            .next()
                            .unwrap_or_default()
                            .to_lowercase(),
                    ),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((Some(language), body)) = self.code.take() {
                    self.blocks.push(MarkdownBlock::Code { language, body });
                }
            }
            Event::Start(Tag::Table(_)) => self.table = Some((Vec::new(), Vec::new())),
            Event::End(TagEnd::Table) => {
                if let Some((headers, rows)) = self.table.take() {
                    self.blocks.push(MarkdownBlock::Table { headers, rows });
                }
            }
            Event::Start(Tag::TableHead | Tag::TableRow) => self.row.clear(),
            Event::End(TagEnd::TableHead) => {
                if let Some((headers, _)) = self.table.as_mut() {
                    *headers = std::mem::take(&mut self.row);
                }
            }
            Event::End(TagEnd::TableRow) => {
                if let Some((_, rows)) = self.table.as_mut() {
                    rows.push(std::mem::take(&mut self.row));
                }
            }
            Event::Start(Tag::TableCell) => self.cell = Some(String::new()),
            Event::End(TagEnd::TableCell) => {
                let cell = self.cell.take().unwrap_or_default();
                self.row.push(cell.trim().to_string());
            }
            Event::Text(text) | Event::Code(text) => self.push_text(&text),
            Event::SoftBreak | Event::HardBreak => self.push_break(),
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some((_, body)) = self.code.as_mut() {
            body.push_str(text);
        } else if let Some(cell) = self.cell.as_mut() {
            cell.push_str(text);
        } else if let Some(&idx) = self.item_stack.last() {
            self.items[idx].push_str(text);
        } else if let Some(buffer) = self.text.as_mut() {
            buffer.push_str(text);
        }
    }

    /// Line breaks survive in paragraphs so line-oriented labels still match.
    fn push_break(&mut self) {
        if let Some(cell) = self.cell.as_mut() {
            cell.push(' ');
        } else if let Some(&idx) = self.item_stack.last() {
            self.items[idx].push(' ');
        } else if let Some(buffer) = self.text.as_mut() {
            buffer.push('\n');
        }
    }
}

pub fn scan_blocks(text: &str) -> Vec<MarkdownBlock> {
    let normalised = UNICODE_BULLET.replace_all(text, "$1- ");
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    let mut scanner = BlockScanner::default();
    for event in Parser::new_ext(&normalised, options) {
        scanner.handle(event);
    }
    scanner.blocks
}

/// Text of every non-code block, one block per line. List items lose their
/// markers.
pub fn prose(blocks: &[MarkdownBlock]) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for block in blocks {
        match block {
            MarkdownBlock::Heading(text) | MarkdownBlock::Paragraph(text) => lines.push(text),
            MarkdownBlock::List(items) => lines.extend(items.iter().map(String::as_str)),
            MarkdownBlock::Code { .. } | MarkdownBlock::Table { .. } => {}
        }
    }
    lines.join("\n")
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownTable {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

/// First GFM pipe table with at least one body row that yields a record.
pub fn parse_markdown_table(text: &str) -> Option<MarkdownTable> {
    scan_blocks(text).into_iter().find_map(|block| match block {
        MarkdownBlock::Table { headers, rows } => table_records(headers, &rows),
        _ => None,
    })
}

fn table_records(headers: Vec<String>, rows: &[Vec<String>]) -> Option<MarkdownTable> {
    let headers: Vec<String> = headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| if h.is_empty() { format!("Column {}", i + 1) } else { h })
        .collect();
    let mut records: Vec<Record> = rows
        .iter()
        .map(|row| build_record(&headers, row))
        .filter(|r| !r.is_empty())
        .collect();
    if records.is_empty() {
        return None;
    }
    ensure_category_value(&headers, &mut records);
    Some(MarkdownTable { headers, records })
}

fn build_record(headers: &[String], cells: &[String]) -> Record {
    headers
        .iter()
        .zip(cells.iter())
        .filter(|(_, cell)| !cell.is_empty())
        .map(|(header, cell)| {
            let value = if header == CATEGORY_KEY {
                Scalar::text(cell.as_str())
            } else {
                coerce_scalar(Scalar::text(cell.as_str()))
            };
            (header.clone(), value)
        })
        .collect()
}

/// Adds Category/Value copies of the first string and first numeric column when
/// the table has no such headers. Original columns stay so their names remain
/// visible to role inference.
fn ensure_category_value(headers: &[String], records: &mut [Record]) {
    let Some(first) = records.first() else {
        return;
    };
    let category_source = (!headers.iter().any(|h| h == CATEGORY_KEY))
        .then(|| {
            headers
                .iter()
                .find(|h| matches!(first.get(h), Some(Scalar::Text(_))))
                .cloned()
        })
        .flatten();
    let value_source = (!headers.iter().any(|h| h == VALUE_KEY))
        .then(|| {
            headers
                .iter()
                .find(|h| matches!(first.get(h), Some(Scalar::Number(_))))
                .cloned()
        })
        .flatten();
    for record in records.iter_mut() {
        if let Some(source) = &category_source {
            if let Some(v) = record.get(source).cloned() {
                record.insert(CATEGORY_KEY, Scalar::Text(v.to_string()));
            }
        }
        if let Some(source) = &value_source {
            if let Some(v) = record.get(source).cloned() {
                record.insert(VALUE_KEY, v);
            }
        }
    }
}

pub fn extract_markdown_table(text: &str) -> Option<Vec<Record>> {
    parse_markdown_table(text).map(|table| table.records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_value_table_yields_one_record_per_row() {
        let text = "| Category | Value |\n|---|---:|\n| North | 10 |\n| South | 20.5 |\n| East | 3 |";
        let records = extract_markdown_table(text).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], Record::category_value("South", 20.5));
    }

    #[test]
    fn percentages_are_fractions() {
        let text = "| Segment | Share |\n| :-- | :-: |\n| Retail | 45% |\n| Online | 55% |";
        let records = extract_markdown_table(text).unwrap();
        assert_eq!(records[0].get("Share"), Some(&Scalar::Number(0.45)));
    }

    #[test]
    fn remaps_first_string_and_numeric_columns() {
        let text = "| Month | Region | Sales |\n|---|---|---|\n| Jan | North | 1,200 |";
        let table = parse_markdown_table(text).unwrap();
        assert_eq!(table.headers, vec!["Month", "Region", "Sales"]);
        let record = &table.records[0];
        assert_eq!(record.get("Month"), Some(&Scalar::text("Jan")));
        assert_eq!(record.get(CATEGORY_KEY), Some(&Scalar::text("Jan")));
        assert_eq!(record.get(VALUE_KEY), Some(&Scalar::Number(1200.0)));
    }

    #[test]
    fn numeric_category_cells_stay_text() {
        let text = "| Category | Value |\n|---|---|\n| 2021 | 4 |";
        let records = extract_markdown_table(text).unwrap();
        assert_eq!(records[0].get(CATEGORY_KEY), Some(&Scalar::text("2021")));
    }

    #[test]
    fn short_rows_tolerate_missing_cells() {
        let text = "| a | b | c |\n|---|---|---|\n| x | 1 |\n| y | 2 | 3 | 99 |";
        let records = extract_markdown_table(text).unwrap();
        assert!(!records[0].contains_key("c"));
        assert_eq!(records[1].get("c"), Some(&Scalar::Number(3.0)));
        assert!(!records[1].contains_key("Column 4"));
    }

    #[test]
    fn markup_inside_cells_is_dropped() {
        let text = "Quarterly view:\n\n| **Region** | `Sales` |\n|---|---|\n| *North* | 1,200 |";
        let table = parse_markdown_table(text).unwrap();
        assert_eq!(table.headers, vec!["Region", "Sales"]);
        assert_eq!(table.records[0].get("Region"), Some(&Scalar::text("North")));
        assert_eq!(table.records[0].get("Sales"), Some(&Scalar::Number(1200.0)));
    }

    #[test]
    fn pipes_inside_code_fences_are_not_tables() {
        let text = "```text\n| a | b |\n|---|---|\n| 1 | 2 |\n```";
        assert!(extract_markdown_table(text).is_none());
    }

    #[test]
    fn blocks_keep_document_order() {
        let text = "## Notes\nIntro\n\n- one\n  - nested\n- two\n\n```json\n[1]\n```";
        let blocks = scan_blocks(text);
        assert_eq!(
            blocks,
            vec![
                MarkdownBlock::Heading("Notes".to_string()),
                MarkdownBlock::Paragraph("Intro".to_string()),
                MarkdownBlock::List(vec!["one".to_string(), "nested".to_string(), "two".to_string()]),
                MarkdownBlock::Code {
                    language: "json".to_string(),
                    body: "[1]\n".to_string()
                },
            ]
        );
        assert_eq!(prose(&blocks), "Notes\nIntro\none\nnested\ntwo");
    }

    #[test]
    fn unicode_bullets_become_list_items() {
        let blocks = scan_blocks("• first\n•second");
        assert_eq!(
            blocks,
            vec![MarkdownBlock::List(vec!["first".to_string(), "second".to_string()])]
        );
    }

    #[test]
    fn requires_separator_and_body() {
        assert!(extract_markdown_table("| a | b |\n| 1 | 2 |\n| 3 | 4 |").is_none());
        assert!(extract_markdown_table("| a | b |\n|---|---|").is_none());
        assert!(extract_markdown_table("no table here").is_none());
    }
}
