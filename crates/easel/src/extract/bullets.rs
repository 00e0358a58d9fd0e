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

use crate::extract::markdown::{scan_blocks, MarkdownBlock};
use crate::record::Record;
use once_cell::sync::Lazy;
use regex::Regex;

static INSIGHT_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[^\n:]{0,30}?\b(?:insights?|findings?)\b[^\n]*$").expect("valid regex")
});

/// Bullet items carry no measured quantity; each counts once.
const PRESENCE_VALUE: f64 = 1.0;

fn presence_records(items: impl IntoIterator<Item = String>) -> Option<Vec<Record>> {
    let records: Vec<Record> = items
        .into_iter()
        .map(|item| Record::category_value(item, PRESENCE_VALUE))
        .collect();
    (!records.is_empty()).then_some(records)
}

fn is_insight_heading(block: &MarkdownBlock) -> bool {
    let title = match block {
        MarkdownBlock::Heading(text) => text.as_str(),
        MarkdownBlock::Paragraph(text) => text.lines().next().unwrap_or_default(),
        _ => return false,
    };
    title.len() <= 80 && INSIGHT_HEADING.is_match(title)
}

/// A paragraph such as "Next steps:" closes the previous section.
fn is_label(block: &MarkdownBlock) -> bool {
    matches!(block, MarkdownBlock::Paragraph(text) if text.trim_end().ends_with(':'))
}

/// The list directly under an "Insights" or "Findings" sub-heading.
pub fn extract_heading_bullets(text: &str) -> Option<Vec<Record>> {
    let blocks = scan_blocks(text);
    blocks.iter().enumerate().find_map(|(idx, block)| {
        if !is_insight_heading(block) {
            return None;
        }
        for next in &blocks[idx + 1..] {
            match next {
                MarkdownBlock::List(items) => return presence_records(items.iter().cloned()),
                MarkdownBlock::Heading(_) => return None,
                other if is_label(other) => return None,
                _ => {}
            }
        }
        None
    })
}

pub fn extract_any_bullets(text: &str) -> Option<Vec<Record>> {
    presence_records(scan_blocks(text).into_iter().flat_map(|block| match block {
        MarkdownBlock::List(items) => items,
        _ => Vec::new(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Scalar;

    #[test]
    fn picks_bullets_under_insights_heading() {
        let text = "Intro line\n- ignored\n\n### Key Insights\n- Revenue doubled\n- **Churn** fell\n\nClosing remark";
        let records = extract_heading_bullets(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Category"), Some(&Scalar::text("Revenue doubled")));
        assert_eq!(records[1].get("Category"), Some(&Scalar::text("Churn fell")));
        assert_eq!(records[1].get("Value"), Some(&Scalar::Number(1.0)));
    }

    #[test]
    fn stops_at_next_heading() {
        let text = "Findings:\n1. First\n2. Second\n## Next steps\n- not a finding";
        let records = extract_heading_bullets(text).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn heading_without_bullets_yields_none() {
        assert!(extract_heading_bullets("Insights:\nNothing listed.\n## Other\ntext").is_none());
    }

    #[test]
    fn any_bullets_anywhere() {
        let records = extract_any_bullets("Notes\n* one\n+ two\n\nplain\n\n3) three\n• four").unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[2], Record::category_value("three", 1.0));
        assert_eq!(records[3], Record::category_value("four", 1.0));
    }

    #[test]
    fn wrapped_items_stay_whole() {
        let text = "Key findings\n- Revenue doubled\n  in the north\n- Churn fell";
        let records = extract_heading_bullets(text).unwrap();
        assert_eq!(
            records[0],
            Record::category_value("Revenue doubled in the north", 1.0)
        );
    }

    #[test]
    fn list_under_unrelated_label_is_skipped() {
        let text = "Insights:\nNothing major.\n\nNext steps:\n- call the vendor";
        assert!(extract_heading_bullets(text).is_none());
    }

    #[test]
    fn horizontal_rules_are_not_bullets() {
        assert!(extract_any_bullets("---\n***\ntext").is_none());
    }
}
