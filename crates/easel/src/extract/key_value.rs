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
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

static PLAIN_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:\*\*)?([A-Za-z][^:\n*]{0,80}?)(?:\*\*)?[ \t]*:[ \t]*(?:\*\*)?[$€£]?(-?\d[\d,]*(?:\.\d+)?)(?:\*\*)?[ \t]*%?[ \t]*$",
    )
    .expect("valid regex")
});
static BULLET_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*[•\-*+][ \t]+(?:\*\*)?([^:\n*]+?)(?:\*\*)?[ \t]*:[ \t]*(?:\*\*)?[$€£]?(-?\d[\d,]*(?:\.\d+)?)",
    )
    .expect("valid regex")
});
static PERMISSIVE_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z0-9 _&/()'\-]{0,60}?)[ \t]*:[ \t]*[$€£]?(-?\d[\d,]*(?:\.\d+)?)")
        .expect("valid regex")
});

fn pair_from(caps: &Captures<'_>) -> Option<(String, f64)> {
    let key = caps.get(1)?.as_str().trim().trim_matches('*').trim();
    if key.is_empty() {
        return None;
    }
    let value: f64 = caps.get(2)?.as_str().replace(',', "").parse().ok()?;
    Some((key.to_string(), value))
}

/// "at 10:30" reads as a clock time, not a labelled quantity.
fn is_clock_time(key: &str) -> bool {
    key.split_whitespace()
        .last()
        .is_some_and(|token| token.chars().all(|c| c.is_ascii_digit()))
}

/// Three independent passes merged into one list: plain "Key: 123" lines,
/// bulleted "• Key: 123" lines, then a permissive "text: number" scan that
/// skips categories the first two already captured.
pub fn extract_key_values(text: &str) -> Option<Vec<Record>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    for regex in [&*PLAIN_LINE, &*BULLET_LINE] {
        for (key, value) in regex.captures_iter(text).filter_map(|c| pair_from(&c)) {
            seen.insert(key.to_lowercase());
            records.push(Record::category_value(key, value));
        }
    }
    for (key, value) in PERMISSIVE_PAIR
        .captures_iter(text)
        .filter_map(|c| pair_from(&c))
    {
        if is_clock_time(&key) || !seen.insert(key.to_lowercase()) {
            continue;
        }
        records.push(Record::category_value(key, value));
    }
    (!records.is_empty()).then_some(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_in_order() {
        let records = extract_key_values("Apple: 40\nBanana: 25\nCherry: 10").unwrap();
        assert_eq!(
            records,
            vec![
                Record::category_value("Apple", 40.0),
                Record::category_value("Banana", 25.0),
                Record::category_value("Cherry", 10.0),
            ]
        );
    }

    #[test]
    fn bulleted_and_bold_lines() {
        let text = "- **North**: 1,200\n• South: 800\n**East**: 50%";
        let records = extract_key_values(text).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], Record::category_value("East", 50.0));
        assert_eq!(records[1], Record::category_value("North", 1200.0));
        assert_eq!(records[2], Record::category_value("South", 800.0));
    }

    #[test]
    fn permissive_pass_skips_captured_categories() {
        let text = "Apple: 40\nWe also saw Pears: 12 in the second batch.";
        let records = extract_key_values(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], Record::category_value("We also saw Pears", 12.0));
    }

    #[test]
    fn clock_times_are_ignored() {
        assert!(extract_key_values("The meeting starts at 10:30 sharp.").is_none());
    }

    #[test]
    fn nothing_numeric_yields_none() {
        assert!(extract_key_values("Note: see attached\nOwner: finance").is_none());
    }
}
