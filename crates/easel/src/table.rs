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

use crate::record::{field_names, Record};
use crate::sections::TableBlock;
use serde::{Deserialize, Serialize};

/// Plain tabular output for renderers that show rows rather than a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}
impl TableSpec {
    pub fn from_records(records: Vec<Record>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        Some(Self {
            headers: field_names(&records),
            rows: records,
        })
    }
    pub fn from_block(block: &TableBlock) -> Option<Self> {
        if block.records.is_empty() {
            return None;
        }
        let headers = if block.headers.is_empty() {
            field_names(&block.records)
        } else {
            block.headers.clone()
        };
        Some(Self {
            headers,
            rows: block.records.clone(),
        })
    }
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_follow_first_appearance() {
        let table = TableSpec::from_records(vec![
            Record::new().with("b", 1.0),
            Record::new().with("a", "x").with("b", 2.0),
        ])
        .unwrap();
        assert_eq!(table.headers, vec!["b", "a"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn empty_inputs_produce_nothing() {
        assert!(TableSpec::from_records(Vec::new()).is_none());
        let block = TableBlock {
            headers: vec!["a".to_string()],
            records: Vec::new(),
        };
        assert!(TableSpec::from_block(&block).is_none());
    }

    #[test]
    fn block_headers_are_kept() {
        let block = TableBlock {
            headers: vec!["Region".to_string(), "Sales".to_string()],
            records: vec![Record::new().with("Region", "North").with("Sales", 4.0)],
        };
        let table = TableSpec::from_block(&block).unwrap();
        assert_eq!(table.headers, block.headers);
    }
}
