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

pub mod bullets;
pub mod fenced;
pub mod key_value;
pub mod markdown;

use crate::record::Record;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::debug;

pub use fenced::{extract_fenced, find_blocks, parse_block, FencedBlock};
pub use markdown::{extract_markdown_table, parse_markdown_table, MarkdownTable};

/// A single extraction strategy: `None` means "nothing here, try the next one".
pub type Strategy = fn(&str) -> Option<Vec<Record>>;

/// Strategies in priority order; the first to produce a record wins.
pub const STRATEGIES: [(&str, Strategy); 5] = [
    ("fenced_block", fenced::extract_fenced),
    ("markdown_table", markdown::extract_markdown_table),
    ("key_value", key_value::extract_key_values),
    ("heading_bullets", bullets::extract_heading_bullets),
    ("any_bullets", bullets::extract_any_bullets),
];

/// Runs the strategy cascade. A `Some` result is never empty.
pub fn extract_records(text: &str) -> Option<Vec<Record>> {
    let found = STRATEGIES.iter().find_map(|(name, strategy)| {
        strategy(text)
            .filter(|records| !records.is_empty())
            .map(|records| (*name, records))
    });
    match found {
        Some((name, records)) => {
            debug!(strategy = name, records = records.len(), "extracted records");
            Some(records)
        }
        None => {
            debug!(chars = text.len(), "no extractable structure");
            None
        }
    }
}

pub struct GenericDataExtractor {
    memo: Option<Mutex<LruCache<String, Option<Vec<Record>>>>>,
}
impl GenericDataExtractor {
    pub fn new() -> Self {
        Self { memo: None }
    }
    pub fn with_memo(capacity: usize) -> Self {
        Self {
            memo: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }
    /// Same answer as [`extract_records`]; the memo only avoids repeat work.
    pub fn extract(&self, text: &str) -> Option<Vec<Record>> {
        let Some(memo) = &self.memo else {
            return extract_records(text);
        };
        if let Ok(mut cache) = memo.lock() {
            if let Some(hit) = cache.get(text) {
                return hit.clone();
            }
        }
        let result = extract_records(text);
        if let Ok(mut cache) = memo.lock() {
            cache.put(text.to_string(), result.clone());
        }
        result
    }
    pub fn cached_entries(&self) -> usize {
        self.memo
            .as_ref()
            .and_then(|m| m.lock().ok().map(|cache| cache.len()))
            .unwrap_or(0)
    }
}
impl Default for GenericDataExtractor {
    fn default() -> Self {
        Self::new()
    }
}
