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

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

static FENCED_DATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```[ \t]*(?:json|csv|data)\b").expect("valid regex"));
static TABLE_DELIMITER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*\|?[ \t]*:?-{3,}:?[ \t]*\|").expect("valid regex")
});
static PERCENTAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?[ \t]*%").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentCategory {
    Pdf,
    Spreadsheet,
    KnowledgeBase,
    JsonDocument,
    WordDocument,
    Text,
    Pending,
}
impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Pdf => "pdf",
            DocumentCategory::Spreadsheet => "spreadsheet",
            DocumentCategory::KnowledgeBase => "knowledge-base",
            DocumentCategory::JsonDocument => "json-document",
            DocumentCategory::WordDocument => "word-document",
            DocumentCategory::Text => "text",
            DocumentCategory::Pending => "pending",
        }
    }
}
impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filename extensions, matched exactly.
const FILE_EXTENSIONS: [(&str, DocumentCategory); 8] = [
    ("pdf", DocumentCategory::Pdf),
    ("xlsx", DocumentCategory::Spreadsheet),
    ("xls", DocumentCategory::Spreadsheet),
    ("csv", DocumentCategory::Spreadsheet),
    ("docx", DocumentCategory::WordDocument),
    ("doc", DocumentCategory::WordDocument),
    ("json", DocumentCategory::JsonDocument),
    ("txt", DocumentCategory::Text),
];
/// Content-type fragments, checked in order. Vendor fragments come first and
/// there is no bare "doc": every OOXML type contains "officedocument".
const CONTENT_TYPE_FRAGMENTS: [(&str, DocumentCategory); 10] = [
    ("pdf", DocumentCategory::Pdf),
    ("spreadsheetml", DocumentCategory::Spreadsheet),
    ("ms-excel", DocumentCategory::Spreadsheet),
    ("csv", DocumentCategory::Spreadsheet),
    ("spreadsheet", DocumentCategory::Spreadsheet),
    ("wordprocessingml", DocumentCategory::WordDocument),
    ("msword", DocumentCategory::WordDocument),
    ("json", DocumentCategory::JsonDocument),
    ("text/plain", DocumentCategory::Text),
    ("text/markdown", DocumentCategory::Text),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageMetadata {
    pub is_loading: bool,
    pub is_welcome: bool,
    pub suppress_visualization: bool,
    /// Category already decided upstream.
    pub category: Option<DocumentCategory>,
    pub collection_id: Option<String>,
    pub data_source_id: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub has_visualization: bool,
    pub has_steps: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInput {
    pub content: String,
    #[serde(default)]
    pub metadata: MessageMetadata,
}
impl MessageInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: MessageMetadata::default(),
        }
    }
    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: DocumentCategory,
    pub needs_visualization: bool,
    pub normalized_hints: BTreeMap<String, String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_lowercase())
}

pub struct DocumentTypeClassifier {
    knowledge_base_cues: Vec<String>,
}
impl DocumentTypeClassifier {
    pub fn new(knowledge_base_cues: Vec<String>) -> Self {
        Self {
            knowledge_base_cues: knowledge_base_cues
                .into_iter()
                .map(|cue| cue.to_lowercase())
                .collect(),
        }
    }

    /// First matching rule decides the category; metadata is checked before
    /// content. Inconclusive input lands in `knowledge-base` so that renderers
    /// always attempt a rich view.
    pub fn classify(&self, message: &MessageInput) -> ClassificationResult {
        let mut hints = BTreeMap::new();
        let category = self.decide_category(message, &mut hints);
        let needs_visualization = needs_visualization(category, message);
        ClassificationResult {
            category,
            needs_visualization,
            normalized_hints: hints,
        }
    }

    fn decide_category(
        &self,
        message: &MessageInput,
        hints: &mut BTreeMap<String, String>,
    ) -> DocumentCategory {
        let meta = &message.metadata;
        if meta.is_loading {
            hints.insert("source".to_string(), "loading".to_string());
            return DocumentCategory::Pending;
        }
        if let Some(category) = meta.category {
            hints.insert("source".to_string(), "override".to_string());
            return category;
        }
        let collection = present(&meta.collection_id);
        let data_source = present(&meta.data_source_id);
        if collection.is_some() || data_source.is_some() {
            hints.insert("source".to_string(), "knowledge-base-id".to_string());
            if let Some(id) = collection {
                hints.insert("collection_id".to_string(), id.to_string());
            }
            if let Some(id) = data_source {
                hints.insert("data_source_id".to_string(), id.to_string());
            }
            return DocumentCategory::KnowledgeBase;
        }
        if let Some(category) = Self::match_file_type(meta, hints) {
            return category;
        }
        let lower = message.content.to_lowercase();
        if let Some(cue) = self.knowledge_base_cues.iter().find(|c| lower.contains(c.as_str())) {
            hints.insert("source".to_string(), "content".to_string());
            hints.insert("matched_keyword".to_string(), cue.clone());
            return DocumentCategory::KnowledgeBase;
        }
        hints.insert("source".to_string(), "default".to_string());
        DocumentCategory::KnowledgeBase
    }

    fn match_file_type(
        meta: &MessageMetadata,
        hints: &mut BTreeMap<String, String>,
    ) -> Option<DocumentCategory> {
        if let Some(ext) = present(&meta.file_name).and_then(extension) {
            if let Some((keyword, category)) = FILE_EXTENSIONS.iter().find(|(k, _)| *k == ext) {
                hints.insert("source".to_string(), "file_name".to_string());
                hints.insert("file_extension".to_string(), ext.clone());
                hints.insert("matched_keyword".to_string(), keyword.to_string());
                return Some(*category);
            }
        }
        let content_type = present(&meta.content_type)?.to_lowercase();
        let (keyword, category) = CONTENT_TYPE_FRAGMENTS
            .iter()
            .find(|(k, _)| content_type.contains(k))?;
        hints.insert("source".to_string(), "content_type".to_string());
        hints.insert("matched_keyword".to_string(), keyword.to_string());
        Some(*category)
    }
}
impl Default for DocumentTypeClassifier {
    fn default() -> Self {
        Self::new(crate::config::PipelineConfig::default().knowledge_base_cues)
    }
}

/// Pure predicate over the decided category and the message.
pub fn needs_visualization(category: DocumentCategory, message: &MessageInput) -> bool {
    let meta = &message.metadata;
    if category == DocumentCategory::Pending || meta.suppress_visualization || meta.is_welcome {
        return false;
    }
    if category == DocumentCategory::KnowledgeBase || meta.has_visualization || meta.has_steps {
        return true;
    }
    let content = &message.content;
    FENCED_DATA.is_match(content) || TABLE_DELIMITER.is_match(content) || PERCENTAGE.is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: MessageInput) -> ClassificationResult {
        DocumentTypeClassifier::default().classify(&message)
    }

    fn with_meta(content: &str, metadata: MessageMetadata) -> MessageInput {
        MessageInput::new(content).with_metadata(metadata)
    }

    #[test]
    fn loading_is_pending_without_visualization() {
        let result = classify(with_meta(
            "```json\n[]\n```",
            MessageMetadata {
                is_loading: true,
                collection_id: Some("c1".to_string()),
                ..Default::default()
            },
        ));
        assert_eq!(result.category, DocumentCategory::Pending);
        assert!(!result.needs_visualization);
    }

    #[test]
    fn override_passes_through() {
        let result = classify(with_meta(
            "plain",
            MessageMetadata {
                category: Some(DocumentCategory::Text),
                file_name: Some("report.pdf".to_string()),
                ..Default::default()
            },
        ));
        assert_eq!(result.category, DocumentCategory::Text);
        assert_eq!(result.normalized_hints["source"], "override");
        assert!(!result.needs_visualization);
    }

    #[test]
    fn collection_id_beats_filename() {
        let result = classify(with_meta(
            "",
            MessageMetadata {
                collection_id: Some("sales-kb".to_string()),
                file_name: Some("q3.xlsx".to_string()),
                ..Default::default()
            },
        ));
        assert_eq!(result.category, DocumentCategory::KnowledgeBase);
        assert_eq!(result.normalized_hints["collection_id"], "sales-kb");
    }

    #[test]
    fn filename_and_content_type_table() {
        let cases = [
            (Some("Q3 Report.PDF"), None, DocumentCategory::Pdf),
            (Some("data.xls"), None, DocumentCategory::Spreadsheet),
            (Some("export.csv"), None, DocumentCategory::Spreadsheet),
            (Some("notes.docx"), None, DocumentCategory::WordDocument),
            (Some("payload.json"), None, DocumentCategory::JsonDocument),
            (None, Some("application/pdf"), DocumentCategory::Pdf),
            (
                None,
                Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
                DocumentCategory::Spreadsheet,
            ),
            (None, Some("application/msword"), DocumentCategory::WordDocument),
            (None, Some("text/plain"), DocumentCategory::Text),
            (None, Some("application/vnd.ms-excel"), DocumentCategory::Spreadsheet),
            (
                None,
                Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
                DocumentCategory::WordDocument,
            ),
        ];
        for (file_name, content_type, expected) in cases {
            let result = classify(with_meta(
                "",
                MessageMetadata {
                    file_name: file_name.map(str::to_string),
                    content_type: content_type.map(str::to_string),
                    ..Default::default()
                },
            ));
            assert_eq!(result.category, expected, "{file_name:?} {content_type:?}");
        }
    }

    #[test]
    fn presentation_content_type_is_not_a_word_document() {
        let result = classify(with_meta(
            "Slide notes",
            MessageMetadata {
                content_type: Some(
                    "application/vnd.openxmlformats-officedocument.presentationml.presentation"
                        .to_string(),
                ),
                ..Default::default()
            },
        ));
        assert_ne!(result.category, DocumentCategory::WordDocument);
        assert_ne!(result.normalized_hints.get("source").map(String::as_str), Some("content_type"));
    }

    #[test]
    fn lexical_cue_marks_knowledge_base() {
        let result = classify(MessageInput::new("Here are the Search Results for Q3"));
        assert_eq!(result.category, DocumentCategory::KnowledgeBase);
        assert_eq!(result.normalized_hints["matched_keyword"], "search results");
        assert!(result.needs_visualization);
    }

    #[test]
    fn inconclusive_defaults_to_knowledge_base() {
        let result = classify(MessageInput::new("Hello there"));
        assert_eq!(result.category, DocumentCategory::KnowledgeBase);
        assert_eq!(result.normalized_hints["source"], "default");
        assert!(result.needs_visualization);
    }

    #[test]
    fn welcome_and_suppressed_never_visualize() {
        for meta in [
            MessageMetadata {
                is_welcome: true,
                ..Default::default()
            },
            MessageMetadata {
                suppress_visualization: true,
                ..Default::default()
            },
        ] {
            assert!(!classify(with_meta("Apple: 40%", meta)).needs_visualization);
        }
    }

    #[test]
    fn content_signals_for_document_categories() {
        let pdf = |content: &str| {
            with_meta(
                content,
                MessageMetadata {
                    file_name: Some("a.pdf".to_string()),
                    ..Default::default()
                },
            )
        };
        assert!(!classify(pdf("Just prose.")).needs_visualization);
        assert!(classify(pdf("Margin rose 12.5 %")).needs_visualization);
        assert!(classify(pdf("| a | b |\n|---|---|\n| 1 | 2 |")).needs_visualization);
        assert!(classify(pdf("```json\n[{\"a\":1}]\n```")).needs_visualization);
        let with_steps = with_meta(
            "prose",
            MessageMetadata {
                file_name: Some("a.pdf".to_string()),
                has_steps: true,
                ..Default::default()
            },
        );
        assert!(classify(with_steps).needs_visualization);
    }
}
