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

pub mod chart;
pub mod classifier;
pub mod config;
pub mod error;
pub mod extract;
pub mod intent;
pub mod processor;
pub mod profile;
pub mod record;
pub mod sections;
pub mod selector;
pub mod table;

pub use chart::{AxisLabels, ChartFamily, ChartOptions, ChartSpec, FieldRole, Role, SeriesSpec};
pub use classifier::{
    ClassificationResult, DocumentCategory, DocumentTypeClassifier, MessageInput, MessageMetadata,
};
pub use config::PipelineConfig;
pub use error::{ConfigError, EaselError, ErrorReporter, ExtractionError, Result};
pub use extract::{extract_records, GenericDataExtractor};
pub use processor::ChartDataProcessor;
pub use profile::{DataType, FieldProfile, RecordProfiler};
pub use record::{Record, Scalar};
pub use sections::{ParsedSection, SectionKind, StepType, StructuredResponse};
pub use selector::VisualizationSelector;
pub use table::TableSpec;

use chart::humanize;
use sections::VisualizationBlock;
use serde::Serialize;
use tracing::debug;

/// Everything the rendering side needs for one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutcome {
    pub classification: ClassificationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<StructuredResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableSpec>,
}
impl RenderOutcome {
    fn classified(classification: ClassificationResult) -> Self {
        Self {
            classification,
            structured: None,
            chart: None,
            table: None,
        }
    }
    /// Nothing beyond plain text to show.
    pub fn is_plain_text(&self) -> bool {
        self.chart.is_none() && self.table.is_none()
    }
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

pub struct RenderPipeline {
    config: PipelineConfig,
    classifier: DocumentTypeClassifier,
    extractor: GenericDataExtractor,
    selector: VisualizationSelector,
    processor: ChartDataProcessor,
}
impl RenderPipeline {
    pub fn new() -> Self {
        Self::build(PipelineConfig::default())
    }
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }
    fn build(config: PipelineConfig) -> Self {
        Self {
            classifier: DocumentTypeClassifier::new(config.knowledge_base_cues.clone()),
            extractor: GenericDataExtractor::with_memo(config.memo_capacity),
            selector: VisualizationSelector::new(config.pie_max_categories),
            processor: ChartDataProcessor::new(&config),
            config,
        }
    }
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
    pub fn classify(&self, message: &MessageInput) -> ClassificationResult {
        self.classifier.classify(message)
    }

    /// Never fails: missing or malformed structure narrows the outcome down
    /// to the classification alone.
    pub fn render(&self, message: &MessageInput, query: Option<&str>) -> RenderOutcome {
        let classification = self.classifier.classify(message);
        if !classification.needs_visualization {
            debug!(category = %classification.category, "visualization not needed");
            return RenderOutcome::classified(classification);
        }
        let requested = query.and_then(intent::requested_family);
        let text = message.content.as_str();
        let mut outcome = RenderOutcome::classified(classification);

        if sections::follows_convention(text) {
            let structured = sections::parse_structured(text);
            if let Some(block) = &structured.visualization {
                let records = block.records.clone().or_else(|| {
                    structured
                        .sections
                        .iter()
                        .find(|s| s.kind == SectionKind::Visualization)
                        .and_then(|s| self.extractor.extract(&s.raw_text))
                });
                outcome.chart = records.and_then(|records| {
                    let family = requested.or(block.family);
                    self.chart_for(&records, family, Some(block))
                });
            }
            outcome.table = structured.table.as_ref().and_then(TableSpec::from_block);
            outcome.structured = Some(structured);
        }
        if outcome.chart.is_none() {
            if let Some(records) = self.extractor.extract(text) {
                outcome.chart = self.chart_for(&records, requested, None);
            }
        }

        if outcome.table.is_none() {
            outcome.table = outcome
                .chart
                .as_ref()
                .filter(|c| c.family == ChartFamily::Table)
                .and_then(|c| TableSpec::from_records(c.data.clone()));
        }
        outcome
    }

    pub fn render_text(&self, text: &str) -> RenderOutcome {
        self.render(&MessageInput::new(text), None)
    }

    fn chart_for(
        &self,
        records: &[Record],
        requested: Option<ChartFamily>,
        block: Option<&VisualizationBlock>,
    ) -> Option<ChartSpec> {
        let mut spec = self.selector.select(records, requested)?;
        if let Some(block) = block {
            apply_block_overrides(&mut spec, block);
        }
        Some(self.processor.process(spec))
    }
}
impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_block_overrides(spec: &mut ChartSpec, block: &VisualizationBlock) {
    if let Some(title) = block.title.as_deref().filter(|t| !t.is_empty()) {
        spec.title = title.to_string();
    }
    if block.x_axis.is_some() || block.y_axis.is_some() {
        let fallback = |field: &Option<String>| field.as_deref().map(humanize).unwrap_or_default();
        spec.axis_labels = Some(AxisLabels {
            x: block
                .x_axis
                .clone()
                .unwrap_or_else(|| fallback(&spec.category_field)),
            y: block
                .y_axis
                .clone()
                .unwrap_or_else(|| fallback(&spec.value_field)),
        });
    }
}
