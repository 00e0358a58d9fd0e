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

use crate::chart::ChartFamily;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisGoal {
    ShowDistribution,
    Compare,
    ShowTrend,
    FindRelationship,
}
impl AnalysisGoal {
    pub fn chart_family(&self) -> ChartFamily {
        match self {
            AnalysisGoal::ShowDistribution => ChartFamily::Pie,
            AnalysisGoal::Compare => ChartFamily::Bar,
            AnalysisGoal::ShowTrend => ChartFamily::Line,
            AnalysisGoal::FindRelationship => ChartFamily::Scatter,
        }
    }
}

static EXPLICIT_MENTIONS: Lazy<Vec<(ChartFamily, Regex)>> = Lazy::new(|| {
    [
        (ChartFamily::Pie, r"\b(?:pie|donut|doughnut)\b"),
        (ChartFamily::Bar, r"\b(?:bar|column)\s*(?:chart|graph|plot)s?\b|\bhistogram\b"),
        (ChartFamily::Line, r"\bline\s*(?:chart|graph|plot)s?\b"),
        (ChartFamily::Area, r"\barea\s*(?:chart|graph|plot)s?\b"),
        (ChartFamily::Scatter, r"\bscatter\s*(?:chart|graph|plot)?s?\b"),
        (ChartFamily::Table, r"\b(?:as|in)\s+a\s+table\b|\btable\s+(?:view|format)\b"),
    ]
    .into_iter()
    .map(|(family, pattern)| (family, Regex::new(pattern).expect("valid regex")))
    .collect()
});

static GOAL_CUES: Lazy<Vec<(AnalysisGoal, Regex)>> = Lazy::new(|| {
    [
        (AnalysisGoal::ShowDistribution, r"\b(?:distribution|breakdown|break down|proportion|share)s?\b"),
        (AnalysisGoal::Compare, r"\b(?:compare|comparison|comparing|versus|vs\.?)\b"),
        (AnalysisGoal::ShowTrend, r"\b(?:trends?|over time|timeline|growth over)\b"),
        (AnalysisGoal::FindRelationship, r"\b(?:relationship|correlation|correlate[sd]?)\b"),
    ]
    .into_iter()
    .map(|(goal, pattern)| (goal, Regex::new(pattern).expect("valid regex")))
    .collect()
});

pub fn detect_goal(query: &str) -> Option<AnalysisGoal> {
    let lower = query.to_lowercase();
    GOAL_CUES
        .iter()
        .find(|(_, cue)| cue.is_match(&lower))
        .map(|(goal, _)| *goal)
}

/// Chart family the user asked for, if any. An explicit chart name beats a
/// semantic cue; within each list the first entry that matches wins.
pub fn requested_family(query: &str) -> Option<ChartFamily> {
    let lower = query.to_lowercase();
    EXPLICIT_MENTIONS
        .iter()
        .find(|(_, mention)| mention.is_match(&lower))
        .map(|(family, _)| *family)
        .or_else(|| detect_goal(&lower).map(|goal| goal.chart_family()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_mention_wins_over_cue() {
        assert_eq!(
            requested_family("Show the distribution as a bar chart"),
            Some(ChartFamily::Bar)
        );
        assert_eq!(requested_family("make a pie of revenue"), Some(ChartFamily::Pie));
    }

    #[test]
    fn semantic_cues_map_to_families() {
        assert_eq!(requested_family("What is the breakdown by region?"), Some(ChartFamily::Pie));
        assert_eq!(requested_family("Compare Q1 versus Q2"), Some(ChartFamily::Bar));
        assert_eq!(requested_family("How did sales change over time?"), Some(ChartFamily::Line));
        assert_eq!(
            requested_family("Is there a correlation between price and demand?"),
            Some(ChartFamily::Scatter)
        );
    }

    #[test]
    fn first_cue_in_list_order_wins() {
        assert_eq!(detect_goal("compare the distribution"), Some(AnalysisGoal::ShowDistribution));
    }

    #[test]
    fn unrelated_query_leaves_family_unset() {
        assert_eq!(requested_family("Summarise the attached report"), None);
        assert_eq!(requested_family(""), None);
    }
}
