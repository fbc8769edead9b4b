// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Documents exchanged between collection, scoring, and the result store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::ToolCallRecord;

/// Scored tool selection for one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub test_case_id: u32,

    pub expected_tools: BTreeSet<String>,

    /// Distinct non-null names from the observed calls
    pub actual_tools: BTreeSet<String>,

    pub precision: f64,

    pub recall: f64,

    #[serde(rename = "f1_score")]
    pub f1: f64,

    pub exact_match: bool,

    pub correct_tools: BTreeSet<String>,

    pub missing_tools: BTreeSet<String>,

    pub extra_tools: BTreeSet<String>,
}

/// Verdict from the external judge
///
/// All four scores lie in `[0, 1]`. A failed judge call produces a
/// zero-filled score with `error` set and the reason in `rationale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeScore {
    #[serde(rename = "correctness_score")]
    pub correctness: f64,

    #[serde(rename = "completeness_score")]
    pub completeness: f64,

    #[serde(rename = "efficiency_score")]
    pub efficiency: f64,

    #[serde(rename = "overall_score")]
    pub overall: f64,

    #[serde(rename = "reasoning")]
    pub rationale: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JudgeScore {
    /// Zero-filled score carrying the failure reason
    pub fn failed(reason: impl fmt::Display) -> Self {
        let reason = reason.to_string();
        Self {
            correctness: 0.0,
            completeness: 0.0,
            efficiency: 0.0,
            overall: 0.0,
            rationale: format!("Evaluation failed: {}", reason),
            error: Some(reason),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Agent run captured for one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedCollection {
    pub test_case_id: u32,
    pub query: String,
    pub expected_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_tool_args: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub actual_tool_calls: Vec<ToolCallRecord>,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Agent run that raised for one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedCollection {
    pub test_case_id: u32,
    pub query: String,
    #[serde(default)]
    pub expected_tools: Vec<String>,
    pub error: String,
    #[serde(default)]
    pub timestamp: String,
}

/// One element of the collected-responses document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectedResponse {
    // Tried first: only failures carry `error`.
    Failed(FailedCollection),
    Completed(CompletedCollection),
}

impl CollectedResponse {
    pub fn test_case_id(&self) -> u32 {
        match self {
            Self::Failed(f) => f.test_case_id,
            Self::Completed(c) => c.test_case_id,
        }
    }

    pub fn query(&self) -> &str {
        match self {
            Self::Failed(f) => &f.query,
            Self::Completed(c) => &c.query,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A test case that was scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCase {
    #[serde(flatten)]
    pub result: EvaluationResult,

    pub query: String,

    pub actual_tool_calls: Vec<ToolCallRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge: Option<JudgeScore>,

    #[serde(default)]
    pub response: String,
}

/// A test case excluded from scoring because collection failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedCase {
    pub test_case_id: u32,
    pub query: String,
    pub error: String,
    pub skipped: bool,
}

impl SkippedCase {
    pub fn new(test_case_id: u32, query: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            test_case_id,
            query: query.into(),
            error: error.into(),
            skipped: true,
        }
    }
}

/// Outcome of evaluating one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaseOutcome {
    Scored(ScoredCase),
    Skipped(SkippedCase),
}

impl CaseOutcome {
    pub fn test_case_id(&self) -> u32 {
        match self {
            Self::Scored(s) => s.result.test_case_id,
            Self::Skipped(s) => s.test_case_id,
        }
    }

    pub fn as_scored(&self) -> Option<&ScoredCase> {
        match self {
            Self::Scored(s) => Some(s),
            Self::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Judge score averages over the cases that were judged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeSummary {
    pub judged: usize,
    pub failures: usize,
    pub average_overall: f64,
    pub average_correctness: f64,
    pub average_completeness: f64,
    pub average_efficiency: f64,
}

/// Aggregate statistics across a test suite
///
/// Averages are `None` when no case was scored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub scored: usize,
    pub skipped: usize,
    pub average_precision: Option<f64>,
    pub average_recall: Option<f64>,
    pub average_f1: Option<f64>,
    pub exact_match_count: usize,
    pub exact_match_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge: Option<JudgeSummary>,
}

/// Format a ratio as a percentage with two decimals, `n/a` when absent
pub fn format_percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", v * 100.0))
        .unwrap_or_else(|| "n/a".to_string())
}

impl fmt::Display for EvaluationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scored {} ({} skipped): precision {}, recall {}, F1 {}, exact match {} ({}/{})",
            self.scored,
            self.skipped,
            format_percent(self.average_precision),
            format_percent(self.average_recall),
            format_percent(self.average_f1),
            format_percent(self.exact_match_rate),
            self.exact_match_count,
            self.scored
        )
    }
}

/// The evaluation results document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub evaluation_timestamp: DateTime<Utc>,
    pub total_test_cases: usize,
    pub successful_evaluations: usize,
    pub summary: EvaluationSummary,
    pub results: Vec<CaseOutcome>,
}
