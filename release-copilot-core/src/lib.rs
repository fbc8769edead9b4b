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

//! # Release Copilot Core
//!
//! Shared data model for the trace capture and tool-call evaluation
//! pipeline:
//!
//! - **Spans**: timed records recovered from a span exporter's output
//! - **Transcripts**: agent run output carrying function-call content blocks
//! - **Ground truth**: test cases with their expected tool names
//! - **Results**: per-test-case scores, judge scores, and the run summary

pub mod error;
pub mod eval_dataset;
pub mod eval_result;
pub mod genai;
pub mod span;
pub mod tool;

pub use error::{CoreError, Result};
pub use eval_dataset::{load_ground_truth, parse_ground_truth, TestCase};
pub use eval_result::{
    format_percent, CaseOutcome, CollectedResponse, CompletedCollection, EvaluationReport,
    EvaluationResult, EvaluationSummary, FailedCollection, JudgeScore, JudgeSummary, ScoredCase,
    SkippedCase,
};
pub use span::{Span, SpanKind};
pub use tool::{AgentMessage, AgentRunResponse, ToolCallRecord};
