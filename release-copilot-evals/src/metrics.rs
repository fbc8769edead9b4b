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

//! Tool selection metrics
//!
//! Let A be the set of tool names actually called and E the expected set:
//!
//! Precision = |A ∩ E| / |A|   (0 when A is empty)
//! Recall    = |A ∩ E| / |E|   (0 when E is empty)
//! F1        = 2 * (Precision * Recall) / (Precision + Recall)   (0 when the sum is 0)
//!
//! Exact match holds when A == E as sets.

use release_copilot_core::{
    CaseOutcome, EvaluationResult, EvaluationSummary, JudgeScore, JudgeSummary, ToolCallRecord,
};
use std::collections::BTreeSet;

/// Score the tool calls of one test case against its expected tool names
pub fn score(
    test_case_id: u32,
    expected: &BTreeSet<String>,
    actual_calls: &[ToolCallRecord],
) -> EvaluationResult {
    let actual: BTreeSet<String> = actual_calls
        .iter()
        .filter_map(|call| call.name.clone())
        .filter(|name| !name.is_empty())
        .collect();

    let correct: BTreeSet<String> = expected.intersection(&actual).cloned().collect();
    let missing: BTreeSet<String> = expected.difference(&actual).cloned().collect();
    let extra: BTreeSet<String> = actual.difference(expected).cloned().collect();

    let precision = ratio(correct.len(), actual.len());
    let recall = ratio(correct.len(), expected.len());
    let f1 = if precision + recall > 0.0 {
        2.0 * (precision * recall) / (precision + recall)
    } else {
        0.0
    };

    EvaluationResult {
        test_case_id,
        exact_match: *expected == actual,
        expected_tools: expected.clone(),
        actual_tools: actual,
        precision,
        recall,
        f1,
        correct_tools: correct,
        missing_tools: missing,
        extra_tools: extra,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Aggregate a test suite; skipped cases only count toward `skipped`
pub fn aggregate(outcomes: &[CaseOutcome]) -> EvaluationSummary {
    let scored: Vec<_> = outcomes.iter().filter_map(CaseOutcome::as_scored).collect();
    let skipped = outcomes.len() - scored.len();

    let exact_match_count = scored.iter().filter(|c| c.result.exact_match).count();
    let judged: Vec<&JudgeScore> = scored.iter().filter_map(|c| c.judge.as_ref()).collect();

    EvaluationSummary {
        scored: scored.len(),
        skipped,
        average_precision: mean(scored.iter().map(|c| c.result.precision)),
        average_recall: mean(scored.iter().map(|c| c.result.recall)),
        average_f1: mean(scored.iter().map(|c| c.result.f1)),
        exact_match_count,
        exact_match_rate: (!scored.is_empty())
            .then(|| exact_match_count as f64 / scored.len() as f64),
        judge: summarize_judge(&judged),
    }
}

/// Failed judge calls carry zero scores and stay in the averages
fn summarize_judge(scores: &[&JudgeScore]) -> Option<JudgeSummary> {
    Some(JudgeSummary {
        judged: scores.len(),
        failures: scores.iter().filter(|s| s.is_failure()).count(),
        average_overall: mean(scores.iter().map(|s| s.overall))?,
        average_correctness: mean(scores.iter().map(|s| s.correctness))?,
        average_completeness: mean(scores.iter().map(|s| s.completeness))?,
        average_efficiency: mean(scores.iter().map(|s| s.efficiency))?,
    })
}
