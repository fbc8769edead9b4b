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

//! Scoring of collected responses

use futures::stream::{self, StreamExt};
use release_copilot_core::{
    CaseOutcome, CollectedResponse, CompletedCollection, ScoredCase, SkippedCase,
};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::judge::JudgeAdapter;
use crate::metrics;
use crate::EvalConfig;

/// Score one collected response
///
/// Failed collections are skipped. The judge, when given, runs after the
/// metric scoring and never fails the case.
pub async fn evaluate_response(
    response: &CollectedResponse,
    judge: Option<&JudgeAdapter>,
) -> CaseOutcome {
    match response {
        CollectedResponse::Failed(failed) => {
            warn!(case = failed.test_case_id, error = %failed.error, "Skipping failed collection");
            CaseOutcome::Skipped(SkippedCase::new(
                failed.test_case_id,
                failed.query.clone(),
                failed.error.clone(),
            ))
        }
        CollectedResponse::Completed(completed) => {
            CaseOutcome::Scored(score_completed(completed, judge).await)
        }
    }
}

async fn score_completed(completed: &CompletedCollection, judge: Option<&JudgeAdapter>) -> ScoredCase {
    let expected: BTreeSet<String> = completed.expected_tools.iter().cloned().collect();
    let result = metrics::score(completed.test_case_id, &expected, &completed.actual_tool_calls);

    let judge = match judge {
        Some(judge) => Some(
            judge
                .judge(
                    &completed.query,
                    &completed.response,
                    &completed.actual_tool_calls,
                    &completed.expected_tools,
                )
                .await,
        ),
        None => None,
    };

    info!(
        case = result.test_case_id,
        precision = result.precision,
        recall = result.recall,
        f1 = result.f1,
        exact_match = result.exact_match,
        judge_overall = judge.as_ref().map(|j| j.overall),
        "Scored test case"
    );

    ScoredCase {
        result,
        query: completed.query.clone(),
        actual_tool_calls: completed.actual_tool_calls.clone(),
        judge,
        response: completed.response.clone(),
    }
}

/// Score every collected response
///
/// Up to `config.max_concurrent` cases run at once. Outcomes come back in
/// input order regardless.
pub async fn evaluate_collected(
    responses: &[CollectedResponse],
    judge: Option<&JudgeAdapter>,
    config: &EvalConfig,
) -> Vec<CaseOutcome> {
    info!(
        total = responses.len(),
        judge = judge.map(|j| j.model_name()),
        max_concurrent = config.max_concurrent,
        "Evaluating collected responses"
    );

    stream::iter(responses)
        .map(|response| evaluate_response(response, judge))
        .buffered(config.max_concurrent.max(1))
        .collect()
        .await
}
