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

//! Agent response collection
//!
//! Each ground-truth query runs through the agent once, strictly in fixture
//! order. A run that fails or times out is recorded as a
//! [`FailedCollection`] and the batch moves on.

use chrono::{SecondsFormat, Utc};
use release_copilot_core::{
    CollectedResponse, CompletedCollection, CoreError, FailedCollection, TestCase, ToolCallRecord,
};
use release_copilot_observability::genai_conventions::{span_name, Operation};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{field, info, info_span, warn, Instrument};

use crate::agent::AgentRunner;
use crate::store::write_json_atomic;
use crate::tool_calls::extract_tool_calls;
use crate::{EvalError, Result};

pub const DEFAULT_AGENT_URL: &str = "http://localhost:8000/chat";
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);

/// Collection settings
#[derive(Debug, Clone, PartialEq)]
pub struct CollectConfig {
    pub agent_url: String,
    /// Per-run timeout
    pub timeout: Duration,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            agent_url: DEFAULT_AGENT_URL.to_string(),
            timeout: DEFAULT_RUN_TIMEOUT,
        }
    }
}

impl CollectConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            agent_url: env::var("RELEASE_COPILOT_AGENT_URL").unwrap_or(defaults.agent_url),
            timeout: env::var("RELEASE_COPILOT_RUN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// Runs test cases through an agent and records what it did
pub struct Collector {
    runner: Arc<dyn AgentRunner>,
    timeout: Duration,
}

impl Collector {
    pub fn new(runner: Arc<dyn AgentRunner>) -> Self {
        Self {
            runner,
            timeout: DEFAULT_RUN_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run every test case, in order
    pub async fn collect(&self, test_cases: &[TestCase]) -> Vec<CollectedResponse> {
        let mut collected = Vec::with_capacity(test_cases.len());

        for test_case in test_cases {
            info!(
                case = test_case.id,
                total = test_cases.len(),
                query = %test_case.query,
                "Running test case"
            );
            collected.push(self.collect_one(test_case).await);
        }

        collected
    }

    /// Run every test case and write the collected-responses document
    pub async fn collect_to_file(
        &self,
        test_cases: &[TestCase],
        output: impl AsRef<Path>,
    ) -> Result<Vec<CollectedResponse>> {
        let collected = self.collect(test_cases).await;
        write_json_atomic(output.as_ref(), &collected)?;
        info!(
            path = %output.as_ref().display(),
            count = collected.len(),
            failed = collected.iter().filter(|c| c.is_failure()).count(),
            "Saved collected responses"
        );
        Ok(collected)
    }

    pub async fn collect_one(&self, test_case: &TestCase) -> CollectedResponse {
        let span = info_span!(
            "invoke_agent",
            "otel.name" = %span_name(Operation::InvokeAgent, self.runner.name()),
            "gen_ai.operation.name" = Operation::InvokeAgent.as_str(),
            "gen_ai.agent.name" = self.runner.name(),
            test_case_id = test_case.id,
            tool_calls = field::Empty,
        );

        let run = tokio::time::timeout(self.timeout, self.runner.run(&test_case.query))
            .instrument(span.clone())
            .await
            .map_err(|_| EvalError::AgentTimeout(self.timeout))
            .and_then(|r| r);
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        match run {
            Ok(response) => {
                let tool_calls = extract_tool_calls(&response);
                span.record("tool_calls", tool_calls.len());
                span.in_scope(|| record_tool_spans(&tool_calls));
                info!(
                    case = test_case.id,
                    tool_calls = tool_calls.len(),
                    tools = ?tool_calls.iter().filter_map(|c| c.name.as_deref()).collect::<Vec<_>>(),
                    "Agent completed"
                );

                CollectedResponse::Completed(CompletedCollection {
                    test_case_id: test_case.id,
                    query: test_case.query.clone(),
                    expected_tools: test_case.expected_tools.clone(),
                    expected_tool_args: test_case.expected_tool_args.clone(),
                    actual_tool_calls: tool_calls,
                    response: response.response_text(),
                    timestamp,
                })
            }
            Err(e) => {
                warn!(case = test_case.id, error = %e, "Agent run failed");
                CollectedResponse::Failed(FailedCollection {
                    test_case_id: test_case.id,
                    query: test_case.query.clone(),
                    expected_tools: test_case.expected_tools.clone(),
                    error: e.to_string(),
                    timestamp,
                })
            }
        }
    }
}

/// One `execute_tool` span per observed call, under the current agent span
fn record_tool_spans(tool_calls: &[ToolCallRecord]) {
    for call in tool_calls {
        let name = call.name.as_deref().unwrap_or("unknown");
        let input = serde_json::Value::Object(call.arguments.clone()).to_string();
        let _span = info_span!(
            "execute_tool",
            "otel.name" = %span_name(Operation::ExecuteTool, name),
            "gen_ai.operation.name" = Operation::ExecuteTool.as_str(),
            "gen_ai.tool.name" = name,
            "gen_ai.tool.call.id" = call.id.as_deref().unwrap_or_default(),
            "gen_ai.tool.input" = input.as_str(),
        )
        .entered();
    }
}

/// Load a collected-responses document
pub fn load_collected_responses(path: impl AsRef<Path>) -> Result<Vec<CollectedResponse>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CoreError::NotFound(path.to_path_buf()).into());
    }

    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use release_copilot_core::AgentRunResponse;
    use serde_json::json;

    /// Fails on queries containing "boom", sleeps on "slow"
    struct FakeAgent;

    #[async_trait]
    impl AgentRunner for FakeAgent {
        async fn run(&self, query: &str) -> Result<AgentRunResponse> {
            if query.contains("boom") {
                return Err(EvalError::Agent("model deployment unavailable".to_string()));
            }
            if query.contains("slow") {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(serde_json::from_value(json!({
                "messages": [
                    {"role": "user", "text": query},
                    {"role": "assistant", "contents": [
                        {"type": "function_call", "call_id": "call_1",
                         "name": "get_pipeline_status",
                         "arguments": "{\"service\": \"payments\", \"environment\": \"prod\"}"}
                    ]},
                    {"role": "assistant", "text": "payments is green in prod."}
                ]
            }))?)
        }
    }

    fn cases() -> Vec<TestCase> {
        vec![
            TestCase::new(1, "status of payments in prod", vec!["get_pipeline_status".into()]),
            TestCase::new(2, "boom", vec!["get_job_logs".into()]),
            TestCase::new(3, "slow query", vec!["get_pipeline_status".into()]),
        ]
    }

    #[tokio::test]
    async fn test_failures_are_recorded_per_case() {
        let collector = Collector::new(Arc::new(FakeAgent)).with_timeout(Duration::from_millis(50));
        let collected = collector.collect(&cases()).await;

        let ids: Vec<_> = collected.iter().map(|c| c.test_case_id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        match &collected[0] {
            CollectedResponse::Completed(c) => {
                assert_eq!(c.actual_tool_calls[0].name.as_deref(), Some("get_pipeline_status"));
                assert_eq!(c.response, "payments is green in prod.");
                assert!(!c.timestamp.is_empty());
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert!(matches!(&collected[1], CollectedResponse::Failed(f) if f.error.contains("unavailable")));
        assert!(matches!(&collected[2], CollectedResponse::Failed(f) if f.error.contains("timed out")));
    }

    #[tokio::test]
    async fn test_collect_to_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collected_responses.json");

        let collector = Collector::new(Arc::new(FakeAgent)).with_timeout(Duration::from_millis(50));
        let written = collector.collect_to_file(&cases()[..2], &path).await.unwrap();

        let loaded = load_collected_responses(&path).unwrap();
        assert_eq!(loaded, written);
        assert!(loaded[1].is_failure());
    }

    #[test]
    fn test_collect_config_from_env() {
        env::set_var("RELEASE_COPILOT_AGENT_URL", "http://agent:9000/chat");
        env::set_var("RELEASE_COPILOT_RUN_TIMEOUT_SECS", "not-a-number");
        let config = CollectConfig::from_env();
        assert_eq!(config.agent_url, "http://agent:9000/chat");
        assert_eq!(config.timeout, DEFAULT_RUN_TIMEOUT);
        env::remove_var("RELEASE_COPILOT_AGENT_URL");
        env::remove_var("RELEASE_COPILOT_RUN_TIMEOUT_SECS");
    }

    #[test]
    fn test_missing_collected_file() {
        let err = load_collected_responses("/nonexistent/collected.json").unwrap_err();
        assert!(matches!(err, EvalError::Core(CoreError::NotFound(_))));
    }
}
