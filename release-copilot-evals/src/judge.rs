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

//! LLM-as-judge for tool selection
//!
//! The judge sees the query, the available tools, the expected tool names,
//! the observed calls and the agent's answer, and must reply with
//!
//! ```json
//! {"correctness_score": 0.9, "completeness_score": 1.0,
//!  "efficiency_score": 0.8, "overall_score": 0.9, "reasoning": "..."}
//! ```
//!
//! Every score must be a finite number in `[0, 1]`. A failed call, a timeout,
//! or a reply outside that contract yields [`JudgeScore::failed`]; the judge
//! never returns an error to its caller.

use release_copilot_core::{JudgeScore, ToolCallRecord};
use release_copilot_observability::genai_conventions::{keys, span_name, Operation};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{field, info_span, warn, Instrument};

use crate::llm_client::{AzureOpenAIClient, LLMClient, OpenAIClient, DEFAULT_AZURE_API_VERSION};
use crate::EvalError;

pub const DEFAULT_JUDGE_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Definition of a tool the agent can call, shown to the judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// The Release Copilot agent's tools
    pub fn release_copilot_tools() -> Vec<Self> {
        vec![
            Self::new(
                "get_pipeline_status",
                "Get the status of a deployment pipeline for a specific service and environment",
            ),
            Self::new(
                "get_job_logs",
                "Get the logs from a specific job to understand what happened during execution",
            ),
        ]
    }
}

/// Which judge service to call
#[derive(Debug, Clone, PartialEq)]
pub enum JudgeBackend {
    AzureOpenAI {
        endpoint: String,
        deployment: String,
        api_key: String,
        api_version: String,
    },
    OpenAI {
        api_key: String,
        model: String,
        base_url: Option<String>,
    },
}

/// Judge configuration
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeConfig {
    pub backend: JudgeBackend,
    /// Per-call timeout; expiry counts as a judge failure
    pub timeout: Duration,
}

impl JudgeConfig {
    /// Read judge credentials from the environment
    ///
    /// Azure OpenAI wins when endpoint, deployment and key are all set.
    /// Returns `None` when neither backend is configured.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        let azure = match (
            var("AZURE_OPENAI_ENDPOINT"),
            var("AZURE_OPENAI_DEPLOYMENT"),
            var("AZURE_OPENAI_API_KEY"),
        ) {
            (Some(endpoint), Some(deployment), Some(api_key)) => Some(JudgeBackend::AzureOpenAI {
                endpoint,
                deployment,
                api_key,
                api_version: var("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            }),
            _ => None,
        };

        let backend = azure.or_else(|| {
            var("OPENAI_API_KEY").map(|api_key| JudgeBackend::OpenAI {
                api_key,
                model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                base_url: var("OPENAI_BASE_URL"),
            })
        })?;

        let timeout = var("RELEASE_COPILOT_JUDGE_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_JUDGE_TIMEOUT);

        Some(Self { backend, timeout })
    }

    pub fn build_client(&self) -> Arc<dyn LLMClient> {
        match &self.backend {
            JudgeBackend::AzureOpenAI {
                endpoint,
                deployment,
                api_key,
                api_version,
            } => Arc::new(
                AzureOpenAIClient::new(endpoint.clone(), deployment.clone(), api_key.clone())
                    .with_api_version(api_version.clone()),
            ),
            JudgeBackend::OpenAI {
                api_key,
                model,
                base_url,
            } => {
                let client = OpenAIClient::new(api_key.clone(), model.clone());
                match base_url {
                    Some(url) => Arc::new(client.with_base_url(url.clone())),
                    None => Arc::new(client),
                }
            }
        }
    }

    pub fn into_adapter(self) -> JudgeAdapter {
        JudgeAdapter::new(self.build_client()).with_timeout(self.timeout)
    }
}

#[derive(Debug, Deserialize)]
struct JudgeReply {
    correctness_score: f64,
    completeness_score: f64,
    efficiency_score: f64,
    overall_score: f64,
    reasoning: String,
}

/// Scores tool selection with an external LLM judge
#[derive(Clone)]
pub struct JudgeAdapter {
    client: Arc<dyn LLMClient>,
    timeout: Duration,
    tools: Vec<ToolDefinition>,
}

impl std::fmt::Debug for JudgeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeAdapter")
            .field("model", &self.client.model_name())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl JudgeAdapter {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            timeout: DEFAULT_JUDGE_TIMEOUT,
            tools: ToolDefinition::release_copilot_tools(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Judge one agent run; failures degrade to a zero score
    pub async fn judge(
        &self,
        query: &str,
        response: &str,
        tool_calls: &[ToolCallRecord],
        expected_tools: &[String],
    ) -> JudgeScore {
        match self.try_judge(query, response, tool_calls, expected_tools).await {
            Ok(score) => score,
            Err(e) => {
                warn!(model = self.client.model_name(), error = %e, "Judge call failed");
                JudgeScore::failed(e)
            }
        }
    }

    async fn try_judge(
        &self,
        query: &str,
        response: &str,
        tool_calls: &[ToolCallRecord],
        expected_tools: &[String],
    ) -> Result<JudgeScore, EvalError> {
        let prompt = self.build_prompt(query, response, tool_calls, expected_tools)?;
        let model = self.client.model_name();

        let span = info_span!(
            "chat",
            "otel.name" = %span_name(Operation::Chat, model),
            "otel.kind" = "client",
            "gen_ai.operation.name" = Operation::Chat.as_str(),
            "gen_ai.system" = self.client.provider_name(),
            "gen_ai.request.model" = model,
            "gen_ai.response.model" = field::Empty,
            "gen_ai.usage.input_tokens" = field::Empty,
            "gen_ai.usage.output_tokens" = field::Empty,
        );

        let reply = tokio::time::timeout(self.timeout, self.client.evaluate(prompt))
            .instrument(span.clone())
            .await
            .map_err(|_| EvalError::Timeout(self.timeout))??;

        span.record(keys::RESPONSE_MODEL, reply.model.as_str());
        span.record(keys::INPUT_TOKENS, reply.usage.prompt_tokens);
        span.record(keys::OUTPUT_TOKENS, reply.usage.completion_tokens);

        parse_reply(&reply.content)
    }

    fn build_prompt(
        &self,
        query: &str,
        response: &str,
        tool_calls: &[ToolCallRecord],
        expected_tools: &[String],
    ) -> Result<String, EvalError> {
        Ok(format!(
            r#"You are an expert evaluator for AI agent tool selection.

Evaluate whether the agent selected the appropriate tools for the given user query.

User Query: "{query}"

Available Tools:
{tools}

Expected Tools: {expected}

Actual Tool Calls:
{calls}

Agent Response:
{response}

Evaluate the tool selection on the following criteria:
1. Correctness: Did the agent select the right tools for the query? (0-1)
2. Completeness: Were all necessary tools selected? (0-1)
3. Efficiency: Were any unnecessary tools selected? (0-1)

Provide your evaluation in JSON format:
{{
    "correctness_score": <float 0-1>,
    "completeness_score": <float 0-1>,
    "efficiency_score": <float 0-1>,
    "overall_score": <float 0-1>,
    "reasoning": "<brief explanation>"
}}
"#,
            query = query,
            tools = serde_json::to_string_pretty(&self.tools)?,
            expected = expected_tools.join(", "),
            calls = serde_json::to_string_pretty(tool_calls)?,
            response = response,
        ))
    }
}

fn parse_reply(content: &str) -> Result<JudgeScore, EvalError> {
    let reply: JudgeReply = serde_json::from_str(content)
        .map_err(|e| EvalError::InvalidJudgeResponse(e.to_string()))?;

    for (field, value) in [
        ("correctness_score", reply.correctness_score),
        ("completeness_score", reply.completeness_score),
        ("efficiency_score", reply.efficiency_score),
        ("overall_score", reply.overall_score),
    ] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(EvalError::InvalidJudgeResponse(format!(
                "{} out of range: {}",
                field, value
            )));
        }
    }

    Ok(JudgeScore {
        correctness: reply.correctness_score,
        completeness: reply.completeness_score,
        efficiency: reply.efficiency_score,
        overall: reply.overall_score,
        rationale: reply.reasoning,
        error: None,
    })
}
