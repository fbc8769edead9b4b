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

//! # Release Copilot Evaluation
//!
//! Tool selection evaluation for the Release Copilot agent.
//!
//! ## Pipeline
//!
//! - **Collect**: [`Collector`] runs each ground-truth query through an
//!   [`AgentRunner`] and [`extract_tool_calls`] pulls the function calls
//!   out of the transcript
//! - **Score**: [`metrics::score`] computes precision, recall, F1 and exact
//!   match; [`JudgeAdapter`] optionally asks an LLM judge for a second opinion
//! - **Store**: [`ResultStore`] keeps outcomes in order and writes the
//!   results document with its [`metrics::aggregate`] summary
//!
//! ## Example
//!
//! ```rust,ignore
//! use release_copilot_evals::{evaluate_collected, load_collected_responses, EvalConfig, ResultStore};
//!
//! let responses = load_collected_responses("eval/collected_responses.json")?;
//! let outcomes = evaluate_collected(&responses, None, &EvalConfig::default()).await;
//! let mut store = ResultStore::new("eval/eval_results.json");
//! store.extend(outcomes);
//! let report = store.finish()?;
//! println!("{}", report.summary);
//! ```

use std::time::Duration;
use thiserror::Error;

pub mod agent;
pub mod collector;
pub mod evaluation;
pub mod judge;
pub mod llm_client;
pub mod metrics;
pub mod store;
pub mod tool_calls;

pub use agent::{AgentRunner, HttpAgentRunner};
pub use collector::{load_collected_responses, CollectConfig, Collector};
pub use evaluation::{evaluate_collected, evaluate_response};
pub use judge::{JudgeAdapter, JudgeBackend, JudgeConfig, ToolDefinition};
pub use llm_client::{LLMClient, LLMError, LLMResponse, TokenUsage};
pub use store::{write_json_atomic, ResultStore};
pub use tool_calls::extract_tool_calls;

/// Errors that can occur during collection and evaluation
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Agent run failed: {0}")]
    Agent(String),

    #[error("Agent run timed out after {0:?}")]
    AgentTimeout(Duration),

    #[error("Judge call timed out after {0:?}")]
    Timeout(Duration),

    #[error("LLM client error: {0}")]
    LLMClient(#[from] LLMError),

    #[error("Invalid judge response: {0}")]
    InvalidJudgeResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] release_copilot_core::CoreError),
}

pub type Result<T> = std::result::Result<T, EvalError>;

/// Configuration for evaluation execution
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Maximum number of test cases evaluated at once
    pub max_concurrent: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { max_concurrent: 1 }
    }
}
