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

//! Agent runtime boundary
//!
//! The agent itself lives in another process. [`HttpAgentRunner`] reaches it
//! by POSTing `{"message": <query>}` and expects the run transcript back as
//! `{"messages": [{"role": ..., "contents": [...], "text": ...}]}`.

use async_trait::async_trait;
use release_copilot_core::AgentRunResponse;

use crate::{EvalError, Result};

/// Runs one query through the agent
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, query: &str) -> Result<AgentRunResponse>;

    /// Agent name used in span names
    fn name(&self) -> &str {
        "release-copilot"
    }
}

/// Agent reached over HTTP
pub struct HttpAgentRunner {
    url: String,
    client: reqwest::Client,
}

impl HttpAgentRunner {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AgentRunner for HttpAgentRunner {
    async fn run(&self, query: &str) -> Result<AgentRunResponse> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "message": query }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvalError::Agent(format!("{}: {}", status, body)));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_runner_posts_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/run")
            .match_body(mockito::Matcher::Json(
                serde_json::json!({ "message": "Is payments healthy in prod?" }),
            ))
            .with_status(200)
            .with_body(
                r#"{"messages": [{"role": "assistant", "text": "All green."}]}"#,
            )
            .create_async()
            .await;

        let runner = HttpAgentRunner::new(format!("{}/run", server.url()));
        let run = runner.run("Is payments healthy in prod?").await.unwrap();

        mock.assert_async().await;
        assert_eq!(run.response_text(), "All green.");
    }

    #[tokio::test]
    async fn test_http_runner_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/run")
            .with_status(503)
            .with_body("Agent not initialized")
            .create_async()
            .await;

        let runner = HttpAgentRunner::new(format!("{}/run", server.url()));
        let err = runner.run("q").await.unwrap_err();
        assert!(matches!(err, EvalError::Agent(ref msg) if msg.contains("Agent not initialized")));
    }
}
