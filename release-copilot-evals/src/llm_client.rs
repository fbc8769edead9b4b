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

//! LLM client abstraction for the tool selection judge

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SYSTEM_PROMPT: &str = "You are an expert AI evaluator. Respond only with valid JSON.";

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-10-21";

/// Trait for LLM clients used as judges
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send a prompt and get a JSON-mode response
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError>;

    /// Get model (or deployment) name
    fn model_name(&self) -> &str;

    /// `gen_ai.system` value for spans
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Response from LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
}

impl LLMResponse {
    /// Parse response as JSON
    pub fn as_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.content)
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Errors from LLM clients
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn chat_request(model: Option<&str>, prompt: &str) -> serde_json::Value {
    let mut request = serde_json::json!({
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": prompt }
        ],
        "temperature": 0.0,
        "response_format": { "type": "json_object" }
    });
    if let Some(model) = model {
        request["model"] = serde_json::Value::String(model.to_string());
    }
    request
}

async fn read_chat_response(response: reqwest::Response, model: &str) -> Result<LLMResponse, LLMError> {
    let status = response.status();
    if !status.is_success() {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LLMError::RateLimitExceeded);
        }
        let error_text = response.text().await?;
        return Err(LLMError::ApiError(format!("{}: {}", status, error_text)));
    }

    let response_data: serde_json::Value = response.json().await?;

    let content = response_data["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| LLMError::InvalidResponse("Missing content".to_string()))?
        .to_string();

    let usage_data = &response_data["usage"];
    let usage = TokenUsage {
        prompt_tokens: usage_data["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: usage_data["completion_tokens"].as_u64().unwrap_or(0) as u32,
        total_tokens: usage_data["total_tokens"].as_u64().unwrap_or(0) as u32,
    };

    Ok(LLMResponse {
        content,
        usage,
        model: response_data["model"]
            .as_str()
            .unwrap_or(model)
            .to_string(),
    })
}

/// OpenAI client implementation
pub struct OpenAIClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&chat_request(Some(&self.model), &prompt))
            .send()
            .await?;

        read_chat_response(response, &self.model).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Azure OpenAI client: chat completions against a named deployment
pub struct AzureOpenAIClient {
    endpoint: String,
    deployment: String,
    api_key: String,
    api_version: String,
    client: reqwest::Client,
}

impl AzureOpenAIClient {
    pub fn new(endpoint: String, deployment: String, api_key: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            deployment,
            api_key,
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_version(mut self, api_version: String) -> Self {
        self.api_version = api_version;
        self
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

#[async_trait]
impl LLMClient for AzureOpenAIClient {
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&chat_request(None, &prompt))
            .send()
            .await?;

        read_chat_response(response, &self.deployment).await
    }

    fn model_name(&self) -> &str {
        &self.deployment
    }

    fn provider_name(&self) -> &'static str {
        "azure.ai.openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion_body(content: &str) -> String {
        serde_json::json!({
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{ "message": { "role": "assistant", "content": content } }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150 }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_openai_client_reads_content_and_usage() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body(r#"{"overall_score": 1.0}"#))
            .create_async()
            .await;

        let client = OpenAIClient::new("sk-test".to_string(), "gpt-4o-mini".to_string())
            .with_base_url(server.url());
        let response = client.evaluate("prompt".to_string()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.as_json().unwrap()["overall_score"], 1.0);
        assert_eq!(response.usage.total_tokens, 150);
        assert_eq!(response.model, "gpt-4o-mini-2024-07-18");
    }

    #[tokio::test]
    async fn test_azure_client_uses_deployment_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/deployments/judge/chat/completions")
            .match_query(mockito::Matcher::UrlEncoded(
                "api-version".into(),
                DEFAULT_AZURE_API_VERSION.into(),
            ))
            .match_header("api-key", "azure-key")
            .with_status(200)
            .with_body(completion_body("{}"))
            .create_async()
            .await;

        let client = AzureOpenAIClient::new(
            format!("{}/", server.url()),
            "judge".to_string(),
            "azure-key".to_string(),
        );
        client.evaluate("prompt".to_string()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_and_api_errors() {
        let mut server = mockito::Server::new_async().await;
        let _limited = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .create_async()
            .await;

        let client = OpenAIClient::new("k".to_string(), "m".to_string()).with_base_url(server.url());
        let err = client.evaluate("p".to_string()).await.unwrap_err();
        assert!(matches!(err, LLMError::RateLimitExceeded));
    }
}
