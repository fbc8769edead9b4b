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

//! Tool invocations and the agent transcripts they are recovered from.

use serde::{Deserialize, Serialize};

/// One observed tool invocation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Call identifier assigned by the model, if any
    #[serde(default)]
    pub id: Option<String>,

    /// Tool name; calls without a name do not count toward metrics
    #[serde(default)]
    pub name: Option<String>,

    /// Decoded call arguments
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl ToolCallRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            arguments: serde_json::Map::new(),
        }
    }
}

/// Output of one agent run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRunResponse {
    #[serde(default)]
    pub messages: Vec<AgentMessage>,
}

/// A single message in an agent transcript
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMessage {
    #[serde(default)]
    pub role: Option<String>,

    /// Typed content blocks (text, function_call, function_result, ...)
    #[serde(default)]
    pub contents: Option<Vec<serde_json::Value>>,

    #[serde(default)]
    pub text: Option<String>,
}

impl AgentRunResponse {
    /// Text of the assistant's messages, joined by newlines.
    ///
    /// Falls back to every message's text when no message is marked
    /// `assistant`.
    pub fn response_text(&self) -> String {
        let texts = |assistant_only: bool| -> Vec<&str> {
            self.messages
                .iter()
                .filter(|m| !assistant_only || m.role.as_deref() == Some("assistant"))
                .filter_map(|m| m.text.as_deref())
                .filter(|t| !t.is_empty())
                .collect()
        };

        let assistant = texts(true);
        if assistant.is_empty() {
            texts(false).join("\n")
        } else {
            assistant.join("\n")
        }
    }
}
