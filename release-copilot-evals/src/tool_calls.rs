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

//! Tool call extraction from agent run transcripts
//!
//! Function calls show up as content blocks tagged `"type": "function_call"`
//! inside the run's messages. Each block becomes a [`ToolCallRecord`].

use release_copilot_core::{AgentRunResponse, ToolCallRecord};
use serde_json::{Map, Value};
use tracing::debug;

const FUNCTION_CALL: &str = "function_call";

/// Every function call in the transcript, in message order
pub fn extract_tool_calls(response: &AgentRunResponse) -> Vec<ToolCallRecord> {
    response
        .messages
        .iter()
        .filter_map(|message| message.contents.as_ref())
        .flatten()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some(FUNCTION_CALL))
        .map(tool_call_from_block)
        .collect()
}

fn tool_call_from_block(block: &Value) -> ToolCallRecord {
    let id = block
        .get("call_id")
        .or_else(|| block.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let name = block.get("name").and_then(Value::as_str).map(str::to_string);

    ToolCallRecord {
        arguments: parse_arguments(block.get("arguments"), name.as_deref()),
        id,
        name,
    }
}

/// Arguments arrive as a JSON-encoded string; some runtimes send the object itself.
fn parse_arguments(raw: Option<&Value>, tool: Option<&str>) -> Map<String, Value> {
    match raw {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(text)) if text.trim().is_empty() => Map::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                debug!(tool = ?tool, arguments = %other, "Tool arguments are not an object");
                Map::new()
            }
            Err(e) => {
                debug!(tool = ?tool, error = %e, "Unparsable tool arguments");
                Map::new()
            }
        },
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(messages: Value) -> AgentRunResponse {
        serde_json::from_value(json!({ "messages": messages })).unwrap()
    }

    #[test]
    fn test_extracts_function_calls_in_order() {
        let run = response(json!([
            {"role": "user", "text": "Why did job-789 fail?"},
            {"role": "assistant", "contents": [
                {"type": "function_call", "call_id": "call_1", "name": "get_pipeline_status",
                 "arguments": "{\"service\": \"payments\", \"environment\": \"prod\"}"},
                {"type": "function_call", "call_id": "call_2", "name": "get_job_logs",
                 "arguments": "{\"job_id\": \"job-789\"}"}
            ]},
            {"role": "tool", "contents": [
                {"type": "function_result", "call_id": "call_1", "result": "{}"}
            ]},
            {"role": "assistant", "text": "The job failed during integration tests."}
        ]));

        let calls = extract_tool_calls(&run);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id.as_deref(), Some("call_1"));
        assert_eq!(calls[0].name.as_deref(), Some("get_pipeline_status"));
        assert_eq!(calls[0].arguments["environment"], "prod");
        assert_eq!(calls[1].arguments["job_id"], "job-789");
    }

    #[test]
    fn test_unparsable_arguments_keep_id_and_name() {
        let run = response(json!([
            {"role": "assistant", "contents": [
                {"type": "function_call", "call_id": "call_9", "name": "get_job_logs",
                 "arguments": "{\"job_id\": "}
            ]}
        ]));

        let calls = extract_tool_calls(&run);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id.as_deref(), Some("call_9"));
        assert_eq!(calls[0].name.as_deref(), Some("get_job_logs"));
        assert!(calls[0].arguments.is_empty());
    }

    #[test]
    fn test_object_arguments_and_missing_name() {
        let run = response(json!([
            {"contents": [
                {"type": "function_call", "id": "fc_1", "arguments": {"service": "payments"}}
            ]}
        ]));

        let calls = extract_tool_calls(&run);
        assert_eq!(calls[0].id.as_deref(), Some("fc_1"));
        assert!(calls[0].name.is_none());
        assert_eq!(calls[0].arguments["service"], "payments");
    }

    #[test]
    fn test_empty_transcripts() {
        assert!(extract_tool_calls(&AgentRunResponse::default()).is_empty());
        assert!(extract_tool_calls(&response(json!([{"role": "assistant", "text": "hi"}]))).is_empty());
    }
}
