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

//! OpenTelemetry GenAI semantic conventions used when emitting spans
//!
//! Span names follow the `"{operation} {target}"` pattern so the names
//! written here classify back into the same [`SpanKind`] when the trace
//! file is read.
//!
//! [`SpanKind`]: release_copilot_core::SpanKind

pub use release_copilot_core::genai as keys;

/// Values of `gen_ai.operation.name` this workspace emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Chat,
    InvokeAgent,
    ExecuteTool,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::InvokeAgent => "invoke_agent",
            Self::ExecuteTool => "execute_tool",
        }
    }
}

/// Build a span name: "{operation} {target}"
pub fn span_name(operation: Operation, target: &str) -> String {
    format!("{} {}", operation.as_str(), target)
}
