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

//! Span records recovered from a tracing exporter.
//!
//! A span is immutable once decoded. Its [`SpanKind`] is assigned exactly
//! once, at construction, from the span name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::genai;

/// Classification of a span by what unit of work it records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// An agent run (`invoke_agent ...`)
    AgentInvocation,
    /// A model request (`chat ...`)
    ModelCall,
    /// A tool execution (any name mentioning "tool")
    ToolCall,
    /// Anything else
    Generic,
}

#[derive(Debug, Clone, Copy)]
enum NameMatcher {
    Contains(&'static str),
    ContainsIgnoreCase(&'static str),
}

impl NameMatcher {
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Contains(needle) => name.contains(needle),
            Self::ContainsIgnoreCase(needle) => name.to_lowercase().contains(needle),
        }
    }
}

/// Matchers in priority order; the first hit wins.
const KIND_MATCHERS: &[(NameMatcher, SpanKind)] = &[
    (NameMatcher::Contains("invoke_agent"), SpanKind::AgentInvocation),
    (NameMatcher::Contains("chat"), SpanKind::ModelCall),
    (NameMatcher::ContainsIgnoreCase("tool"), SpanKind::ToolCall),
];

impl SpanKind {
    /// All kinds in display order
    pub const ALL: [SpanKind; 4] = [
        SpanKind::AgentInvocation,
        SpanKind::ModelCall,
        SpanKind::ToolCall,
        SpanKind::Generic,
    ];

    /// Classify a span from its name
    pub fn classify(name: &str) -> Self {
        KIND_MATCHERS
            .iter()
            .find(|(matcher, _)| matcher.matches(name))
            .map(|(_, kind)| *kind)
            .unwrap_or(SpanKind::Generic)
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Self::AgentInvocation => "🤖",
            Self::ModelCall => "💬",
            Self::ToolCall => "🔧",
            Self::Generic => "📝",
        }
    }

    /// Plural label used in summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::AgentInvocation => "Agent invocations",
            Self::ModelCall => "LLM calls",
            Self::ToolCall => "Tool calls",
            Self::Generic => "Other spans",
        }
    }
}

/// One recorded unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub name: String,

    /// Assigned from `name` at construction
    pub kind: SpanKind,

    pub trace_id: String,

    pub span_id: String,

    /// `None` marks a root span
    pub parent_id: Option<String>,

    pub start_time: Option<DateTime<Utc>>,

    pub end_time: Option<DateTime<Utc>>,

    /// Scalar attributes keyed by attribute name
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Span {
    /// Create a root span with no timestamps or attributes
    pub fn new(
        name: impl Into<String>,
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            kind: SpanKind::classify(&name),
            name,
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            parent_id: None,
            start_time: None,
            end_time: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_times(
        mut self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// `end_time - start_time`, or `None` when either timestamp is missing
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.end_time? - self.start_time?)
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)?.as_str()
    }

    /// Integer attribute, accepting numeric strings as exporters sometimes stringify
    pub fn attribute_u64(&self, key: &str) -> Option<u64> {
        let value = self.attributes.get(key)?;
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
            .or_else(|| value.as_str()?.trim().parse().ok())
    }

    pub fn input_tokens(&self) -> Option<u64> {
        self.attribute_u64(genai::INPUT_TOKENS)
    }

    pub fn output_tokens(&self) -> Option<u64> {
        self.attribute_u64(genai::OUTPUT_TOKENS)
    }

    pub fn request_model(&self) -> Option<&str> {
        self.attribute_str(genai::REQUEST_MODEL)
    }

    pub fn tool_input(&self) -> Option<&str> {
        self.attribute_str(genai::TOOL_INPUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_classification_priority() {
        assert_eq!(SpanKind::classify("invoke_agent copilot"), SpanKind::AgentInvocation);
        assert_eq!(SpanKind::classify("chat gpt-4o"), SpanKind::ModelCall);
        assert_eq!(SpanKind::classify("execute_tool get_job_logs"), SpanKind::ToolCall);
        assert_eq!(SpanKind::classify("MCP Tool Call"), SpanKind::ToolCall);
        assert_eq!(SpanKind::classify("load config"), SpanKind::Generic);

        // "invoke_agent" outranks "chat" and "tool"
        assert_eq!(
            SpanKind::classify("invoke_agent chat_tool_router"),
            SpanKind::AgentInvocation
        );
        // "chat" outranks "tool"
        assert_eq!(SpanKind::classify("chat with tools"), SpanKind::ModelCall);
    }

    #[test]
    fn test_chat_match_is_case_sensitive() {
        assert_eq!(SpanKind::classify("Chat"), SpanKind::Generic);
    }

    #[test]
    fn test_kind_fixed_at_construction() {
        let span = Span::new("chat gpt-4o-mini", "t1", "s1");
        assert_eq!(span.kind, SpanKind::ModelCall);
        assert!(span.is_root());
    }

    #[test]
    fn test_duration() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = start + chrono::Duration::milliseconds(250);

        let span = Span::new("x", "t", "s").with_times(Some(start), Some(end));
        assert_eq!(span.duration(), Some(chrono::Duration::milliseconds(250)));

        let open = Span::new("x", "t", "s").with_times(Some(start), None);
        assert_eq!(open.duration(), None);
    }

    #[test]
    fn test_token_attributes() {
        let span = Span::new("chat", "t", "s")
            .with_attribute(genai::INPUT_TOKENS, serde_json::json!(120))
            .with_attribute(genai::OUTPUT_TOKENS, serde_json::json!("45"))
            .with_attribute(genai::REQUEST_MODEL, serde_json::json!("gpt-4o"));

        assert_eq!(span.input_tokens(), Some(120));
        assert_eq!(span.output_tokens(), Some(45));
        assert_eq!(span.request_model(), Some("gpt-4o"));
        assert_eq!(span.tool_input(), None);
    }
}
