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

//! Ground-truth test cases for tool selection evaluation
//!
//! The fixture is a JSON array of
//! `{"query": ..., "expected_tools": [...], "expected_tool_args": {...}}`.
//! Test case ids are 1-based ordinals in fixture order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::{CoreError, Result};

/// One evaluation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// 1-based position in the fixture
    pub id: u32,

    /// User query sent to the agent
    pub query: String,

    /// Expected tool names, unique, in fixture order
    pub expected_tools: Vec<String>,

    /// Expected arguments per tool. Carried through for reference, never scored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_tool_args: Option<serde_json::Map<String, serde_json::Value>>,
}

impl TestCase {
    /// Create a new test case, dropping duplicate tool names
    pub fn new(id: u32, query: impl Into<String>, expected_tools: Vec<String>) -> Self {
        Self {
            id,
            query: query.into(),
            expected_tools: dedup_preserving_order(expected_tools),
            expected_tool_args: None,
        }
    }

    pub fn expected_tool_set(&self) -> BTreeSet<String> {
        self.expected_tools.iter().cloned().collect()
    }
}

#[derive(Debug, Deserialize)]
struct GroundTruthEntry {
    query: String,
    #[serde(default)]
    expected_tools: Vec<String>,
    #[serde(default)]
    expected_tool_args: Option<serde_json::Map<String, serde_json::Value>>,
}

fn dedup_preserving_order(tools: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tools
        .into_iter()
        .filter(|tool| seen.insert(tool.clone()))
        .collect()
}

/// Parse a ground-truth fixture document
pub fn parse_ground_truth(content: &str) -> Result<Vec<TestCase>> {
    let entries: Vec<GroundTruthEntry> = serde_json::from_str(content)?;

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            if entry.query.trim().is_empty() {
                return Err(CoreError::InvalidFixture(format!(
                    "test case {} has an empty query",
                    idx + 1
                )));
            }

            let mut test_case = TestCase::new(idx as u32 + 1, entry.query, entry.expected_tools);
            test_case.expected_tool_args = entry.expected_tool_args;
            Ok(test_case)
        })
        .collect()
}

/// Load the ground-truth fixture from disk
pub fn load_ground_truth(path: impl AsRef<Path>) -> Result<Vec<TestCase>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CoreError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let test_cases = parse_ground_truth(&content)?;
    tracing::debug!(count = test_cases.len(), path = %path.display(), "Loaded ground truth");
    Ok(test_cases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assigns_ordinals() {
        let fixture = r#"[
            {"query": "What is the status of payments in prod?", "expected_tools": ["get_pipeline_status"]},
            {"query": "Why did job-789 fail?", "expected_tools": ["get_job_logs"],
             "expected_tool_args": {"get_job_logs": {"job_id": "job-789"}}}
        ]"#;

        let cases = parse_ground_truth(fixture).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id, 1);
        assert_eq!(cases[1].id, 2);
        assert!(cases[0].expected_tool_args.is_none());
        assert_eq!(
            cases[1].expected_tool_args.as_ref().unwrap()["get_job_logs"]["job_id"],
            "job-789"
        );
    }

    #[test]
    fn test_expected_tools_deduplicated() {
        let fixture = r#"[{"query": "q", "expected_tools": ["b", "a", "b"]}]"#;
        let cases = parse_ground_truth(fixture).unwrap();
        assert_eq!(cases[0].expected_tools, vec!["b", "a"]);
    }

    #[test]
    fn test_empty_query_rejected() {
        let fixture = r#"[{"query": "  ", "expected_tools": []}]"#;
        assert!(matches!(
            parse_ground_truth(fixture),
            Err(CoreError::InvalidFixture(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = load_ground_truth("/nonexistent/ground_truth.json").unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
