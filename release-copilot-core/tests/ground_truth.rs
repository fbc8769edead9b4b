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

use release_copilot_core::{load_ground_truth, CoreError};
use std::fs;

#[test]
fn test_load_ground_truth_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ground_truth.json");
    fs::write(
        &path,
        r#"[
            {"query": "What is the status of the payments pipeline in prod?",
             "expected_tools": ["get_pipeline_status"]},
            {"query": "Why did the payments deploy fail?",
             "expected_tools": ["get_pipeline_status", "get_job_logs", "get_pipeline_status"]},
            {"query": "Hello there"}
        ]"#,
    )
    .unwrap();

    let cases = load_ground_truth(&path).unwrap();
    assert_eq!(cases.len(), 3);
    assert_eq!(cases[1].id, 2);
    assert_eq!(
        cases[1].expected_tools,
        vec!["get_pipeline_status".to_string(), "get_job_logs".to_string()]
    );
    assert!(cases[2].expected_tools.is_empty());
    assert!(cases[2].expected_tool_set().is_empty());
}

#[test]
fn test_missing_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_ground_truth(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_malformed_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ground_truth.json");

    fs::write(&path, r#"{"query": "not a list"}"#).unwrap();
    assert!(matches!(load_ground_truth(&path), Err(CoreError::Json(_))));

    fs::write(&path, r#"[{"query": "  ", "expected_tools": []}]"#).unwrap();
    assert!(matches!(
        load_ground_truth(&path),
        Err(CoreError::InvalidFixture(_))
    ));
}
