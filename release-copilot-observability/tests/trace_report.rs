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

//! Loading and rendering a trace file written by an exporter process

use release_copilot_core::SpanKind;
use release_copilot_observability::{
    find_latest_trace_file, load_spans, ParseMode, ReportOptions, TraceError, TraceReport,
};
use std::fs;

const TRACE_FILE: &str = r#"{
    "name": "chat gpt-4o-mini",
    "context": {
        "trace_id": "0x5b8aa5a2d2c872e8321cf37308d69df2",
        "span_id": "0x051581bf3cb55c13",
        "trace_state": "[]"
    },
    "kind": "SpanKind.CLIENT",
    "parent_id": "0x5fb397be34d26b51",
    "start_time": "2025-11-29T14:30:22.100000Z",
    "end_time": "2025-11-29T14:30:23.350000Z",
    "status": {
        "status_code": "UNSET"
    },
    "attributes": {
        "gen_ai.operation.name": "chat",
        "gen_ai.request.model": "gpt-4o-mini",
        "gen_ai.usage.input_tokens": 812,
        "gen_ai.usage.output_tokens": 64
    }
}
{
    "name": "execute_tool get_pipeline_status",
    "context": {
        "trace_id": "0x5b8aa5a2d2c872e8321cf37308d69df2",
        "span_id": "0x1a2b3c4d5e6f7081",
        "trace_state": "[]"
    },
    "kind": "SpanKind.INTERNAL",
    "parent_id": "0x5fb397be34d26b51",
    "start_time": "2025-11-29T14:30:23.400000Z",
    "end_time": "2025-11-29T14:30:23.412000Z",
    "attributes": {
        "gen_ai.tool.name": "get_pipeline_status",
        "gen_ai.tool.input": "{\"pipeline_id\": \"pipe-123\"}"
    }
}
{
    "resource_metrics": [
        {
            "scope_metrics": [{"metrics": [{"name": "gen_ai.client.token.usage"}]}]
        }
    ]
}
{
    "name": "invoke_agent release-copilot",
{
    "name": "invoke_agent release-copilot",
    "context": {
        "trace_id": "0x5b8aa5a2d2c872e8321cf37308d69df2",
        "span_id": "0x5fb397be34d26b51",
        "trace_state": "[]"
    },
    "kind": "SpanKind.INTERNAL",
    "parent_id": null,
    "start_time": "2025-11-29T14:30:22.000000Z",
    "end_time": "2025-11-29T14:30:24.310000Z",
    "attributes": {
        "gen_ai.usage.input_tokens": 812,
        "gen_ai.usage.output_tokens": 64
    }
}
"#;

fn write_trace(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, TRACE_FILE).unwrap();
    path
}

/// Metrics payloads and a torn record are skipped, spans survive
#[test]
fn test_lenient_load_recovers_spans() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_trace(dir.path(), "trace_20251129_143022.jsonl");

    let spans = load_spans(&path, ParseMode::Lenient).unwrap();
    let names: Vec<_> = spans.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "chat gpt-4o-mini",
            "execute_tool get_pipeline_status",
            "invoke_agent release-copilot",
        ]
    );
}

/// Strict mode refuses the torn record
#[test]
fn test_strict_load_rejects_torn_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_trace(dir.path(), "trace_20251129_143022.jsonl");

    let err = load_spans(&path, ParseMode::Strict).unwrap_err();
    assert!(matches!(err, TraceError::MalformedRecord { .. }));
}

/// Full report over the latest file in a traces directory
#[test]
fn test_render_latest_trace_file() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path(), "trace_20251128_080000.jsonl");
    fs::write(dir.path().join("trace_20251129_143022.jsonl"), TRACE_FILE).unwrap();

    let latest = find_latest_trace_file(dir.path()).unwrap().unwrap();
    assert!(latest.ends_with("trace_20251129_143022.jsonl"));

    let spans = load_spans(&latest, ParseMode::Lenient).unwrap();
    let report = TraceReport::new(spans, ReportOptions::default());
    assert_eq!(report.summary().count(SpanKind::ToolCall), 1);
    assert_eq!(report.summary().input_tokens, 1_624);

    let mut out = Vec::new();
    report.render(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    let expected = [
        "Trace 1: 0x5b8aa5a2d2c872e8321cf37308d69df2",
        "🤖 invoke_agent release-copilot (2.31s)",
        "  💬 chat gpt-4o-mini (1.25s)",
        "     Model: gpt-4o-mini",
        "  🔧 execute_tool get_pipeline_status (12ms)",
        "     Input: {\"pipeline_id\": \"pipe-123\"}...",
    ];
    let mut rest = text.as_str();
    for line in expected {
        let at = rest.find(line).unwrap_or_else(|| panic!("missing {:?} in\n{}", line, text));
        rest = &rest[at + line.len()..];
    }
}
