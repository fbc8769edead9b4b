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

//! Mapping from exported span JSON to [`Span`].

use chrono::{DateTime, NaiveDateTime, Utc};
use release_copilot_core::Span;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct RawSpan {
    name: String,
    context: RawContext,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    attributes: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawContext {
    #[serde(default)]
    trace_id: Option<String>,
    #[serde(default)]
    span_id: Option<String>,
}

/// Parse an exporter timestamp as UTC.
///
/// Accepts RFC 3339 (`Z` or numeric offset) and zone-less ISO 8601, which
/// is taken to be UTC already.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Decode one admitted record into a span
pub fn decode_span(value: &Value) -> Result<Span, String> {
    let raw = RawSpan::deserialize(value).map_err(|e| e.to_string())?;

    let mut span = Span::new(
        raw.name,
        raw.context.trace_id.unwrap_or_else(|| "unknown".to_string()),
        raw.context.span_id.unwrap_or_default(),
    )
    .with_times(
        raw.start_time.as_deref().and_then(parse_timestamp),
        raw.end_time.as_deref().and_then(parse_timestamp),
    );
    span.parent_id = raw.parent_id;
    span.attributes = raw.attributes.unwrap_or_default();

    Ok(span)
}
