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

//! JSON span exporter
//!
//! Writes every finished span as one pretty-printed JSON object, back to
//! back, in the layout [`SpanStreamParser`] reads. Records carry
//! `name`, `context`, `kind`, `parent_id`, `start_time`, `end_time`,
//! `status`, `attributes`, `events` and `resource`.
//!
//! [`SpanStreamParser`]: crate::SpanStreamParser

use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::BoxFuture;
use opentelemetry::trace::{SpanId, SpanKind, Status, TraceError};
use opentelemetry::{KeyValue, Value};
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::Resource;
use serde_json::{json, Map};
use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;

/// Span exporter writing pretty JSON records to any writer
#[derive(Debug)]
pub struct JsonSpanExporter<W: Write + Send + Sync + Debug + 'static = BufWriter<File>> {
    writer: W,
    resource: serde_json::Value,
}

impl JsonSpanExporter<BufWriter<File>> {
    /// Append to `path`, creating it and its parent directory as needed
    pub fn to_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl JsonSpanExporter<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send + Sync + Debug + 'static> JsonSpanExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            resource: json!({ "attributes": {} }),
        }
    }

    fn write_batch(&mut self, batch: &[SpanData]) -> io::Result<()> {
        for span in batch {
            let record = span_to_json(span, &self.resource);
            serde_json::to_writer_pretty(&mut self.writer, &record)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()
    }
}

impl<W: Write + Send + Sync + Debug + 'static> SpanExporter for JsonSpanExporter<W> {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let result = self
            .write_batch(&batch)
            .map_err(|e| TraceError::from(format!("failed to write spans: {}", e)));
        Box::pin(std::future::ready(result))
    }

    fn shutdown(&mut self) {
        let _ = self.writer.flush();
    }

    fn force_flush(&mut self) -> BoxFuture<'static, ExportResult> {
        let result = self
            .writer
            .flush()
            .map_err(|e| TraceError::from(format!("failed to flush spans: {}", e)));
        Box::pin(std::future::ready(result))
    }

    fn set_resource(&mut self, resource: &Resource) {
        let attributes: Map<String, serde_json::Value> = resource
            .iter()
            .map(|(key, value)| (key.to_string(), value_to_json(value)))
            .collect();
        self.resource = json!({ "attributes": attributes });
    }
}

fn span_to_json(span: &SpanData, resource: &serde_json::Value) -> serde_json::Value {
    let context = &span.span_context;
    let parent_id = if span.parent_span_id == SpanId::INVALID {
        serde_json::Value::Null
    } else {
        json!(format!("0x{:016x}", span.parent_span_id))
    };

    let events: Vec<serde_json::Value> = span
        .events
        .iter()
        .map(|event| {
            json!({
                "name": event.name,
                "timestamp": timestamp(event.timestamp),
                "attributes": attributes_to_json(&event.attributes),
            })
        })
        .collect();

    json!({
        "name": span.name,
        "context": {
            "trace_id": format!("0x{:032x}", context.trace_id()),
            "span_id": format!("0x{:016x}", context.span_id()),
            "trace_state": format!("[{}]", context.trace_state().header()),
        },
        "kind": kind_label(&span.span_kind),
        "parent_id": parent_id,
        "start_time": timestamp(span.start_time),
        "end_time": timestamp(span.end_time),
        "status": status_to_json(&span.status),
        "attributes": attributes_to_json(&span.attributes),
        "events": events,
        "resource": resource,
    })
}

fn timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn kind_label(kind: &SpanKind) -> &'static str {
    match kind {
        SpanKind::Client => "SpanKind.CLIENT",
        SpanKind::Server => "SpanKind.SERVER",
        SpanKind::Producer => "SpanKind.PRODUCER",
        SpanKind::Consumer => "SpanKind.CONSUMER",
        SpanKind::Internal => "SpanKind.INTERNAL",
    }
}

fn status_to_json(status: &Status) -> serde_json::Value {
    match status {
        Status::Unset => json!({ "status_code": "UNSET" }),
        Status::Ok => json!({ "status_code": "OK" }),
        Status::Error { description } => json!({
            "status_code": "ERROR",
            "description": description.to_string(),
        }),
    }
}

fn attributes_to_json(attributes: &[KeyValue]) -> Map<String, serde_json::Value> {
    attributes
        .iter()
        .map(|kv| (kv.key.to_string(), value_to_json(&kv.value)))
        .collect()
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => json!(b),
        Value::I64(i) => json!(i),
        Value::F64(f) => json!(f),
        Value::String(s) => json!(s.as_str()),
        // arrays are rare in span attributes; keep their display form
        other => json!(other.to_string()),
    }
}
