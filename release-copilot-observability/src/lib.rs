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

//! # Release Copilot Observability
//!
//! Both ends of the span pipeline:
//!
//! - **Capture**: [`init_tracing`] installs an OpenTelemetry provider whose
//!   [`JsonSpanExporter`] writes finished spans as back-to-back JSON objects
//! - **Recovery**: [`SpanStreamParser`] pulls span records back out of that
//!   text, [`build_trace_groups`] links them into per-trace trees, and
//!   [`TraceReport`] renders the result
//!
//! ## Example
//!
//! ```rust,ignore
//! use release_copilot_observability::{load_spans, ParseMode, ReportOptions, TraceReport};
//!
//! let spans = load_spans("traces/trace_20251129_143022.jsonl", ParseMode::Lenient)?;
//! let report = TraceReport::new(spans, ReportOptions::default());
//! report.render(&mut std::io::stdout())?;
//! ```

pub mod config;
pub mod error;
pub mod exporter;
pub mod genai_conventions;
pub mod report;
pub mod span_mapper;
pub mod span_tree;
pub mod stream_parser;
pub mod tracer;

pub use config::TracingConfig;
pub use error::{Result, TraceError};
pub use exporter::JsonSpanExporter;
pub use report::{find_latest_trace_file, ReportOptions, TraceReport, TraceSummary};
pub use span_mapper::decode_span;
pub use span_tree::{build_trace_groups, format_duration, SpanNode, TraceGroup};
pub use stream_parser::{is_span_record, load_spans, ParseMode, SpanStreamParser};
pub use tracer::{build_provider, init_tracing, TracingHandle};
