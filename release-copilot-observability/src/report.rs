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

//! Human-readable trace reports
//!
//! A report is built once from a loaded span list: the filters in
//! [`ReportOptions`] are applied first, then the summary and the per-trace
//! groups are computed from what remains.

use release_copilot_core::{Span, SpanKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::span_tree::{build_trace_groups, format_duration, TraceGroup};
use crate::{Result, TraceError};

const RULE_WIDTH: usize = 60;
const INPUT_PREVIEW_CHARS: usize = 80;

/// Which spans to show, and how much
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Render the summary block only
    pub summary_only: bool,
    /// Keep tool-call spans only
    pub tools_only: bool,
    /// Keep the last N spans in stream order
    pub last: Option<usize>,
}

/// Span counts and token totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceSummary {
    pub total_spans: usize,
    pub counts: BTreeMap<SpanKind, usize>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TraceSummary {
    pub fn from_spans(spans: &[Span]) -> Self {
        let mut summary = Self {
            total_spans: spans.len(),
            ..Self::default()
        };

        for span in spans {
            *summary.counts.entry(span.kind).or_insert(0) += 1;
            summary.input_tokens = summary
                .input_tokens
                .saturating_add(span.input_tokens().unwrap_or(0));
            summary.output_tokens = summary
                .output_tokens
                .saturating_add(span.output_tokens().unwrap_or(0));
        }

        summary
    }

    pub fn count(&self, kind: SpanKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "\n📊 Trace Summary")?;
        writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(out, "Total spans: {}", self.total_spans)?;

        for kind in SpanKind::ALL {
            let count = self.count(kind);
            // "Other spans" only appears when there are some
            if kind == SpanKind::Generic && count == 0 {
                continue;
            }
            writeln!(out, "{}: {}", kind.label(), count)?;
        }

        if self.input_tokens > 0 || self.output_tokens > 0 {
            writeln!(
                out,
                "\nTotal tokens: {} in, {} out",
                self.input_tokens, self.output_tokens
            )?;
        }

        writeln!(out)
    }
}

/// A filtered span list with its summary and per-trace groups
#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    #[serde(skip)]
    options: ReportOptions,
    summary: TraceSummary,
    traces: Vec<TraceGroup>,
}

impl TraceReport {
    pub fn new(spans: Vec<Span>, options: ReportOptions) -> Self {
        let mut spans = spans;

        if options.tools_only {
            spans.retain(|s| s.kind == SpanKind::ToolCall);
        }
        if let Some(n) = options.last {
            let skip = spans.len().saturating_sub(n);
            spans.drain(..skip);
        }

        let summary = TraceSummary::from_spans(&spans);
        let traces = if options.summary_only {
            Vec::new()
        } else {
            build_trace_groups(&spans)
        };

        Self {
            options,
            summary,
            traces,
        }
    }

    pub fn summary(&self) -> &TraceSummary {
        &self.summary
    }

    pub fn groups(&self) -> &[TraceGroup] {
        &self.traces
    }

    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.summary.render(out)?;
        if self.options.summary_only {
            return Ok(());
        }

        writeln!(out, "📋 Traces")?;
        writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;

        for (i, group) in self.traces.iter().enumerate() {
            writeln!(out, "\nTrace {}: {}", i + 1, group.trace_id)?;
            writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;

            for root in &group.roots {
                render_span(out, &root.span, 0)?;
                for child in &root.children {
                    render_span(out, child, 1)?;
                }
            }

            for orphan in &group.orphans {
                render_span(out, orphan, 0)?;
                if let Some(parent) = &orphan.parent_id {
                    writeln!(out, "   Parent: {} (not in trace)", parent)?;
                }
            }
        }

        writeln!(out)
    }
}

fn render_span<W: Write>(out: &mut W, span: &Span, indent: usize) -> io::Result<()> {
    let prefix = "  ".repeat(indent);
    writeln!(
        out,
        "{}{} {} ({})",
        prefix,
        span.kind.glyph(),
        span.name,
        format_duration(span.duration())
    )?;

    if span.kind == SpanKind::ModelCall {
        writeln!(
            out,
            "{}   Model: {}",
            prefix,
            span.request_model().unwrap_or("unknown")
        )?;
    }

    if let Some(tokens_in) = span.input_tokens() {
        let tokens_out = span
            .output_tokens()
            .map_or_else(|| "?".to_string(), |t| t.to_string());
        writeln!(out, "{}   Tokens: {} in, {} out", prefix, tokens_in, tokens_out)?;
    }

    if span.kind == SpanKind::ToolCall {
        if let Some(input) = span.tool_input().filter(|s| !s.is_empty()) {
            let preview: String = input.chars().take(INPUT_PREVIEW_CHARS).collect();
            writeln!(out, "{}   Input: {}...", prefix, preview)?;
        }
    }

    Ok(())
}

/// Newest `trace_*.jsonl` in `dir`, by file name
///
/// Returns `Ok(None)` when the directory holds no trace files.
pub fn find_latest_trace_file(dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(TraceError::NotFound(dir.to_path_buf()));
    }

    let mut latest: Option<(String, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !(name.starts_with("trace_") && name.ends_with(".jsonl")) {
            continue;
        }
        if latest.as_ref().map_or(true, |(best, _)| name > *best) {
            latest = Some((name, entry.path()));
        }
    }

    Ok(latest.map(|(_, path)| path))
}
