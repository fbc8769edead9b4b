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

//! Per-trace grouping of spans
//!
//! Trees are two levels deep: every descendant of a root is attached
//! directly to that root, in stream order. A span whose parent chain leaves
//! its trace group is an orphan and is kept unlinked.

use release_copilot_core::Span;
use serde::Serialize;
use std::collections::HashMap;

/// A root span with its descendants flattened beneath it
#[derive(Debug, Clone, Serialize)]
pub struct SpanNode {
    pub span: Span,
    pub children: Vec<Span>,
}

/// All spans sharing one trace id
#[derive(Debug, Clone, Serialize)]
pub struct TraceGroup {
    pub trace_id: String,
    pub roots: Vec<SpanNode>,
    /// Spans whose parent is not in this group
    pub orphans: Vec<Span>,
}

impl TraceGroup {
    pub fn span_count(&self) -> usize {
        self.roots.iter().map(|r| 1 + r.children.len()).sum::<usize>() + self.orphans.len()
    }
}

enum Placement {
    Root(usize),
    Child(usize),
    Orphan,
}

/// Group spans by trace id (first-seen order) and link them to their roots
pub fn build_trace_groups(spans: &[Span]) -> Vec<TraceGroup> {
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<&Span>> = HashMap::new();

    for span in spans {
        let entry = members.entry(span.trace_id.as_str()).or_default();
        if entry.is_empty() {
            order.push(span.trace_id.as_str());
        }
        entry.push(span);
    }

    order
        .into_iter()
        .map(|trace_id| build_group(trace_id, &members[trace_id]))
        .collect()
}

fn build_group(trace_id: &str, spans: &[&Span]) -> TraceGroup {
    let mut by_id: HashMap<&str, usize> = HashMap::new();
    for (idx, span) in spans.iter().enumerate() {
        by_id.entry(span.span_id.as_str()).or_insert(idx);
    }

    let placements: Vec<Placement> = spans
        .iter()
        .enumerate()
        .map(|(idx, span)| place(idx, span, spans, &by_id))
        .collect();

    let mut roots: Vec<SpanNode> = Vec::new();
    let mut root_slot: HashMap<usize, usize> = HashMap::new();
    for (idx, placement) in placements.iter().enumerate() {
        if let Placement::Root(_) = placement {
            root_slot.insert(idx, roots.len());
            roots.push(SpanNode {
                span: spans[idx].clone(),
                children: Vec::new(),
            });
        }
    }

    let mut orphans = Vec::new();
    for (idx, placement) in placements.iter().enumerate() {
        match placement {
            Placement::Root(_) => {}
            Placement::Child(root_idx) => roots[root_slot[root_idx]].children.push(spans[idx].clone()),
            Placement::Orphan => orphans.push(spans[idx].clone()),
        }
    }

    TraceGroup {
        trace_id: trace_id.to_string(),
        roots,
        orphans,
    }
}

/// Walk the parent chain of `spans[idx]` up to its root
fn place(idx: usize, span: &Span, spans: &[&Span], by_id: &HashMap<&str, usize>) -> Placement {
    let Some(mut parent_id) = span.parent_id.as_deref() else {
        return Placement::Root(idx);
    };

    // A chain longer than the group means a cycle
    for _ in 0..spans.len() {
        let Some(&parent_idx) = by_id.get(parent_id) else {
            return Placement::Orphan;
        };
        match spans[parent_idx].parent_id.as_deref() {
            None => return Placement::Child(parent_idx),
            Some(next) => parent_id = next,
        }
    }

    Placement::Orphan
}

/// Human-readable span duration: milliseconds under one second, else seconds
pub fn format_duration(duration: Option<chrono::Duration>) -> String {
    let Some(duration) = duration else {
        return "?".to_string();
    };

    let secs = match duration.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => duration.num_milliseconds() as f64 / 1_000.0,
    };

    if secs < 1.0 {
        format!("{:.0}ms", secs * 1_000.0)
    } else {
        format!("{:.2}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(name: &str, trace: &str, id: &str, parent: Option<&str>) -> Span {
        let span = Span::new(name, trace, id);
        match parent {
            Some(p) => span.with_parent(p),
            None => span,
        }
    }

    #[test]
    fn test_groups_keep_first_seen_order() {
        let spans = vec![
            span("a", "t2", "1", None),
            span("b", "t1", "2", None),
            span("c", "t2", "3", Some("1")),
        ];

        let groups = build_trace_groups(&spans);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].trace_id, "t2");
        assert_eq!(groups[0].roots[0].children[0].name, "c");
        assert_eq!(groups[1].trace_id, "t1");
    }

    #[test]
    fn test_children_precede_parent_in_stream() {
        // exporters emit children first because they end first
        let spans = vec![
            span("chat", "t", "2", Some("1")),
            span("execute_tool", "t", "3", Some("1")),
            span("invoke_agent", "t", "1", None),
        ];

        let groups = build_trace_groups(&spans);
        let root = &groups[0].roots[0];
        assert_eq!(root.span.name, "invoke_agent");
        let names: Vec<_> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["chat", "execute_tool"]);
    }

    #[test]
    fn test_grandchildren_flattened_under_root() {
        let spans = vec![
            span("root", "t", "1", None),
            span("child", "t", "2", Some("1")),
            span("grandchild", "t", "3", Some("2")),
        ];

        let groups = build_trace_groups(&spans);
        assert_eq!(groups[0].roots.len(), 1);
        assert_eq!(groups[0].roots[0].children.len(), 2);
        assert_eq!(groups[0].roots[0].children[1].name, "grandchild");
        assert!(groups[0].orphans.is_empty());
    }

    #[test]
    fn test_orphans_and_cycles() {
        let spans = vec![
            span("root", "t", "1", None),
            span("lost", "t", "2", Some("missing")),
            span("loop-a", "t", "3", Some("4")),
            span("loop-b", "t", "4", Some("3")),
            // parent lives in another trace
            span("cross", "t", "5", Some("9")),
            span("other", "u", "9", None),
        ];

        let groups = build_trace_groups(&spans);
        let t = &groups[0];
        let orphans: Vec<_> = t.orphans.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(orphans, vec!["lost", "loop-a", "loop-b", "cross"]);
        assert_eq!(t.span_count(), 5);
    }

    #[test]
    fn test_format_duration() {
        use chrono::Duration;

        assert_eq!(format_duration(None), "?");
        assert_eq!(format_duration(Some(Duration::milliseconds(250))), "250ms");
        assert_eq!(format_duration(Some(Duration::microseconds(999_400))), "999ms");
        assert_eq!(format_duration(Some(Duration::milliseconds(1_000))), "1.00s");
        assert_eq!(format_duration(Some(Duration::milliseconds(12_345))), "12.35s");
    }
}
