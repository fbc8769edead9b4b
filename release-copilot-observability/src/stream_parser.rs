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

//! Record recovery from concatenated JSON objects
//!
//! Span exporters write pretty-printed objects back to back with no record
//! separator, and the same sink may interleave metrics payloads or partial
//! writes. Each candidate object starting at a `{` is decoded with
//! `serde_json`'s streaming deserializer, so braces inside string literals
//! never confuse record boundaries.
//!
//! In [`ParseMode::Lenient`] an undecodable fragment is dropped and scanning
//! resumes at the next `{` after the fragment's start. In
//! [`ParseMode::Strict`] the first undecodable fragment, or any stray text
//! between objects, fails the parse.

use release_copilot_core::Span;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::span_mapper::decode_span;
use crate::{Result, TraceError};

/// How to treat fragments that do not decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Drop malformed fragments and keep scanning
    #[default]
    Lenient,
    /// Fail on the first malformed fragment
    Strict,
}

/// Default admission predicate: the record has a non-null `name` and `context`.
///
/// Metrics payloads written to the same sink carry neither.
pub fn is_span_record(value: &Value) -> bool {
    let present = |key: &str| value.get(key).map_or(false, |v| !v.is_null());
    present("name") && present("context")
}

type Predicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Extracts JSON objects from a loosely delimited text stream
pub struct SpanStreamParser {
    mode: ParseMode,
    predicate: Predicate,
}

impl Default for SpanStreamParser {
    fn default() -> Self {
        Self::new(ParseMode::Lenient)
    }
}

impl std::fmt::Debug for SpanStreamParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanStreamParser")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl SpanStreamParser {
    /// Create a parser admitting span records only
    pub fn new(mode: ParseMode) -> Self {
        Self {
            mode,
            predicate: Box::new(is_span_record),
        }
    }

    /// Replace the admission predicate
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.predicate = Box::new(predicate);
        self
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Extract every admitted record, in stream order
    pub fn parse(&self, input: &str) -> Result<Vec<Value>> {
        Ok(self
            .parse_with_offsets(input)?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    /// Extract admitted records and decode them into spans
    pub fn parse_spans(&self, input: &str) -> Result<Vec<Span>> {
        let mut spans = Vec::new();

        for (offset, value) in self.parse_with_offsets(input)? {
            match decode_span(&value) {
                Ok(span) => spans.push(span),
                Err(reason) if self.mode == ParseMode::Strict => {
                    return Err(TraceError::MalformedRecord { offset, reason });
                }
                Err(reason) => {
                    debug!(offset, %reason, "Dropping undecodable span record");
                }
            }
        }

        Ok(spans)
    }

    fn parse_with_offsets(&self, input: &str) -> Result<Vec<(usize, Value)>> {
        let mut records = Vec::new();
        let mut pos = 0;

        while pos < input.len() {
            let Some(rel) = input[pos..].find('{') else {
                self.check_gap(input, pos, input.len())?;
                break;
            };
            let start = pos + rel;
            self.check_gap(input, pos, start)?;

            let mut stream = serde_json::Deserializer::from_str(&input[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(value)) => {
                    pos = start + stream.byte_offset();
                    if (self.predicate)(&value) {
                        records.push((start, value));
                    }
                }
                Some(Err(err)) => {
                    if self.mode == ParseMode::Strict {
                        return Err(TraceError::MalformedRecord {
                            offset: start,
                            reason: err.to_string(),
                        });
                    }
                    debug!(offset = start, error = %err, "Dropping malformed fragment");
                    // '{' is one byte, so start + 1 is a char boundary
                    pos = fragment_end(input, start).unwrap_or(start + 1);
                }
                None => break,
            }
        }

        Ok(records)
    }

    /// Text between records must be whitespace in strict mode
    fn check_gap(&self, input: &str, from: usize, to: usize) -> Result<()> {
        if self.mode == ParseMode::Lenient {
            return Ok(());
        }

        let gap = &input[from..to];
        match gap.find(|c: char| !c.is_whitespace()) {
            Some(idx) => Err(TraceError::MalformedRecord {
                offset: from + idx,
                reason: "unexpected text between records".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// End of the brace-balanced fragment opened at `start`, just past its `}`
///
/// String literals are skipped. Returns `None` for an unterminated fragment,
/// including one with a raw newline inside a string, which only a torn
/// write produces.
fn fragment_end(input: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in input.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                b'\n' => return None,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Read a trace file and recover its spans
pub fn load_spans(path: impl AsRef<Path>, mode: ParseMode) -> Result<Vec<Span>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(TraceError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let spans = SpanStreamParser::new(mode).parse_spans(&content)?;
    debug!(path = %path.display(), spans = spans.len(), "Loaded spans");
    Ok(spans)
}
