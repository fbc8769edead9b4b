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

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading, parsing, or exporting traces
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Trace file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Malformed record at byte {offset}: {reason}")]
    MalformedRecord { offset: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tracing subscriber error: {0}")]
    Subscriber(String),
}

pub type Result<T> = std::result::Result<T, TraceError>;
