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

//! Evaluation result persistence

use chrono::{DateTime, Utc};
use release_copilot_core::{CaseOutcome, EvaluationReport};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::metrics::aggregate;
use crate::Result;

/// Write `value` as pretty JSON, replacing `path` in one rename
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    // Write to temporary file first (atomic write pattern)
    let temp_path = path.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Ordered log of case outcomes, written once on completion
#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    outcomes: Vec<CaseOutcome>,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, outcome: CaseOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = CaseOutcome>) {
        self.outcomes.extend(outcomes);
    }

    pub fn outcomes(&self) -> &[CaseOutcome] {
        &self.outcomes
    }

    /// Build the results document as of `now`
    pub fn report(&self, now: DateTime<Utc>) -> EvaluationReport {
        let summary = aggregate(&self.outcomes);
        EvaluationReport {
            evaluation_timestamp: now,
            total_test_cases: self.outcomes.len(),
            successful_evaluations: summary.scored,
            summary,
            results: self.outcomes.clone(),
        }
    }

    /// Write the results document and return it
    pub fn finish(self) -> Result<EvaluationReport> {
        let report = self.report(Utc::now());
        write_json_atomic(&self.path, &report)?;
        info!(
            path = %self.path.display(),
            total = report.total_test_cases,
            scored = report.successful_evaluations,
            "Wrote evaluation results"
        );
        Ok(report)
    }
}
