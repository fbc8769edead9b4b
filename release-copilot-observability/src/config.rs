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

//! Tracing configuration
//!
//! Reads the standard `OTEL_SERVICE_NAME` plus two Release Copilot variables:
//! `RELEASE_COPILOT_TRACE_FILE` and `RELEASE_COPILOT_TRACE_CONSOLE`.

use chrono::{DateTime, Utc};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_SERVICE_NAME: &str = "release-copilot-agent";
pub const DEFAULT_TRACES_DIR: &str = "traces";

/// Where and how finished spans are written
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Explicit trace file; when unset a timestamped file under `traces_dir` is used
    pub output_file: Option<PathBuf>,
    pub traces_dir: PathBuf,

    /// Mirror exported spans to stderr
    pub enable_console: bool,

    pub service_name: String,

    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            output_file: None,
            traces_dir: PathBuf::from(DEFAULT_TRACES_DIR),
            enable_console: false,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl TracingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            output_file: env::var("RELEASE_COPILOT_TRACE_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),

            enable_console: env::var("RELEASE_COPILOT_TRACE_CONSOLE")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),

            service_name: env::var("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),

            ..defaults
        }
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// The trace file to write: the explicit one, or `trace_<YYYYmmdd_HHMMSS>.jsonl`
    pub fn resolve_output_path(&self, now: DateTime<Utc>) -> PathBuf {
        match &self.output_file {
            Some(path) => path.clone(),
            None => self
                .traces_dir
                .join(format!("trace_{}.jsonl", now.format("%Y%m%d_%H%M%S"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.service_name, "release-copilot-agent");
        assert!(!config.enable_console);
        assert!(config.output_file.is_none());
    }

    #[test]
    fn test_resolve_output_path() {
        let now = Utc.with_ymd_and_hms(2025, 11, 29, 14, 30, 22).unwrap();

        let config = TracingConfig::default();
        assert_eq!(
            config.resolve_output_path(now),
            PathBuf::from("traces/trace_20251129_143022.jsonl")
        );

        let config = config.with_output_file("/tmp/run.jsonl");
        assert_eq!(config.resolve_output_path(now), PathBuf::from("/tmp/run.jsonl"));
    }

    #[test]
    fn test_from_env() {
        env::set_var("OTEL_SERVICE_NAME", "copilot-test");
        env::set_var("RELEASE_COPILOT_TRACE_CONSOLE", "TRUE");
        let config = TracingConfig::from_env();
        assert_eq!(config.service_name, "copilot-test");
        assert!(config.enable_console);
        env::remove_var("OTEL_SERVICE_NAME");
        env::remove_var("RELEASE_COPILOT_TRACE_CONSOLE");
    }
}
