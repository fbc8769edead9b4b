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

//! Tracer provider lifecycle
//!
//! [`init_tracing`] runs once per process. It builds a provider that exports
//! every finished span through a [`JsonSpanExporter`], installs a
//! `tracing-subscriber` registry with a console log layer plus an
//! OpenTelemetry layer, and keeps the resulting [`TracingHandle`]. Later
//! calls hand back a clone of that handle and ignore their config.

use chrono::Utc;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_sdk::{
    trace::{Config, TracerProvider},
    Resource,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::{JsonSpanExporter, Result, TraceError, TracingConfig};

const INSTRUMENTATION_NAME: &str = "release-copilot";

static ACTIVE: Mutex<Option<TracingHandle>> = parking_lot::const_mutex(None);

/// Process-wide tracing state returned by [`init_tracing`]
#[derive(Debug, Clone)]
pub struct TracingHandle {
    provider: TracerProvider,
    output_path: PathBuf,
}

impl TracingHandle {
    /// Trace file receiving exported spans
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn provider(&self) -> &TracerProvider {
        &self.provider
    }

    pub fn flush(&self) {
        for result in self.provider.force_flush() {
            if let Err(e) = result {
                warn!(error = %e, "Span flush failed");
            }
        }
    }

    /// Flush pending spans and shut the global provider down
    pub fn shutdown(&self) {
        self.flush();
        global::shutdown_tracer_provider();
        ACTIVE.lock().take();
        debug!(path = %self.output_path.display(), "Tracing shut down");
    }
}

/// Build a provider that writes spans to the configured trace file
///
/// Does not touch any global state.
pub fn build_provider(config: &TracingConfig) -> Result<(TracerProvider, PathBuf)> {
    let output_path = config.resolve_output_path(Utc::now());
    let exporter = JsonSpanExporter::to_file(&output_path)?;

    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ]);

    let mut builder = TracerProvider::builder().with_simple_exporter(exporter);
    if config.enable_console {
        builder = builder.with_simple_exporter(JsonSpanExporter::stderr());
    }
    let provider = builder
        .with_config(Config::default().with_resource(resource))
        .build();

    Ok((provider, output_path))
}

/// Install span export and console logging for this process
pub fn init_tracing(config: TracingConfig) -> Result<TracingHandle> {
    let mut active = ACTIVE.lock();
    if let Some(handle) = active.as_ref() {
        return Ok(handle.clone());
    }

    let (provider, output_path) = build_provider(&config)?;
    let tracer = provider.tracer(INSTRUMENTATION_NAME);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter);
    let otel_layer = tracing_opentelemetry::layer()
        .with_tracer(tracer)
        .with_filter(LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TraceError::Subscriber(e.to_string()))?;

    global::set_tracer_provider(provider.clone());

    let handle = TracingHandle {
        provider,
        output_path,
    };
    *active = Some(handle.clone());
    debug!(path = %handle.output_path.display(), "Tracing initialized");

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{Span as _, Tracer as _};

    #[test]
    fn test_build_provider_exports_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TracingConfig::default().with_output_file(dir.path().join("t.jsonl"));

        let (provider, path) = build_provider(&config).unwrap();
        let tracer = provider.tracer("test");
        let mut span = tracer.start("execute_tool get_job_logs");
        span.set_attribute(KeyValue::new("gen_ai.tool.input", r#"{"job_id": "job-789"}"#));
        span.end();

        let spans = crate::load_spans(&path, crate::ParseMode::Strict).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].tool_input(), Some(r#"{"job_id": "job-789"}"#));
        assert!(spans[0].is_root());
    }
}
