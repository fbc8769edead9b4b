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

//! Release Copilot CLI
//!
//! Trace viewing and tool selection evaluation for the Release Copilot agent.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use release_copilot_core::{
    format_percent as percent, load_ground_truth, CaseOutcome, EvaluationSummary,
};
use release_copilot_evals::{
    evaluate_collected, load_collected_responses, CollectConfig, Collector, EvalConfig,
    HttpAgentRunner, JudgeConfig, ResultStore,
};
use release_copilot_observability::{
    find_latest_trace_file, init_tracing, load_spans, ParseMode, ReportOptions, TraceReport,
    TracingConfig, TracingHandle,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const RULE_WIDTH: usize = 80;

#[derive(Parser)]
#[command(name = "release-copilot")]
#[command(about = "Release Copilot - trace viewer and tool selection evaluation", long_about = None)]
struct Cli {
    /// Verbose mode
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a trace file as a summary plus per-trace span trees
    Traces {
        /// Trace file to read (default: latest in the traces directory)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Directory searched for trace_*.jsonl files
        #[arg(long, default_value = "traces", env = "RELEASE_COPILOT_TRACES_DIR")]
        dir: PathBuf,

        /// Show summary only
        #[arg(long)]
        summary: bool,

        /// Show only tool calls
        #[arg(long)]
        tools_only: bool,

        /// Show only the last N spans
        #[arg(long)]
        last: Option<usize>,

        /// Fail on the first malformed record instead of skipping it
        #[arg(long)]
        strict: bool,

        /// Output as JSON (machine-readable)
        #[arg(long)]
        json: bool,
    },

    /// Run every ground-truth query through the agent and save the responses
    Collect {
        /// Ground-truth fixture
        #[arg(long, default_value = "eval/ground_truth.json")]
        ground_truth: PathBuf,

        /// Collected-responses document to write
        #[arg(short, long, default_value = "eval/collected_responses.json")]
        output: PathBuf,

        /// Agent endpoint (default: RELEASE_COPILOT_AGENT_URL or http://localhost:8000/chat)
        #[arg(long)]
        agent_url: Option<String>,

        /// Per-run timeout in seconds (default: RELEASE_COPILOT_RUN_TIMEOUT_SECS or 120)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Score collected responses and write the results document
    Evaluate {
        /// Collected-responses document
        #[arg(long, default_value = "eval/collected_responses.json")]
        responses: PathBuf,

        /// Results document to write
        #[arg(short, long, default_value = "eval/eval_results.json")]
        output: PathBuf,

        /// Skip the LLM judge even when credentials are configured
        #[arg(long)]
        no_llm: bool,

        /// Test cases evaluated at once
        #[arg(long, default_value_t = 1)]
        max_concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env is fine; the environment may already be set
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let log_filter = if cli.verbose { "debug" } else { "info" };

    match cli.command {
        Commands::Traces {
            file,
            dir,
            summary,
            tools_only,
            last,
            strict,
            json,
        } => {
            init_logging(log_filter);
            let options = ReportOptions {
                summary_only: summary,
                tools_only,
                last,
            };
            let mode = if strict {
                ParseMode::Strict
            } else {
                ParseMode::Lenient
            };
            show_traces(file, &dir, options, mode, json)
        }

        Commands::Collect {
            ground_truth,
            output,
            agent_url,
            timeout_secs,
        } => {
            let handle = start_tracing(log_filter)?;
            let result = collect(&ground_truth, &output, agent_url, timeout_secs).await;
            handle.shutdown();
            result
        }

        Commands::Evaluate {
            responses,
            output,
            no_llm,
            max_concurrent,
        } => {
            let handle = start_tracing(log_filter)?;
            let result = evaluate(&responses, &output, no_llm, max_concurrent).await;
            handle.shutdown();
            result
        }
    }
}

/// Console logging only; `RUST_LOG` overrides `default_filter`
fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Console logging plus span export to a trace file
fn start_tracing(default_filter: &str) -> Result<TracingHandle> {
    let config = TracingConfig::from_env().with_log_filter(default_filter);
    let handle = init_tracing(config).context("Failed to initialize tracing")?;
    println!(
        "✓ Traces will be written to: {}",
        handle.output_path().display()
    );
    Ok(handle)
}

fn show_traces(
    file: Option<PathBuf>,
    dir: &Path,
    options: ReportOptions,
    mode: ParseMode,
    json: bool,
) -> Result<ExitCode> {
    let path = match file {
        Some(path) => path,
        None => {
            if !dir.is_dir() {
                println!("❌ No traces directory found. Run the CLI first to generate traces.");
                return Ok(ExitCode::FAILURE);
            }
            match find_latest_trace_file(dir)
                .with_context(|| format!("Failed to scan {}", dir.display()))?
            {
                Some(path) => {
                    if !json {
                        println!("📁 Reading latest trace file: {}\n", path.display());
                    }
                    path
                }
                None => {
                    println!("❌ No trace files found in {}/ directory.", dir.display());
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    };

    if !path.exists() {
        println!("❌ Trace file not found: {}", path.display());
        return Ok(ExitCode::FAILURE);
    }

    let spans = load_spans(&path, mode)
        .with_context(|| format!("Failed to read trace file {}", path.display()))?;
    if spans.is_empty() {
        println!("No traces found.");
        return Ok(ExitCode::SUCCESS);
    }

    let report = TraceReport::new(spans, options);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &report).context("Failed to write report")?;
        writeln!(out)?;
    } else {
        report.render(&mut out).context("Failed to write report")?;
    }

    Ok(ExitCode::SUCCESS)
}

async fn collect(
    ground_truth: &Path,
    output: &Path,
    agent_url: Option<String>,
    timeout_secs: Option<u64>,
) -> Result<ExitCode> {
    let mut config = CollectConfig::from_env();
    if let Some(url) = agent_url {
        config.agent_url = url;
    }
    if let Some(secs) = timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }

    let test_cases = load_ground_truth(ground_truth)
        .with_context(|| format!("Failed to load ground truth from {}", ground_truth.display()))?;
    info!(count = test_cases.len(), agent = %config.agent_url, "Loaded test cases");

    let collector = Collector::new(Arc::new(HttpAgentRunner::new(config.agent_url)))
        .with_timeout(config.timeout);
    let collected = collector
        .collect_to_file(&test_cases, output)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    for response in collected.iter().filter(|r| r.is_failure()) {
        println!(
            "❌ Test case {} failed: {}",
            response.test_case_id(),
            response.query()
        );
    }

    let failed = collected.iter().filter(|r| r.is_failure()).count();
    println!(
        "✓ Collected {} responses ({} failed)",
        collected.len(),
        failed
    );
    println!("✓ Responses saved to: {}", output.display());

    Ok(ExitCode::SUCCESS)
}

async fn evaluate(
    responses_path: &Path,
    output: &Path,
    no_llm: bool,
    max_concurrent: usize,
) -> Result<ExitCode> {
    let responses = load_collected_responses(responses_path).with_context(|| {
        format!(
            "Failed to load collected responses from {}",
            responses_path.display()
        )
    })?;

    let judge = if no_llm {
        None
    } else {
        let config = JudgeConfig::from_env();
        if config.is_none() {
            warn!("No judge credentials configured; scoring tool names only");
        }
        config.map(JudgeConfig::into_adapter)
    };

    let config = EvalConfig { max_concurrent };
    let outcomes = evaluate_collected(&responses, judge.as_ref(), &config).await;

    for outcome in &outcomes {
        print_outcome(outcome, outcomes.len());
    }

    let mut store = ResultStore::new(output);
    store.extend(outcomes);
    let report = store
        .finish()
        .with_context(|| format!("Failed to write {}", output.display()))?;

    print_summary(&report.summary);
    println!("\n\nDetailed results saved to: {}", output.display());
    println!("{}\n", "=".repeat(RULE_WIDTH));

    Ok(ExitCode::SUCCESS)
}

fn print_outcome(outcome: &CaseOutcome, total: usize) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("Test Case {}/{}", outcome.test_case_id(), total);

    match outcome {
        CaseOutcome::Skipped(skipped) => {
            println!("Query: {}", skipped.query);
            println!("\n❌ Skipped: {}", skipped.error);
        }
        CaseOutcome::Scored(case) => {
            println!("Query: {}", case.query);
            println!("Expected Tools: {:?}", case.result.expected_tools);

            println!("\nActual Tool Calls:");
            for call in &case.actual_tool_calls {
                println!(
                    "  - {}: {}",
                    call.name.as_deref().unwrap_or("<unnamed>"),
                    serde_json::Value::Object(call.arguments.clone())
                );
            }

            let result = &case.result;
            println!("\nTool Selection:");
            println!("  Precision: {:.2}", result.precision);
            println!("  Recall: {:.2}", result.recall);
            println!("  F1 Score: {:.2}", result.f1);
            println!("  Exact Match: {}", result.exact_match);

            if let Some(judge) = &case.judge {
                println!("\nLLM Evaluation:");
                println!("  Overall Score: {:.2}", judge.overall);
                println!("  Reasoning: {}", judge.rationale);
            }
        }
    }
}

fn print_summary(summary: &EvaluationSummary) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("AGGREGATE RESULTS");
    println!("{}", "=".repeat(RULE_WIDTH));

    if summary.scored == 0 {
        println!("\nNo test cases were scored ({} skipped).", summary.skipped);
        return;
    }

    println!(
        "\nTool Selection Metrics (averaged over {} test cases, {} skipped):",
        summary.scored, summary.skipped
    );
    println!("  Average Precision: {}", percent(summary.average_precision));
    println!("  Average Recall: {}", percent(summary.average_recall));
    println!("  Average F1 Score: {}", percent(summary.average_f1));
    println!("  Exact Match Rate: {}", percent(summary.exact_match_rate));

    if let Some(judge) = &summary.judge {
        println!("\nLLM-based Metrics ({} judged, {} failed):", judge.judged, judge.failures);
        println!("  Average Overall Score: {}", percent(Some(judge.average_overall)));
        println!("  Average Correctness: {}", percent(Some(judge.average_correctness)));
        println!("  Average Completeness: {}", percent(Some(judge.average_completeness)));
        println!("  Average Efficiency: {}", percent(Some(judge.average_efficiency)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_traces_flags() {
        let cli = Cli::try_parse_from([
            "release-copilot",
            "traces",
            "--tools-only",
            "--last",
            "5",
            "--strict",
        ])
        .unwrap();

        match cli.command {
            Commands::Traces {
                tools_only,
                last,
                strict,
                summary,
                ..
            } => {
                assert!(tools_only);
                assert!(strict);
                assert!(!summary);
                assert_eq!(last, Some(5));
            }
            _ => panic!("expected traces command"),
        }
    }

    #[test]
    fn test_evaluate_defaults() {
        let cli = Cli::try_parse_from(["release-copilot", "-v", "evaluate", "--no-llm"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Evaluate {
                responses,
                no_llm,
                max_concurrent,
                ..
            } => {
                assert_eq!(responses, PathBuf::from("eval/collected_responses.json"));
                assert!(no_llm);
                assert_eq!(max_concurrent, 1);
            }
            _ => panic!("expected evaluate command"),
        }
    }
}
