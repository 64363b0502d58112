// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-mrna CLI
//!
//! Validate mRNA design requests, run optimizations through the configured
//! engine and write the text report.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use ferro_mrna::config::{ConfigError, MrnaConfig};
use ferro_mrna::orchestrate::ValidatedInput;
use ferro_mrna::{
    build_engine, AggregatedResult, JoinPolicy, MrnaError, OptimizationInput, Orchestrator,
    ReportGenerator, RequestContext, ValidationErrors,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ferro-mrna")]
#[command(author, version, about = "mRNA sequence optimization orchestrator")]
#[command(
    long_about = "Validate and optimize mRNA constructs through an external engine.

Examples:
  ferro-mrna validate request.json
  ferro-mrna optimize request.json --count 3 --output report.txt
  ferro-mrna optimize request.json --json --sort-by-cai
  ferro-mrna config --output .ferro-mrna.toml"
)]
struct Cli {
    /// Log level filter (e.g. info, debug, ferro_mrna=trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize the construct described by a JSON request
    Optimize {
        /// Request file (JSON)
        input: PathBuf,

        /// Configuration file (default: .ferro-mrna.toml, then ~/.config/ferro-mrna/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of optimized sequences (overrides the request)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Write the report here instead of stdout; a directory gets the default file name
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the aggregated result as JSON instead of the text report
        #[arg(long)]
        json: bool,

        /// Order variants by descending codon adaptation index
        #[arg(long)]
        sort_by_cai: bool,

        /// User identifier forwarded to the engine
        #[arg(long)]
        user: Option<String>,
    },

    /// Validate a JSON request without calling the engine
    Validate {
        /// Request file (JSON)
        input: PathBuf,
    },

    /// Write the default configuration
    Config {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level, cli.json_logs) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Optimize {
            input,
            config,
            count,
            output,
            json,
            sort_by_cai,
            user,
        } => {
            optimize_command(
                &input,
                config.as_deref(),
                count,
                output.as_deref(),
                json,
                sort_by_cai,
                user,
            )
            .await
        }
        Commands::Validate { input } => validate_command(&input),
        Commands::Config { output, force } => config_command(output.as_deref(), force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str, json_logs: bool) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{}': {}", level, e))?;

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn report_error(err: &MrnaError) {
    match err.validation_errors() {
        Some(errors) => print_validation_errors(errors),
        None => eprintln!("error[{}]: {}", err.code(), err),
    }
}

fn print_validation_errors(errors: &ValidationErrors) {
    eprintln!("Request is invalid ({} issue(s)):", errors.len());
    for issue in errors.issues() {
        eprintln!("  {}: {}", issue.path, issue.message);
    }
}

fn load_input(path: &Path) -> Result<ValidatedInput, MrnaError> {
    let content = fs::read_to_string(path)?;
    let input = OptimizationInput::from_json(&content)?;
    Ok(input.validate()?)
}

async fn optimize_command(
    input_path: &Path,
    config_path: Option<&Path>,
    count: Option<usize>,
    output: Option<&Path>,
    json: bool,
    sort_by_cai: bool,
    user: Option<String>,
) -> Result<(), MrnaError> {
    let config = MrnaConfig::load(config_path)?;
    config.validate()?;

    let input = load_input(input_path)?;
    let number_of_sequences = count.unwrap_or(input.number_of_sequences);
    let ctx = match user {
        Some(user) => RequestContext::for_user(user),
        None => RequestContext::anonymous(),
    };

    let engine = build_engine(&config.engine)?;
    let orchestrator = Orchestrator::from_config(engine, &config.orchestration);
    info!(
        input = %input_path.display(),
        join_policy = ?config.orchestration.join_policy,
        "loaded request"
    );

    let result = match config.orchestration.join_policy {
        JoinPolicy::FailFast => {
            orchestrator
                .run(&ctx, &input.request, number_of_sequences)
                .await?
        }
        JoinPolicy::SettleAll => {
            let settled = orchestrator
                .run_settled(&ctx, &input.request, number_of_sequences)
                .await?;
            for failure in settled.failures() {
                warn!(error = %failure, "engine task failed");
            }
            settled.into_aggregated()?
        }
    };
    let result = if sort_by_cai {
        result.sorted_by_adaptation_index()
    } else {
        result
    };

    let rendered = if json {
        serde_json::to_string_pretty(&result)?
    } else {
        render_report(&config, &input, &result)
    };

    match output {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(ReportGenerator::from_config(&config.report).file_name(&Utc::now()))
            } else {
                path.to_path_buf()
            };
            fs::write(&path, rendered)?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn render_report(config: &MrnaConfig, input: &ValidatedInput, result: &AggregatedResult) -> String {
    ReportGenerator::from_config(&config.report).generate(
        &input.name,
        input.request.sequence(),
        input.request.parameters(),
        result,
        &Local::now().fixed_offset(),
    )
}

fn validate_command(input_path: &Path) -> Result<(), MrnaError> {
    let input = load_input(input_path)?;
    println!(
        "Request is valid: {} region(s), {} sequence(s) requested",
        input.request.parameters().len(),
        input.number_of_sequences
    );
    Ok(())
}

fn config_command(output: Option<&Path>, force: bool) -> Result<(), MrnaError> {
    let config = MrnaConfig::default();
    match output {
        Some(path) => {
            if path.exists() && !force {
                return Err(MrnaError::Io {
                    msg: format!(
                        "{} already exists; use --force to overwrite",
                        path.display()
                    ),
                });
            }
            config.to_file(path)?;
            eprintln!("Wrote default configuration to {}", path.display());
        }
        None => {
            let content = toml::to_string_pretty(&config).map_err(ConfigError::from)?;
            print!("{}", content);
        }
    }
    Ok(())
}
