//! digitsort - distributed radix sort
//!
//! CLI entry point: `ds sort` runs a full comparison, `ds worker` joins a
//! socket run as one worker rank.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use digitsort::cli::{Cli, Command, SortArgs, WorkerArgs};
use digitsort::config::{Config, DEFAULT_ARRAY_SIZE};
use digitsort::launch::run_worker;
use digitsort::run::{RunReport, execute};
use digitsort::verify::Verification;

fn parse_level(level: Option<&str>) -> tracing::Level {
    match level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));

    // stdout carries the run summary, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    debug!("Logging initialized (level: {:?})", level);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref());

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Sort(args) => {
            debug!("main: matched Sort command");
            let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
            if cli.log_level.is_some() {
                config.log_level = cli.log_level.clone();
            }
            cmd_sort(config, &args).await
        }
        Command::Worker(args) => {
            debug!(rank = args.rank, "main: matched Worker command");
            cmd_worker(&args).await
        }
    }
}

/// Shuffle, sort both ways, verify and report
async fn cmd_sort(mut config: Config, args: &SortArgs) -> Result<()> {
    debug!(?args, "cmd_sort: called");
    if args.size.is_none() {
        if config.sort.array_size == DEFAULT_ARRAY_SIZE {
            warn!("Size isn't specified, default size = {}", DEFAULT_ARRAY_SIZE);
        } else {
            info!("Size isn't specified, using configured size = {}", config.sort.array_size);
        }
    }
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let report = execute(&config).await?;
    print_report(&report);

    if report.passed() {
        Ok(())
    } else {
        Err(eyre::eyre!("Distributed sort failed verification"))
    }
}

/// Join a socket run as one worker rank
async fn cmd_worker(args: &WorkerArgs) -> Result<()> {
    debug!(?args, "cmd_worker: called");
    run_worker(&args.socket, args.rank, args.world_size, args.channel_buffer).await?;
    info!(rank = args.rank, "Worker finished");
    Ok(())
}

fn mark(ok: bool) -> ColoredString {
    if ok { "✓".green() } else { "✗".red() }
}

fn print_verification(label: &str, check: &Verification) {
    println!(
        "{} {} ordered: {}  permutation: {}  consecutive descending: {}",
        mark(check.passed()),
        label.bold(),
        check.ordered,
        check.permutation,
        check.consecutive
    );
}

fn print_report(report: &RunReport) {
    println!(
        "Sorted {} elements in {} passes",
        report.input.len().to_string().cyan(),
        report.outcome.passes.to_string().cyan()
    );
    print_verification("Reference:  ", &report.reference_check);
    print_verification("Distributed:", &report.distributed_check);
    println!(
        "{} Distributed result matches reference: {}",
        mark(report.matches_reference()),
        report.matches_reference()
    );
    println!("{}", report.timings);

    if let Some(files) = &report.files {
        println!(
            "Arrays written to {}, {}, {}",
            files.shuffled.display().to_string().dimmed(),
            files.reference.display().to_string().dimmed(),
            files.distributed.display().to_string().dimmed()
        );
    }
}
