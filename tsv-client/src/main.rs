//! tsv-client - Term sheet validation client
//!
//! Submits a term sheet and a master sheet to the Validation Service,
//! prints the term-by-term verdict and optionally fetches the reports.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tsv_client::models::{ReportReferences, ValidationOutcome};
use tsv_client::render;
use tsv_client::{
    FileCandidate, IntakeSlots, ServiceClient, SlotKind, SubmitOutcome, ValidationOrchestrator,
};
use tsv_common::api::ReportKind;
use tsv_common::config::{ClientConfig, ConfigOverrides, ConfigResolver, LoggingConfig};

/// Command-line arguments for tsv-client
#[derive(Parser, Debug)]
#[command(name = "tsv-client")]
#[command(about = "Validate a term sheet against a master sheet")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/tsv/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the Validation Service
    #[arg(long, global = true, env = "TSV_SERVICE_URL")]
    service_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "TSV_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Directory for downloaded reports
    #[arg(long, global = true, env = "TSV_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TSV_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one validation cycle
    Validate {
        /// Term sheet (pdf, docx, xlsx, jpg, png, tiff)
        #[arg(long)]
        term_sheet: PathBuf,

        /// Master sheet (xlsx, xls, csv, pdf, docx)
        #[arg(long)]
        master_sheet: PathBuf,

        /// Fetch the PDF and Excel reports after a successful cycle
        #[arg(long)]
        download: bool,

        /// Write the decomposed result as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Print the text extracted from the term sheet
        #[arg(long)]
        show_text: bool,
    },

    /// Fetch a report of the latest cycle from the service
    Download {
        /// pdf or excel
        kind: ReportKind,

        /// Output file (default: served name in the download directory)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check whether a file would be accepted into a slot
    Check {
        path: PathBuf,

        /// term-sheet or master-sheet
        #[arg(long)]
        slot: SlotKind,
    },
}

/// JSON document written by `validate --json`
#[derive(Serialize)]
struct ValidationDocument<'a> {
    outcome: &'a ValidationOutcome,
    reports: &'a ReportReferences,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = ConfigResolver::new(ConfigOverrides {
        config_file: args.config.clone(),
        service_url: args.service_url.clone(),
        timeout_secs: args.timeout_secs,
        download_dir: args.download_dir.clone(),
        log_level: args.log_level.clone(),
    })
    .resolve()
    .context("Failed to resolve configuration")?;

    init_tracing(&config.logging)?;

    info!(
        "Starting tsv-client v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Validation service: {}", config.endpoints.base());

    match args.command {
        Command::Validate {
            term_sheet,
            master_sheet,
            download,
            json,
            show_text,
        } => {
            run_validate(
                &config,
                &term_sheet,
                &master_sheet,
                download,
                json.as_deref(),
                show_text,
            )
            .await
        }
        Command::Download { kind, output } => run_download(&config, kind, output.as_deref()).await,
        Command::Check { path, slot } => Ok(run_check(&path, slot)),
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level '{}'", logging.level))?;

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_slots(term_sheet: &Path, master_sheet: &Path) -> IntakeSlots {
    let mut slots = IntakeSlots::new();
    for (kind, path) in [
        (SlotKind::TermSheet, term_sheet),
        (SlotKind::MasterSheet, master_sheet),
    ] {
        match FileCandidate::from_path(path) {
            Ok(candidate) => slots.accept(kind, candidate),
            Err(e) => slots.reject(kind, format!("Cannot read {}: {}", path.display(), e)),
        };
    }
    for e in slots.intake_errors() {
        eprint!("{}", render::render_error(&e));
    }
    slots
}

async fn run_validate(
    config: &ClientConfig,
    term_sheet: &Path,
    master_sheet: &Path,
    download: bool,
    json: Option<&Path>,
    show_text: bool,
) -> Result<ExitCode> {
    let slots = load_slots(term_sheet, master_sheet);

    let client = ServiceClient::new(config.endpoints.clone(), config.timeout)
        .context("Failed to create Validation Service client")?;
    let orchestrator = ValidationOrchestrator::new(client).with_cycle_timeout(config.timeout);

    let result = match orchestrator.submit(&slots.term_sheet, &slots.master_sheet).await {
        SubmitOutcome::Success(result) => result,
        SubmitOutcome::Failed(e) | SubmitOutcome::PreconditionNotMet(e) => {
            error!(kind = e.kind(), "Validation cycle failed");
            eprint!("{}", render::render_error(&e));
            return Ok(ExitCode::FAILURE);
        }
        SubmitOutcome::AlreadyInFlight => {
            eprintln!("A validation is already in progress");
            return Ok(ExitCode::FAILURE);
        }
    };

    print!(
        "{}",
        render::render_outcome(&result.outcome, &result.reports, show_text)
    );

    if let Some(path) = json {
        let document = ValidationDocument {
            outcome: &result.outcome,
            reports: &result.reports,
        };
        let content = serde_json::to_string_pretty(&document)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote validation result to {}", path.display());
    }

    if download {
        let mut failed = false;
        for kind in [ReportKind::Pdf, ReportKind::Excel] {
            match orchestrator.transport().download_report(kind).await {
                Ok(report) => {
                    let path = report
                        .save_to(&config.download_dir)
                        .with_context(|| format!("Failed to save {} report", kind))?;
                    println!("Saved {} report to {}", kind, path.display());
                }
                Err(e) => {
                    failed = true;
                    eprint!("{}", render::render_error(&e));
                }
            }
        }
        if failed {
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_download(
    config: &ClientConfig,
    kind: ReportKind,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let client = ServiceClient::new(config.endpoints.clone(), config.timeout)
        .context("Failed to create Validation Service client")?;

    let report = match client.download_report(kind).await {
        Ok(report) => report,
        Err(e) => {
            eprint!("{}", render::render_error(&e));
            return Ok(ExitCode::FAILURE);
        }
    };

    let path = match output {
        Some(path) => {
            std::fs::write(path, &report.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path.to_path_buf()
        }
        None => report
            .save_to(&config.download_dir)
            .with_context(|| format!("Failed to save {} report", kind))?,
    };
    println!("Saved {} report to {}", kind, path.display());
    Ok(ExitCode::SUCCESS)
}

fn run_check(path: &Path, kind: SlotKind) -> ExitCode {
    let mut slots = IntakeSlots::new();
    let slot = match FileCandidate::from_path(path) {
        Ok(candidate) => slots.accept(kind, candidate),
        Err(e) => slots.reject(kind, format!("Cannot read {}: {}", path.display(), e)),
    };

    match (&slot.file, &slot.error) {
        (Some(file), _) => {
            println!("Accepted as {}: {} ({} bytes)", kind, file.name, file.size);
            ExitCode::SUCCESS
        }
        (None, error) => {
            eprintln!(
                "Rejected as {}: {}",
                kind,
                error.as_deref().unwrap_or("unknown reason")
            );
            ExitCode::FAILURE
        }
    }
}
