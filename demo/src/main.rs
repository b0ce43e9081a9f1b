//! MEDSAFE Reference Deployment: Demo CLI
//!
//! Validates a payload file or runs the built-in end-to-end scenarios, using
//! the reference collaborators (in-memory cache, catalog terminology service,
//! static enrichment table, hash-chained alert log).
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- scenario reconciliation
//!   cargo run -p demo -- validate --file patient.json --config config/medsafe.toml

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use medsafe_contracts::error::{MedsafeError, MedsafeResult};
use medsafe_core::config::OrchestratorConfig;
use medsafe_ref::{reference_deployment, scenarios};
use medsafe_rules::RuleCatalog;

// ── CLI definition ────────────────────────────────────────────────────────────

/// MEDSAFE: clinical data validation and medication reconciliation.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "MEDSAFE reference deployment demo",
    long_about = "Validates clinical payloads with field rules, cross-field consistency checks,\n\
                  drug interaction screening, and medication reconciliation."
)]
struct Cli {
    /// Orchestrator configuration TOML. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rule catalog TOML. The built-in catalog is used when omitted.
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate one JSON payload and print the report as JSON.
    Validate {
        /// Path to the patient payload.
        #[arg(long)]
        file: PathBuf,
    },
    /// Run one named scenario.
    Scenario {
        /// One of: anticoagulation, consistency, special-populations,
        /// reconciliation, resilience.
        name: String,
    },
    /// Run every scenario in sequence.
    RunAll,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = load(&cli).and_then(|(config, catalog)| match &cli.command {
        Command::Validate { file } => validate_file(file, config, &catalog),
        Command::Scenario { name } => {
            print_banner();
            scenarios::run_named(name, &config, &catalog).map(|_| ())
        }
        Command::RunAll => {
            print_banner();
            scenarios::run_all(&config, &catalog).map(|_| ())
        }
    });

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

fn load(cli: &Cli) -> MedsafeResult<(OrchestratorConfig, RuleCatalog)> {
    let config = match &cli.config {
        Some(path) => OrchestratorConfig::from_file(path)?,
        None => OrchestratorConfig::default(),
    };
    let catalog = match &cli.rules {
        Some(path) => RuleCatalog::from_file(path)?,
        None => RuleCatalog::builtin()?,
    };
    Ok((config, catalog))
}

// ── Validate ──────────────────────────────────────────────────────────────────

fn validate_file(file: &Path, config: OrchestratorConfig, catalog: &RuleCatalog) -> MedsafeResult<()> {
    let raw = fs::read_to_string(file).map_err(|e| MedsafeError::ConfigError {
        reason: format!("cannot read payload {}: {}", file.display(), e),
    })?;
    let payload: serde_json::Value = serde_json::from_str(&raw).map_err(|e| MedsafeError::DataError {
        field: "payload".to_string(),
        reason: format!("{} is not valid JSON: {}", file.display(), e),
    })?;

    let deployment = reference_deployment(config, catalog)?;
    let report = deployment.orchestrator.validate(&payload);
    info!(run_id = %report.run_id, passed = report.summary.passed, "payload validated");

    let rendered = serde_json::to_string_pretty(&report).map_err(|e| MedsafeError::SystemFailure {
        reason: format!("report could not be serialized: {}", e),
    })?;
    println!("{rendered}");

    if !report.summary.passed {
        std::process::exit(2);
    }
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("MEDSAFE — Clinical Validation Engine");
    println!("Reference Deployment Demo");
    println!("====================================");
    println!();
    println!("Pipeline per validation run:");
    println!("  [1] Payload parsed; JSON Schema structural check");
    println!("  [2] Field rules ∥ cross-field checks ∥ interaction screen ∥ reconciliation");
    println!("  [3] Terminology verification and interaction enrichment (time-bounded)");
    println!("  [4] Results merged; any fault or Error/Critical finding fails the report");
    println!("  [5] Critical reports dispatched to the SHA-256 chained alert log");
    println!();
}
