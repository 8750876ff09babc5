// src/main.rs

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use domain_posture::core::config::ScanConfig;
use domain_posture::core::models::BatchReport;
use domain_posture::core::scanner::Scanner;
use domain_posture::logging;

/// Checks TLS certificates, cookie flags and HSTS policies of web domains.
#[derive(Parser)]
#[command(name = "domain-posture", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Per-check timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Maximum number of domains checked at the same time
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Print single-line JSON instead of pretty-printed JSON
    #[arg(long, global = true)]
    compact: bool,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every check against a list of domains
    Batch {
        /// Domains, optionally with scheme or path (e.g. https://example.com/login)
        #[arg(required = true)]
        domains: Vec<String>,
    },
    /// Check only the TLS certificate of one domain
    Ssl { domain: String },
    /// Check only the cookie flags of one domain
    Cookies { domain: String },
    /// Check only the HSTS policy of one domain
    Hsts { domain: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let log_path = logging::initialize_logging(cli.verbose).wrap_err("failed to initialize logging")?;
    debug!(log = %log_path.display(), "Logging initialized.");

    let mut config = ScanConfig::from_env();
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(limit) = cli.concurrency {
        config = config.with_max_concurrent_domains(limit);
    }
    let scanner = Scanner::new(config);

    let output = match cli.command {
        Commands::Batch { domains } => {
            let records = scanner.validate_batch(&domains).await?;
            let report = BatchReport::new(records);
            info!(domains = report.count, worst = %report.summary.worst, score = report.summary.score, "Batch report ready.");
            to_json(&report, cli.compact)?
        }
        Commands::Ssl { domain } => to_json(&scanner.check_certificate(&domain).await, cli.compact)?,
        Commands::Cookies { domain } => to_json(&scanner.check_cookies(&domain).await, cli.compact)?,
        Commands::Hsts { domain } => to_json(&scanner.check_hsts(&domain).await, cli.compact)?,
    };

    println!("{output}");
    Ok(())
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.wrap_err("failed to serialize report")
}
