// src/core/scanner/mod.rs

// Public interface of the `scanner` module: one sub-module per checker plus
// the batch orchestration that runs them.
pub mod cookie_scanner;
pub mod hsts_scanner;
pub mod http_probe;
pub mod ssl_scanner;

use crate::core::config::ScanConfig;
use crate::core::error::InputError;
use crate::core::models::{CertificateReport, CheckResult, CookieReport, DomainRecord, HstsReport};
use crate::core::target::normalize_domain;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use self::cookie_scanner::run_cookie_scan;
use self::hsts_scanner::run_hsts_scan;
use self::http_probe::HttpProbe;
use self::ssl_scanner::run_ssl_scan;

/// The three independent checks run against every domain.
///
/// [`Scanner`] is the network-backed implementation; the orchestration below
/// is generic so it can be driven without touching the network.
#[allow(async_fn_in_trait)]
pub trait PostureChecks {
    async fn certificate(&self, domain: &str) -> CheckResult<CertificateReport>;
    async fn cookies(&self, domain: &str) -> CheckResult<CookieReport>;
    async fn hsts(&self, domain: &str) -> CheckResult<HstsReport>;
}

/// Entry point of the engine: holds the configuration every check runs with.
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScanConfig,
    probe: HttpProbe,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        let probe = HttpProbe::new(&config);
        Self { config, probe }
    }

    pub async fn check_certificate(&self, target: &str) -> CheckResult<CertificateReport> {
        run_ssl_scan(&self.config, target).await
    }

    pub async fn check_cookies(&self, target: &str) -> CheckResult<CookieReport> {
        run_cookie_scan(&self.probe, target).await
    }

    pub async fn check_hsts(&self, target: &str) -> CheckResult<HstsReport> {
        run_hsts_scan(&self.probe, target).await
    }

    /// Runs all three checks against one domain.
    pub async fn check_domain(&self, target: &str) -> DomainRecord {
        run_full_scan(self, target).await
    }

    /// Checks every domain in `targets`, returning records in input order.
    pub async fn validate_batch<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<DomainRecord>, InputError> {
        run_batch(self, targets, self.config.max_concurrent_domains).await
    }
}

impl PostureChecks for Scanner {
    async fn certificate(&self, domain: &str) -> CheckResult<CertificateReport> {
        self.check_certificate(domain).await
    }

    async fn cookies(&self, domain: &str) -> CheckResult<CookieReport> {
        self.check_cookies(domain).await
    }

    async fn hsts(&self, domain: &str) -> CheckResult<HstsReport> {
        self.check_hsts(domain).await
    }
}

/// Executes the three checks for one domain concurrently and joins them.
///
/// A failing check only turns its own slot into an error result; the other
/// two are always reported.
pub async fn run_full_scan<C: PostureChecks>(checks: &C, target: &str) -> DomainRecord {
    let domain = normalize_domain(target);
    debug!(target = %domain, "Running all checks.");

    // `tokio::join!` waits for all three before the record is built.
    let (ssl, cookies, hsts) = tokio::join!(
        checks.certificate(&domain),
        checks.cookies(&domain),
        checks.hsts(&domain)
    );

    DomainRecord {
        domain,
        ssl,
        cookies,
        hsts,
        timestamp: Utc::now(),
    }
}

/// Rejects inputs that cannot be checked, before any network call.
pub fn validate_input<S: AsRef<str>>(targets: &[S]) -> Result<(), InputError> {
    if targets.is_empty() {
        return Err(InputError::EmptyBatch);
    }
    for (index, raw) in targets.iter().enumerate() {
        if normalize_domain(raw.as_ref()).is_empty() {
            return Err(InputError::EmptyDomain { index, raw: raw.as_ref().to_string() });
        }
    }
    Ok(())
}

/// Checks up to `limit` domains at a time.
///
/// Output order always matches `targets`, duplicates included, no matter
/// which domain finishes first.
pub async fn run_batch<C, S>(checks: &C, targets: &[S], limit: usize) -> Result<Vec<DomainRecord>, InputError>
where
    C: PostureChecks,
    S: AsRef<str>,
{
    validate_input(targets)?;
    info!(domains = targets.len(), limit, "Starting batch validation.");

    // `buffered` (unlike `buffer_unordered`) yields in submission order.
    let records: Vec<DomainRecord> = stream::iter(targets)
        .map(|target| run_full_scan(checks, target.as_ref()))
        .buffered(limit.max(1))
        .collect()
        .await;

    info!(domains = records.len(), "Batch validation finished.");
    Ok(records)
}
