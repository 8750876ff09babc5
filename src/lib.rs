// src/lib.rs

//! Security posture checks for web domains: TLS certificate expiry, cookie
//! security flags and HSTS policy strength, run concurrently per domain and
//! collected into one JSON-serializable record per input.

pub mod core;
pub mod logging;

pub use crate::core::config::ScanConfig;
pub use crate::core::error::{CheckError, InputError};
pub use crate::core::models::{
    BatchReport, BatchSummary, CertificateReport, CheckResult, CookieReport, DomainRecord, HstsReport, Severity,
};
pub use crate::core::scanner::Scanner;
pub use crate::core::target::normalize_domain;

/// Validates a batch with the default configuration.
pub async fn validate_batch<S: AsRef<str>>(targets: &[S]) -> Result<Vec<DomainRecord>, InputError> {
    Scanner::default().validate_batch(targets).await
}

/// Runs all three checks for one domain with the default configuration.
pub async fn check_domain(target: &str) -> DomainRecord {
    Scanner::default().check_domain(target).await
}

pub async fn check_certificate(target: &str) -> CheckResult<CertificateReport> {
    Scanner::default().check_certificate(target).await
}

pub async fn check_cookies(target: &str) -> CheckResult<CookieReport> {
    Scanner::default().check_cookies(target).await
}

pub async fn check_hsts(target: &str) -> CheckResult<HstsReport> {
    Scanner::default().check_hsts(target).await
}
