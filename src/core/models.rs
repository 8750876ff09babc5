// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use strum::{Display, EnumString};

// --- Severity ---

/// Graded outcome of a single check.
///
/// The variants are ordered from least to most severe so that a rule can
/// raise a severity with [`Severity::escalate`] without ever lowering it.
/// `Error` is reserved for checks that could not complete.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Critical,
    Error,
}

impl Severity {
    /// Raises `self` to `to` if `to` is more severe. Never downgrades.
    pub fn escalate(&mut self, to: Severity) {
        if to > *self {
            *self = to;
        }
    }
}

// --- Check results ---

/// Payload produced by one checker on success.
pub trait Report: Serialize {
    /// Subject used in failure messages, e.g. `"Failed to check SSL: ..."`.
    const LABEL: &'static str;

    /// Payload fields still emitted next to a failure envelope, if any.
    fn on_failure(_error: &str) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }
}

/// Outcome of one checker run against one domain.
///
/// Both variants serialize into the same flat JSON envelope
/// (`success`, `domain`, `severity`, `status`, `message`, `error`) with the
/// report fields flattened next to it on success.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult<R> {
    Success {
        domain: String,
        severity: Severity,
        status: String,
        message: String,
        report: R,
    },
    Failure {
        domain: String,
        message: String,
        error: String,
    },
}

impl<R: Report> CheckResult<R> {
    pub fn success(
        domain: impl Into<String>,
        severity: Severity,
        status: impl Into<String>,
        message: impl Into<String>,
        report: R,
    ) -> Self {
        CheckResult::Success {
            domain: domain.into(),
            severity,
            status: status.into(),
            message: message.into(),
            report,
        }
    }

    /// Wraps a failure cause into the error-severity variant.
    pub fn failure(domain: impl Into<String>, cause: impl fmt::Display) -> Self {
        let error = cause.to_string();
        CheckResult::Failure {
            domain: domain.into(),
            message: format!("Failed to check {}: {}", R::LABEL, error),
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CheckResult::Success { .. })
    }

    pub fn domain(&self) -> &str {
        match self {
            CheckResult::Success { domain, .. } | CheckResult::Failure { domain, .. } => domain,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            CheckResult::Success { severity, .. } => *severity,
            CheckResult::Failure { .. } => Severity::Error,
        }
    }

    pub fn status(&self) -> &str {
        match self {
            CheckResult::Success { status, .. } => status,
            CheckResult::Failure { .. } => "Error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CheckResult::Success { message, .. } | CheckResult::Failure { message, .. } => message,
        }
    }

    pub fn report(&self) -> Option<&R> {
        match self {
            CheckResult::Success { report, .. } => Some(report),
            CheckResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CheckResult::Success { .. } => None,
            CheckResult::Failure { error, .. } => Some(error),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a, R> {
    success: bool,
    domain: &'a str,
    severity: Severity,
    status: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(flatten)]
    report: Option<&'a R>,
}

impl<R: Report> Serialize for CheckResult<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CheckResult::Success { domain, severity, status, message, report } => Envelope {
                success: true,
                domain,
                severity: *severity,
                status,
                message,
                error: None,
                report: Some(report),
            }
            .serialize(serializer),
            CheckResult::Failure { domain, message, error } => {
                let fallback = R::on_failure(error);
                Envelope {
                    success: false,
                    domain,
                    severity: Severity::Error,
                    status: "Error",
                    message,
                    error: Some(error),
                    report: fallback.as_ref(),
                }
                .serialize(serializer)
            }
        }
    }
}

// --- Certificate ---

/// Leaf certificate facts gathered from the TLS handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateReport {
    pub valid: bool,
    pub days_remaining: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub issuer: String,
}

impl Report for CertificateReport {
    const LABEL: &'static str = "SSL";
}

// --- Cookies ---

/// Flags observed on a single `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieFlags {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: bool,
}

/// A cookie missing at least one protective attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieIssue {
    pub name: String,
    pub issues: Vec<String>,
    /// First 100 characters of the header, with `...` appended when cut.
    pub raw: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieReport {
    pub cookie_count: usize,
    pub cookies: Vec<CookieFlags>,
    pub issues: Vec<CookieIssue>,
    pub issue_count: usize,
}

impl Report for CookieReport {
    const LABEL: &'static str = "cookies";
}

// --- HSTS ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HstsDetails {
    pub header: Option<String>,
    pub max_age: Option<u64>,
    pub max_age_days: Option<u64>,
    pub include_sub_domains: bool,
    pub preload: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HstsReport {
    pub enabled: bool,
    pub details: HstsDetails,
}

impl Report for HstsReport {
    const LABEL: &'static str = "HSTS";

    // A failed HSTS check is still rendered as "not enabled".
    fn on_failure(error: &str) -> Option<Self> {
        Some(HstsReport {
            enabled: false,
            details: HstsDetails {
                issues: vec![error.to_string()],
                ..HstsDetails::default()
            },
        })
    }
}

// --- Domain records ---

/// The three check results for one domain, created once per batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainRecord {
    pub domain: String,
    pub ssl: CheckResult<CertificateReport>,
    pub cookies: CheckResult<CookieReport>,
    pub hsts: CheckResult<HstsReport>,
    pub timestamp: DateTime<Utc>,
}

impl DomainRecord {
    pub fn severities(&self) -> [Severity; 3] {
        [self.ssl.severity(), self.cookies.severity(), self.hsts.severity()]
    }

    /// The most severe outcome across the three checks.
    pub fn worst_severity(&self) -> Severity {
        self.severities().into_iter().max().unwrap_or(Severity::Ok)
    }
}

/// Severity counts over every check result in a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub ok: usize,
    pub warning: usize,
    pub critical: usize,
    pub error: usize,
    /// 100, minus 15 per critical and 5 per warning finding, floored at 0.
    pub score: u8,
    /// Most severe outcome of any domain; `ok` for an empty batch.
    pub worst: Severity,
}

impl BatchSummary {
    pub fn from_records(records: &[DomainRecord]) -> Self {
        let mut summary = BatchSummary {
            worst: records.iter().map(DomainRecord::worst_severity).max().unwrap_or(Severity::Ok),
            ..BatchSummary::default()
        };
        for severity in records.iter().flat_map(DomainRecord::severities) {
            match severity {
                Severity::Ok => summary.ok += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Critical => summary.critical += 1,
                Severity::Error => summary.error += 1,
            }
        }

        let penalty = summary.critical.saturating_mul(15).saturating_add(summary.warning.saturating_mul(5));
        summary.score = 100usize.saturating_sub(penalty) as u8;
        summary
    }
}

/// Batch response as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub success: bool,
    pub count: usize,
    pub summary: BatchSummary,
    pub results: Vec<DomainRecord>,
}

impl BatchReport {
    pub fn new(results: Vec<DomainRecord>) -> Self {
        Self {
            success: true,
            count: results.len(),
            summary: BatchSummary::from_records(&results),
            results,
        }
    }
}
