// src/core/scanner/hsts_scanner.rs

use tracing::{debug, info, warn};
use crate::core::models::{CheckResult, HstsDetails, HstsReport, Severity};
use crate::core::scanner::http_probe::{HttpProbe, ResponseHeaders};
use crate::core::target::normalize_domain;
use once_cell::sync::Lazy;
use regex::Regex;

const HSTS_HEADER: &str = "strict-transport-security";
const SECONDS_PER_DAY: u64 = 86_400;
/// One year, the commonly recommended minimum (and the preload list's floor).
const RECOMMENDED_MAX_AGE: u64 = 31_536_000;

static RE_MAX_AGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)max-age\s*=\s*(\d+)").unwrap());

/// Directives parsed out of a `Strict-Transport-Security` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HstsPolicy {
    /// Seconds; 0 when the directive is missing or does not fit a `u64`.
    pub max_age: u64,
    pub include_sub_domains: bool,
    pub preload: bool,
}

impl HstsPolicy {
    /// Lenient parse: anything malformed falls back to the most conservative reading.
    pub fn parse(value: &str) -> Self {
        let max_age = RE_MAX_AGE
            .captures(value)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0);
        let lower = value.to_ascii_lowercase();

        Self {
            max_age,
            include_sub_domains: lower.contains("includesubdomains"),
            preload: lower.contains("preload"),
        }
    }

    pub fn max_age_days(&self) -> u64 {
        self.max_age / SECONDS_PER_DAY
    }
}

/// Running verdict threaded through the policy rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub severity: Severity,
    pub status: &'static str,
    pub issues: Vec<String>,
}

impl Default for Assessment {
    fn default() -> Self {
        Self {
            severity: Severity::Ok,
            status: "HSTS Enabled",
            issues: Vec::new(),
        }
    }
}

type PolicyRule = fn(&HstsPolicy, Assessment) -> Assessment;

/// Order matters: later rules read the severity earlier ones produced,
/// and may raise it but never lower it.
const POLICY_RULES: [PolicyRule; 3] = [max_age_rule, include_sub_domains_rule, preload_rule];

fn max_age_rule(policy: &HstsPolicy, mut verdict: Assessment) -> Assessment {
    if policy.max_age == 0 {
        debug!("max-age is 0, HSTS is effectively disabled.");
        verdict.severity.escalate(Severity::Critical);
        verdict.status = "HSTS Misconfigured";
        verdict.issues.push("max-age is 0 (effectively disabled)".to_string());
    } else if policy.max_age < RECOMMENDED_MAX_AGE {
        debug!(max_age = policy.max_age, "max-age below the recommended minimum.");
        verdict.severity.escalate(Severity::Warning);
        verdict.status = "HSTS Weak Configuration";
        verdict.issues.push(format!(
            "max-age is {} days (recommended: at least 365 days)",
            policy.max_age_days()
        ));
    }
    verdict
}

fn include_sub_domains_rule(policy: &HstsPolicy, mut verdict: Assessment) -> Assessment {
    if !policy.include_sub_domains {
        debug!("includeSubDomains directive missing.");
        verdict.severity.escalate(Severity::Warning);
        verdict.issues.push("includeSubDomains directive not set".to_string());
    }
    verdict
}

// Informational only: never changes the severity.
fn preload_rule(policy: &HstsPolicy, mut verdict: Assessment) -> Assessment {
    if !policy.preload && verdict.severity == Severity::Ok {
        verdict.issues.push("preload directive not set (optional but recommended)".to_string());
    }
    verdict
}

/// Folds the policy rules over a parsed header.
pub fn assess_policy(policy: &HstsPolicy) -> Assessment {
    POLICY_RULES
        .iter()
        .fold(Assessment::default(), |verdict, rule| rule(policy, verdict))
}

/// Probes `https://{target}` and grades its HSTS policy.
pub async fn run_hsts_scan(probe: &HttpProbe, target: &str) -> CheckResult<HstsReport> {
    let domain = normalize_domain(target);
    info!(target = %domain, "Starting HSTS scan.");

    match probe.probe(&domain).await {
        Ok(response) => {
            let result = audit_hsts(&domain, &response.headers);
            info!(target = %domain, severity = %result.severity(), status = result.status(), "HSTS scan finished.");
            result
        }
        Err(e) => {
            warn!(target = %domain, error = %e, "HSTS scan failed.");
            CheckResult::failure(domain, e)
        }
    }
}

/// Grades the first `Strict-Transport-Security` header of an already fetched response.
///
/// A header with a blank value counts as absent.
pub fn audit_hsts(domain: &str, headers: &ResponseHeaders) -> CheckResult<HstsReport> {
    let Some(header) = headers.get(HSTS_HEADER).filter(|value| !value.trim().is_empty()) else {
        debug!("HSTS header not found.");
        let report = HstsReport {
            enabled: false,
            details: HstsDetails {
                issues: vec!["HSTS header not found".to_string()],
                ..HstsDetails::default()
            },
        };
        return CheckResult::success(
            domain,
            Severity::Critical,
            "HSTS Not Enabled",
            "HTTP Strict Transport Security policy is not enabled. This allows potential man-in-the-middle attacks.",
            report,
        );
    };

    debug!(value = header, "HSTS header found.");
    let policy = HstsPolicy::parse(header);
    let verdict = assess_policy(&policy);

    let message = if verdict.issues.is_empty() {
        format!("HSTS is properly configured (max-age: {} days)", policy.max_age_days())
    } else {
        format!("HSTS is enabled but has {} recommendation(s)", verdict.issues.len())
    };

    let report = HstsReport {
        enabled: true,
        details: HstsDetails {
            header: Some(header.to_string()),
            max_age: Some(policy.max_age),
            max_age_days: Some(policy.max_age_days()),
            include_sub_domains: policy.include_sub_domains,
            preload: policy.preload,
            issues: verdict.issues,
        },
    };
    CheckResult::success(domain, verdict.severity, verdict.status, message, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_hsts(value: &str) -> ResponseHeaders {
        [("Strict-Transport-Security", value)].into_iter().collect()
    }

    #[test]
    fn strong_policy_is_ok() {
        let result = audit_hsts("example.com", &with_hsts("max-age=63072000; includeSubDomains; preload"));
        let details = &result.report().unwrap().details;

        assert_eq!(result.severity(), Severity::Ok);
        assert_eq!(result.status(), "HSTS Enabled");
        assert_eq!(details.max_age_days, Some(730));
        assert!(details.issues.is_empty());
        assert_eq!(result.message(), "HSTS is properly configured (max-age: 730 days)");
    }

    #[test]
    fn zero_max_age_is_critical() {
        let result = audit_hsts("example.com", &with_hsts("max-age=0"));
        let details = &result.report().unwrap().details;

        assert_eq!(result.severity(), Severity::Critical);
        assert_eq!(result.status(), "HSTS Misconfigured");
        assert!(details.issues[0].contains("effectively disabled"));
        // The includeSubDomains rule still adds its issue but cannot downgrade.
        assert_eq!(details.issues.len(), 2);
    }

    #[test]
    fn missing_header_is_critical_and_disabled() {
        let result = audit_hsts("example.com", &ResponseHeaders::new());
        let report = result.report().unwrap();

        assert!(!report.enabled);
        assert_eq!(result.severity(), Severity::Critical);
        assert_eq!(result.status(), "HSTS Not Enabled");
        assert_eq!(report.details.issues, vec!["HSTS header not found"]);
        assert_eq!(report.details.max_age, None);
    }

    #[test]
    fn blank_header_counts_as_missing() {
        for blank in ["", "   "] {
            let result = audit_hsts("example.com", &with_hsts(blank));
            let report = result.report().unwrap();

            assert!(!report.enabled);
            assert_eq!(result.severity(), Severity::Critical);
            assert_eq!(result.status(), "HSTS Not Enabled");
            assert_eq!(report.details.header, None);
        }
    }

    #[test]
    fn short_max_age_is_weak() {
        let result = audit_hsts("example.com", &with_hsts("max-age=86400; includeSubDomains; preload"));
        assert_eq!(result.severity(), Severity::Warning);
        assert_eq!(result.status(), "HSTS Weak Configuration");
        assert_eq!(
            result.report().unwrap().details.issues,
            vec!["max-age is 1 days (recommended: at least 365 days)"]
        );
    }

    #[test]
    fn missing_include_sub_domains_escalates_ok_to_warning() {
        let result = audit_hsts("example.com", &with_hsts("max-age=31536000; preload"));
        assert_eq!(result.severity(), Severity::Warning);
        // Status stays tied to the max-age verdict.
        assert_eq!(result.status(), "HSTS Enabled");
        assert_eq!(result.message(), "HSTS is enabled but has 1 recommendation(s)");
    }

    #[test]
    fn preload_note_only_when_still_ok() {
        let ok = assess_policy(&HstsPolicy::parse("max-age=31536000; includeSubDomains"));
        assert_eq!(ok.severity, Severity::Ok);
        assert_eq!(ok.issues, vec!["preload directive not set (optional but recommended)"]);

        let weak = assess_policy(&HstsPolicy::parse("max-age=600; includeSubDomains"));
        assert_eq!(weak.issues.len(), 1);
    }

    #[test]
    fn parsing_is_case_insensitive_and_lenient() {
        let policy = HstsPolicy::parse("MAX-AGE = 31536000 ; INCLUDESUBDOMAINS; Preload");
        assert_eq!(
            policy,
            HstsPolicy { max_age: 31_536_000, include_sub_domains: true, preload: true }
        );

        assert_eq!(HstsPolicy::parse("includeSubDomains").max_age, 0);
        assert_eq!(HstsPolicy::parse("max-age=\"abc\"").max_age, 0);
        assert_eq!(HstsPolicy::parse("max-age=99999999999999999999999").max_age, 0);
    }

    #[test]
    fn first_header_wins() {
        let headers: ResponseHeaders = [
            ("strict-transport-security", "max-age=63072000; includeSubDomains; preload"),
            ("Strict-Transport-Security", "max-age=0"),
        ]
        .into_iter()
        .collect();
        assert_eq!(audit_hsts("example.com", &headers).severity(), Severity::Ok);
    }
}
