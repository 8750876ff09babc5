// src/core/scanner/cookie_scanner.rs

use tracing::{debug, info, warn};

use crate::core::models::{CheckResult, CookieFlags, CookieIssue, CookieReport, Severity};
use crate::core::scanner::http_probe::{HttpProbe, ResponseHeaders};
use crate::core::target::normalize_domain;

const MISSING_SECURE: &str = "Missing Secure flag";
const MISSING_HTTP_ONLY: &str = "Missing HttpOnly flag";
const MISSING_SAME_SITE: &str = "Missing SameSite attribute";
const RAW_PREVIEW_CHARS: usize = 100;

/// A single `Set-Cookie` header split into its name and the three flags we audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCookie {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: bool,
}

impl ParsedCookie {
    /// Parses `raw`; `position` is the 1-based placeholder index used when
    /// the header carries no usable name.
    pub fn parse(raw: &str, position: usize) -> Self {
        let parts: Vec<&str> = raw.split(';').map(str::trim).collect();

        let name = parts
            .first()
            .and_then(|pair| pair.split('=').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Cookie {position}"));

        Self {
            name,
            secure: parts.iter().any(|p| p.eq_ignore_ascii_case("secure")),
            http_only: parts.iter().any(|p| p.eq_ignore_ascii_case("httponly")),
            // SameSite carries a value (`SameSite=Lax`), so only the prefix counts.
            same_site: parts.iter().any(|p| starts_with_ignore_ascii_case(p, "samesite")),
        }
    }

    /// Issue strings for the flags this cookie lacks, in a fixed order.
    pub fn missing_flags(&self) -> Vec<String> {
        [
            (self.secure, MISSING_SECURE),
            (self.http_only, MISSING_HTTP_ONLY),
            (self.same_site, MISSING_SAME_SITE),
        ]
        .into_iter()
        .filter(|(present, _)| !present)
        .map(|(_, issue)| issue.to_string())
        .collect()
    }
}

fn starts_with_ignore_ascii_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Probes `https://{target}` and audits every cookie it sets.
pub async fn run_cookie_scan(probe: &HttpProbe, target: &str) -> CheckResult<CookieReport> {
    let domain = normalize_domain(target);
    info!(target = %domain, "Starting cookie scan.");

    match probe.probe(&domain).await {
        Ok(response) => {
            let result = audit_cookies(&domain, &response.headers);
            info!(target = %domain, severity = %result.severity(), status = result.status(), "Cookie scan finished.");
            result
        }
        Err(e) => {
            warn!(target = %domain, error = %e, "Cookie scan failed.");
            CheckResult::failure(domain, e)
        }
    }
}

/// Every distinct `Set-Cookie` value, in first-seen order.
///
/// Distinct means textually distinct: two headers with identical text collapse
/// into one even if a server really did send the same cookie twice.
pub fn collect_set_cookies(headers: &ResponseHeaders) -> Vec<&str> {
    let mut cookies: Vec<&str> = Vec::new();
    for value in headers.get_all("set-cookie") {
        if !cookies.contains(&value) {
            cookies.push(value);
        }
    }
    cookies
}

/// Counts the aggregate severity rules look at.
struct CookieTally {
    total: usize,
    with_issues: usize,
    missing_secure: usize,
}

type SeverityRule = fn(&CookieTally) -> Option<Severity>;

// Evaluated in order; each rule may only raise the severity.
const AGGREGATE_RULES: [SeverityRule; 2] = [any_cookie_has_issues, no_cookie_is_secure];

fn any_cookie_has_issues(tally: &CookieTally) -> Option<Severity> {
    (tally.with_issues > 0).then_some(Severity::Warning)
}

fn no_cookie_is_secure(tally: &CookieTally) -> Option<Severity> {
    (tally.total > 0 && tally.missing_secure == tally.total).then_some(Severity::Critical)
}

fn aggregate_severity(tally: &CookieTally) -> Severity {
    AGGREGATE_RULES
        .iter()
        .filter_map(|rule| rule(tally))
        .fold(Severity::Ok, |mut severity, raised| {
            severity.escalate(raised);
            severity
        })
}

fn status_for(severity: Severity) -> &'static str {
    match severity {
        Severity::Ok => "All Cookies Secure",
        Severity::Warning => "Security Issues Found",
        Severity::Critical | Severity::Error => "Critical Security Issues",
    }
}

fn preview(raw: &str) -> String {
    if raw.chars().count() > RAW_PREVIEW_CHARS {
        let head: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        raw.to_string()
    }
}

/// Audits the cookies in an already fetched response.
pub fn audit_cookies(domain: &str, headers: &ResponseHeaders) -> CheckResult<CookieReport> {
    let raw_cookies = collect_set_cookies(headers);
    debug!(count = raw_cookies.len(), "Collected Set-Cookie headers.");

    if raw_cookies.is_empty() {
        return CheckResult::success(
            domain,
            Severity::Ok,
            "No Cookies Set",
            "No cookies found on this domain",
            CookieReport::default(),
        );
    }

    let mut cookies = Vec::with_capacity(raw_cookies.len());
    let mut issues = Vec::new();
    for (index, raw) in raw_cookies.iter().enumerate() {
        let parsed = ParsedCookie::parse(raw, index + 1);
        let missing = parsed.missing_flags();
        if !missing.is_empty() {
            debug!(cookie = %parsed.name, ?missing, "Cookie is missing security attributes.");
            issues.push(CookieIssue {
                name: parsed.name.clone(),
                issues: missing,
                raw: preview(raw),
            });
        }
        cookies.push(CookieFlags {
            name: parsed.name,
            secure: parsed.secure,
            http_only: parsed.http_only,
            same_site: parsed.same_site,
        });
    }

    let tally = CookieTally {
        total: cookies.len(),
        with_issues: issues.len(),
        missing_secure: cookies.iter().filter(|c| !c.secure).count(),
    };
    let severity = aggregate_severity(&tally);

    let message = if issues.is_empty() {
        format!("All {} cookies are properly secured", tally.total)
    } else {
        format!(
            "Found {} cookie(s) with security issues out of {} total",
            tally.with_issues, tally.total
        )
    };

    let report = CookieReport {
        cookie_count: tally.total,
        issue_count: issues.len(),
        cookies,
        issues,
    };
    CheckResult::success(domain, severity, status_for(severity), message, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookies: &[&str]) -> ResponseHeaders {
        cookies.iter().map(|c| ("Set-Cookie", *c)).collect()
    }

    #[test]
    fn no_cookies_is_ok() {
        let mut plain = ResponseHeaders::new();
        plain.push("Content-Type", "text/html");
        let result = audit_cookies("example.com", &plain);

        assert_eq!(result.severity(), Severity::Ok);
        assert_eq!(result.status(), "No Cookies Set");
        assert_eq!(result.report().unwrap().cookie_count, 0);
    }

    #[test]
    fn missing_same_site_only() {
        let result = audit_cookies("example.com", &headers(&["id=1; Secure; HttpOnly"]));
        let report = result.report().unwrap();

        assert_eq!(report.issue_count, 1);
        assert_eq!(report.issues[0].name, "id");
        assert_eq!(report.issues[0].issues, vec!["Missing SameSite attribute"]);
        assert_eq!(result.severity(), Severity::Warning);
        assert_eq!(result.message(), "Found 1 cookie(s) with security issues out of 1 total");
    }

    #[test]
    fn every_cookie_missing_secure_is_critical() {
        let result = audit_cookies(
            "example.com",
            &headers(&["a=1; HttpOnly; SameSite=Lax", "b=2; HttpOnly; SameSite=Strict"]),
        );
        assert_eq!(result.severity(), Severity::Critical);
        assert_eq!(result.status(), "Critical Security Issues");
    }

    #[test]
    fn some_cookies_missing_secure_is_warning() {
        let result = audit_cookies(
            "example.com",
            &headers(&["a=1; Secure; HttpOnly; SameSite=Lax", "b=2; HttpOnly; SameSite=Lax"]),
        );
        assert_eq!(result.severity(), Severity::Warning);
        assert_eq!(result.status(), "Security Issues Found");
        assert_eq!(result.report().unwrap().issue_count, 1);
    }

    #[test]
    fn fully_flagged_cookies_are_ok() {
        let result = audit_cookies(
            "example.com",
            &headers(&["sid=abc; Path=/; secure; HTTPONLY; samesite=strict"]),
        );
        assert_eq!(result.severity(), Severity::Ok);
        assert_eq!(result.status(), "All Cookies Secure");
        assert_eq!(result.message(), "All 1 cookies are properly secured");
    }

    #[test]
    fn flag_matching_is_segment_exact() {
        // "Secure" inside a value must not count as the Secure flag.
        let cookie = ParsedCookie::parse("pref=Secure-mode; HttpOnlyish; SameSite=None", 1);
        assert!(!cookie.secure);
        assert!(!cookie.http_only);
        assert!(cookie.same_site);
    }

    #[test]
    fn duplicates_collapse_by_exact_text() {
        let h = headers(&["a=1; Secure", "a=1; Secure", "a=2; Secure"]);
        assert_eq!(collect_set_cookies(&h), vec!["a=1; Secure", "a=2; Secure"]);
    }

    #[test]
    fn set_cookie_lookup_ignores_header_case() {
        let h: ResponseHeaders = [("set-cookie", "a=1"), ("SET-COOKIE", "b=2")].into_iter().collect();
        let result = audit_cookies("example.com", &h);
        assert_eq!(result.report().unwrap().cookie_count, 2);
    }

    #[test]
    fn nameless_cookie_gets_positional_placeholder() {
        let result = audit_cookies("example.com", &headers(&["a=1; Secure; HttpOnly; SameSite=Lax", "=orphan"]));
        let report = result.report().unwrap();
        assert_eq!(report.cookies[1].name, "Cookie 2");
        assert_eq!(report.issues[0].name, "Cookie 2");
    }

    #[test]
    fn raw_preview_is_truncated() {
        let long = format!("token={}", "x".repeat(200));
        let result = audit_cookies("example.com", &headers(&[long.as_str()]));
        let raw = &result.report().unwrap().issues[0].raw;

        assert!(raw.ends_with("..."));
        assert_eq!(raw.chars().count(), RAW_PREVIEW_CHARS + 3);
        assert_eq!(preview("short=1"), "short=1");
    }
}
