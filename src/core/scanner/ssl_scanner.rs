// src/core/scanner/ssl_scanner.rs

use tracing::{debug, error, info, warn};

use crate::core::config::ScanConfig;
use crate::core::error::CheckError;
use crate::core::models::{CertificateReport, CheckResult, Severity};
use crate::core::target::normalize_domain;
use chrono::{DateTime, Utc};
use native_tls::{HandshakeError, TlsConnector, TlsStream};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tokio::task::spawn_blocking;
use x509_parser::prelude::*;

const SECONDS_PER_DAY: i64 = 86_400;
const CRITICAL_WINDOW_DAYS: i64 = 7;
const WARNING_WINDOW_DAYS: i64 = 30;

/// Validity window and issuer of the leaf certificate a server presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCertificate {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub issuer: String,
    /// Whether the chain and hostname passed a verifying handshake.
    pub trusted: bool,
}

/// Opens a TLS connection to `target` and grades its leaf certificate's expiry.
pub async fn run_ssl_scan(config: &ScanConfig, target: &str) -> CheckResult<CertificateReport> {
    let domain = normalize_domain(target);
    info!(target = %domain, "Starting SSL/TLS scan.");

    let host = domain.clone();
    let port = config.tls_port;
    let timeout = config.timeout;

    // native-tls is blocking; the outer timeout also bounds DNS resolution.
    debug!("Spawning blocking task for TLS connection.");
    let task = spawn_blocking(move || fetch_leaf_certificate(&host, port, timeout));
    let outcome = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(panic = %e, "Blocking SSL scan task panicked!");
            Err(CheckError::Task(e.to_string()))
        }
        Err(_) => Err(CheckError::Timeout(timeout)),
    };

    match outcome {
        Ok(leaf) => {
            let result = assess_certificate(&domain, &leaf, Utc::now());
            info!(target = %domain, severity = %result.severity(), status = result.status(), "SSL/TLS scan finished.");
            result
        }
        Err(e) => {
            warn!(target = %domain, error = %e, "SSL/TLS scan failed.");
            CheckResult::failure(domain, e)
        }
    }
}

/// Reads the leaf certificate and whether a verifying client would accept it.
///
/// A verified handshake is tried first. When the server's chain or hostname is
/// rejected, the connection is redone without verification so that expired or
/// self-signed leaves can still be graded.
fn fetch_leaf_certificate(host: &str, port: u16, timeout: Duration) -> Result<LeafCertificate, CheckError> {
    match tls_handshake(host, port, timeout, true) {
        Ok(stream) => read_leaf(&stream, true),
        Err(CheckError::TlsHandshake(reason)) => {
            debug!(target = host, reason = %reason, "Verified handshake rejected, retrying without verification.");
            let stream = tls_handshake(host, port, timeout, false).inspect_err(|e| {
                error!(error = %e, "TLS handshake failed");
            })?;
            read_leaf(&stream, false)
        }
        Err(e) => Err(e),
    }
}

fn tls_handshake(host: &str, port: u16, timeout: Duration, verify: bool) -> Result<TlsStream<TcpStream>, CheckError> {
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(!verify)
        .build()
        .map_err(|e| {
            error!(error = %e, "Failed to create TlsConnector");
            CheckError::TlsHandshake(format!("TlsConnector Error: {e}"))
        })?;

    let stream = connect_tcp(host, port, timeout)?;
    stream
        .set_read_timeout(Some(timeout))
        .and_then(|_| stream.set_write_timeout(Some(timeout)))
        .map_err(|e| CheckError::Network(format!("Could not configure socket: {e}")))?;

    debug!(target = host, verify, "Performing TLS handshake.");
    connector.connect(host, stream).map_err(|e| match e {
        HandshakeError::Failure(e) => CheckError::TlsHandshake(e.to_string()),
        // A read timeout surfaces as a handshake that would block.
        HandshakeError::WouldBlock(_) => CheckError::Timeout(timeout),
    })
}

fn read_leaf(stream: &TlsStream<TcpStream>, trusted: bool) -> Result<LeafCertificate, CheckError> {
    let cert = match stream.peer_certificate() {
        Ok(Some(c)) => c,
        Ok(None) => {
            debug!("TLS connection successful, but no peer certificate provided.");
            return Err(CheckError::NoCertificate);
        }
        Err(e) => {
            error!(error = %e, "Failed to retrieve peer certificate from stream");
            return Err(CheckError::Certificate(e.to_string()));
        }
    };

    let cert_der = cert.to_der().map_err(|e| {
        error!(error = %e, "Failed to convert certificate to DER format");
        CheckError::Certificate(e.to_string())
    })?;

    let (_, x509) = parse_x509_certificate(&cert_der).map_err(|e| {
        error!(error = %e, "Failed to parse X.509 certificate");
        CheckError::Certificate(e.to_string())
    })?;

    info!(subject = %x509.subject(), issuer = %x509.issuer(), trusted, "Successfully parsed certificate.");

    let validity = x509.validity();
    Ok(LeafCertificate {
        not_before: asn1_time_to_chrono_utc(&validity.not_before),
        not_after: asn1_time_to_chrono_utc(&validity.not_after),
        issuer: issuer_label(&x509),
        trusted,
    })
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, CheckError> {
    debug!(target = host, port, "Connecting TCP stream.");
    let addrs = (host, port).to_socket_addrs().map_err(|e| {
        error!(error = %e, "DNS resolution failed");
        CheckError::Network(format!("getaddrinfo failed for {host}: {e}"))
    })?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "TCP connect attempt failed.");
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) if e.kind() == std::io::ErrorKind::TimedOut => CheckError::Timeout(timeout),
        Some(e) => CheckError::Network(format!("connect {host}:{port}: {e}")),
        None => CheckError::Network(format!("no addresses found for {host}")),
    })
}

/// Organization of the issuer, falling back to its common name, then the full DN.
fn issuer_label(x509: &X509Certificate<'_>) -> String {
    let issuer = x509.issuer();
    issuer
        .iter_organization()
        .chain(issuer.iter_common_name())
        .find_map(|attr| attr.as_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| issuer.to_string())
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

/// Whole days until `not_after`, rounded toward negative infinity.
pub fn days_remaining(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (not_after - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Expiry policy; the first matching window wins.
pub fn classify_expiry(days_remaining: i64) -> (Severity, &'static str) {
    if days_remaining < 0 {
        (Severity::Critical, "Expired")
    } else if days_remaining <= CRITICAL_WINDOW_DAYS {
        (Severity::Critical, "Expires Soon (Critical)")
    } else if days_remaining <= WARNING_WINDOW_DAYS {
        (Severity::Warning, "Expires Soon (Warning)")
    } else {
        (Severity::Ok, "Valid")
    }
}

/// Grades a leaf certificate as of `now`.
pub fn assess_certificate(domain: &str, leaf: &LeafCertificate, now: DateTime<Utc>) -> CheckResult<CertificateReport> {
    let days = days_remaining(leaf.not_after, now);
    let (severity, status) = classify_expiry(days);
    debug!(days, %severity, status, "Certificate expiry classified.");

    let report = CertificateReport {
        valid: leaf.trusted && leaf.not_before <= now && now < leaf.not_after,
        days_remaining: days,
        valid_from: leaf.not_before,
        valid_to: leaf.not_after,
        issuer: leaf.issuer.clone(),
    };
    let message = format!("SSL certificate {} ({} days remaining)", status.to_lowercase(), days);

    CheckResult::success(domain, severity, status, message, report)
}
