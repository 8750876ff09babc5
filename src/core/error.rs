// src/core/error.rs

use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Failure inside a single checker.
///
/// Never escapes the checker that produced it: every variant is folded into
/// an error-severity `CheckResult` at the checker boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("{0}")]
    Network(String),

    #[error("timeout of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    #[error("{0}")]
    Redirect(String),

    #[error("server did not present a certificate")]
    NoCertificate,

    #[error("could not decode certificate: {0}")]
    Certificate(String),

    #[error("could not build HTTP client: {0}")]
    Client(String),

    #[error("check task failed: {0}")]
    Task(String),
}

/// Batch input rejected before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Please provide an array of domains")]
    EmptyBatch,

    #[error("domain #{} ({raw:?}) is empty after normalization", index + 1)]
    EmptyDomain { index: usize, raw: String },
}

/// Renders an error followed by each distinct cause in its source chain.
///
/// `reqwest` keeps the useful part (DNS failure, connection refused, TLS alert)
/// in its sources, so the top-level message alone is not enough for a report.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
