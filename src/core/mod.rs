// src/core/mod.rs

// Root of the check engine. Everything the presentation layer needs is
// reachable from here; nothing in `core` renders or persists anything.

/// Tunables shared by all checkers (timeouts, redirects, batch concurrency).
pub mod config;

/// Failure taxonomy for checkers and batch input.
pub mod error;

/// Data structures handed to callers: `CheckResult`, the per-checker reports,
/// `DomainRecord` and `BatchReport`.
pub mod models;

/// The certificate, cookie and HSTS checkers and the batch orchestration.
pub mod scanner;

/// Turns raw domain entries into bare hostnames.
pub mod target;
