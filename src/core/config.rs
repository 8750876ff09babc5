// src/core/config.rs

use crate::logging::PROJECT_NAME;
use lazy_static::lazy_static;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-check network timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
pub const DEFAULT_MAX_CONCURRENT_DOMAINS: usize = 4;
pub const DEFAULT_TLS_PORT: u16 = 443;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

lazy_static! {
    pub static ref TIMEOUT_ENV: String = format!("{}_TIMEOUT_SECS", PROJECT_NAME.clone());
    pub static ref MAX_REDIRECTS_ENV: String = format!("{}_MAX_REDIRECTS", PROJECT_NAME.clone());
    pub static ref CONCURRENCY_ENV: String = format!("{}_CONCURRENCY", PROJECT_NAME.clone());
}

/// Tunables shared by every checker in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Applied independently to each check (HTTP request or TLS handshake).
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Upper bound on domains checked at the same time within a batch.
    pub max_concurrent_domains: usize,
    pub tls_port: u16,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_concurrent_domains: DEFAULT_MAX_CONCURRENT_DOMAINS,
            tls_port: DEFAULT_TLS_PORT,
        }
    }
}

impl ScanConfig {
    /// Defaults overridden by `DOMAIN_POSTURE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ScanConfig::from_env`] but reads variables through `lookup`.
    /// Values that fail to parse are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64, _>(&lookup, &TIMEOUT_ENV) {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(max) = parse_var::<usize, _>(&lookup, &MAX_REDIRECTS_ENV) {
            config.max_redirects = max;
        }
        if let Some(limit) = parse_var::<usize, _>(&lookup, &CONCURRENCY_ENV) {
            config.max_concurrent_domains = limit;
        }

        config.max_concurrent_domains = config.max_concurrent_domains.max(1);
        debug!(?config, "Scan configuration resolved.");
        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent_domains(mut self, limit: usize) -> Self {
        self.max_concurrent_domains = limit.max(1);
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable configuration value.");
            None
        }
    }
}
