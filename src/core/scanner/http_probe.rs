// src/core/scanner/http_probe.rs

use crate::core::config::ScanConfig;
use crate::core::error::{error_chain, CheckError};
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Response headers as an ordered raw list plus a case-folded index over it.
///
/// Unlike a plain map, a name that occurs several times (notably `Set-Cookie`)
/// keeps every occurrence, in arrival order. Names keep the case they were
/// inserted with; lookups ignore ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Vec<(String, String)>,
    index: HashMap<String, Vec<usize>>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.index
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(self.entries.len());
        self.entries.push((name, value.into()));
    }

    /// Every value stored under `name`, in arrival order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|positions| positions.iter().map(|&i| self.entries[i].1.as_str()).collect())
            .unwrap_or_default()
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(&name.to_ascii_lowercase())
            .and_then(|positions| positions.first())
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = ResponseHeaders::new();
        for (name, value) in iter {
            headers.push(name, value);
        }
        headers
    }
}

impl From<&HeaderMap> for ResponseHeaders {
    // `HeaderMap::iter` yields one item per value, so repeated names survive.
    fn from(map: &HeaderMap) -> Self {
        map.iter()
            .map(|(name, value)| {
                let value = match value.to_str() {
                    Ok(s) => s.to_string(),
                    Err(_) => {
                        warn!(header_name = %name, "Header contained non UTF-8 bytes, decoding lossily.");
                        String::from_utf8_lossy(value.as_bytes()).into_owned()
                    }
                };
                (name.as_str().to_string(), value)
            })
            .collect()
    }
}

/// What the cookie and HSTS auditors get to look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status_code: u16,
    /// URL after redirects were followed.
    pub final_url: String,
    pub headers: ResponseHeaders,
}

/// Single GET against a domain's HTTPS front page.
///
/// Any status code is a successful probe; only transport failures are errors.
/// No retries.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    timeout: Duration,
    max_redirects: usize,
    user_agent: String,
}

impl HttpProbe {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            timeout: config.timeout,
            max_redirects: config.max_redirects,
            user_agent: config.user_agent.clone(),
        }
    }

    /// Probes `https://{hostname}`. The scheme is always https.
    pub async fn probe(&self, hostname: &str) -> Result<ProbeResponse, CheckError> {
        let url = Url::parse(&format!("https://{hostname}"))
            .map_err(|e| CheckError::Network(format!("Invalid URL for '{hostname}': {e}")))?;
        self.fetch(url.as_str()).await
    }

    /// Same request as [`HttpProbe::probe`] against an explicit URL.
    pub async fn fetch(&self, url: &str) -> Result<ProbeResponse, CheckError> {
        // Each probe owns its client, and with it its connections.
        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .redirect(Policy::limited(self.max_redirects))
            .build()
            .map_err(|e| CheckError::Client(error_chain(&e)))?;

        debug!(url, "Sending probe request.");
        let response = client.get(url).send().await.map_err(|e| {
            let err = classify_request_error(&e, self.timeout);
            warn!(url, error = %err, "Probe request failed.");
            err
        })?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = ResponseHeaders::from(response.headers());
        if headers.is_empty() {
            warn!(url, status = status_code, "Response carried no headers.");
        }
        info!(url, status = status_code, final_url = %final_url, headers = headers.len(), "Probe response received.");

        Ok(ProbeResponse { status_code, final_url, headers })
    }
}

fn classify_request_error(err: &reqwest::Error, timeout: Duration) -> CheckError {
    let detail = error_chain(err);
    if err.is_timeout() {
        CheckError::Timeout(timeout)
    } else if err.is_redirect() {
        CheckError::Redirect(detail)
    } else if looks_like_tls_failure(&detail) {
        CheckError::TlsHandshake(detail)
    } else {
        CheckError::Network(detail)
    }
}

fn looks_like_tls_failure(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    ["certificate", "handshake", "tls", "ssl"].iter().any(|marker| lower.contains(marker))
}
