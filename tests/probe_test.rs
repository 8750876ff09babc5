//! Integration tests for the HTTP probe and the header-based auditors

use domain_posture::core::config::{ScanConfig, DEFAULT_USER_AGENT};
use domain_posture::core::error::CheckError;
use domain_posture::core::models::Severity;
use domain_posture::core::scanner::cookie_scanner::audit_cookies;
use domain_posture::core::scanner::hsts_scanner::audit_hsts;
use domain_posture::core::scanner::http_probe::HttpProbe;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> ScanConfig {
    ScanConfig::default().with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_every_set_cookie_header_is_kept() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", "session=abc; Secure; HttpOnly; SameSite=Lax")
                .append_header("Set-Cookie", "tracking=xyz; Path=/")
                .append_header("Set-Cookie", "tracking=xyz; Path=/"),
        )
        .mount(&mock_server)
        .await;

    let probe = HttpProbe::new(&test_config());
    let response = probe.fetch(&mock_server.uri()).await.expect("Probe failed");

    assert_eq!(response.headers.get_all("SET-COOKIE").len(), 3);

    let result = audit_cookies("localhost", &response.headers);
    let report = result.report().expect("Expected a cookie report");
    assert_eq!(report.cookie_count, 2, "Identical headers collapse into one");
    assert_eq!(report.issue_count, 1);
    assert_eq!(report.issues[0].name, "tracking");
    assert_eq!(result.severity(), Severity::Warning);
}

#[tokio::test]
async fn test_any_status_code_is_a_successful_probe() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("Strict-Transport-Security", "max-age=63072000; includeSubDomains; preload"),
        )
        .mount(&mock_server)
        .await;

    let probe = HttpProbe::new(&test_config());
    let response = probe.fetch(&mock_server.uri()).await.expect("Probe failed");
    assert_eq!(response.status_code, 503);

    let result = audit_hsts("localhost", &response.headers);
    assert_eq!(result.severity(), Severity::Ok);
    assert_eq!(result.report().unwrap().details.max_age_days, Some(730));
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", format!("{}/home", mock_server.uri())))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(ResponseTemplate::new(200).insert_header("Strict-Transport-Security", "max-age=0"))
        .mount(&mock_server)
        .await;

    let probe = HttpProbe::new(&test_config());
    let response = probe.fetch(&mock_server.uri()).await.expect("Probe failed");

    assert!(response.final_url.ends_with("/home"));
    let result = audit_hsts("localhost", &response.headers);
    assert_eq!(result.severity(), Severity::Critical);
    assert_eq!(result.status(), "HSTS Misconfigured");
}

#[tokio::test]
async fn test_redirect_limit_is_enforced() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", format!("{}/again", mock_server.uri())))
        .mount(&mock_server)
        .await;

    let probe = HttpProbe::new(&test_config());
    let err = probe.fetch(&mock_server.uri()).await.unwrap_err();
    assert!(matches!(err, CheckError::Redirect(_)), "Expected redirect error, got {err:?}");
}

#[tokio::test]
async fn test_browser_user_agent_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let probe = HttpProbe::new(&test_config());
    let response = probe.fetch(&mock_server.uri()).await.expect("Probe failed");
    assert_eq!(response.status_code, 204);

    let requests = mock_server.received_requests().await.expect("Request recording disabled");
    let user_agent = requests[0]
        .headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok());
    assert_eq!(user_agent, Some(DEFAULT_USER_AGENT));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let probe = HttpProbe::new(&ScanConfig::default().with_timeout(Duration::from_millis(200)));
    let err = probe.fetch(&mock_server.uri()).await.unwrap_err();
    assert_eq!(err, CheckError::Timeout(Duration::from_millis(200)));
}
