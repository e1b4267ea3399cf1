use std::sync::Arc;
use std::time::Duration;
use vanguard_recon::app::App;
use vanguard_recon::config::{QuotaLimits, ReconConfig};
use vanguard_recon::core::checks::CheckRunner;
use vanguard_recon::core::checks::headers::default_header_checks;
use vanguard_recon::core::errors::ReconError;
use vanguard_recon::core::models::ScanRequest;
use vanguard_recon::core::quota::InMemoryQuota;
use vanguard_recon::core::recon::SubdomainRecon;
use vanguard_recon::core::recon::dns_gate::HickoryResolver;
use vanguard_recon::core::recon::prober::HttpProber;
use vanguard_recon::core::scanner::build_client;
use vanguard_recon::core::scanner::crawler::Crawler;
use vanguard_recon::core::scanner::link_discoverer::LinkDiscoverer;
use vanguard_recon::core::scanner::page_scanner::PageScanner;
use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

fn app(max_requests: u32) -> App {
    let config = ReconConfig {
        quota: QuotaLimits {
            max_requests,
            window_secs: 3600,
        },
        ..ReconConfig::default()
    };
    let client = build_client(&config.user_agent, 5).unwrap();
    let runner = || {
        default_header_checks()
            .into_iter()
            .fold(CheckRunner::new(500_000, Duration::from_secs(2)), |r, c| r.with_predicate(c))
    };
    let scanner = Arc::new(PageScanner::new(client.clone(), runner(), Duration::from_secs(5), 1024 * 1024));
    let crawler = Crawler::new(
        LinkDiscoverer::new(client.clone(), 15, Duration::from_secs(5), 1024 * 1024),
        Arc::new(PageScanner::new(client.clone(), runner(), Duration::from_secs(5), 1024 * 1024)),
    );
    let recon = SubdomainRecon::new(
        Vec::new(),
        Arc::new(HickoryResolver::new()),
        Arc::new(HttpProber::new(client, Duration::from_secs(1), Duration::from_secs(1))),
        config.subdomains.clone(),
    );
    App::new(config, Arc::new(InMemoryQuota::new()), scanner, crawler, recon)
}

fn request(url: String) -> ScanRequest {
    ScanRequest { url }
}

#[tokio::test]
async fn test_exhausted_quota_aborts_before_any_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = app(0);
    let outcome = app.crawl("alice", request(mock_server.uri())).await;
    match outcome {
        Err(ReconError::QuotaExceeded { limit, .. }) => assert_eq!(limit, 0),
        other => panic!("expected quota error, got {other:?}"),
    }
    assert!(matches!(
        app.scan_page("alice", request(mock_server.uri())).await,
        Err(ReconError::QuotaExceeded { .. })
    ));
    assert!(matches!(
        app.discover_subdomains("alice", request(mock_server.uri())).await,
        Err(ReconError::QuotaExceeded { .. })
    ));
    // `expect(0)` is verified when the server drops.
}

#[tokio::test]
async fn test_scan_page_charges_quota_per_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = app(1);
    let response = app.scan_page("bob", request(mock_server.uri())).await.unwrap();
    assert_eq!(response.summary.total, response.findings.len());

    assert!(matches!(
        app.scan_page("bob", request(mock_server.uri())).await,
        Err(ReconError::QuotaExceeded { .. })
    ));
}

#[tokio::test]
async fn test_invalid_target_does_not_charge_quota() {
    let app = app(1);
    assert!(matches!(
        app.scan_page("carol", request("ftp://example.com".into())).await,
        Err(ReconError::InvalidTarget(_))
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);
    assert!(matches!(
        app.scan_page("carol", request(dead)).await,
        Err(ReconError::TargetUnreachable { .. })
    ));
}

#[tokio::test]
async fn test_crawl_of_unreachable_site_degrades() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let response = app(5).crawl("dave", request(dead.clone())).await.unwrap();
    assert_eq!(response.crawl.pages_discovered, 1);
    assert_eq!(response.crawl.pages_scanned, 1);
    assert_eq!(response.crawl.pages[0].url, dead);
    assert!(response.findings.is_empty());
}
