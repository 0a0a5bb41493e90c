mod common;

use axum::http::{header, StatusCode};

use common::{get_request, spawn_server, HttpClient};
use reqmeter::{
    build_decorator, endpoint::DEFAULT_PATH, exposition::TEXT_FORMAT, Client,
    DefaultMeterIdPrefixFunction, Exposition, RegistryKind,
};

#[tokio::test]
async fn active_registry_exposes_client_metrics() {
    let registry = RegistryKind::Active.build();
    let addr = spawn_server(registry.clone()).await;
    let decorator = build_decorator(registry.clone(), DefaultMeterIdPrefixFunction::new("client"));
    let client = decorator.decorate(HttpClient::new(addr));

    let response = client.execute(get_request("/customizer")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Scraping through the decorated client records the scrape itself, which
    // is still in flight while the body is rendered.
    let report = client.execute(get_request(DEFAULT_PATH)).await.unwrap();
    assert_eq!(report.status(), StatusCode::OK);
    assert_eq!(
        report.headers().get(header::CONTENT_TYPE).unwrap(),
        TEXT_FORMAT
    );
    let body = report.body();
    assert!(body.contains("# TYPE client_active_requests gauge\n"));
    assert!(body.contains(r#"client_active_requests{method="GET",path="/customizer"} 0"#));
    assert!(body.contains(r#"client_active_requests{method="GET",path="/internal/metrics"} 1"#));
    assert!(body.contains("# TYPE client_requests_total counter\n"));
    assert!(body.contains(
        r#"client_requests_total{http_status="200",method="GET",path="/customizer",result="success"} 1"#
    ));
    assert!(body.contains(
        r#"client_request_duration_seconds_count{http_status="200",method="GET",path="/customizer",result="success"} 1"#
    ));
    assert!(!body.contains(r#"result="failure""#));
    assert!(!body.contains(r#"result="cancelled""#));
}

#[tokio::test]
async fn noop_registry_exposes_nothing() {
    let registry = RegistryKind::Noop.build();
    let addr = spawn_server(registry.clone()).await;
    let decorator = build_decorator(registry.clone(), DefaultMeterIdPrefixFunction::new("client"));
    let client = decorator.decorate(HttpClient::new(addr));

    let response = client.execute(get_request("/customizer")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = client.execute(get_request(DEFAULT_PATH)).await.unwrap();
    assert_eq!(report.status(), StatusCode::OK);
    assert!(!report.body().contains("client_active_requests"));
    assert_eq!(report.body(), "");
    assert!(registry.is_empty());
}

#[tokio::test]
async fn scrapes_are_stable_without_traffic() {
    let registry = RegistryKind::Active.build();
    let addr = spawn_server(registry.clone()).await;
    let decorator = build_decorator(registry.clone(), DefaultMeterIdPrefixFunction::new("client"));
    decorator
        .decorate(HttpClient::new(addr))
        .execute(get_request("/customizer"))
        .await
        .unwrap();

    // An undecorated scraper does not touch the registry.
    let scraper = HttpClient::new(addr);
    let first = scraper.execute(get_request(DEFAULT_PATH)).await.unwrap();
    let second = scraper.execute(get_request(DEFAULT_PATH)).await.unwrap();
    assert!(!first.body().is_empty());
    assert_eq!(first.body(), second.body());
}

#[tokio::test]
async fn unknown_routes_are_failures() {
    let registry = RegistryKind::Active.build();
    let addr = spawn_server(registry.clone()).await;
    let decorator = build_decorator(registry.clone(), DefaultMeterIdPrefixFunction::new("client"));
    let client = decorator.decorate(HttpClient::new(addr));

    let response = client.execute(get_request("/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = HttpClient::new(addr)
        .execute(get_request(DEFAULT_PATH))
        .await
        .unwrap()
        .into_body();
    assert!(body.contains(
        r#"client_requests_total{http_status="404",method="GET",path="/missing",result="failure"} 1"#
    ));
}

#[tokio::test]
async fn transport_errors_are_failures_without_status() {
    let registry = RegistryKind::Active.build();
    // Bind then drop to get a port nothing listens on.
    let addr = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let decorator = build_decorator(registry.clone(), DefaultMeterIdPrefixFunction::new("client"));
    let client = decorator.decorate(HttpClient::new(addr));

    assert!(client.execute(get_request("/refused")).await.is_err());

    let body = Exposition::new(registry).render().unwrap();
    assert!(body.contains(r#"client_requests_total{method="GET",path="/refused",result="failure"} 1"#));
    assert!(body.contains(r#"client_active_requests{method="GET",path="/refused"} 0"#));
}
