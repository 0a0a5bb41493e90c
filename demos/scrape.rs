use std::time::Duration;

use async_trait::async_trait;
use reqmeter::{
    build_decorator, build_endpoint, config, Client, DefaultMeterIdPrefixFunction, RequestMeta,
    ResponseMeta,
};

const CONFIG: &str = r#"
registry: active
base_name: client
exposition_path: /internal/metrics
"#;

/// Stands in for a real transport.
struct FakeUpstream;

#[async_trait]
impl Client<RequestMeta> for FakeUpstream {
    type Response = ResponseMeta;
    type Error = std::io::Error;

    async fn execute(&self, req: RequestMeta) -> std::io::Result<ResponseMeta> {
        tokio::time::sleep(Duration::from_millis(25)).await;
        let status = if req.path.ends_with("/missing") { 404 } else { 200 };
        Ok(ResponseMeta::with_status(status))
    }
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let config = config::load_from_str(CONFIG)?;
    let registry = config.build_registry();

    let decorator = build_decorator(
        registry.clone(),
        DefaultMeterIdPrefixFunction::new(config.base_name.as_str()),
    );
    let client = decorator.decorate(FakeUpstream);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        loop {
            ticker.tick().await;
            let _ = client.execute(RequestMeta::http("GET", "/users")).await;
            let _ = client.execute(RequestMeta::http("GET", "/users/missing")).await;
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:9464").await?;
    reqmeter::serve(listener, build_endpoint(registry, &config.exposition_path)?).await?;
    Ok(())
}
