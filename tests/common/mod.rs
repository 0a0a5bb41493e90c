#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
    http::{Request, Response, StatusCode},
    routing, Router,
};
use tokio::net::TcpListener;

use reqmeter::{build_endpoint, endpoint::DEFAULT_PATH, Client, MeterRegistry};

/// Sends `http::Request`s to one local server through a pooled
/// `reqwest::Client` and buffers the whole response body.
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
        }
    }
}

pub fn get_request(path: &str) -> Request<()> {
    Request::get(path).body(()).unwrap()
}

#[async_trait]
impl Client<Request<()>> for HttpClient {
    type Response = Response<String>;
    type Error = reqwest::Error;

    async fn execute(&self, req: Request<()>) -> Result<Response<String>, reqwest::Error> {
        let target = req.uri().path_and_query().map_or("/", |p| p.as_str());
        let upstream = self
            .client
            .request(req.method().clone(), format!("{}{}", self.base_url, target))
            .send()
            .await?;
        let status = upstream.status();
        let headers = upstream.headers().clone();
        let mut response = Response::new(upstream.text().await?);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Serve `/customizer` (always 200) and the scrape endpoint on an ephemeral
/// port.
pub async fn spawn_server(registry: Arc<dyn MeterRegistry>) -> SocketAddr {
    let app = Router::new()
        .route("/customizer", routing::get(|| async { StatusCode::OK }))
        .merge(build_endpoint(registry, DEFAULT_PATH).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(reqmeter::serve(listener, app));
    addr
}
