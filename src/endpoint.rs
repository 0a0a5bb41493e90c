//! The scrape endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;

use crate::{
    error::{Error, Result},
    exposition::{Exposition, TEXT_FORMAT},
    registry::MeterRegistry,
};

pub const DEFAULT_PATH: &str = "/internal/metrics";

/// A router answering `GET {path}` with the rendered registry. `path` must
/// be absolute.
pub fn build_endpoint(registry: Arc<dyn MeterRegistry>, path: &str) -> Result<Router> {
    if !path.starts_with('/') {
        return Err(Error::InvalidPath(path.to_string()));
    }
    Ok(Router::new()
        .route(path, get(scrape))
        .with_state(Arc::new(Exposition::new(registry))))
}

async fn scrape(State(exposition): State<Arc<Exposition>>) -> Response {
    match exposition.render() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(error) => {
            tracing::error!(message = "failed to render metrics", error = %error);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render metrics").into_response()
        }
    }
}

/// Serve `router` until the listener fails.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(message = "serving metrics", addr = %addr);
    }
    axum::serve(listener, router).await
}
