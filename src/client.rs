//! The seam between the decorator and whatever transport actually sends
//! requests.

use async_trait::async_trait;
use axum::http;

use crate::prefix::{RequestMeta, ResponseMeta};

/// An outgoing call path. The transport owns connections, TLS and retries;
/// all the decorator needs is one request in and one result out.
#[async_trait]
pub trait Client<Req>: Send + Sync
where
    Req: Send + 'static,
{
    type Response: Send;
    type Error: Send;

    async fn execute(&self, req: Req) -> Result<Self::Response, Self::Error>;
}

/// Extract the metric-relevant parts of a request.
pub trait RequestMetadata {
    fn request_meta(&self) -> RequestMeta;
}

/// Extract the metric-relevant parts of a response.
pub trait ResponseMetadata {
    fn response_meta(&self) -> ResponseMeta;
}

impl RequestMetadata for RequestMeta {
    fn request_meta(&self) -> RequestMeta {
        self.clone()
    }
}

impl ResponseMetadata for ResponseMeta {
    fn response_meta(&self) -> ResponseMeta {
        self.clone()
    }
}

impl<B> RequestMetadata for http::Request<B> {
    fn request_meta(&self) -> RequestMeta {
        RequestMeta::http(self.method().as_str(), self.uri().path())
    }
}

impl<B> ResponseMetadata for http::Response<B> {
    fn response_meta(&self) -> ResponseMeta {
        ResponseMeta::with_status(self.status().as_u16())
    }
}
