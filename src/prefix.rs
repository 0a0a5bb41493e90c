//! Derives the [`MeterIdPrefix`] a request is recorded under.
//!
//! A prefix function is asked twice per request. At dispatch it only sees the
//! request, and the prefix it returns names the active-requests gauge for the
//! whole call. At completion it also sees how the call ended and returns the
//! prefix for the outcome counter and timer.

use crate::{
    error::Result,
    id::{MeterIdPrefix, Tags},
};

pub const TAG_METHOD: &str = "method";
pub const TAG_PATH: &str = "path";
pub const TAG_SERVICE: &str = "service";
pub const TAG_RESULT: &str = "result";
pub const TAG_HTTP_STATUS: &str = "http_status";

/// What the decorator knows about an outgoing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestMeta {
    pub method: String,
    pub path: String,
    /// Set for RPC calls; replaces `path` in the default tag set.
    pub service: Option<String>,
}

impl RequestMeta {
    pub fn http(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            service: None,
        }
    }

    pub fn rpc(service: impl Into<String>, method: impl Into<String>) -> Self {
        let service = service.into();
        let method = method.into();
        Self {
            path: format!("/{service}/{method}"),
            method,
            service: Some(service),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: Option<u16>,
}

impl ResponseMeta {
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
        }
    }

    /// 4xx and 5xx count as failures, everything else (including responses
    /// with no status, such as most RPC replies) as success.
    pub fn is_success(&self) -> bool {
        self.status.map_or(true, |status| status < 400)
    }
}

/// How a request ended.
#[derive(Clone, Copy, Debug)]
pub enum Completion<'a> {
    /// The transport produced a response.
    Response(&'a ResponseMeta),
    /// The transport failed without producing a response.
    Failed,
    /// The caller gave up on the request before it finished.
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Cancelled,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Cancelled => "cancelled",
        }
    }
}

impl Completion<'_> {
    pub fn outcome(&self) -> Outcome {
        match self {
            Completion::Response(resp) if resp.is_success() => Outcome::Success,
            Completion::Response(_) | Completion::Failed => Outcome::Failure,
            Completion::Cancelled => Outcome::Cancelled,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Completion::Response(resp) => resp.status,
            _ => None,
        }
    }
}

/// Computes the meter prefix for a request. Implementations must be pure:
/// equal inputs give equal prefixes.
pub trait MeterIdPrefixFunction: Send + Sync {
    /// `completion` is `None` at dispatch time.
    fn apply(&self, req: &RequestMeta, completion: Option<&Completion<'_>>)
        -> Result<MeterIdPrefix>;
}

impl<F> MeterIdPrefixFunction for F
where
    F: Fn(&RequestMeta, Option<&Completion<'_>>) -> Result<MeterIdPrefix> + Send + Sync,
{
    fn apply(
        &self,
        req: &RequestMeta,
        completion: Option<&Completion<'_>>,
    ) -> Result<MeterIdPrefix> {
        self(req, completion)
    }
}

/// The stock prefix function.
///
/// | when       | tags                                                   |
/// |------------|--------------------------------------------------------|
/// | dispatch   | `method`, `path` (HTTP) or `service` (RPC)             |
/// | completion | the above, `result`, and `http_status` if one was seen |
///
/// `result` is one of `success`, `failure` or `cancelled`. A transport error
/// is a `failure` with no `http_status` tag.
#[derive(Clone, Debug)]
pub struct DefaultMeterIdPrefixFunction {
    base_name: String,
    extra_tags: Tags,
}

impl DefaultMeterIdPrefixFunction {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            extra_tags: Tags::new(),
        }
    }

    /// Constant tags added to every prefix, e.g. the name of the upstream.
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.extra_tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }
}

impl MeterIdPrefixFunction for DefaultMeterIdPrefixFunction {
    fn apply(
        &self,
        req: &RequestMeta,
        completion: Option<&Completion<'_>>,
    ) -> Result<MeterIdPrefix> {
        let mut tags = self.extra_tags.clone();
        tags.push((TAG_METHOD.to_string(), req.method.clone()));
        match &req.service {
            Some(service) => tags.push((TAG_SERVICE.to_string(), service.clone())),
            None => tags.push((TAG_PATH.to_string(), req.path.clone())),
        }
        if let Some(completion) = completion {
            tags.push((
                TAG_RESULT.to_string(),
                completion.outcome().as_str().to_string(),
            ));
            if let Some(status) = completion.status() {
                tags.push((TAG_HTTP_STATUS.to_string(), status.to_string()));
            }
        }
        MeterIdPrefix::new(self.base_name.as_str(), tags)
    }
}
