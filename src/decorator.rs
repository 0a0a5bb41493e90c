//! Client-side request instrumentation.
//!
//! Every request moves `STARTED -> SUCCEEDED | FAILED | CANCELLED` exactly
//! once. The transition is tied to ownership of an [`InFlightRequest`]: the
//! terminal methods consume it, and dropping it unfinished (an aborted task, a
//! timed-out future) counts as a cancellation. This is what keeps the active
//! requests gauge balanced under any interleaving.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;

use crate::{
    client::{Client, RequestMetadata, ResponseMetadata},
    error::Result,
    prefix::{Completion, MeterIdPrefixFunction, RequestMeta, ResponseMeta},
    registry::MeterRegistry,
};

pub(crate) mod meters {
    use crate::{Counter, Gauge, MeterDef, Timer};

    pub const ACTIVE_REQUESTS: MeterDef<Gauge> = MeterDef::new("active.requests");
    pub const REQUESTS: MeterDef<Counter> = MeterDef::new("requests");
    pub const REQUEST_DURATION: MeterDef<Timer> = MeterDef::new("request.duration");
}

/// Build a decorator that records into `registry`, naming meters with
/// `prefix_fn`.
pub fn build_decorator<F>(
    registry: Arc<dyn MeterRegistry>,
    prefix_fn: F,
) -> MetricCollectingDecorator
where
    F: MeterIdPrefixFunction + 'static,
{
    MetricCollectingDecorator::new(registry, Arc::new(prefix_fn))
}

#[derive(Clone)]
pub struct MetricCollectingDecorator {
    registry: Arc<dyn MeterRegistry>,
    prefix_fn: Arc<dyn MeterIdPrefixFunction>,
}

impl MetricCollectingDecorator {
    pub fn new(
        registry: Arc<dyn MeterRegistry>,
        prefix_fn: Arc<dyn MeterIdPrefixFunction>,
    ) -> Self {
        Self {
            registry,
            prefix_fn,
        }
    }

    pub fn registry(&self) -> &Arc<dyn MeterRegistry> {
        &self.registry
    }

    /// Wrap `inner` so every call through it is recorded.
    pub fn decorate<C>(&self, inner: C) -> MetricCollectingClient<C> {
        MetricCollectingClient {
            inner,
            decorator: self.clone(),
        }
    }

    /// Mark a request as dispatched. The caller reports how it ended through
    /// the returned handle; for transports that are not a [`Client`] this is
    /// the whole API.
    pub fn start(&self, request: RequestMeta) -> InFlightRequest {
        let active = match self.active_gauge(&request) {
            Ok(gauge) => {
                gauge.incr();
                Some(gauge)
            }
            Err(error) => {
                tracing::warn!(
                    message = "failed to resolve active requests gauge",
                    path = %request.path,
                    error = %error,
                );
                None
            }
        };
        InFlightRequest {
            decorator: self.clone(),
            request,
            active,
            started: Instant::now(),
            finished: false,
        }
    }

    fn active_gauge(&self, request: &RequestMeta) -> Result<crate::Gauge> {
        let prefix = self.prefix_fn.apply(request, None)?;
        meters::ACTIVE_REQUESTS.resolve(&*self.registry, &prefix)
    }
}

/// One request between dispatch and completion.
#[must_use = "dropping an InFlightRequest records it as cancelled"]
pub struct InFlightRequest {
    decorator: MetricCollectingDecorator,
    request: RequestMeta,
    /// The gauge resolved at dispatch. Completion decrements this exact
    /// handle, whatever prefix the outcome maps to.
    active: Option<crate::Gauge>,
    started: Instant,
    finished: bool,
}

impl InFlightRequest {
    pub fn succeed(mut self, response: &ResponseMeta) {
        self.finish(Completion::Response(response));
    }

    pub fn fail(mut self) {
        self.finish(Completion::Failed);
    }

    pub fn cancel(mut self) {
        self.finish(Completion::Cancelled);
    }

    pub fn request(&self) -> &RequestMeta {
        &self.request
    }

    fn finish(&mut self, completion: Completion<'_>) {
        if self.finished {
            return;
        }
        self.finished = true;
        let elapsed = self.started.elapsed();
        if let Some(active) = self.active.take() {
            active.decr();
        }
        if let Err(error) = self.record(&completion, elapsed) {
            tracing::warn!(
                message = "failed to record request metrics",
                path = %self.request.path,
                outcome = completion.outcome().as_str(),
                error = %error,
            );
        }
    }

    fn record(&self, completion: &Completion<'_>, elapsed: Duration) -> Result<()> {
        let prefix = self.decorator.prefix_fn.apply(&self.request, Some(completion))?;
        let registry = &*self.decorator.registry;
        meters::REQUESTS.resolve(registry, &prefix)?.incr();
        meters::REQUEST_DURATION
            .resolve(registry, &prefix)?
            .record(elapsed);
        Ok(())
    }
}

impl Drop for InFlightRequest {
    fn drop(&mut self) {
        self.finish(Completion::Cancelled);
    }
}

/// A [`Client`] that records every call it forwards. Requests and results
/// pass through untouched.
#[derive(Clone)]
pub struct MetricCollectingClient<C> {
    inner: C,
    decorator: MetricCollectingDecorator,
}

impl<C> MetricCollectingClient<C> {
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C, Req> Client<Req> for MetricCollectingClient<C>
where
    C: Client<Req>,
    C::Response: ResponseMetadata,
    Req: RequestMetadata + Send + 'static,
{
    type Response = C::Response;
    type Error = C::Error;

    async fn execute(&self, req: Req) -> std::result::Result<Self::Response, Self::Error> {
        let in_flight = self.decorator.start(req.request_meta());
        // If this future is dropped while awaiting, `in_flight` drops with it
        // and records a cancellation.
        let result = self.inner.execute(req).await;
        match &result {
            Ok(response) => in_flight.succeed(&response.response_meta()),
            Err(_) => in_flight.fail(),
        }
        result
    }
}
