use std::{
    any::Any,
    sync::{atomic, Arc},
};

use super::{MeterKind, MetricValue};
use crate::{error::Result, id::MeterId, registry::MeterRegistry};

/// A monotonic counter. The value is cumulative for the life of the registry,
/// so repeated scrapes observe the same number until the next increment.
#[derive(Clone, Debug)]
pub struct Counter {
    inner: Option<Arc<atomic::AtomicU64>>,
}

impl Counter {
    pub fn incr_by(&self, count: u64) {
        if let Some(inner) = &self.inner {
            inner.fetch_add(count, atomic::Ordering::Relaxed);
        }
    }

    pub fn incr(&self) {
        self.incr_by(1);
    }

    pub fn get(&self) -> u64 {
        self.inner
            .as_ref()
            .map_or(0, |inner| inner.load(atomic::Ordering::Relaxed))
    }

    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }
}

impl super::Metric for Counter {
    const KIND: MeterKind = MeterKind::Counter;

    fn create() -> Self {
        Self {
            inner: Some(Default::default()),
        }
    }

    fn noop() -> Self {
        Self { inner: None }
    }

    fn resolve(registry: &dyn MeterRegistry, id: &MeterId) -> Result<Self> {
        registry.counter(id)
    }
}

impl super::Recordable for Counter {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn value(&self) -> MetricValue {
        MetricValue::Counter(self.get())
    }
}
