use std::{
    any::Any,
    sync::{atomic, Arc},
};

use super::{MeterKind, MetricValue};
use crate::{error::Result, id::MeterId, registry::MeterRegistry};

#[derive(Clone, Debug)]
pub struct Gauge {
    inner: Option<Arc<atomic::AtomicI64>>,
}

impl Gauge {
    pub fn incr_by(&self, count: i64) {
        if let Some(inner) = &self.inner {
            inner.fetch_add(count, atomic::Ordering::AcqRel);
        }
    }

    pub fn incr(&self) {
        self.incr_by(1);
    }

    pub fn set(&self, val: i64) {
        if let Some(inner) = &self.inner {
            inner.store(val, atomic::Ordering::Release)
        }
    }

    pub fn decr(&self) {
        self.incr_by(-1)
    }

    pub fn get(&self) -> i64 {
        self.inner
            .as_ref()
            .map_or(0, |inner| inner.load(atomic::Ordering::Acquire))
    }
}

impl super::Metric for Gauge {
    const KIND: MeterKind = MeterKind::Gauge;

    fn create() -> Self {
        Self {
            inner: Some(Default::default()),
        }
    }

    fn noop() -> Self {
        Self { inner: None }
    }

    fn resolve(registry: &dyn MeterRegistry, id: &MeterId) -> Result<Self> {
        registry.gauge(id)
    }
}

impl super::Recordable for Gauge {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn value(&self) -> MetricValue {
        MetricValue::Gauge(self.get())
    }
}
