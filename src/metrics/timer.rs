use std::{
    any::Any,
    hint,
    sync::{
        atomic::{fence, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use super::{MeterKind, MetricValue};
use crate::{error::Result, id::MeterId, registry::MeterRegistry};

/// Reads retry this many times while writers are active before settling for
/// a best-effort view.
const READ_ATTEMPTS: usize = 64;

/// Writers bump `started` before touching the fields and `finished` after,
/// so a reader that sees both equal and unchanged across its loads has a
/// consistent view. Writers never wait on readers or on each other.
#[derive(Default, Debug)]
struct TimerInner {
    started: AtomicU64,
    finished: AtomicU64,
    count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct TimerReading {
    count: u64,
    total_nanos: u64,
    max_nanos: u64,
}

impl TimerInner {
    fn record(&self, nanos: u64) {
        self.started.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
        self.finished.fetch_add(1, Ordering::Release);
    }

    fn load(&self) -> TimerReading {
        let fields = || TimerReading {
            count: self.count.load(Ordering::Relaxed),
            total_nanos: self.total_nanos.load(Ordering::Relaxed),
            max_nanos: self.max_nanos.load(Ordering::Relaxed),
        };
        for _ in 0..READ_ATTEMPTS {
            let finished = self.finished.load(Ordering::Acquire);
            let started = self.started.load(Ordering::Relaxed);
            if started == finished {
                let reading = fields();
                fence(Ordering::Acquire);
                if self.started.load(Ordering::Relaxed) == started {
                    return reading;
                }
            }
            hint::spin_loop();
        }
        fields()
    }
}

/// Tracks how many events happened, how long they took in total and the
/// longest one. Recording is a handful of atomic operations; a read never
/// sees a count without its matching total unless writers keep it busy for
/// every retry.
#[derive(Clone, Debug)]
pub struct Timer {
    inner: Option<Arc<TimerInner>>,
}

impl Timer {
    pub fn record(&self, value: Duration) {
        if let Some(inner) = &self.inner {
            // Durations past ~584 years saturate
            let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
            inner.record(nanos);
        }
    }

    pub fn count(&self) -> u64 {
        self.inner.as_ref().map_or(0, |inner| inner.load().count)
    }

    pub fn total(&self) -> Duration {
        self.inner.as_ref().map_or(Duration::ZERO, |inner| {
            Duration::from_nanos(inner.load().total_nanos)
        })
    }
}

impl super::Metric for Timer {
    const KIND: MeterKind = MeterKind::Timer;

    fn create() -> Self {
        Self {
            inner: Some(Default::default()),
        }
    }

    fn noop() -> Self {
        Self { inner: None }
    }

    fn resolve(registry: &dyn MeterRegistry, id: &MeterId) -> Result<Self> {
        registry.timer(id)
    }
}

impl super::Recordable for Timer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn value(&self) -> MetricValue {
        let Some(inner) = &self.inner else {
            return MetricValue::Timer {
                count: 0,
                total_nanos: 0,
                max_nanos: 0,
            };
        };
        let reading = inner.load();
        MetricValue::Timer {
            count: reading.count,
            total_nanos: reading.total_nanos,
            max_nanos: reading.max_nanos,
        }
    }
}
