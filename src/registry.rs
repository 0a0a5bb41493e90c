use dashmap::DashMap;

use crate::{
    error::{Error, Result},
    id::MeterId,
    metrics::{
        counter::Counter, gauge::Gauge, timer::Timer, MeterKind, Metric, MetricValue, Recordable,
    },
    utils::BuildMidHasher,
};

/// The capability set every registry backend provides. Hosts pick a backend
/// once at startup and hand the same `Arc<dyn MeterRegistry>` to the
/// decorator and the exposition endpoint.
pub trait MeterRegistry: Send + Sync {
    /// Get or create the counter for `id`. Equal ids always resolve to the
    /// same underlying meter.
    fn counter(&self, id: &MeterId) -> Result<Counter>;

    fn gauge(&self, id: &MeterId) -> Result<Gauge>;

    fn timer(&self, id: &MeterId) -> Result<Timer>;

    /// Read every registered meter, sorted by id. Each value is read
    /// atomically; values of different meters may be from slightly different
    /// instants.
    fn snapshot(&self) -> Vec<(MeterId, MetricValue)>;

    /// Number of registered meters.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct MeterEntry {
    kind: MeterKind,
    metric: Box<dyn Recordable>,
}

impl MeterEntry {
    fn new<R: Recordable + Metric>(metric: R) -> Self {
        Self {
            kind: R::KIND,
            metric: Box::new(metric),
        }
    }

    fn handle<R: Recordable + Metric>(&self, id: &MeterId) -> Result<R> {
        self.metric
            .as_any()
            .downcast_ref::<R>()
            .cloned()
            .ok_or_else(|| Error::TypeMismatch {
                name: id.name().to_string(),
                existing: self.kind,
                requested: R::KIND,
            })
    }
}

/// The in-memory registry. Meters live for as long as the registry does.
#[derive(Default)]
pub struct Registry {
    meters: DashMap<MeterId, MeterEntry, BuildMidHasher>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            meters: DashMap::with_hasher(BuildMidHasher),
        }
    }

    /// Registration is the slow path: a shard write lock and an allocation
    /// the first time an id is seen. Afterwards a lookup is a shard read lock
    /// plus an `Arc` clone, and every write through the returned handle is a
    /// plain atomic.
    fn register<R: Recordable + Metric>(&self, id: &MeterId) -> Result<R> {
        if let Some(entry) = self.meters.get(id) {
            return entry.handle(id);
        }
        // Racing creators serialize on the shard lock; whoever gets there
        // first inserts, everyone else observes their meter.
        let entry = self.meters.entry(id.clone()).or_insert_with(|| {
            tracing::debug!(message = "registered meter", id = ?id, kind = %R::KIND);
            MeterEntry::new(R::create())
        });
        entry.handle(id)
    }
}

impl MeterRegistry for Registry {
    fn counter(&self, id: &MeterId) -> Result<Counter> {
        self.register(id)
    }

    fn gauge(&self, id: &MeterId) -> Result<Gauge> {
        self.register(id)
    }

    fn timer(&self, id: &MeterId) -> Result<Timer> {
        self.register(id)
    }

    fn snapshot(&self) -> Vec<(MeterId, MetricValue)> {
        let mut samples: Vec<(MeterId, MetricValue)> = self
            .meters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().metric.value()))
            .collect();
        samples.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        samples
    }

    fn len(&self) -> usize {
        self.meters.len()
    }
}

/// A registry that keeps nothing. Handles it returns are stateless and drop
/// every write, and its snapshot is always empty. None of its methods touch
/// the heap, no matter how much traffic flows through it.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoopRegistry;

impl MeterRegistry for NoopRegistry {
    fn counter(&self, _id: &MeterId) -> Result<Counter> {
        Ok(Counter::noop())
    }

    fn gauge(&self, _id: &MeterId) -> Result<Gauge> {
        Ok(Gauge::noop())
    }

    fn timer(&self, _id: &MeterId) -> Result<Timer> {
        Ok(Timer::noop())
    }

    fn snapshot(&self) -> Vec<(MeterId, MetricValue)> {
        Vec::new()
    }

    fn len(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;

    const TAGS: [(&str, &str); 3] = [
        ("service", "reqmeter.Exposition"),
        ("method", "Scrape"),
        ("result", "success"),
    ];

    #[test]
    fn creation_is_idempotent() {
        let registry = Registry::new();
        let id = MeterId::new("client.requests", TAGS).unwrap();
        let reordered = MeterId::new(
            "client.requests",
            [
                ("result", "success"),
                ("service", "reqmeter.Exposition"),
                ("method", "Scrape"),
            ],
        )
        .unwrap();

        let counter = registry.counter(&id).unwrap();
        let counter2 = registry.counter(&reordered).unwrap();
        let counter3 = counter2.clone();
        counter.incr();
        counter2.incr();
        counter3.incr();
        assert_eq!(registry.len(), 1);
        assert_eq!(counter.get(), 3);

        let gauge = registry.gauge(&MeterId::new("client.active.requests", TAGS).unwrap());
        let timer = registry.timer(&MeterId::new("client.request.duration", TAGS).unwrap());
        gauge.unwrap().incr();
        timer.unwrap().record(Duration::from_millis(1));
        assert_eq!(
            registry
                .gauge(&MeterId::new("client.active.requests", TAGS).unwrap())
                .unwrap()
                .get(),
            1
        );
        assert_eq!(
            registry
                .timer(&MeterId::new("client.request.duration", TAGS).unwrap())
                .unwrap()
                .count(),
            1
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn kind_mismatch_is_an_error() {
        let registry = Registry::new();
        let id = MeterId::new("client.requests", TAGS).unwrap();
        registry.counter(&id).unwrap();
        let err = registry.gauge(&id).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                existing: MeterKind::Counter,
                requested: MeterKind::Gauge,
                ..
            }
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn snapshot_is_sorted_and_stable() {
        let registry = Registry::new();
        let tags: [(&str, &str); 0] = [];
        registry
            .gauge(&MeterId::new("b.gauge", tags).unwrap())
            .unwrap()
            .set(-2);
        registry
            .counter(&MeterId::new("a.counter", [("x", "2")]).unwrap())
            .unwrap()
            .incr();
        registry
            .counter(&MeterId::new("a.counter", [("x", "1")]).unwrap())
            .unwrap()
            .incr_by(5);

        let snapshot = registry.snapshot();
        let summary: Vec<(String, MetricValue)> = snapshot
            .iter()
            .map(|(id, value)| (format!("{id:?}"), *value))
            .collect();
        assert_eq!(
            summary,
            vec![
                (
                    r#"a.counter[("x", "1")]"#.to_string(),
                    MetricValue::Counter(5)
                ),
                (
                    r#"a.counter[("x", "2")]"#.to_string(),
                    MetricValue::Counter(1)
                ),
                ("b.gauge[]".to_string(), MetricValue::Gauge(-2)),
            ]
        );
        assert_eq!(registry.snapshot(), snapshot);
    }

    #[test]
    fn racing_creators_share_one_meter() {
        let registry = Arc::new(Registry::new());
        let id = MeterId::new("client.requests", TAGS).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let id = id.clone();
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        registry.counter(&id).unwrap().incr();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.counter(&id).unwrap().get(), 8_000);
    }

    #[test]
    fn noop_registry_stays_empty() {
        let registry = NoopRegistry;
        let id = MeterId::new("client.requests", TAGS).unwrap();
        for _ in 0..100 {
            registry.counter(&id).unwrap().incr();
            registry.gauge(&id).unwrap().incr();
            registry.timer(&id).unwrap().record(Duration::from_millis(1));
        }
        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
        assert_eq!(registry.counter(&id).unwrap().get(), 0);
    }
}
