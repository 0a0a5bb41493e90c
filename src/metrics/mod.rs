use std::{any::Any, fmt, marker::PhantomData};

use crate::{
    error::Result,
    id::{MeterId, MeterIdPrefix},
    registry::MeterRegistry,
};

pub(crate) mod counter;
pub(crate) mod gauge;
pub(crate) mod timer;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MeterKind {
    Counter,
    Gauge,
    Timer,
}

impl fmt::Display for MeterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MeterKind::Counter => "counter",
            MeterKind::Gauge => "gauge",
            MeterKind::Timer => "timer",
        })
    }
}

/// A trait representing the public meter handle interface. This is common
/// across all meter kinds, and slots into [`MeterDef`] to provide the typed
/// lookup against a registry.
pub trait Metric: Sized + Clone {
    const KIND: MeterKind;

    /// A fresh live meter, called by the registry on first registration.
    fn create() -> Self;

    /// A stateless handle that discards every write. Never allocates.
    fn noop() -> Self;

    /// Dispatch to the matching `get-or-create` call on the registry.
    fn resolve(registry: &dyn MeterRegistry, id: &MeterId) -> Result<Self>;
}

/// A point-in-time reading of a single meter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MetricValue {
    Counter(u64),
    Gauge(i64),
    Timer {
        count: u64,
        total_nanos: u64,
        max_nanos: u64,
    },
}

impl MetricValue {
    pub fn kind(&self) -> MeterKind {
        match self {
            MetricValue::Counter(_) => MeterKind::Counter,
            MetricValue::Gauge(_) => MeterKind::Gauge,
            MetricValue::Timer { .. } => MeterKind::Timer,
        }
    }
}

/// A trait representing the internal chunk of the meter interface. We use this
/// to collect observations of the underlying meter value, as well as store
/// references to the meter in the registry.
pub trait Recordable: Send + Sync + 'static {
    /// Lets the registry turn a stored `dyn Recordable` back into the concrete
    /// [`Metric`] handle the caller asked for.
    fn as_any(&self) -> &dyn Any;

    fn value(&self) -> MetricValue;
}

/// A constant definition of a meter relative to a [`MeterIdPrefix`]. The
/// decorator keeps one per meter it records into and resolves it against
/// whatever registry it was built with.
pub struct MeterDef<M> {
    suffix: &'static str,
    _kind: PhantomData<M>,
}

impl<M: Metric> MeterDef<M> {
    pub const fn new(suffix: &'static str) -> Self {
        Self {
            suffix,
            _kind: PhantomData,
        }
    }

    pub fn id(&self, prefix: &MeterIdPrefix) -> MeterId {
        prefix.meter_id(self.suffix)
    }

    pub fn resolve(&self, registry: &dyn MeterRegistry, prefix: &MeterIdPrefix) -> Result<M> {
        M::resolve(registry, &self.id(prefix))
    }
}
