//! Client-side request metrics.
//!
//! A [`MetricCollectingDecorator`] wraps an outgoing call path and records,
//! per request, an active-requests gauge, an outcome counter and a duration
//! timer into a [`MeterRegistry`]. The same registry backs a scrape endpoint
//! that renders it in the Prometheus text format.
//!
//! ```ignore
//! let config = reqmeter::config::load_from_str(yaml)?;
//! let registry = config.build_registry();
//! let decorator = reqmeter::build_decorator(
//!     registry.clone(),
//!     reqmeter::DefaultMeterIdPrefixFunction::new(config.base_name.as_str()),
//! );
//! let client = decorator.decorate(transport);
//! let metrics = reqmeter::build_endpoint(registry, &config.exposition_path)?;
//! ```
//!
//! Choosing [`NoopRegistry`] keeps every call path intact while recording and
//! exposing nothing.

pub mod client;
pub mod config;
pub mod decorator;
pub mod endpoint;
pub mod error;
pub mod exposition;
pub mod id;
pub mod metrics;
pub mod prefix;
pub mod registry;
mod utils;

pub use client::{Client, RequestMetadata, ResponseMetadata};
pub use config::{MetricsConfig, RegistryKind};
pub use decorator::{
    build_decorator, InFlightRequest, MetricCollectingClient, MetricCollectingDecorator,
};
pub use endpoint::{build_endpoint, serve};
pub use error::{Error, Result};
pub use exposition::Exposition;
pub use id::{MeterId, MeterIdPrefix};
pub use metrics::{
    counter::Counter, gauge::Gauge, timer::Timer, MeterDef, MeterKind, Metric, MetricValue,
};
pub use prefix::{
    Completion, DefaultMeterIdPrefixFunction, MeterIdPrefixFunction, Outcome, RequestMeta,
    ResponseMeta,
};
pub use registry::{MeterRegistry, NoopRegistry, Registry};
