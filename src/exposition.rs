//! Renders a registry snapshot in the Prometheus text exposition format.
//!
//! Meter names use dots (`client.active.requests`) and are mapped to
//! exposition families like so:
//!
//! | meter   | family                                  | type    |
//! |---------|-----------------------------------------|---------|
//! | counter | `<name>_total`                          | counter |
//! | gauge   | `<name>`                                | gauge   |
//! | timer   | `<name>_seconds` (`_count`, `_sum`)     | summary |
//! | timer   | `<name>_seconds_max`                    | gauge   |
//!
//! Families are emitted sorted by name, each behind a single `# TYPE` line,
//! so a fixed registry state always renders to the same bytes.

use std::{
    collections::{BTreeMap, HashSet},
    fmt::Write,
    sync::Arc,
    time::Instant,
};

use smallvec::SmallVec;

use crate::{
    error::{Error, Result},
    id::MeterId,
    metrics::MetricValue,
    registry::MeterRegistry,
};

pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FamilyType {
    Counter,
    Gauge,
    Summary,
}

impl FamilyType {
    fn as_str(self) -> &'static str {
        match self {
            FamilyType::Counter => "counter",
            FamilyType::Gauge => "gauge",
            FamilyType::Summary => "summary",
        }
    }
}

struct Family {
    kind: FamilyType,
    samples: Vec<String>,
    /// Rendered label blocks already present, one per series.
    labels: HashSet<String>,
}

/// One series' contribution: the family it belongs to and its sample lines.
type SeriesLines = SmallVec<[(String, FamilyType, String); 2]>;

/// Renders the current state of a registry on demand.
pub struct Exposition {
    registry: Arc<dyn MeterRegistry>,
}

impl Exposition {
    pub fn new(registry: Arc<dyn MeterRegistry>) -> Self {
        Self { registry }
    }

    /// Render every registered meter. A series that cannot be rendered is
    /// left out and logged; only a formatting failure fails the whole render.
    pub fn render(&self) -> Result<String> {
        let start = Instant::now();
        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            return Ok(String::new());
        }

        let mut families: BTreeMap<String, Family> = BTreeMap::new();
        let mut omitted = 0usize;
        for (id, value) in &snapshot {
            if let Err(error) = add_series(&mut families, id, value) {
                omitted += 1;
                tracing::warn!(
                    message = "omitting series from exposition",
                    id = ?id,
                    error = %error
                );
            }
        }

        let mut out = String::with_capacity(snapshot.len() * 96);
        for (name, family) in &families {
            writeln!(out, "# TYPE {} {}", name, family.kind.as_str())?;
            for sample in &family.samples {
                out.push_str(sample);
            }
        }
        tracing::debug!(
            message = "rendered exposition",
            meters = snapshot.len(),
            families = families.len(),
            omitted = omitted,
            duration = ?start.elapsed()
        );
        Ok(out)
    }
}

fn add_series(
    families: &mut BTreeMap<String, Family>,
    id: &MeterId,
    value: &MetricValue,
) -> Result<()> {
    let base = sanitize_name(id.name());
    let labels = render_labels(id.tags())?;
    let mut series = SeriesLines::new();
    match *value {
        MetricValue::Counter(v) => {
            let family = if base.ends_with("_total") {
                base
            } else {
                format!("{base}_total")
            };
            let line = sample(&family, &labels, v)?;
            series.push((family, FamilyType::Counter, line));
        }
        MetricValue::Gauge(v) => {
            let line = sample(&base, &labels, v)?;
            series.push((base, FamilyType::Gauge, line));
        }
        MetricValue::Timer {
            count,
            total_nanos,
            max_nanos,
        } => {
            let family = format!("{base}_seconds");
            let mut lines = sample(&format!("{family}_count"), &labels, count)?;
            lines.push_str(&sample(
                &format!("{family}_sum"),
                &labels,
                total_nanos as f64 / NANOS_PER_SEC,
            )?);
            let max_family = format!("{family}_max");
            let max_line = sample(&max_family, &labels, max_nanos as f64 / NANOS_PER_SEC)?;
            series.push((family, FamilyType::Summary, lines));
            series.push((max_family, FamilyType::Gauge, max_line));
        }
    }

    // Check every family first so a rejected series leaves nothing behind.
    for (name, kind, _) in &series {
        let Some(existing) = families.get(name) else {
            continue;
        };
        if existing.kind != *kind {
            return Err(Error::FamilyConflict {
                family: name.clone(),
                existing: existing.kind.as_str(),
                found: kind.as_str(),
            });
        }
        if existing.labels.contains(&labels) {
            return Err(Error::DuplicateSeries(format!("{name}{labels}")));
        }
    }
    for (name, kind, line) in series {
        let family = families.entry(name).or_insert_with(|| Family {
            kind,
            samples: Vec::new(),
            labels: HashSet::new(),
        });
        family.labels.insert(labels.clone());
        family.samples.push(line);
    }
    Ok(())
}

fn sample(name: &str, labels: &str, value: impl std::fmt::Display) -> Result<String> {
    let mut line = String::with_capacity(name.len() + labels.len() + 24);
    writeln!(line, "{name}{labels} {value}")?;
    Ok(line)
}

/// `{k1="v1",k2="v2"}`, or nothing at all for an untagged meter.
fn render_labels(tags: &[(String, String)]) -> Result<String> {
    if tags.is_empty() {
        return Ok(String::new());
    }
    let mut out = String::from("{");
    let mut keys = SmallVec::<[String; 6]>::new();
    for (idx, (key, value)) in tags.iter().enumerate() {
        let sanitized = sanitize_label(key)?;
        // `http.status` and `http_status` would both become `http_status`.
        if keys.contains(&sanitized) {
            return Err(Error::InvalidLabel(key.clone()));
        }
        if idx > 0 {
            out.push(',');
        }
        write!(out, "{}=\"{}\"", sanitized, escape_label(value))?;
        keys.push(sanitized);
    }
    out.push('}');
    Ok(out)
}

/// Metric names may contain `[a-zA-Z0-9_:]` and must not start with a digit.
fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        out.push('_');
    }
    out.extend(name.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
            c
        } else {
            '_'
        }
    }));
    out
}

/// Label names may contain `[a-zA-Z0-9_]`; a leading `__` is reserved.
fn sanitize_label(key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(Error::InvalidLabel(key.to_string()));
    }
    let mut out = String::with_capacity(key.len() + 1);
    if key.starts_with(|c: char| c.is_ascii_digit()) {
        out.push('_');
    }
    out.extend(key.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' {
            c
        } else {
            '_'
        }
    }));
    if out.starts_with("__") {
        return Err(Error::InvalidLabel(key.to_string()));
    }
    Ok(out)
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
