use std::sync::Arc;

use serde::Deserialize;

use crate::{
    endpoint::DEFAULT_PATH,
    error::{Error, Result},
    registry::{MeterRegistry, NoopRegistry, Registry},
};

/// Which registry backend the process records into. Resolved once at
/// startup; nothing on the request path looks it up again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    #[default]
    Active,
    Noop,
}

impl RegistryKind {
    pub fn build(self) -> Arc<dyn MeterRegistry> {
        match self {
            RegistryKind::Active => Arc::new(Registry::new()),
            RegistryKind::Noop => Arc::new(NoopRegistry),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default)]
    pub registry: RegistryKind,

    /// Prefix of every client meter name.
    #[serde(default = "default_base_name")]
    pub base_name: String,

    #[serde(default = "default_exposition_path")]
    pub exposition_path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            registry: RegistryKind::default(),
            base_name: default_base_name(),
            exposition_path: default_exposition_path(),
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_name.is_empty() {
            return Err(Error::Config("base_name must not be empty".into()));
        }
        if !self.exposition_path.starts_with('/') {
            return Err(Error::Config(
                "exposition_path must start with '/'".into(),
            ));
        }
        Ok(())
    }

    /// Create the process-wide registry this config selects.
    pub fn build_registry(&self) -> Arc<dyn MeterRegistry> {
        tracing::info!(message = "building meter registry", kind = ?self.registry);
        self.registry.build()
    }
}

/// Parse and validate a YAML config.
pub fn load_from_str(yaml: &str) -> Result<MetricsConfig> {
    let config: MetricsConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

fn default_base_name() -> String {
    "client".into()
}

fn default_exposition_path() -> String {
    DEFAULT_PATH.into()
}
