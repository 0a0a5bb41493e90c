//! Error type shared by the registry, decorator and exposition layers.

use thiserror::Error;

use crate::metrics::MeterKind;

/// Shared result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("meter name must not be empty")]
    EmptyName,
    #[error("duplicate tag key `{key}` on meter `{name}`")]
    DuplicateTag { name: String, key: String },
    #[error("meter `{name}` is already registered as a {existing}, not a {requested}")]
    TypeMismatch {
        name: String,
        existing: MeterKind,
        requested: MeterKind,
    },
    #[error("family `{family}` is already exposed as a {existing}, cannot add a {found}")]
    FamilyConflict {
        family: String,
        existing: &'static str,
        found: &'static str,
    },
    #[error("tag key `{0}` is not a valid label name")]
    InvalidLabel(String),
    #[error("series `{0}` is already exposed")]
    DuplicateSeries(String),
    #[error("endpoint path `{0}` must start with '/'")]
    InvalidPath(String),
    #[error("meter id derivation failed: {0}")]
    Derivation(String),
    #[error("failed to render exposition text")]
    Render(#[from] std::fmt::Error),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("failed to parse config")]
    ConfigParse(#[from] serde_yaml::Error),
}

