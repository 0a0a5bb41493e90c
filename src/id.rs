use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use smallvec::SmallVec;
use twox_hash::XxHash64;

use crate::error::{Error, Result};

const MID_SEED: u64 = 0xdeadbeef;

pub type Tags = SmallVec<[(String, String); 6]>;

/// The identity of one series: a name plus a set of tags. Tags are kept sorted
/// by key so two ids built from the same tags in a different order compare,
/// hash and render identically.
#[derive(Clone)]
pub struct MeterId {
    name: String,
    tags: Tags,
    mid: u64,
}

impl MeterId {
    pub fn new<N, I, K, V>(name: N, tags: I) -> Result<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        let tags = normalize(&name, tags.into_iter().map(|(k, v)| (k.into(), v.into())))?;
        let mid = mid(&name, &tags);
        Ok(Self { name, tags, mid })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| self.tags[idx].1.as_str())
    }

    /// The precomputed 64-bit id used as the registry key hash.
    pub fn mid(&self) -> u64 {
        self.mid
    }
}

/// Sort tags by key and reject duplicate keys.
fn normalize(name: &str, tags: impl Iterator<Item = (String, String)>) -> Result<Tags> {
    let mut tags: Tags = tags.collect();
    tags.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    if let Some(pair) = tags.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(Error::DuplicateTag {
            name: name.to_string(),
            key: pair[0].0.clone(),
        });
    }
    Ok(tags)
}

/// NOTE: tags **must** be sorted to get a stable mid.
fn mid(name: &str, tags: &[(String, String)]) -> u64 {
    let mut hasher = XxHash64::with_seed(MID_SEED);
    name.hash(&mut hasher);
    tags.hash(&mut hasher);
    hasher.finish()
}

impl PartialEq for MeterId {
    fn eq(&self, other: &Self) -> bool {
        self.mid == other.mid && self.name == other.name && self.tags == other.tags
    }
}

impl Eq for MeterId {}

impl Hash for MeterId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.mid);
    }
}

impl Ord for MeterId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.tags.cmp(&other.tags))
    }
}

impl PartialOrd for MeterId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.name, self.tags.as_slice())
    }
}

/// A name prefix and a base tag set, produced per request by a
/// [`crate::MeterIdPrefixFunction`]. The decorator turns it into concrete
/// [`MeterId`]s by appending a meter-specific suffix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeterIdPrefix {
    name: String,
    tags: Tags,
}

impl MeterIdPrefix {
    pub fn new<N, I, K, V>(name: N, tags: I) -> Result<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        let tags = normalize(&name, tags.into_iter().map(|(k, v)| (k.into(), v.into())))?;
        Ok(Self { name, tags })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    /// Returns a new prefix carrying the extra tags as well.
    pub fn with_tags<I, K, V>(&self, extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let merged = self
            .tags
            .iter()
            .cloned()
            .chain(extra.into_iter().map(|(k, v)| (k.into(), v.into())));
        let tags = normalize(&self.name, merged)?;
        Ok(Self {
            name: self.name.clone(),
            tags,
        })
    }

    /// Build the id of `"{prefix}.{suffix}"` with this prefix's tags.
    pub fn meter_id(&self, suffix: &str) -> MeterId {
        let name = if suffix.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, suffix)
        };
        let mid = mid(&name, &self.tags);
        MeterId {
            name,
            tags: self.tags.clone(),
            mid,
        }
    }
}
