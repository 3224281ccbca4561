//! Shared parameter store abstraction.
//!
//! Independently deployed resource graphs hand identifiers to each other
//! through a key-value namespace owned by the deployment engine. This crate
//! models that namespace as an injected trait so deploy-order dependencies
//! are explicit and testable against an in-memory store.

use std::{borrow::Borrow, collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use miette::Diagnostic;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid store path `{0}`: must start with `/`")]
    #[diagnostic(code(store::path_not_absolute))]
    PathNotAbsolute(String),

    #[error("invalid store path `{0}`: empty segment")]
    #[diagnostic(code(store::empty_path_segment))]
    EmptyPathSegment(String),
}

/// A slash-separated path into the shared parameter namespace,
/// e.g. `/trimana/dashboard/api/id`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay)]
#[non_exhaustive]
pub struct StorePath(Arc<str>);

impl StorePath {
    pub fn new(path: &str) -> Result<Self, Error> {
        let Some(rest) = path.strip_prefix('/') else {
            return Err(Error::PathNotAbsolute(path.to_string()));
        };
        if rest.is_empty() || rest.split('/').any(str::is_empty) {
            return Err(Error::EmptyPathSegment(path.to_string()));
        }
        Ok(Self(Arc::from(path)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StorePath {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::new(input)
    }
}

impl TryFrom<&str> for StorePath {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for StorePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StorePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Key-value store the deployment engine resolves `{{resolve:ssm:...}}`
/// tokens against. Builders publish through this trait; consumers are
/// late-bound, so `get` only matters for plan validation and tests.
pub trait ParameterStore {
    fn get(&self, path: &StorePath) -> Option<String>;

    /// Returns the value this publication replaced, if any. Paths are
    /// expected to be written once per deployment; callers that care should
    /// treat a replaced value as a duplicate publication.
    fn put(&mut self, path: StorePath, value: String) -> Option<String>;
}

/// In-memory store used by plan validation and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<StorePath, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &StorePath> {
        self.values.keys()
    }
}

impl ParameterStore for MemoryStore {
    fn get(&self, path: &StorePath) -> Option<String> {
        self.values.get(path).cloned()
    }

    fn put(&mut self, path: StorePath, value: String) -> Option<String> {
        self.values.insert(path, value)
    }
}
