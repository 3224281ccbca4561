//! Resource-graph core: logical ids, reference expressions, templates and
//! their canonical engine documents.
//!
//! A [`Template`] is an ordered collection of resource descriptors linked by
//! typed references. Construction order is dependency order: a descriptor may
//! only reference descriptors (or template parameters) added before it, so
//! dangling and forward references are build-time errors here rather than
//! deploy-time failures in the engine.

mod digest;
mod expr;
mod template;
mod topo;
mod value;

use std::{borrow::Borrow, fmt, str::FromStr, sync::Arc};

pub use digest::TemplateDigest;
pub use expr::{Expr, PseudoParam, Sub};
use miette::Diagnostic;
pub use template::{Output, Resource, Template, TemplateParameter};
use thiserror::Error;
pub use value::{Props, Value};

#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid logical id `{0}`: must be non-empty and alphanumeric")]
    #[diagnostic(code(graph::invalid_logical_id))]
    InvalidLogicalId(String),

    #[error("duplicate logical id `{0}`")]
    #[diagnostic(code(graph::duplicate_logical_id))]
    DuplicateLogicalId(String),

    #[error("duplicate output `{0}`")]
    #[diagnostic(code(graph::duplicate_output))]
    DuplicateOutput(String),

    #[error("`{resource}` references `{target}`, which is not in the template yet")]
    #[diagnostic(
        code(graph::unknown_reference),
        help("descriptors must be added before anything that references them")
    )]
    UnknownReference { resource: String, target: String },

    #[error("sub template `{template}` has an unterminated `${{` placeholder")]
    #[diagnostic(code(graph::unterminated_placeholder))]
    UnterminatedPlaceholder { template: String },

    #[error("sub template `{template}` references unbound variable `{name}`")]
    #[diagnostic(code(graph::unbound_sub_variable))]
    UnboundSubVariable { template: String, name: String },

    #[error("sub template `{template}` does not use variable `{name}`")]
    #[diagnostic(code(graph::unused_sub_variable))]
    UnusedSubVariable { template: String, name: String },

    #[error("template contains a dependency cycle: {cycle:?}")]
    #[diagnostic(code(graph::dependency_cycle))]
    DependencyCycle { cycle: Vec<LogicalId> },

    #[error("invalid template digest `{0}`")]
    #[diagnostic(code(graph::invalid_digest))]
    InvalidDigest(String),
}

/// Name of one descriptor within a template, unique per graph.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalId(Arc<str>);

impl LogicalId {
    pub fn new(id: &str) -> Result<Self, Error> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidLogicalId(id.to_string()));
        }
        Ok(Self(Arc::from(id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LogicalId {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::new(input)
    }
}

impl TryFrom<&str> for LogicalId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LogicalId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_id_accepts_alphanumeric() {
        assert!(LogicalId::new("TrimanaDashboardApi").is_ok());
        assert!(LogicalId::new("S3Bucket").is_ok());
    }

    #[test]
    fn logical_id_rejects_punctuation_and_empty() {
        assert!(matches!(
            LogicalId::new("bad-id"),
            Err(Error::InvalidLogicalId(_))
        ));
        assert!(matches!(LogicalId::new(""), Err(Error::InvalidLogicalId(_))));
        assert!(matches!(
            LogicalId::new("has space"),
            Err(Error::InvalidLogicalId(_))
        ));
    }
}
