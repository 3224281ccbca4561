//! Blueprints for the Trimana dashboard infrastructure.
//!
//! Each blueprint turns the deployment-environment configuration into one
//! resource graph for the provisioning engine. Graphs compose only through
//! the shared parameter store; [`Plan`] builds them in deploy order and
//! verifies that composition holds together.

pub mod api;
pub mod arn;
pub mod bucket;
pub mod dashboard;
mod env;
pub mod integrations;
pub mod params;
mod plan;
pub mod resources;

pub use api::ApiBlueprint;
pub use bucket::BucketBlueprint;
pub use dashboard::DashboardBlueprint;
pub use env::{Environment, keys};
pub use integrations::IntegrationsBlueprint;
use miette::Diagnostic;
pub use plan::{Blueprint, BuiltGraph, Plan};
use thiserror::Error;
use trimana_store::StorePath;

#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum Error {
    #[error("missing required environment key `{key}`")]
    #[diagnostic(code(blueprints::missing_env_key))]
    MissingEnvKey { key: String },

    #[error("invalid route path `{path}`")]
    #[diagnostic(code(blueprints::invalid_route))]
    InvalidRoute { path: String },

    #[error("parameter `{path}` is published more than once")]
    #[diagnostic(code(blueprints::duplicate_parameter))]
    DuplicateParameter { path: StorePath },

    #[error("blueprint `{blueprint}` resolves `{path}` before any earlier graph publishes it")]
    #[diagnostic(
        code(blueprints::unpublished_parameter),
        help("deploy the publishing graph first, or reorder the plan")
    )]
    UnpublishedParameter { blueprint: String, path: StorePath },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] trimana_graph::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] trimana_store::Error),
}
