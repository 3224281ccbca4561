use std::collections::BTreeSet;

use trimana_graph::Template;
use trimana_store::{ParameterStore, StorePath};

use crate::{
    ApiBlueprint, BucketBlueprint, DashboardBlueprint, Environment, Error, IntegrationsBlueprint,
};

/// One unit of independently deployable infrastructure: builds a complete
/// resource graph from the environment configuration.
///
/// Builders are pure construction. The store is where published identifiers
/// are recorded so cross-graph dependencies stay visible; builders never
/// read it to validate consumption, that is [`Plan`]'s job.
pub trait Blueprint {
    fn name(&self) -> &'static str;

    fn build(
        &self,
        env: &Environment,
        store: &mut dyn ParameterStore,
    ) -> Result<Template, Error>;
}

#[derive(Clone, Debug)]
pub struct BuiltGraph {
    pub name: &'static str,
    pub template: Template,
}

/// The deploy-ordered blueprint sequence.
///
/// The engine deploys graphs in a fixed, externally enforced order; the plan
/// makes that order checkable. Building verifies that every late-bound
/// store path a graph consumes was published by an *earlier* graph, turning
/// deploy-order violations into build-time errors.
pub struct Plan {
    blueprints: Vec<Box<dyn Blueprint>>,
}

impl Plan {
    /// The repository's standard order: bucket, gateway, function, integrations.
    pub fn standard() -> Self {
        Self {
            blueprints: vec![
                Box::new(BucketBlueprint),
                Box::new(ApiBlueprint),
                Box::new(DashboardBlueprint),
                Box::new(IntegrationsBlueprint),
            ],
        }
    }

    pub fn new(blueprints: Vec<Box<dyn Blueprint>>) -> Self {
        Self { blueprints }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.blueprints.iter().map(|b| b.name()).collect()
    }

    /// Build every graph in order, validating cross-graph references
    /// against the store as publications accumulate.
    pub fn build(
        &self,
        env: &Environment,
        store: &mut dyn ParameterStore,
    ) -> Result<Vec<BuiltGraph>, Error> {
        let mut graphs = Vec::with_capacity(self.blueprints.len());

        for blueprint in &self.blueprints {
            let mut recording = RecordingStore {
                inner: &mut *store,
                published: BTreeSet::new(),
                duplicate: None,
            };
            let template = blueprint.build(env, &mut recording)?;
            let RecordingStore {
                published,
                duplicate,
                ..
            } = recording;

            if let Some(path) = duplicate {
                return Err(Error::DuplicateParameter { path });
            }
            for path in template.external_params() {
                // A graph's own publications do not count: the engine
                // resolves lookups before this graph's resources exist.
                if published.contains(&path) || store.get(&path).is_none() {
                    return Err(Error::UnpublishedParameter {
                        blueprint: blueprint.name().to_string(),
                        path,
                    });
                }
            }

            graphs.push(BuiltGraph {
                name: blueprint.name(),
                template,
            });
        }

        Ok(graphs)
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::standard()
    }
}

/// Tracks what one builder published, and whether it collided with an
/// existing path.
struct RecordingStore<'a> {
    inner: &'a mut dyn ParameterStore,
    published: BTreeSet<StorePath>,
    duplicate: Option<StorePath>,
}

impl ParameterStore for RecordingStore<'_> {
    fn get(&self, path: &StorePath) -> Option<String> {
        self.inner.get(path)
    }

    fn put(&mut self, path: StorePath, value: String) -> Option<String> {
        self.published.insert(path.clone());
        let replaced = self.inner.put(path.clone(), value);
        if replaced.is_some() && self.duplicate.is_none() {
            self.duplicate = Some(path);
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use trimana_store::MemoryStore;

    use super::*;
    use crate::keys;

    fn full_env() -> Environment {
        Environment::from_iter([
            (keys::API_NAME, "trimana-dashboard-api-gateway"),
            (keys::API_KEY_NAME, "trimana-dashboard-api-key"),
            (keys::API_USAGE_PLAN_NAME, "trimana-dashboard-usage-plan"),
            (keys::BUCKET_NAME, "trimana-dashboard-bucket"),
            (keys::LAMBDA_NAME, "trimana-dashboard"),
            (keys::SHARED_SECRETS_ID, "trimana/shared"),
        ])
    }

    #[test]
    fn standard_order_builds_all_graphs() {
        let graphs = Plan::standard()
            .build(&full_env(), &mut MemoryStore::new())
            .unwrap();
        assert_eq!(
            graphs.iter().map(|g| g.name).collect::<Vec<_>>(),
            vec!["bucket", "api", "dashboard", "integrations"]
        );
    }

    #[test]
    fn consuming_before_publication_is_an_error() {
        let plan = Plan::new(vec![Box::new(crate::DashboardBlueprint)]);
        let err = plan.build(&full_env(), &mut MemoryStore::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnpublishedParameter { blueprint, .. } if blueprint == "dashboard"
        ));
    }

    #[test]
    fn republication_across_graphs_is_an_error() {
        let plan = Plan::new(vec![
            Box::new(crate::ApiBlueprint),
            Box::new(crate::ApiBlueprint),
        ]);
        let err = plan.build(&full_env(), &mut MemoryStore::new()).unwrap_err();
        assert!(matches!(err, Error::DuplicateParameter { .. }));
    }
}
