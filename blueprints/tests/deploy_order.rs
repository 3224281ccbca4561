use trimana_blueprints::{
    ApiBlueprint, Blueprint, DashboardBlueprint, Environment, Error, IntegrationsBlueprint, Plan,
    keys,
};
use trimana_store::{MemoryStore, ParameterStore};

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
fn every_consumed_path_is_published_by_the_gateway() {
    let mut store = MemoryStore::new();
    let env = full_env();

    let api = ApiBlueprint.build(&env, &mut store).unwrap();
    assert!(api.external_params().is_empty());

    for blueprint in [
        Box::new(DashboardBlueprint) as Box<dyn Blueprint>,
        Box::new(IntegrationsBlueprint),
    ] {
        let template = blueprint.build(&env, &mut MemoryStore::new()).unwrap();
        for path in template.external_params() {
            assert!(
                store.get(&path).is_some(),
                "{} consumes {path}, which the gateway never publishes",
                blueprint.name(),
            );
        }
    }
}

#[test]
fn plan_reordering_surfaces_the_deploy_order_violation() {
    let plan = Plan::new(vec![
        Box::new(DashboardBlueprint),
        Box::new(ApiBlueprint),
    ]);
    let err = plan.build(&full_env(), &mut MemoryStore::new()).unwrap_err();
    match err {
        Error::UnpublishedParameter { blueprint, path } => {
            assert_eq!(blueprint, "dashboard");
            assert!(path.as_str().starts_with("/trimana/dashboard/"));
        }
        other => panic!("expected UnpublishedParameter, got {other}"),
    }
}

#[test]
fn plan_documents_are_stable_across_rebuilds() {
    let build = || {
        Plan::standard()
            .build(&full_env(), &mut MemoryStore::new())
            .unwrap()
    };
    let first = build();
    let second = build();

    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.template.digest(), b.template.digest());
        assert_eq!(a.template.to_document(), b.template.to_document());
    }
}

#[test]
fn graphs_only_reference_descriptors_constructed_earlier() {
    let graphs = Plan::standard()
        .build(&full_env(), &mut MemoryStore::new())
        .unwrap();

    for graph in &graphs {
        let mut seen = std::collections::BTreeSet::new();
        for parameter in graph.template.parameters() {
            seen.insert(parameter.name().clone());
        }
        for resource in graph.template.resources() {
            resource.visit_refs(&mut |id| {
                assert!(
                    seen.contains(id),
                    "{}: `{}` references `{id}` before it is constructed",
                    graph.name,
                    resource.logical_id(),
                );
            });
            seen.insert(resource.logical_id().clone());
        }
    }
}
