//! Integrations fragment: deployment, stage, usage plan and API key for a
//! gateway created by an earlier graph.

use trimana_graph::{Expr, LogicalId, Template};
use trimana_store::{ParameterStore, StorePath};

use crate::{
    Blueprint, Environment, Error, keys, params,
    resources::{ResourceSpec, apigateway},
};

pub const STAGE_NAME: &str = "api";
pub const DEPLOYMENT_ID: &str = "TrimanaDashboardApiDeployment";
pub const STAGE_ID: &str = "TrimanaDashboardApiStage";
pub const USAGE_PLAN_ID: &str = "TrimanaDashboardUsagePlan";
const API_KEY_ID: &str = "TrimanaDashboardApiKey";
const USAGE_PLAN_KEY_ID: &str = "TrimanaDashboardUsagePlanKey";

#[derive(Clone, Copy, Debug, Default)]
pub struct IntegrationsBlueprint;

impl Blueprint for IntegrationsBlueprint {
    fn name(&self) -> &'static str {
        "integrations"
    }

    fn build(
        &self,
        env: &Environment,
        _store: &mut dyn ParameterStore,
    ) -> Result<Template, Error> {
        let usage_plan_name = env.require(keys::API_USAGE_PLAN_NAME)?;
        let api_key_name = env.require(keys::API_KEY_NAME)?;

        let api_id: StorePath = params::API_ID.parse()?;
        let mut template = Template::new("Trimana dashboard API integrations");

        let deployment = LogicalId::new(DEPLOYMENT_ID)?;
        template.add_resource(
            apigateway::Deployment {
                rest_api_id: Expr::Param(api_id.clone()),
            }
            .into_resource(deployment.clone()),
        )?;

        let stage = LogicalId::new(STAGE_ID)?;
        template.add_resource(
            apigateway::Stage {
                rest_api_id: Expr::Param(api_id.clone()),
                deployment_id: Expr::from(&deployment),
                stage_name: STAGE_NAME.to_string(),
            }
            .into_resource(stage.clone()),
        )?;

        let usage_plan = LogicalId::new(USAGE_PLAN_ID)?;
        template.add_resource(
            apigateway::UsagePlan {
                usage_plan_name: Expr::literal(usage_plan_name),
                description: "Trimana Dashboard Usage Plan".to_string(),
                api_stages: vec![apigateway::ApiStage {
                    api_id: Expr::Param(api_id.clone()),
                    stage: STAGE_NAME.to_string(),
                }],
                quota: apigateway::QuotaSettings {
                    limit: 100_000,
                    period: "MONTH",
                },
                throttle: apigateway::ThrottleSettings {
                    burst_limit: 100,
                    rate_limit: 50,
                },
            }
            .into_resource(usage_plan.clone())
            .depends_on(&stage),
        )?;

        let api_key = LogicalId::new(API_KEY_ID)?;
        template.add_resource(
            apigateway::ApiKey {
                name: Expr::literal(api_key_name),
            }
            .into_resource(api_key.clone()),
        )?;

        template.add_resource(
            apigateway::UsagePlanKey {
                key_id: Expr::from(&api_key),
                key_type: "API_KEY",
                usage_plan_id: Expr::from(&usage_plan),
            }
            .into_resource(LogicalId::new(USAGE_PLAN_KEY_ID)?)
            .depends_on(&usage_plan),
        )?;

        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use trimana_store::MemoryStore;

    use super::*;

    fn env() -> Environment {
        Environment::from_iter([
            (keys::API_USAGE_PLAN_NAME, "trimana-dashboard-usage-plan"),
            (keys::API_KEY_NAME, "trimana-dashboard-api-key"),
        ])
    }

    #[test]
    fn each_required_key_is_a_hard_stop() {
        let err = IntegrationsBlueprint
            .build(
                &Environment::from_iter([(keys::API_KEY_NAME, "k")]),
                &mut MemoryStore::new(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::MissingEnvKey { key } if key == "ApiUsagePlanName"));

        let err = IntegrationsBlueprint
            .build(
                &Environment::from_iter([(keys::API_USAGE_PLAN_NAME, "p")]),
                &mut MemoryStore::new(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::MissingEnvKey { key } if key == "ApiKeyName"));
    }

    #[test]
    fn stage_points_at_the_deployment_and_external_api() {
        let template = IntegrationsBlueprint
            .build(&env(), &mut MemoryStore::new())
            .unwrap();
        let stage = template.resource(STAGE_ID).unwrap();
        assert_eq!(
            serde_json::to_value(stage.property("DeploymentId").unwrap()).unwrap(),
            json!({ "Ref": DEPLOYMENT_ID })
        );
        assert_eq!(
            serde_json::to_value(stage.property("RestApiId").unwrap()).unwrap(),
            json!("{{resolve:ssm:/trimana/dashboard/api/id}}")
        );
    }

    #[test]
    fn usage_plan_waits_for_the_stage_and_caps_traffic() {
        let template = IntegrationsBlueprint
            .build(&env(), &mut MemoryStore::new())
            .unwrap();
        let plan = template.resource(USAGE_PLAN_ID).unwrap();
        assert_eq!(plan.dependencies(), &[LogicalId::new(STAGE_ID).unwrap()]);

        let quota = serde_json::to_value(plan.property("Quota").unwrap()).unwrap();
        assert_eq!(quota, json!({ "Limit": 100000, "Period": "MONTH" }));
        let throttle = serde_json::to_value(plan.property("Throttle").unwrap()).unwrap();
        assert_eq!(throttle, json!({ "BurstLimit": 100, "RateLimit": 50 }));
    }

    #[test]
    fn usage_plan_key_binds_key_to_plan() {
        let template = IntegrationsBlueprint
            .build(&env(), &mut MemoryStore::new())
            .unwrap();
        let key = template.resource(USAGE_PLAN_KEY_ID).unwrap();
        assert_eq!(
            serde_json::to_value(key.property("KeyId").unwrap()).unwrap(),
            json!({ "Ref": API_KEY_ID })
        );
        assert_eq!(
            serde_json::to_value(key.property("UsagePlanId").unwrap()).unwrap(),
            json!({ "Ref": USAGE_PLAN_ID })
        );
    }
}
