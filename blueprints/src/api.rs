//! Gateway fragment: the REST API, its top-level resources, and the
//! published identifiers later graphs resolve.

use trimana_graph::{Expr, LogicalId, Template};
use trimana_store::ParameterStore;

use crate::{
    Blueprint, Environment, Error, keys, params,
    resources::{ResourceSpec, apigateway},
};

pub const API_ID: &str = "TrimanaDashboardApi";
const POYNT_RESOURCE_ID: &str = "TrimanaDashboardPoyntResource";
const PAYROLL_RESOURCE_ID: &str = "TrimanaDashboardPayrollResource";

#[derive(Clone, Copy, Debug, Default)]
pub struct ApiBlueprint;

impl Blueprint for ApiBlueprint {
    fn name(&self) -> &'static str {
        "api"
    }

    fn build(
        &self,
        env: &Environment,
        store: &mut dyn ParameterStore,
    ) -> Result<Template, Error> {
        let api_name = env.require(keys::API_NAME)?;

        let mut template = Template::new("Trimana dashboard API gateway");

        let api = LogicalId::new(API_ID)?;
        template.add_resource(
            apigateway::RestApi {
                name: Expr::literal(api_name),
                api_key_source_type: "HEADER",
                endpoint_types: vec!["REGIONAL"],
            }
            .into_resource(api.clone()),
        )?;

        let root_resource = Expr::get_att(&api, "RootResourceId");

        let poynt = LogicalId::new(POYNT_RESOURCE_ID)?;
        template.add_resource(
            apigateway::ApiResource {
                rest_api_id: Expr::from(&api),
                parent_id: root_resource.clone(),
                path_part: "poynt".to_string(),
            }
            .into_resource(poynt.clone()),
        )?;

        let payroll = LogicalId::new(PAYROLL_RESOURCE_ID)?;
        template.add_resource(
            apigateway::ApiResource {
                rest_api_id: Expr::from(&api),
                parent_id: root_resource.clone(),
                path_part: "payroll".to_string(),
            }
            .into_resource(payroll.clone()),
        )?;

        params::publish(
            &mut template,
            store,
            LogicalId::new("TrimanaDashboardApiIdParameter")?,
            params::API_ID,
            Expr::from(&api),
        )?;
        params::publish(
            &mut template,
            store,
            LogicalId::new("TrimanaDashboardApiParentResourceParameter")?,
            params::API_PARENT_RESOURCE_ID,
            root_resource,
        )?;
        params::publish(
            &mut template,
            store,
            LogicalId::new("TrimanaDashboardPoyntResourceParameter")?,
            params::POYNT_RESOURCE_ID,
            Expr::from(&poynt),
        )?;
        params::publish(
            &mut template,
            store,
            LogicalId::new("TrimanaDashboardPayrollResourceParameter")?,
            params::PAYROLL_RESOURCE_ID,
            Expr::from(&payroll),
        )?;

        template.add_output(LogicalId::new("TrimanaDashboardApiId")?, Expr::from(&api))?;

        Ok(template)
    }
}
