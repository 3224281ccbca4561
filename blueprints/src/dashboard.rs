//! Dashboard function fragment: execution role, the function itself, its
//! payroll route bindings with invoke permissions, and the nightly report
//! scheduler.

use trimana_graph::{Expr, LogicalId, Sub, Template, TemplateParameter};
use trimana_store::{ParameterStore, StorePath};

use crate::{
    Blueprint, Environment, Error, arn,
    arn::Route,
    keys, params,
    resources::{ResourceSpec, apigateway, iam, lambda, scheduler},
};

pub const FUNCTION_ID: &str = "TrimanaDashboardLambdaFunction";
pub const ROLE_ID: &str = "TrimanaDashboardLambdaExecutionRole";
pub const SCHEDULE_ID: &str = "PayrollReportScheduler";
const BUCKET_PARAMETER_ID: &str = "TrimanaDashboardS3Bucket";
const SCHEDULER_ROLE_ID: &str = "PayrollReportSchedulerExecutionRole";

pub const REPORT_SCHEDULE_EXPRESSION: &str = "cron(0 17 ? * * *)";
pub const REPORT_SCHEDULE_TIMEZONE: &str = "America/Los_Angeles";
const REPORT_RETRY_POLICY: scheduler::RetryPolicy = scheduler::RetryPolicy {
    maximum_event_age_in_seconds: 86400,
    maximum_retry_attempts: 185,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct DashboardBlueprint;

impl Blueprint for DashboardBlueprint {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn build(
        &self,
        env: &Environment,
        _store: &mut dyn ParameterStore,
    ) -> Result<Template, Error> {
        let bucket_name = env.require(keys::BUCKET_NAME)?;
        let lambda_name = env.require(keys::LAMBDA_NAME)?;
        let secrets_id = env.require(keys::SHARED_SECRETS_ID)?;

        let mut template = Template::new("Trimana dashboard function");

        let bucket_param = LogicalId::new(BUCKET_PARAMETER_ID)?;
        template.add_parameter(TemplateParameter::string(bucket_param.clone(), bucket_name))?;

        let function = add_function(
            &mut template,
            &bucket_param,
            bucket_name,
            lambda_name,
            secrets_id,
        )?;
        add_payroll_routes(&mut template, &function, lambda_name)?;
        add_report_scheduler(&mut template, &function)?;

        Ok(template)
    }
}

/// Execution role plus the function descriptor.
fn add_function(
    template: &mut Template,
    bucket_param: &LogicalId,
    bucket_name: &str,
    lambda_name: &str,
    secrets_id: &str,
) -> Result<LogicalId, Error> {
    let role = LogicalId::new(ROLE_ID)?;
    template.add_resource(
        iam::Role {
            assume_role_policy_document: iam::PolicyDocument::new([iam::Statement::assume_role(
                ["lambda.amazonaws.com", "apigateway.amazonaws.com"],
            )]),
            policies: vec![
                iam::Policy {
                    policy_name: "TrimanaDashboardLambdaS3Policy".to_string(),
                    policy_document: iam::PolicyDocument::new([iam::Statement::allow(
                        ["s3:GetObject"],
                        [arn::s3_bucket_objects(Expr::literal(bucket_name))?],
                    )]),
                },
                iam::Policy {
                    policy_name: "TrimanaDashboardLambdaLogPolicy".to_string(),
                    policy_document: iam::PolicyDocument::new([
                        iam::Statement::allow(["logs:CreateLogGroup"], [arn::log_groups()?]),
                        iam::Statement::allow(
                            ["logs:CreateLogStream", "logs:PutLogEvents"],
                            [arn::function_log_streams(Expr::literal(lambda_name))?],
                        ),
                    ]),
                },
                iam::Policy {
                    policy_name: "TrimanaDashboardLambdaSecretsManagerPolicy".to_string(),
                    policy_document: iam::PolicyDocument::new([iam::Statement::allow(
                        ["secretsmanager:GetSecretValue"],
                        [arn::secret(Expr::literal(secrets_id))?],
                    )]),
                },
            ],
        }
        .into_resource(role.clone()),
    )?;

    let function = LogicalId::new(FUNCTION_ID)?;
    template.add_resource(
        lambda::Function {
            function_name: Expr::literal(lambda_name),
            code: lambda::Code {
                s3_bucket: Expr::from(bucket_param),
                s3_key: Sub::new(
                    "lambdas/${LambdaName}.zip",
                    [("LambdaName", Expr::literal(lambda_name))],
                )?
                .into(),
            },
            environment: [("SHARED_SECRETS", Expr::literal(secrets_id))].into(),
            handler: "handler".to_string(),
            runtime: "provided.al2023".to_string(),
            role: Expr::get_att(&role, "Arn"),
        }
        .into_resource(function.clone()),
    )?;

    Ok(function)
}

/// Route bindings under the externally published payroll resource, each
/// with the invoke permission derived from the same `Route`.
fn add_payroll_routes(
    template: &mut Template,
    function: &LogicalId,
    lambda_name: &str,
) -> Result<(), Error> {
    let api_id: StorePath = params::API_ID.parse()?;
    let payroll_parent: StorePath = params::PAYROLL_RESOURCE_ID.parse()?;

    let routes = [
        (
            Route::post("payroll/event")?,
            "TrimanaDashboardPayrollEventResource",
            "TrimanaDashboardPayrollEventMethod",
            "PayrollEventLambdaInvokePermission",
        ),
        (
            Route::post("payroll/report")?,
            "TrimanaDashboardPayrollReportResource",
            "TrimanaDashboardPayrollReportMethod",
            "PayrollReportLambdaInvokePermission",
        ),
    ];

    for (route, resource_id, method_id, permission_id) in routes {
        let resource = LogicalId::new(resource_id)?;
        template.add_resource(
            apigateway::ApiResource {
                rest_api_id: Expr::Param(api_id.clone()),
                parent_id: Expr::Param(payroll_parent.clone()),
                path_part: route.leaf().to_string(),
            }
            .into_resource(resource.clone()),
        )?;

        template.add_resource(
            apigateway::Method {
                rest_api_id: Expr::Param(api_id.clone()),
                resource_id: Expr::from(&resource),
                http_method: route.verb().to_string(),
                authorization_type: "NONE",
                api_key_required: true,
                integration: apigateway::Integration {
                    integration_http_method: route.verb().to_string(),
                    integration_type: "AWS_PROXY",
                    uri: arn::lambda_invocation_uri(Expr::get_att(function, "Arn"))?,
                },
            }
            .into_resource(LogicalId::new(method_id)?)
            .depends_on(function),
        )?;

        template.add_resource(
            lambda::Permission {
                function_name: Expr::literal(lambda_name),
                principal: "apigateway.amazonaws.com",
                source_arn: route.source_arn(Expr::Param(api_id.clone()))?,
            }
            .into_resource(LogicalId::new(permission_id)?)
            .depends_on(function),
        )?;
    }

    Ok(())
}

/// Nightly report trigger: fires the report route's payload at the function.
fn add_report_scheduler(template: &mut Template, function: &LogicalId) -> Result<(), Error> {
    let role = LogicalId::new(SCHEDULER_ROLE_ID)?;
    template.add_resource(
        iam::Role {
            assume_role_policy_document: iam::PolicyDocument::new([iam::Statement::assume_role(
                ["scheduler.amazonaws.com"],
            )]),
            policies: vec![iam::Policy {
                policy_name: "PayrollReportSchedulerExecutionPolicy".to_string(),
                policy_document: iam::PolicyDocument::new([iam::Statement::allow(
                    ["lambda:InvokeFunction"],
                    [Expr::literal("*")],
                )]),
            }],
        }
        .into_resource(role.clone()),
    )?;

    let report = Route::post("payroll/report")?;
    template.add_resource(
        scheduler::Schedule {
            name: "payroll-report-scheduler".to_string(),
            description: "Payroll Report Scheduler".to_string(),
            schedule_expression: REPORT_SCHEDULE_EXPRESSION.to_string(),
            schedule_expression_timezone: REPORT_SCHEDULE_TIMEZONE.to_string(),
            flexible_time_window_mode: "OFF",
            target: scheduler::Target {
                arn: Expr::get_att(function, "Arn"),
                input: format!(
                    r#"{{"httpMethod": "{}", "path": "{}"}}"#,
                    report.verb(),
                    report.request_path(),
                ),
                retry_policy: REPORT_RETRY_POLICY,
                role_arn: Expr::get_att(&role, "Arn"),
            },
        }
        .into_resource(LogicalId::new(SCHEDULE_ID)?),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use trimana_store::MemoryStore;

    use super::*;

    fn env() -> Environment {
        Environment::from_iter([
            (keys::BUCKET_NAME, "trimana-dashboard-bucket"),
            (keys::LAMBDA_NAME, "trimana-dashboard"),
            (keys::SHARED_SECRETS_ID, "trimana/shared"),
        ])
    }

    fn build() -> Template {
        DashboardBlueprint.build(&env(), &mut MemoryStore::new()).unwrap()
    }

    #[test]
    fn each_required_key_is_a_hard_stop() {
        for missing in [keys::BUCKET_NAME, keys::LAMBDA_NAME, keys::SHARED_SECRETS_ID] {
            let partial = Environment::from_iter(
                [
                    (keys::BUCKET_NAME, "b"),
                    (keys::LAMBDA_NAME, "l"),
                    (keys::SHARED_SECRETS_ID, "s"),
                ]
                .into_iter()
                .filter(|(k, _)| *k != missing),
            );
            let err = DashboardBlueprint
                .build(&partial, &mut MemoryStore::new())
                .unwrap_err();
            assert!(matches!(err, Error::MissingEnvKey { key } if key == missing));
        }
    }

    #[test]
    fn function_code_points_at_the_artifact_key() {
        let template = build();
        let function = template.resource(FUNCTION_ID).unwrap();
        assert_eq!(
            serde_json::to_value(function.property("Code").unwrap()).unwrap(),
            json!({
                "S3Bucket": { "Ref": "TrimanaDashboardS3Bucket" },
                "S3Key": {
                    "Fn::Sub": ["lambdas/${LambdaName}.zip", { "LambdaName": "trimana-dashboard" }],
                },
            })
        );
        assert_eq!(
            serde_json::to_value(function.property("Runtime").unwrap()).unwrap(),
            json!("provided.al2023")
        );
    }

    #[test]
    fn role_scopes_each_service_to_its_arn_template() {
        let template = build();
        let role = template.resource(ROLE_ID).unwrap();
        let policies = serde_json::to_value(role.property("Policies").unwrap()).unwrap();

        let s3_resource = &policies[0]["PolicyDocument"]["Statement"][0]["Resource"];
        assert_eq!(
            s3_resource,
            &json!({
                "Fn::Sub": [
                    "arn:aws:s3:::${BucketName}/*",
                    { "BucketName": "trimana-dashboard-bucket" },
                ],
            })
        );

        let secrets_resource = &policies[2]["PolicyDocument"]["Statement"][0]["Resource"];
        assert_eq!(
            secrets_resource,
            &json!({
                "Fn::Sub": [
                    "arn:aws:secretsmanager:${AWS::Region}:${AWS::AccountId}:secret:${SecretId}-*",
                    { "SecretId": "trimana/shared" },
                ],
            })
        );
    }

    #[test]
    fn permissions_match_their_methods_exactly() {
        let template = build();
        for (method_id, permission_id, path) in [
            (
                "TrimanaDashboardPayrollEventMethod",
                "PayrollEventLambdaInvokePermission",
                "payroll/event",
            ),
            (
                "TrimanaDashboardPayrollReportMethod",
                "PayrollReportLambdaInvokePermission",
                "payroll/report",
            ),
        ] {
            let method = template.resource(method_id).unwrap();
            assert_eq!(
                serde_json::to_value(method.property("HttpMethod").unwrap()).unwrap(),
                json!("POST")
            );

            let permission = template.resource(permission_id).unwrap();
            let arn = serde_json::to_value(permission.property("SourceArn").unwrap()).unwrap();
            let template_str = arn["Fn::Sub"][0].as_str().unwrap();
            assert!(
                template_str.ends_with(&format!("${{ApiId}}/*/POST/{path}")),
                "unexpected source arn template: {template_str}"
            );
        }
    }

    #[test]
    fn routes_resolve_the_published_gateway_identifiers() {
        let template = build();
        let external: Vec<String> = template
            .external_params()
            .into_iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(
            external,
            vec![
                params::API_ID.to_string(),
                params::PAYROLL_RESOURCE_ID.to_string(),
            ]
        );
    }

    #[test]
    fn scheduler_fires_the_report_route_with_capped_retries() {
        let template = build();
        let schedule = template.resource(SCHEDULE_ID).unwrap();
        assert_eq!(
            serde_json::to_value(schedule.property("ScheduleExpression").unwrap()).unwrap(),
            json!("cron(0 17 ? * * *)")
        );
        assert_eq!(
            serde_json::to_value(schedule.property("ScheduleExpressionTimezone").unwrap())
                .unwrap(),
            json!("America/Los_Angeles")
        );

        let target = serde_json::to_value(schedule.property("Target").unwrap()).unwrap();
        assert_eq!(
            target["Arn"],
            json!({ "Fn::GetAtt": [FUNCTION_ID, "Arn"] })
        );
        assert_eq!(
            target["Input"],
            json!(r#"{"httpMethod": "POST", "path": "/payroll/report"}"#)
        );
        assert_eq!(target["RetryPolicy"]["MaximumRetryAttempts"], json!(185));
        assert_eq!(
            target["RetryPolicy"]["MaximumEventAgeInSeconds"],
            json!(86400)
        );
    }

    #[test]
    fn construction_order_has_no_forward_references() {
        let template = build();
        assert!(template.topo_order().is_ok());
    }

    #[test]
    fn rebuild_is_deterministic() {
        assert_eq!(build().digest(), build().digest());
    }
}
