//! Typed descriptors for the provider resources the blueprints emit,
//! namespaced by service the way the engine's type tags are.

use trimana_graph::{LogicalId, Props, Resource};

/// A provider resource spec: a fixed type tag plus a property tree.
pub trait ResourceSpec {
    const TYPE: &'static str;

    fn props(self) -> Props;

    fn into_resource(self, id: LogicalId) -> Resource
    where
        Self: Sized,
    {
        Resource::new(id, Self::TYPE, self.props())
    }
}

pub mod s3 {
    use trimana_graph::{Expr, Props};

    use super::ResourceSpec;

    #[derive(Clone, Debug)]
    pub struct Bucket {
        pub bucket_name: Expr,
    }

    impl ResourceSpec for Bucket {
        const TYPE: &'static str = "AWS::S3::Bucket";

        fn props(self) -> Props {
            Props::new().set("BucketName", self.bucket_name)
        }
    }
}

pub mod iam {
    use trimana_graph::{Expr, Props, Value};

    use super::ResourceSpec;

    pub const POLICY_VERSION: &str = "2012-10-17";

    #[derive(Clone, Debug)]
    pub struct Role {
        pub assume_role_policy_document: PolicyDocument,
        pub policies: Vec<Policy>,
    }

    impl ResourceSpec for Role {
        const TYPE: &'static str = "AWS::IAM::Role";

        fn props(self) -> Props {
            Props::new()
                .set(
                    "AssumeRolePolicyDocument",
                    self.assume_role_policy_document.to_value(),
                )
                .set(
                    "Policies",
                    Value::List(self.policies.into_iter().map(Policy::to_value).collect()),
                )
        }
    }

    /// An inline policy attached to a role.
    #[derive(Clone, Debug)]
    pub struct Policy {
        pub policy_name: String,
        pub policy_document: PolicyDocument,
    }

    impl Policy {
        pub(crate) fn to_value(self) -> Value {
            Props::new()
                .set("PolicyName", self.policy_name)
                .set("PolicyDocument", self.policy_document.to_value())
                .into()
        }
    }

    #[derive(Clone, Debug)]
    pub struct PolicyDocument {
        pub statements: Vec<Statement>,
    }

    impl PolicyDocument {
        pub fn new(statements: impl IntoIterator<Item = Statement>) -> Self {
            Self {
                statements: statements.into_iter().collect(),
            }
        }

        pub(crate) fn to_value(self) -> Value {
            Props::new()
                .set("Version", POLICY_VERSION)
                .set(
                    "Statement",
                    Value::List(self.statements.into_iter().map(Statement::to_value).collect()),
                )
                .into()
        }
    }

    /// One allow statement. Single-element actions and resources serialize
    /// as scalars, the canonical form.
    #[derive(Clone, Debug)]
    pub struct Statement {
        pub principal_services: Vec<String>,
        pub actions: Vec<String>,
        pub resources: Vec<Expr>,
    }

    impl Statement {
        /// Trust-policy statement: which service principals may assume the role.
        pub fn assume_role(services: impl IntoIterator<Item = &'static str>) -> Self {
            Self {
                principal_services: services.into_iter().map(str::to_string).collect(),
                actions: vec!["sts:AssumeRole".to_string()],
                resources: Vec::new(),
            }
        }

        /// Permission statement scoping `actions` to `resources`.
        pub fn allow(
            actions: impl IntoIterator<Item = &'static str>,
            resources: impl IntoIterator<Item = Expr>,
        ) -> Self {
            Self {
                principal_services: Vec::new(),
                actions: actions.into_iter().map(str::to_string).collect(),
                resources: resources.into_iter().collect(),
            }
        }

        pub(crate) fn to_value(self) -> Value {
            let mut props = Props::new().set("Effect", "Allow");
            if !self.principal_services.is_empty() {
                let services = scalar_or_list(
                    self.principal_services.into_iter().map(Value::from).collect(),
                );
                props = props.set("Principal", Props::new().set("Service", services));
            }
            props = props.set(
                "Action",
                scalar_or_list(self.actions.into_iter().map(Value::from).collect()),
            );
            if !self.resources.is_empty() {
                props = props.set(
                    "Resource",
                    scalar_or_list(self.resources.into_iter().map(Value::from).collect()),
                );
            }
            props.into()
        }
    }

    fn scalar_or_list(mut values: Vec<Value>) -> Value {
        if values.len() == 1 {
            values.remove(0)
        } else {
            Value::List(values)
        }
    }
}

pub mod apigateway {
    use trimana_graph::{Expr, Props, Value};

    use super::ResourceSpec;

    #[derive(Clone, Debug)]
    pub struct RestApi {
        pub name: Expr,
        pub api_key_source_type: &'static str,
        pub endpoint_types: Vec<&'static str>,
    }

    impl ResourceSpec for RestApi {
        const TYPE: &'static str = "AWS::ApiGateway::RestApi";

        fn props(self) -> Props {
            Props::new()
                .set("Name", self.name)
                .set("ApiKeySourceType", self.api_key_source_type)
                .set(
                    "EndpointConfiguration",
                    Props::new().set(
                        "Types",
                        Value::List(self.endpoint_types.into_iter().map(Value::from).collect()),
                    ),
                )
        }
    }

    /// A path segment under an API's resource tree.
    #[derive(Clone, Debug)]
    pub struct ApiResource {
        pub rest_api_id: Expr,
        pub parent_id: Expr,
        pub path_part: String,
    }

    impl ResourceSpec for ApiResource {
        const TYPE: &'static str = "AWS::ApiGateway::Resource";

        fn props(self) -> Props {
            Props::new()
                .set("RestApiId", self.rest_api_id)
                .set("ParentId", self.parent_id)
                .set("PathPart", self.path_part)
        }
    }

    #[derive(Clone, Debug)]
    pub struct Method {
        pub rest_api_id: Expr,
        pub resource_id: Expr,
        pub http_method: String,
        pub authorization_type: &'static str,
        pub api_key_required: bool,
        pub integration: Integration,
    }

    impl ResourceSpec for Method {
        const TYPE: &'static str = "AWS::ApiGateway::Method";

        fn props(self) -> Props {
            Props::new()
                .set("RestApiId", self.rest_api_id)
                .set("ResourceId", self.resource_id)
                .set("HttpMethod", self.http_method)
                .set("AuthorizationType", self.authorization_type)
                .set("ApiKeyRequired", self.api_key_required)
                .set("Integration", self.integration.to_value())
        }
    }

    #[derive(Clone, Debug)]
    pub struct Integration {
        pub integration_http_method: String,
        pub integration_type: &'static str,
        pub uri: Expr,
    }

    impl Integration {
        pub(crate) fn to_value(self) -> Value {
            Props::new()
                .set("IntegrationHttpMethod", self.integration_http_method)
                .set("Type", self.integration_type)
                .set("Uri", self.uri)
                .into()
        }
    }

    /// Snapshot of the API's methods, referenced by a stage.
    #[derive(Clone, Debug)]
    pub struct Deployment {
        pub rest_api_id: Expr,
    }

    impl ResourceSpec for Deployment {
        const TYPE: &'static str = "AWS::ApiGateway::Deployment";

        fn props(self) -> Props {
            Props::new().set("RestApiId", self.rest_api_id)
        }
    }

    #[derive(Clone, Debug)]
    pub struct Stage {
        pub rest_api_id: Expr,
        pub deployment_id: Expr,
        pub stage_name: String,
    }

    impl ResourceSpec for Stage {
        const TYPE: &'static str = "AWS::ApiGateway::Stage";

        fn props(self) -> Props {
            Props::new()
                .set("RestApiId", self.rest_api_id)
                .set("DeploymentId", self.deployment_id)
                .set("StageName", self.stage_name)
        }
    }

    #[derive(Clone, Debug)]
    pub struct UsagePlan {
        pub usage_plan_name: Expr,
        pub description: String,
        pub api_stages: Vec<ApiStage>,
        pub quota: QuotaSettings,
        pub throttle: ThrottleSettings,
    }

    impl ResourceSpec for UsagePlan {
        const TYPE: &'static str = "AWS::ApiGateway::UsagePlan";

        fn props(self) -> Props {
            Props::new()
                .set("UsagePlanName", self.usage_plan_name)
                .set("Description", self.description)
                .set(
                    "ApiStages",
                    Value::List(self.api_stages.into_iter().map(ApiStage::to_value).collect()),
                )
                .set(
                    "Quota",
                    Props::new()
                        .set("Limit", self.quota.limit)
                        .set("Period", self.quota.period),
                )
                .set(
                    "Throttle",
                    Props::new()
                        .set("BurstLimit", self.throttle.burst_limit)
                        .set("RateLimit", self.throttle.rate_limit),
                )
        }
    }

    #[derive(Clone, Debug)]
    pub struct ApiStage {
        pub api_id: Expr,
        pub stage: String,
    }

    impl ApiStage {
        pub(crate) fn to_value(self) -> Value {
            Props::new()
                .set("ApiId", self.api_id)
                .set("Stage", self.stage)
                .into()
        }
    }

    #[derive(Clone, Copy, Debug)]
    pub struct QuotaSettings {
        pub limit: i64,
        pub period: &'static str,
    }

    #[derive(Clone, Copy, Debug)]
    pub struct ThrottleSettings {
        pub burst_limit: i64,
        pub rate_limit: i64,
    }

    #[derive(Clone, Debug)]
    pub struct ApiKey {
        pub name: Expr,
    }

    impl ResourceSpec for ApiKey {
        const TYPE: &'static str = "AWS::ApiGateway::ApiKey";

        fn props(self) -> Props {
            Props::new().set("Name", self.name)
        }
    }

    #[derive(Clone, Debug)]
    pub struct UsagePlanKey {
        pub key_id: Expr,
        pub key_type: &'static str,
        pub usage_plan_id: Expr,
    }

    impl ResourceSpec for UsagePlanKey {
        const TYPE: &'static str = "AWS::ApiGateway::UsagePlanKey";

        fn props(self) -> Props {
            Props::new()
                .set("KeyId", self.key_id)
                .set("KeyType", self.key_type)
                .set("UsagePlanId", self.usage_plan_id)
        }
    }
}

pub mod lambda {
    use std::collections::BTreeMap;

    use trimana_graph::{Expr, Props};

    use super::ResourceSpec;

    #[derive(Clone, Debug)]
    pub struct Function {
        pub function_name: Expr,
        pub code: Code,
        pub environment: BTreeMap<&'static str, Expr>,
        pub handler: String,
        pub runtime: String,
        pub role: Expr,
    }

    impl ResourceSpec for Function {
        const TYPE: &'static str = "AWS::Lambda::Function";

        fn props(self) -> Props {
            let mut variables = Props::new();
            for (name, value) in self.environment {
                variables = variables.set(name, value);
            }
            Props::new()
                .set("FunctionName", self.function_name)
                .set(
                    "Code",
                    Props::new()
                        .set("S3Bucket", self.code.s3_bucket)
                        .set("S3Key", self.code.s3_key),
                )
                .set("Environment", Props::new().set("Variables", variables))
                .set("Handler", self.handler)
                .set("Runtime", self.runtime)
                .set("Role", self.role)
        }
    }

    #[derive(Clone, Debug)]
    pub struct Code {
        pub s3_bucket: Expr,
        pub s3_key: Expr,
    }

    /// Grants a service principal the right to invoke a function, scoped by
    /// source ARN.
    #[derive(Clone, Debug)]
    pub struct Permission {
        pub function_name: Expr,
        pub principal: &'static str,
        pub source_arn: Expr,
    }

    impl ResourceSpec for Permission {
        const TYPE: &'static str = "AWS::Lambda::Permission";

        fn props(self) -> Props {
            Props::new()
                .set("Action", "lambda:InvokeFunction")
                .set("FunctionName", self.function_name)
                .set("Principal", self.principal)
                .set("SourceArn", self.source_arn)
        }
    }

}

pub mod scheduler {
    use trimana_graph::{Expr, Props};

    use super::ResourceSpec;

    #[derive(Clone, Debug)]
    pub struct Schedule {
        pub name: String,
        pub description: String,
        pub schedule_expression: String,
        pub schedule_expression_timezone: String,
        pub flexible_time_window_mode: &'static str,
        pub target: Target,
    }

    impl ResourceSpec for Schedule {
        const TYPE: &'static str = "AWS::Scheduler::Schedule";

        fn props(self) -> Props {
            Props::new()
                .set("Name", self.name)
                .set("Description", self.description)
                .set("ScheduleExpression", self.schedule_expression)
                .set(
                    "ScheduleExpressionTimezone",
                    self.schedule_expression_timezone,
                )
                .set(
                    "FlexibleTimeWindow",
                    Props::new().set("Mode", self.flexible_time_window_mode),
                )
                .set(
                    "Target",
                    Props::new()
                        .set("Arn", self.target.arn)
                        .set("Input", self.target.input)
                        .set(
                            "RetryPolicy",
                            Props::new()
                                .set(
                                    "MaximumEventAgeInSeconds",
                                    self.target.retry_policy.maximum_event_age_in_seconds,
                                )
                                .set(
                                    "MaximumRetryAttempts",
                                    self.target.retry_policy.maximum_retry_attempts,
                                ),
                        )
                        .set("RoleArn", self.target.role_arn),
                )
        }
    }

    #[derive(Clone, Debug)]
    pub struct Target {
        pub arn: Expr,
        pub input: String,
        pub retry_policy: RetryPolicy,
        pub role_arn: Expr,
    }

    #[derive(Clone, Copy, Debug)]
    pub struct RetryPolicy {
        pub maximum_event_age_in_seconds: i64,
        pub maximum_retry_attempts: i64,
    }
}

pub mod ssm {
    use trimana_graph::{Expr, Props};
    use trimana_store::StorePath;

    use super::ResourceSpec;

    /// Publication of an identifier into the shared parameter namespace.
    #[derive(Clone, Debug)]
    pub struct Parameter {
        pub name: StorePath,
        pub value: Expr,
    }

    impl ResourceSpec for Parameter {
        const TYPE: &'static str = "AWS::SSM::Parameter";

        fn props(self) -> Props {
            Props::new()
                .set("Name", self.name.as_str())
                .set("Type", "String")
                .set("Value", self.value)
        }
    }
}
