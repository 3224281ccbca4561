//! Fixed per-service ARN templates, assembled as validated sub expressions
//! so a typo'd placeholder fails at build time instead of deploying an
//! over- or under-permissive grant.

use trimana_graph::{Error as GraphError, Expr, Sub};

use crate::Error;

/// Every object under one bucket.
pub fn s3_bucket_objects(bucket_name: Expr) -> Result<Expr, GraphError> {
    Ok(Sub::new("arn:aws:s3:::${BucketName}/*", [("BucketName", bucket_name)])?.into())
}

/// Any log group in the deployment account and region.
pub fn log_groups() -> Result<Expr, GraphError> {
    Ok(Sub::new("arn:aws:logs:${AWS::Region}:${AWS::AccountId}:*", [])?.into())
}

/// The log streams of one function's log group.
pub fn function_log_streams(function_name: Expr) -> Result<Expr, GraphError> {
    Ok(Sub::new(
        "arn:aws:logs:${AWS::Region}:${AWS::AccountId}:log-group:/aws/lambda/${LambdaName}:*",
        [("LambdaName", function_name)],
    )?
    .into())
}

/// One secret, with the random suffix the platform appends wildcarded.
pub fn secret(secret_id: Expr) -> Result<Expr, GraphError> {
    Ok(Sub::new(
        "arn:aws:secretsmanager:${AWS::Region}:${AWS::AccountId}:secret:${SecretId}-*",
        [("SecretId", secret_id)],
    )?
    .into())
}

/// The gateway-side invocation URI for a function.
pub fn lambda_invocation_uri(function_arn: Expr) -> Result<Expr, GraphError> {
    Ok(Sub::new(
        "arn:aws:apigateway:${AWS::Region}:lambda:path/2015-03-31/functions/${LambdaArn}/invocations",
        [("LambdaArn", function_arn)],
    )?
    .into())
}

/// One HTTP route on a gateway: the verb plus the resource path segments.
///
/// Methods and invoke permissions are both derived from the same `Route`
/// value, so the permission's source-ARN path cannot drift from the method
/// it guards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    verb: &'static str,
    segments: Vec<String>,
}

impl Route {
    pub fn post(path: &str) -> Result<Self, Error> {
        Self::new("POST", path)
    }

    pub fn new(verb: &'static str, path: &str) -> Result<Self, Error> {
        let segments: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(str::to_string)
            .collect();
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(Error::InvalidRoute {
                path: path.to_string(),
            });
        }
        Ok(Self { verb, segments })
    }

    pub fn verb(&self) -> &'static str {
        self.verb
    }

    /// The final path segment, the `PathPart` of the route's own resource.
    pub fn leaf(&self) -> &str {
        self.segments.last().expect("routes have segments")
    }

    /// Slash-joined path without a leading slash, as source ARNs want it.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    /// Request path with a leading slash, as invocation payloads want it.
    pub fn request_path(&self) -> String {
        format!("/{}", self.path())
    }

    /// Source ARN scoping an invoke grant to this route on `api_id`, any
    /// stage: `arn:aws:execute-api:<region>:<account>:<api>/*/<verb>/<path>`.
    pub fn source_arn(&self, api_id: Expr) -> Result<Expr, GraphError> {
        let template = format!(
            "arn:aws:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{ApiId}}/*/{}/{}",
            self.verb,
            self.path(),
        );
        Ok(Sub::new(template, [("ApiId", api_id)])?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_splits_segments_and_exposes_both_path_forms() {
        let route = Route::post("/payroll/event").unwrap();
        assert_eq!(route.leaf(), "event");
        assert_eq!(route.path(), "payroll/event");
        assert_eq!(route.request_path(), "/payroll/event");
    }

    #[test]
    fn route_rejects_empty_segments() {
        assert!(matches!(Route::post(""), Err(Error::InvalidRoute { .. })));
        assert!(matches!(
            Route::post("payroll//event"),
            Err(Error::InvalidRoute { .. })
        ));
    }

    #[test]
    fn source_arn_embeds_verb_and_exact_path() {
        let route = Route::post("payroll/report").unwrap();
        let arn = route.source_arn(Expr::literal("abc123")).unwrap();
        let json = serde_json::to_value(&arn).unwrap();
        let template = json["Fn::Sub"][0].as_str().unwrap();
        assert!(template.ends_with("${ApiId}/*/POST/payroll/report"));
    }
}
