use std::collections::BTreeMap;

use serde::Deserialize;

use crate::Error;

/// Logical names every builder may dereference. Which keys are required
/// depends on the builder; a missing required key is a hard stop before any
/// descriptor is constructed.
pub mod keys {
    pub const API_NAME: &str = "ApiName";
    pub const API_KEY_NAME: &str = "ApiKeyName";
    pub const API_USAGE_PLAN_NAME: &str = "ApiUsagePlanName";
    pub const BUCKET_NAME: &str = "BucketName";
    pub const LAMBDA_NAME: &str = "TrimanaDashboardLambdaName";
    pub const SHARED_SECRETS_ID: &str = "SharedSecretsId";
}

/// Deployment-environment values supplied by the orchestration tool.
/// Treated as opaque input; only key presence is validated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    values: BTreeMap<String, String>,
}

impl Environment {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, Error> {
        self.get(key).ok_or_else(|| Error::MissingEnvKey {
            key: key.to_string(),
        })
    }
}

impl From<BTreeMap<String, String>> for Environment {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Environment {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_the_missing_key() {
        let env = Environment::from_iter([("BucketName", "b1")]);
        assert_eq!(env.require(keys::BUCKET_NAME).unwrap(), "b1");

        let err = env.require(keys::API_NAME).unwrap_err();
        assert!(matches!(err, Error::MissingEnvKey { key } if key == "ApiName"));
    }
}
