//! Storage fragment: the bucket function artifacts are fetched from.

use trimana_graph::{Expr, LogicalId, Template};
use trimana_store::ParameterStore;

use crate::{
    Blueprint, Environment, Error, keys,
    resources::{ResourceSpec, s3},
};

pub const BUCKET_ID: &str = "S3Bucket";

#[derive(Clone, Copy, Debug, Default)]
pub struct BucketBlueprint;

impl Blueprint for BucketBlueprint {
    fn name(&self) -> &'static str {
        "bucket"
    }

    fn build(
        &self,
        env: &Environment,
        _store: &mut dyn ParameterStore,
    ) -> Result<Template, Error> {
        let bucket_name = env.require(keys::BUCKET_NAME)?;

        let mut template = Template::new("Trimana dashboard artifact bucket");

        let bucket = LogicalId::new(BUCKET_ID)?;
        template.add_resource(
            s3::Bucket {
                bucket_name: Expr::literal(bucket_name),
            }
            .into_resource(bucket.clone()),
        )?;

        template.add_output(LogicalId::new("BucketName")?, Expr::from(&bucket))?;

        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use trimana_store::MemoryStore;

    use super::*;

    #[test]
    fn missing_bucket_name_is_a_hard_stop() {
        let err = BucketBlueprint
            .build(&Environment::default(), &mut MemoryStore::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingEnvKey { key } if key == "BucketName"));
    }

    #[test]
    fn bucket_takes_its_name_from_the_environment() {
        let env = Environment::from_iter([(keys::BUCKET_NAME, "trimana-dashboard-bucket")]);
        let template = BucketBlueprint.build(&env, &mut MemoryStore::new()).unwrap();

        let bucket = template.resource(BUCKET_ID).unwrap();
        assert_eq!(
            serde_json::to_value(bucket.property("BucketName").unwrap()).unwrap(),
            serde_json::json!("trimana-dashboard-bucket")
        );
        assert_eq!(template.outputs().len(), 1);
    }
}
