use std::collections::BTreeSet;

use serde_json::{Map as JsonMap, Value as Json, json};
use trimana_store::StorePath;

use crate::{Error, Expr, LogicalId, TemplateDigest, Value, topo};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// A deploy-time input slot, filled by the orchestration tool.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct TemplateParameter {
    name: LogicalId,
    parameter_type: &'static str,
    default: Option<String>,
}

impl TemplateParameter {
    pub fn string(name: LogicalId, default: impl Into<String>) -> Self {
        Self {
            name,
            parameter_type: "String",
            default: Some(default.into()),
        }
    }

    pub fn name(&self) -> &LogicalId {
        &self.name
    }

    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// One piece of infrastructure to be created: a unique logical id, a
/// provider type tag and a property tree.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Resource {
    logical_id: LogicalId,
    resource_type: &'static str,
    properties: Value,
    depends_on: Vec<LogicalId>,
}

impl Resource {
    pub fn new(logical_id: LogicalId, resource_type: &'static str, properties: crate::Props) -> Self {
        Self {
            logical_id,
            resource_type,
            properties: properties.into(),
            depends_on: Vec::new(),
        }
    }

    /// Add an ordering edge the engine must respect beyond property
    /// references (e.g. a usage plan that needs its stage live first).
    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        self.depends_on.push(id.clone());
        self
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        match &self.properties {
            Value::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn dependencies(&self) -> &[LogicalId] {
        &self.depends_on
    }

    /// Visit every local reference in properties and explicit dependencies.
    pub fn visit_refs(&self, visit: &mut impl FnMut(&LogicalId)) {
        self.properties.visit_refs(visit);
        for id in &self.depends_on {
            visit(id);
        }
    }

    fn to_json(&self) -> Json {
        let mut body = JsonMap::new();
        body.insert("Type".to_string(), json!(self.resource_type));
        body.insert("Properties".to_string(), self.properties.to_json());
        match self.depends_on.as_slice() {
            [] => {}
            [only] => {
                body.insert("DependsOn".to_string(), json!(only.as_str()));
            }
            many => {
                let ids: Vec<&str> = many.iter().map(LogicalId::as_str).collect();
                body.insert("DependsOn".to_string(), json!(ids));
            }
        }
        Json::Object(body)
    }
}

/// A named value exported for humans or tooling.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Output {
    name: LogicalId,
    value: Expr,
}

impl Output {
    pub fn name(&self) -> &LogicalId {
        &self.name
    }

    pub fn value(&self) -> &Expr {
        &self.value
    }
}

/// An ordered resource graph plus its parameters and outputs.
///
/// Descriptors are appended in construction order, and every reference must
/// point at a parameter or resource already present, so the graph is
/// dependency-ordered by construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Template {
    description: Option<String>,
    parameters: Vec<TemplateParameter>,
    resources: Vec<Resource>,
    outputs: Vec<Output>,
    ids: BTreeSet<LogicalId>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn add_parameter(&mut self, parameter: TemplateParameter) -> Result<(), Error> {
        if !self.ids.insert(parameter.name.clone()) {
            return Err(Error::DuplicateLogicalId(parameter.name.to_string()));
        }
        self.parameters.push(parameter);
        Ok(())
    }

    pub fn add_resource(&mut self, resource: Resource) -> Result<(), Error> {
        if self.ids.contains(&resource.logical_id) {
            return Err(Error::DuplicateLogicalId(resource.logical_id.to_string()));
        }

        let mut unknown = None;
        resource.visit_refs(&mut |id| {
            if unknown.is_none() && !self.ids.contains(id) {
                unknown = Some(id.clone());
            }
        });
        if let Some(target) = unknown {
            return Err(Error::UnknownReference {
                resource: resource.logical_id.to_string(),
                target: target.to_string(),
            });
        }

        self.ids.insert(resource.logical_id.clone());
        self.resources.push(resource);
        Ok(())
    }

    pub fn add_output(&mut self, name: LogicalId, value: Expr) -> Result<(), Error> {
        if self.outputs.iter().any(|output| output.name == name) {
            return Err(Error::DuplicateOutput(name.to_string()));
        }

        let mut unknown = None;
        value.visit_refs(&mut |id| {
            if unknown.is_none() && !self.ids.contains(id) {
                unknown = Some(id.clone());
            }
        });
        if let Some(target) = unknown {
            return Err(Error::UnknownReference {
                resource: name.to_string(),
                target: target.to_string(),
            });
        }

        self.outputs.push(Output { name, value });
        Ok(())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parameters(&self) -> &[TemplateParameter] {
        &self.parameters
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id.as_str() == id)
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Every external store path consumed anywhere in the graph.
    pub fn external_params(&self) -> BTreeSet<StorePath> {
        let mut paths = BTreeSet::new();
        for resource in &self.resources {
            resource.properties.visit_params(&mut |path| {
                paths.insert(path.clone());
            });
        }
        for output in &self.outputs {
            output.value.visit_params(&mut |path| {
                paths.insert(path.clone());
            });
        }
        paths
    }

    /// Resource ids in dependency order. Construction already forbids
    /// forward references, so this is also a check that the recorded edges
    /// stayed acyclic.
    pub fn topo_order(&self) -> Result<Vec<&LogicalId>, Error> {
        let index: std::collections::BTreeMap<&str, usize> = self
            .resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.logical_id.as_str(), i))
            .collect();

        let mut edges = Vec::new();
        for (i, resource) in self.resources.iter().enumerate() {
            resource.visit_refs(&mut |id| {
                // Parameter references are not ordering edges.
                if let Some(&j) = index.get(id.as_str()) {
                    edges.push((j, i));
                }
            });
        }

        match topo::sort(self.resources.len(), &edges) {
            Ok(order) => Ok(order
                .into_iter()
                .map(|i| &self.resources[i].logical_id)
                .collect()),
            Err(cycle) => Err(Error::DependencyCycle {
                cycle: cycle
                    .into_iter()
                    .map(|i| self.resources[i].logical_id.clone())
                    .collect(),
            }),
        }
    }

    /// The canonical engine document. Identical templates produce identical
    /// documents; there is no randomness and no timestamps.
    pub fn to_document(&self) -> Json {
        let mut doc = JsonMap::new();
        doc.insert(
            "AWSTemplateFormatVersion".to_string(),
            json!(TEMPLATE_FORMAT_VERSION),
        );
        if let Some(description) = &self.description {
            doc.insert("Description".to_string(), json!(description));
        }

        if !self.parameters.is_empty() {
            let mut parameters = JsonMap::new();
            for parameter in &self.parameters {
                let mut body = JsonMap::new();
                body.insert("Type".to_string(), json!(parameter.parameter_type));
                if let Some(default) = &parameter.default {
                    body.insert("Default".to_string(), json!(default));
                }
                parameters.insert(parameter.name.to_string(), Json::Object(body));
            }
            doc.insert("Parameters".to_string(), Json::Object(parameters));
        }

        if !self.resources.is_empty() {
            let mut resources = JsonMap::new();
            for resource in &self.resources {
                resources.insert(resource.logical_id.to_string(), resource.to_json());
            }
            doc.insert("Resources".to_string(), Json::Object(resources));
        }

        if !self.outputs.is_empty() {
            let mut outputs = JsonMap::new();
            for output in &self.outputs {
                outputs.insert(
                    output.name.to_string(),
                    json!({ "Value": output.value.to_json() }),
                );
            }
            doc.insert("Outputs".to_string(), Json::Object(outputs));
        }

        Json::Object(doc)
    }

    pub fn digest(&self) -> TemplateDigest {
        TemplateDigest::digest(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Props;

    fn id(s: &str) -> LogicalId {
        LogicalId::new(s).unwrap()
    }

    fn bucket(logical_id: &str) -> Resource {
        Resource::new(
            id(logical_id),
            "AWS::S3::Bucket",
            Props::new().set("BucketName", "b1"),
        )
    }

    #[test]
    fn add_resource_rejects_duplicate_ids() {
        let mut template = Template::default();
        template.add_resource(bucket("S3Bucket")).unwrap();
        let err = template.add_resource(bucket("S3Bucket")).unwrap_err();
        assert!(matches!(err, Error::DuplicateLogicalId(_)));
    }

    #[test]
    fn add_resource_rejects_forward_references() {
        let mut template = Template::default();
        let method = Resource::new(
            id("Method"),
            "AWS::ApiGateway::Method",
            Props::new().set("ResourceId", Expr::Ref(id("Resource"))),
        );
        let err = template.add_resource(method).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownReference { resource, target }
                if resource == "Method" && target == "Resource"
        ));
    }

    #[test]
    fn parameters_are_referenceable() {
        let mut template = Template::default();
        template
            .add_parameter(TemplateParameter::string(id("BucketParam"), "b1"))
            .unwrap();
        let fun = Resource::new(
            id("Fn"),
            "AWS::Lambda::Function",
            Props::new().set("Code", Props::new().set("S3Bucket", Expr::Ref(id("BucketParam")))),
        );
        template.add_resource(fun).unwrap();
    }

    #[test]
    fn add_output_rejects_unknown_reference() {
        let mut template = Template::default();
        let err = template
            .add_output(id("ApiId"), Expr::Ref(id("Api")))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownReference { .. }));
    }

    #[test]
    fn referenced_resources_precede_referents() {
        let mut template = Template::default();
        template.add_resource(bucket("S3Bucket")).unwrap();
        let fun = Resource::new(
            id("Fn"),
            "AWS::Lambda::Function",
            Props::new().set("Code", Props::new().set("S3Bucket", Expr::Ref(id("S3Bucket")))),
        );
        template.add_resource(fun).unwrap();

        let order = template.topo_order().unwrap();
        let bucket_pos = order.iter().position(|r| r.as_str() == "S3Bucket").unwrap();
        let fn_pos = order.iter().position(|r| r.as_str() == "Fn").unwrap();
        assert!(bucket_pos < fn_pos);
    }

    #[test]
    fn depends_on_serializes_scalar_for_single_edge() {
        let mut template = Template::default();
        template.add_resource(bucket("S3Bucket")).unwrap();
        let fun = Resource::new(id("Fn"), "AWS::Lambda::Function", Props::new())
            .depends_on(&id("S3Bucket"));
        template.add_resource(fun).unwrap();

        let doc = template.to_document();
        assert_eq!(doc["Resources"]["Fn"]["DependsOn"], json!("S3Bucket"));
    }

    #[test]
    fn identical_construction_yields_identical_documents() {
        let build = || {
            let mut template = Template::new("deterministic");
            template.add_resource(bucket("S3Bucket")).unwrap();
            template
                .add_output(id("BucketName"), Expr::Ref(id("S3Bucket")))
                .unwrap();
            template
        };
        assert_eq!(build().to_document(), build().to_document());
        assert_eq!(build().digest(), build().digest());
    }
}
