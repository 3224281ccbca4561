use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as Json;
use trimana_store::StorePath;

use crate::{Expr, LogicalId};

/// A provider-specific property tree. Leaves are [`Expr`]s (strings included,
/// as literal expressions), booleans or integers; branches are lists and
/// string-keyed maps. Maps are ordered for deterministic emission.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Value {
    Expr(Expr),
    Bool(bool),
    Int(i64),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn visit_refs(&self, visit: &mut impl FnMut(&LogicalId)) {
        match self {
            Value::Expr(expr) => expr.visit_refs(visit),
            Value::Bool(_) | Value::Int(_) => {}
            Value::List(items) => {
                for item in items {
                    item.visit_refs(visit);
                }
            }
            Value::Map(entries) => {
                for value in entries.values() {
                    value.visit_refs(visit);
                }
            }
        }
    }

    pub fn visit_params(&self, visit: &mut impl FnMut(&StorePath)) {
        match self {
            Value::Expr(expr) => expr.visit_params(visit),
            Value::Bool(_) | Value::Int(_) => {}
            Value::List(items) => {
                for item in items {
                    item.visit_params(visit);
                }
            }
            Value::Map(entries) => {
                for value in entries.values() {
                    value.visit_params(visit);
                }
            }
        }
    }

    pub(crate) fn to_json(&self) -> Json {
        match self {
            Value::Expr(expr) => expr.to_json(),
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number((*i).into()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl From<Expr> for Value {
    fn from(expr: Expr) -> Self {
        Value::Expr(expr)
    }
}

impl From<&LogicalId> for Value {
    fn from(id: &LogicalId) -> Self {
        Value::Expr(Expr::Ref(id.clone()))
    }
}

impl From<crate::Sub> for Value {
    fn from(sub: crate::Sub) -> Self {
        Value::Expr(Expr::Sub(sub))
    }
}

impl From<StorePath> for Value {
    fn from(path: StorePath) -> Self {
        Value::Expr(Expr::Param(path))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Expr(Expr::Literal(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Expr(Expr::Literal(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Props> for Value {
    fn from(props: Props) -> Self {
        Value::Map(props.0)
    }
}

/// Builder for property maps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Props(BTreeMap<String, Value>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn props_build_nested_trees() {
        let props = Props::new()
            .set("Name", "trimana-dashboard-api-gateway")
            .set("ApiKeyRequired", true)
            .set(
                "EndpointConfiguration",
                Props::new().set("Types", Value::List(vec!["REGIONAL".into()])),
            );

        assert_eq!(
            Value::from(props).to_json(),
            json!({
                "Name": "trimana-dashboard-api-gateway",
                "ApiKeyRequired": true,
                "EndpointConfiguration": { "Types": ["REGIONAL"] },
            })
        );
    }

    #[test]
    fn visit_refs_reaches_nested_exprs() {
        let id = LogicalId::new("Api").unwrap();
        let props = Props::new().set(
            "Stages",
            Value::List(vec![Props::new().set("ApiId", Expr::from(&id)).into()]),
        );

        let mut seen = Vec::new();
        Value::from(props).visit_refs(&mut |r| seen.push(r.to_string()));
        assert_eq!(seen, vec!["Api".to_string()]);
    }
}
