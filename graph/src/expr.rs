use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Value as Json, json};
use trimana_store::StorePath;

use crate::{Error, LogicalId};

/// Values supplied by the deployment engine at submit time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum PseudoParam {
    Region,
    AccountId,
}

impl PseudoParam {
    pub const ALL: [PseudoParam; 2] = [PseudoParam::Region, PseudoParam::AccountId];

    /// The engine-side name, usable as a `${...}` placeholder in sub templates.
    pub fn token(&self) -> &'static str {
        match self {
            PseudoParam::Region => "AWS::Region",
            PseudoParam::AccountId => "AWS::AccountId",
        }
    }
}

/// A typed reference from a descriptor attribute to another descriptor's
/// identity, one of its computed attributes, or an externally published
/// parameter. The engine wire forms are produced only at serialization.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum Expr {
    Literal(String),
    /// Identity of a descriptor in the same template.
    Ref(LogicalId),
    /// Computed attribute of a descriptor in the same template.
    GetAtt { id: LogicalId, attr: String },
    /// Late-bound lookup in the shared parameter store, resolved by the
    /// engine at submit time.
    Param(StorePath),
    Pseudo(PseudoParam),
    Sub(Sub),
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn get_att(id: &LogicalId, attr: impl Into<String>) -> Self {
        Expr::GetAtt {
            id: id.clone(),
            attr: attr.into(),
        }
    }

    /// Visit every local descriptor this expression references.
    pub fn visit_refs(&self, visit: &mut impl FnMut(&LogicalId)) {
        match self {
            Expr::Literal(_) | Expr::Param(_) | Expr::Pseudo(_) => {}
            Expr::Ref(id) | Expr::GetAtt { id, .. } => visit(id),
            Expr::Sub(sub) => {
                for value in sub.vars.values() {
                    value.visit_refs(visit);
                }
            }
        }
    }

    /// Visit every external store path this expression consumes.
    pub fn visit_params(&self, visit: &mut impl FnMut(&StorePath)) {
        match self {
            Expr::Literal(_) | Expr::Ref(_) | Expr::GetAtt { .. } | Expr::Pseudo(_) => {}
            Expr::Param(path) => visit(path),
            Expr::Sub(sub) => {
                for value in sub.vars.values() {
                    value.visit_params(visit);
                }
            }
        }
    }

    pub(crate) fn to_json(&self) -> Json {
        match self {
            Expr::Literal(value) => Json::String(value.clone()),
            Expr::Ref(id) => json!({ "Ref": id.as_str() }),
            Expr::GetAtt { id, attr } => json!({ "Fn::GetAtt": [id.as_str(), attr] }),
            Expr::Param(path) => Json::String(format!("{{{{resolve:ssm:{path}}}}}")),
            Expr::Pseudo(pseudo) => json!({ "Ref": pseudo.token() }),
            Expr::Sub(sub) => sub.to_json(),
        }
    }
}

impl From<&LogicalId> for Expr {
    fn from(id: &LogicalId) -> Self {
        Expr::Ref(id.clone())
    }
}

impl From<LogicalId> for Expr {
    fn from(id: LogicalId) -> Self {
        Expr::Ref(id)
    }
}

impl From<StorePath> for Expr {
    fn from(path: StorePath) -> Self {
        Expr::Param(path)
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::Literal(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::Literal(value)
    }
}

impl Serialize for Expr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

/// An interpolated string template with named variable bindings.
///
/// Every `${Name}` placeholder must be a pseudo parameter or bound in
/// `vars`, and every var must be used, checked at construction. Mismatched
/// interpolations are the classic source of silently over- or
/// under-permissive grants, so they are rejected here instead of surfacing
/// at invocation time.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub struct Sub {
    template: String,
    vars: BTreeMap<String, Expr>,
}

impl Sub {
    pub fn new(
        template: impl Into<String>,
        vars: impl IntoIterator<Item = (&'static str, Expr)>,
    ) -> Result<Self, Error> {
        let template = template.into();
        let vars: BTreeMap<String, Expr> = vars
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        let placeholders = scan_placeholders(&template)?;
        for name in &placeholders {
            if is_pseudo(name) {
                continue;
            }
            if !vars.contains_key(name.as_str()) {
                return Err(Error::UnboundSubVariable {
                    template,
                    name: name.clone(),
                });
            }
        }
        for name in vars.keys() {
            if !placeholders.contains(name.as_str()) {
                return Err(Error::UnusedSubVariable {
                    template,
                    name: name.clone(),
                });
            }
        }

        Ok(Self { template, vars })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn vars(&self) -> &BTreeMap<String, Expr> {
        &self.vars
    }

    fn to_json(&self) -> Json {
        if self.vars.is_empty() {
            return json!({ "Fn::Sub": self.template });
        }
        let vars: BTreeMap<&str, Json> = self
            .vars
            .iter()
            .map(|(name, value)| (name.as_str(), value.to_json()))
            .collect();
        json!({ "Fn::Sub": [self.template, vars] })
    }
}

impl From<Sub> for Expr {
    fn from(sub: Sub) -> Self {
        Expr::Sub(sub)
    }
}

fn is_pseudo(name: &str) -> bool {
    PseudoParam::ALL.iter().any(|p| p.token() == name)
}

fn scan_placeholders(template: &str) -> Result<BTreeSet<String>, Error> {
    let mut names = BTreeSet::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' || chars.peek() != Some(&'{') {
            continue;
        }
        chars.next(); // consume '{'

        let mut inner = String::new();
        let mut closed = false;
        for ic in chars.by_ref() {
            if ic == '}' {
                closed = true;
                break;
            }
            inner.push(ic);
        }
        if !closed {
            return Err(Error::UnterminatedPlaceholder {
                template: template.to_string(),
            });
        }
        names.insert(inner);
    }

    Ok(names)
}
