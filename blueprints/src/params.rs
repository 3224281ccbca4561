use trimana_graph::{Expr, LogicalId, Template};
use trimana_store::{ParameterStore, StorePath};

use crate::{
    Error,
    resources::{ResourceSpec, ssm},
};

/// Well-known shared parameter paths. Produced by earlier graphs, consumed
/// by later ones as late-bound lookup tokens.
pub const API_ID: &str = "/trimana/dashboard/api/id";
pub const API_PARENT_RESOURCE_ID: &str = "/trimana/dashboard/api/parent/resource/id";
pub const POYNT_RESOURCE_ID: &str = "/trimana/dashboard/poynt/resource/id";
pub const PAYROLL_RESOURCE_ID: &str = "/trimana/dashboard/payroll/resource/id";

/// Publish `value` under `path`: adds the parameter descriptor to the graph
/// and records the publication in the injected store so deploy-order
/// dependencies stay visible to plan validation.
///
/// The store value is the serialized expression, a build-time stand-in for
/// the identifier the engine materializes at deploy time.
pub fn publish(
    template: &mut Template,
    store: &mut dyn ParameterStore,
    id: LogicalId,
    path: &str,
    value: Expr,
) -> Result<(), Error> {
    let path: StorePath = path.parse()?;
    let stand_in = serde_json::to_string(&value).expect("expressions serialize to JSON");

    template.add_resource(
        ssm::Parameter {
            name: path.clone(),
            value: value.clone(),
        }
        .into_resource(id),
    )?;

    if store.put(path.clone(), stand_in).is_some() {
        return Err(Error::DuplicateParameter { path });
    }
    Ok(())
}
