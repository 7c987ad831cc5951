//! Lifts the delegation's arguments into variables on the target root field,
//! typed from the target schema's field definition.

use super::{
    operation_selection_set_mut, root_type_name, split_document, join_document, Transform,
    TransformContext,
};
use crate::error::DelegationError;
use crate::wire::Request;
use weft_composer::ast::*;

pub struct AddArgumentsAsVariables;

impl Transform for AddArgumentsAsVariables {
    fn transform_request(
        &self,
        mut request: Request,
        cx: &mut TransformContext<'_>,
    ) -> Result<Request, DelegationError> {
        if cx.delegation.args.is_empty() {
            return Ok(request);
        }
        let target = &cx.delegation.subschema.transformed_schema;
        let root = match root_type_name(target, cx.delegation.operation) {
            Some(root) => root.to_string(),
            None => return Ok(request),
        };
        let field_def = match target.field_def(&root, &cx.delegation.field_name) {
            Some(def) => def.clone(),
            None => return Ok(request),
        };

        let (mut operations, fragments) = split_document(std::mem::replace(
            &mut request.document,
            QueryDocument { definitions: vec![] },
        ));

        for op in operations.iter_mut() {
            let mut new_definitions: Vec<VariableDefinition> = vec![];
            for item in operation_selection_set_mut(op).items.iter_mut() {
                let field = match item {
                    Selection::Field(field) if field.name == cx.delegation.field_name => field,
                    _ => continue,
                };
                for (index, (name, value)) in cx.delegation.args.iter().enumerate() {
                    let arg_def = match field_def.arguments.iter().find(|a| &a.name == name) {
                        Some(def) => def,
                        // arguments the target does not declare are dropped
                        None => continue,
                    };
                    let variable = format!("_v{}_{}", index, name);
                    field.arguments.retain(|(existing, _)| existing != name);
                    field
                        .arguments
                        .push((name.clone(), GraphValue::Variable(variable.clone())));
                    new_definitions.push(VariableDefinition {
                        position: pos(),
                        name: variable.clone(),
                        var_type: arg_def.value_type.clone(),
                        default_value: None,
                    });
                    request.variables.insert(variable, value.clone());
                }
            }
            if !new_definitions.is_empty() {
                if matches!(op, OperationDefinition::SelectionSet(_)) {
                    // a bare selection-set operation cannot carry variable
                    // definitions; promote it to a query
                    let selection_set =
                        std::mem::replace(operation_selection_set_mut(op), SelectionSet {
                            span: span(),
                            items: vec![],
                        });
                    *op = OperationDefinition::Query(QueryOperation {
                        position: pos(),
                        name: None,
                        variable_definitions: new_definitions,
                        directives: vec![],
                        selection_set,
                    });
                } else if let Some(defs) = super::variable_definitions_mut(op) {
                    defs.extend(new_definitions);
                }
            }
        }

        request.document = join_document(operations, fragments);
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    // exercised end-to-end in tests/stitching.rs, where delegated root
    // fields carry their arguments through variables
}
