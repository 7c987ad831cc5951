//! Conversions between GraphQL literal values and JSON, including variable
//! resolution for argument evaluation.

use crate::wire::JsonMap;
use serde_json::{Number, Value};
use weft_composer::ast::GraphValue;

/// Evaluates a GraphQL literal to JSON, resolving variables from `variables`.
/// Unknown variables evaluate to null.
pub fn graphql_value_to_json(value: &GraphValue, variables: &JsonMap) -> Value {
    match value {
        GraphValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
        GraphValue::Int(num) => num
            .as_i64()
            .map(|i| Value::Number(Number::from(i)))
            .unwrap_or(Value::Null),
        GraphValue::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        GraphValue::String(s) => Value::String(s.clone()),
        GraphValue::Boolean(b) => Value::Bool(*b),
        GraphValue::Null => Value::Null,
        GraphValue::Enum(name) => Value::String(name.clone()),
        GraphValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| graphql_value_to_json(item, variables))
                .collect(),
        ),
        GraphValue::Object(fields) => {
            let mut map = JsonMap::new();
            for (name, value) in fields {
                map.insert(name.clone(), graphql_value_to_json(value, variables));
            }
            Value::Object(map)
        }
    }
}

/// Renders a JSON value as a GraphQL literal.
pub fn json_to_graphql_value(value: &Value) -> GraphValue {
    match value {
        Value::Null => GraphValue::Null,
        Value::Bool(b) => GraphValue::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if i >= i64::from(i32::MIN) && i <= i64::from(i32::MAX) {
                    GraphValue::Int((i as i32).into())
                } else {
                    GraphValue::Float(i as f64)
                }
            } else {
                GraphValue::Float(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => GraphValue::String(s.clone()),
        Value::Array(items) => GraphValue::List(items.iter().map(json_to_graphql_value).collect()),
        Value::Object(map) => {
            let mut fields = std::collections::BTreeMap::new();
            for (name, value) in map {
                fields.insert(name.clone(), json_to_graphql_value(value));
            }
            GraphValue::Object(fields)
        }
    }
}

/// Reads a dotted path out of a JSON object.
pub fn get_path<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Writes `value` at a dotted path, creating intermediate objects.
pub fn set_path(target: &mut JsonMap, path: &[String], value: Value) {
    if path.is_empty() {
        return;
    }
    if path.len() == 1 {
        target.insert(path[0].clone(), value);
        return;
    }
    let entry = target
        .entry(path[0].clone())
        .or_insert_with(|| Value::Object(JsonMap::new()));
    if !entry.is_object() {
        *entry = Value::Object(JsonMap::new());
    }
    if let Value::Object(inner) = entry {
        set_path(inner, &path[1..], value);
    }
}
