//! Wire types exchanged with subschema executors: requests, results,
//! deferred patches, and GraphQL-shaped errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use weft_composer::ast::QueryDocument;
use weft_composer::OperationKind;

pub type JsonMap = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Field(String),
}

impl PathSegment {
    pub fn field(name: impl Into<String>) -> Self {
        PathSegment::Field(name.into())
    }

    pub fn as_field(&self) -> Option<&str> {
        match self {
            PathSegment::Field(name) => Some(name),
            PathSegment::Index(_) => None,
        }
    }
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ErrorLocation {
    pub line: u64,
    pub column: u64,
}

/// Standard GraphQL-shaped error surfaced at the composed-schema level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphQLError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<ErrorLocation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<JsonMap>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        GraphQLError {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }

    /// Relocates the error to `path`, dropping any previous path.
    pub fn located(mut self, path: Vec<PathSegment>) -> Self {
        self.path = Some(path);
        self
    }

    /// Extends the error's path on the left with the delegation path.
    pub fn prepend_path(&mut self, prefix: &[PathSegment]) {
        let mut path = prefix.to_vec();
        if let Some(existing) = self.path.take() {
            path.extend(existing);
        }
        self.path = Some(path);
    }
}

/// A request bound for a subschema executor.
#[derive(Debug, Clone)]
pub struct Request {
    pub document: QueryDocument,
    pub variables: JsonMap,
    pub operation_name: Option<String>,
    pub operation_type: OperationKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl ExecutionResult {
    pub fn from_data(data: Value) -> Self {
        ExecutionResult {
            data: Some(data),
            errors: vec![],
        }
    }

    pub fn from_errors(errors: Vec<GraphQLError>) -> Self {
        ExecutionResult { data: None, errors }
    }
}

/// One item of a patch stream: the first item is the initial result, later
/// items are deferred patches at `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncExecutionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
    #[serde(rename = "hasNext")]
    pub has_next: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_segments_serialize_as_strings_and_numbers() {
        let error = GraphQLError::new("boom").located(vec![
            PathSegment::field("viewer"),
            PathSegment::Index(0),
            PathSegment::field("name"),
        ]);
        let serialized = serde_json::to_value(&error).unwrap();
        assert_eq!(serialized["path"], json!(["viewer", 0, "name"]));

        let parsed: GraphQLError = serde_json::from_value(serialized).unwrap();
        assert_eq!(parsed.path.unwrap()[1], PathSegment::Index(0));
    }

    #[test]
    fn prepend_path_extends_on_the_left() {
        let mut error = GraphQLError::new("boom").located(vec![PathSegment::field("name")]);
        error.prepend_path(&[PathSegment::field("userById")]);
        assert_eq!(
            error.path.unwrap(),
            vec![PathSegment::field("userById"), PathSegment::field("name")]
        );
    }

    #[test]
    fn execution_results_omit_empty_errors() {
        let result = ExecutionResult::from_data(json!({"ok": true}));
        let serialized = serde_json::to_string(&result).unwrap();
        assert_eq!(serialized, r#"{"data":{"ok":true}}"#);
    }
}
