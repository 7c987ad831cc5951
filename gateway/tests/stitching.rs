//! End-to-end stitching scenarios against in-memory subschemas.

use futures::executor::block_on;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use weft_composer::ast::{Definition, OperationDefinition, Selection};
use weft_composer::print::print_document;
use weft_gateway::{
    parse_operation, stitch_schemas, stitching_directives_transform, AsyncExecutionResult,
    ExecutionResult, Executor, ExecutorResponse, FnExecutor, GraphQLError, JsonMap, OperationKind,
    PathSegment, Request, StitchConfig, Stitcher, SubschemaConfig, TransportError,
    STITCHING_DIRECTIVES_SDL,
};

/// The root field of a delegated sub-request plus its argument values.
fn root_call(request: &Request) -> (String, JsonMap) {
    for def in &request.document.definitions {
        let op = match def {
            Definition::Operation(op) => op,
            Definition::Fragment(_) => continue,
        };
        let selection_set = match op {
            OperationDefinition::SelectionSet(ss) => ss,
            OperationDefinition::Query(q) => &q.selection_set,
            OperationDefinition::Mutation(m) => &m.selection_set,
            OperationDefinition::Subscription(s) => &s.selection_set,
        };
        for item in &selection_set.items {
            if let Selection::Field(field) = item {
                let mut args = JsonMap::new();
                for (name, value) in &field.arguments {
                    args.insert(
                        name.clone(),
                        weft_gateway::values::graphql_value_to_json(value, &request.variables),
                    );
                }
                return (field.name.clone(), args);
            }
        }
    }
    panic!("sub-request without a root field");
}

type Handler = Box<dyn Fn(&str, &JsonMap) -> ExecutionResult + Send + Sync>;

fn recording_subschema(
    name: &str,
    sdl: &str,
    calls: Arc<Mutex<Vec<String>>>,
    handler: Handler,
) -> SubschemaConfig {
    let executor = FnExecutor(move |request: Request| {
        calls.lock().unwrap().push(print_document(&request.document));
        let (field, args) = root_call(&request);
        handler(&field, &args)
    });
    SubschemaConfig::new(name, sdl, Arc::new(executor))
}

fn subschema(name: &str, sdl: &str, handler: Handler) -> SubschemaConfig {
    recording_subschema(name, sdl, Arc::new(Mutex::new(vec![])), handler)
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn stitch_with_directives(subschemas: Vec<SubschemaConfig>) -> Stitcher {
    init_tracing();
    let mut config = StitchConfig::new(subschemas);
    config.subschema_config_transforms = vec![stitching_directives_transform()];
    stitch_schemas(config).expect("composition failed")
}

fn run(stitcher: &Stitcher, query: &str) -> ExecutionResult {
    run_with_variables(stitcher, query, JsonMap::new())
}

fn run_with_variables(stitcher: &Stitcher, query: &str, variables: JsonMap) -> ExecutionResult {
    let request = Request {
        document: parse_operation(query).unwrap(),
        variables,
        operation_name: None,
        operation_type: OperationKind::Query,
    };
    block_on(stitcher.execute(request))
}

fn directive_sdl(body: &str) -> String {
    format!("{}\n{}", STITCHING_DIRECTIVES_SDL, body)
}

#[test]
fn single_subschema_passthrough() {
    let a = subschema(
        "accounts",
        "type Query { viewer: User! } type User { id: ID! name: String! }",
        Box::new(|field, _args| {
            assert_eq!(field, "viewer");
            ExecutionResult::from_data(json!({
                "viewer": {"id": "1", "name": "Ada", "__typename": "User"}
            }))
        }),
    );
    let stitcher = stitch_schemas(StitchConfig::new(vec![a])).unwrap();
    let result = run(&stitcher, "{ viewer { id name } }");
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(
        result.data.unwrap(),
        json!({"viewer": {"id": "1", "name": "Ada"}})
    );
}

#[test]
fn two_subschema_merge_by_key() {
    let b_calls = Arc::new(Mutex::new(vec![]));
    let a = subschema(
        "names",
        &directive_sdl(
            r#"
            type Query { userById(id: ID!): User @merge(keyField: "id") }
            type User @key(selectionSet: "{ id }") { id: ID! name: String! }
            "#,
        ),
        Box::new(|field, args| {
            assert_eq!(field, "userById");
            assert_eq!(args["id"], json!("1"));
            ExecutionResult::from_data(json!({
                "userById": {"id": "1", "name": "Ada", "__typename": "User"}
            }))
        }),
    );
    let b = recording_subschema(
        "emails",
        &directive_sdl(
            r#"
            type Query { userById(id: ID!): User @merge(keyField: "id") }
            type User @key(selectionSet: "{ id }") { id: ID! email: String! }
            "#,
        ),
        Arc::clone(&b_calls),
        Box::new(|field, args| {
            assert_eq!(field, "userById");
            assert_eq!(args["id"], json!("1"));
            ExecutionResult::from_data(json!({
                "userById": {"id": "1", "email": "a@x", "__typename": "User"}
            }))
        }),
    );
    let stitcher = stitch_with_directives(vec![a, b]);
    let result = run(&stitcher, r#"{ userById(id: "1") { id name email } }"#);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(
        result.data.unwrap(),
        json!({"userById": {"id": "1", "name": "Ada", "email": "a@x"}})
    );

    // one planner round, one sub-request to the email subschema
    let calls = b_calls.lock().unwrap();
    assert_eq!(calls.len(), 1, "{:?}", calls);
    assert!(calls[0].contains("email"));
}

#[test]
fn merge_is_invariant_under_subschema_order() {
    fn names_side() -> SubschemaConfig {
        subschema(
            "names",
            &directive_sdl(
                r#"
                type Query { userById(id: ID!): User @merge(keyField: "id") }
                type User @key(selectionSet: "{ id }") { id: ID! name: String! }
                "#,
            ),
            Box::new(|_, _| {
                ExecutionResult::from_data(json!({
                    "userById": {"id": "1", "name": "Ada", "__typename": "User"}
                }))
            }),
        )
    }
    fn emails_side() -> SubschemaConfig {
        subschema(
            "emails",
            &directive_sdl(
                r#"
                type Query { userById(id: ID!): User @merge(keyField: "id") }
                type User @key(selectionSet: "{ id }") { id: ID! email: String! }
                "#,
            ),
            Box::new(|_, _| {
                ExecutionResult::from_data(json!({
                    "userById": {"id": "1", "email": "a@x", "__typename": "User"}
                }))
            }),
        )
    }

    let query = r#"{ userById(id: "1") { id name email } }"#;
    let forward = run(&stitch_with_directives(vec![names_side(), emails_side()]), query);
    let reversed = run(&stitch_with_directives(vec![emails_side(), names_side()]), query);
    assert!(forward.errors.is_empty(), "{:?}", forward.errors);
    assert!(reversed.errors.is_empty(), "{:?}", reversed.errors);
    assert_eq!(forward.data, reversed.data);
}

#[test]
fn computed_field_dependency() {
    let a = subschema(
        "people",
        &directive_sdl(
            r#"
            type Query { userById(id: ID!): User @merge(keyField: "id") }
            type User @key(selectionSet: "{ id }") {
              id: ID!
              firstName: String!
              lastName: String!
            }
            "#,
        ),
        Box::new(|field, args| {
            assert_eq!(field, "userById");
            assert_eq!(args["id"], json!("1"));
            ExecutionResult::from_data(json!({
                "userById": {
                    "id": "1",
                    "firstName": "Ada",
                    "lastName": "Lovelace",
                    "__typename": "User"
                }
            }))
        }),
    );
    let b = subschema(
        "profiles",
        &directive_sdl(
            r#"
            type Query { userByRep(rep: UserInput!): User @merge(keyArg: "rep") }
            input UserInput { id: ID firstName: String lastName: String }
            type User @key(selectionSet: "{ id }") {
              id: ID!
              fullName: String @computed(selectionSet: "{ firstName lastName }")
            }
            "#,
        ),
        Box::new(|field, args| {
            assert_eq!(field, "userByRep");
            let rep = args["rep"].as_object().unwrap();
            // the representation carries the computed field's dependencies
            let full_name = format!(
                "{} {}",
                rep["firstName"].as_str().unwrap(),
                rep["lastName"].as_str().unwrap()
            );
            ExecutionResult::from_data(json!({
                "userByRep": {"fullName": full_name, "__typename": "User"}
            }))
        }),
    );
    let stitcher = stitch_with_directives(vec![a, b]);
    let result = run(&stitcher, r#"{ userById(id: "1") { fullName } }"#);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(
        result.data.unwrap(),
        json!({"userById": {"fullName": "Ada Lovelace"}})
    );
}

#[test]
fn abstract_spreads_are_stripped_to_target_implementations() {
    let book_calls = Arc::new(Mutex::new(vec![]));
    let books = recording_subschema(
        "books",
        r#"
        type Query { book: Book }
        interface Book { id: ID! }
        type TextBook implements Book { id: ID! text: String }
        "#,
        Arc::clone(&book_calls),
        Box::new(|field, _| {
            assert_eq!(field, "book");
            ExecutionResult::from_data(json!({
                "book": {"id": "1", "text": "intro", "__typename": "TextBook"}
            }))
        }),
    );
    let coloring = subschema(
        "coloring",
        r#"
        type Query { coloringBooks: [ColoringBook] }
        interface Book { id: ID! }
        type ColoringBook implements Book { id: ID! colors: [String] }
        "#,
        Box::new(|_, _| ExecutionResult::from_data(json!({"coloringBooks": []}))),
    );
    let stitcher = stitch_schemas(StitchConfig::new(vec![books, coloring])).unwrap();
    let result = run(
        &stitcher,
        "{ book { id ... on TextBook { text } ... on ColoringBook { colors } } }",
    );
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(
        result.data.unwrap(),
        json!({"book": {"id": "1", "text": "intro"}})
    );
    // the implementation unknown to the target never reaches it
    let calls = book_calls.lock().unwrap();
    assert!(calls[0].contains("TextBook"));
    assert!(!calls[0].contains("ColoringBook"));
}

struct DeferExecutor;

#[async_trait::async_trait]
impl Executor for DeferExecutor {
    async fn execute(&self, _request: Request) -> Result<ExecutorResponse, TransportError> {
        let items = vec![
            AsyncExecutionResult {
                data: Some(json!({"viewer": {"name": "Ada", "__typename": "User"}})),
                path: None,
                label: None,
                errors: vec![],
                has_next: true,
            },
            AsyncExecutionResult {
                data: Some(json!({"age": 42})),
                path: Some(vec![PathSegment::field("viewer")]),
                label: Some("defer-age".to_string()),
                errors: vec![],
                has_next: false,
            },
        ];
        Ok(ExecutorResponse::Stream(Box::pin(futures::stream::iter(
            items,
        ))))
    }
}

#[test]
fn deferred_patches_reach_waiting_resolvers() {
    let deferred = SubschemaConfig::new(
        "deferred",
        "type Query { viewer: User } type User { name: String age: Int }",
        Arc::new(DeferExecutor),
    );
    let stitcher = stitch_schemas(StitchConfig::new(vec![deferred])).unwrap();
    let result = run(&stitcher, "{ viewer { name age } }");
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(
        result.data.unwrap(),
        json!({"viewer": {"name": "Ada", "age": 42}})
    );
}

#[test]
fn planner_dead_end_resolves_nullable_fields_to_null() {
    let score_calls = Arc::new(Mutex::new(vec![]));
    let a = subschema(
        "people",
        &directive_sdl(
            r#"
            type Query { userById(id: ID!): User @merge(keyField: "id") }
            type User @key(selectionSet: "{ id }") { id: ID! name: String }
            "#,
        ),
        Box::new(|_, _| {
            ExecutionResult::from_data(json!({
                "userById": {"id": "1", "name": "Ada", "__typename": "User"}
            }))
        }),
    );
    // scores join on email, which nobody can supply
    let c = recording_subschema(
        "scores",
        &directive_sdl(
            r#"
            type Query { userByEmail(email: String!): User @merge(keyField: "email") }
            type User @key(selectionSet: "{ email }") { email: String score: Int }
            "#,
        ),
        Arc::clone(&score_calls),
        Box::new(|_, _| ExecutionResult::from_data(json!({"userByEmail": null}))),
    );
    let stitcher = stitch_with_directives(vec![a, c]);
    let result = run(&stitcher, r#"{ userById(id: "1") { score } }"#);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.data.unwrap(), json!({"userById": {"score": null}}));
    assert!(score_calls.lock().unwrap().is_empty());
}

#[test]
fn planner_dead_end_on_non_null_fields_raises_and_bubbles() {
    let a = subschema(
        "people",
        &directive_sdl(
            r#"
            type Query { userById(id: ID!): User @merge(keyField: "id") }
            type User @key(selectionSet: "{ id }") { id: ID! name: String }
            "#,
        ),
        Box::new(|_, _| {
            ExecutionResult::from_data(json!({
                "userById": {"id": "1", "__typename": "User"}
            }))
        }),
    );
    let c = subschema(
        "scores",
        &directive_sdl(
            r#"
            type Query { userByEmail(email: String!): User @merge(keyField: "email") }
            type User @key(selectionSet: "{ email }") { email: String score: Int! }
            "#,
        ),
        Box::new(|_, _| ExecutionResult::from_data(json!({"userByEmail": null}))),
    );
    let stitcher = stitch_with_directives(vec![a, c]);
    let result = run(&stitcher, r#"{ userById(id: "1") { score } }"#);
    assert_eq!(result.data.unwrap(), json!({"userById": null}));
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("non-nullable"));
    assert_eq!(
        result.errors[0].path.as_ref().unwrap(),
        &vec![PathSegment::field("userById"), PathSegment::field("score")]
    );
}

#[test]
fn sibling_fields_coalesce_into_one_sub_request() {
    let b_calls = Arc::new(Mutex::new(vec![]));
    let a = subschema(
        "names",
        &directive_sdl(
            r#"
            type Query { userById(id: ID!): User @merge(keyField: "id") }
            type User @key(selectionSet: "{ id }") { id: ID! name: String }
            "#,
        ),
        Box::new(|_, _| {
            ExecutionResult::from_data(json!({
                "userById": {"id": "1", "name": "Ada", "__typename": "User"}
            }))
        }),
    );
    let b = recording_subschema(
        "contact",
        &directive_sdl(
            r#"
            type Query { userById(id: ID!): User @merge(keyField: "id") }
            type User @key(selectionSet: "{ id }") {
              id: ID!
              email: String
              phone: String
            }
            "#,
        ),
        Arc::clone(&b_calls),
        Box::new(|_, _| {
            ExecutionResult::from_data(json!({
                "userById": {
                    "id": "1",
                    "email": "a@x",
                    "phone": "555",
                    "__typename": "User"
                }
            }))
        }),
    );
    let stitcher = stitch_with_directives(vec![a, b]);
    let result = run(&stitcher, r#"{ userById(id: "1") { name email phone } }"#);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(
        result.data.unwrap(),
        json!({"userById": {"name": "Ada", "email": "a@x", "phone": "555"}})
    );

    // both missing fields ride one coalesced planner round
    let calls = b_calls.lock().unwrap();
    assert_eq!(calls.len(), 1, "{:?}", calls);
    assert!(calls[0].contains("email"));
    assert!(calls[0].contains("phone"));
}

#[test]
fn mutations_run_serially_in_document_order() {
    let log = Arc::new(Mutex::new(vec![]));
    let log_a = Arc::clone(&log);
    let log_b = Arc::clone(&log);
    let a = subschema(
        "counter",
        "type Query { value: Int } type Mutation { bump: Int }",
        Box::new(move |field, _| {
            log_a.lock().unwrap().push(format!("counter.{}", field));
            ExecutionResult::from_data(json!({"bump": 1}))
        }),
    );
    let b = subschema(
        "audit",
        "type Query { entries: Int } type Mutation { record: Boolean }",
        Box::new(move |field, _| {
            log_b.lock().unwrap().push(format!("audit.{}", field));
            ExecutionResult::from_data(json!({"record": true}))
        }),
    );
    let stitcher = stitch_schemas(StitchConfig::new(vec![a, b])).unwrap();
    let request = Request {
        document: parse_operation("mutation { bump record }").unwrap(),
        variables: JsonMap::new(),
        operation_name: None,
        operation_type: OperationKind::Mutation,
    };
    let result = block_on(stitcher.execute(request));
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.data.unwrap(), json!({"bump": 1, "record": true}));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["counter.bump".to_string(), "audit.record".to_string()]
    );
}

#[test]
fn aliases_and_variables_flow_through_delegation() {
    let a = subschema(
        "accounts",
        "type Query { userById(id: ID!): User } type User { id: ID! name: String }",
        Box::new(|field, args| {
            assert_eq!(field, "userById");
            assert_eq!(args["id"], json!("7"));
            // a real subschema keys its response by alias
            ExecutionResult::from_data(json!({
                "userById": {"id": "7", "renamed": "Grace", "__typename": "User"}
            }))
        }),
    );
    let stitcher = stitch_schemas(StitchConfig::new(vec![a])).unwrap();
    let mut variables = JsonMap::new();
    variables.insert("id".to_string(), json!("7"));
    let result = run_with_variables(
        &stitcher,
        "query($id: ID!) { u: userById(id: $id) { renamed: name } }",
        variables,
    );
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.data.unwrap(), json!({"u": {"renamed": "Grace"}}));
}

#[test]
fn pathed_sub_errors_extend_the_delegation_path() {
    let a = subschema(
        "accounts",
        "type Query { viewer: User } type User { id: ID! name: String }",
        Box::new(|_, _| ExecutionResult {
            data: Some(json!({"viewer": {"id": "1", "name": null, "__typename": "User"}})),
            errors: vec![GraphQLError::new("name backend down").located(vec![
                PathSegment::field("viewer"),
                PathSegment::field("name"),
            ])],
        }),
    );
    let stitcher = stitch_schemas(StitchConfig::new(vec![a])).unwrap();
    let result = run(&stitcher, "{ viewer { id name } }");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors[0].path.as_ref().unwrap(),
        &vec![PathSegment::field("viewer"), PathSegment::field("name")]
    );
    assert_eq!(
        result.data.unwrap(),
        json!({"viewer": {"id": "1", "name": null}})
    );
}

#[test]
fn unpathed_sub_errors_relocate_to_the_first_field_read() {
    let a = subschema(
        "accounts",
        "type Query { viewer: User } type User { id: ID! }",
        Box::new(|_, _| ExecutionResult {
            data: Some(json!({"viewer": {"id": "1", "__typename": "User"}})),
            errors: vec![GraphQLError::new("partial failure")],
        }),
    );
    let stitcher = stitch_schemas(StitchConfig::new(vec![a])).unwrap();
    let result = run(&stitcher, "{ viewer { id } }");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, "partial failure");
    assert_eq!(
        result.errors[0].path.as_ref().unwrap(),
        &vec![PathSegment::field("viewer"), PathSegment::field("id")]
    );
    assert_eq!(result.data.unwrap(), json!({"viewer": {"id": "1"}}));
}

#[test]
fn transport_failures_become_located_errors() {
    struct FailingExecutor;

    #[async_trait::async_trait]
    impl Executor for FailingExecutor {
        async fn execute(&self, _request: Request) -> Result<ExecutorResponse, TransportError> {
            Err(TransportError("connection refused".to_string()))
        }
    }

    let a = SubschemaConfig::new(
        "flaky",
        "type Query { viewer: User } type User { id: ID! }",
        Arc::new(FailingExecutor),
    );
    let stitcher = stitch_schemas(StitchConfig::new(vec![a])).unwrap();
    let result = run(&stitcher, "{ viewer { id } }");
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("connection refused"));
    assert_eq!(
        result.errors[0].path.as_ref().unwrap(),
        &vec![PathSegment::field("viewer")]
    );
    assert_eq!(result.data.unwrap(), json!({"viewer": null}));
}

#[test]
fn failed_merge_sources_surface_per_field_located_errors() {
    let a = subschema(
        "names",
        &directive_sdl(
            r#"
            type Query { userById(id: ID!): User @merge(keyField: "id") }
            type User @key(selectionSet: "{ id }") { id: ID! name: String }
            "#,
        ),
        Box::new(|_, _| {
            ExecutionResult::from_data(json!({
                "userById": {"id": "1", "name": "Ada", "__typename": "User"}
            }))
        }),
    );

    struct FailingExecutor;

    #[async_trait::async_trait]
    impl Executor for FailingExecutor {
        async fn execute(&self, _request: Request) -> Result<ExecutorResponse, TransportError> {
            Err(TransportError("emails offline".to_string()))
        }
    }

    let b = SubschemaConfig::new(
        "emails",
        &directive_sdl(
            r#"
            type Query { userById(id: ID!): User @merge(keyField: "id") }
            type User @key(selectionSet: "{ id }") { id: ID! email: String }
            "#,
        ),
        Arc::new(FailingExecutor),
    );
    let stitcher = stitch_with_directives(vec![a, b]);
    let result = run(&stitcher, r#"{ userById(id: "1") { name email } }"#);
    assert_eq!(
        result.data.unwrap(),
        json!({"userById": {"name": "Ada", "email": null}})
    );
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("emails offline"));
    assert_eq!(
        result.errors[0].path.as_ref().unwrap(),
        &vec![PathSegment::field("userById")]
    );
}

#[test]
fn transform_contexts_carry_state_between_request_and_result() {
    use weft_gateway::{DelegationError, Transform, TransformContext};

    /// Records the delegated field on the way out, stamps it back on the
    /// way in.
    struct StampTransform;

    impl Transform for StampTransform {
        fn new_context(&self) -> Box<dyn std::any::Any + Send> {
            Box::new(String::new())
        }

        fn transform_request(
            &self,
            request: Request,
            cx: &mut TransformContext<'_>,
        ) -> Result<Request, DelegationError> {
            if let Some(state) = cx.state.downcast_mut::<String>() {
                *state = cx.delegation.field_name.clone();
            }
            Ok(request)
        }

        fn transform_result(
            &self,
            mut result: ExecutionResult,
            cx: &mut TransformContext<'_>,
        ) -> ExecutionResult {
            let stamp = cx
                .state
                .downcast_ref::<String>()
                .cloned()
                .unwrap_or_default();
            if let Some(Value::Object(data)) = result.data.as_mut() {
                if let Some(Value::Object(viewer)) = data.get_mut("viewer") {
                    viewer.insert("stamp".to_string(), json!(stamp));
                }
            }
            result
        }
    }

    let mut a = subschema(
        "accounts",
        "type Query { viewer: User } type User { id: ID! stamp: String }",
        Box::new(|_, _| {
            ExecutionResult::from_data(json!({
                "viewer": {"id": "1", "__typename": "User"}
            }))
        }),
    );
    a.transforms.push(Arc::new(StampTransform));
    let stitcher = stitch_schemas(StitchConfig::new(vec![a])).unwrap();
    let result = run(&stitcher, "{ viewer { id stamp } }");
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(
        result.data.unwrap(),
        json!({"viewer": {"id": "1", "stamp": "viewer"}})
    );
}

#[test]
fn composed_sdl_exposes_the_merged_surface() {
    let a = subschema(
        "names",
        "type Query { me: User } type User { id: ID! name: String }",
        Box::new(|_, _| ExecutionResult::from_data(json!({}))),
    );
    let b = subschema(
        "emails",
        "type Query { userById(id: ID!): User } type User { id: ID! email: String }",
        Box::new(|_, _| ExecutionResult::from_data(json!({}))),
    );
    let stitcher = stitch_schemas(StitchConfig::new(vec![a, b])).unwrap();
    let sdl = stitcher.sdl();
    assert!(sdl.contains("name: String"));
    assert!(sdl.contains("email: String"));
    assert!(sdl.contains("userById"));
    assert!(sdl.contains("me: User"));
}
