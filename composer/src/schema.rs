//! An indexed, owned schema. Both the subschemas and the composed schema are
//! handled through [`SchemaIndex`]: name-to-type lookup, operation roots,
//! possible types for abstract types, and field resolution.

use crate::ast::*;
use crate::error::ConfigurationError;
use graphql_parser::schema::Definition as SchemaDefinition;
use linked_hash_map::LinkedHashMap;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct SchemaIndex {
    types: LinkedHashMap<String, TypeDefinition>,
    directives: LinkedHashMap<String, DirectiveDefinition>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    possible: HashMap<String, Vec<String>>,
}

impl SchemaIndex {
    pub fn parse(sdl: &str) -> Result<Self, ConfigurationError> {
        let doc = graphql_parser::parse_schema::<String>(sdl)
            .map_err(|e| ConfigurationError::InvalidSchema(e.to_string()))?
            .into_static();
        Self::from_document(doc)
    }

    pub fn from_document(doc: SchemaDocument) -> Result<Self, ConfigurationError> {
        let mut types: LinkedHashMap<String, TypeDefinition> = LinkedHashMap::new();
        let mut directives = LinkedHashMap::new();
        let mut roots: Option<(Option<String>, Option<String>, Option<String>)> = None;
        let mut extensions = vec![];

        for def in doc.definitions {
            match def {
                SchemaDefinition::SchemaDefinition(sd) => {
                    if roots.is_some() {
                        return Err(ConfigurationError::DuplicateSchemaDefinition);
                    }
                    roots = Some((sd.query, sd.mutation, sd.subscription));
                }
                SchemaDefinition::TypeDefinition(td) => {
                    let name = type_definition_name(&td).to_string();
                    if types.insert(name.clone(), td).is_some() {
                        return Err(ConfigurationError::DuplicateTypeName(name));
                    }
                }
                SchemaDefinition::TypeExtension(ext) => extensions.push(ext),
                SchemaDefinition::DirectiveDefinition(dd) => {
                    directives.insert(dd.name.clone(), dd);
                }
            }
        }

        for ext in extensions {
            apply_extension(&mut types, ext)?;
        }

        let (query_type, mutation_type, subscription_type) = match roots {
            Some(explicit) => explicit,
            None => (
                default_root(&types, QUERY_TYPE_NAME),
                default_root(&types, MUTATION_TYPE_NAME),
                default_root(&types, SUBSCRIPTION_TYPE_NAME),
            ),
        };

        let possible = compute_possible_types(&types);

        Ok(SchemaIndex {
            types,
            directives,
            query_type,
            mutation_type,
            subscription_type,
            possible,
        })
    }

    /// Assembles an index from already-merged parts and validates that every
    /// type reference resolves (the "rewire" pass: graphql-parser ASTs refer
    /// to types by name, so consistency is name resolution).
    pub fn from_parts(
        types: LinkedHashMap<String, TypeDefinition>,
        directives: LinkedHashMap<String, DirectiveDefinition>,
        query_type: Option<String>,
        mutation_type: Option<String>,
        subscription_type: Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let possible = compute_possible_types(&types);
        let index = SchemaIndex {
            types,
            directives,
            query_type,
            mutation_type,
            subscription_type,
            possible,
        };
        index.validate_references()?;
        Ok(index)
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn types(&self) -> impl Iterator<Item = (&String, &TypeDefinition)> {
        self.types.iter()
    }

    pub fn directive_definitions(&self) -> impl Iterator<Item = (&String, &DirectiveDefinition)> {
        self.directives.iter()
    }

    pub fn query_type(&self) -> Option<&str> {
        self.query_type.as_deref()
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn subscription_type(&self) -> Option<&str> {
        self.subscription_type.as_deref()
    }

    /// Fields of an object or interface type.
    pub fn type_fields(&self, name: &str) -> Option<&[SchemaField]> {
        match self.types.get(name) {
            Some(TypeDefinition::Object(obj)) => Some(&obj.fields),
            Some(TypeDefinition::Interface(iface)) => Some(&iface.fields),
            _ => None,
        }
    }

    pub fn field_def(&self, type_name: &str, field_name: &str) -> Option<&SchemaField> {
        if field_name == TYPENAME_FIELD {
            return Some(typename_field_def());
        }
        self.type_fields(type_name)?
            .iter()
            .find(|f| f.name == field_name)
    }

    /// Concrete object types a value of `name` may be at runtime.
    pub fn possible_types(&self, name: &str) -> &[String] {
        static EMPTY: [String; 0] = [];
        self.possible.get(name).map(Vec::as_slice).unwrap_or(&EMPTY)
    }

    pub fn is_abstract(&self, name: &str) -> bool {
        matches!(
            self.types.get(name),
            Some(TypeDefinition::Interface(_)) | Some(TypeDefinition::Union(_))
        )
    }

    pub fn is_composite(&self, name: &str) -> bool {
        matches!(
            self.types.get(name),
            Some(TypeDefinition::Object(_))
                | Some(TypeDefinition::Interface(_))
                | Some(TypeDefinition::Union(_))
        )
    }

    pub fn is_object(&self, name: &str) -> bool {
        matches!(self.types.get(name), Some(TypeDefinition::Object(_)))
    }

    pub fn is_input_type(&self, name: &str) -> bool {
        is_specified_scalar(name)
            || matches!(
                self.types.get(name),
                Some(TypeDefinition::Scalar(_))
                    | Some(TypeDefinition::Enum(_))
                    | Some(TypeDefinition::InputObject(_))
            )
    }

    /// Drops fields of an object or interface type that `keep` rejects.
    pub fn filter_type_fields(&mut self, type_name: &str, keep: &dyn Fn(&SchemaField) -> bool) {
        match self.types.get_mut(type_name) {
            Some(TypeDefinition::Object(obj)) => obj.fields.retain(|f| keep(f)),
            Some(TypeDefinition::Interface(iface)) => iface.fields.retain(|f| keep(f)),
            _ => {}
        }
    }

    /// Renders the index back to a schema document.
    pub fn to_document(&self) -> SchemaDocument {
        let mut definitions = vec![];
        if self.query_type.is_some()
            || self.mutation_type.is_some()
            || self.subscription_type.is_some()
        {
            definitions.push(SchemaDefinition::SchemaDefinition(SchemaDefinitionNode {
                position: pos(),
                directives: vec![],
                query: self.query_type.clone(),
                mutation: self.mutation_type.clone(),
                subscription: self.subscription_type.clone(),
            }));
        }
        for dd in self.directives.values() {
            definitions.push(SchemaDefinition::DirectiveDefinition(dd.clone()));
        }
        for td in self.types.values() {
            definitions.push(SchemaDefinition::TypeDefinition(td.clone()));
        }
        SchemaDocument { definitions }
    }

    fn validate_references(&self) -> Result<(), ConfigurationError> {
        let check = |name: &str| -> Result<(), ConfigurationError> {
            if is_specified_scalar(name) || self.types.contains_key(name) {
                Ok(())
            } else {
                Err(ConfigurationError::UnknownType(name.to_string()))
            }
        };
        let check_type = |t: &GraphType| check(named_type(t));

        for td in self.types.values() {
            match td {
                TypeDefinition::Object(obj) => {
                    for iface in &obj.implements_interfaces {
                        check(iface)?;
                    }
                    for field in &obj.fields {
                        check_type(&field.field_type)?;
                        for arg in &field.arguments {
                            check_type(&arg.value_type)?;
                        }
                    }
                }
                TypeDefinition::Interface(iface) => {
                    for field in &iface.fields {
                        check_type(&field.field_type)?;
                        for arg in &field.arguments {
                            check_type(&arg.value_type)?;
                        }
                    }
                }
                TypeDefinition::Union(un) => {
                    for member in &un.types {
                        check(member)?;
                    }
                }
                TypeDefinition::InputObject(io) => {
                    for field in &io.fields {
                        check_type(&field.value_type)?;
                    }
                }
                TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) => {}
            }
        }
        Ok(())
    }
}

fn default_root(types: &LinkedHashMap<String, TypeDefinition>, name: &str) -> Option<String> {
    if types.contains_key(name) {
        Some(name.to_string())
    } else {
        None
    }
}

fn apply_extension(
    types: &mut LinkedHashMap<String, TypeDefinition>,
    ext: TypeExtension,
) -> Result<(), ConfigurationError> {
    use graphql_parser::schema::TypeExtension as Ext;
    match ext {
        Ext::Object(ext) => match types.get_mut(&ext.name) {
            Some(TypeDefinition::Object(obj)) => {
                obj.fields.extend(ext.fields);
                obj.directives.extend(ext.directives);
                for iface in ext.implements_interfaces {
                    if !obj.implements_interfaces.contains(&iface) {
                        obj.implements_interfaces.push(iface);
                    }
                }
                Ok(())
            }
            _ => Err(ConfigurationError::UnknownType(ext.name)),
        },
        Ext::Interface(ext) => match types.get_mut(&ext.name) {
            Some(TypeDefinition::Interface(iface)) => {
                iface.fields.extend(ext.fields);
                iface.directives.extend(ext.directives);
                Ok(())
            }
            _ => Err(ConfigurationError::UnknownType(ext.name)),
        },
        Ext::Union(ext) => match types.get_mut(&ext.name) {
            Some(TypeDefinition::Union(un)) => {
                for member in ext.types {
                    if !un.types.contains(&member) {
                        un.types.push(member);
                    }
                }
                un.directives.extend(ext.directives);
                Ok(())
            }
            _ => Err(ConfigurationError::UnknownType(ext.name)),
        },
        Ext::Enum(ext) => match types.get_mut(&ext.name) {
            Some(TypeDefinition::Enum(en)) => {
                en.values.extend(ext.values);
                en.directives.extend(ext.directives);
                Ok(())
            }
            _ => Err(ConfigurationError::UnknownType(ext.name)),
        },
        Ext::InputObject(ext) => match types.get_mut(&ext.name) {
            Some(TypeDefinition::InputObject(io)) => {
                io.fields.extend(ext.fields);
                io.directives.extend(ext.directives);
                Ok(())
            }
            _ => Err(ConfigurationError::UnknownType(ext.name)),
        },
        Ext::Scalar(ext) => match types.get_mut(&ext.name) {
            Some(TypeDefinition::Scalar(sc)) => {
                sc.directives.extend(ext.directives);
                Ok(())
            }
            _ => Err(ConfigurationError::UnknownType(ext.name)),
        },
    }
}

fn compute_possible_types(
    types: &LinkedHashMap<String, TypeDefinition>,
) -> HashMap<String, Vec<String>> {
    let mut possible: HashMap<String, Vec<String>> = HashMap::new();
    for (name, td) in types.iter() {
        match td {
            TypeDefinition::Object(obj) => {
                possible
                    .entry(name.clone())
                    .or_insert_with(Vec::new)
                    .push(name.clone());
                for iface in &obj.implements_interfaces {
                    possible
                        .entry(iface.clone())
                        .or_insert_with(Vec::new)
                        .push(name.clone());
                }
            }
            TypeDefinition::Union(un) => {
                let members = possible.entry(name.clone()).or_insert_with(Vec::new);
                for member in &un.types {
                    if !members.contains(member) {
                        members.push(member.clone());
                    }
                }
            }
            _ => {}
        }
    }
    possible
}

pub fn type_definition_name(td: &TypeDefinition) -> &str {
    match td {
        TypeDefinition::Scalar(t) => &t.name,
        TypeDefinition::Object(t) => &t.name,
        TypeDefinition::Interface(t) => &t.name,
        TypeDefinition::Union(t) => &t.name,
        TypeDefinition::Enum(t) => &t.name,
        TypeDefinition::InputObject(t) => &t.name,
    }
}

pub fn type_definition_directives(td: &TypeDefinition) -> &[Directive] {
    match td {
        TypeDefinition::Scalar(t) => &t.directives,
        TypeDefinition::Object(t) => &t.directives,
        TypeDefinition::Interface(t) => &t.directives,
        TypeDefinition::Union(t) => &t.directives,
        TypeDefinition::Enum(t) => &t.directives,
        TypeDefinition::InputObject(t) => &t.directives,
    }
}

pub fn set_type_definition_name(td: &mut TypeDefinition, name: &str) {
    match td {
        TypeDefinition::Scalar(t) => t.name = name.to_string(),
        TypeDefinition::Object(t) => t.name = name.to_string(),
        TypeDefinition::Interface(t) => t.name = name.to_string(),
        TypeDefinition::Union(t) => t.name = name.to_string(),
        TypeDefinition::Enum(t) => t.name = name.to_string(),
        TypeDefinition::InputObject(t) => t.name = name.to_string(),
    }
}

/// The innermost named type of a possibly wrapped type.
pub fn named_type(t: &GraphType) -> &str {
    match t {
        GraphType::NamedType(name) => name,
        GraphType::ListType(inner) => named_type(inner),
        GraphType::NonNullType(inner) => named_type(inner),
    }
}

pub fn is_non_null(t: &GraphType) -> bool {
    matches!(t, GraphType::NonNullType(_))
}

pub fn is_list_type(t: &GraphType) -> bool {
    match t {
        GraphType::NamedType(_) => false,
        GraphType::ListType(_) => true,
        GraphType::NonNullType(inner) => is_list_type(inner),
    }
}

pub fn is_specified_scalar(name: &str) -> bool {
    matches!(name, "Int" | "Float" | "String" | "Boolean" | "ID")
}

// https://github.com/graphql/graphql-js/blob/7b3241329e1ff49fb647b043b80568f0cf9e1a7c/src/type/introspection.js#L500-L509
pub fn is_introspection_type(name: &str) -> bool {
    name.starts_with("__")
}
