//! Type merging: for each name, either pick one candidate or merge all
//! candidates into one output type. Canonical subschemas win descriptions,
//! directives, default values, and field types on conflict.

use crate::ast::*;
use crate::candidates::TypeCandidate;
use crate::config::*;
use crate::error::ConfigurationError;
use crate::print;
use crate::schema::{is_specified_scalar, type_definition_name};
use linked_hash_map::LinkedHashMap;
use std::collections::{HashMap, HashSet};

pub(crate) struct TypeMerger<'a> {
    pub subschemas: &'a [SubschemaDefinition],
    pub merge_types: &'a MergeTypesSpec,
    pub on_type_conflict: Option<&'a OnTypeConflict>,
    pub options: &'a TypeMergingOptions,
    /// Names appearing in any subschema's merge configuration.
    pub merged_type_names: &'a HashSet<String>,
}

impl<'a> TypeMerger<'a> {
    pub fn merge_candidates(
        &self,
        name: &str,
        mut candidates: Vec<TypeCandidate>,
    ) -> Result<TypeDefinition, ConfigurationError> {
        if candidates.len() == 1 {
            return Ok(candidates.remove(0).type_def);
        }
        if self.should_merge(name, &candidates) {
            self.merge_all(name, candidates)
        } else {
            Ok(self.choose(candidates))
        }
    }

    fn should_merge(&self, name: &str, candidates: &[TypeCandidate]) -> bool {
        if name == QUERY_TYPE_NAME || name == MUTATION_TYPE_NAME || name == SUBSCRIPTION_TYPE_NAME {
            return true;
        }
        if self.merged_type_names.contains(name) {
            return true;
        }
        let has_specified_scalar = is_specified_scalar(name)
            && candidates
                .iter()
                .any(|c| matches!(c.type_def, TypeDefinition::Scalar(_)));
        match self.merge_types {
            MergeTypesSpec::All => !has_specified_scalar,
            MergeTypesSpec::None => false,
            MergeTypesSpec::Names(names) => names.contains(name),
            MergeTypesSpec::Predicate(filter) => filter(name, candidates),
        }
    }

    fn choose(&self, candidates: Vec<TypeCandidate>) -> TypeDefinition {
        match self.on_type_conflict {
            None => match candidates.into_iter().last() {
                Some(c) => c.type_def,
                None => unreachable!(),
            },
            Some(resolve) => {
                let mut iter = candidates.into_iter();
                let first = match iter.next() {
                    Some(c) => c,
                    None => unreachable!(),
                };
                let mut acc = first.type_def;
                let mut acc_subschema = first.subschema;
                for next in iter {
                    let context = ConflictContext {
                        left_subschema: acc_subschema.map(|id| self.subschemas[id].name.as_str()),
                        right_subschema: next.subschema.map(|id| self.subschemas[id].name.as_str()),
                    };
                    acc = resolve(&acc, &next.type_def, &context);
                    acc_subschema = None;
                }
                acc
            }
        }
    }

    fn merge_all(
        &self,
        name: &str,
        candidates: Vec<TypeCandidate>,
    ) -> Result<TypeDefinition, ConfigurationError> {
        let first_kind = kind_of(&candidates[0].type_def);
        if candidates.iter().any(|c| kind_of(&c.type_def) != first_kind) {
            return Err(ConfigurationError::IncompatibleTypeKinds(name.to_string()));
        }

        let canonical = self.canonical_subschema_for(name)?;
        let canonical_fields = self.canonical_fields_for(name)?;

        // The canonical candidate (else the last one) seeds the output; its
        // description and directives survive.
        let base_position = candidates
            .iter()
            .rposition(|c| canonical.is_some() && c.subschema == canonical)
            .unwrap_or(candidates.len() - 1);
        let mut out = candidates[base_position].type_def.clone();

        match &mut out {
            TypeDefinition::Object(obj) => {
                let mut fields: LinkedHashMap<String, (SchemaField, Option<SubschemaId>)> =
                    LinkedHashMap::new();
                let mut interfaces: Vec<String> = vec![];
                let mut directives: Vec<Directive> = vec![];
                for cand in &candidates {
                    letp!(TypeDefinition::Object(other) = &cand.type_def => {
                        for iface in &other.implements_interfaces {
                            if !interfaces.contains(iface) {
                                interfaces.push(iface.clone());
                            }
                        }
                        union_directives(&mut directives, &other.directives);
                        self.merge_fields(
                            name,
                            &mut fields,
                            &other.fields,
                            cand.subschema,
                            canonical,
                            &canonical_fields,
                        )?;
                    });
                }
                obj.implements_interfaces = interfaces;
                obj.directives = directives;
                obj.fields = fields.into_iter().map(|(_, (f, _))| f).collect();
            }
            TypeDefinition::Interface(iface) => {
                let mut fields: LinkedHashMap<String, (SchemaField, Option<SubschemaId>)> =
                    LinkedHashMap::new();
                let mut directives: Vec<Directive> = vec![];
                for cand in &candidates {
                    letp!(TypeDefinition::Interface(other) = &cand.type_def => {
                        union_directives(&mut directives, &other.directives);
                        self.merge_fields(
                            name,
                            &mut fields,
                            &other.fields,
                            cand.subschema,
                            canonical,
                            &canonical_fields,
                        )?;
                    });
                }
                iface.directives = directives;
                iface.fields = fields.into_iter().map(|(_, (f, _))| f).collect();
            }
            TypeDefinition::Union(un) => {
                let mut members: Vec<String> = vec![];
                let mut directives: Vec<Directive> = vec![];
                for cand in &candidates {
                    letp!(TypeDefinition::Union(other) = &cand.type_def => {
                        for member in &other.types {
                            if !members.contains(member) {
                                members.push(member.clone());
                            }
                        }
                        union_directives(&mut directives, &other.directives);
                    });
                }
                un.types = members;
                un.directives = directives;
            }
            TypeDefinition::Enum(en) => {
                let mut values: Vec<graphql_parser::schema::EnumValue<'static, String>> = vec![];
                let mut directives: Vec<Directive> = vec![];
                for cand in &candidates {
                    letp!(TypeDefinition::Enum(other) = &cand.type_def => {
                        for value in &other.values {
                            if !values.iter().any(|v| v.name == value.name) {
                                values.push(value.clone());
                            }
                        }
                        union_directives(&mut directives, &other.directives);
                    });
                }
                en.values = values;
                en.directives = directives;
            }
            // A non-specified scalar keeps the identity of its canonical
            // (else last) candidate.
            TypeDefinition::Scalar(_) => {}
            TypeDefinition::InputObject(io) => {
                let mut fields: LinkedHashMap<String, (InputValue, Option<SubschemaId>)> =
                    LinkedHashMap::new();
                let mut directives: Vec<Directive> = vec![];
                for cand in &candidates {
                    letp!(TypeDefinition::InputObject(other) = &cand.type_def => {
                        union_directives(&mut directives, &other.directives);
                        self.merge_input_values(
                            name,
                            &mut fields,
                            &other.fields,
                            cand.subschema,
                            canonical,
                            &canonical_fields,
                        )?;
                    });
                }
                io.directives = directives;
                io.fields = fields.into_iter().map(|(_, (f, _))| f).collect();
            }
        }
        Ok(out)
    }

    fn merge_fields(
        &self,
        type_name: &str,
        acc: &mut LinkedHashMap<String, (SchemaField, Option<SubschemaId>)>,
        incoming: &[SchemaField],
        source: Option<SubschemaId>,
        canonical: Option<SubschemaId>,
        canonical_fields: &HashMap<String, SubschemaId>,
    ) -> Result<(), ConfigurationError> {
        for field in incoming {
            if !acc.contains_key(&field.name) {
                acc.insert(field.name.clone(), (field.clone(), source));
                continue;
            }
            let slot = match acc.get_mut(&field.name) {
                Some(slot) => slot,
                None => continue,
            };

            let field_canonical = canonical_fields.get(&field.name).copied();
            let existing_source = slot.1;
            let incoming_wins = {
                if source.is_some() && field_canonical == source {
                    true
                } else if existing_source.is_some() && field_canonical == existing_source {
                    false
                } else if source.is_some() && canonical == source {
                    true
                } else if existing_source.is_some() && canonical == existing_source {
                    false
                } else if print::print_type(&slot.0.field_type)
                    != print::print_type(&field.field_type)
                {
                    if self.options.validation == ValidationLevel::Error {
                        return Err(ConfigurationError::IncompatibleFieldTypes {
                            type_name: type_name.to_string(),
                            field_name: field.name.clone(),
                            left: print::print_type(&slot.0.field_type),
                            right: print::print_type(&field.field_type),
                        });
                    }
                    true
                } else {
                    false
                }
            };

            if incoming_wins {
                let mut merged = field.clone();
                // keep arguments only the previous definition had
                for arg in &slot.0.arguments {
                    if !merged.arguments.iter().any(|a| a.name == arg.name) {
                        merged.arguments.push(arg.clone());
                    }
                }
                if merged.description.is_none() {
                    merged.description = slot.0.description.clone();
                }
                *slot = (merged, source);
            } else {
                for arg in &field.arguments {
                    if !slot.0.arguments.iter().any(|a| a.name == arg.name) {
                        slot.0.arguments.push(arg.clone());
                    }
                }
                if slot.0.description.is_none() {
                    slot.0.description = field.description.clone();
                }
            }
        }
        Ok(())
    }

    fn merge_input_values(
        &self,
        type_name: &str,
        acc: &mut LinkedHashMap<String, (InputValue, Option<SubschemaId>)>,
        incoming: &[InputValue],
        source: Option<SubschemaId>,
        canonical: Option<SubschemaId>,
        canonical_fields: &HashMap<String, SubschemaId>,
    ) -> Result<(), ConfigurationError> {
        for field in incoming {
            if !acc.contains_key(&field.name) {
                acc.insert(field.name.clone(), (field.clone(), source));
                continue;
            }
            let slot = match acc.get_mut(&field.name) {
                Some(slot) => slot,
                None => continue,
            };
            let field_canonical = canonical_fields.get(&field.name).copied();
            let existing_source = slot.1;
            let incoming_wins = if source.is_some() && field_canonical == source {
                true
            } else if existing_source.is_some() && field_canonical == existing_source {
                false
            } else if source.is_some() && canonical == source {
                true
            } else if existing_source.is_some() && canonical == existing_source {
                false
            } else if print::print_type(&slot.0.value_type)
                != print::print_type(&field.value_type)
            {
                if self.options.validation == ValidationLevel::Error {
                    return Err(ConfigurationError::IncompatibleFieldTypes {
                        type_name: type_name.to_string(),
                        field_name: field.name.clone(),
                        left: print::print_type(&slot.0.value_type),
                        right: print::print_type(&field.value_type),
                    });
                }
                true
            } else {
                false
            };
            if incoming_wins {
                *slot = (field.clone(), source);
            }
        }
        Ok(())
    }

    fn canonical_subschema_for(
        &self,
        type_name: &str,
    ) -> Result<Option<SubschemaId>, ConfigurationError> {
        let mut found = None;
        for (id, def) in self.subschemas.iter().enumerate() {
            if def.merge.get(type_name).map(|c| c.canonical) == Some(true) {
                if found.is_some() {
                    return Err(ConfigurationError::ConflictingCanonical(
                        type_name.to_string(),
                    ));
                }
                found = Some(id);
            }
        }
        Ok(found)
    }

    fn canonical_fields_for(
        &self,
        type_name: &str,
    ) -> Result<HashMap<String, SubschemaId>, ConfigurationError> {
        let mut found: HashMap<String, SubschemaId> = HashMap::new();
        for (id, def) in self.subschemas.iter().enumerate() {
            if let Some(cfg) = def.merge.get(type_name) {
                for (field_name, field_cfg) in cfg.fields.iter() {
                    if field_cfg.canonical {
                        if found.contains_key(field_name) {
                            return Err(ConfigurationError::ConflictingCanonical(format!(
                                "{}.{}",
                                type_name, field_name
                            )));
                        }
                        found.insert(field_name.clone(), id);
                    }
                }
            }
        }
        Ok(found)
    }
}

fn kind_of(td: &TypeDefinition) -> u8 {
    match td {
        TypeDefinition::Scalar(_) => 0,
        TypeDefinition::Object(_) => 1,
        TypeDefinition::Interface(_) => 2,
        TypeDefinition::Union(_) => 3,
        TypeDefinition::Enum(_) => 4,
        TypeDefinition::InputObject(_) => 5,
    }
}

fn union_directives(acc: &mut Vec<Directive>, incoming: &[Directive]) {
    for d in incoming {
        let printed = print_directive(d);
        if !acc.iter().any(|existing| print_directive(existing) == printed) {
            acc.push(d.clone());
        }
    }
}

fn print_directive(d: &Directive) -> String {
    format!("@{}{}", d.name, print::print_arguments(&d.arguments))
}

#[allow(dead_code)]
pub(crate) fn candidate_name(candidate: &TypeCandidate) -> &str {
    type_definition_name(&candidate.type_def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaIndex;
    use std::sync::Arc;

    fn candidates_for(name: &str, sdls: &[&str]) -> Vec<TypeCandidate> {
        sdls.iter()
            .enumerate()
            .map(|(id, sdl)| TypeCandidate {
                type_def: SchemaIndex::parse(sdl)
                    .unwrap()
                    .get_type(name)
                    .unwrap()
                    .clone(),
                subschema: Some(id),
            })
            .collect()
    }

    fn merger_over<'a>(
        subschemas: &'a [SubschemaDefinition],
        merge_types: &'a MergeTypesSpec,
        options: &'a TypeMergingOptions,
        merged_type_names: &'a HashSet<String>,
    ) -> TypeMerger<'a> {
        TypeMerger {
            subschemas,
            merge_types,
            on_type_conflict: None,
            options,
            merged_type_names,
        }
    }

    fn plain_subschemas(count: usize) -> Vec<SubschemaDefinition> {
        (0..count)
            .map(|i| {
                SubschemaDefinition::new(
                    format!("s{}", i),
                    SchemaIndex::parse("type Query { ok: Boolean }").unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn merges_object_fields_and_interfaces() {
        let candidates = candidates_for(
            "User",
            &[
                "interface Node { id: ID! } type User implements Node { id: ID! name: String }",
                "type User { id: ID! email: String }",
            ],
        );
        let subschemas = plain_subschemas(2);
        let spec = MergeTypesSpec::All;
        let options = TypeMergingOptions::default();
        let names = HashSet::new();
        let merger = merger_over(&subschemas, &spec, &options, &names);
        let merged = merger.merge_candidates("User", candidates).unwrap();
        letp!(TypeDefinition::Object(obj) = merged => {
            let field_names: Vec<&str> = obj.fields.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(field_names, ["id", "name", "email"]);
            assert_eq!(obj.implements_interfaces, ["Node"]);
        });
    }

    #[test]
    fn conflicting_field_types_reject_composition() {
        let candidates = candidates_for(
            "User",
            &[
                "type User { id: ID! age: Int }",
                "type User { id: ID! age: String }",
            ],
        );
        let subschemas = plain_subschemas(2);
        let spec = MergeTypesSpec::All;
        let options = TypeMergingOptions::default();
        let names = HashSet::new();
        let merger = merger_over(&subschemas, &spec, &options, &names);
        let err = merger.merge_candidates("User", candidates).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::IncompatibleFieldTypes { .. }
        ));
    }

    #[test]
    fn canonical_subschema_wins_field_conflicts() {
        let candidates = candidates_for(
            "User",
            &[
                "type User { id: ID! age: Int }",
                "type User { id: ID! age: String }",
            ],
        );
        let mut subschemas = plain_subschemas(2);
        let mut cfg = MergedTypeConfig::default();
        cfg.canonical = true;
        subschemas[0].merge.insert("User".to_string(), cfg);
        let spec = MergeTypesSpec::All;
        let options = TypeMergingOptions::default();
        let mut names = HashSet::new();
        names.insert("User".to_string());
        let merger = merger_over(&subschemas, &spec, &options, &names);
        let merged = merger.merge_candidates("User", candidates).unwrap();
        letp!(TypeDefinition::Object(obj) = merged => {
            let age = obj.fields.iter().find(|f| f.name == "age").unwrap();
            assert_eq!(print::print_type(&age.field_type), "Int");
        });
    }

    #[test]
    fn enums_and_unions_union_their_members() {
        let subschemas = plain_subschemas(2);
        let spec = MergeTypesSpec::All;
        let options = TypeMergingOptions::default();
        let names = HashSet::new();
        let merger = merger_over(&subschemas, &spec, &options, &names);

        let enums = candidates_for(
            "Role",
            &["enum Role { ADMIN USER }", "enum Role { USER GUEST }"],
        );
        letp!(TypeDefinition::Enum(en) = merger.merge_candidates("Role", enums).unwrap() => {
            let value_names: Vec<&str> = en.values.iter().map(|v| v.name.as_str()).collect();
            assert_eq!(value_names, ["ADMIN", "USER", "GUEST"]);
        });

        let unions = candidates_for(
            "Media",
            &[
                "union Media = Image type Image { id: ID } type Clip { id: ID }",
                "union Media = Clip type Image { id: ID } type Clip { id: ID }",
            ],
        );
        letp!(TypeDefinition::Union(un) = merger.merge_candidates("Media", unions).unwrap() => {
            assert_eq!(un.types, ["Image", "Clip"]);
        });
    }

    #[test]
    fn chooses_last_candidate_without_conflict_handler() {
        let candidates = candidates_for(
            "Odd",
            &["scalar Odd", "enum Odd { A }"],
        );
        let subschemas = plain_subschemas(2);
        let spec = MergeTypesSpec::None;
        let options = TypeMergingOptions::default();
        let names = HashSet::new();
        let merger = merger_over(&subschemas, &spec, &options, &names);
        let chosen = merger.merge_candidates("Odd", candidates).unwrap();
        assert!(matches!(chosen, TypeDefinition::Enum(_)));
    }

    #[test]
    fn on_type_conflict_reduces_left_to_right() {
        let candidates = candidates_for(
            "Odd",
            &["scalar Odd", "enum Odd { A }"],
        );
        let subschemas = plain_subschemas(2);
        let spec = MergeTypesSpec::None;
        let options = TypeMergingOptions::default();
        let names = HashSet::new();
        let keep_left: OnTypeConflict = Arc::new(|left, _, _| left.clone());
        let mut merger = merger_over(&subschemas, &spec, &options, &names);
        merger.on_type_conflict = Some(&keep_left);
        let chosen = merger.merge_candidates("Odd", candidates).unwrap();
        assert!(matches!(chosen, TypeDefinition::Scalar(_)));
    }

    #[test]
    fn specified_scalars_are_never_merged() {
        let candidates = candidates_for("ID", &["scalar ID", "scalar ID"]);
        let subschemas = plain_subschemas(2);
        let spec = MergeTypesSpec::All;
        let options = TypeMergingOptions::default();
        let names = HashSet::new();
        let merger = merger_over(&subschemas, &spec, &options, &names);
        // falls through to choose(), keeping the last candidate's identity
        let chosen = merger.merge_candidates("ID", candidates).unwrap();
        assert!(matches!(chosen, TypeDefinition::Scalar(_)));
    }
}
