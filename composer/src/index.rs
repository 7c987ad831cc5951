//! The stitching index: per-type selection sets required for merging,
//! per-subschema entry points, unique/non-unique field ownership, and the
//! root-field routing table.

use crate::ast::*;
use crate::config::{EntryPoint, SubschemaDefinition, SubschemaId};
use crate::error::ConfigurationError;
use crate::selections;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

pub type DynamicSelectionSetFn = Arc<dyn Fn(&FieldNode) -> Option<SelectionSet> + Send + Sync>;

/// Process-wide stitching metadata, immutable after composition.
pub struct StitchingInfo {
    /// Key fields required whenever a value of the type leaves one subschema.
    pub selection_sets_by_type: HashMap<String, SelectionSet>,
    /// Computed-field dependencies, by type then field.
    pub selection_sets_by_field: HashMap<String, HashMap<String, SelectionSet>>,
    /// Caller-driven selection sets, produced from the requesting field node.
    pub dynamic_selection_sets_by_field: HashMap<String, HashMap<String, Vec<DynamicSelectionSetFn>>>,
    pub merged_types: HashMap<String, MergedTypeInfo>,
    /// Root field name to owning subschemas, in priority order.
    pub root_fields: HashMap<(OperationKind, String), Vec<SubschemaId>>,
}

impl std::fmt::Debug for StitchingInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StitchingInfo")
            .field("selection_sets_by_type", &self.selection_sets_by_type)
            .field("selection_sets_by_field", &self.selection_sets_by_field)
            .field("merged_types", &self.merged_types)
            .field("root_fields", &self.root_fields)
            .finish()
    }
}

#[derive(Debug)]
pub struct MergedTypeInfo {
    pub type_name: String,
    /// Subschemas participating in merging this type, in configuration order.
    pub subschemas: Vec<SubschemaId>,
    /// Source subschema to the targets that may still be queried for it.
    pub target_subschemas: HashMap<SubschemaId, Vec<SubschemaId>>,
    pub selection_sets: HashMap<SubschemaId, SelectionSet>,
    pub field_selection_sets: HashMap<SubschemaId, HashMap<String, SelectionSet>>,
    pub unique_fields: HashMap<String, SubschemaId>,
    pub non_unique_fields: HashMap<String, Vec<SubschemaId>>,
    pub entry_points: HashMap<SubschemaId, EntryPoint>,
}

impl MergedTypeInfo {
    /// Targets for a source subschema; sources never target themselves.
    pub fn targets_for(&self, source: SubschemaId) -> Vec<SubschemaId> {
        match self.target_subschemas.get(&source) {
            Some(targets) => targets.clone(),
            None => self
                .subschemas
                .iter()
                .copied()
                .filter(|&t| t != source && self.entry_points.contains_key(&t))
                .collect(),
        }
    }

    /// Union of the dependency selection sets declared for `field_name`
    /// across all given subschemas.
    pub fn field_dependencies(&self, field_name: &str, among: &[SubschemaId]) -> Option<SelectionSet> {
        let mut union: Option<SelectionSet> = None;
        for id in among {
            if let Some(ss) = self
                .field_selection_sets
                .get(id)
                .and_then(|m| m.get(field_name))
            {
                match &mut union {
                    Some(acc) => selections::merge_selection_sets(acc, ss),
                    none => *none = Some(ss.clone()),
                }
            }
        }
        union
    }
}

pub(crate) fn build_stitching_info(
    subschemas: &[SubschemaDefinition],
) -> Result<StitchingInfo, ConfigurationError> {
    let mut info = StitchingInfo {
        selection_sets_by_type: HashMap::new(),
        selection_sets_by_field: HashMap::new(),
        dynamic_selection_sets_by_field: HashMap::new(),
        merged_types: HashMap::new(),
        root_fields: HashMap::new(),
    };

    let mut merged_names: Vec<String> = vec![];
    for def in subschemas {
        for name in def.merge.keys() {
            if !merged_names.contains(name) {
                merged_names.push(name.clone());
            }
        }
    }

    for name in merged_names {
        let mut merged = MergedTypeInfo {
            type_name: name.clone(),
            subschemas: vec![],
            target_subschemas: HashMap::new(),
            selection_sets: HashMap::new(),
            field_selection_sets: HashMap::new(),
            unique_fields: HashMap::new(),
            non_unique_fields: HashMap::new(),
            entry_points: HashMap::new(),
        };

        for (id, def) in subschemas.iter().enumerate() {
            let cfg = match def.merge.get(&name) {
                Some(cfg) => cfg,
                None => continue,
            };
            if def.schema.get_type(&name).is_none() {
                return Err(ConfigurationError::UnknownType(format!(
                    "{} (merge configuration of subschema \"{}\")",
                    name, def.name
                )));
            }
            merged.subschemas.push(id);
            if let Some(ss) = &cfg.selection_set {
                merged.selection_sets.insert(id, ss.clone());
            }
            for (field_name, field_cfg) in cfg.fields.iter() {
                if let Some(ss) = &field_cfg.selection_set {
                    merged
                        .field_selection_sets
                        .entry(id)
                        .or_insert_with(HashMap::new)
                        .insert(field_name.clone(), ss.clone());
                }
            }
            if let Some(entry) = &cfg.entry_point {
                merged.entry_points.insert(id, entry.clone());
            }
        }

        // Field ownership across participating subschemas.
        let mut owners: HashMap<String, Vec<SubschemaId>> = HashMap::new();
        for &id in &merged.subschemas {
            if let Some(fields) = subschemas[id].schema.type_fields(&name) {
                for field in fields {
                    let ids = owners.entry(field.name.clone()).or_insert_with(Vec::new);
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        for (field_name, ids) in owners {
            if ids.len() == 1 {
                merged.unique_fields.insert(field_name, ids[0]);
            } else {
                merged.non_unique_fields.insert(field_name, ids);
            }
        }

        for &source in &merged.subschemas {
            let targets: Vec<SubschemaId> = merged
                .subschemas
                .iter()
                .copied()
                .filter(|&t| t != source && merged.entry_points.contains_key(&t))
                .collect();
            merged.target_subschemas.insert(source, targets);
        }

        // Union of per-subschema key selection sets: required whenever the
        // type leaves any one subschema.
        let mut type_union: Option<SelectionSet> = None;
        for id in &merged.subschemas {
            if let Some(ss) = merged.selection_sets.get(id) {
                match &mut type_union {
                    Some(acc) => selections::merge_selection_sets(acc, ss),
                    none => *none = Some(ss.clone()),
                }
            }
        }
        if let Some(union) = type_union {
            info.selection_sets_by_type.insert(name.clone(), union);
        }

        for id in &merged.subschemas {
            if let Some(per_field) = merged.field_selection_sets.get(id) {
                for (field_name, ss) in per_field {
                    let by_field = info
                        .selection_sets_by_field
                        .entry(name.clone())
                        .or_insert_with(HashMap::new);
                    if let Some(acc) = by_field.get_mut(field_name) {
                        selections::merge_selection_sets(acc, ss);
                        continue;
                    }
                    by_field.insert(field_name.clone(), ss.clone());
                }
            }
        }

        info.merged_types.insert(name, merged);
    }

    for (id, def) in subschemas.iter().enumerate() {
        let roots = [
            (OperationKind::Query, def.schema.query_type()),
            (OperationKind::Mutation, def.schema.mutation_type()),
            (OperationKind::Subscription, def.schema.subscription_type()),
        ];
        for (kind, root) in roots.iter() {
            if let Some(root_name) = root {
                if let Some(fields) = def.schema.type_fields(root_name) {
                    for field in fields {
                        info.root_fields
                            .entry((*kind, field.name.clone()))
                            .or_insert_with(Vec::new)
                            .push(id);
                    }
                }
            }
        }
    }

    Ok(info)
}
