//! Deep merge for delegated JSON results: later sources win on leaves,
//! objects recurse, arrays are replaced wholesale. Lists of merged types are
//! joined element-wise by key in the planner, not here.

use serde_json::Value;

pub fn merge(target: &mut Value, source: &Value) {
    if source.is_null() {
        return;
    }

    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                let merged_in_place = match target_map.get_mut(key) {
                    Some(target_value)
                        if target_value.is_object() && source_value.is_object() =>
                    {
                        merge(target_value, source_value);
                        true
                    }
                    _ => false,
                };
                if !merged_in_place {
                    target_map.insert(key.clone(), source_value.clone());
                }
            }
        }
        (target, source) => {
            *target = source.clone();
        }
    }
}
