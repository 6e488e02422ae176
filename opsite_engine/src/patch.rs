//! Patch Applier
//!
//! Minimal JSON-patch (`add` / `replace` / `remove`) over a data map.
//! The input is never mutated: `apply_patch(old) -> new` works on a deep
//! copy. Missing intermediate segments are created as empty maps; a
//! `remove` whose parent does not exist is a no-op.

use serde_json::{Map, Value};

use crate::events::{PatchKind, PatchOp};

/// Apply `ops` in order to a copy of `data` and return the copy.
pub fn apply_patch(data: &Map<String, Value>, ops: &[PatchOp]) -> Map<String, Value> {
    let mut root = Value::Object(data.clone());
    for op in ops {
        apply_one(&mut root, op);
    }
    match root {
        Value::Object(map) => map,
        // The root is an object on entry and no op replaces it.
        _ => Map::new(),
    }
}

fn apply_one(root: &mut Value, op: &PatchOp) {
    let segments = split_path(&op.path);
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    match op.op {
        PatchKind::Add | PatchKind::Replace => {
            let mut cursor = root;
            for seg in parents {
                cursor = step_or_create(cursor, seg);
            }
            let value = op.value.clone().unwrap_or(Value::Null);
            write_last(cursor, last, value, op.op == PatchKind::Add);
        }
        PatchKind::Remove => {
            let pointer = to_pointer(parents);
            if let Some(parent) = root.pointer_mut(&pointer) {
                remove_last(parent, last);
            }
        }
    }
}

/// `/a/b~1c` -> `["a", "b/c"]`. A leading `/` is optional.
fn split_path(path: &str) -> Vec<String> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split('/')
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn to_pointer(segments: &[String]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", s.replace('~', "~0").replace('/', "~1")))
        .collect()
}

fn array_index(items: &[Value], seg: &str) -> Option<usize> {
    seg.parse::<usize>().ok().filter(|i| *i < items.len())
}

/// Descend one segment, turning anything that cannot be descended into
/// an empty map.
fn step_or_create<'a>(cursor: &'a mut Value, seg: &str) -> &'a mut Value {
    let index = match &*cursor {
        Value::Array(items) => array_index(items, seg),
        _ => None,
    };
    if index.is_none() && !cursor.is_object() {
        *cursor = Value::Object(Map::new());
    }
    match (cursor, index) {
        (Value::Array(items), Some(i)) => &mut items[i],
        (Value::Object(map), _) => map
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Map::new())),
        (other, _) => other,
    }
}

fn write_last(container: &mut Value, key: &str, value: Value, is_add: bool) {
    if let Value::Array(items) = container {
        if key == "-" {
            items.push(value);
            return;
        }
        if let Ok(i) = key.parse::<usize>() {
            if is_add && i <= items.len() {
                items.insert(i, value);
            } else if i < items.len() {
                items[i] = value;
            }
            return;
        }
    }
    if !container.is_object() {
        *container = Value::Object(Map::new());
    }
    if let Value::Object(map) = container {
        map.insert(key.to_string(), value);
    }
}

fn remove_last(container: &mut Value, key: &str) {
    match container {
        Value::Object(map) => {
            map.remove(key);
        }
        Value::Array(items) => {
            if let Some(i) = array_index(items, key) {
                items.remove(i);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn op(kind: PatchKind, path: &str, value: Option<Value>) -> PatchOp {
        PatchOp {
            op: kind,
            path: path.to_string(),
            value,
        }
    }

    #[test]
    fn test_replace_and_add_top_level() {
        let old = map(json!({"text": "a"}));
        let new = apply_patch(
            &old,
            &[
                op(PatchKind::Replace, "/text", Some(json!("b"))),
                op(PatchKind::Add, "/level", Some(json!(2))),
            ],
        );
        assert_eq!(Value::Object(new), json!({"text": "b", "level": 2}));
        assert_eq!(Value::Object(old), json!({"text": "a"}));
    }

    #[test]
    fn test_missing_intermediates_become_maps() {
        let new = apply_patch(
            &Map::new(),
            &[op(PatchKind::Add, "/style/font/size", Some(json!(12)))],
        );
        assert_eq!(
            Value::Object(new),
            json!({"style": {"font": {"size": 12}}})
        );
    }

    #[test]
    fn test_scalar_intermediate_is_replaced_by_map() {
        let old = map(json!({"style": "bold"}));
        let new = apply_patch(&old, &[op(PatchKind::Add, "/style/weight", Some(json!(700)))]);
        assert_eq!(Value::Object(new), json!({"style": {"weight": 700}}));
    }

    #[test]
    fn test_remove_tolerates_missing_parent() {
        let old = map(json!({"text": "a"}));
        let new = apply_patch(
            &old,
            &[
                op(PatchKind::Remove, "/nope/deeper", None),
                op(PatchKind::Remove, "/text", None),
            ],
        );
        assert!(new.is_empty());
    }

    #[test]
    fn test_array_segments() {
        let old = map(json!({"items": ["a", "c"]}));
        let new = apply_patch(
            &old,
            &[
                op(PatchKind::Add, "/items/1", Some(json!("b"))),
                op(PatchKind::Add, "/items/-", Some(json!("d"))),
                op(PatchKind::Replace, "/items/0", Some(json!("A"))),
                op(PatchKind::Remove, "/items/3", None),
            ],
        );
        assert_eq!(Value::Object(new), json!({"items": ["A", "b", "c"]}));
    }

    #[test]
    fn test_escaped_segments() {
        let new = apply_patch(&Map::new(), &[op(PatchKind::Add, "/a~1b/c~0d", Some(json!(1)))]);
        assert_eq!(Value::Object(new), json!({"a/b": {"c~d": 1}}));
    }

    #[test]
    fn test_empty_path_is_ignored() {
        let old = map(json!({"x": 1}));
        let new = apply_patch(&old, &[op(PatchKind::Replace, "", Some(json!({"y": 2})))]);
        assert_eq!(new, old);
    }
}
