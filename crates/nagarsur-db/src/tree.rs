//! Pure operations on JSON record trees, following the hosted database's rules:
//! nulls delete, empty objects vanish, and `{".sv": "timestamp"}` becomes the
//! server clock.

use serde_json::{Map, Value};

use nagarsur_types::{DbPath, PathError};

const SERVER_VALUE_KEY: &str = ".sv";
const SERVER_TIMESTAMP: &str = "timestamp";

/// Value below `root` at the relative `path`.
pub fn get_at<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = root;
    for seg in path {
        current = match current {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Replace the value at `path` inside `root`, returning the normalized tree.
/// `None` means the whole tree is now empty.
pub fn set_at(root: Option<Value>, path: &[String], value: Value) -> Option<Value> {
    let Some((head, rest)) = path.split_first() else {
        return normalize(value);
    };

    let mut map = match root {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let child = map.remove(head);
    if let Some(new_child) = set_at(child, rest, value) {
        map.insert(head.clone(), new_child);
    }

    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

/// Drop nulls and empty objects, recursively.
pub fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Object(pruned))
            }
        }
        other => Some(other),
    }
}

/// Replace every server-value placeholder with `now_ms`.
pub fn resolve_server_values(value: &mut Value, now_ms: i64) {
    match value {
        Value::Object(map) => {
            let is_timestamp = map.len() == 1
                && map.get(SERVER_VALUE_KEY).and_then(Value::as_str) == Some(SERVER_TIMESTAMP);
            if is_timestamp {
                *value = Value::from(now_ms);
            } else {
                map.values_mut().for_each(|v| resolve_server_values(v, now_ms));
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| resolve_server_values(v, now_ms)),
        _ => {}
    }
}

/// Every object key in a written value must be usable as a path segment.
pub fn validate_keys(value: &Value) -> Result<(), PathError> {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                DbPath::root().child(k)?;
                validate_keys(v)?;
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(validate_keys),
        _ => Ok(()),
    }
}
