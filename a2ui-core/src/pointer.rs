//! RFC 6901 JSON Pointer reads and writes over `serde_json::Value` trees.
//!
//! Writes create missing ancestors as empty maps. Merge writes apply
//! JSON-Merge-Patch semantics for maps (recursive merge, `null` deletes) and
//! wholesale replacement for sequences and scalars.

use serde_json::{Map, Value};

use crate::error::{ErrorKind, ProtocolError};

/// Split a pointer into unescaped segments. Both `""` and `"/"` name the root.
pub fn segments(path: &str) -> Vec<String> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').map(unescape).collect()
}

pub fn segment_count(path: &str) -> usize {
    segments(path).len()
}

/// Unescape one pointer segment (`~1` → `/`, then `~0` → `~`).
pub fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Escape one pointer segment (`~` → `~0`, then `/` → `~1`).
pub fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Join a relative pointer onto a scope path, producing an absolute pointer.
/// A leading `/` on `rel` is dropped; the caller decides whether that was
/// legal for its protocol version.
pub fn join(scope: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches('/');
    let scope = scope.trim_end_matches('/');
    if rel.is_empty() {
        return if scope.is_empty() { "/".to_string() } else { scope.to_string() };
    }
    format!("{}/{}", scope, rel)
}

/// Read the value at `path`. Missing segments yield `None`.
pub fn read<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments(path) {
        current = match current {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Replace the value at `path`, creating ancestor maps as needed. Writing to
/// the root replaces the whole tree.
pub fn write(root: &mut Value, path: &str, value: Value) -> Result<(), ProtocolError> {
    let segs = segments(path);
    let Some((last, ancestors)) = segs.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;
    for segment in ancestors {
        current = descend_or_create(current, segment, path)?;
    }
    insert(current, last, value, path)
}

/// Write `value` at `path` with merge semantics: map targets merge
/// recursively (a `null` entry removes the key), everything else replaces.
pub fn merge_write(root: &mut Value, path: &str, value: Value) -> Result<(), ProtocolError> {
    let target_is_map = matches!(read(root, path), Some(Value::Object(_)));
    if target_is_map && value.is_object() {
        let mut merged = read(root, path).cloned().unwrap_or(Value::Null);
        merge(&mut merged, value);
        write(root, path, merged)
    } else {
        write(root, path, value)
    }
}

/// JSON-Merge-Patch style merge: maps merge key-wise, `null` deletes, arrays
/// and scalars replace.
pub fn merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (key, src_value) in src_map {
                if src_value.is_null() {
                    dst_map.remove(&key);
                } else if let Some(slot) = dst_map.get_mut(&key) {
                    merge(slot, src_value);
                } else {
                    dst_map.insert(key, src_value);
                }
            }
        }
        (dst, src) => *dst = src,
    }
}

fn descend_or_create<'a>(
    current: &'a mut Value,
    segment: &str,
    path: &str,
) -> Result<&'a mut Value, ProtocolError> {
    if let Value::Array(items) = current {
        let index = parse_index(segment, path)?;
        return items.get_mut(index).ok_or_else(|| out_of_bounds(segment, path));
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            Ok(map.entry(segment.to_string()).or_insert_with(|| Value::Object(Map::new())))
        }
        _ => Err(ProtocolError::new(
            ErrorKind::BindingError,
            format!("cannot descend into {path:?} at {segment:?}"),
        )),
    }
}

fn insert(current: &mut Value, segment: &str, value: Value, path: &str) -> Result<(), ProtocolError> {
    match current {
        Value::Object(map) => {
            map.insert(segment.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            if segment == "-" {
                items.push(value);
                return Ok(());
            }
            let index = parse_index(segment, path)?;
            if index < items.len() {
                items[index] = value;
                Ok(())
            } else if index == items.len() {
                items.push(value);
                Ok(())
            } else {
                Err(out_of_bounds(segment, path))
            }
        }
        other => {
            let mut map = Map::new();
            map.insert(segment.to_string(), value);
            *other = Value::Object(map);
            Ok(())
        }
    }
}

fn parse_index(segment: &str, path: &str) -> Result<usize, ProtocolError> {
    segment.parse::<usize>().map_err(|_| {
        ProtocolError::new(
            ErrorKind::BindingError,
            format!("segment {segment:?} of {path:?} is not a sequence index"),
        )
    })
}

fn out_of_bounds(segment: &str, path: &str) -> ProtocolError {
    ProtocolError::new(
        ErrorKind::BindingError,
        format!("index {segment} of {path:?} is out of bounds"),
    )
}
