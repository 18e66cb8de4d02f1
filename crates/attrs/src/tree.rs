//! Dotted-path reads and copy-on-path writes over [`Value`] trees.
//!
//! Writes never mutate their input. The returned tree re-allocates only the containers
//! between the root and the written node; all siblings keep their identity.

use std::sync::Arc;

use crate::{
    PathError, Value,
    path::{self, parse_index},
};

/// Look up `path` in `tree`. The empty path addresses the root.
///
/// Numeric segments index lists; on maps every segment is a key. Absent nodes yield
/// `None`.
pub fn get<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    get_segments(tree, &path::split(path))
}

/// Look up pre-split `segments` in `tree`.
pub fn get_segments<'a>(tree: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(tree, |node, segment| child(node, segment))
}

/// Direct child of `node` addressed by one raw segment.
pub fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::List(items) => parse_index(segment).and_then(|i| items.get(i)),
        Value::Map(map) => map.get(segment),
        _ => None,
    }
}

/// Furthest a write may reach past the end of a list. Writing index `len + MAX_LIST_GAP`
/// pads with nulls; anything beyond fails.
pub const MAX_LIST_GAP: usize = 1024;

/// Return a new tree with `value` stored at `path`.
///
/// Missing intermediate nodes are created: a list when the next segment is numeric,
/// a map otherwise. Writing past the end of a list pads it with nulls, up to
/// [`MAX_LIST_GAP`]. A leaf or a list in the way of a non-numeric segment is replaced
/// by a map.
pub fn update(tree: &Value, path: &str, value: Value) -> Result<Value, PathError> {
    let mut next = tree.clone();
    assign(&mut next, path, &path::split(path), value)?;
    Ok(next)
}

/// Apply a batch of writes, producing exactly one new tree.
///
/// Each key is resolved under `prefix` when one is given. Containers copied for one
/// key are reused by later keys of the same batch. The first failing write fails the
/// whole batch.
pub fn update_many<I, K>(
    tree: &Value,
    patch: I,
    prefix: Option<&str>,
) -> Result<Value, PathError>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut next = tree.clone();
    for (key, value) in patch {
        let full = path::join(prefix.unwrap_or(""), key.as_ref());
        assign(&mut next, &full, &path::split(&full), value)?;
    }
    Ok(next)
}

/// Store `value` under `segments` below `node`, copying shared containers on the way.
fn assign(
    node: &mut Value,
    full: &str,
    segments: &[&str],
    value: Value,
) -> Result<(), PathError> {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return Ok(());
    };
    let index = parse_index(head);
    match (node, index) {
        (Value::List(items), Some(i)) => {
            if i > items.len().saturating_add(MAX_LIST_GAP) {
                return Err(PathError::IndexOutOfRange {
                    path: full.to_string(),
                    index: i,
                    len: items.len(),
                });
            }
            let items = Arc::make_mut(items);
            if items.len() <= i {
                items.resize(i + 1, Value::Null);
            }
            assign(&mut items[i], full, rest, value)
        }
        (Value::Map(map), _) => {
            let map = Arc::make_mut(map);
            let slot = map.entry((*head).to_string()).or_default();
            assign(slot, full, rest, value)
        }
        (other, _) => {
            *other = match index {
                Some(_) => Value::List(Arc::default()),
                None => Value::empty_map(),
            };
            assign(other, full, segments, value)
        }
    }
}
