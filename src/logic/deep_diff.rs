use serde_json::{Map, Value};

use crate::model::{ArrayItem, Change};

/// Structural differences between two JSON documents, in document order.
///
/// Objects are compared key by key (left keys first, then keys only on the
/// right). Arrays are compared index by index; elements past the end of the
/// shorter side are reported as [`Change::Array`].
pub fn deep_diff(lhs: &Value, rhs: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    let mut path = Vec::new();
    diff_values(lhs, rhs, &mut path, &mut changes);
    changes
}

fn diff_values(lhs: &Value, rhs: &Value, path: &mut Vec<String>, changes: &mut Vec<Change>) {
    match (lhs, rhs) {
        (Value::Object(left), Value::Object(right)) => diff_objects(left, right, path, changes),
        (Value::Array(left), Value::Array(right)) => diff_arrays(left, right, path, changes),
        _ if lhs != rhs => changes.push(Change::Edited {
            path: path.clone(),
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        }),
        _ => {}
    }
}

fn diff_objects(
    left: &Map<String, Value>,
    right: &Map<String, Value>,
    path: &mut Vec<String>,
    changes: &mut Vec<Change>,
) {
    for (key, lhs) in left {
        path.push(key.clone());
        match right.get(key) {
            Some(rhs) => diff_values(lhs, rhs, path, changes),
            None => changes.push(Change::Deleted {
                path: path.clone(),
                lhs: lhs.clone(),
            }),
        }
        path.pop();
    }

    for (key, rhs) in right {
        if left.contains_key(key) {
            continue;
        }
        path.push(key.clone());
        changes.push(Change::New {
            path: path.clone(),
            rhs: rhs.clone(),
        });
        path.pop();
    }
}

fn diff_arrays(left: &[Value], right: &[Value], path: &mut Vec<String>, changes: &mut Vec<Change>) {
    for (index, lhs) in left.iter().enumerate() {
        match right.get(index) {
            Some(rhs) => {
                path.push(index.to_string());
                diff_values(lhs, rhs, path, changes);
                path.pop();
            }
            None => changes.push(Change::Array {
                path: path.clone(),
                index,
                item: ArrayItem::Deleted { lhs: lhs.clone() },
            }),
        }
    }

    for (index, rhs) in right.iter().enumerate().skip(left.len()) {
        changes.push(Change::Array {
            path: path.clone(),
            index,
            item: ArrayItem::New { rhs: rhs.clone() },
        });
    }
}
