//! Test resolution
//!
//! Walks every root-to-leaf path of the definition tree and folds it into a
//! [`Test`]: names are concatenated, the timeout closest to the leaf wins and
//! hooks are collected root first.

mod select;

pub use select::Selection;

use std::time::Duration;

use crate::dsl::Entry;
use crate::models::Test;
use crate::tree::Node;

/// Resolve tree roots into tests, in definition order.
///
/// Paths that do not end in a case (an empty `describe`) produce nothing.
/// `default_timeout` applies when no node on the path sets one.
pub fn resolve(roots: &[Node<Entry>], default_timeout: Duration) -> Vec<Test> {
    let mut tests = Vec::new();
    for root in roots {
        for path in root.paths() {
            if let Some(test) = resolve_path(tests.len(), &path, default_timeout) {
                tests.push(test);
            }
        }
    }
    tests
}

fn resolve_path(ordinal: usize, path: &[&Node<Entry>], default_timeout: Duration) -> Option<Test> {
    let (leaf, ancestors) = path.split_last()?;
    let Entry::Case(case) = leaf.value() else {
        return None;
    };

    let mut full_name = Vec::with_capacity(path.len());
    let mut timeout = default_timeout;
    let mut before = Vec::new();
    let mut after = Vec::new();

    for node in ancestors {
        let Entry::Group(group) = node.value() else {
            return None;
        };
        full_name.push(group.name.clone());
        if let Some(t) = group.timeout {
            timeout = t;
        }
        before.extend(group.before_each.clone());
        after.extend(group.after_each.clone());
    }

    full_name.push(case.name.clone());
    if let Some(t) = case.timeout {
        timeout = t;
    }

    Some(Test::new(
        ordinal,
        full_name,
        timeout,
        before,
        case.body.clone(),
        after,
    ))
}
