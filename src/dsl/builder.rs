//! Definition builder
//!
//! [`Builder`] owns the focus stack for one build pass. Every definition
//! closure receives it explicitly, so separate builds never share state.

use std::time::Duration;

use thiserror::Error;

use crate::dsl::{Case, Entry, Group};
use crate::hook::Hook;
use crate::tree::Node;

/// Misuse of the definition API; aborts the build
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DslError {
    #[error("{0} must be called inside describe")]
    OutsideDescribe(&'static str),

    #[error("{hook} is already set for \"{group}\"")]
    HookAlreadySet { hook: &'static str, group: String },
}

/// Focus stack plus finished top-level groups
#[derive(Debug, Default)]
pub struct Builder {
    stack: Vec<Node<Entry>>,
    roots: Vec<Node<Entry>>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `define` against a fresh builder and return the tree roots
    pub fn build<F>(define: F) -> Result<Vec<Node<Entry>>, DslError>
    where
        F: FnOnce(&mut Builder) -> Result<(), DslError>,
    {
        let mut builder = Builder::new();
        define(&mut builder)?;
        Ok(builder.finish())
    }

    /// Return the roots collected so far
    pub fn finish(self) -> Vec<Node<Entry>> {
        self.roots
    }

    /// Define a group; `body` runs immediately with the group in focus
    pub fn describe<F>(&mut self, name: impl Into<String>, body: F) -> Result<(), DslError>
    where
        F: FnOnce(&mut Builder) -> Result<(), DslError>,
    {
        self.stack.push(Node::new(Entry::Group(Group::new(name))));
        let result = body(self);
        let node = self
            .stack
            .pop()
            .expect("describe leaves its own group on the focus stack");
        result?;

        match self.stack.last_mut() {
            Some(parent) => {
                parent.push_child(node);
            }
            None => self.roots.push(node),
        }
        Ok(())
    }

    /// Define a test case in the focused group
    pub fn it(&mut self, name: impl Into<String>, body: Hook) -> Result<CaseHandle<'_>, DslError> {
        let focus = self.stack.last_mut().ok_or(DslError::OutsideDescribe("it"))?;
        let node = focus.push_child(Node::new(Entry::Case(Case::new(name, body))));
        Ok(CaseHandle { node })
    }

    pub fn before_each(&mut self, hook: Hook) -> Result<(), DslError> {
        let group = self.focus("beforeEach")?;
        if group.before_each.is_some() {
            return Err(DslError::HookAlreadySet {
                hook: "beforeEach",
                group: group.name.clone(),
            });
        }
        group.before_each = Some(hook);
        Ok(())
    }

    pub fn after_each(&mut self, hook: Hook) -> Result<(), DslError> {
        let group = self.focus("afterEach")?;
        if group.after_each.is_some() {
            return Err(DslError::HookAlreadySet {
                hook: "afterEach",
                group: group.name.clone(),
            });
        }
        group.after_each = Some(hook);
        Ok(())
    }

    /// Alias of [`Builder::before_each`]
    pub fn before(&mut self, hook: Hook) -> Result<(), DslError> {
        self.before_each(hook)
    }

    /// Alias of [`Builder::after_each`]
    pub fn after(&mut self, hook: Hook) -> Result<(), DslError> {
        self.after_each(hook)
    }

    /// Override the timeout of the focused group and everything below it.
    /// Zero disables the limit.
    pub fn timeout(&mut self, timeout: Duration) -> Result<(), DslError> {
        self.focus("timeout")?.timeout = Some(timeout);
        Ok(())
    }

    fn focus(&mut self, call: &'static str) -> Result<&mut Group, DslError> {
        match self.stack.last_mut().map(Node::value_mut) {
            Some(Entry::Group(group)) => Ok(group),
            _ => Err(DslError::OutsideDescribe(call)),
        }
    }
}

/// Handle onto a just-defined case
#[derive(Debug)]
pub struct CaseHandle<'a> {
    node: &'a mut Node<Entry>,
}

impl CaseHandle<'_> {
    /// Override the timeout of this case only
    pub fn timeout(self, timeout: Duration) -> Self {
        if let Entry::Case(case) = self.node.value_mut() {
            case.timeout = Some(timeout);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Hook {
        Hook::sync(|| Ok(()))
    }

    fn names(node: &Node<Entry>) -> Vec<String> {
        node.children()
            .iter()
            .map(|child| child.value().name().to_string())
            .collect()
    }

    #[test]
    fn test_nesting_attaches_to_focus() {
        let roots = Builder::build(|b| {
            b.describe("Foo", |b| {
                b.it("bar", noop())?;
                b.describe("Baz", |b| {
                    b.it("qux", noop())?;
                    b.it("quux", noop())?;
                    Ok(())
                })
            })?;
            b.describe("Other", |b| {
                b.it("one", noop())?;
                Ok(())
            })
        })
        .unwrap();

        assert_eq!(roots.len(), 2);
        assert_eq!(names(&roots[0]), vec!["bar", "Baz"]);
        assert_eq!(names(&roots[0].children()[1]), vec!["qux", "quux"]);
        assert_eq!(roots[0].size(), 5);
        assert!(roots[0].children()[0].value().is_case());
    }

    #[test]
    fn test_it_outside_describe_fails() {
        let err = Builder::build(|b| {
            b.it("orphan", noop())?;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err, DslError::OutsideDescribe("it"));
        assert_eq!(err.to_string(), "it must be called inside describe");

        let err = Builder::build(|b| b.before_each(noop())).unwrap_err();
        assert_eq!(err, DslError::OutsideDescribe("beforeEach"));
    }

    #[test]
    fn test_hooks_are_write_once() {
        let err = Builder::build(|b| {
            b.describe("Foo", |b| {
                b.before_each(noop())?;
                b.before(noop())
            })
        })
        .unwrap_err();
        assert_eq!(
            err,
            DslError::HookAlreadySet {
                hook: "beforeEach",
                group: "Foo".to_string()
            }
        );

        let err = Builder::build(|b| {
            b.describe("Foo", |b| {
                b.after(noop())?;
                b.after_each(noop())
            })
        })
        .unwrap_err();
        assert!(matches!(err, DslError::HookAlreadySet { hook: "afterEach", .. }));
    }

    #[test]
    fn test_timeouts_are_recorded() {
        let roots = Builder::build(|b| {
            b.describe("Foo", |b| {
                b.timeout(Duration::from_millis(500))?;
                b.it("fast", noop())?.timeout(Duration::from_millis(50));
                b.it("inherit", noop())?;
                Ok(())
            })
        })
        .unwrap();

        let root = &roots[0];
        assert_eq!(root.value().timeout(), Some(Duration::from_millis(500)));
        assert_eq!(
            root.children()[0].value().timeout(),
            Some(Duration::from_millis(50))
        );
        assert_eq!(root.children()[1].value().timeout(), None);
    }

    #[test]
    fn test_failed_build_does_not_leak_into_next() {
        let mut builder = Builder::new();
        let result = builder.describe("Broken", |b| b.after(noop()).and_then(|_| b.after(noop())));
        assert!(result.is_err());
        assert!(builder.finish().is_empty());
    }
}
