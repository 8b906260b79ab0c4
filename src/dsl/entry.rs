//! Values stored in the definition tree

use std::fmt;
use std::time::Duration;

use crate::hook::Hook;

/// A `describe` block
#[derive(Clone, Debug)]
pub struct Group {
    pub name: String,
    pub before_each: Option<Hook>,
    pub after_each: Option<Hook>,
    /// `None` inherits the ancestor's timeout
    pub timeout: Option<Duration>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before_each: None,
            after_each: None,
            timeout: None,
        }
    }
}

/// An `it` block
#[derive(Clone, Debug)]
pub struct Case {
    pub name: String,
    pub body: Hook,
    pub timeout: Option<Duration>,
}

impl Case {
    pub fn new(name: impl Into<String>, body: Hook) -> Self {
        Self {
            name: name.into(),
            body,
            timeout: None,
        }
    }
}

/// Tree node payload
#[derive(Clone, Debug)]
pub enum Entry {
    Group(Group),
    Case(Case),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::Group(group) => &group.name,
            Entry::Case(case) => &case.name,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Entry::Group(group) => group.timeout,
            Entry::Case(case) => case.timeout,
        }
    }

    pub fn is_case(&self) -> bool {
        matches!(self, Entry::Case(_))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Group(group) => write!(f, "describe({})", group.name),
            Entry::Case(case) => write!(f, "it({})", case.name),
        }
    }
}
