//! Test selection by full title

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::models::Test;

/// Filter applied to resolved tests before they reach a runner
#[derive(Clone, Debug, Default)]
pub enum Selection {
    #[default]
    All,
    /// Full title starts with the given text
    Prefix(String),
    /// Full title matches the regular expression
    Pattern(Regex),
}

impl Selection {
    /// `/expr/` is a regular expression, an empty string selects everything
    /// and anything else is a title prefix.
    pub fn parse(input: &str) -> Result<Self, regex::Error> {
        if input.is_empty() {
            return Ok(Selection::All);
        }
        match input
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            Some(expr) => Ok(Selection::Pattern(Regex::new(expr)?)),
            None => Ok(Selection::Prefix(input.to_string())),
        }
    }

    pub fn matches(&self, title: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Prefix(prefix) => title.starts_with(prefix.as_str()),
            Selection::Pattern(re) => re.is_match(title),
        }
    }

    /// Keep the selected tests, in order
    pub fn apply(&self, tests: Vec<Test>) -> Vec<Test> {
        tests
            .into_iter()
            .filter(|test| self.matches(test.full_title()))
            .collect()
    }
}

impl FromStr for Selection {
    type Err = regex::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selection::parse(s)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => write!(f, "all"),
            Selection::Prefix(prefix) => write!(f, "{prefix}"),
            Selection::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::Hook;
    use std::time::Duration;

    fn titled(parts: &[&str]) -> Test {
        Test::new(
            0,
            parts.iter().map(|p| p.to_string()).collect(),
            Duration::ZERO,
            Vec::new(),
            Hook::sync(|| Ok(())),
            Vec::new(),
        )
    }

    fn sample() -> Vec<Test> {
        vec![
            titled(&["Foo", "bar"]),
            titled(&["Foo", "Baz", "qux"]),
            titled(&["Foo", "Baz", "quux"]),
        ]
    }

    fn titles(tests: &[Test]) -> Vec<&str> {
        tests.iter().map(Test::full_title).collect()
    }

    #[test]
    fn test_prefix_selection() {
        let selection: Selection = "Foo Baz".parse().unwrap();
        let selected = selection.apply(sample());
        assert_eq!(titles(&selected), vec!["Foo Baz qux", "Foo Baz quux"]);
    }

    #[test]
    fn test_pattern_selection() {
        let selection = Selection::parse("/quux$/").unwrap();
        assert!(matches!(selection, Selection::Pattern(_)));
        let selected = selection.apply(sample());
        assert_eq!(titles(&selected), vec!["Foo Baz quux"]);
        assert_eq!(selection.to_string(), "/quux$/");
    }

    #[test]
    fn test_empty_selects_all() {
        let selection = Selection::parse("").unwrap();
        assert_eq!(selection.apply(sample()).len(), 3);
    }

    #[test]
    fn test_lone_slash_is_a_prefix() {
        assert!(matches!(Selection::parse("/").unwrap(), Selection::Prefix(_)));
        assert!(Selection::parse("/(/").is_err());
    }
}
