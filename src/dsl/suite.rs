//! Re-runnable suite definitions

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::dsl::{Builder, DslError, Entry};
use crate::models::Test;
use crate::resolve;
use crate::tree::Node;

type Define = dyn Fn(&mut Builder) -> Result<(), DslError> + Send + Sync;

/// A test definition that can be built any number of times.
///
/// Worker processes rebuild the same suite to reconstruct their share of
/// the tests.
#[derive(Clone)]
pub struct Suite {
    define: Arc<Define>,
}

impl Suite {
    pub fn new<F>(define: F) -> Self
    where
        F: Fn(&mut Builder) -> Result<(), DslError> + Send + Sync + 'static,
    {
        Self {
            define: Arc::new(define),
        }
    }

    /// Evaluate the definition into tree roots
    pub fn build(&self) -> Result<Vec<Node<Entry>>, DslError> {
        Builder::build(|builder| (self.define)(builder))
    }

    /// Build and resolve into runnable tests
    pub fn tests(&self, default_timeout: Duration) -> Result<Vec<Test>, DslError> {
        let roots = self.build()?;
        Ok(resolve::resolve(&roots, default_timeout))
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Suite")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::Hook;

    #[test]
    fn test_each_build_is_fresh() {
        let suite = Suite::new(|b| {
            b.describe("Foo", |b| {
                b.it("bar", Hook::sync(|| Ok(())))?;
                Ok(())
            })
        });

        let first = suite.tests(Duration::from_secs(2)).unwrap();
        let second = suite.tests(Duration::from_secs(2)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].full_title(), second[0].full_title());
    }

    #[test]
    fn test_build_error_propagates() {
        let suite = Suite::new(|b| {
            b.it("orphan", Hook::sync(|| Ok(())))?;
            Ok(())
        });
        assert_eq!(
            suite.tests(Duration::ZERO).unwrap_err(),
            DslError::OutsideDescribe("it")
        );
    }
}
