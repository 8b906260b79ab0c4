//! Test definition DSL
//!
//! `describe`/`it`/`before_each`/`after_each`/`timeout` calls on a
//! [`Builder`] produce a tree of [`Entry`] values.

mod builder;
mod entry;
mod suite;

pub use builder::{Builder, CaseHandle, DslError};
pub use entry::{Case, Entry, Group};
pub use suite::Suite;
