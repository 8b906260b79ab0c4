//! Rose tree
//!
//! Ordered, generic tree used to hold the definition tree built by the DSL.

mod node;

pub use node::{Node, Paths};
