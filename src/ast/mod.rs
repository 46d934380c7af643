//! Abstract Syntax Tree definitions
mod operators;
mod syntax_tree;
mod type_spec;

pub use operators::*;
pub use syntax_tree::*;
pub use type_spec::*;
