//! Abstract Syntax Tree definitions
//!
//! The node tree is produced by an external parser (or by [`build`]) and is
//! never mutated by evaluation; lambda bodies are shared with the closures
//! created from them.

pub mod build;
mod expr;
mod span;
pub mod vars;

pub use expr::*;
pub use span::*;
pub use vars::{analyze, NameSet, VarSets};
