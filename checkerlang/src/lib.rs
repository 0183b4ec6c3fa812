//! Checkerlang runtime core
//!
//! Values, environments, argument binding and evaluation for a small
//! dynamically-typed scripting language. Node trees come from an external
//! parser, from JSON (see [`Spanned::from_json`]) or from [`ast::build`].

pub mod ast;
pub mod interp;
pub mod util;

pub use ast::{Expr, SourcePos, Spanned};
pub use interp::{InterpResult, Interpreter, RuntimeError, Value};
