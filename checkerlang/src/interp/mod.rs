//! Tree-walking interpreter
//!
//! Evaluates node trees against chained environments. Control flow
//! (`break`, `continue`, `return`) travels as [`Value`] variants; genuine
//! failures travel as [`RuntimeError`].

pub mod args;
pub mod config;
pub mod env;
mod error;
mod eval;
mod function;
mod ops;
mod value;

pub use args::{bind, Args, CallArg};
pub use config::{ConfigError, InterpreterConfig};
pub use env::{child_env, Binding, EnvRef, Environment};
pub use error::*;
pub use eval::{Interpreter, StepHook};
pub use function::{Builtin, BuiltinFn, Closure, Function, NativeFunction};
pub use ops::values_equal;
pub use value::*;
