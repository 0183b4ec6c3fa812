//! Errors raised while evaluating nodes

use crate::ast::SourcePos;
use std::fmt;
use thiserror::Error;

/// A value could not be coerced to the requested kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {from} to {to}")]
pub struct ConversionError {
    pub from: &'static str,
    pub to: &'static str,
}

impl ConversionError {
    pub fn new(from: &'static str, to: &'static str) -> Self {
        ConversionError { from, to }
    }
}

/// One invocation boundary crossed by an error on its way out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// `name(arg=value, ...)`, values abbreviated
    pub signature: String,
    /// Position of the call site
    pub pos: SourcePos,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.signature, self.pos)
    }
}

/// Error raised while evaluating, with the position and the invocation frames it crossed
#[derive(Debug, Clone, Error)]
#[error("Runtime error: {message}{}", pos_suffix(.pos))]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub pos: Option<SourcePos>,
    pub frames: Vec<StackFrame>,
}

fn pos_suffix(pos: &Option<SourcePos>) -> String {
    match pos {
        Some(pos) => format!(" ({pos})"),
        None => String::new(),
    }
}

/// What went wrong, for hosts that match on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Coercion failed or an operand had the wrong kind
    TypeMismatch,
    /// Name not bound in any enclosing scope
    UndefinedVariable,
    /// Named argument not among the callee's formals
    UnknownArgument,
    /// Positional argument after a named one at the call site
    PositionalAfterNamed,
    /// More positional arguments than formals and no rest formal
    TooManyArguments,
    /// Required formal read but never bound
    MissingArgument,
    /// List or string index past either end
    IndexOutOfBounds,
    /// Map key or object member missing
    KeyNotFound,
    /// Condition did not evaluate to a boolean
    NonBooleanCondition,
    /// Call of a value that is not a function
    NotCallable,
    /// Indexed assignment into something that is not a container
    InvalidAssignTarget,
    /// Spread of a non-iterable or in a position that does not take one
    InvalidSpread,
    /// Int or decimal division or remainder by zero
    DivisionByZero,
    /// Integer arithmetic overflow
    Overflow,
    /// Invocation depth over `max_depth`
    StackOverflow,
    /// break/continue outside of a loop
    ControlOutsideLoop,
    /// IO error while reading an input stream
    Io,
    /// Raised by an `error` expression
    Raised,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
            pos: None,
            frames: Vec::new(),
        }
    }

    /// Attach a position unless a more precise one is already known
    pub fn at(mut self, pos: &SourcePos) -> Self {
        if self.pos.is_none() {
            self.pos = Some(pos.clone());
        }
        self
    }

    /// Prefix the message, e.g. with the argument being converted
    pub fn with_context(mut self, context: &str) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }

    pub fn push_frame(&mut self, signature: String, pos: SourcePos) {
        self.frames.push(StackFrame { signature, pos });
    }

    /// Frames, innermost first
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("type error: expected {expected}, got {got}"),
        )
    }

    pub fn undefined_variable(name: &str, hint: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            format!("undefined variable: {name}{hint}"),
        )
    }

    pub fn unknown_argument(name: &str, hint: &str) -> Self {
        Self::new(
            ErrorKind::UnknownArgument,
            format!("argument {name} is unknown{hint}"),
        )
    }

    pub fn positional_after_named(index: usize) -> Self {
        Self::new(
            ErrorKind::PositionalAfterNamed,
            format!("positional argument {} follows a named argument", index + 1),
        )
    }

    pub fn too_many_arguments(max: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::TooManyArguments,
            format!("too many arguments: expects at most {max}, got {got}"),
        )
    }

    pub fn missing_argument(name: &str) -> Self {
        Self::new(
            ErrorKind::MissingArgument,
            format!("missing argument {name}"),
        )
    }

    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            ErrorKind::IndexOutOfBounds,
            format!("index {index} out of bounds for length {len}"),
        )
    }

    pub fn key_not_found(key: &str) -> Self {
        Self::new(ErrorKind::KeyNotFound, format!("key {key} not found"))
    }

    pub fn non_boolean_condition(got: &str) -> Self {
        Self::new(
            ErrorKind::NonBooleanCondition,
            format!("expected boolean condition, got {got}"),
        )
    }

    pub fn not_callable(got: &str) -> Self {
        Self::new(
            ErrorKind::NotCallable,
            format!("expected function, got {got}"),
        )
    }

    pub fn invalid_assign_target(got: &str) -> Self {
        Self::new(
            ErrorKind::InvalidAssignTarget,
            format!("cannot assign by index into {got}"),
        )
    }

    pub fn invalid_spread(got: &str) -> Self {
        Self::new(ErrorKind::InvalidSpread, format!("cannot spread {got}"))
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero")
    }

    pub fn overflow(op: &str) -> Self {
        Self::new(ErrorKind::Overflow, format!("integer overflow in {op}"))
    }

    pub fn stack_overflow() -> Self {
        Self::new(ErrorKind::StackOverflow, "stack overflow: too deep recursion")
    }

    pub fn control_outside_loop(what: &str) -> Self {
        Self::new(
            ErrorKind::ControlOutsideLoop,
            format!("cannot use {what} without surrounding loop"),
        )
    }

    pub fn io_error(msg: &str) -> Self {
        Self::new(ErrorKind::Io, format!("IO error: {msg}"))
    }

    pub fn raised(msg: &str) -> Self {
        Self::new(ErrorKind::Raised, msg)
    }
}

impl From<ConversionError> for RuntimeError {
    fn from(err: ConversionError) -> Self {
        RuntimeError::new(ErrorKind::TypeMismatch, err.to_string())
    }
}

/// Result of evaluating anything
pub type InterpResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_variable() {
        let err = RuntimeError::undefined_variable("foo", "");
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
        assert!(err.message.contains("foo"));
        assert!(err.pos.is_none());
    }

    #[test]
    fn test_conversion_error_becomes_type_mismatch() {
        let err: RuntimeError = ConversionError::new("string", "int").into();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(err.message, "cannot convert string to int");
    }

    #[test]
    fn test_at_keeps_first_position() {
        let inner = SourcePos::new("a", 2, 3);
        let outer = SourcePos::new("a", 9, 1);
        let err = RuntimeError::division_by_zero().at(&inner).at(&outer);
        assert_eq!(err.pos, Some(inner));
    }

    #[test]
    fn test_display_with_and_without_pos() {
        let err = RuntimeError::missing_argument("b");
        assert_eq!(err.to_string(), "Runtime error: missing argument b");
        let err = err.at(&SourcePos::new("main", 4, 2));
        assert_eq!(err.to_string(), "Runtime error: missing argument b (main:4:2)");
    }

    #[test]
    fn test_frames_accumulate_innermost_first() {
        let mut err = RuntimeError::raised("boom");
        err.push_frame("inner(x=1)".to_string(), SourcePos::new("m", 1, 1));
        err.push_frame("outer()".to_string(), SourcePos::new("m", 5, 1));
        assert_eq!(err.frames().len(), 2);
        assert_eq!(err.frames()[0].signature, "inner(x=1)");
        assert_eq!(err.frames()[1].to_string(), "outer() (m:5:1)");
    }

    #[test]
    fn test_index_out_of_bounds() {
        let err = RuntimeError::index_out_of_bounds(10, 5);
        assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
        assert!(err.message.contains("10"));
        assert!(err.message.contains('5'));
    }
}
