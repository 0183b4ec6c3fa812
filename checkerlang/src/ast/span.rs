//! Positions attached to nodes and errors

use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// A position in a named source: file (or script) name, line and column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePos {
    pub source: Rc<str>,
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    pub fn new(source: impl Into<Rc<str>>, line: u32, column: u32) -> Self {
        Self {
            source: source.into(),
            line,
            column,
        }
    }

    /// Position used for nodes that were not produced from source text
    pub fn unknown() -> Self {
        Self::new("-", 1, 1)
    }
}

impl Default for SourcePos {
    fn default() -> Self {
        Self::unknown()
    }
}

impl std::fmt::Display for SourcePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}

/// A node together with where it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub pos: SourcePos,
}

impl<T> Spanned<T> {
    pub fn new(node: T, pos: SourcePos) -> Self {
        Self { node, pos }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            pos: self.pos,
        }
    }

    /// Replace the position, keeping the node
    pub fn at(mut self, pos: SourcePos) -> Self {
        self.pos = pos;
        self
    }
}
