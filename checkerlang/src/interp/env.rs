//! Lexical scopes
//!
//! A scope maps names to bindings and points at the scope it was created in.
//! Closures keep their defining scope alive through the `Rc`.

use super::Value;
use crate::ast::{Expr, Spanned};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

pub type EnvRef = Rc<RefCell<Environment>>;

/// What a name is bound to in one scope
#[derive(Debug, Clone)]
pub enum Binding {
    Value(Value),
    /// Formal whose default is evaluated on first read, in the scope that owns it
    Default(Rc<Spanned<Expr>>),
    /// Required formal that received no argument; reading it is an error
    Missing,
}

/// One lexical scope
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: HashMap<String, Binding>,
    parent: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: EnvRef) -> Self {
        Environment {
            parent: Some(parent),
            ..Self::default()
        }
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    pub fn parent(&self) -> Option<EnvRef> {
        self.parent.clone()
    }

    /// Define a variable in the current scope, shadowing any outer one
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), Binding::Value(value));
    }

    pub fn define_binding(&mut self, name: impl Into<String>, binding: Binding) {
        self.bindings.insert(name.into(), binding);
    }

    /// Look up an evaluated value in the scope chain.
    ///
    /// Pending defaults and missing formals read as `None`; the interpreter
    /// resolves those through [`Environment::lookup`].
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.lookup(name)? {
            Binding::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Nearest binding of `name` in the scope chain
    pub fn lookup(&self, name: &str) -> Option<Binding> {
        if let Some(binding) = self.bindings.get(name) {
            Some(binding.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().lookup(name)
        } else {
            None
        }
    }

    /// Rebind `name` in the nearest scope that defines it
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(binding) = self.bindings.get_mut(name) {
            *binding = Binding::Value(value);
            true
        } else if let Some(parent) = &self.parent {
            parent.borrow_mut().assign(name, value)
        } else {
            false
        }
    }

    /// Bound anywhere up the chain, evaluated or not
    pub fn contains(&self, name: &str) -> bool {
        self.contains_local(name) || self.parent.as_ref().is_some_and(|parent| parent.borrow().contains(name))
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn bindings(&self) -> &HashMap<String, Binding> {
        &self.bindings
    }

    /// Every name visible from this scope, for suggestions
    pub fn visible_names(&self) -> BTreeSet<String> {
        let mut names = match &self.parent {
            Some(parent) => parent.borrow().visible_names(),
            None => BTreeSet::new(),
        };
        names.extend(self.bindings.keys().cloned());
        names
    }
}

/// Fresh scope nested in `parent`
pub fn child_env(parent: &EnvRef) -> EnvRef {
    Environment::with_parent(Rc::clone(parent)).into_ref()
}

/// The scope in the chain starting at `env` that binds `name`
pub fn owner_of(env: &EnvRef, name: &str) -> Option<EnvRef> {
    let mut current = Rc::clone(env);
    loop {
        if current.borrow().contains_local(name) {
            return Some(current);
        }
        let parent = current.borrow().parent()?;
        current = parent;
    }
}
