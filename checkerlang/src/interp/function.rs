//! Callable values: closures over lambda nodes and host-provided natives

use super::args::Args;
use super::env::EnvRef;
use super::error::InterpResult;
use super::eval::Interpreter;
use super::value::Value;
use crate::ast::{LambdaDef, Signature, SourcePos};
use std::fmt;
use std::rc::Rc;

/// Builtin function type.
///
/// Receives the interpreter (for calling back into script functions), the
/// bound arguments, the caller's environment and the call-site position.
pub type BuiltinFn = fn(&mut Interpreter, &Args, &EnvRef, &SourcePos) -> InterpResult<Value>;

/// A function implemented by the host
pub trait NativeFunction {
    fn name(&self) -> &str;

    fn signature(&self) -> &Signature;

    fn call(&self, interp: &mut Interpreter, args: &Args, env: &EnvRef, pos: &SourcePos) -> InterpResult<Value>;
}

/// Native function backed by a plain fn pointer
pub struct Builtin {
    name: String,
    signature: Signature,
    func: BuiltinFn,
}

impl Builtin {
    pub fn new(name: impl Into<String>, signature: Signature, func: BuiltinFn) -> Self {
        Builtin {
            name: name.into(),
            signature,
            func,
        }
    }
}

impl NativeFunction for Builtin {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, interp: &mut Interpreter, args: &Args, env: &EnvRef, pos: &SourcePos) -> InterpResult<Value> {
        (self.func)(interp, args, env, pos)
    }
}

/// Lambda paired with the environment it was created in
pub struct Closure {
    /// Name of the definition that created it, or `lambda`
    pub name: String,
    pub def: Rc<LambdaDef>,
    pub env: EnvRef,
}

pub enum Function {
    Lambda(Closure),
    Native(Box<dyn NativeFunction>),
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Lambda(closure) => &closure.name,
            Function::Native(native) => native.name(),
        }
    }

    pub fn signature(&self) -> &Signature {
        match self {
            Function::Lambda(closure) => &closure.def.signature,
            Function::Native(native) => native.signature(),
        }
    }
}

// The captured environment usually contains the closure itself.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Lambda(closure) => write!(f, "Lambda({})", closure.name),
            Function::Native(native) => write!(f, "Native({})", native.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::interp::env::Environment;

    fn answer(_: &mut Interpreter, _: &Args, _: &EnvRef, _: &SourcePos) -> InterpResult<Value> {
        Ok(Value::Int(42))
    }

    #[test]
    fn test_builtin_name_and_signature() {
        let builtin = Builtin::new("answer", Signature::new(["a", "b"]), answer);
        let func = Function::Native(Box::new(builtin));
        assert_eq!(func.name(), "answer");
        assert_eq!(func.signature().names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(format!("{func:?}"), "Native(answer)");
    }

    #[test]
    fn test_closure_debug_does_not_walk_env() {
        let env = Environment::new().into_ref();
        let def = Rc::new(LambdaDef {
            signature: Rc::new(Signature::new(["x"])),
            body: Rc::new(build::ident("x")),
        });
        let func = Rc::new(Function::Lambda(Closure {
            name: "id".to_string(),
            def,
            env: Rc::clone(&env),
        }));
        env.borrow_mut().define("id", Value::Func(Rc::clone(&func)));
        assert_eq!(format!("{func:?}"), "Lambda(id)");
        assert_eq!(Value::Func(func).to_string(), "<#id>");
    }
}
