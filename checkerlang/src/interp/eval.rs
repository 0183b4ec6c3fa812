//! Expression evaluator

use super::args::{bind, Args, CallArg};
use super::config::InterpreterConfig;
use super::env::{child_env, owner_of, Binding, EnvRef, Environment};
use super::error::{InterpResult, RuntimeError};
use super::function::{Closure, Function, NativeFunction};
use super::ops::{self, destructure, Elements};
use super::value::{Object, Value};
use crate::ast::{Arg, Binder, Comprehension, Expr, LambdaDef, Literal, Signature, SourcePos, Spanned};
use crate::util::{find_similar_name, format_suggestion_hint};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Stack growth parameters for deep recursion
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Called with the position of every node before it is evaluated; an error
/// aborts evaluation
pub type StepHook = Box<dyn FnMut(&SourcePos) -> InterpResult<()>>;

/// The interpreter
pub struct Interpreter {
    /// Root environment holding registered natives
    base_env: EnvRef,
    config: InterpreterConfig,
    /// Current invocation depth
    depth: usize,
    step_hook: Option<StepHook>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Interpreter {
            base_env: Environment::new().into_ref(),
            config,
            depth: 0,
            step_hook: None,
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn base_env(&self) -> &EnvRef {
        &self.base_env
    }

    /// Fresh top-level environment on top of the registered natives
    pub fn new_env(&self) -> EnvRef {
        child_env(&self.base_env)
    }

    /// Make a native function visible to every environment from [`Interpreter::new_env`]
    pub fn register(&mut self, native: impl NativeFunction + 'static) {
        let name = native.name().to_string();
        let func = Function::Native(Box::new(native));
        self.base_env.borrow_mut().define(name, Value::Func(Rc::new(func)));
    }

    /// Bind a value in the base environment
    pub fn define(&mut self, name: &str, value: Value) {
        self.base_env.borrow_mut().define(name, value);
    }

    pub fn set_step_hook(&mut self, hook: impl FnMut(&SourcePos) -> InterpResult<()> + 'static) {
        self.step_hook = Some(Box::new(hook));
    }

    pub fn clear_step_hook(&mut self) {
        self.step_hook = None;
    }

    /// Evaluate a node tree in `env`.
    ///
    /// A root block runs its statements directly in `env`, so top-level
    /// definitions stay visible to later evaluations. A `return` at top level
    /// yields its value.
    pub fn evaluate(&mut self, root: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        let result = match &root.node {
            Expr::Block(exprs) => self.eval_sequence(exprs, env)?,
            _ => self.eval(root, env)?,
        };
        match result {
            Value::Return(value) => Ok(*value),
            Value::Break => Err(RuntimeError::control_outside_loop("break").at(&root.pos)),
            Value::Continue => Err(RuntimeError::control_outside_loop("continue").at(&root.pos)),
            value => Ok(value),
        }
    }

    /// Call a function value with positional arguments
    pub fn call(&mut self, func: &Value, args: Vec<Value>, env: &EnvRef, pos: &SourcePos) -> InterpResult<Value> {
        let func = match func {
            Value::Func(func) => Rc::clone(func),
            other => return Err(RuntimeError::not_callable(other.type_name()).at(pos)),
        };
        let args = args.into_iter().map(CallArg::positional).collect();
        self.invoke(&func, args, env, pos)
    }

    /// Bind arguments and run `func`.
    ///
    /// Errors leaving the callee gain a stack frame naming the function and
    /// its bound arguments.
    #[tracing::instrument(level = "trace", skip_all, fields(func = %func.name(), depth = self.depth))]
    pub fn invoke(&mut self, func: &Rc<Function>, args: Vec<CallArg>, env: &EnvRef, pos: &SourcePos) -> InterpResult<Value> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            self.depth -= 1;
            tracing::debug!(max_depth = self.config.max_depth, "recursion limit reached");
            return Err(RuntimeError::stack_overflow().at(pos));
        }
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.invoke_inner(func, args, env, pos)
        });
        self.depth -= 1;
        result
    }

    fn invoke_inner(&mut self, func: &Function, call_args: Vec<CallArg>, env: &EnvRef, pos: &SourcePos) -> InterpResult<Value> {
        let mut args = bind(func.signature(), call_args, pos)?;
        let result = match func {
            Function::Lambda(closure) => self.call_closure(closure, &args),
            Function::Native(native) => self
                .fill_native_defaults(native.signature(), &mut args, env)
                .and_then(|()| native.call(self, &args, env, pos)),
        };
        result.map_err(|mut err| {
            let frame = format!(
                "{}({})",
                func.name(),
                args.to_string_abbrev(self.config.frame_value_width)
            );
            tracing::debug!(%frame, error = %err.message, "error left invocation");
            err.push_frame(frame, pos.clone());
            err.at(pos)
        })
    }

    fn call_closure(&mut self, closure: &Closure, args: &Args) -> InterpResult<Value> {
        let scope = child_env(&closure.env);
        {
            let signature = &closure.def.signature;
            let mut frame = scope.borrow_mut();
            for formal in &signature.formals {
                let binding = match (args.bound(&formal.name), &formal.default) {
                    (Some(value), _) => Binding::Value(value.clone()),
                    (None, Some(default)) => Binding::Default(Rc::clone(default)),
                    (None, None) => Binding::Missing,
                };
                frame.define_binding(formal.name.clone(), binding);
            }
            if let Some(rest) = &signature.rest {
                let collected = args.get_or(rest, Value::list(Vec::new()));
                frame.define(rest.clone(), collected);
            }
        }
        match self.eval(&closure.def.body, &scope)? {
            Value::Return(value) => Ok(*value),
            Value::Break => Err(RuntimeError::control_outside_loop("break").at(&closure.def.body.pos)),
            Value::Continue => Err(RuntimeError::control_outside_loop("continue").at(&closure.def.body.pos)),
            value => Ok(value),
        }
    }

    /// Natives receive fully bound arguments, so unbound defaults are
    /// evaluated up front in the calling environment.
    fn fill_native_defaults(&mut self, signature: &Signature, args: &mut Args, env: &EnvRef) -> InterpResult<()> {
        for formal in &signature.formals {
            if let Some(default) = &formal.default {
                if !args.has_arg(&formal.name) {
                    let value = self.eval_value(default, env)?;
                    args.set_default(&formal.name, value);
                }
            }
        }
        Ok(())
    }

    /// Evaluate an expression with automatic stack growth for deep recursion
    fn eval(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr, env))
    }

    /// Evaluate an operand, where a control signal has no meaning
    fn eval_value(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        let value = self.eval(expr, env)?;
        if value.is_control() {
            return Err(RuntimeError::control_outside_loop(value.type_name()).at(&expr.pos));
        }
        Ok(value)
    }

    fn eval_condition(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<bool> {
        match self.eval_value(expr, env)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::non_boolean_condition(other.type_name()).at(&expr.pos)),
        }
    }

    /// Statements in order; a control signal stops the sequence and is passed up
    fn eval_sequence(&mut self, exprs: &[Spanned<Expr>], env: &EnvRef) -> InterpResult<Value> {
        let mut result = Value::Null;
        for expr in exprs {
            result = self.eval(expr, env)?;
            if result.is_control() {
                break;
            }
        }
        Ok(result)
    }

    /// Inner eval implementation
    fn eval_inner(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        let pos = &expr.pos;
        if let Some(hook) = self.step_hook.as_mut() {
            hook(pos).map_err(|err| err.at(pos))?;
        }

        match &expr.node {
            Expr::Literal(lit) => Ok(literal_value(lit)),
            Expr::Null => Ok(Value::Null),
            Expr::Identifier(name) => self.lookup(name, env, pos),

            Expr::List(items) => Ok(Value::list(self.eval_items(items, env)?)),
            Expr::Set(items) => Ok(Value::set_from(self.eval_items(items, env)?)),
            Expr::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = self.eval_value(key, env)?;
                    let value = self.eval_value(value, env)?;
                    map.insert(key, value);
                }
                Ok(Value::map(map))
            }
            Expr::Object(members) => {
                let mut object = Object::new();
                for (name, value) in members {
                    let value = self.eval_member_value(name, value, env)?;
                    object.set(name, value);
                }
                Ok(Value::object(object))
            }
            Expr::Spread(_) => Err(RuntimeError::invalid_spread("outside of a list or argument list").at(pos)),

            Expr::Lambda(def) => Ok(make_closure("lambda", def, env)),

            Expr::Def { name, value } => {
                let value = self.eval_member(name, value, env)?;
                if value.is_control() {
                    return Ok(value);
                }
                env.borrow_mut().define(name.clone(), value.clone());
                Ok(value)
            }
            Expr::DefDestructuring { names, value } => {
                let value = self.eval(value, env)?;
                if value.is_control() {
                    return Ok(value);
                }
                let parts = destructure(&value, names.len()).map_err(|err| err.at(pos))?;
                let mut scope = env.borrow_mut();
                for (name, part) in names.iter().zip(parts) {
                    scope.define(name.clone(), part);
                }
                Ok(value)
            }
            Expr::Assign { name, value } => {
                let value = self.eval(value, env)?;
                if value.is_control() {
                    return Ok(value);
                }
                self.assign(name, value.clone(), env, pos)?;
                Ok(value)
            }
            Expr::AssignDestructuring { names, value } => {
                let value = self.eval(value, env)?;
                if value.is_control() {
                    return Ok(value);
                }
                let parts = destructure(&value, names.len()).map_err(|err| err.at(pos))?;
                for (name, part) in names.iter().zip(parts) {
                    self.assign(name, part, env, pos)?;
                }
                Ok(value)
            }

            Expr::Deref { container, index, default } => {
                let target = self.eval_value(container, env)?;
                let key = self.eval_value(index, env)?;
                match (ops::get_indexed(&target, &key), default) {
                    (Ok(value), _) => Ok(value),
                    (Err(err), Some(default)) if is_miss(&err) => self.eval_value(default, env),
                    (Err(err), _) => Err(err.at(pos)),
                }
            }
            Expr::DerefAssign { container, index, value } => {
                let key = self.eval_value(index, env)?;
                let target = self.eval_value(container, env)?;
                let value = self.eval_value(value, env)?;
                ops::set_indexed(&target, key, value).map_err(|err| err.at(pos))
            }
            Expr::Slice { container, start, end } => {
                let target = self.eval_value(container, env)?;
                let start = self.eval_value(start, env)?;
                let start = start.as_int().map_err(|err| RuntimeError::from(err).at(pos))?;
                let end = match end {
                    Some(end) => {
                        let end = self.eval_value(end, env)?;
                        Some(end.as_int().map_err(|err| RuntimeError::from(err).at(pos))?)
                    }
                    None => None,
                };
                ops::slice(&target, start, end).map_err(|err| err.at(pos))
            }
            Expr::DerefInvoke { object, member, args } => self.eval_deref_invoke(object, member, args, env, pos),

            Expr::Call { func, args } => {
                let func = match self.eval_value(func, env)? {
                    Value::Func(func) => func,
                    other => return Err(RuntimeError::not_callable(other.type_name()).at(pos)),
                };
                let mut call_args = Vec::with_capacity(args.len());
                self.eval_args(args, env, &mut call_args)?;
                self.invoke(&func, call_args, env, pos)
            }

            Expr::Block(exprs) => {
                let scope = child_env(env);
                self.eval_sequence(exprs, &scope)
            }
            Expr::If { branches, else_branch } => {
                for (cond, body) in branches {
                    if self.eval_condition(cond, env)? {
                        return self.eval(body, env);
                    }
                }
                match else_branch {
                    Some(body) => self.eval(body, env),
                    None => Ok(Value::TRUE),
                }
            }

            Expr::And { left, right } => {
                if !self.eval_condition(left, env)? {
                    return Ok(Value::FALSE);
                }
                Ok(Value::Bool(self.eval_condition(right, env)?))
            }
            Expr::Or { left, right } => {
                if self.eval_condition(left, env)? {
                    return Ok(Value::TRUE);
                }
                Ok(Value::Bool(self.eval_condition(right, env)?))
            }
            Expr::Xor { left, right } => {
                let left = self.eval_condition(left, env)?;
                let right = self.eval_condition(right, env)?;
                Ok(Value::Bool(left ^ right))
            }
            Expr::Not(inner) => Ok(Value::Bool(!self.eval_condition(inner, env)?)),
            Expr::Binary { left, op, right } => {
                let left = self.eval_value(left, env)?;
                let right = self.eval_value(right, env)?;
                ops::binary(*op, &left, &right).map_err(|err| err.at(pos))
            }
            Expr::Unary { op, expr: inner } => {
                let value = self.eval_value(inner, env)?;
                ops::unary(*op, &value).map_err(|err| err.at(pos))
            }
            Expr::In { element, container } => {
                let element = self.eval_value(element, env)?;
                let container = self.eval_value(container, env)?;
                ops::contains(&container, &element)
                    .map(Value::Bool)
                    .map_err(|err| err.at(pos))
            }

            Expr::For { binder, adapter, source, body } => {
                let source = self.eval_value(source, env)?;
                let mut elements = Elements::of(&source, *adapter).map_err(|err| err.at(pos))?;
                let scope = child_env(env);
                let mut result = Value::Null;
                while let Some(element) = elements.next_value().map_err(|err| err.at(pos))? {
                    bind_binder(binder, element, &scope, pos)?;
                    match self.eval(body, &scope)? {
                        Value::Break => break,
                        Value::Continue => continue,
                        value @ Value::Return(_) => return Ok(value),
                        value => result = value,
                    }
                }
                Ok(result)
            }
            Expr::While { cond, body } => {
                let mut result = Value::Null;
                while self.eval_condition(cond, env)? {
                    match self.eval(body, env)? {
                        Value::Break => break,
                        Value::Continue => continue,
                        value @ Value::Return(_) => return Ok(value),
                        value => result = value,
                    }
                }
                Ok(result)
            }
            Expr::Break => Ok(Value::Break),
            Expr::Continue => Ok(Value::Continue),
            Expr::Return(value) => {
                let value = match value {
                    Some(value) => self.eval_value(value, env)?,
                    None => Value::Null,
                };
                Ok(Value::Return(Box::new(value)))
            }

            Expr::ListComprehension { element, clause } => {
                let mut items = Vec::new();
                self.comprehend(clause, env, pos, |interp, scope| {
                    items.push(interp.eval_value(element, scope)?);
                    Ok(())
                })?;
                Ok(Value::list(items))
            }
            Expr::SetComprehension { element, clause } => {
                let mut items = Vec::new();
                self.comprehend(clause, env, pos, |interp, scope| {
                    items.push(interp.eval_value(element, scope)?);
                    Ok(())
                })?;
                Ok(Value::set_from(items))
            }
            Expr::MapComprehension { key, value, clause } => {
                let mut map = BTreeMap::new();
                self.comprehend(clause, env, pos, |interp, scope| {
                    let key = interp.eval_value(key, scope)?;
                    let value = interp.eval_value(value, scope)?;
                    map.insert(key, value);
                    Ok(())
                })?;
                Ok(Value::map(map))
            }

            Expr::Class { name, members } => {
                let scope = child_env(env);
                let mut object = Object::new();
                for (member, value) in members {
                    let value = self.eval_member_value(member, value, &scope)?;
                    scope.borrow_mut().define(member.clone(), value.clone());
                    object.set(member, value);
                }
                let class = Value::object(object);
                env.borrow_mut().define(name.clone(), class.clone());
                Ok(class)
            }
            Expr::Quote(node) => Ok(Value::Node(Rc::clone(node))),
            Expr::Error(value) => {
                let value = self.eval_value(value, env)?;
                let message = value.as_string().map_err(|err| RuntimeError::from(err).at(pos))?;
                Err(RuntimeError::raised(&message).at(pos))
            }
        }
    }

    /// Resolve a name, evaluating a pending default on first read
    fn lookup(&mut self, name: &str, env: &EnvRef, pos: &SourcePos) -> InterpResult<Value> {
        let binding = env.borrow().lookup(name);
        match binding {
            Some(Binding::Value(value)) => Ok(value),
            Some(Binding::Missing) => Err(RuntimeError::missing_argument(name).at(pos)),
            Some(Binding::Default(default)) => {
                let owner = owner_of(env, name).ok_or_else(|| undefined(name, env).at(pos))?;
                // A default that reads its own formal sees it as missing.
                owner.borrow_mut().define_binding(name, Binding::Missing);
                match self.eval_value(&default, &owner) {
                    Ok(value) => {
                        owner.borrow_mut().define(name, value.clone());
                        Ok(value)
                    }
                    Err(err) => {
                        owner.borrow_mut().define_binding(name, Binding::Default(default));
                        Err(err)
                    }
                }
            }
            None => Err(undefined(name, env).at(pos)),
        }
    }

    fn assign(&mut self, name: &str, value: Value, env: &EnvRef, pos: &SourcePos) -> InterpResult<()> {
        if env.borrow_mut().assign(name, value) {
            Ok(())
        } else {
            Err(undefined(name, env).at(pos))
        }
    }

    /// A definition's value; a lambda literal is named after the definition
    fn eval_member(&mut self, name: &str, value: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        match &value.node {
            Expr::Lambda(def) => Ok(make_closure(name, def, env)),
            _ => self.eval(value, env),
        }
    }

    /// Member of an object literal or class body; a control signal there is an error
    fn eval_member_value(&mut self, name: &str, value: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        let member = self.eval_member(name, value, env)?;
        if member.is_control() {
            return Err(RuntimeError::control_outside_loop(member.type_name()).at(&value.pos));
        }
        Ok(member)
    }

    /// List or set literal items, expanding spreads
    fn eval_items(&mut self, items: &[Spanned<Expr>], env: &EnvRef) -> InterpResult<Vec<Value>> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            match &item.node {
                Expr::Spread(inner) => match self.eval_value(inner, env)? {
                    Value::List(list) => values.extend(list.borrow().iter().cloned()),
                    Value::Set(set) => values.extend(set.borrow().iter().cloned()),
                    other => return Err(RuntimeError::invalid_spread(other.type_name()).at(&item.pos)),
                },
                _ => values.push(self.eval_value(item, env)?),
            }
        }
        Ok(values)
    }

    /// Call-site arguments, expanding spreads.
    ///
    /// A spread map supplies named arguments for its string keys and
    /// positional ones for the rest; lists and sets spread positionally.
    fn eval_args(&mut self, args: &[Arg], env: &EnvRef, out: &mut Vec<CallArg>) -> InterpResult<()> {
        for arg in args {
            let Expr::Spread(inner) = &arg.value.node else {
                let value = self.eval_value(&arg.value, env)?;
                out.push(CallArg {
                    name: arg.name.clone(),
                    value,
                });
                continue;
            };
            match self.eval_value(inner, env)? {
                Value::Map(map) => {
                    // Positional entries go first whatever the key order, so
                    // named ones never precede them.
                    let map = map.borrow();
                    let mut named = Vec::new();
                    for (key, value) in map.iter() {
                        match key {
                            Value::Str(name) => named.push(CallArg::named(name.to_string(), value.clone())),
                            _ => out.push(CallArg::positional(value.clone())),
                        }
                    }
                    out.extend(named);
                }
                Value::List(list) => out.extend(list.borrow().iter().cloned().map(CallArg::positional)),
                Value::Set(set) => out.extend(set.borrow().iter().cloned().map(CallArg::positional)),
                other => return Err(RuntimeError::invalid_spread(other.type_name()).at(&arg.value.pos)),
            }
        }
        Ok(())
    }

    /// `obj->member(args)`: a function member found on the object (or its
    /// prototypes) is called with the object prepended; otherwise the
    /// function named `member` in scope is.
    fn eval_deref_invoke(
        &mut self,
        object: &Spanned<Expr>,
        member: &str,
        args: &[Arg],
        env: &EnvRef,
        pos: &SourcePos,
    ) -> InterpResult<Value> {
        let target = self.eval_value(object, env)?;
        let found = match &target {
            Value::Object(obj) => obj.borrow().resolve(member),
            _ => None,
        };
        let func = match found {
            Some(func) => func,
            None => self.lookup(member, env, pos)?,
        };
        let func = match func {
            Value::Func(func) => func,
            other => return Err(RuntimeError::not_callable(other.type_name()).at(pos)),
        };
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(CallArg::positional(target));
        self.eval_args(args, env, &mut call_args)?;
        self.invoke(&func, call_args, env, pos)
    }

    /// Run a comprehension clause, calling `emit` in the loop scope for every
    /// element that passes the filter
    fn comprehend(
        &mut self,
        clause: &Comprehension,
        env: &EnvRef,
        pos: &SourcePos,
        mut emit: impl FnMut(&mut Self, &EnvRef) -> InterpResult<()>,
    ) -> InterpResult<()> {
        let source = self.eval_value(&clause.source, env)?;
        let mut elements = Elements::of(&source, clause.adapter).map_err(|err| err.at(pos))?;
        let scope = child_env(env);
        while let Some(element) = elements.next_value().map_err(|err| err.at(pos))? {
            bind_binder(&clause.binder, element, &scope, pos)?;
            if let Some(filter) = &clause.filter {
                if !self.eval_condition(filter, &scope)? {
                    continue;
                }
            }
            emit(self, &scope)?;
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n),
        Literal::Decimal(x) => Value::Decimal(*x),
        Literal::Str(s) => Value::Str(Rc::clone(s)),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Pattern(p) => Value::Pattern(Rc::clone(p)),
    }
}

fn make_closure(name: &str, def: &Rc<LambdaDef>, env: &EnvRef) -> Value {
    Value::Func(Rc::new(Function::Lambda(Closure {
        name: name.to_string(),
        def: Rc::clone(def),
        env: Rc::clone(env),
    })))
}

fn bind_binder(binder: &Binder, element: Value, scope: &EnvRef, pos: &SourcePos) -> InterpResult<()> {
    match binder {
        Binder::Name(name) => scope.borrow_mut().define(name.clone(), element),
        Binder::Destructure(names) => {
            let parts = destructure(&element, names.len()).map_err(|err| err.at(pos))?;
            let mut scope = scope.borrow_mut();
            for (name, part) in names.iter().zip(parts) {
                scope.define(name.clone(), part);
            }
        }
    }
    Ok(())
}

/// Missing index or key, which a deref default covers
fn is_miss(err: &RuntimeError) -> bool {
    use super::error::ErrorKind;
    matches!(err.kind, ErrorKind::IndexOutOfBounds | ErrorKind::KeyNotFound)
}

fn undefined(name: &str, env: &EnvRef) -> RuntimeError {
    let names = env.borrow().visible_names();
    let candidates: Vec<&str> = names.iter().map(String::as_str).collect();
    let hint = format_suggestion_hint(find_similar_name(name, &candidates, 2));
    RuntimeError::undefined_variable(name, &hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::{Adapter, BinOp, Formal};
    use crate::interp::error::ErrorKind;

    fn run(expr: Spanned<Expr>) -> InterpResult<Value> {
        let mut interp = Interpreter::new();
        let env = interp.new_env();
        interp.evaluate(&expr, &env)
    }

    #[test]
    fn test_literals() {
        assert_eq!(run(int(42)).unwrap(), Value::Int(42));
        assert_eq!(run(string("hi")).unwrap(), Value::str("hi"));
        assert_eq!(run(null()).unwrap(), Value::Null);
    }

    #[test]
    fn test_root_block_defines_in_given_env() {
        let mut interp = Interpreter::new();
        let env = interp.new_env();
        interp.evaluate(&block(vec![def("x", int(1))]), &env).unwrap();
        assert_eq!(env.borrow().get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_nested_block_scope() {
        let program = block(vec![
            def("x", int(1)),
            block(vec![def("x", int(2))]),
            ident("x"),
        ]);
        assert_eq!(run(program).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_empty_block_is_null() {
        assert_eq!(run(block(vec![])).unwrap(), Value::Null);
    }

    #[test]
    fn test_if_without_else_yields_true() {
        let program = if_elif(vec![(boolean(false), int(1))], None);
        assert_eq!(run(program).unwrap(), Value::TRUE);
    }

    #[test]
    fn test_non_boolean_condition() {
        let err = run(if_then_else(int(1), int(2), int(3))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NonBooleanCondition);
    }

    #[test]
    fn test_and_short_circuits() {
        // the right operand would fail if evaluated
        let program = and(boolean(false), ident("nope"));
        assert_eq!(run(program).unwrap(), Value::FALSE);
        let program = or(boolean(true), ident("nope"));
        assert_eq!(run(program).unwrap(), Value::TRUE);
    }

    #[test]
    fn test_call_closure() {
        let program = block(vec![
            def("add", lambda(["a", "b"], binary(ident("a"), BinOp::Add, ident("b")))),
            call_pos(ident("add"), vec![int(2), int(3)]),
        ]);
        assert_eq!(run(program).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_lazy_default_sees_earlier_formal() {
        let sig = Signature::new(["a"]).with_formal(Formal::with_default(
            "b",
            binary(ident("a"), BinOp::Mul, int(10)),
        ));
        let program = block(vec![
            def("f", lambda_sig(sig, binary(ident("a"), BinOp::Add, ident("b")))),
            call_pos(ident("f"), vec![int(2)]),
        ]);
        assert_eq!(run(program).unwrap(), Value::Int(22));
    }

    #[test]
    fn test_missing_argument_only_on_read() {
        let program = block(vec![
            def("f", lambda(["a", "b"], ident("a"))),
            call_pos(ident("f"), vec![int(7)]),
        ]);
        assert_eq!(run(program).unwrap(), Value::Int(7));

        let program = block(vec![
            def("f", lambda(["a", "b"], ident("b"))),
            call_pos(ident("f"), vec![int(7)]),
        ]);
        let err = run(program).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingArgument);
    }

    #[test]
    fn test_return_from_loop_inside_function() {
        let body = block(vec![
            for_each(
                Binder::Name("x".into()),
                Adapter::Elements,
                ident("xs"),
                if_elif(vec![(binary(ident("x"), BinOp::Gt, int(2)), ret(Some(ident("x"))))], None),
            ),
            int(-1),
        ]);
        let program = block(vec![
            def("first_big", lambda(["xs"], body)),
            call_pos(ident("first_big"), vec![list(vec![int(1), int(3), int(5)])]),
        ]);
        assert_eq!(run(program).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_break_outside_loop() {
        let program = block(vec![def("f", lambda([], brk())), call_pos(ident("f"), vec![])]);
        let err = run(program).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ControlOutsideLoop);
        assert_eq!(run(block(vec![cont()])).unwrap_err().kind, ErrorKind::ControlOutsideLoop);
    }

    #[test]
    fn test_top_level_return() {
        let program = block(vec![ret(Some(int(4))), int(5)]);
        assert_eq!(run(program).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_while_with_break_and_continue() {
        // i counts to 10, sum skips odd numbers, stops at 8
        let program = block(vec![
            def("i", int(0)),
            def("sum", int(0)),
            while_loop(
                boolean(true),
                block(vec![
                    assign("i", binary(ident("i"), BinOp::Add, int(1))),
                    if_elif(vec![(binary(ident("i"), BinOp::Gt, int(8)), brk())], None),
                    if_elif(vec![(binary(binary(ident("i"), BinOp::Mod, int(2)), BinOp::Eq, int(1)), cont())], None),
                    assign("sum", binary(ident("sum"), BinOp::Add, ident("i"))),
                ]),
            ),
            ident("sum"),
        ]);
        assert_eq!(run(program).unwrap(), Value::Int(2 + 4 + 6 + 8));
    }

    #[test]
    fn test_assign_undefined_suggests() {
        let program = block(vec![def("count", int(0)), assign("cuont", int(1))]);
        let err = run(program).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
        assert_eq!(err.message, "undefined variable: cuont (did you mean `count`?)");
    }

    #[test]
    fn test_step_hook_sees_every_node_and_can_abort() {
        use std::cell::Cell;
        let mut interp = Interpreter::new();
        let env = interp.new_env();
        let steps = Rc::new(Cell::new(0));
        let seen = Rc::clone(&steps);
        interp.set_step_hook(move |_| {
            seen.set(seen.get() + 1);
            if seen.get() > 3 {
                return Err(RuntimeError::raised("interrupted"));
            }
            Ok(())
        });
        let program = binary(int(1), BinOp::Add, int(2));
        assert_eq!(interp.evaluate(&program, &env).unwrap(), Value::Int(3));
        assert_eq!(steps.get(), 3);
        let err = interp.evaluate(&program, &env).unwrap_err();
        assert_eq!(err.message, "interrupted");
        interp.clear_step_hook();
        assert!(interp.evaluate(&program, &env).is_ok());
    }

    #[test]
    fn test_class_defines_name_and_members_see_each_other() {
        let program = block(vec![
            class("Point", vec![("x", int(1)), ("y", binary(ident("x"), BinOp::Add, int(1)))]),
            deref(ident("Point"), string("y")),
        ]);
        assert_eq!(run(program).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_quote_yields_node() {
        let value = run(quote(binary(int(1), BinOp::Add, int(2)))).unwrap();
        assert_eq!(value.type_name(), "node");
        assert_eq!(value.as_node().unwrap().to_string(), "(1 + 2)");
    }

    #[test]
    fn test_error_expression() {
        let err = run(raise(string("bad input"))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Raised);
        assert_eq!(err.message, "bad input");
    }
}
