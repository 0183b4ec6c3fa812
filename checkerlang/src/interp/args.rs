//! Binding call-site arguments to a callee's formals

use super::error::{ConversionError, InterpResult, RuntimeError};
use super::function::Function;
use super::value::{InputStream, ListRef, MapRef, ObjectRef, OutputStream, SetRef, Value};
use crate::ast::{Signature, SourcePos};
use crate::util::{abbreviate, find_similar_name, format_suggestion_hint};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::rc::Rc;

/// An evaluated call-site argument
#[derive(Debug, Clone)]
pub struct CallArg {
    pub name: Option<String>,
    pub value: Value,
}

impl CallArg {
    pub fn positional(value: Value) -> Self {
        CallArg { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Value) -> Self {
        CallArg {
            name: Some(name.into()),
            value,
        }
    }
}

/// Arguments bound to formal names
#[derive(Debug, Clone)]
pub struct Args {
    /// Formal names in declaration order, rest formal last
    names: Vec<String>,
    values: HashMap<String, Value>,
    pos: SourcePos,
}

/// Bind call-site arguments to `signature`.
///
/// Named arguments are applied first. Positional arguments then fill the
/// formals left unbound, in order; overflow goes to the rest formal, which is
/// always bound (possibly to an empty list). Formals that receive nothing stay
/// unbound here; the caller decides between a default and an error.
pub fn bind(signature: &Signature, call_args: Vec<CallArg>, pos: &SourcePos) -> InterpResult<Args> {
    let first_named = call_args.iter().position(|arg| arg.name.is_some());
    let mut values = HashMap::new();
    let mut positional = Vec::new();

    for (index, arg) in call_args.into_iter().enumerate() {
        match arg.name {
            Some(name) => {
                if signature.formal(&name).is_none() {
                    let candidates: Vec<&str> = signature.formals.iter().map(|f| f.name.as_str()).collect();
                    let hint = format_suggestion_hint(find_similar_name(&name, &candidates, 2));
                    return Err(RuntimeError::unknown_argument(&name, &hint).at(pos));
                }
                values.insert(name, arg.value);
            }
            None => positional.push((index, arg.value)),
        }
    }

    let supplied = positional.len();
    let mut formals = signature.formals.iter();
    let mut rest = Vec::new();
    for (index, value) in positional {
        if first_named.is_some_and(|named| named < index) {
            return Err(RuntimeError::positional_after_named(index).at(pos));
        }
        match formals.by_ref().find(|f| !values.contains_key(&f.name)) {
            Some(formal) => {
                values.insert(formal.name.clone(), value);
            }
            None if signature.rest.is_some() => rest.push(value),
            None => {
                return Err(RuntimeError::too_many_arguments(signature.formals.len(), supplied).at(pos));
            }
        }
    }
    if let Some(rest_name) = &signature.rest {
        values.insert(rest_name.clone(), Value::list(rest));
    }

    Ok(Args {
        names: signature.names().map(str::to_string).collect(),
        values,
        pos: pos.clone(),
    })
}

impl Args {
    pub fn pos(&self) -> &SourcePos {
        &self.pos
    }

    pub fn has_arg(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Bound value, if any
    pub fn bound(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub(crate) fn set_default(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> InterpResult<Value> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::missing_argument(name).at(&self.pos))
    }

    pub fn get_or(&self, name: &str, default: Value) -> Value {
        self.values.get(name).cloned().unwrap_or(default)
    }

    /// Unbound or bound to null
    pub fn is_null(&self, name: &str) -> bool {
        matches!(self.values.get(name), None | Some(Value::Null))
    }

    fn convert<T>(&self, name: &str, f: impl FnOnce(&Value) -> Result<T, ConversionError>) -> InterpResult<T> {
        let value = self.get(name)?;
        f(&value).map_err(|err| {
            RuntimeError::from(err)
                .with_context(&format!("argument {name}"))
                .at(&self.pos)
        })
    }

    /// String argument, strictly; see [`Args::get_as_string`] for coercion
    pub fn get_string(&self, name: &str) -> InterpResult<Rc<str>> {
        self.convert(name, |v| match v {
            Value::Str(s) => Ok(Rc::clone(s)),
            other => Err(ConversionError::new(other.type_name(), "string")),
        })
    }

    pub fn get_as_string(&self, name: &str) -> InterpResult<Rc<str>> {
        self.convert(name, Value::as_string)
    }

    pub fn get_int(&self, name: &str) -> InterpResult<i64> {
        self.convert(name, Value::as_int)
    }

    pub fn get_decimal(&self, name: &str) -> InterpResult<f64> {
        self.convert(name, Value::as_decimal)
    }

    /// Int or decimal, unconverted
    pub fn get_numerical(&self, name: &str) -> InterpResult<Value> {
        self.convert(name, |v| match v {
            Value::Int(_) | Value::Decimal(_) => Ok(v.clone()),
            other => Err(ConversionError::new(other.type_name(), "numerical")),
        })
    }

    pub fn get_bool(&self, name: &str) -> InterpResult<bool> {
        self.convert(name, Value::as_bool)
    }

    pub fn get_list(&self, name: &str) -> InterpResult<ListRef> {
        self.convert(name, Value::as_list)
    }

    pub fn get_set(&self, name: &str) -> InterpResult<SetRef> {
        self.convert(name, Value::as_set)
    }

    pub fn get_map(&self, name: &str) -> InterpResult<MapRef> {
        self.convert(name, Value::as_map)
    }

    pub fn get_object(&self, name: &str) -> InterpResult<ObjectRef> {
        self.convert(name, Value::as_object)
    }

    pub fn get_func(&self, name: &str) -> InterpResult<Rc<Function>> {
        self.convert(name, Value::as_func)
    }

    pub fn get_date(&self, name: &str) -> InterpResult<NaiveDateTime> {
        self.convert(name, Value::as_date)
    }

    pub fn get_pattern(&self, name: &str) -> InterpResult<Rc<str>> {
        self.convert(name, Value::as_pattern)
    }

    pub fn get_input(&self, name: &str) -> InterpResult<Rc<InputStream>> {
        self.convert(name, Value::as_input)
    }

    pub fn get_output(&self, name: &str) -> InterpResult<Rc<OutputStream>> {
        self.convert(name, Value::as_output)
    }

    /// `a=1, b="x"` over the bound formals, each value cut to `width` chars
    pub fn to_string_abbrev(&self, width: usize) -> String {
        self.names
            .iter()
            .filter_map(|name| {
                self.values
                    .get(name)
                    .map(|value| format!("{name}={}", abbreviate(&value.to_string(), width)))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
