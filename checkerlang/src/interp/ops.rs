//! Operators, indexing and iteration over values
//!
//! Errors returned here carry no position; the evaluator attaches the
//! position of the node being evaluated.

use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::value::{InputStream, Value};
use crate::ast::{Adapter, BinOp, UnOp};
use std::cmp::Ordering;
use std::rc::Rc;

fn operand_mismatch(op: BinOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::TypeMismatch,
        format!(
            "cannot apply {op} to {} and {}",
            left.type_name(),
            right.type_name()
        ),
    )
}

/// Evaluate a binary operator
pub fn binary(op: BinOp, left: &Value, right: &Value) -> InterpResult<Value> {
    match op {
        BinOp::Add => add(left, right),
        BinOp::Sub => sub(left, right),
        BinOp::Mul => mul(left, right),
        BinOp::Div => div(left, right),
        BinOp::Mod => rem(left, right),
        BinOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinOp::Ne => Ok(Value::Bool(!values_equal(left, right))),
        BinOp::Lt => Ok(Value::Bool(compare(left, right) == Ordering::Less)),
        BinOp::Le => Ok(Value::Bool(compare(left, right) != Ordering::Greater)),
        BinOp::Gt => Ok(Value::Bool(compare(left, right) == Ordering::Greater)),
        BinOp::Ge => Ok(Value::Bool(compare(left, right) != Ordering::Less)),
    }
}

/// Evaluate a unary operator
pub fn unary(op: UnOp, value: &Value) -> InterpResult<Value> {
    match (op, value) {
        (UnOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::overflow("negation")),
        (UnOp::Neg, Value::Decimal(x)) => Ok(Value::Decimal(-x)),
        (UnOp::Neg, other) => Err(RuntimeError::type_mismatch("numerical", other.type_name())),
    }
}

/// Structural equality, except that ints and decimals compare numerically
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Decimal(b)) | (Value::Decimal(b), Value::Int(a)) => *a as f64 == *b,
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Int(a), Value::Decimal(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Less),
        (Value::Decimal(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Greater),
        _ => left.compare_to(right),
    }
}

/// Both operands as decimals, if either is a decimal and both are numeric
fn as_decimals(left: &Value, right: &Value) -> Option<(f64, f64)> {
    match (left, right) {
        (Value::Decimal(a), Value::Decimal(b)) => Some((*a, *b)),
        (Value::Int(a), Value::Decimal(b)) => Some((*a as f64, *b)),
        (Value::Decimal(a), Value::Int(b)) => Some((*a, *b as f64)),
        _ => None,
    }
}

fn add(left: &Value, right: &Value) -> InterpResult<Value> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return a.checked_add(*b).map(Value::Int).ok_or_else(|| RuntimeError::overflow("addition"));
    }
    if let Some((a, b)) = as_decimals(left, right) {
        return Ok(Value::Decimal(a + b));
    }
    match (left, right) {
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            let mut s = left.as_string()?.to_string();
            s.push_str(&right.as_string()?);
            Ok(Value::from(s))
        }
        (Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (Value::List(a), item) => {
            let mut items = a.borrow().clone();
            items.push(item.clone());
            Ok(Value::list(items))
        }
        (Value::Set(a), Value::Set(b)) => {
            let items = a.borrow().iter().chain(b.borrow().iter()).cloned().collect::<Vec<_>>();
            Ok(Value::set_from(items))
        }
        (Value::Set(a), item) => {
            let mut items = a.borrow().clone();
            items.insert(item.clone());
            Ok(Value::set_from(items))
        }
        _ => Err(operand_mismatch(BinOp::Add, left, right)),
    }
}

fn sub(left: &Value, right: &Value) -> InterpResult<Value> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return a.checked_sub(*b).map(Value::Int).ok_or_else(|| RuntimeError::overflow("subtraction"));
    }
    if let Some((a, b)) = as_decimals(left, right) {
        return Ok(Value::Decimal(a - b));
    }
    match (left, right) {
        (Value::List(a), Value::List(b)) => {
            let remove = b.borrow();
            let items = a.borrow().iter().filter(|v| !remove.contains(v)).cloned().collect();
            Ok(Value::list(items))
        }
        (Value::List(a), Value::Set(b)) => {
            let remove = b.borrow();
            let items = a.borrow().iter().filter(|v| !remove.contains(*v)).cloned().collect();
            Ok(Value::list(items))
        }
        (Value::List(a), item) => {
            let items = a.borrow().iter().filter(|v| *v != item).cloned().collect();
            Ok(Value::list(items))
        }
        (Value::Set(a), Value::Set(b)) => {
            let remove = b.borrow();
            Ok(Value::set_from(a.borrow().iter().filter(|v| !remove.contains(*v)).cloned()))
        }
        (Value::Set(a), Value::List(b)) => {
            let remove = b.borrow();
            Ok(Value::set_from(a.borrow().iter().filter(|v| !remove.contains(v)).cloned()))
        }
        (Value::Set(a), item) => Ok(Value::set_from(a.borrow().iter().filter(|v| *v != item).cloned())),
        _ => Err(operand_mismatch(BinOp::Sub, left, right)),
    }
}

fn mul(left: &Value, right: &Value) -> InterpResult<Value> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return a.checked_mul(*b).map(Value::Int).ok_or_else(|| RuntimeError::overflow("multiplication"));
    }
    if let Some((a, b)) = as_decimals(left, right) {
        return Ok(Value::Decimal(a * b));
    }
    match (left, right) {
        (Value::Str(s), Value::Int(n)) => Ok(Value::from(s.repeat(repetitions(*n)))),
        (Value::List(items), Value::Int(n)) => {
            let items = items.borrow();
            let mut out = Vec::with_capacity(items.len() * repetitions(*n));
            for _ in 0..repetitions(*n) {
                out.extend(items.iter().cloned());
            }
            Ok(Value::list(out))
        }
        _ => Err(operand_mismatch(BinOp::Mul, left, right)),
    }
}

fn repetitions(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn div(left: &Value, right: &Value) -> InterpResult<Value> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(RuntimeError::division_by_zero()),
        (Value::Int(a), Value::Int(b)) => a
            .checked_div(*b)
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::overflow("division")),
        _ => match as_decimals(left, right) {
            Some((_, b)) if b == 0.0 => Err(RuntimeError::division_by_zero()),
            Some((a, b)) => Ok(Value::Decimal(a / b)),
            None => Err(operand_mismatch(BinOp::Div, left, right)),
        },
    }
}

fn rem(left: &Value, right: &Value) -> InterpResult<Value> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(RuntimeError::division_by_zero()),
        (Value::Int(a), Value::Int(b)) => a
            .checked_rem(*b)
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::overflow("modulo")),
        _ => match as_decimals(left, right) {
            Some((_, b)) if b == 0.0 => Err(RuntimeError::division_by_zero()),
            Some((a, b)) => Ok(Value::Decimal(a % b)),
            None => Err(operand_mismatch(BinOp::Mod, left, right)),
        },
    }
}

/// Membership test behind the `in` operator
pub fn contains(container: &Value, element: &Value) -> InterpResult<bool> {
    match container {
        Value::List(items) => Ok(items.borrow().iter().any(|v| values_equal(v, element))),
        Value::Set(items) => Ok(items.borrow().contains(element)),
        Value::Map(entries) => Ok(entries.borrow().contains_key(element)),
        Value::Object(object) => Ok(object.borrow().has_member(&element.as_string()?)),
        Value::Str(s) => Ok(s.contains(&*element.as_string()?)),
        Value::Null => Ok(false),
        other => Err(RuntimeError::type_mismatch("container", other.type_name())),
    }
}

/// Resolve a possibly negative index against `len`
pub fn normalize_index(index: i64, len: usize) -> InterpResult<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(RuntimeError::index_out_of_bounds(index, len));
    }
    Ok(resolved as usize)
}

/// `container[index]`; indexing null yields null
pub fn get_indexed(container: &Value, index: &Value) -> InterpResult<Value> {
    match container {
        Value::Null => Ok(Value::Null),
        Value::List(items) => {
            let items = items.borrow();
            let i = normalize_index(index.as_int()?, items.len())?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index(index.as_int()?, chars.len())?;
            Ok(Value::from(chars[i].to_string()))
        }
        Value::Map(entries) => entries
            .borrow()
            .get(index)
            .cloned()
            .ok_or_else(|| RuntimeError::key_not_found(&index.to_string())),
        Value::Object(object) => {
            let name = index.as_string()?;
            object
                .borrow()
                .resolve(&name)
                .ok_or_else(|| RuntimeError::key_not_found(&name))
        }
        other => Err(RuntimeError::type_mismatch("indexable container", other.type_name())),
    }
}

/// `container[index] = value`.
///
/// Containers are updated in place and returned. Strings are immutable: the
/// result is a new string with the character replaced.
pub fn set_indexed(container: &Value, index: Value, value: Value) -> InterpResult<Value> {
    match container {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let i = normalize_index(index.as_int()?, items.len())?;
            items[i] = value;
        }
        Value::Map(entries) => {
            // Key comparison may render or compare the map itself, so no
            // borrow is held while inserting.
            let mut updated = std::mem::take(&mut *entries.borrow_mut());
            updated.insert(index, value);
            *entries.borrow_mut() = updated;
        }
        Value::Object(object) => {
            let name = index.as_string()?;
            object.borrow_mut().set(&name, value);
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index(index.as_int()?, chars.len())?;
            let mut out: String = chars[..i].iter().collect();
            out.push_str(&value.as_string()?);
            out.extend(&chars[i + 1..]);
            return Ok(Value::from(out));
        }
        other => return Err(RuntimeError::invalid_assign_target(other.type_name())),
    }
    Ok(container.clone())
}

fn clamp_bound(index: i64, len: usize) -> usize {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    resolved.clamp(0, len) as usize
}

/// `container[start to end]`: bounds may be negative and are clamped; `end`
/// defaults to the length. Slicing null yields null.
pub fn slice(container: &Value, start: i64, end: Option<i64>) -> InterpResult<Value> {
    fn range(len: usize, start: i64, end: Option<i64>) -> (usize, usize) {
        let from = clamp_bound(start, len);
        let to = end.map_or(len, |end| clamp_bound(end, len));
        (from, to.max(from))
    }
    match container {
        Value::Null => Ok(Value::Null),
        Value::List(items) => {
            let items = items.borrow();
            let (from, to) = range(items.len(), start, end);
            Ok(Value::list(items[from..to].to_vec()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (from, to) = range(chars.len(), start, end);
            Ok(Value::from(chars[from..to].iter().collect::<String>()))
        }
        other => Err(RuntimeError::type_mismatch("list or string", other.type_name())),
    }
}

fn entry(key: Value, value: Value) -> Value {
    Value::list(vec![key, value])
}

fn adapter_mismatch(adapter: Adapter, value: &Value) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::TypeMismatch,
        format!("cannot iterate {adapter} of {}", value.type_name()),
    )
}

/// Elements a loop or comprehension walks over.
///
/// Collections are snapshotted up front, so the body may mutate the source.
/// Input streams are read one line per step.
pub enum Elements {
    Values(std::vec::IntoIter<Value>),
    Lines(Rc<InputStream>),
}

impl Elements {
    pub fn of(source: &Value, adapter: Adapter) -> InterpResult<Elements> {
        let values: Vec<Value> = match (source, adapter) {
            (Value::Null, _) => Vec::new(),
            (Value::List(items), Adapter::Elements | Adapter::Values) => items.borrow().clone(),
            (Value::List(items), Adapter::Keys) => (0..items.borrow().len() as i64).map(Value::Int).collect(),
            (Value::List(items), Adapter::Entries) => items
                .borrow()
                .iter()
                .enumerate()
                .map(|(i, v)| entry(Value::Int(i as i64), v.clone()))
                .collect(),
            (Value::Set(items), Adapter::Elements | Adapter::Values | Adapter::Keys) => {
                items.borrow().iter().cloned().collect()
            }
            (Value::Map(entries), Adapter::Elements | Adapter::Keys) => entries.borrow().keys().cloned().collect(),
            (Value::Map(entries), Adapter::Values) => entries.borrow().values().cloned().collect(),
            (Value::Map(entries), Adapter::Entries) => entries
                .borrow()
                .iter()
                .map(|(k, v)| entry(k.clone(), v.clone()))
                .collect(),
            (Value::Object(object), Adapter::Elements | Adapter::Keys) => {
                object.borrow().member_names().map(Value::str).collect()
            }
            (Value::Object(object), Adapter::Values) => {
                let object = object.borrow();
                let values = object.member_names().filter_map(|name| object.get(name)).collect();
                values
            }
            (Value::Object(object), Adapter::Entries) => {
                let object = object.borrow();
                let entries = object
                    .member_names()
                    .filter_map(|name| object.get(name).map(|v| entry(Value::str(name), v)))
                    .collect();
                entries
            }
            (Value::Str(s), Adapter::Elements) => s.chars().map(|c| Value::from(c.to_string())).collect(),
            (Value::Input(input), Adapter::Elements) => return Ok(Elements::Lines(Rc::clone(input))),
            (other, _) => return Err(adapter_mismatch(adapter, other)),
        };
        Ok(Elements::Values(values.into_iter()))
    }

    pub fn next_value(&mut self) -> InterpResult<Option<Value>> {
        match self {
            Elements::Values(values) => Ok(values.next()),
            Elements::Lines(input) => match input.read_line() {
                Ok(line) => Ok(line.map(Value::from)),
                Err(err) => Err(RuntimeError::io_error(&err.to_string())),
            },
        }
    }
}

/// Split a list (or set) into exactly `n` values, padding with null
pub fn destructure(value: &Value, n: usize) -> InterpResult<Vec<Value>> {
    let items = value.as_list()?;
    let items = items.borrow();
    Ok((0..n).map(|i| items.get(i).cloned().unwrap_or(Value::Null)).collect())
}
