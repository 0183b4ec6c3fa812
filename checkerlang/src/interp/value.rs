//! Runtime values for the interpreter
//!
//! Atomic values (null, boolean, int, decimal, string, date, pattern) are
//! immutable and compared by content. Lists, sets, maps and objects are
//! shared handles: cloning a `Value` aliases the same backing store, so a
//! mutation through one binding is visible through every other.

use super::error::ConversionError;
use super::function::Function;
use crate::ast::{Expr, Spanned};
use crate::util::{format_decimal, quote_str};
use chrono::{NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{self, BufRead, Write};
use std::rc::Rc;

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type SetRef = Rc<RefCell<BTreeSet<Value>>>;
pub type MapRef = Rc<RefCell<BTreeMap<Value, Value>>>;
pub type ObjectRef = Rc<RefCell<Object>>;

/// Member naming an object's prototype
pub const PROTO: &str = "_proto_";

/// Upper bound on prototype hops, so a prototype cycle cannot hang lookup
const MAX_PROTO_DEPTH: usize = 1024;

const DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Text shown for a container reached again while it is being rendered
const CYCLE_MARKER: &str = "...";

/// Recursive walks over shared containers that must stop at a revisit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Render,
    Compare,
    Hash,
}

thread_local! {
    static WALKING: RefCell<Vec<(Walk, usize, usize)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a container (or pair of containers) as being walked until dropped
struct WalkGuard {
    key: (Walk, usize, usize),
}

impl WalkGuard {
    /// `None` when the same walk is already inside this container further up the stack
    fn enter(walk: Walk, a: usize, b: usize) -> Option<WalkGuard> {
        let key = (walk, a, b);
        WALKING.with(|walking| {
            let mut walking = walking.borrow_mut();
            if walking.contains(&key) {
                return None;
            }
            walking.push(key);
            Some(WalkGuard { key })
        })
    }
}

impl Drop for WalkGuard {
    fn drop(&mut self) {
        WALKING.with(|walking| {
            let mut walking = walking.borrow_mut();
            if let Some(i) = walking.iter().rposition(|key| *key == self.key) {
                walking.remove(i);
            }
        });
    }
}

fn addr<T>(rc: &Rc<RefCell<T>>) -> usize {
    Rc::as_ptr(rc).cast::<u8>() as usize
}

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit floating point
    Decimal(f64),
    Str(Rc<str>),
    Date(NaiveDateTime),
    /// Regular expression source text
    Pattern(Rc<str>),
    List(ListRef),
    Set(SetRef),
    Map(MapRef),
    Object(ObjectRef),
    Func(Rc<Function>),
    Input(Rc<InputStream>),
    Output(Rc<OutputStream>),
    /// Quoted, unevaluated node
    Node(Rc<Spanned<Expr>>),

    /// Control signal: leave the nearest loop
    Break,
    /// Control signal: next iteration of the nearest loop
    Continue,
    /// Control signal: leave the nearest function with a value
    Return(Box<Value>),
}

impl Value {
    pub const TRUE: Value = Value::Bool(true);
    pub const FALSE: Value = Value::Bool(false);

    pub fn str(s: &str) -> Value {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn set_from(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Set(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn map(entries: BTreeMap<Value, Value>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn object(object: Object) -> Value {
        Value::Object(Rc::new(RefCell::new(object)))
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Decimal(_) => "decimal",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::Pattern(_) => "pattern",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Func(_) => "func",
            Value::Input(_) => "input",
            Value::Output(_) => "output",
            Value::Node(_) => "node",
            Value::Break => "break",
            Value::Continue => "continue",
            Value::Return(_) => "return",
        }
    }

    /// Position of the variant in the cross-kind ordering tie-break
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Decimal(_) => 3,
            Value::Str(_) => 4,
            Value::Date(_) => 5,
            Value::Pattern(_) => 6,
            Value::List(_) => 7,
            Value::Set(_) => 8,
            Value::Map(_) => 9,
            Value::Object(_) => 10,
            Value::Func(_) => 11,
            Value::Input(_) => 12,
            Value::Output(_) => 13,
            Value::Node(_) => 14,
            Value::Break => 15,
            Value::Continue => 16,
            Value::Return(_) => 17,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Decimal(_))
    }

    /// Break, continue or return signal
    pub fn is_control(&self) -> bool {
        matches!(self, Value::Break | Value::Continue | Value::Return(_))
    }

    pub fn as_int(&self) -> Result<i64, ConversionError> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Decimal(x) if x.is_finite() => Ok(x.trunc() as i64),
            Value::Str(s) => s.trim().parse().map_err(|_| self.cannot("int")),
            _ => Err(self.cannot("int")),
        }
    }

    pub fn as_decimal(&self) -> Result<f64, ConversionError> {
        match self {
            Value::Decimal(x) => Ok(*x),
            Value::Int(n) => Ok(*n as f64),
            Value::Str(s) => s.trim().parse().map_err(|_| self.cannot("decimal")),
            _ => Err(self.cannot("decimal")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ConversionError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(n) => Ok(*n != 0),
            Value::Str(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(self.cannot("boolean")),
            },
            _ => Err(self.cannot("boolean")),
        }
    }

    /// Text of the value: strings and patterns unquoted, everything else as
    /// rendered; control signals have no text
    pub fn as_string(&self) -> Result<Rc<str>, ConversionError> {
        match self {
            Value::Str(s) | Value::Pattern(s) => Ok(Rc::clone(s)),
            Value::Date(d) => Ok(d.format(DATE_FORMAT).to_string().into()),
            v if v.is_control() => Err(self.cannot("string")),
            v => Ok(v.to_string().into()),
        }
    }

    pub fn as_date(&self) -> Result<NaiveDateTime, ConversionError> {
        match self {
            Value::Date(d) => Ok(*d),
            Value::Str(s) => parse_date(s).ok_or_else(|| self.cannot("date")),
            _ => Err(self.cannot("date")),
        }
    }

    pub fn as_pattern(&self) -> Result<Rc<str>, ConversionError> {
        match self {
            Value::Pattern(p) | Value::Str(p) => Ok(Rc::clone(p)),
            _ => Err(self.cannot("pattern")),
        }
    }

    /// The list itself (aliased), or a fresh list holding a set's elements
    pub fn as_list(&self) -> Result<ListRef, ConversionError> {
        match self {
            Value::List(list) => Ok(Rc::clone(list)),
            Value::Set(set) => Ok(Rc::new(RefCell::new(set.borrow().iter().cloned().collect()))),
            _ => Err(self.cannot("list")),
        }
    }

    /// The set itself (aliased), or a fresh set holding a list's elements
    pub fn as_set(&self) -> Result<SetRef, ConversionError> {
        match self {
            Value::Set(set) => Ok(Rc::clone(set)),
            Value::List(list) => Ok(Rc::new(RefCell::new(list.borrow().iter().cloned().collect()))),
            _ => Err(self.cannot("set")),
        }
    }

    pub fn as_map(&self) -> Result<MapRef, ConversionError> {
        match self {
            Value::Map(map) => Ok(Rc::clone(map)),
            _ => Err(self.cannot("map")),
        }
    }

    pub fn as_object(&self) -> Result<ObjectRef, ConversionError> {
        match self {
            Value::Object(object) => Ok(Rc::clone(object)),
            _ => Err(self.cannot("object")),
        }
    }

    pub fn as_func(&self) -> Result<Rc<Function>, ConversionError> {
        match self {
            Value::Func(func) => Ok(Rc::clone(func)),
            _ => Err(self.cannot("func")),
        }
    }

    pub fn as_input(&self) -> Result<Rc<InputStream>, ConversionError> {
        match self {
            Value::Input(input) => Ok(Rc::clone(input)),
            _ => Err(self.cannot("input")),
        }
    }

    pub fn as_output(&self) -> Result<Rc<OutputStream>, ConversionError> {
        match self {
            Value::Output(output) => Ok(Rc::clone(output)),
            _ => Err(self.cannot("output")),
        }
    }

    pub fn as_node(&self) -> Result<Rc<Spanned<Expr>>, ConversionError> {
        match self {
            Value::Node(node) => Ok(Rc::clone(node)),
            _ => Err(self.cannot("node")),
        }
    }

    fn cannot(&self, to: &'static str) -> ConversionError {
        ConversionError::new(self.type_name(), to)
    }

    /// Total order over all values.
    ///
    /// Same-kind values compare by content (numbers by magnitude, strings
    /// lexicographically, lists element-wise with length as tie-break). Values
    /// of different kinds compare by their rendered text, then by kind, so
    /// heterogeneous collections stay sortable.
    pub fn compare_to(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => compare_decimals(*a, *b),
            (Value::Int(a), Value::Decimal(b)) => {
                compare_decimals(*a as f64, *b).then(Ordering::Less)
            }
            (Value::Decimal(a), Value::Int(b)) => {
                compare_decimals(*a, *b as f64).then(Ordering::Greater)
            }
            (Value::Str(a), Value::Str(b)) | (Value::Pattern(a), Value::Pattern(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => compare_shared(a, b, |a, b| compare_seq(a.iter(), b.iter())),
            (Value::Set(a), Value::Set(b)) => compare_shared(a, b, |a, b| compare_seq(a.iter(), b.iter())),
            (Value::Map(a), Value::Map(b)) => compare_shared(a, b, |a, b| compare_entries(a.iter(), b.iter())),
            (Value::Object(a), Value::Object(b)) => {
                compare_shared(a, b, |a, b| compare_entries(a.members.iter(), b.members.iter()))
            }
            (Value::Func(a), Value::Func(b)) => compare_handles(self, other, Rc::as_ptr(a).cast(), Rc::as_ptr(b).cast()),
            (Value::Input(a), Value::Input(b)) => compare_handles(self, other, Rc::as_ptr(a).cast(), Rc::as_ptr(b).cast()),
            (Value::Output(a), Value::Output(b)) => compare_handles(self, other, Rc::as_ptr(a).cast(), Rc::as_ptr(b).cast()),
            (Value::Node(a), Value::Node(b)) => compare_handles(self, other, Rc::as_ptr(a).cast(), Rc::as_ptr(b).cast()),
            (Value::Break, Value::Break) | (Value::Continue, Value::Continue) => Ordering::Equal,
            (Value::Return(a), Value::Return(b)) => a.compare_to(b),
            _ => self
                .to_string()
                .cmp(&other.to_string())
                .then(self.rank().cmp(&other.rank())),
        }
    }
}

/// Compare two shared containers by content.
///
/// A pair already being compared further up the stack counts as equal, which
/// ends the walk on cyclic graphs. A container that is mutably borrowed at the
/// moment is ordered by address instead of content.
fn compare_shared<T>(a: &Rc<RefCell<T>>, b: &Rc<RefCell<T>>, by_content: impl FnOnce(&T, &T) -> Ordering) -> Ordering {
    if Rc::ptr_eq(a, b) {
        return Ordering::Equal;
    }
    let Some(_guard) = WalkGuard::enter(Walk::Compare, addr(a), addr(b)) else {
        return Ordering::Equal;
    };
    match (a.try_borrow(), b.try_borrow()) {
        (Ok(x), Ok(y)) => by_content(&*x, &*y),
        _ => addr(a).cmp(&addr(b)),
    }
}

fn compare_decimals(a: f64, b: f64) -> Ordering {
    // NaN sorts above every number and equal to itself
    a.partial_cmp(&b).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

fn compare_seq<'a>(a: impl Iterator<Item = &'a Value>, b: impl Iterator<Item = &'a Value>) -> Ordering {
    let mut a = a;
    let mut b = b;
    loop {
        match (a.next(), b.next()) {
            (Some(x), Some(y)) => match x.compare_to(y) {
                Ordering::Equal => continue,
                ord => return ord,
            },
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

fn compare_entries<'a, K: Ord + 'a>(
    a: impl Iterator<Item = (&'a K, &'a Value)>,
    b: impl Iterator<Item = (&'a K, &'a Value)>,
) -> Ordering {
    let mut a = a;
    let mut b = b;
    loop {
        match (a.next(), b.next()) {
            (Some((ka, va)), Some((kb, vb))) => match ka.cmp(kb).then_with(|| va.compare_to(vb)) {
                Ordering::Equal => continue,
                ord => return ord,
            },
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

fn compare_handles(a: &Value, b: &Value, pa: *const u8, pb: *const u8) -> Ordering {
    if std::ptr::eq(pa, pb) {
        return Ordering::Equal;
    }
    a.to_string().cmp(&b.to_string()).then(pa.cmp(&pb))
}

/// Parse `yyyyMMdd`, `yyyyMMddHH`, `yyyyMMddHHmm` or `yyyyMMddHHmmss`
fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match s.len() {
        8 => NaiveDate::parse_from_str(s, "%Y%m%d").ok()?.and_hms_opt(0, 0, 0),
        10 => NaiveDateTime::parse_from_str(&format!("{s}0000"), DATE_FORMAT).ok(),
        12 => NaiveDateTime::parse_from_str(&format!("{s}00"), DATE_FORMAT).ok(),
        14 => NaiveDateTime::parse_from_str(s, DATE_FORMAT).ok(),
        _ => None,
    }
}

/// Equality agrees with [`Value::compare_to`]: an int never equals a decimal
/// here, while `==` in the language compares them numerically.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank() && self.compare_to(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_to(other)
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null | Value::Break | Value::Continue => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Decimal(x) => {
                let canonical = if x.is_nan() {
                    f64::NAN
                } else if *x == 0.0 {
                    0.0
                } else {
                    *x
                };
                canonical.to_bits().hash(state);
            }
            Value::Str(s) | Value::Pattern(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::List(list) => hash_shared(list, state, |list, state| list.hash(state)),
            Value::Set(set) => hash_shared(set, state, |set, state| set.hash(state)),
            Value::Map(map) => hash_shared(map, state, |map, state| map.hash(state)),
            Value::Object(object) => hash_shared(object, state, |object, state| object.members.hash(state)),
            Value::Func(f) => std::ptr::hash(Rc::as_ptr(f), state),
            Value::Input(i) => std::ptr::hash(Rc::as_ptr(i), state),
            Value::Output(o) => std::ptr::hash(Rc::as_ptr(o), state),
            Value::Node(n) => std::ptr::hash(Rc::as_ptr(n), state),
            Value::Return(v) => v.hash(state),
        }
    }
}

/// Hash a container's content; a revisit or a busy container adds nothing
fn hash_shared<T, H: Hasher>(rc: &Rc<RefCell<T>>, state: &mut H, by_content: impl FnOnce(&T, &mut H)) {
    let Some(_guard) = WalkGuard::enter(Walk::Hash, addr(rc), 0) else {
        return;
    };
    if let Ok(content) = rc.try_borrow() {
        by_content(&*content, state);
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Decimal(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

fn write_joined<'a>(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = &'a Value>) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Render a container, or the cycle marker when it is already being rendered
/// further up the stack or is mutably borrowed right now
fn render_shared<T>(
    f: &mut fmt::Formatter<'_>,
    rc: &Rc<RefCell<T>>,
    render: impl FnOnce(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    let Some(_guard) = WalkGuard::enter(Walk::Render, addr(rc), 0) else {
        return f.write_str(CYCLE_MARKER);
    };
    match rc.try_borrow() {
        Ok(content) => render(f, &*content),
        Err(_) => f.write_str(CYCLE_MARKER),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(true) => write!(f, "TRUE"),
            Value::Bool(false) => write!(f, "FALSE"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Decimal(x) => write!(f, "{}", format_decimal(*x)),
            Value::Str(s) => write!(f, "{}", quote_str(s)),
            Value::Date(d) => write!(f, "<{}>", d.format(DATE_FORMAT)),
            Value::Pattern(p) => write!(f, "//{p}//"),
            Value::List(list) => render_shared(f, list, |f, list| {
                write!(f, "[")?;
                write_joined(f, list.iter())?;
                write!(f, "]")
            }),
            Value::Set(set) => render_shared(f, set, |f, set| {
                write!(f, "<<")?;
                write_joined(f, set.iter())?;
                write!(f, ">>")
            }),
            Value::Map(map) => render_shared(f, map, |f, map| {
                write!(f, "<<<")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k} => {v}")?;
                }
                write!(f, ">>>")
            }),
            Value::Object(object) => render_shared(f, object, |f, object| write!(f, "{object}")),
            Value::Func(func) => write!(f, "<#{}>", func.name()),
            Value::Input(_) => write!(f, "<!input-stream>"),
            Value::Output(_) => write!(f, "<!output-stream>"),
            Value::Node(node) => write!(f, "^({node})"),
            Value::Break => write!(f, "BREAK"),
            Value::Continue => write!(f, "CONTINUE"),
            Value::Return(value) => write!(f, "RETURN({value})"),
        }
    }
}

/// String-keyed members with an optional `_proto_` fallback
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub members: BTreeMap<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Object::default()
    }

    pub fn with_proto(proto: ObjectRef) -> Self {
        let mut object = Object::new();
        object.set(PROTO, Value::Object(proto));
        object
    }

    /// Local member only
    pub fn get(&self, name: &str) -> Option<Value> {
        self.members.get(name).cloned()
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.members.insert(name.to_string(), value);
    }

    pub fn proto(&self) -> Option<ObjectRef> {
        match self.members.get(PROTO) {
            Some(Value::Object(proto)) => Some(Rc::clone(proto)),
            _ => None,
        }
    }

    /// Member lookup falling back along the prototype chain
    pub fn resolve(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.members.get(name) {
            return Some(value.clone());
        }
        let mut next = self.proto();
        for _ in 0..MAX_PROTO_DEPTH {
            let proto = next?;
            let proto = proto.borrow();
            if let Some(value) = proto.members.get(name) {
                return Some(value.clone());
            }
            next = proto.proto();
        }
        None
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Member names without the prototype link
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str).filter(|k| *k != PROTO)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<*")?;
        let mut first = true;
        for (name, value) in self.members.iter().filter(|(k, _)| k.as_str() != PROTO) {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{name}={value}")?;
        }
        write!(f, "*>")
    }
}

/// Line-oriented input handle
pub struct InputStream {
    reader: RefCell<Box<dyn BufRead>>,
}

impl InputStream {
    pub fn new(reader: impl BufRead + 'static) -> Self {
        InputStream {
            reader: RefCell::new(Box::new(reader)),
        }
    }

    /// Next line without its terminator, `None` at end of input
    pub fn read_line(&self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.borrow_mut().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InputStream")
    }
}

/// Output sink handle
pub struct OutputStream {
    writer: RefCell<Box<dyn Write>>,
}

impl OutputStream {
    pub fn new(writer: impl Write + 'static) -> Self {
        OutputStream {
            writer: RefCell::new(Box::new(writer)),
        }
    }

    pub fn write_str(&self, s: &str) -> io::Result<()> {
        let mut writer = self.writer.borrow_mut();
        writer.write_all(s.as_bytes())?;
        writer.flush()
    }
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OutputStream")
    }
}
