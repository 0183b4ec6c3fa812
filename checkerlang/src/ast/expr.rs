//! Node tree evaluated by the interpreter

use super::Spanned;
use crate::util::{format_decimal, quote_str};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// A node; every variant evaluates to a value
///
/// The node set is closed: the external parser builds trees out of these
/// variants only, and the evaluator matches on them exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Atomic literal
    Literal(Literal),
    /// `NULL`
    Null,
    /// Name lookup, resolving lazy defaults
    Identifier(String),

    /// List literal; elements may be `Spread`
    List(Vec<Spanned<Expr>>),
    /// Set literal; elements may be `Spread`
    Set(Vec<Spanned<Expr>>),
    /// Map literal: key/value pairs
    Map(Vec<(Spanned<Expr>, Spanned<Expr>)>),
    /// Object literal: `<* a = 1, b = 2 *>`
    Object(Vec<(String, Spanned<Expr>)>),
    /// `...expr` inside a call argument list or a list/set literal
    Spread(Box<Spanned<Expr>>),

    /// Lambda literal: `fn(a, b = 1, rest...) body`
    Lambda(Rc<LambdaDef>),

    /// `def name = value`
    Def {
        name: String,
        value: Box<Spanned<Expr>>,
    },
    /// `def [a, b] = value`
    DefDestructuring {
        names: Vec<String>,
        value: Box<Spanned<Expr>>,
    },
    /// `name = value`
    Assign {
        name: String,
        value: Box<Spanned<Expr>>,
    },
    /// `[a, b] = value`
    AssignDestructuring {
        names: Vec<String>,
        value: Box<Spanned<Expr>>,
    },

    /// `container[index]` or `container[index, default]`
    Deref {
        container: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
        default: Option<Box<Spanned<Expr>>>,
    },
    /// `container[index] = value`
    DerefAssign {
        container: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },
    /// `container[start:end]`
    Slice {
        container: Box<Spanned<Expr>>,
        start: Box<Spanned<Expr>>,
        end: Option<Box<Spanned<Expr>>>,
    },
    /// `object->member(args)`
    DerefInvoke {
        object: Box<Spanned<Expr>>,
        member: String,
        args: Vec<Arg>,
    },

    /// Call with positional, named and spread arguments
    Call {
        func: Box<Spanned<Expr>>,
        args: Vec<Arg>,
    },

    /// Block: statements evaluated in a fresh child scope
    Block(Vec<Spanned<Expr>>),

    /// `if c1 then a elif c2 then b else d`
    If {
        branches: Vec<(Spanned<Expr>, Spanned<Expr>)>,
        else_branch: Option<Box<Spanned<Expr>>>,
    },

    And {
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    Or {
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    /// Non-short-circuiting exclusive or
    Xor {
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    Not(Box<Spanned<Expr>>),

    /// Arithmetic or comparison operation
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },
    /// `-x`
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// `element in container`
    In {
        element: Box<Spanned<Expr>>,
        container: Box<Spanned<Expr>>,
    },

    /// `for binder in [adapter] source do body`
    For {
        binder: Binder,
        adapter: Adapter,
        source: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
    },
    While {
        cond: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
    },
    Break,
    Continue,
    Return(Option<Box<Spanned<Expr>>>),

    /// `[element for binder in source if filter]`
    ListComprehension {
        element: Box<Spanned<Expr>>,
        clause: Comprehension,
    },
    /// `<<element for binder in source if filter>>`
    SetComprehension {
        element: Box<Spanned<Expr>>,
        clause: Comprehension,
    },
    /// `<<<key => value for binder in source if filter>>>`
    MapComprehension {
        key: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
        clause: Comprehension,
    },

    /// `class Name do def a = ...; def b = ... end`
    Class {
        name: String,
        members: Vec<(String, Spanned<Expr>)>,
    },

    /// Quoted node, evaluates to a node value without evaluating the node
    Quote(Rc<Spanned<Expr>>),

    /// `error expr`: raise a user error carrying the value's text
    Error(Box<Spanned<Expr>>),
}

/// Atomic literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Decimal(f64),
    Str(Rc<str>),
    Bool(bool),
    Pattern(Rc<str>),
}

/// Lambda definition shared between the node tree and the closures made from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaDef {
    pub signature: Rc<Signature>,
    pub body: Rc<Spanned<Expr>>,
}

/// Formal parameter list of a callee
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signature {
    pub formals: Vec<Formal>,
    /// Trailing variadic formal collecting overflow positional arguments
    pub rest: Option<String>,
}

impl Signature {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Signature {
            formals: names.into_iter().map(Formal::required).collect(),
            rest: None,
        }
    }

    pub fn with_rest(mut self, name: impl Into<String>) -> Self {
        self.rest = Some(name.into());
        self
    }

    pub fn with_formal(mut self, formal: Formal) -> Self {
        self.formals.push(formal);
        self
    }

    pub fn formal(&self, name: &str) -> Option<&Formal> {
        self.formals.iter().find(|f| f.name == name)
    }

    /// Formal names in declaration order, the rest formal last
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formals
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.rest.as_deref())
    }
}

/// A single formal parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formal {
    pub name: String,
    pub default: Option<Rc<Spanned<Expr>>>,
}

impl Formal {
    pub fn required(name: impl Into<String>) -> Self {
        Formal {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: Spanned<Expr>) -> Self {
        Formal {
            name: name.into(),
            default: Some(Rc::new(default)),
        }
    }
}

/// Call-site argument: positional when `name` is `None`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Spanned<Expr>,
}

impl Arg {
    pub fn positional(value: Spanned<Expr>) -> Self {
        Arg { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Spanned<Expr>) -> Self {
        Arg {
            name: Some(name.into()),
            value,
        }
    }
}

/// Loop / comprehension variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binder {
    Name(String),
    /// `[a, b]`: the element is destructured positionally
    Destructure(Vec<String>),
}

impl Binder {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Binder::Name(name) => vec![name.as_str()],
            Binder::Destructure(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// How a collection is turned into a sequence of loop elements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adapter {
    #[default]
    Elements,
    Keys,
    Values,
    Entries,
}

/// Iteration clause shared by the comprehension forms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comprehension {
    pub binder: Binder,
    pub adapter: Adapter,
    pub source: Box<Spanned<Expr>>,
    pub filter: Option<Box<Spanned<Expr>>>,
}

/// Arithmetic and comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Le => write!(f, "<="),
            BinOp::Ge => write!(f, ">="),
        }
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Numeric negation
    Neg,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Decimal(x) => write!(f, "{}", format_decimal(*x)),
            Literal::Str(s) => write!(f, "{}", quote_str(s)),
            Literal::Bool(true) => write!(f, "TRUE"),
            Literal::Bool(false) => write!(f, "FALSE"),
            Literal::Pattern(p) => write!(f, "//{p}//"),
        }
    }
}

impl fmt::Display for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binder::Name(name) => write!(f, "{name}"),
            Binder::Destructure(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adapter::Elements => Ok(()),
            Adapter::Keys => write!(f, "keys "),
            Adapter::Values => write!(f, "values "),
            Adapter::Entries => write!(f, "entries "),
        }
    }
}

impl fmt::Display for Comprehension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "for {} in {}{}", self.binder, self.adapter, self.source)?;
        if let Some(filter) = &self.filter {
            write!(f, " if {filter}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .formals
            .iter()
            .map(|formal| match &formal.default {
                Some(default) => format!("{}={}", formal.name, default),
                None => formal.name.clone(),
            })
            .collect();
        if let Some(rest) = &self.rest {
            parts.push(format!("{rest}..."));
        }
        write!(f, "{}", parts.join(", "))
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}={}", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Spanned<Expr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::Null => write!(f, "NULL"),
            Expr::Identifier(name) => write!(f, "{name}"),
            Expr::List(items) => write!(f, "[{}]", join(items)),
            Expr::Set(items) => write!(f, "<<{}>>", join(items)),
            Expr::Map(entries) => {
                let parts: Vec<String> = entries.iter().map(|(k, v)| format!("{k} => {v}")).collect();
                write!(f, "<<<{}>>>", parts.join(", "))
            }
            Expr::Object(members) => {
                let parts: Vec<String> = members.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "<*{}*>", parts.join(", "))
            }
            Expr::Spread(inner) => write!(f, "...{inner}"),
            Expr::Lambda(def) => write!(f, "(lambda [{}] {})", def.signature, def.body),
            Expr::Def { name, value } => write!(f, "(def {name} = {value})"),
            Expr::DefDestructuring { names, value } => {
                write!(f, "(def [{}] = {value})", names.join(", "))
            }
            Expr::Assign { name, value } => write!(f, "({name} = {value})"),
            Expr::AssignDestructuring { names, value } => {
                write!(f, "([{}] = {value})", names.join(", "))
            }
            Expr::Deref { container, index, default } => match default {
                Some(default) => write!(f, "{container}[{index}, {default}]"),
                None => write!(f, "{container}[{index}]"),
            },
            Expr::DerefAssign { container, index, value } => {
                write!(f, "({container}[{index}] = {value})")
            }
            Expr::Slice { container, start, end } => match end {
                Some(end) => write!(f, "{container}[{start}:{end}]"),
                None => write!(f, "{container}[{start}:]"),
            },
            Expr::DerefInvoke { object, member, args } => {
                write!(f, "{object}->{member}({})", join(args))
            }
            Expr::Call { func, args } => write!(f, "{func}({})", join(args)),
            Expr::Block(exprs) => write!(f, "(block {})", join(exprs)),
            Expr::If { branches, else_branch } => {
                write!(f, "(")?;
                for (i, (cond, body)) in branches.iter().enumerate() {
                    let keyword = if i == 0 { "if" } else { " elif" };
                    write!(f, "{keyword} {cond}: {body}")?;
                }
                if let Some(else_branch) = else_branch {
                    write!(f, " else: {else_branch}")?;
                }
                write!(f, ")")
            }
            Expr::And { left, right } => write!(f, "({left} and {right})"),
            Expr::Or { left, right } => write!(f, "({left} or {right})"),
            Expr::Xor { left, right } => write!(f, "({left} xor {right})"),
            Expr::Not(inner) => write!(f, "(not {inner})"),
            Expr::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
            Expr::Unary { op, expr } => write!(f, "({op}{expr})"),
            Expr::In { element, container } => write!(f, "({element} in {container})"),
            Expr::For { binder, adapter, source, body } => {
                write!(f, "(for {binder} in {adapter}{source}: {body})")
            }
            Expr::While { cond, body } => write!(f, "(while {cond}: {body})"),
            Expr::Break => write!(f, "(break)"),
            Expr::Continue => write!(f, "(continue)"),
            Expr::Return(Some(value)) => write!(f, "(return {value})"),
            Expr::Return(None) => write!(f, "(return)"),
            Expr::ListComprehension { element, clause } => write!(f, "[{element} {clause}]"),
            Expr::SetComprehension { element, clause } => write!(f, "<<{element} {clause}>>"),
            Expr::MapComprehension { key, value, clause } => {
                write!(f, "<<<{key} => {value} {clause}>>>")
            }
            Expr::Class { name, members } => {
                let parts: Vec<String> = members.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "(class {name} {})", parts.join(", "))
            }
            Expr::Quote(node) => write!(f, "(quote {node})"),
            Expr::Error(value) => write!(f, "(error {value})"),
        }
    }
}

impl Spanned<Expr> {
    /// Decode a node tree handed over by an external parser as JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Encode this node tree as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;

    #[test]
    fn test_binop_display() {
        assert_eq!(BinOp::Add.to_string(), "+");
        assert_eq!(BinOp::Le.to_string(), "<=");
        assert_eq!(UnOp::Neg.to_string(), "-");
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Int(7).to_string(), "7");
        assert_eq!(Literal::Decimal(1.0).to_string(), "1.0");
        assert_eq!(Literal::Str("a\"b".into()).to_string(), "\"a\\\"b\"");
        assert_eq!(Literal::Bool(false).to_string(), "FALSE");
        assert_eq!(Literal::Pattern("^a+$".into()).to_string(), "//^a+$//");
    }

    #[test]
    fn test_signature_names_and_display() {
        let sig = Signature::new(["a"])
            .with_formal(Formal::with_default("b", int(2)))
            .with_rest("rest");
        assert_eq!(sig.names().collect::<Vec<_>>(), vec!["a", "b", "rest"]);
        assert_eq!(sig.to_string(), "a, b=2, rest...");
        assert!(sig.formal("b").is_some_and(|f| f.default.is_some()));
        assert!(sig.formal("rest").is_none());
    }

    #[test]
    fn test_node_rendering() {
        let node = def("a", lambda(["y"], lambda(["x"], binary(ident("y"), BinOp::Mul, ident("x")))));
        insta::assert_snapshot!(node.to_string(), @"(def a = (lambda [y] (lambda [x] (y * x))))");
    }

    #[test]
    fn test_if_rendering() {
        let node = if_elif(
            vec![(ident("a"), int(1)), (ident("b"), int(2))],
            Some(string("c")),
        );
        insta::assert_snapshot!(node.to_string(), @r#"(if a: 1 elif b: 2 else: "c")"#);
    }

    #[test]
    fn test_comprehension_rendering() {
        let node = list_comprehension(
            binary(ident("x"), BinOp::Mul, int(2)),
            comprehension(
                Binder::Name("x".into()),
                Adapter::Values,
                ident("m"),
                Some(binary(ident("x"), BinOp::Gt, int(1))),
            ),
        );
        assert_eq!(node.to_string(), "[(x * 2) for x in values m if (x > 1)]");
    }

    #[test]
    fn test_json_interchange() {
        let node = call(ident("f"), vec![Arg::positional(int(1)), Arg::named("b", string("x"))]);
        let json = node.to_json().unwrap();
        let decoded = Spanned::<Expr>::from_json(&json).unwrap();
        assert_eq!(decoded.to_string(), "f(1, b=\"x\")");
        assert_eq!(decoded.pos, node.pos);
    }
}
