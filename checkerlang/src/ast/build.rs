//! Node construction helpers
//!
//! Convenience constructors for embedders that assemble node trees in code
//! rather than receiving them from the parser. Every node is placed at
//! [`SourcePos::unknown`]; use [`Spanned::at`] to attach a real position.

use super::*;
use std::rc::Rc;

fn node(expr: Expr) -> Spanned<Expr> {
    Spanned::new(expr, SourcePos::unknown())
}

fn boxed(expr: Spanned<Expr>) -> Box<Spanned<Expr>> {
    Box::new(expr)
}

pub fn int(n: i64) -> Spanned<Expr> {
    node(Expr::Literal(Literal::Int(n)))
}

pub fn decimal(x: f64) -> Spanned<Expr> {
    node(Expr::Literal(Literal::Decimal(x)))
}

pub fn string(s: &str) -> Spanned<Expr> {
    node(Expr::Literal(Literal::Str(s.into())))
}

pub fn boolean(b: bool) -> Spanned<Expr> {
    node(Expr::Literal(Literal::Bool(b)))
}

pub fn pattern(p: &str) -> Spanned<Expr> {
    node(Expr::Literal(Literal::Pattern(p.into())))
}

pub fn null() -> Spanned<Expr> {
    node(Expr::Null)
}

pub fn ident(name: &str) -> Spanned<Expr> {
    node(Expr::Identifier(name.to_string()))
}

pub fn list(items: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    node(Expr::List(items))
}

pub fn set(items: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    node(Expr::Set(items))
}

pub fn map(entries: Vec<(Spanned<Expr>, Spanned<Expr>)>) -> Spanned<Expr> {
    node(Expr::Map(entries))
}

pub fn object(members: Vec<(&str, Spanned<Expr>)>) -> Spanned<Expr> {
    node(Expr::Object(
        members.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    ))
}

pub fn spread(inner: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Spread(boxed(inner)))
}

/// Lambda with required formals only
pub fn lambda<const N: usize>(names: [&str; N], body: Spanned<Expr>) -> Spanned<Expr> {
    lambda_sig(Signature::new(names), body)
}

pub fn lambda_sig(signature: Signature, body: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Lambda(Rc::new(LambdaDef {
        signature: Rc::new(signature),
        body: Rc::new(body),
    })))
}

pub fn def(name: &str, value: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Def {
        name: name.to_string(),
        value: boxed(value),
    })
}

pub fn def_destructuring(names: &[&str], value: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::DefDestructuring {
        names: names.iter().map(|n| n.to_string()).collect(),
        value: boxed(value),
    })
}

pub fn assign(name: &str, value: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Assign {
        name: name.to_string(),
        value: boxed(value),
    })
}

pub fn assign_destructuring(names: &[&str], value: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::AssignDestructuring {
        names: names.iter().map(|n| n.to_string()).collect(),
        value: boxed(value),
    })
}

pub fn deref(container: Spanned<Expr>, index: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Deref {
        container: boxed(container),
        index: boxed(index),
        default: None,
    })
}

pub fn deref_or(container: Spanned<Expr>, index: Spanned<Expr>, default: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Deref {
        container: boxed(container),
        index: boxed(index),
        default: Some(boxed(default)),
    })
}

pub fn deref_assign(container: Spanned<Expr>, index: Spanned<Expr>, value: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::DerefAssign {
        container: boxed(container),
        index: boxed(index),
        value: boxed(value),
    })
}

pub fn slice(container: Spanned<Expr>, start: Spanned<Expr>, end: Option<Spanned<Expr>>) -> Spanned<Expr> {
    node(Expr::Slice {
        container: boxed(container),
        start: boxed(start),
        end: end.map(boxed),
    })
}

pub fn invoke(object: Spanned<Expr>, member: &str, args: Vec<Arg>) -> Spanned<Expr> {
    node(Expr::DerefInvoke {
        object: boxed(object),
        member: member.to_string(),
        args,
    })
}

pub fn call(func: Spanned<Expr>, args: Vec<Arg>) -> Spanned<Expr> {
    node(Expr::Call {
        func: boxed(func),
        args,
    })
}

/// Call with positional arguments only
pub fn call_pos(func: Spanned<Expr>, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    call(func, args.into_iter().map(Arg::positional).collect())
}

pub fn block(exprs: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    node(Expr::Block(exprs))
}

pub fn if_elif(branches: Vec<(Spanned<Expr>, Spanned<Expr>)>, else_branch: Option<Spanned<Expr>>) -> Spanned<Expr> {
    node(Expr::If {
        branches,
        else_branch: else_branch.map(boxed),
    })
}

pub fn if_then_else(cond: Spanned<Expr>, then: Spanned<Expr>, otherwise: Spanned<Expr>) -> Spanned<Expr> {
    if_elif(vec![(cond, then)], Some(otherwise))
}

pub fn and(left: Spanned<Expr>, right: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::And {
        left: boxed(left),
        right: boxed(right),
    })
}

pub fn or(left: Spanned<Expr>, right: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Or {
        left: boxed(left),
        right: boxed(right),
    })
}

pub fn xor(left: Spanned<Expr>, right: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Xor {
        left: boxed(left),
        right: boxed(right),
    })
}

pub fn not(inner: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Not(boxed(inner)))
}

pub fn binary(left: Spanned<Expr>, op: BinOp, right: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Binary {
        left: boxed(left),
        op,
        right: boxed(right),
    })
}

pub fn neg(expr: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Unary {
        op: UnOp::Neg,
        expr: boxed(expr),
    })
}

pub fn is_in(element: Spanned<Expr>, container: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::In {
        element: boxed(element),
        container: boxed(container),
    })
}

pub fn for_each(binder: Binder, adapter: Adapter, source: Spanned<Expr>, body: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::For {
        binder,
        adapter,
        source: boxed(source),
        body: boxed(body),
    })
}

pub fn while_loop(cond: Spanned<Expr>, body: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::While {
        cond: boxed(cond),
        body: boxed(body),
    })
}

pub fn brk() -> Spanned<Expr> {
    node(Expr::Break)
}

pub fn cont() -> Spanned<Expr> {
    node(Expr::Continue)
}

pub fn ret(value: Option<Spanned<Expr>>) -> Spanned<Expr> {
    node(Expr::Return(value.map(boxed)))
}

pub fn comprehension(
    binder: Binder,
    adapter: Adapter,
    source: Spanned<Expr>,
    filter: Option<Spanned<Expr>>,
) -> Comprehension {
    Comprehension {
        binder,
        adapter,
        source: boxed(source),
        filter: filter.map(boxed),
    }
}

pub fn list_comprehension(element: Spanned<Expr>, clause: Comprehension) -> Spanned<Expr> {
    node(Expr::ListComprehension {
        element: boxed(element),
        clause,
    })
}

pub fn set_comprehension(element: Spanned<Expr>, clause: Comprehension) -> Spanned<Expr> {
    node(Expr::SetComprehension {
        element: boxed(element),
        clause,
    })
}

pub fn map_comprehension(key: Spanned<Expr>, value: Spanned<Expr>, clause: Comprehension) -> Spanned<Expr> {
    node(Expr::MapComprehension {
        key: boxed(key),
        value: boxed(value),
        clause,
    })
}

pub fn class(name: &str, members: Vec<(&str, Spanned<Expr>)>) -> Spanned<Expr> {
    node(Expr::Class {
        name: name.to_string(),
        members: members.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    })
}

pub fn quote(inner: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Quote(Rc::new(inner)))
}

pub fn raise(value: Spanned<Expr>) -> Spanned<Expr> {
    node(Expr::Error(boxed(value)))
}
