//! Static free-variable analysis
//!
//! Walks a node tree without evaluating it and reports which names are read
//! without being bound (`free`), which are introduced (`bound`) and which are
//! legal forward references (`additional_bound`): names defined later in the
//! same block, so that `def`s in one block may refer to each other in any
//! textual order.

use super::{Comprehension, Expr, LambdaDef, Spanned};
use std::collections::BTreeSet;

pub type NameSet = BTreeSet<String>;

/// Result of analysing one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarSets {
    pub free: NameSet,
    pub bound: NameSet,
    pub additional_bound: NameSet,
}

/// Analyse a root node.
///
/// A root block is treated like the interpreter treats it: its statements
/// share the caller's scope, so its definitions show up in `bound`.
pub fn analyze(root: &Spanned<Expr>) -> VarSets {
    let mut sets = VarSets::default();
    match &root.node {
        Expr::Block(exprs) => {
            sets.additional_bound = forward_names(exprs);
            for expr in exprs {
                expr.collect_vars(&mut sets.free, &mut sets.bound, &sets.additional_bound);
            }
        }
        _ => root.collect_vars(&mut sets.free, &mut sets.bound, &sets.additional_bound),
    }
    sets
}

/// Names a block introduces at its own level, visible to every statement in it
fn forward_names(exprs: &[Spanned<Expr>]) -> NameSet {
    let mut names = NameSet::new();
    for expr in exprs {
        match &expr.node {
            Expr::Def { name, .. } | Expr::Class { name, .. } => {
                names.insert(name.clone());
            }
            Expr::DefDestructuring { names: targets, .. } => {
                names.extend(targets.iter().cloned());
            }
            _ => {}
        }
    }
    names
}

fn note(name: &str, free: &mut NameSet, bound: &NameSet, additional: &NameSet) {
    if !bound.contains(name) && !additional.contains(name) {
        free.insert(name.to_string());
    }
}

impl Spanned<Expr> {
    /// Free variables of this node
    pub fn free_vars(&self) -> NameSet {
        analyze(self).free
    }

    /// Accumulate free and bound names of this node.
    ///
    /// `bound` is extended in place by binders at this level; nested scopes
    /// (lambdas, blocks, loops, comprehensions, class bodies) work on a copy.
    pub fn collect_vars(&self, free: &mut NameSet, bound: &mut NameSet, additional: &NameSet) {
        match &self.node {
            Expr::Literal(_) | Expr::Null | Expr::Break | Expr::Continue | Expr::Quote(_) => {}

            Expr::Identifier(name) => note(name, free, bound, additional),

            Expr::List(items) | Expr::Set(items) => {
                for item in items {
                    item.collect_vars(free, bound, additional);
                }
            }
            Expr::Map(entries) => {
                for (key, value) in entries {
                    key.collect_vars(free, bound, additional);
                    value.collect_vars(free, bound, additional);
                }
            }
            Expr::Object(members) => {
                for (_, value) in members {
                    value.collect_vars(free, bound, additional);
                }
            }
            Expr::Spread(inner) | Expr::Not(inner) | Expr::Error(inner) => {
                inner.collect_vars(free, bound, additional);
            }
            Expr::Unary { expr, .. } => expr.collect_vars(free, bound, additional),

            Expr::Lambda(def) => collect_lambda(def, free, bound, additional),

            Expr::Def { name, value } => {
                if matches!(value.node, Expr::Lambda(_)) {
                    // a named lambda may call itself
                    let mut local_additional = additional.clone();
                    local_additional.insert(name.clone());
                    value.collect_vars(free, bound, &local_additional);
                } else {
                    value.collect_vars(free, bound, additional);
                }
                bound.insert(name.clone());
            }
            Expr::DefDestructuring { names, value } => {
                value.collect_vars(free, bound, additional);
                bound.extend(names.iter().cloned());
            }
            Expr::Assign { name, value } => {
                value.collect_vars(free, bound, additional);
                note(name, free, bound, additional);
            }
            Expr::AssignDestructuring { names, value } => {
                value.collect_vars(free, bound, additional);
                for name in names {
                    note(name, free, bound, additional);
                }
            }

            Expr::Deref { container, index, default } => {
                container.collect_vars(free, bound, additional);
                index.collect_vars(free, bound, additional);
                if let Some(default) = default {
                    default.collect_vars(free, bound, additional);
                }
            }
            Expr::DerefAssign { container, index, value } => {
                index.collect_vars(free, bound, additional);
                container.collect_vars(free, bound, additional);
                value.collect_vars(free, bound, additional);
            }
            Expr::Slice { container, start, end } => {
                container.collect_vars(free, bound, additional);
                start.collect_vars(free, bound, additional);
                if let Some(end) = end {
                    end.collect_vars(free, bound, additional);
                }
            }
            Expr::DerefInvoke { object, args, .. } => {
                object.collect_vars(free, bound, additional);
                for arg in args {
                    arg.value.collect_vars(free, bound, additional);
                }
            }
            Expr::Call { func, args } => {
                func.collect_vars(free, bound, additional);
                for arg in args {
                    arg.value.collect_vars(free, bound, additional);
                }
            }

            Expr::Block(exprs) => {
                let mut local_bound = bound.clone();
                let mut local_additional = additional.clone();
                local_additional.extend(forward_names(exprs));
                for expr in exprs {
                    expr.collect_vars(free, &mut local_bound, &local_additional);
                }
            }

            Expr::If { branches, else_branch } => {
                for (cond, body) in branches {
                    cond.collect_vars(free, bound, additional);
                    body.collect_vars(free, bound, additional);
                }
                if let Some(else_branch) = else_branch {
                    else_branch.collect_vars(free, bound, additional);
                }
            }
            Expr::And { left, right }
            | Expr::Or { left, right }
            | Expr::Xor { left, right }
            | Expr::Binary { left, right, .. } => {
                left.collect_vars(free, bound, additional);
                right.collect_vars(free, bound, additional);
            }
            Expr::In { element, container } => {
                element.collect_vars(free, bound, additional);
                container.collect_vars(free, bound, additional);
            }

            Expr::For { binder, source, body, .. } => {
                source.collect_vars(free, bound, additional);
                let mut local_bound = bound.clone();
                local_bound.extend(binder.names().into_iter().map(str::to_string));
                body.collect_vars(free, &mut local_bound, additional);
            }
            Expr::While { cond, body } => {
                cond.collect_vars(free, bound, additional);
                body.collect_vars(free, bound, additional);
            }
            Expr::Return(value) => {
                if let Some(value) = value {
                    value.collect_vars(free, bound, additional);
                }
            }

            Expr::ListComprehension { element, clause } | Expr::SetComprehension { element, clause } => {
                collect_comprehension(clause, &[element.as_ref()], free, bound, additional);
            }
            Expr::MapComprehension { key, value, clause } => {
                collect_comprehension(clause, &[key.as_ref(), value.as_ref()], free, bound, additional);
            }

            Expr::Class { name, members } => {
                let mut local_bound = bound.clone();
                let mut local_additional = additional.clone();
                local_additional.insert(name.clone());
                for (member, value) in members {
                    value.collect_vars(free, &mut local_bound, &local_additional);
                    local_bound.insert(member.clone());
                }
                bound.insert(name.clone());
            }
        }
    }
}

fn collect_lambda(def: &LambdaDef, free: &mut NameSet, bound: &NameSet, additional: &NameSet) {
    let mut local_bound = bound.clone();
    for formal in &def.signature.formals {
        // defaults run in the call scope and may read earlier formals
        if let Some(default) = &formal.default {
            default.collect_vars(free, &mut local_bound, additional);
        }
        local_bound.insert(formal.name.clone());
    }
    if let Some(rest) = &def.signature.rest {
        local_bound.insert(rest.clone());
    }
    def.body.collect_vars(free, &mut local_bound, additional);
}

fn collect_comprehension(
    clause: &Comprehension,
    parts: &[&Spanned<Expr>],
    free: &mut NameSet,
    bound: &NameSet,
    additional: &NameSet,
) {
    let mut outer_bound = bound.clone();
    clause.source.collect_vars(free, &mut outer_bound, additional);
    let mut local_bound = bound.clone();
    local_bound.extend(clause.binder.names().into_iter().map(str::to_string));
    if let Some(filter) = &clause.filter {
        filter.collect_vars(free, &mut local_bound, additional);
    }
    for part in parts {
        part.collect_vars(free, &mut local_bound, additional);
    }
}
