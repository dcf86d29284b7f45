//! Graph lookup, RDF list and node creation builtins

use std::collections::HashSet;
use uuid::Uuid;

use super::{bind_arg, bound_arg, BuiltinRegistry, FnBuiltin, RuleContext};
use crate::error::BuiltinError;
use strix_core::vocabulary::rdf;
use strix_core::{Node, TriplePattern};

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register(FnBuiltin::test("noValue", None, no_value).non_monotonic());
    registry.register(FnBuiltin::test("listContains", Some(2), |args, ctx| {
        Ok(list_membership(args, ctx) == Some(true))
    }));
    registry.register(FnBuiltin::test("listNotContains", Some(2), |args, ctx| {
        Ok(list_membership(args, ctx) == Some(false))
    }));
    registry.register(FnBuiltin::test("listEntry", Some(3), list_entry));
    registry.register(FnBuiltin::test("listLength", Some(2), list_length));
    registry.register(FnBuiltin::test("listEqual", Some(2), |args, ctx| {
        Ok(lists_equal(args, ctx) == Some(true))
    }));
    registry.register(FnBuiltin::test("listNotEqual", Some(2), |args, ctx| {
        Ok(lists_equal(args, ctx) == Some(false))
    }));
    registry.register(FnBuiltin::test("countLiteralValues", Some(3), count_literal_values));
    registry.register(FnBuiltin::test("makeTemp", Some(1), make_temp));
    registry.register(FnBuiltin::test("makeInstance", None, make_instance));
    registry.register(FnBuiltin::test("makeSkolem", None, make_skolem));
}

/// Grounded argument with unbound variables widened to ANY
fn query_arg(args: &[Node], index: usize, ctx: &dyn RuleContext) -> Node {
    match bound_arg(args, index, ctx) {
        Some(node) if node.is_ground() => node,
        _ => Node::Any,
    }
}

/// `noValue(s, p)` / `noValue(s, p, o)`: no matching triple in the working set
fn no_value(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    if !(2..=3).contains(&args.len()) {
        return Err(BuiltinError::fatal("noValue", format!("expects 2 or 3 arguments, found {}", args.len())));
    }
    let pattern = TriplePattern::new(query_arg(args, 0, ctx), query_arg(args, 1, ctx), query_arg(args, 2, ctx));
    Ok(ctx.find(&pattern).is_empty())
}

fn object_of(ctx: &dyn RuleContext, subject: &Node, predicate: &str) -> Option<Node> {
    ctx.find(&TriplePattern::new(subject.clone(), Node::uri(predicate), Node::Any))
        .into_iter()
        .next()
        .map(|t| t.object)
}

/// Elements of an `rdf:first`/`rdf:rest` list. A malformed or cyclic tail
/// ends the walk.
fn list_items(ctx: &dyn RuleContext, head: &Node) -> Vec<Node> {
    let nil = Node::uri(rdf::NIL);
    let mut items = Vec::new();
    let mut visited = HashSet::new();
    let mut current = head.clone();
    while current != nil && visited.insert(current.clone()) {
        let Some(first) = object_of(ctx, &current, rdf::FIRST) else {
            break;
        };
        items.push(first);
        match object_of(ctx, &current, rdf::REST) {
            Some(rest) => current = rest,
            None => break,
        }
    }
    items
}

fn list_membership(args: &[Node], ctx: &dyn RuleContext) -> Option<bool> {
    let list = bound_arg(args, 0, ctx)?;
    let member = bound_arg(args, 1, ctx).filter(Node::is_ground)?;
    Some(list_items(ctx, &list).iter().any(|item| item.same_value_as(&member)))
}

fn lists_equal(args: &[Node], ctx: &dyn RuleContext) -> Option<bool> {
    let first = list_items(ctx, &bound_arg(args, 0, ctx)?);
    let second = list_items(ctx, &bound_arg(args, 1, ctx)?);
    Some(first.len() == second.len() && first.iter().zip(&second).all(|(a, b)| a.same_value_as(b)))
}

/// `listEntry(list, index, ?entry)`, zero-based
fn list_entry(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    let (Some(list), Some(index)) = (bound_arg(args, 0, ctx), bound_arg(args, 1, ctx)) else {
        return Ok(false);
    };
    let Some(index) = index.as_integer().and_then(|i| usize::try_from(i).ok()) else {
        return Ok(false);
    };
    match list_items(ctx, &list).into_iter().nth(index) {
        Some(entry) => Ok(bind_arg(args, 2, ctx, entry)),
        None => Ok(false),
    }
}

fn list_length(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    let Some(list) = bound_arg(args, 0, ctx) else {
        return Ok(false);
    };
    let length = list_items(ctx, &list).len() as i64;
    Ok(bind_arg(args, 1, ctx, Node::int(length)))
}

/// `countLiteralValues(s, p, ?n)`: number of distinct literal values of p on s
fn count_literal_values(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    let (Some(subject), Some(predicate)) = (bound_arg(args, 0, ctx), bound_arg(args, 1, ctx)) else {
        return Ok(false);
    };
    let mut distinct: Vec<Node> = Vec::new();
    for triple in ctx.find(&TriplePattern::new(subject, predicate, Node::Any)) {
        if triple.object.is_literal() && !distinct.iter().any(|d| d.same_value_as(&triple.object)) {
            distinct.push(triple.object);
        }
    }
    Ok(bind_arg(args, 2, ctx, Node::int(distinct.len() as i64)))
}

/// Fresh blank node
fn make_temp(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    Ok(bind_arg(args, 0, ctx, Node::blank(Uuid::new_v4().to_string())))
}

/// Blank node that is a stable function of the given nodes
fn skolem(parts: &[Node]) -> Node {
    let key = parts.iter().map(ToString::to_string).collect::<Vec<_>>().join("\u{1F}");
    Node::blank(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string())
}

/// `makeInstance(x, p, ?i)` / `makeInstance(x, p, t, ?i)`: the instance
/// standing for the value of p on x. Reuses an existing value, otherwise the
/// same blank node is produced for the same inputs on every firing.
fn make_instance(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    let Some((target, inputs)) = args.split_last().filter(|(_, inputs)| (2..=3).contains(&inputs.len())) else {
        return Err(BuiltinError::fatal("makeInstance", format!("expects 3 or 4 arguments, found {}", args.len())));
    };
    let mut key = Vec::with_capacity(inputs.len());
    for index in 0..inputs.len() {
        match bound_arg(inputs, index, ctx) {
            Some(node) if node.is_ground() => key.push(node),
            _ => return Ok(false),
        }
    }
    let existing = ctx
        .find(&TriplePattern::new(key[0].clone(), key[1].clone(), Node::Any))
        .into_iter()
        .map(|t| t.object)
        .find(|o| o.is_blank());
    let instance = existing.unwrap_or_else(|| skolem(&key));
    Ok(ctx.bind(target, instance))
}

/// `makeSkolem(?x, v1, ..)`: blank node determined by the values
fn make_skolem(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    let Some((target, inputs)) = args.split_first() else {
        return Err(BuiltinError::fatal("makeSkolem", "expects at least 1 argument"));
    };
    let mut values = Vec::with_capacity(inputs.len());
    for input in inputs {
        let value = ctx.ground(input);
        if !value.is_ground() {
            return Ok(false);
        }
        values.push(value);
    }
    Ok(ctx.bind(target, skolem(&values)))
}
