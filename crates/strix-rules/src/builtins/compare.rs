//! Comparison and type-test builtins

use chrono::DateTime;
use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{bound_arg, lexical_form, BuiltinRegistry, FnBuiltin, RuleContext};
use crate::error::BuiltinError;
use strix_core::vocabulary::xsd;
use strix_core::{Literal, Node};

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register(FnBuiltin::test("equal", Some(2), equal));
    registry.register(FnBuiltin::test("notEqual", Some(2), not_equal));
    registry.register(FnBuiltin::test("lessThan", Some(2), less_than));
    registry.register(FnBuiltin::test("greaterThan", Some(2), greater_than));
    registry.register(FnBuiltin::test("le", Some(2), less_or_equal));
    registry.register(FnBuiltin::test("ge", Some(2), greater_or_equal));
    registry.register(FnBuiltin::test("bound", None, bound));
    registry.register(FnBuiltin::test("unbound", None, unbound));
    registry.register(FnBuiltin::test("isLiteral", Some(1), |args, ctx| Ok(is_kind(args, ctx, Node::is_literal))));
    registry.register(FnBuiltin::test("notLiteral", Some(1), |args, ctx| Ok(!is_kind(args, ctx, Node::is_literal))));
    registry.register(FnBuiltin::test("isBNode", Some(1), |args, ctx| Ok(is_kind(args, ctx, Node::is_blank))));
    registry.register(FnBuiltin::test("notBNode", Some(1), |args, ctx| Ok(!is_kind(args, ctx, Node::is_blank))));
    registry.register(FnBuiltin::test("isFunctor", Some(1), |args, ctx| Ok(is_kind(args, ctx, Node::is_functor))));
    registry.register(FnBuiltin::test("notFunctor", Some(1), |args, ctx| Ok(!is_kind(args, ctx, Node::is_functor))));
    registry.register(FnBuiltin::test("regex", None, regex).with_check(check_regex));
}

fn ground_pair(args: &[Node], ctx: &dyn RuleContext) -> Option<(Node, Node)> {
    let a = bound_arg(args, 0, ctx)?;
    let b = bound_arg(args, 1, ctx)?;
    (a.is_ground() && b.is_ground()).then_some((a, b))
}

fn equal(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    Ok(ground_pair(args, ctx).map_or(false, |(a, b)| a.same_value_as(&b)))
}

fn not_equal(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    Ok(ground_pair(args, ctx).map_or(false, |(a, b)| !a.same_value_as(&b)))
}

/// Ordering of two numeric literals, or of two `xsd:dateTime` literals
fn compare(args: &[Node], ctx: &dyn RuleContext) -> Option<Ordering> {
    let (a, b) = ground_pair(args, ctx)?;
    let (a, b) = (a.as_literal()?, b.as_literal()?);
    a.compare_value(b).or_else(|| compare_date_times(a, b))
}

fn compare_date_times(a: &Literal, b: &Literal) -> Option<Ordering> {
    if a.datatype() != Some(xsd::DATE_TIME) || b.datatype() != Some(xsd::DATE_TIME) {
        return None;
    }
    let a = DateTime::parse_from_rfc3339(a.lexical()).ok()?;
    let b = DateTime::parse_from_rfc3339(b.lexical()).ok()?;
    Some(a.cmp(&b))
}

fn less_than(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    Ok(compare(args, ctx) == Some(Ordering::Less))
}

fn greater_than(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    Ok(compare(args, ctx) == Some(Ordering::Greater))
}

fn less_or_equal(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    Ok(matches!(compare(args, ctx), Some(Ordering::Less | Ordering::Equal)))
}

fn greater_or_equal(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    Ok(matches!(compare(args, ctx), Some(Ordering::Greater | Ordering::Equal)))
}

fn bound(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    Ok(args.iter().all(|a| !ctx.ground(a).is_variable()))
}

fn unbound(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    Ok(args.iter().all(|a| ctx.ground(a).is_variable()))
}

fn is_kind(args: &[Node], ctx: &dyn RuleContext, test: fn(&Node) -> bool) -> bool {
    args.first().map_or(false, |a| test(&ctx.ground(a)))
}

lazy_static! {
    static ref PATTERNS: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

/// Whole-text regex for a pattern, compiled once per process
fn compiled_pattern(pattern: &str) -> Result<Regex, BuiltinError> {
    let mut patterns = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(compiled) = patterns.get(pattern) {
        return Ok(compiled.clone());
    }
    let compiled = Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| BuiltinError::fatal("regex", format!("bad pattern '{}': {}", pattern, e)))?;
    patterns.insert(pattern.to_string(), compiled.clone());
    Ok(compiled)
}

fn check_regex(args: &[Node]) -> Result<(), BuiltinError> {
    if args.len() < 2 {
        return Err(BuiltinError::fatal("regex", format!("expects at least 2 arguments, found {}", args.len())));
    }
    match &args[1] {
        Node::Literal(_) => compiled_pattern(&lexical_form(&args[1])).map(drop),
        _ => Ok(()),
    }
}

/// `regex(text, pattern, ?group1, ..)`: the pattern must match the whole
/// text; capture groups bind to plain literals
fn regex(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    if args.len() < 2 {
        return Err(BuiltinError::fatal("regex", format!("expects at least 2 arguments, found {}", args.len())));
    }
    let (Some(text), Some(pattern)) = (bound_arg(args, 0, ctx), bound_arg(args, 1, ctx)) else {
        return Ok(false);
    };
    let text = lexical_form(&text);
    let compiled = compiled_pattern(&lexical_form(&pattern))?;

    let Some(captures) = compiled.captures(&text) else {
        return Ok(false);
    };
    for (i, target) in args[2..].iter().enumerate() {
        let group = captures.get(i + 1).map_or("", |m| m.as_str());
        if !ctx.bind(target, Node::plain(group)) {
            return Ok(false);
        }
    }
    Ok(true)
}
