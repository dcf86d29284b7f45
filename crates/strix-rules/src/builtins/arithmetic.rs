//! Arithmetic and string builtins

use chrono::{SecondsFormat, Utc};

use super::{bind_arg, bound_arg, lexical_form, numeric_arg, BuiltinRegistry, FnBuiltin, RuleContext};
use crate::error::BuiltinError;
use strix_core::vocabulary::xsd;
use strix_core::{Literal, LiteralValue, Node};

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register(FnBuiltin::test("sum", Some(3), |args, ctx| {
        binary(args, ctx, i64::checked_add, |a, b| a + b)
    }));
    registry.register(FnBuiltin::test("difference", Some(3), |args, ctx| {
        binary(args, ctx, i64::checked_sub, |a, b| a - b)
    }));
    registry.register(FnBuiltin::test("product", Some(3), |args, ctx| {
        binary(args, ctx, i64::checked_mul, |a, b| a * b)
    }));
    registry.register(FnBuiltin::test("quotient", Some(3), quotient));
    registry.register(FnBuiltin::test("min", Some(3), |args, ctx| {
        binary(args, ctx, |a, b| Some(a.min(b)), f64::min)
    }));
    registry.register(FnBuiltin::test("max", Some(3), |args, ctx| {
        binary(args, ctx, |a, b| Some(a.max(b)), f64::max)
    }));
    registry.register(FnBuiltin::test("addOne", Some(2), add_one));
    registry.register(FnBuiltin::test("strConcat", None, |args, ctx| concat(args, ctx, Node::plain)));
    registry.register(FnBuiltin::test("uriConcat", None, |args, ctx| concat(args, ctx, Node::uri)));
    registry.register(FnBuiltin::test("now", Some(1), now));
}

fn decimal(value: f64) -> Node {
    Node::literal(Literal::double(value))
}

/// `op(a, b, ?c)`. Integer operands stay integers unless the integer op
/// overflows, anything else is computed as a double.
fn binary(
    args: &[Node],
    ctx: &mut dyn RuleContext,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<bool, BuiltinError> {
    let (Some(a), Some(b)) = (numeric_arg(args, 0, ctx), numeric_arg(args, 1, ctx)) else {
        return Ok(false);
    };
    let result = match (&a, &b) {
        (LiteralValue::Integer(x), LiteralValue::Integer(y)) => match int_op(*x, *y) {
            Some(value) => Node::int(value),
            None => decimal(float_op(*x as f64, *y as f64)),
        },
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => decimal(float_op(x, y)),
            _ => return Ok(false),
        },
    };
    Ok(bind_arg(args, 2, ctx, result))
}

/// Integer division for integer operands; a zero divisor fails
fn quotient(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    let (Some(a), Some(b)) = (numeric_arg(args, 0, ctx), numeric_arg(args, 1, ctx)) else {
        return Ok(false);
    };
    let result = match (&a, &b) {
        (LiteralValue::Integer(_), LiteralValue::Integer(0)) => return Ok(false),
        (LiteralValue::Integer(x), LiteralValue::Integer(y)) => match x.checked_div(*y) {
            Some(value) => Node::int(value),
            None => return Ok(false),
        },
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(_), Some(y)) if y == 0.0 => return Ok(false),
            (Some(x), Some(y)) => decimal(x / y),
            _ => return Ok(false),
        },
    };
    Ok(bind_arg(args, 2, ctx, result))
}

fn add_one(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    let result = match numeric_arg(args, 0, ctx) {
        Some(LiteralValue::Integer(x)) => match x.checked_add(1) {
            Some(value) => Node::int(value),
            None => decimal(x as f64 + 1.0),
        },
        Some(other) => match other.as_f64() {
            Some(x) => decimal(x + 1.0),
            None => return Ok(false),
        },
        None => return Ok(false),
    };
    Ok(bind_arg(args, 1, ctx, result))
}

/// Concatenate the lexical forms of all but the last argument and bind the
/// last one to the result
fn concat(args: &[Node], ctx: &mut dyn RuleContext, make: fn(String) -> Node) -> Result<bool, BuiltinError> {
    let Some((target, parts)) = args.split_last() else {
        return Ok(false);
    };
    let mut text = String::new();
    for index in 0..parts.len() {
        match bound_arg(parts, index, ctx) {
            Some(part) if part.is_ground() => text.push_str(&lexical_form(&part)),
            _ => return Ok(false),
        }
    }
    Ok(ctx.bind(target, make(text)))
}

/// Bind the current time as an `xsd:dateTime`
fn now(args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    Ok(bind_arg(args, 0, ctx, Node::literal(Literal::typed(stamp, xsd::DATE_TIME))))
}
