//! Head actions: removal, printing and tabling directives

use itertools::Itertools;

use super::{BuiltinRegistry, FnBuiltin, RuleContext};
use crate::error::BuiltinError;
use crate::rule::ClauseEntry;
use strix_core::{Node, Triple};

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register(FnBuiltin::action("remove", None, |args, ctx| remove_body_clauses(args, ctx, false)).non_monotonic());
    registry.register(FnBuiltin::action("drop", None, |args, ctx| remove_body_clauses(args, ctx, true)).non_monotonic());
    registry.register(
        FnBuiltin::test("print", None, |args, ctx| {
            print(args, ctx);
            Ok(true)
        })
        .with_head(|args, ctx| {
            print(args, ctx);
            Ok(())
        }),
    );
    registry.register(FnBuiltin::action("table", None, table));
    registry.register(FnBuiltin::action("tableAll", Some(0), |_, ctx| {
        ctx.table_all();
        Ok(())
    }));
}

/// Instantiated body clauses named by the integer arguments
fn body_triples(name: &str, args: &[Node], ctx: &dyn RuleContext) -> Result<Vec<Triple>, BuiltinError> {
    let rule = ctx
        .rule()
        .ok_or_else(|| BuiltinError::fatal(name, "called outside a rule"))?;
    let mut triples = Vec::with_capacity(args.len());
    for arg in args {
        let index = ctx
            .ground(arg)
            .as_integer()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| BuiltinError::fatal(name, format!("clause index must be an integer, found {}", arg)))?;
        let Some(ClauseEntry::Pattern(pattern)) = rule.body().get(index) else {
            return Err(BuiltinError::fatal(name, format!("body clause {} is not a triple pattern", index)));
        };
        let triple = Triple::new(
            ctx.ground(&pattern.subject),
            ctx.ground(&pattern.predicate),
            ctx.ground(&pattern.object),
        );
        if triple.subject.is_ground() && triple.predicate.is_ground() && triple.object.is_ground() {
            triples.push(triple);
        }
    }
    Ok(triples)
}

/// `remove(n, ..)` deletes the matched body triples as a deletion event;
/// `drop(n, ..)` deletes them silently
fn remove_body_clauses(args: &[Node], ctx: &mut dyn RuleContext, silent: bool) -> Result<(), BuiltinError> {
    let name = if silent { "drop" } else { "remove" };
    for triple in body_triples(name, args, ctx)? {
        if silent {
            ctx.silent_remove(&triple);
        } else {
            ctx.remove(&triple);
        }
    }
    Ok(())
}

fn print(args: &[Node], ctx: &dyn RuleContext) {
    println!("{}", args.iter().map(|a| ctx.ground(a)).join(" "));
}

/// `table(p, ..)`: tabling directive for each predicate
fn table(args: &[Node], ctx: &mut dyn RuleContext) -> Result<(), BuiltinError> {
    for arg in args {
        let predicate = ctx.ground(arg);
        if !predicate.is_ground() {
            return Err(BuiltinError::fatal("table", format!("predicate must be ground, found {}", predicate)));
        }
        ctx.set_tabled(&predicate);
    }
    Ok(())
}
