//! Builtin predicates and head actions

mod actions;
mod arithmetic;
mod compare;
mod graph;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BuiltinError, RuleError};
use crate::rule::Rule;
use strix_core::{LiteralValue, Node, Triple, TriplePattern};

/// Engine services available to a builtin while a rule is being evaluated
pub trait RuleContext {
    /// Substitute the current bindings into a node
    fn ground(&self, node: &Node) -> Node;

    /// Bind a variable. Non-variables "bind" iff they hold the same value.
    fn bind(&mut self, var: &Node, value: Node) -> bool;

    /// Rule being evaluated, if any
    fn rule(&self) -> Option<&Rule>;

    /// Working-set triples matching the pattern
    fn find(&self, pattern: &TriplePattern) -> Vec<Triple>;

    fn contains(&self, triple: &Triple) -> bool {
        !self.find(&TriplePattern::from(triple)).is_empty()
    }

    /// Assert a triple as a deduction
    fn add(&mut self, triple: Triple);

    /// Delete a triple, notifying the engine
    fn remove(&mut self, triple: &Triple);

    /// Delete a triple without re-entering the engine
    fn silent_remove(&mut self, triple: &Triple);

    /// Mark a predicate as tabled for backward evaluation
    fn set_tabled(&mut self, predicate: &Node);

    fn table_all(&mut self);
}

/// A builtin callable from rule bodies or heads.
///
/// Arguments arrive unground; use [`RuleContext::ground`] to read them.
pub trait Builtin: Send + Sync {
    fn name(&self) -> &str;

    /// Exact number of arguments, `None` when variadic
    fn arg_length(&self) -> Option<usize>;

    /// Non-monotonic builtins can invalidate earlier conclusions
    fn is_monotonic(&self) -> bool {
        true
    }

    /// Test or bind in a rule body. `Ok(false)` is an ordinary failure.
    fn body_call(&self, _args: &[Node], _ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
        Err(BuiltinError::fatal(self.name(), "not usable in rule bodies"))
    }

    /// Side effect in a rule head
    fn head_action(&self, _args: &[Node], _ctx: &mut dyn RuleContext) -> Result<(), BuiltinError> {
        Err(BuiltinError::fatal(self.name(), "not usable in rule heads"))
    }

    /// Reject constant arguments that could never work, when rules are compiled
    fn check_args(&self, _args: &[Node]) -> Result<(), BuiltinError> {
        Ok(())
    }
}

pub(crate) type BodyFn = fn(&[Node], &mut dyn RuleContext) -> Result<bool, BuiltinError>;
pub(crate) type HeadFn = fn(&[Node], &mut dyn RuleContext) -> Result<(), BuiltinError>;
pub(crate) type CheckFn = fn(&[Node]) -> Result<(), BuiltinError>;

/// Builtin backed by plain functions
pub(crate) struct FnBuiltin {
    name: &'static str,
    arity: Option<usize>,
    monotonic: bool,
    body: Option<BodyFn>,
    head: Option<HeadFn>,
    check: Option<CheckFn>,
}

impl FnBuiltin {
    pub(crate) fn test(name: &'static str, arity: Option<usize>, body: BodyFn) -> Self {
        Self { name, arity, monotonic: true, body: Some(body), head: None, check: None }
    }

    pub(crate) fn action(name: &'static str, arity: Option<usize>, head: HeadFn) -> Self {
        Self { name, arity, monotonic: true, body: None, head: Some(head), check: None }
    }

    pub(crate) fn with_head(mut self, head: HeadFn) -> Self {
        self.head = Some(head);
        self
    }

    pub(crate) fn with_check(mut self, check: CheckFn) -> Self {
        self.check = Some(check);
        self
    }

    pub(crate) fn non_monotonic(mut self) -> Self {
        self.monotonic = false;
        self
    }
}

impl Builtin for FnBuiltin {
    fn name(&self) -> &str {
        self.name
    }

    fn arg_length(&self) -> Option<usize> {
        self.arity
    }

    fn is_monotonic(&self) -> bool {
        self.monotonic
    }

    fn body_call(&self, args: &[Node], ctx: &mut dyn RuleContext) -> Result<bool, BuiltinError> {
        match self.body {
            Some(body) => body(args, ctx),
            None => Err(BuiltinError::fatal(self.name, "not usable in rule bodies")),
        }
    }

    fn head_action(&self, args: &[Node], ctx: &mut dyn RuleContext) -> Result<(), BuiltinError> {
        match self.head {
            Some(head) => head(args, ctx),
            None => Err(BuiltinError::fatal(self.name, "not usable in rule heads")),
        }
    }

    fn check_args(&self, args: &[Node]) -> Result<(), BuiltinError> {
        self.check.map_or(Ok(()), |check| check(args))
    }
}

/// Name -> builtin table. Passed explicitly to reasoners, no global state.
#[derive(Clone, Default)]
pub struct BuiltinRegistry {
    builtins: HashMap<String, Arc<dyn Builtin>>,
}

impl BuiltinRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every standard builtin
    pub fn standard() -> Self {
        let mut registry = Self::new();
        compare::register(&mut registry);
        arithmetic::register(&mut registry);
        graph::register(&mut registry);
        actions::register(&mut registry);
        registry
    }

    /// Add or replace a builtin under its own name
    pub fn register<B: Builtin + 'static>(&mut self, builtin: B) {
        self.builtins.insert(builtin.name().to_string(), Arc::new(builtin));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Builtin>> {
        self.builtins.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.builtins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty()
    }

    /// Check every call in the rule, nested rules included, names a known
    /// builtin with the right number of arguments
    pub fn validate_rule(&self, rule: &Rule) -> Result<(), RuleError> {
        for call in rule.calls() {
            let builtin = self
                .get(call.name.as_str())
                .ok_or_else(|| RuleError::UnknownBuiltin(call.name.to_string()))?;
            if let Some(expected) = builtin.arg_length() {
                if expected != call.arity() {
                    return Err(RuleError::illegal(
                        rule.short_name(),
                        format!(
                            "builtin {} expects {} arguments, found {}",
                            call.name,
                            expected,
                            call.arity()
                        ),
                    ));
                }
            }
            builtin
                .check_args(&call.args)
                .map_err(|e| RuleError::illegal(rule.short_name(), e.to_string()))?;
        }
        Ok(())
    }

    /// True unless some call in the rule is non-monotonic
    pub fn is_monotonic_rule(&self, rule: &Rule) -> bool {
        rule.calls()
            .iter()
            .all(|call| self.get(call.name.as_str()).map_or(true, |b| b.is_monotonic()))
    }
}

impl fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.builtins.keys().collect();
        names.sort();
        f.debug_struct("BuiltinRegistry").field("builtins", &names).finish()
    }
}

/// Grounded argument, `None` while it is still a variable
pub(crate) fn bound_arg(args: &[Node], index: usize, ctx: &dyn RuleContext) -> Option<Node> {
    let value = ctx.ground(args.get(index)?);
    (!value.is_variable()).then_some(value)
}

/// Typed value of a numeric literal argument
pub(crate) fn numeric_arg(args: &[Node], index: usize, ctx: &dyn RuleContext) -> Option<LiteralValue> {
    let value = bound_arg(args, index, ctx)?.as_literal()?.value();
    value.is_numeric().then_some(value)
}

/// Text of a node as used by string builtins: lexical form for literals,
/// the URI itself for resources
pub(crate) fn lexical_form(node: &Node) -> String {
    match node {
        Node::Literal(l) => l.lexical().to_string(),
        Node::Uri(u) => u.to_string(),
        Node::Blank(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Bind the argument at `index`, failing when it is missing or clashes
pub(crate) fn bind_arg(args: &[Node], index: usize, ctx: &mut dyn RuleContext, value: Node) -> bool {
    args.get(index).map_or(false, |target| ctx.bind(target, value))
}
