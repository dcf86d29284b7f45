//! Rule representation

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::binding::BindingEnvironment;
use strix_core::{Functor, Node, TriplePattern};

/// One element of a rule body or head
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClauseEntry {
    /// Triple pattern to match (body) or assert (head)
    Pattern(TriplePattern),
    /// Builtin predicate call or head action
    Call(Functor),
    /// Backward rule installed when a forward rule fires
    Rule(Arc<Rule>),
}

impl ClauseEntry {
    pub fn as_pattern(&self) -> Option<&TriplePattern> {
        match self {
            ClauseEntry::Pattern(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&Functor> {
        match self {
            ClauseEntry::Call(f) => Some(f),
            _ => None,
        }
    }

    fn max_var_index(&self, max: &mut Option<usize>) {
        match self {
            ClauseEntry::Pattern(p) => {
                for index in p.variable_indices() {
                    *max = Some(max.map_or(index, |m| m.max(index)));
                }
            }
            ClauseEntry::Call(f) => {
                for arg in &f.args {
                    max_node_var(arg, max);
                }
            }
            ClauseEntry::Rule(r) => {
                for clause in r.body.iter().chain(&r.head) {
                    clause.max_var_index(max);
                }
            }
        }
    }
}

fn max_node_var(node: &Node, max: &mut Option<usize>) {
    match node {
        Node::Variable(v) => *max = Some(max.map_or(v.index, |m| m.max(v.index))),
        Node::Functor(f) => f.args.iter().for_each(|a| max_node_var(a, max)),
        _ => {}
    }
}

impl fmt::Display for ClauseEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseEntry::Pattern(p) => write!(f, "{}", p),
            ClauseEntry::Call(func) => write!(f, "{}({})", func.name, func.args.iter().join(", ")),
            ClauseEntry::Rule(r) => write!(f, "{}", r),
        }
    }
}

impl From<TriplePattern> for ClauseEntry {
    fn from(pattern: TriplePattern) -> Self {
        ClauseEntry::Pattern(pattern)
    }
}

/// A forward (`body -> head`) or backward (`head <- body`) rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    name: Option<String>,
    body: Vec<ClauseEntry>,
    head: Vec<ClauseEntry>,
    backward: bool,
    num_vars: usize,
}

impl Rule {
    /// Forward rule
    pub fn new(name: Option<String>, body: Vec<ClauseEntry>, head: Vec<ClauseEntry>) -> Self {
        let mut rule = Self { name, body, head, backward: false, num_vars: 0 };
        rule.num_vars = rule.compute_num_vars();
        rule
    }

    /// Backward rule
    pub fn backward(name: Option<String>, head: Vec<ClauseEntry>, body: Vec<ClauseEntry>) -> Self {
        let mut rule = Self::new(name, body, head);
        rule.backward = true;
        rule
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name if present, otherwise the printed rule
    pub fn short_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.to_string())
    }

    pub fn body(&self) -> &[ClauseEntry] {
        &self.body
    }

    pub fn head(&self) -> &[ClauseEntry] {
        &self.head
    }

    pub fn is_backward(&self) -> bool {
        self.backward
    }

    /// Number of binding slots an activation needs
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn body_patterns(&self) -> impl Iterator<Item = &TriplePattern> {
        self.body.iter().filter_map(ClauseEntry::as_pattern)
    }

    pub fn head_patterns(&self) -> impl Iterator<Item = &TriplePattern> {
        self.head.iter().filter_map(ClauseEntry::as_pattern)
    }

    /// Axioms have no triple pattern in their body and fire once
    pub fn is_axiom(&self) -> bool {
        if self.backward && !self.body.is_empty() {
            return false;
        }
        self.body_patterns().next().is_none()
    }

    /// Nested backward rules in the head
    pub fn nested_rules(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.head.iter().filter_map(|c| match c {
            ClauseEntry::Rule(r) => Some(r),
            _ => None,
        })
    }

    /// All builtin calls in body and head, including nested rules
    pub fn calls(&self) -> Vec<&Functor> {
        let mut calls = Vec::new();
        for clause in self.body.iter().chain(&self.head) {
            match clause {
                ClauseEntry::Call(f) => calls.push(f),
                ClauseEntry::Rule(r) => calls.extend(r.calls()),
                ClauseEntry::Pattern(_) => {}
            }
        }
        calls
    }

    /// Copy of the rule with bound variables substituted. Remaining variables
    /// are renumbered from zero so the copy owns a compact slot space.
    pub fn instantiate<E: BindingEnvironment + ?Sized>(&self, env: &E) -> Rule {
        let mut renumber = HashMap::new();
        let head = self.head.iter().map(|c| clone_clause(c, env, &mut renumber)).collect();
        let body = self.body.iter().map(|c| clone_clause(c, env, &mut renumber)).collect();
        Rule {
            name: self.name.clone(),
            body,
            head,
            backward: self.backward,
            num_vars: renumber.len(),
        }
    }

    /// Backward copies with one head pattern each, for goal-directed use of
    /// a forward rule. Head builtins and nested rules are not carried over.
    pub fn split_heads(&self) -> Vec<Rule> {
        self.head_patterns()
            .map(|pattern| {
                let mut rule = Rule::backward(
                    self.name.clone(),
                    vec![ClauseEntry::Pattern(pattern.clone())],
                    self.body.clone(),
                );
                rule.num_vars = rule.num_vars.max(self.num_vars);
                rule
            })
            .collect()
    }

    fn compute_num_vars(&self) -> usize {
        let mut max = None;
        for clause in self.body.iter().chain(&self.head) {
            clause.max_var_index(&mut max);
        }
        max.map_or(0, |m| m + 1)
    }
}

fn clone_clause<E: BindingEnvironment + ?Sized>(
    clause: &ClauseEntry,
    env: &E,
    renumber: &mut HashMap<usize, usize>,
) -> ClauseEntry {
    match clause {
        ClauseEntry::Pattern(p) => ClauseEntry::Pattern(TriplePattern::new(
            clone_node(&p.subject, env, renumber),
            clone_node(&p.predicate, env, renumber),
            clone_node(&p.object, env, renumber),
        )),
        ClauseEntry::Call(f) => ClauseEntry::Call(clone_functor(f, env, renumber)),
        ClauseEntry::Rule(r) => {
            let head = r.head.iter().map(|c| clone_clause(c, env, renumber)).collect();
            let body = r.body.iter().map(|c| clone_clause(c, env, renumber)).collect();
            let mut nested = Rule {
                name: r.name.clone(),
                body,
                head,
                backward: r.backward,
                num_vars: 0,
            };
            nested.num_vars = nested.compute_num_vars();
            ClauseEntry::Rule(Arc::new(nested))
        }
    }
}

fn clone_functor<E: BindingEnvironment + ?Sized>(
    f: &Functor,
    env: &E,
    renumber: &mut HashMap<usize, usize>,
) -> Functor {
    Functor::new(f.name.clone(), f.args.iter().map(|a| clone_node(a, env, renumber)).collect())
}

fn clone_node<E: BindingEnvironment + ?Sized>(
    node: &Node,
    env: &E,
    renumber: &mut HashMap<usize, usize>,
) -> Node {
    match env.ground(node) {
        Node::Variable(v) => {
            let next = renumber.len();
            let index = *renumber.entry(v.index).or_insert(next);
            Node::var(v.name, index)
        }
        Node::Functor(f) if !f.is_ground() => Node::from(clone_functor(&f, env, renumber)),
        other => other,
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        if let Some(name) = &self.name {
            write!(f, "{}: ", name)?;
        }
        let (left, arrow, right) = if self.backward {
            (&self.head, "<-", &self.body)
        } else {
            (&self.body, "->", &self.head)
        };
        for clause in left {
            write!(f, "{} ", clause)?;
        }
        write!(f, "{}", arrow)?;
        for clause in right {
            write!(f, " {}", clause)?;
        }
        write!(f, "]")
    }
}
