//! Agenda-driven forward chaining
//!
//! Each new triple is matched against the body clauses indexed under its
//! predicate; the remaining clauses are joined against the working set.
//! Deletion clears every deduction and recomputes the closure.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ReasonerError;
use crate::matcher::{fire_rule, match_body};
use crate::state::{InferenceState, PendingOp};
use strix_core::{Node, Triple};
use strix_rules::{bind_pattern, BindingStack, ClauseEntry, Rule};

/// Forward rules with a predicate index over their body clauses
#[derive(Debug, Default)]
pub struct ForwardRules {
    rules: Vec<Arc<Rule>>,
    by_predicate: HashMap<Node, Vec<(usize, usize)>>,
    wildcard: Vec<(usize, usize)>,
}

impl ForwardRules {
    pub fn new(rules: Vec<Arc<Rule>>) -> Self {
        let mut by_predicate: HashMap<Node, Vec<(usize, usize)>> = HashMap::new();
        let mut wildcard = Vec::new();
        for (r, rule) in rules.iter().enumerate() {
            for (c, clause) in rule.body().iter().enumerate() {
                let ClauseEntry::Pattern(pattern) = clause else { continue };
                if pattern.predicate.is_ground() {
                    by_predicate.entry(pattern.predicate.clone()).or_default().push((r, c));
                } else {
                    wildcard.push((r, c));
                }
            }
        }
        Self { rules, by_predicate, wildcard }
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// (rule, clause) pairs whose pattern can match a triple with this predicate
    fn candidates(&self, predicate: &Node) -> Vec<(usize, usize)> {
        let mut found = self.by_predicate.get(predicate).cloned().unwrap_or_default();
        found.extend(self.wildcard.iter().copied());
        found
    }
}

#[derive(Debug, Clone)]
pub struct ForwardEngine {
    rules: Arc<ForwardRules>,
    agenda: VecDeque<Triple>,
}

impl ForwardEngine {
    pub fn new(rules: Arc<ForwardRules>) -> Self {
        Self { rules, agenda: VecDeque::new() }
    }

    /// Fire axioms once, then run every working triple through the rules
    pub(crate) fn init(&mut self, state: &mut InferenceState) -> Result<(), ReasonerError> {
        self.agenda.clear();
        let rules = Arc::clone(&self.rules);
        for rule in rules.rules.iter().filter(|r| r.is_axiom()) {
            for body in match_body(rule, BindingStack::new(rule.num_vars()), None, state)? {
                let derived = fire_rule(rule, &body, state)?;
                self.agenda.extend(derived);
                self.apply_pending(state);
            }
        }
        self.agenda.extend(state.working.triples());
        self.run(state)?;
        info!(
            "Forward closure complete: {} deductions after {} firings",
            state.working.deductions().len(),
            state.fired
        );
        Ok(())
    }

    pub(crate) fn add(&mut self, triple: Triple, state: &mut InferenceState) -> Result<(), ReasonerError> {
        if state.working.add_raw(triple.clone()) {
            self.agenda.push_back(triple);
            self.run(state)?;
        }
        Ok(())
    }

    /// Remove raw data and recompute. Returns false if the triple was not raw data.
    pub(crate) fn delete(
        &mut self,
        triple: &Triple,
        state: &mut InferenceState,
    ) -> Result<bool, ReasonerError> {
        if !state.working.remove_raw(triple) {
            return Ok(false);
        }
        debug!("Recomputing closure after deleting {}", triple);
        state.reset_derived();
        self.init(state)?;
        Ok(true)
    }

    fn run(&mut self, state: &mut InferenceState) -> Result<(), ReasonerError> {
        let rules = Arc::clone(&self.rules);
        while let Some(triple) = self.agenda.pop_front() {
            if !state.working.contains(&triple) {
                continue;
            }
            for (r, c) in rules.candidates(&triple.predicate) {
                let rule = &rules.rules[r];
                let Some(pattern) = rule.body()[c].as_pattern() else { continue };
                let Some(env) = bind_pattern(pattern, &triple, rule.num_vars()) else { continue };
                let trigger = Some((c, triple.clone()));
                for body in match_body(rule, BindingStack::from_vector(env), trigger, state)? {
                    let derived = fire_rule(rule, &body, state)?;
                    self.agenda.extend(derived);
                    self.apply_pending(state);
                }
            }
        }
        Ok(())
    }

    fn apply_pending(&mut self, state: &mut InferenceState) {
        for op in std::mem::take(&mut state.pending) {
            match op {
                PendingOp::Add(triple) => {
                    if state.working.add_deduction(triple.clone()) {
                        self.agenda.push_back(triple);
                    }
                }
                PendingOp::Remove(triple) => {
                    if state.working.remove(&triple) {
                        debug!("Removed {}", triple);
                    }
                }
            }
        }
    }
}
