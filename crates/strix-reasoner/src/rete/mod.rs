//! Incremental forward engine over a RETE network
//!
//! Monotonic networks fire terminals as soon as a token arrives and handle
//! deletion with delete-and-rederive: conclusions supported by a deleted
//! token are over-deleted, then every over-deleted triple that still has a
//! derivation is put back. Networks using non-monotonic builtins defer
//! firing through a conflict set and recompute on deletion.

mod conflict;
mod memory;
mod network;

pub use memory::ReteMemory;
pub use network::ReteNetwork;

use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::error::ReasonerError;
use crate::matcher::{eval_builtins, fire_rule, is_derivable, match_body, BodyMatch};
use crate::state::{InferenceState, PendingOp};
use conflict::Activation;
use memory::{Event, JoinMemory, Token};
use network::Target;
use strix_core::Triple;
use strix_rules::{bind_pattern, BindingEnvironment, BindingStack, ClauseEntry, Rule};

#[derive(Debug, Clone)]
pub struct ReteEngine {
    network: Arc<ReteNetwork>,
    memory: ReteMemory,
}

impl ReteEngine {
    pub fn new(network: Arc<ReteNetwork>) -> Self {
        let memory = ReteMemory::new(network.join_count());
        Self { network, memory }
    }

    pub fn network(&self) -> &ReteNetwork {
        &self.network
    }

    pub fn memory(&self) -> &ReteMemory {
        &self.memory
    }

    /// Fresh memories, axioms fired once, every working triple injected
    pub(crate) fn init(&mut self, state: &mut InferenceState) -> Result<(), ReasonerError> {
        self.memory = ReteMemory::new(self.network.join_count());
        let network = Arc::clone(&self.network);
        for &r in &network.axioms {
            let rule = &network.rules[r];
            for body in match_body(rule, BindingStack::new(rule.num_vars()), None, state)? {
                self.fire(rule, &body, state)?;
            }
        }
        for triple in state.working.triples() {
            self.memory.queue.push_back(Event::Add(triple));
        }
        self.run(state)?;
        info!(
            "RETE closure complete: {} deductions, {} tokens after {} firings",
            state.working.deductions().len(),
            self.memory.token_count(),
            state.fired
        );
        Ok(())
    }

    pub(crate) fn add(&mut self, triple: Triple, state: &mut InferenceState) -> Result<(), ReasonerError> {
        if state.working.add_raw(triple.clone()) {
            self.memory.queue.push_back(Event::Add(triple));
            self.run(state)?;
        }
        Ok(())
    }

    /// Remove raw data. Returns false if the triple was not raw data.
    pub(crate) fn delete(
        &mut self,
        triple: &Triple,
        state: &mut InferenceState,
    ) -> Result<bool, ReasonerError> {
        if !state.working.remove_raw(triple) {
            return Ok(false);
        }
        if state.working.contains(triple) {
            // still asserted by the schema
            return Ok(true);
        }
        if !self.network.is_monotonic() {
            debug!("Recomputing non-monotonic closure after deleting {}", triple);
            state.reset_derived();
            self.init(state)?;
            return Ok(true);
        }

        self.memory.retracted.clear();
        self.memory.queue.push_back(Event::Delete(triple.clone()));
        self.run(state)?;
        let mut candidates = std::mem::take(&mut self.memory.retracted);
        candidates.push(triple.clone());
        debug!("Over-deleted {} triples after deleting {}", candidates.len(), triple);

        let network = Arc::clone(&self.network);
        let mut restored = 0;
        for candidate in candidates {
            if state.working.contains(&candidate) {
                continue;
            }
            if is_derivable(network.rules(), &candidate, state)? && state.working.add_deduction(candidate.clone()) {
                restored += 1;
                self.memory.queue.push_back(Event::Add(candidate));
            }
        }
        self.run(state)?;
        debug!("Rederived {} triples", restored);
        Ok(true)
    }

    /// Propagate queued events, then fire deferred activations until both drain
    fn run(&mut self, state: &mut InferenceState) -> Result<(), ReasonerError> {
        let network = Arc::clone(&self.network);
        loop {
            while let Some(event) = self.memory.queue.pop_front() {
                match event {
                    Event::Add(triple) => self.inject(&network, &triple, true, state)?,
                    Event::Delete(triple) => self.inject(&network, &triple, false, state)?,
                }
            }
            let Some(activation) = self.memory.conflict.pop() else {
                return Ok(());
            };
            let rule = &network.rules[activation.rule];
            if let Some(env) = eval_builtins(rule, activation.token.env, state)? {
                let body = BodyMatch { env, matches: activation.token.matched };
                self.fire(rule, &body, state)?;
            }
        }
    }

    fn inject(
        &mut self,
        network: &ReteNetwork,
        triple: &Triple,
        add: bool,
        state: &mut InferenceState,
    ) -> Result<(), ReasonerError> {
        trace!("{} {}", if add { "Inject" } else { "Retract" }, triple);
        for filter in network.filters_for(&triple.predicate) {
            let slots = network.rules[filter.rule].num_vars();
            if let Some(env) = bind_pattern(&filter.pattern, triple, slots) {
                let token = Token { env, matched: vec![triple.clone()] };
                self.deliver(network, filter.target, token, add, state)?;
            }
        }
        Ok(())
    }

    fn deliver(
        &mut self,
        network: &ReteNetwork,
        target: Target,
        token: Token,
        add: bool,
        state: &mut InferenceState,
    ) -> Result<(), ReasonerError> {
        let (j, from_left) = match target {
            Target::Left(j) => (j, true),
            Target::Right(j) => (j, false),
            Target::Terminal(r) => return self.terminal(network, r, token, add, state),
        };
        let join = &network.joins[j];
        let key = token.env.project(&join.key);
        let JoinMemory { left, right } = &mut self.memory.joins[j];
        let (own, other) = if from_left { (left, &*right) } else { (right, &*left) };
        if add {
            own.insert(key.clone(), token.clone());
        } else if !own.remove(&key, &token) {
            return Ok(());
        }
        for (partner, count) in other.matching(&key) {
            let joined = if from_left { Token::join(&token, &partner) } else { Token::join(&partner, &token) };
            for _ in 0..count {
                self.deliver(network, join.target, joined.clone(), add, state)?;
            }
        }
        Ok(())
    }

    fn terminal(
        &mut self,
        network: &ReteNetwork,
        r: usize,
        token: Token,
        add: bool,
        state: &mut InferenceState,
    ) -> Result<(), ReasonerError> {
        if !network.is_monotonic() {
            let activation = Activation { rule: r, token };
            if add {
                self.memory.conflict.push(activation);
            } else {
                self.memory.conflict.cancel(&activation);
            }
            return Ok(());
        }
        let rule = &network.rules[r];
        if !add {
            // builtins such as makeTemp or now give a different answer on a second call
            if let Some(env) = self.memory.take_firing(r, &token) {
                self.retract(rule, &BodyMatch { env, matches: token.matched }, state);
            }
            return Ok(());
        }
        let Some(env) = eval_builtins(rule, token.env.clone(), state)? else {
            return Ok(());
        };
        self.memory.record_firing(r, token.clone(), env.clone());
        let body = BodyMatch { env, matches: token.matched };
        self.fire(rule, &body, state)
    }

    fn fire(&mut self, rule: &Arc<Rule>, body: &BodyMatch, state: &mut InferenceState) -> Result<(), ReasonerError> {
        for triple in fire_rule(rule, body, state)? {
            self.memory.queue.push_back(Event::Add(triple));
        }
        for op in std::mem::take(&mut state.pending) {
            match op {
                PendingOp::Add(triple) => {
                    if state.working.add_deduction(triple.clone()) {
                        self.memory.queue.push_back(Event::Add(triple));
                    }
                }
                PendingOp::Remove(triple) => {
                    if state.working.remove(&triple) {
                        self.memory.queue.push_back(Event::Delete(triple));
                    }
                }
            }
        }
        Ok(())
    }

    /// Over-delete the deductions of a match that lost support
    fn retract(&mut self, rule: &Rule, body: &BodyMatch, state: &mut InferenceState) {
        let env = BindingStack::from_vector(body.env.clone());
        for clause in rule.head() {
            match clause {
                ClauseEntry::Pattern(pattern) => {
                    let Some(triple) = env.instantiate(pattern) else { continue };
                    if state.working.remove_deduction(&triple) {
                        trace!("Over-deleted {}", triple);
                        self.memory.retracted.push(triple.clone());
                        self.memory.queue.push_back(Event::Delete(triple));
                    }
                }
                ClauseEntry::Rule(nested) => state.uninstall_rule(nested.instantiate(&env)),
                ClauseEntry::Call(_) => {}
            }
        }
    }
}
