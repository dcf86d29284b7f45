//! Body matching and rule firing shared by the forward engines

use std::sync::Arc;
use tracing::{debug, trace};

use crate::derivation::RuleDerivation;
use crate::error::ReasonerError;
use crate::state::{FiringContext, InferenceState};
use strix_core::{Functor, Triple};
use strix_rules::{
    match_pattern, BindingEnvironment, BindingStack, BindingVector, Builtin, ClauseEntry, Rule, RuleError,
};

/// One way of satisfying a rule body
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BodyMatch {
    pub env: BindingVector,
    /// Matched triples in body order
    pub matches: Vec<Triple>,
}

/// Every match of the rule body against the working set. `trigger` pins one
/// clause to a triple already matched into `env`.
pub(crate) fn match_body(
    rule: &Rule,
    env: BindingStack,
    trigger: Option<(usize, Triple)>,
    state: &mut InferenceState,
) -> Result<Vec<BodyMatch>, ReasonerError> {
    let mut matched: Vec<Option<Triple>> = vec![None; rule.body().len()];
    let skip = trigger.map(|(clause, triple)| {
        matched[clause] = Some(triple);
        clause
    });
    let mut env = env;
    let mut out = Vec::new();
    extend_match(rule, 0, skip, &mut env, &mut matched, state, &mut out)?;
    Ok(out)
}

fn extend_match(
    rule: &Rule,
    clause: usize,
    skip: Option<usize>,
    env: &mut BindingStack,
    matched: &mut Vec<Option<Triple>>,
    state: &mut InferenceState,
    out: &mut Vec<BodyMatch>,
) -> Result<(), ReasonerError> {
    if clause == rule.body().len() {
        out.push(BodyMatch {
            env: env.vector().clone(),
            matches: matched.iter().flatten().cloned().collect(),
        });
        return Ok(());
    }
    if skip == Some(clause) {
        return extend_match(rule, clause + 1, skip, env, matched, state, out);
    }
    match &rule.body()[clause] {
        ClauseEntry::Pattern(pattern) => {
            for triple in state.working.find(&env.goal(pattern)) {
                env.push();
                if match_pattern(pattern, &triple, env) {
                    matched[clause] = Some(triple);
                    extend_match(rule, clause + 1, skip, env, matched, state, out)?;
                    matched[clause] = None;
                }
                env.unwind();
            }
            Ok(())
        }
        ClauseEntry::Call(call) => {
            env.push();
            if call_builtin(call, rule, env, state)? {
                extend_match(rule, clause + 1, skip, env, matched, state, out)?;
            }
            env.unwind();
            Ok(())
        }
        ClauseEntry::Rule(_) => extend_match(rule, clause + 1, skip, env, matched, state, out),
    }
}

/// Run only the body builtins over an environment whose patterns are
/// already matched
pub(crate) fn eval_builtins(
    rule: &Rule,
    env: BindingVector,
    state: &mut InferenceState,
) -> Result<Option<BindingVector>, ReasonerError> {
    let mut env = BindingStack::from_vector(env);
    for call in rule.body().iter().filter_map(ClauseEntry::as_call) {
        if !call_builtin(call, rule, &mut env, state)? {
            return Ok(None);
        }
    }
    Ok(Some(env.into_vector()))
}

pub(crate) fn call_builtin(
    call: &Functor,
    rule: &Rule,
    env: &mut BindingStack,
    state: &mut InferenceState,
) -> Result<bool, ReasonerError> {
    let builtin = lookup_builtin(call, state)?;
    let mut ctx = FiringContext { env, rule, state };
    Ok(builtin.body_call(&call.args, &mut ctx)?)
}

fn lookup_builtin(call: &Functor, state: &InferenceState) -> Result<Arc<dyn Builtin>, ReasonerError> {
    state
        .registry
        .get(call.name.as_str())
        .cloned()
        .ok_or_else(|| RuleError::UnknownBuiltin(call.name.to_string()).into())
}

/// Run the head actions of a rule whose body is already satisfied by `env`
pub(crate) fn run_head_actions(rule: &Rule, env: &mut BindingStack, state: &mut InferenceState) -> Result<(), ReasonerError> {
    for call in rule.head().iter().filter_map(ClauseEntry::as_call) {
        let builtin = lookup_builtin(call, state)?;
        let mut ctx = FiringContext { env: &mut *env, rule, state: &mut *state };
        builtin.head_action(&call.args, &mut ctx)?;
    }
    Ok(())
}

/// Fire a forward rule on one body match. Returns the triples newly added as
/// deductions; head actions queue their edits on `state.pending`.
pub(crate) fn fire_rule(
    rule: &Arc<Rule>,
    body: &BodyMatch,
    state: &mut InferenceState,
) -> Result<Vec<Triple>, ReasonerError> {
    state.count_firing(rule, &body.matches)?;
    let mut env = BindingStack::from_vector(body.env.clone());
    let mut derived = Vec::new();
    for clause in rule.head() {
        match clause {
            ClauseEntry::Pattern(pattern) => match env.instantiate(pattern) {
                Some(triple) => {
                    if state.derivations.is_enabled() && !state.working.is_asserted(&triple) {
                        state.derivations.record(RuleDerivation::new(
                            Arc::clone(rule),
                            triple.clone(),
                            body.matches.clone(),
                        ));
                    }
                    if state.working.add_deduction(triple.clone()) {
                        trace!("Deduced {}", triple);
                        derived.push(triple);
                    }
                }
                None => debug!("Rule {} left head {} unbound", rule.short_name(), pattern),
            },
            ClauseEntry::Call(call) => {
                let builtin = lookup_builtin(call, state)?;
                let mut ctx = FiringContext { env: &mut env, rule, state };
                builtin.head_action(&call.args, &mut ctx)?;
            }
            ClauseEntry::Rule(nested) => {
                let installed = nested.instantiate(&env);
                state.install_rule(installed);
            }
        }
    }
    Ok(derived)
}

/// True if some rule concludes the triple from the current working set
pub(crate) fn is_derivable(
    rules: &[Arc<Rule>],
    triple: &Triple,
    state: &mut InferenceState,
) -> Result<bool, ReasonerError> {
    for rule in rules {
        for head in rule.head_patterns() {
            let Some(env) = strix_rules::bind_pattern(head, triple, rule.num_vars()) else {
                continue;
            };
            if !match_body(rule, BindingStack::from_vector(env), None, state)?.is_empty() {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReasonerConfig;
    use crate::working::WorkingSet;
    use strix_core::{GraphStore, Node};
    use strix_rules::{parse_rule, BuiltinRegistry};

    fn state_with(triples: Vec<Triple>) -> InferenceState {
        let working = WorkingSet::new(GraphStore::new(), GraphStore::from_triples(triples));
        InferenceState::new(working, Arc::new(BuiltinRegistry::standard()), &ReasonerConfig::default())
    }

    #[test]
    fn test_match_body_joins_in_body_order() {
        let rule = parse_rule("[t: (?a <eg:p> ?b) (?b <eg:p> ?c) -> (?a <eg:q> ?c)]").unwrap();
        let mut state = state_with(vec![Triple::uris("eg:x", "eg:p", "eg:y"), Triple::uris("eg:y", "eg:p", "eg:z")]);
        let matches = match_body(&rule, BindingStack::new(rule.num_vars()), None, &mut state).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].matches,
            vec![Triple::uris("eg:x", "eg:p", "eg:y"), Triple::uris("eg:y", "eg:p", "eg:z")]
        );
    }

    #[test]
    fn test_builtin_filters_matches() {
        let rule = parse_rule("[t: (?a <eg:age> ?n) lessThan(?n, 18) -> (?a <eg:minor> 'true')]").unwrap();
        let mut state = state_with(vec![
            Triple::new(Node::uri("eg:a"), Node::uri("eg:age"), Node::int(12)),
            Triple::new(Node::uri("eg:b"), Node::uri("eg:age"), Node::int(40)),
        ]);
        let matches = match_body(&rule, BindingStack::new(rule.num_vars()), None, &mut state).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matches[0].subject, Node::uri("eg:a"));
    }

    #[test]
    fn test_fire_rule_adds_deduction_once() {
        let rule = Arc::new(parse_rule("[t: (?a <eg:p> ?b) -> (?b <eg:p> ?a)]").unwrap());
        let mut state = state_with(vec![Triple::uris("eg:x", "eg:p", "eg:y")]);
        let matches = match_body(&rule, BindingStack::new(rule.num_vars()), None, &mut state).unwrap();
        let derived = fire_rule(&rule, &matches[0], &mut state).unwrap();
        assert_eq!(derived, vec![Triple::uris("eg:y", "eg:p", "eg:x")]);
        assert!(fire_rule(&rule, &matches[0], &mut state).unwrap().is_empty());
        assert_eq!(state.fired, 2);
    }

    #[test]
    fn test_is_derivable() {
        let rule = Arc::new(parse_rule("[t: (?a <eg:p> ?b) -> (?b <eg:q> ?a)]").unwrap());
        let mut state = state_with(vec![Triple::uris("eg:x", "eg:p", "eg:y")]);
        let rules = vec![rule];
        assert!(is_derivable(&rules, &Triple::uris("eg:y", "eg:q", "eg:x"), &mut state).unwrap());
        assert!(!is_derivable(&rules, &Triple::uris("eg:x", "eg:q", "eg:y"), &mut state).unwrap());
    }
}
