//! Mutable per-session inference state shared by the engines

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ReasonerConfig;
use crate::derivation::DerivationStore;
use crate::error::ReasonerError;
use crate::working::WorkingSet;
use strix_core::{Node, Triple, TriplePattern};
use strix_rules::{BindingEnvironment, BindingStack, BuiltinRegistry, Rule, RuleContext};

/// Tabling directives in force
#[derive(Debug, Clone, Default)]
pub struct Tabling {
    predicates: HashSet<Node>,
    all: bool,
}

impl Tabling {
    pub fn new(all: bool) -> Self {
        Self { predicates: HashSet::new(), all }
    }

    /// Goals with a variable predicate are tabled only under `tableAll`
    pub fn is_tabled(&self, predicate: &Node) -> bool {
        self.all || self.predicates.contains(predicate)
    }

    pub fn set(&mut self, predicate: Node) -> bool {
        self.predicates.insert(predicate)
    }

    pub fn set_all(&mut self) {
        self.all = true;
    }

    pub fn is_all(&self) -> bool {
        self.all
    }
}

/// Backward rules installed by hybrid forward rules, counted per install
#[derive(Debug, Clone, Default)]
pub struct InstalledRules {
    rules: Vec<(Arc<Rule>, usize)>,
}

impl InstalledRules {
    /// Returns true when the rule was not installed before
    pub fn install(&mut self, rule: Rule) -> bool {
        if let Some((_, count)) = self.rules.iter_mut().find(|(r, _)| **r == rule) {
            *count += 1;
            return false;
        }
        self.rules.push((Arc::new(rule), 1));
        true
    }

    /// Returns true when the last install of the rule was removed
    pub fn uninstall(&mut self, rule: &Rule) -> bool {
        let Some(position) = self.rules.iter().position(|(r, _)| **r == *rule) else {
            return false;
        };
        let count = &mut self.rules[position].1;
        *count -= 1;
        if *count == 0 {
            self.rules.remove(position);
            return true;
        }
        false
    }

    /// Installed rules whose head predicate can match the goal predicate
    pub fn matching(&self, predicate: &Node) -> Vec<Arc<Rule>> {
        self.rules
            .iter()
            .filter(|(rule, _)| {
                rule.head_patterns().next().map_or(false, |head| {
                    head.predicate.is_wildcard() || predicate.is_wildcard() || head.predicate == *predicate
                })
            })
            .map(|(rule, _)| Arc::clone(rule))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }
}

/// Working-set change requested by a head action
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingOp {
    Add(Triple),
    Remove(Triple),
}

/// Everything the engines read and write while reasoning
#[derive(Debug, Clone)]
pub(crate) struct InferenceState {
    pub working: WorkingSet,
    pub derivations: DerivationStore,
    pub tabling: Tabling,
    pub installed: InstalledRules,
    pub pending: Vec<PendingOp>,
    pub registry: Arc<BuiltinRegistry>,
    /// Firings since the session was prepared
    pub fired: u64,
    /// Firings in the current evaluation, checked against the budget
    evaluation_firings: u64,
    max_firings: Option<u64>,
    trace: bool,
}

impl InferenceState {
    pub fn new(working: WorkingSet, registry: Arc<BuiltinRegistry>, config: &ReasonerConfig) -> Self {
        Self {
            working,
            derivations: DerivationStore::new(config.derivation_logging),
            tabling: Tabling::new(config.table_all),
            installed: InstalledRules::default(),
            pending: Vec::new(),
            registry,
            fired: 0,
            evaluation_firings: 0,
            max_firings: config.max_rule_firings,
            trace: config.trace,
        }
    }

    /// Start a fresh firing budget for one closure, add or delete
    pub fn begin_evaluation(&mut self) {
        self.evaluation_firings = 0;
    }

    /// Count a firing against the budget
    pub fn count_firing(&mut self, rule: &Rule, matches: &[Triple]) -> Result<(), ReasonerError> {
        self.fired += 1;
        self.evaluation_firings += 1;
        if let Some(limit) = self.max_firings {
            if self.evaluation_firings > limit {
                return Err(ReasonerError::ResourceExhausted(format!(
                    "rule firing budget of {} exhausted at rule {}",
                    limit,
                    rule.short_name()
                )));
            }
        }
        if self.trace {
            info!("Fired rule {} on {}", rule.short_name(), display_matches(matches));
        } else {
            debug!("Fired rule {} on {}", rule.short_name(), display_matches(matches));
        }
        Ok(())
    }

    /// Install a backward rule from a hybrid head and table its head predicate
    pub fn install_rule(&mut self, rule: Rule) {
        let rules = if rule.is_backward() { vec![rule] } else { rule.split_heads() };
        for rule in rules {
            if let Some(head) = rule.head_patterns().next() {
                if head.predicate.is_ground() {
                    self.tabling.set(head.predicate.clone());
                } else {
                    self.tabling.set_all();
                }
            }
            let text = rule.to_string();
            if self.installed.install(rule) {
                info!("Installed backward rule {}", text);
            }
        }
    }

    pub fn uninstall_rule(&mut self, rule: Rule) {
        let rules = if rule.is_backward() { vec![rule] } else { rule.split_heads() };
        for rule in rules {
            if self.installed.uninstall(&rule) {
                info!("Removed backward rule {}", rule);
            }
        }
    }

    /// Forget every deduction and installed rule, keeping asserted data
    pub fn reset_derived(&mut self) {
        self.working.clear_deductions();
        self.installed.clear();
        self.pending.clear();
    }
}

fn display_matches(matches: &[Triple]) -> String {
    matches.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Builtin view of a rule evaluation: one environment over the session state
pub(crate) struct FiringContext<'a> {
    pub env: &'a mut BindingStack,
    pub rule: &'a Rule,
    pub state: &'a mut InferenceState,
}

impl RuleContext for FiringContext<'_> {
    fn ground(&self, node: &Node) -> Node {
        self.env.ground(node)
    }

    fn bind(&mut self, var: &Node, value: Node) -> bool {
        self.env.bind(var, value)
    }

    fn rule(&self) -> Option<&Rule> {
        Some(self.rule)
    }

    fn find(&self, pattern: &TriplePattern) -> Vec<Triple> {
        self.state.working.find(pattern)
    }

    fn contains(&self, triple: &Triple) -> bool {
        self.state.working.contains(triple)
    }

    fn add(&mut self, triple: Triple) {
        self.state.pending.push(PendingOp::Add(triple));
    }

    fn remove(&mut self, triple: &Triple) {
        self.state.pending.push(PendingOp::Remove(triple.clone()));
    }

    fn silent_remove(&mut self, triple: &Triple) {
        if self.state.working.remove(triple) {
            debug!("Dropped {}", triple);
        }
    }

    fn set_tabled(&mut self, predicate: &Node) {
        if self.state.tabling.set(predicate.clone()) {
            info!("Tabling predicate {}", predicate);
        }
    }

    fn table_all(&mut self) {
        self.state.tabling.set_all();
    }
}
