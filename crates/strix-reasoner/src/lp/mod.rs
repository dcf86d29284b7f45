//! Tabled backward chaining
//!
//! Goals are solved over an explicit task stack. Tabled goals get an answer
//! table per query; every caller of the same goal becomes a consumer of that
//! table, so left-recursive rules terminate once no new answers appear.
//! Completed tables are cached on the session until the data changes.

mod query;
mod table;

pub use query::LpQuery;
pub use table::TableCache;

use std::collections::HashMap;
use std::sync::Arc;

use crate::state::InferenceState;
use strix_core::{Node, TriplePattern};
use strix_rules::Rule;

/// Backward rules indexed by head predicate
#[derive(Debug, Default)]
pub struct LpRuleIndex {
    rules: Vec<Arc<Rule>>,
    by_predicate: HashMap<Node, Vec<Arc<Rule>>>,
    wildcard: Vec<Arc<Rule>>,
}

impl LpRuleIndex {
    pub fn new(rules: Vec<Arc<Rule>>) -> Self {
        let mut by_predicate: HashMap<Node, Vec<Arc<Rule>>> = HashMap::new();
        let mut wildcard = Vec::new();
        for rule in &rules {
            let Some(head) = rule.head_patterns().next() else { continue };
            if head.predicate.is_ground() {
                by_predicate.entry(head.predicate.clone()).or_default().push(Arc::clone(rule));
            } else {
                wildcard.push(Arc::clone(rule));
            }
        }
        Self { rules, by_predicate, wildcard }
    }

    /// Rules whose head may unify with a goal on this predicate, in rule order
    pub fn candidates(&self, predicate: &Node) -> Vec<Arc<Rule>> {
        if !predicate.is_ground() {
            return self.rules.clone();
        }
        match self.by_predicate.get(predicate) {
            Some(rules) if self.wildcard.is_empty() => rules.clone(),
            Some(_) => self
                .rules
                .iter()
                .filter(|r| r.head_patterns().next().map_or(false, |h| !h.predicate.is_ground() || h.predicate == *predicate))
                .cloned()
                .collect(),
            None => self.wildcard.clone(),
        }
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
}

/// Tabling key of a goal: unbound slots and partially bound functors become ANY
pub fn goal_key(pattern: &TriplePattern) -> TriplePattern {
    let lift = |node: &Node| if node.is_ground() { node.clone() } else { Node::Any };
    TriplePattern::new(lift(&pattern.subject), lift(&pattern.predicate), lift(&pattern.object))
}

/// What a query step may touch
pub(crate) struct LpContext<'a> {
    pub rules: &'a LpRuleIndex,
    pub state: &'a mut InferenceState,
    pub cache: &'a mut TableCache,
    pub max_depth: usize,
    /// Session data version; stale queries do not publish tables
    pub version: u64,
}
