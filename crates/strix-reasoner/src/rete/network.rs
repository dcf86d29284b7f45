//! Compiled RETE network: clause filters feeding a left-deep join chain per rule

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use strix_core::{Node, TriplePattern};
use strix_rules::{BuiltinRegistry, ClauseEntry, Rule};

/// Where a token goes next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Target {
    Left(usize),
    Right(usize),
    Terminal(usize),
}

/// Alpha node: one body pattern of one rule
#[derive(Debug, Clone)]
pub(crate) struct ClauseFilter {
    pub rule: usize,
    pub pattern: TriplePattern,
    pub target: Target,
}

/// Beta node joining the tokens of earlier clauses with one more clause
#[derive(Debug, Clone)]
pub(crate) struct JoinNode {
    /// Variables shared between the two sides
    pub key: Vec<usize>,
    pub target: Target,
}

#[derive(Debug, Default)]
pub struct ReteNetwork {
    pub(crate) rules: Vec<Arc<Rule>>,
    pub(crate) filters: Vec<ClauseFilter>,
    pub(crate) joins: Vec<JoinNode>,
    pub(crate) axioms: Vec<usize>,
    by_predicate: HashMap<Node, Vec<usize>>,
    wildcard: Vec<usize>,
    monotonic: bool,
}

impl ReteNetwork {
    pub fn compile(rules: Vec<Arc<Rule>>, registry: &BuiltinRegistry) -> Self {
        let mut network = ReteNetwork {
            monotonic: rules.iter().all(|r| registry.is_monotonic_rule(r)),
            ..Default::default()
        };
        for (r, rule) in rules.iter().enumerate() {
            let patterns: Vec<&TriplePattern> = rule.body().iter().filter_map(ClauseEntry::as_pattern).collect();
            if patterns.is_empty() {
                network.axioms.push(r);
                continue;
            }
            let terminal = Target::Terminal(r);
            if patterns.len() == 1 {
                network.add_filter(r, patterns[0].clone(), terminal);
                continue;
            }
            let base = network.joins.len();
            let mut seen: BTreeSet<usize> = BTreeSet::new();
            for (j, pattern) in patterns.iter().enumerate() {
                let own: BTreeSet<usize> = pattern.variable_indices().into_iter().collect();
                if j == 0 {
                    network.add_filter(r, (*pattern).clone(), Target::Left(base));
                } else {
                    let key = seen.intersection(&own).copied().collect();
                    let target = if j == patterns.len() - 1 { terminal } else { Target::Left(base + j) };
                    network.joins.push(JoinNode { key, target });
                    network.add_filter(r, (*pattern).clone(), Target::Right(base + j - 1));
                }
                seen.extend(own);
            }
        }
        network.rules = rules;
        network
    }

    fn add_filter(&mut self, rule: usize, pattern: TriplePattern, target: Target) {
        let id = self.filters.len();
        if pattern.predicate.is_ground() {
            self.by_predicate.entry(pattern.predicate.clone()).or_default().push(id);
        } else {
            self.wildcard.push(id);
        }
        self.filters.push(ClauseFilter { rule, pattern, target });
    }

    /// Filters that may accept a triple with this predicate
    pub(crate) fn filters_for(&self, predicate: &Node) -> impl Iterator<Item = &ClauseFilter> {
        self.by_predicate
            .get(predicate)
            .into_iter()
            .flatten()
            .chain(self.wildcard.iter())
            .map(|&id| &self.filters[id])
    }

    /// A network is monotonic when no rule uses a non-monotonic builtin
    pub fn is_monotonic(&self) -> bool {
        self.monotonic
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn join_count(&self) -> usize {
        self.joins.len()
    }
}
