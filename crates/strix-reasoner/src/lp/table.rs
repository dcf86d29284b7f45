//! Answer tables for tabled goals

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::query::Cont;
use strix_core::{Node, Triple, TriplePattern};

/// Answers of one tabled goal within a query
#[derive(Debug)]
pub(crate) struct Table {
    pub goal: TriplePattern,
    pub answers: Vec<Triple>,
    seen: HashSet<Triple>,
    pub consumers: Vec<Cont>,
}

impl Table {
    pub fn new(goal: TriplePattern, consumer: Cont) -> Self {
        Self { goal, answers: Vec::new(), seen: HashSet::new(), consumers: vec![consumer] }
    }

    /// Returns false for a duplicate answer
    pub fn add(&mut self, answer: Triple) -> bool {
        if !self.seen.insert(answer.clone()) {
            return false;
        }
        self.answers.push(answer);
        true
    }
}

/// Completed tables kept between queries until the data changes
#[derive(Debug, Clone, Default)]
pub struct TableCache {
    tables: HashMap<TriplePattern, Arc<Vec<Triple>>>,
}

impl TableCache {
    /// Answers of a completed table for the goal. A completed `(ANY p ANY)`
    /// table also serves any narrower goal on `p`.
    pub fn lookup(&self, goal: &TriplePattern) -> Option<Vec<Triple>> {
        if let Some(answers) = self.tables.get(goal) {
            return Some(answers.to_vec());
        }
        if !goal.predicate.is_ground() {
            return None;
        }
        let general = TriplePattern::new(Node::Any, goal.predicate.clone(), Node::Any);
        self.tables
            .get(&general)
            .map(|answers| answers.iter().filter(|t| goal.matches(t)).cloned().collect())
    }

    pub fn publish(&mut self, goal: TriplePattern, answers: Vec<Triple>) {
        self.tables.insert(goal, Arc::new(answers));
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
