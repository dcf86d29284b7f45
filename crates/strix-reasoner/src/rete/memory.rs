//! Token memories of the join nodes

use std::collections::{HashMap, VecDeque};

use super::conflict::ConflictSet;
use strix_core::{Node, Triple};
use strix_rules::BindingVector;

/// Partial match travelling through the network
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Token {
    pub env: BindingVector,
    /// Matched triples in body order
    pub matched: Vec<Triple>,
}

impl Token {
    /// Combine a left token with a right token that agrees on the join key
    pub fn join(left: &Token, right: &Token) -> Token {
        let mut matched = left.matched.clone();
        matched.extend(right.matched.iter().cloned());
        Token { env: left.env.merged_with(&right.env), matched }
    }
}

pub(crate) type JoinKey = Vec<Option<Node>>;

/// Multiset of tokens, bucketed by join key
#[derive(Debug, Clone, Default)]
pub(crate) struct TokenMemory {
    buckets: HashMap<JoinKey, HashMap<Token, usize>>,
}

impl TokenMemory {
    pub fn insert(&mut self, key: JoinKey, token: Token) {
        *self.buckets.entry(key).or_default().entry(token).or_insert(0) += 1;
    }

    /// Returns false if the token was not present
    pub fn remove(&mut self, key: &JoinKey, token: &Token) -> bool {
        let Some(bucket) = self.buckets.get_mut(key) else {
            return false;
        };
        let Some(count) = bucket.get_mut(token) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            bucket.remove(token);
            if bucket.is_empty() {
                self.buckets.remove(key);
            }
        }
        true
    }

    pub fn matching(&self, key: &JoinKey) -> Vec<(Token, usize)> {
        self.buckets
            .get(key)
            .map(|bucket| bucket.iter().map(|(t, n)| (t.clone(), *n)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(|b| b.values().sum::<usize>()).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct JoinMemory {
    pub left: TokenMemory,
    pub right: TokenMemory,
}

/// Add or delete event waiting to be propagated
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Add(Triple),
    Delete(Triple),
}

/// Per-session state of a network
#[derive(Debug, Clone, Default)]
pub struct ReteMemory {
    pub(crate) joins: Vec<JoinMemory>,
    pub(crate) queue: VecDeque<Event>,
    pub(crate) conflict: ConflictSet,
    /// Builtin-extended environments of fired terminal tokens, keyed by rule
    pub(crate) fired: HashMap<(usize, Token), Vec<BindingVector>>,
    /// Deductions retracted during the current deletion
    pub(crate) retracted: Vec<Triple>,
}

impl ReteMemory {
    pub fn new(joins: usize) -> Self {
        Self { joins: vec![JoinMemory::default(); joins], ..Default::default() }
    }

    pub fn record_firing(&mut self, rule: usize, token: Token, env: BindingVector) {
        self.fired.entry((rule, token)).or_default().push(env);
    }

    /// Environment a token fired with, so retraction sees the same builtin results
    pub fn take_firing(&mut self, rule: usize, token: &Token) -> Option<BindingVector> {
        let key = (rule, token.clone());
        let envs = self.fired.get_mut(&key)?;
        let env = envs.pop();
        if envs.is_empty() {
            self.fired.remove(&key);
        }
        env
    }

    /// Tokens held across all join memories
    pub fn token_count(&self) -> usize {
        self.joins.iter().map(|j| j.left.len() + j.right.len()).sum()
    }
}
