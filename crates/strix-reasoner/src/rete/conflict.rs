//! Deferred activations of non-monotonic networks

use std::collections::VecDeque;

use super::memory::Token;

/// A terminal match waiting to fire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Activation {
    pub rule: usize,
    pub token: Token,
}

/// FIFO of activations. A delete reaching a terminal cancels the matching
/// activation if it has not fired yet.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConflictSet {
    queue: VecDeque<Activation>,
}

impl ConflictSet {
    pub fn push(&mut self, activation: Activation) {
        self.queue.push_back(activation);
    }

    pub fn cancel(&mut self, activation: &Activation) -> bool {
        match self.queue.iter().position(|a| a == activation) {
            Some(position) => {
                self.queue.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn pop(&mut self) -> Option<Activation> {
        self.queue.pop_front()
    }
}
