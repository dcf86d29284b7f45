//! Variable binding environments

use strix_core::{Functor, Node, Triple, TriplePattern};

/// Variable -> value bindings for one proof attempt
pub trait BindingEnvironment {
    /// Raw binding of a slot, which may itself be a variable
    fn get(&self, index: usize) -> Option<&Node>;

    /// Bind a slot. Succeeds without change if the slot already holds the same value.
    fn bind_index(&mut self, index: usize, value: Node) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bind a variable node. A non-variable "binds" iff it has the same value.
    fn bind(&mut self, var: &Node, value: Node) -> bool {
        match var {
            Node::Variable(v) => self.bind_index(v.index, value),
            other => other.same_value_as(&value),
        }
    }

    /// Substitute bindings, following variable chains and rebuilding functors
    fn ground(&self, node: &Node) -> Node {
        match node {
            Node::Variable(_) => {
                let mut current = node;
                // a chain can never be longer than the number of slots
                for _ in 0..=self.len() {
                    match current {
                        Node::Variable(v) => match self.get(v.index) {
                            Some(next) if next != current => current = next,
                            _ => return current.clone(),
                        },
                        Node::Functor(_) => return self.ground(current),
                        other => return other.clone(),
                    }
                }
                current.clone()
            }
            Node::Functor(f) if !f.is_ground() => Node::from(Functor::new(
                f.name.clone(),
                f.args.iter().map(|arg| self.ground(arg)).collect(),
            )),
            other => other.clone(),
        }
    }

    fn is_bound(&self, node: &Node) -> bool {
        !matches!(self.ground(node), Node::Variable(_))
    }

    /// Ground triple for the pattern, `None` if any slot stays unbound
    fn instantiate(&self, pattern: &TriplePattern) -> Option<Triple> {
        let subject = self.ground(&pattern.subject);
        let predicate = self.ground(&pattern.predicate);
        let object = self.ground(&pattern.object);
        (subject.is_ground() && predicate.is_ground() && object.is_ground())
            .then(|| Triple::new(subject, predicate, object))
    }

    /// Pattern with bound variables substituted and the rest left in place
    fn partial_instantiate(&self, pattern: &TriplePattern) -> TriplePattern {
        TriplePattern::new(
            self.ground(&pattern.subject),
            self.ground(&pattern.predicate),
            self.ground(&pattern.object),
        )
    }

    /// Query form of a pattern: unbound variables and partially bound
    /// functors become ANY
    fn goal(&self, pattern: &TriplePattern) -> TriplePattern {
        let lift = |node: &Node| {
            let value = self.ground(node);
            if value.is_ground() {
                value
            } else {
                Node::Any
            }
        };
        TriplePattern::new(lift(&pattern.subject), lift(&pattern.predicate), lift(&pattern.object))
    }
}

/// Plain slot vector, cloned freely into RETE tokens and LP frames
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingVector {
    values: Vec<Option<Node>>,
}

impl BindingVector {
    pub fn new(size: usize) -> Self {
        Self { values: vec![None; size] }
    }

    pub fn from_values(values: Vec<Option<Node>>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Option<Node>] {
        &self.values
    }

    /// Slot-wise values of the given variable indices, for join keys
    pub fn project(&self, indices: &[usize]) -> Vec<Option<Node>> {
        indices.iter().map(|&i| self.values.get(i).cloned().flatten()).collect()
    }

    /// Copy every bound slot of `other` into a clone of self
    pub fn merged_with(&self, other: &BindingVector) -> BindingVector {
        let mut merged = self.clone();
        for (i, value) in other.values.iter().enumerate() {
            if let Some(value) = value {
                if merged.values.len() <= i {
                    merged.values.resize(i + 1, None);
                }
                if merged.values[i].is_none() {
                    merged.values[i] = Some(value.clone());
                }
            }
        }
        merged
    }

    pub fn unbind(&mut self, index: usize) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = None;
        }
    }
}

impl BindingEnvironment for BindingVector {
    fn get(&self, index: usize) -> Option<&Node> {
        self.values.get(index).and_then(Option::as_ref)
    }

    fn bind_index(&mut self, index: usize, value: Node) -> bool {
        if let Node::Variable(v) = &value {
            if v.index == index {
                return true;
            }
        }
        if self.values.len() <= index {
            self.values.resize(index + 1, None);
        }
        match &self.values[index] {
            Some(existing) => existing.same_value_as(&value),
            None => {
                self.values[index] = Some(value);
                true
            }
        }
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

/// Binding vector with a trail so bindings can be undone on backtracking
#[derive(Debug, Clone, Default)]
pub struct BindingStack {
    vector: BindingVector,
    /// Slots bound since creation, in binding order
    trail: Vec<usize>,
    /// Trail lengths at each open choice point
    marks: Vec<usize>,
}

impl BindingStack {
    pub fn new(size: usize) -> Self {
        Self::from_vector(BindingVector::new(size))
    }

    pub fn from_vector(vector: BindingVector) -> Self {
        Self { vector, trail: Vec::new(), marks: Vec::new() }
    }

    /// Open a choice point
    pub fn push(&mut self) {
        self.marks.push(self.trail.len());
    }

    /// Undo every binding made since the last `push`.
    ///
    /// # Panics
    /// If there is no open choice point.
    pub fn unwind(&mut self) {
        let Some(mark) = self.marks.pop() else {
            panic!("binding stack unwound past its bottom");
        };
        for index in self.trail.drain(mark..) {
            self.vector.unbind(index);
        }
    }

    /// Keep the bindings made since the last `push`, merging them into the
    /// enclosing choice point.
    ///
    /// # Panics
    /// If there is no open choice point.
    pub fn commit(&mut self) {
        if self.marks.pop().is_none() {
            panic!("binding stack committed past its bottom");
        }
    }

    /// Number of open choice points
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    pub fn vector(&self) -> &BindingVector {
        &self.vector
    }

    pub fn into_vector(self) -> BindingVector {
        self.vector
    }
}

impl BindingEnvironment for BindingStack {
    fn get(&self, index: usize) -> Option<&Node> {
        self.vector.get(index)
    }

    fn bind_index(&mut self, index: usize, value: Node) -> bool {
        let was_bound = self.vector.get(index).is_some();
        let ok = self.vector.bind_index(index, value);
        if ok && !was_bound && self.vector.get(index).is_some() {
            self.trail.push(index);
        }
        ok
    }

    fn len(&self) -> usize {
        self.vector.len()
    }
}
