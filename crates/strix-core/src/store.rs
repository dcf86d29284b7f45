//! Graph storage and pattern queries

use crate::model::{Node, Triple, TriplePattern};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Fact store contract consumed by the reasoners.
///
/// Triples are stored with their terms as written, so `add`, `delete` and
/// `contains` are exact. `find` compares literals by value, the same way rule
/// matching does: `1`, `'1'^^xsd:integer` and `1.0` all match each other.
pub trait Graph {
    /// All triples matching the pattern, variables and ANY acting as wildcards
    fn find(&self, pattern: &TriplePattern) -> Vec<Triple>;

    fn contains(&self, triple: &Triple) -> bool;

    /// Returns false if the triple was already present
    fn add(&mut self, triple: Triple) -> bool;

    /// Returns false if the triple was not present
    fn delete(&mut self, triple: &Triple) -> bool;

    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

type IndexList = SmallVec<[usize; 8]>;

/// In-memory triple store with subject, predicate and object indexing
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    /// Slots in insertion order; deleted slots become `None` until compaction
    triples: Vec<Option<Triple>>,
    /// Triple -> slot
    positions: HashMap<Triple, usize>,
    /// Subject index: subject -> ascending slot list
    subject_index: HashMap<Node, IndexList>,
    /// Predicate index: predicate -> ascending slot list
    predicate_index: HashMap<Node, IndexList>,
    /// Object index: object -> ascending slot list
    object_index: HashMap<Node, IndexList>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triples<I: IntoIterator<Item = Triple>>(triples: I) -> Self {
        let mut store = Self::new();
        for triple in triples {
            store.add_triple(triple);
        }
        store
    }

    /// Add a triple, returning false for a duplicate
    pub fn add_triple(&mut self, triple: Triple) -> bool {
        if self.positions.contains_key(&triple) {
            return false;
        }
        let index = self.triples.len();

        // Update indices
        self.subject_index.entry(triple.subject.clone()).or_default().push(index);
        self.predicate_index.entry(triple.predicate.clone()).or_default().push(index);
        self.object_index.entry(triple.object.clone()).or_default().push(index);

        self.positions.insert(triple.clone(), index);
        self.triples.push(Some(triple));
        true
    }

    /// Remove a triple, returning false if it was absent
    pub fn remove_triple(&mut self, triple: &Triple) -> bool {
        let Some(index) = self.positions.remove(triple) else {
            return false;
        };
        self.triples[index] = None;
        Self::unindex(&mut self.subject_index, &triple.subject, index);
        Self::unindex(&mut self.predicate_index, &triple.predicate, index);
        Self::unindex(&mut self.object_index, &triple.object, index);

        if self.triples.len() > 64 && self.positions.len() * 2 < self.triples.len() {
            self.compact();
        }
        true
    }

    pub fn contains_triple(&self, triple: &Triple) -> bool {
        self.positions.contains_key(triple)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterate over all triples in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter().flatten()
    }

    /// Find triples matching a pattern - optimized with indexing
    pub fn find_triples(&self, pattern: &TriplePattern) -> Vec<&Triple> {
        let subject = Self::index_key(&pattern.subject);
        let predicate = Self::index_key(&pattern.predicate);
        let object = Self::index_key(&pattern.object);

        // Use the most selective indices to minimize the search space
        let lists: SmallVec<[&[usize]; 3]> = [
            subject.map(|s| Self::lookup(&self.subject_index, s)),
            predicate.map(|p| Self::lookup(&self.predicate_index, p)),
            object.map(|o| Self::lookup(&self.object_index, o)),
        ]
        .into_iter()
        .flatten()
        .collect();

        let candidates: IndexList = match lists.as_slice() {
            [] => (0..self.triples.len()).collect(),
            [only] => SmallVec::from_slice(only),
            [first, rest @ ..] => {
                let mut acc: IndexList = SmallVec::from_slice(first);
                for list in rest {
                    acc = Self::intersect_indices(&acc, list);
                }
                acc
            }
        };

        // Literals, functors and repeated wildcards are checked per triple
        candidates
            .into_iter()
            .filter_map(|index| self.triples.get(index).and_then(Option::as_ref))
            .filter(|triple| pattern.matches(triple))
            .collect()
    }

    /// Clear all triples
    pub fn clear(&mut self) {
        self.triples.clear();
        self.positions.clear();
        self.subject_index.clear();
        self.predicate_index.clear();
        self.object_index.clear();
    }

    /// Ground URIs and blank nodes can be answered from an index. Literals
    /// and functors match by value, so they are filtered instead.
    fn index_key(node: &Node) -> Option<&Node> {
        matches!(node, Node::Uri(_) | Node::Blank(_)).then_some(node)
    }

    fn lookup<'a>(index: &'a HashMap<Node, IndexList>, key: &Node) -> &'a [usize] {
        index.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn unindex(index: &mut HashMap<Node, IndexList>, key: &Node, slot: usize) {
        if let Some(list) = index.get_mut(key) {
            list.retain(|i| *i != slot);
            if list.is_empty() {
                index.remove(key);
            }
        }
    }

    /// Rebuild slots and indices without tombstones
    fn compact(&mut self) {
        let live: Vec<Triple> = self.triples.drain(..).flatten().collect();
        self.clear();
        for triple in live {
            self.add_triple(triple);
        }
    }

    /// Intersect two sorted index vectors
    fn intersect_indices(a: &[usize], b: &[usize]) -> IndexList {
        let mut result = SmallVec::new();
        let mut i = 0;
        let mut j = 0;

        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    result.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }

        result
    }
}

impl Graph for GraphStore {
    fn find(&self, pattern: &TriplePattern) -> Vec<Triple> {
        self.find_triples(pattern).into_iter().cloned().collect()
    }

    fn contains(&self, triple: &Triple) -> bool {
        self.contains_triple(triple)
    }

    fn add(&mut self, triple: Triple) -> bool {
        self.add_triple(triple)
    }

    fn delete(&mut self, triple: &Triple) -> bool {
        self.remove_triple(triple)
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl FromIterator<Triple> for GraphStore {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self::from_triples(iter)
    }
}

impl Extend<Triple> for GraphStore {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        for triple in iter {
            self.add_triple(triple);
        }
    }
}
