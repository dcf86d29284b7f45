//! Working set: schema, raw data and deductions of one session

use std::collections::HashSet;

use strix_core::{GraphStore, Triple, TriplePattern};

/// `schema ∪ raw ∪ deductions`. A triple is held as a deduction only while
/// it is neither schema nor raw data.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    schema: GraphStore,
    raw: GraphStore,
    deductions: GraphStore,
}

impl WorkingSet {
    pub fn new(schema: GraphStore, raw: GraphStore) -> Self {
        Self { schema, raw, deductions: GraphStore::new() }
    }

    pub fn schema(&self) -> &GraphStore {
        &self.schema
    }

    pub fn raw(&self) -> &GraphStore {
        &self.raw
    }

    pub fn deductions(&self) -> &GraphStore {
        &self.deductions
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.schema.contains_triple(triple) || self.raw.contains_triple(triple) || self.deductions.contains_triple(triple)
    }

    /// Schema or raw data, as opposed to a deduction
    pub fn is_asserted(&self, triple: &Triple) -> bool {
        self.schema.contains_triple(triple) || self.raw.contains_triple(triple)
    }

    pub fn is_deduction(&self, triple: &Triple) -> bool {
        self.deductions.contains_triple(triple)
    }

    /// Matching triples across all three layers, without duplicates
    pub fn find(&self, pattern: &TriplePattern) -> Vec<Triple> {
        let mut found: Vec<Triple> = self.schema.find_triples(pattern).into_iter().cloned().collect();
        found.extend(
            self.raw
                .find_triples(pattern)
                .into_iter()
                .filter(|t| !self.schema.contains_triple(t))
                .cloned(),
        );
        found.extend(
            self.deductions
                .find_triples(pattern)
                .into_iter()
                .filter(|t| !self.is_asserted(t))
                .cloned(),
        );
        found
    }

    /// Every triple in the working set
    pub fn triples(&self) -> Vec<Triple> {
        let mut seen = HashSet::new();
        self.schema
            .iter()
            .chain(self.raw.iter())
            .chain(self.deductions.iter())
            .filter(|t| seen.insert(*t))
            .cloned()
            .collect()
    }

    pub fn size(&self) -> usize {
        self.triples().len()
    }

    /// Add raw data. A matching deduction is absorbed into the raw layer.
    /// Returns false if the triple was already in the working set.
    pub fn add_raw(&mut self, triple: Triple) -> bool {
        let was_present = self.contains(&triple);
        self.deductions.remove_triple(&triple);
        self.raw.add_triple(triple);
        !was_present
    }

    pub fn remove_raw(&mut self, triple: &Triple) -> bool {
        self.raw.remove_triple(triple)
    }

    /// Returns false if the triple is already in the working set
    pub fn add_deduction(&mut self, triple: Triple) -> bool {
        if self.contains(&triple) {
            return false;
        }
        self.deductions.add_triple(triple)
    }

    pub fn remove_deduction(&mut self, triple: &Triple) -> bool {
        self.deductions.remove_triple(triple)
    }

    /// Remove from raw data or deductions; schema is never touched.
    /// Returns true if the triple left the working set.
    pub fn remove(&mut self, triple: &Triple) -> bool {
        let removed = self.raw.remove_triple(triple) | self.deductions.remove_triple(triple);
        removed && !self.schema.contains_triple(triple)
    }

    pub fn clear_deductions(&mut self) {
        self.deductions.clear();
    }

    /// Replace raw data and drop all deductions
    pub fn rebind(&mut self, raw: GraphStore) {
        self.raw = raw;
        self.deductions.clear();
    }

    pub fn clear(&mut self) {
        self.schema.clear();
        self.raw.clear();
        self.deductions.clear();
    }
}
