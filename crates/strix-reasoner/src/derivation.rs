//! Derivation records and proof printing

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use strix_core::Triple;
use strix_rules::Rule;

/// One application of a rule that concluded a triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleDerivation {
    pub rule: Arc<Rule>,
    pub conclusion: Triple,
    /// Body matches in body order
    pub matches: Vec<Triple>,
}

impl RuleDerivation {
    pub fn new(rule: Arc<Rule>, conclusion: Triple, matches: Vec<Triple>) -> Self {
        Self { rule, conclusion, matches }
    }
}

/// Conclusion -> distinct derivations, recorded only while enabled
#[derive(Debug, Clone, Default)]
pub struct DerivationStore {
    enabled: bool,
    records: HashMap<Triple, Vec<RuleDerivation>>,
}

impl DerivationStore {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, records: HashMap::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn record(&mut self, derivation: RuleDerivation) {
        if !self.enabled {
            return;
        }
        let entry = self.records.entry(derivation.conclusion.clone()).or_default();
        if !entry.contains(&derivation) {
            entry.push(derivation);
        }
    }

    pub fn get(&self, triple: &Triple) -> &[RuleDerivation] {
        self.records.get(triple).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Every record, ordered by conclusion for stable output
    pub fn all(&self) -> Vec<&RuleDerivation> {
        let mut all: Vec<_> = self.records.values().flatten().collect();
        all.sort_by(|a, b| a.conclusion.cmp(&b.conclusion));
        all
    }

    /// Indented proof tree for every derivation of `triple`
    pub fn format_trace(&self, triple: &Triple) -> String {
        self.trace(triple).to_string()
    }

    pub fn trace<'a>(&'a self, triple: &'a Triple) -> DerivationTrace<'a> {
        DerivationTrace { store: self, triple }
    }

    fn write_trace<W: fmt::Write>(
        &self,
        out: &mut W,
        derivation: &RuleDerivation,
        indent: usize,
        seen: &mut HashSet<Triple>,
    ) -> fmt::Result {
        let pad = " ".repeat(indent);
        let inner = " ".repeat(indent + 4);
        writeln!(out, "{}Rule {} concluded {} <-", pad, derivation.rule.short_name(), derivation.conclusion)?;
        for matched in &derivation.matches {
            match self.get(matched).first() {
                None => writeln!(out, "{}Fact {}", inner, matched)?,
                Some(_) if seen.contains(matched) => writeln!(out, "{}Known {} - already shown", inner, matched)?,
                Some(nested) => {
                    seen.insert(matched.clone());
                    self.write_trace(out, nested, indent + 4, seen)?;
                }
            }
        }
        Ok(())
    }
}

/// Proof tree of one triple, rendered through `Display`
pub struct DerivationTrace<'a> {
    store: &'a DerivationStore,
    triple: &'a Triple,
}

impl fmt::Display for DerivationTrace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen = HashSet::new();
        seen.insert(self.triple.clone());
        for derivation in self.store.get(self.triple) {
            self.store.write_trace(f, derivation, 0, &mut seen)?;
        }
        Ok(())
    }
}
