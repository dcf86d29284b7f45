//! Inference sessions and the `InfGraph` handle

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::config::ReasonerConfig;
use crate::derivation::RuleDerivation;
use crate::error::ReasonerError;
use crate::forward::ForwardEngine;
use crate::lp::{goal_key, LpContext, LpQuery, TableCache};
use crate::matcher::run_head_actions;
use crate::reasoner::RuleSet;
use crate::rete::ReteEngine;
use crate::state::{InferenceState, Tabling};
use crate::working::WorkingSet;
use strix_core::{GraphStore, Node, Triple, TriplePattern};
use strix_rules::BindingStack;

#[derive(Debug, Clone)]
enum ForwardStage {
    Disabled,
    Naive(ForwardEngine),
    Rete(ReteEngine),
}

/// One bound rule set: working set, engine memories, tables and derivations
#[derive(Debug, Clone)]
pub(crate) struct Session {
    rules: Arc<RuleSet>,
    config: ReasonerConfig,
    state: InferenceState,
    forward: ForwardStage,
    cache: TableCache,
    /// Predicates tabled through `set_tabled`, kept across rebinds
    user_tabled: Vec<Node>,
    /// Bumped by every change; open iterators compare against it
    version: u64,
    prepared: bool,
    closed: bool,
}

impl Session {
    pub fn new(rules: Arc<RuleSet>, config: ReasonerConfig, schema: GraphStore, data: GraphStore) -> Self {
        let state = InferenceState::new(WorkingSet::new(schema, data), Arc::clone(&rules.registry), &config);
        let forward = if let Some(network) = &rules.rete {
            ForwardStage::Rete(ReteEngine::new(Arc::clone(network)))
        } else if let Some(forward) = &rules.forward {
            ForwardStage::Naive(ForwardEngine::new(Arc::clone(forward)))
        } else {
            ForwardStage::Disabled
        };
        Self {
            rules,
            config,
            state,
            forward,
            cache: TableCache::default(),
            user_tabled: Vec::new(),
            version: 0,
            prepared: false,
            closed: false,
        }
    }

    fn check_open(&self) -> Result<(), ReasonerError> {
        if self.closed {
            return Err(ReasonerError::Closed);
        }
        Ok(())
    }

    fn bump(&mut self) {
        self.version += 1;
        self.cache.clear();
    }

    /// Run directives and the forward closure if not done since the last rebind
    pub fn prepare(&mut self) -> Result<(), ReasonerError> {
        self.check_open()?;
        if self.prepared {
            return Ok(());
        }
        self.state.reset_derived();
        self.state.fired = 0;
        self.state.begin_evaluation();
        self.state.tabling = Tabling::new(self.config.table_all);
        for predicate in &self.user_tabled {
            self.state.tabling.set(predicate.clone());
        }
        for rule in &self.rules.directives {
            let mut env = BindingStack::new(rule.num_vars());
            run_head_actions(rule, &mut env, &mut self.state)?;
        }
        match &mut self.forward {
            ForwardStage::Naive(engine) => engine.init(&mut self.state)?,
            ForwardStage::Rete(engine) => engine.init(&mut self.state)?,
            ForwardStage::Disabled => {}
        }
        self.cache.clear();
        self.prepared = true;
        info!(
            "Prepared {:?} session: {} triples, {} deductions",
            self.rules.mode,
            self.state.working.size(),
            self.state.working.deductions().len()
        );
        Ok(())
    }

    pub fn add(&mut self, triple: Triple) -> Result<(), ReasonerError> {
        self.check_open()?;
        self.bump();
        if !self.prepared {
            self.state.working.add_raw(triple);
            return Ok(());
        }
        self.state.begin_evaluation();
        let result = match &mut self.forward {
            ForwardStage::Naive(engine) => engine.add(triple, &mut self.state),
            ForwardStage::Rete(engine) => engine.add(triple, &mut self.state),
            ForwardStage::Disabled => {
                self.state.working.add_raw(triple);
                Ok(())
            }
        };
        if result.is_err() {
            self.prepared = false;
        }
        result
    }

    pub fn delete(&mut self, triple: &Triple) -> Result<(), ReasonerError> {
        self.check_open()?;
        self.bump();
        if !self.prepared {
            self.state.working.remove_raw(triple);
            return Ok(());
        }
        self.state.begin_evaluation();
        let result = match &mut self.forward {
            ForwardStage::Naive(engine) => engine.delete(triple, &mut self.state),
            ForwardStage::Rete(engine) => engine.delete(triple, &mut self.state),
            ForwardStage::Disabled => Ok(self.state.working.remove_raw(triple)),
        };
        match result {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!("Delete of {} ignored, not in the raw data", triple);
                Ok(())
            }
            Err(e) => {
                self.prepared = false;
                Err(e)
            }
        }
    }

    pub fn rebind(&mut self, data: GraphStore) -> Result<(), ReasonerError> {
        self.check_open()?;
        self.bump();
        info!("Rebinding to {} data triples", data.len());
        self.state.working.rebind(data);
        self.state.derivations.clear();
        self.prepared = false;
        Ok(())
    }

    /// Load data into a clone of a prepared schema session. Monotonic rule
    /// sets extend the schema closure incrementally.
    pub fn load_data(&mut self, data: GraphStore) -> Result<(), ReasonerError> {
        if self.prepared && self.rules.monotonic {
            for triple in data.iter() {
                self.add(triple.clone())?;
            }
            return Ok(());
        }
        self.bump();
        for triple in data.iter() {
            self.state.working.add_raw(triple.clone());
        }
        self.prepared = false;
        Ok(())
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.bump();
        self.closed = true;
        self.state.working.clear();
        self.state.derivations.clear();
        self.forward = ForwardStage::Disabled;
        info!("Closed inference graph");
    }

    fn open_query(&mut self, pattern: &TriplePattern) -> Result<FindSource, ReasonerError> {
        self.prepare()?;
        if self.rules.mode.uses_backward() {
            return Ok(FindSource::Query(Box::new(LpQuery::new(pattern, self.version))));
        }
        let found = self.state.working.find(&goal_key(pattern));
        Ok(FindSource::Snapshot(found.into_iter()))
    }

    fn next_answer(&mut self, query: &mut LpQuery) -> Result<Option<Triple>, ReasonerError> {
        let mut ctx = LpContext {
            rules: &self.rules.backward,
            state: &mut self.state,
            cache: &mut self.cache,
            max_depth: self.config.max_goal_depth,
            version: self.version,
        };
        query.next_answer(&mut ctx)
    }

    pub fn set_derivation_logging(&mut self, enabled: bool) -> Result<(), ReasonerError> {
        self.check_open()?;
        if enabled == self.state.derivations.is_enabled() {
            return Ok(());
        }
        self.state.derivations.set_enabled(enabled);
        if enabled {
            // existing conclusions were reached without recording
            self.bump();
            self.prepared = false;
        }
        Ok(())
    }

    pub fn set_tabled(&mut self, predicate: Node) -> Result<(), ReasonerError> {
        self.check_open()?;
        if !self.user_tabled.contains(&predicate) {
            self.user_tabled.push(predicate.clone());
        }
        self.state.tabling.set(predicate);
        Ok(())
    }

    /// The session, provided it is still open
    fn open(&self) -> Result<&Self, ReasonerError> {
        self.check_open()?;
        Ok(self)
    }
}

/// Query iteration source
#[derive(Debug)]
enum FindSource {
    /// Forward modes: matches taken from the closure when the query opened
    Snapshot(std::vec::IntoIter<Triple>),
    /// Backward modes: answers computed on demand
    Query(Box<LpQuery>),
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Inference graph: the closure of a rule set over bound data, queried and
/// updated through a shared handle
#[derive(Debug, Clone)]
pub struct InfGraph {
    session: Arc<Mutex<Session>>,
}

impl InfGraph {
    pub(crate) fn new(session: Session) -> Self {
        Self { session: Arc::new(Mutex::new(session)) }
    }

    /// Triples of the closure matching the pattern. Variables act as ANY.
    pub fn find(&self, pattern: &TriplePattern) -> Result<FindIter, ReasonerError> {
        let mut session = lock(&self.session);
        let source = session.open_query(pattern)?;
        Ok(FindIter {
            session: Arc::clone(&self.session),
            version: session.version,
            filter_functors: session.config.filter_functors,
            source,
            done: false,
        })
    }

    pub fn find_all(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, ReasonerError> {
        self.find(pattern)?.collect()
    }

    pub fn contains(&self, triple: &Triple) -> Result<bool, ReasonerError> {
        Ok(self.find(&TriplePattern::from(triple))?.next().transpose()?.is_some())
    }

    /// Number of triples in the closure
    pub fn size(&self) -> Result<usize, ReasonerError> {
        let mut count = 0;
        for triple in self.find(&TriplePattern::any())? {
            triple?;
            count += 1;
        }
        Ok(count)
    }

    /// Add raw data; the closure is extended incrementally
    pub fn add(&self, triple: Triple) -> Result<(), ReasonerError> {
        lock(&self.session).add(triple)
    }

    /// Delete raw data; deductions that lose all support are retracted
    pub fn delete(&self, triple: &Triple) -> Result<(), ReasonerError> {
        lock(&self.session).delete(triple)
    }

    /// Replace the raw data, discarding every deduction, table and derivation
    pub fn rebind(&self, data: GraphStore) -> Result<(), ReasonerError> {
        lock(&self.session).rebind(data)
    }

    /// Compute the forward closure now instead of on the first query
    pub fn prepare(&self) -> Result<(), ReasonerError> {
        lock(&self.session).prepare()
    }

    /// Release the session. Later operations fail with `Closed`.
    pub fn close(&self) {
        lock(&self.session).close();
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.session).closed
    }

    /// Consistency check hook; rule sets here carry no validity rules
    pub fn validate(&self) -> Result<(), ReasonerError> {
        lock(&self.session).prepare()
    }

    pub fn set_derivation_logging(&self, enabled: bool) -> Result<(), ReasonerError> {
        lock(&self.session).set_derivation_logging(enabled)
    }

    pub fn get_derivation(&self, triple: &Triple) -> Result<Vec<RuleDerivation>, ReasonerError> {
        Ok(lock(&self.session).open()?.state.derivations.get(triple).to_vec())
    }

    /// Indented proof tree of every recorded derivation of the triple
    pub fn format_derivation(&self, triple: &Triple) -> Result<String, ReasonerError> {
        Ok(lock(&self.session).open()?.state.derivations.format_trace(triple))
    }

    pub fn print_derivation(&self, triple: &Triple) -> Result<(), ReasonerError> {
        print!("{}", self.format_derivation(triple)?);
        Ok(())
    }

    /// Every recorded derivation as JSON
    pub fn export_derivations(&self) -> Result<String, ReasonerError> {
        let session = lock(&self.session);
        serde_json::to_string_pretty(&session.open()?.state.derivations.all())
            .map_err(|e| ReasonerError::Serialization(e.to_string()))
    }

    /// Table a predicate for backward queries
    pub fn set_tabled(&self, predicate: Node) -> Result<(), ReasonerError> {
        lock(&self.session).set_tabled(predicate)
    }

    /// Drop the completed answer tables
    pub fn reset_tables(&self) -> Result<(), ReasonerError> {
        let mut session = lock(&self.session);
        session.check_open()?;
        session.cache.clear();
        Ok(())
    }

    pub fn rules_fired(&self) -> Result<u64, ReasonerError> {
        Ok(lock(&self.session).open()?.state.fired)
    }

    /// Forward deductions currently held
    pub fn deductions(&self) -> Result<GraphStore, ReasonerError> {
        let mut session = lock(&self.session);
        session.prepare()?;
        Ok(session.state.working.deductions().clone())
    }

    /// Raw data as currently bound
    pub fn raw_data(&self) -> Result<GraphStore, ReasonerError> {
        Ok(lock(&self.session).open()?.state.working.raw().clone())
    }

    pub fn config(&self) -> Result<ReasonerConfig, ReasonerError> {
        Ok(lock(&self.session).open()?.config.clone())
    }
}

/// Query results. Fails with `ConcurrentModification` once the graph changes
/// and with `Closed` once it is closed; either ends the iteration.
#[derive(Debug)]
pub struct FindIter {
    session: Arc<Mutex<Session>>,
    version: u64,
    filter_functors: bool,
    source: FindSource,
    done: bool,
}

impl Iterator for FindIter {
    type Item = Result<Triple, ReasonerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut session = lock(&self.session);
        if session.closed {
            self.done = true;
            return Some(Err(ReasonerError::Closed));
        }
        if session.version != self.version {
            self.done = true;
            return Some(Err(ReasonerError::ConcurrentModification));
        }
        loop {
            let next = match &mut self.source {
                FindSource::Snapshot(triples) => Ok(triples.next()),
                FindSource::Query(query) => session.next_answer(query),
            };
            match next {
                Ok(Some(triple)) if self.filter_functors && triple.has_functor_object() => continue,
                Ok(Some(triple)) => return Some(Ok(triple)),
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
