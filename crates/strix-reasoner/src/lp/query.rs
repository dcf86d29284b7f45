//! Lazily evaluated backward query

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

use super::table::Table;
use super::{goal_key, LpContext};
use crate::derivation::RuleDerivation;
use crate::error::ReasonerError;
use crate::matcher::call_builtin;
use strix_core::{Triple, TriplePattern};
use strix_rules::{match_node, unify, BindingEnvironment, BindingStack, BindingVector, ClauseEntry, Rule};

/// Where an answer is delivered
#[derive(Debug, Clone)]
pub(crate) enum Cont {
    /// Top-level query results
    Sink,
    /// Answer table of a tabled goal
    Table(usize),
    /// Suspended rule body waiting for the answers of one clause
    Frame(Arc<Frame>),
}

#[derive(Debug)]
pub(crate) struct Frame {
    rule: Arc<Rule>,
    env: BindingVector,
    clause: usize,
    matched: Vec<Triple>,
    depth: usize,
    parent: Cont,
}

#[derive(Debug)]
enum Task {
    Call {
        goal: TriplePattern,
        cont: Cont,
        depth: usize,
    },
    Body {
        rule: Arc<Rule>,
        env: BindingVector,
        clause: usize,
        matched: Vec<Triple>,
        parent: Cont,
        depth: usize,
    },
    Answer {
        cont: Cont,
        triple: Triple,
    },
}

/// One backward query. Answers are produced on demand; dropping the query
/// abandons the remaining work.
#[derive(Debug)]
pub struct LpQuery {
    goal: TriplePattern,
    stack: Vec<Task>,
    tables: Vec<Table>,
    table_ids: HashMap<TriplePattern, usize>,
    results: VecDeque<Triple>,
    seen: HashSet<Triple>,
    version: u64,
    done: bool,
}

impl LpQuery {
    pub fn new(goal: &TriplePattern, version: u64) -> Self {
        let goal = goal_key(goal);
        Self {
            stack: vec![Task::Call { goal: goal.clone(), cont: Cont::Sink, depth: 0 }],
            goal,
            tables: Vec::new(),
            table_ids: HashMap::new(),
            results: VecDeque::new(),
            seen: HashSet::new(),
            version,
            done: false,
        }
    }

    pub fn goal(&self) -> &TriplePattern {
        &self.goal
    }

    /// Version of the session data the query was opened on
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn next_answer(&mut self, ctx: &mut LpContext<'_>) -> Result<Option<Triple>, ReasonerError> {
        loop {
            if let Some(answer) = self.results.pop_front() {
                return Ok(Some(answer));
            }
            if self.done {
                return Ok(None);
            }
            match self.stack.pop() {
                Some(task) => {
                    if let Err(e) = self.step(task, ctx) {
                        self.abandon();
                        return Err(e);
                    }
                }
                None => self.complete(ctx),
            }
        }
    }

    fn abandon(&mut self) {
        self.stack.clear();
        self.tables.clear();
        self.results.clear();
        self.done = true;
    }

    /// Nothing left to run: every table is complete
    fn complete(&mut self, ctx: &mut LpContext<'_>) {
        self.done = true;
        if ctx.version != self.version {
            return;
        }
        for table in self.tables.drain(..) {
            ctx.cache.publish(table.goal, table.answers);
        }
        debug!("Query {} complete, {} answers", self.goal, self.seen.len());
    }

    fn step(&mut self, task: Task, ctx: &mut LpContext<'_>) -> Result<(), ReasonerError> {
        match task {
            Task::Call { goal, cont, depth } => self.call(goal, cont, depth, ctx),
            Task::Body { rule, env, clause, matched, parent, depth } => {
                self.body(rule, env, clause, matched, parent, depth, ctx)
            }
            Task::Answer { cont, triple } => {
                self.answer(cont, triple);
                Ok(())
            }
        }
    }

    fn call(&mut self, goal: TriplePattern, cont: Cont, depth: usize, ctx: &mut LpContext<'_>) -> Result<(), ReasonerError> {
        if !ctx.state.tabling.is_tabled(&goal.predicate) {
            if depth > ctx.max_depth {
                return Err(ReasonerError::ResourceExhausted(format!(
                    "goal {} exceeded the depth limit of {}",
                    goal, ctx.max_depth
                )));
            }
            self.expand(&goal, cont, depth, ctx);
            return Ok(());
        }
        if let Some(answers) = ctx.cache.lookup(&goal) {
            trace!("Cached table for {}", goal);
            self.push_answers(&cont, answers);
            return Ok(());
        }
        if let Some(&id) = self.table_ids.get(&goal) {
            let table = &mut self.tables[id];
            table.consumers.push(cont.clone());
            let answers = table.answers.clone();
            self.push_answers(&cont, answers);
            return Ok(());
        }
        let id = self.tables.len();
        trace!("New table {} for {}", id, goal);
        self.tables.push(Table::new(goal.clone(), cont));
        self.table_ids.insert(goal.clone(), id);
        self.expand(&goal, Cont::Table(id), depth, ctx);
        Ok(())
    }

    /// Schedule the rules and facts for a goal. Facts are pushed last so
    /// they are delivered first.
    fn expand(&mut self, goal: &TriplePattern, cont: Cont, depth: usize, ctx: &mut LpContext<'_>) {
        let mut rules = ctx.rules.candidates(&goal.predicate);
        rules.extend(ctx.state.installed.matching(&goal.predicate));
        for rule in rules.into_iter().rev() {
            let Some(head) = rule.head_patterns().next() else { continue };
            if let Some(env) = unify(goal, head, rule.num_vars()) {
                self.stack.push(Task::Body {
                    rule,
                    env,
                    clause: 0,
                    matched: Vec::new(),
                    parent: cont.clone(),
                    depth: depth + 1,
                });
            }
        }
        let facts = ctx.state.working.find(goal);
        self.push_answers(&cont, facts);
    }

    fn push_answers(&mut self, cont: &Cont, answers: Vec<Triple>) {
        for triple in answers.into_iter().rev() {
            self.stack.push(Task::Answer { cont: cont.clone(), triple });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn body(
        &mut self,
        rule: Arc<Rule>,
        env: BindingVector,
        clause: usize,
        matched: Vec<Triple>,
        parent: Cont,
        depth: usize,
        ctx: &mut LpContext<'_>,
    ) -> Result<(), ReasonerError> {
        if clause >= rule.body().len() {
            self.conclude(rule, env, matched, parent, ctx);
            return Ok(());
        }
        match &rule.body()[clause] {
            ClauseEntry::Pattern(pattern) => {
                let goal = env.goal(pattern);
                let frame = Frame { rule: Arc::clone(&rule), env, clause, matched, depth, parent };
                self.stack.push(Task::Call { goal, cont: Cont::Frame(Arc::new(frame)), depth });
            }
            ClauseEntry::Call(call) => {
                let mut stack = BindingStack::from_vector(env);
                if call_builtin(call, &rule, &mut stack, ctx.state)? {
                    self.stack.push(Task::Body {
                        rule: Arc::clone(&rule),
                        env: stack.into_vector(),
                        clause: clause + 1,
                        matched,
                        parent,
                        depth,
                    });
                }
            }
            ClauseEntry::Rule(_) => {
                self.stack.push(Task::Body { rule: Arc::clone(&rule), env, clause: clause + 1, matched, parent, depth });
            }
        }
        Ok(())
    }

    fn conclude(&mut self, rule: Arc<Rule>, env: BindingVector, matched: Vec<Triple>, parent: Cont, ctx: &mut LpContext<'_>) {
        let Some(head) = rule.head_patterns().next() else { return };
        let Some(triple) = env.instantiate(head) else {
            debug!("Dropping non-ground answer of rule {}", rule.short_name());
            return;
        };
        if ctx.state.derivations.is_enabled() && !ctx.state.working.is_asserted(&triple) {
            ctx.state.derivations.record(RuleDerivation::new(rule, triple.clone(), matched));
        }
        self.stack.push(Task::Answer { cont: parent, triple });
    }

    fn answer(&mut self, cont: Cont, triple: Triple) {
        match cont {
            Cont::Sink => {
                if self.goal.matches(&triple) && self.seen.insert(triple.clone()) {
                    self.results.push_back(triple);
                }
            }
            Cont::Table(id) => {
                let table = &mut self.tables[id];
                if table.add(triple.clone()) {
                    let consumers = table.consumers.clone();
                    for consumer in consumers.into_iter().rev() {
                        self.stack.push(Task::Answer { cont: consumer, triple: triple.clone() });
                    }
                }
            }
            Cont::Frame(frame) => {
                let Some(pattern) = frame.rule.body()[frame.clause].as_pattern() else { return };
                let mut env = frame.env.clone();
                let matches = match_node(&pattern.subject, &triple.subject, &mut env)
                    && match_node(&pattern.predicate, &triple.predicate, &mut env)
                    && match_node(&pattern.object, &triple.object, &mut env);
                if !matches {
                    return;
                }
                let mut matched = frame.matched.clone();
                matched.push(triple);
                self.stack.push(Task::Body {
                    rule: Arc::clone(&frame.rule),
                    env,
                    clause: frame.clause + 1,
                    matched,
                    parent: frame.parent.clone(),
                    depth: frame.depth,
                });
            }
        }
    }
}
