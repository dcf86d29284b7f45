//! Rule reasoner: compiles a rule set for a mode and binds it to data

use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

use crate::config::{ReasonerConfig, RuleMode};
use crate::error::ReasonerError;
use crate::forward::ForwardRules;
use crate::lp::LpRuleIndex;
use crate::rete::ReteNetwork;
use crate::session::{InfGraph, Session};
use strix_core::GraphStore;
use strix_rules::{parse_rules, BuiltinRegistry, ClauseEntry, Rule, RuleError};

/// Rules split between the engines of one mode
#[derive(Debug)]
pub(crate) struct RuleSet {
    pub mode: RuleMode,
    pub forward: Option<Arc<ForwardRules>>,
    pub rete: Option<Arc<ReteNetwork>>,
    pub backward: LpRuleIndex,
    /// Backward-mode axioms whose heads are only builtin actions
    pub directives: Vec<Arc<Rule>>,
    pub registry: Arc<BuiltinRegistry>,
    pub monotonic: bool,
}

impl RuleSet {
    pub fn compile(rules: &[Rule], mode: RuleMode, registry: Arc<BuiltinRegistry>) -> Result<Self, ReasonerError> {
        let mut forward = Vec::new();
        let mut backward = Vec::new();
        let mut directives = Vec::new();

        for rule in rules {
            registry.validate_rule(rule)?;
            if rule.nested_rules().next().is_some() && mode != RuleMode::Hybrid {
                return Err(RuleError::illegal(rule.to_string(), "nested backward rules need hybrid mode").into());
            }
            if rule.is_backward() && rule.head().len() != 1 {
                return Err(RuleError::illegal(rule.to_string(), "backward rules must have exactly one head").into());
            }
            match mode {
                RuleMode::Forward | RuleMode::ForwardRete => {
                    let rule = if rule.is_backward() {
                        Rule::new(rule.name().map(str::to_string), rule.body().to_vec(), rule.head().to_vec())
                    } else {
                        rule.clone()
                    };
                    forward.push(Arc::new(rule));
                }
                RuleMode::Hybrid => {
                    if rule.is_backward() {
                        backward.push(Arc::new(rule.clone()));
                    } else {
                        forward.push(Arc::new(rule.clone()));
                    }
                }
                RuleMode::Backward => {
                    if rule.is_backward() {
                        backward.push(Arc::new(rule.clone()));
                        continue;
                    }
                    if rule.is_axiom() && rule.head_patterns().next().is_none() {
                        directives.push(Arc::new(rule.clone()));
                        continue;
                    }
                    if rule.head().iter().any(|c| matches!(c, ClauseEntry::Call(_))) {
                        warn!("Ignoring head actions of {} in backward mode", rule.short_name());
                    }
                    backward.extend(rule.split_heads().into_iter().map(Arc::new));
                }
            }
        }

        let monotonic = rules.iter().all(|r| registry.is_monotonic_rule(r));
        let (forward_rules, rete) = match mode {
            RuleMode::Forward => (Some(Arc::new(ForwardRules::new(forward))), None),
            RuleMode::ForwardRete | RuleMode::Hybrid => {
                (None, Some(Arc::new(ReteNetwork::compile(forward, &registry))))
            }
            RuleMode::Backward => (None, None),
        };
        info!(
            "Compiled {} rules for {:?} mode ({} backward)",
            rules.len(),
            mode,
            backward.len()
        );
        Ok(Self {
            mode,
            forward: forward_rules,
            rete,
            backward: LpRuleIndex::new(backward),
            directives,
            registry,
            monotonic,
        })
    }
}

/// Reasoner over a fixed rule list. Compilation happens once, on first bind,
/// and is shared by every inference graph it creates.
#[derive(Debug, Clone)]
pub struct GenericRuleReasoner {
    rules: Vec<Rule>,
    config: ReasonerConfig,
    registry: Arc<BuiltinRegistry>,
    compiled: Arc<Mutex<Option<Arc<RuleSet>>>>,
}

impl GenericRuleReasoner {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            config: ReasonerConfig::default(),
            registry: Arc::new(BuiltinRegistry::standard()),
            compiled: Arc::new(Mutex::new(None)),
        }
    }

    /// Parse rule text with the default prefixes
    pub fn from_source(source: &str) -> Result<Self, ReasonerError> {
        Ok(Self::new(parse_rules(source)?))
    }

    pub fn with_config(mut self, config: ReasonerConfig) -> Self {
        self.config = config;
        self.compiled = Arc::new(Mutex::new(None));
        self
    }

    pub fn with_mode(mut self, mode: RuleMode) -> Self {
        self.config.mode = mode;
        self.compiled = Arc::new(Mutex::new(None));
        self
    }

    /// Use a custom builtin registry, e.g. the standard set plus extensions
    pub fn with_registry(mut self, registry: BuiltinRegistry) -> Self {
        self.registry = Arc::new(registry);
        self.compiled = Arc::new(Mutex::new(None));
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    pub fn registry(&self) -> &BuiltinRegistry {
        &self.registry
    }

    fn compile(&self) -> Result<Arc<RuleSet>, ReasonerError> {
        self.config.validate()?;
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(rules) = compiled.as_ref() {
            return Ok(Arc::clone(rules));
        }
        let rules = Arc::new(RuleSet::compile(&self.rules, self.config.mode, Arc::clone(&self.registry))?);
        *compiled = Some(Arc::clone(&rules));
        Ok(rules)
    }

    /// Bind to data. Inference runs lazily on the first query.
    pub fn bind(&self, data: GraphStore) -> Result<InfGraph, ReasonerError> {
        let rules = self.compile()?;
        info!("Binding {} data triples", data.len());
        Ok(InfGraph::new(Session::new(rules, self.config.clone(), GraphStore::new(), data)))
    }

    /// Bind to data with a separate schema graph
    pub fn bind_with_schema(&self, schema: GraphStore, data: GraphStore) -> Result<InfGraph, ReasonerError> {
        let rules = self.compile()?;
        info!("Binding {} schema and {} data triples", schema.len(), data.len());
        Ok(InfGraph::new(Session::new(rules, self.config.clone(), schema, data)))
    }

    /// Compute the schema closure once; each later data bind starts from a
    /// copy of it
    pub fn bind_schema(&self, schema: GraphStore) -> Result<PartiallyBoundReasoner, ReasonerError> {
        let rules = self.compile()?;
        info!("Preparing schema of {} triples", schema.len());
        let mut session = Session::new(rules, self.config.clone(), schema, GraphStore::new());
        session.prepare()?;
        Ok(PartiallyBoundReasoner { template: session })
    }
}

/// Reasoner with a prepared schema closure
#[derive(Debug, Clone)]
pub struct PartiallyBoundReasoner {
    template: Session,
}

impl PartiallyBoundReasoner {
    pub fn bind(&self, data: GraphStore) -> Result<InfGraph, ReasonerError> {
        let mut session = self.template.clone();
        session.load_data(data)?;
        Ok(InfGraph::new(session))
    }
}
