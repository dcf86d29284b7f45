//! Reasoner configuration

use serde::{Deserialize, Serialize};

use crate::error::ReasonerError;

/// Which engines evaluate the rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    /// Semi-naive forward chaining
    Forward,
    /// Forward chaining through an incremental RETE network
    ForwardRete,
    /// Goal-directed tabled resolution only
    Backward,
    /// RETE for forward rules, tabled resolution for backward rules
    #[default]
    Hybrid,
}

impl RuleMode {
    pub fn uses_forward(self) -> bool {
        !matches!(self, RuleMode::Backward)
    }

    pub fn uses_backward(self) -> bool {
        matches!(self, RuleMode::Backward | RuleMode::Hybrid)
    }

    pub fn uses_rete(self) -> bool {
        matches!(self, RuleMode::ForwardRete | RuleMode::Hybrid)
    }
}

/// Inference session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    pub mode: RuleMode,
    /// Record a derivation for every conclusion
    pub derivation_logging: bool,
    /// Log every rule firing at info level
    pub trace: bool,
    /// Firing budget for each closure, add or delete, `None` for unlimited
    pub max_rule_firings: Option<u64>,
    /// Nesting limit for untabled backward goals
    pub max_goal_depth: usize,
    /// Hide triples whose object is a functor from query results
    pub filter_functors: bool,
    /// Table every backward goal
    pub table_all: bool,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            mode: RuleMode::default(),
            derivation_logging: false,
            trace: false,
            max_rule_firings: Some(1_000_000),
            max_goal_depth: 512,
            filter_functors: true,
            table_all: false,
        }
    }
}

impl ReasonerConfig {
    pub fn with_mode(mode: RuleMode) -> Self {
        Self { mode, ..Self::default() }
    }

    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ReasonerError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ReasonerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReasonerError> {
        if self.max_goal_depth == 0 {
            return Err(ReasonerError::InvalidConfig("max_goal_depth must be positive".to_string()));
        }
        if self.max_rule_firings == Some(0) {
            return Err(ReasonerError::InvalidConfig("max_rule_firings must be positive".to_string()));
        }
        Ok(())
    }
}
