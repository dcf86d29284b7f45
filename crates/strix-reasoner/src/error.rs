//! Reasoner errors

use strix_rules::{BuiltinError, RuleError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReasonerError {
    #[error("rule configuration error: {0}")]
    Config(#[from] RuleError),

    #[error("invalid reasoner configuration: {0}")]
    InvalidConfig(String),

    #[error("resource limit exceeded: {0}")]
    ResourceExhausted(String),

    #[error("inference graph modified while a query was open")]
    ConcurrentModification,

    #[error("inference graph has been closed")]
    Closed,

    #[error("builtin failure: {0}")]
    Builtin(#[from] BuiltinError),

    #[error("serialization error: {0}")]
    Serialization(String),
}
