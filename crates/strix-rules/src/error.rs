//! Rule loading and builtin errors

use thiserror::Error;

/// Errors raised while parsing, loading or validating rules
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule parse error at line {line}, column {column}: {message}\nAt '{context}'")]
    Parse {
        message: String,
        line: usize,
        column: usize,
        context: String,
    },

    #[error("ruleset not found: {0}")]
    RulesetNotFound(String),

    #[error("bad encoding in ruleset {source_name}: {message}")]
    BadEncoding { source_name: String, message: String },

    #[error("I/O error reading ruleset {source_name}: {message}")]
    Io { source_name: String, message: String },

    #[error("illegal rule {rule}: {message}")]
    IllegalRule { rule: String, message: String },

    #[error("rule references unknown builtin: {0}")]
    UnknownBuiltin(String),
}

impl RuleError {
    pub fn illegal(rule: impl Into<String>, message: impl Into<String>) -> Self {
        RuleError::IllegalRule { rule: rule.into(), message: message.into() }
    }
}

/// Fatal builtin failure, distinct from an ordinary `false` result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuiltinError {
    #[error("builtin {name} failed: {message}")]
    Fatal { name: String, message: String },
}

impl BuiltinError {
    pub fn fatal(name: impl Into<String>, message: impl Into<String>) -> Self {
        BuiltinError::Fatal { name: name.into(), message: message.into() }
    }
}
