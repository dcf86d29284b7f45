//! Rule file loading

use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

use crate::error::RuleError;
use crate::parser::RuleParser;
use crate::rule::Rule;
use crate::rulesets;

/// Read and parse a rule file. Relative `@include`s resolve against the
/// file's directory.
pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<Vec<Rule>, RuleError> {
    let path = path.as_ref();
    let source_name = path.display().to_string();

    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RuleError::RulesetNotFound(source_name.clone()),
        _ => RuleError::Io { source_name: source_name.clone(), message: e.to_string() },
    })?;
    let text = String::from_utf8(bytes).map_err(|e| RuleError::BadEncoding {
        source_name: source_name.clone(),
        message: e.to_string(),
    })?;

    let mut parser = RuleParser::new();
    if let Some(dir) = path.parent() {
        parser = parser.with_base_dir(dir);
    }
    let rules = parser.parse(&text)?;
    info!("Loaded {} rules from {}", rules.len(), source_name);
    Ok(rules)
}

/// Parsed bundled ruleset, `RulesetNotFound` for an unknown name
pub fn bundled_ruleset(name: &str) -> Result<Vec<Rule>, RuleError> {
    let source = rulesets::bundled_source(name).ok_or_else(|| RuleError::RulesetNotFound(name.to_string()))?;
    RuleParser::new().parse(source)
}

/// Resolve an `@include` target: a bundled ruleset name or a file path
pub(crate) fn resolve_include(name: &str, base_dir: Option<&Path>) -> Result<Vec<Rule>, RuleError> {
    if rulesets::bundled_source(name).is_some() {
        return bundled_ruleset(name);
    }
    let path = Path::new(name);
    match base_dir {
        Some(dir) if path.is_relative() => load_rules(dir.join(path)),
        _ => load_rules(path),
    }
}
