//! # Strix Rules
//!
//! Rule model, binding environments and unification, the rule text parser
//! and loader, bundled rulesets and the builtin predicate registry.

pub mod binding;
pub mod builtins;
pub mod error;
pub mod loader;
pub mod parser;
pub mod rule;
pub mod rulesets;
pub mod unify;

pub use binding::*;
pub use builtins::{Builtin, BuiltinRegistry, RuleContext};
pub use error::*;
pub use loader::{bundled_ruleset, load_rules};
pub use parser::{parse_rule, parse_rules, RuleParser};
pub use rule::*;
pub use unify::*;
