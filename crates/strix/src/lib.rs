//! # Strix - rule-based inference over RDF graphs
//!
//! Strix binds a set of rules to a graph and answers queries over the
//! resulting closure. Rules run forward (agenda or RETE), backward (tabled
//! goal-directed search) or in hybrid mode, where forward rules can install
//! new backward rules as the data arrives.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strix::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let reasoner = GenericRuleReasoner::from_source(
//!         "[t: (?a eg:ancestor ?b) (?b eg:ancestor ?c) -> (?a eg:ancestor ?c)]",
//!     )?;
//!     // `eg:` names in rules expand into EG_NS
//!     let eg = |local: &str| format!("{}{}", EG_NS, local);
//!     let data = GraphStore::from_triples(vec![
//!         Triple::uris(&eg("ann"), &eg("ancestor"), &eg("bob")),
//!         Triple::uris(&eg("bob"), &eg("ancestor"), &eg("cid")),
//!     ]);
//!     let graph = reasoner.bind(data)?;
//!     for triple in graph.find(&TriplePattern::any())? {
//!         println!("{}", triple?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`strix-core`**: term model, vocabulary and the indexed triple store
//! - **`strix-rules`**: rule model, parser, unification and builtins
//! - **`strix-reasoner`**: the engines and the `InfGraph` session
//!
//! ## Feature Flags
//!
//! - `full` (default): everything
//! - `core`: only the term model and store
//! - `rules`: adds rule parsing and builtins
//! - `reasoner`: adds the engines

#[cfg(feature = "strix-core")]
pub use strix_core as core;

#[cfg(feature = "strix-rules")]
pub use strix_rules as rules;

#[cfg(feature = "strix-reasoner")]
pub use strix_reasoner as reasoner;

#[cfg(feature = "strix-core")]
pub use strix_core::{vocabulary, GraphStore, Node, Triple, TriplePattern};

#[cfg(feature = "strix-rules")]
pub use strix_rules::{bundled_ruleset, load_rules, parse_rules, BuiltinRegistry, Rule, RuleError};

#[cfg(feature = "strix-reasoner")]
pub use strix_reasoner::{
    GenericRuleReasoner, InfGraph, PartiallyBoundReasoner, ReasonerConfig, ReasonerError, RuleMode,
};

// Commonly used external dependencies
pub use anyhow;
pub use serde;
pub use serde_json;

/// Prelude module for convenient imports
///
/// ```rust
/// use strix::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "strix-core")]
    pub use strix_core::vocabulary::EG_NS;
    #[cfg(feature = "strix-core")]
    pub use strix_core::{Graph, GraphStore, Literal, Node, Triple, TriplePattern};

    #[cfg(feature = "strix-rules")]
    pub use strix_rules::{Builtin, BuiltinRegistry, Rule, RuleContext, RuleError};

    #[cfg(feature = "strix-reasoner")]
    pub use strix_reasoner::{
        FindIter, GenericRuleReasoner, InfGraph, PartiallyBoundReasoner, ReasonerConfig, ReasonerError,
        RuleDerivation, RuleMode,
    };

    pub use anyhow::Result;
}

/// Current version of Strix
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build a reasoner from a bundled ruleset name or a rule file path
#[cfg(feature = "strix-reasoner")]
pub fn reasoner_for(ruleset: &str, mode: RuleMode) -> Result<GenericRuleReasoner, ReasonerError> {
    let rules = match bundled_ruleset(ruleset) {
        Ok(rules) => rules,
        Err(RuleError::RulesetNotFound(_)) => load_rules(ruleset)?,
        Err(e) => return Err(e.into()),
    };
    Ok(GenericRuleReasoner::new(rules).with_mode(mode))
}
