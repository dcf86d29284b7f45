//! # Strix Reasoner
//!
//! Rule engines and inference sessions:
//! - agenda-driven forward chaining
//! - an incremental RETE network with delete-and-rederive truth maintenance
//! - tabled backward chaining over an explicit task stack
//! - hybrid mode, where forward rules can install backward rules
//!
//! `GenericRuleReasoner::bind` produces an [`InfGraph`], the queryable
//! closure of the rules over the bound data.

pub mod config;
pub mod derivation;
pub mod error;
pub mod forward;
pub mod lp;
mod matcher;
pub mod reasoner;
pub mod rete;
pub mod session;
mod state;
pub mod working;

pub use config::{ReasonerConfig, RuleMode};
pub use derivation::{DerivationStore, DerivationTrace, RuleDerivation};
pub use error::ReasonerError;
pub use reasoner::{GenericRuleReasoner, PartiallyBoundReasoner};
pub use session::{FindIter, InfGraph};
pub use state::{InstalledRules, Tabling};
pub use working::WorkingSet;
