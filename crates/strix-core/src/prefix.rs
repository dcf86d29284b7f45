//! Namespace prefix mapping for qname expansion and compact printing

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::vocabulary::{owl, rb, rdf, rdfs, xsd, EG_NS};

/// URI schemes accepted as-is when a token looks like an unregistered qname
const URI_SCHEMES: &[&str] = &["http", "https", "urn", "file", "ftp", "mailto"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMapping {
    prefixes: BTreeMap<String, String>,
}

impl PrefixMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping with the rdf, rdfs, owl, xsd, rb and eg prefixes registered
    pub fn standard() -> Self {
        let mut mapping = Self::new();
        mapping.set_prefix("rdf", rdf::NS);
        mapping.set_prefix("rdfs", rdfs::NS);
        mapping.set_prefix("owl", owl::NS);
        mapping.set_prefix("xsd", xsd::NS);
        mapping.set_prefix("rb", rb::NS);
        mapping.set_prefix("eg", EG_NS);
        mapping
    }

    pub fn set_prefix(&mut self, prefix: &str, namespace: &str) {
        self.prefixes.insert(prefix.to_string(), namespace.to_string());
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    pub fn extend(&mut self, other: &PrefixMapping) {
        for (prefix, ns) in &other.prefixes {
            self.prefixes.insert(prefix.clone(), ns.clone());
        }
    }

    /// Expand `prefix:local`. Returns `None` for an unknown prefix.
    pub fn expand(&self, qname: &str) -> Option<String> {
        let (prefix, local) = qname.split_once(':')?;
        self.prefixes.get(prefix).map(|ns| format!("{}{}", ns, local))
    }

    /// Whether an unexpandable `scheme:rest` token should be taken as a full URI
    pub fn is_uri_scheme(prefix: &str) -> bool {
        URI_SCHEMES.contains(&prefix)
    }

    /// Compact a URI to a qname using the longest matching namespace
    pub fn shorten(&self, uri: &str) -> String {
        self.prefixes
            .iter()
            .filter(|(_, ns)| !ns.is_empty() && uri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .map(|(prefix, ns)| format!("{}:{}", prefix, &uri[ns.len()..]))
            .unwrap_or_else(|| uri.to_string())
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}
