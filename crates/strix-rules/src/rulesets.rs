//! Bundled rulesets

/// RDFS entailment as hybrid rules: schema closure runs forward, instance
/// rules are installed as backward rules per schema statement
pub const RDFS_HYBRID: &str = r#"
# Domain and range
[rdfs2: (?p rdfs:domain ?c) -> [(?x rdf:type ?c) <- (?x ?p ?y)]]
[rdfs3: (?p rdfs:range ?c) -> [(?y rdf:type ?c) <- (?x ?p ?y), notFunctor(?y)]]

# Properties
[rdfs5a: (?a rdfs:subPropertyOf ?b), (?b rdfs:subPropertyOf ?c) -> (?a rdfs:subPropertyOf ?c)]
[rdfs5b: (?a rdf:type rdf:Property) -> (?a rdfs:subPropertyOf ?a)]
[rdfs6: (?p rdfs:subPropertyOf ?q), notEqual(?p, ?q) -> [(?a ?q ?b) <- (?a ?p ?b)]]

# Classes
[rdfs7: (?a rdf:type rdfs:Class) -> (?a rdfs:subClassOf ?a)]
[rdfs8: (?a rdfs:subClassOf ?b), (?b rdfs:subClassOf ?c) -> (?a rdfs:subClassOf ?c)]
[rdfs9: (?x rdfs:subClassOf ?y), notEqual(?x, ?y) -> [(?a rdf:type ?y) <- (?a rdf:type ?x)]]
"#;

/// Bundled ruleset source by name, case-insensitive
pub fn bundled_source(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "rdfs" | "rdfs-hybrid" => Some(RDFS_HYBRID),
        _ => None,
    }
}
