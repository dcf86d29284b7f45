//! Engine-level tests across modes: closure agreement, incremental
//! maintenance, tabling, hybrid rule installation and derivations

use std::collections::BTreeSet;

use proptest::prelude::*;
use strix_core::vocabulary::{rdf, rdfs};
use strix_core::{GraphStore, Node, Triple, TriplePattern};
use strix_reasoner::{GenericRuleReasoner, InfGraph, ReasonerConfig, ReasonerError, RuleMode};
use strix_rules::{bundled_ruleset, parse_rules};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn uri(s: &str) -> Node {
    Node::uri(s)
}

fn closure(graph: &InfGraph) -> BTreeSet<Triple> {
    graph.find_all(&TriplePattern::any()).unwrap().into_iter().collect()
}

fn bind(source: &str, config: ReasonerConfig, data: Vec<Triple>) -> InfGraph {
    GenericRuleReasoner::new(parse_rules(source).unwrap())
        .with_config(config)
        .bind(GraphStore::from_triples(data))
        .unwrap()
}

const CLASS_RULES: &str = r#"
[-> table(rdfs:subClassOf)]
[rdfs7: (?a rdfs:subClassOf ?a) <- (?a rdf:type rdfs:Class)]
[rdfs8: (?a rdfs:subClassOf ?c) <- (?a rdfs:subClassOf ?b), (?b rdfs:subClassOf ?c)]
"#;

fn sub_class(a: &str, b: &str) -> Triple {
    Triple::new(uri(a), uri(rdfs::SUBCLASS_OF), uri(b))
}

fn class(a: &str) -> Triple {
    Triple::new(uri(a), uri(rdf::TYPE), uri(rdfs::CLASS))
}

#[test]
fn test_tabled_subclass_closure() {
    init_tracing();
    let data = vec![
        sub_class("eg:C1", "eg:C2"),
        sub_class("eg:C2", "eg:C3"),
        class("eg:C1"),
        class("eg:C2"),
        class("eg:C3"),
    ];
    let graph = bind(CLASS_RULES, ReasonerConfig::with_mode(RuleMode::Backward), data);
    let pattern = TriplePattern::new(Node::Any, uri(rdfs::SUBCLASS_OF), Node::Any);
    let found: BTreeSet<_> = graph.find_all(&pattern).unwrap().into_iter().collect();
    let expected: BTreeSet<_> = [
        sub_class("eg:C1", "eg:C2"),
        sub_class("eg:C1", "eg:C3"),
        sub_class("eg:C1", "eg:C1"),
        sub_class("eg:C2", "eg:C3"),
        sub_class("eg:C2", "eg:C2"),
        sub_class("eg:C3", "eg:C3"),
    ]
    .into_iter()
    .collect();
    assert_eq!(found, expected);

    // second query is served from the completed table
    let again: BTreeSet<_> = graph.find_all(&pattern).unwrap().into_iter().collect();
    assert_eq!(again, expected);
}

#[test]
fn test_cyclic_subclass_terminates() {
    init_tracing();
    let data = vec![sub_class("eg:A", "eg:B"), sub_class("eg:B", "eg:A"), class("eg:A")];
    let graph = bind(CLASS_RULES, ReasonerConfig::with_mode(RuleMode::Backward), data);

    let from_b = TriplePattern::new(uri("eg:B"), uri(rdfs::SUBCLASS_OF), Node::Any);
    let found: BTreeSet<_> = graph.find_all(&from_b).unwrap().into_iter().collect();
    let expected: BTreeSet<_> = [sub_class("eg:B", "eg:A"), sub_class("eg:B", "eg:B")].into_iter().collect();
    assert_eq!(found, expected);

    let all = TriplePattern::new(Node::Any, uri(rdfs::SUBCLASS_OF), Node::Any);
    assert_eq!(graph.find_all(&all).unwrap().len(), 4);
}

#[test]
fn test_rdfs_hybrid_instance_types() {
    init_tracing();
    let schema = GraphStore::from_triples(vec![
        sub_class("eg:Dog", "eg:Mammal"),
        sub_class("eg:Mammal", "eg:Animal"),
        Triple::new(uri("eg:hasOwner"), uri(rdfs::DOMAIN), uri("eg:Person")),
    ]);
    let data = GraphStore::from_triples(vec![
        Triple::new(uri("eg:rex"), uri(rdf::TYPE), uri("eg:Dog")),
        Triple::new(uri("eg:rex"), uri("eg:hasOwner"), uri("eg:alice")),
    ]);
    let reasoner = GenericRuleReasoner::new(bundled_ruleset("rdfs").unwrap());
    let graph = reasoner.bind_with_schema(schema, data).unwrap();

    // schema closure is forward
    assert!(graph.deductions().unwrap().contains_triple(&sub_class("eg:Dog", "eg:Animal")));

    let types: BTreeSet<_> = graph
        .find_all(&TriplePattern::new(uri("eg:rex"), uri(rdf::TYPE), Node::Any))
        .unwrap()
        .into_iter()
        .map(|t| t.object)
        .collect();
    let expected: BTreeSet<_> =
        ["eg:Dog", "eg:Mammal", "eg:Animal", "eg:Person"].into_iter().map(uri).collect();
    assert_eq!(types, expected);
}

#[test]
fn test_hybrid_installed_rule_and_derivation() {
    init_tracing();
    let source = "[r1: (?p <eg:kind> <eg:Symmetric>) -> [r1b: (?x ?p ?y) <- (?y ?p ?x)]]";
    let config = ReasonerConfig { derivation_logging: true, ..ReasonerConfig::with_mode(RuleMode::Hybrid) };
    let graph = bind(
        source,
        config,
        vec![Triple::uris("eg:p", "eg:kind", "eg:Symmetric"), Triple::uris("eg:a", "eg:p", "eg:b")],
    );

    let found = graph.find_all(&TriplePattern::new(uri("eg:b"), uri("eg:p"), Node::Any)).unwrap();
    assert_eq!(found, vec![Triple::uris("eg:b", "eg:p", "eg:a")]);

    let derivations = graph.get_derivation(&Triple::uris("eg:b", "eg:p", "eg:a")).unwrap();
    assert_eq!(derivations.len(), 1);
    assert_eq!(derivations[0].rule.name(), Some("r1b"));
    assert_eq!(derivations[0].matches, vec![Triple::uris("eg:a", "eg:p", "eg:b")]);
}

const DERIVATION_RULES: &str = r#"
[testRule1: (<eg:C1> <eg:p> ?a) -> (<eg:C2> <eg:p> ?a)]
[testRule2: (<eg:C1> <eg:q> ?a) -> (<eg:C2> <eg:q> ?a)]
[testRule3: (<eg:C2> <eg:p> ?a), (<eg:C2> <eg:q> ?a) -> (<eg:res> <eg:p> ?a)]
"#;

#[test]
fn test_derivation_chain_in_forward_modes() {
    init_tracing();
    for mode in [RuleMode::Forward, RuleMode::ForwardRete] {
        let config = ReasonerConfig { derivation_logging: true, ..ReasonerConfig::with_mode(mode) };
        let graph = bind(
            DERIVATION_RULES,
            config,
            vec![
                Triple::uris("eg:C1", "eg:p", "eg:C3"),
                Triple::uris("eg:C1", "eg:q", "eg:C4"),
                Triple::uris("eg:C1", "eg:q", "eg:C3"),
            ],
        );
        let result = Triple::uris("eg:res", "eg:p", "eg:C3");
        assert!(graph.contains(&result).unwrap(), "{:?}", mode);

        let top = graph.get_derivation(&result).unwrap();
        assert_eq!(top.len(), 1, "{:?}", mode);
        assert_eq!(top[0].rule.name(), Some("testRule3"));
        let matched: BTreeSet<_> = top[0].matches.iter().cloned().collect();
        let expected: BTreeSet<_> =
            [Triple::uris("eg:C2", "eg:p", "eg:C3"), Triple::uris("eg:C2", "eg:q", "eg:C3")].into_iter().collect();
        assert_eq!(matched, expected);

        let p = graph.get_derivation(&Triple::uris("eg:C2", "eg:p", "eg:C3")).unwrap();
        assert_eq!(p[0].rule.name(), Some("testRule1"));
        assert_eq!(p[0].matches, vec![Triple::uris("eg:C1", "eg:p", "eg:C3")]);
        let q = graph.get_derivation(&Triple::uris("eg:C2", "eg:q", "eg:C3")).unwrap();
        assert_eq!(q[0].rule.name(), Some("testRule2"));
        assert_eq!(q[0].matches, vec![Triple::uris("eg:C1", "eg:q", "eg:C3")]);

        let trace = graph.format_derivation(&result).unwrap();
        assert!(trace.starts_with("Rule testRule3 concluded"), "{}", trace);
        assert!(trace.contains("Rule testRule1 concluded"));
        assert!(trace.contains("Fact (eg:C1 eg:q eg:C3)"));

        // raw data has no derivation
        assert!(graph.get_derivation(&Triple::uris("eg:C1", "eg:p", "eg:C3")).unwrap().is_empty());
        let exported = graph.export_derivations().unwrap();
        assert!(exported.contains("testRule3"));
    }
}

#[test]
fn test_derivation_logging_enabled_late() {
    let graph = bind(
        DERIVATION_RULES,
        ReasonerConfig::with_mode(RuleMode::ForwardRete),
        vec![Triple::uris("eg:C1", "eg:p", "eg:C3")],
    );
    let derived = Triple::uris("eg:C2", "eg:p", "eg:C3");
    assert!(graph.contains(&derived).unwrap());
    assert!(graph.get_derivation(&derived).unwrap().is_empty());

    graph.set_derivation_logging(true).unwrap();
    assert!(graph.contains(&derived).unwrap());
    assert_eq!(graph.get_derivation(&derived).unwrap().len(), 1);
}

#[test]
fn test_concurrent_modification_then_fresh_query() {
    init_tracing();
    let data = vec![Triple::uris("eg:a", "eg:p", "eg:b"), Triple::uris("eg:b", "eg:p", "eg:c")];
    let graph = bind("[s: (?a <eg:p> ?b) -> (?b <eg:p> ?a)]", ReasonerConfig::with_mode(RuleMode::ForwardRete), data);

    let mut iter = graph.find(&TriplePattern::any()).unwrap();
    assert!(matches!(iter.next(), Some(Ok(_))));
    graph.add(Triple::uris("eg:c", "eg:p", "eg:d")).unwrap();
    assert!(matches!(iter.next(), Some(Err(ReasonerError::ConcurrentModification))));
    assert!(iter.next().is_none());

    assert_eq!(graph.size().unwrap(), 6);
}

#[test]
fn test_add_then_delete_restores_closure() {
    init_tracing();
    let source = r#"
[t: (?a <eg:p> ?b) (?b <eg:p> ?c) -> (?a <eg:p> ?c)]
[s: (?a <eg:q> ?b) -> (?b <eg:q> ?a)]
[u: (?a <eg:q> ?b) -> (?a <eg:p> ?b)]
"#;
    let data = vec![Triple::uris("eg:a", "eg:p", "eg:b"), Triple::uris("eg:c", "eg:q", "eg:d")];
    for mode in [RuleMode::Forward, RuleMode::ForwardRete] {
        let graph = bind(source, ReasonerConfig::with_mode(mode), data.clone());
        let before = closure(&graph);
        let extra = Triple::uris("eg:b", "eg:q", "eg:c");
        graph.add(extra.clone()).unwrap();
        assert!(graph.contains(&Triple::uris("eg:a", "eg:p", "eg:d")).unwrap(), "{:?}", mode);
        graph.delete(&extra).unwrap();
        assert_eq!(closure(&graph), before, "{:?}", mode);
    }
}

#[test]
fn test_schema_binding_matches_full_binding() {
    let source = "[t: (?a <eg:p> ?b) (?b <eg:p> ?c) -> (?a <eg:p> ?c)]";
    let schema = GraphStore::from_triples(vec![Triple::uris("eg:a", "eg:p", "eg:b")]);
    let data = GraphStore::from_triples(vec![Triple::uris("eg:b", "eg:p", "eg:c")]);
    let reasoner = GenericRuleReasoner::new(parse_rules(source).unwrap()).with_mode(RuleMode::ForwardRete);

    let full = reasoner.bind_with_schema(schema.clone(), data.clone()).unwrap();
    let partial = reasoner.bind_schema(schema).unwrap();
    let first = partial.bind(data.clone()).unwrap();
    let second = partial.bind(data).unwrap();
    assert_eq!(closure(&first), closure(&full));
    assert_eq!(closure(&second), closure(&full));

    // sessions from one schema binding are independent
    first.add(Triple::uris("eg:c", "eg:p", "eg:d")).unwrap();
    assert_eq!(closure(&second), closure(&full));
}

#[test]
fn test_rebind_discards_previous_closure() {
    let graph = bind(
        "[s: (?a <eg:p> ?b) -> (?b <eg:p> ?a)]",
        ReasonerConfig::with_mode(RuleMode::ForwardRete),
        vec![Triple::uris("eg:a", "eg:p", "eg:b")],
    );
    assert_eq!(graph.size().unwrap(), 2);
    graph.rebind(GraphStore::from_triples(vec![Triple::uris("eg:x", "eg:p", "eg:y")])).unwrap();
    let expected: BTreeSet<_> =
        [Triple::uris("eg:x", "eg:p", "eg:y"), Triple::uris("eg:y", "eg:p", "eg:x")].into_iter().collect();
    assert_eq!(closure(&graph), expected);
}

#[test]
fn test_subclass_closure_in_every_mode() {
    init_tracing();
    let chain = vec![
        sub_class("eg:C1", "eg:C2"),
        sub_class("eg:C2", "eg:C3"),
        class("eg:C1"),
        class("eg:C2"),
        class("eg:C3"),
    ];
    let chain_closure: BTreeSet<_> = [
        sub_class("eg:C1", "eg:C2"),
        sub_class("eg:C1", "eg:C3"),
        sub_class("eg:C1", "eg:C1"),
        sub_class("eg:C2", "eg:C3"),
        sub_class("eg:C2", "eg:C2"),
        sub_class("eg:C3", "eg:C3"),
    ]
    .into_iter()
    .collect();
    let cycle = vec![sub_class("eg:C1", "eg:C2"), sub_class("eg:C2", "eg:C1"), class("eg:C1"), class("eg:C2")];
    let cycle_closure: BTreeSet<_> = [
        sub_class("eg:C1", "eg:C2"),
        sub_class("eg:C2", "eg:C1"),
        sub_class("eg:C1", "eg:C1"),
        sub_class("eg:C2", "eg:C2"),
    ]
    .into_iter()
    .collect();

    let pattern = TriplePattern::new(Node::Any, uri(rdfs::SUBCLASS_OF), Node::Any);
    for mode in [RuleMode::Forward, RuleMode::ForwardRete, RuleMode::Backward, RuleMode::Hybrid] {
        for (data, expected) in [(chain.clone(), &chain_closure), (cycle.clone(), &cycle_closure)] {
            let graph = bind(CLASS_RULES, ReasonerConfig::with_mode(mode), data);
            let found: BTreeSet<_> = graph.find_all(&pattern).unwrap().into_iter().collect();
            assert_eq!(&found, expected, "{:?}", mode);
        }
    }
}

#[test]
fn test_shared_variable_between_head_and_join() {
    init_tracing();
    let source = "[two: (?y <eg:r> ?z) <- (?x <eg:q> ?y), (?y <eg:q> ?z)]";
    let data = vec![
        Triple::uris("eg:n1", "eg:q", "eg:n2"),
        Triple::uris("eg:n2", "eg:q", "eg:n4"),
        Triple::uris("eg:n1", "eg:q", "eg:n3"),
        Triple::uris("eg:n3", "eg:q", "eg:n5"),
    ];
    let expected: BTreeSet<_> =
        [Triple::uris("eg:n2", "eg:r", "eg:n4"), Triple::uris("eg:n3", "eg:r", "eg:n5")].into_iter().collect();
    let pattern = TriplePattern::new(Node::Any, uri("eg:r"), Node::Any);
    for mode in [RuleMode::Forward, RuleMode::ForwardRete, RuleMode::Backward, RuleMode::Hybrid] {
        let graph = bind(source, ReasonerConfig::with_mode(mode), data.clone());
        let found: BTreeSet<_> = graph.find_all(&pattern).unwrap().into_iter().collect();
        assert_eq!(found, expected, "{:?}", mode);
    }
}

#[test]
fn test_functor_head_unifies_with_functor_body() {
    init_tracing();
    let source = r#"
[wrap: (?x <eg:wrapped> pair(?x, ?y)) <- (?x <eg:p> ?y)]
[open: (?a <eg:both> ?b) <- (?a <eg:wrapped> pair(?a, ?b))]
"#;
    let data = vec![Triple::uris("eg:a", "eg:p", "eg:b"), Triple::uris("eg:c", "eg:p", "eg:d")];
    let expected: BTreeSet<_> =
        [Triple::uris("eg:a", "eg:both", "eg:b"), Triple::uris("eg:c", "eg:both", "eg:d")].into_iter().collect();
    let pattern = TriplePattern::new(Node::Any, uri("eg:both"), Node::Any);
    for mode in [RuleMode::Forward, RuleMode::ForwardRete, RuleMode::Backward, RuleMode::Hybrid] {
        let graph = bind(source, ReasonerConfig::with_mode(mode), data.clone());
        let found: BTreeSet<_> = graph.find_all(&pattern).unwrap().into_iter().collect();
        assert_eq!(found, expected, "{:?}", mode);
    }
}

#[test]
fn test_delete_retracts_conclusions_with_fresh_nodes() {
    init_tracing();
    let source = "[temp: (?x <eg:p> ?y), makeTemp(?t) -> (?x <eg:q> ?t)]";
    let asserted = Triple::uris("eg:a", "eg:p", "eg:b");
    let other = Triple::uris("eg:c", "eg:p", "eg:d");
    for mode in [RuleMode::Forward, RuleMode::ForwardRete] {
        let graph = bind(source, ReasonerConfig::with_mode(mode), vec![asserted.clone(), other.clone()]);
        assert_eq!(graph.size().unwrap(), 4, "{:?}", mode);

        graph.delete(&asserted).unwrap();
        let remaining = closure(&graph);
        assert_eq!(remaining.len(), 2, "{:?}", mode);
        assert!(remaining.contains(&other));
        assert!(remaining.iter().all(|t| t.subject == uri("eg:c")), "{:?}", mode);
        assert_eq!(graph.deductions().unwrap().len(), 1, "{:?}", mode);

        graph.delete(&other).unwrap();
        assert!(closure(&graph).is_empty(), "{:?}", mode);
    }
}

#[test]
fn test_firing_budget_applies_per_evaluation() {
    init_tracing();
    let source = "[r: (?a <eg:p> ?b) -> (?a <eg:q> ?b)]";
    for mode in [RuleMode::Forward, RuleMode::ForwardRete] {
        let config = ReasonerConfig { max_rule_firings: Some(3), ..ReasonerConfig::with_mode(mode) };
        let graph = bind(source, config.clone(), Vec::new());
        graph.prepare().unwrap();
        for i in 0..5 {
            graph.add(Triple::uris(&format!("eg:n{}", i), "eg:p", "eg:o")).unwrap();
        }
        assert_eq!(graph.rules_fired().unwrap(), 5, "{:?}", mode);
        assert_eq!(graph.size().unwrap(), 10, "{:?}", mode);

        // one closure that needs more firings than the budget still fails
        let data = (0..4).map(|i| Triple::uris(&format!("eg:n{}", i), "eg:p", "eg:o")).collect();
        let graph = bind(source, config, data);
        assert!(matches!(graph.prepare(), Err(ReasonerError::ResourceExhausted(_))), "{:?}", mode);
    }
}

const PROP_RULES: &str = r#"
[t: (?a <eg:p> ?b) (?b <eg:p> ?c) -> (?a <eg:p> ?c)]
[s: (?a <eg:q> ?b) -> (?b <eg:q> ?a)]
[u: (?a <eg:q> ?b) -> (?a <eg:p> ?b)]
"#;

fn edge((s, p, o): (usize, usize, usize)) -> Triple {
    let predicate = if p == 0 { "eg:p" } else { "eg:q" };
    Triple::uris(&format!("eg:n{}", s), predicate, &format!("eg:n{}", o))
}

fn tabled(mode: RuleMode) -> ReasonerConfig {
    ReasonerConfig { table_all: true, ..ReasonerConfig::with_mode(mode) }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_every_mode_agrees(edges in prop::collection::vec((0..4usize, 0..2usize, 0..4usize), 0..10)) {
        let data: Vec<Triple> = edges.into_iter().map(edge).collect();
        let forward = closure(&bind(PROP_RULES, tabled(RuleMode::Forward), data.clone()));
        let rete = closure(&bind(PROP_RULES, tabled(RuleMode::ForwardRete), data.clone()));
        let backward = closure(&bind(PROP_RULES, tabled(RuleMode::Backward), data));
        prop_assert_eq!(&forward, &rete);
        prop_assert_eq!(&forward, &backward);
    }

    #[test]
    fn prop_incremental_delete_matches_fresh_bind(
        edges in prop::collection::vec((0..4usize, 0..2usize, 0..4usize), 1..10),
        removed in prop::collection::vec(any::<bool>(), 10),
    ) {
        let data: Vec<Triple> = edges.into_iter().map(edge).collect();
        let graph = bind(PROP_RULES, ReasonerConfig::with_mode(RuleMode::ForwardRete), data.clone());
        graph.prepare().unwrap();

        let mut kept = Vec::new();
        for (triple, remove) in data.into_iter().zip(removed) {
            if remove {
                graph.delete(&triple).unwrap();
            } else {
                kept.push(triple);
            }
        }
        // a triple listed twice may have been deleted after being kept
        let raw = graph.raw_data().unwrap();
        kept.retain(|t| raw.contains_triple(t));

        let fresh = closure(&bind(PROP_RULES, ReasonerConfig::with_mode(RuleMode::Forward), kept));
        prop_assert_eq!(closure(&graph), fresh);
    }
}
