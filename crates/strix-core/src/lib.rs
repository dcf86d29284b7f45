//! # Strix Core
//!
//! RDF term model and indexed triple store shared by the rule parser and the
//! reasoning engines.

pub mod model;
pub mod prefix;
pub mod store;
pub mod vocabulary;

pub use model::*;
pub use prefix::*;
pub use store::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(test)]
    mod interned_string_tests {
        use super::*;

        #[test]
        fn test_interned_string_new() {
            let s1 = InternedString::new("test");
            let s2 = InternedString::new("test");
            assert_eq!(s1.as_str(), "test");
            assert_eq!(s1, s2);
        }

        #[test]
        fn test_interned_string_len() {
            let s = InternedString::new("hello");
            assert_eq!(s.len(), 5);
            assert!(InternedString::new("").is_empty());
        }

        #[test]
        fn test_interned_string_serde() {
            let s = InternedString::new("urn:x");
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, "\"urn:x\"");
            let back: InternedString = serde_json::from_str(&json).unwrap();
            assert_eq!(back, s);
        }
    }

    #[cfg(test)]
    mod node_tests {
        use super::*;
        use crate::vocabulary::xsd;

        #[test]
        fn test_variable_equality_needs_name_and_index() {
            assert_eq!(Node::var("?x", 0), Node::var("?x", 0));
            assert_ne!(Node::var("?x", 0), Node::var("?x", 1));
            assert_ne!(Node::var("?x", 0), Node::var("?y", 0));
        }

        #[test]
        fn test_groundness() {
            assert!(Node::uri("a").is_ground());
            assert!(!Node::Any.is_ground());
            assert!(Node::functor("f", vec![Node::uri("a"), Node::int(1)]).is_ground());
            assert!(!Node::functor("f", vec![Node::var("?x", 0)]).is_ground());
        }

        #[test]
        fn test_numeric_same_value() {
            let a = Node::literal(Literal::typed("1", xsd::INT));
            let b = Node::literal(Literal::typed("1", xsd::INTEGER));
            let c = Node::literal(Literal::typed("1.0", xsd::DOUBLE));
            assert_ne!(a, b);
            assert!(a.same_value_as(&b));
            assert!(a.same_value_as(&c));
            assert!(!a.same_value_as(&Node::int(2)));
        }

        #[test]
        fn test_plain_and_string_literals_share_value() {
            let plain = Node::plain("abc");
            let typed = Node::literal(Literal::typed("abc", xsd::STRING));
            assert!(plain.same_value_as(&typed));
        }

        #[test]
        fn test_literal_compare() {
            let three = Literal::integer(3);
            let half = Literal::double(0.5);
            assert_eq!(three.compare_value(&half), Some(std::cmp::Ordering::Greater));
            assert_eq!(Literal::plain("x").compare_value(&three), None);
        }

        #[test]
        fn test_integer_datatype_selection() {
            assert_eq!(Literal::integer(5).datatype(), Some(xsd::INT));
            assert_eq!(Literal::integer(i64::MAX).datatype(), Some(xsd::LONG));
        }

        #[test]
        fn test_display() {
            assert_eq!(Node::int(42).to_string(), "42");
            assert_eq!(Node::plain("hi").to_string(), "'hi'");
            assert_eq!(Node::var("?x", 0).to_string(), "?x");
            let f = Node::functor("all", vec![Node::uri("p"), Node::uri("D")]);
            assert_eq!(f.to_string(), "all(p D)");
            assert_eq!(Triple::uris("a", "p", "b").to_string(), "(a p b)");
        }

        #[test]
        fn test_node_serde_roundtrip() {
            let node = Node::functor("f", vec![Node::int(1), Node::blank("b0")]);
            let json = serde_json::to_string(&node).unwrap();
            let back: Node = serde_json::from_str(&json).unwrap();
            assert_eq!(node, back);
        }
    }

    #[cfg(test)]
    mod pattern_tests {
        use super::*;

        #[test]
        fn test_wildcards_match() {
            let t = Triple::uris("a", "p", "b");
            assert!(TriplePattern::any().matches(&t));
            let p = TriplePattern::new(Node::var("?x", 0), Node::uri("p"), Node::Any);
            assert!(p.matches(&t));
            let q = TriplePattern::new(Node::Any, Node::uri("q"), Node::Any);
            assert!(!q.matches(&t));
        }

        #[test]
        fn test_functor_pattern_match() {
            let t = Triple::new(
                Node::uri("a"),
                Node::uri("p"),
                Node::functor("f", vec![Node::uri("x"), Node::int(1)]),
            );
            let p = TriplePattern::new(
                Node::Any,
                Node::uri("p"),
                Node::functor("f", vec![Node::var("?v", 0), Node::int(1)]),
            );
            assert!(p.matches(&t));
            let wrong = TriplePattern::new(
                Node::Any,
                Node::uri("p"),
                Node::functor("g", vec![Node::var("?v", 0), Node::int(1)]),
            );
            assert!(!wrong.matches(&t));
        }

        #[test]
        fn test_variable_indices() {
            let p = TriplePattern::new(
                Node::var("?a", 0),
                Node::var("?b", 1),
                Node::functor("f", vec![Node::var("?a", 0), Node::var("?c", 2)]),
            );
            assert_eq!(p.variable_indices(), vec![0, 1, 2]);
            assert!(p.to_triple().is_none());
        }
    }

    #[cfg(test)]
    mod prefix_tests {
        use super::*;
        use crate::vocabulary::rdf;

        #[test]
        fn test_expand_and_shorten() {
            let mapping = PrefixMapping::standard();
            assert_eq!(mapping.expand("rdf:type").as_deref(), Some(rdf::TYPE));
            assert_eq!(mapping.expand("nope:x"), None);
            assert_eq!(mapping.shorten(rdf::TYPE), "rdf:type");
            assert_eq!(mapping.shorten("http://other/x"), "http://other/x");
        }

        #[test]
        fn test_uri_schemes() {
            assert!(PrefixMapping::is_uri_scheme("http"));
            assert!(!PrefixMapping::is_uri_scheme("foo"));
        }
    }

    #[cfg(test)]
    mod store_tests {
        use super::*;

        fn sample_store() -> GraphStore {
            GraphStore::from_triples(vec![
                Triple::uris("a", "p", "b"),
                Triple::uris("b", "p", "c"),
                Triple::uris("a", "q", "c"),
            ])
        }

        #[test]
        fn test_add_rejects_duplicates() {
            let mut store = sample_store();
            assert!(!store.add_triple(Triple::uris("a", "p", "b")));
            assert_eq!(store.len(), 3);
        }

        #[test]
        fn test_find_matches_literals_by_value() {
            let mut store = sample_store();
            let typed = Node::literal(Literal::typed("01", crate::vocabulary::xsd::INTEGER));
            assert!(store.add_triple(Triple::new(Node::uri("a"), Node::uri("n"), typed.clone())));
            // stored as written
            assert!(!store.contains_triple(&Triple::new(Node::uri("a"), Node::uri("n"), Node::int(1))));
            assert!(store.add_triple(Triple::new(Node::uri("a"), Node::uri("n"), Node::int(1))));

            let by_value = TriplePattern::new(Node::Any, Node::Any, Node::literal(Literal::double(1.0)));
            assert_eq!(store.find_triples(&by_value).len(), 2);
            let exact = TriplePattern::new(Node::uri("a"), Node::uri("n"), typed);
            assert_eq!(store.find_triples(&exact).len(), 2);
            let other = TriplePattern::new(Node::Any, Node::uri("n"), Node::int(2));
            assert!(store.find_triples(&other).is_empty());
        }

        #[test]
        fn test_find_by_each_position() {
            let store = sample_store();
            let by_subject = TriplePattern::new(Node::uri("a"), Node::Any, Node::Any);
            assert_eq!(store.find_triples(&by_subject).len(), 2);
            let by_predicate = TriplePattern::new(Node::Any, Node::uri("p"), Node::Any);
            assert_eq!(store.find_triples(&by_predicate).len(), 2);
            let by_object = TriplePattern::new(Node::Any, Node::Any, Node::uri("c"));
            assert_eq!(store.find_triples(&by_object).len(), 2);
            let exact = TriplePattern::from(Triple::uris("a", "q", "c"));
            assert_eq!(store.find_triples(&exact).len(), 1);
            assert_eq!(store.find_triples(&TriplePattern::any()).len(), 3);
        }

        #[test]
        fn test_delete_updates_indexes() {
            let mut store = sample_store();
            assert!(store.remove_triple(&Triple::uris("a", "p", "b")));
            assert!(!store.remove_triple(&Triple::uris("a", "p", "b")));
            let by_subject = TriplePattern::new(Node::uri("a"), Node::Any, Node::Any);
            assert_eq!(store.find_triples(&by_subject), vec![&Triple::uris("a", "q", "c")]);
            assert_eq!(store.len(), 2);
        }

        #[test]
        fn test_compaction_keeps_contents() {
            let mut store = GraphStore::new();
            for i in 0..200 {
                store.add_triple(Triple::uris(&format!("s{}", i), "p", "o"));
            }
            for i in 0..150 {
                store.remove_triple(&Triple::uris(&format!("s{}", i), "p", "o"));
            }
            assert_eq!(store.len(), 50);
            let all = store.find_triples(&TriplePattern::new(Node::Any, Node::uri("p"), Node::uri("o")));
            assert_eq!(all.len(), 50);
            assert!(store.contains_triple(&Triple::uris("s199", "p", "o")));
        }

        #[test]
        fn test_graph_trait() {
            let mut store = GraphStore::new();
            let graph: &mut dyn Graph = &mut store;
            assert!(graph.add(Triple::uris("a", "p", "b")));
            assert!(graph.contains(&Triple::uris("a", "p", "b")));
            assert_eq!(graph.size(), 1);
            assert!(graph.delete(&Triple::uris("a", "p", "b")));
            assert!(graph.is_empty());
        }
    }

    #[cfg(test)]
    mod store_property_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        fn op_strategy() -> impl Strategy<Value = (bool, u8, u8, u8)> {
            (any::<bool>(), 0u8..6, 0u8..3, 0u8..6)
        }

        proptest! {
            #[test]
            fn prop_store_matches_set_model(ops in proptest::collection::vec(op_strategy(), 0..120)) {
                let mut store = GraphStore::new();
                let mut model = HashSet::new();
                for (insert, s, p, o) in ops {
                    let triple = Triple::uris(&format!("s{}", s), &format!("p{}", p), &format!("o{}", o));
                    if insert {
                        prop_assert_eq!(store.add_triple(triple.clone()), model.insert(triple));
                    } else {
                        prop_assert_eq!(store.remove_triple(&triple), model.remove(&triple));
                    }
                }
                prop_assert_eq!(store.len(), model.len());
                let pattern = TriplePattern::new(Node::Any, Node::uri("p1"), Node::Any);
                let found: HashSet<Triple> = store.find_triples(&pattern).into_iter().cloned().collect();
                let expected: HashSet<Triple> = model.iter().filter(|t| pattern.matches(t)).cloned().collect();
                prop_assert_eq!(found, expected);
            }
        }
    }
}
