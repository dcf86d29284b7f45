use strix_core::vocabulary::{rdf, xsd};
use strix_core::{Literal, Node, Triple, TriplePattern};
use strix_rules::*;

/// In-memory context over a fixed triple list
#[derive(Default)]
struct MockContext {
    env: BindingVector,
    graph: Vec<Triple>,
    rule: Option<Rule>,
    added: Vec<Triple>,
    removed: Vec<Triple>,
    dropped: Vec<Triple>,
    tabled: Vec<Node>,
    all_tabled: bool,
}

impl MockContext {
    fn new(slots: usize) -> Self {
        Self { env: BindingVector::new(slots), ..Default::default() }
    }

    fn with_graph(mut self, graph: Vec<Triple>) -> Self {
        self.graph = graph;
        self
    }
}

impl RuleContext for MockContext {
    fn ground(&self, node: &Node) -> Node {
        self.env.ground(node)
    }

    fn bind(&mut self, var: &Node, value: Node) -> bool {
        self.env.bind(var, value)
    }

    fn rule(&self) -> Option<&Rule> {
        self.rule.as_ref()
    }

    fn find(&self, pattern: &TriplePattern) -> Vec<Triple> {
        self.graph.iter().filter(|t| pattern.matches(t)).cloned().collect()
    }

    fn add(&mut self, triple: Triple) {
        self.added.push(triple);
    }

    fn remove(&mut self, triple: &Triple) {
        self.removed.push(triple.clone());
    }

    fn silent_remove(&mut self, triple: &Triple) {
        self.dropped.push(triple.clone());
    }

    fn set_tabled(&mut self, predicate: &Node) {
        self.tabled.push(predicate.clone());
    }

    fn table_all(&mut self) {
        self.all_tabled = true;
    }
}

fn call(name: &str, args: &[Node], ctx: &mut MockContext) -> Result<bool, BuiltinError> {
    let registry = BuiltinRegistry::standard();
    registry.get(name).unwrap().body_call(args, ctx)
}

fn x() -> Node {
    Node::var("?x", 0)
}

fn y() -> Node {
    Node::var("?y", 1)
}

#[test]
fn test_sum_binds_result() {
    let mut ctx = MockContext::new(1);
    assert!(call("sum", &[Node::int(2), Node::int(3), x()], &mut ctx).unwrap());
    assert_eq!(ctx.ground(&x()), Node::int(5));
    assert!(call("sum", &[Node::int(2), Node::int(3), Node::int(5)], &mut ctx).unwrap());
    assert!(!call("sum", &[Node::int(2), Node::int(3), Node::int(6)], &mut ctx).unwrap());
}

#[test]
fn test_arithmetic_needs_bound_operands() {
    let mut ctx = MockContext::new(2);
    assert!(!call("sum", &[y(), Node::int(3), x()], &mut ctx).unwrap());
    assert!(!call("sum", &[Node::plain("a"), Node::int(3), x()], &mut ctx).unwrap());
    assert!(ctx.env.get(0).is_none());
}

#[test]
fn test_mixed_arithmetic_is_decimal() {
    let mut ctx = MockContext::new(1);
    let half = Node::literal(Literal::typed("0.5", xsd::FLOAT));
    assert!(call("product", &[Node::int(3), half, x()], &mut ctx).unwrap());
    let value = ctx.ground(&x());
    assert!(value.same_value_as(&Node::literal(Literal::double(1.5))));
}

#[test]
fn test_quotient() {
    let mut ctx = MockContext::new(1);
    assert!(call("quotient", &[Node::int(7), Node::int(2), x()], &mut ctx).unwrap());
    assert_eq!(ctx.ground(&x()), Node::int(3));

    let mut ctx = MockContext::new(1);
    assert!(!call("quotient", &[Node::int(7), Node::int(0), x()], &mut ctx).unwrap());
}

#[test]
fn test_add_one_min_max() {
    let mut ctx = MockContext::new(2);
    assert!(call("addOne", &[Node::int(41), x()], &mut ctx).unwrap());
    assert_eq!(ctx.ground(&x()), Node::int(42));
    assert!(call("min", &[Node::int(4), Node::int(9), y()], &mut ctx).unwrap());
    assert_eq!(ctx.ground(&y()), Node::int(4));
    assert!(call("max", &[Node::int(4), Node::int(9), Node::int(9)], &mut ctx).unwrap());
}

#[test]
fn test_comparisons() {
    let mut ctx = MockContext::new(1);
    let decimal = Node::literal(Literal::typed("3.5", xsd::FLOAT));
    assert!(call("lessThan", &[Node::int(2), decimal.clone()], &mut ctx).unwrap());
    assert!(call("greaterThan", &[decimal, Node::int(2)], &mut ctx).unwrap());
    assert!(call("le", &[Node::int(2), Node::int(2)], &mut ctx).unwrap());
    assert!(call("ge", &[Node::int(3), Node::int(2)], &mut ctx).unwrap());
    assert!(!call("lessThan", &[x(), Node::int(2)], &mut ctx).unwrap());
    assert!(!call("lessThan", &[Node::plain("a"), Node::plain("b")], &mut ctx).unwrap());
}

#[test]
fn test_date_time_comparison() {
    let mut ctx = MockContext::new(0);
    let early = Node::literal(Literal::typed("2024-01-01T00:00:00Z", xsd::DATE_TIME));
    let late = Node::literal(Literal::typed("2024-06-01T00:00:00Z", xsd::DATE_TIME));
    assert!(call("lessThan", &[early, late], &mut ctx).unwrap());
}

#[test]
fn test_equality_by_value() {
    let mut ctx = MockContext::new(1);
    let integer = Node::literal(Literal::typed("2", xsd::INTEGER));
    assert!(call("equal", &[Node::int(2), integer.clone()], &mut ctx).unwrap());
    assert!(!call("notEqual", &[Node::int(2), integer], &mut ctx).unwrap());
    assert!(call("notEqual", &[Node::uri("a"), Node::uri("b")], &mut ctx).unwrap());
    // unbound operands never compare
    assert!(!call("notEqual", &[x(), Node::uri("b")], &mut ctx).unwrap());
    assert!(!call("equal", &[x(), x()], &mut ctx).unwrap());
}

#[test]
fn test_bound_and_type_tests() {
    let mut ctx = MockContext::new(2);
    ctx.bind(&x(), Node::plain("lit"));
    assert!(call("bound", &[x()], &mut ctx).unwrap());
    assert!(!call("bound", &[x(), y()], &mut ctx).unwrap());
    assert!(call("unbound", &[y()], &mut ctx).unwrap());
    assert!(call("isLiteral", &[x()], &mut ctx).unwrap());
    assert!(!call("notLiteral", &[x()], &mut ctx).unwrap());
    assert!(call("isBNode", &[Node::blank("b")], &mut ctx).unwrap());
    assert!(call("notBNode", &[Node::uri("u")], &mut ctx).unwrap());
    assert!(call("isFunctor", &[Node::functor("f", vec![])], &mut ctx).unwrap());
    assert!(call("notFunctor", &[x()], &mut ctx).unwrap());
}

#[test]
fn test_regex_binds_groups() {
    let mut ctx = MockContext::new(2);
    let args = [Node::plain("abc-123"), Node::plain(r"(\w+)-(\d+)"), x(), y()];
    assert!(call("regex", &args, &mut ctx).unwrap());
    assert_eq!(ctx.ground(&x()), Node::plain("abc"));
    assert_eq!(ctx.ground(&y()), Node::plain("123"));
}

#[test]
fn test_regex_matches_whole_text() {
    let mut ctx = MockContext::new(0);
    assert!(!call("regex", &[Node::plain("abc"), Node::plain("b")], &mut ctx).unwrap());
    assert!(call("regex", &[Node::plain("abc"), Node::plain("a.c")], &mut ctx).unwrap());
}

#[test]
fn test_regex_bad_pattern_is_fatal() {
    let mut ctx = MockContext::new(0);
    let result = call("regex", &[Node::plain("abc"), Node::plain("(")], &mut ctx);
    assert!(matches!(result, Err(BuiltinError::Fatal { .. })));
}

#[test]
fn test_constant_regex_checked_when_rule_is_validated() {
    let registry = BuiltinRegistry::standard();
    let bad = parse_rule("[r: (?a p ?t), regex(?t, '(') -> (?a q ?t)]").unwrap();
    assert!(matches!(registry.validate_rule(&bad), Err(RuleError::IllegalRule { .. })));

    let good = parse_rule("[r: (?a p ?t), regex(?t, 'a(.)c', ?m) -> (?a q ?m)]").unwrap();
    assert!(registry.validate_rule(&good).is_ok());
    // a pattern bound at run time can only be checked when the rule fires
    let late = parse_rule("[r: (?a p ?t), (?a pattern ?re), regex(?t, ?re) -> (?a q ?t)]").unwrap();
    assert!(registry.validate_rule(&late).is_ok());
}

#[test]
fn test_string_concat() {
    let mut ctx = MockContext::new(2);
    assert!(call("strConcat", &[Node::plain("a"), Node::int(1), x()], &mut ctx).unwrap());
    assert_eq!(ctx.ground(&x()), Node::plain("a1"));
    assert!(call("uriConcat", &[Node::uri("http://x.org/"), Node::plain("y"), y()], &mut ctx).unwrap());
    assert_eq!(ctx.ground(&y()), Node::uri("http://x.org/y"));
}

#[test]
fn test_now_binds_date_time() {
    let mut ctx = MockContext::new(1);
    assert!(call("now", &[x()], &mut ctx).unwrap());
    let value = ctx.ground(&x());
    assert_eq!(value.as_literal().unwrap().datatype(), Some(xsd::DATE_TIME));
}

#[test]
fn test_no_value() {
    let mut ctx = MockContext::new(1).with_graph(vec![Triple::uris("a", "p", "b")]);
    assert!(!call("noValue", &[Node::uri("a"), Node::uri("p")], &mut ctx).unwrap());
    assert!(call("noValue", &[Node::uri("a"), Node::uri("q")], &mut ctx).unwrap());
    assert!(!call("noValue", &[Node::uri("a"), Node::uri("p"), x()], &mut ctx).unwrap());
    assert!(call("noValue", &[Node::uri("a"), Node::uri("p"), Node::uri("c")], &mut ctx).unwrap());
}

fn list_graph() -> Vec<Triple> {
    let first = Node::uri(rdf::FIRST);
    let rest = Node::uri(rdf::REST);
    vec![
        Triple::new(Node::blank("l1"), first.clone(), Node::int(1)),
        Triple::new(Node::blank("l1"), rest.clone(), Node::blank("l2")),
        Triple::new(Node::blank("l2"), first.clone(), Node::int(2)),
        Triple::new(Node::blank("l2"), rest.clone(), Node::uri(rdf::NIL)),
        Triple::new(Node::blank("m1"), first, Node::int(1)),
        Triple::new(Node::blank("m1"), rest, Node::uri(rdf::NIL)),
    ]
}

#[test]
fn test_list_builtins() {
    let mut ctx = MockContext::new(2).with_graph(list_graph());
    let list = Node::blank("l1");
    assert!(call("listContains", &[list.clone(), Node::int(2)], &mut ctx).unwrap());
    assert!(call("listNotContains", &[list.clone(), Node::int(3)], &mut ctx).unwrap());
    assert!(call("listLength", &[list.clone(), x()], &mut ctx).unwrap());
    assert_eq!(ctx.ground(&x()), Node::int(2));
    assert!(call("listEntry", &[list.clone(), Node::int(1), y()], &mut ctx).unwrap());
    assert_eq!(ctx.ground(&y()), Node::int(2));
    assert!(call("listEqual", &[list.clone(), list.clone()], &mut ctx).unwrap());
    assert!(call("listNotEqual", &[list, Node::blank("m1")], &mut ctx).unwrap());
}

#[test]
fn test_cyclic_list_terminates() {
    let graph = vec![
        Triple::new(Node::blank("c"), Node::uri(rdf::FIRST), Node::int(1)),
        Triple::new(Node::blank("c"), Node::uri(rdf::REST), Node::blank("c")),
    ];
    let mut ctx = MockContext::new(1).with_graph(graph);
    assert!(call("listLength", &[Node::blank("c"), x()], &mut ctx).unwrap());
    assert_eq!(ctx.ground(&x()), Node::int(1));
}

#[test]
fn test_count_literal_values() {
    let graph = vec![
        Triple::new(Node::uri("a"), Node::uri("p"), Node::int(1)),
        Triple::new(Node::uri("a"), Node::uri("p"), Node::literal(Literal::typed("1", xsd::INTEGER))),
        Triple::new(Node::uri("a"), Node::uri("p"), Node::plain("x")),
        Triple::new(Node::uri("a"), Node::uri("p"), Node::uri("r")),
    ];
    let mut ctx = MockContext::new(1).with_graph(graph);
    assert!(call("countLiteralValues", &[Node::uri("a"), Node::uri("p"), x()], &mut ctx).unwrap());
    assert_eq!(ctx.ground(&x()), Node::int(2));
}

#[test]
fn test_node_creation() {
    let mut first = MockContext::new(2);
    assert!(call("makeTemp", &[x()], &mut first).unwrap());
    assert!(call("makeTemp", &[y()], &mut first).unwrap());
    assert!(first.ground(&x()).is_blank());
    assert_ne!(first.ground(&x()), first.ground(&y()));

    let mut a = MockContext::new(1);
    let mut b = MockContext::new(1);
    call("makeSkolem", &[x(), Node::uri("s"), Node::int(1)], &mut a).unwrap();
    call("makeSkolem", &[x(), Node::uri("s"), Node::int(1)], &mut b).unwrap();
    assert_eq!(a.ground(&x()), b.ground(&x()));

    let mut c = MockContext::new(1);
    call("makeInstance", &[Node::uri("s"), Node::uri("p"), x()], &mut c).unwrap();
    let mut d = MockContext::new(1);
    call("makeInstance", &[Node::uri("s"), Node::uri("p"), x()], &mut d).unwrap();
    assert!(c.ground(&x()).is_blank());
    assert_eq!(c.ground(&x()), d.ground(&x()));
}

#[test]
fn test_make_instance_reuses_existing_value() {
    let graph = vec![Triple::new(Node::uri("s"), Node::uri("p"), Node::blank("existing"))];
    let mut ctx = MockContext::new(1).with_graph(graph);
    assert!(call("makeInstance", &[Node::uri("s"), Node::uri("p"), x()], &mut ctx).unwrap());
    assert_eq!(ctx.ground(&x()), Node::blank("existing"));
}

#[test]
fn test_remove_and_drop_head_actions() {
    let registry = BuiltinRegistry::standard();
    let rule = parse_rule("[r: (?a p ?b), (?b q ?a) -> remove(0) drop(1)]").unwrap();
    let mut ctx = MockContext::new(2);
    ctx.env.bind_index(0, Node::uri("x"));
    ctx.env.bind_index(1, Node::uri("y"));
    ctx.rule = Some(rule.clone());

    for clause in rule.head() {
        let call = clause.as_call().unwrap();
        registry
            .get(call.name.as_str())
            .unwrap()
            .head_action(&call.args, &mut ctx)
            .unwrap();
    }
    assert_eq!(ctx.removed, vec![Triple::uris("x", "p", "y")]);
    assert_eq!(ctx.dropped, vec![Triple::uris("y", "q", "x")]);
    assert!(ctx.added.is_empty());
}

#[test]
fn test_remove_outside_rule_is_fatal() {
    let registry = BuiltinRegistry::standard();
    let mut ctx = MockContext::new(0);
    let result = registry.get("remove").unwrap().head_action(&[Node::int(0)], &mut ctx);
    assert!(result.is_err());
}

#[test]
fn test_tabling_actions() {
    let registry = BuiltinRegistry::standard();
    let mut ctx = MockContext::new(0);
    registry.get("table").unwrap().head_action(&[Node::uri("p"), Node::uri("q")], &mut ctx).unwrap();
    registry.get("tableAll").unwrap().head_action(&[], &mut ctx).unwrap();
    assert_eq!(ctx.tabled, vec![Node::uri("p"), Node::uri("q")]);
    assert!(ctx.all_tabled);
}

#[test]
fn test_body_only_builtin_rejected_in_head() {
    let registry = BuiltinRegistry::standard();
    let mut ctx = MockContext::new(1);
    let result = registry.get("sum").unwrap().head_action(&[Node::int(1), Node::int(2), x()], &mut ctx);
    assert!(matches!(result, Err(BuiltinError::Fatal { .. })));
    let result = registry.get("remove").unwrap().body_call(&[Node::int(0)], &mut ctx);
    assert!(result.is_err());
}
