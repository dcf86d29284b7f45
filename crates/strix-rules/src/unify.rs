//! Unification of triple patterns and matching against ground triples

use crate::binding::{BindingEnvironment, BindingStack, BindingVector};
use strix_core::{Node, Triple, TriplePattern};

/// Unify a goal pattern with a rule head over a single environment of
/// `max_vars` slots. Goal and head variables share the slot space, so callers
/// rename apart beforehand when they come from different activations.
///
/// Returns `None` on failure; partial bindings never escape.
pub fn unify(goal: &TriplePattern, head: &TriplePattern, max_vars: usize) -> Option<BindingVector> {
    let mut env = BindingVector::new(max_vars);
    let ok = unify_nodes(&goal.subject, &head.subject, &mut env)
        && unify_nodes(&goal.predicate, &head.predicate, &mut env)
        && unify_nodes(&goal.object, &head.object, &mut env);
    ok.then_some(env)
}

/// Unify two nodes under `env`, extending it on success
pub fn unify_nodes<E: BindingEnvironment + ?Sized>(goal: &Node, head: &Node, env: &mut E) -> bool {
    let goal = env.ground(goal);
    let head = env.ground(head);
    match (&goal, &head) {
        (Node::Any, _) | (_, Node::Any) => true,
        (Node::Variable(g), Node::Variable(h)) => {
            // goal side refers to the head side so chains resolve through ground()
            g.index == h.index || env.bind_index(g.index, head.clone())
        }
        (Node::Variable(g), _) => env.bind_index(g.index, head.clone()),
        (_, Node::Variable(h)) => env.bind_index(h.index, goal.clone()),
        (Node::Functor(gf), Node::Functor(hf)) => {
            gf.name == hf.name
                && gf.args.len() == hf.args.len()
                && gf
                    .args
                    .iter()
                    .zip(&hf.args)
                    .all(|(g, h)| unify_nodes(g, h, env))
        }
        _ => goal.same_value_as(&head),
    }
}

/// Bind pattern variables so the pattern equals the ground node.
/// On failure `env` may hold partial bindings; use [`match_pattern`] for
/// rollback.
pub fn match_node<E: BindingEnvironment + ?Sized>(pattern: &Node, value: &Node, env: &mut E) -> bool {
    match pattern {
        Node::Any => true,
        Node::Variable(_) => match env.ground(pattern) {
            Node::Variable(w) => env.bind_index(w.index, value.clone()),
            bound => match_node(&bound, value, env),
        },
        Node::Functor(pf) => match value {
            Node::Functor(vf) => {
                pf.name == vf.name
                    && pf.args.len() == vf.args.len()
                    && pf.args.iter().zip(&vf.args).all(|(p, v)| match_node(p, v, env))
            }
            _ => false,
        },
        _ => pattern.same_value_as(value),
    }
}

/// Match a pattern against a ground triple, binding variables on success and
/// leaving `env` untouched on failure.
pub fn match_pattern(pattern: &TriplePattern, triple: &Triple, env: &mut BindingStack) -> bool {
    env.push();
    let ok = match_node(&pattern.subject, &triple.subject, env)
        && match_node(&pattern.predicate, &triple.predicate, env)
        && match_node(&pattern.object, &triple.object, env);
    if ok {
        env.commit();
    } else {
        env.unwind();
    }
    ok
}

/// Fresh binding vector of `size` slots matching the pattern against the
/// triple, or `None`
pub fn bind_pattern(pattern: &TriplePattern, triple: &Triple, size: usize) -> Option<BindingVector> {
    let mut env = BindingVector::new(size);
    (match_node(&pattern.subject, &triple.subject, &mut env)
        && match_node(&pattern.predicate, &triple.predicate, &mut env)
        && match_node(&pattern.object, &triple.object, &mut env))
    .then_some(env)
}
