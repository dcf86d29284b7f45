//! RDF term models for rule reasoning

use itertools::Itertools;
use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::vocabulary::xsd;

/// Global string interning pool for memory optimization
lazy_static! {
    static ref STRING_POOL: Arc<RwLock<HashMap<String, Arc<String>>>> = Arc::new(RwLock::new(HashMap::new()));
}

/// Interned string that reuses memory for identical strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternedString(Arc<String>);

impl InternedString {
    /// Create a new interned string, reusing existing instances when possible
    pub fn new<S: Into<String>>(s: S) -> Self {
        let string = s.into();
        if let Some(interned) = STRING_POOL
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&string)
        {
            return InternedString(Arc::clone(interned));
        }

        let mut pool = STRING_POOL.write().unwrap_or_else(PoisonError::into_inner);
        let interned = pool
            .entry(string.clone())
            .or_insert_with(|| Arc::new(string));
        InternedString(Arc::clone(interned))
    }

    /// Get the string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the length
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for InternedString {
    fn from(s: String) -> Self {
        InternedString::new(s)
    }
}

impl From<&str> for InternedString {
    fn from(s: &str) -> Self {
        InternedString::new(s)
    }
}

impl From<&String> for InternedString {
    fn from(s: &String) -> Self {
        InternedString::new(s.clone())
    }
}

impl fmt::Display for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for InternedString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for InternedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for InternedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(InternedString::new)
    }
}

/// Typed view over a literal's lexical form
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Text(String),
    Other,
}

impl LiteralValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LiteralValue::Integer(i) => Some(*i as f64),
            LiteralValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, LiteralValue::Integer(_) | LiteralValue::Decimal(_))
    }
}

/// RDF literal: lexical form plus optional datatype or language tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    lexical: InternedString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datatype: Option<InternedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<InternedString>,
}

impl Literal {
    pub fn plain<S: Into<InternedString>>(lexical: S) -> Self {
        Self { lexical: lexical.into(), datatype: None, language: None }
    }

    pub fn typed<S: Into<InternedString>, D: Into<InternedString>>(lexical: S, datatype: D) -> Self {
        Self { lexical: lexical.into(), datatype: Some(datatype.into()), language: None }
    }

    pub fn with_language<S: Into<InternedString>, L: Into<InternedString>>(lexical: S, language: L) -> Self {
        Self { lexical: lexical.into(), datatype: None, language: Some(language.into()) }
    }

    /// Integer literal, `xsd:int` when the value fits, `xsd:long` otherwise
    pub fn integer(value: i64) -> Self {
        let datatype = if i32::try_from(value).is_ok() { xsd::INT } else { xsd::LONG };
        Self::typed(value.to_string(), datatype)
    }

    pub fn double(value: f64) -> Self {
        Self::typed(value.to_string(), xsd::DOUBLE)
    }

    pub fn boolean(value: bool) -> Self {
        Self::typed(value.to_string(), xsd::BOOLEAN)
    }

    pub fn lexical(&self) -> &str {
        self.lexical.as_str()
    }

    pub fn datatype(&self) -> Option<&str> {
        self.datatype.as_ref().map(|d| d.as_str())
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_ref().map(|l| l.as_str())
    }

    /// Interpret the lexical form according to the datatype
    pub fn value(&self) -> LiteralValue {
        let lexical = self.lexical.as_str().trim();
        match self.datatype() {
            None => LiteralValue::Text(self.lexical.to_string()),
            Some(dt) if dt == xsd::STRING => LiteralValue::Text(self.lexical.to_string()),
            Some(dt) if xsd::is_integer_type(dt) => lexical
                .trim_start_matches('+')
                .parse::<i64>()
                .map(LiteralValue::Integer)
                .unwrap_or(LiteralValue::Other),
            Some(dt) if xsd::is_decimal_type(dt) => lexical
                .parse::<f64>()
                .map(LiteralValue::Decimal)
                .unwrap_or(LiteralValue::Other),
            Some(dt) if dt == xsd::BOOLEAN => match lexical {
                "true" | "1" => LiteralValue::Boolean(true),
                "false" | "0" => LiteralValue::Boolean(false),
                _ => LiteralValue::Other,
            },
            Some(_) => LiteralValue::Other,
        }
    }

    /// Value equality: numbers compare numerically across datatypes,
    /// plain and `xsd:string` literals compare by text.
    pub fn same_value_as(&self, other: &Literal) -> bool {
        if self == other {
            return true;
        }
        match (self.value(), other.value()) {
            (LiteralValue::Integer(a), LiteralValue::Integer(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64() == b.as_f64(),
            (LiteralValue::Text(a), LiteralValue::Text(b)) => a == b && self.language == other.language,
            (LiteralValue::Boolean(a), LiteralValue::Boolean(b)) => a == b,
            _ => false,
        }
    }

    /// Ordering of comparable (numeric) values
    pub fn compare_value(&self, other: &Literal) -> Option<Ordering> {
        match (self.value(), other.value()) {
            (LiteralValue::Integer(a), LiteralValue::Integer(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.datatype, &self.language) {
            (Some(dt), _) if xsd::is_integer_type(dt.as_str()) && matches!(self.value(), LiteralValue::Integer(_)) => {
                write!(f, "{}", self.lexical)
            }
            (Some(dt), _) => write!(f, "'{}'^^<{}>", escape(self.lexical.as_str()), dt),
            (None, Some(lang)) => write!(f, "'{}'@{}", escape(self.lexical.as_str()), lang),
            (None, None) => write!(f, "'{}'", escape(self.lexical.as_str())),
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Variable appearing in a rule, identified by name and binding slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleVariable {
    pub name: InternedString,
    pub index: usize,
}

impl RuleVariable {
    pub fn new<S: Into<InternedString>>(name: S, index: usize) -> Self {
        Self { name: name.into(), index }
    }
}

impl fmt::Display for RuleVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.as_str().starts_with('?') {
            write!(f, "{}", self.name)
        } else {
            write!(f, "?{}", self.name)
        }
    }
}

/// Compound term `name(arg, ..)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Functor {
    pub name: InternedString,
    pub args: Vec<Node>,
}

impl Functor {
    pub fn new<S: Into<InternedString>>(name: S, args: Vec<Node>) -> Self {
        Self { name: name.into(), args }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// True when no argument contains a variable or wildcard
    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Node::is_ground)
    }
}

impl fmt::Display for Functor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.iter().join(" "))
    }
}

/// An RDF term, a rule variable, a functor or the ANY wildcard
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Node {
    Uri(InternedString),
    Blank(InternedString),
    Literal(Literal),
    Functor(Arc<Functor>),
    Variable(RuleVariable),
    Any,
}

impl Node {
    pub fn uri<S: Into<InternedString>>(uri: S) -> Self {
        Node::Uri(uri.into())
    }

    pub fn blank<S: Into<InternedString>>(label: S) -> Self {
        Node::Blank(label.into())
    }

    pub fn literal(literal: Literal) -> Self {
        Node::Literal(literal)
    }

    pub fn plain<S: Into<InternedString>>(lexical: S) -> Self {
        Node::Literal(Literal::plain(lexical))
    }

    pub fn int(value: i64) -> Self {
        Node::Literal(Literal::integer(value))
    }

    pub fn var<S: Into<InternedString>>(name: S, index: usize) -> Self {
        Node::Variable(RuleVariable::new(name, index))
    }

    pub fn functor<S: Into<InternedString>>(name: S, args: Vec<Node>) -> Self {
        Node::Functor(Arc::new(Functor::new(name, args)))
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, Node::Uri(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Blank(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(_))
    }

    pub fn is_functor(&self) -> bool {
        matches!(self, Node::Functor(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Node::Variable(_))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Node::Any)
    }

    /// Variables and ANY match anything
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Node::Variable(_) | Node::Any)
    }

    /// No variables or wildcards anywhere inside the node
    pub fn is_ground(&self) -> bool {
        match self {
            Node::Variable(_) | Node::Any => false,
            Node::Functor(f) => f.is_ground(),
            _ => true,
        }
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Node::Uri(u) => Some(u.as_str()),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Node::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_functor(&self) -> Option<&Functor> {
        match self {
            Node::Functor(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&RuleVariable> {
        match self {
            Node::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Integer value of a numeric literal node
    pub fn as_integer(&self) -> Option<i64> {
        match self.as_literal()?.value() {
            LiteralValue::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// Term equality extended with literal value equality
    pub fn same_value_as(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Literal(a), Node::Literal(b)) => a.same_value_as(b),
            (Node::Functor(a), Node::Functor(b)) => {
                a.name == b.name
                    && a.args.len() == b.args.len()
                    && a.args.iter().zip(&b.args).all(|(x, y)| x.same_value_as(y))
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Uri(u) => write!(f, "{}", u),
            Node::Blank(b) => write!(f, "_:{}", b),
            Node::Literal(l) => write!(f, "{}", l),
            Node::Functor(func) => write!(f, "{}", func),
            Node::Variable(v) => write!(f, "{}", v),
            Node::Any => write!(f, "*"),
        }
    }
}

impl From<Literal> for Node {
    fn from(literal: Literal) -> Self {
        Node::Literal(literal)
    }
}

impl From<Functor> for Node {
    fn from(functor: Functor) -> Self {
        Node::Functor(Arc::new(functor))
    }
}

/// Ground RDF triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
}

impl Triple {
    pub fn new(subject: Node, predicate: Node, object: Node) -> Self {
        Self { subject, predicate, object }
    }

    /// Convenience constructor over plain URIs
    pub fn uris(subject: &str, predicate: &str, object: &str) -> Self {
        Self::new(Node::uri(subject), Node::uri(predicate), Node::uri(object))
    }

    pub fn matches(&self, pattern: &TriplePattern) -> bool {
        pattern.matches(self)
    }

    /// Triples whose object is a functor are engine-internal
    pub fn has_functor_object(&self) -> bool {
        self.object.is_functor()
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}

/// Triple pattern whose slots may hold variables or ANY
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
}

impl TriplePattern {
    pub fn new(subject: Node, predicate: Node, object: Node) -> Self {
        Self { subject, predicate, object }
    }

    /// The pattern matching every triple
    pub fn any() -> Self {
        Self::new(Node::Any, Node::Any, Node::Any)
    }

    /// Wildcard test, variables act as ANY and are not bound
    pub fn matches(&self, triple: &Triple) -> bool {
        node_matches(&self.subject, &triple.subject)
            && node_matches(&self.predicate, &triple.predicate)
            && node_matches(&self.object, &triple.object)
    }

    pub fn is_ground(&self) -> bool {
        self.subject.is_ground() && self.predicate.is_ground() && self.object.is_ground()
    }

    pub fn to_triple(&self) -> Option<Triple> {
        self.is_ground()
            .then(|| Triple::new(self.subject.clone(), self.predicate.clone(), self.object.clone()))
    }

    pub fn nodes(&self) -> [&Node; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    /// Indices of all variables in the pattern, including inside functors
    pub fn variable_indices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for node in self.nodes() {
            collect_variables(node, &mut indices);
        }
        indices
    }
}

impl From<&Triple> for TriplePattern {
    fn from(triple: &Triple) -> Self {
        Self::new(triple.subject.clone(), triple.predicate.clone(), triple.object.clone())
    }
}

impl From<Triple> for TriplePattern {
    fn from(triple: Triple) -> Self {
        Self::new(triple.subject, triple.predicate, triple.object)
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}

fn node_matches(pattern: &Node, node: &Node) -> bool {
    match (pattern, node) {
        (Node::Any, _) | (Node::Variable(_), _) => true,
        (Node::Functor(p), Node::Functor(n)) => {
            p.name == n.name
                && p.args.len() == n.args.len()
                && p.args.iter().zip(&n.args).all(|(a, b)| node_matches(a, b))
        }
        _ => pattern.same_value_as(node),
    }
}

pub(crate) fn collect_variables(node: &Node, out: &mut Vec<usize>) {
    match node {
        Node::Variable(v) => {
            if !out.contains(&v.index) {
                out.push(v.index);
            }
        }
        Node::Functor(f) => {
            for arg in &f.args {
                collect_variables(arg, out);
            }
        }
        _ => {}
    }
}
