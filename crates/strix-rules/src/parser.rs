//! Rule text parser

use logos::Logos;
use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;
use tracing::debug;

use crate::error::RuleError;
use crate::loader;
use crate::rule::{ClauseEntry, Rule};
use strix_core::vocabulary::xsd;
use strix_core::{Functor, Literal, Node, PrefixMapping, TriplePattern};

/// Number of recent tokens quoted in parse errors
const MAX_CONTEXT_TOKENS: usize = 20;

/// Rule tokens
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")] // whitespace
enum Token<'a> {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,

    #[token("->")]
    Forward,

    #[token("<-")]
    Backward,

    #[regex(r"<[^<>\s]*>", |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    Uri(&'a str),

    #[regex(r"'([^'\\]|\\.)*'", |lex| unquote(lex.slice()))]
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    Quoted(String),

    #[regex(r#"[^ \t\r\n\f()\[\],'"<][^ \t\r\n\f()\[\],'"]*"#, |lex| lex.slice())]
    Word(&'a str),
}

fn unquote(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Source with comment and directive lines blanked out, so token offsets
/// still map onto the original lines
struct Prepared {
    text: String,
    prefixes: PrefixMapping,
    includes: Vec<String>,
}

fn prepare(source: &str) -> Prepared {
    let mut lines = Vec::new();
    let mut prefixes = PrefixMapping::new();
    let mut includes = Vec::new();

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.starts_with("//") {
            lines.push("");
        } else if let Some(rest) = trimmed.strip_prefix("@prefix") {
            let mut parts = rest.split_whitespace();
            if let (Some(prefix), Some(uri)) = (parts.next(), parts.next()) {
                prefixes.set_prefix(prefix.trim_end_matches(':'), &directive_uri(uri));
            }
            lines.push("");
        } else if let Some(rest) = trimmed.strip_prefix("@include") {
            if let Some(uri) = rest.split_whitespace().next() {
                includes.push(directive_uri(uri));
            }
            lines.push("");
        } else {
            lines.push(line);
        }
    }

    Prepared { text: lines.join("\n"), prefixes, includes }
}

fn directive_uri(token: &str) -> String {
    let token = token.trim_end_matches('.');
    match (token.find('<'), token.find('>')) {
        (Some(start), Some(end)) if start < end => token[start + 1..end].to_string(),
        _ => token.to_string(),
    }
}

/// Configurable entry point for parsing rule text
#[derive(Debug, Clone)]
pub struct RuleParser {
    prefixes: PrefixMapping,
    base_dir: Option<PathBuf>,
}

impl Default for RuleParser {
    fn default() -> Self {
        Self { prefixes: PrefixMapping::standard(), base_dir: None }
    }
}

impl RuleParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: &str, namespace: &str) -> Self {
        self.prefixes.set_prefix(prefix, namespace);
        self
    }

    pub fn with_prefixes(mut self, prefixes: &PrefixMapping) -> Self {
        self.prefixes.extend(prefixes);
        self
    }

    /// Directory against which relative `@include` paths resolve
    pub fn with_base_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn prefixes(&self) -> &PrefixMapping {
        &self.prefixes
    }

    /// Parse every rule in the source, included rulesets first
    pub fn parse(&self, source: &str) -> Result<Vec<Rule>, RuleError> {
        let prepared = prepare(source);
        let mut prefixes = self.prefixes.clone();
        prefixes.extend(&prepared.prefixes);

        let mut rules = Vec::new();
        for include in &prepared.includes {
            rules.extend(loader::resolve_include(include, self.base_dir.as_deref())?);
        }

        let mut parser = Parser::new(&prepared.text, prefixes)?;
        while parser.peek().is_some() {
            rules.push(parser.parse_rule(false)?);
        }
        debug!("Parsed {} rules ({} included rulesets)", rules.len(), prepared.includes.len());
        Ok(rules)
    }

    /// Parse a single rule
    pub fn parse_one(&self, source: &str) -> Result<Rule, RuleError> {
        let prepared = prepare(source);
        let mut prefixes = self.prefixes.clone();
        prefixes.extend(&prepared.prefixes);
        Parser::new(&prepared.text, prefixes)?.parse_rule(false)
    }
}

/// Parse rule text with the standard prefixes
pub fn parse_rules(source: &str) -> Result<Vec<Rule>, RuleError> {
    RuleParser::new().parse(source)
}

/// Parse a single rule with the standard prefixes
pub fn parse_rule(source: &str) -> Result<Rule, RuleError> {
    RuleParser::new().parse_one(source)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token<'a>, Range<usize>)>,
    pos: usize,
    prefixes: PrefixMapping,
    /// Variable table, name -> slot, shared with nested rules
    vars: HashMap<String, usize>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, prefixes: PrefixMapping) -> Result<Self, RuleError> {
        let mut tokens = Vec::new();
        for (token, span) in Token::lexer(source).spanned() {
            match token {
                Ok(Token::Comma) => {}
                Ok(token) => tokens.push((token, span)),
                Err(()) => {
                    let (line, column) = line_col(source, span.start);
                    return Err(RuleError::Parse {
                        message: format!("Unrecognized input '{}'", &source[span]),
                        line,
                        column,
                        context: String::new(),
                    });
                }
            }
        }
        Ok(Self { source, tokens, pos: 0, prefixes, vars: HashMap::new() })
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).map(|(t, _)| t.clone())
    }

    fn peek_is(&self, expected: &Token<'_>) -> bool {
        self.tokens.get(self.pos).map_or(false, |(t, _)| t == expected)
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> RuleError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> RuleError {
        let offset = self
            .tokens
            .get(pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.source.len());
        let (line, column) = line_col(self.source, offset);
        let first = (pos + 1).saturating_sub(MAX_CONTEXT_TOKENS);
        let last = (pos + 1).min(self.tokens.len());
        let context = self.tokens[first.min(last)..last]
            .iter()
            .map(|(_, span)| &self.source[span.clone()])
            .collect::<Vec<_>>()
            .join(" ");
        RuleError::Parse { message: message.into(), line, column, context }
    }

    fn var(&mut self, name: &str) -> Node {
        let next = self.vars.len();
        let index = *self.vars.entry(name.to_string()).or_insert(next);
        Node::var(name, index)
    }

    /// Parse a rule terminated by `]` or `.`. Nested rules keep the enclosing
    /// variable table.
    fn parse_rule(&mut self, nested: bool) -> Result<Rule, RuleError> {
        if self.peek_is(&Token::LBracket) {
            self.pos += 1;
        }

        let mut name = None;
        if let Some(Token::Word(word)) = self.peek() {
            if word.len() > 1 && word.ends_with(':') {
                name = Some(word[..word.len() - 1].to_string());
                self.pos += 1;
            }
        }
        if !nested {
            self.vars.clear();
        }

        let mut body = Vec::new();
        let backward = loop {
            match self.peek() {
                Some(Token::Forward) => break false,
                Some(Token::Backward) => break true,
                None => return Err(self.error("Malformed rule, expected '->' or '<-'")),
                Some(_) => body.push(self.parse_clause()?),
            }
        };
        self.pos += 1;

        let mut head = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBracket) | Some(Token::Word(".")) => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error("Malformed rule, expected ']' or '.'")),
                Some(_) => head.push(self.parse_clause()?),
            }
        }

        Ok(if backward {
            // for a backward rule the parsed "body" is the part before the arrow
            Rule::backward(name, body, head)
        } else {
            Rule::new(name, body, head)
        })
    }

    /// Triple pattern, nested rule or builtin call
    fn parse_clause(&mut self) -> Result<ClauseEntry, RuleError> {
        match self.peek() {
            Some(Token::LParen) => {
                let start = self.pos;
                let mut nodes = self.parse_node_list()?;
                if nodes.len() != 3 {
                    return Err(self.error_at(start, format!("Triple with {} nodes!", nodes.len())));
                }
                if nodes[0].is_functor() {
                    return Err(self.error_at(start, "Functors not allowed in subject position of pattern"));
                }
                if nodes[1].is_functor() {
                    return Err(self.error_at(start, "Functors not allowed in predicate position of pattern"));
                }
                let object = nodes.pop().unwrap_or(Node::Any);
                let predicate = nodes.pop().unwrap_or(Node::Any);
                let subject = nodes.pop().unwrap_or(Node::Any);
                Ok(ClauseEntry::Pattern(TriplePattern::new(subject, predicate, object)))
            }
            Some(Token::LBracket) => Ok(ClauseEntry::Rule(self.parse_rule(true)?.into())),
            Some(Token::Word(name)) => {
                self.pos += 1;
                if !self.peek_is(&Token::LParen) {
                    return Err(self.error(format!("Expected '(' after '{}'", name)));
                }
                let args = self.parse_node_list()?;
                Ok(ClauseEntry::Call(Functor::new(name, args)))
            }
            _ => Err(self.error("Expected a triple pattern, builtin call or nested rule")),
        }
    }

    fn parse_node_list(&mut self) -> Result<Vec<Node>, RuleError> {
        if self.next_token() != Some(Token::LParen) {
            return Err(self.error_at(self.pos.saturating_sub(1), "Expected '(' at start of clause"));
        }
        let mut nodes = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RParen) => {
                    self.pos += 1;
                    return Ok(nodes);
                }
                None
                | Some(Token::LParen)
                | Some(Token::LBracket)
                | Some(Token::RBracket)
                | Some(Token::Forward)
                | Some(Token::Backward) => return Err(self.error("Expected ')' at end of clause")),
                Some(_) => nodes.push(self.parse_node()?),
            }
        }
    }

    fn parse_node(&mut self) -> Result<Node, RuleError> {
        let pos = self.pos;
        match self.next_token() {
            Some(Token::Word(word)) => self.parse_word(pos, word),
            Some(Token::Uri(uri)) => Ok(Node::uri(uri)),
            Some(Token::Quoted(lexical)) => self.parse_literal(lexical),
            _ => Err(self.error_at(pos, "Unexpected token in node position")),
        }
    }

    fn parse_word(&mut self, pos: usize, word: &'a str) -> Result<Node, RuleError> {
        if word.starts_with('?') {
            return Ok(self.var(word));
        }
        if word == "*" || word == "_" {
            return Err(self.error_at(pos, "Wildcard variables are not supported"));
        }
        if let Some(label) = word.strip_prefix("_:").or_else(|| word.strip_prefix('_')) {
            return Ok(Node::blank(label));
        }
        if word.contains(':') {
            return self.expand_qname(pos, word).map(Node::uri);
        }
        if self.peek_is(&Token::LParen) {
            let args = self.parse_node_list()?;
            return Ok(Node::functor(word, args));
        }
        let mut chars = word.chars();
        let starts_numeric = match chars.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some('-') => chars.next().map_or(false, |c| c.is_ascii_digit()),
            _ => false,
        };
        if starts_numeric {
            return Ok(parse_number(word));
        }
        Ok(Node::uri(word))
    }

    fn parse_literal(&mut self, lexical: String) -> Result<Node, RuleError> {
        if let Some(Token::Word(word)) = self.peek() {
            if let Some(datatype) = word.strip_prefix("^^") {
                let pos = self.pos;
                self.pos += 1;
                let datatype = if datatype.starts_with('<') && datatype.ends_with('>') {
                    datatype[1..datatype.len() - 1].to_string()
                } else if datatype.contains(':') {
                    self.expand_qname(pos, datatype)?
                } else {
                    datatype.to_string()
                };
                return Ok(Node::literal(Literal::typed(lexical, datatype)));
            }
            if let Some(language) = word.strip_prefix('@') {
                self.pos += 1;
                return Ok(Node::literal(Literal::with_language(lexical, language)));
            }
        }
        Ok(Node::plain(lexical))
    }

    fn expand_qname(&self, pos: usize, qname: &str) -> Result<String, RuleError> {
        if let Some(expanded) = self.prefixes.expand(qname) {
            return Ok(expanded);
        }
        let prefix = qname.split(':').next().unwrap_or_default();
        if PrefixMapping::is_uri_scheme(prefix) {
            Ok(qname.to_string())
        } else {
            Err(self.error_at(pos, format!("Unrecognized qname prefix ({}) in rule", prefix)))
        }
    }
}

fn parse_number(lexical: &str) -> Node {
    if lexical.contains('.') || lexical.contains('e') || lexical.contains('E') {
        if lexical.parse::<f64>().is_ok() {
            return Node::literal(Literal::typed(lexical, xsd::FLOAT));
        }
    } else if let Ok(value) = lexical.parse::<i64>() {
        return Node::int(value);
    }
    Node::plain(lexical)
}

/// 1-based line and column of a byte offset
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count() + 1)
}
