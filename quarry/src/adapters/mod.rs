//! # Backend Adapters
//!
//! An adapter turns a [`QueryModel`] into the native request shape of one
//! search engine. All adapters share the depth-first walk in this module and
//! differ only through their [`Grammar`]:
//!
//! | Rule                               | Azure                  | Solr                         |
//! |------------------------------------|------------------------|------------------------------|
//! | Parenthesize groups of 2+ children | every level            | below the root's own groups  |
//! | `+` on the first leaf of the query | kept                   | dropped                      |
//! | Term/keyword/prefix/wildcard boost | `~N`                   | `^N`                         |
//! | Phrase/fuzzy boost                 | `^N`                   | `^N`                         |
//! | Range filter                       | `(f ge a and f le b)`  | `f:[a TO b]`                 |
//! | Filter connective                  | ` and `                | ` AND `                      |
//!
//! A `Never` group is negated as a whole: `-( … )`, always parenthesized,
//! with its children joined by `AND`.
//!
//! Range nodes never reach query text. Wherever they sit in the tree they are
//! collected, in tree order, into filter clauses, and the model's explicit
//! [`crate::types::Filter`] is appended after them.

pub mod azure;
pub mod solr;

pub use azure::{AzureAdapter, AzureSearchQuery};
pub use solr::{SolrAdapter, SolrQuery};

use log::trace;

use crate::query::{GroupNode, QueryModel, QueryNode, RangeView};
use crate::types::{Occurrence, Term};

/// Serializes a [`QueryModel`] into a backend's native request shape.
///
/// Adapters hold no per-call state and may be reused across calls.
pub trait QueryAdapter {
    type Native;

    fn adapt(&self, model: &QueryModel) -> Self::Native;
}

/// Which leaf a boost suffix is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeafStyle {
    Term,
    Prefix,
    Wildcard,
    Keyword,
    Fuzzy,
    Phrase,
}

/// Backend-specific hooks used by [`render`].
pub(crate) trait Grammar {
    /// Whether a group at `depth` (the root's own groups sit at depth 1) with
    /// two or more rendered children is wrapped in parentheses.
    fn parenthesize(&self, depth: usize) -> bool;

    /// Whether the first leaf written to the query drops its `+` marker.
    fn omit_first_required_marker(&self) -> bool;

    /// Separator placed between the value and the boost factor.
    fn boost_token(&self, style: LeafStyle) -> char;

    fn range_clause(&self, range: &RangeView<'_>) -> String;
}

/// Query text plus the filter clauses collected from range nodes.
#[derive(Debug, Default)]
pub(crate) struct Rendered {
    pub query: String,
    pub range_filters: Vec<String>,
}

/// Walks `root` once, producing query text and range filter clauses.
pub(crate) fn render<G: Grammar>(grammar: &G, root: &GroupNode) -> Rendered {
    let mut walker = Walker {
        grammar,
        out: Rendered::default(),
        leaf_written: false,
    };
    walker.visit_group(root, true, 0);
    walker.out
}

struct Walker<'g, G> {
    grammar: &'g G,
    out: Rendered,
    leaf_written: bool,
}

impl<G: Grammar> Walker<'_, G> {
    /// Appends `token`, separated by one space unless the buffer is empty.
    fn push_token(&mut self, token: &str) {
        if !self.out.query.is_empty() {
            self.out.query.push(' ');
        }
        self.out.query.push_str(token);
    }

    fn push_range(&mut self, range: RangeView<'_>) {
        let clause = self.grammar.range_clause(&range);
        trace!("range on {} routed to filter: {}", range.field, clause);
        self.out.range_filters.push(clause);
    }

    fn visit_group(&mut self, group: &GroupNode, omit_leading_operator: bool, depth: usize) {
        let rendered = group.children.iter().filter(|child| child.has_query_text()).count();
        let is_root = group.is_root();
        let negated = !is_root && group.matches == Occurrence::Never;
        let connector = connector(group.matches);

        if rendered > 0 && !is_root && !omit_leading_operator {
            self.push_token(connector);
        }
        let parenthesized =
            !is_root && rendered > 0 && (negated || (rendered > 1 && self.grammar.parenthesize(depth)));
        if parenthesized {
            self.push_token(if negated { "-(" } else { "(" });
        }

        let mut position = 0;
        for child in &group.children {
            let (matches, body, boost, style) = match child {
                QueryNode::Group(nested) => {
                    let has_text = child.has_query_text();
                    self.visit_group(nested, position == 0, depth + 1);
                    if has_text {
                        position += 1;
                    }
                    continue;
                }
                QueryNode::IntRange(q) => {
                    self.push_range(q.view());
                    continue;
                }
                QueryNode::LongRange(q) => {
                    self.push_range(q.view());
                    continue;
                }
                QueryNode::DoubleRange(q) => {
                    self.push_range(q.view());
                    continue;
                }
                QueryNode::TextRange(q) => {
                    self.push_range(q.view());
                    continue;
                }
                QueryNode::Phrase(q) if q.terms.is_empty() => continue,
                QueryNode::Term(q) => (
                    q.matches,
                    format!("{}:{}", q.term.field, escape_term(&q.term.value)),
                    q.boost,
                    LeafStyle::Term,
                ),
                QueryNode::Prefix(q) => (
                    q.matches,
                    format!("{}:{}*", q.term.field, escape_term(q.term.value.trim_end_matches('*'))),
                    q.boost,
                    LeafStyle::Prefix,
                ),
                QueryNode::Wildcard(q) => (
                    q.matches,
                    format!("{}:{}", q.term.field, escape_wildcard(&q.term.value)),
                    q.boost,
                    LeafStyle::Wildcard,
                ),
                QueryNode::Keyword(q) => (
                    q.matches,
                    format!("{}:{}", q.term.field, quote(&q.term.value)),
                    q.boost,
                    LeafStyle::Keyword,
                ),
                QueryNode::Fuzzy(q) => (
                    q.matches,
                    format!("{}:{}~", q.term.field, escape_term(&q.term.value)),
                    q.boost,
                    LeafStyle::Fuzzy,
                ),
                QueryNode::Phrase(q) => (q.matches, phrase_body(&q.terms, q.slop), q.boost, LeafStyle::Phrase),
            };

            if position > 0 && !is_root {
                self.push_token(connector);
            }
            self.emit_leaf(matches, &body, boost, style);
            position += 1;
        }

        if parenthesized {
            self.out.query.push(')');
            if let Some(boost) = group.boost {
                self.out.query.push('^');
                self.out.query.push_str(&format_boost(boost));
            }
        }
    }

    fn emit_leaf(&mut self, matches: Occurrence, body: &str, boost: Option<f32>, style: LeafStyle) {
        assert!(matches.is_set(), "unresolved occurrence reached serialization: {}", body);

        let first = !self.leaf_written;
        self.leaf_written = true;
        let marker = match matches {
            Occurrence::Always if first && self.grammar.omit_first_required_marker() => "",
            Occurrence::Always => "+",
            Occurrence::Never => "-",
            Occurrence::Sometimes | Occurrence::NotSet => "",
        };

        let mut token = String::with_capacity(marker.len() + body.len() + 4);
        token.push_str(marker);
        token.push_str(body);
        if let Some(boost) = boost {
            token.push(self.grammar.boost_token(style));
            token.push_str(&format_boost(boost));
        }
        trace!("leaf rendered: {}", token);
        self.push_token(&token);
    }
}

/// Keyword a group uses before itself and between its children.
///
/// Negation is carried by the `-(` of a `Never` group, never by a keyword.
fn connector(matches: Occurrence) -> &'static str {
    match matches {
        Occurrence::Sometimes => "OR",
        Occurrence::Always | Occurrence::Never | Occurrence::NotSet => "AND",
    }
}

/// Consecutive terms on the same field form one quoted phrase; the slop is
/// written once per phrase. Several phrases are wrapped in parentheses.
fn phrase_body(terms: &[Term], slop: u32) -> String {
    let mut runs: Vec<(&str, Vec<&str>)> = Vec::new();
    for term in terms {
        match runs.last_mut() {
            Some((field, words)) if *field == term.field => words.push(term.value.as_str()),
            _ => runs.push((term.field.as_str(), vec![term.value.as_str()])),
        }
    }

    let parts: Vec<String> = runs
        .into_iter()
        .map(|(field, words)| {
            let mut part = format!("{}:{}", field, quote(&words.join(" ")));
            if slop > 0 {
                part.push('~');
                part.push_str(&slop.to_string());
            }
            part
        })
        .collect();
    if parts.len() == 1 {
        parts.concat()
    } else {
        format!("({})", parts.join(" "))
    }
}

pub(crate) fn format_boost(boost: f32) -> String {
    boost.to_string()
}

/// Escape a term value for Lucene query syntax.
///
/// Every operator character is backslash-escaped, as is whitespace, so the
/// value stays a single term.
///
/// ```
/// use quarry::adapters::escape_term;
///
/// assert_eq!(escape_term("value"), "value");
/// assert_eq!(escape_term("c++"), "c\\+\\+");
/// assert_eq!(escape_term("new york"), "new\\ york");
/// assert_eq!(escape_term("a:b"), "a\\:b");
/// ```
pub fn escape_term(value: &str) -> String {
    escape_with(value, false)
}

/// Like [`escape_term`], but `*` and `?` keep their wildcard meaning.
///
/// ```
/// use quarry::adapters::escape_wildcard;
///
/// assert_eq!(escape_wildcard("te?t*"), "te?t*");
/// assert_eq!(escape_wildcard("a-b*"), "a\\-b*");
/// ```
pub fn escape_wildcard(value: &str) -> String {
    escape_with(value, true)
}

fn escape_with(value: &str, keep_wildcards: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' | '?' if keep_wildcards => escaped.push(ch),
            '+' | '-' | '&' | '|' | '!' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '"' | '~' | '*' | '?' | ':'
            | '\\' | '/' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            c if c.is_whitespace() => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Wrap a value in double quotes, escaping embedded quotes and backslashes.
///
/// ```
/// use quarry::adapters::quote;
///
/// assert_eq!(quote("John Doe"), "\"John Doe\"");
/// assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
/// ```
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}
