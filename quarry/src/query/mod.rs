//! # Query AST
//!
//! The backend-independent representation of one logical query. Nodes are
//! plain data: the [`crate::builder::QueryBuilder`] produces them with every
//! occurrence resolved, and the adapters in [`crate::adapters`] only read them.
//!
//! Range nodes are part of the tree but never part of the boolean query text;
//! every adapter routes them into its filter expression instead.

use serde::{Deserialize, Serialize};

use crate::errors::QueryError;
use crate::types::{Filter, Occurrence, Sort, Term};

/// A leaf holding a single field/value pair. Shared by term, prefix, wildcard,
/// keyword and fuzzy nodes; the enclosing [`QueryNode`] variant decides how it
/// renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub term: Term,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
    #[serde(default)]
    pub matches: Occurrence,
}

impl TermQuery {
    pub fn new(term: Term, matches: Occurrence, boost: Option<f32>) -> Self {
        Self { term, boost, matches }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseQuery {
    /// Ordered (field, value) pairs making up the phrase.
    pub terms: Vec<Term>,
    #[serde(default)]
    pub slop: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
    #[serde(default)]
    pub matches: Occurrence,
}

/// Bounded interval over a typed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery<T> {
    pub field: String,
    pub lower: T,
    pub upper: T,
    pub include_min: bool,
    pub include_max: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision_step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
    #[serde(default)]
    pub matches: Occurrence,
}

/// Literal form of a range bound, before any backend quoting.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeLiteral<'a> {
    Number(String),
    Text(&'a str),
}

/// Implemented by every type a [`RangeQuery`] may be built over.
pub trait RangeBound {
    fn literal(&self) -> RangeLiteral<'_>;
}

impl RangeBound for i32 {
    fn literal(&self) -> RangeLiteral<'_> {
        RangeLiteral::Number(self.to_string())
    }
}

impl RangeBound for i64 {
    fn literal(&self) -> RangeLiteral<'_> {
        RangeLiteral::Number(self.to_string())
    }
}

impl RangeBound for f64 {
    fn literal(&self) -> RangeLiteral<'_> {
        RangeLiteral::Number(crate::types::format_numeric(*self))
    }
}

impl RangeBound for String {
    fn literal(&self) -> RangeLiteral<'_> {
        RangeLiteral::Text(self.as_str())
    }
}

/// Type-erased view over any range variant, used by adapters.
#[derive(Debug, Clone)]
pub struct RangeView<'a> {
    pub field: &'a str,
    pub lower: RangeLiteral<'a>,
    pub upper: RangeLiteral<'a>,
    pub include_min: bool,
    pub include_max: bool,
    pub matches: Occurrence,
}

impl<T: RangeBound> RangeQuery<T> {
    pub fn view(&self) -> RangeView<'_> {
        RangeView {
            field: &self.field,
            lower: self.lower.literal(),
            upper: self.upper.literal(),
            include_min: self.include_min,
            include_max: self.include_max,
            matches: self.matches,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Root,
    And,
    Or,
}

impl GroupKind {
    /// Occurrence given to children that do not choose one.
    #[inline]
    pub const fn default_children_occur(self) -> Occurrence {
        match self {
            GroupKind::Root | GroupKind::And => Occurrence::Always,
            GroupKind::Or => Occurrence::Sometimes,
        }
    }
}

/// Boolean container with an ordered child sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub kind: GroupKind,
    #[serde(default)]
    pub matches: Occurrence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
    #[serde(default)]
    pub children: Vec<QueryNode>,
}

impl GroupNode {
    pub fn new(kind: GroupKind, matches: Occurrence) -> Self {
        Self {
            kind,
            matches,
            boost: None,
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.kind == GroupKind::Root
    }
}

/// The closed set of query node kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryNode {
    Term(TermQuery),
    Prefix(TermQuery),
    Wildcard(TermQuery),
    Keyword(TermQuery),
    Fuzzy(TermQuery),
    Phrase(PhraseQuery),
    IntRange(RangeQuery<i32>),
    LongRange(RangeQuery<i64>),
    DoubleRange(RangeQuery<f64>),
    TextRange(RangeQuery<String>),
    Group(GroupNode),
}

impl QueryNode {
    pub fn matches(&self) -> Occurrence {
        match self {
            QueryNode::Term(q)
            | QueryNode::Prefix(q)
            | QueryNode::Wildcard(q)
            | QueryNode::Keyword(q)
            | QueryNode::Fuzzy(q) => q.matches,
            QueryNode::Phrase(q) => q.matches,
            QueryNode::IntRange(q) => q.matches,
            QueryNode::LongRange(q) => q.matches,
            QueryNode::DoubleRange(q) => q.matches,
            QueryNode::TextRange(q) => q.matches,
            QueryNode::Group(g) => g.matches,
        }
    }

    pub fn boost(&self) -> Option<f32> {
        match self {
            QueryNode::Term(q)
            | QueryNode::Prefix(q)
            | QueryNode::Wildcard(q)
            | QueryNode::Keyword(q)
            | QueryNode::Fuzzy(q) => q.boost,
            QueryNode::Phrase(q) => q.boost,
            QueryNode::IntRange(q) => q.boost,
            QueryNode::LongRange(q) => q.boost,
            QueryNode::DoubleRange(q) => q.boost,
            QueryNode::TextRange(q) => q.boost,
            QueryNode::Group(g) => g.boost,
        }
    }

    /// Range nodes render into filter text, never into query text.
    #[inline]
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            QueryNode::IntRange(_) | QueryNode::LongRange(_) | QueryNode::DoubleRange(_) | QueryNode::TextRange(_)
        )
    }

    #[inline]
    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            QueryNode::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn range_view(&self) -> Option<RangeView<'_>> {
        match self {
            QueryNode::IntRange(q) => Some(q.view()),
            QueryNode::LongRange(q) => Some(q.view()),
            QueryNode::DoubleRange(q) => Some(q.view()),
            QueryNode::TextRange(q) => Some(q.view()),
            _ => None,
        }
    }

    /// True when this node contributes anything to query text: a non-range
    /// leaf, or a group with at least one such descendant.
    pub fn has_query_text(&self) -> bool {
        match self {
            QueryNode::Group(g) => g.children.iter().any(QueryNode::has_query_text),
            QueryNode::Phrase(p) => !p.terms.is_empty(),
            node => !node.is_range(),
        }
    }
}

/// Immutable output of [`crate::builder::QueryBuilder::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    pub query: GroupNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

impl QueryModel {
    /// Checks that every node carries a resolved occurrence.
    ///
    /// Models produced by the builder always pass; this exists for models that
    /// arrive from elsewhere, such as JSON.
    pub fn validate(&self) -> Result<(), QueryError> {
        validate_group(&self.query, "root")
    }

    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        let model: QueryModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String, QueryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn validate_group(group: &GroupNode, path: &str) -> Result<(), QueryError> {
    if !group.matches.is_set() {
        return Err(QueryError::UnresolvedOccurrence { path: path.to_string() });
    }
    for (index, child) in group.children.iter().enumerate() {
        let child_path = format!("{}/{}", path, index);
        match child {
            QueryNode::Group(nested) => validate_group(nested, &child_path)?,
            leaf if !leaf.matches().is_set() => {
                return Err(QueryError::UnresolvedOccurrence { path: child_path });
            }
            _ => {}
        }
    }
    Ok(())
}
