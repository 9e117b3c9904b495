//! # Query Builder
//!
//! [`QueryBuilder`] is the mutable, tree-shaped accumulator behind every
//! [`QueryModel`]. Leaves live in an insertion-ordered keyed map so callers can
//! remove or replace a clause and rebuild; nested groups are child builders
//! owned by their parent.
//!
//! ```
//! use quarry::builder::QueryBuilder;
//! use quarry::types::Occurrence;
//!
//! let mut builder = QueryBuilder::new();
//! builder
//!     .term("_name", "Value")
//!     .or(Occurrence::Sometimes, |group| {
//!         group.term("tag", "red").term("tag", "blue");
//!     });
//! let model = builder.build();
//! assert_eq!(model.query.children.len(), 2);
//! ```

use std::fmt::Display;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, trace};

use crate::errors::QueryError;
use crate::query::{GroupKind, GroupNode, PhraseQuery, QueryModel, QueryNode, RangeQuery, TermQuery};
use crate::types::{Filter, Occurrence, Sort, SortField, SortType, Term};

const AUTO_KEY_PREFIX: &str = "Query_";

/// Per-call options for leaf clauses.
#[derive(Debug, Clone, Default)]
pub struct LeafOptions {
    pub occur: Occurrence,
    pub boost: Option<f32>,
    pub key: Option<String>,
    /// Overrides the builder-level case sensitivity when set.
    pub case_sensitive: Option<bool>,
}

impl LeafOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn occur(mut self, occur: Occurrence) -> Self {
        self.occur = occur;
        self
    }

    #[inline]
    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    #[inline]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[inline]
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }
}

/// Per-call options for range clauses. Both bounds are inclusive by default.
#[derive(Debug, Clone)]
pub struct RangeOptions {
    pub include_min: bool,
    pub include_max: bool,
    pub precision_step: Option<u32>,
    pub occur: Occurrence,
    pub boost: Option<f32>,
    pub key: Option<String>,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            include_min: true,
            include_max: true,
            precision_step: None,
            occur: Occurrence::NotSet,
            boost: None,
            key: None,
        }
    }
}

impl RangeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inclusive(mut self, include_min: bool, include_max: bool) -> Self {
        self.include_min = include_min;
        self.include_max = include_max;
        self
    }

    #[inline]
    pub fn precision_step(mut self, step: u32) -> Self {
        self.precision_step = Some(step);
        self
    }

    #[inline]
    pub fn occur(mut self, occur: Occurrence) -> Self {
        self.occur = occur;
        self
    }

    #[inline]
    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    #[inline]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum LeafKind {
    Term,
    Prefix,
    Wildcard,
    Keyword,
    Fuzzy,
}

impl LeafKind {
    fn wrap(self, query: TermQuery) -> QueryNode {
        match self {
            LeafKind::Term => QueryNode::Term(query),
            LeafKind::Prefix => QueryNode::Prefix(query),
            LeafKind::Wildcard => QueryNode::Wildcard(query),
            LeafKind::Keyword => QueryNode::Keyword(query),
            LeafKind::Fuzzy => QueryNode::Fuzzy(query),
        }
    }
}

/// Mutable query tree. See the module docs for an overview.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    kind: GroupKind,
    matches: Occurrence,
    default_children_occur: Occurrence,
    boost: Option<f32>,
    case_sensitive: bool,
    queries: IndexMap<String, QueryNode>,
    next_key: usize,
    child_groups: Vec<QueryBuilder>,
    current_filter: Option<Filter>,
    sort_fields: Vec<SortField>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Creates an empty root builder. Undecided leaves default to `Always`.
    pub fn new() -> Self {
        Self::with_kind(GroupKind::Root, Occurrence::Always, Occurrence::Always, false)
    }

    /// Creates an empty root builder whose leaves keep their case unless told otherwise.
    pub fn case_sensitive() -> Self {
        Self::with_kind(GroupKind::Root, Occurrence::Always, Occurrence::Always, true)
    }

    fn with_kind(kind: GroupKind, matches: Occurrence, default_children_occur: Occurrence, case_sensitive: bool) -> Self {
        Self {
            kind,
            matches,
            default_children_occur,
            boost: None,
            case_sensitive,
            queries: IndexMap::new(),
            next_key: 0,
            child_groups: Vec::new(),
            current_filter: None,
            sort_fields: Vec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Occurrence this builder contributes when merged into its parent.
    #[inline]
    pub fn occur(&self) -> Occurrence {
        self.matches
    }

    #[inline]
    pub fn default_children_occur(&self) -> Occurrence {
        self.default_children_occur
    }

    #[inline]
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) -> &mut Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Boost applied to this builder's group when it renders parenthesized.
    pub fn set_boost(&mut self, boost: f32) -> &mut Self {
        self.boost = Some(boost);
        self
    }

    // ========== Keyed clause map ==========

    #[inline]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.child_groups.is_empty()
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.queries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&QueryNode> {
        self.queries.get(key)
    }

    #[inline]
    pub fn child_groups(&self) -> &[QueryBuilder] {
        &self.child_groups
    }

    /// Adds a prebuilt node under an auto-generated key. Unset occurrences are
    /// resolved against this builder the same way leaf helpers resolve them.
    pub fn add(&mut self, node: QueryNode) -> &mut Self {
        let node = self.resolve_node(node);
        let key = self.generate_key();
        self.queries.insert(key, node);
        self
    }

    /// Inserts a node under `key`. An existing node with the same key is
    /// replaced in place and returned.
    pub fn insert(&mut self, key: impl Into<String>, node: QueryNode) -> Option<QueryNode> {
        let node = self.resolve_node(node);
        self.queries.insert(key.into(), node)
    }

    /// Swaps the node under an existing `key`, keeping its position. Nothing is
    /// stored when the key is absent.
    pub fn replace(&mut self, key: &str, node: QueryNode) -> Option<QueryNode> {
        let node = self.resolve_node(node);
        let slot = self.queries.get_mut(key)?;
        Some(std::mem::replace(slot, node))
    }

    /// Removes the node stored under `key`, keeping the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<QueryNode> {
        let removed = self.queries.shift_remove(key);
        if removed.is_none() {
            trace!("remove: no clause stored under key {}", key);
        }
        removed
    }

    fn generate_key(&mut self) -> String {
        loop {
            let key = format!("{}{}", AUTO_KEY_PREFIX, self.next_key);
            self.next_key += 1;
            if !self.queries.contains_key(&key) {
                return key;
            }
        }
    }

    fn store(&mut self, key: Option<String>, node: QueryNode) -> &mut Self {
        let key = match key {
            Some(key) => key,
            None => self.generate_key(),
        };
        trace!("storing clause {}", key);
        self.queries.insert(key, node);
        self
    }

    fn resolve_occur(&self, occur: Occurrence) -> Occurrence {
        occur.or(self.default_children_occur)
    }

    fn resolve_node(&self, node: QueryNode) -> QueryNode {
        resolve_node(node, self.default_children_occur)
    }

    // ========== Leaf clauses ==========

    fn leaf(&mut self, kind: LeafKind, field: String, value: String, options: LeafOptions) -> &mut Self {
        let case_sensitive = options.case_sensitive.unwrap_or(self.case_sensitive);
        let term = Term::folded(field, value, case_sensitive);
        let query = TermQuery::new(term, self.resolve_occur(options.occur), options.boost);
        self.store(options.key, kind.wrap(query))
    }

    pub fn term(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.term_with(field, value, LeafOptions::default())
    }

    pub fn term_with(&mut self, field: impl Into<String>, value: impl Into<String>, options: LeafOptions) -> &mut Self {
        self.leaf(LeafKind::Term, field.into(), value.into(), options)
    }

    /// Matches values starting with `value`; the trailing `*` is added when rendering.
    pub fn prefix(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.prefix_with(field, value, LeafOptions::default())
    }

    pub fn prefix_with(&mut self, field: impl Into<String>, value: impl Into<String>, options: LeafOptions) -> &mut Self {
        self.leaf(LeafKind::Prefix, field.into(), value.into(), options)
    }

    /// `value` may contain `*` and `?` wildcards, which are kept verbatim.
    pub fn wildcard(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.wildcard_with(field, value, LeafOptions::default())
    }

    pub fn wildcard_with(&mut self, field: impl Into<String>, value: impl Into<String>, options: LeafOptions) -> &mut Self {
        self.leaf(LeafKind::Wildcard, field.into(), value.into(), options)
    }

    /// Exact, quoted match on an untokenized value.
    pub fn keyword(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.keyword_with(field, value, LeafOptions::default())
    }

    pub fn keyword_with(&mut self, field: impl Into<String>, value: impl Into<String>, options: LeafOptions) -> &mut Self {
        self.leaf(LeafKind::Keyword, field.into(), value.into(), options)
    }

    pub fn fuzzy(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fuzzy_with(field, value, LeafOptions::default())
    }

    pub fn fuzzy_with(&mut self, field: impl Into<String>, value: impl Into<String>, options: LeafOptions) -> &mut Self {
        self.leaf(LeafKind::Fuzzy, field.into(), value.into(), options)
    }

    // ========== Multi-value expansion ==========

    fn expand<I, S>(&mut self, kind: LeafKind, field: &str, values: I, options: LeafOptions) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group = self.child(GroupKind::Or, Occurrence::Sometimes, Occurrence::Sometimes);
        for value in values {
            let leaf_options = LeafOptions {
                occur: options.occur,
                boost: options.boost,
                key: None,
                case_sensitive: options.case_sensitive,
            };
            group.leaf(kind, field.to_string(), value.into(), leaf_options);
        }

        if group.queries.is_empty() {
            debug!("expansion over {} produced no values; skipping group", field);
            return self;
        }
        self.child_groups.push(group);
        self
    }

    /// Adds one implicit `Or` group holding a term per value.
    ///
    /// `options.occur` applies to each term and is resolved against the
    /// implicit group, so unset terms become `Sometimes`. `options.key` is
    /// ignored because the expansion is a child group, not a keyed clause.
    pub fn terms<I, S>(&mut self, field: &str, values: I, options: LeafOptions) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand(LeafKind::Term, field, values, options)
    }

    pub fn keywords<I, S>(&mut self, field: &str, values: I, options: LeafOptions) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand(LeafKind::Keyword, field, values, options)
    }

    pub fn wild_cards<I, S>(&mut self, field: &str, values: I, options: LeafOptions) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand(LeafKind::Wildcard, field, values, options)
    }

    // ========== Phrase ==========

    pub fn phrase<I, F, V>(&mut self, slop: u32, terms: I) -> &mut Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        self.phrase_with(slop, terms, LeafOptions::default())
    }

    /// One phrase node over ordered (field, value) pairs.
    pub fn phrase_with<I, F, V>(&mut self, slop: u32, terms: I, options: LeafOptions) -> &mut Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        let case_sensitive = options.case_sensitive.unwrap_or(self.case_sensitive);
        let terms: Vec<Term> = terms
            .into_iter()
            .map(|(field, value)| Term::folded(field, value, case_sensitive))
            .collect();
        let node = QueryNode::Phrase(PhraseQuery {
            terms,
            slop,
            boost: options.boost,
            matches: self.resolve_occur(options.occur),
        });
        self.store(options.key, node)
    }

    // ========== Ranges ==========

    fn range_query<T>(&self, field: String, lower: T, upper: T, options: &RangeOptions) -> RangeQuery<T> {
        RangeQuery {
            field,
            lower,
            upper,
            include_min: options.include_min,
            include_max: options.include_max,
            precision_step: options.precision_step,
            boost: options.boost,
            matches: self.resolve_occur(options.occur),
        }
    }

    pub fn numeric_range(&mut self, field: impl Into<String>, lower: i32, upper: i32) -> &mut Self {
        self.numeric_range_with(field, lower, upper, RangeOptions::default())
    }

    pub fn numeric_range_with(&mut self, field: impl Into<String>, lower: i32, upper: i32, options: RangeOptions) -> &mut Self {
        let node = QueryNode::IntRange(self.range_query(field.into(), lower, upper, &options));
        self.store(options.key, node)
    }

    pub fn long_range(&mut self, field: impl Into<String>, lower: i64, upper: i64) -> &mut Self {
        self.long_range_with(field, lower, upper, RangeOptions::default())
    }

    pub fn long_range_with(&mut self, field: impl Into<String>, lower: i64, upper: i64, options: RangeOptions) -> &mut Self {
        let node = QueryNode::LongRange(self.range_query(field.into(), lower, upper, &options));
        self.store(options.key, node)
    }

    pub fn double_range(&mut self, field: impl Into<String>, lower: f64, upper: f64) -> &mut Self {
        self.double_range_with(field, lower, upper, RangeOptions::default())
    }

    pub fn double_range_with(&mut self, field: impl Into<String>, lower: f64, upper: f64, options: RangeOptions) -> &mut Self {
        let node = QueryNode::DoubleRange(self.range_query(field.into(), lower, upper, &options));
        self.store(options.key, node)
    }

    /// Lexicographic range over string values. Bounds are not case-folded.
    pub fn term_range(&mut self, field: impl Into<String>, lower: impl Into<String>, upper: impl Into<String>) -> &mut Self {
        self.term_range_with(field, lower, upper, RangeOptions::default())
    }

    pub fn term_range_with(
        &mut self,
        field: impl Into<String>,
        lower: impl Into<String>,
        upper: impl Into<String>,
        options: RangeOptions,
    ) -> &mut Self {
        let node = QueryNode::TextRange(self.range_query(field.into(), lower.into(), upper.into(), &options));
        self.store(options.key, node)
    }

    /// Dates are stored as a long range over epoch milliseconds.
    pub fn date_range(&mut self, field: impl Into<String>, lower: DateTime<Utc>, upper: DateTime<Utc>) -> &mut Self {
        self.date_range_with(field, lower, upper, RangeOptions::default())
    }

    pub fn date_range_with(
        &mut self,
        field: impl Into<String>,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
        options: RangeOptions,
    ) -> &mut Self {
        self.long_range_with(field, lower.timestamp_millis(), upper.timestamp_millis(), options)
    }

    // ========== Groups ==========

    fn child(&self, kind: GroupKind, matches: Occurrence, children_occur: Occurrence) -> QueryBuilder {
        Self::with_kind(kind, matches, children_occur, self.case_sensitive)
    }

    fn push_child(&mut self, child: QueryBuilder) -> &mut QueryBuilder {
        let index = self.child_groups.len();
        self.child_groups.push(child);
        &mut self.child_groups[index]
    }

    /// Appends an `And` group whose undecided children default to `Always`.
    /// An unset `occur` makes the group itself `Always`.
    pub fn and<F>(&mut self, occur: Occurrence, setup: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        let mut group = self.child(GroupKind::And, occur.or(Occurrence::Always), Occurrence::Always);
        setup(&mut group);
        self.child_groups.push(group);
        self
    }

    /// Appends an `Or` group whose undecided children default to `Sometimes`.
    /// An unset `occur` makes the group itself `Sometimes`.
    pub fn or<F>(&mut self, occur: Occurrence, setup: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        let mut group = self.child(GroupKind::Or, occur.or(Occurrence::Sometimes), Occurrence::Sometimes);
        setup(&mut group);
        self.child_groups.push(group);
        self
    }

    fn group_parts(&self, occur: Occurrence, children_occur: Occurrence) -> (GroupKind, Occurrence, Occurrence) {
        let children_occur = children_occur.or(self.default_children_occur);
        let kind = match children_occur {
            Occurrence::Sometimes => GroupKind::Or,
            _ => GroupKind::And,
        };
        (kind, self.resolve_occur(occur), children_occur)
    }

    /// Appends a group and returns it so callers can keep building inside.
    pub fn group<F>(&mut self, occur: Occurrence, children_occur: Occurrence, setup: F) -> &mut QueryBuilder
    where
        F: FnOnce(&mut QueryBuilder),
    {
        let (kind, matches, children_occur) = self.group_parts(occur, children_occur);
        let mut group = self.child(kind, matches, children_occur);
        setup(&mut group);
        self.push_child(group)
    }

    /// Like [`QueryBuilder::group`], but the setup may fail. On failure nothing
    /// is appended and a [`QueryError::GroupCreation`] is returned.
    pub fn try_group<F, E>(&mut self, occur: Occurrence, children_occur: Occurrence, setup: F) -> Result<&mut QueryBuilder, QueryError>
    where
        F: FnOnce(&mut QueryBuilder) -> Result<(), E>,
        E: Display,
    {
        let (kind, matches, children_occur) = self.group_parts(occur, children_occur);
        let mut group = self.child(kind, matches, children_occur);
        setup(&mut group).map_err(|err| QueryError::group_creation(err.to_string()))?;
        Ok(self.push_child(group))
    }

    pub fn create_and_group(&mut self, occur: Occurrence) -> &mut QueryBuilder {
        let group = self.child(GroupKind::And, occur.or(Occurrence::Always), Occurrence::Always);
        self.push_child(group)
    }

    pub fn create_or_group(&mut self, occur: Occurrence) -> &mut QueryBuilder {
        let group = self.child(GroupKind::Or, occur.or(Occurrence::Sometimes), Occurrence::Sometimes);
        self.push_child(group)
    }

    // ========== Sort & filter ==========

    /// Replaces any previously set filter.
    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        if let Some(previous) = &self.current_filter {
            debug!("replacing filter on {} with filter on {}", previous.field, filter.field);
        }
        self.current_filter = Some(filter);
        self
    }

    #[inline]
    pub fn current_filter(&self) -> Option<&Filter> {
        self.current_filter.as_ref()
    }

    pub fn clear_filter(&mut self) -> &mut Self {
        self.current_filter = None;
        self
    }

    pub fn sort(&mut self, field: impl Into<String>, descending: bool, sort_type: SortType) -> &mut Self {
        self.sort_fields.push(SortField::new(field, descending, sort_type));
        self
    }

    // ========== Build ==========

    /// Produces an immutable model of the current state.
    ///
    /// Sort fields recorded inside nested groups follow the parent's, in
    /// declaration order. The nearest filter wins: a filter on this builder
    /// beats one set inside a group, and later groups beat earlier ones.
    pub fn build(&self) -> QueryModel {
        let query = self.build_group();

        let mut sort_fields = Vec::new();
        self.collect_sort_fields(&mut sort_fields);

        let model = QueryModel {
            query,
            sort: Sort::from_fields(&sort_fields),
            filter: self.effective_filter().cloned(),
        };
        debug!(
            "built query model: {} top-level clauses, {} sort fields, filter={}",
            model.query.children.len(),
            sort_fields.len(),
            model.filter.is_some()
        );
        model
    }

    fn build_group(&self) -> GroupNode {
        let mut group = GroupNode::new(self.kind, self.matches);
        group.boost = self.boost;
        group.children.reserve(self.queries.len() + self.child_groups.len());
        group.children.extend(self.queries.values().cloned());
        group
            .children
            .extend(self.child_groups.iter().map(|child| QueryNode::Group(child.build_group())));
        group
    }

    fn collect_sort_fields(&self, out: &mut Vec<SortField>) {
        out.extend(self.sort_fields.iter().cloned());
        for child in &self.child_groups {
            child.collect_sort_fields(out);
        }
    }

    fn effective_filter(&self) -> Option<&Filter> {
        self.current_filter
            .as_ref()
            .or_else(|| self.child_groups.iter().rev().find_map(QueryBuilder::effective_filter))
    }
}

/// Fills every unset occurrence in `node`, using `default` for the node itself
/// and each group's kind default for its descendants.
fn resolve_node(node: QueryNode, default: Occurrence) -> QueryNode {
    match node {
        QueryNode::Group(mut group) => {
            group.matches = group.matches.or(default);
            let children_default = group.kind.default_children_occur();
            group.children = group
                .children
                .into_iter()
                .map(|child| resolve_node(child, children_default))
                .collect();
            QueryNode::Group(group)
        }
        mut leaf => {
            set_leaf_occurrence(&mut leaf, default);
            leaf
        }
    }
}

fn set_leaf_occurrence(node: &mut QueryNode, default: Occurrence) {
    let slot = match node {
        QueryNode::Term(q)
        | QueryNode::Prefix(q)
        | QueryNode::Wildcard(q)
        | QueryNode::Keyword(q)
        | QueryNode::Fuzzy(q) => &mut q.matches,
        QueryNode::Phrase(q) => &mut q.matches,
        QueryNode::IntRange(q) => &mut q.matches,
        QueryNode::LongRange(q) => &mut q.matches,
        QueryNode::DoubleRange(q) => &mut q.matches,
        QueryNode::TextRange(q) => &mut q.matches,
        QueryNode::Group(g) => &mut g.matches,
    };
    *slot = slot.or(default);
}
