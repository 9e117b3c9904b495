//! Solr adapter (standard Lucene query parser).
//!
//! Ranges and the model filter are rendered as bracket range queries into a
//! single `fq` expression; the boolean query goes to `q`.

use log::debug;
use serde::Serialize;

use super::{Grammar, LeafStyle, QueryAdapter, escape_term, quote, render};
use crate::config::SolrSettings;
use crate::query::{QueryModel, RangeLiteral, RangeView};
use crate::types::{Comparator, Filter, FilterValue, Occurrence, Sort, SortType, format_numeric};

const FILTER_CONNECTIVE: &str = " AND ";
const MATCH_ALL: &str = "*:*";

/// Native request parts for one Solr `select` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolrQuery {
    pub q: String,
    pub fq: String,
    pub sort: Vec<String>,
    pub default_field: String,
    pub default_operator: String,
}

impl SolrQuery {
    /// Ordered request parameters. Empty parts are left out and an empty
    /// query matches all documents.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(5);
        let q = if self.q.is_empty() { MATCH_ALL } else { self.q.as_str() };
        params.push(("q", q.to_string()));
        if !self.fq.is_empty() {
            params.push(("fq", self.fq.clone()));
        }
        if !self.sort.is_empty() {
            params.push(("sort", self.sort.join(",")));
        }
        if !self.default_field.is_empty() {
            params.push(("df", self.default_field.clone()));
        }
        if !self.default_operator.is_empty() {
            params.push(("q.op", self.default_operator.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolrAdapter {
    settings: SolrSettings,
}

impl SolrAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SolrSettings) -> Self {
        Self { settings }
    }
}

impl QueryAdapter for SolrAdapter {
    type Native = SolrQuery;

    fn adapt(&self, model: &QueryModel) -> SolrQuery {
        let rendered = render(&SolrGrammar, &model.query);

        let mut clauses = rendered.range_filters;
        if let Some(filter) = &model.filter {
            clauses.push(filter_clause(filter));
        }

        let native = SolrQuery {
            q: rendered.query,
            fq: clauses.join(FILTER_CONNECTIVE),
            sort: model.sort.as_ref().map(sort_clauses).unwrap_or_default(),
            default_field: self.settings.default_field.clone(),
            default_operator: self.settings.default_operator.clone(),
        };
        debug!("solr q={:?} fq={:?}", native.q, native.fq);
        native
    }
}

struct SolrGrammar;

impl Grammar for SolrGrammar {
    fn parenthesize(&self, depth: usize) -> bool {
        depth >= 2
    }

    fn omit_first_required_marker(&self) -> bool {
        true
    }

    fn boost_token(&self, _style: LeafStyle) -> char {
        '^'
    }

    fn range_clause(&self, range: &RangeView<'_>) -> String {
        let open = if range.include_min { '[' } else { '{' };
        let close = if range.include_max { ']' } else { '}' };
        let negate = if range.matches == Occurrence::Never { "-" } else { "" };
        format!(
            "{}{}:{}{} TO {}{}",
            negate,
            range.field,
            open,
            range_literal(&range.lower),
            range_literal(&range.upper),
            close
        )
    }
}

fn range_literal(value: &RangeLiteral<'_>) -> String {
    match value {
        RangeLiteral::Number(number) => number.clone(),
        RangeLiteral::Text(text) => quote(text),
    }
}

fn filter_value(value: &FilterValue) -> String {
    match value {
        FilterValue::Text(text) => escape_term(text),
        FilterValue::Number(number) => format_numeric(*number),
        FilterValue::Bool(flag) => flag.to_string(),
    }
}

fn filter_clause(filter: &Filter) -> String {
    let field = &filter.field;
    let value = filter_value(&filter.value);
    match filter.comparator {
        Comparator::Eq => format!("{}:{}", field, value),
        Comparator::NotEq => format!("-{}:{}", field, value),
        Comparator::Gt => format!("{}:{{{} TO *]", field, value),
        Comparator::Gte => format!("{}:[{} TO *]", field, value),
        Comparator::Lt => format!("{}:[* TO {}}}", field, value),
        Comparator::Lte => format!("{}:[* TO {}]", field, value),
    }
}

fn sort_clauses(sort: &Sort) -> Vec<String> {
    sort.fields
        .iter()
        .map(|field| {
            let direction = if field.descending { "desc" } else { "asc" };
            let name = match field.sort_type {
                SortType::Score => "score",
                SortType::DocumentOrder => "_docid_",
                _ => field.field.as_str(),
            };
            format!("{} {}", name, direction)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{QueryBuilder, RangeOptions};

    fn adapt(builder: &QueryBuilder) -> SolrQuery {
        SolrAdapter::new().adapt(&builder.build())
    }

    #[test]
    fn exclusive_bounds_use_curly_brackets() {
        let mut builder = QueryBuilder::new();
        builder.numeric_range_with("age", 0, 10, RangeOptions::new().inclusive(false, true));
        assert_eq!(adapt(&builder).fq, "age:{0 TO 10]");
    }

    #[test]
    fn comparator_filters_map_to_open_ranges() {
        let mut builder = QueryBuilder::new();
        builder.filter(Filter::new("price", 5.0, Comparator::Gt));
        assert_eq!(adapt(&builder).fq, "price:{5 TO *]");

        builder.filter(Filter::new("price", 5.0, Comparator::Lt));
        assert_eq!(adapt(&builder).fq, "price:[* TO 5}");

        builder.filter(Filter::new("status", "in review", Comparator::NotEq));
        assert_eq!(adapt(&builder).fq, "-status:in\\ review");
    }

    #[test]
    fn params_default_to_match_all() {
        let params = adapt(&QueryBuilder::new()).to_params();
        assert_eq!(params[0], ("q", "*:*".to_string()));
        assert!(params.iter().all(|(name, _)| *name != "fq"));
        assert!(params.contains(&("df", "_text_".to_string())));
    }

    #[test]
    fn sort_maps_score_and_document_order() {
        let mut builder = QueryBuilder::new();
        builder
            .sort("relevance", true, SortType::Score)
            .sort("title", false, SortType::String)
            .sort("_id", false, SortType::DocumentOrder);
        assert_eq!(adapt(&builder).sort, vec!["score desc", "title asc", "_docid_ asc"]);
    }
}
