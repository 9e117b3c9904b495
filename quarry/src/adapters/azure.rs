//! Azure Cognitive Search adapter.
//!
//! Query text follows the Lucene "full" syntax accepted by the `search`
//! parameter; ranges and the model filter become an OData `$filter`
//! expression; sort fields become `$orderby` items.

use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::{Grammar, LeafStyle, QueryAdapter, render};
use crate::config::AzureSettings;
use crate::query::{QueryModel, RangeLiteral, RangeView};
use crate::types::{Comparator, Filter, FilterValue, Occurrence, Sort, SortType, format_numeric};

const FILTER_CONNECTIVE: &str = " and ";
const SCORE_EXPRESSION: &str = "search.score()";

/// Native request parts for one Azure search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureSearchQuery {
    pub search: String,
    pub filter: String,
    pub order_by: Vec<String>,
    pub query_type: String,
    pub search_mode: String,
}

impl AzureSearchQuery {
    /// JSON body for a `POST /indexes/{index}/docs/search` request. Empty
    /// parts are left out and an empty query searches everything.
    pub fn to_request_body(&self) -> JsonValue {
        let mut body = Map::new();
        let search = if self.search.is_empty() { "*" } else { self.search.as_str() };
        body.insert("search".to_string(), JsonValue::from(search));
        if !self.filter.is_empty() {
            body.insert("filter".to_string(), JsonValue::from(self.filter.as_str()));
        }
        if !self.order_by.is_empty() {
            body.insert("orderby".to_string(), JsonValue::from(self.order_by.join(",")));
        }
        body.insert("queryType".to_string(), JsonValue::from(self.query_type.as_str()));
        body.insert("searchMode".to_string(), JsonValue::from(self.search_mode.as_str()));
        JsonValue::Object(body)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AzureAdapter {
    settings: AzureSettings,
}

impl AzureAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: AzureSettings) -> Self {
        Self { settings }
    }
}

impl QueryAdapter for AzureAdapter {
    type Native = AzureSearchQuery;

    fn adapt(&self, model: &QueryModel) -> AzureSearchQuery {
        let rendered = render(&AzureGrammar, &model.query);

        let mut clauses = rendered.range_filters;
        if let Some(filter) = &model.filter {
            clauses.push(filter_clause(filter));
        }

        let native = AzureSearchQuery {
            search: rendered.query,
            filter: clauses.join(FILTER_CONNECTIVE),
            order_by: model.sort.as_ref().map(order_by).unwrap_or_default(),
            query_type: self.settings.query_type.clone(),
            search_mode: self.settings.search_mode.clone(),
        };
        debug!("azure search={:?} filter={:?}", native.search, native.filter);
        native
    }
}

struct AzureGrammar;

impl Grammar for AzureGrammar {
    fn parenthesize(&self, depth: usize) -> bool {
        depth >= 1
    }

    fn omit_first_required_marker(&self) -> bool {
        false
    }

    fn boost_token(&self, style: LeafStyle) -> char {
        match style {
            LeafStyle::Term | LeafStyle::Prefix | LeafStyle::Wildcard | LeafStyle::Keyword => '~',
            LeafStyle::Fuzzy | LeafStyle::Phrase => '^',
        }
    }

    fn range_clause(&self, range: &RangeView<'_>) -> String {
        let lower_op = if range.include_min { "ge" } else { "gt" };
        let upper_op = if range.include_max { "le" } else { "lt" };
        let clause = format!(
            "({field} {lower_op} {lower} and {field} {upper_op} {upper})",
            field = range.field,
            lower = odata_literal(&range.lower),
            upper = odata_literal(&range.upper),
        );
        if range.matches == Occurrence::Never {
            format!("not {}", clause)
        } else {
            clause
        }
    }
}

fn odata_literal(value: &RangeLiteral<'_>) -> String {
    match value {
        RangeLiteral::Number(number) => number.clone(),
        RangeLiteral::Text(text) => odata_string(text),
    }
}

/// OData string literal: single-quoted, embedded quotes doubled.
fn odata_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn filter_clause(filter: &Filter) -> String {
    let op = match filter.comparator {
        Comparator::Eq => "eq",
        Comparator::NotEq => "ne",
        Comparator::Gt => "gt",
        Comparator::Gte => "ge",
        Comparator::Lt => "lt",
        Comparator::Lte => "le",
    };
    let value = match &filter.value {
        FilterValue::Text(text) => odata_string(text),
        FilterValue::Number(number) => format_numeric(*number),
        FilterValue::Bool(flag) => flag.to_string(),
    };
    format!("{} {} {}", filter.field, op, value)
}

fn order_by(sort: &Sort) -> Vec<String> {
    sort.fields
        .iter()
        .filter_map(|field| {
            let direction = if field.descending { "desc" } else { "asc" };
            match field.sort_type {
                SortType::Score => Some(format!("{} {}", SCORE_EXPRESSION, direction)),
                SortType::DocumentOrder => {
                    warn!("azure has no document-order sort; dropping sort on {}", field.field);
                    None
                }
                _ => Some(format!("{} {}", field.field, direction)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{LeafOptions, QueryBuilder};

    fn adapt(builder: &QueryBuilder) -> AzureSearchQuery {
        AzureAdapter::new().adapt(&builder.build())
    }

    #[test]
    fn text_range_bounds_are_quoted() {
        let mut builder = QueryBuilder::new();
        builder.term_range("title", "a", "m'z");
        assert_eq!(adapt(&builder).filter, "(title ge 'a' and title le 'm''z')");
    }

    #[test]
    fn fuzzy_and_phrase_use_caret_boost() {
        let mut builder = QueryBuilder::new();
        builder
            .fuzzy_with("_name", "Value", LeafOptions::new().boost(2.0))
            .phrase_with(3, [("body", "Hello World")], LeafOptions::new().boost(1.5));
        assert_eq!(adapt(&builder).search, "+_name:value~^2 +body:\"hello world\"~3^1.5");
    }

    #[test]
    fn request_body_omits_empty_parts() {
        let body = adapt(&QueryBuilder::new()).to_request_body();
        assert_eq!(body["search"], "*");
        assert!(body.get("filter").is_none());
        assert!(body.get("orderby").is_none());
        assert_eq!(body["queryType"], "full");
    }

    #[test]
    fn score_sort_uses_search_score() {
        let mut builder = QueryBuilder::new();
        builder
            .sort("relevance", true, SortType::Score)
            .sort("_id", false, SortType::DocumentOrder)
            .sort("title", false, SortType::String);
        let native = adapt(&builder);
        assert_eq!(native.order_by, vec!["search.score() desc", "title asc"]);
        assert_eq!(native.to_request_body()["orderby"], "search.score() desc,title asc");
    }
}
