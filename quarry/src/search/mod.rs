//! # Request Parsing
//!
//! Turns loosely typed request parameters into a [`QueryModel`] through the
//! [`QueryBuilder`], validated against a [`SearchSchema`].
//!
//! ## Filter Syntax
//!
//! Each `filter` entry is `field:operator:value`.
//!
//! | Operator                   | Field kinds            | Value              | Builds                        |
//! |----------------------------|------------------------|--------------------|-------------------------------|
//! | `eq`                       | keyword, text          | `a` or `a,b,c`     | keyword leaf / keyword group  |
//! | `eq`, `ne`                 | numeric, date          | single value       | range (negated for `ne`)      |
//! | `ne`                       | keyword, text          | single value       | keyword leaf, `Never`         |
//! | `gt`, `gte`, `lt`, `lte`   | numeric, date          | single value       | model filter                  |
//! | `range`                    | numeric, date          | `min,max` (`*`)    | range, or filter if one-sided |
//! | `prefix`, `exact`, `fuzzy` | keyword, text          | single value       | prefix / keyword / fuzzy leaf |
//!
//! ## Example Usage
//!
//! ```text
//! ?q=dragon riders&filter=status:eq:active|pending&filter=price:range:10,*&sort_by=title
//! ```

use std::sync::LazyLock;

use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use crate::builder::QueryBuilder;
use crate::errors::QueryError;
use crate::filters::{apply_date_filter, apply_numeric_filter, apply_text_filter};
use crate::query::QueryModel;
use crate::types::{Occurrence, SortType};

const VALUE_SEPARATORS: [char; 2] = ['|', ','];

static FIELD_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("valid field name pattern"));

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    #[inline]
    pub const fn is_descending(self) -> bool {
        matches!(self, SortOrder::Desc)
    }
}

/// How a filterable field is indexed, which decides the operators it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Keyword,
    Numeric,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterField {
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedSort {
    /// Name accepted in `sort_by`.
    pub name: String,
    /// Index field the sort applies to.
    pub path: String,
    #[serde(default)]
    pub sort_type: SortType,
    #[serde(default)]
    pub default_order: SortOrder,
}

/// Fields a request may search, filter and sort on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSchema {
    #[serde(default)]
    pub text_fields: Vec<String>,
    #[serde(default)]
    pub filter_fields: Vec<FilterField>,
    #[serde(default)]
    pub allowed_sorts: Vec<AllowedSort>,
    /// Name of the entry in `allowed_sorts` used when `sort_by` is absent.
    #[serde(default)]
    pub default_sort: Option<String>,
}

impl SearchSchema {
    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.filter_fields.iter().find(|field| field.name == name).map(|field| field.kind)
    }

    fn find_sort(&self, name: &str) -> Option<&AllowedSort> {
        self.allowed_sorts.iter().find(|sort| sort.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Range,
    Prefix,
    Exact,
    Fuzzy,
}

impl FilterOperator {
    fn parse(raw: &str) -> Result<Self, QueryError> {
        match raw.to_ascii_lowercase().as_str() {
            "eq" => Ok(FilterOperator::Eq),
            "ne" | "neq" => Ok(FilterOperator::NotEq),
            "gt" => Ok(FilterOperator::Gt),
            "gte" | "ge" => Ok(FilterOperator::Gte),
            "lt" => Ok(FilterOperator::Lt),
            "lte" | "le" => Ok(FilterOperator::Lte),
            "range" => Ok(FilterOperator::Range),
            "prefix" => Ok(FilterOperator::Prefix),
            "exact" => Ok(FilterOperator::Exact),
            "fuzzy" => Ok(FilterOperator::Fuzzy),
            other => Err(QueryError::invalid_request(format!("Unsupported filter operator: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterDescriptor {
    pub field: String,
    pub operator: FilterOperator,
    pub values: Vec<String>,
}

impl FilterDescriptor {
    /// Parses `field:operator:value`. The value may itself contain `:`.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let parts: Vec<&str> = raw.splitn(3, ':').collect();
        if parts.len() != 3 {
            return Err(QueryError::invalid_request(format!("Invalid filter syntax: {}", raw)));
        }

        let field = parts[0].trim();
        if !FIELD_NAME.is_match(field) {
            return Err(QueryError::invalid_request(format!("Invalid filter field name: {}", field)));
        }

        let operator = FilterOperator::parse(parts[1])?;
        let values = match operator {
            FilterOperator::Eq => parts[2]
                .split(VALUE_SEPARATORS)
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
            FilterOperator::Range => parts[2].split(',').map(|segment| segment.trim().to_string()).collect(),
            // Single-valued operators keep the raw value, separators included.
            _ => vec![parts[2].to_string()],
        };

        Ok(Self {
            field: field.to_string(),
            operator,
            values,
        })
    }

    /// First value, or an error naming the field.
    pub fn single_value(&self) -> Result<&str, QueryError> {
        self.values
            .first()
            .map(String::as_str)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| QueryError::invalid_request(format!("Filter on {} requires a value", self.field)))
    }
}

/// Search parameters as they arrive on a request.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SearchRequest {
    pub q: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    #[serde(default)]
    pub filter: Vec<String>,
}

impl SearchRequest {
    /// Parses the request into a builder so callers can keep adding clauses.
    pub fn into_builder(self, schema: &SearchSchema, mut builder: QueryBuilder) -> Result<QueryBuilder, QueryError> {
        if let Some(q) = self.q.as_deref() {
            apply_text_query(&mut builder, q, &schema.text_fields);
        }

        for raw in &self.filter {
            let descriptor = FilterDescriptor::parse(raw)?;
            let kind = schema
                .field_kind(&descriptor.field)
                .ok_or_else(|| QueryError::invalid_request(format!("Unsupported filter field: {}", descriptor.field)))?;
            match kind {
                FieldKind::Numeric => apply_numeric_filter(&mut builder, descriptor)?,
                FieldKind::Date => apply_date_filter(&mut builder, descriptor)?,
                FieldKind::Text | FieldKind::Keyword => apply_text_filter(&mut builder, descriptor)?,
            }
        }

        let sort = match self.sort_by.as_deref() {
            Some(name) => Some(
                schema
                    .find_sort(name)
                    .ok_or_else(|| QueryError::invalid_request(format!("Unsupported sort field: {}", name)))?,
            ),
            None => schema.default_sort.as_deref().and_then(|name| schema.find_sort(name)),
        };
        if let Some(sort) = sort {
            let order = self.sort_order.unwrap_or(sort.default_order);
            builder.sort(sort.path.as_str(), order.is_descending(), sort.sort_type);
        } else if self.sort_order.is_some() {
            warn!("sort_order given without a sort field; ignoring");
        }

        Ok(builder)
    }

    pub fn into_model(self, schema: &SearchSchema) -> Result<QueryModel, QueryError> {
        Ok(self.into_builder(schema, QueryBuilder::new())?.build())
    }
}

/// Adds one `Or` group per whitespace token, matching the token as a prefix
/// in any of `fields`.
///
/// Token groups are `Sometimes`: each token scores a document but none is
/// required. A group's connector follows its occurrence, so a required token
/// group would join its fields with `AND`.
pub fn apply_text_query(builder: &mut QueryBuilder, q: &str, fields: &[String]) {
    let tokens: Vec<&str> = q.split_whitespace().collect();
    if tokens.is_empty() {
        return;
    }
    if fields.is_empty() {
        warn!("text query {:?} ignored: no text fields configured", q);
        return;
    }

    for token in tokens {
        builder.or(Occurrence::Sometimes, |group| {
            for field in fields {
                group.prefix(field.as_str(), token);
            }
        });
    }
}
