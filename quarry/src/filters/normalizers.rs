//! Normalizers that turn parsed filter descriptors into builder clauses.
//!
//! Each normalizer handles one field kind and rejects operators the kind
//! cannot express.

use chrono::{DateTime, NaiveDate, Utc};
use log::warn;

use crate::builder::{LeafOptions, QueryBuilder, RangeOptions};
use crate::errors::QueryError;
use crate::search::{FilterDescriptor, FilterOperator};
use crate::types::{Comparator, Filter, Occurrence};

/// Applies a filter on a numeric field.
///
/// `eq` and `ne` become a single-value range, the comparison operators and
/// one-sided `range` become the model filter, two-sided `range` a range.
pub fn apply_numeric_filter(builder: &mut QueryBuilder, descriptor: FilterDescriptor) -> Result<(), QueryError> {
    let field = descriptor.field.clone();
    match descriptor.operator {
        FilterOperator::Eq | FilterOperator::NotEq => {
            let value = parse_numeric(descriptor.single_value()?)?;
            let occur = negation(&descriptor.operator);
            builder.double_range_with(field, value, value, RangeOptions::new().occur(occur));
            Ok(())
        }
        FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte => {
            let value = parse_numeric(descriptor.single_value()?)?;
            set_filter(builder, Filter::new(field, value, comparator(&descriptor.operator)));
            Ok(())
        }
        FilterOperator::Range => {
            let min = parse_numeric_bound(descriptor.values.first())?;
            let max = parse_numeric_bound(descriptor.values.get(1))?;
            match (min, max) {
                (Some(min), Some(max)) => {
                    builder.double_range(field, min, max);
                }
                (Some(min), None) => set_filter(builder, Filter::new(field, min, Comparator::Gte)),
                (None, Some(max)) => set_filter(builder, Filter::new(field, max, Comparator::Lte)),
                (None, None) => warn!("range filter on {} has no bounds; ignoring", field),
            }
            Ok(())
        }
        FilterOperator::Prefix | FilterOperator::Exact | FilterOperator::Fuzzy => Err(QueryError::invalid_request(format!(
            "Text operators (prefix, exact, fuzzy) are not supported for numeric field {}",
            field
        ))),
    }
}

/// Applies a filter on a date field. Dates are compared as epoch milliseconds.
pub fn apply_date_filter(builder: &mut QueryBuilder, descriptor: FilterDescriptor) -> Result<(), QueryError> {
    let field = descriptor.field.clone();
    match descriptor.operator {
        FilterOperator::Eq | FilterOperator::NotEq => {
            let value = parse_date(descriptor.single_value()?)?;
            let occur = negation(&descriptor.operator);
            builder.date_range_with(field, value, value, RangeOptions::new().occur(occur));
            Ok(())
        }
        FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte => {
            let value = parse_date(descriptor.single_value()?)?;
            set_filter(builder, Filter::new(field, value.timestamp_millis(), comparator(&descriptor.operator)));
            Ok(())
        }
        FilterOperator::Range => {
            let min = parse_date_bound(descriptor.values.first())?;
            let max = parse_date_bound(descriptor.values.get(1))?;
            match (min, max) {
                (Some(min), Some(max)) => {
                    builder.date_range(field, min, max);
                }
                (Some(min), None) => set_filter(builder, Filter::new(field, min.timestamp_millis(), Comparator::Gte)),
                (None, Some(max)) => set_filter(builder, Filter::new(field, max.timestamp_millis(), Comparator::Lte)),
                (None, None) => warn!("range filter on {} has no bounds; ignoring", field),
            }
            Ok(())
        }
        FilterOperator::Prefix | FilterOperator::Exact | FilterOperator::Fuzzy => Err(QueryError::invalid_request(format!(
            "Text operators (prefix, exact, fuzzy) are not supported for date field {}",
            field
        ))),
    }
}

/// Applies a filter on a text or keyword field.
pub fn apply_text_filter(builder: &mut QueryBuilder, descriptor: FilterDescriptor) -> Result<(), QueryError> {
    let required = LeafOptions::new().occur(Occurrence::Always);
    match descriptor.operator {
        FilterOperator::Eq if descriptor.values.len() > 1 => {
            let FilterDescriptor { field, values, .. } = descriptor;
            builder.or(Occurrence::Sometimes, |group| {
                for value in values {
                    group.keyword(field.as_str(), value);
                }
            });
        }
        FilterOperator::Eq | FilterOperator::Exact => {
            let value = descriptor.single_value()?.to_string();
            builder.keyword_with(descriptor.field, value, required);
        }
        FilterOperator::NotEq => {
            let value = descriptor.single_value()?.to_string();
            builder.keyword_with(descriptor.field, value, LeafOptions::new().occur(Occurrence::Never));
        }
        FilterOperator::Prefix => {
            let value = descriptor.single_value()?.to_string();
            builder.prefix_with(descriptor.field, value, required);
        }
        FilterOperator::Fuzzy => {
            let value = descriptor.single_value()?.to_string();
            builder.fuzzy_with(descriptor.field, value, required);
        }
        other => {
            return Err(QueryError::invalid_request(format!(
                "Operator {:?} is not supported for text field {}",
                other, descriptor.field
            )));
        }
    }
    Ok(())
}

/// Parses a numeric bound value, handling "*" and empty as unbounded.
pub fn parse_numeric_bound(value: Option<&String>) -> Result<Option<f64>, QueryError> {
    match value.map(|raw| raw.trim()) {
        Some(trimmed) if !trimmed.is_empty() && trimmed != "*" => parse_numeric(trimmed).map(Some),
        _ => Ok(None),
    }
}

/// Parses a date bound value, handling "*" and empty as unbounded.
pub fn parse_date_bound(value: Option<&String>) -> Result<Option<DateTime<Utc>>, QueryError> {
    match value.map(|raw| raw.trim()) {
        Some(trimmed) if !trimmed.is_empty() && trimmed != "*" => parse_date(trimmed).map(Some),
        _ => Ok(None),
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, QueryError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| QueryError::invalid_request(format!("Invalid date value: {}", raw)))
}

fn parse_numeric(raw: &str) -> Result<f64, QueryError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| QueryError::invalid_request(format!("Invalid numeric value: {}", raw)))
}

fn negation(operator: &FilterOperator) -> Occurrence {
    if *operator == FilterOperator::NotEq {
        Occurrence::Never
    } else {
        Occurrence::Always
    }
}

fn comparator(operator: &FilterOperator) -> Comparator {
    match operator {
        FilterOperator::Gt => Comparator::Gt,
        FilterOperator::Gte => Comparator::Gte,
        FilterOperator::Lt => Comparator::Lt,
        FilterOperator::Lte => Comparator::Lte,
        FilterOperator::NotEq => Comparator::NotEq,
        _ => Comparator::Eq,
    }
}

/// The model carries one filter; a later comparison replaces an earlier one.
fn set_filter(builder: &mut QueryBuilder, filter: Filter) {
    if let Some(previous) = builder.current_filter() {
        warn!(
            "only one comparison filter is supported; {} replaces {}",
            filter.field, previous.field
        );
    }
    builder.filter(filter);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{AzureAdapter, QueryAdapter, SolrAdapter};
    use crate::query::QueryNode;
    use crate::types::FilterValue;
    use chrono::TimeZone;

    fn descriptor(raw: &str) -> FilterDescriptor {
        FilterDescriptor::parse(raw).unwrap()
    }

    #[test]
    fn numeric_bound_handles_wildcards() {
        assert_eq!(parse_numeric_bound(Some(&"*".to_string())).unwrap(), None);
        assert_eq!(parse_numeric_bound(Some(&" ".to_string())).unwrap(), None);
        assert_eq!(parse_numeric_bound(None).unwrap(), None);
        assert_eq!(parse_numeric_bound(Some(&"2.5".to_string())).unwrap(), Some(2.5));
        assert!(parse_numeric_bound(Some(&"abc".to_string())).is_err());
    }

    #[test]
    fn dates_accept_rfc3339_and_plain_days() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2024-03-01").unwrap(), expected);
        assert_eq!(parse_date("2024-03-01T02:00:00+02:00").unwrap(), expected);
        assert!(parse_date("03/01/2024").is_err());
    }

    #[test]
    fn numeric_eq_becomes_point_range() {
        let mut builder = QueryBuilder::new();
        apply_numeric_filter(&mut builder, descriptor("price:eq:10")).unwrap();
        apply_numeric_filter(&mut builder, descriptor("stock:ne:0")).unwrap();
        let model = builder.build();
        match &model.query.children[1] {
            QueryNode::DoubleRange(range) => {
                assert_eq!(range.field, "stock");
                assert_eq!(range.matches, Occurrence::Never);
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn one_sided_range_becomes_filter() {
        let mut builder = QueryBuilder::new();
        apply_numeric_filter(&mut builder, descriptor("price:range:10,*")).unwrap();
        assert!(builder.is_empty());
        let filter = builder.current_filter().unwrap();
        assert_eq!(filter.comparator, Comparator::Gte);
        assert_eq!(filter.value, FilterValue::Number(10.0));
    }

    #[test]
    fn later_comparison_replaces_filter() {
        let mut builder = QueryBuilder::new();
        apply_numeric_filter(&mut builder, descriptor("price:gt:1")).unwrap();
        apply_date_filter(&mut builder, descriptor("created:lt:2024-01-01")).unwrap();
        let filter = builder.current_filter().unwrap();
        assert_eq!(filter.field, "created");
        assert_eq!(filter.value, FilterValue::Number(1_704_067_200_000.0));
    }

    #[test]
    fn text_operators_rejected_for_numeric_fields() {
        let mut builder = QueryBuilder::new();
        let err = apply_numeric_filter(&mut builder, descriptor("price:prefix:1")).unwrap_err();
        assert!(err.to_string().contains("numeric field price"));
    }

    #[test]
    fn multi_value_eq_joins_values_with_or() {
        let mut builder = QueryBuilder::new();
        apply_text_filter(&mut builder, descriptor("status:eq:active|pending")).unwrap();
        let model = builder.build();
        let group = model.query.children[0].as_group().unwrap();
        assert_eq!(group.matches, Occurrence::Sometimes);
        assert_eq!(group.children.len(), 2);
        assert!(group.children.iter().all(|child| child.matches() == Occurrence::Sometimes));

        assert_eq!(AzureAdapter::new().adapt(&model).search, "( status:\"active\" OR status:\"pending\")");
        assert_eq!(SolrAdapter::new().adapt(&model).q, "status:\"active\" OR status:\"pending\"");
    }

    #[test]
    fn comparison_on_text_field_is_rejected() {
        let mut builder = QueryBuilder::new();
        assert!(apply_text_filter(&mut builder, descriptor("status:gt:a")).is_err());
    }
}
