//! Golden-string tests for the Azure Cognitive Search adapter.

use chrono::{TimeZone, Utc};
use quarry::{AzureAdapter, AzureSearchQuery, Comparator, Filter, LeafOptions, Occurrence, QueryAdapter, QueryBuilder, RangeOptions, SortType};

fn adapt(builder: &QueryBuilder) -> AzureSearchQuery {
    AzureAdapter::new().adapt(&builder.build())
}

// ============ Leaves ============

#[test]
fn required_term() {
    let mut builder = QueryBuilder::new();
    builder.term("_name", "value");
    assert_eq!(adapt(&builder).search, "+_name:value");
}

#[test]
fn term_boost_uses_tilde() {
    let mut builder = QueryBuilder::new();
    builder.term_with("_name", "value", LeafOptions::new().boost(10.0));
    assert_eq!(adapt(&builder).search, "+_name:value~10");
}

#[test]
fn occurrence_markers() {
    let mut builder = QueryBuilder::new();
    builder.term_with("_name", "value", LeafOptions::new().occur(Occurrence::Sometimes));
    assert_eq!(adapt(&builder).search, "_name:value");

    let mut builder = QueryBuilder::new();
    builder.term_with("_name", "value", LeafOptions::new().occur(Occurrence::Never));
    assert_eq!(adapt(&builder).search, "-_name:value");
}

#[test]
fn keyword_is_quoted() {
    let mut builder = QueryBuilder::new();
    builder.keyword("_name", "value");
    assert_eq!(adapt(&builder).search, "+_name:\"value\"");

    let mut builder = QueryBuilder::new();
    builder.keyword("city", "New York");
    assert_eq!(adapt(&builder).search, "+city:\"new york\"");
}

#[test]
fn prefix_wildcard_and_fuzzy_suffixes() {
    let mut builder = QueryBuilder::new();
    builder.prefix("_name", "val*");
    assert_eq!(adapt(&builder).search, "+_name:val*");

    let mut builder = QueryBuilder::new();
    builder.wildcard("_name", "te?t*");
    assert_eq!(adapt(&builder).search, "+_name:te?t*");

    let mut builder = QueryBuilder::new();
    builder.fuzzy("_name", "value");
    assert_eq!(adapt(&builder).search, "+_name:value~");
}

#[test]
fn term_values_are_escaped() {
    let mut builder = QueryBuilder::new();
    builder.term("city", "new york").term("lang", "c++");
    assert_eq!(adapt(&builder).search, "+city:new\\ york +lang:c\\+\\+");
}

#[test]
fn phrase_with_slop_and_multiple_terms() {
    let mut builder = QueryBuilder::new();
    builder.phrase(0, [("body", "hello world")]);
    assert_eq!(adapt(&builder).search, "+body:\"hello world\"");

    let mut builder = QueryBuilder::new();
    builder.phrase(2, [("body", "Hello"), ("body", "world")]);
    assert_eq!(adapt(&builder).search, "+body:\"hello world\"~2");

    let mut builder = QueryBuilder::new();
    builder.phrase(2, [("title", "a"), ("body", "b")]);
    assert_eq!(adapt(&builder).search, "+(title:\"a\"~2 body:\"b\"~2)");
}

#[test]
fn empty_phrase_renders_nothing() {
    let mut builder = QueryBuilder::new();
    builder.phrase(0, Vec::<(String, String)>::new()).term("_name", "value");
    assert_eq!(adapt(&builder).search, "+_name:value");
}

// ============ Case sensitivity ============

#[test]
fn values_are_lowercased_by_default() {
    let mut builder = QueryBuilder::new();
    builder.term("_Name", "VaLuE");
    assert_eq!(adapt(&builder).search, "+_Name:value");
}

#[test]
fn per_call_case_sensitivity() {
    let mut builder = QueryBuilder::new();
    builder.term_with("_name", "Value", LeafOptions::new().case_sensitive(true));
    assert_eq!(adapt(&builder).search, "+_name:Value");
}

#[test]
fn builder_level_case_sensitivity_reaches_nested_groups() {
    let mut builder = QueryBuilder::case_sensitive();
    builder.term("_name", "Value").and(Occurrence::Always, |group| {
        group.term("_name", "Other").term_with("_name", "Folded", LeafOptions::new().case_sensitive(false));
    });
    assert_eq!(adapt(&builder).search, "+_name:Value AND ( +_name:Other AND +_name:folded)");
}

// ============ Groups ============

#[test]
fn or_group_of_two_terms_is_parenthesized() {
    let mut builder = QueryBuilder::new();
    builder.or(Occurrence::NotSet, |group| {
        group.term("_name", "value1").term("_name", "value2");
    });
    assert_eq!(adapt(&builder).search, "( _name:value1 OR _name:value2)");
}

#[test]
fn single_child_group_is_not_parenthesized() {
    let mut builder = QueryBuilder::new();
    builder.or(Occurrence::Always, |group| {
        group.term("_name", "only");
    });
    assert_eq!(adapt(&builder).search, "_name:only");
}

#[test]
fn nested_groups_carry_their_own_connector() {
    let mut builder = QueryBuilder::new();
    builder.term("_name", "a").or(Occurrence::Sometimes, |group| {
        group.term("tag", "x").and(Occurrence::Always, |inner| {
            inner.term("tag", "y").term("tag", "z");
        });
    });
    assert_eq!(adapt(&builder).search, "+_name:a OR ( tag:x AND ( +tag:y AND +tag:z))");
}

#[test]
fn never_group_is_negated_as_a_whole() {
    let mut builder = QueryBuilder::new();
    builder.and(Occurrence::Never, |group| {
        group.term("a", "x").term("b", "y");
    });
    assert_eq!(adapt(&builder).search, "-( +a:x AND +b:y)");

    let mut builder = QueryBuilder::new();
    builder.term("_name", "value").and(Occurrence::Never, |group| {
        group.term("a", "x").term("b", "y");
    });
    assert_eq!(adapt(&builder).search, "+_name:value AND -( +a:x AND +b:y)");
}

#[test]
fn terms_expansion_builds_or_group() {
    let mut builder = QueryBuilder::new();
    builder.term("_name", "value").terms("tag", ["Red", "Blue"], LeafOptions::new());
    assert_eq!(adapt(&builder).search, "+_name:value OR ( tag:red OR tag:blue)");
}

#[test]
fn group_boost_follows_closing_paren() {
    let mut builder = QueryBuilder::new();
    builder
        .create_or_group(Occurrence::Sometimes)
        .term("_name", "a")
        .term("_name", "b")
        .set_boost(2.0);
    assert_eq!(adapt(&builder).search, "( _name:a OR _name:b)^2");
}

// ============ Ranges & filters ============

#[test]
fn numeric_range_goes_to_filter() {
    let mut builder = QueryBuilder::new();
    builder.numeric_range("field", 0, 10);
    let native = adapt(&builder);
    assert_eq!(native.search, "");
    assert_eq!(native.filter, "(field ge 0 and field le 10)");
    assert_eq!(native.to_request_body()["search"], "*");
}

#[test]
fn exclusive_and_negated_ranges() {
    let mut builder = QueryBuilder::new();
    builder
        .double_range_with("price", 0.5, 10.0, RangeOptions::new().inclusive(false, false))
        .long_range_with("age", 1, 5, RangeOptions::new().occur(Occurrence::Never));
    assert_eq!(
        adapt(&builder).filter,
        "(price gt 0.5 and price lt 10) and not (age ge 1 and age le 5)"
    );
}

#[test]
fn date_range_uses_epoch_millis() {
    let lower = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let upper = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut builder = QueryBuilder::new();
    builder.date_range("created", lower, upper);
    assert_eq!(
        adapt(&builder).filter,
        "(created ge 1704067200000 and created le 1704153600000)"
    );
}

#[test]
fn ranges_inside_groups_leave_query_text_alone() {
    let mut builder = QueryBuilder::new();
    builder.term("_name", "a").and(Occurrence::Always, |group| {
        group.term("_name", "b").numeric_range("age", 1, 5);
    });
    let native = adapt(&builder);
    assert_eq!(native.search, "+_name:a AND +_name:b");
    assert_eq!(native.filter, "(age ge 1 and age le 5)");
}

#[test]
fn explicit_filter_follows_range_filters() {
    let mut builder = QueryBuilder::new();
    builder
        .numeric_range("age", 1, 5)
        .filter(Filter::eq("status", "published"));
    assert_eq!(adapt(&builder).filter, "(age ge 1 and age le 5) and status eq 'published'");

    builder.filter(Filter::new("price", 5.0, Comparator::Gte));
    assert_eq!(adapt(&builder).filter, "(age ge 1 and age le 5) and price ge 5");

    builder.clear_filter().filter(Filter::eq("active", true));
    assert_eq!(adapt(&builder).filter, "(age ge 1 and age le 5) and active eq true");
}

// ============ Re-rendering ============

#[test]
fn build_is_idempotent() {
    let mut builder = QueryBuilder::new();
    builder.term("_name", "value").numeric_range("age", 0, 10);
    let first = adapt(&builder);
    let second = adapt(&builder);
    assert_eq!(first, second);
}

#[test]
fn remove_and_re_add_by_key() {
    let mut builder = QueryBuilder::new();
    builder
        .term_with("_name", "value", LeafOptions::new().key("name"))
        .term("tag", "x");
    assert_eq!(adapt(&builder).search, "+_name:value +tag:x");

    assert!(builder.remove("name").is_some());
    assert_eq!(adapt(&builder).search, "+tag:x");

    builder.term_with("_name", "other", LeafOptions::new().key("name"));
    assert_eq!(adapt(&builder).search, "+tag:x +_name:other");
}

#[test]
fn same_key_replaces_in_place() {
    let mut builder = QueryBuilder::new();
    builder
        .term_with("_name", "first", LeafOptions::new().key("name"))
        .term("tag", "x")
        .term_with("_name", "second", LeafOptions::new().key("name"));
    assert_eq!(adapt(&builder).search, "+_name:second +tag:x");
}

// ============ Sort ============

#[test]
fn nested_sort_fields_are_hoisted() {
    let mut builder = QueryBuilder::new();
    builder
        .sort("title", false, SortType::String)
        .and(Occurrence::Always, |group| {
            group.term("_name", "value").sort("created", true, SortType::Long);
        });
    assert_eq!(adapt(&builder).order_by, vec!["title asc", "created desc"]);
}
