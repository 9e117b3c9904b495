//! Request parameters through to rendered backend queries.

use quarry::{AzureAdapter, QueryAdapter, QueryError, SearchRequest, SearchSchema, SolrAdapter};

const SCHEMA: &str = r#"{
    "text_fields": ["title"],
    "filter_fields": [
        {"name": "status", "kind": "keyword"},
        {"name": "price", "kind": "numeric"},
        {"name": "created", "kind": "date"},
        {"name": "author", "kind": "text"}
    ],
    "allowed_sorts": [
        {"name": "price", "path": "price", "sort_type": "double"},
        {"name": "relevance", "path": "score", "sort_type": "score", "default_order": "desc"}
    ],
    "default_sort": "relevance"
}"#;

fn schema() -> SearchSchema {
    SearchSchema::from_json(SCHEMA).unwrap()
}

fn request(q: Option<&str>, filters: &[&str]) -> SearchRequest {
    SearchRequest {
        q: q.map(str::to_string),
        filter: filters.iter().map(|raw| raw.to_string()).collect(),
        ..Default::default()
    }
}

#[test]
fn text_query_renders_one_group_per_token() {
    let model = request(Some("Dragon riders"), &[]).into_model(&schema()).unwrap();

    let azure = AzureAdapter::new().adapt(&model);
    assert_eq!(azure.search, "title:dragon* OR title:riders*");
    assert_eq!(azure.order_by, vec!["search.score() desc"]);

    let solr = SolrAdapter::new().adapt(&model);
    assert_eq!(solr.q, "title:dragon* OR title:riders*");
    assert_eq!(solr.sort, vec!["score desc"]);
}

#[test]
fn text_tokens_match_any_text_field() {
    let mut schema = schema();
    schema.text_fields.push("body".to_string());
    let model = request(Some("dragon riders"), &[]).into_model(&schema).unwrap();

    assert_eq!(
        AzureAdapter::new().adapt(&model).search,
        "( title:dragon* OR body:dragon*) OR ( title:riders* OR body:riders*)"
    );
    assert_eq!(
        SolrAdapter::new().adapt(&model).q,
        "title:dragon* OR body:dragon* OR title:riders* OR body:riders*"
    );
}

#[test]
fn keyword_filters_render_as_quoted_terms() {
    let model = request(None, &["status:eq:active|pending", "author:ne:bot"])
        .into_model(&schema())
        .unwrap();

    let azure = AzureAdapter::new().adapt(&model);
    assert_eq!(azure.search, "-author:\"bot\" OR ( status:\"active\" OR status:\"pending\")");

    let solr = SolrAdapter::new().adapt(&model);
    assert_eq!(solr.q, "-author:\"bot\" OR status:\"active\" OR status:\"pending\"");
}

#[test]
fn numeric_and_date_filters_reach_the_filter_expression() {
    let model = request(None, &["price:range:10,20", "created:gte:2024-01-01"])
        .into_model(&schema())
        .unwrap();

    let azure = AzureAdapter::new().adapt(&model);
    assert_eq!(azure.search, "");
    assert_eq!(azure.filter, "(price ge 10 and price le 20) and created ge 1704067200000");

    let solr = SolrAdapter::new().adapt(&model);
    assert_eq!(solr.fq, "price:[10 TO 20] AND created:[1704067200000 TO *]");
}

#[test]
fn explicit_sort_overrides_default() {
    let request = SearchRequest {
        sort_by: Some("Price".to_string()),
        ..Default::default()
    };
    let model = request.into_model(&schema()).unwrap();
    assert_eq!(SolrAdapter::new().adapt(&model).sort, vec!["price asc"]);
}

#[test]
fn invalid_parameters_are_rejected() {
    let cases = [
        "price:prefix:1",
        "price:eq:cheap",
        "created:eq:yesterday",
        "status:lt:a",
        "unknown:eq:a",
        "status",
    ];
    for raw in cases {
        let result = request(None, &[raw]).into_model(&schema());
        assert!(
            matches!(result, Err(QueryError::InvalidRequest { .. })),
            "expected {raw} to be rejected"
        );
    }
}
