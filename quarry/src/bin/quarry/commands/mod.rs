pub mod render;
pub mod request;

use comfy_table::{Cell, Table};
use quarry::{AzureAdapter, Backend, QuarryConfig, QueryAdapter, QueryModel, SolrAdapter};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::output::{OutputManager, TableDisplay};

/// A model rendered for one backend, ready for display.
#[derive(Debug, Serialize)]
pub struct RenderedQuery {
    pub backend: Backend,
    pub query: String,
    pub filter: String,
    pub sort: Vec<String>,
    /// The request as the backend expects it: a JSON body for Azure, query
    /// parameters for Solr.
    pub request: Value,
}

impl RenderedQuery {
    pub fn from_model(model: &QueryModel, config: &QuarryConfig) -> Self {
        match config.quarry.backend {
            Backend::Azure => {
                let native = AzureAdapter::with_settings(config.azure.clone()).adapt(model);
                Self {
                    backend: Backend::Azure,
                    request: native.to_request_body(),
                    query: native.search,
                    filter: native.filter,
                    sort: native.order_by,
                }
            }
            Backend::Solr => {
                let native = SolrAdapter::with_settings(config.solr.clone()).adapt(model);
                let params: Map<String, Value> = native
                    .to_params()
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), Value::String(value)))
                    .collect();
                Self {
                    backend: Backend::Solr,
                    request: Value::Object(params),
                    query: native.q,
                    filter: native.fq,
                    sort: native.sort,
                }
            }
        }
    }
}

impl TableDisplay for RenderedQuery {
    fn to_table(&self, manager: &OutputManager) -> Table {
        let mut table = manager.create_table();
        manager.add_table_header(&mut table, &["Part", "Value"]);
        table.add_row(vec![Cell::new("Backend"), Cell::new(self.backend.as_str())]);
        table.add_row(vec![Cell::new("Query"), Cell::new(&self.query)]);
        table.add_row(vec![Cell::new("Filter"), Cell::new(&self.filter)]);
        table.add_row(vec![Cell::new("Sort"), Cell::new(self.sort.join(", "))]);
        table
    }

    fn to_compact(&self) -> String {
        let mut parts = vec![format!("query={}", self.query)];
        if !self.filter.is_empty() {
            parts.push(format!("filter={}", self.filter));
        }
        if !self.sort.is_empty() {
            parts.push(format!("sort={}", self.sort.join(",")));
        }
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry::QueryBuilder;

    #[test]
    fn solr_request_lists_params() {
        let mut config = QuarryConfig::default();
        config.quarry.backend = Backend::Solr;
        let mut builder = QueryBuilder::new();
        builder.term("_name", "value").numeric_range("age", 0, 10);

        let rendered = RenderedQuery::from_model(&builder.build(), &config);
        assert_eq!(rendered.query, "_name:value");
        assert_eq!(rendered.request["fq"], "age:[0 TO 10]");
        assert_eq!(rendered.to_compact(), "query=_name:value | filter=age:[0 TO 10]");
    }

    #[test]
    fn azure_request_is_json_body() {
        let mut builder = QueryBuilder::new();
        builder.term("_name", "value");

        let rendered = RenderedQuery::from_model(&builder.build(), &QuarryConfig::default());
        assert_eq!(rendered.request["search"], "+_name:value");
        assert_eq!(rendered.request["searchMode"], "all");
    }
}
