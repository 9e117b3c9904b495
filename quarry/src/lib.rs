//! Quarry core library.
//!
//! Builds backend-neutral search queries and renders them for Azure
//! Cognitive Search and Apache Solr.
//!
//! ```
//! use quarry::{AzureAdapter, Occurrence, QueryAdapter, QueryBuilder};
//!
//! let mut builder = QueryBuilder::new();
//! builder.term("_name", "Value").or(Occurrence::Sometimes, |group| {
//!     group.term("tag", "red").term("tag", "blue");
//! });
//!
//! let native = AzureAdapter::new().adapt(&builder.build());
//! assert_eq!(native.search, "+_name:value OR ( tag:red OR tag:blue)");
//! ```

pub mod adapters;
pub mod builder;
pub mod config;
pub mod errors;
pub mod filters;
pub mod query;
pub mod search;
pub mod types;

pub use adapters::{AzureAdapter, AzureSearchQuery, QueryAdapter, SolrAdapter, SolrQuery};
pub use builder::{LeafOptions, QueryBuilder, RangeOptions};
pub use config::{Backend, QuarryConfig};
pub use errors::*;
pub use query::{GroupKind, GroupNode, PhraseQuery, QueryModel, QueryNode, RangeQuery, TermQuery};
pub use search::{SearchRequest, SearchSchema, SortOrder};
pub use types::{Comparator, Filter, FilterValue, Occurrence, Sort, SortField, SortType, Term};
