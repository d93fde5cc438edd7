//! Full-text search over the knowledgebase index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod service;
pub mod solr;

pub use service::SearchService;
pub use solr::SolrSearch;

/// A search request as received from the client. Filters are ANDed across
/// kinds and ORed within a kind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub query: String,
    pub species: Vec<String>,
    pub types: Vec<String>,
    pub compartments: Vec<String>,
    pub keywords: Vec<String>,
    pub cluster: bool,
    pub start: Option<usize>,
    pub rows: Option<usize>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// One indexed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub db_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub st_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_type: Option<String>,
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summation: Option<String>,
    #[serde(default)]
    pub compartment_names: Vec<String>,
    #[serde(default)]
    pub is_disease: bool,
}

/// Raw page of documents returned by a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub found: usize,
    pub entries: Vec<SearchEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultGroup {
    pub type_name: String,
    pub entries_count: usize,
    pub entries: Vec<SearchEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedResult {
    pub results: Vec<ResultGroup>,
    pub found: usize,
    pub rows_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetEntry {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetList {
    pub available: Vec<FacetEntry>,
    pub selected: Vec<FacetEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetMapping {
    pub total_num_found: usize,
    pub species_facet: FacetList,
    pub type_facet: FacetList,
    pub keyword_facet: FacetList,
    pub compartment_facet: FacetList,
}

/// Search backend port.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage>;

    /// Facet counts over the whole index, or over the matches of `query`.
    async fn facets(&self, query: Option<&SearchQuery>) -> Result<FacetMapping>;

    async fn suggest(&self, term: &str) -> Result<Vec<String>>;

    async fn spellcheck(&self, term: &str) -> Result<Vec<String>>;

    /// Search restricted to events of one species, used by the pathway overview.
    async fn fireworks(&self, query: &SearchQuery) -> Result<SearchPage>;
}
