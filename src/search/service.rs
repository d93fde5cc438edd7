use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::{FacetMapping, GroupedResult, ResultGroup, SearchBackend, SearchEntry, SearchQuery};
use crate::error::{ContentServiceError, Result};
use crate::metrics::SearchMetrics;

const UNCLUSTERED_GROUP: &str = "Results";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireworksResult {
    pub found: usize,
    pub entries: Vec<SearchEntry>,
}

pub struct SearchService {
    backend: Arc<dyn SearchBackend>,
}

impl SearchService {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Runs a query; with `cluster` the entries are grouped by type in order
    /// of first appearance.
    pub async fn search(&self, query: &SearchQuery) -> Result<GroupedResult> {
        let term = require_term(&query.query)?;
        let started = Instant::now();
        let page = self.backend.search(query).await?;
        SearchMetrics::record_query("search", started.elapsed().as_secs_f64(), page.found);
        info!("Search '{}' found {} entries", term, page.found);

        if page.entries.is_empty() {
            return Err(self.no_results(term).await);
        }
        let rows_count = page.entries.len();
        let results = if query.cluster {
            cluster_by_type(page.entries)
        } else {
            vec![ResultGroup {
                type_name: UNCLUSTERED_GROUP.to_string(),
                entries_count: rows_count,
                entries: page.entries,
            }]
        };
        Ok(GroupedResult {
            results,
            found: page.found,
            rows_count,
        })
    }

    pub async fn facets(&self) -> Result<FacetMapping> {
        self.backend.facets(None).await
    }

    pub async fn facet_query(&self, query: &SearchQuery) -> Result<FacetMapping> {
        require_term(&query.query)?;
        let facets = self.backend.facets(Some(query)).await?;
        if facets.total_num_found == 0 {
            return Err(self.no_results(query.query.trim()).await);
        }
        Ok(facets)
    }

    pub async fn suggest(&self, term: &str) -> Result<Vec<String>> {
        let term = require_term(term)?;
        let suggestions = self.backend.suggest(term).await?;
        if suggestions.is_empty() {
            return Err(ContentServiceError::not_found(format!(
                "No suggestions found for '{}'",
                term
            )));
        }
        Ok(suggestions)
    }

    pub async fn spellcheck(&self, term: &str) -> Result<Vec<String>> {
        let term = require_term(term)?;
        let suggestions = self.backend.spellcheck(term).await?;
        if suggestions.is_empty() {
            return Err(ContentServiceError::not_found(format!(
                "No spellcheck suggestions found for '{}'",
                term
            )));
        }
        Ok(suggestions)
    }

    /// Search restricted to a single species.
    pub async fn fireworks(&self, query: &SearchQuery) -> Result<FireworksResult> {
        let term = require_term(&query.query)?;
        if query.species.len() != 1 {
            return Err(ContentServiceError::bad_request(
                "Exactly one species is required",
            ));
        }
        let started = Instant::now();
        let page = self.backend.fireworks(query).await?;
        SearchMetrics::record_query("fireworks", started.elapsed().as_secs_f64(), page.found);
        if page.entries.is_empty() {
            return Err(self.no_results(term).await);
        }
        Ok(FireworksResult {
            found: page.found,
            entries: page.entries,
        })
    }

    /// A 404 carrying spellcheck suggestions. A failing spellcheck only loses
    /// the suggestions.
    async fn no_results(&self, term: &str) -> ContentServiceError {
        let suggestions = self.backend.spellcheck(term).await.unwrap_or_default();
        ContentServiceError::NoSearchResults {
            query: term.to_string(),
            suggestions,
        }
    }
}

fn require_term(term: &str) -> Result<&str> {
    let term = term.trim();
    if term.is_empty() {
        return Err(ContentServiceError::bad_request("Query must not be empty"));
    }
    Ok(term)
}

fn cluster_by_type(entries: Vec<SearchEntry>) -> Vec<ResultGroup> {
    let mut groups: Vec<ResultGroup> = Vec::new();
    for entry in entries {
        let type_name = entry
            .exact_type
            .clone()
            .unwrap_or_else(|| "Other".to_string());
        match groups.iter_mut().find(|g| g.type_name == type_name) {
            Some(group) => {
                group.entries_count += 1;
                group.entries.push(entry);
            }
            None => groups.push(ResultGroup {
                type_name,
                entries_count: 1,
                entries: vec![entry],
            }),
        }
    }
    groups
}
