use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{FacetEntry, FacetList, FacetMapping, SearchBackend, SearchEntry, SearchPage, SearchQuery};
use crate::config::SearchConfig;
use crate::error::{ContentServiceError, Result};
use crate::metrics::SearchMetrics;

const DEFAULT_ROWS: usize = 30;
const SOLR_SPECIAL: &[char] = &[
    '\\', '+', '-', '!', '(', ')', ':', '^', '[', ']', '"', '{', '}', '~', '*', '?', '|', '&', ';',
    '/',
];

const SPECIES_FIELD: &str = "species";
const TYPE_FIELD: &str = "type";
const COMPARTMENT_FIELD: &str = "compartmentName";
const KEYWORDS_FIELD: &str = "keywords";

/// Backslash-escapes Solr query syntax so user input is matched literally.
pub fn escape(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if SOLR_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `field:("a" OR "b")`, or nothing when there are no values.
fn filter(field: &str, values: &[String]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let terms: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
        .collect();
    Some(format!("{}:({})", field, terms.join(" OR ")))
}

#[derive(Debug, Deserialize)]
struct SolrResponse {
    #[serde(default)]
    response: Option<SolrDocs>,
    #[serde(default)]
    facet_counts: Option<FacetCounts>,
    #[serde(default)]
    spellcheck: Option<Spellcheck>,
}

#[derive(Debug, Deserialize)]
struct SolrDocs {
    #[serde(rename = "numFound")]
    num_found: usize,
    #[serde(default)]
    docs: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct FacetCounts {
    #[serde(default)]
    facet_fields: HashMap<String, Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Spellcheck {
    #[serde(default)]
    suggestions: Value,
}

/// Solr over HTTP, `wt=json`.
pub struct SolrSearch {
    client: reqwest::Client,
    base_url: String,
    max_rows: usize,
}

impl SolrSearch {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: format!("{}/{}", config.solr_url.trim_end_matches('/'), config.core),
            max_rows: config.max_rows,
        })
    }

    fn query_params(&self, query: &SearchQuery) -> Vec<(&'static str, String)> {
        let rows = query.rows.unwrap_or(DEFAULT_ROWS).min(self.max_rows);
        let mut params = vec![
            ("q", escape(query.query.trim())),
            ("start", query.start.unwrap_or(0).to_string()),
            ("rows", rows.to_string()),
        ];
        let filters = [
            filter(SPECIES_FIELD, &query.species),
            filter(TYPE_FIELD, &query.types),
            filter(COMPARTMENT_FIELD, &query.compartments),
            filter(KEYWORDS_FIELD, &query.keywords),
        ];
        params.extend(filters.into_iter().flatten().map(|fq| ("fq", fq)));
        params
    }

    #[instrument(skip(self, params))]
    async fn get(&self, handler: &'static str, mut params: Vec<(&'static str, String)>) -> Result<SolrResponse> {
        params.push(("wt", "json".to_string()));
        let url = format!("{}/{}", self.base_url, handler);
        debug!("Solr request {} with {} params", url, params.len());
        let response = self.client.get(&url).query(&params).send().await.map_err(|e| {
            SearchMetrics::record_backend_error(handler);
            ContentServiceError::from(e)
        })?;
        let status = response.status();
        if !status.is_success() {
            SearchMetrics::record_backend_error(handler);
            return Err(ContentServiceError::Search {
                message: format!("Solr {} returned {}", handler, status),
            });
        }
        Ok(response.json::<SolrResponse>().await?)
    }

    fn page(response: SolrResponse) -> SearchPage {
        match response.response {
            Some(docs) => SearchPage {
                found: docs.num_found,
                entries: docs.docs,
            },
            None => SearchPage::default(),
        }
    }
}

/// Solr lists facet counts flat: `["Homo sapiens", 12, "Mus musculus", 3]`.
fn facet_entries(values: &[Value]) -> Vec<FacetEntry> {
    values
        .chunks(2)
        .filter_map(|pair| match pair {
            [Value::String(name), count] => Some(FacetEntry {
                name: name.clone(),
                count: count.as_u64().unwrap_or(0) as usize,
            }),
            _ => None,
        })
        .filter(|entry| entry.count > 0)
        .collect()
}

fn split_selected(entries: Vec<FacetEntry>, selected: &[String]) -> FacetList {
    let (selected, available): (Vec<FacetEntry>, Vec<FacetEntry>) = entries
        .into_iter()
        .partition(|e| selected.iter().any(|s| s.eq_ignore_ascii_case(&e.name)));
    FacetList {
        available,
        selected,
    }
}

/// Words from both spellcheck response layouts: the legacy flat array
/// (`["term", {"suggestion": [...]}, ...]`) and the keyed object.
fn suggestion_words(value: &Value) -> Vec<String> {
    let blocks: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    };
    let mut words: Vec<String> = Vec::new();
    for block in blocks {
        let Some(suggestions) = block.get("suggestion").and_then(Value::as_array) else {
            continue;
        };
        for suggestion in suggestions {
            let word = suggestion
                .as_str()
                .or_else(|| suggestion.get("word").and_then(Value::as_str));
            if let Some(word) = word {
                if !words.iter().any(|w| w == word) {
                    words.push(word.to_string());
                }
            }
        }
    }
    words
}

#[async_trait]
impl SearchBackend for SolrSearch {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        let response = self.get("search", self.query_params(query)).await?;
        Ok(Self::page(response))
    }

    async fn facets(&self, query: Option<&SearchQuery>) -> Result<FacetMapping> {
        let mut params = match query {
            Some(q) => self.query_params(q),
            None => vec![("q", "*:*".to_string())],
        };
        params.retain(|(key, _)| *key != "rows" && *key != "start");
        params.push(("rows", "0".to_string()));
        params.push(("facet", "true".to_string()));
        params.push(("facet.mincount", "1".to_string()));
        for field in ["species_facet", "type_facet", "keywords_facet", "compartment_facet"] {
            params.push(("facet.field", field.to_string()));
        }

        let response = self.get("select", params).await?;
        let total = response.response.as_ref().map_or(0, |r| r.num_found);
        let fields = response.facet_counts.map(|f| f.facet_fields).unwrap_or_default();
        let entries = |name: &str| fields.get(name).map(|v| facet_entries(v)).unwrap_or_default();
        let empty = SearchQuery::default();
        let selected = query.unwrap_or(&empty);

        Ok(FacetMapping {
            total_num_found: total,
            species_facet: split_selected(entries("species_facet"), &selected.species),
            type_facet: split_selected(entries("type_facet"), &selected.types),
            keyword_facet: split_selected(entries("keywords_facet"), &selected.keywords),
            compartment_facet: split_selected(entries("compartment_facet"), &selected.compartments),
        })
    }

    async fn suggest(&self, term: &str) -> Result<Vec<String>> {
        let response = self.get("suggest", vec![("q", escape(term))]).await?;
        Ok(response
            .spellcheck
            .map(|s| suggestion_words(&s.suggestions))
            .unwrap_or_default())
    }

    async fn spellcheck(&self, term: &str) -> Result<Vec<String>> {
        let response = self.get("spellcheck", vec![("q", escape(term))]).await?;
        Ok(response
            .spellcheck
            .map(|s| suggestion_words(&s.suggestions))
            .unwrap_or_default())
    }

    async fn fireworks(&self, query: &SearchQuery) -> Result<SearchPage> {
        let response = self.get("fireworks", self.query_params(query)).await?;
        Ok(Self::page(response))
    }
}
