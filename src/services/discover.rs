use serde_json::{json, Value};
use std::sync::Arc;

use crate::constants::*;
use crate::domain::Identifier;
use crate::error::Result;
use crate::graph::{self, GraphStore};

/// schema.org `Dataset` descriptions of events, for search engine crawlers.
pub struct DiscoverService {
    graph: Arc<dyn GraphStore>,
    base_url: String,
}

impl DiscoverService {
    pub fn new(graph: Arc<dyn GraphStore>, base_url: impl Into<String>) -> Self {
        Self {
            graph,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn discover(&self, id: &Identifier) -> Result<Value> {
        let store = self.graph.as_ref();
        let event = graph::require_class(store, id, EVENT).await?;
        let info = store.db_info().await?;
        let identifier = event.st_id.clone().unwrap_or_else(|| event.db_id.to_string());

        let description = store
            .outgoing(event.db_id, &[SUMMATION_REL])
            .await?
            .iter()
            .filter_map(|s| s.object.property_str("text").map(str::to_string))
            .collect::<Vec<_>>()
            .join(" ");
        let description = if description.is_empty() {
            event.display_name.clone()
        } else {
            description
        };

        let mut keywords = vec![event.schema_class.clone()];
        for species in store.outgoing(event.db_id, &[SPECIES_REL]).await? {
            keywords.push(species.object.display_name);
        }

        let mut creators = Vec::new();
        for edit in store.outgoing(event.db_id, &[AUTHORED]).await? {
            for author in store.outgoing(edit.object.db_id, &[AUTHOR]).await? {
                let mut person = json!({
                    "@type": "Person",
                    "name": author.object.display_name,
                });
                if let Some(orcid) = author.object.property_str("orcidId") {
                    person["url"] = Value::from(format!("{}{}", ORCID_URL, orcid));
                }
                if !creators.contains(&person) {
                    creators.push(person);
                }
            }
        }

        let citations: Vec<Value> = store
            .outgoing(event.db_id, &[LITERATURE_REFERENCE_REL])
            .await?
            .iter()
            .map(|r| json!({ "@type": "ScholarlyArticle", "name": r.object.display_name }))
            .collect();

        let mut dataset = json!({
            "@context": "http://schema.org/",
            "@type": "Dataset",
            "name": event.display_name,
            "description": description,
            "identifier": identifier,
            "url": format!("{}/content/detail/{}", self.base_url, identifier),
            "keywords": keywords,
            "creator": creators,
            "citation": citations,
            "license": "https://creativecommons.org/licenses/by/4.0/",
            "version": info.version.to_string(),
            "includedInDataCatalog": {
                "@type": "DataCatalog",
                "name": "Reactome",
                "url": self.base_url,
            },
        });
        if let Some(doi) = event.property_str("doi") {
            dataset["sameAs"] = Value::from(format!("{}{}", DOI_URL, doi));
        }
        if let Some(released) = event.property_str("releaseDate") {
            dataset["datePublished"] = Value::from(released);
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;

    #[tokio::test]
    async fn test_dataset_description() {
        let service = DiscoverService::new(fixture_store(), "https://reactome.org/");
        let value = service.discover(&Identifier::DbId(100)).await.unwrap();
        assert_eq!(value["@type"], json!("Dataset"));
        assert_eq!(value["url"], json!("https://reactome.org/content/detail/R-HSA-100"));
        assert_eq!(value["keywords"], json!(["TopLevelPathway", "Homo sapiens"]));
        assert_eq!(value["creator"][0]["url"], json!("https://orcid.org/0000-0001-2345-6789"));
        assert_eq!(value["version"], json!("87"));
        assert!(value["description"].as_str().unwrap().starts_with("Metabolism processes"));
    }

    #[tokio::test]
    async fn test_entities_are_rejected() {
        let service = DiscoverService::new(fixture_store(), "https://reactome.org");
        assert!(service.discover(&Identifier::DbId(530)).await.is_err());
    }
}
