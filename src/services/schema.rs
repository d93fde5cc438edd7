use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::non_empty;
use crate::constants::{DISEASE, MAX_SCHEMA_MIN_PAGE_SIZE, MAX_SCHEMA_PAGE_SIZE};
use crate::domain::{DatabaseObject, ShallowObject, SpeciesFilter};
use crate::error::{ContentServiceError, Result};
use crate::graph::GraphStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub offset: usize,
}

impl Page {
    /// `page` counts from 1; `offset` is the page size.
    pub fn new(page: Option<usize>, offset: Option<usize>, max: usize) -> Result<Self> {
        let page = page.unwrap_or(1);
        let offset = offset.unwrap_or(max);
        if page == 0 {
            return Err(ContentServiceError::bad_request("Page must be 1 or greater"));
        }
        if offset == 0 || offset > max {
            return Err(ContentServiceError::bad_request(format!(
                "Offset must be between 1 and {}",
                max
            )));
        }
        Ok(Page { page, offset })
    }

    fn skip(&self) -> usize {
        (self.page - 1).saturating_mul(self.offset)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseEntry {
    pub db_id: i64,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

/// Class listings (`/data/schema`) and the disease catalogue.
pub struct SchemaService {
    graph: Arc<dyn GraphStore>,
}

impl SchemaService {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    pub async fn objects(
        &self,
        class: &str,
        species: &SpeciesFilter,
        page: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Value>> {
        let page = Page::new(page, offset, MAX_SCHEMA_PAGE_SIZE)?;
        let objects = self
            .graph
            .find_by_class(class, species, page.skip(), page.offset)
            .await?;
        non_empty(
            objects.iter().map(DatabaseObject::to_flat_json).collect(),
            || format!("No entries found for class {}", class),
        )
    }

    /// Identity fields only, allowing much larger pages.
    pub async fn min_objects(
        &self,
        class: &str,
        species: &SpeciesFilter,
        page: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<ShallowObject>> {
        let page = Page::new(page, offset, MAX_SCHEMA_MIN_PAGE_SIZE)?;
        let objects = self
            .graph
            .find_by_class(class, species, page.skip(), page.offset)
            .await?;
        non_empty(
            objects.iter().map(DatabaseObject::shallow).collect(),
            || format!("No entries found for class {}", class),
        )
    }

    pub async fn count(&self, class: &str, species: &SpeciesFilter) -> Result<usize> {
        self.graph.count_by_class(class, species).await
    }

    pub async fn diseases(&self) -> Result<Vec<DiseaseEntry>> {
        let diseases = self
            .graph
            .find_by_class(DISEASE, &SpeciesFilter::any(), 0, usize::MAX)
            .await?;
        non_empty(
            diseases
                .iter()
                .map(|d| DiseaseEntry {
                    db_id: d.db_id,
                    display_name: d.display_name.clone(),
                    identifier: d.property_str("identifier").map(str::to_string),
                })
                .collect(),
            || "No diseases found".to_string(),
        )
    }

    /// One line per disease: `dbId<TAB>name<TAB>DOID:identifier`.
    pub async fn diseases_doid(&self) -> Result<String> {
        Ok(self
            .diseases()
            .await?
            .iter()
            .map(|d| {
                format!(
                    "{}\t{}\tDOID:{}",
                    d.db_id,
                    d.display_name,
                    d.identifier.as_deref().unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;

    #[test]
    fn test_page_bounds() {
        assert_eq!(Page::new(None, None, 25).unwrap(), Page { page: 1, offset: 25 });
        assert!(Page::new(Some(0), None, 25).is_err());
        assert!(Page::new(Some(1), Some(26), 25).is_err());
        assert_eq!(Page::new(Some(3), Some(10), 25).unwrap().skip(), 20);
    }

    #[tokio::test]
    async fn test_paged_objects() {
        let service = SchemaService::new(fixture_store());
        let human = SpeciesFilter::named("Homo sapiens");
        assert_eq!(service.count("Pathway", &human).await.unwrap(), 4);
        let second = service
            .objects("Pathway", &human, Some(2), Some(3))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert!(service
            .objects("Pathway", &human, Some(3), Some(3))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_min_objects_are_shallow() {
        let service = SchemaService::new(fixture_store());
        let species = service
            .min_objects("Species", &SpeciesFilter::any(), None, Some(100))
            .await
            .unwrap();
        assert_eq!(species.len(), 3);
        assert!(species.iter().all(|s| s.schema_class == "Species"));
    }

    #[tokio::test]
    async fn test_doid_listing() {
        let service = SchemaService::new(fixture_store());
        assert_eq!(
            service.diseases_doid().await.unwrap(),
            "1200\tdiabetes mellitus\tDOID:9351"
        );
    }
}
