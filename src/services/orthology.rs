use serde_json::{Map, Value};
use std::sync::Arc;

use crate::constants::{INFERRED_TO, MAX_IDS_PER_QUERY};
use crate::domain::{DatabaseObject, Identifier, SpeciesFilter};
use crate::error::{ContentServiceError, Result};
use crate::graph::{self, GraphStore};

/// Computationally inferred equivalents of events and entities in other species.
pub struct OrthologyService {
    graph: Arc<dyn GraphStore>,
}

impl OrthologyService {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    pub async fn orthology(&self, id: &Identifier, species: &SpeciesFilter) -> Result<Value> {
        let object = graph::require(self.graph.as_ref(), id).await?;
        self.inferred(&object, species)
            .await?
            .map(|o| o.to_flat_json())
            .ok_or_else(|| {
                ContentServiceError::not_found(format!(
                    "No orthology found for {} in {}",
                    id,
                    species.0.as_deref().unwrap_or("any species")
                ))
            })
    }

    /// Maps each requested identifier (as given) to its orthologous object.
    /// Identifiers without one are left out.
    pub async fn orthologies(&self, body: &str, species: &SpeciesFilter) -> Result<Value> {
        let ids = Identifier::parse_list(body)?;
        if ids.is_empty() {
            return Err(ContentServiceError::bad_request("No identifiers provided"));
        }
        if ids.len() > MAX_IDS_PER_QUERY {
            return Err(ContentServiceError::bad_request(format!(
                "Too many identifiers: {} (maximum {})",
                ids.len(),
                MAX_IDS_PER_QUERY
            )));
        }
        let mut result = Map::new();
        for id in ids {
            let Some(object) = self.graph.find_by_id(&id).await? else {
                continue;
            };
            if let Some(inferred) = self.inferred(&object, species).await? {
                result.insert(id.to_string(), inferred.to_flat_json());
            }
        }
        if result.is_empty() {
            return Err(ContentServiceError::not_found(
                "No orthologies found for the provided identifiers",
            ));
        }
        Ok(Value::Object(result))
    }

    async fn inferred(
        &self,
        object: &DatabaseObject,
        species: &SpeciesFilter,
    ) -> Result<Option<DatabaseObject>> {
        if species.0.is_some() && species.accepts(object) {
            return Ok(Some(object.clone()));
        }
        Ok(self
            .graph
            .outgoing(object.db_id, &[INFERRED_TO])
            .await?
            .into_iter()
            .map(|r| r.object)
            .find(|o| species.accepts(o)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;
    use serde_json::json;

    #[tokio::test]
    async fn test_orthology_in_mouse() {
        let service = OrthologyService::new(fixture_store());
        let mouse = SpeciesFilter::named("Mus musculus");
        let value = service
            .orthology(&Identifier::parse("R-HSA-300").unwrap(), &mouse)
            .await
            .unwrap();
        assert_eq!(value["stId"], json!("R-MMU-300"));
        assert!(service
            .orthology(&Identifier::DbId(210), &mouse)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_batch_orthologies_keyed_by_request_id() {
        let service = OrthologyService::new(fixture_store());
        let value = service
            .orthologies("R-HSA-100, 300, 210", &SpeciesFilter::named("Mus musculus"))
            .await
            .unwrap();
        assert_eq!(value["R-HSA-100"]["dbId"], json!(1100));
        assert_eq!(value["300"]["dbId"], json!(1300));
        assert!(value.get("210").is_none());
    }
}
