use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::{entities, non_empty, traversal};
use crate::constants::*;
use crate::domain::{DatabaseObject, DbId, Identifier, SpeciesFilter};
use crate::error::{ContentServiceError, Result};
use crate::graph::{self, GraphStore, MatchMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingTarget {
    Pathways,
    Reactions,
}

/// Lowest-level pathways and identifier mapping.
pub struct PathwaysService {
    graph: Arc<dyn GraphStore>,
}

impl PathwaysService {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    /// Pathways directly holding a reaction the entity (or a structure
    /// containing it) takes part in. With `all_forms`, other forms of the
    /// entity count too.
    pub async fn low_level_pathways(
        &self,
        id: &Identifier,
        species: &SpeciesFilter,
        all_forms: bool,
    ) -> Result<Vec<Value>> {
        let pathways = self.lowest_pathways(id, species, all_forms).await?;
        non_empty(
            pathways.iter().map(DatabaseObject::to_flat_json).collect(),
            || format!("No pathways found for {}", id),
        )
    }

    /// Like [`low_level_pathways`](Self::low_level_pathways) but each pathway
    /// without a diagram is replaced by its nearest ancestors that have one.
    pub async fn low_level_pathways_with_diagram(
        &self,
        id: &Identifier,
        species: &SpeciesFilter,
        all_forms: bool,
    ) -> Result<Vec<Value>> {
        let store = self.graph.as_ref();
        let mut out: Vec<DatabaseObject> = Vec::new();
        for pathway in self.lowest_pathways(id, species, all_forms).await? {
            for diagram in diagram_ancestors(store, pathway).await? {
                if !out.iter().any(|p| p.db_id == diagram.db_id) {
                    out.push(diagram);
                }
            }
        }
        out.sort_by_key(|p| p.db_id);
        non_empty(
            out.iter().map(DatabaseObject::to_flat_json).collect(),
            || format!("No pathways with diagram found for {}", id),
        )
    }

    /// Pathways or reactions involving an identifier of an external resource
    /// such as UniProt or ChEBI.
    pub async fn mapping(
        &self,
        resource: &str,
        identifier: &str,
        species: &SpeciesFilter,
        target: MappingTarget,
    ) -> Result<Vec<Value>> {
        let store = self.graph.as_ref();
        let references: Vec<DatabaseObject> = store
            .find_by_property(REFERENCE_ENTITY, "identifier", identifier, MatchMode::Exact)
            .await?
            .into_iter()
            .filter(|r| {
                r.property_str("databaseName")
                    .map_or(false, |db| db.eq_ignore_ascii_case(resource))
            })
            .collect();
        if references.is_empty() {
            return Err(ContentServiceError::not_found(format!(
                "Identifier {} not found in {}",
                identifier, resource
            )));
        }

        let mut entities: Vec<DbId> = Vec::new();
        for reference in &references {
            for entity in store.incoming(reference.db_id, &[REFERENCE_ENTITY_REL]).await? {
                for container in traversal::containers(store, entity.object.db_id).await? {
                    if !entities.contains(&container) {
                        entities.push(container);
                    }
                }
            }
        }
        debug!(
            "{}:{} maps to {} physical entities",
            resource,
            identifier,
            entities.len()
        );

        let reactions = traversal::reactions_with(store, &entities).await?;
        let objects = match target {
            MappingTarget::Reactions => reactions,
            MappingTarget::Pathways => traversal::parent_pathways(store, &reactions).await?,
        };
        non_empty(
            objects
                .iter()
                .filter(|o| species.accepts(o))
                .map(DatabaseObject::to_flat_json)
                .collect(),
            || format!("No results found for {}:{}", resource, identifier),
        )
    }

    async fn lowest_pathways(
        &self,
        id: &Identifier,
        species: &SpeciesFilter,
        all_forms: bool,
    ) -> Result<Vec<DatabaseObject>> {
        let store = self.graph.as_ref();
        let entity = graph::require_class(store, id, PHYSICAL_ENTITY).await?;
        let mut forms = vec![entity.db_id];
        if all_forms {
            forms.extend(
                entities::other_forms(store, id)
                    .await?
                    .into_iter()
                    .map(|f| f.db_id),
            );
        }
        let mut containers: Vec<DbId> = Vec::new();
        for form in forms {
            for container in traversal::containers(store, form).await? {
                if !containers.contains(&container) {
                    containers.push(container);
                }
            }
        }
        let reactions = traversal::reactions_with(store, &containers).await?;
        Ok(traversal::parent_pathways(store, &reactions)
            .await?
            .into_iter()
            .filter(|p| species.accepts(p))
            .collect())
    }
}

/// The pathway itself when it has a diagram, otherwise the closest
/// ancestors that do.
async fn diagram_ancestors(
    store: &dyn GraphStore,
    pathway: DatabaseObject,
) -> Result<Vec<DatabaseObject>> {
    let mut found = Vec::new();
    let mut seen = HashSet::from([pathway.db_id]);
    let mut frontier = vec![pathway];
    while let Some(current) = frontier.pop() {
        if current.property_bool("hasDiagram") {
            found.push(current);
            continue;
        }
        for parent in store.incoming(current.db_id, &[HAS_EVENT]).await? {
            if seen.insert(parent.object.db_id) {
                frontier.push(parent.object);
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;

    fn ids(values: &[Value]) -> Vec<i64> {
        values.iter().map(|v| v["dbId"].as_i64().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_low_level_pathways_through_complex() {
        let service = PathwaysService::new(fixture_store());
        let any = SpeciesFilter::any();
        let hk1 = service
            .low_level_pathways(&Identifier::DbId(530), &any, false)
            .await
            .unwrap();
        assert_eq!(ids(&hk1), vec![200]);
        let g6p = service
            .low_level_pathways(&Identifier::DbId(510), &any, false)
            .await
            .unwrap();
        assert_eq!(ids(&g6p), vec![200, 210]);
    }

    #[tokio::test]
    async fn test_all_forms_and_species_filter() {
        let service = PathwaysService::new(fixture_store());
        let id = Identifier::DbId(501);
        assert!(service
            .low_level_pathways(&id, &SpeciesFilter::any(), false)
            .await
            .is_err());
        let all = service
            .low_level_pathways(&id, &SpeciesFilter::any(), true)
            .await
            .unwrap();
        assert_eq!(ids(&all), vec![200]);
        assert!(service
            .low_level_pathways(&id, &SpeciesFilter::named("Mus musculus"), true)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_diagram_pathways_climb_to_nearest_diagram() {
        let service = PathwaysService::new(fixture_store());
        let pathways = service
            .low_level_pathways_with_diagram(&Identifier::DbId(510), &SpeciesFilter::any(), false)
            .await
            .unwrap();
        // Gluconeogenesis has no diagram; Metabolism stands in for it
        assert_eq!(ids(&pathways), vec![100, 200]);
    }

    #[tokio::test]
    async fn test_mapping_uniprot_identifier() {
        let service = PathwaysService::new(fixture_store());
        let any = SpeciesFilter::any();
        let pathways = service
            .mapping("UniProt", "P19367", &any, MappingTarget::Pathways)
            .await
            .unwrap();
        assert_eq!(ids(&pathways), vec![200]);
        let reactions = service
            .mapping("uniprot", "P19367", &any, MappingTarget::Reactions)
            .await
            .unwrap();
        assert_eq!(ids(&reactions), vec![300]);
        assert!(service
            .mapping("ChEBI", "P19367", &any, MappingTarget::Pathways)
            .await
            .is_err());
    }
}
