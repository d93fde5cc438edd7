use async_trait::async_trait;

use crate::domain::{DatabaseObject, DbId, DbInfo, Identifier, SpeciesFilter};
use crate::error::{ContentServiceError, Result};

pub mod in_memory;
pub mod neo4j;

pub use in_memory::InMemoryGraph;
pub use neo4j::Neo4jGraph;

/// A neighbour reached through a named relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct Related {
    pub relation: String,
    pub object: DatabaseObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Contains,
}

/// Read access to the knowledgebase graph.
///
/// Operations are deliberately primitive; traversal logic lives in the
/// services so every backend behaves the same.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn db_info(&self) -> Result<DbInfo>;

    async fn find_by_id(&self, id: &Identifier) -> Result<Option<DatabaseObject>>;

    async fn find_by_db_ids(&self, ids: &[DbId]) -> Result<Vec<DatabaseObject>>;

    /// Targets of outgoing relationships, all relationship types when
    /// `relations` is empty. Stoichiometry repeats a target.
    async fn outgoing(&self, db_id: DbId, relations: &[&str]) -> Result<Vec<Related>>;

    /// Sources of incoming relationships, all relationship types when
    /// `relations` is empty.
    async fn incoming(&self, db_id: DbId, relations: &[&str]) -> Result<Vec<Related>>;

    async fn find_by_class(
        &self,
        class: &str,
        species: &SpeciesFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DatabaseObject>>;

    async fn count_by_class(&self, class: &str, species: &SpeciesFilter) -> Result<usize>;

    /// Objects of `class` whose string property matches `value`, ignoring case.
    async fn find_by_property(
        &self,
        class: &str,
        property: &str,
        value: &str,
        mode: MatchMode,
    ) -> Result<Vec<DatabaseObject>>;

    async fn find_by_ids(&self, ids: &[Identifier]) -> Result<Vec<DatabaseObject>> {
        let mut objects = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(object) = self.find_by_id(id).await? {
                objects.push(object);
            }
        }
        Ok(objects)
    }
}

/// Looks an object up, turning absence into a 404.
pub async fn require(store: &dyn GraphStore, id: &Identifier) -> Result<DatabaseObject> {
    store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ContentServiceError::not_found(format!("Id: {} has not been found in the System", id)))
}

/// Like [`require`], additionally checking the schema class.
pub async fn require_class(
    store: &dyn GraphStore,
    id: &Identifier,
    class: &str,
) -> Result<DatabaseObject> {
    let object = require(store, id).await?;
    if !object.is_a(class) {
        return Err(ContentServiceError::bad_request(format!(
            "Id: {} is a {}, expected {}",
            id, object.schema_class, class
        )));
    }
    Ok(object)
}
