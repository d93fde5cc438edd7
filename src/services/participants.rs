use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::{non_empty, traversal};
use crate::constants::*;
use crate::domain::{DatabaseObject, DbId, Identifier};
use crate::error::Result;
use crate::graph::{self, GraphStore};

/// A participating physical entity with the reference entities behind it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub pe_db_id: DbId,
    pub display_name: String,
    pub schema_class: String,
    pub ref_entities: Vec<RefEntity>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefEntity {
    pub db_id: DbId,
    pub display_name: String,
    pub schema_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<&DatabaseObject> for RefEntity {
    fn from(object: &DatabaseObject) -> Self {
        let identifier = object.property_str("identifier").map(str::to_string);
        let database_name = object.property_str("databaseName").map(str::to_string);
        let url = match (database_name.as_deref(), identifier.as_deref()) {
            (Some("UniProt"), Some(id)) => Some(format!("{}{}", UNIPROT_ACCESSION_URL, id)),
            (Some("ChEBI"), Some(id)) => Some(format!("{}{}", CHEBI_ACCESSION_URL, id)),
            _ => None,
        };
        RefEntity {
            db_id: object.db_id,
            display_name: object.display_name.clone(),
            schema_class: object.schema_class.clone(),
            identifier,
            database_name,
            url,
        }
    }
}

pub struct ParticipantsService {
    graph: Arc<dyn GraphStore>,
}

impl ParticipantsService {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    /// Participants of a reaction, or of every reaction below a pathway.
    pub async fn participants(&self, id: &Identifier) -> Result<Vec<Participant>> {
        let store = self.graph.as_ref();
        let mut participants = Vec::new();
        for entity in self.physical_entities(id).await? {
            let references = traversal::reference_entities(store, &entity).await?;
            participants.push(Participant {
                pe_db_id: entity.db_id,
                display_name: entity.display_name,
                schema_class: entity.schema_class,
                ref_entities: references.iter().map(RefEntity::from).collect(),
            });
        }
        Ok(participants)
    }

    pub async fn participating_physical_entities(&self, id: &Identifier) -> Result<Vec<Value>> {
        Ok(self
            .physical_entities(id)
            .await?
            .iter()
            .map(DatabaseObject::to_flat_json)
            .collect())
    }

    pub async fn reference_entities(&self, id: &Identifier) -> Result<Vec<Value>> {
        let store = self.graph.as_ref();
        let mut references: Vec<DatabaseObject> = Vec::new();
        for entity in self.physical_entities(id).await? {
            for reference in traversal::reference_entities(store, &entity).await? {
                if !references.iter().any(|r| r.db_id == reference.db_id) {
                    references.push(reference);
                }
            }
        }
        non_empty(
            references.iter().map(DatabaseObject::to_flat_json).collect(),
            || format!("No reference entities found for {}", id),
        )
    }

    async fn physical_entities(&self, id: &Identifier) -> Result<Vec<DatabaseObject>> {
        let store = self.graph.as_ref();
        let event = graph::require_class(store, id, EVENT).await?;
        let mut entities: Vec<DatabaseObject> = Vec::new();
        for reaction in traversal::reactions_of(store, &event).await? {
            for entity in traversal::reaction_participants(store, reaction.db_id).await? {
                if !entities.iter().any(|e| e.db_id == entity.db_id) {
                    entities.push(entity);
                }
            }
        }
        non_empty(entities, || format!("No participants found for {}", id))
    }
}
