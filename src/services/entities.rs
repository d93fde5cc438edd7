use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{non_empty, traversal};
use crate::constants::*;
use crate::domain::{self, DatabaseObject, Identifier};
use crate::error::Result;
use crate::graph::{self, GraphStore};

/// Structures and reactions referring to an entity through one relation.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOf {
    #[serde(rename = "type")]
    pub relation: String,
    pub names: Vec<String>,
    pub st_ids: Vec<String>,
    pub schema_classes: Vec<String>,
}

pub struct EntitiesService {
    graph: Arc<dyn GraphStore>,
}

impl EntitiesService {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    /// Everything inside a complex, set or polymer, recursively.
    pub async fn subunits(&self, id: &Identifier, exclude_structures: bool) -> Result<Vec<Value>> {
        let store = self.graph.as_ref();
        let entity = graph::require_class(store, id, PHYSICAL_ENTITY).await?;
        let subunits = traversal::subunits(store, entity.db_id).await?;
        non_empty(
            subunits
                .iter()
                .filter(|s| !(exclude_structures && domain::is_structure(s)))
                .map(DatabaseObject::to_flat_json)
                .collect(),
            || format!("No subunits found for {}", id),
        )
    }

    pub async fn component_of(&self, id: &Identifier) -> Result<Vec<ComponentOf>> {
        let store = self.graph.as_ref();
        let entity = graph::require(store, id).await?;
        let relations: Vec<&str> = STRUCTURE_RELATIONS
            .iter()
            .chain(PARTICIPANT_RELATIONS)
            .copied()
            .collect();

        let mut grouped: BTreeMap<String, ComponentOf> = BTreeMap::new();
        for referrer in store.incoming(entity.db_id, &relations).await? {
            let group = grouped
                .entry(referrer.relation.clone())
                .or_insert_with(|| ComponentOf {
                    relation: referrer.relation.clone(),
                    names: Vec::new(),
                    st_ids: Vec::new(),
                    schema_classes: Vec::new(),
                });
            group.names.push(referrer.object.display_name.clone());
            if let Some(st_id) = &referrer.object.st_id {
                group.st_ids.push(st_id.clone());
            }
            group.schema_classes.push(referrer.object.schema_class.clone());
        }
        non_empty(grouped.into_values().collect(), || {
            format!("{} is not a component of any other object", id)
        })
    }

    /// Other physical entities sharing a reference entity with this one.
    pub async fn other_forms(&self, id: &Identifier) -> Result<Vec<Value>> {
        let forms = other_forms(self.graph.as_ref(), id).await?;
        non_empty(
            forms.iter().map(DatabaseObject::to_flat_json).collect(),
            || format!("No other forms found for {}", id),
        )
    }
}

pub(crate) async fn other_forms(store: &dyn GraphStore, id: &Identifier) -> Result<Vec<DatabaseObject>> {
    let entity = graph::require_class(store, id, PHYSICAL_ENTITY).await?;
    let mut forms: Vec<DatabaseObject> = Vec::new();
    for reference in store.outgoing(entity.db_id, &[REFERENCE_ENTITY_REL]).await? {
        for form in store
            .incoming(reference.object.db_id, &[REFERENCE_ENTITY_REL])
            .await?
        {
            if form.object.db_id != entity.db_id
                && !forms.iter().any(|f| f.db_id == form.object.db_id)
            {
                forms.push(form.object);
            }
        }
    }
    Ok(forms)
}
