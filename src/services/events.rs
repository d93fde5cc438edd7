use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use super::query::value_to_text;
use super::traversal::{self, BoxFuture};
use crate::constants::*;
use crate::domain::{DatabaseObject, DbId, Identifier, ShallowObject, SpeciesFilter};
use crate::error::{ContentServiceError, Result};
use crate::graph::{self, GraphStore};

/// Node of the per-species event tree.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventNode {
    pub st_id: Option<String>,
    pub db_id: DbId,
    pub name: String,
    pub species: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub diagram: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EventNode>,
}

impl EventNode {
    fn leaf(event: &DatabaseObject) -> Self {
        EventNode {
            st_id: event.st_id.clone(),
            db_id: event.db_id,
            name: event.display_name.clone(),
            species: event.property_str("speciesName").map(str::to_string),
            kind: event.schema_class.clone(),
            diagram: event.property_bool("hasDiagram"),
            children: Vec::new(),
        }
    }
}

/// Pathway hierarchy queries.
pub struct EventsService {
    graph: Arc<dyn GraphStore>,
}

impl EventsService {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    pub async fn top_level_pathways(&self, species: &SpeciesFilter) -> Result<Vec<DatabaseObject>> {
        self.graph
            .find_by_class(TOP_LEVEL_PATHWAY, species, 0, usize::MAX)
            .await
    }

    /// Full event tree below every top-level pathway of a species.
    pub async fn hierarchy(&self, species: &SpeciesFilter) -> Result<Vec<EventNode>> {
        let mut roots = Vec::new();
        for pathway in self.top_level_pathways(species).await? {
            let mut path = HashSet::new();
            roots.push(build_node(self.graph.as_ref(), pathway, &mut path).await?);
        }
        Ok(roots)
    }

    /// Every route from the event up to a pathway without parents. Each route
    /// starts with the event itself.
    pub async fn ancestors(&self, id: &Identifier) -> Result<Vec<Vec<ShallowObject>>> {
        let event = graph::require_class(self.graph.as_ref(), id, EVENT).await?;
        let mut routes = Vec::new();
        let mut current = vec![event];
        collect_routes(self.graph.as_ref(), &mut current, &mut routes).await?;
        Ok(routes
            .into_iter()
            .map(|route| route.iter().map(DatabaseObject::shallow).collect())
            .collect())
    }

    pub async fn contained_events(&self, id: &Identifier) -> Result<Vec<DatabaseObject>> {
        let event = graph::require_class(self.graph.as_ref(), id, EVENT).await?;
        traversal::contained_events(self.graph.as_ref(), event.db_id).await
    }

    /// One attribute of every contained event, one value per line.
    pub async fn contained_events_attribute(&self, id: &Identifier, attribute: &str) -> Result<String> {
        let events = self.contained_events(id).await?;
        let values: Vec<String> = events
            .iter()
            .filter_map(|e| e.attribute(attribute))
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::Array(_) => format!("[{}]", value_to_text(&v).replace('\n', ", ")),
                other => value_to_text(&other),
            })
            .collect();
        if values.is_empty() {
            return Err(ContentServiceError::not_found(format!(
                "Attribute '{}' not found in contained events of {}",
                attribute, id
            )));
        }
        Ok(values.join("\n"))
    }
}

fn build_node<'a>(
    store: &'a dyn GraphStore,
    event: DatabaseObject,
    path: &'a mut HashSet<DbId>,
) -> BoxFuture<'a, Result<EventNode>> {
    Box::pin(async move {
        let mut node = EventNode::leaf(&event);
        path.insert(event.db_id);
        for child in store.outgoing(event.db_id, &[HAS_EVENT]).await? {
            // a malformed hierarchy must not loop forever
            if path.contains(&child.object.db_id) {
                continue;
            }
            node.children.push(build_node(store, child.object, path).await?);
        }
        path.remove(&event.db_id);
        Ok(node)
    })
}

fn collect_routes<'a>(
    store: &'a dyn GraphStore,
    current: &'a mut Vec<DatabaseObject>,
    routes: &'a mut Vec<Vec<DatabaseObject>>,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let Some(last) = current.last() else {
            return Ok(());
        };
        let parents: Vec<DatabaseObject> = store
            .incoming(last.db_id, &[HAS_EVENT])
            .await?
            .into_iter()
            .map(|r| r.object)
            .filter(|p| !current.iter().any(|c| c.db_id == p.db_id))
            .collect();
        if parents.is_empty() {
            routes.push(current.clone());
            return Ok(());
        }
        for parent in parents {
            current.push(parent);
            collect_routes(store, current, routes).await?;
            current.pop();
        }
        Ok(())
    })
}
