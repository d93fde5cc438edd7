//! Service façades over the graph. Handlers call these; they return domain
//! values or JSON and never touch HTTP types.

use std::sync::Arc;

use crate::error::{ContentServiceError, Result};
use crate::graph::GraphStore;

pub mod discover;
pub mod entities;
pub mod events;
pub mod orthology;
pub mod participants;
pub mod pathways;
pub mod person;
pub mod query;
pub mod schema;
pub mod species;
pub mod traversal;

pub use discover::DiscoverService;
pub use entities::EntitiesService;
pub use events::EventsService;
pub use orthology::OrthologyService;
pub use participants::ParticipantsService;
pub use pathways::PathwaysService;
pub use person::PersonService;
pub use query::QueryService;
pub use schema::SchemaService;
pub use species::SpeciesService;

/// Empty listings are reported as missing content.
pub(crate) fn non_empty<T>(items: Vec<T>, what: impl FnOnce() -> String) -> Result<Vec<T>> {
    if items.is_empty() {
        Err(ContentServiceError::NotFound(what()))
    } else {
        Ok(items)
    }
}

/// Every graph-backed service, built once at startup and shared by handlers.
pub struct Services {
    pub query: QueryService,
    pub species: SpeciesService,
    pub events: EventsService,
    pub participants: ParticipantsService,
    pub entities: EntitiesService,
    pub pathways: PathwaysService,
    pub orthology: OrthologyService,
    pub person: PersonService,
    pub schema: SchemaService,
    pub discover: DiscoverService,
}

impl Services {
    pub fn new(graph: Arc<dyn GraphStore>, base_url: &str) -> Self {
        Self {
            query: QueryService::new(graph.clone()),
            species: SpeciesService::new(graph.clone()),
            events: EventsService::new(graph.clone()),
            participants: ParticipantsService::new(graph.clone()),
            entities: EntitiesService::new(graph.clone()),
            pathways: PathwaysService::new(graph.clone()),
            orthology: OrthologyService::new(graph.clone()),
            person: PersonService::new(graph.clone()),
            schema: SchemaService::new(graph.clone()),
            discover: DiscoverService::new(graph, base_url),
        }
    }
}
