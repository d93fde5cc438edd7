use std::sync::Arc;

use crate::graph::{GraphStore, InMemoryGraph};

pub const FIXTURE_GRAPH: &str = include_str!("../tests/fixtures/graph.json");

pub fn fixture_graph() -> InMemoryGraph {
    InMemoryGraph::from_json(FIXTURE_GRAPH).expect("fixture graph parses")
}

pub fn fixture_store() -> Arc<dyn GraphStore> {
    Arc::new(fixture_graph())
}
