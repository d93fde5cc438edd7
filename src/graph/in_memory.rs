use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::debug;

use super::{GraphStore, MatchMode, Related};
use crate::domain::{DatabaseObject, DbId, DbInfo, Identifier, SpeciesFilter};
use crate::error::Result;

/// Serialized form accepted by [`InMemoryGraph::from_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphFixture {
    pub db_info: DbInfo,
    pub objects: Vec<DatabaseObject>,
}

#[derive(Default)]
struct Index {
    objects: BTreeMap<DbId, DatabaseObject>,
    by_st_id: HashMap<String, DbId>,
    /// target -> (relation, source), sources ascending by dbId
    incoming: HashMap<DbId, Vec<(String, DbId)>>,
}

/// Graph held in memory for development and testing
pub struct InMemoryGraph {
    db_info: DbInfo,
    index: Arc<RwLock<Index>>,
}

impl InMemoryGraph {
    pub fn new(db_info: DbInfo) -> Self {
        Self {
            db_info,
            index: Arc::new(RwLock::new(Index::default())),
        }
    }

    pub fn from_fixture(fixture: GraphFixture) -> Self {
        let graph = Self::new(fixture.db_info);
        for object in fixture.objects {
            graph.insert(object);
        }
        graph
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let fixture: GraphFixture = serde_json::from_str(json)?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Adds (or replaces) an object and rebuilds the incoming index.
    pub fn insert(&self, object: DatabaseObject) {
        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        if let Some(st_id) = &object.st_id {
            index.by_st_id.insert(st_id.clone(), object.db_id);
        }
        debug!("Indexed object {} ({})", object.db_id, object.schema_class);
        index.objects.insert(object.db_id, object);

        let mut incoming: HashMap<DbId, Vec<(String, DbId)>> = HashMap::new();
        for (source, obj) in &index.objects {
            for (relation, targets) in &obj.relations {
                for target in targets {
                    incoming
                        .entry(*target)
                        .or_default()
                        .push((relation.clone(), *source));
                }
            }
        }
        index.incoming = incoming;
    }

    pub fn len(&self) -> usize {
        self.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Index> {
        self.index.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn relation_selected(relations: &[&str], relation: &str) -> bool {
    relations.is_empty() || relations.contains(&relation)
}

#[async_trait]
impl GraphStore for InMemoryGraph {
    async fn db_info(&self) -> Result<DbInfo> {
        Ok(self.db_info.clone())
    }

    async fn find_by_id(&self, id: &Identifier) -> Result<Option<DatabaseObject>> {
        let index = self.read();
        let db_id = match id {
            Identifier::DbId(db_id) => Some(*db_id),
            Identifier::StId(st_id) => index.by_st_id.get(st_id).copied(),
        };
        Ok(db_id.and_then(|db_id| index.objects.get(&db_id).cloned()))
    }

    async fn find_by_db_ids(&self, ids: &[DbId]) -> Result<Vec<DatabaseObject>> {
        let index = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| index.objects.get(id).cloned())
            .collect())
    }

    async fn outgoing(&self, db_id: DbId, relations: &[&str]) -> Result<Vec<Related>> {
        let index = self.read();
        let Some(source) = index.objects.get(&db_id) else {
            return Ok(Vec::new());
        };
        let mut related = Vec::new();
        for (relation, targets) in &source.relations {
            if !relation_selected(relations, relation) {
                continue;
            }
            for target in targets {
                if let Some(object) = index.objects.get(target) {
                    related.push(Related {
                        relation: relation.clone(),
                        object: object.clone(),
                    });
                }
            }
        }
        Ok(related)
    }

    async fn incoming(&self, db_id: DbId, relations: &[&str]) -> Result<Vec<Related>> {
        let index = self.read();
        let mut related: Vec<Related> = Vec::new();
        for (relation, source) in index.incoming.get(&db_id).map(Vec::as_slice).unwrap_or(&[]) {
            if !relation_selected(relations, relation) {
                continue;
            }
            // Stoichiometry shows up as repeated edges; referrers are listed once
            if related
                .iter()
                .any(|r| r.relation == *relation && r.object.db_id == *source)
            {
                continue;
            }
            if let Some(object) = index.objects.get(source) {
                related.push(Related {
                    relation: relation.clone(),
                    object: object.clone(),
                });
            }
        }
        Ok(related)
    }

    async fn find_by_class(
        &self,
        class: &str,
        species: &SpeciesFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DatabaseObject>> {
        let index = self.read();
        Ok(index
            .objects
            .values()
            .filter(|o| o.is_a(class) && species.accepts(o))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_by_class(&self, class: &str, species: &SpeciesFilter) -> Result<usize> {
        let index = self.read();
        Ok(index
            .objects
            .values()
            .filter(|o| o.is_a(class) && species.accepts(o))
            .count())
    }

    async fn find_by_property(
        &self,
        class: &str,
        property: &str,
        value: &str,
        mode: MatchMode,
    ) -> Result<Vec<DatabaseObject>> {
        let needle = value.to_lowercase();
        let index = self.read();
        Ok(index
            .objects
            .values()
            .filter(|o| o.is_a(class))
            .filter(|o| {
                let candidate = match property {
                    "displayName" => Some(o.display_name.as_str()),
                    _ => o.property_str(property),
                };
                candidate.map_or(false, |c| {
                    let c = c.to_lowercase();
                    match mode {
                        MatchMode::Exact => c == needle,
                        MatchMode::Contains => c.contains(&needle),
                    }
                })
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_graph;

    #[tokio::test]
    async fn test_lookup_by_db_id_and_st_id() {
        let graph = fixture_graph();
        let by_st = graph
            .find_by_id(&Identifier::StId("R-HSA-100".into()))
            .await
            .unwrap()
            .unwrap();
        let by_db = graph.find_by_id(&Identifier::DbId(100)).await.unwrap().unwrap();
        assert_eq!(by_st, by_db);
        assert!(graph
            .find_by_id(&Identifier::DbId(999_999))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_outgoing_respects_relation_filter_and_stoichiometry() {
        let graph = fixture_graph();
        // reaction 300 has input [500, 500] (stoichiometry 2) and output [510]
        let inputs = graph.outgoing(300, &["input"]).await.unwrap();
        assert_eq!(inputs.len(), 2);
        assert!(inputs.iter().all(|r| r.object.db_id == 500));
        let all = graph.outgoing(300, &[]).await.unwrap();
        assert!(all.iter().any(|r| r.relation == "output"));
    }

    #[tokio::test]
    async fn test_incoming_lists_each_referrer_once() {
        let graph = fixture_graph();
        let referrers = graph.incoming(500, &["input"]).await.unwrap();
        assert_eq!(referrers.len(), 1);
        assert_eq!(referrers[0].object.db_id, 300);
    }

    #[tokio::test]
    async fn test_class_listing_and_count() {
        let graph = fixture_graph();
        let species = SpeciesFilter::named("Homo sapiens");
        let count = graph.count_by_class("Pathway", &species).await.unwrap();
        let page = graph.find_by_class("Pathway", &species, 1, 1).await.unwrap();
        assert!(count >= 2);
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_property_match_modes() {
        let graph = fixture_graph();
        let exact = graph
            .find_by_property("Person", "surname", "SMITH", MatchMode::Exact)
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        let contains = graph
            .find_by_property("Person", "displayName", "smi", MatchMode::Contains)
            .await
            .unwrap();
        assert_eq!(contains.len(), 1);
    }
}
