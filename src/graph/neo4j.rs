use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{GraphStore, MatchMode, Related};
use crate::config::GraphConfig;
use crate::domain::{DatabaseObject, DbId, DbInfo, Identifier, SpeciesFilter};
use crate::error::{ContentServiceError, Result};

/// Projection returned for every node so rows map onto [`DatabaseObject`].
fn node_projection(var: &str) -> String {
    format!(
        "{{props: properties({v}), labels: labels({v}), \
         edges: [({v})-[x]->(t:DatabaseObject) | {{relation: type(x), target: t.dbId, \
         stoichiometry: coalesce(x.stoichiometry, 1), position: coalesce(x.order, 0)}}]}}",
        v = var
    )
}

#[derive(Debug, Deserialize)]
struct NodeRecord {
    props: BTreeMap<String, Value>,
    labels: Vec<String>,
    edges: Vec<EdgeRecord>,
}

#[derive(Debug, Deserialize)]
struct EdgeRecord {
    relation: String,
    target: DbId,
    stoichiometry: i64,
    position: i64,
}

impl NodeRecord {
    fn into_object(self) -> Result<DatabaseObject> {
        let mut props = self.props;
        let db_id = props
            .remove("dbId")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ContentServiceError::Graph {
                message: "node without dbId".to_string(),
            })?;
        let st_id = props
            .remove("stId")
            .and_then(|v| v.as_str().map(str::to_string));
        let display_name = props
            .remove("displayName")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let schema_class = props
            .remove("schemaClass")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| self.labels.first().cloned().unwrap_or_default());

        let mut edges = self.edges;
        edges.sort_by(|a, b| a.relation.cmp(&b.relation).then(a.position.cmp(&b.position)));
        let mut relations: BTreeMap<String, Vec<DbId>> = BTreeMap::new();
        for edge in edges {
            let targets = relations.entry(edge.relation).or_default();
            for _ in 0..edge.stoichiometry.max(1) {
                targets.push(edge.target);
            }
        }

        let labels = self
            .labels
            .into_iter()
            .filter(|l| l != "DatabaseObject")
            .collect();

        Ok(DatabaseObject {
            db_id,
            st_id,
            display_name,
            schema_class,
            labels,
            properties: props,
            relations,
        })
    }
}

/// Neo4j-backed graph store
pub struct Neo4jGraph {
    graph: Graph,
}

impl Neo4jGraph {
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let graph = Graph::connect(builder.build()?).await?;
        info!("Connected to graph database at {}", config.uri);
        Ok(Self { graph })
    }

    async fn objects(&self, q: Query, column: &str) -> Result<Vec<DatabaseObject>> {
        let mut stream = self.graph.execute(q).await?;
        let mut objects = Vec::new();
        while let Some(row) = stream.next().await? {
            let record: NodeRecord = row.get(column)?;
            objects.push(record.into_object()?);
        }
        Ok(objects)
    }

    async fn related(&self, q: Query) -> Result<Vec<Related>> {
        let mut stream = self.graph.execute(q).await?;
        let mut related = Vec::new();
        while let Some(row) = stream.next().await? {
            let relation: String = row.get("relation")?;
            let stoichiometry: i64 = row.get("stoichiometry")?;
            let record: NodeRecord = row.get("node")?;
            let object = record.into_object()?;
            for _ in 0..stoichiometry.max(1) {
                related.push(Related {
                    relation: relation.clone(),
                    object: object.clone(),
                });
            }
        }
        Ok(related)
    }
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    async fn db_info(&self) -> Result<DbInfo> {
        let q = query("MATCH (d:DBInfo) RETURN d.name AS name, d.version AS version LIMIT 1");
        let mut stream = self.graph.execute(q).await?;
        match stream.next().await? {
            Some(row) => Ok(DbInfo {
                name: row.get("name")?,
                version: row.get("version")?,
            }),
            None => Err(ContentServiceError::not_found("DBInfo node is missing")),
        }
    }

    async fn find_by_id(&self, id: &Identifier) -> Result<Option<DatabaseObject>> {
        let projection = node_projection("n");
        let q = match id {
            Identifier::DbId(db_id) => query(&format!(
                "MATCH (n:DatabaseObject {{dbId: $id}}) RETURN {} AS node",
                projection
            ))
            .param("id", *db_id),
            Identifier::StId(st_id) => query(&format!(
                "MATCH (n:DatabaseObject) WHERE n.stId = $id OR n.oldStId = $id \
                 RETURN {} AS node LIMIT 1",
                projection
            ))
            .param("id", st_id.as_str()),
        };
        debug!("Looking up {}", id);
        Ok(self.objects(q, "node").await?.into_iter().next())
    }

    async fn find_by_db_ids(&self, ids: &[DbId]) -> Result<Vec<DatabaseObject>> {
        let q = query(&format!(
            "UNWIND $ids AS id MATCH (n:DatabaseObject {{dbId: id}}) RETURN {} AS node",
            node_projection("n")
        ))
        .param("ids", ids.to_vec());
        self.objects(q, "node").await
    }

    async fn outgoing(&self, db_id: DbId, relations: &[&str]) -> Result<Vec<Related>> {
        let rels: Vec<String> = relations.iter().map(|r| r.to_string()).collect();
        let q = query(&format!(
            "MATCH (n:DatabaseObject {{dbId: $id}})-[r]->(m:DatabaseObject) \
             WHERE size($rels) = 0 OR type(r) IN $rels \
             RETURN type(r) AS relation, coalesce(r.stoichiometry, 1) AS stoichiometry, \
             {} AS node ORDER BY relation, coalesce(r.order, 0)",
            node_projection("m")
        ))
        .param("id", db_id)
        .param("rels", rels);
        self.related(q).await
    }

    async fn incoming(&self, db_id: DbId, relations: &[&str]) -> Result<Vec<Related>> {
        let rels: Vec<String> = relations.iter().map(|r| r.to_string()).collect();
        let q = query(&format!(
            "MATCH (m:DatabaseObject)-[r]->(n:DatabaseObject {{dbId: $id}}) \
             WHERE size($rels) = 0 OR type(r) IN $rels \
             WITH DISTINCT type(r) AS relation, m \
             RETURN relation, 1 AS stoichiometry, {} AS node ORDER BY m.dbId",
            node_projection("m")
        ))
        .param("id", db_id)
        .param("rels", rels);
        self.related(q).await
    }

    async fn find_by_class(
        &self,
        class: &str,
        species: &SpeciesFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DatabaseObject>> {
        let q = query(&format!(
            "MATCH (n:DatabaseObject) WHERE $class IN labels(n) \
             AND ($species = '' OR toLower(n.speciesName) = toLower($species)) \
             RETURN {} AS node ORDER BY n.dbId SKIP $offset LIMIT $limit",
            node_projection("n")
        ))
        .param("class", class)
        .param("species", species.0.as_deref().unwrap_or_default().replace('+', " "))
        .param("offset", i64::try_from(offset).unwrap_or(i64::MAX))
        .param("limit", i64::try_from(limit).unwrap_or(i64::MAX));
        self.objects(q, "node").await
    }

    async fn count_by_class(&self, class: &str, species: &SpeciesFilter) -> Result<usize> {
        let q = query(
            "MATCH (n:DatabaseObject) WHERE $class IN labels(n) \
             AND ($species = '' OR toLower(n.speciesName) = toLower($species)) \
             RETURN count(n) AS count",
        )
        .param("class", class)
        .param("species", species.0.as_deref().unwrap_or_default().replace('+', " "));
        let mut stream = self.graph.execute(q).await?;
        let count: i64 = match stream.next().await? {
            Some(row) => row.get("count")?,
            None => 0,
        };
        Ok(count.max(0) as usize)
    }

    async fn find_by_property(
        &self,
        class: &str,
        property: &str,
        value: &str,
        mode: MatchMode,
    ) -> Result<Vec<DatabaseObject>> {
        if !property.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ContentServiceError::bad_request(format!(
                "Invalid property name '{}'",
                property
            )));
        }
        let predicate = match mode {
            MatchMode::Exact => "toLower(toString(n.`{p}`)) = toLower($value)",
            MatchMode::Contains => "toLower(toString(n.`{p}`)) CONTAINS toLower($value)",
        }
        .replace("{p}", property);
        let q = query(&format!(
            "MATCH (n:DatabaseObject) WHERE $class IN labels(n) AND {} \
             RETURN {} AS node ORDER BY n.dbId",
            predicate,
            node_projection("n")
        ))
        .param("class", class)
        .param("value", value);
        self.objects(q, "node").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_record_conversion_expands_stoichiometry() {
        let record = NodeRecord {
            props: BTreeMap::from([
                ("dbId".to_string(), json!(69)),
                ("stId".to_string(), json!("R-HSA-69")),
                ("displayName".to_string(), json!("ATP + glucose => ADP")),
                ("schemaClass".to_string(), json!("Reaction")),
                ("isInDisease".to_string(), json!(false)),
            ]),
            labels: vec![
                "Reaction".into(),
                "ReactionLikeEvent".into(),
                "Event".into(),
                "DatabaseObject".into(),
            ],
            edges: vec![
                EdgeRecord {
                    relation: "input".into(),
                    target: 2,
                    stoichiometry: 1,
                    position: 1,
                },
                EdgeRecord {
                    relation: "input".into(),
                    target: 1,
                    stoichiometry: 2,
                    position: 0,
                },
            ],
        };
        let object = record.into_object().unwrap();
        assert_eq!(object.db_id, 69);
        assert_eq!(object.st_id.as_deref(), Some("R-HSA-69"));
        assert_eq!(object.related("input"), &[1, 1, 2]);
        assert!(!object.labels.contains(&"DatabaseObject".to_string()));
        assert_eq!(object.properties.len(), 1);
    }

    #[test]
    fn test_node_without_db_id_is_rejected() {
        let record = NodeRecord {
            props: BTreeMap::new(),
            labels: vec![],
            edges: vec![],
        };
        assert!(record.into_object().is_err());
    }
}
