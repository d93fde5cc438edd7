use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::traversal;
use crate::constants::MAX_IDS_PER_QUERY;
use crate::domain::{DatabaseObject, DbInfo, Identifier, ObjectGraph, ShallowObject};
use crate::error::{ContentServiceError, Result};
use crate::graph::{self, GraphStore};
use crate::jsog::{self, JsogEncoder};

/// Generic object lookups: the `/data/query` and `/data/database` families.
pub struct QueryService {
    graph: Arc<dyn GraphStore>,
}

impl QueryService {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    pub async fn db_info(&self) -> Result<DbInfo> {
        self.graph.db_info().await
    }

    /// The object with its direct relations loaded, JSOG encoded.
    pub async fn find(&self, id: &Identifier) -> Result<Value> {
        let root = graph::require(self.graph.as_ref(), id).await?;
        let loaded = traversal::load_graph(self.graph.as_ref(), root, 1).await?;
        Ok(jsog::encode(&loaded))
    }

    /// Like [`find`](Self::find), plus every object pointing at this one,
    /// grouped by relation under `referrers`.
    pub async fn find_enhanced(&self, id: &Identifier) -> Result<Value> {
        let root = graph::require(self.graph.as_ref(), id).await?;
        let root_id = root.db_id;
        let loaded = traversal::load_graph(self.graph.as_ref(), root, 1).await?;
        let mut encoded = jsog::encode(&loaded);

        let mut grouped: BTreeMap<String, Vec<ShallowObject>> = BTreeMap::new();
        for related in self.graph.incoming(root_id, &[]).await? {
            grouped
                .entry(related.relation)
                .or_default()
                .push(related.object.shallow());
        }
        if let Value::Object(map) = &mut encoded {
            let referrers = grouped
                .into_iter()
                .map(|(relation, objects)| {
                    let mut entry = Map::new();
                    entry.insert("ref".to_string(), Value::from(relation));
                    entry.insert("objects".to_string(), serde_json::to_value(objects)?);
                    Ok(Value::Object(entry))
                })
                .collect::<Result<Vec<Value>>>()?;
            map.insert("referrers".to_string(), Value::Array(referrers));
        }
        Ok(encoded)
    }

    /// Batch lookup from a comma/space/newline separated body. Objects share
    /// one JSOG id space; unknown ids are skipped.
    pub async fn find_many(&self, body: &str) -> Result<Value> {
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
        let found = self.graph.find_by_ids(&ids).await?;
        if found.is_empty() {
            return Err(ContentServiceError::not_found(
                "None of the provided identifiers has been found in the System",
            ));
        }
        debug!("Batch query resolved {} of {} ids", found.len(), ids.len());

        let roots: Vec<_> = found.iter().map(|o| o.db_id).collect();
        let mut loaded = ObjectGraph::new(found[0].clone());
        for object in &found {
            loaded.insert(object.clone());
        }
        for root in &roots {
            traversal::expand(self.graph.as_ref(), &mut loaded, *root, 1).await?;
        }
        Ok(JsogEncoder::new(&loaded).encode_all(&roots))
    }

    /// A single attribute rendered as plain text. Relations list one target
    /// per line as `<dbId>\t<displayName>`.
    pub async fn attribute(&self, id: &Identifier, attribute: &str) -> Result<String> {
        let object = graph::require(self.graph.as_ref(), id).await?;
        if object.relations.contains_key(attribute) {
            let targets = self.graph.outgoing(object.db_id, &[attribute]).await?;
            return Ok(targets
                .iter()
                .map(|r| format!("{}\t{}", r.object.db_id, r.object.display_name))
                .collect::<Vec<_>>()
                .join("\n"));
        }
        let value = object.attribute(attribute).ok_or_else(|| {
            ContentServiceError::not_found(format!(
                "Attribute '{}' not found for {}",
                attribute, object.schema_class
            ))
        })?;
        Ok(value_to_text(&value))
    }

    pub async fn require(&self, id: &Identifier) -> Result<DatabaseObject> {
        graph::require(self.graph.as_ref(), id).await
    }
}

pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_to_text).collect::<Vec<_>>().join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;
    use serde_json::json;

    #[tokio::test]
    async fn test_find_encodes_direct_relations() {
        let service = QueryService::new(fixture_store());
        let value = service
            .find(&Identifier::parse("R-HSA-300").unwrap())
            .await
            .unwrap();
        assert_eq!(value["@id"], json!("1"));
        assert_eq!(value["dbId"], json!(300));
        // stoichiometry 2 -> the second input is a reference to the first
        assert_eq!(value["input"][1]["@ref"], value["input"][0]["@id"]);
        // second hop is not loaded
        assert!(value["catalystActivity"][0].get("physicalEntity").is_none());
    }

    #[tokio::test]
    async fn test_find_unknown_is_not_found() {
        let service = QueryService::new(fixture_store());
        let err = service.find(&Identifier::DbId(424242)).await.unwrap_err();
        assert!(matches!(err, ContentServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_enhanced_lists_referrers() {
        let service = QueryService::new(fixture_store());
        let value = service.find_enhanced(&Identifier::DbId(510)).await.unwrap();
        let referrers = value["referrers"].as_array().unwrap();
        let relations: Vec<_> = referrers.iter().map(|r| r["ref"].clone()).collect();
        assert_eq!(relations, vec![json!("input"), json!("output")]);
        for referrer in referrers {
            let objects = referrer["objects"].as_array().unwrap();
            assert!(!objects.is_empty());
            assert!(objects.iter().all(|o| o["dbId"].is_number()));
        }
    }

    #[tokio::test]
    async fn test_find_many_limits_and_skips_unknown() {
        let service = QueryService::new(fixture_store());
        let value = service.find_many("R-HSA-200, 999999\n310").await.unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);

        let too_many: Vec<String> = (1..=21).map(|i| i.to_string()).collect();
        let err = service.find_many(&too_many.join(",")).await.unwrap_err();
        assert!(matches!(err, ContentServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_attribute_text() {
        let service = QueryService::new(fixture_store());
        let id = Identifier::DbId(300);
        assert_eq!(service.attribute(&id, "displayName").await.unwrap(), "Glucose is phosphorylated");
        assert_eq!(
            service.attribute(&id, "output").await.unwrap(),
            "510\tG6P [cytosol]"
        );
        assert!(service.attribute(&id, "nonsense").await.is_err());
    }
}
