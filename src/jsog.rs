//! JSOG encoding of object graphs.
//!
//! The first time an object is written it gets an `"@id"`; every later
//! occurrence is written as `{"@ref": id}`. Only objects present in the
//! [`ObjectGraph`] are written, relations pointing at objects that were not
//! loaded are dropped, so encoding never reaches back into the database.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::domain::{DatabaseObject, DbId, ObjectGraph};

/// Relations holding at most one target in the schema.
const SINGLE_VALUED: &[&str] = &[
    "referenceEntity",
    "physicalEntity",
    "regulator",
    "activity",
    "created",
    "modified",
    "referenceDatabase",
];

pub const ID_KEY: &str = "@id";
pub const REF_KEY: &str = "@ref";

pub struct JsogEncoder<'a> {
    graph: &'a ObjectGraph,
    assigned: HashMap<DbId, String>,
    next: usize,
}

impl<'a> JsogEncoder<'a> {
    pub fn new(graph: &'a ObjectGraph) -> Self {
        Self {
            graph,
            assigned: HashMap::new(),
            next: 1,
        }
    }

    pub fn encode_root(mut self) -> Value {
        match self.graph.root() {
            Some(root) => self.encode_object(root),
            None => Value::Null,
        }
    }

    /// Encodes several roots sharing one id space, e.g. a batch query.
    pub fn encode_all(mut self, roots: &[DbId]) -> Value {
        let values = roots
            .iter()
            .filter_map(|id| self.graph.get(*id))
            .map(|object| self.encode_object(object))
            .collect();
        Value::Array(values)
    }

    fn encode_object(&mut self, object: &DatabaseObject) -> Value {
        if let Some(existing) = self.assigned.get(&object.db_id) {
            let mut reference = Map::new();
            reference.insert(REF_KEY.to_string(), Value::from(existing.clone()));
            return Value::Object(reference);
        }

        let id = self.next.to_string();
        self.next += 1;
        self.assigned.insert(object.db_id, id.clone());

        let mut map = Map::new();
        map.insert(ID_KEY.to_string(), Value::from(id));
        map.insert("dbId".to_string(), Value::from(object.db_id));
        if let Some(st_id) = &object.st_id {
            map.insert("stId".to_string(), Value::from(st_id.clone()));
        }
        map.insert(
            "displayName".to_string(),
            Value::from(object.display_name.clone()),
        );
        map.insert(
            "schemaClass".to_string(),
            Value::from(object.schema_class.clone()),
        );
        for (key, value) in &object.properties {
            map.insert(key.clone(), value.clone());
        }

        for (relation, targets) in &object.relations {
            let mut encoded = Vec::new();
            for target in targets {
                if let Some(target_object) = self.graph.get(*target) {
                    encoded.push(self.encode_object(target_object));
                }
            }
            if encoded.is_empty() {
                continue;
            }
            let value = if encoded.len() == 1 && SINGLE_VALUED.contains(&relation.as_str()) {
                encoded.remove(0)
            } else {
                Value::Array(encoded)
            };
            map.insert(relation.clone(), value);
        }

        Value::Object(map)
    }
}

pub fn encode(graph: &ObjectGraph) -> Value {
    JsogEncoder::new(graph).encode_root()
}

/// Resolves `@ref` markers back into the referenced objects.
///
/// A reference to an object that is still being expanded (a cycle) is
/// replaced by that object's identity fields.
pub fn decode(value: &Value) -> Value {
    let mut table = HashMap::new();
    collect_ids(value, &mut table);
    let mut stack = Vec::new();
    resolve(value, &table, &mut stack)
}

fn collect_ids(value: &Value, table: &mut HashMap<String, Value>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get(ID_KEY) {
                table.entry(id.clone()).or_insert_with(|| value.clone());
            }
            for child in map.values() {
                collect_ids(child, table);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_ids(item, table);
            }
        }
        _ => {}
    }
}

fn resolve(value: &Value, table: &HashMap<String, Value>, stack: &mut Vec<String>) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get(REF_KEY) {
                let Some(target) = table.get(reference) else {
                    return Value::Null;
                };
                if stack.contains(reference) {
                    return identity_of(target);
                }
                return resolve(target, table, stack);
            }
            let own_id = match map.get(ID_KEY) {
                Some(Value::String(id)) => Some(id.clone()),
                _ => None,
            };
            if let Some(id) = &own_id {
                stack.push(id.clone());
            }
            let mut out = Map::new();
            for (key, child) in map {
                if key == ID_KEY {
                    continue;
                }
                out.insert(key.clone(), resolve(child, table, stack));
            }
            if own_id.is_some() {
                stack.pop();
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|i| resolve(i, table, stack)).collect()),
        other => other.clone(),
    }
}

fn identity_of(target: &Value) -> Value {
    let mut out = Map::new();
    if let Value::Object(map) = target {
        for key in ["dbId", "stId", "displayName", "schemaClass"] {
            if let Some(v) = map.get(key) {
                out.insert(key.to_string(), v.clone());
            }
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn object(db_id: DbId, class: &str, relations: &[(&str, Vec<DbId>)]) -> DatabaseObject {
        DatabaseObject {
            db_id,
            st_id: None,
            display_name: format!("object {}", db_id),
            schema_class: class.to_string(),
            labels: vec![class.to_string()],
            properties: BTreeMap::new(),
            relations: relations
                .iter()
                .map(|(r, ids)| (r.to_string(), ids.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_cycle_becomes_reference() {
        // pathway 1 -> reaction 2 -> back to pathway 1 through "pathway"
        let mut graph = ObjectGraph::new(object(1, "Pathway", &[("hasEvent", vec![2])]));
        graph.insert(object(2, "Reaction", &[("pathway", vec![1])]));

        let encoded = encode(&graph);
        assert_eq!(encoded["@id"], json!("1"));
        assert_eq!(encoded["hasEvent"][0]["@id"], json!("2"));
        assert_eq!(encoded["hasEvent"][0]["pathway"], json!([{"@ref": "1"}]));
    }

    #[test]
    fn test_repeated_target_is_referenced() {
        let mut graph = ObjectGraph::new(object(1, "Reaction", &[("input", vec![5, 5])]));
        graph.insert(object(5, "SimpleEntity", &[]));

        let encoded = encode(&graph);
        assert_eq!(encoded["input"][0]["@id"], json!("2"));
        assert_eq!(encoded["input"][1], json!({"@ref": "2"}));
    }

    #[test]
    fn test_unloaded_relations_are_dropped() {
        let graph = ObjectGraph::new(object(
            1,
            "EntityWithAccessionedSequence",
            &[("referenceEntity", vec![77]), ("compartment", vec![78])],
        ));
        let encoded = encode(&graph);
        assert!(encoded.get("referenceEntity").is_none());
        assert!(encoded.get("compartment").is_none());
    }

    #[test]
    fn test_single_valued_relation_is_an_object() {
        let mut graph = ObjectGraph::new(object(
            1,
            "EntityWithAccessionedSequence",
            &[("referenceEntity", vec![2])],
        ));
        graph.insert(object(2, "ReferenceGeneProduct", &[]));
        let encoded = encode(&graph);
        assert_eq!(encoded["referenceEntity"]["dbId"], json!(2));
    }

    #[test]
    fn test_decode_expands_references_and_breaks_cycles() {
        let mut graph = ObjectGraph::new(object(1, "Pathway", &[("hasEvent", vec![2, 3])]));
        graph.insert(object(2, "Reaction", &[("pathway", vec![1]), ("input", vec![4])]));
        graph.insert(object(3, "Reaction", &[("input", vec![4])]));
        graph.insert(object(4, "SimpleEntity", &[]));

        let decoded = decode(&encode(&graph));
        assert!(decoded.get("@id").is_none());
        // shared input expanded in both reactions
        assert_eq!(decoded["hasEvent"][0]["input"][0]["dbId"], json!(4));
        assert_eq!(decoded["hasEvent"][1]["input"][0]["dbId"], json!(4));
        // the back edge to the root collapses to identity fields
        assert_eq!(
            decoded["hasEvent"][0]["pathway"][0],
            json!({"dbId": 1, "displayName": "object 1", "schemaClass": "Pathway"})
        );
    }

    #[test]
    fn test_encode_all_shares_ids() {
        let mut graph = ObjectGraph::new(object(1, "Reaction", &[("input", vec![5])]));
        graph.insert(object(2, "Reaction", &[("input", vec![5])]));
        graph.insert(object(5, "SimpleEntity", &[]));
        let encoded = JsogEncoder::new(&graph).encode_all(&[1, 2]);
        assert_eq!(encoded[1]["input"][0], json!({"@ref": "2"}));
    }
}
