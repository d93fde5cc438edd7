//! Transport shapes for objects read from the knowledgebase graph.
//!
//! The graph schema itself is owned by the database; these types only carry
//! what the service reads and returns.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::constants;
use crate::error::{ContentServiceError, Result};

pub type DbId = i64;

static STABLE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(R-[A-Z]{3,4}-\d+)(\.\d+)?$").expect("valid stable id regex"));

/// A request identifier: either a numeric database id or a stable id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    DbId(DbId),
    StId(String),
}

impl Identifier {
    /// Parses a path/body identifier. Stable ids lose their `.version` suffix.
    pub fn parse(raw: &str) -> Result<Self> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(ContentServiceError::bad_request("Identifier must not be empty"));
        }
        if let Ok(db_id) = id.parse::<DbId>() {
            return Ok(Identifier::DbId(db_id));
        }
        if let Some(caps) = STABLE_ID.captures(id) {
            return Ok(Identifier::StId(caps[1].to_string()));
        }
        if id.chars().any(|c| c.is_whitespace() || c == '/' || c == ',') {
            return Err(ContentServiceError::bad_request(format!(
                "'{}' is not a valid identifier",
                id
            )));
        }
        // Legacy stable ids (REACT_xxx) are looked up verbatim
        Ok(Identifier::StId(id.to_string()))
    }

    /// Parses a comma, whitespace or newline separated list, dropping duplicates.
    pub fn parse_list(body: &str) -> Result<Vec<Self>> {
        let mut ids: Vec<Identifier> = Vec::new();
        for token in body.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.trim().is_empty() {
                continue;
            }
            let id = Identifier::parse(token)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    pub fn matches(&self, object: &DatabaseObject) -> bool {
        match self {
            Identifier::DbId(id) => object.db_id == *id,
            Identifier::StId(st_id) => object.st_id.as_deref() == Some(st_id.as_str()),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::DbId(id) => write!(f, "{}", id),
            Identifier::StId(id) => write!(f, "{}", id),
        }
    }
}

/// One node of the knowledgebase graph with its outgoing relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseObject {
    pub db_id: DbId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub st_id: Option<String>,
    pub display_name: String,
    pub schema_class: String,
    /// Schema class and all of its super classes.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    /// Relation name to target ids, in stored order (stoichiometry repeats ids).
    #[serde(default)]
    pub relations: BTreeMap<String, Vec<DbId>>,
}

impl DatabaseObject {
    pub fn is_a(&self, class: &str) -> bool {
        self.schema_class == class || self.labels.iter().any(|l| l == class)
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    pub fn property_bool(&self, name: &str) -> bool {
        self.properties
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn related(&self, relation: &str) -> &[DbId] {
        self.relations.get(relation).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Value of a named attribute: identity fields, stored properties, or the
    /// target ids of a relation.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "dbId" => Some(Value::from(self.db_id)),
            "stId" => self.st_id.clone().map(Value::from),
            "displayName" => Some(Value::from(self.display_name.clone())),
            "schemaClass" | "className" => Some(Value::from(self.schema_class.clone())),
            _ => self.properties.get(name).cloned().or_else(|| {
                self.relations
                    .get(name)
                    .map(|ids| Value::from(ids.iter().copied().collect::<Vec<_>>()))
            }),
        }
    }

    /// Identity fields plus stored properties, without relations.
    pub fn to_flat_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("dbId".to_string(), Value::from(self.db_id));
        if let Some(st_id) = &self.st_id {
            map.insert("stId".to_string(), Value::from(st_id.clone()));
        }
        map.insert("displayName".to_string(), Value::from(self.display_name.clone()));
        map.insert("schemaClass".to_string(), Value::from(self.schema_class.clone()));
        for (key, value) in &self.properties {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    pub fn shallow(&self) -> ShallowObject {
        ShallowObject {
            db_id: self.db_id,
            st_id: self.st_id.clone(),
            display_name: self.display_name.clone(),
            schema_class: self.schema_class.clone(),
        }
    }
}

/// Identity fields only, used wherever a response lists objects by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShallowObject {
    pub db_id: DbId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub st_id: Option<String>,
    pub display_name: String,
    pub schema_class: String,
}

/// Every object loaded for a single response, rooted at one of them.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    pub root: DbId,
    pub objects: HashMap<DbId, DatabaseObject>,
}

impl ObjectGraph {
    pub fn new(root: DatabaseObject) -> Self {
        let root_id = root.db_id;
        let mut objects = HashMap::new();
        objects.insert(root_id, root);
        Self {
            root: root_id,
            objects,
        }
    }

    pub fn insert(&mut self, object: DatabaseObject) {
        self.objects.entry(object.db_id).or_insert(object);
    }

    pub fn get(&self, db_id: DbId) -> Option<&DatabaseObject> {
        self.objects.get(&db_id)
    }

    pub fn root(&self) -> Option<&DatabaseObject> {
        self.objects.get(&self.root)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbInfo {
    pub name: String,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Species {
    pub db_id: DbId,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
}

impl From<&DatabaseObject> for Species {
    fn from(object: &DatabaseObject) -> Self {
        Species {
            db_id: object.db_id,
            display_name: object.display_name.clone(),
            tax_id: object.property_str("taxId").map(str::to_string),
            abbreviation: object.property_str("abbreviation").map(str::to_string),
        }
    }
}

impl Species {
    /// True when `query` names this species by dbId, taxonomy id, or name.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.parse::<DbId>().ok() == Some(self.db_id) {
            return true;
        }
        if self.tax_id.as_deref() == Some(query) {
            return true;
        }
        let normalized = query.replace('+', " ");
        self.display_name.eq_ignore_ascii_case(&normalized)
            || self
                .abbreviation
                .as_deref()
                .map_or(false, |a| a.eq_ignore_ascii_case(&normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub db_id: DbId,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid_id: Option<String>,
}

impl From<&DatabaseObject> for Person {
    fn from(object: &DatabaseObject) -> Self {
        Person {
            db_id: object.db_id,
            display_name: object.display_name.clone(),
            first_name: object.property_str("firstname").map(str::to_string),
            surname: object.property_str("surname").map(str::to_string),
            initial: object.property_str("initial").map(str::to_string),
            orcid_id: object.property_str("orcidId").map(str::to_string),
        }
    }
}

/// Filter accepted by class listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeciesFilter(pub Option<String>);

impl SpeciesFilter {
    pub fn any() -> Self {
        SpeciesFilter(None)
    }

    pub fn named(species: impl Into<String>) -> Self {
        SpeciesFilter(Some(species.into()))
    }

    /// Matches an object through its `speciesName` property. Objects without a
    /// species pass an unset filter only.
    pub fn accepts(&self, object: &DatabaseObject) -> bool {
        match &self.0 {
            None => true,
            Some(species) => object
                .property_str("speciesName")
                .map_or(false, |name| name.eq_ignore_ascii_case(&species.replace('+', " "))),
        }
    }
}

pub fn is_structure(object: &DatabaseObject) -> bool {
    object.is_a(constants::COMPLEX) || object.is_a(constants::ENTITY_SET) || object.is_a(constants::POLYMER)
}
