use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

use super::non_empty;
use crate::constants::*;
use crate::domain::{DatabaseObject, Identifier, Person};
use crate::error::{ContentServiceError, Result};
use crate::graph::{self, GraphStore, MatchMode};

static ORCID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{3}[\dX]$").expect("valid orcid regex"));

pub struct PersonService {
    graph: Arc<dyn GraphStore>,
}

impl PersonService {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    /// People whose name contains every word of `name`, ignoring case. With
    /// `exact`, first name and surname must match the words exactly.
    pub async fn find_by_name(&self, name: &str, exact: bool) -> Result<Vec<Person>> {
        let words: Vec<String> = name
            .split(|c: char| c.is_whitespace() || c == ',' || c == '+')
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let Some(first) = words.first() else {
            return Err(ContentServiceError::bad_request("Name must not be empty"));
        };

        let mut candidates: Vec<DatabaseObject> = Vec::new();
        for property in ["surname", "firstname", "displayName"] {
            for person in self
                .graph
                .find_by_property(PERSON, property, first, MatchMode::Contains)
                .await?
            {
                if !candidates.iter().any(|c| c.db_id == person.db_id) {
                    candidates.push(person);
                }
            }
        }

        let mut people: Vec<Person> = candidates
            .iter()
            .filter(|c| name_matches(c, &words, exact))
            .map(Person::from)
            .collect();
        people.sort_by_key(|p| p.db_id);
        non_empty(people, || format!("No person found for '{}'", name))
    }

    /// Person by dbId or ORCID.
    pub async fn find(&self, id: &str) -> Result<Person> {
        let id = id.trim();
        if ORCID.is_match(id) {
            return self
                .graph
                .find_by_property(PERSON, "orcidId", id, MatchMode::Exact)
                .await?
                .first()
                .map(Person::from)
                .ok_or_else(|| {
                    ContentServiceError::not_found(format!("Person with ORCID {} not found", id))
                });
        }
        let object = graph::require_class(self.graph.as_ref(), &Identifier::parse(id)?, PERSON).await?;
        Ok(Person::from(&object))
    }

    /// Pathways the person is listed as author of, ordered by dbId.
    pub async fn authored_pathways(&self, id: &str) -> Result<Vec<Value>> {
        let person = self.find(id).await?;
        let mut pathways: Vec<DatabaseObject> = Vec::new();
        for edit in self.graph.incoming(person.db_id, &[AUTHOR]).await? {
            if !edit.object.is_a(INSTANCE_EDIT) {
                continue;
            }
            for pathway in self.graph.incoming(edit.object.db_id, &[AUTHORED]).await? {
                if pathway.object.is_a(PATHWAY)
                    && !pathways.iter().any(|p| p.db_id == pathway.object.db_id)
                {
                    pathways.push(pathway.object);
                }
            }
        }
        pathways.sort_by_key(|p| p.db_id);
        non_empty(
            pathways.iter().map(DatabaseObject::to_flat_json).collect(),
            || format!("No authored pathways found for {}", id),
        )
    }

    pub async fn publications(&self, id: &str) -> Result<Vec<Value>> {
        let person = self.find(id).await?;
        let publications: Vec<Value> = self
            .graph
            .incoming(person.db_id, &[AUTHOR])
            .await?
            .into_iter()
            .filter(|r| r.object.is_a(PUBLICATION))
            .map(|r| r.object.to_flat_json())
            .collect();
        non_empty(publications, || format!("No publications found for {}", id))
    }
}

fn name_matches(person: &DatabaseObject, words: &[String], exact: bool) -> bool {
    let fields: Vec<String> = ["firstname", "surname", "initial"]
        .iter()
        .filter_map(|p| person.property_str(p))
        .chain(std::iter::once(person.display_name.as_str()))
        .map(str::to_lowercase)
        .collect();
    words.iter().all(|word| {
        fields.iter().any(|field| {
            if exact {
                field == word
            } else {
                field.contains(word.as_str())
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::fixture_store;

    #[tokio::test]
    async fn test_find_by_name_contains_and_exact() {
        let service = PersonService::new(fixture_store());
        let people = service.find_by_name("smi", false).await.unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].surname.as_deref(), Some("Smith"));
        assert!(service.find_by_name("smi", true).await.is_err());
        let exact = service.find_by_name("John Smith", true).await.unwrap();
        assert_eq!(exact[0].db_id, 1000);
    }

    #[tokio::test]
    async fn test_find_by_orcid_or_db_id() {
        let service = PersonService::new(fixture_store());
        let by_orcid = service.find("0000-0001-2345-6789").await.unwrap();
        assert_eq!(by_orcid.db_id, 1000);
        assert_eq!(service.find("1001").await.unwrap().surname.as_deref(), Some("Doe"));
        // a pathway is not a person
        assert!(matches!(
            service.find("100").await,
            Err(ContentServiceError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_authored_pathways_and_publications() {
        let service = PersonService::new(fixture_store());
        let pathways = service.authored_pathways("1000").await.unwrap();
        let ids: Vec<_> = pathways.iter().map(|p| p["dbId"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![100, 200]);
        assert_eq!(service.authored_pathways("1001").await.unwrap().len(), 1);

        let publications = service.publications("1000").await.unwrap();
        assert_eq!(publications[0]["pubMedIdentifier"], serde_json::json!(123456));
        assert!(service.publications("1001").await.is_err());
    }
}
