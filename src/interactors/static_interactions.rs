use std::sync::Arc;

use super::model::{Interaction, Interactor};
use crate::constants::{INTERACTION, INTERACTOR, REFERENCE_ENTITY};
use crate::domain::DatabaseObject;
use crate::error::Result;
use crate::graph::{GraphStore, MatchMode};

/// Interactions curated into the knowledgebase itself (IntAct derived).
pub struct StaticInteractions {
    graph: Arc<dyn GraphStore>,
}

fn interactor(reference: &DatabaseObject) -> Interactor {
    let alias = reference
        .property("geneName")
        .and_then(|v| match v {
            serde_json::Value::Array(names) => names.first().and_then(|n| n.as_str()),
            other => other.as_str(),
        })
        .map(str::to_string);
    Interactor {
        acc: reference
            .property_str("identifier")
            .unwrap_or(reference.display_name.as_str())
            .to_string(),
        alias,
        taxid: reference.property_str("taxId").map(str::to_string),
    }
}

impl StaticInteractions {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    /// Interactions of `acc`, with `acc` always as interactor A.
    pub async fn interactions_of(&self, acc: &str) -> Result<Vec<Interaction>> {
        let references = self
            .graph
            .find_by_property(REFERENCE_ENTITY, "identifier", acc, MatchMode::Exact)
            .await?;
        let mut interactions = Vec::new();
        for reference in &references {
            let this = interactor(reference);
            for link in self.graph.incoming(reference.db_id, &[INTERACTOR]).await? {
                if !link.object.is_a(INTERACTION) {
                    continue;
                }
                let partners = self.graph.outgoing(link.object.db_id, &[INTERACTOR]).await?;
                // a self interaction lists the same reference twice
                let partner = partners
                    .iter()
                    .map(|p| &p.object)
                    .find(|p| p.db_id != reference.db_id)
                    .unwrap_or(reference);
                let evidences = link
                    .object
                    .property("accession")
                    .and_then(|v| v.as_array())
                    .map(|values| {
                        values
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                interactions.push(Interaction {
                    interactor_a: this.clone(),
                    interactor_b: interactor(partner),
                    score: link.object.property("score").and_then(|v| v.as_f64()),
                    evidences,
                });
            }
        }
        Ok(interactions)
    }
}
