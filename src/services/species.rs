use std::sync::Arc;

use crate::constants::{SPECIES, TOP_LEVEL_PATHWAY};
use crate::domain::{Species, SpeciesFilter};
use crate::error::{ContentServiceError, Result};
use crate::graph::GraphStore;

pub struct SpeciesService {
    graph: Arc<dyn GraphStore>,
}

impl SpeciesService {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    pub async fn all(&self) -> Result<Vec<Species>> {
        let objects = self
            .graph
            .find_by_class(SPECIES, &SpeciesFilter::any(), 0, usize::MAX)
            .await?;
        let mut species: Vec<Species> = objects.iter().map(Species::from).collect();
        species.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(species)
    }

    /// Species with at least one top-level pathway.
    pub async fn main(&self) -> Result<Vec<Species>> {
        let mut main = Vec::new();
        for species in self.all().await? {
            let count = self
                .graph
                .count_by_class(
                    TOP_LEVEL_PATHWAY,
                    &SpeciesFilter::named(species.display_name.clone()),
                )
                .await?;
            if count > 0 {
                main.push(species);
            }
        }
        Ok(main)
    }

    /// Resolves a species given by dbId, taxonomy id, name or abbreviation.
    pub async fn resolve(&self, query: &str) -> Result<Species> {
        self.all()
            .await?
            .into_iter()
            .find(|s| s.matches(query))
            .ok_or_else(|| ContentServiceError::not_found(format!("Species '{}' not found", query)))
    }

    /// Filter for an optional species parameter; unknown species are a 404.
    pub async fn filter(&self, query: Option<&str>) -> Result<SpeciesFilter> {
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => Ok(SpeciesFilter::named(self.resolve(q).await?.display_name)),
            None => Ok(SpeciesFilter::any()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;

    #[tokio::test]
    async fn test_all_species_sorted() {
        let service = SpeciesService::new(fixture_store());
        let names: Vec<_> = service
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.display_name)
            .collect();
        assert_eq!(names, vec!["Gallus gallus", "Homo sapiens", "Mus musculus"]);
    }

    #[tokio::test]
    async fn test_main_species_have_top_level_pathways() {
        let service = SpeciesService::new(fixture_store());
        let main: Vec<_> = service
            .main()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.db_id)
            .collect();
        assert_eq!(main, vec![48887, 48892]);
    }

    #[tokio::test]
    async fn test_resolve_by_tax_id_and_unknown() {
        let service = SpeciesService::new(fixture_store());
        assert_eq!(service.resolve("10090").await.unwrap().display_name, "Mus musculus");
        assert!(matches!(
            service.resolve("Danio rerio").await,
            Err(ContentServiceError::NotFound(_))
        ));
        assert_eq!(service.filter(Some("  ")).await.unwrap(), SpeciesFilter::any());
    }
}
