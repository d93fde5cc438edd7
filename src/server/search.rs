//! `/search`: full-text search over the index.

use axum::{
    extract::State,
    response::Json,
    routing::get,
    Router,
};

use super::{extract::Query, SharedState};
use crate::error::{ContentServiceError, Result};
use crate::search::service::FireworksResult;
use crate::search::{FacetMapping, GroupedResult, SearchQuery};

pub(super) fn routes() -> Router<SharedState> {
    Router::new()
        .route("/query", get(query))
        .route("/facet", get(facet))
        .route("/facet_query", get(facet_query))
        .route("/suggest", get(suggest))
        .route("/spellcheck", get(spellcheck))
        .route("/fireworks", get(fireworks))
}

/// Builds a [`SearchQuery`] from raw pairs; filters may repeat
/// (`species=Homo+sapiens&species=Mus+musculus`).
pub(crate) fn search_query(pairs: Vec<(String, String)>) -> Result<SearchQuery> {
    let mut query = SearchQuery::default();
    let number = |key: &str, value: &str| {
        value.trim().parse::<usize>().map_err(|_| {
            ContentServiceError::bad_request(format!("'{}' is not a valid {}", value, key))
        })
    };
    for (key, value) in pairs {
        match key.as_str() {
            "query" | "q" => query.query = value,
            "species" => query.species.push(value),
            "types" | "type" => query.types.push(value),
            "compartments" | "compartment" => query.compartments.push(value),
            "keywords" | "keyword" => query.keywords.push(value),
            "cluster" => query.cluster = value.trim().eq_ignore_ascii_case("true"),
            "start" => query.start = Some(number("start", &value)?),
            "rows" => query.rows = Some(number("rows", &value)?),
            _ => {}
        }
    }
    Ok(query)
}

async fn query(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<GroupedResult>> {
    Ok(Json(state.search.search(&search_query(pairs)?).await?))
}

async fn facet(State(state): State<SharedState>) -> Result<Json<FacetMapping>> {
    Ok(Json(state.search.facets().await?))
}

async fn facet_query(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<FacetMapping>> {
    Ok(Json(state.search.facet_query(&search_query(pairs)?).await?))
}

async fn suggest(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<String>>> {
    let query = search_query(pairs)?;
    Ok(Json(state.search.suggest(&query.query).await?))
}

async fn spellcheck(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<String>>> {
    let query = search_query(pairs)?;
    Ok(Json(state.search.spellcheck(&query.query).await?))
}

async fn fireworks(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<FireworksResult>> {
    Ok(Json(state.search.fireworks(&search_query(pairs)?).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_repeated_filters_accumulate() {
        let query = search_query(pairs(&[
            ("query", "glucose"),
            ("species", "Homo sapiens"),
            ("species", "Mus musculus"),
            ("types", "Reaction"),
            ("cluster", "true"),
            ("rows", "10"),
        ]))
        .unwrap();
        assert_eq!(query.query, "glucose");
        assert_eq!(query.species, vec!["Homo sapiens", "Mus musculus"]);
        assert_eq!(query.types, vec!["Reaction"]);
        assert!(query.cluster);
        assert_eq!(query.rows, Some(10));
        assert_eq!(query.start, None);
    }

    #[test]
    fn test_invalid_paging_is_rejected() {
        assert!(matches!(
            search_query(pairs(&[("start", "-1")])),
            Err(ContentServiceError::BadRequest(_))
        ));
    }
}
