//! `/data`: knowledgebase queries answered from the graph.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::Value;

use super::{extract::{Path, Query}, id, SharedState};
use crate::domain::{Person, ShallowObject, Species};
use crate::error::Result;
use crate::services::entities::ComponentOf;
use crate::services::events::EventNode;
use crate::services::participants::Participant;
use crate::services::pathways::MappingTarget;
use crate::services::schema::DiseaseEntry;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SpeciesParam {
    species: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LowLevelParams {
    species: Option<String>,
    all_forms: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SubunitParams {
    exclude_structures: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SchemaParams {
    species: Option<String>,
    page: Option<usize>,
    offset: Option<usize>,
}

pub(super) fn routes() -> Router<SharedState> {
    Router::new()
        .route("/database/name", get(database_name))
        .route("/database/version", get(database_version))
        .route("/query/ids", post(query_ids))
        .route("/query/enhanced/:id", get(query_enhanced))
        .route("/query/:id", get(query_by_id))
        .route("/query/:id/:attribute", get(query_attribute))
        .route("/species/all", get(species_all))
        .route("/species/main", get(species_main))
        .route("/pathways/top/:species", get(top_level_pathways))
        .route("/eventsHierarchy/:species", get(events_hierarchy))
        .route("/event/:id/ancestors", get(event_ancestors))
        .route("/pathway/:id/containedEvents", get(contained_events))
        .route(
            "/pathway/:id/containedEvents/:attribute",
            get(contained_events_attribute),
        )
        .route("/participants/:id", get(participants))
        .route(
            "/participants/:id/participatingPhysicalEntities",
            get(participating_physical_entities),
        )
        .route("/participants/:id/referenceEntities", get(reference_entities))
        .route("/complex/:id/subunits", get(complex_subunits))
        .route("/entity/:id/componentOf", get(component_of))
        .route("/entity/:id/otherForms", get(other_forms))
        .route("/pathways/low/entity/:id", get(low_level_pathways))
        .route(
            "/pathways/low/diagram/entity/:id",
            get(low_level_pathways_with_diagram),
        )
        .route("/mapping/:resource/:identifier/pathways", get(mapping_pathways))
        .route("/mapping/:resource/:identifier/reactions", get(mapping_reactions))
        .route("/orthology/:id/species/:species", get(orthology))
        .route("/orthologies/ids/species/:species", post(orthologies))
        .route("/people/name/:name", get(people_by_name))
        .route("/people/name/:name/exact", get(people_by_exact_name))
        .route("/person/:id", get(person))
        .route("/person/:id/authoredPathways", get(authored_pathways))
        .route("/person/:id/publications", get(publications))
        .route("/schema/:class", get(schema_objects))
        .route("/schema/:class/min", get(schema_min_objects))
        .route("/schema/:class/count", get(schema_count))
        .route("/diseases", get(diseases))
        .route("/diseases/doid", get(diseases_doid))
        .route("/discover/:id", get(discover))
}

async fn database_name(State(state): State<SharedState>) -> Result<String> {
    Ok(state.services.query.db_info().await?.name)
}

async fn database_version(State(state): State<SharedState>) -> Result<String> {
    Ok(state.services.query.db_info().await?.version.to_string())
}

async fn query_by_id(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Value>> {
    Ok(Json(state.services.query.find(&id(&raw)?).await?))
}

async fn query_enhanced(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Value>> {
    Ok(Json(state.services.query.find_enhanced(&id(&raw)?).await?))
}

async fn query_attribute(
    State(state): State<SharedState>,
    Path((raw, attribute)): Path<(String, String)>,
) -> Result<String> {
    state.services.query.attribute(&id(&raw)?, &attribute).await
}

async fn query_ids(State(state): State<SharedState>, body: String) -> Result<Json<Value>> {
    Ok(Json(state.services.query.find_many(&body).await?))
}

async fn species_all(State(state): State<SharedState>) -> Result<Json<Vec<Species>>> {
    Ok(Json(state.services.species.all().await?))
}

async fn species_main(State(state): State<SharedState>) -> Result<Json<Vec<Species>>> {
    Ok(Json(state.services.species.main().await?))
}

async fn top_level_pathways(
    State(state): State<SharedState>,
    Path(species): Path<String>,
) -> Result<Json<Vec<Value>>> {
    let filter = state.services.species.filter(Some(species.as_str())).await?;
    let pathways = state.services.events.top_level_pathways(&filter).await?;
    Ok(Json(pathways.iter().map(|p| p.to_flat_json()).collect()))
}

async fn events_hierarchy(
    State(state): State<SharedState>,
    Path(species): Path<String>,
) -> Result<Json<Vec<EventNode>>> {
    let filter = state.services.species.filter(Some(species.as_str())).await?;
    Ok(Json(state.services.events.hierarchy(&filter).await?))
}

async fn event_ancestors(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
) -> Result<Json<Vec<Vec<ShallowObject>>>> {
    Ok(Json(state.services.events.ancestors(&id(&raw)?).await?))
}

async fn contained_events(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Vec<Value>>> {
    let events = state.services.events.contained_events(&id(&raw)?).await?;
    Ok(Json(events.iter().map(|e| e.to_flat_json()).collect()))
}

async fn contained_events_attribute(
    State(state): State<SharedState>,
    Path((raw, attribute)): Path<(String, String)>,
) -> Result<String> {
    state
        .services
        .events
        .contained_events_attribute(&id(&raw)?, &attribute)
        .await
}

async fn participants(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Vec<Participant>>> {
    Ok(Json(state.services.participants.participants(&id(&raw)?).await?))
}

async fn participating_physical_entities(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
) -> Result<Json<Vec<Value>>> {
    Ok(Json(
        state
            .services
            .participants
            .participating_physical_entities(&id(&raw)?)
            .await?,
    ))
}

async fn reference_entities(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Vec<Value>>> {
    Ok(Json(state.services.participants.reference_entities(&id(&raw)?).await?))
}

async fn complex_subunits(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
    Query(params): Query<SubunitParams>,
) -> Result<Json<Vec<Value>>> {
    Ok(Json(
        state
            .services
            .entities
            .subunits(&id(&raw)?, params.exclude_structures)
            .await?,
    ))
}

async fn component_of(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Vec<ComponentOf>>> {
    Ok(Json(state.services.entities.component_of(&id(&raw)?).await?))
}

async fn other_forms(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Vec<Value>>> {
    Ok(Json(state.services.entities.other_forms(&id(&raw)?).await?))
}

async fn low_level_pathways(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
    Query(params): Query<LowLevelParams>,
) -> Result<Json<Vec<Value>>> {
    let filter = state.services.species.filter(params.species.as_deref()).await?;
    Ok(Json(
        state
            .services
            .pathways
            .low_level_pathways(&id(&raw)?, &filter, params.all_forms)
            .await?,
    ))
}

async fn low_level_pathways_with_diagram(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
    Query(params): Query<LowLevelParams>,
) -> Result<Json<Vec<Value>>> {
    let filter = state.services.species.filter(params.species.as_deref()).await?;
    Ok(Json(
        state
            .services
            .pathways
            .low_level_pathways_with_diagram(&id(&raw)?, &filter, params.all_forms)
            .await?,
    ))
}

async fn mapping(
    state: &SharedState,
    resource: &str,
    identifier: &str,
    species: Option<&str>,
    target: MappingTarget,
) -> Result<Json<Vec<Value>>> {
    let filter = state.services.species.filter(species).await?;
    Ok(Json(
        state
            .services
            .pathways
            .mapping(resource, identifier, &filter, target)
            .await?,
    ))
}

async fn mapping_pathways(
    State(state): State<SharedState>,
    Path((resource, identifier)): Path<(String, String)>,
    Query(params): Query<SpeciesParam>,
) -> Result<Json<Vec<Value>>> {
    mapping(&state, &resource, &identifier, params.species.as_deref(), MappingTarget::Pathways).await
}

async fn mapping_reactions(
    State(state): State<SharedState>,
    Path((resource, identifier)): Path<(String, String)>,
    Query(params): Query<SpeciesParam>,
) -> Result<Json<Vec<Value>>> {
    mapping(&state, &resource, &identifier, params.species.as_deref(), MappingTarget::Reactions).await
}

async fn orthology(
    State(state): State<SharedState>,
    Path((raw, species)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let filter = state.services.species.filter(Some(species.as_str())).await?;
    Ok(Json(state.services.orthology.orthology(&id(&raw)?, &filter).await?))
}

async fn orthologies(
    State(state): State<SharedState>,
    Path(species): Path<String>,
    body: String,
) -> Result<Json<Value>> {
    let filter = state.services.species.filter(Some(species.as_str())).await?;
    Ok(Json(state.services.orthology.orthologies(&body, &filter).await?))
}

async fn people_by_name(State(state): State<SharedState>, Path(name): Path<String>) -> Result<Json<Vec<Person>>> {
    Ok(Json(state.services.person.find_by_name(&name, false).await?))
}

async fn people_by_exact_name(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Person>>> {
    Ok(Json(state.services.person.find_by_name(&name, true).await?))
}

async fn person(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Person>> {
    Ok(Json(state.services.person.find(&raw).await?))
}

async fn authored_pathways(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Vec<Value>>> {
    Ok(Json(state.services.person.authored_pathways(&raw).await?))
}

async fn publications(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Vec<Value>>> {
    Ok(Json(state.services.person.publications(&raw).await?))
}

async fn schema_objects(
    State(state): State<SharedState>,
    Path(class): Path<String>,
    Query(params): Query<SchemaParams>,
) -> Result<Json<Vec<Value>>> {
    let filter = state.services.species.filter(params.species.as_deref()).await?;
    Ok(Json(
        state
            .services
            .schema
            .objects(&class, &filter, params.page, params.offset)
            .await?,
    ))
}

async fn schema_min_objects(
    State(state): State<SharedState>,
    Path(class): Path<String>,
    Query(params): Query<SchemaParams>,
) -> Result<Json<Vec<ShallowObject>>> {
    let filter = state.services.species.filter(params.species.as_deref()).await?;
    Ok(Json(
        state
            .services
            .schema
            .min_objects(&class, &filter, params.page, params.offset)
            .await?,
    ))
}

async fn schema_count(
    State(state): State<SharedState>,
    Path(class): Path<String>,
    Query(params): Query<SpeciesParam>,
) -> Result<String> {
    let filter = state.services.species.filter(params.species.as_deref()).await?;
    Ok(state.services.schema.count(&class, &filter).await?.to_string())
}

async fn diseases(State(state): State<SharedState>) -> Result<Json<Vec<DiseaseEntry>>> {
    Ok(Json(state.services.schema.diseases().await?))
}

async fn diseases_doid(State(state): State<SharedState>) -> Result<String> {
    state.services.schema.diseases_doid().await
}

async fn discover(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Value>> {
    Ok(Json(state.services.discover.discover(&id(&raw)?).await?))
}
