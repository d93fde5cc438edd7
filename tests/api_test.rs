use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

use content_service::config::Config;
use content_service::error::Result as ServiceResult;
use content_service::graph::InMemoryGraph;
use content_service::interactors::PsicquicClient;
use content_service::search::{FacetMapping, SearchBackend, SearchEntry, SearchPage, SearchQuery};
use content_service::server::{create_router, AppState};
use content_service::template::PageFragments;

const FIXTURE: &str = include_str!("fixtures/graph.json");
const MAX_UPLOAD: usize = 1024;

/// Knows about glucose and nothing else.
struct GlucoseIndex;

fn glucose(db_id: &str, kind: &str) -> SearchEntry {
    SearchEntry {
        db_id: db_id.to_string(),
        st_id: Some(format!("R-HSA-{}", db_id)),
        name: "glucose".to_string(),
        exact_type: Some(kind.to_string()),
        species: vec!["Homo sapiens".to_string()],
        summation: None,
        compartment_names: vec!["cytosol".to_string()],
        is_disease: false,
    }
}

#[async_trait]
impl SearchBackend for GlucoseIndex {
    async fn search(&self, query: &SearchQuery) -> ServiceResult<SearchPage> {
        if query.query != "glucose" {
            return Ok(SearchPage::default());
        }
        Ok(SearchPage {
            found: 3,
            entries: vec![
                glucose("500", "SimpleEntity"),
                glucose("300", "Reaction"),
                glucose("501", "SimpleEntity"),
            ],
        })
    }

    async fn facets(&self, _query: Option<&SearchQuery>) -> ServiceResult<FacetMapping> {
        Ok(FacetMapping {
            total_num_found: 3,
            ..Default::default()
        })
    }

    async fn suggest(&self, _term: &str) -> ServiceResult<Vec<String>> {
        Ok(vec!["glucose".to_string()])
    }

    async fn spellcheck(&self, _term: &str) -> ServiceResult<Vec<String>> {
        Ok(vec!["glucose".to_string()])
    }

    async fn fireworks(&self, query: &SearchQuery) -> ServiceResult<SearchPage> {
        self.search(query).await
    }
}

struct TestApp {
    router: Router,
    _dir: TempDir,
}

fn app() -> Result<TestApp> {
    let dir = tempdir()?;
    let mut config = Config::default();
    config.interactors.token_dir = dir.path().join("tokens");
    config.interactors.max_upload_bytes = MAX_UPLOAD;
    config.exporter.cache_dir = dir.path().join("exporter");

    let graph = Arc::new(InMemoryGraph::from_json(FIXTURE)?);
    let psicquic = Arc::new(PsicquicClient::new(&config.interactors)?);
    let fragments = Arc::new(PageFragments::new(&config.template)?);
    let state = Arc::new(AppState::new(
        &config,
        graph,
        Arc::new(GlucoseIndex),
        psicquic,
        fragments,
    ));
    Ok(TestApp {
        router: create_router(state, MAX_UPLOAD),
        _dir: dir,
    })
}

async fn send(app: &TestApp, request: Request<Body>) -> Result<(StatusCode, axum::http::HeaderMap, Vec<u8>)> {
    let response = app.router.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, headers, body.to_vec()))
}

async fn get(app: &TestApp, uri: &str) -> Result<(StatusCode, axum::http::HeaderMap, Vec<u8>)> {
    send(app, Request::get(uri).body(Body::empty())?).await
}

async fn post(app: &TestApp, uri: &str, body: &str) -> Result<(StatusCode, axum::http::HeaderMap, Vec<u8>)> {
    send(
        app,
        Request::post(uri)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(body.to_string()))?,
    )
    .await
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("response is JSON")
}

#[tokio::test]
async fn test_database_endpoints_are_text() -> Result<()> {
    let app = app()?;
    let (status, headers, body) = get(&app, "/data/database/version").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str()?.starts_with("text/plain"));
    assert_eq!(body, b"87");

    let (_, _, body) = get(&app, "/data/database/name").await?;
    assert_eq!(body, b"reactome");
    Ok(())
}

#[tokio::test]
async fn test_query_by_stable_id_is_jsog() -> Result<()> {
    let app = app()?;
    let (status, _, body) = get(&app, "/data/query/R-HSA-200.3").await?;
    assert_eq!(status, StatusCode::OK);
    let value = json_body(&body);
    assert_eq!(value["@id"], json!("1"));
    assert_eq!(value["dbId"], json!(200));
    assert_eq!(value["stId"], json!("R-HSA-200"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_id_has_error_body() -> Result<()> {
    let app = app()?;
    let (status, headers, body) = get(&app, "/data/query/987654").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let value = json_body(&body);
    assert_eq!(value["code"], json!(404));
    assert_eq!(value["reason"], json!("Not Found"));
    assert!(value["messages"][0].as_str().unwrap().contains("987654"));
    Ok(())
}

#[tokio::test]
async fn test_query_many_ids() -> Result<()> {
    let app = app()?;
    let (status, _, body) = post(&app, "/data/query/ids", "100, 200\n987654").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body).as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_hierarchy_routes() -> Result<()> {
    let app = app()?;
    let (status, _, body) = get(&app, "/data/pathways/top/Homo%20sapiens").await?;
    assert_eq!(status, StatusCode::OK);
    let top = json_body(&body);
    assert!(top.as_array().unwrap().iter().any(|p| p["dbId"] == json!(100)));

    let (status, _, body) = get(&app, "/data/event/310/ancestors").await?;
    assert_eq!(status, StatusCode::OK);
    let routes = json_body(&body);
    assert_eq!(routes.as_array().map(Vec::len), Some(2));
    assert_eq!(routes[0][0]["dbId"], json!(310));

    let (status, _, body) = get(&app, "/data/pathway/200/containedEvents/dbId").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body)?.lines().any(|l| l == "300"));
    Ok(())
}

#[tokio::test]
async fn test_schema_paging_is_validated() -> Result<()> {
    let app = app()?;
    let (status, _, _) = get(&app, "/data/schema/Pathway?page=1&offset=26").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, body) = get(&app, "/data/schema/Pathway/count").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body)?.parse::<usize>()? > 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_parameters_have_error_body() -> Result<()> {
    let app = app()?;
    for uri in [
        "/citation/export/R-HSA-100",
        "/data/schema/Pathway?page=one",
        "/data/schema/Pathway?page=1&offset=-3",
    ] {
        let (status, headers, body) = get(&app, uri).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json", "{uri}");
        let value = json_body(&body);
        assert_eq!(value["code"], json!(400), "{uri}");
        assert!(!value["messages"][0].as_str().unwrap_or_default().is_empty(), "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn test_search_clusters_and_suggests() -> Result<()> {
    let app = app()?;
    let (status, _, body) = get(&app, "/search/query?query=glucose&cluster=true").await?;
    assert_eq!(status, StatusCode::OK);
    let value = json_body(&body);
    assert_eq!(value["found"], json!(3));
    assert_eq!(value["results"][0]["typeName"], json!("SimpleEntity"));
    assert_eq!(value["results"][0]["entriesCount"], json!(2));

    let (status, _, body) = get(&app, "/search/query?query=glucse").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let messages = json_body(&body)["messages"].clone();
    assert_eq!(messages[1], json!("glucose"));
    Ok(())
}

#[tokio::test]
async fn test_static_interactors() -> Result<()> {
    let app = app()?;
    let (status, _, body) = get(&app, "/interactors/static/molecule/P19367/details").await?;
    assert_eq!(status, StatusCode::OK);
    let value = json_body(&body);
    assert_eq!(value["resource"], json!("static"));
    let first = &value["entities"][0]["interactors"][0];
    assert_eq!(first["acc"], json!("P52789"));
    assert_eq!(first["accURL"], json!("https://www.uniprot.org/uniprot/P52789"));
    Ok(())
}

#[tokio::test]
async fn test_upload_content_then_query_token() -> Result<()> {
    let app = app()?;
    let (status, _, body) = post(&app, "/interactors/upload/tuple/content", "P1\tP2\nP1\tP3\n").await?;
    assert_eq!(status, StatusCode::OK);
    let result = json_body(&body);
    let token = result["summary"]["token"].as_str().unwrap().to_string();
    assert_eq!(result["summary"]["interactions"], json!(2));

    let (status, _, body) = post(&app, &format!("/interactors/token/{}/molecules/summary", token), "P1 P2").await?;
    assert_eq!(status, StatusCode::OK);
    let value = json_body(&body);
    assert_eq!(value["entities"][0]["count"], json!(2));
    assert_eq!(value["entities"][1]["count"], json!(1));

    let (status, _, _) = get(&app, "/interactors/token/AAAAAAAAAAAAAAAA/molecule/P1/summary").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_multipart_upload_and_limits() -> Result<()> {
    let app = app()?;
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"pairs.csv\"\r\nContent-Type: text/csv\r\n\r\nP1,P2\nP3,P4\n\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::post("/interactors/upload/tuple/form")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))?;
    let (status, _, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    let result = json_body(&body);
    assert_eq!(result["summary"]["name"], json!("pairs.csv"));
    assert_eq!(result["summary"]["interactors"], json!(4));

    let big = "P1\tP2\n".repeat(MAX_UPLOAD);
    let (status, _, _) = post(&app, "/interactors/upload/tuple/content", &big).await?;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _, _) = post(&app, "/interactors/upload/tuple/content", "   \n").await?;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    Ok(())
}

#[tokio::test]
async fn test_citation_export_is_an_attachment() -> Result<()> {
    let app = app()?;
    let (status, headers, body) = get(&app, "/citation/export/R-HSA-100?ext=ris").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"R-HSA-100.ris\""
    );
    assert!(String::from_utf8(body)?.starts_with("TY  - DATA\n"));

    let (status, _, _) = get(&app, "/citation/export/R-HSA-100?ext=pdf").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_event_export_is_cached() -> Result<()> {
    let app = app()?;
    let (status, headers, _) = get(&app, "/exporter/event/R-HSA-200.json").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-cache"], "MISS");
    let (_, headers, _) = get(&app, "/exporter/event/R-HSA-200.json").await?;
    assert_eq!(headers["x-cache"], "HIT");

    let (status, headers, body) = get(&app, "/exporter/event/R-HSA-300.tsv").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str()?.starts_with("text/tab-separated-values"));
    assert!(String::from_utf8(body)?.starts_with("dbId\t"));
    Ok(())
}

#[tokio::test]
async fn test_health_landing_and_cors() -> Result<()> {
    let app = app()?;
    let (status, _, body) = get(&app, "/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["status"], json!("healthy"));

    let (status, _, body) = get(&app, "/").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body)?.contains("release 87"));

    let request = Request::get("/data/species/main")
        .header(header::ORIGIN, "https://example.org")
        .body(Body::empty())?;
    let (status, headers, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    Ok(())
}
