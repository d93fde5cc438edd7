//! PSICQUIC registry and REST client.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use super::mitab;
use super::model::{Interaction, InteractorResource};
use crate::config::InteractorsConfig;
use crate::error::{ContentServiceError, Result};
use crate::metrics::InteractorMetrics;

/// Registry in `format=txt`: one `name=restUrl` per line.
pub fn parse_registry(text: &str) -> Vec<InteractorResource> {
    let mut resources: Vec<InteractorResource> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .filter(|(name, url)| !name.trim().is_empty() && url.trim().starts_with("http"))
        .map(|(name, url)| InteractorResource {
            name: name.trim().to_string(),
            rest_url: normalize_url(url),
            active: true,
        })
        .collect();
    resources.sort_by_key(|r| r.name.to_lowercase());
    resources
}

fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

/// `{base}query/{acc}` with `acc` escaped as a single path segment.
fn query_url(base: &str, acc: &str) -> Result<reqwest::Url> {
    let invalid = || ContentServiceError::bad_request(format!("Invalid PSICQUIC url '{}'", base));
    let mut url = reqwest::Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .push("query")
        .push(acc);
    Ok(url)
}

pub struct PsicquicClient {
    client: reqwest::Client,
    registry_url: String,
    registry: RwLock<Vec<InteractorResource>>,
}

impl PsicquicClient {
    pub fn new(config: &InteractorsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.psicquic_timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            registry_url: config.psicquic_registry_url.clone(),
            registry: RwLock::new(Vec::new()),
        })
    }

    /// Reloads the registry. On failure the previous list stays in place.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<usize> {
        let response = self.client.get(&self.registry_url).send().await?;
        if !response.status().is_success() {
            InteractorMetrics::record_registry_refresh_error();
            return Err(ContentServiceError::Internal(format!(
                "PSICQUIC registry returned {}",
                response.status()
            )));
        }
        let resources = parse_registry(&response.text().await?);
        if resources.is_empty() {
            InteractorMetrics::record_registry_refresh_error();
            return Err(ContentServiceError::Internal(
                "PSICQUIC registry listed no resources".to_string(),
            ));
        }
        let count = resources.len();
        *self.registry.write().unwrap_or_else(|e| e.into_inner()) = resources;
        InteractorMetrics::record_registry_refresh(count);
        info!("PSICQUIC registry refreshed: {} resources", count);
        Ok(count)
    }

    pub fn resources(&self) -> Vec<InteractorResource> {
        self.registry.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn resource(&self, name: &str) -> Result<InteractorResource> {
        self.resources()
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ContentServiceError::not_found(format!("PSICQUIC resource '{}' not found", name))
            })
    }

    /// MITAB 2.5 interactions of each accession at `rest_url`. Accessions the
    /// service knows nothing about map to an empty list.
    pub async fn query(
        &self,
        rest_url: &str,
        accs: &[String],
    ) -> Result<BTreeMap<String, Vec<Interaction>>> {
        let base = normalize_url(rest_url);
        let mut result = BTreeMap::new();
        for acc in accs {
            let started = Instant::now();
            let response = self
                .client
                .get(query_url(&base, acc)?)
                .query(&[("format", "tab25")])
                .send()
                .await?;
            InteractorMetrics::record_psicquic_query(started.elapsed().as_secs_f64());
            let status = response.status();
            let interactions = if status.is_success() {
                let (interactions, warnings) = mitab::parse(&response.text().await?);
                if !warnings.is_empty() {
                    debug!("{} unparseable MITAB rows for {} at {}", warnings.len(), acc, base);
                }
                interactions
            } else if status == reqwest::StatusCode::NOT_FOUND {
                Vec::new()
            } else {
                return Err(ContentServiceError::Internal(format!(
                    "PSICQUIC service {} returned {} for {}",
                    base, status, acc
                )));
            };
            result.insert(acc.clone(), interactions);
        }
        Ok(result)
    }

    /// Refreshes the registry now and then every `every`.
    pub fn spawn_refresh(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    warn!("PSICQUIC registry refresh failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(registry_url: String) -> PsicquicClient {
        PsicquicClient::new(&InteractorsConfig {
            psicquic_registry_url: registry_url,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_parse_registry_text() {
        let resources = parse_registry(
            "MINT=http://mint/psicquic/webservices/current/search\n\nIntAct=https://intact/psicquic/\nbroken line\n",
        );
        let names: Vec<_> = resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["IntAct", "MINT"]);
        assert_eq!(resources[1].rest_url, "http://mint/psicquic/webservices/current/search/");
    }

    #[test]
    fn test_accession_is_one_path_segment() {
        let url = query_url("http://host/psicquic/", "P1/2?x#y").unwrap();
        assert_eq!(url.as_str(), "http://host/psicquic/query/P1%2F2%3Fx%23y");
        assert_eq!(url.query(), None);
        assert!(query_url("not a url", "P1").is_err());
    }

    #[tokio::test]
    async fn test_refresh_keeps_previous_on_failure() {
        let server = MockServer::start_async().await;
        let mut ok = server
            .mock_async(|when, then| {
                when.method(GET).path("/registry");
                then.status(200).body("IntAct=https://intact/psicquic/\n");
            })
            .await;
        let client = client(server.url("/registry"));
        assert_eq!(client.refresh().await.unwrap(), 1);
        ok.delete_async().await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/registry");
                then.status(503);
            })
            .await;
        assert!(client.refresh().await.is_err());
        assert_eq!(client.resource("intact").unwrap().name, "IntAct");
        assert!(client.resource("MINT").is_err());
    }

    #[tokio::test]
    async fn test_query_parses_mitab() {
        let server = MockServer::start_async().await;
        let row = [
            "uniprotkb:P19367", "uniprotkb:P52789", "-", "-", "uniprotkb:HK1(gene name)", "-", "-", "-",
            "-", "taxid:9606", "taxid:9606", "-", "-", "intact:EBI-1", "intact-miscore:0.6",
        ]
        .join("\t");
        server
            .mock_async(|when, then| {
                when.method(GET).path("/psicquic/query/P19367");
                then.status(200).body(row);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/psicquic/query/Q00000");
                then.status(404);
            })
            .await;

        let client = client(server.url("/registry"));
        let result = client
            .query(&server.url("/psicquic"), &["P19367".to_string(), "Q00000".to_string()])
            .await
            .unwrap();
        assert_eq!(result["P19367"][0].score, Some(0.6));
        assert!(result["Q00000"].is_empty());
    }
}
