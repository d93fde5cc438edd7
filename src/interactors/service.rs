use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::*;
use super::parser;
use super::psicquic::PsicquicClient;
use super::static_interactions::StaticInteractions;
use super::tokens::TokenStore;
use crate::constants::{
    CHEBI_ACCESSION_URL, INTACT_ACCESSION_URL, STATIC_RESOURCE, UNIPROT_ACCESSION_URL,
};
use crate::error::{ContentServiceError, Result};
use crate::metrics::InteractorMetrics;

const UPLOAD_DIR: &str = "uploads";

static UNIPROT_ACCESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([OPQ][0-9][A-Z0-9]{3}[0-9]|[A-NR-Z][0-9]([A-Z][A-Z0-9]{2}[0-9]){1,2})(-\d+)?$")
        .expect("valid uniprot accession regex")
});

/// An upload written to disk for parsing; removed when dropped.
struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    async fn write(dir: PathBuf, bytes: &[u8]) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.upload", Uuid::new_v4()));
        fs::write(&path, bytes).await?;
        Ok(Self { path })
    }

    async fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path).await?)
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Could not remove upload {}: {}", self.path.display(), e);
        }
    }
}

/// Splits a POST body of accessions on commas, whitespace and newlines.
pub fn parse_accessions(body: &str) -> Result<Vec<String>> {
    let mut accs: Vec<String> = Vec::new();
    for acc in body.split(|c: char| c == ',' || c.is_whitespace()) {
        let acc = acc.trim();
        if !acc.is_empty() && !accs.iter().any(|a| a == acc) {
            accs.push(acc.to_string());
        }
    }
    if accs.is_empty() {
        return Err(ContentServiceError::bad_request("No accessions provided"));
    }
    Ok(accs)
}

/// Pagination of the partner lists; `None` returns everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paging {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl Paging {
    fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        match (self.page, self.page_size) {
            (Some(page), Some(size)) if page > 0 && size > 0 => items
                .into_iter()
                .skip((page - 1).saturating_mul(size))
                .take(size)
                .collect(),
            _ => items,
        }
    }
}

/// Interactor queries over the static graph data, PSICQUIC services and
/// user uploads.
pub struct InteractorsService {
    static_source: StaticInteractions,
    psicquic: Arc<PsicquicClient>,
    tokens: TokenStore,
    http: reqwest::Client,
    max_upload_bytes: usize,
}

impl InteractorsService {
    pub fn new(
        static_source: StaticInteractions,
        psicquic: Arc<PsicquicClient>,
        tokens: TokenStore,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            static_source,
            psicquic,
            tokens,
            http: reqwest::Client::new(),
            max_upload_bytes,
        }
    }

    pub fn psicquic(&self) -> &Arc<PsicquicClient> {
        &self.psicquic
    }

    pub async fn static_details(&self, accs: &[String], paging: Paging) -> Result<InteractionsResult> {
        let by_acc = self.static_interactions(accs).await?;
        Ok(details(STATIC_RESOURCE, by_acc, paging))
    }

    pub async fn static_summary(&self, accs: &[String]) -> Result<InteractionsResult> {
        let by_acc = self.static_interactions(accs).await?;
        Ok(summary(STATIC_RESOURCE, by_acc))
    }

    pub fn psicquic_resources(&self) -> Vec<InteractorResource> {
        self.psicquic.resources()
    }

    pub async fn psicquic_details(
        &self,
        resource: &str,
        accs: &[String],
        paging: Paging,
    ) -> Result<InteractionsResult> {
        let resource = self.psicquic.resource(resource)?;
        let by_acc = self.psicquic.query(&resource.rest_url, accs).await?;
        Ok(details(&resource.name, by_acc, paging))
    }

    pub async fn psicquic_summary(&self, resource: &str, accs: &[String]) -> Result<InteractionsResult> {
        let resource = self.psicquic.resource(resource)?;
        let by_acc = self.psicquic.query(&resource.rest_url, accs).await?;
        Ok(summary(&resource.name, by_acc))
    }

    /// Stores `bytes` in a temporary file, parses that file and removes it,
    /// whether or not parsing succeeded.
    pub async fn upload_file(&self, name: &str, bytes: &[u8]) -> Result<TupleResult> {
        self.check_size(bytes.len())?;
        let temp = TempUpload::write(self.tokens.dir().join(UPLOAD_DIR), bytes).await?;
        let result = self.store_upload(name, &temp.read().await?).await;
        drop(temp);
        result
    }

    pub async fn upload_url(&self, url: &str) -> Result<TupleResult> {
        let url = reqwest::Url::parse(url.trim())
            .map_err(|e| ContentServiceError::bad_request(format!("Invalid url '{}': {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ContentServiceError::bad_request("Only http and https urls are supported"));
        }
        let response = self.http.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(ContentServiceError::bad_request(format!(
                "Could not download {}: {}",
                url,
                response.status()
            )));
        }
        if let Some(length) = response.content_length() {
            self.check_size(usize::try_from(length).unwrap_or(usize::MAX))?;
        }
        let bytes = self.read_limited(response).await?;
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("url")
            .to_string();
        self.upload_file(&name, &bytes).await
    }

    pub async fn upload_content(&self, content: &str) -> Result<TupleResult> {
        self.upload_file("content", content.as_bytes()).await
    }

    /// Registers a user supplied PSICQUIC service under a new token.
    pub async fn register_psicquic(&self, name: &str, url: &str) -> Result<String> {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| ContentServiceError::bad_request(format!("Invalid url '{}': {}", url, e)))?;
        let entry = TokenEntry::Psicquic(CustomPsicquic {
            name: if name.trim().is_empty() { parsed.host_str().unwrap_or("custom").to_string() } else { name.trim().to_string() },
            url: parsed.to_string(),
            created: Utc::now(),
        });
        self.tokens.save(&entry).await
    }

    pub async fn token_details(&self, token: &str, accs: &[String], paging: Paging) -> Result<InteractionsResult> {
        let (name, by_acc) = self.token_interactions(token, accs).await?;
        Ok(details(&name, by_acc, paging))
    }

    pub async fn token_summary(&self, token: &str, accs: &[String]) -> Result<InteractionsResult> {
        let (name, by_acc) = self.token_interactions(token, accs).await?;
        Ok(summary(&name, by_acc))
    }

    /// Reads a download chunk by chunk, giving up as soon as it outgrows the
    /// upload limit. Chunked responses carry no length up front.
    async fn read_limited(&self, mut response: reqwest::Response) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            self.check_size(bytes.len().saturating_add(chunk.len()))?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_upload_bytes {
            return Err(ContentServiceError::PayloadTooLarge(format!(
                "{} bytes exceeds the limit of {} bytes",
                size, self.max_upload_bytes
            )));
        }
        Ok(())
    }

    async fn store_upload(&self, name: &str, bytes: &[u8]) -> Result<TupleResult> {
        let outcome = parser::check_content(bytes).and_then(|text| parser::parse(&text));
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                InteractorMetrics::record_upload_rejected();
                return Err(e);
            }
        };
        let interactors = distinct_interactors(&outcome.interactions);
        let interactions = outcome.interactions.len();
        let entry = TokenEntry::Interactions(CustomInteractions {
            name: name.to_string(),
            format: outcome.format,
            interactions: outcome.interactions,
            created: Utc::now(),
        });
        let token = self.tokens.save(&entry).await?;
        InteractorMetrics::record_upload(outcome.format.as_str(), interactions);
        info!(
            "Upload '{}' stored as {} ({} interactions, {} warnings)",
            name,
            token,
            interactions,
            outcome.warnings.len()
        );
        Ok(TupleResult {
            summary: UploadSummary {
                token,
                name: name.to_string(),
                interactors,
                interactions,
            },
            warning_messages: outcome.warnings,
        })
    }

    async fn static_interactions(&self, accs: &[String]) -> Result<BTreeMap<String, Vec<Interaction>>> {
        let mut by_acc = BTreeMap::new();
        for acc in accs {
            by_acc.insert(acc.clone(), self.static_source.interactions_of(acc).await?);
        }
        Ok(by_acc)
    }

    async fn token_interactions(
        &self,
        token: &str,
        accs: &[String],
    ) -> Result<(String, BTreeMap<String, Vec<Interaction>>)> {
        match self.tokens.load(token).await? {
            TokenEntry::Interactions(custom) => {
                let by_acc = accs
                    .iter()
                    .map(|acc| {
                        let found: Vec<Interaction> = custom
                            .interactions
                            .iter()
                            .filter_map(|i| {
                                i.partner_of(acc).map(|partner| Interaction {
                                    interactor_a: if i.interactor_a.acc.eq_ignore_ascii_case(acc) {
                                        i.interactor_a.clone()
                                    } else {
                                        i.interactor_b.clone()
                                    },
                                    interactor_b: partner.clone(),
                                    score: i.score,
                                    evidences: i.evidences.clone(),
                                })
                            })
                            .collect();
                        (acc.clone(), found)
                    })
                    .collect();
                Ok((custom.name, by_acc))
            }
            TokenEntry::Psicquic(custom) => {
                debug!("Token {} forwards to PSICQUIC service {}", token, custom.url);
                let by_acc = self.psicquic.query(&custom.url, accs).await?;
                Ok((custom.name, by_acc))
            }
        }
    }
}

/// Link to the partner's entry in the database its accession belongs to.
fn accession_url(acc: &str) -> Option<String> {
    let chebi = acc
        .get(..6)
        .filter(|prefix| prefix.eq_ignore_ascii_case("chebi:"))
        .map(|_| &acc[6..])
        .unwrap_or(acc);
    if !chebi.is_empty() && chebi.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("{}{}", CHEBI_ACCESSION_URL, chebi));
    }
    UNIPROT_ACCESSION
        .is_match(acc)
        .then(|| format!("{}{}", UNIPROT_ACCESSION_URL, acc))
}

fn distinct_interactors(interactions: &[Interaction]) -> usize {
    let mut accs: Vec<String> = interactions
        .iter()
        .flat_map(|i| [i.interactor_a.acc.to_uppercase(), i.interactor_b.acc.to_uppercase()])
        .collect();
    accs.sort();
    accs.dedup();
    accs.len()
}

fn summary(resource: &str, by_acc: BTreeMap<String, Vec<Interaction>>) -> InteractionsResult {
    InteractionsResult {
        resource: resource.to_string(),
        entities: by_acc
            .into_iter()
            .map(|(acc, interactions)| InteractorEntity {
                acc,
                count: interactions.len(),
                interactors: Vec::new(),
            })
            .collect(),
    }
}

/// Partners of each accession, best score first.
fn details(resource: &str, by_acc: BTreeMap<String, Vec<Interaction>>, paging: Paging) -> InteractionsResult {
    let entities = by_acc
        .into_iter()
        .map(|(acc, mut interactions)| {
            let count = interactions.len();
            interactions.sort_by(|a, b| {
                b.score
                    .unwrap_or(0.0)
                    .partial_cmp(&a.score.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let interactors = interactions
                .into_iter()
                .enumerate()
                .map(|(index, interaction)| {
                    let partner = interaction.interactor_b;
                    InteractorEntry {
                        id: index + 1,
                        acc_url: accession_url(&partner.acc),
                        acc: partner.acc,
                        alias: partner.alias,
                        score: interaction.score,
                        evidences: interaction.evidences.len(),
                        evidences_url: (!interaction.evidences.is_empty()).then(|| {
                            format!("{}{}", INTACT_ACCESSION_URL, interaction.evidences.join("%20OR%20"))
                        }),
                    }
                })
                .collect();
            InteractorEntity {
                acc,
                count,
                interactors: paging.apply(interactors),
            }
        })
        .collect();
    InteractionsResult {
        resource: resource.to_string(),
        entities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InteractorsConfig;
    use crate::testing::fixture_store;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> InteractorsService {
        InteractorsService::new(
            StaticInteractions::new(fixture_store()),
            Arc::new(PsicquicClient::new(&InteractorsConfig::default()).unwrap()),
            TokenStore::new(dir.path()),
            1024,
        )
    }

    #[test]
    fn test_parse_accessions() {
        assert_eq!(
            parse_accessions("P1, P2\nP1  P3").unwrap(),
            vec!["P1", "P2", "P3"]
        );
        assert!(parse_accessions(" \n").is_err());
    }

    #[tokio::test]
    async fn test_static_details_sorted_by_score() {
        let dir = TempDir::new().unwrap();
        let result = service(&dir)
            .static_details(&["P19367".to_string()], Paging::default())
            .await
            .unwrap();
        assert_eq!(result.resource, "static");
        let entity = &result.entities[0];
        assert_eq!(entity.count, 2);
        assert_eq!(entity.interactors[0].acc, "P52789");
        assert_eq!(entity.interactors[0].evidences, 2);
        assert_eq!(entity.interactors[1].acc, "P01308");

        let paged = service(&dir)
            .static_details(
                &["P19367".to_string()],
                Paging {
                    page: Some(2),
                    page_size: Some(1),
                },
            )
            .await
            .unwrap();
        assert_eq!(paged.entities[0].count, 2);
        assert_eq!(paged.entities[0].interactors[0].acc, "P01308");
    }

    #[tokio::test]
    async fn test_upload_then_query_by_token() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let result = service
            .upload_content("P1\tP2\nP1\tP3\nbroken\n")
            .await
            .unwrap();
        assert_eq!(result.summary.interactions, 2);
        assert_eq!(result.summary.interactors, 3);
        assert_eq!(result.warning_messages.len(), 1);

        let summary = service
            .token_summary(&result.summary.token, &["P1".to_string(), "P3".to_string()])
            .await
            .unwrap();
        assert_eq!(summary.entities[0].count, 2);
        assert_eq!(summary.entities[1].count, 1);

        let details = service
            .token_details(&result.summary.token, &["P3".to_string()], Paging::default())
            .await
            .unwrap();
        assert_eq!(details.entities[0].interactors[0].acc, "P1");

        // temporary upload files are gone
        let uploads = dir.path().join(UPLOAD_DIR);
        assert_eq!(std::fs::read_dir(uploads).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_limits() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let big = "P1\tP2\n".repeat(500);
        assert!(matches!(
            service.upload_content(&big).await,
            Err(ContentServiceError::PayloadTooLarge(_))
        ));
        assert!(matches!(
            service.upload_file("data.bin", &[0, 1, 2, 3]).await,
            Err(ContentServiceError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            service.upload_url("ftp://example.org/file.txt").await,
            Err(ContentServiceError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        assert!(matches!(
            service.upload_content("P1\nP2\n").await,
            Err(ContentServiceError::BadRequest(_))
        ));
        let uploads = dir.path().join(UPLOAD_DIR);
        assert_eq!(std::fs::read_dir(uploads).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_from_url() {
        use httpmock::prelude::*;

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/lab/pairs.tsv");
                then.status(200).body("P1\tP2\nP2\tP3\n");
            })
            .await;
        let dir = TempDir::new().unwrap();
        let result = service(&dir)
            .upload_url(&server.url("/lab/pairs.tsv"))
            .await
            .unwrap();
        assert_eq!(result.summary.name, "pairs.tsv");
        assert_eq!(result.summary.interactions, 2);
    }

    #[tokio::test]
    async fn test_chunked_download_over_the_limit_is_rejected() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nTransfer-Encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            let chunk = "P1\tP2\n".repeat(100);
            for _ in 0..1000 {
                let frame = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
                if socket.write_all(frame.as_bytes()).await.is_err() {
                    return;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });

        let dir = TempDir::new().unwrap();
        let result = service(&dir)
            .upload_url(&format!("http://{}/huge.tsv", addr))
            .await;
        assert!(matches!(result, Err(ContentServiceError::PayloadTooLarge(_))));
        assert!(!dir.path().join(UPLOAD_DIR).exists());
    }

    #[test]
    fn test_accession_urls_follow_the_database() {
        assert_eq!(
            accession_url("P52789").as_deref(),
            Some("https://www.uniprot.org/uniprot/P52789")
        );
        assert_eq!(
            accession_url("CHEBI:15422").as_deref(),
            Some("https://www.ebi.ac.uk/chebi/searchId.do?chebiId=CHEBI:15422")
        );
        assert_eq!(accession_url("15422"), accession_url("chebi:15422"));
        assert_eq!(accession_url("P1"), None);
    }

    #[tokio::test]
    async fn test_registered_psicquic_gets_a_token() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let token = service
            .register_psicquic("", "http://localhost:9/psicquic/")
            .await
            .unwrap();
        assert_eq!(token.len(), 16);
        assert!(service.register_psicquic("x", "not a url").await.is_err());
    }
}
