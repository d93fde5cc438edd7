//! Event exports (JSOG graph or participants table), cached on disk under a
//! sha256 of what was asked for.

pub mod disk_cache;

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::constants::EVENT;
use crate::domain::Identifier;
use crate::error::{ContentServiceError, Result};
use crate::graph::{self, GraphStore};
use crate::jsog;
use crate::metrics::ExporterMetrics;
use crate::services::{traversal, ParticipantsService};

pub use disk_cache::{CheckReport, DiskCacheChecker};

/// Outgoing hops loaded around every exported event.
const EXPORT_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Tsv,
}

impl FromStr for ExportFormat {
    type Err = ContentServiceError;

    fn from_str(ext: &str) -> Result<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "tsv" => Ok(ExportFormat::Tsv),
            other => Err(ContentServiceError::UnsupportedMediaType(format!(
                "export format '{}' is not supported; use json or tsv",
                other
            ))),
        }
    }
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Tsv => "tsv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Tsv => "text/tab-separated-values; charset=utf-8",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub cached: bool,
}

pub struct ExporterService {
    graph: Arc<dyn GraphStore>,
    participants: ParticipantsService,
    cache_dir: PathBuf,
}

/// `<root>/sha256/ab/<hex>.<ext>` for the given cache key.
fn cache_path(root: &Path, key: &str, ext: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let hex = hex::encode(hasher.finalize());
    root.join("sha256")
        .join(&hex[0..2])
        .join(format!("{}.{}", hex, ext))
}

impl ExporterService {
    pub fn new(graph: Arc<dyn GraphStore>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            participants: ParticipantsService::new(graph.clone()),
            graph,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub async fn export(&self, id: &Identifier, format: ExportFormat) -> Result<Export> {
        let store = self.graph.as_ref();
        let event = graph::require_class(store, id, EVENT).await?;
        let version = store.db_info().await?.version;
        let name = event.st_id.clone().unwrap_or_else(|| event.db_id.to_string());
        let filename = format!("{}.{}", name, format.extension());

        let path = cache_path(
            &self.cache_dir,
            &format!("{}:{}:{}", version, event.db_id, format.extension()),
            format.extension(),
        );
        if let Ok(body) = fs::read(&path).await {
            ExporterMetrics::record_cache_hit();
            if let Err(e) = disk_cache::touch(&path) {
                debug!("Could not touch {}: {}", path.display(), e);
            }
            return Ok(Export {
                filename,
                content_type: format.content_type(),
                body,
                cached: true,
            });
        }

        ExporterMetrics::record_cache_miss();
        let body = match format {
            ExportFormat::Json => {
                let mut graph = traversal::load_graph(store, event.clone(), EXPORT_DEPTH).await?;
                for child in traversal::contained_events(store, event.db_id).await? {
                    let child_id = child.db_id;
                    graph.insert(child);
                    traversal::expand(store, &mut graph, child_id, 1).await?;
                }
                serde_json::to_vec_pretty(&jsog::encode(&graph))?
            }
            ExportFormat::Tsv => self.participants_table(id).await?.into_bytes(),
        };
        if let Err(e) = write_atomic(&path, &body).await {
            warn!("Could not cache export {}: {}", path.display(), e);
        }
        Ok(Export {
            filename,
            content_type: format.content_type(),
            body,
            cached: false,
        })
    }

    async fn participants_table(&self, id: &Identifier) -> Result<String> {
        let mut out = String::from("dbId\tdisplayName\tschemaClass\treferenceEntities\n");
        for participant in self.participants.participants(id).await? {
            let references = participant
                .ref_entities
                .iter()
                .map(|r| match (&r.database_name, &r.identifier) {
                    (Some(db), Some(identifier)) => format!("{}:{}", db, identifier),
                    _ => r.display_name.clone(),
                })
                .collect::<Vec<_>>()
                .join("|");
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\n",
                participant.pe_db_id, participant.display_name, participant.schema_class, references
            ));
        }
        Ok(out)
    }
}

/// Writes next to `path` under a name no other writer uses, then renames
/// into place so readers only ever see complete files.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
    let written = match fs::write(&tmp, bytes).await {
        Ok(()) => fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }
    written
}

/// Parses an exported JSON document back into a plain value tree.
pub fn decode_json_export(body: &[u8]) -> Result<Value> {
    let value: Value = serde_json::from_slice(body)?;
    Ok(jsog::decode(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_json_export_is_cached() {
        let dir = TempDir::new().unwrap();
        let exporter = ExporterService::new(fixture_store(), dir.path());
        let first = exporter.export(&Identifier::DbId(200), ExportFormat::Json).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.filename, "R-HSA-200.json");

        let value = decode_json_export(&first.body).unwrap();
        assert_eq!(value["dbId"], json!(200));
        assert_eq!(value["hasEvent"][0]["dbId"], json!(300));

        let second = exporter.export(&Identifier::DbId(200), ExportFormat::Json).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.body, first.body);
    }

    #[tokio::test]
    async fn test_tsv_export_lists_participants() {
        let dir = TempDir::new().unwrap();
        let exporter = ExporterService::new(fixture_store(), dir.path());
        let export = exporter.export(&Identifier::DbId(300), ExportFormat::Tsv).await.unwrap();
        let text = String::from_utf8(export.body).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("dbId\tdisplayName\tschemaClass\treferenceEntities"));
        assert!(lines.next().unwrap().starts_with("500\t"));
        assert!(text.contains("ChEBI:17234"));
    }

    #[tokio::test]
    async fn test_unknown_format_and_non_event() {
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(ContentServiceError::UnsupportedMediaType(_))
        ));
        let dir = TempDir::new().unwrap();
        let exporter = ExporterService::new(fixture_store(), dir.path());
        assert!(exporter.export(&Identifier::DbId(500), ExportFormat::Json).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_misses_write_one_complete_file() {
        let dir = TempDir::new().unwrap();
        let exporter = ExporterService::new(fixture_store(), dir.path());
        let id = Identifier::DbId(200);
        let (a, b, c, d) = tokio::join!(
            exporter.export(&id, ExportFormat::Json),
            exporter.export(&id, ExportFormat::Json),
            exporter.export(&id, ExportFormat::Json),
            exporter.export(&id, ExportFormat::Json),
        );
        let expected = a.unwrap().body;
        for other in [b, c, d] {
            assert_eq!(other.unwrap().body, expected);
        }

        let cached = exporter.export(&id, ExportFormat::Json).await.unwrap();
        assert!(cached.cached);
        assert_eq!(cached.body, expected);

        let shard = cache_path(dir.path(), "87:200:json", "json");
        let names: Vec<_> = std::fs::read_dir(shard.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1, "leftover temp files: {names:?}");
    }

    #[test]
    fn test_cache_path_layout() {
        let path = cache_path(Path::new("/cache"), "87:200:json", "json");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64 + 5);
        assert!(path.starts_with(Path::new("/cache/sha256").join(&name[0..2])));
    }
}
