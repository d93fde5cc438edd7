use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{ContentServiceError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub graph: GraphConfig,
    pub search: SearchConfig,
    pub interactors: InteractorsConfig,
    pub exporter: ExporterConfig,
    pub template: TemplateConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL used when building links (citations, discover).
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
    pub max_connections: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub solr_url: String,
    pub core: String,
    pub timeout_seconds: u64,
    /// Upper bound on `rows` for a single search page.
    pub max_rows: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InteractorsConfig {
    pub token_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Token folder budget enforced by the disk cache checker.
    pub max_token_bytes: u64,
    pub psicquic_registry_url: String,
    pub psicquic_refresh_minutes: u64,
    pub psicquic_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub cache_dir: PathBuf,
    pub max_cache_bytes: u64,
    pub check_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub header_url: Option<String>,
    pub footer_url: Option<String>,
    pub refresh_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file_prefix: String,
    pub default_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: constants::DEFAULT_PORT,
            base_url: constants::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "127.0.0.1:7687".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            database: None,
            max_connections: 16,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            solr_url: "http://localhost:8983/solr".to_string(),
            core: "reactome".to_string(),
            timeout_seconds: 30,
            max_rows: 100,
        }
    }
}

impl Default for InteractorsConfig {
    fn default() -> Self {
        Self {
            token_dir: PathBuf::from("data/tokens"),
            max_upload_bytes: 10 * 1024 * 1024,
            max_token_bytes: 2 * 1024 * 1024 * 1024,
            psicquic_registry_url: constants::PSICQUIC_REGISTRY_URL.to_string(),
            psicquic_refresh_minutes: 60,
            psicquic_timeout_seconds: 20,
        }
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data/exporter"),
            max_cache_bytes: 512 * 1024 * 1024,
            check_interval_seconds: 600,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            header_url: None,
            footer_url: None,
            refresh_minutes: 15,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_prefix: "content-service.log".to_string(),
            default_filter: "content_service=info,tower_http=info".to_string(),
        }
    }
}

impl Config {
    /// Loads `config.toml` (or the file named by `CONTENT_SERVICE_CONFIG`) and
    /// applies environment overrides. A missing default file yields defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var("CONTENT_SERVICE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));
        if path.exists() {
            Self::from_path(&path)
        } else {
            let mut config = Config::default();
            config.apply_env_overrides()?;
            config.validate()?;
            Ok(config)
        }
    }

    pub fn from_path(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ContentServiceError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        let mut config = Self::from_toml_str(&config_content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("CONTENT_SERVICE_PORT") {
            self.server.port = port.parse().map_err(|_| {
                ContentServiceError::Config(format!("Invalid CONTENT_SERVICE_PORT '{}'", port))
            })?;
        }
        if let Ok(url) = std::env::var("CONTENT_SERVICE_BASE_URL") {
            self.server.base_url = url;
        }
        if let Ok(uri) = std::env::var("NEO4J_URI") {
            self.graph.uri = uri;
        }
        if let Ok(user) = std::env::var("NEO4J_USER") {
            self.graph.user = user;
        }
        if let Ok(password) = std::env::var("NEO4J_PASSWORD") {
            self.graph.password = password;
        }
        if let Ok(db) = std::env::var("NEO4J_DATABASE") {
            self.graph.database = Some(db);
        }
        if let Ok(url) = std::env::var("SOLR_URL") {
            self.search.solr_url = url;
        }
        if let Ok(core) = std::env::var("SOLR_CORE") {
            self.search.core = core;
        }
        if let Ok(dir) = std::env::var("INTERACTORS_TOKEN_DIR") {
            self.interactors.token_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("EXPORTER_CACHE_DIR") {
            self.exporter.cache_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ContentServiceError::Config("server.port must be non-zero".into()));
        }
        if self.search.max_rows == 0 {
            return Err(ContentServiceError::Config("search.max_rows must be non-zero".into()));
        }
        if self.interactors.max_upload_bytes == 0 {
            return Err(ContentServiceError::Config(
                "interactors.max_upload_bytes must be non-zero".into(),
            ));
        }
        if self.interactors.psicquic_refresh_minutes == 0 || self.template.refresh_minutes == 0 {
            return Err(ContentServiceError::Config(
                "refresh intervals must be at least one minute".into(),
            ));
        }
        if self.exporter.check_interval_seconds == 0 {
            return Err(ContentServiceError::Config(
                "exporter.check_interval_seconds must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
