//! Header and footer HTML shared with the main website, refreshed in the
//! background, and the landing page wrapped in them.

use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::config::TemplateConfig;
use crate::domain::DbInfo;
use crate::error::{ContentServiceError, Result};

const DEFAULT_HEADER: &str = "<header><h1>Content Service</h1></header>";
const DEFAULT_FOOTER: &str = "<footer><p>Pathway knowledgebase content service</p></footer>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragments {
    pub header: String,
    pub footer: String,
}

impl Default for Fragments {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            footer: DEFAULT_FOOTER.to_string(),
        }
    }
}

pub struct PageFragments {
    client: reqwest::Client,
    header_url: Option<String>,
    footer_url: Option<String>,
    current: RwLock<Fragments>,
}

impl PageFragments {
    pub fn new(config: &TemplateConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            header_url: config.header_url.clone(),
            footer_url: config.footer_url.clone(),
            current: RwLock::new(Fragments::default()),
        })
    }

    pub fn current(&self) -> Fragments {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Fetches both fragments. A fragment that fails to load keeps its
    /// previous value; the last write wins.
    pub async fn refresh(&self) -> Result<()> {
        let header = match &self.header_url {
            Some(url) => Some(self.fetch(url).await),
            None => None,
        };
        let footer = match &self.footer_url {
            Some(url) => Some(self.fetch(url).await),
            None => None,
        };

        let mut failures = Vec::new();
        {
            let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
            match header {
                Some(Ok(html)) => current.header = html,
                Some(Err(e)) => failures.push(format!("header: {}", e)),
                None => {}
            }
            match footer {
                Some(Ok(html)) => current.footer = html,
                Some(Err(e)) => failures.push(format!("footer: {}", e)),
                None => {}
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContentServiceError::Internal(failures.join("; ")))
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ContentServiceError::Internal(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        let html = response.text().await?;
        if html.trim().is_empty() {
            return Err(ContentServiceError::Internal(format!("{} returned an empty page", url)));
        }
        Ok(html)
    }

    pub fn spawn_refresh(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            if self.header_url.is_none() && self.footer_url.is_none() {
                info!("No header/footer urls configured; using built-in fragments");
                return;
            }
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    warn!("Page fragment refresh failed: {}", e);
                }
            }
        })
    }

    pub fn landing_page(&self, info: &DbInfo) -> String {
        let fragments = self.current();
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\" />\n<title>Content Service</title>\n</head>\n<body>\n{header}\n<main>\n<h2>Content Service</h2>\n<p>Database <strong>{name}</strong>, release {version}.</p>\n<ul>\n<li><a href=\"/data/database/name\">/data</a>: knowledgebase queries</li>\n<li><a href=\"/search/facet\">/search</a>: full text search</li>\n<li><a href=\"/interactors/static/molecule/P19367/summary\">/interactors</a>: molecular interactors</li>\n<li><a href=\"/health\">/health</a></li>\n</ul>\n</main>\n{footer}\n</body>\n</html>\n",
            header = fragments.header,
            footer = fragments.footer,
            name = escape_html(&info.name),
            version = info.version,
        )
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
