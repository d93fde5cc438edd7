//! Citations of pathways and their export as BibTeX, RIS or plain text.

use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

use crate::constants::*;
use crate::domain::{DbId, Identifier, Person};
use crate::error::{ContentServiceError, Result};
use crate::graph::{self, GraphStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    pub surname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
}

impl Author {
    /// "Smith, J" style name.
    fn short_name(&self) -> String {
        match &self.initial {
            Some(initial) => format!("{}, {}", self.surname, initial),
            None => self.surname.clone(),
        }
    }
}

impl From<&Person> for Author {
    fn from(person: &Person) -> Self {
        Author {
            first_name: person.first_name.clone(),
            surname: person
                .surname
                .clone()
                .unwrap_or_else(|| person.display_name.clone()),
            initial: person.initial.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub id: String,
    pub title: String,
    pub authors: Vec<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    pub url: String,
    pub publisher: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationFormat {
    Bibtex,
    Ris,
    Text,
}

impl FromStr for CitationFormat {
    type Err = ContentServiceError;

    fn from_str(ext: &str) -> Result<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "bib" | "bibtex" => Ok(CitationFormat::Bibtex),
            "ris" => Ok(CitationFormat::Ris),
            "txt" | "text" => Ok(CitationFormat::Text),
            other => Err(ContentServiceError::bad_request(format!(
                "Unsupported citation format '{}'; use bib, ris or txt",
                other
            ))),
        }
    }
}

impl CitationFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CitationFormat::Bibtex => "bib",
            CitationFormat::Ris => "ris",
            CitationFormat::Text => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            CitationFormat::Bibtex => "application/x-bibtex",
            CitationFormat::Ris => "application/x-research-info-systems",
            CitationFormat::Text => "text/plain; charset=utf-8",
        }
    }
}

/// A rendered citation ready to be sent as an attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct CitationExport {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

pub struct CitationService {
    graph: Arc<dyn GraphStore>,
    base_url: String,
}

impl CitationService {
    pub fn new(graph: Arc<dyn GraphStore>, base_url: impl Into<String>) -> Self {
        Self {
            graph,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn citation(&self, id: &Identifier) -> Result<Citation> {
        let store = self.graph.as_ref();
        let pathway = graph::require_class(store, id, PATHWAY).await?;

        let mut seen: Vec<DbId> = Vec::new();
        let mut authors = Vec::new();
        for edit in store.outgoing(pathway.db_id, &[AUTHORED]).await? {
            for author in store.outgoing(edit.object.db_id, &[AUTHOR]).await? {
                if !seen.contains(&author.object.db_id) {
                    seen.push(author.object.db_id);
                    authors.push(Author::from(&Person::from(&author.object)));
                }
            }
        }

        let release_date = pathway.property_str("releaseDate").map(str::to_string);
        let year = release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok());
        let id = pathway
            .st_id
            .clone()
            .unwrap_or_else(|| pathway.db_id.to_string());
        Ok(Citation {
            url: format!("{}/content/detail/{}", self.base_url, id),
            id,
            title: pathway.display_name.clone(),
            authors,
            year,
            doi: pathway.property_str("doi").map(str::to_string),
            release_date,
            publisher: STATIC_CITATION_PUBLISHER.to_string(),
        })
    }

    pub async fn export(&self, id: &Identifier, format: CitationFormat) -> Result<CitationExport> {
        let citation = self.citation(id).await?;
        let body = match format {
            CitationFormat::Bibtex => to_bibtex(&citation),
            CitationFormat::Ris => to_ris(&citation),
            CitationFormat::Text => to_text(&citation),
        };
        Ok(CitationExport {
            filename: format!("{}.{}", citation.id, format.extension()),
            content_type: format.content_type(),
            body,
        })
    }
}

/// Escapes the characters that would end or corrupt a braced BibTeX value.
fn escape_bibtex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\\' => out.push_str("\\textbackslash{}"),
            other => out.push(other),
        }
    }
    out
}

pub fn to_bibtex(citation: &Citation) -> String {
    let key = citation.id.replace('-', "_");
    let authors = citation
        .authors
        .iter()
        .map(|a| match &a.first_name {
            Some(first) => format!("{}, {}", a.surname, first),
            None => a.short_name(),
        })
        .map(|name| escape_bibtex(&name))
        .collect::<Vec<_>>()
        .join(" and ");
    let mut out = format!("@article{{{},\n", key);
    out.push_str(&format!("  title = {{{}}},\n", escape_bibtex(&citation.title)));
    if !authors.is_empty() {
        out.push_str(&format!("  author = {{{}}},\n", authors));
    }
    if let Some(year) = citation.year {
        out.push_str(&format!("  year = {{{}}},\n", year));
    }
    if let Some(doi) = &citation.doi {
        out.push_str(&format!("  doi = {{{}}},\n", doi));
    }
    out.push_str(&format!("  publisher = {{{}}},\n", escape_bibtex(&citation.publisher)));
    out.push_str(&format!("  url = {{{}}}\n", citation.url));
    out.push_str("}\n");
    out
}

pub fn to_ris(citation: &Citation) -> String {
    let mut lines = vec!["TY  - DATA".to_string(), format!("TI  - {}", citation.title)];
    for author in &citation.authors {
        lines.push(format!("AU  - {}", author.short_name()));
    }
    if let Some(year) = citation.year {
        lines.push(format!("PY  - {}", year));
    }
    if let Some(date) = &citation.release_date {
        lines.push(format!("DA  - {}", date.replace('-', "/")));
    }
    if let Some(doi) = &citation.doi {
        lines.push(format!("DO  - {}", doi));
    }
    lines.push(format!("PB  - {}", citation.publisher));
    lines.push(format!("UR  - {}", citation.url));
    lines.push("ER  - ".to_string());
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// "Smith, J., Doe, A. (2012). Glycolysis. Reactome, https://doi.org/..."
pub fn to_text(citation: &Citation) -> String {
    let authors = citation
        .authors
        .iter()
        .map(|a| format!("{}.", a.short_name()))
        .collect::<Vec<_>>()
        .join(", ");
    let mut out = String::new();
    if !authors.is_empty() {
        out.push_str(&authors);
        out.push(' ');
    }
    if let Some(year) = citation.year {
        out.push_str(&format!("({}). ", year));
    }
    out.push_str(&format!("{}. {}", citation.title, citation.publisher));
    match &citation.doi {
        Some(doi) => out.push_str(&format!(", {}{}", DOI_URL, doi)),
        None => out.push_str(&format!(", {}", citation.url)),
    }
    out.push('\n');
    out
}
