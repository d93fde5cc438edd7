use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interactor {
    pub acc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxid: Option<String>,
}

impl Interactor {
    pub fn new(acc: impl Into<String>) -> Self {
        Self {
            acc: acc.into(),
            alias: None,
            taxid: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub interactor_a: Interactor,
    pub interactor_b: Interactor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub evidences: Vec<String>,
}

impl Interaction {
    /// The partner of `acc` in this interaction, if `acc` takes part.
    pub fn partner_of(&self, acc: &str) -> Option<&Interactor> {
        if self.interactor_a.acc.eq_ignore_ascii_case(acc) {
            Some(&self.interactor_b)
        } else if self.interactor_b.acc.eq_ignore_ascii_case(acc) {
            Some(&self.interactor_a)
        } else {
            None
        }
    }
}

/// A PSICQUIC registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractorResource {
    pub name: String,
    pub rest_url: String,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadFormat {
    Tuple,
    ExtendedTuple,
    Mitab,
}

impl UploadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadFormat::Tuple => "tuple",
            UploadFormat::ExtendedTuple => "extended_tuple",
            UploadFormat::Mitab => "mitab",
        }
    }
}

/// A parsed upload, persisted under its token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomInteractions {
    pub name: String,
    pub format: UploadFormat,
    pub interactions: Vec<Interaction>,
    pub created: DateTime<Utc>,
}

/// A user supplied PSICQUIC service, persisted under its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPsicquic {
    pub name: String,
    pub url: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TokenEntry {
    Interactions(CustomInteractions),
    Psicquic(CustomPsicquic),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub token: String,
    pub name: String,
    pub interactors: usize,
    pub interactions: usize,
}

/// Response to an upload: where the data lives now and what was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TupleResult {
    pub summary: UploadSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warning_messages: Vec<String>,
}

/// One partner of a queried accession.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractorEntry {
    pub id: usize,
    pub acc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub evidences: usize,
    #[serde(rename = "accURL", skip_serializing_if = "Option::is_none")]
    pub acc_url: Option<String>,
    #[serde(rename = "evidencesURL", skip_serializing_if = "Option::is_none")]
    pub evidences_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractorEntity {
    pub acc: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interactors: Vec<InteractorEntry>,
}

/// Interactors of every requested accession within one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionsResult {
    pub resource: String,
    pub entities: Vec<InteractorEntity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partner_lookup_ignores_case() {
        let interaction = Interaction {
            interactor_a: Interactor::new("P19367"),
            interactor_b: Interactor::new("P52789"),
            score: Some(0.5),
            evidences: Vec::new(),
        };
        assert_eq!(interaction.partner_of("p19367").unwrap().acc, "P52789");
        assert_eq!(interaction.partner_of("P52789").unwrap().acc, "P19367");
        assert!(interaction.partner_of("Q99999").is_none());
    }

    #[test]
    fn test_token_entry_is_tagged() {
        let entry = TokenEntry::Psicquic(CustomPsicquic {
            name: "mine".into(),
            url: "http://example.org/psicquic/".into(),
            created: Utc::now(),
        });
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["kind"], "psicquic");
        let back: TokenEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
