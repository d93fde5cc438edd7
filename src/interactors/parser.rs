//! Sniffing and parsing of user supplied interaction files.
//!
//! Three layouts are accepted: PSI-MITAB, an extended tuple file whose `#`
//! header names its columns, and a plain two-column tuple file.

use std::collections::HashSet;
use tracing::debug;

use super::mitab::{self, MITAB_COLUMNS};
use super::model::{Interaction, Interactor, UploadFormat};
use crate::error::{ContentServiceError, Result};

const MITAB_HEADER_MARKER: &str = "id(s) interactor a";
const MAX_WARNINGS: usize = 50;
const EXTENDED_COLUMNS: &[&str] = &[
    "id a", "id b", "alias a", "alias b", "taxid a", "taxid b", "score", "evidence",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub format: UploadFormat,
    pub interactions: Vec<Interaction>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    Tab,
    Comma,
    Semicolon,
    Whitespace,
}

impl Separator {
    fn detect(line: &str) -> Self {
        if line.contains('\t') {
            Separator::Tab
        } else if line.contains(',') {
            Separator::Comma
        } else if line.contains(';') {
            Separator::Semicolon
        } else {
            Separator::Whitespace
        }
    }

    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Separator::Tab => line.split('\t').map(str::trim).collect(),
            Separator::Comma => line.split(',').map(str::trim).collect(),
            Separator::Semicolon => line.split(';').map(str::trim).collect(),
            Separator::Whitespace => line.split_whitespace().collect(),
        }
    }
}

/// Decodes uploaded bytes, rejecting empty and binary content.
pub fn check_content(bytes: &[u8]) -> Result<String> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ContentServiceError::UnsupportedMediaType(
            "the uploaded content is empty".to_string(),
        ));
    }
    if bytes.contains(&0) {
        return Err(ContentServiceError::UnsupportedMediaType(
            "binary content is not supported".to_string(),
        ));
    }
    let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
        ContentServiceError::UnsupportedMediaType("content must be UTF-8 text".to_string())
    })?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

pub fn sniff(content: &str) -> UploadFormat {
    let Some(first) = content.lines().find(|l| !l.trim().is_empty()) else {
        return UploadFormat::Tuple;
    };
    if let Some(header) = first.strip_prefix('#') {
        if header.to_lowercase().contains(MITAB_HEADER_MARKER) {
            return UploadFormat::Mitab;
        }
        if names_columns(header) {
            return UploadFormat::ExtendedTuple;
        }
        // a plain comment, the data starts further down
        return UploadFormat::Tuple;
    }
    if first.split('\t').count() >= MITAB_COLUMNS {
        UploadFormat::Mitab
    } else {
        UploadFormat::Tuple
    }
}

/// Whether a `#` line is an extended tuple header rather than a comment.
fn names_columns(header: &str) -> bool {
    Separator::detect(header)
        .split(header)
        .iter()
        .any(|name| EXTENDED_COLUMNS.contains(&normalize_column(name).as_str()))
}

fn normalize_column(name: &str) -> String {
    name.trim().to_lowercase().replace('_', " ")
}

/// Sniffs and parses `content`. Fails when no line yields an interaction.
pub fn parse(content: &str) -> Result<ParseOutcome> {
    let format = sniff(content);
    let (interactions, mut warnings) = match format {
        UploadFormat::Mitab => mitab::parse(content),
        UploadFormat::ExtendedTuple => parse_extended(content)?,
        UploadFormat::Tuple => parse_tuple(content),
    };
    let interactions = dedupe(interactions, &mut warnings);
    debug!(
        "Parsed {} interactions as {:?} with {} warnings",
        interactions.len(),
        format,
        warnings.len()
    );

    if interactions.is_empty() {
        let mut message = "No valid interactions found".to_string();
        if let Some(first) = warnings.first() {
            message.push_str(&format!(" ({})", first));
        }
        return Err(ContentServiceError::BadRequest(message));
    }
    if warnings.len() > MAX_WARNINGS {
        let dropped = warnings.len() - MAX_WARNINGS;
        warnings.truncate(MAX_WARNINGS);
        warnings.push(format!("{} more warnings omitted", dropped));
    }
    Ok(ParseOutcome {
        format,
        interactions,
        warnings,
    })
}

fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty() && !l.starts_with('#'))
}

fn parse_tuple(content: &str) -> (Vec<Interaction>, Vec<String>) {
    let mut interactions = Vec::new();
    let mut warnings = Vec::new();
    let mut separator = None;
    for (number, line) in data_lines(content) {
        let separator = *separator.get_or_insert_with(|| Separator::detect(line));
        let cells = separator.split(line);
        match cells.as_slice() {
            [a, b] if !a.is_empty() && !b.is_empty() => interactions.push(Interaction {
                interactor_a: Interactor::new(*a),
                interactor_b: Interactor::new(*b),
                score: None,
                evidences: Vec::new(),
            }),
            _ => warnings.push(format!(
                "Line {}: expected 2 columns, found {}",
                number,
                cells.iter().filter(|c| !c.is_empty()).count()
            )),
        }
    }
    (interactions, warnings)
}

/// Column positions named by an extended tuple header.
#[derive(Debug, Default)]
struct Columns {
    id_a: usize,
    id_b: usize,
    alias_a: Option<usize>,
    alias_b: Option<usize>,
    taxid_a: Option<usize>,
    taxid_b: Option<usize>,
    score: Option<usize>,
    evidence: Option<usize>,
}

impl Columns {
    fn from_header(names: &[&str]) -> Result<Self> {
        let position = |wanted: &str| {
            names.iter().position(|n| normalize_column(n) == wanted)
        };
        let required = |wanted: &str| {
            position(wanted).ok_or_else(|| {
                ContentServiceError::bad_request(format!(
                    "Header is missing the mandatory column '{}'",
                    wanted.to_uppercase()
                ))
            })
        };
        Ok(Columns {
            id_a: required("id a")?,
            id_b: required("id b")?,
            alias_a: position("alias a"),
            alias_b: position("alias b"),
            taxid_a: position("taxid a"),
            taxid_b: position("taxid b"),
            score: position("score"),
            evidence: position("evidence"),
        })
    }
}

fn parse_extended(content: &str) -> Result<(Vec<Interaction>, Vec<String>)> {
    let header = content
        .lines()
        .find_map(|l| l.trim().strip_prefix('#'))
        .unwrap_or_default();
    let separator = Separator::detect(header);
    let columns = Columns::from_header(&separator.split(header))?;

    let mut interactions = Vec::new();
    let mut warnings = Vec::new();
    for (number, line) in data_lines(content) {
        let cells = separator.split(line);
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| cells.get(i))
                .map(|c| c.trim())
                .filter(|c| !c.is_empty() && *c != "-")
        };
        let (Some(acc_a), Some(acc_b)) = (cell(Some(columns.id_a)), cell(Some(columns.id_b))) else {
            warnings.push(format!("Line {}: missing interactor identifier", number));
            continue;
        };
        let score = match cell(columns.score) {
            Some(raw) => match raw.parse::<f64>() {
                Ok(score) => Some(score),
                Err(_) => {
                    warnings.push(format!("Line {}: invalid score '{}'", number, raw));
                    continue;
                }
            },
            None => None,
        };
        interactions.push(Interaction {
            interactor_a: Interactor {
                acc: acc_a.to_string(),
                alias: cell(columns.alias_a).map(str::to_string),
                taxid: cell(columns.taxid_a).map(str::to_string),
            },
            interactor_b: Interactor {
                acc: acc_b.to_string(),
                alias: cell(columns.alias_b).map(str::to_string),
                taxid: cell(columns.taxid_b).map(str::to_string),
            },
            score,
            evidences: cell(columns.evidence)
                .map(|e| e.split('|').map(|v| v.trim().to_string()).collect())
                .unwrap_or_default(),
        });
    }
    Ok((interactions, warnings))
}

/// Drops repeated pairs regardless of orientation.
fn dedupe(interactions: Vec<Interaction>, warnings: &mut Vec<String>) -> Vec<Interaction> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::with_capacity(interactions.len());
    let mut duplicates = 0;
    for interaction in interactions {
        let a = interaction.interactor_a.acc.to_uppercase();
        let b = interaction.interactor_b.acc.to_uppercase();
        let key = if a <= b { (a, b) } else { (b, a) };
        if seen.insert(key) {
            out.push(interaction);
        } else {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        warnings.push(format!("{} duplicated interactions were ignored", duplicates));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_binary() {
        assert!(matches!(
            check_content(b"  \n "),
            Err(ContentServiceError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            check_content(&[0x50, 0x4b, 0x03, 0x04, 0x00, 0x00]),
            Err(ContentServiceError::UnsupportedMediaType(_))
        ));
        assert_eq!(check_content(b"P1\tP2\n").unwrap(), "P1\tP2\n");
    }

    #[test]
    fn test_sniffing() {
        assert_eq!(sniff("#ID(s) interactor A\tID(s) interactor B\n"), UploadFormat::Mitab);
        assert_eq!(sniff("#ID A,ID B,Score\nP1,P2,0.5"), UploadFormat::ExtendedTuple);
        assert_eq!(sniff("P1 P2\n"), UploadFormat::Tuple);
        let wide = vec!["x"; 15].join("\t");
        assert_eq!(sniff(&wide), UploadFormat::Mitab);
    }

    #[test]
    fn test_leading_comment_on_simple_tuple() {
        let content = "# exported from my lab notebook\nP1\tP2\nP3\tP4\n";
        assert_eq!(sniff(content), UploadFormat::Tuple);
        let outcome = parse(content).unwrap();
        assert_eq!(outcome.format, UploadFormat::Tuple);
        assert_eq!(outcome.interactions.len(), 2);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_simple_tuple_with_each_separator() {
        for content in ["P1\tP2\nP3\tP4", "P1,P2\nP3,P4", "P1;P2\nP3;P4", "P1 P2\nP3   P4"] {
            let outcome = parse(content).unwrap();
            assert_eq!(outcome.format, UploadFormat::Tuple);
            assert_eq!(outcome.interactions.len(), 2, "content: {content:?}");
            assert_eq!(outcome.interactions[1].interactor_b.acc, "P4");
        }
    }

    #[test]
    fn test_bad_lines_are_warnings_and_duplicates_dropped() {
        let outcome = parse("P1\tP2\nP3\nP2\tP1\nP5\tP6\tP7\n").unwrap();
        assert_eq!(outcome.interactions.len(), 1);
        assert_eq!(
            outcome.warnings,
            vec![
                "Line 2: expected 2 columns, found 1",
                "Line 4: expected 2 columns, found 3",
                "1 duplicated interactions were ignored",
            ]
        );
    }

    #[test]
    fn test_extended_tuple_columns() {
        let content = "#ID A\tID B\tAlias A\tTaxid B\tScore\tEvidence\n\
                       P19367\tP52789\tHK1\t9606\t0.8\tEBI-1|EBI-2\n\
                       P1\tP2\t-\t-\tabc\t-\n";
        let outcome = parse(content).unwrap();
        assert_eq!(outcome.format, UploadFormat::ExtendedTuple);
        let first = &outcome.interactions[0];
        assert_eq!(first.interactor_a.alias.as_deref(), Some("HK1"));
        assert_eq!(first.interactor_b.taxid.as_deref(), Some("9606"));
        assert_eq!(first.score, Some(0.8));
        assert_eq!(first.evidences, vec!["EBI-1", "EBI-2"]);
        assert_eq!(outcome.warnings, vec!["Line 3: invalid score 'abc'"]);
    }

    #[test]
    fn test_extended_tuple_requires_identifiers() {
        let err = parse("#Alias A\tScore\nHK1\t0.5\n").unwrap_err();
        assert!(matches!(err, ContentServiceError::BadRequest(_)));
    }

    #[test]
    fn test_no_interactions_is_bad_request() {
        let err = parse("P1\nP2\n").unwrap_err();
        assert!(matches!(err, ContentServiceError::BadRequest(_)));
    }
}
