//! PSI-MITAB 2.5 lines: 15 tab separated columns, multi-valued cells joined
//! with `|`, values written as `db:value(description)`.

use super::model::{Interaction, Interactor};

pub const MITAB_COLUMNS: usize = 15;

const ID_A: usize = 0;
const ID_B: usize = 1;
const ALIAS_A: usize = 4;
const ALIAS_B: usize = 5;
const TAXID_A: usize = 9;
const TAXID_B: usize = 10;
const INTERACTION_IDS: usize = 13;
const CONFIDENCE: usize = 14;

/// Value part of `db:value(description)`; `-` is empty.
fn strip_value(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        return None;
    }
    let value = match raw.split_once(':') {
        Some((_, value)) => value,
        None => raw,
    };
    let value = match value.find('(') {
        Some(open) => &value[..open],
        None => value,
    };
    let value = value.trim().trim_matches('"');
    (!value.is_empty()).then(|| value.to_string())
}

fn first_value(cell: &str) -> Option<String> {
    cell.split('|').find_map(strip_value)
}

/// Prefers the gene name alias when several are listed.
fn alias(cell: &str) -> Option<String> {
    cell.split('|')
        .find(|v| v.contains("(gene name)"))
        .and_then(strip_value)
        .or_else(|| first_value(cell))
}

fn score(cell: &str) -> Option<f64> {
    cell.split('|')
        .filter_map(strip_value)
        .find_map(|v| v.parse::<f64>().ok())
}

/// Parses one MITAB row. Rows with too few columns or without both
/// identifiers are rejected with a reason.
pub fn parse_line(line: &str) -> Result<Interaction, String> {
    let cells: Vec<&str> = line.split('\t').collect();
    if cells.len() < MITAB_COLUMNS {
        return Err(format!(
            "expected {} columns, found {}",
            MITAB_COLUMNS,
            cells.len()
        ));
    }
    let acc_a = first_value(cells[ID_A]).ok_or("missing identifier for interactor A")?;
    let acc_b = first_value(cells[ID_B]).ok_or("missing identifier for interactor B")?;
    let evidences = cells[INTERACTION_IDS]
        .split('|')
        .filter_map(strip_value)
        .collect();
    Ok(Interaction {
        interactor_a: Interactor {
            acc: acc_a,
            alias: alias(cells[ALIAS_A]),
            taxid: first_value(cells[TAXID_A]),
        },
        interactor_b: Interactor {
            acc: acc_b,
            alias: alias(cells[ALIAS_B]),
            taxid: first_value(cells[TAXID_B]),
        },
        score: score(cells[CONFIDENCE]),
        evidences,
    })
}

/// Parses a whole MITAB document, skipping comments and blank lines.
/// Returns the interactions and one warning per rejected line.
pub fn parse(content: &str) -> (Vec<Interaction>, Vec<String>) {
    let mut interactions = Vec::new();
    let mut warnings = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line) {
            Ok(interaction) => interactions.push(interaction),
            Err(reason) => warnings.push(format!("Line {}: {}", number + 1, reason)),
        }
    }
    (interactions, warnings)
}
