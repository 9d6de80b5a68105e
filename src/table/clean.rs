use std::collections::{HashMap, HashSet};

use crate::core::model::TableRow;
use crate::core::{ExtractError, ExtractResult};

/// Cell text grid as produced by a table detector, row-major.
pub type RawTable = Vec<Vec<String>>;

/// A cleaned table: unique column names plus body rows of equal width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// The header followed by the body, in detector layout.
    pub fn to_raw(&self) -> RawTable {
        std::iter::once(self.header.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }

    pub fn records(&self) -> Vec<TableRow> {
        self.rows
            .iter()
            .map(|row| TableRow {
                cells: self
                    .header
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect(),
            })
            .collect()
    }
}

pub fn clean_table(raw: &[Vec<String>], footer_marker: &str) -> ExtractResult<Table> {
    let header_idx = raw
        .iter()
        .position(|row| is_header_row(row))
        .ok_or(ExtractError::NoHeaderFound)?;

    let header: Vec<String> = raw[header_idx].iter().map(|c| normalize_header(c)).collect();
    let header = make_unique(&header);
    let width = header.len();

    let mut rows: Vec<Vec<String>> = raw[header_idx + 1..]
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.resize(width, String::new());
            row
        })
        .collect();

    truncate_footer(&mut rows, footer_marker);
    drop_trailing_empty(&mut rows);

    Ok(Table { header, rows })
}

/// Every cell is empty or holds a letter, and at least one is non-empty.
fn is_header_row(row: &[String]) -> bool {
    row.iter().any(|cell| !cell.trim().is_empty())
        && row
            .iter()
            .all(|cell| cell.trim().is_empty() || cell.chars().any(char::is_alphabetic))
}

pub fn normalize_header(cell: &str) -> String {
    cell.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Blank names become `col`; repeats get `_1`, `_2`, ... suffixes that never
/// collide with another column.
pub fn make_unique(columns: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(columns.len());

    for column in columns {
        let base = if column.is_empty() { "col" } else { column.as_str() };
        let count = seen.entry(base.to_string()).or_insert(0);
        let mut name = if *count == 0 {
            base.to_string()
        } else {
            format!("{base}_{count}")
        };
        while used.contains(&name) {
            *count += 1;
            name = format!("{base}_{count}");
        }
        *count += 1;
        used.insert(name.clone());
        out.push(name);
    }

    out
}

/// Drops the first row whose joined text contains `marker`
/// (case-insensitive) and everything after it.
fn truncate_footer(rows: &mut Vec<Vec<String>>, marker: &str) {
    if marker.is_empty() {
        return;
    }
    let marker = marker.to_uppercase();
    let cutoff = rows.iter().position(|row| {
        row.iter()
            .filter(|cell| !cell.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase()
            .contains(&marker)
    });
    if let Some(cutoff) = cutoff {
        rows.truncate(cutoff);
    }
}

fn drop_trailing_empty(rows: &mut Vec<Vec<String>>) {
    while rows
        .last()
        .is_some_and(|row| row.iter().all(|cell| cell.trim().is_empty()))
    {
        rows.pop();
    }
}
