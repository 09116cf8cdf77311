// src/process/mod.rs
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use tracing::{debug, warn};

pub mod columns;
pub mod convert;
pub mod encoding;
pub mod normalize;
pub mod table;
pub mod utils;

use table::{Table, Value};

#[derive(Debug)]
pub struct RawTable {
    /// Column names from the header row, after blank and repeated names are resolved.
    pub headers: Vec<String>,
    /// Each data row below the header, as a Vec of Strings (one per field).
    pub rows: Vec<Vec<String>>,
}

/// Parse decoded CSV text, discarding `header_skip` leading records; the
/// next record is the header and everything below it is data.
///
/// Blank header cells are named `Unnamed: {i}`, except position 1 which
/// holds the prefecture in the nationwide sheets. Repeated names get a
/// `.{n}` suffix.
pub fn load_raw_table(text: &str, header_skip: usize) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = rdr.records();
    for idx in 0..header_skip {
        match records.next() {
            Some(r) => {
                r.with_context(|| format!("CSV parse error at record {}", idx))?;
            }
            None => bail!(
                "input ended after {} records; expected a header after {} skipped rows",
                idx,
                header_skip
            ),
        }
    }

    let header = match records.next() {
        Some(r) => r.with_context(|| format!("CSV parse error in header record {}", header_skip))?,
        None => bail!("no header row after skipping {} records", header_skip),
    };
    let headers = resolve_headers(header.iter());
    debug!(?headers, "header row");

    let mut rows = Vec::new();
    for (idx, result) in records.enumerate() {
        let record = result
            .with_context(|| format!("CSV parse error at data record {}", idx))?;
        if record.len() > headers.len() {
            warn!(
                record = idx,
                fields = record.len(),
                columns = headers.len(),
                "data row wider than header; extra fields ignored"
            );
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

fn resolve_headers<'a>(cells: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    cells
        .enumerate()
        .map(|(i, cell)| {
            let name = utils::strip_newlines(cell.trim());
            let name = if !name.is_empty() {
                name
            } else if i == 1 {
                columns::PREF.to_string()
            } else {
                format!("{}: {}", columns::UNNAMED_PREFIX, i)
            };
            let n = seen.entry(name.clone()).or_insert(0);
            *n += 1;
            if *n > 1 {
                format!("{}.{}", name, *n - 1)
            } else {
                name
            }
        })
        .collect()
}

impl RawTable {
    /// Convert into a typed table; empty fields become nulls.
    pub fn into_table(self) -> Table {
        let mut table = Table::new(self.headers);
        for row in self.rows {
            table.push_row(row.iter().map(|s| Value::from_field(s)).collect());
        }
        table
    }
}
