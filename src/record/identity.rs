// src/record/identity.rs
use anyhow::Result;
use md5::{Digest, Md5};
use std::collections::HashSet;
use std::fmt::Write;
use tracing::debug;

use crate::process::columns::stable;
use crate::process::table::{Table, Value};

/// Fields that make up a record's identity, in canonical order.
pub const IDENTITY_COLUMNS: [&str; 8] = [
    stable::DTYPE,
    stable::CATEGORY,
    stable::REASON,
    stable::REGION,
    stable::DT,
    stable::COMMENTS,
    stable::INDUSTRY,
    stable::SCORE,
];

/// Append one field to the canonical string. Every value is length-prefixed
/// and terminated, so no two field sequences share an encoding; nulls are `~`.
fn encode_field(out: &mut String, value: &Value) {
    match value.to_opt_string() {
        None => out.push_str("~;"),
        Some(s) => {
            let _ = write!(out, "{}:{};", s.len(), s);
        }
    }
}

/// Canonical encoding of the identity fields, in `IDENTITY_COLUMNS` order.
pub fn canonical_form(values: &[&Value]) -> String {
    let mut out = String::new();
    for v in values {
        encode_field(&mut out, v);
    }
    out
}

/// 32-character lowercase hex digest of the canonical form.
pub fn content_id(values: &[&Value]) -> String {
    hex::encode(Md5::digest(canonical_form(values).as_bytes()))
}

/// Add an `id` column (first position) computed from the identity fields.
/// A missing identity column counts as null for every row.
pub fn assign_ids(t: &mut Table) -> Result<()> {
    let positions: Vec<Option<usize>> = IDENTITY_COLUMNS
        .iter()
        .map(|c| t.column_index(c))
        .collect();
    let null = Value::Null;
    let ids: Vec<Value> = t
        .rows()
        .iter()
        .map(|row| {
            let fields: Vec<&Value> = positions
                .iter()
                .map(|p| p.map_or(&null, |i| &row[i]))
                .collect();
            Value::Text(content_id(&fields))
        })
        .collect();
    t.set_column(stable::ID, ids)?;
    t.move_to_front(stable::ID);
    Ok(())
}

/// Keep the first row of every id. Returns how many rows were dropped.
pub fn dedup_by_id(t: &mut Table) -> Result<usize> {
    let idx = t
        .column_index(stable::ID)
        .ok_or_else(|| anyhow::anyhow!("cannot dedup: no `{}` column", stable::ID))?;
    let before = t.len();
    let mut seen: HashSet<String> = HashSet::new();
    t.retain_rows(|_, row| match row[idx].as_text() {
        Some(id) => seen.insert(id.to_string()),
        None => true,
    });
    let dropped = before - t.len();
    debug!(dropped, "duplicate ids");
    Ok(dropped)
}
