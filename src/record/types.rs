// src/record/types.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One respondent's judgment for one release date, as persisted.
/// Field order is the column order of CSV snapshots and the SQL table.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WatcherRecord {
    pub id: String,
    pub dtype: String,
    pub category: Option<String>,
    pub reason: Option<String>,
    pub region: Option<String>,
    pub dt: NaiveDate,
    pub comments: Option<String>,
    pub industry: Option<String>,
    pub industry_detail: Option<String>,
    pub job_title: Option<String>,
    pub pref: Option<String>,
    pub score: f64,
}

/// A row rejected by validation, kept for operator review.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRow {
    /// Position in the validated batch.
    pub index: usize,
    pub id: Option<String>,
    pub errors: Vec<String>,
    /// The row as it was presented to the validator.
    pub payload: BTreeMap<String, Option<String>>,
}
