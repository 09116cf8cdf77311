// src/validate.rs
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::fetch::urls::Pattern;
use crate::process::columns::stable;
use crate::process::table::{Table, Value};
use crate::record::{InvalidRow, WatcherRecord};

#[derive(Error, Debug, PartialEq)]
pub enum FieldError {
    #[error("id must be a 32-char hex string, got {0:?}")]
    InvalidId(Option<String>),

    #[error("dtype must be one of 現状/先行き, got {0:?}")]
    InvalidDtype(Option<String>),

    #[error("dt must be a date-like value, got {0:?}")]
    InvalidDate(Option<String>),

    #[error("score must be a float, got {0:?}")]
    InvalidScore(Option<String>),
}

/// Columns every merged batch must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    stable::ID,
    stable::DTYPE,
    stable::CATEGORY,
    stable::REGION,
    stable::DT,
    stable::SCORE,
];

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub valid: Vec<WatcherRecord>,
    pub invalid: Vec<InvalidRow>,
}

impl ValidationReport {
    pub fn total(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%Y.%m.%d", "%Y年%m月%d日"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse the common textual date forms (plain dates, timestamps, RFC 3339).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn check_id(v: &Value) -> Result<String, FieldError> {
    match v.as_text() {
        Some(s) if s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit()) => Ok(s.to_string()),
        _ => Err(FieldError::InvalidId(v.to_opt_string())),
    }
}

fn check_dtype(v: &Value) -> Result<String, FieldError> {
    match v.as_text() {
        Some(s) if s == Pattern::Current.label() || s == Pattern::Outlook.label() => {
            Ok(s.to_string())
        }
        _ => Err(FieldError::InvalidDtype(v.to_opt_string())),
    }
}

fn check_dt(v: &Value) -> Result<NaiveDate, FieldError> {
    v.as_text()
        .and_then(parse_date)
        .ok_or_else(|| FieldError::InvalidDate(v.to_opt_string()))
}

fn check_score(v: &Value) -> Result<f64, FieldError> {
    match v {
        Value::Float(f) => Ok(*f),
        Value::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| FieldError::InvalidScore(Some(s.clone()))),
        Value::Null => Err(FieldError::InvalidScore(None)),
    }
}

/// Check every row on its own and split the batch into conforming records
/// and rejected rows. A missing required column fails the whole batch.
pub fn validate_table(t: &Table) -> Result<ValidationReport> {
    let position = |name: &str| {
        t.column_index(name)
            .ok_or_else(|| anyhow!("missing required column: {}", name))
    };
    for col in REQUIRED_COLUMNS {
        position(col)?;
    }
    let (id_i, dtype_i, dt_i, score_i) = (
        position(stable::ID)?,
        position(stable::DTYPE)?,
        position(stable::DT)?,
        position(stable::SCORE)?,
    );
    let cell = |row: &[Value], name: &str| -> Option<String> {
        t.column_index(name).and_then(|i| row[i].to_opt_string())
    };

    let mut report = ValidationReport::default();
    for (index, row) in t.rows().iter().enumerate() {
        let id = check_id(&row[id_i]);
        let dtype = check_dtype(&row[dtype_i]);
        let dt = check_dt(&row[dt_i]);
        let score = check_score(&row[score_i]);

        match (id, dtype, dt, score) {
            (Ok(id), Ok(dtype), Ok(dt), Ok(score)) => report.valid.push(WatcherRecord {
                id,
                dtype,
                category: cell(row, stable::CATEGORY),
                reason: cell(row, stable::REASON),
                region: cell(row, stable::REGION),
                dt,
                comments: cell(row, stable::COMMENTS),
                industry: cell(row, stable::INDUSTRY),
                industry_detail: cell(row, stable::INDUSTRY_DETAIL),
                job_title: cell(row, stable::JOB_TITLE),
                pref: cell(row, stable::PREF),
                score,
            }),
            (id, dtype, dt, score) => {
                let errors: Vec<String> = [
                    id.err(),
                    dtype.err(),
                    dt.err(),
                    score.err(),
                ]
                .into_iter()
                .flatten()
                .map(|e| e.to_string())
                .collect();
                let payload: BTreeMap<String, Option<String>> = t
                    .columns()
                    .iter()
                    .zip(row)
                    .map(|(c, v)| (c.clone(), v.to_opt_string()))
                    .collect();
                let id = cell(row, stable::ID);
                warn!(index, id = ?id, errors = ?errors, "invalid row");
                report.invalid.push(InvalidRow {
                    index,
                    id,
                    errors,
                    payload,
                });
            }
        }
    }

    info!(
        valid = report.valid.len(),
        invalid = report.invalid.len(),
        "validated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0123456789abcdef0123456789abcdef";

    fn batch(rows: Vec<[Value; 6]>) -> Table {
        let mut t = Table::new(REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect());
        for r in rows {
            t.push_row(r.to_vec());
        }
        t
    }

    fn good() -> [Value; 6] {
        [
            Value::text(ID),
            Value::text("先行き"),
            Value::text("小売"),
            Value::text("北海道"),
            Value::text("2024-01-12"),
            Value::Float(0.75),
        ]
    }

    #[test]
    fn conforming_row_becomes_record() -> Result<()> {
        let report = validate_table(&batch(vec![good()]))?;
        assert_eq!(report.valid.len(), 1);
        let rec = &report.valid[0];
        assert_eq!(rec.dt, NaiveDate::from_ymd_opt(2024, 1, 12).unwrap());
        assert_eq!(rec.score, 0.75);
        assert_eq!(rec.category.as_deref(), Some("小売"));
        assert_eq!(rec.comments, None);
        Ok(())
    }

    #[test]
    fn each_rule_rejects_only_its_row() -> Result<()> {
        let mut bad_id = good();
        bad_id[0] = Value::text("xyz");
        let mut bad_dtype = good();
        bad_dtype[1] = Value::text("current?");
        let mut bad_dt = good();
        bad_dt[4] = Value::text("someday");
        let mut bad_score = good();
        bad_score[5] = Value::text("high");
        let mut all_bad = good();
        all_bad[0] = Value::Null;
        all_bad[5] = Value::Null;

        let t = batch(vec![good(), bad_id, bad_dtype, bad_dt, bad_score, all_bad, good()]);
        let report = validate_table(&t)?;
        assert_eq!(report.valid.len(), 2);
        assert_eq!(report.invalid.len(), 5);
        assert_eq!(report.total(), t.len());

        let indices: Vec<usize> = report.invalid.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
        assert_eq!(report.invalid[4].errors.len(), 2);
        assert_eq!(
            report.invalid[3].payload.get(stable::SCORE),
            Some(&Some("high".to_string()))
        );
        Ok(())
    }

    #[test]
    fn text_score_is_coerced() -> Result<()> {
        let mut row = good();
        row[5] = Value::text(" 0.25 ");
        let report = validate_table(&batch(vec![row]))?;
        assert_eq!(report.valid[0].score, 0.25);
        Ok(())
    }

    #[test]
    fn date_forms() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 12);
        assert_eq!(parse_date("2024-01-12"), d);
        assert_eq!(parse_date("2024/01/12"), d);
        assert_eq!(parse_date("20240112"), d);
        assert_eq!(parse_date("2024年1月12日"), d);
        assert_eq!(parse_date("2024-01-12 00:00:00"), d);
        assert_eq!(parse_date("2024-01-12T09:30:00+09:00"), d);
        assert_eq!(parse_date("12th of never"), None);
    }

    #[test]
    fn missing_required_column_fails_batch() {
        let t = Table::new(vec![stable::ID.into(), stable::DTYPE.into()]);
        assert!(validate_table(&t).is_err());
    }
}
