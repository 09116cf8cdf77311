// src/store/snapshot.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::record::{InvalidRow, WatcherRecord};

/// `<dir>/<kind>_<YYYY-MM-DD>.csv`
pub fn snapshot_path(dir: &Path, kind: &str, release_date: NaiveDate) -> PathBuf {
    dir.join(format!("{}_{}.csv", kind, release_date.format("%Y-%m-%d")))
}

/// Write valid records as a UTF-8 CSV snapshot with a single header row.
/// Written to a temp file first, then renamed over the target.
pub fn write_records(
    dir: &Path,
    kind: &str,
    release_date: NaiveDate,
    records: &[WatcherRecord],
) -> Result<PathBuf> {
    let path = snapshot_path(dir, kind, release_date);
    write_rows(&path, records)?;
    info!(path = %path.display(), rows = records.len(), "wrote snapshot");
    Ok(path)
}

#[derive(Serialize)]
struct InvalidLine<'a> {
    index: usize,
    id: Option<&'a str>,
    errors: String,
    payload: String,
}

/// Write rejected rows (errors plus the original payload as JSON).
pub fn write_invalid(dir: &Path, release_date: NaiveDate, rows: &[InvalidRow]) -> Result<PathBuf> {
    let path = snapshot_path(dir, "invalid", release_date);
    let lines = rows
        .iter()
        .map(|r| {
            Ok(InvalidLine {
                index: r.index,
                id: r.id.as_deref(),
                errors: r.errors.join("; "),
                payload: serde_json::to_string(&r.payload)
                    .context("serializing invalid row payload")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    write_rows(&path, &lines)?;
    info!(path = %path.display(), rows = rows.len(), "wrote invalid rows");
    Ok(path)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating snapshot directory {:?}", parent))?;
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("snapshot.csv");
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let mut wtr = csv::Writer::from_path(&tmp_path)
        .with_context(|| format!("creating {:?}", tmp_path))?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("writing row to {:?}", tmp_path))?;
    }
    wtr.flush()
        .with_context(|| format!("flushing {:?}", tmp_path))?;
    drop(wtr);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn record(id: &str) -> WatcherRecord {
        WatcherRecord {
            id: id.to_string(),
            dtype: "現状".into(),
            category: Some("小売".into()),
            reason: Some("来客数の動き".into()),
            region: Some("北海道".into()),
            dt: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
            comments: Some("売上は、前年並み".into()),
            industry: Some("商店街".into()),
            industry_detail: None,
            job_title: Some("代表者".into()),
            pref: Some("北海道".into()),
            score: 0.5,
        }
    }

    #[test]
    fn snapshot_has_header_and_rows() -> Result<()> {
        let dir = tempdir()?;
        let date = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        let path = write_records(dir.path(), "append", date, &[record("a"), record("b")])?;
        assert_eq!(path.file_name().unwrap(), "append_2024-01-12.csv");

        let text = fs::read_to_string(&path)?;
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,dtype,category,reason,region,dt,comments,industry,industry_detail,job_title,pref,score")
        );
        let mut rdr = csv::Reader::from_path(&path)?;
        let back: Vec<WatcherRecord> = rdr.deserialize().collect::<Result<_, _>>()?;
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].comments.as_deref(), Some("売上は、前年並み"));
        assert_eq!(back[1].id, "b");
        Ok(())
    }

    #[test]
    fn invalid_rows_carry_errors_and_payload() -> Result<()> {
        let dir = tempdir()?;
        let date = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        let mut payload = BTreeMap::new();
        payload.insert("score".to_string(), Some("high".to_string()));
        let rows = vec![InvalidRow {
            index: 3,
            id: None,
            errors: vec!["a".into(), "b".into()],
            payload,
        }];
        let path = write_invalid(dir.path(), date, &rows)?;
        let text = fs::read_to_string(path)?;
        assert!(text.starts_with("index,id,errors,payload"));
        assert!(text.contains("a; b"));
        assert!(text.contains("high"));
        Ok(())
    }
}
