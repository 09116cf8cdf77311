// src/fetch/archive.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use super::urls::SourceDescriptor;

static ARCHIVE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})\.(current|outlook)\.(all|koshinetsu)\.csv$")
        .expect("archive file name regex should be valid")
});

/// `<dir>/<YYYY-MM-DD>.<pattern>.<region>.csv`
pub fn archive_path(dir: &Path, release_date: NaiveDate, source: &SourceDescriptor) -> PathBuf {
    dir.join(format!(
        "{}.{}.{}.csv",
        release_date.format("%Y-%m-%d"),
        source.pattern.as_str(),
        source.region.as_str()
    ))
}

/// Keep a decoded (UTF-8) copy of a downloaded source.
pub fn save(
    dir: &Path,
    release_date: NaiveDate,
    source: &SourceDescriptor,
    text: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating archive dir {:?}", dir))?;
    let path = archive_path(dir, release_date, source);
    fs::write(&path, text).with_context(|| format!("writing {:?}", path))?;
    debug!(path = %path.display(), "archived");
    Ok(path)
}

/// Read an archived source, `None` if it was never saved.
pub fn load(dir: &Path, release_date: NaiveDate, source: &SourceDescriptor) -> Result<Option<String>> {
    let path = archive_path(dir, release_date, source);
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(&path)
        .map(Some)
        .with_context(|| format!("reading {:?}", path))
}

/// Every release date with at least one archived source, ascending.
pub fn archived_dates(dir: &Path) -> Result<Vec<NaiveDate>> {
    let pattern = dir.join("*.csv");
    let pattern = pattern.to_string_lossy();
    let mut dates = BTreeSet::new();
    for entry in glob::glob(&pattern).context("bad archive glob")? {
        let path = entry?;
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(caps) = ARCHIVE_NAME_RE.captures(name) else {
            continue;
        };
        if let Ok(d) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") {
            dates.insert(d);
        }
    }
    info!(dir = %dir.display(), dates = dates.len(), "scanned archive");
    Ok(dates.into_iter().collect())
}
