// src/pipeline.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::future::join_all;
use rayon::prelude::*;
use reqwest::Client;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::fetch::{archive, download, urls::SourceDescriptor, urls::SOURCES};
use crate::process::{
    convert::ScoreConverter, encoding::decode_bytes, load_raw_table, normalize::Normalizer,
    table::Table,
};
use crate::record::{assign_ids, clean_table, dedup_by_id, merge_tables};
use crate::store::{self, SqlStore};
use crate::validate::{validate_table, ValidationReport};

/// Decoded text of one published sheet.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub source: SourceDescriptor,
    pub text: String,
}

/// Where a release's outputs go.
pub struct Sinks {
    pub out_dir: PathBuf,
    pub sql: Option<SqlStore>,
}

#[derive(Debug, Default)]
pub struct PersistOutcome {
    pub snapshot: Option<PathBuf>,
    pub invalid_snapshot: Option<PathBuf>,
    pub inserted: Option<u64>,
}

#[derive(Debug)]
pub struct ReleaseSummary {
    pub release_date: NaiveDate,
    pub sources: usize,
    pub rows: usize,
    pub duplicates: usize,
    pub report: ValidationReport,
    pub persisted: Option<PersistOutcome>,
}

/// Download all four sheets of a release concurrently.
///
/// Unavailable sheets are logged and left out; the rest come back in
/// `SOURCES` order. With `archive_dir` set, each decoded sheet is also saved
/// there.
pub async fn fetch_release(
    client: &Client,
    release_date: NaiveDate,
    archive_dir: Option<&Path>,
) -> Result<Vec<SourceText>> {
    let mut handles = Vec::with_capacity(SOURCES.len());
    for source in SOURCES.iter().copied() {
        let client = client.clone();
        let url = source.url(release_date);
        handles.push(tokio::spawn(async move {
            let start = Instant::now();
            let res = download::retrieve(&client, &url).await;
            (source, url, res, start.elapsed())
        }));
    }

    let mut out = Vec::with_capacity(handles.len());
    for joined in join_all(handles).await {
        let (source, url, res, elapsed) = joined.context("fetch task panicked")?;
        let bytes = match res {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                error!(%source, "{} not available", url);
                continue;
            }
            Err(e) => {
                error!(%source, "{} not available: {:#}", url, e);
                continue;
            }
        };
        let text = decode_bytes(&bytes);
        info!(%source, bytes = bytes.len(), ?elapsed, "fetched");

        if let Some(dir) = archive_dir {
            if let Err(e) = archive::save(dir, release_date, &source, &text) {
                warn!(%source, "archiving failed: {:#}", e);
            }
        }
        out.push(SourceText { source, text });
    }
    Ok(out)
}

/// Read a release's sheets back from the local archive.
pub fn load_release(archive_dir: &Path, release_date: NaiveDate) -> Result<Vec<SourceText>> {
    let mut out = Vec::new();
    for source in SOURCES.iter().copied() {
        match archive::load(archive_dir, release_date, &source)? {
            Some(text) => out.push(SourceText { source, text }),
            None => error!(%source, "{} not archived", release_date),
        }
    }
    Ok(out)
}

/// Parse, normalize and clean one decoded sheet.
pub fn build_source_table(
    text: &str,
    source: &SourceDescriptor,
    release_date: NaiveDate,
    converter: &ScoreConverter,
) -> Result<Table> {
    let raw = load_raw_table(text, source.header_skip)
        .with_context(|| format!("reading {} sheet", source))?;
    let normalized = Normalizer::new(converter).normalize(raw, source, release_date)?;
    clean_table(normalized, source.pattern, source.region)
}

/// Normalize every sheet in parallel and stack them in input order.
/// A structurally broken sheet fails the whole release.
pub fn normalize_release(
    inputs: &[SourceText],
    release_date: NaiveDate,
    converter: &ScoreConverter,
) -> Result<Table> {
    let tables = inputs
        .par_iter()
        .map(|s| {
            let res = build_source_table(&s.text, &s.source, release_date, converter);
            match &res {
                Ok(t) => info!(source = %s.source, rows = t.len(), "normalized"),
                Err(e) => error!(source = %s.source, "normalization failed: {:#}", e),
            }
            res.with_context(|| format!("normalizing {}", s.source))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(merge_tables(tables))
}

/// Assign ids, drop duplicates and validate. Returns the report and the
/// number of duplicate rows removed.
pub fn prepare_batch(mut merged: Table) -> Result<(ValidationReport, usize)> {
    assign_ids(&mut merged)?;
    let duplicates = dedup_by_id(&mut merged)?;
    let report = validate_table(&merged)?;
    Ok((report, duplicates))
}

/// Write the snapshot(s), then insert into SQL. Each sink fails on its own.
pub async fn persist(
    report: &ValidationReport,
    release_date: NaiveDate,
    sinks: &Sinks,
) -> PersistOutcome {
    let mut outcome = PersistOutcome::default();

    if report.valid.is_empty() {
        info!("no valid rows; skipping snapshot");
    } else {
        match store::write_records(&sinks.out_dir, "append", release_date, &report.valid) {
            Ok(path) => outcome.snapshot = Some(path),
            Err(e) => error!("snapshot failed: {:#}", e),
        }
    }
    if !report.invalid.is_empty() {
        match store::write_invalid(&sinks.out_dir, release_date, &report.invalid) {
            Ok(path) => outcome.invalid_snapshot = Some(path),
            Err(e) => error!("invalid-row snapshot failed: {:#}", e),
        }
    }

    match &sinks.sql {
        Some(db) if !report.valid.is_empty() => match db.append(&report.valid).await {
            Ok(n) => outcome.inserted = Some(n),
            Err(e) => error!(table = db.table(), "insert failed: {:#}", e),
        },
        Some(_) => {}
        None => warn!("no database configured; skipping SQL sink"),
    }
    outcome
}

/// Run one release through normalization, identity, validation and, unless
/// `dry_run`, persistence.
#[instrument(level = "info", skip(inputs, converter, sinks), fields(sources = inputs.len()))]
pub async fn process_release(
    inputs: Vec<SourceText>,
    release_date: NaiveDate,
    converter: Arc<ScoreConverter>,
    sinks: &Sinks,
    dry_run: bool,
) -> Result<ReleaseSummary> {
    let sources = inputs.len();
    if sources == 0 {
        warn!("no sources available");
        return Ok(ReleaseSummary {
            release_date,
            sources,
            rows: 0,
            duplicates: 0,
            report: ValidationReport::default(),
            persisted: None,
        });
    }

    // rayon work stays off the async executor
    let merged = tokio::task::spawn_blocking(move || {
        normalize_release(&inputs, release_date, &converter)
    })
    .await
    .context("normalization task panicked")??;
    let rows = merged.len();

    let (report, duplicates) = prepare_batch(merged)?;

    let persisted = if dry_run {
        info!(valid = report.valid.len(), "dry run; nothing persisted");
        None
    } else {
        Some(persist(&report, release_date, sinks).await)
    };

    info!(
        rows,
        duplicates,
        valid = report.valid.len(),
        invalid = report.invalid.len(),
        "release done"
    );
    Ok(ReleaseSummary {
        release_date,
        sources,
        rows,
        duplicates,
        report,
        persisted,
    })
}
