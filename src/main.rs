use anyhow::Result;
use reqwest::Client;
use std::{fs, sync::Arc};
use tokio::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use watcherscraper::{
    config::{Config, SourceMode},
    pipeline::{self, Sinks},
    process::convert::ScoreConverter,
    store::SqlStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,watcherscraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let cfg = Config::load()?;
    let dates = cfg.resolve_dates()?;
    if dates.is_empty() {
        info!("nothing to process; exit");
        return Ok(());
    }
    info!(
        dates = dates.len(),
        source = ?cfg.source,
        dry_run = cfg.dry_run,
        "configured"
    );
    fs::create_dir_all(&cfg.out_dir)?;

    // ─── 3) sinks ────────────────────────────────────────────────────
    let sql = match (&cfg.database_url, cfg.dry_run) {
        (Some(url), false) => match SqlStore::connect(url, &cfg.table_name).await {
            Ok(store) => Some(store),
            Err(e) => {
                error!("database unavailable, continuing with snapshots only: {:#}", e);
                None
            }
        },
        (None, false) => {
            warn!("DATABASE_URL not set; records go to CSV snapshots only");
            None
        }
        (_, true) => None,
    };
    let sinks = Sinks {
        out_dir: cfg.out_dir.clone(),
        sql,
    };

    // ─── 4) one release at a time ────────────────────────────────────
    let client = Client::new();
    let converter = Arc::new(ScoreConverter::new());
    let mut failed = 0usize;

    for date in dates {
        let start = Instant::now();
        info!(%date, "processing release");

        let inputs = match cfg.source {
            SourceMode::Remote => {
                pipeline::fetch_release(&client, date, Some(&cfg.archive_dir)).await
            }
            SourceMode::Archive => pipeline::load_release(&cfg.archive_dir, date),
        };
        let res = match inputs {
            Ok(inputs) => {
                pipeline::process_release(inputs, date, converter.clone(), &sinks, cfg.dry_run)
                    .await
            }
            Err(e) => Err(e),
        };

        match res {
            Ok(summary) => info!(
                %date,
                valid = summary.report.valid.len(),
                invalid = summary.report.invalid.len(),
                elapsed = ?start.elapsed(),
                "release finished"
            ),
            Err(e) => {
                failed += 1;
                error!(%date, "release failed: {:#}", e);
            }
        }
    }

    if failed > 0 {
        warn!(failed, "some releases failed");
    }
    info!("all done");
    Ok(())
}
