// src/config.rs
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::debug;
use url::Url;

use crate::fetch::{archive, urls::parse_release_date};
use crate::store::check_table_name;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceMode {
    /// Download from the publisher.
    Remote,
    /// Re-read previously downloaded sheets.
    Archive,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Fetch, normalize and store Economy Watchers Survey releases"
)]
pub struct Args {
    /// Release dates as YYYYMMDD, comma separated
    #[arg(value_delimiter = ',')]
    pub target_dates: Vec<String>,

    /// Normalize and validate only; write nothing
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, value_enum, default_value_t = SourceMode::Remote)]
    pub source: SourceMode,

    #[arg(long, default_value = "./historical_data")]
    pub archive_dir: PathBuf,

    /// Directory for CSV snapshots
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "BUSINESS_WATCHER_BOT_TABLE_NAME", default_value = "business_watcher")]
    pub table_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub release_dates: Vec<NaiveDate>,
    pub dry_run: bool,
    pub source: SourceMode,
    pub archive_dir: PathBuf,
    pub out_dir: PathBuf,
    pub database_url: Option<String>,
    pub table_name: String,
}

impl Config {
    /// `.env` (if any), then the command line and environment.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<Self> {
        let release_dates = args
            .target_dates
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_release_date(s))
            .collect::<Result<Vec<_>>>()
            .context("parsing target dates")?;
        if release_dates.is_empty() && args.source == SourceMode::Remote {
            bail!("no release dates given (expected e.g. 20240112)");
        }
        check_table_name(&args.table_name)?;

        Ok(Self {
            release_dates,
            dry_run: args.dry_run,
            source: args.source,
            archive_dir: args.archive_dir,
            out_dir: args.out_dir,
            database_url: args.database_url.as_deref().map(normalize_database_url),
            table_name: args.table_name,
        })
    }

    /// Dates to process: the ones given, or every archived date when
    /// reading from the archive without an explicit list.
    pub fn resolve_dates(&self) -> Result<Vec<NaiveDate>> {
        if self.release_dates.is_empty() && self.source == SourceMode::Archive {
            return archive::archived_dates(&self.archive_dir);
        }
        Ok(self.release_dates.clone())
    }
}

/// Supabase only accepts TLS connections; require it unless the URL already
/// says otherwise. Anything unparseable is returned untouched.
pub fn normalize_database_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    let is_supabase = url
        .host_str()
        .map_or(false, |h| h == "supabase.co" || h.ends_with(".supabase.co"));
    if !is_supabase || url.query_pairs().any(|(k, _)| k == "sslmode") {
        return raw.to_string();
    }
    url.query_pairs_mut().append_pair("sslmode", "require");
    url.to_string()
}
