// src/store/sql.rs
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{
    any::{install_default_drivers, AnyPoolOptions},
    AnyPool,
};
use tracing::{info, instrument};

use crate::record::WatcherRecord;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid identifier regex"));

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn check_table_name(name: &str) -> Result<()> {
    if !IDENT_RE.is_match(name) {
        bail!("invalid table name {:?}: expected a plain SQL identifier", name);
    }
    Ok(())
}

/// Append-only sink keyed by record id.
pub struct SqlStore {
    pool: AnyPool,
    table: String,
}

impl SqlStore {
    pub async fn connect(database_url: &str, table: &str) -> Result<Self> {
        check_table_name(table)?;
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .context("connecting to database")?;
        let store = Self {
            pool,
            table: table.to_string(),
        };
        store.ensure_table().await?;
        Ok(store)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn ensure_table(&self) -> Result<()> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                dtype TEXT NOT NULL,
                category TEXT,
                reason TEXT,
                region TEXT,
                dt TEXT NOT NULL,
                comments TEXT,
                industry TEXT,
                industry_detail TEXT,
                job_title TEXT,
                pref TEXT,
                score DOUBLE PRECISION NOT NULL
            )",
            self.table
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .with_context(|| format!("creating table {}", self.table))?;
        Ok(())
    }

    /// Insert all records in one transaction. Ids already present are left
    /// untouched. Returns the number of rows actually inserted.
    #[instrument(level = "info", skip(self, records), fields(table = %self.table, rows = records.len()))]
    pub async fn append(&self, records: &[WatcherRecord]) -> Result<u64> {
        let sql = format!(
            "INSERT INTO {} (id, dtype, category, reason, region, dt, comments, industry, \
             industry_detail, job_title, pref, score) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (id) DO NOTHING",
            self.table
        );

        let mut tx = self.pool.begin().await.context("opening transaction")?;
        let mut inserted = 0u64;
        for r in records {
            let res = sqlx::query(&sql)
                .bind(r.id.as_str())
                .bind(r.dtype.as_str())
                .bind(r.category.as_deref())
                .bind(r.reason.as_deref())
                .bind(r.region.as_deref())
                .bind(r.dt.format("%Y-%m-%d").to_string())
                .bind(r.comments.as_deref())
                .bind(r.industry.as_deref())
                .bind(r.industry_detail.as_deref())
                .bind(r.job_title.as_deref())
                .bind(r.pref.as_deref())
                .bind(r.score)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("inserting {}", r.id))?;
            inserted += res.rows_affected();
        }
        tx.commit().await.context("committing transaction")?;

        info!(inserted, skipped = records.len() as u64 - inserted, "appended");
        Ok(inserted)
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: &str, score: f64) -> WatcherRecord {
        WatcherRecord {
            id: id.to_string(),
            dtype: "先行き".into(),
            category: Some("小売".into()),
            reason: Some(String::new()),
            region: Some("北海道".into()),
            dt: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
            comments: Some("好調".into()),
            industry: Some("商店街".into()),
            industry_detail: None,
            job_title: None,
            pref: Some("北海道".into()),
            score,
        }
    }

    #[test]
    fn table_names_are_plain_identifiers() {
        assert!(check_table_name("business_watcher").is_ok());
        assert!(check_table_name("_t2").is_ok());
        assert!(check_table_name("2t").is_err());
        assert!(check_table_name("t; DROP TABLE x").is_err());
        assert!(check_table_name("").is_err());
    }

    #[tokio::test]
    async fn reingestion_inserts_nothing_new() -> Result<()> {
        let store = SqlStore::connect("sqlite::memory:", "business_watcher").await?;
        let batch = vec![record("a", 1.0), record("b", 0.5)];

        assert_eq!(store.append(&batch).await?, 2);
        assert_eq!(store.append(&batch).await?, 0);
        assert_eq!(store.count().await?, 2);

        let mixed = vec![record("b", 0.5), record("c", 0.0)];
        assert_eq!(store.append(&mixed).await?, 1);
        assert_eq!(store.count().await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn bad_table_name_is_rejected_before_connecting() {
        let res = SqlStore::connect("sqlite::memory:", "x y").await;
        assert!(res.is_err());
    }
}
