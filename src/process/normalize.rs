// src/process/normalize.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::fetch::urls::{Region, SourceDescriptor};
use crate::process::columns::{self, CATEGORY, INDUSTRY, INDUSTRY_DETAIL, INDUSTRY_JOB, JOB_TITLE};
use crate::process::convert::ScoreConverter;
use crate::process::table::{Table, Value};
use crate::process::utils::{
    after_delim, before_delim, starts_with_digit, strip_layout_chars, strip_newlines,
};
use crate::process::RawTable;

/// Literal region of the Koshinetsu sheets.
pub const KOSHINETSU_LABEL: &str = "甲信越";

/// "No reason applicable".
pub const SENTINEL_NOT_APPLICABLE: &str = "＊";
/// "Not available", published both as a minus sign and a full-width hyphen.
pub const SENTINEL_NOT_AVAILABLE: [&str; 2] = ["−", "－"];

const INTERPUNCT: char = '・';

pub fn is_sentinel(s: &str) -> bool {
    s == SENTINEL_NOT_APPLICABLE || SENTINEL_NOT_AVAILABLE.contains(&s)
}

/// Turns one raw sheet into long-form rows with stable column names.
pub struct Normalizer<'a> {
    converter: &'a ScoreConverter,
}

impl<'a> Normalizer<'a> {
    pub fn new(converter: &'a ScoreConverter) -> Self {
        Self { converter }
    }

    /// Normalize `raw` for `source`, stamping `release_date` as `dt`.
    ///
    /// Output columns (renamed): `category`, `pref`, `region`, `industry`,
    /// `industry_detail`, `job_title`, `score_current`/`score_future`,
    /// `reason`/`reason_future`, `comments` (current only), `dtype`, `dt`,
    /// plus any unnamed source columns.
    #[instrument(level = "info", skip(self, raw, source), fields(source = %source, rows = raw.rows.len()))]
    pub fn normalize(
        &self,
        raw: RawTable,
        source: &SourceDescriptor,
        release_date: NaiveDate,
    ) -> Result<Table> {
        let pattern = source.pattern;
        let region = source.region;
        let mut t = raw.into_table();

        for col in std::iter::once(CATEGORY).chain(pattern.label_columns().iter().copied()) {
            if !t.has_column(col) {
                anyhow::bail!("{} sheet is missing expected column `{}`", source, col);
            }
        }

        // 1) line breaks anywhere; full-width spaces in the category
        t.map_all_text(|s| Value::Text(strip_newlines(s)));
        t.map_text(CATEGORY, |s| Value::Text(strip_layout_chars(s)))?;

        // 2) footnote markers and the repeated header label are not categories
        t.map_text(CATEGORY, |s| {
            if starts_with_digit(s) || s == CATEGORY {
                Value::Null
            } else {
                Value::text(s)
            }
        })?;

        // 3) header labels leaking into data rows
        for &col in pattern.label_columns() {
            t.map_text(col, |s| if s == col { Value::Null } else { Value::text(s) })?;
        }

        // 4) categories are written once per group
        t.fill_forward(CATEGORY)?;

        // 5) region
        match region {
            Region::All => t.derive_column(CATEGORY, columns::REGION, |v| match v {
                Value::Text(s) => after_delim(s, '(', ')').map_or(Value::Null, Value::Text),
                other => other.clone(),
            })?,
            Region::Koshinetsu => t.set_constant(columns::REGION, Value::text(KOSHINETSU_LABEL)),
        }
        t.map_text(CATEGORY, |s| Value::text(before_delim(s, '(').unwrap_or(s)))?;

        // 6) industry（job）
        t.derive_column(INDUSTRY_JOB, INDUSTRY, |v| match v {
            Value::Text(s) => Value::text(before_delim(s, '（').unwrap_or(s)),
            other => other.clone(),
        })?;
        t.derive_column(INDUSTRY_JOB, JOB_TITLE, |v| match v {
            Value::Text(s) => after_delim(s, '（', '）').map_or(Value::Null, Value::Text),
            other => other.clone(),
        })?;

        // 7) industry［detail］
        t.derive_column(INDUSTRY, INDUSTRY_DETAIL, |v| match v {
            Value::Text(s) => after_delim(s, '［', '］').map_or(Value::Null, Value::Text),
            other => other.clone(),
        })?;
        t.map_text(INDUSTRY, |s| Value::text(before_delim(s, '［').unwrap_or(s)))?;

        // 8) decorative bullets
        t.map_text(pattern.free_text_column(), |s| {
            Value::Text(s.replace(INTERPUNCT, ""))
        })?;

        // 9) non-answers
        let before = t.len();
        t.retain_by(pattern.sentinel_column(), |v| {
            !v.as_text().map_or(false, is_sentinel)
        })?;
        debug!(dropped = before - t.len(), "sentinel rows");

        // 10) footers, legends and other structurally broken rows
        let before = t.len();
        t.drop_sparse_rows(region.completeness_threshold());
        debug!(dropped = before - t.len(), "incomplete rows");

        // 11)
        t.drop_column(INDUSTRY_JOB);

        // 12) scores
        let judgment = pattern.judgment_column();
        if region == Region::Koshinetsu {
            t.fill_forward(judgment)?;
        }
        let converter = self.converter;
        t.derive_column(judgment, judgment, |v| match v {
            Value::Text(s) => converter
                .score(pattern, region, s)
                .map_or(Value::Null, Value::Float),
            Value::Float(f) => Value::Float(*f),
            Value::Null => Value::Null,
        })
        .with_context(|| format!("scoring {}", source))?;

        // 13)
        t.set_constant(columns::DTYPE, Value::text(pattern.label()));
        t.set_constant(
            columns::DT,
            Value::Text(release_date.format("%Y-%m-%d").to_string()),
        );

        // 14)
        t.rename(columns::RENAME.iter().copied());

        debug!(rows = t.len(), "normalized");
        Ok(t)
    }
}
