// src/process/columns.rs
//! Header labels used by the published survey sheets, and the stable
//! schema names they are renamed to.

use crate::fetch::urls::Pattern;

pub const CATEGORY: &str = "分野";
pub const PREF: &str = "都道府県";
pub const SCORE_CURRENT: &str = "景気の現状判断";
pub const SCORE_OUTLOOK: &str = "景気の先行き判断";
pub const INDUSTRY_JOB: &str = "業種・職種";
pub const REASON: &str = "判断の理由";
pub const REASON_OUTLOOK: &str = "景気の先行きに対する判断理由";
pub const COMMENTS: &str = "追加説明及び具体的状況の説明";

// derived during normalization
pub const REGION: &str = "地域";
pub const INDUSTRY: &str = "業種";
pub const INDUSTRY_DETAIL: &str = "業種詳細";
pub const JOB_TITLE: &str = "職種";
pub const DTYPE: &str = "タイプ";
pub const DT: &str = "日付";

/// Prefix given to blank header cells.
pub const UNNAMED_PREFIX: &str = "Unnamed";

pub const RENAME: &[(&str, &str)] = &[
    ("Id", "id"),
    (DTYPE, "dtype"),
    (CATEGORY, "category"),
    (REASON, "reason"),
    (REGION, "region"),
    (DT, "dt"),
    (REASON_OUTLOOK, "reason_future"),
    (SCORE_OUTLOOK, "score_future"),
    (SCORE_CURRENT, "score_current"),
    (INDUSTRY, "industry"),
    (INDUSTRY_DETAIL, "industry_detail"),
    (JOB_TITLE, "job_title"),
    (COMMENTS, "comments"),
    (PREF, "pref"),
];

/// Stable schema names.
pub mod stable {
    pub const ID: &str = "id";
    pub const DTYPE: &str = "dtype";
    pub const CATEGORY: &str = "category";
    pub const REASON: &str = "reason";
    pub const REGION: &str = "region";
    pub const DT: &str = "dt";
    pub const COMMENTS: &str = "comments";
    pub const INDUSTRY: &str = "industry";
    pub const INDUSTRY_DETAIL: &str = "industry_detail";
    pub const JOB_TITLE: &str = "job_title";
    pub const PREF: &str = "pref";
    pub const SCORE: &str = "score";
    pub const REASON_FUTURE: &str = "reason_future";
    pub const SCORE_FUTURE: &str = "score_future";
    pub const SCORE_CURRENT: &str = "score_current";
}

impl Pattern {
    /// Columns whose own header label can leak into data rows.
    pub fn label_columns(self) -> &'static [&'static str] {
        match self {
            Pattern::Current => &[SCORE_CURRENT, REASON, COMMENTS, INDUSTRY_JOB],
            Pattern::Outlook => &[SCORE_OUTLOOK, REASON_OUTLOOK, INDUSTRY_JOB],
        }
    }

    /// Column carrying the judgment symbol or phrase.
    pub fn judgment_column(self) -> &'static str {
        match self {
            Pattern::Current => SCORE_CURRENT,
            Pattern::Outlook => SCORE_OUTLOOK,
        }
    }

    /// Column checked against the non-answer sentinels.
    pub fn sentinel_column(self) -> &'static str {
        match self {
            Pattern::Current => REASON,
            Pattern::Outlook => REASON_OUTLOOK,
        }
    }

    /// Free-text column decorated with interpunct bullets.
    pub fn free_text_column(self) -> &'static str {
        match self {
            Pattern::Current => COMMENTS,
            Pattern::Outlook => REASON_OUTLOOK,
        }
    }

    /// Renamed score column produced by the normalizer.
    pub fn score_column(self) -> &'static str {
        match self {
            Pattern::Current => stable::SCORE_CURRENT,
            Pattern::Outlook => stable::SCORE_FUTURE,
        }
    }
}
