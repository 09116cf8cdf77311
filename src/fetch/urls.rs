// src/fetch/urls.rs
use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

const BASE_URL: &str = "https://www5.cao.go.jp/keizai3";

/// Zero-padded `YYYYMMDD` or `YYYY-MM-DD`; chrono alone accepts single digits.
static RELEASE_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{8}|\d{4}-\d{2}-\d{2})$").expect("release date regex should be valid")
});

/// Whether a sheet reports present conditions or the outlook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pattern {
    Current,
    Outlook,
}

impl Pattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::Current => "current",
            Pattern::Outlook => "outlook",
        }
    }

    /// The `dtype` label stamped onto records.
    pub fn label(&self) -> &'static str {
        match self {
            Pattern::Current => "現状",
            Pattern::Outlook => "先行き",
        }
    }
}

/// Geographic partition with its own sheet layout and vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    All,
    Koshinetsu,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::All => "all",
            Region::Koshinetsu => "koshinetsu",
        }
    }

    /// Non-null cells a normalized row needs to survive.
    pub fn completeness_threshold(&self) -> usize {
        match self {
            Region::All => 4,
            Region::Koshinetsu => 5,
        }
    }
}

/// One of the four published sheets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceDescriptor {
    pub pattern: Pattern,
    pub region: Region,
    /// Leading rows discarded before the header row.
    pub header_skip: usize,
    /// Sheet number in `watcher{N}.csv`.
    pub sheet: u8,
}

impl SourceDescriptor {
    /// URL of this sheet for the given release date.
    pub fn url(&self, release_date: NaiveDate) -> String {
        format!(
            "{}/{:04}/{:02}{:02}watcher/watcher{}.csv",
            BASE_URL,
            release_date.year(),
            release_date.month(),
            release_date.day(),
            self.sheet
        )
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.pattern.as_str(), self.region.as_str())
    }
}

pub static SOURCES: [SourceDescriptor; 4] = [
    SourceDescriptor {
        pattern: Pattern::Outlook,
        region: Region::All,
        header_skip: 7,
        sheet: 5,
    },
    SourceDescriptor {
        pattern: Pattern::Current,
        region: Region::All,
        header_skip: 7,
        sheet: 4,
    },
    SourceDescriptor {
        pattern: Pattern::Outlook,
        region: Region::Koshinetsu,
        header_skip: 2,
        sheet: 7,
    },
    SourceDescriptor {
        pattern: Pattern::Current,
        region: Region::Koshinetsu,
        header_skip: 2,
        sheet: 6,
    },
];

/// Look up the descriptor for a (pattern, region) pair.
pub fn find_source(pattern: Pattern, region: Region) -> Option<&'static SourceDescriptor> {
    SOURCES
        .iter()
        .find(|s| s.pattern == pattern && s.region == region)
}

/// Parse a release date given as `YYYYMMDD` or `YYYY-MM-DD`.
pub fn parse_release_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if !RELEASE_DATE_RE.is_match(s) {
        bail!("unrecognised release date `{}` (expected YYYYMMDD)", s)
    }
    for fmt in ["%Y%m%d", "%Y-%m-%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    bail!("unrecognised release date `{}` (expected YYYYMMDD)", s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn four_sources_one_per_pair() {
        let pairs: HashSet<_> = SOURCES.iter().map(|s| (s.pattern, s.region)).collect();
        assert_eq!(pairs.len(), 4);
        assert_eq!(find_source(Pattern::Outlook, Region::All).unwrap().header_skip, 7);
        assert_eq!(find_source(Pattern::Current, Region::Koshinetsu).unwrap().header_skip, 2);
    }

    #[test]
    fn url_uses_year_and_month_day() -> Result<()> {
        let d = parse_release_date("20240112")?;
        assert_eq!(
            find_source(Pattern::Outlook, Region::All).unwrap().url(d),
            "https://www5.cao.go.jp/keizai3/2024/0112watcher/watcher5.csv"
        );
        assert_eq!(
            find_source(Pattern::Current, Region::Koshinetsu).unwrap().url(d),
            "https://www5.cao.go.jp/keizai3/2024/0112watcher/watcher6.csv"
        );
        Ok(())
    }

    #[test]
    fn release_date_formats() {
        assert!(parse_release_date("2024-01-12").is_ok());
        assert!(parse_release_date("2024/01/12").is_err());
        assert!(parse_release_date("20241312").is_err());
        assert!(parse_release_date("2024111").is_err());
        assert!(parse_release_date("2024011").is_err());
        assert!(parse_release_date("2024-1-5").is_err());
        assert!(parse_release_date("202401120").is_err());
        assert_eq!(
            parse_release_date(" 20240112 ").ok(),
            NaiveDate::from_ymd_opt(2024, 1, 12)
        );
    }
}
