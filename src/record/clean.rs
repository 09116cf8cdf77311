// src/record/clean.rs
use anyhow::Result;

use crate::fetch::urls::{Pattern, Region};
use crate::process::columns::{stable, UNNAMED_PREFIX};
use crate::process::table::{Table, Value};

/// Score given to a row whose judgment could not be mapped.
///
/// An absent judgment is recorded as "will improve", not unknown.
/// Confirm with the survey owners before changing it.
pub const DEFAULT_SCORE: f64 = 1.0;

fn text_or_empty(v: &Value) -> &str {
    v.as_text().unwrap_or("")
}

/// Fold one normalized sheet into the stable record layout: unified
/// `reason`, `comments` and `score`, with pattern-specific columns removed.
pub fn clean_table(mut t: Table, pattern: Pattern, region: Region) -> Result<Table> {
    t.drop_columns_where(|c| c.starts_with(UNNAMED_PREFIX));

    if pattern == Pattern::Outlook {
        // the future reason becomes the comment; any comment column is appended
        let reason_idx = t.column_index(stable::REASON_FUTURE);
        let comments_idx = t.column_index(stable::COMMENTS);
        let merged: Vec<Value> = t
            .rows()
            .iter()
            .map(|row| {
                let reason = reason_idx.map_or("", |i| text_or_empty(&row[i]));
                let comments = comments_idx.map_or("", |i| text_or_empty(&row[i]));
                Value::Text(format!("{}{}", reason, comments))
            })
            .collect();
        t.set_column(stable::COMMENTS, merged)?;
    }

    if pattern == Pattern::Outlook || region == Region::Koshinetsu {
        t.set_constant(stable::REASON, Value::text(""));
    }

    let score_col = pattern.score_column();
    if !t.has_column(score_col) {
        t.set_constant(score_col, Value::Null);
    }
    t.derive_column(score_col, stable::SCORE, |v| match v {
        Value::Float(f) => Value::Float(*f),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_or_else(|_| Value::text(s.as_str()), Value::Float),
        Value::Null => Value::Float(DEFAULT_SCORE),
    })?;

    t.drop_column(stable::SCORE_CURRENT);
    t.drop_column(stable::SCORE_FUTURE);
    t.drop_column(stable::REASON_FUTURE);
    Ok(t)
}

/// Stack cleaned sheets on the union of their columns.
pub fn merge_tables(tables: Vec<Table>) -> Table {
    Table::concat(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outlook_table() -> Table {
        let mut t = Table::new(vec![
            stable::CATEGORY.into(),
            stable::REASON_FUTURE.into(),
            stable::SCORE_FUTURE.into(),
            "Unnamed: 5".into(),
        ]);
        t.push_row(vec![
            Value::text("小売"),
            Value::text("好調"),
            Value::Float(0.75),
            Value::Null,
        ]);
        t.push_row(vec![Value::text("小売"), Value::Null, Value::Null, Value::Null]);
        t
    }

    #[test]
    fn outlook_reason_moves_into_comments() -> Result<()> {
        let t = clean_table(outlook_table(), Pattern::Outlook, Region::All)?;
        assert_eq!(t.get(0, stable::COMMENTS), Some(&Value::text("好調")));
        assert_eq!(t.get(1, stable::COMMENTS), Some(&Value::text("")));
        assert_eq!(t.get(0, stable::REASON), Some(&Value::text("")));
        assert!(!t.has_column(stable::REASON_FUTURE));
        assert!(!t.has_column(stable::SCORE_FUTURE));
        assert!(!t.has_column("Unnamed: 5"));
        Ok(())
    }

    #[test]
    fn missing_score_defaults_to_one() -> Result<()> {
        let t = clean_table(outlook_table(), Pattern::Outlook, Region::All)?;
        assert_eq!(t.get(0, stable::SCORE), Some(&Value::Float(0.75)));
        assert_eq!(t.get(1, stable::SCORE), Some(&Value::Float(DEFAULT_SCORE)));
        Ok(())
    }

    #[test]
    fn current_keeps_reason_and_comments_apart() -> Result<()> {
        let mut t = Table::new(vec![
            stable::REASON.into(),
            stable::COMMENTS.into(),
            stable::SCORE_CURRENT.into(),
        ]);
        t.push_row(vec![
            Value::text("来客数の動き"),
            Value::text("客数は前年並み。"),
            Value::Float(0.5),
        ]);
        let all = clean_table(t.clone(), Pattern::Current, Region::All)?;
        assert_eq!(all.get(0, stable::REASON), Some(&Value::text("来客数の動き")));
        assert_eq!(all.get(0, stable::COMMENTS), Some(&Value::text("客数は前年並み。")));
        assert_eq!(all.get(0, stable::SCORE), Some(&Value::Float(0.5)));
        assert!(!all.has_column(stable::SCORE_CURRENT));

        let kosh = clean_table(t, Pattern::Current, Region::Koshinetsu)?;
        assert_eq!(kosh.get(0, stable::REASON), Some(&Value::text("")));
        Ok(())
    }

    #[test]
    fn merge_fills_absent_columns_with_null() -> Result<()> {
        let outlook = clean_table(outlook_table(), Pattern::Outlook, Region::All)?;
        let mut current = Table::new(vec![stable::PREF.into(), stable::SCORE_CURRENT.into()]);
        current.push_row(vec![Value::text("東京都"), Value::Float(0.25)]);
        let current = clean_table(current, Pattern::Current, Region::All)?;

        let merged = merge_tables(vec![outlook, current]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(0, stable::PREF), Some(&Value::Null));
        assert_eq!(merged.get(2, stable::CATEGORY), Some(&Value::Null));
        assert_eq!(merged.get(2, stable::SCORE), Some(&Value::Float(0.25)));
        Ok(())
    }
}
