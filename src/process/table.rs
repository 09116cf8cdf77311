// src/process/table.rs
use anyhow::{bail, Result};
use std::collections::HashMap;

/// A single cell. Transforms only ever act on `Text`; `Null` and `Float`
/// pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Float(f64),
}

impl Value {
    /// Empty source cells are nulls, like a CSV reader would load them.
    pub fn from_field(s: &str) -> Self {
        if s.is_empty() {
            Value::Null
        } else {
            Value::Text(s.to_string())
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Stringified form used for payload capture and persistence.
    pub fn to_opt_string(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            Value::Float(f) => Some(f.to_string()),
        }
    }
}

/// Owned table: named-column index over an arena of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self {
            columns,
            index,
            rows: Vec::new(),
        }
    }

    /// Push a row, padding with nulls or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<usize> {
        match self.column_index(name) {
            Some(i) => Ok(i),
            None => bail!("missing expected column `{}`", name),
        }
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All values of one column, top to bottom.
    #[cfg(test)]
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.require(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Append a column filled with `fill`, or overwrite it if it already exists.
    pub fn set_constant(&mut self, name: &str, fill: Value) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = fill.clone();
                }
            }
            None => {
                self.index.insert(name.to_string(), self.columns.len());
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(fill.clone());
                }
            }
        }
    }

    /// Replace (or append) a whole column.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            bail!(
                "column `{}` has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            );
        }
        if !self.has_column(name) {
            self.set_constant(name, Value::Null);
        }
        let idx = self.require(name)?;
        for (row, v) in self.rows.iter_mut().zip(values) {
            row[idx] = v;
        }
        Ok(())
    }

    /// Write `dst` from a per-row function of `src`. `dst` is created when absent.
    pub fn derive_column<F>(&mut self, src: &str, dst: &str, f: F) -> Result<()>
    where
        F: Fn(&Value) -> Value,
    {
        let s = self.require(src)?;
        if !self.has_column(dst) {
            self.set_constant(dst, Value::Null);
        }
        let d = self.require(dst)?;
        for row in &mut self.rows {
            let next = f(&row[s]);
            row[d] = next;
        }
        Ok(())
    }

    /// Map the text cells of a column in place; non-text cells are left as they are.
    pub fn map_text<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&str) -> Value,
    {
        let idx = self.require(name)?;
        for row in &mut self.rows {
            let next = match &row[idx] {
                Value::Text(s) => f(s),
                _ => continue,
            };
            row[idx] = next;
        }
        Ok(())
    }

    /// Map the text cells of every column.
    pub fn map_all_text<F>(&mut self, f: F)
    where
        F: Fn(&str) -> Value,
    {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                let next = match &*cell {
                    Value::Text(s) => f(s),
                    _ => continue,
                };
                *cell = next;
            }
        }
    }

    /// Replace every null with the nearest preceding non-null value of the column.
    pub fn fill_forward(&mut self, name: &str) -> Result<()> {
        let idx = self.require(name)?;
        let mut last: Option<Value> = None;
        for row in &mut self.rows {
            if row[idx].is_null() {
                if let Some(v) = &last {
                    row[idx] = v.clone();
                }
            } else {
                last = Some(row[idx].clone());
            }
        }
        Ok(())
    }

    /// Keep only the rows whose `name` cell satisfies `keep`.
    pub fn retain_by<F>(&mut self, name: &str, keep: F) -> Result<()>
    where
        F: Fn(&Value) -> bool,
    {
        let idx = self.require(name)?;
        self.rows.retain(|r| keep(&r[idx]));
        Ok(())
    }

    /// Keep rows with at least `thresh` non-null cells.
    pub fn drop_sparse_rows(&mut self, thresh: usize) {
        self.rows
            .retain(|r| r.iter().filter(|v| !v.is_null()).count() >= thresh);
    }

    /// Keep rows for which `keep` returns true, given the row index and cells.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &[Value]) -> bool,
    {
        let mut i = 0;
        self.rows.retain(|r| {
            let k = keep(i, r);
            i += 1;
            k
        });
    }

    pub fn drop_column(&mut self, name: &str) {
        let Some(idx) = self.column_index(name) else {
            return;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        self.reindex();
    }

    pub fn drop_columns_where<F>(&mut self, pred: F)
    where
        F: Fn(&str) -> bool,
    {
        let doomed: Vec<String> = self
            .columns
            .iter()
            .filter(|c| pred(c))
            .cloned()
            .collect();
        for c in doomed {
            self.drop_column(&c);
        }
    }

    /// Rename columns present in `map`; others keep their names.
    pub fn rename<'a, I>(&mut self, map: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let map: HashMap<&str, &str> = map.into_iter().collect();
        for col in &mut self.columns {
            if let Some(new) = map.get(col.as_str()) {
                *col = new.to_string();
            }
        }
        self.reindex();
    }

    /// Move `name` to the first position.
    pub fn move_to_front(&mut self, name: &str) {
        let Some(idx) = self.column_index(name) else {
            return;
        };
        let col = self.columns.remove(idx);
        self.columns.insert(0, col);
        for row in &mut self.rows {
            let v = row.remove(idx);
            row.insert(0, v);
        }
        self.reindex();
    }

    /// Stack tables vertically on the union of their columns, in order of
    /// first appearance. Columns a table lacks become nulls.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for t in &tables {
            for c in &t.columns {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }
        let mut out = Table::new(columns);
        for t in tables {
            let positions: Vec<Option<usize>> =
                out.columns.iter().map(|c| t.column_index(c)).collect();
            for row in t.rows {
                let aligned = positions
                    .iter()
                    .map(|p| p.map(|i| row[i].clone()).unwrap_or(Value::Null))
                    .collect();
                out.rows.push(aligned);
            }
        }
        out
    }

    fn reindex(&mut self) {
        self.index = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(values: &[Option<&str>]) -> Table {
        let mut t = Table::new(vec!["c".into()]);
        for v in values {
            t.push_row(vec![v.map(Value::text).unwrap_or(Value::Null)]);
        }
        t
    }

    #[test]
    fn fill_forward_inherits_previous_value() -> Result<()> {
        let mut t = single(&[Some("A"), None, None, Some("B"), None]);
        t.fill_forward("c")?;
        let got: Vec<_> = t.column("c")?.into_iter().cloned().collect();
        assert_eq!(
            got,
            vec![
                Value::text("A"),
                Value::text("A"),
                Value::text("A"),
                Value::text("B"),
                Value::text("B")
            ]
        );
        Ok(())
    }

    #[test]
    fn fill_forward_keeps_leading_nulls() -> Result<()> {
        let mut t = single(&[None, Some("A")]);
        t.fill_forward("c")?;
        assert_eq!(t.get(0, "c"), Some(&Value::Null));
        Ok(())
    }

    #[test]
    fn map_text_skips_nulls_and_floats() -> Result<()> {
        let mut t = Table::new(vec!["c".into()]);
        t.push_row(vec![Value::Null]);
        t.push_row(vec![Value::Float(0.5)]);
        t.push_row(vec![Value::text("x")]);
        t.map_text("c", |s| Value::text(s.to_uppercase()))?;
        assert_eq!(t.get(0, "c"), Some(&Value::Null));
        assert_eq!(t.get(1, "c"), Some(&Value::Float(0.5)));
        assert_eq!(t.get(2, "c"), Some(&Value::text("X")));
        Ok(())
    }

    #[test]
    fn concat_aligns_missing_columns_as_null() {
        let mut a = Table::new(vec!["x".into(), "y".into()]);
        a.push_row(vec![Value::text("1"), Value::text("2")]);
        let mut b = Table::new(vec!["y".into(), "z".into()]);
        b.push_row(vec![Value::text("3"), Value::text("4")]);

        let t = Table::concat(vec![a, b]);
        assert_eq!(t.columns(), &["x", "y", "z"]);
        assert_eq!(t.get(0, "z"), Some(&Value::Null));
        assert_eq!(t.get(1, "x"), Some(&Value::Null));
        assert_eq!(t.get(1, "y"), Some(&Value::text("3")));
    }

    #[test]
    fn drop_sparse_rows_counts_non_null_cells() {
        let mut t = Table::new(vec!["a".into(), "b".into(), "c".into()]);
        t.push_row(vec![Value::text("1"), Value::Null, Value::Null]);
        t.push_row(vec![Value::text("1"), Value::Float(1.0), Value::Null]);
        t.drop_sparse_rows(2);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn missing_column_is_an_error() {
        let mut t = single(&[Some("A")]);
        assert!(t.fill_forward("nope").is_err());
    }

    #[test]
    fn rename_and_move_keep_index_consistent() {
        let mut t = Table::new(vec!["a".into(), "b".into()]);
        t.push_row(vec![Value::text("1"), Value::text("2")]);
        t.rename([("b", "bee")]);
        t.move_to_front("bee");
        assert_eq!(t.columns(), &["bee", "a"]);
        assert_eq!(t.get(0, "bee"), Some(&Value::text("2")));
    }
}
