use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// A single row returned by the database.
///
/// Column names are case-preserving and shared (behind an `Arc`) by every row of the
/// [`RecordSet`](super::RecordSet) that produced the row, together with a name → index map
/// for constant-time lookups. Records are never mutated after construction.
#[derive(Debug, Clone)]
pub struct Record {
    column_names: Arc<Vec<String>>,
    values: Vec<RowValues>,
    column_index: Arc<HashMap<String, usize>>,
}

impl Record {
    /// Create a standalone record.
    ///
    /// Missing trailing values are padded with `Null` so every column resolves.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let index = Arc::new(build_index(&column_names));
        Self::with_index(column_names, index, values)
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        mut values: Vec<RowValues>,
    ) -> Self {
        if values.len() < column_names.len() {
            values.resize(column_names.len(), RowValues::Null);
        }
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Convenience constructor from `(column, value)` pairs, mostly for tests and mocks.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RowValues>,
    {
        let (names, values): (Vec<String>, Vec<RowValues>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(Arc::new(names), values)
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index.get(column_name) {
            return Some(idx);
        }
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value by column name; `None` when the column is absent (a present SQL NULL is
    /// `Some(&RowValues::Null)`).
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Case-insensitive lookup, used when matching correlation keys against drivers that fold
    /// identifier case (DaMeng, Oracle upper-case unquoted names).
    #[must_use]
    pub fn get_ignore_case(&self, column_name: &str) -> Option<&RowValues> {
        self.get(column_name).or_else(|| {
            self.column_names
                .iter()
                .position(|col| col.eq_ignore_ascii_case(column_name))
                .and_then(|idx| self.values.get(idx))
        })
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn contains(&self, column_name: &str) -> bool {
        self.get_column_index(column_name).is_some()
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::ops::Index<&str> for Record {
    type Output = RowValues;

    /// Panics when the column is absent; use [`Record::get`] for fallible access.
    fn index(&self, column_name: &str) -> &Self::Output {
        match self.get(column_name) {
            Some(value) => value,
            None => panic!("column `{column_name}` not present in record"),
        }
    }
}

pub(crate) fn build_index(column_names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        // first occurrence wins for duplicated names (e.g. `OLD.id` and `NEW.id` both as `id`)
        index.entry(name.clone()).or_insert(i);
    }
    index
}
