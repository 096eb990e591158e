use std::collections::HashMap;
use std::sync::Arc;

use super::row::{Record, build_index};
use crate::types::RowValues;

/// An ordered sequence of [`Record`]s sharing one column layout.
///
/// Row order is the order the database returned the rows in; for multi-row INSERT with a
/// returning clause that is input order.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
    column_names: Option<Arc<Vec<String>>>,
    column_index: Option<Arc<HashMap<String, usize>>>,
}

impl RecordSet {
    /// Create a new record set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> RecordSet {
        RecordSet {
            records: Vec::with_capacity(capacity),
            column_names: None,
            column_index: None,
        }
    }

    /// Empty record set with a known column layout.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>) -> RecordSet {
        let mut set = RecordSet::default();
        set.set_column_names(Arc::new(column_names));
        set
    }

    /// Set the column names shared by all rows added after this call.
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index = Some(Arc::new(build_index(&column_names)));
        self.column_names = Some(column_names);
    }

    #[must_use]
    pub fn column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Append one row of values in column order.
    ///
    /// Rows pushed before any column names are set get an empty layout; drivers always set the
    /// layout from statement metadata first.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        let (names, index) = match (&self.column_names, &self.column_index) {
            (Some(names), Some(index)) => (names.clone(), index.clone()),
            _ => {
                let names: Arc<Vec<String>> = Arc::new(Vec::new());
                let index = Arc::new(HashMap::new());
                self.column_names = Some(names.clone());
                self.column_index = Some(index.clone());
                (names, index)
            }
        };
        self.records
            .push(Record::with_index(names, index, row_values));
    }

    /// Append an already-built record.
    pub fn add_record(&mut self, record: Record) {
        if self.column_names.is_none() {
            let names = Arc::new(record.column_names().to_vec());
            self.set_column_names(names);
        }
        self.records.push(record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    #[must_use]
    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Record> {
        self.records
    }

    /// True when the layout carries `column` (checked without any rows present).
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names
            .as_ref()
            .is_some_and(|names| names.iter().any(|n| n == column))
            || self.records.first().is_some_and(|r| r.contains(column))
    }
}

impl std::ops::Index<usize> for RecordSet {
    type Output = Record;

    fn index(&self, index: usize) -> &Self::Output {
        &self.records[index]
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut set = RecordSet::default();
        for record in iter {
            set.add_record(record);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_layout_and_resolve_by_name() {
        let mut set = RecordSet::with_columns(vec!["id".into(), "name".into()]);
        set.add_row_values(vec![RowValues::Int(1), RowValues::Text("a".into())]);
        set.add_row_values(vec![RowValues::Int(2)]);

        assert_eq!(set.len(), 2);
        assert_eq!(set[0]["name"], RowValues::Text("a".into()));
        // short rows are padded
        assert_eq!(set[1].get("name"), Some(&RowValues::Null));
        assert_eq!(set[1].get("missing"), None);
        assert!(set.has_column("id"));
    }
}
