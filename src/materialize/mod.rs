//! Binding flat record sets onto caller-owned object graphs.
//!
//! Destinations are mutated in place. Elements already present are located by identity and
//! updated, so attributes filled by an earlier call survive a later call that binds something
//! else. When two calls write the same attribute, columns present in the later record win and
//! columns it lacks are kept.

mod binding;
mod json;

use std::collections::HashMap;

use serde_json::Value;
use tracing::trace;

pub use binding::{BindingCardinality, CorrelationKeys, Entity, Keyed, RelationBinding};
pub use json::{json_to_row, row_to_json};

use binding::{BindScope, identity_key};
use crate::error::SqlMutationError;
use crate::results::{Record, RecordSet};

/// Binds one [`RecordSet`] onto destinations.
#[derive(Debug, Clone, Copy)]
pub struct Materializer<'r> {
    records: &'r RecordSet,
}

impl<'r> Materializer<'r> {
    #[must_use]
    pub fn new(records: &'r RecordSet) -> Self {
        Self { records }
    }

    /// Scan every record into a fresh `Vec`.
    ///
    /// # Errors
    /// Propagates `merge_record` failures.
    pub fn scan<T: Entity>(&self) -> Result<Vec<T>, SqlMutationError> {
        self.records
            .iter()
            .map(|record| {
                let mut item = T::default();
                item.merge_record(record)?;
                Ok(item)
            })
            .collect()
    }

    /// Merge the first record into `dest`; returns `false` when there are no records.
    ///
    /// # Errors
    /// Propagates `check_shape` and `merge_record` failures.
    pub fn scan_one<T: Entity>(&self, dest: &mut T) -> Result<bool, SqlMutationError> {
        match self.records.first() {
            Some(record) => {
                dest.check_shape()?;
                dest.merge_record(record)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Scan into an existing list, updating elements whose `identity` column matches a record
    /// and appending the rest in record order.
    ///
    /// # Errors
    /// Propagates `check_shape` and `merge_record` failures.
    pub fn scan_into<T: Entity>(
        &self,
        dest: &mut Vec<T>,
        identity: &str,
    ) -> Result<(), SqlMutationError> {
        for item in dest.iter() {
            item.check_shape()?;
        }
        for record in self.records {
            let wanted = record.get(identity).and_then(|v| v.correlation_key());
            let existing = wanted.as_ref().and_then(|wanted| {
                dest.iter()
                    .position(|item| identity_key(item, identity).as_ref() == Some(wanted))
            });
            match existing {
                Some(idx) => dest[idx].merge_record(record)?,
                None => {
                    let mut item = T::default();
                    item.merge_record(record)?;
                    dest.push(item);
                }
            }
        }
        Ok(())
    }

    /// Populate `binding`'s attribute on every element of `dest` from correlated records.
    ///
    /// Unmatched elements keep their current value (`one`) or get an empty list (`many`).
    ///
    /// # Errors
    /// `Materialize` when a `many` binding has no correlation keys, when the records lack the
    /// child correlation column, or when a destination has the wrong shape.
    pub fn bind<P: Keyed>(
        &self,
        dest: &mut [P],
        binding: &RelationBinding<P>,
    ) -> Result<(), SqlMutationError> {
        let keys = match (&binding.keys, binding.cardinality) {
            (Some(keys), _) => keys.clone(),
            (None, BindingCardinality::Many) => {
                return Err(SqlMutationError::Materialize(format!(
                    "binding `{}` is a many relation and needs correlation keys",
                    binding.attribute
                )));
            }
            (None, BindingCardinality::One) => {
                CorrelationKeys::new(binding.identity.clone(), binding.identity.clone())
            }
        };

        if self
            .records
            .column_names()
            .is_some_and(|names| !names.is_empty())
            && !self.records.has_column(&keys.child)
        {
            return Err(SqlMutationError::Materialize(format!(
                "binding `{}`: related records have no column `{}`",
                binding.attribute, keys.child
            )));
        }

        let index = self.index_by(&keys.child);
        let scope = BindScope {
            attribute: &binding.attribute,
            identity: &binding.identity,
        };
        let mut matched = 0usize;
        for item in dest.iter_mut() {
            item.check_shape()?;
            let matches: &[&Record] = item
                .key_value(&keys.parent)
                .and_then(|value| value.correlation_key())
                .and_then(|key| index.get(&key))
                .map_or(&[][..], Vec::as_slice);
            if !matches.is_empty() {
                matched += 1;
            }
            (binding.bind)(item, matches, &scope)?;
        }
        trace!(
            attribute = scope.attribute,
            elements = dest.len(),
            matched,
            "relation bound"
        );
        Ok(())
    }

    /// [`bind`](Self::bind) for a single destination element.
    ///
    /// # Errors
    /// See [`bind`](Self::bind).
    pub fn bind_one<P: Keyed>(
        &self,
        dest: &mut P,
        binding: &RelationBinding<P>,
    ) -> Result<(), SqlMutationError> {
        self.bind(std::slice::from_mut(dest), binding)
    }

    /// Bind onto a dynamic graph: either one object or an array of objects.
    ///
    /// # Errors
    /// `Materialize` for any other shape, plus everything [`bind`](Self::bind) reports.
    pub fn bind_json(
        &self,
        dest: &mut Value,
        binding: &RelationBinding<Value>,
    ) -> Result<(), SqlMutationError> {
        if dest.is_array() {
            self.bind(json::objects_mut(dest)?, binding)
        } else {
            self.bind_one(dest, binding)
        }
    }

    /// [`scan_into`](Self::scan_into) for a dynamic array; `null` becomes an empty array first.
    ///
    /// # Errors
    /// `Materialize` when `dest` is neither `null` nor an array of objects.
    pub fn scan_json(&self, dest: &mut Value, identity: &str) -> Result<(), SqlMutationError> {
        if dest.is_null() {
            *dest = Value::Array(Vec::new());
        }
        self.scan_into(json::objects_mut(dest)?, identity)
    }

    fn index_by(&self, column: &str) -> HashMap<String, Vec<&'r Record>> {
        let mut index: HashMap<String, Vec<&'r Record>> = HashMap::new();
        for record in self.records {
            if let Some(key) = record.get(column).and_then(|v| v.correlation_key()) {
                index.entry(key).or_default().push(record);
            }
        }
        index
    }
}
