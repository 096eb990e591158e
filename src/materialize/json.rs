use serde_json::{Map, Value};

use super::binding::{
    BindScope, BindingCardinality, Entity, Keyed, RelationBinding, rebuild_children,
};
use crate::error::SqlMutationError;
use crate::results::Record;
use crate::types::RowValues;

/// Convert a column value to JSON (timestamps become ISO-8601 strings).
///
/// # Errors
/// Returns `Materialize` if the value cannot be represented as JSON.
pub fn row_to_json(value: &RowValues) -> Result<Value, SqlMutationError> {
    serde_json::to_value(value).map_err(|e| SqlMutationError::Materialize(e.to_string()))
}

#[must_use]
pub fn json_to_row(value: &Value) -> RowValues {
    match value {
        Value::Null => RowValues::Null,
        Value::Bool(b) => RowValues::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => RowValues::Int(i),
            None => n.as_f64().map_or(RowValues::Null, RowValues::Float),
        },
        Value::String(s) => RowValues::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => RowValues::JSON(value.clone()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn record_into(map: &mut Map<String, Value>, record: &Record) -> Result<(), SqlMutationError> {
    for (column, value) in record.iter() {
        map.insert(column.to_string(), row_to_json(value)?);
    }
    Ok(())
}

impl Keyed for Value {
    fn key_value(&self, column: &str) -> Option<RowValues> {
        self.as_object()?.get(column).map(json_to_row)
    }

    fn check_shape(&self) -> Result<(), SqlMutationError> {
        if self.is_object() {
            Ok(())
        } else {
            Err(SqlMutationError::Materialize(format!(
                "destination must be an object, found {}",
                kind(self)
            )))
        }
    }
}

impl Entity for Value {
    fn merge_record(&mut self, record: &Record) -> Result<(), SqlMutationError> {
        if self.is_null() {
            *self = Value::Object(Map::new());
        }
        match self {
            Value::Object(map) => record_into(map, record),
            other => Err(SqlMutationError::Materialize(format!(
                "cannot merge a record into a {}",
                kind(other)
            ))),
        }
    }
}

/// Destination for a list of dynamic objects.
///
/// # Errors
/// `Materialize` when `dest` is not an array of objects.
pub(crate) fn objects_mut(dest: &mut Value) -> Result<&mut Vec<Value>, SqlMutationError> {
    match dest {
        Value::Array(items) => {
            if let Some(bad) = items.iter().find(|item| !item.is_object()) {
                return Err(SqlMutationError::Materialize(format!(
                    "destination array must hold objects, found {}",
                    kind(bad)
                )));
            }
            Ok(items)
        }
        other => Err(SqlMutationError::Materialize(format!(
            "destination must be an array of objects, found {}",
            kind(other)
        ))),
    }
}

impl RelationBinding<Value> {
    /// Object-valued attribute of a dynamic destination.
    pub fn json_one(attribute: impl Into<String>) -> Self {
        Self::from_fn(
            attribute,
            BindingCardinality::One,
            Box::new(
                |parent: &mut Value, matches: &[&Record], scope: &BindScope<'_>| {
                    let Some(record) = matches.first() else {
                        return Ok(());
                    };
                    let map = parent.as_object_mut().ok_or_else(|| {
                        SqlMutationError::Materialize("destination must be an object".into())
                    })?;
                    let slot = map
                        .entry(scope.attribute.to_string())
                        .or_insert(Value::Null);
                    if !(slot.is_null() || slot.is_object()) {
                        return Err(SqlMutationError::Materialize(format!(
                            "attribute `{}` holds a {}, expected object",
                            scope.attribute,
                            kind(slot)
                        )));
                    }
                    slot.merge_record(record)
                },
            ),
        )
    }

    /// Array-valued attribute of a dynamic destination.
    pub fn json_many(attribute: impl Into<String>) -> Self {
        Self::from_fn(
            attribute,
            BindingCardinality::Many,
            Box::new(
                |parent: &mut Value, matches: &[&Record], scope: &BindScope<'_>| {
                    let map = parent.as_object_mut().ok_or_else(|| {
                        SqlMutationError::Materialize("destination must be an object".into())
                    })?;
                    let slot = map
                        .entry(scope.attribute.to_string())
                        .or_insert(Value::Null);
                    if slot.is_null() {
                        let mut fresh = Vec::new();
                        rebuild_children(&mut fresh, matches, scope.identity)?;
                        *slot = Value::Array(fresh);
                        Ok(())
                    } else if slot.is_array() {
                        let existing = objects_mut(slot).map_err(|_| {
                            SqlMutationError::Materialize(format!(
                                "attribute `{}` must be an array of objects",
                                scope.attribute
                            ))
                        })?;
                        rebuild_children(existing, matches, scope.identity)
                    } else {
                        Err(SqlMutationError::Materialize(format!(
                            "attribute `{}` holds a {}, expected array",
                            scope.attribute,
                            kind(slot)
                        )))
                    }
                },
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_keeps_columns_the_record_lacks() {
        let mut user = json!({"id": 1, "nickname": "kept"});
        let record = Record::from_pairs([("id", RowValues::Int(1)), ("name", "ann".into())]);
        user.merge_record(&record).unwrap();
        assert_eq!(user, json!({"id": 1, "nickname": "kept", "name": "ann"}));
    }

    #[test]
    fn scalars_are_not_destinations() {
        let record = Record::from_pairs([("id", 1)]);
        let err = json!(5).merge_record(&record).unwrap_err();
        assert!(err.to_string().contains("number"));
        assert!(json!("x").check_shape().is_err());
    }

    #[test]
    fn numbers_convert_both_ways() {
        assert_eq!(json_to_row(&json!(3)), RowValues::Int(3));
        assert_eq!(json_to_row(&json!(1.5)), RowValues::Float(1.5));
        assert_eq!(row_to_json(&RowValues::Int(9)).unwrap(), json!(9));
        assert_eq!(row_to_json(&RowValues::Null).unwrap(), Value::Null);
    }
}
