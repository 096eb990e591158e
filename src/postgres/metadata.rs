use crate::error::SqlMutationError;
use crate::link::{Link, TableField};
use crate::types::RowValues;

const TABLE_FIELDS_SQL: &str = "SELECT a.attname::text AS name, \
       format_type(a.atttypid, a.atttypmod) AS type_name, \
       a.attnum::int8 AS ordinal, \
       COALESCE(a.attnum = ANY(i.indkey), false) AS primary_key \
  FROM pg_attribute a \
  LEFT JOIN pg_index i ON i.indrelid = a.attrelid AND i.indisprimary \
 WHERE a.attrelid = to_regclass($1) AND a.attnum > 0 AND NOT a.attisdropped \
 ORDER BY a.attnum";

/// Column metadata from the system catalog; `table` may be schema-qualified.
///
/// # Errors
/// `NotFound` when the table does not resolve, otherwise driver errors.
pub async fn table_fields(
    link: &dyn Link,
    table: &str,
) -> Result<Vec<TableField>, SqlMutationError> {
    let records = link
        .query(TABLE_FIELDS_SQL, &[RowValues::Text(table.to_owned())])
        .await?;
    if records.is_empty() {
        return Err(SqlMutationError::NotFound(format!("table `{table}`")));
    }
    let mut fields = Vec::with_capacity(records.len());
    for row in &records {
        let name = row.get("name").and_then(|v| v.as_text()).ok_or_else(|| {
            SqlMutationError::ExecutionError("catalog row without a column name".into())
        })?;
        fields.push(TableField {
            name: name.to_owned(),
            type_name: row
                .get("type_name")
                .and_then(|v| v.as_text())
                .unwrap_or_default()
                .to_owned(),
            primary_key: row
                .get("primary_key")
                .and_then(|v| v.as_bool())
                .is_some_and(|pk| *pk),
            ordinal: row
                .get("ordinal")
                .and_then(|v| v.as_int())
                .and_then(|n| usize::try_from(*n).ok())
                .unwrap_or_default(),
        });
    }
    Ok(fields)
}
