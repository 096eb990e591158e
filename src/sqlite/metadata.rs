use crate::error::SqlMutationError;
use crate::link::{Link, TableField};

/// Column metadata from `PRAGMA table_info`.
///
/// # Errors
/// `NotFound` when the table does not exist, otherwise driver errors.
pub async fn table_fields(
    link: &dyn Link,
    table: &str,
) -> Result<Vec<TableField>, SqlMutationError> {
    let sql = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
    let records = link.query(&sql, &[]).await?;
    if records.is_empty() {
        return Err(SqlMutationError::NotFound(format!("table `{table}`")));
    }
    records
        .iter()
        .map(|row| {
            let name = row
                .get("name")
                .and_then(|v| v.as_text())
                .ok_or_else(|| {
                    SqlMutationError::ExecutionError("table_info row without a name".into())
                })?
                .to_owned();
            Ok(TableField {
                name,
                type_name: row
                    .get("type")
                    .and_then(|v| v.as_text())
                    .unwrap_or_default()
                    .to_owned(),
                primary_key: row.get("pk").and_then(|v| v.as_int()).is_some_and(|pk| *pk > 0),
                ordinal: row
                    .get("cid")
                    .and_then(|v| v.as_int())
                    .and_then(|cid| usize::try_from(*cid).ok())
                    .unwrap_or_default(),
            })
        })
        .collect()
}
