use super::{Binder, Rendered, push_output, push_trailing};
use crate::dialect::{Clause, Dialect};
use crate::error::{NotSupported, SqlMutationError};
use crate::options::InsertOption;
use crate::types::RowValues;

/// Single or multi-row INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RowValues>>,
}

impl InsertStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn row(mut self, values: Vec<RowValues>) -> Self {
        self.rows.push(values);
        self
    }

    pub(super) fn render(
        &self,
        dialect: Dialect,
        option: &InsertOption,
        clause: Option<&Clause>,
    ) -> Result<Rendered, SqlMutationError> {
        if self.columns.is_empty() {
            return Err(SqlMutationError::ParameterError(format!(
                "insert into {} has no columns",
                self.table
            )));
        }
        if self.rows.is_empty() {
            return Err(SqlMutationError::ParameterError(format!(
                "insert into {} has no rows",
                self.table
            )));
        }
        if let Some((idx, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.columns.len())
        {
            return Err(SqlMutationError::ParameterError(format!(
                "row {idx} has {} values for {} columns",
                row.len(),
                self.columns.len()
            )));
        }

        let mut binder = Binder::new(dialect);
        let (verb, conflict) = conflict_handling(&binder, option, &self.columns)?;

        let columns = self
            .columns
            .iter()
            .map(|c| binder.quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("{verb} {} ({columns})", binder.quote(&self.table));
        push_output(&mut sql, clause);

        let tuples = self
            .rows
            .iter()
            .map(|row| {
                let placeholders = row
                    .iter()
                    .map(|v| binder.bind(v.clone()))
                    .collect::<Vec<_>>();
                format!("({})", placeholders.join(", "))
            })
            .collect::<Vec<_>>();
        sql.push_str(" VALUES ");
        sql.push_str(&tuples.join(", "));

        if let Some(conflict) = conflict {
            sql.push(' ');
            sql.push_str(&conflict);
        }
        push_trailing(&mut sql, clause);
        Ok(binder.finish(sql))
    }
}

/// Statement verb plus an optional trailing conflict clause.
fn conflict_handling(
    binder: &Binder,
    option: &InsertOption,
    columns: &[String],
) -> Result<(&'static str, Option<String>), SqlMutationError> {
    let dialect = binder.dialect();
    let unsupported = |variant: &str| -> SqlMutationError {
        NotSupported::new(dialect, format!("insert option {variant}")).into()
    };
    match option {
        InsertOption::Default => Ok(("INSERT INTO", None)),
        InsertOption::Ignore => match dialect {
            Dialect::Sqlite => Ok(("INSERT OR IGNORE INTO", None)),
            Dialect::MySql | Dialect::MariaDb => Ok(("INSERT IGNORE INTO", None)),
            Dialect::Postgres => Ok(("INSERT INTO", Some("ON CONFLICT DO NOTHING".to_string()))),
            _ => Err(unsupported("Ignore")),
        },
        InsertOption::Replace => match dialect {
            Dialect::Sqlite | Dialect::MySql | Dialect::MariaDb => Ok(("REPLACE INTO", None)),
            _ => Err(unsupported("Replace")),
        },
        InsertOption::Save { conflict_columns } => {
            let updated = columns
                .iter()
                .filter(|c| !conflict_columns.contains(*c))
                .collect::<Vec<_>>();
            match dialect {
                Dialect::Postgres | Dialect::Sqlite => {
                    if conflict_columns.is_empty() {
                        return Err(SqlMutationError::ParameterError(
                            "save requires at least one conflict column".into(),
                        ));
                    }
                    let target = conflict_columns
                        .iter()
                        .map(|c| binder.quote(c))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let excluded = if dialect == Dialect::Postgres {
                        "EXCLUDED"
                    } else {
                        "excluded"
                    };
                    let action = if updated.is_empty() {
                        "DO NOTHING".to_string()
                    } else {
                        let sets = updated
                            .iter()
                            .map(|c| {
                                let c = binder.quote(c);
                                format!("{c} = {excluded}.{c}")
                            })
                            .collect::<Vec<_>>()
                            .join(", ");
                        format!("DO UPDATE SET {sets}")
                    };
                    Ok(("INSERT INTO", Some(format!("ON CONFLICT ({target}) {action}"))))
                }
                Dialect::MySql | Dialect::MariaDb => {
                    // MySQL needs at least one assignment; a self-assignment is a no-op update
                    let sets = if updated.is_empty() {
                        columns
                            .first()
                            .map(|c| {
                                let c = binder.quote(c);
                                format!("{c} = {c}")
                            })
                            .unwrap_or_default()
                    } else {
                        updated
                            .iter()
                            .map(|c| {
                                let c = binder.quote(c);
                                format!("{c} = VALUES({c})")
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    };
                    Ok((
                        "INSERT INTO",
                        Some(format!("ON DUPLICATE KEY UPDATE {sets}")),
                    ))
                }
                _ => Err(unsupported("Save")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Placement;

    fn people() -> InsertStatement {
        InsertStatement::new("people")
            .columns(["id", "name"])
            .row(vec![RowValues::Int(1), RowValues::Text("ann".into())])
            .row(vec![RowValues::Int(2), RowValues::Text("bob".into())])
    }

    #[test]
    fn multi_row_insert_with_trailing_returning() {
        let clause = Clause {
            text: "RETURNING `id`".into(),
            placement: Placement::Trailing,
        };
        let rendered = people()
            .render(Dialect::Sqlite, &InsertOption::Default, Some(&clause))
            .unwrap();
        assert_eq!(
            rendered.sql,
            "INSERT INTO `people` (`id`, `name`) VALUES (?1, ?2), (?3, ?4) RETURNING `id`"
        );
        assert_eq!(rendered.params.len(), 4);
    }

    #[test]
    fn output_clause_sits_before_values() {
        let clause = Clause {
            text: "OUTPUT INSERTED.[id]".into(),
            placement: Placement::Output,
        };
        let rendered = people()
            .render(Dialect::Mssql, &InsertOption::Default, Some(&clause))
            .unwrap();
        assert_eq!(
            rendered.sql,
            "INSERT INTO [people] ([id], [name]) OUTPUT INSERTED.[id] VALUES (@P1, @P2), (@P3, @P4)"
        );
    }

    #[test]
    fn upsert_per_dialect() {
        let save = InsertOption::Save {
            conflict_columns: vec!["id".into()],
        };
        let clause = Clause {
            text: r#"RETURNING "id""#.into(),
            placement: Placement::Trailing,
        };
        let pg = people()
            .render(Dialect::Postgres, &save, Some(&clause))
            .unwrap();
        assert_eq!(
            pg.sql,
            r#"INSERT INTO "people" ("id", "name") VALUES ($1, $2), ($3, $4) ON CONFLICT ("id") DO UPDATE SET "name" = EXCLUDED."name" RETURNING "id""#
        );
        let maria = people().render(Dialect::MariaDb, &save, None).unwrap();
        assert!(maria
            .sql
            .ends_with("ON DUPLICATE KEY UPDATE `name` = VALUES(`name`)"));
    }

    #[test]
    fn ignore_and_replace_verbs() {
        let sqlite = people()
            .render(Dialect::Sqlite, &InsertOption::Ignore, None)
            .unwrap();
        assert!(sqlite.sql.starts_with("INSERT OR IGNORE INTO"));
        let pg = people()
            .render(Dialect::Postgres, &InsertOption::Ignore, None)
            .unwrap();
        assert!(pg.sql.ends_with("ON CONFLICT DO NOTHING"));
        let mysql = people()
            .render(Dialect::MySql, &InsertOption::Replace, None)
            .unwrap();
        assert!(mysql.sql.starts_with("REPLACE INTO `people`"));
        let err = people()
            .render(Dialect::Postgres, &InsertOption::Replace, None)
            .unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let stmt = InsertStatement::new("t")
            .columns(["a", "b"])
            .row(vec![RowValues::Int(1)]);
        let err = stmt
            .render(Dialect::Postgres, &InsertOption::Default, None)
            .unwrap_err();
        assert!(matches!(err, SqlMutationError::ParameterError(_)));
    }
}
