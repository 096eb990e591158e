//! Rendering of INSERT / UPDATE / DELETE statements per dialect.

mod delete;
mod filter;
mod insert;
mod update;

pub use delete::DeleteStatement;
pub use filter::Filter;
pub use insert::InsertStatement;
pub use update::{Assignment, UpdateStatement};

use crate::dialect::{Clause, Dialect, Operation};
use crate::error::SqlMutationError;
use crate::options::InsertOption;
use crate::translation::{PlaceholderStyle, rebase_placeholders};
use crate::types::RowValues;

/// One mutation statement, before dialect rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Mutation {
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Mutation::Insert(_) => Operation::Insert,
            Mutation::Update(_) => Operation::Update,
            Mutation::Delete(_) => Operation::Delete,
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Mutation::Insert(stmt) => &stmt.table,
            Mutation::Update(stmt) => &stmt.table,
            Mutation::Delete(stmt) => &stmt.table,
        }
    }

    /// Render for `dialect`, placing `clause` (if any) where the dialect expects it.
    ///
    /// # Errors
    ///
    /// `ParameterError` for malformed statements (no columns, ragged rows, bad raw
    /// placeholders); `NotSupported` for insert variants the dialect lacks.
    pub fn render(
        &self,
        dialect: Dialect,
        insert_option: &InsertOption,
        clause: Option<&Clause>,
    ) -> Result<Rendered, SqlMutationError> {
        match self {
            Mutation::Insert(stmt) => stmt.render(dialect, insert_option, clause),
            Mutation::Update(stmt) => stmt.render(dialect, clause),
            Mutation::Delete(stmt) => stmt.render(dialect, clause),
        }
    }
}

impl From<InsertStatement> for Mutation {
    fn from(stmt: InsertStatement) -> Self {
        Mutation::Insert(stmt)
    }
}

impl From<UpdateStatement> for Mutation {
    fn from(stmt: UpdateStatement) -> Self {
        Mutation::Update(stmt)
    }
}

impl From<DeleteStatement> for Mutation {
    fn from(stmt: DeleteStatement) -> Self {
        Mutation::Delete(stmt)
    }
}

/// SQL text plus parameters in binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub sql: String,
    pub params: Vec<RowValues>,
}

/// Accumulates bound parameters and hands out placeholders for them.
pub(crate) struct Binder {
    dialect: Dialect,
    style: PlaceholderStyle,
    params: Vec<RowValues>,
}

impl Binder {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            style: dialect.placeholder_style(),
            params: Vec::new(),
        }
    }

    pub(crate) fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub(crate) fn bind(&mut self, value: RowValues) -> String {
        self.params.push(value);
        self.style.render(self.params.len())
    }

    /// Bind a caller fragment written with `$1..$N` against its own `params`.
    pub(crate) fn bind_raw(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<String, SqlMutationError> {
        let rebased = rebase_placeholders(sql, self.params.len(), self.style);
        if let Some(&bad) = rebased.order.iter().find(|&&i| i >= params.len()) {
            return Err(SqlMutationError::ParameterError(format!(
                "fragment `{sql}` references ${} but only {} parameter(s) were given",
                bad + 1,
                params.len()
            )));
        }
        if self.style.is_numbered() {
            self.params.extend_from_slice(params);
        } else {
            self.params
                .extend(rebased.order.iter().map(|&i| params[i].clone()));
        }
        Ok(rebased.sql.into_owned())
    }

    pub(crate) fn quote(&self, ident: &str) -> String {
        quote_path(self.dialect, ident)
    }

    pub(crate) fn finish(self, sql: String) -> Rendered {
        Rendered {
            sql,
            params: self.params,
        }
    }
}

/// Quote a possibly schema-qualified name part by part.
pub(crate) fn quote_path(dialect: Dialect, name: &str) -> String {
    name.split('.')
        .map(|part| dialect.quote_identifier(part.trim()))
        .collect::<Vec<_>>()
        .join(".")
}

pub(crate) fn push_trailing(sql: &mut String, clause: Option<&Clause>) {
    if let Some(clause) = clause
        && clause.placement == crate::dialect::Placement::Trailing
    {
        sql.push(' ');
        sql.push_str(&clause.text);
    }
}

pub(crate) fn push_output(sql: &mut String, clause: Option<&Clause>) {
    if let Some(clause) = clause
        && clause.placement == crate::dialect::Placement::Output
    {
        sql.push(' ');
        sql.push_str(&clause.text);
    }
}

pub(crate) fn push_where(
    sql: &mut String,
    binder: &mut Binder,
    filters: &[Filter],
) -> Result<(), SqlMutationError> {
    if filters.is_empty() {
        return Ok(());
    }
    let parts = filters
        .iter()
        .map(|f| f.render(binder))
        .collect::<Result<Vec<_>, _>>()?;
    sql.push_str(" WHERE ");
    sql.push_str(&parts.join(" AND "));
    Ok(())
}
