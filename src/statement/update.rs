use super::{Binder, Filter, Rendered, push_output, push_trailing, push_where};
use crate::dialect::{Clause, Dialect};
use crate::error::SqlMutationError;
use crate::types::RowValues;

/// One `SET` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Value(String, RowValues),
    /// `col = <expr>`, with `$1..$N` in `expr` referring to `params`.
    Expr {
        column: String,
        expr: String,
        params: Vec<RowValues>,
    },
}

impl Assignment {
    fn render(&self, binder: &mut Binder) -> Result<String, SqlMutationError> {
        match self {
            Assignment::Value(column, value) => {
                let column = binder.quote(column);
                Ok(format!("{column} = {}", binder.bind(value.clone())))
            }
            Assignment::Expr {
                column,
                expr,
                params,
            } => {
                let column = binder.quote(column);
                Ok(format!("{column} = {}", binder.bind_raw(expr, params)?))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub filters: Vec<Filter>,
}

impl UpdateStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.assignments
            .push(Assignment::Value(column.into(), value.into()));
        self
    }

    #[must_use]
    pub fn set_expr(
        mut self,
        column: impl Into<String>,
        expr: impl Into<String>,
        params: Vec<RowValues>,
    ) -> Self {
        self.assignments.push(Assignment::Expr {
            column: column.into(),
            expr: expr.into(),
            params,
        });
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub(super) fn render(
        &self,
        dialect: Dialect,
        clause: Option<&Clause>,
    ) -> Result<Rendered, SqlMutationError> {
        if self.assignments.is_empty() {
            return Err(SqlMutationError::ParameterError(format!(
                "update of {} has nothing to set",
                self.table
            )));
        }
        let mut binder = Binder::new(dialect);
        let sets = self
            .assignments
            .iter()
            .map(|a| a.render(&mut binder))
            .collect::<Result<Vec<_>, _>>()?;
        let mut sql = format!(
            "UPDATE {} SET {}",
            binder.quote(&self.table),
            sets.join(", ")
        );
        push_output(&mut sql, clause);
        push_where(&mut sql, &mut binder, &self.filters)?;
        push_trailing(&mut sql, clause);
        Ok(binder.finish(sql))
    }
}
