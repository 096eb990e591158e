use super::{Binder, Filter, Rendered, push_output, push_trailing, push_where};
use crate::dialect::{Clause, Dialect};
use crate::error::SqlMutationError;

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub filters: Vec<Filter>,
}

impl DeleteStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
        }
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
        let mut binder = Binder::new(dialect);
        let mut sql = format!("DELETE FROM {}", binder.quote(&self.table));
        push_output(&mut sql, clause);
        push_where(&mut sql, &mut binder, &self.filters)?;
        push_trailing(&mut sql, clause);
        Ok(binder.finish(sql))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Placement;
    use crate::types::RowValues;

    #[test]
    fn clause_placement_per_syntax() {
        let stmt = DeleteStatement::new("audit.events").filter(Filter::is_in("id", [3, 4]));
        let trailing = Clause {
            text: r#"RETURNING "id""#.into(),
            placement: Placement::Trailing,
        };
        let pg = stmt.render(Dialect::Postgres, Some(&trailing)).unwrap();
        assert_eq!(
            pg.sql,
            r#"DELETE FROM "audit"."events" WHERE "id" IN ($1, $2) RETURNING "id""#
        );
        assert_eq!(pg.params, vec![RowValues::Int(3), RowValues::Int(4)]);

        let output = Clause {
            text: "OUTPUT DELETED.*".into(),
            placement: Placement::Output,
        };
        let ms = stmt.render(Dialect::Mssql, Some(&output)).unwrap();
        assert_eq!(
            ms.sql,
            "DELETE FROM [audit].[events] OUTPUT DELETED.* WHERE [id] IN (@P1, @P2)"
        );
    }
}
