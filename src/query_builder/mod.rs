use std::sync::Arc;

use crate::link::{Link, LinkSource};
use crate::options::{InsertOption, MutationOptions, Returning};
use crate::statement::{
    Assignment, DeleteStatement, Filter, InsertStatement, Mutation, UpdateStatement,
};
use crate::types::RowValues;

mod dml;

/// Fluent builder for one Insert/Update/Delete call.
///
/// ```rust,no_run
/// # use sql_mutation::prelude::*;
/// # async fn demo(db: &ConfigAndPool) -> Result<(), SqlMutationError> {
/// let result = db
///     .insert("users")
///     .columns(["name", "age"])
///     .values(vec!["John".into(), 18.into()])
///     .returning(["id", "created_at"])
///     .execute(&CallContext::new())
///     .await?;
/// assert_eq!(result.rows_affected(), 1);
/// # Ok(())
/// # }
/// ```
///
/// Methods that do not apply to the statement kind (for example `set` on an insert) are
/// recorded and reported as a `ParameterError` by [`execute`](MutationBuilder::execute).
pub struct MutationBuilder<'a> {
    pub(crate) source: &'a dyn LinkSource,
    pub(crate) mutation: Mutation,
    pub(crate) options: MutationOptions,
    pub(crate) link: Option<Arc<dyn Link>>,
    pub(crate) misuse: Option<String>,
}

impl<'a> MutationBuilder<'a> {
    pub fn insert(source: &'a dyn LinkSource, table: impl Into<String>) -> Self {
        Self::new(source, InsertStatement::new(table).into())
    }

    pub fn update(source: &'a dyn LinkSource, table: impl Into<String>) -> Self {
        Self::new(source, UpdateStatement::new(table).into())
    }

    pub fn delete(source: &'a dyn LinkSource, table: impl Into<String>) -> Self {
        Self::new(source, DeleteStatement::new(table).into())
    }

    pub fn new(source: &'a dyn LinkSource, mutation: Mutation) -> Self {
        Self {
            source,
            mutation,
            options: MutationOptions::default(),
            link: None,
            misuse: None,
        }
    }

    fn misuse(&mut self, method: &str) {
        if self.misuse.is_none() {
            self.misuse = Some(format!(
                "`{method}` does not apply to {} on {}",
                self.mutation.operation(),
                self.mutation.table()
            ));
        }
    }

    /// Column list for an insert.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match &mut self.mutation {
            Mutation::Insert(stmt) => stmt.columns = columns.into_iter().map(Into::into).collect(),
            _ => self.misuse("columns"),
        }
        self
    }

    /// Append one row of insert values, in column order.
    #[must_use]
    pub fn values(mut self, row: Vec<RowValues>) -> Self {
        match &mut self.mutation {
            Mutation::Insert(stmt) => stmt.rows.push(row),
            _ => self.misuse("values"),
        }
        self
    }

    /// Append several insert rows.
    #[must_use]
    pub fn rows<I>(self, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<RowValues>>,
    {
        rows.into_iter().fold(self, MutationBuilder::values)
    }

    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        match &mut self.mutation {
            Mutation::Update(stmt) => stmt
                .assignments
                .push(Assignment::Value(column.into(), value.into())),
            _ => self.misuse("set"),
        }
        self
    }

    /// `column = expr`, where `expr` uses `$1..$N` for `params`.
    #[must_use]
    pub fn set_expr(
        mut self,
        column: impl Into<String>,
        expr: impl Into<String>,
        params: Vec<RowValues>,
    ) -> Self {
        match &mut self.mutation {
            Mutation::Update(stmt) => stmt.assignments.push(Assignment::Expr {
                column: column.into(),
                expr: expr.into(),
                params,
            }),
            _ => self.misuse("set_expr"),
        }
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        match &mut self.mutation {
            Mutation::Update(stmt) => stmt.filters.push(filter),
            Mutation::Delete(stmt) => stmt.filters.push(filter),
            Mutation::Insert(_) => self.misuse("filter"),
        }
        self
    }

    #[must_use]
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    /// Request these columns back. `OLD.x` / `NEW.x` are accepted where the dialect allows.
    #[must_use]
    pub fn returning<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.returning = Returning::fields(fields);
        self
    }

    #[must_use]
    pub fn returning_all(mut self) -> Self {
        self.options.returning = Returning::All;
        self
    }

    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.options.primary_key = Some(column.into());
        self
    }

    #[must_use]
    pub fn insert_option(mut self, option: InsertOption) -> Self {
        if matches!(self.mutation, Mutation::Insert(_)) {
            self.options.insert_option = option;
        } else {
            self.misuse("insert_option");
        }
        self
    }

    #[must_use]
    pub fn ignore(self) -> Self {
        self.insert_option(InsertOption::Ignore)
    }

    #[must_use]
    pub fn replace(self) -> Self {
        self.insert_option(InsertOption::Replace)
    }

    #[must_use]
    pub fn save<I, S>(self, conflict_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_option(InsertOption::Save {
            conflict_columns: conflict_columns.into_iter().map(Into::into).collect(),
        })
    }

    /// Declare that the statement touches exactly one row.
    ///
    /// An UPDATE or DELETE with a returning clause that comes back empty is then `NotFound`.
    #[must_use]
    pub fn single_row(mut self) -> Self {
        self.options.single_row = true;
        self
    }

    /// Replace all options at once.
    #[must_use]
    pub fn options(mut self, options: MutationOptions) -> Self {
        self.options = options;
        self
    }

    /// Run on this link instead of the context transaction or a master connection.
    #[must_use]
    pub fn via(mut self, link: Arc<dyn Link>) -> Self {
        self.link = Some(link);
        self
    }

    #[must_use]
    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    #[must_use]
    pub fn current_options(&self) -> &MutationOptions {
        &self.options
    }
}

/// Entry points for building mutations on any [`LinkSource`].
pub trait MutationSource {
    fn insert(&self, table: impl Into<String>) -> MutationBuilder<'_>;
    fn update(&self, table: impl Into<String>) -> MutationBuilder<'_>;
    fn delete(&self, table: impl Into<String>) -> MutationBuilder<'_>;
}

impl<T: LinkSource> MutationSource for T {
    fn insert(&self, table: impl Into<String>) -> MutationBuilder<'_> {
        MutationBuilder::insert(self, table)
    }

    fn update(&self, table: impl Into<String>) -> MutationBuilder<'_> {
        MutationBuilder::update(self, table)
    }

    fn delete(&self, table: impl Into<String>) -> MutationBuilder<'_> {
        MutationBuilder::delete(self, table)
    }
}
