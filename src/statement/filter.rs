use super::Binder;
use crate::error::SqlMutationError;
use crate::types::RowValues;

/// WHERE condition of an UPDATE or DELETE. Multiple filters are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `col = value`, or `col IS NULL` for a null value.
    Eq(String, RowValues),
    /// `col IN (...)`; an empty list matches nothing.
    In(String, Vec<RowValues>),
    /// Caller fragment using `$1..$N` for its own parameters.
    Raw { sql: String, params: Vec<RowValues> },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        Filter::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn raw(sql: impl Into<String>, params: Vec<RowValues>) -> Self {
        Filter::Raw {
            sql: sql.into(),
            params,
        }
    }

    pub(crate) fn render(&self, binder: &mut Binder) -> Result<String, SqlMutationError> {
        match self {
            Filter::Eq(column, RowValues::Null) => Ok(format!("{} IS NULL", binder.quote(column))),
            Filter::Eq(column, value) => {
                let column = binder.quote(column);
                let placeholder = binder.bind(value.clone());
                Ok(format!("{column} = {placeholder}"))
            }
            Filter::In(_, values) if values.is_empty() => Ok("1 = 0".to_string()),
            Filter::In(column, values) => {
                let column = binder.quote(column);
                let placeholders = values
                    .iter()
                    .map(|v| binder.bind(v.clone()))
                    .collect::<Vec<_>>();
                Ok(format!("{column} IN ({})", placeholders.join(", ")))
            }
            Filter::Raw { sql, params } => Ok(format!("({})", binder.bind_raw(sql, params)?)),
        }
    }
}
