/// Columns requested back from a mutation.
///
/// `Fields` may mix plain names, `*`, and (where the dialect allows it) `OLD.`/`NEW.`
/// qualified names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Returning {
    #[default]
    None,
    Fields(Vec<String>),
    All,
}

impl Returning {
    /// Build from a list of names; an empty list means nothing was requested.
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            Returning::None
        } else {
            Returning::Fields(fields)
        }
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        match self {
            Returning::None => false,
            Returning::Fields(fields) => !fields.is_empty(),
            Returning::All => true,
        }
    }
}

/// Conflict handling for INSERT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InsertOption {
    #[default]
    Default,
    /// Skip rows that violate a unique constraint.
    Ignore,
    /// Delete the conflicting row and insert the new one.
    Replace,
    /// Upsert: on conflict over `conflict_columns`, update every other inserted column.
    Save { conflict_columns: Vec<String> },
}

/// Per-call mutation options.
///
/// This is a plain value threaded through the call; nothing is read from ambient state.
///
/// ```rust
/// use sql_mutation::prelude::*;
///
/// let opts = MutationOptions::default()
///     .with_returning(Returning::fields(["id", "name"]))
///     .with_primary_key("id");
/// assert!(opts.returning.is_requested());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOptions {
    pub returning: Returning,
    /// Primary-key column hint; skips the metadata lookup for the automatic id fallback.
    pub primary_key: Option<String>,
    pub insert_option: InsertOption,
    /// Caller asserts the statement touches at most one row.
    pub single_row: bool,
}

impl MutationOptions {
    #[must_use]
    pub fn with_returning(mut self, returning: Returning) -> Self {
        self.returning = returning;
        self
    }

    #[must_use]
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_insert_option(mut self, option: InsertOption) -> Self {
        self.insert_option = option;
        self
    }

    #[must_use]
    pub fn with_single_row(mut self, single_row: bool) -> Self {
        self.single_row = single_row;
        self
    }
}
