use super::{Dialect, Operation, ServerVersion};

/// Syntax family used to hand back affected rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseSyntax {
    /// `... RETURNING cols`, appended after the statement.
    Returning,
    /// SQL Server `OUTPUT INSERTED.col / DELETED.col`, placed inside the statement.
    Output,
}

/// Identifier quoting style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Double,
    Backtick,
    Bracket,
}

impl QuoteStyle {
    #[must_use]
    pub fn quote(self, name: &str) -> String {
        match self {
            QuoteStyle::Double => format!("\"{}\"", name.replace('"', "\"\"")),
            QuoteStyle::Backtick => format!("`{}`", name.replace('`', "``")),
            QuoteStyle::Bracket => format!("[{}]", name.replace(']', "]]")),
        }
    }
}

/// Support for `OLD.` / `NEW.` qualified returning columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OldNewSupport {
    None,
    /// Needs a probed server version at or above the given one.
    Since(ServerVersion),
    /// Always available (SQL Server `DELETED.` / `INSERTED.`).
    Always,
}

/// One row of the capability table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub dialect: Dialect,
    pub insert: bool,
    pub update: bool,
    pub delete: bool,
    /// `None` when the dialect has no returning clause at all.
    pub syntax: Option<ClauseSyntax>,
    pub quote: QuoteStyle,
    pub old_new: OldNewSupport,
    /// Minimum server version for any returning clause.
    pub min_version: Option<ServerVersion>,
    /// Whether one statement may return more than one row.
    pub multi_row: bool,
}

impl Capability {
    #[must_use]
    pub fn supports(&self, op: Operation) -> bool {
        self.syntax.is_some()
            && match op {
                Operation::Insert => self.insert,
                Operation::Update => self.update,
                Operation::Delete => self.delete,
            }
    }

    /// Token selecting every column for `op`.
    #[must_use]
    pub fn wildcard(&self, op: Operation) -> &'static str {
        match (self.syntax, op) {
            (Some(ClauseSyntax::Output), Operation::Delete) => "DELETED.*",
            (Some(ClauseSyntax::Output), _) => "INSERTED.*",
            _ => "*",
        }
    }
}

const fn unsupported(dialect: Dialect, quote: QuoteStyle) -> Capability {
    Capability {
        dialect,
        insert: false,
        update: false,
        delete: false,
        syntax: None,
        quote,
        old_new: OldNewSupport::None,
        min_version: None,
        multi_row: false,
    }
}

static CAPABILITIES: [Capability; 8] = [
    Capability {
        dialect: Dialect::Postgres,
        insert: true,
        update: true,
        delete: true,
        syntax: Some(ClauseSyntax::Returning),
        quote: QuoteStyle::Double,
        old_new: OldNewSupport::Since(ServerVersion::new(18, 0, 0)),
        min_version: None,
        multi_row: true,
    },
    Capability {
        dialect: Dialect::Sqlite,
        insert: true,
        update: true,
        delete: true,
        syntax: Some(ClauseSyntax::Returning),
        quote: QuoteStyle::Backtick,
        old_new: OldNewSupport::None,
        min_version: Some(ServerVersion::new(3, 35, 0)),
        multi_row: true,
    },
    Capability {
        dialect: Dialect::Mssql,
        insert: true,
        update: true,
        delete: true,
        syntax: Some(ClauseSyntax::Output),
        quote: QuoteStyle::Bracket,
        old_new: OldNewSupport::Always,
        min_version: None,
        multi_row: true,
    },
    Capability {
        dialect: Dialect::MariaDb,
        insert: true,
        update: false,
        delete: true,
        syntax: Some(ClauseSyntax::Returning),
        quote: QuoteStyle::Backtick,
        old_new: OldNewSupport::None,
        min_version: Some(ServerVersion::new(10, 5, 0)),
        multi_row: true,
    },
    unsupported(Dialect::MySql, QuoteStyle::Backtick),
    Capability {
        dialect: Dialect::DaMeng,
        insert: true,
        update: true,
        delete: true,
        syntax: Some(ClauseSyntax::Returning),
        quote: QuoteStyle::Double,
        old_new: OldNewSupport::None,
        min_version: None,
        multi_row: true,
    },
    unsupported(Dialect::Oracle, QuoteStyle::Double),
    unsupported(Dialect::ClickHouse, QuoteStyle::Backtick),
];

pub(super) fn lookup(dialect: Dialect) -> &'static Capability {
    let idx = match dialect {
        Dialect::Postgres => 0,
        Dialect::Sqlite => 1,
        Dialect::Mssql => 2,
        Dialect::MariaDb => 3,
        Dialect::MySql => 4,
        Dialect::DaMeng => 5,
        Dialect::Oracle => 6,
        Dialect::ClickHouse => 7,
    };
    &CAPABILITIES[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows_match_their_dialect() {
        for dialect in Dialect::ALL {
            assert_eq!(lookup(dialect).dialect, dialect);
        }
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(QuoteStyle::Double.quote("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(QuoteStyle::Backtick.quote("a`b"), "`a``b`");
        assert_eq!(QuoteStyle::Bracket.quote("x]y"), "[x]]y]");
    }

    #[test]
    fn mssql_wildcards_use_pseudo_tables() {
        let cap = lookup(Dialect::Mssql);
        assert_eq!(cap.wildcard(Operation::Insert), "INSERTED.*");
        assert_eq!(cap.wildcard(Operation::Delete), "DELETED.*");
        assert_eq!(lookup(Dialect::Sqlite).wildcard(Operation::Delete), "*");
    }
}
