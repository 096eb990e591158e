//! Dialect identities, the per-dialect capability table and returning-clause negotiation.

mod capability;
mod clause;
mod version;

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use capability::{Capability, ClauseSyntax, OldNewSupport, QuoteStyle};
pub use clause::{Clause, Placement, negotiate, negotiate_with};
pub use version::{ServerVersion, VersionCache, probe_server_version};

use crate::translation::PlaceholderStyle;

/// SQL dialects the mutation layer knows how to talk to.
///
/// Only `Postgres` and `Sqlite` ship with a pooled backend; every other dialect is reached
/// through a caller-supplied [`Link`](crate::link::Link).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Sqlite,
    Mssql,
    #[value(name = "mariadb")]
    MariaDb,
    #[value(name = "mysql")]
    MySql,
    #[value(name = "dameng")]
    DaMeng,
    Oracle,
    #[value(name = "clickhouse")]
    ClickHouse,
}

/// Kind of mutation being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        })
    }
}

/// How many rows a returning clause may produce for one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Multi,
}

impl Dialect {
    /// All known dialects, in capability-table order.
    pub const ALL: [Dialect; 8] = [
        Dialect::Postgres,
        Dialect::Sqlite,
        Dialect::Mssql,
        Dialect::MariaDb,
        Dialect::MySql,
        Dialect::DaMeng,
        Dialect::Oracle,
        Dialect::ClickHouse,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::Mssql => "mssql",
            Dialect::MariaDb => "mariadb",
            Dialect::MySql => "mysql",
            Dialect::DaMeng => "dameng",
            Dialect::Oracle => "oracle",
            Dialect::ClickHouse => "clickhouse",
        }
    }

    /// Static capability entry for this dialect.
    #[must_use]
    pub fn capability(self) -> &'static Capability {
        capability::lookup(self)
    }

    /// Placeholder syntax the dialect's drivers bind parameters with.
    #[must_use]
    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Dialect::Postgres => PlaceholderStyle::Dollar,
            Dialect::Sqlite => PlaceholderStyle::QuestionNumbered,
            Dialect::Mssql => PlaceholderStyle::AtP,
            Dialect::Oracle | Dialect::DaMeng => PlaceholderStyle::ColonNumbered,
            Dialect::MariaDb | Dialect::MySql | Dialect::ClickHouse => PlaceholderStyle::Question,
        }
    }

    /// Quote an identifier, doubling any embedded closing quote character.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        self.capability().quote.quote(name)
    }

    /// Returning cardinality supported for `op`, or `None` when the dialect cannot return rows
    /// for that operation at all.
    #[must_use]
    pub fn returning_cardinality(self, op: Operation) -> Option<Cardinality> {
        let cap = self.capability();
        if !cap.supports(op) {
            return None;
        }
        Some(if cap.multi_row {
            Cardinality::Multi
        } else {
            Cardinality::Single
        })
    }

    /// Statement used to read the server version, if the dialect has one.
    #[must_use]
    pub fn version_probe_sql(self) -> Option<&'static str> {
        match self {
            Dialect::Postgres => Some("SELECT version()"),
            Dialect::Sqlite => Some("select sqlite_version()"),
            Dialect::Mssql => Some("SELECT @@VERSION"),
            Dialect::MariaDb | Dialect::MySql => Some("SELECT VERSION()"),
            Dialect::ClickHouse => Some("SELECT version()"),
            Dialect::DaMeng | Dialect::Oracle => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
