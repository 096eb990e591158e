use super::{
    Capability, Cardinality, ClauseSyntax, Dialect, OldNewSupport, Operation, ServerVersion,
};
use crate::error::NotSupported;
use crate::options::Returning;

/// Where a negotiated clause goes in the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Appended after the statement (after any conflict clause).
    Trailing,
    /// SQL Server `OUTPUT`: after the INSERT column list, after UPDATE's SET list, or after the
    /// DELETE target table.
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub text: String,
    pub placement: Placement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Image {
    Old,
    New,
}

/// Negotiate a returning clause against the dialect's built-in capability entry.
///
/// # Errors
///
/// Returns [`NotSupported`] when the dialect (or the known server version) cannot return rows
/// for `op`, or cannot honour one of the requested column forms.
pub fn negotiate(
    dialect: Dialect,
    op: Operation,
    returning: &Returning,
    version: Option<ServerVersion>,
    cardinality: Cardinality,
) -> Result<Option<Clause>, NotSupported> {
    negotiate_with(dialect.capability(), op, returning, version, cardinality)
}

/// Negotiate against an explicit capability entry.
///
/// `Ok(None)` means nothing was requested. An unknown `version` is treated as new enough for
/// plain returning but never for `OLD.`/`NEW.` columns.
///
/// # Errors
///
/// See [`negotiate`].
pub fn negotiate_with(
    cap: &Capability,
    op: Operation,
    returning: &Returning,
    version: Option<ServerVersion>,
    cardinality: Cardinality,
) -> Result<Option<Clause>, NotSupported> {
    let fields: &[String] = match returning {
        Returning::None => return Ok(None),
        Returning::Fields(fields) if fields.is_empty() => return Ok(None),
        Returning::Fields(fields) => fields,
        Returning::All => &[],
    };
    let capability = format!("returning on {op}");
    let Some(syntax) = cap.syntax else {
        return Err(NotSupported::new(cap.dialect, capability)
            .with_detail("dialect has no returning clause"));
    };
    if !cap.supports(op) {
        return Err(NotSupported::new(cap.dialect, capability)
            .with_detail(format!("{op} cannot return rows")));
    }
    if let (Some(min), Some(found)) = (cap.min_version, version)
        && found < min
    {
        return Err(NotSupported::new(cap.dialect, capability)
            .with_detail(format!("requires server version {min} or later, found {found}")));
    }
    if cardinality == Cardinality::Multi && !cap.multi_row {
        return Err(NotSupported::new(cap.dialect, capability)
            .with_detail("only single-row returning is available"));
    }

    let items = if matches!(returning, Returning::All) {
        vec![cap.wildcard(op).to_string()]
    } else {
        fields
            .iter()
            .map(|field| render_field(cap, op, syntax, field.trim(), version))
            .collect::<Result<Vec<_>, _>>()?
    };

    let (keyword, placement) = match syntax {
        ClauseSyntax::Returning => ("RETURNING", Placement::Trailing),
        ClauseSyntax::Output => ("OUTPUT", Placement::Output),
    };
    Ok(Some(Clause {
        text: format!("{keyword} {}", items.join(", ")),
        placement,
    }))
}

fn render_field(
    cap: &Capability,
    op: Operation,
    syntax: ClauseSyntax,
    field: &str,
    version: Option<ServerVersion>,
) -> Result<String, NotSupported> {
    if let Some((image, column)) = split_image(field) {
        return render_image_field(cap, op, syntax, image, column, version);
    }
    let column = if field == "*" {
        "*".to_string()
    } else {
        cap.quote.quote(field)
    };
    Ok(match syntax {
        ClauseSyntax::Returning => column,
        ClauseSyntax::Output => {
            let prefix = if op == Operation::Delete {
                "DELETED"
            } else {
                "INSERTED"
            };
            format!("{prefix}.{column}")
        }
    })
}

fn render_image_field(
    cap: &Capability,
    op: Operation,
    syntax: ClauseSyntax,
    image: Image,
    column: &str,
    version: Option<ServerVersion>,
) -> Result<String, NotSupported> {
    let capability = "OLD/NEW qualified returning columns";
    match cap.old_new {
        OldNewSupport::None => {
            return Err(NotSupported::new(cap.dialect, capability));
        }
        OldNewSupport::Since(min) => match version {
            Some(found) if found >= min => {}
            Some(found) => {
                return Err(NotSupported::new(cap.dialect, capability).with_detail(format!(
                    "requires server version {min} or later, found {found}"
                )));
            }
            None => {
                return Err(NotSupported::new(cap.dialect, capability)
                    .with_detail("server version unknown"));
            }
        },
        OldNewSupport::Always => {}
    }

    let column = if column == "*" {
        "*".to_string()
    } else {
        cap.quote.quote(column)
    };
    match syntax {
        ClauseSyntax::Returning => {
            let prefix = match image {
                Image::Old => "OLD",
                Image::New => "NEW",
            };
            Ok(format!("{prefix}.{column}"))
        }
        ClauseSyntax::Output => match (op, image) {
            (Operation::Insert, Image::Old) => Err(NotSupported::new(cap.dialect, capability)
                .with_detail("INSERT only exposes new values")),
            (Operation::Delete, Image::New) => Err(NotSupported::new(cap.dialect, capability)
                .with_detail("DELETE only exposes old values")),
            (_, Image::Old) => Ok(format!("DELETED.{column}")),
            (_, Image::New) => Ok(format!("INSERTED.{column}")),
        },
    }
}

fn split_image(field: &str) -> Option<(Image, &str)> {
    let (prefix, column) = field.split_once('.')?;
    let image = if prefix.eq_ignore_ascii_case("old") {
        Image::Old
    } else if prefix.eq_ignore_ascii_case("new") {
        Image::New
    } else {
        return None;
    };
    Some((image, column.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(
        dialect: Dialect,
        op: Operation,
        returning: &Returning,
        version: Option<ServerVersion>,
    ) -> Result<String, NotSupported> {
        negotiate(dialect, op, returning, version, Cardinality::Multi)
            .map(|c| c.map(|c| c.text).unwrap_or_default())
    }

    #[test]
    fn nothing_requested_yields_no_clause() {
        let res = negotiate(
            Dialect::Postgres,
            Operation::Insert,
            &Returning::None,
            None,
            Cardinality::Multi,
        );
        assert_eq!(res, Ok(None));
        let res = negotiate(
            Dialect::MySql,
            Operation::Insert,
            &Returning::Fields(vec![]),
            None,
            Cardinality::Multi,
        );
        assert_eq!(res, Ok(None));
    }

    #[test]
    fn quotes_per_dialect() {
        let fields = Returning::fields(["id", "name"]);
        assert_eq!(
            text(Dialect::Postgres, Operation::Insert, &fields, None).unwrap(),
            r#"RETURNING "id", "name""#
        );
        assert_eq!(
            text(Dialect::Sqlite, Operation::Update, &fields, None).unwrap(),
            "RETURNING `id`, `name`"
        );
        assert_eq!(
            text(Dialect::Mssql, Operation::Insert, &fields, None).unwrap(),
            "OUTPUT INSERTED.[id], INSERTED.[name]"
        );
        assert_eq!(
            text(Dialect::Mssql, Operation::Delete, &Returning::All, None).unwrap(),
            "OUTPUT DELETED.*"
        );
    }

    #[test]
    fn star_inside_field_list_is_wildcard() {
        let fields = Returning::fields(["*"]);
        assert_eq!(
            text(Dialect::DaMeng, Operation::Delete, &fields, None).unwrap(),
            "RETURNING *"
        );
    }

    #[test]
    fn unsupported_operations_and_dialects() {
        let fields = Returning::fields(["id"]);
        let err = text(Dialect::MariaDb, Operation::Update, &fields, None).unwrap_err();
        assert_eq!(err.dialect, Dialect::MariaDb);
        assert!(err.capability.contains("UPDATE"));
        assert!(text(Dialect::MySql, Operation::Insert, &fields, None).is_err());
        assert!(text(Dialect::ClickHouse, Operation::Delete, &Returning::All, None).is_err());
        assert!(text(Dialect::Oracle, Operation::Update, &fields, None).is_err());
    }

    #[test]
    fn minimum_versions_gate_only_when_known() {
        let fields = Returning::fields(["id"]);
        let old = Some(ServerVersion::new(3, 34, 1));
        assert!(text(Dialect::Sqlite, Operation::Insert, &fields, old).is_err());
        let new = Some(ServerVersion::new(3, 35, 0));
        assert!(text(Dialect::Sqlite, Operation::Insert, &fields, new).is_ok());
        assert!(text(Dialect::Sqlite, Operation::Insert, &fields, None).is_ok());
        let maria = Some(ServerVersion::new(10, 4, 0));
        assert!(text(Dialect::MariaDb, Operation::Delete, &fields, maria).is_err());
    }

    #[test]
    fn old_new_prefixes_are_version_gated_on_postgres() {
        let fields = Returning::fields(["OLD.price", "new.*"]);
        let pg18 = Some(ServerVersion::new(18, 0, 0));
        assert_eq!(
            text(Dialect::Postgres, Operation::Update, &fields, pg18).unwrap(),
            r#"RETURNING OLD."price", NEW.*"#
        );
        let pg17 = Some(ServerVersion::new(17, 4, 0));
        assert!(text(Dialect::Postgres, Operation::Update, &fields, pg17).is_err());
        assert!(text(Dialect::Postgres, Operation::Update, &fields, None).is_err());
        assert!(text(Dialect::Sqlite, Operation::Update, &fields, None).is_err());
    }

    #[test]
    fn mssql_maps_old_new_to_pseudo_tables() {
        let fields = Returning::fields(["OLD.qty", "NEW.qty"]);
        assert_eq!(
            text(Dialect::Mssql, Operation::Update, &fields, None).unwrap(),
            "OUTPUT DELETED.[qty], INSERTED.[qty]"
        );
        let err = text(Dialect::Mssql, Operation::Insert, &fields, None).unwrap_err();
        assert!(err.to_string().contains("new values"));
        let new_only = Returning::fields(["NEW.qty"]);
        assert!(text(Dialect::Mssql, Operation::Delete, &new_only, None).is_err());
    }

    #[test]
    fn single_row_capability_rejects_multi_row_requests() {
        let mut cap = Dialect::Postgres.capability().clone();
        cap.multi_row = false;
        let fields = Returning::fields(["id"]);
        let multi = negotiate_with(&cap, Operation::Update, &fields, None, Cardinality::Multi);
        assert!(multi.is_err());
        let single = negotiate_with(&cap, Operation::Update, &fields, None, Cardinality::Single);
        assert!(matches!(single, Ok(Some(_))));
    }
}
