use std::error::Error;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Row, Statement};

use crate::error::SqlMutationError;
use crate::results::RecordSet;
use crate::types::RowValues;

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// Unknown types are read as text; `timestamptz` is normalised to UTC.
///
/// # Errors
/// Returns `SqlMutationError` if the column cannot be retrieved.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, SqlMutationError> {
    let type_name = row.columns()[idx].type_().name();
    Ok(match type_name {
        "int2" => row
            .try_get::<_, Option<i16>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        "int8" => row
            .try_get::<_, Option<i64>>(idx)?
            .map_or(RowValues::Null, RowValues::Int),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))),
        "float8" => row
            .try_get::<_, Option<f64>>(idx)?
            .map_or(RowValues::Null, RowValues::Float),
        "bool" => row
            .try_get::<_, Option<bool>>(idx)?
            .map_or(RowValues::Null, RowValues::Bool),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map_or(RowValues::Null, RowValues::Timestamp),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc())),
        "date" => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Text(v.to_string())),
        "json" | "jsonb" => row
            .try_get::<_, Option<Value>>(idx)?
            .map_or(RowValues::Null, RowValues::JSON),
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map_or(RowValues::Null, RowValues::Blob),
        _ => row
            .try_get::<_, Option<Lossy>>(idx)?
            .map_or(RowValues::Null, |v| v.0),
    })
}

/// Fallback for column types without a dedicated arm.
///
/// `numeric` and `uuid` are rendered as text, text-like types are read as text, and anything
/// else keeps its binary wire encoding.
struct Lossy(RowValues);

impl<'a> FromSql<'a> for Lossy {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let value = match *ty {
            Type::NUMERIC => RowValues::Text(numeric_text(raw)?),
            Type::UUID => RowValues::Text(uuid_text(raw)?),
            _ if <&str as FromSql>::accepts(ty) => {
                RowValues::Text(<&str as FromSql>::from_sql(ty, raw)?.to_owned())
            }
            _ => RowValues::Blob(raw.to_vec()),
        };
        Ok(Lossy(value))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn be_u16(raw: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([raw[at], raw[at + 1]])
}

/// Decimal text of a binary `numeric`: base-10000 digit groups with a weight and display scale.
fn numeric_text(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    if raw.len() < 8 {
        return Err("numeric value too short".into());
    }
    let ndigits = usize::from(be_u16(raw, 0));
    #[allow(clippy::cast_possible_wrap)]
    let weight = be_u16(raw, 2) as i16;
    let sign = be_u16(raw, 4);
    let dscale = usize::from(be_u16(raw, 6));
    if raw.len() != 8 + 2 * ndigits {
        return Err(format!("numeric value has {} bytes for {ndigits} digits", raw.len()).into());
    }
    match sign {
        0xC000 => return Ok("NaN".into()),
        0xD000 => return Ok("Infinity".into()),
        0xF000 => return Ok("-Infinity".into()),
        _ => {}
    }
    let group = |i: i32| -> u16 {
        usize::try_from(i)
            .ok()
            .filter(|&i| i < ndigits)
            .map_or(0, |i| be_u16(raw, 8 + 2 * i))
    };

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&group(0).to_string());
        for i in 1..=i32::from(weight) {
            out.push_str(&format!("{:04}", group(i)));
        }
    }
    if dscale > 0 {
        let mut frac = String::with_capacity(dscale + 4);
        let mut i = i32::from(weight) + 1;
        while frac.len() < dscale {
            frac.push_str(&format!("{:04}", group(i)));
            i += 1;
        }
        frac.truncate(dscale);
        out.push('.');
        out.push_str(&frac);
    }
    Ok(out)
}

fn uuid_text(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    if raw.len() != 16 {
        return Err(format!("uuid value has {} bytes", raw.len()).into());
    }
    let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

/// Build a record set using statement metadata for column names, so an empty result still
/// knows its layout.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set(stmt: &Statement, rows: &[Row]) -> Result<RecordSet, SqlMutationError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = RecordSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names));

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
