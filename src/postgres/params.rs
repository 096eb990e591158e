use std::error::Error;

use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::error::SqlMutationError;
use crate::types::{ConversionMode, ParamConverter, RowValues};

/// Borrowed Postgres parameters.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    #[must_use]
    pub fn convert(params: &'a [RowValues]) -> Params<'a> {
        Params {
            references: params.iter().map(|p| p as &(dyn ToSql + Sync)).collect(),
        }
    }

    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

impl<'a> ParamConverter<'a> for Params<'a> {
    type Converted = Params<'a>;

    fn convert_sql_params(
        params: &'a [RowValues],
        _mode: ConversionMode,
    ) -> Result<Self::Converted, SqlMutationError> {
        Ok(Self::convert(params))
    }
}

fn narrow<T: TryFrom<i64>>(value: i64, ty: &Type) -> Result<T, Box<dyn Error + Sync + Send>> {
    T::try_from(value).map_err(|_| format!("{value} does not fit in {ty}").into())
}

impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            RowValues::Int(i) => match *ty {
                Type::INT2 => narrow::<i16>(*i, ty)?.to_sql(ty, out),
                Type::INT4 => narrow::<i32>(*i, ty)?.to_sql(ty, out),
                _ => (*i).to_sql(ty, out),
            },
            #[allow(clippy::cast_possible_truncation)]
            RowValues::Float(f) if *ty == Type::FLOAT4 => (*f as f32).to_sql(ty, out),
            RowValues::Float(f) => (*f).to_sql(ty, out),
            RowValues::Text(s) => s.to_sql(ty, out),
            RowValues::Bool(b) => (*b).to_sql(ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                _ => dt.to_sql(ty, out),
            },
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(jsval) => jsval.to_sql(ty, out),
            RowValues::Blob(bytes) => bytes.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_narrow_to_the_column_width() {
        let mut out = bytes::BytesMut::new();
        RowValues::Int(7).to_sql(&Type::INT4, &mut out).unwrap();
        assert_eq!(out.len(), 4);

        let mut out = bytes::BytesMut::new();
        assert!(RowValues::Int(i64::MAX).to_sql(&Type::INT2, &mut out).is_err());
    }

    #[test]
    fn null_is_written_as_null() {
        let mut out = bytes::BytesMut::new();
        let res = RowValues::Null.to_sql(&Type::TEXT, &mut out).unwrap();
        assert!(matches!(res, IsNull::Yes));
    }
}
