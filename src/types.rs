use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Values stored in a record or bound as statement parameters.
///
/// The same enum is used by every backend so mutation code never branches on driver types:
/// ```rust
/// use sql_mutation::prelude::*;
///
/// let row = vec![
///     RowValues::Text("alice".into()),
///     RowValues::Int(30),
///     RowValues::Null,
/// ];
/// # let _ = row;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Integer view used for generated identifiers.
    ///
    /// Accepts `Int`, integral `Float`s in `i64` range and text holding a base-10 integer (some drivers report
    /// `NUMERIC`/`DECIMAL` keys as text). Everything else is `None`.
    #[must_use]
    pub fn to_identifier(&self) -> Option<i64> {
        match self {
            RowValues::Int(value) => Some(*value),
            #[allow(clippy::cast_possible_truncation)]
            RowValues::Float(value)
                if value.fract() == 0.0 && value.abs() < 2f64.powi(63) =>
            {
                Some(*value as i64)
            }
            RowValues::Text(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Canonical text used as a hash key for correlation indexes.
    #[must_use]
    pub(crate) fn correlation_key(&self) -> Option<String> {
        if self.is_null() {
            return None;
        }
        if let Some(id) = self.to_identifier() {
            return Some(format!("i:{id}"));
        }
        Some(match self {
            RowValues::Text(s) => format!("s:{s}"),
            RowValues::Bool(b) => format!("b:{b}"),
            RowValues::Float(f) => format!("f:{f}"),
            RowValues::Timestamp(ts) => format!("t:{ts}"),
            RowValues::JSON(json) => format!("j:{json}"),
            RowValues::Blob(bytes) => format!("x:{bytes:?}"),
            RowValues::Int(_) | RowValues::Null => unreachable!("handled above"),
        })
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// The conversion "mode".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConversionMode {
    /// Parameters feed a row-producing statement (RETURNING/OUTPUT path).
    Query,
    /// Parameters feed a fire-and-forget statement (native exec path).
    Execute,
}

/// Convert a slice of `RowValues` into backend-specific parameters.
pub trait ParamConverter<'a> {
    type Converted;

    /// Convert a slice of `RowValues` into the backend's parameter type.
    ///
    /// # Errors
    ///
    /// Returns `SqlMutationError` if the conversion fails for any parameter.
    fn convert_sql_params(
        params: &'a [RowValues],
        mode: ConversionMode,
    ) -> Result<Self::Converted, crate::error::SqlMutationError>;
}
