//! Scalar values carried through column maps and bound as statement parameters.
//!
//! [`Value`] adapts to the column type Postgres reports for each parameter, so a
//! map built from loosely typed input (`i64` counters, `f64` prices, text ids)
//! can be bound against `int4`, `numeric` or `uuid` columns without per-entity
//! glue.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// A flat column map. Ordered, so iteration is stable for a given input.
pub type ValueMap = BTreeMap<String, Value>;

/// A decoded row: column name to value, in column order of the map.
pub type Record = BTreeMap<String, Value>;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    TextArray(Vec<String>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Render identifiers (uuid or text) as a string.
    pub fn to_id_string(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Uuid(u) => Some(u.to_string()),
            Value::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }

    /// Decode column `idx` of `row` according to its reported type.
    pub fn from_row(row: &Row, idx: usize) -> StoreResult<Self> {
        let column = &row.columns()[idx];
        let name = column.name();
        let ty = column.type_();

        macro_rules! get {
            ($t:ty) => {
                row.try_get::<_, Option<$t>>(idx)
                    .map_err(|e| StoreError::decode(name, e.to_string()))?
            };
        }

        let value = match *ty {
            Type::BOOL => get!(bool).map(Value::Bool),
            Type::INT2 => get!(i16).map(|v| Value::Int(v.into())),
            Type::INT4 => get!(i32).map(|v| Value::Int(v.into())),
            Type::INT8 => get!(i64).map(Value::Int),
            Type::FLOAT4 => get!(f32).map(|v| Value::Float(v.into())),
            Type::FLOAT8 => get!(f64).map(Value::Float),
            Type::NUMERIC => match get!(Decimal) {
                Some(d) => Some(Value::Float(d.to_f64().ok_or_else(|| {
                    StoreError::decode(name, format!("numeric {d} out of f64 range"))
                })?)),
                None => None,
            },
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => get!(String).map(Value::Text),
            Type::UUID => get!(Uuid).map(Value::Uuid),
            Type::TIMESTAMPTZ => get!(DateTime<Utc>).map(Value::Timestamp),
            Type::TIMESTAMP => get!(NaiveDateTime).map(|t| Value::Timestamp(t.and_utc())),
            Type::DATE => get!(NaiveDate).map(Value::Date),
            Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => get!(Vec<String>).map(Value::TextArray),
            Type::JSON | Type::JSONB => get!(serde_json::Value).map(Value::Json),
            _ => {
                return Err(StoreError::decode(
                    name,
                    format!("unsupported column type {ty}"),
                ));
            }
        };
        Ok(value.unwrap_or(Value::Null))
    }
}

/// Decode every column of a row into a [`Record`].
pub fn record_from_row(row: &Row) -> StoreResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        record.insert(column.name().to_string(), Value::from_row(row, idx)?);
    }
    Ok(record)
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => i.to_string().to_sql(ty, out),
                _ => i.to_sql_checked(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::NUMERIC => float_to_decimal(*f)?.to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 if is_whole(*f) => {
                    Value::Int(*f as i64).to_sql(ty, out)
                }
                _ => f.to_sql_checked(ty, out),
            },
            Value::Text(s) => match *ty {
                Type::UUID => Uuid::parse_str(s)?.to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 => {
                    Value::Int(s.trim().parse::<i64>()?).to_sql(ty, out)
                }
                Type::FLOAT4 | Type::FLOAT8 => {
                    Value::Float(s.trim().parse::<f64>()?).to_sql(ty, out)
                }
                Type::NUMERIC => s.trim().parse::<Decimal>()?.to_sql(ty, out),
                Type::BOOL => s.trim().parse::<bool>()?.to_sql(ty, out),
                Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(s.trim())?
                    .with_timezone(&Utc)
                    .to_sql(ty, out),
                _ => s.as_str().to_sql_checked(ty, out),
            },
            Value::Uuid(u) => match *ty {
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => u.to_string().to_sql(ty, out),
                _ => u.to_sql_checked(ty, out),
            },
            Value::Timestamp(t) => match *ty {
                Type::TIMESTAMP => t.naive_utc().to_sql(ty, out),
                Type::DATE => t.date_naive().to_sql(ty, out),
                _ => t.to_sql_checked(ty, out),
            },
            Value::Date(d) => d.to_sql_checked(ty, out),
            Value::TextArray(items) => items.to_sql_checked(ty, out),
            Value::Json(j) => j.to_sql_checked(ty, out),
        }
    }

    // Each variant checks the concrete column type itself.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// The shortest decimal that reads back as `f`, so `19.99` binds as `19.99`
/// rather than its full binary expansion.
fn float_to_decimal(f: f64) -> Result<Decimal, Box<dyn Error + Sync + Send>> {
    if !f.is_finite() {
        return Err(format!("{f} cannot be represented as numeric").into());
    }
    f.to_string()
        .parse::<Decimal>()
        .map_err(|e| format!("{f} cannot be represented as numeric: {e}").into())
}

fn is_whole(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::TextArray(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Build a [`ValueMap`] from `key => value` pairs.
///
/// ```ignore
/// let set = values! { "likes" => 11_i64, "image_url" => None::<String> };
/// ```
#[macro_export]
macro_rules! values {
    () => { $crate::ValueMap::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::ValueMap::new();
        $( map.insert(($key).to_string(), $crate::Value::from($value)); )+
        map
    }};
}
