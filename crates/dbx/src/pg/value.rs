//! Postgres encoding of [`Value`] and decoding of driver rows.

use crate::error::{DbxError, DbxResult};
use crate::row::Row;
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::error::Error;
use std::fmt;
use std::net::IpAddr;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        #[cfg(feature = "rust_decimal")]
        if *ty == Type::NUMERIC
            && let Some(d) = to_decimal(self)?
        {
            return d.to_sql_checked(ty, out);
        }
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) => encode_int(*i, ty, out),
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql_checked(ty, out),
                _ => f.to_sql_checked(ty, out),
            },
            Value::Text(s) => match *ty {
                Type::UUID => Uuid::parse_str(s)?.to_sql_checked(ty, out),
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql_checked(ty, out)
                }
                _ => s.as_str().to_sql_checked(ty, out),
            },
            Value::Bytes(b) => b.as_slice().to_sql_checked(ty, out),
            Value::Uuid(u) => u.to_sql_checked(ty, out),
            Value::Timestamp(t) => match *ty {
                Type::TIMESTAMP => t.naive_utc().to_sql_checked(ty, out),
                Type::DATE => t.date_naive().to_sql_checked(ty, out),
                _ => t.to_sql_checked(ty, out),
            },
            Value::Json(j) => j.to_sql_checked(ty, out),
            Value::List(items) => items.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

#[cfg(feature = "rust_decimal")]
fn to_decimal(value: &Value) -> Result<Option<rust_decimal::Decimal>, BoxError> {
    Ok(match value {
        Value::Int(i) => Some((*i).into()),
        Value::Float(f) => Some(rust_decimal::Decimal::try_from(*f)?),
        Value::Text(s) => Some(s.trim().parse()?),
        _ => None,
    })
}

/// Integers narrow to the column's width; out-of-range values are an error.
fn encode_int(i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(i)?.to_sql_checked(ty, out),
        Type::INT4 => i32::try_from(i)?.to_sql_checked(ty, out),
        Type::OID => u32::try_from(i)?.to_sql_checked(ty, out),
        Type::FLOAT4 => (i as f32).to_sql_checked(ty, out),
        Type::FLOAT8 => (i as f64).to_sql_checked(ty, out),
        Type::BOOL => (i != 0).to_sql_checked(ty, out),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => i.to_string().to_sql_checked(ty, out),
        _ => i.to_sql_checked(ty, out),
    }
}

/// Decode a driver row into a [`Row`] by column type.
pub(crate) fn decode_row(row: &tokio_postgres::Row) -> DbxResult<Row> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, idx, column.type_()).map_err(|e| match e {
            DecodeFailure::Driver(e) => DbxError::decode(column.name(), e.to_string()),
            DecodeFailure::Unsupported => DbxError::decode(column.name(), unsupported(column.type_())),
        })?;
        columns.push(column.name().to_string());
        values.push(value);
    }
    Ok(Row::new(columns, values))
}

enum DecodeFailure {
    Driver(tokio_postgres::Error),
    Unsupported,
}

impl From<tokio_postgres::Error> for DecodeFailure {
    fn from(err: tokio_postgres::Error) -> Self {
        DecodeFailure::Driver(err)
    }
}

fn unsupported(ty: &Type) -> String {
    if *ty == Type::NUMERIC {
        "unsupported column type numeric (enable the `rust_decimal` feature)".to_string()
    } else {
        format!("unsupported column type {}", ty.name())
    }
}

fn decode_value(
    row: &tokio_postgres::Row,
    idx: usize,
    ty: &Type,
) -> Result<Value, DecodeFailure> {
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| Value::Int(v.into())),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| Value::Int(v.into())),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::Int),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)?
            .map(|v| Value::Int(v.into())),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| Value::Float(v.into())),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::Float),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => row
            .try_get::<_, Option<rust_decimal::Decimal>>(idx)?
            .map(|d| Value::Text(d.to_string())),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::Bytes),
        Type::UUID => row.try_get::<_, Option<Uuid>>(idx)?.map(Value::Uuid),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|t| Value::Timestamp(t.and_utc())),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(Value::Timestamp),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|d| Value::Timestamp(d.and_time(NaiveTime::MIN).and_utc())),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map(|t| Value::Text(t.to_string())),
        Type::INTERVAL => row
            .try_get::<_, Option<PgInterval>>(idx)?
            .map(|i| Value::Text(i.to_string())),
        Type::INET => row
            .try_get::<_, Option<IpAddr>>(idx)?
            .map(|ip| Value::Text(ip.to_string())),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(Value::Json),
        Type::BOOL_ARRAY => row.try_get::<_, Option<Vec<bool>>>(idx)?.map(Value::from),
        Type::INT2_ARRAY => row.try_get::<_, Option<Vec<i16>>>(idx)?.map(Value::from),
        Type::INT4_ARRAY => row.try_get::<_, Option<Vec<i32>>>(idx)?.map(Value::from),
        Type::INT8_ARRAY => row.try_get::<_, Option<Vec<i64>>>(idx)?.map(Value::from),
        Type::FLOAT4_ARRAY => row.try_get::<_, Option<Vec<f32>>>(idx)?.map(Value::from),
        Type::FLOAT8_ARRAY => row.try_get::<_, Option<Vec<f64>>>(idx)?.map(Value::from),
        Type::UUID_ARRAY => row.try_get::<_, Option<Vec<Uuid>>>(idx)?.map(Value::from),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY | Type::NAME_ARRAY => row
            .try_get::<_, Option<Vec<String>>>(idx)?
            .map(Value::from),
        _ if PgText::accepts(ty) => row
            .try_get::<_, Option<PgText>>(idx)?
            .map(|t| Value::Text(t.0)),
        _ => return Err(DecodeFailure::Unsupported),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// A column whose wire value is its text: text-like types and enum labels.
struct PgText(String);

impl<'a> FromSql<'a> for PgText {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(PgText(std::str::from_utf8(raw)?.to_owned()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
            || matches!(
                *ty,
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN | Type::XML
            )
            || ty.name() == "citext"
    }
}

/// `INTERVAL`, rendered the way Postgres prints it (`1 year 2 mons 3 days 04:05:06`).
struct PgInterval {
    micros: i64,
    days: i32,
    months: i32,
}

impl<'a> FromSql<'a> for PgInterval {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        if raw.len() != 16 {
            return Err(format!("invalid interval length {}", raw.len()).into());
        }
        Ok(PgInterval {
            micros: i64::from_be_bytes(raw[0..8].try_into()?),
            days: i32::from_be_bytes(raw[8..12].try_into()?),
            months: i32::from_be_bytes(raw[12..16].try_into()?),
        })
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }
}

impl fmt::Display for PgInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn unit(parts: &mut Vec<String>, n: i32, name: &str) {
            if n != 0 {
                let plural = if n.abs() == 1 { "" } else { "s" };
                parts.push(format!("{n} {name}{plural}"));
            }
        }

        let mut parts = Vec::new();
        unit(&mut parts, self.months / 12, "year");
        unit(&mut parts, self.months % 12, "mon");
        unit(&mut parts, self.days, "day");
        if self.micros != 0 || parts.is_empty() {
            let sign = if self.micros < 0 { "-" } else { "" };
            let total = self.micros.unsigned_abs();
            let secs = total / 1_000_000;
            let mut time = format!(
                "{sign}{:02}:{:02}:{:02}",
                secs / 3600,
                secs / 60 % 60,
                secs % 60
            );
            let frac = total % 1_000_000;
            if frac != 0 {
                time.push_str(format!(".{frac:06}").trim_end_matches('0'));
            }
            parts.push(time);
        }
        f.write_str(&parts.join(" "))
    }
}
