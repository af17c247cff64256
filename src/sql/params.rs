//! Values bound to PostgreSQL statements. Built from typed filter fields or from serde_json::Value (update maps, batch ids).

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value that can be bound to a PostgreSQL query.
///
/// Each variant reports its real wire type through `produces`, so a statement can mix
/// integers, text and JSON parameters; the placeholder cast (`$n::int4`) chosen from the
/// entity's column metadata converts it to the column type.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Json(Value),
}

impl PgBindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PgBindValue::I64(i)
                } else if n.is_u64() {
                    // above i64::MAX; let the column cast parse it
                    PgBindValue::String(n.to_string())
                } else {
                    PgBindValue::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => PgBindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PgBindValue::Null)
    }
}

impl From<&String> for PgBindValue {
    fn from(s: &String) -> Self {
        PgBindValue::String(s.clone())
    }
}

impl From<&str> for PgBindValue {
    fn from(s: &str) -> Self {
        PgBindValue::String(s.to_string())
    }
}

impl From<String> for PgBindValue {
    fn from(s: String) -> Self {
        PgBindValue::String(s)
    }
}

impl From<&i32> for PgBindValue {
    fn from(n: &i32) -> Self {
        PgBindValue::I64(i64::from(*n))
    }
}

impl From<i32> for PgBindValue {
    fn from(n: i32) -> Self {
        PgBindValue::I64(i64::from(n))
    }
}

impl From<&i64> for PgBindValue {
    fn from(n: &i64) -> Self {
        PgBindValue::I64(*n)
    }
}

impl From<i64> for PgBindValue {
    fn from(n: i64) -> Self {
        PgBindValue::I64(n)
    }
}

impl From<&f64> for PgBindValue {
    fn from(n: &f64) -> Self {
        PgBindValue::F64(*n)
    }
}

impl From<&bool> for PgBindValue {
    fn from(b: &bool) -> Self {
        PgBindValue::Bool(*b)
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf)?,
            PgBindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null | PgBindValue::String(_) => <String as Type<Postgres>>::type_info(),
            PgBindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            PgBindValue::Json(_) => <Value as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }
}
