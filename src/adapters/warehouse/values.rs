//! Wire conversion for scalar values
//!
//! [`ScalarValue`] crosses the warehouse boundary here and nowhere else: the
//! `ToSql` impl binds values as statement parameters (including as array
//! elements for `= ANY($1)` queries), and `FromSql` reads key values back for
//! existence checks.

use crate::domain::ScalarValue;
use bytes::BytesMut;
use chrono::{DateTime, Utc};
use std::error::Error;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};

fn type_supported(ty: &Type) -> bool {
    *ty == Type::INT2
        || *ty == Type::INT4
        || *ty == Type::INT8
        || *ty == Type::FLOAT4
        || *ty == Type::FLOAT8
        || *ty == Type::TEXT
        || *ty == Type::VARCHAR
        || *ty == Type::BPCHAR
        || *ty == Type::NAME
        || *ty == Type::BOOL
        || *ty == Type::TIMESTAMPTZ
}

impl ToSql for ScalarValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            ScalarValue::Int(v) => {
                if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            ScalarValue::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            ScalarValue::Text(v) => v.to_sql(ty, out),
            ScalarValue::Bool(v) => v.to_sql(ty, out),
            ScalarValue::Timestamp(v) => v.to_sql(ty, out),
            ScalarValue::Null => Ok(IsNull::Yes),
        }
    }

    fn accepts(ty: &Type) -> bool {
        // One value type stands in for the whole scalar domain; per-variant
        // mismatches surface as encode errors with the column type attached.
        type_supported(ty)
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for ScalarValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if *ty == Type::INT2 {
            Ok(ScalarValue::Int(i16::from_sql(ty, raw)? as i64))
        } else if *ty == Type::INT4 {
            Ok(ScalarValue::Int(i32::from_sql(ty, raw)? as i64))
        } else if *ty == Type::INT8 {
            Ok(ScalarValue::Int(i64::from_sql(ty, raw)?))
        } else if *ty == Type::FLOAT4 {
            Ok(ScalarValue::Float(f32::from_sql(ty, raw)? as f64))
        } else if *ty == Type::FLOAT8 {
            Ok(ScalarValue::Float(f64::from_sql(ty, raw)?))
        } else if *ty == Type::BOOL {
            Ok(ScalarValue::Bool(bool::from_sql(ty, raw)?))
        } else if *ty == Type::TIMESTAMPTZ {
            Ok(ScalarValue::Timestamp(DateTime::<Utc>::from_sql(ty, raw)?))
        } else if type_supported(ty) {
            Ok(ScalarValue::Text(String::from_sql(ty, raw)?))
        } else {
            Err(format!("unsupported column type {ty} for scalar value").into())
        }
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(ScalarValue::Null)
    }

    fn accepts(ty: &Type) -> bool {
        type_supported(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_scalar_types() {
        assert!(<ScalarValue as ToSql>::accepts(&Type::INT8));
        assert!(<ScalarValue as ToSql>::accepts(&Type::VARCHAR));
        assert!(<ScalarValue as ToSql>::accepts(&Type::TIMESTAMPTZ));
        assert!(!<ScalarValue as ToSql>::accepts(&Type::BYTEA));
        assert!(!<ScalarValue as ToSql>::accepts(&Type::JSONB));
    }

    #[test]
    fn test_null_encodes_as_null() {
        let mut buf = BytesMut::new();
        let is_null = ScalarValue::Null.to_sql(&Type::INT8, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }

    #[test]
    fn test_int_narrows_with_overflow_check() {
        let mut buf = BytesMut::new();
        assert!(ScalarValue::Int(42).to_sql(&Type::INT2, &mut buf).is_ok());

        let mut buf = BytesMut::new();
        let err = ScalarValue::Int(1_000_000)
            .to_sql(&Type::INT2, &mut buf)
            .err()
            .unwrap();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_int_round_trip_int8() {
        let mut buf = BytesMut::new();
        ScalarValue::Int(1017).to_sql(&Type::INT8, &mut buf).unwrap();
        let back = ScalarValue::from_sql(&Type::INT8, &buf).unwrap();
        assert_eq!(back, ScalarValue::Int(1017));
    }

    #[test]
    fn test_text_round_trip() {
        let mut buf = BytesMut::new();
        ScalarValue::from("POS-1017")
            .to_sql(&Type::TEXT, &mut buf)
            .unwrap();
        let back = ScalarValue::from_sql(&Type::TEXT, &buf).unwrap();
        assert_eq!(back, ScalarValue::from("POS-1017"));
    }
}
