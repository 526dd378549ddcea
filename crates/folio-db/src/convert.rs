//! Conversions between [`Datum`] and rusqlite's value types.

use rusqlite::types::{Value, ValueRef};

use folio_core::Datum;

pub fn to_value(datum: &Datum) -> Value {
  match datum {
    Datum::Null => Value::Null,
    Datum::Integer(i) => Value::Integer(*i),
    Datum::Real(r) => Value::Real(*r),
    Datum::Text(s) => Value::Text(s.clone()),
    Datum::Blob(b) => Value::Blob(b.clone()),
  }
}

pub fn from_ref(value: ValueRef<'_>) -> Datum {
  match value {
    ValueRef::Null => Datum::Null,
    ValueRef::Integer(i) => Datum::Integer(i),
    ValueRef::Real(r) => Datum::Real(r),
    ValueRef::Text(t) => Datum::Text(String::from_utf8_lossy(t).into_owned()),
    ValueRef::Blob(b) => Datum::Blob(b.to_vec()),
  }
}
