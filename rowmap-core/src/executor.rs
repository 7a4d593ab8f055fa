//! Glue between generated statements and sqlx.
//!
//! Statement execution itself is the caller's business; these helpers only
//! bind argument lists and decode rows back into [`Value`]s.

use sqlx::Database;
use sqlx::query::Query;

use crate::value::Value;

/// Binds `values` onto `query`, in order.
pub fn bind_values<'q, DB>(
    mut query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    values: Vec<Value>,
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    String: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    i64: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    f64: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    bool: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    Vec<u8>: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    uuid::Uuid: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    chrono::NaiveDate: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    chrono::DateTime<chrono::Utc>: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    Option<String>: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
{
    for value in values {
        query = match value {
            Value::Null => query.bind(Option::<String>::None),
            Value::Bool(v) => query.bind(v),
            Value::Int(v) => query.bind(i64::from(v)),
            Value::Long(v) => query.bind(v),
            Value::BigInt(v) => match i64::try_from(v) {
                Ok(narrow) => query.bind(narrow),
                Err(_) => query.bind(v.to_string()),
            },
            Value::Float(v) => query.bind(f64::from(v)),
            Value::Double(v) => query.bind(v),
            Value::Text(v) => query.bind(v),
            Value::Bytes(v) => query.bind(v),
            Value::Uuid(v) => query.bind(v),
            Value::Date(v) => query.bind(v),
            Value::DateTime(v) => query.bind(v),
            Value::Json(v) => query.bind(v.to_string()),
            Value::Enum(v) => query.bind(v.name.to_owned()),
        };
    }
    query
}

/// Decodes a sqlite row into `(column, declared type, value)` triples, ready
/// for [`SqlMaker::populate`](crate::SqlMaker::populate).
///
/// Values are decoded by their storage class: integers as `Long`, reals as
/// `Double`, blobs as `Bytes`, everything else as `Text`.
///
/// # Errors
///
/// Propagates sqlx decoding errors.
#[cfg(feature = "sqlite")]
pub fn sqlite_row_values(
    row: &sqlx::sqlite::SqliteRow,
) -> crate::RowmapResult<Vec<(String, String, Value)>> {
    use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};

    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let storage = {
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_owned())
            }
        };
        let value = match storage.as_deref() {
            None => Value::Null,
            Some("INTEGER") => Value::Long(row.try_get_unchecked::<i64, _>(index)?),
            Some("REAL") => Value::Double(row.try_get_unchecked::<f64, _>(index)?),
            Some("BLOB") => Value::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
            Some(_) => Value::Text(row.try_get_unchecked::<String, _>(index)?),
        };
        values.push((
            column.name().to_owned(),
            column.type_info().name().to_owned(),
            value,
        ));
    }
    Ok(values)
}

/// Reads a sqlite row into a fresh `T`. Unmapped columns are ignored.
///
/// # Errors
///
/// Propagates decoding and mapping errors.
#[cfg(feature = "sqlite")]
pub fn read_sqlite_row<T>(maker: &crate::SqlMaker, row: &sqlx::sqlite::SqliteRow) -> crate::RowmapResult<T>
where
    T: crate::Pojo + Default,
{
    let mut target = T::default();
    maker.populate(&mut target, sqlite_row_values(row)?, true)?;
    Ok(target)
}
