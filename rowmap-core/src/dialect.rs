use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RowmapError, RowmapResult};
use crate::model::{Column, EnumType};
use crate::value::{DataType, Value};

/// Database-specific rendering and naming rules.
///
/// A dialect is consulted while a row type's descriptor is built (naming pass,
/// column types, templates) and on the read path through [`convert_value`].
/// Every hook except [`name`] and [`cache_key`] has the standard behaviour as
/// its default, so a dialect only overrides what differs.
///
/// [`convert_value`]: SqlDialect::convert_value
/// [`name`]: SqlDialect::name
/// [`cache_key`]: SqlDialect::cache_key
pub trait SqlDialect: Send + Sync + fmt::Debug {
    /// Short dialect name, for logs.
    fn name(&self) -> &'static str;

    /// Identifies the descriptors this dialect produces. Two dialects with the
    /// same key must build identical descriptors.
    fn cache_key(&self) -> String;

    /// Placeholder for the `n`-th parameter (1-based).
    fn placeholder(&self, _n: usize) -> String {
        "?".to_owned()
    }

    /// Column name for a property without an explicit column name.
    fn column_name_for(&self, logical_name: &str) -> String {
        logical_name.to_owned()
    }

    /// Type clause for a column.
    fn column_type(&self, data_type: DataType, enum_type: Option<EnumType>, column: &Column) -> String {
        standard_column_type(data_type, enum_type, column)
    }

    /// Definition of a database-assigned column, without `unique` / `not null` flags.
    fn generated_column(&self, column_name: &str, column_type: &str) -> String {
        format!("{column_name} {column_type} auto_increment")
    }

    /// Appends the upsert clause to the text that follows the table name in an insert.
    ///
    /// `None` means the dialect has no upsert.
    fn upsert_suffix(
        &self,
        _insert_suffix: &str,
        _key_columns: &[String],
        _update_columns: &[String],
    ) -> Option<String> {
        None
    }

    /// Coerces a value returned by the driver for a column of type `db_type`
    /// into its canonical in-memory form.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when the raw value cannot be coerced.
    fn convert_value(&self, value: Value, _db_type: &str) -> RowmapResult<Value> {
        Ok(value)
    }
}

/// Column type rendering shared by the dialects.
pub fn standard_column_type(data_type: DataType, enum_type: Option<EnumType>, column: &Column) -> String {
    match (data_type, enum_type) {
        (DataType::Enum, Some(EnumType::Ordinal)) | (DataType::Int, _) => "integer".to_owned(),
        (DataType::Long, _) => "bigint".to_owned(),
        (DataType::Float, _) => "float".to_owned(),
        (DataType::Double, _) => "double".to_owned(),
        (DataType::Decimal, _) => format!("decimal({},{})", column.precision, column.scale),
        (DataType::Bool, _) => "boolean".to_owned(),
        (DataType::Date, _) => "date".to_owned(),
        (DataType::DateTime, _) => "datetime".to_owned(),
        (DataType::Bytes, _) => "blob".to_owned(),
        (DataType::Uuid, _) => "char(36)".to_owned(),
        (DataType::Json, _) => "text".to_owned(),
        _ => format!("varchar({})", column.length),
    }
}

/// The base dialect: `?` placeholders, no naming rewrite, no upsert.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDialect;

impl SqlDialect for StandardDialect {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn cache_key(&self) -> String {
        "standard".to_owned()
    }
}

/// Identifier casing applied by the Postgres dialect to properties without an
/// explicit column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    /// Quote the name so mixed case survives.
    PreserveCase,
    /// Leave the name alone; the database folds it to lower case.
    #[default]
    LowerCase,
    /// `relatedEventId` becomes `related_event_id`.
    Underscore,
}

impl NamingConvention {
    /// Applies the convention to a logical property name.
    pub fn apply(self, name: &str) -> String {
        match self {
            Self::PreserveCase => format!("\"{name}\""),
            Self::LowerCase => name.to_owned(),
            Self::Underscore => to_underscore(name),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::PreserveCase => "preserve_case",
            Self::LowerCase => "lower_case",
            Self::Underscore => "underscore",
        }
    }
}

/// Emits `_` plus the lowercase form for every uppercase character.
///
/// Consecutive capitals each get their own underscore: `userID` becomes `user_i_d`.
pub fn to_underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_uppercase() {
            out.push('_');
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Postgres rules: naming conventions, `serial` columns, `on conflict` upserts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect {
    naming: NamingConvention,
    numbered_placeholders: bool,
}

impl PostgresDialect {
    /// A Postgres dialect with `?` placeholders.
    pub fn new(naming: NamingConvention) -> Self {
        Self {
            naming,
            numbered_placeholders: false,
        }
    }

    /// Switches between `?` and `$n` placeholders.
    pub fn with_numbered_placeholders(mut self, numbered: bool) -> Self {
        self.numbered_placeholders = numbered;
        self
    }

    pub fn naming(&self) -> NamingConvention {
        self.naming
    }
}

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn cache_key(&self) -> String {
        let placeholders = if self.numbered_placeholders { "numbered" } else { "positional" };
        format!("postgres:{}:{placeholders}", self.naming.as_str())
    }

    fn placeholder(&self, n: usize) -> String {
        if self.numbered_placeholders {
            format!("${n}")
        } else {
            "?".to_owned()
        }
    }

    fn column_name_for(&self, logical_name: &str) -> String {
        self.naming.apply(logical_name)
    }

    fn column_type(&self, data_type: DataType, enum_type: Option<EnumType>, column: &Column) -> String {
        match data_type {
            DataType::Double => "double precision".to_owned(),
            DataType::Float => "real".to_owned(),
            DataType::DateTime => "timestamp".to_owned(),
            DataType::Bytes => "bytea".to_owned(),
            DataType::Uuid => "uuid".to_owned(),
            DataType::Json => "jsonb".to_owned(),
            _ => standard_column_type(data_type, enum_type, column),
        }
    }

    fn generated_column(&self, column_name: &str, _column_type: &str) -> String {
        format!("{column_name} serial")
    }

    fn upsert_suffix(
        &self,
        insert_suffix: &str,
        key_columns: &[String],
        update_columns: &[String],
    ) -> Option<String> {
        let action = if update_columns.is_empty() {
            "do nothing".to_owned()
        } else {
            let assignments = update_columns
                .iter()
                .map(|column| format!("{column} = excluded.{column}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("do update set {assignments}")
        };
        Some(format!(
            "{insert_suffix} on conflict ({}) {action}",
            key_columns.join(", ")
        ))
    }

    fn convert_value(&self, value: Value, db_type: &str) -> RowmapResult<Value> {
        let db_type = db_type.trim().to_ascii_lowercase();
        let converted = match (value, db_type.as_str()) {
            (Value::Int(v), "int8" | "bigint" | "bigserial") => Value::Long(i64::from(v)),
            (Value::Float(v), "float8" | "double precision") => Value::Double(f64::from(v)),
            (Value::BigInt(v), "int8" | "bigint" | "bigserial") => {
                i64::try_from(v).map_or(Value::BigInt(v), Value::Long)
            }
            (Value::Text(text), "json" | "jsonb") => {
                let json = serde_json::from_str(&text).map_err(|err| {
                    RowmapError::mapping_with(format!("column of type {db_type} holds invalid json"), err)
                })?;
                Value::Json(json)
            }
            (other, _) => other,
        };
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_rewrites_every_capital() {
        assert_eq!(to_underscore("relatedEventId"), "related_event_id");
        assert_eq!(to_underscore("userID"), "user_i_d");
        assert_eq!(to_underscore("name"), "name");
    }

    #[test]
    fn naming_conventions() {
        assert_eq!(NamingConvention::PreserveCase.apply("userId"), "\"userId\"");
        assert_eq!(NamingConvention::LowerCase.apply("userId"), "userId");
        assert_eq!(NamingConvention::Underscore.apply("userId"), "user_id");
    }

    #[test]
    fn standard_types_use_column_hints() {
        let column = Column {
            length: 40,
            precision: 12,
            scale: 4,
            ..Column::default()
        };
        assert_eq!(standard_column_type(DataType::Text, None, &column), "varchar(40)");
        assert_eq!(standard_column_type(DataType::Decimal, None, &column), "decimal(12,4)");
        assert_eq!(
            standard_column_type(DataType::Enum, Some(EnumType::Ordinal), &column),
            "integer"
        );
        assert_eq!(
            standard_column_type(DataType::Enum, Some(EnumType::String), &Column::default()),
            "varchar(255)"
        );
    }

    #[test]
    fn postgres_overrides_types_and_generated_columns() {
        let pg = PostgresDialect::default();
        assert_eq!(pg.column_type(DataType::Double, None, &Column::default()), "double precision");
        assert_eq!(pg.column_type(DataType::Int, None, &Column::default()), "integer");
        assert_eq!(pg.generated_column("id", "integer"), "id serial");
        assert_eq!(StandardDialect.generated_column("id", "integer"), "id integer auto_increment");
    }

    #[test]
    fn postgres_upsert_without_update_columns_does_nothing() {
        let suffix = PostgresDialect::default()
            .upsert_suffix(" (id) values (?)", &["id".to_owned()], &[])
            .unwrap();
        assert_eq!(suffix, " (id) values (?) on conflict (id) do nothing");
        assert!(StandardDialect.upsert_suffix("", &[], &[]).is_none());
    }

    #[test]
    fn postgres_convert_value() {
        let pg = PostgresDialect::default();
        assert_eq!(pg.convert_value(Value::Int(3), "INT8").unwrap(), Value::Long(3));
        assert_eq!(pg.convert_value(Value::Int(3), "int4").unwrap(), Value::Int(3));
        assert_eq!(
            pg.convert_value(Value::Float(1.5), "double precision").unwrap(),
            Value::Double(1.5)
        );
        assert_eq!(pg.convert_value(Value::BigInt(9), "bigint").unwrap(), Value::Long(9));
        assert_eq!(
            pg.convert_value(Value::BigInt(i128::MAX), "bigint").unwrap(),
            Value::BigInt(i128::MAX)
        );
        assert_eq!(
            pg.convert_value(Value::Text("{\"a\":1}".into()), "jsonb").unwrap(),
            Value::Json(serde_json::json!({"a": 1}))
        );
        assert!(pg.convert_value(Value::Text("{".into()), "json").unwrap_err().is_mapping());
    }

    #[test]
    fn cache_keys_distinguish_configuration() {
        let lower = PostgresDialect::new(NamingConvention::LowerCase);
        let under = PostgresDialect::new(NamingConvention::Underscore);
        assert_ne!(lower.cache_key(), under.cache_key());
        assert_ne!(lower.cache_key(), lower.with_numbered_placeholders(true).cache_key());
        assert_ne!(lower.cache_key(), StandardDialect.cache_key());
    }
}
