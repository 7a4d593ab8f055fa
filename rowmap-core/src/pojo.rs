use std::fmt;

use tracing::trace;

use crate::dialect::SqlDialect;
use crate::error::{RowmapError, RowmapResult};
use crate::model::{Entries, EnumType};
use crate::property::{EnumInfo, Property, PropertyMap};
use crate::value::{DataType, EnumConst, Value, type_mismatch};

/// Statement text split around the table name, plus the columns whose values
/// fill its placeholders, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTemplate {
    prefix: &'static str,
    suffix: String,
    arg_columns: Vec<String>,
}

impl SqlTemplate {
    fn new(prefix: &'static str, suffix: String, arg_columns: Vec<String>) -> Self {
        Self {
            prefix,
            suffix,
            arg_columns,
        }
    }

    /// Statement text for `table`.
    pub fn render(&self, table: &str) -> String {
        let mut sql = String::with_capacity(self.prefix.len() + table.len() + self.suffix.len());
        sql.push_str(self.prefix);
        sql.push_str(table);
        sql.push_str(&self.suffix);
        sql
    }

    /// Columns read from the row to build the argument list.
    pub fn arg_columns(&self) -> &[String] {
        &self.arg_columns
    }

    pub fn arg_count(&self) -> usize {
        self.arg_columns.len()
    }
}

/// Why a statement cannot be produced for a row type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gap {
    NoPrimaryKey,
    NoSettableColumns,
    NoUpsert,
    KeyValue,
}

type Plan = Result<SqlTemplate, Gap>;

#[derive(Debug)]
struct Templates {
    insert: Plan,
    update: Plan,
    delete: Plan,
    upsert: Plan,
    select_columns: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            insert: Err(Gap::KeyValue),
            update: Err(Gap::KeyValue),
            delete: Err(Gap::KeyValue),
            upsert: Err(Gap::KeyValue),
            select_columns: "*".to_owned(),
        }
    }
}

/// Cached, immutable mapping metadata for one row type under one dialect.
///
/// Built by [`introspect`](crate::introspect::introspect) and shared through the
/// [`DescriptorCache`](crate::DescriptorCache); never mutated after publication.
pub struct PojoInfo<T> {
    type_name: &'static str,
    table: String,
    properties: PropertyMap<T>,
    key_names: Vec<&'static str>,
    primary_keys: Vec<String>,
    generated: Vec<String>,
    entries: Option<Entries<T>>,
    templates: Templates,
}

impl<T> PojoInfo<T> {
    pub(crate) fn new(
        type_name: &'static str,
        table: String,
        properties: PropertyMap<T>,
        key_names: Vec<&'static str>,
        entries: Option<Entries<T>>,
    ) -> Self {
        Self {
            type_name,
            table,
            properties,
            key_names,
            primary_keys: Vec::new(),
            generated: Vec::new(),
            entries,
            templates: Templates::default(),
        }
    }

    /// Runs the dialect's naming pass and builds the statement templates.
    ///
    /// This is the only place a descriptor changes after introspection.
    pub(crate) fn finish(mut self, dialect: &dyn SqlDialect) -> RowmapResult<Self> {
        if self.entries.is_some() {
            return Ok(self);
        }

        let renames: Vec<(String, String)> = self
            .properties
            .iter()
            .filter(|property| !property.has_explicit_column_name())
            .map(|property| {
                (
                    property.column_name().to_owned(),
                    dialect.column_name_for(property.name()),
                )
            })
            .collect();
        for (column, renamed) in renames {
            self.properties.rename(&column, renamed).map_err(|err| {
                RowmapError::mapping(format!("{} in {}", err_message(&err), self.type_name))
            })?;
        }

        self.primary_keys = self
            .key_names
            .iter()
            .filter_map(|name| self.properties.get_by_name(name))
            .map(|property| property.column_name().to_owned())
            .collect();
        self.generated = self
            .properties
            .iter()
            .filter(|property| property.is_generated())
            .map(|property| property.column_name().to_owned())
            .collect();
        self.templates = self.build_templates(dialect);
        Ok(self)
    }

    fn build_templates(&self, dialect: &dyn SqlDialect) -> Templates {
        let insert_columns: Vec<String> = self
            .properties
            .iter()
            .filter(|property| !property.is_generated())
            .map(|property| property.column_name().to_owned())
            .collect();
        let set_columns: Vec<String> = self
            .properties
            .iter()
            .filter(|property| !property.is_generated() && !property.is_primary_key())
            .map(|property| property.column_name().to_owned())
            .collect();

        let insert_suffix = if insert_columns.is_empty() {
            " default values".to_owned()
        } else {
            let placeholders = (1..=insert_columns.len())
                .map(|n| dialect.placeholder(n))
                .collect::<Vec<_>>()
                .join(",");
            format!(" ({}) values ({placeholders})", insert_columns.join(","))
        };

        let update = if self.primary_keys.is_empty() {
            Err(Gap::NoPrimaryKey)
        } else if set_columns.is_empty() {
            Err(Gap::NoSettableColumns)
        } else {
            let mut n = 0;
            let mut next = || {
                n += 1;
                dialect.placeholder(n)
            };
            let assignments = set_columns
                .iter()
                .map(|column| format!("{column}={}", next()))
                .collect::<Vec<_>>()
                .join(",");
            let conditions = self
                .primary_keys
                .iter()
                .map(|column| format!("{column}={}", next()))
                .collect::<Vec<_>>()
                .join(" and ");
            let mut arg_columns = set_columns.clone();
            arg_columns.extend(self.primary_keys.iter().cloned());
            Ok(SqlTemplate::new(
                "update ",
                format!(" set {assignments} where {conditions}"),
                arg_columns,
            ))
        };

        let delete = if self.primary_keys.is_empty() {
            Err(Gap::NoPrimaryKey)
        } else {
            let conditions = self
                .primary_keys
                .iter()
                .enumerate()
                .map(|(i, column)| format!("{column}={}", dialect.placeholder(i + 1)))
                .collect::<Vec<_>>()
                .join(" and ");
            Ok(SqlTemplate::new(
                "delete from ",
                format!(" where {conditions}"),
                self.primary_keys.clone(),
            ))
        };

        let upsert = match dialect.upsert_suffix(&insert_suffix, &self.primary_keys, &set_columns) {
            None => Err(Gap::NoUpsert),
            Some(_) if self.primary_keys.is_empty() => Err(Gap::NoPrimaryKey),
            Some(suffix) => Ok(SqlTemplate::new("insert into ", suffix, insert_columns.clone())),
        };

        let select_columns = if self.properties.is_empty() {
            "*".to_owned()
        } else {
            self.properties.column_names().join(",")
        };

        Templates {
            insert: Ok(SqlTemplate::new("insert into ", insert_suffix, insert_columns)),
            update,
            delete,
            upsert,
            select_columns,
        }
    }

    /// Name of the row type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Table name, schema-qualified when declared so.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn properties(&self) -> &PropertyMap<T> {
        &self.properties
    }

    /// Primary key column names in discovery order.
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn generated_columns(&self) -> &[String] {
        &self.generated
    }

    /// True for generic key-value rows, which have no discovered properties.
    pub fn is_key_value(&self) -> bool {
        self.entries.is_some()
    }

    /// Comma-separated column list used by selects, `*` when nothing is mapped.
    pub fn select_columns(&self) -> &str {
        &self.templates.select_columns
    }

    /// Property stored under `column`, falling back to the logical name.
    pub fn property(&self, column: &str) -> Option<&Property<T>> {
        self.properties
            .get(column)
            .or_else(|| self.properties.get_by_name(column))
    }

    pub fn insert_template(&self) -> RowmapResult<&SqlTemplate> {
        self.plan(&self.templates.insert, "insert")
    }

    pub fn update_template(&self) -> RowmapResult<&SqlTemplate> {
        self.plan(&self.templates.update, "update")
    }

    pub fn delete_template(&self) -> RowmapResult<&SqlTemplate> {
        self.plan(&self.templates.delete, "delete")
    }

    pub fn upsert_template(&self) -> RowmapResult<&SqlTemplate> {
        self.plan(&self.templates.upsert, "upsert")
    }

    fn plan<'a>(&self, plan: &'a Plan, statement: &str) -> RowmapResult<&'a SqlTemplate> {
        plan.as_ref().map_err(|gap| match gap {
            Gap::NoPrimaryKey => RowmapError::configuration(format!(
                "{statement} of {} requires a primary key",
                self.type_name
            )),
            Gap::NoSettableColumns => RowmapError::configuration(format!(
                "{statement} of {} has no columns to set",
                self.type_name
            )),
            Gap::NoUpsert => RowmapError::unsupported(format!(
                "{statement} is not supported by this dialect"
            )),
            Gap::KeyValue => RowmapError::unsupported(format!(
                "{statement} of key-value row {} needs caller-supplied columns",
                self.type_name
            )),
        })
    }

    /// Reads the storage value of `column` from `row`.
    ///
    /// At most one transform applies, in this order: serializer, converter,
    /// enum encoding. Nulls are returned untouched. Key-value rows return their
    /// entry as is, or null when absent.
    ///
    /// # Errors
    ///
    /// Returns a mapping error for an unknown column or a failed transform.
    pub fn get_value(&self, row: &T, column: &str) -> RowmapResult<Value> {
        if let Some(entries) = self.entries {
            return Ok((entries.get)(row, column).unwrap_or(Value::Null));
        }
        let property = self.property(column).ok_or_else(|| {
            RowmapError::mapping(format!("no property for column '{column}' in {}", self.type_name))
        })?;
        let value = property.read(row)?;
        if value.is_null() {
            return Ok(value);
        }
        if let Some(serializer) = &property.serializer {
            return serializer.serialize(&value).map(Value::Text).map_err(|err| {
                RowmapError::mapping_with(format!("could not serialize {}", self.qualified(property)), err)
            });
        }
        if let Some(converter) = &property.converter {
            return converter.to_storage(value).map_err(|err| {
                RowmapError::mapping_with(format!("could not convert {}", self.qualified(property)), err)
            });
        }
        match property.enum_info {
            Some(info) => encode_enum(info, value),
            None => Ok(value),
        }
    }

    /// Writes a storage value into `column` of `row`.
    ///
    /// # Errors
    ///
    /// Returns a mapping error for an unknown column, a failed transform or a
    /// property without a write path.
    pub fn put_value(&self, row: &mut T, column: &str, value: Value) -> RowmapResult<()> {
        if let Some(entries) = self.entries {
            (entries.put)(row, column.to_owned(), value);
            return Ok(());
        }
        match self.property(column) {
            Some(property) => self.write(property, row, value),
            None => Err(RowmapError::mapping(format!(
                "no property for column '{column}' in {}",
                self.type_name
            ))),
        }
    }

    /// Like [`put_value`](Self::put_value), but an unknown column is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a mapping error for a failed transform or a property without a write path.
    pub fn put_value_or_ignore(&self, row: &mut T, column: &str, value: Value) -> RowmapResult<()> {
        if self.entries.is_some() {
            return self.put_value(row, column, value);
        }
        match self.property(column) {
            Some(property) => self.write(property, row, value),
            None => {
                trace!(column, type_name = self.type_name, "ignoring unmapped column");
                Ok(())
            }
        }
    }

    fn write(&self, property: &Property<T>, row: &mut T, value: Value) -> RowmapResult<()> {
        let value = if value.is_null() {
            value
        } else if let Some(serializer) = &property.serializer {
            let stored = match value {
                Value::Text(text) => text,
                // json / jsonb columns arrive already parsed
                Value::Json(json) => json.to_string(),
                other => return Err(type_mismatch("serialized text", &other)),
            };
            serializer
                .deserialize(&stored, property.data_type)
                .map_err(|err| {
                    RowmapError::mapping_with(
                        format!("could not deserialize {}", self.qualified(property)),
                        err,
                    )
                })?
        } else if let Some(converter) = &property.converter {
            converter.from_storage(value).map_err(|err| {
                RowmapError::mapping_with(format!("could not convert {}", self.qualified(property)), err)
            })?
        } else if let Some(info) = property.enum_info {
            decode_enum(info, value)
                .map_err(|err| RowmapError::mapping_with(self.qualified(property), err))?
        } else if property.data_type == DataType::Long {
            narrow_long(value)?
        } else {
            value
        };
        property.write(row, value)
    }

    fn qualified(&self, property: &Property<T>) -> String {
        format!("{}.{}", self.type_name, property.name())
    }
}

impl<T> fmt::Debug for PojoInfo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PojoInfo")
            .field("type_name", &self.type_name)
            .field("table", &self.table)
            .field("properties", &self.properties)
            .field("primary_keys", &self.primary_keys)
            .field("generated", &self.generated)
            .field("key_value", &self.entries.is_some())
            .field("templates", &self.templates)
            .finish()
    }
}

fn err_message(err: &RowmapError) -> String {
    match err {
        RowmapError::Mapping { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

fn encode_enum(info: EnumInfo, value: Value) -> RowmapResult<Value> {
    let Value::Enum(constant) = value else {
        return Err(type_mismatch("enum constant", &value));
    };
    match info.encoding {
        EnumType::Ordinal => i32::try_from(constant.ordinal)
            .map(Value::Int)
            .map_err(|err| RowmapError::mapping_with("enum ordinal does not fit in an int", err)),
        EnumType::String => Ok(Value::Text(constant.name.to_owned())),
    }
}

fn decode_enum(info: EnumInfo, value: Value) -> RowmapResult<Value> {
    let constant = match (info.encoding, &value) {
        (EnumType::Ordinal, _) => {
            let ordinal = value
                .as_i128()
                .ok_or_else(|| type_mismatch("enum ordinal", &value))?;
            usize::try_from(ordinal)
                .ok()
                .and_then(|ordinal| info.constants.get(ordinal).map(|name| (ordinal, *name)))
                .ok_or_else(|| {
                    RowmapError::mapping(format!(
                        "enum ordinal {ordinal} is out of range 0..{}",
                        info.constants.len()
                    ))
                })?
        }
        (EnumType::String, Value::Text(text)) => info
            .constants
            .iter()
            .position(|name| name == text)
            .map(|ordinal| (ordinal, info.constants[ordinal]))
            .ok_or_else(|| RowmapError::mapping(format!("'{text}' is not a declared enum constant")))?,
        (EnumType::String, other) => return Err(type_mismatch("enum name", other)),
    };
    Ok(Value::Enum(EnumConst {
        ordinal: constant.0,
        name: constant.1,
    }))
}

fn narrow_long(value: Value) -> RowmapResult<Value> {
    match value {
        Value::BigInt(wide) => i64::try_from(wide).map(Value::Long).map_err(|err| {
            RowmapError::mapping_with(format!("integer {wide} does not fit in a long"), err)
        }),
        other => Ok(other),
    }
}
