use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RowmapResult;
use crate::serialize::{ConverterFactory, SerializerFactory};
use crate::value::{DataType, FromValue, SqlType, ToValue, Value, from_json, to_json};

/// Reads one property of a row.
pub type Getter<T> = Arc<dyn Fn(&T) -> RowmapResult<Value> + Send + Sync>;
/// Writes one property of a row.
pub type Setter<T> = Arc<dyn Fn(&mut T, Value) -> RowmapResult<()> + Send + Sync>;

/// The core trait for mapped row types.
///
/// A row type describes its persistent shape once through [`Pojo::schema`];
/// the introspector turns that description into a cached
/// [`PojoInfo`](crate::PojoInfo). It is usually implemented via
/// `#[derive(Pojo)]`, but hand-written schemas are equally valid.
pub trait Pojo: Sized + Send + Sync + 'static {
    /// Returns the registration schema of this row type.
    fn schema() -> PojoSchema<Self>;
}

/// Enum types that can be stored by ordinal or by name.
pub trait DbEnum: Sized + Copy + 'static {
    /// Textual form of each constant, in declaration order.
    const CONSTANTS: &'static [&'static str];

    /// Position of `self` in [`DbEnum::CONSTANTS`].
    fn ordinal(&self) -> usize;

    /// Constant at `ordinal`, if any.
    fn from_ordinal(ordinal: usize) -> Option<Self>;
}

/// How an enum property is encoded in its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumType {
    /// Declaration index of the constant.
    Ordinal,
    /// Textual form of the constant.
    #[default]
    String,
}

/// Table placement of a row type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub schema: Option<String>,
}

impl Table {
    /// Schema-qualified name, `schema.table` when a schema is present.
    pub fn qualified_name(&self) -> String {
        match self.schema.as_deref() {
            Some(schema) if !schema.trim().is_empty() => format!("{schema}.{}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Column metadata attached to a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Explicit column name; blank names are ignored.
    pub name: Option<String>,
    pub length: u32,
    pub precision: u32,
    pub scale: u32,
    pub nullable: bool,
    pub unique: bool,
    /// Raw DDL used instead of the generated type clause.
    pub definition: Option<String>,
}

impl Default for Column {
    fn default() -> Self {
        Self {
            name: None,
            length: 255,
            precision: 10,
            scale: 2,
            nullable: true,
            unique: false,
            definition: None,
        }
    }
}

impl Column {
    /// Column metadata with an explicit name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// The explicit name, when set and not blank.
    pub fn explicit_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Mapping metadata found on a field or an accessor.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    pub column: Option<Column>,
    pub id: bool,
    pub generated: bool,
    pub enumerated: Option<EnumType>,
    pub transient: bool,
    pub serializer: Option<SerializerFactory>,
    pub converter: Option<ConverterFactory>,
}

impl Annotations {
    /// Applies `other` on top of `self`; metadata present in `other` wins.
    pub fn overlay(&mut self, other: &Annotations) {
        if other.column.is_some() {
            self.column.clone_from(&other.column);
        }
        self.id |= other.id;
        self.generated |= other.generated;
        self.transient |= other.transient;
        if other.enumerated.is_some() {
            self.enumerated = other.enumerated;
        }
        if other.serializer.is_some() {
            self.serializer = other.serializer;
        }
        if other.converter.is_some() {
            self.converter = other.converter;
        }
    }
}

/// A stored field of a row type.
pub struct FieldDef<T> {
    pub(crate) name: &'static str,
    pub(crate) data_type: DataType,
    pub(crate) enum_constants: Option<&'static [&'static str]>,
    pub(crate) transient: bool,
    pub(crate) get: Getter<T>,
    pub(crate) set: Option<Setter<T>>,
    pub(crate) annotations: Annotations,
}

impl<T: 'static> FieldDef<T> {
    /// A field of type `F`, read and written through the given closures.
    pub fn new<F, G, S>(name: &'static str, get: G, set: S) -> Self
    where
        F: SqlType + ToValue + FromValue,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        S: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        let setter: Setter<T> = Arc::new(move |row: &mut T, value: Value| -> RowmapResult<()> {
            *set(row) = F::from_value(value)?;
            Ok(())
        });
        Self {
            name,
            data_type: F::DATA_TYPE,
            enum_constants: F::ENUM_CONSTANTS,
            transient: false,
            get: Arc::new(move |row: &T| -> RowmapResult<Value> { Ok(get(row).to_value()) }),
            set: Some(setter),
            annotations: Annotations::default(),
        }
    }

    /// A field with raw value closures and an explicit data type.
    ///
    /// Used for fields whose Rust type is only reachable through a serializer.
    pub fn raw(
        name: &'static str,
        data_type: DataType,
        get: Getter<T>,
        set: Option<Setter<T>>,
    ) -> Self {
        Self {
            name,
            data_type,
            enum_constants: None,
            transient: false,
            get,
            set,
            annotations: Annotations::default(),
        }
    }

    /// A field stored through a serializer, carried as [`Value::Json`] in memory.
    /// A field that serializes to JSON `null` reads as [`Value::Null`].
    ///
    /// The field type only needs serde support, not [`ToValue`] / [`FromValue`].
    pub fn serialized<F, G, S>(name: &'static str, get: G, set: S) -> Self
    where
        F: Serialize + DeserializeOwned,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        S: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        let setter: Setter<T> = Arc::new(move |row: &mut T, value: Value| -> RowmapResult<()> {
            *set(row) = from_json(value)?;
            Ok(())
        });
        Self::raw(
            name,
            DataType::Other,
            Arc::new(move |row: &T| -> RowmapResult<Value> {
                match to_json(get(row))? {
                    Value::Json(serde_json::Value::Null) => Ok(Value::Null),
                    value => Ok(value),
                }
            }),
            Some(setter),
        )
    }

    /// A field that cannot be written; never persisted.
    pub fn immutable<F, G>(name: &'static str, get: G) -> Self
    where
        F: SqlType + ToValue,
        G: Fn(&T) -> &F + Send + Sync + 'static,
    {
        Self {
            name,
            data_type: F::DATA_TYPE,
            enum_constants: F::ENUM_CONSTANTS,
            transient: false,
            get: Arc::new(move |row: &T| -> RowmapResult<Value> { Ok(get(row).to_value()) }),
            set: None,
            annotations: Annotations::default(),
        }
    }

    /// Marks the field transient at declaration level.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Replaces the field's annotations.
    pub fn annotated(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Convenience for `#[id]`.
    pub fn id(mut self) -> Self {
        self.annotations.id = true;
        self
    }

    /// Convenience for `#[generated]`.
    pub fn generated(mut self) -> Self {
        self.annotations.generated = true;
        self
    }

    /// Convenience for an explicit column name.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.annotations.column = Some(Column::named(name));
        self
    }

    /// Overrides the data type derived from the field type.
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }
}

/// A getter (and optional setter) pair defining a logical property.
pub struct AccessorDef<T> {
    pub(crate) name: &'static str,
    pub(crate) data_type: DataType,
    pub(crate) enum_constants: Option<&'static [&'static str]>,
    pub(crate) get: Getter<T>,
    pub(crate) set: Option<Setter<T>>,
    pub(crate) annotations: Annotations,
}

impl<T: 'static> AccessorDef<T> {
    /// An accessor pair over values of type `F`.
    pub fn new<F, G, S>(name: &'static str, get: G, set: S) -> Self
    where
        F: SqlType + ToValue + FromValue,
        G: Fn(&T) -> F + Send + Sync + 'static,
        S: Fn(&mut T, F) + Send + Sync + 'static,
    {
        let setter: Setter<T> = Arc::new(move |row: &mut T, value: Value| -> RowmapResult<()> {
            set(row, F::from_value(value)?);
            Ok(())
        });
        Self {
            name,
            data_type: F::DATA_TYPE,
            enum_constants: F::ENUM_CONSTANTS,
            get: Arc::new(move |row: &T| -> RowmapResult<Value> { Ok(get(row).to_value()) }),
            set: Some(setter),
            annotations: Annotations::default(),
        }
    }

    /// A getter without a setter.
    pub fn getter<F, G>(name: &'static str, get: G) -> Self
    where
        F: SqlType + ToValue,
        G: Fn(&T) -> F + Send + Sync + 'static,
    {
        Self {
            name,
            data_type: F::DATA_TYPE,
            enum_constants: F::ENUM_CONSTANTS,
            get: Arc::new(move |row: &T| -> RowmapResult<Value> { Ok(get(row).to_value()) }),
            set: None,
            annotations: Annotations::default(),
        }
    }

    /// Replaces the accessor's annotations.
    pub fn annotated(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Convenience for `#[id]`.
    pub fn id(mut self) -> Self {
        self.annotations.id = true;
        self
    }

    /// Convenience for an explicit column name.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.annotations.column = Some(Column::named(name));
        self
    }

    /// Marks the getter transient.
    pub fn transient(mut self) -> Self {
        self.annotations.transient = true;
        self
    }
}

/// Column access of a key-value row, keyed by column name.
pub struct Entries<T> {
    pub get: fn(&T, &str) -> Option<Value>,
    pub put: fn(&mut T, String, Value),
}

impl<T> Clone for Entries<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Entries<T> {}

/// Registration schema of a row type: everything the introspector needs.
pub struct PojoSchema<T> {
    pub(crate) type_name: &'static str,
    pub(crate) table: Option<Table>,
    pub(crate) column_order: Option<Vec<String>>,
    pub(crate) entries: Option<Entries<T>>,
    pub(crate) fields: Vec<FieldDef<T>>,
    pub(crate) accessors: Vec<AccessorDef<T>>,
}

impl<T> PojoSchema<T> {
    /// An empty schema for the type with the given simple name.
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            table: None,
            column_order: None,
            entries: None,
            fields: Vec::new(),
            accessors: Vec::new(),
        }
    }

    /// Schema of a generic key-value row: no properties are discovered and
    /// every column goes through `entries`.
    pub fn key_value(type_name: &'static str, entries: Entries<T>) -> Self {
        Self {
            entries: Some(entries),
            ..Self::new(type_name)
        }
    }

    /// Explicit table name.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(Table {
            name: name.into(),
            schema: None,
        });
        self
    }

    /// Explicit schema-qualified table name.
    pub fn table_in_schema(mut self, schema: impl Into<String>, name: impl Into<String>) -> Self {
        self.table = Some(Table {
            name: name.into(),
            schema: Some(schema.into()),
        });
        self
    }

    /// Explicit column order. Properties not listed are not persisted.
    pub fn column_order<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_order = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a field.
    pub fn field(mut self, field: FieldDef<T>) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds an accessor pair.
    pub fn accessor(mut self, accessor: AccessorDef<T>) -> Self {
        self.accessors.push(accessor);
        self
    }
}

impl Pojo for HashMap<String, Value> {
    fn schema() -> PojoSchema<Self> {
        PojoSchema::key_value(
            "HashMap",
            Entries {
                get: |row, column| row.get(column).cloned(),
                put: |row, column, value| {
                    row.insert(column, value);
                },
            },
        )
    }
}

impl Pojo for BTreeMap<String, Value> {
    fn schema() -> PojoSchema<Self> {
        PojoSchema::key_value(
            "BTreeMap",
            Entries {
                get: |row, column| row.get(column).cloned(),
                put: |row, column, value| {
                    row.insert(column, value);
                },
            },
        )
    }
}
