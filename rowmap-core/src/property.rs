use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{RowmapError, RowmapResult};
use crate::model::{Column, EnumType, Getter, Setter};
use crate::serialize::{AttributeConverter, DbSerializer};
use crate::value::{DataType, Value};

/// Enum encoding of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumInfo {
    pub encoding: EnumType,
    pub constants: &'static [&'static str],
}

pub(crate) struct Path<T> {
    pub(crate) get: Getter<T>,
    pub(crate) set: Option<Setter<T>>,
}

/// One mapped property of a row type.
pub struct Property<T> {
    pub(crate) name: &'static str,
    pub(crate) column_name: String,
    pub(crate) data_type: DataType,
    pub(crate) primary_key: bool,
    pub(crate) generated: bool,
    pub(crate) enum_info: Option<EnumInfo>,
    pub(crate) serializer: Option<Arc<dyn DbSerializer>>,
    pub(crate) converter: Option<Arc<dyn AttributeConverter>>,
    pub(crate) column: Option<Column>,
    pub(crate) field: Option<Path<T>>,
    pub(crate) accessor: Option<Path<T>>,
}

impl<T> Property<T> {
    /// Logical (field or accessor) name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Storage column name.
    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn is_enum(&self) -> bool {
        self.enum_info.is_some()
    }

    /// Enum encoding, for enum properties.
    pub fn enum_type(&self) -> Option<EnumType> {
        self.enum_info.map(|info| info.encoding)
    }

    pub fn is_serialized(&self) -> bool {
        self.serializer.is_some()
    }

    pub fn is_converted(&self) -> bool {
        self.converter.is_some()
    }

    /// Column metadata, when declared.
    pub fn column(&self) -> Option<&Column> {
        self.column.as_ref()
    }

    /// True when the column name came from an explicit, non-blank annotation.
    pub fn has_explicit_column_name(&self) -> bool {
        self.column
            .as_ref()
            .and_then(Column::explicit_name)
            .is_some()
    }

    /// Reads the raw property value, before any storage transform.
    pub(crate) fn read(&self, row: &T) -> RowmapResult<Value> {
        match (&self.accessor, &self.field) {
            (Some(path), _) | (None, Some(path)) => (path.get)(row),
            (None, None) => Err(RowmapError::mapping(format!(
                "property '{}' has neither an accessor nor a field to read from",
                self.name
            ))),
        }
    }

    /// Writes a value that already went through the storage transforms.
    pub(crate) fn write(&self, row: &mut T, value: Value) -> RowmapResult<()> {
        let setter = self
            .accessor
            .as_ref()
            .and_then(|path| path.set.as_ref())
            .or_else(|| self.field.as_ref().and_then(|path| path.set.as_ref()))
            .ok_or_else(|| {
                RowmapError::mapping(format!(
                    "cannot put a value into property '{}' without either a field or a setter",
                    self.name
                ))
            })?;
        setter(row, value)
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("column_name", &self.column_name)
            .field("data_type", &self.data_type)
            .field("primary_key", &self.primary_key)
            .field("generated", &self.generated)
            .field("enum_info", &self.enum_info)
            .field("serialized", &self.serializer.is_some())
            .field("converted", &self.converter.is_some())
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

/// Column name → property, in insertion order.
///
/// Renaming a key keeps the property at its position, so SQL column order
/// survives naming-convention rewrites.
pub struct PropertyMap<T> {
    entries: Vec<Property<T>>,
    index: HashMap<String, usize>,
}

impl<T> Default for PropertyMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> PropertyMap<T> {
    /// Appends a property under its column name.
    ///
    /// Returns the property back when the column name is already taken.
    pub(crate) fn insert(&mut self, property: Property<T>) -> Result<(), Property<T>> {
        if self.index.contains_key(&property.column_name) {
            return Err(property);
        }
        self.index
            .insert(property.column_name.clone(), self.entries.len());
        self.entries.push(property);
        Ok(())
    }

    /// Moves the property at `column` to the key `new_column`, keeping its position.
    pub(crate) fn rename(&mut self, column: &str, new_column: String) -> RowmapResult<()> {
        if column == new_column {
            return Ok(());
        }
        if self.index.contains_key(&new_column) {
            return Err(RowmapError::mapping(format!(
                "renaming column '{column}' to '{new_column}' collides with an existing column"
            )));
        }
        let position = self
            .index
            .remove(column)
            .ok_or_else(|| RowmapError::mapping(format!("no such column '{column}'")))?;
        self.entries[position].column_name.clone_from(&new_column);
        self.index.insert(new_column, position);
        Ok(())
    }

    pub(crate) fn into_vec(self) -> Vec<Property<T>> {
        self.entries
    }

    /// Property stored under `column`.
    pub fn get(&self, column: &str) -> Option<&Property<T>> {
        self.index.get(column).map(|&position| &self.entries[position])
    }

    /// Property with the logical name `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&Property<T>> {
        self.entries.iter().find(|property| property.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property<T>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|property| property.column_name.clone())
            .collect()
    }
}

impl<'a, T> IntoIterator for &'a PropertyMap<T> {
    type Item = &'a Property<T>;
    type IntoIter = std::slice::Iter<'a, Property<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T> fmt::Debug for PropertyMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
