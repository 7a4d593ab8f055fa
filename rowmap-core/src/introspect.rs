//! Turns a row type's registration schema into a [`PojoInfo`].

use tracing::{debug, trace, warn};

use crate::dialect::SqlDialect;
use crate::error::{RowmapError, RowmapResult};
use crate::model::{AccessorDef, Annotations, FieldDef, Pojo, Table};
use crate::pojo::PojoInfo;
use crate::property::{EnumInfo, Path, Property, PropertyMap};
use crate::value::DataType;

/// A property before annotation resolution.
struct Candidate<T> {
    name: &'static str,
    data_type: DataType,
    enum_constants: Option<&'static [&'static str]>,
    field: Option<Path<T>>,
    accessor: Option<Path<T>>,
    annotations: Annotations,
}

impl<T> Candidate<T> {
    fn from_field(field: FieldDef<T>) -> Self {
        Self {
            name: field.name,
            data_type: field.data_type,
            enum_constants: field.enum_constants,
            field: Some(Path {
                get: field.get,
                set: field.set,
            }),
            accessor: None,
            annotations: field.annotations,
        }
    }

    fn from_accessor(accessor: AccessorDef<T>) -> Self {
        Self {
            name: accessor.name,
            data_type: accessor.data_type,
            enum_constants: accessor.enum_constants,
            field: None,
            accessor: Some(Path {
                get: accessor.get,
                set: accessor.set,
            }),
            annotations: accessor.annotations,
        }
    }

    /// Accessor metadata overlays field metadata; the accessor becomes the read path.
    fn merge(&mut self, accessor: AccessorDef<T>) {
        self.annotations.overlay(&accessor.annotations);
        self.data_type = accessor.data_type;
        if accessor.enum_constants.is_some() {
            self.enum_constants = accessor.enum_constants;
        }
        self.accessor = Some(Path {
            get: accessor.get,
            set: accessor.set,
        });
    }
}

/// Discovers the persistent properties of `T` and builds its descriptor for `dialect`.
///
/// Callers normally go through [`SqlMaker::pojo_info`](crate::SqlMaker::pojo_info),
/// which caches the result.
///
/// # Errors
///
/// Returns a mapping error when two properties resolve to the same column, a
/// field and an accessor are declared twice under one name, or a serializer or
/// converter cannot be instantiated.
pub fn introspect<T: Pojo>(dialect: &dyn SqlDialect) -> RowmapResult<PojoInfo<T>> {
    let schema = T::schema();
    let type_name = schema.type_name;
    let table = schema
        .table
        .as_ref()
        .filter(|table| !table.name.trim().is_empty())
        .map_or_else(|| type_name.to_owned(), Table::qualified_name);

    if let Some(entries) = schema.entries {
        trace!(type_name, "key-value row, skipping property discovery");
        return PojoInfo::new(type_name, table, PropertyMap::default(), Vec::new(), Some(entries))
            .finish(dialect);
    }

    let mut candidates: Vec<Candidate<T>> = Vec::new();
    for field in schema.fields {
        if field.set.is_none() || field.transient || field.annotations.transient {
            trace!(type_name, field = field.name, "skipping field");
            continue;
        }
        if candidates.iter().any(|c| c.name == field.name) {
            return Err(duplicate(type_name, field.name));
        }
        candidates.push(Candidate::from_field(field));
    }

    for accessor in schema.accessors {
        if accessor.annotations.transient {
            trace!(type_name, accessor = accessor.name, "skipping transient accessor");
            continue;
        }
        match candidates.iter_mut().find(|c| c.name == accessor.name) {
            Some(candidate) if candidate.accessor.is_some() => {
                return Err(duplicate(type_name, accessor.name));
            }
            Some(candidate) => candidate.merge(accessor),
            None => candidates.push(Candidate::from_accessor(accessor)),
        }
    }

    let mut key_names: Vec<&'static str> = Vec::new();
    let mut properties = PropertyMap::default();
    for candidate in candidates {
        if candidate.annotations.id && !key_names.contains(&candidate.name) {
            key_names.push(candidate.name);
        }
        let property = resolve(type_name, candidate)?;
        if let Err(rejected) = properties.insert(property) {
            return Err(RowmapError::mapping(format!(
                "duplicate pojo property '{}' (column '{}') in {type_name}",
                rejected.name(),
                rejected.column_name()
            )));
        }
    }

    if let Some(order) = schema.column_order {
        properties = reorder(type_name, properties, &order);
    }

    PojoInfo::new(type_name, table, properties, key_names, None).finish(dialect)
}

fn duplicate(type_name: &str, name: &str) -> RowmapError {
    RowmapError::mapping(format!("duplicate pojo property '{name}' in {type_name}"))
}

fn resolve<T>(type_name: &str, candidate: Candidate<T>) -> RowmapResult<Property<T>> {
    let Candidate {
        name,
        data_type,
        enum_constants,
        field,
        accessor,
        annotations,
    } = candidate;

    let column_name = annotations
        .column
        .as_ref()
        .and_then(|column| column.explicit_name())
        .unwrap_or(name)
        .to_owned();

    let enum_info = enum_constants.map(|constants| EnumInfo {
        encoding: annotations.enumerated.unwrap_or_default(),
        constants,
    });

    let (serializer, converter) = match (annotations.serializer, annotations.converter) {
        (Some(serializer), converter) => {
            if let Some(converter) = converter {
                warn!(
                    type_name,
                    property = name,
                    serializer = serializer.type_name(),
                    converter = converter.type_name(),
                    "property declares both a serializer and a converter, the converter is ignored"
                );
            }
            let instance = serializer.instantiate().map_err(|err| {
                RowmapError::mapping_with(
                    format!(
                        "could not instantiate serializer {} for {type_name}.{name}",
                        serializer.type_name()
                    ),
                    err,
                )
            })?;
            (Some(instance), None)
        }
        (None, Some(converter)) => {
            let instance = converter.instantiate().map_err(|err| {
                RowmapError::mapping_with(
                    format!(
                        "could not instantiate converter {} for {type_name}.{name}",
                        converter.type_name()
                    ),
                    err,
                )
            })?;
            (None, Some(instance))
        }
        (None, None) => (None, None),
    };

    Ok(Property {
        name,
        column_name,
        data_type,
        primary_key: annotations.id,
        generated: annotations.generated,
        enum_info,
        serializer,
        converter,
        column: annotations.column,
        field,
        accessor,
    })
}

/// Rebuilds the map in the listed order. Unlisted properties are not persisted.
fn reorder<T>(type_name: &str, properties: PropertyMap<T>, order: &[String]) -> PropertyMap<T> {
    let mut pool: Vec<Option<Property<T>>> = properties.into_vec().into_iter().map(Some).collect();
    let mut ordered = PropertyMap::default();
    for listed in order {
        let listed = listed.trim();
        let found = pool.iter_mut().find(|slot| {
            slot.as_ref()
                .is_some_and(|p| p.column_name() == listed || p.name() == listed)
        });
        match found.and_then(Option::take) {
            Some(property) => {
                if ordered.insert(property).is_err() {
                    debug!(type_name, column = listed, "column listed twice in column order");
                }
            }
            None => debug!(type_name, column = listed, "column order names an unknown property"),
        }
    }
    for dropped in pool.into_iter().flatten() {
        debug!(
            type_name,
            property = dropped.name(),
            "property not listed in column order, not persisted"
        );
    }
    ordered
}
