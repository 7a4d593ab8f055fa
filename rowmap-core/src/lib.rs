pub use serde_json;
pub use sqlx;

pub mod prelude {
    pub use crate::{
        DbEnum, FromValue, Pojo, PojoInfo, PojoSchema, QueryContext, RowmapError, RowmapResult,
        SqlMaker, ToValue, Value,
    };
}

pub mod cache;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod introspect;
pub mod metrics;
pub mod model;
pub mod pojo;
pub mod property;
pub mod query;
pub mod serialize;
pub mod value;

pub mod maker;

pub use cache::DescriptorCache;
pub use config::{DialectKind, MakerConfig};
pub use dialect::{NamingConvention, PostgresDialect, SqlDialect, StandardDialect, to_underscore};
pub use error::{BoxError, RowmapError, RowmapResult};
pub use executor::bind_values;
#[cfg(feature = "sqlite")]
pub use executor::{read_sqlite_row, sqlite_row_values};
pub use introspect::introspect;
pub use maker::SqlMaker;
pub use model::{
    AccessorDef, Annotations, Column, DbEnum, Entries, EnumType, FieldDef, Getter, Pojo, PojoSchema,
    Setter, Table,
};
pub use pojo::{PojoInfo, SqlTemplate};
pub use property::{EnumInfo, Property, PropertyMap};
pub use query::QueryContext;
pub use serialize::{AttributeConverter, ConverterFactory, DbSerializer, JsonSerializer, SerializerFactory};
pub use value::{DataType, EnumConst, FromValue, SqlType, ToValue, Value, from_json, to_json, type_mismatch};

