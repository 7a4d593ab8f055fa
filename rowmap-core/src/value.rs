use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{RowmapError, RowmapResult};

/// Runtime data type of a mapped property.
///
/// This is what column type rendering is keyed on; it plays the role a field's
/// declared class plays in reflection-based mappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Text,
    Bytes,
    Uuid,
    Date,
    DateTime,
    Json,
    Enum,
    /// Anything without a dedicated SQL type (custom serialized values).
    Other,
}

/// One constant of a [`DbEnum`](crate::DbEnum) as seen by the value accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumConst {
    /// Position of the constant in declaration order.
    pub ordinal: usize,
    /// Textual form of the constant (the variant name).
    pub name: &'static str,
}

/// A dynamically typed value flowing between row objects and SQL argument lists.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    /// Wide integer as produced by some drivers for `numeric` / unsigned 64-bit columns.
    BigInt(i128),
    Float(f32),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
    /// An enum constant before storage encoding (or after decoding).
    Enum(EnumConst),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::BigInt(_) => "bigint",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Uuid(_) => "uuid",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Json(_) => "json",
            Self::Enum(_) => "enum",
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view of the value, if it is any integer variant.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(i128::from(*v)),
            Self::Long(v) => Some(i128::from(*v)),
            Self::BigInt(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{v}"),
            Self::DateTime(v) => f.write_str(&v.to_rfc3339()),
            Self::Json(v) => write!(f, "{v}"),
            Self::Enum(v) => f.write_str(v.name),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Exposes the [`DataType`] of a field type to the introspector.
pub trait SqlType {
    /// The runtime data type of values of this type.
    const DATA_TYPE: DataType;
    /// Declared constants, for enum types.
    const ENUM_CONSTANTS: Option<&'static [&'static str]> = None;
}

/// Reads a field into a [`Value`].
pub trait ToValue {
    /// Converts `self` into a [`Value`].
    fn to_value(&self) -> Value;
}

/// Writes a [`Value`] back into a field type.
pub trait FromValue: Sized {
    /// Converts `value` into `Self`.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when the value has an incompatible kind or is out of range.
    fn from_value(value: Value) -> RowmapResult<Self>;
}

/// Error for a value that cannot be written into a field of type `expected`.
pub fn type_mismatch(expected: &str, value: &Value) -> RowmapError {
    RowmapError::mapping(format!(
        "cannot convert {} value '{}' into {}",
        value.kind(),
        value,
        expected
    ))
}

fn integer<T: TryFrom<i128>>(expected: &str, value: Value) -> RowmapResult<T> {
    let wide = value.as_i128().ok_or_else(|| type_mismatch(expected, &value))?;
    T::try_from(wide).map_err(|_| {
        RowmapError::mapping(format!("integer {wide} is out of range for {expected}"))
    })
}

macro_rules! integer_value {
    ($ty:ty, $data_type:expr, $variant:ident) => {
        impl SqlType for $ty {
            const DATA_TYPE: DataType = $data_type;
        }

        impl ToValue for $ty {
            fn to_value(&self) -> Value {
                Value::$variant((*self).into())
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> RowmapResult<Self> {
                integer(stringify!($ty), value)
            }
        }
    };
}

integer_value!(i16, DataType::Int, Int);
integer_value!(i32, DataType::Int, Int);
integer_value!(i64, DataType::Long, Long);

impl SqlType for bool {
    const DATA_TYPE: DataType = DataType::Bool;
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> RowmapResult<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            // sqlite and friends store booleans as 0/1
            Value::Int(0) | Value::Long(0) => Ok(false),
            Value::Int(1) | Value::Long(1) => Ok(true),
            other => Err(type_mismatch("bool", &other)),
        }
    }
}

impl SqlType for f32 {
    const DATA_TYPE: DataType = DataType::Float;
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

/// A [`Value::Double`] is rounded to the nearest `f32`.
impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> RowmapResult<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Double(v) => Ok(v as f32),
            other => Err(type_mismatch("f32", &other)),
        }
    }
}

impl SqlType for f64 {
    const DATA_TYPE: DataType = DataType::Double;
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Double(*self)
    }
}

/// A [`Value::Long`] beyond 2^53 is rounded to the nearest `f64`.
impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: Value) -> RowmapResult<Self> {
        match value {
            Value::Double(v) => Ok(v),
            Value::Float(v) => Ok(f64::from(v)),
            Value::Int(v) => Ok(f64::from(v)),
            Value::Long(v) => Ok(v as f64),
            other => Err(type_mismatch("f64", &other)),
        }
    }
}

impl SqlType for String {
    const DATA_TYPE: DataType = DataType::Text;
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> RowmapResult<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(type_mismatch("String", &other)),
        }
    }
}

impl SqlType for Vec<u8> {
    const DATA_TYPE: DataType = DataType::Bytes;
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> RowmapResult<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            other => Err(type_mismatch("Vec<u8>", &other)),
        }
    }
}

impl SqlType for uuid::Uuid {
    const DATA_TYPE: DataType = DataType::Uuid;
}

impl ToValue for uuid::Uuid {
    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: Value) -> RowmapResult<Self> {
        match value {
            Value::Uuid(v) => Ok(v),
            Value::Text(s) => uuid::Uuid::parse_str(&s)
                .map_err(|err| RowmapError::mapping_with(format!("invalid uuid '{s}'"), err)),
            Value::Bytes(bytes) => uuid::Uuid::from_slice(&bytes)
                .map_err(|err| RowmapError::mapping_with("invalid uuid bytes", err)),
            other => Err(type_mismatch("Uuid", &other)),
        }
    }
}

impl SqlType for NaiveDate {
    const DATA_TYPE: DataType = DataType::Date;
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> RowmapResult<Self> {
        match value {
            Value::Date(v) => Ok(v),
            Value::DateTime(v) => Ok(v.date_naive()),
            Value::Text(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|err| RowmapError::mapping_with(format!("invalid date '{s}'"), err)),
            other => Err(type_mismatch("NaiveDate", &other)),
        }
    }
}

impl SqlType for DateTime<Utc> {
    const DATA_TYPE: DataType = DataType::DateTime;
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> RowmapResult<Self> {
        match value {
            Value::DateTime(v) => Ok(v),
            Value::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|err| RowmapError::mapping_with(format!("invalid timestamp '{s}'"), err)),
            other => Err(type_mismatch("DateTime<Utc>", &other)),
        }
    }
}

impl SqlType for serde_json::Value {
    const DATA_TYPE: DataType = DataType::Json;
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> RowmapResult<Self> {
        match value {
            Value::Json(v) => Ok(v),
            Value::Text(s) => serde_json::from_str(&s)
                .map_err(|err| RowmapError::mapping_with("invalid json text", err)),
            other => Err(type_mismatch("serde_json::Value", &other)),
        }
    }
}

impl<T: SqlType> SqlType for Option<T> {
    const DATA_TYPE: DataType = T::DATA_TYPE;
    const ENUM_CONSTANTS: Option<&'static [&'static str]> = T::ENUM_CONSTANTS;
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> RowmapResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// Reads a serde-serializable field as [`Value::Json`].
///
/// Used for fields carrying a custom serializer whose Rust type has no
/// [`ToValue`] implementation of its own.
///
/// # Errors
///
/// Returns a mapping error when serde cannot represent the value.
pub fn to_json<S: Serialize + ?Sized>(value: &S) -> RowmapResult<Value> {
    serde_json::to_value(value)
        .map(Value::Json)
        .map_err(|err| RowmapError::mapping_with("could not convert field to json", err))
}

/// Counterpart of [`to_json`]: accepts [`Value::Json`] or JSON text.
///
/// # Errors
///
/// Returns a mapping error when the value does not deserialize into `D`.
pub fn from_json<D: DeserializeOwned>(value: Value) -> RowmapResult<D> {
    let json = match value {
        Value::Json(v) => v,
        Value::Text(s) => serde_json::from_str(&s)
            .map_err(|err| RowmapError::mapping_with("invalid json text", err))?,
        Value::Null => serde_json::Value::Null,
        other => return Err(type_mismatch("json", &other)),
    };
    serde_json::from_value(json)
        .map_err(|err| RowmapError::mapping_with("could not convert json into field", err))
}
