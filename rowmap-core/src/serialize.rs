use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::value::{DataType, Value};

/// Turns a property value into a storage string and back.
///
/// A serializer is declared on a property through a [`SerializerFactory`] and
/// instantiated once, when the row type's descriptor is built.
pub trait DbSerializer: Send + Sync {
    /// Converts the property value into its stored text form.
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be represented.
    fn serialize(&self, value: &Value) -> Result<String, BoxError>;

    /// Converts stored text back into a value for a property of `target` type.
    ///
    /// # Errors
    ///
    /// Returns an error when the text is malformed.
    fn deserialize(&self, stored: &str, target: DataType) -> Result<Value, BoxError>;
}

/// Converts a property value to and from the value stored in its column.
pub trait AttributeConverter: Send + Sync {
    /// Property value to column value.
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be converted.
    fn to_storage(&self, value: Value) -> Result<Value, BoxError>;

    /// Column value to property value.
    ///
    /// # Errors
    ///
    /// Returns an error when the stored value cannot be converted.
    fn from_storage(&self, stored: Value) -> Result<Value, BoxError>;
}

/// Declares which serializer a property uses. Invoked once per descriptor build.
#[derive(Clone, Copy)]
pub struct SerializerFactory {
    type_name: &'static str,
    make: fn() -> Result<Arc<dyn DbSerializer>, BoxError>,
}

impl SerializerFactory {
    /// Factory for a default-constructible serializer type.
    pub fn of<S: DbSerializer + Default + 'static>() -> Self {
        fn make<S: DbSerializer + Default + 'static>() -> Result<Arc<dyn DbSerializer>, BoxError> {
            Ok(Arc::new(S::default()))
        }
        Self {
            type_name: std::any::type_name::<S>(),
            make: make::<S>,
        }
    }

    /// Factory from a fallible constructor.
    pub fn with(
        type_name: &'static str,
        make: fn() -> Result<Arc<dyn DbSerializer>, BoxError>,
    ) -> Self {
        Self { type_name, make }
    }

    /// Name of the serializer type, for messages.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn instantiate(&self) -> Result<Arc<dyn DbSerializer>, BoxError> {
        (self.make)()
    }
}

impl fmt::Debug for SerializerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerializerFactory({})", self.type_name)
    }
}

/// Declares which converter a property uses. Invoked once per descriptor build.
#[derive(Clone, Copy)]
pub struct ConverterFactory {
    type_name: &'static str,
    make: fn() -> Result<Arc<dyn AttributeConverter>, BoxError>,
}

impl ConverterFactory {
    /// Factory for a default-constructible converter type.
    pub fn of<C: AttributeConverter + Default + 'static>() -> Self {
        fn make<C: AttributeConverter + Default + 'static>()
        -> Result<Arc<dyn AttributeConverter>, BoxError> {
            Ok(Arc::new(C::default()))
        }
        Self {
            type_name: std::any::type_name::<C>(),
            make: make::<C>,
        }
    }

    /// Factory from a fallible constructor.
    pub fn with(
        type_name: &'static str,
        make: fn() -> Result<Arc<dyn AttributeConverter>, BoxError>,
    ) -> Self {
        Self { type_name, make }
    }

    /// Name of the converter type, for messages.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn instantiate(&self) -> Result<Arc<dyn AttributeConverter>, BoxError> {
        (self.make)()
    }
}

impl fmt::Debug for ConverterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConverterFactory({})", self.type_name)
    }
}

/// Stores values as JSON text.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl DbSerializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> Result<String, BoxError> {
        let json = match value {
            Value::Json(v) => v.clone(),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Long(v) => serde_json::Value::from(*v),
            Value::Double(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Value::from(f64::from(*v)),
            Value::Null => serde_json::Value::Null,
            other => serde_json::Value::String(other.to_string()),
        };
        Ok(serde_json::to_string(&json)?)
    }

    fn deserialize(&self, stored: &str, _target: DataType) -> Result<Value, BoxError> {
        Ok(Value::Json(serde_json::from_str(stored)?))
    }
}
