/// Boxed error used to carry the cause of serializer, converter and factory failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Rowmap-specific error type with actionable variants.
///
/// None of these are retried anywhere in this crate: a mapping or configuration
/// problem is a programming mistake that has to be fixed at the row type.
#[derive(Debug, thiserror::Error)]
pub enum RowmapError {
    /// Introspection or value mapping failed (duplicate or missing property,
    /// malformed enum value, serializer/converter failure, no write path).
    #[error("mapping error: {message}")]
    Mapping {
        /// What went wrong.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },
    /// The row type is missing something the operation needs (usually a primary key).
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The selected dialect does not implement the operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// Underlying sqlx error.
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl RowmapError {
    /// Builds a [`RowmapError::Mapping`] without a cause.
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a [`RowmapError::Mapping`] wrapping `source`.
    pub fn mapping_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Mapping {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Builds a [`RowmapError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Builds a [`RowmapError::Unsupported`].
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// True for [`RowmapError::Mapping`].
    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping { .. })
    }

    /// True for [`RowmapError::Configuration`].
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// True for [`RowmapError::Unsupported`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// Result alias for rowmap operations.
pub type RowmapResult<T> = Result<T, RowmapError>;
