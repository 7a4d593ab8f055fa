use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dialect::{NamingConvention, PostgresDialect, SqlDialect, StandardDialect};
use crate::error::{RowmapError, RowmapResult};

/// Dialect selector for [`MakerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    #[default]
    Standard,
    Postgres,
}

/// Settings for building a [`SqlMaker`](crate::SqlMaker).
///
/// ```json
/// { "dialect": "postgres", "naming": "underscore", "numbered_placeholders": true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MakerConfig {
    pub dialect: DialectKind,
    /// Only honoured by the Postgres dialect.
    pub naming: NamingConvention,
    /// Emit `$1, $2, ...` instead of `?`. Postgres only.
    pub numbered_placeholders: bool,
}

impl MakerConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed JSON or unknown keys.
    pub fn from_json_str(json: &str) -> RowmapResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| RowmapError::configuration(format!("invalid maker config: {err}")))
    }

    /// Instantiates the configured dialect.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for settings the chosen dialect cannot honour.
    pub fn build_dialect(&self) -> RowmapResult<Arc<dyn SqlDialect>> {
        match self.dialect {
            DialectKind::Standard if self.numbered_placeholders => Err(RowmapError::configuration(
                "numbered placeholders require the postgres dialect",
            )),
            DialectKind::Standard => {
                if self.naming != NamingConvention::default() {
                    tracing::warn!(naming = ?self.naming, "naming convention ignored by the standard dialect");
                }
                Ok(Arc::new(StandardDialect))
            }
            DialectKind::Postgres => Ok(Arc::new(
                PostgresDialect::new(self.naming).with_numbered_placeholders(self.numbered_placeholders),
            )),
        }
    }
}
