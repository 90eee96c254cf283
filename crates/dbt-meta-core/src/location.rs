//! Deployment location of a model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a model is materialized in the warehouse
///
/// `full_name` is always the dot-join of the non-empty parts, so dev
/// locations (no database) render as `schema.table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    /// Database / project (empty in development mode)
    pub database: String,

    /// Schema / dataset
    pub schema: String,

    /// Table name
    pub table: String,

    /// Dot-joined fully qualified name
    pub full_name: String,
}

impl ResolvedLocation {
    /// Create a location, computing `full_name`
    pub fn new(database: impl Into<String>, schema: impl Into<String>, table: impl Into<String>) -> Self {
        let database = database.into();
        let schema = schema.into();
        let table = table.into();

        let full_name = [database.as_str(), schema.as_str(), table.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(".");

        Self {
            database,
            schema,
            table,
            full_name,
        }
    }
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name)
    }
}
