//! Port for reading live table definitions.
//!
//! Used at startup to compare [`TableBinding`](crate::domain::TableBinding)
//! declarations with what the migrations actually created.

use async_trait::async_trait;

use crate::domain::LiveColumn;

use super::define_port_error;

define_port_error! {
    /// Errors raised while introspecting the schema.
    pub enum SchemaInspectorError {
        /// The store is unreachable.
        Connection { message: String } =>
            "schema inspector connection failed: {message}",
        /// The catalogue query failed.
        Query { message: String } =>
            "schema inspector query failed: {message}",
    }
}

/// Reads column definitions from the live database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    /// Columns of `table` in ordinal order; empty when the table is absent.
    async fn live_columns(&self, table: &str) -> Result<Vec<LiveColumn>, SchemaInspectorError>;
}
