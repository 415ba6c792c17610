//! `SchemaInspector` backed by PostgreSQL's `information_schema`.

use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::sql_types::Text;
use diesel_async::RunQueryDsl;

use crate::domain::LiveColumn;
use crate::domain::ports::{SchemaInspector, SchemaInspectorError};

use super::pool::DbPool;

const LIVE_COLUMNS_SQL: &str = concat!(
    "SELECT column_name::text AS column_name, ",
    "       is_nullable::text AS is_nullable ",
    "FROM information_schema.columns ",
    "WHERE table_schema = current_schema() ",
    "  AND table_name = $1 ",
    "ORDER BY ordinal_position"
);

#[derive(Debug, QueryableByName)]
struct ColumnRow {
    #[diesel(sql_type = Text)]
    column_name: String,
    #[diesel(sql_type = Text)]
    is_nullable: String,
}

impl From<ColumnRow> for LiveColumn {
    fn from(row: ColumnRow) -> Self {
        Self::new(row.column_name, row.is_nullable.eq_ignore_ascii_case("YES"))
    }
}

/// Reads column definitions for tables in the connection's current schema.
#[derive(Clone)]
pub struct DieselSchemaInspector {
    pool: DbPool,
}

impl DieselSchemaInspector {
    /// Create an inspector checking connections out of `pool`.
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaInspector for DieselSchemaInspector {
    async fn live_columns(&self, table: &str) -> Result<Vec<LiveColumn>, SchemaInspectorError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| SchemaInspectorError::connection(err.into_message()))?;
        let rows: Vec<ColumnRow> = diesel::sql_query(LIVE_COLUMNS_SQL)
            .bind::<Text, _>(table)
            .load(&mut conn)
            .await
            .map_err(|err| SchemaInspectorError::query(err.to_string()))?;
        Ok(rows.into_iter().map(LiveColumn::from).collect())
    }
}
