//! Startup check of entity bindings against the live schema.

use tracing::{info, warn};

use crate::domain::ports::{SchemaInspector, SchemaInspectorError};
use crate::domain::table_binding::{SchemaDriftError, TableBinding, validate_binding};

/// Failure modes of [`verify_binding`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingCheckError {
    /// The schema could not be read.
    #[error(transparent)]
    Inspect(#[from] SchemaInspectorError),
    /// The schema does not match the declared binding.
    #[error(transparent)]
    Drift(#[from] SchemaDriftError),
}

/// Read the live columns for `T`'s table and validate the binding.
///
/// # Errors
///
/// Returns [`BindingCheckError::Inspect`] when introspection fails and
/// [`BindingCheckError::Drift`] when the schema differs from the declaration.
pub async fn verify_binding<T, I>(inspector: &I) -> Result<(), BindingCheckError>
where
    T: TableBinding,
    I: SchemaInspector + ?Sized,
{
    let live = inspector.live_columns(T::TABLE).await?;
    validate_binding::<T>(&live).inspect_err(|drift| {
        warn!(table = T::TABLE, error = %drift, "table binding drift detected");
    })?;
    info!(table = T::TABLE, columns = live.len(), "table binding verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockSchemaInspector;
    use crate::domain::{LiveColumn, Song};
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn missing_table_is_drift() {
        let mut inspector = MockSchemaInspector::new();
        inspector
            .expect_live_columns()
            .withf(|table| table == "songs")
            .returning(|_| Ok(Vec::new()));

        let error = verify_binding::<Song, _>(&inspector)
            .await
            .expect_err("no table");

        assert_eq!(
            error,
            BindingCheckError::Drift(SchemaDriftError::MissingTable { table: "songs" })
        );
    }

    #[rstest]
    #[tokio::test]
    async fn inspector_failures_propagate() {
        let mut inspector = MockSchemaInspector::new();
        inspector
            .expect_live_columns()
            .returning(|_| Err(SchemaInspectorError::connection("refused")));

        let error = verify_binding::<Song, _>(&inspector)
            .await
            .expect_err("connection failure");

        assert!(matches!(error, BindingCheckError::Inspect(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn matching_columns_pass() {
        let mut inspector = MockSchemaInspector::new();
        inspector.expect_live_columns().returning(|_| {
            Ok(vec![
                LiveColumn::new("id", false),
                LiveColumn::new("name", false),
                LiveColumn::new("artist", true),
                LiveColumn::new("album", true),
                LiveColumn::new("createdAt", false),
                LiveColumn::new("updatedAt", false),
            ])
        });

        verify_binding::<Song, _>(&inspector)
            .await
            .expect("binding matches");
    }
}
